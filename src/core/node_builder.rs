// This module provides the arena-backed node builder that front ends use to materialize IR and
// AST nodes. Nodes are bump-allocated out of fixed-size arenas (each backed by a bumpalo Bump)
// and every allocation is recorded in an append-only tracking list together with a type-erased
// drop function, so the whole tree can be torn down in bulk without per-node frees. Callers
// hold typed NodeId handles instead of raw pointers; a handle carries the generation it was
// issued in and resolves to None once the node it named has been rolled back. Checkpoints make
// allocation transactional: save_checkpoint snapshots the arena cursor, arena count and node
// count, then starts a fresh arena so rolling back never rewinds a block that earlier nodes
// live in; restore destroys exactly the nodes allocated after the snapshot and releases the
// arenas appended since. Checkpoints nest and must be closed in LIFO order. BuilderStats
// tracks allocation and rollback counters the same way the compilation session does.

//! Arena node builder with checkpoint/restore.
//!
//! ```
//! use irframe::core::NodeBuilder;
//!
//! let mut builder = NodeBuilder::with_arena_size(256);
//! let lhs = builder.allocate(1u64);
//!
//! let checkpoint = builder.save_checkpoint();
//! let speculative = builder.allocate(String::from("rhs"));
//! builder.restore(checkpoint);
//!
//! assert!(builder.is_live(lhs));
//! assert!(!builder.is_live(speculative));
//! ```

use super::error::{BuilderError, BuilderResult, CheckpointResult, RejectedCheckpoint};
use bumpalo::Bump;
use hashbrown::HashMap;
use std::alloc::Layout;
use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, Ordering};

/// Arena size used by [`NodeBuilder::new`].
pub const DEFAULT_ARENA_SIZE: usize = 8 * 1024;

static NEXT_BUILDER_ID: AtomicU32 = AtomicU32::new(1);

/// Typed handle to a node owned by a [`NodeBuilder`].
pub struct NodeId<T> {
    builder: u32,
    index: u32,
    generation: u32,
    _ty: PhantomData<fn() -> T>,
}

impl<T> NodeId<T> {
    /// Position of the node in allocation order.
    pub fn index(self) -> usize {
        self.index as usize
    }

    /// Rollback generation the handle was issued in.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl<T> Clone for NodeId<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeId<T> {}

impl<T> PartialEq for NodeId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.builder == other.builder
            && self.index == other.index
            && self.generation == other.generation
    }
}

impl<T> Eq for NodeId<T> {}

impl<T> Hash for NodeId<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.builder.hash(state);
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for NodeId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NodeId({}@g{} of #{})",
            self.index, self.generation, self.builder
        )
    }
}

/// Snapshot of builder state taken by [`NodeBuilder::save_checkpoint`].
///
/// Must be handed back to [`NodeBuilder::restore`] or [`NodeBuilder::commit`].
/// A checkpoint that is simply dropped stays open, and outer checkpoints can
/// no longer be closed.
#[must_use = "a checkpoint must be restored or committed"]
#[derive(Debug, PartialEq, Eq)]
pub struct Checkpoint {
    builder: u32,
    depth: usize,
    cursor: usize,
    arena_count: usize,
    node_count: usize,
}

impl Checkpoint {
    /// Nodes that survive a restore to this checkpoint.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Arenas that survive a restore to this checkpoint.
    pub fn arena_count(&self) -> usize {
        self.arena_count
    }

    /// Bytes used in the then-current arena.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Nesting depth, 1 for the outermost checkpoint.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// One fixed-capacity block.
struct Arena {
    storage: Bump,
    capacity: usize,
    used: usize,
}

impl Arena {
    fn new(capacity: usize) -> Self {
        Self {
            storage: Bump::with_capacity(capacity),
            capacity,
            used: 0,
        }
    }

    /// Account for a value of `layout` at the cursor. Returns false when it
    /// would cross the end of the block.
    fn reserve(&mut self, layout: Layout) -> bool {
        let start = align_up(self.used, layout.align());
        match start.checked_add(layout.size()) {
            Some(end) if end <= self.capacity => {
                self.used = end;
                true
            }
            _ => false,
        }
    }
}

/// Tracking entry for one live node.
struct NodeRecord {
    ptr: NonNull<u8>,
    drop_fn: Option<unsafe fn(NonNull<u8>)>,
    type_id: TypeId,
    type_name: &'static str,
    generation: u32,
}

/// # Safety
/// `ptr` must point to a live, initialized `T` that is never used again.
unsafe fn drop_node<T>(ptr: NonNull<u8>) {
    std::ptr::drop_in_place(ptr.cast::<T>().as_ptr());
}

/// Arena allocator for IR/AST nodes with transactional rollback.
///
/// A builder is owned by a single parse or compilation task. It is neither
/// `Send` nor `Sync`.
pub struct NodeBuilder {
    id: u32,
    arena_size: usize,
    arenas: Vec<Arena>,
    nodes: Vec<NodeRecord>,
    generation: u32,
    open_checkpoints: usize,
    stats: BuilderStats,
}

impl NodeBuilder {
    /// Create a builder with [`DEFAULT_ARENA_SIZE`]-byte arenas.
    pub fn new() -> Self {
        Self::with_arena_size(DEFAULT_ARENA_SIZE)
    }

    /// Create a builder whose arenas hold `arena_size` bytes each.
    ///
    /// No arena is allocated until the first node or checkpoint needs one.
    pub fn with_arena_size(arena_size: usize) -> Self {
        assert!(arena_size > 0, "Arena size must be non-zero");

        Self {
            id: NEXT_BUILDER_ID.fetch_add(1, Ordering::Relaxed),
            arena_size,
            arenas: Vec::new(),
            nodes: Vec::new(),
            generation: 0,
            open_checkpoints: 0,
            stats: BuilderStats::default(),
        }
    }

    /// Allocate `value` as a new node.
    ///
    /// # Panics
    /// Panics when `T` is larger than one arena.
    pub fn allocate<T: 'static>(&mut self, value: T) -> NodeId<T> {
        match self.try_allocate(value) {
            Ok(id) => id,
            Err(err) => panic!("{err}"),
        }
    }

    /// Allocate `value` as a new node, reporting oversized node types as an error.
    pub fn try_allocate<T: 'static>(&mut self, value: T) -> BuilderResult<NodeId<T>> {
        let layout = Layout::new::<T>();
        if layout.size() > self.arena_size {
            return Err(BuilderError::OutOfArenaCapacity {
                size: layout.size(),
                align: layout.align(),
                capacity: self.arena_size,
            });
        }

        let fits = match self.arenas.last_mut() {
            Some(arena) => arena.reserve(layout),
            None => false,
        };
        if !fits {
            let reserved = self.push_arena().reserve(layout);
            debug_assert!(reserved, "fresh arena must fit a node no larger than itself");
        }

        let arena = &self.arenas[self.arenas.len() - 1];
        let ptr = NonNull::from(arena.storage.alloc(value)).cast::<u8>();

        let index = self.nodes.len() as u32;
        let drop_fn = if std::mem::needs_drop::<T>() {
            Some(drop_node::<T> as unsafe fn(NonNull<u8>))
        } else {
            None
        };
        self.nodes.push(NodeRecord {
            ptr,
            drop_fn,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            generation: self.generation,
        });

        self.stats.record_node(type_name::<T>(), layout.size());
        log::trace!(
            "Allocated {} node #{} ({} bytes) in arena {}",
            type_name::<T>(),
            index,
            layout.size(),
            self.arenas.len() - 1
        );

        Ok(NodeId {
            builder: self.id,
            index,
            generation: self.generation,
            _ty: PhantomData,
        })
    }

    /// Resolve a handle. Returns `None` for handles rolled back by a restore
    /// and for handles issued by another builder.
    pub fn get<T: 'static>(&self, id: NodeId<T>) -> Option<&T> {
        let record = self.record_for(id)?;
        // SAFETY: the record is tracked, so the node is initialized and its
        // arena is alive; the type id matched, and `&self` keeps it shared.
        Some(unsafe { record.ptr.cast::<T>().as_ref() })
    }

    /// Resolve a handle mutably.
    pub fn get_mut<T: 'static>(&mut self, id: NodeId<T>) -> Option<&mut T> {
        let record = self.record_for(id)?;
        // SAFETY: as in `get`; `&mut self` guarantees exclusive access.
        Some(unsafe { record.ptr.cast::<T>().as_mut() })
    }

    /// Check whether a handle still names a live node.
    pub fn is_live<T: 'static>(&self, id: NodeId<T>) -> bool {
        self.record_for(id).is_some()
    }

    fn record_for<T: 'static>(&self, id: NodeId<T>) -> Option<&NodeRecord> {
        if id.builder != self.id {
            return None;
        }
        let record = self.nodes.get(id.index as usize)?;
        (record.generation == id.generation && record.type_id == TypeId::of::<T>())
            .then_some(record)
    }

    /// Snapshot the builder and start a fresh arena.
    ///
    /// Everything allocated after this call lands in the new arena (or later
    /// ones), so a restore only ever drops whole arenas.
    pub fn save_checkpoint(&mut self) -> Checkpoint {
        let checkpoint = Checkpoint {
            builder: self.id,
            depth: self.open_checkpoints + 1,
            cursor: self.arenas.last().map_or(0, |arena| arena.used),
            arena_count: self.arenas.len(),
            node_count: self.nodes.len(),
        };

        self.push_arena();
        self.open_checkpoints += 1;
        self.stats.checkpoints_taken += 1;

        log::debug!(
            "Checkpoint depth {} at {} nodes, {} arenas (cursor {})",
            checkpoint.depth,
            checkpoint.node_count,
            checkpoint.arena_count,
            checkpoint.cursor
        );
        checkpoint
    }

    /// Roll back to `checkpoint`.
    ///
    /// # Panics
    /// Panics when the checkpoint came from another builder or is not the
    /// innermost open checkpoint.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        if let Err(rejected) = self.try_restore(checkpoint) {
            panic!("{rejected}");
        }
    }

    /// Roll back to `checkpoint`: destroy the nodes allocated since, release
    /// the arenas appended since, and invalidate their handles.
    ///
    /// A rejected checkpoint is handed back untouched, still open on the
    /// builder that took it.
    pub fn try_restore(&mut self, checkpoint: Checkpoint) -> CheckpointResult {
        if let Err(error) = self.check_innermost(&checkpoint) {
            return Err(RejectedCheckpoint { checkpoint, error });
        }
        debug_assert!(checkpoint.node_count <= self.nodes.len());
        debug_assert!(checkpoint.arena_count <= self.arenas.len());

        let destroyed = self.destroy_nodes_from(checkpoint.node_count);
        let released = self.arenas.len() - checkpoint.arena_count;
        self.arenas.truncate(checkpoint.arena_count);
        if let Some(arena) = self.arenas.last_mut() {
            arena.used = checkpoint.cursor;
        }

        self.generation = self.generation.wrapping_add(1);
        self.open_checkpoints -= 1;
        self.stats.checkpoints_restored += 1;
        self.stats.arenas_released += released;

        log::debug!(
            "Restored checkpoint depth {}: destroyed {} nodes, released {} arenas",
            checkpoint.depth,
            destroyed,
            released
        );
        Ok(())
    }

    /// Close `checkpoint`, keeping everything allocated since.
    ///
    /// # Panics
    /// Same conditions as [`restore`](Self::restore).
    pub fn commit(&mut self, checkpoint: Checkpoint) {
        if let Err(rejected) = self.try_commit(checkpoint) {
            panic!("{rejected}");
        }
    }

    pub fn try_commit(&mut self, checkpoint: Checkpoint) -> CheckpointResult {
        if let Err(error) = self.check_innermost(&checkpoint) {
            return Err(RejectedCheckpoint { checkpoint, error });
        }
        self.open_checkpoints -= 1;
        self.stats.checkpoints_committed += 1;
        log::trace!("Committed checkpoint depth {}", checkpoint.depth);
        Ok(())
    }

    /// Run `f` speculatively: keep its nodes on `Ok`, roll them back on `Err`.
    pub fn speculate<R, E, F>(&mut self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut Self) -> Result<R, E>,
    {
        let checkpoint = self.save_checkpoint();
        let result = f(self);
        if result.is_ok() {
            self.commit(checkpoint);
        } else {
            self.restore(checkpoint);
        }
        result
    }

    fn check_innermost(&self, checkpoint: &Checkpoint) -> BuilderResult<()> {
        if checkpoint.builder != self.id {
            return Err(BuilderError::ForeignCheckpoint {
                owner: checkpoint.builder,
                builder: self.id,
            });
        }
        if checkpoint.depth != self.open_checkpoints {
            return Err(BuilderError::CheckpointOutOfOrder {
                depth: checkpoint.depth,
                open: self.open_checkpoints,
            });
        }
        Ok(())
    }

    fn push_arena(&mut self) -> &mut Arena {
        self.arenas.push(Arena::new(self.arena_size));
        self.stats.arenas_allocated += 1;
        log::debug!(
            "Allocated arena {} ({} bytes)",
            self.arenas.len() - 1,
            self.arena_size
        );

        let last = self.arenas.len() - 1;
        &mut self.arenas[last]
    }

    /// Run destructors for nodes `start..`, newest first, and stop tracking them.
    fn destroy_nodes_from(&mut self, start: usize) -> usize {
        let mut destroyed = 0;
        for record in self.nodes.drain(start..).rev() {
            if let Some(drop_fn) = record.drop_fn {
                // SAFETY: the record was just removed from tracking, so this
                // is the only destructor call the node will ever get.
                unsafe { drop_fn(record.ptr) };
            }
            destroyed += 1;
        }
        self.stats.nodes_destroyed += destroyed;
        destroyed
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of arenas currently held.
    pub fn arena_count(&self) -> usize {
        self.arenas.len()
    }

    /// Capacity of each arena in bytes.
    pub fn arena_size(&self) -> usize {
        self.arena_size
    }

    /// Bytes used in the current arena.
    pub fn cursor(&self) -> usize {
        self.arenas.last().map_or(0, |arena| arena.used)
    }

    /// Number of checkpoints taken and not yet closed.
    pub fn open_checkpoints(&self) -> usize {
        self.open_checkpoints
    }

    /// Type names of the live nodes in allocation order.
    pub fn node_kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.nodes.iter().map(|record| record.type_name)
    }

    /// Allocation statistics.
    pub fn stats(&self) -> &BuilderStats {
        &self.stats
    }
}

impl Default for NodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NodeBuilder {
    fn drop(&mut self) {
        let destroyed = self.destroy_nodes_from(0);
        if destroyed > 0 {
            log::trace!(
                "Builder #{} dropped {} nodes across {} arenas",
                self.id,
                destroyed,
                self.arenas.len()
            );
        }
    }
}

impl fmt::Debug for NodeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeBuilder")
            .field("id", &self.id)
            .field("arena_size", &self.arena_size)
            .field("arenas", &self.arenas.len())
            .field("nodes", &self.nodes.len())
            .field("generation", &self.generation)
            .field("open_checkpoints", &self.open_checkpoints)
            .finish()
    }
}

impl<T: 'static> Index<NodeId<T>> for NodeBuilder {
    type Output = T;

    fn index(&self, id: NodeId<T>) -> &T {
        match self.get(id) {
            Some(node) => node,
            None => panic!("stale node handle {id:?}"),
        }
    }
}

impl<T: 'static> IndexMut<NodeId<T>> for NodeBuilder {
    fn index_mut(&mut self, id: NodeId<T>) -> &mut T {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("stale node handle {id:?}"),
        }
    }
}

/// Node builder statistics.
#[derive(Debug, Default, Clone)]
pub struct BuilderStats {
    /// Nodes allocated over the builder's lifetime.
    pub nodes_allocated: usize,

    /// Nodes whose destructor has run.
    pub nodes_destroyed: usize,

    /// Bytes handed out to nodes (excluding alignment padding).
    pub bytes_allocated: usize,

    /// Arenas created.
    pub arenas_allocated: usize,

    /// Arenas released by restores.
    pub arenas_released: usize,

    pub checkpoints_taken: usize,
    pub checkpoints_restored: usize,
    pub checkpoints_committed: usize,

    /// Allocations per node type.
    pub node_counts: HashMap<&'static str, usize>,
}

impl BuilderStats {
    fn record_node(&mut self, kind: &'static str, size: usize) {
        self.nodes_allocated += 1;
        self.bytes_allocated += size;
        *self.node_counts.entry(kind).or_insert(0) += 1;
    }
}

impl fmt::Display for BuilderStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Node Builder Statistics:")?;
        writeln!(f, "  Nodes allocated: {}", self.nodes_allocated)?;
        writeln!(f, "  Nodes destroyed: {}", self.nodes_destroyed)?;
        writeln!(f, "  Bytes allocated: {}", self.bytes_allocated)?;
        writeln!(f, "  Arenas allocated: {}", self.arenas_allocated)?;
        writeln!(f, "  Arenas released: {}", self.arenas_released)?;
        writeln!(
            f,
            "  Checkpoints: {} taken, {} restored, {} committed",
            self.checkpoints_taken, self.checkpoints_restored, self.checkpoints_committed
        )?;

        if !self.node_counts.is_empty() {
            writeln!(f, "  Node breakdown:")?;
            let mut sorted: Vec<_> = self.node_counts.iter().collect();
            sorted.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

            for (kind, count) in sorted.into_iter().take(10) {
                writeln!(f, "    {}: {}", kind, count)?;
            }
        }

        Ok(())
    }
}

const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}
