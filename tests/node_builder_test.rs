//! Integration tests for the arena node builder.
//!
//! Covers arena growth, checkpoint/restore exactness and destructor
//! completeness, both on fixed scenarios and on generated allocation
//! sequences.

use irframe::core::{NodeBuilder, NodeId};
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

#[repr(align(8))]
struct Node16([u8; 16]);

#[repr(align(8))]
struct Node32([u8; 32]);

/// IR-ish node with children referenced by handle.
#[derive(Debug)]
enum Expr {
    Const(i64),
    Add(NodeId<Expr>, NodeId<Expr>),
}

/// Counts destructor calls per node id.
#[derive(Clone, Default)]
struct DropLog(Rc<RefCell<Vec<usize>>>);

impl DropLog {
    fn count_for(&self, id: usize) -> usize {
        self.0.borrow().iter().filter(|&&d| d == id).count()
    }

    fn total(&self) -> usize {
        self.0.borrow().len()
    }
}

struct Tracked {
    id: usize,
    log: DropLog,
    _payload: [u64; 2],
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.log.0.borrow_mut().push(self.id);
    }
}

/// Polymorphic node behind a trait object, boxed inside the arena slot.
trait Describe {
    fn describe(&self) -> String;
}

struct Named(String, DropLog, usize);

impl Describe for Named {
    fn describe(&self) -> String {
        self.0.clone()
    }
}

impl Drop for Named {
    fn drop(&mut self) {
        self.1 .0.borrow_mut().push(self.2);
    }
}

#[test]
fn test_three_nodes_in_48_byte_arenas() {
    let mut builder = NodeBuilder::with_arena_size(48);
    let a = builder.allocate(Node16([0xA; 16]));
    let b = builder.allocate(Node32([0xB; 32]));
    assert_eq!(builder.arena_count(), 1);

    let c = builder.allocate(Node16([0xC; 16]));
    assert_eq!(builder.arena_count(), 2);

    assert_eq!(builder[a].0, [0xA; 16]);
    assert_eq!(builder[b].0, [0xB; 32]);
    assert_eq!(builder[c].0, [0xC; 16]);
}

#[test]
fn test_restore_to_checkpoint_before_second_node() {
    let mut builder = NodeBuilder::with_arena_size(48);
    let a = builder.allocate(Node16([0xA; 16]));

    let checkpoint = builder.save_checkpoint();
    let arenas_after_checkpoint = builder.arena_count();
    let b = builder.allocate(Node32([0xB; 32]));
    let c = builder.allocate(Node16([0xC; 16]));
    assert_eq!(builder.node_count(), 3);

    builder.restore(checkpoint);
    assert_eq!(builder.node_count(), 1);
    assert_eq!(builder.arena_count(), 1);
    assert!(builder.is_live(a));
    assert!(!builder.is_live(b));
    assert!(!builder.is_live(c));

    // The surviving arena still has room for B.
    builder.allocate(Node32([0xD; 32]));
    assert!(builder.arena_count() <= arenas_after_checkpoint);
    assert_eq!(builder.arena_count(), 1);
}

#[test]
fn test_expression_tree_with_backtracking() {
    let mut builder = NodeBuilder::new();
    let one = builder.allocate(Expr::Const(1));
    let two = builder.allocate(Expr::Const(2));

    // Try parsing `1 + 2 + <error>`; the partial subtree is thrown away.
    let attempt: Result<NodeId<Expr>, String> = builder.speculate(|b| {
        let sum = b.allocate(Expr::Add(one, two));
        let _dangling = b.allocate(Expr::Add(sum, sum));
        Err("unexpected end of input".to_string())
    });
    assert!(attempt.is_err());
    assert_eq!(builder.node_count(), 2);

    let sum = builder.allocate(Expr::Add(one, two));
    let Expr::Add(lhs, rhs) = builder[sum] else {
        panic!("expected an add node");
    };
    assert!(matches!(builder[lhs], Expr::Const(1)));
    assert!(matches!(builder[rhs], Expr::Const(2)));
}

#[test]
fn test_trait_object_nodes_are_destroyed() {
    let log = DropLog::default();
    {
        let mut builder = NodeBuilder::new();
        let nodes: Vec<NodeId<Box<dyn Describe>>> = (0..3)
            .map(|i| {
                let node: Box<dyn Describe> = Box::new(Named(format!("n{i}"), log.clone(), i));
                builder.allocate(node)
            })
            .collect();
        assert_eq!(builder[nodes[1]].describe(), "n1");
    }
    assert_eq!(log.total(), 3);
}

#[test]
fn test_nested_checkpoints() {
    let log = DropLog::default();
    let mut builder = NodeBuilder::with_arena_size(128);
    let track = |id| Tracked {
        id,
        log: log.clone(),
        _payload: [0; 2],
    };

    builder.allocate(track(0));
    let outer = builder.save_checkpoint();
    builder.allocate(track(1));
    let inner = builder.save_checkpoint();
    builder.allocate(track(2));

    builder.restore(inner);
    assert_eq!(log.total(), 1);
    assert_eq!(log.count_for(2), 1);

    builder.allocate(track(3));
    builder.restore(outer);
    assert_eq!(log.count_for(1), 1);
    assert_eq!(log.count_for(3), 1);
    assert_eq!(builder.node_count(), 1);
    assert_eq!(builder.arena_count(), 1);

    drop(builder);
    assert_eq!(log.count_for(0), 1);
    assert_eq!(log.total(), 4);
}

#[derive(Debug, Clone)]
enum Op {
    Small,
    Large,
    Checkpoint,
    Restore,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => Just(Op::Small),
        2 => Just(Op::Large),
        1 => Just(Op::Checkpoint),
        1 => Just(Op::Restore),
    ]
}

proptest! {
    /// Allocations that fit in N arenas never create more than N.
    #[test]
    fn prop_arena_capacity(sizes in prop::collection::vec(prop::bool::ANY, 1..64)) {
        let mut builder = NodeBuilder::with_arena_size(64);
        let mut small = Vec::new();
        let mut large = Vec::new();
        let mut total = 0usize;

        for (i, is_large) in sizes.iter().enumerate() {
            if *is_large {
                large.push((builder.allocate(Node32([i as u8; 32])), i as u8));
                total += 32;
            } else {
                small.push((builder.allocate(Node16([i as u8; 16])), i as u8));
                total += 16;
            }
        }

        // 16 and 32 byte nodes can waste at most 16 bytes per 64-byte arena.
        let bound = total.div_ceil(48).max(1);
        prop_assert!(builder.arena_count() <= bound);
        for (id, tag) in small {
            prop_assert_eq!(builder[id].0, [tag; 16]);
        }
        for (id, tag) in large {
            prop_assert_eq!(builder[id].0, [tag; 32]);
        }
    }

    /// Restores keep exactly the nodes allocated before the checkpoint, and
    /// every destroyed node's destructor runs exactly once.
    #[test]
    fn prop_checkpoint_restore_exactness(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let log = DropLog::default();
        let mut next_id = 0usize;
        let mut live: Vec<usize> = Vec::new();
        let mut stack = Vec::new();

        {
            let mut builder = NodeBuilder::with_arena_size(96);
            for op in ops {
                match op {
                    Op::Small | Op::Large => {
                        builder.allocate(Tracked { id: next_id, log: log.clone(), _payload: [0; 2] });
                        if matches!(op, Op::Large) {
                            builder.allocate(Node32([0; 32]));
                        }
                        live.push(next_id);
                        next_id += 1;
                    }
                    Op::Checkpoint => {
                        let checkpoint = builder.save_checkpoint();
                        stack.push((checkpoint, live.len(), builder.arena_count()));
                    }
                    Op::Restore => {
                        if let Some((checkpoint, live_len, arenas_after)) = stack.pop() {
                            let kept = checkpoint.node_count();
                            builder.restore(checkpoint);
                            prop_assert_eq!(builder.node_count(), kept);
                            prop_assert!(builder.arena_count() < arenas_after);

                            for id in live.drain(live_len..) {
                                prop_assert_eq!(log.count_for(id), 1);
                            }

                            // Reuses the surviving arena or opens exactly one more.
                            let before = builder.arena_count();
                            builder.allocate(Node16([0; 16]));
                            prop_assert!(builder.arena_count() <= arenas_after.max(before + 1));
                        }
                    }
                }
            }
            while let Some((checkpoint, ..)) = stack.pop() {
                builder.commit(checkpoint);
            }
            for &id in &live {
                prop_assert_eq!(log.count_for(id), 0);
            }
        }

        for id in 0..next_id {
            prop_assert_eq!(log.count_for(id), 1);
        }
    }
}
