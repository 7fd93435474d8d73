//! Register placement tables.
//!
//! A [`RegisterAtOffsetList`] records where each register of a save set
//! lives in memory. The code generator walks it to emit prologue stores and
//! epilogue loads; frame layout shifts it when fields are inserted around
//! the saved-register area.
//!
//! Layout rules:
//! - registers are visited bank by bank, lowest id first
//! - each slot is aligned to its width and occupies `width` bytes
//! - the area size is the packed end rounded up to the widest slot
//! - [`OffsetBase::ZeroBased`] offsets start at 0 and grow upward
//! - [`OffsetBase::FramePointerBased`] offsets are the zero-based ones
//!   minus the area size, so the area spans `[-size, 0)` below the frame
//!   pointer, possibly with trailing padding

use super::error::{RegisterError, RegisterResult};
use super::register_file::{align_up, AsmReg, RegisterSet, Width};
use std::fmt;

/// Reference point the offsets of a table are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OffsetBase {
    /// Negative offsets below the frame pointer.
    FramePointerBased,
    /// Non-negative offsets from the start of the area.
    ZeroBased,
}

/// One register and the slot it is saved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterAtOffset {
    reg: AsmReg,
    offset: i32,
    width: Width,
}

impl RegisterAtOffset {
    pub const fn new(reg: AsmReg, offset: i32, width: Width) -> Self {
        Self { reg, offset, width }
    }

    pub fn reg(&self) -> AsmReg {
        self.reg
    }

    /// Byte offset from the table's reference point.
    pub fn offset(&self) -> i32 {
        self.offset
    }

    pub fn width(&self) -> Width {
        self.width
    }

    /// Slot size in bytes.
    pub fn size_in_bytes(&self) -> u32 {
        self.width.bytes()
    }

    /// Offset counted in 8-byte words; slots are always word aligned.
    pub fn offset_as_index(&self) -> i32 {
        self.offset / 8
    }
}

impl fmt::Display for RegisterAtOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {} ({})", self.reg, self.offset, self.width)
    }
}

/// Ordered, fixed-size table of saved registers and their offsets.
///
/// Entries are never added or removed after construction; the only
/// mutation is [`adjust_offsets`](Self::adjust_offsets).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegisterAtOffsetList {
    registers: Box<[RegisterAtOffset]>,
    size_of_area_in_bytes: u32,
}

impl RegisterAtOffsetList {
    /// Assign every register of `set` a slot.
    pub fn new(set: &RegisterSet, base: OffsetBase) -> Self {
        let size = set.size_of_saved_area();
        let start = match base {
            OffsetBase::FramePointerBased => -(size as i32),
            OffsetBase::ZeroBased => 0,
        };

        let mut cursor = 0u32;
        let registers: Box<[RegisterAtOffset]> = set
            .iter()
            .map(|(reg, width)| {
                cursor = align_up(cursor, width.alignment());
                let entry = RegisterAtOffset::new(reg, start + cursor as i32, width);
                cursor += width.bytes();
                entry
            })
            .collect();
        debug_assert!(cursor <= size);

        log::debug!(
            "Built {:?} register table: {} registers, {} bytes",
            base,
            registers.len(),
            size
        );

        Self {
            registers,
            size_of_area_in_bytes: size,
        }
    }

    /// An empty table.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn register_count(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// Span of the saved-register area. Not affected by `adjust_offsets`.
    pub fn size_of_area_in_bytes(&self) -> u32 {
        self.size_of_area_in_bytes
    }

    /// Entry at `index`.
    ///
    /// # Panics
    /// Panics when `index >= register_count()`.
    pub fn at(&self, index: usize) -> RegisterAtOffset {
        match self.try_at(index) {
            Ok(entry) => entry,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_at(&self, index: usize) -> RegisterResult<RegisterAtOffset> {
        self.registers
            .get(index)
            .copied()
            .ok_or(RegisterError::IndexOutOfRange {
                index,
                count: self.registers.len(),
            })
    }

    /// Look up the slot of `reg`, if it is saved.
    pub fn find(&self, reg: AsmReg) -> Option<&RegisterAtOffset> {
        self.index_of(reg).map(|index| &self.registers[index])
    }

    /// Position of `reg` in the table, if it is saved.
    pub fn index_of(&self, reg: AsmReg) -> Option<usize> {
        // Entries are in canonical order, which is (bank, id) order.
        self.registers
            .binary_search_by_key(&reg, |entry| entry.reg)
            .ok()
    }

    /// Shift every slot by `delta` bytes.
    ///
    /// # Panics
    /// Panics when a shifted offset does not fit in an `i32`; the table is
    /// left unchanged in that case.
    pub fn adjust_offsets(&mut self, delta: i32) {
        if let Err(err) = self.try_adjust_offsets(delta) {
            panic!("{err}");
        }
    }

    /// Shift every slot by `delta` bytes, or leave the table untouched and
    /// report the first offset that would overflow.
    pub fn try_adjust_offsets(&mut self, delta: i32) -> RegisterResult<()> {
        if let Some(entry) = self
            .registers
            .iter()
            .find(|entry| entry.offset.checked_add(delta).is_none())
        {
            return Err(RegisterError::OffsetOverflow {
                offset: entry.offset,
                delta,
            });
        }

        for entry in self.registers.iter_mut() {
            entry.offset += delta;
        }
        log::trace!(
            "Adjusted {} register offsets by {}",
            self.registers.len(),
            delta
        );
        Ok(())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RegisterAtOffset> {
        self.registers.iter()
    }

    /// The saved registers with their widths.
    pub fn registers(&self) -> RegisterSet {
        self.iter().map(|entry| (entry.reg, entry.width)).collect()
    }
}

impl<'a> IntoIterator for &'a RegisterAtOffsetList {
    type Item = &'a RegisterAtOffset;
    type IntoIter = std::slice::Iter<'a, RegisterAtOffset>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for RegisterAtOffsetList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, entry) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", entry)?;
        }
        write!(f, "}} size {}", self.size_of_area_in_bytes)
    }
}
