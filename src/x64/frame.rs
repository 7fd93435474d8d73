//! x86-64 stack frame layout.
//!
//! ```text
//! rbp + 8:  return address
//! rbp:      saved rbp
//! rbp - H:  header fields (inserted by the tier, e.g. a code block slot)
//! rbp - X:  saved callee-save registers
//! rbp - Y:  spill slots
//! ```
//!
//! The saved-register area starts out directly below the frame pointer.
//! Inserting header fields pushes it down, which is done by shifting a
//! private copy of the callee-save table.

use crate::core::register_at_offset::RegisterAtOffsetList;
use crate::core::register_file::align_up;
use bumpalo::{collections::Vec as BumpVec, Bump};

/// Stack frame of one function.
#[derive(Debug)]
pub struct FrameLayout<'a> {
    /// Callee-saved registers and their frame-pointer relative slots.
    saved_registers: RegisterAtOffsetList,
    /// Bytes of header fields between rbp and the saved registers.
    header_size: u32,
    /// Stack slot assignments for spilled values.
    spill_slots: BumpVec<'a, i32>,
    /// Lowest offset in use so far.
    spill_offset: i32,
}

impl<'a> FrameLayout<'a> {
    /// Create a frame that saves the registers of `callee_saves`.
    ///
    /// `callee_saves` must be frame-pointer based and unshifted, like the
    /// tables a [`RegisterCatalog`](crate::core::RegisterCatalog) hands out.
    /// The frame keeps its own copy.
    pub fn new(arena: &'a Bump, callee_saves: &RegisterAtOffsetList) -> Self {
        debug_assert!(
            callee_saves.iter().all(|entry| entry.offset() < 0),
            "callee-save table must be frame-pointer based"
        );
        Self {
            saved_registers: callee_saves.clone(),
            header_size: 0,
            spill_slots: BumpVec::new_in(arena),
            spill_offset: -(callee_saves.size_of_area_in_bytes() as i32),
        }
    }

    /// Insert `bytes` of fields directly below the frame pointer and return
    /// the offset of the first one. Rounded up to 8 bytes.
    ///
    /// # Panics
    /// Panics once spill slots have been handed out, as those would move.
    pub fn insert_header_fields(&mut self, bytes: u32) -> i32 {
        assert!(
            self.spill_slots.is_empty(),
            "header fields must be inserted before spill slots are allocated"
        );
        let bytes = align_up(bytes, 8);
        self.header_size += bytes;
        self.saved_registers.adjust_offsets(-(bytes as i32));
        self.spill_offset -= bytes as i32;

        log::trace!(
            "Inserted {} header bytes, saved registers now end at {}",
            bytes,
            -(self.header_size as i32)
        );
        -(self.header_size as i32)
    }

    /// Allocate a new spill slot and return its offset.
    pub fn allocate_spill_slot(&mut self, size: u32) -> i32 {
        let aligned_size = size.div_ceil(8) * 8; // Align to 8 bytes
        self.spill_offset -= aligned_size as i32;
        let offset = self.spill_offset;
        self.spill_slots.push(offset);
        offset
    }

    /// Registers to store in the prologue and reload in the epilogue.
    pub fn saved_registers(&self) -> &RegisterAtOffsetList {
        &self.saved_registers
    }

    pub fn header_size(&self) -> u32 {
        self.header_size
    }

    pub fn spill_slots(&self) -> &[i32] {
        &self.spill_slots
    }

    /// Bytes to subtract from rsp after `push rbp; mov rbp, rsp`.
    ///
    /// Keeps rsp 16-byte aligned as System V requires at call sites.
    pub fn frame_size(&self) -> u32 {
        align_up((-self.spill_offset) as u32, 16)
    }
}
