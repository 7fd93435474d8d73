//! irframe - IR node arenas and callee-save frame bookkeeping.
//!
//! irframe provides the two allocation-level building blocks a fast JIT
//! backend sits on: an arena node builder with transactional
//! checkpoint/restore for front ends, and register placement tables that
//! tell the code generator where each callee-saved register is spilled.
//!
//! # Primary Usage
//!
//! ```
//! use irframe::core::{RegisterCatalog, Target};
//!
//! let catalog = RegisterCatalog::for_target(Target::X86_64);
//! let mut table = catalog.optimizing_callee_saves().clone();
//! let size = table.size_of_area_in_bytes();
//!
//! // Make room for a 16-byte header between rbp and the saved registers.
//! table.adjust_offsets(-16);
//! assert_eq!(table.size_of_area_in_bytes(), size);
//! ```
//!
//! # Architecture
//!
//! - [`core`] - Node builder, register sets, placement tables, catalog
//! - [`x64`] - System V x86-64 conventions and frame layout
//! - [`arm64`] - AAPCS64 conventions

pub mod arm64;
pub mod core;
pub mod x64;

// Re-export common types from organized modules
pub use crate::core::{
    // Node building
    BuilderError, BuilderStats, Checkpoint, NodeBuilder, NodeId, RejectedCheckpoint,
    // Register placement
    AsmReg, OffsetBase, RegisterAtOffset, RegisterAtOffsetList, RegisterError, RegisterSet, Width,
    // Canonical tables
    CalleeSaveConvention, RegisterCatalog, Target, Tier,
};
