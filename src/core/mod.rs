// This module serves as the central hub for irframe's core infrastructure, the pieces every
// compiler backend needs regardless of IR or target. It exports and organizes the key
// subsystems: node building (fixed-size arenas with checkpoint/restore and typed node handles),
// register primitives (bank/id registers, bitmask sets, sets with per-register save widths),
// register placement tables (dense, deterministic callee-save slot assignment with uniform
// offset adjustment), the register catalog (per-target canonical tables built once on first
// use), and the error types shared by all of them. Target-specific descriptions live in the
// x64 and arm64 modules and feed the catalog through CalleeSaveConvention.

//! Core irframe infrastructure
//!
//! # Key Components
//!
//! ## Node Building (`node_builder`)
//! - Arena allocation backed by `bumpalo`
//! - Checkpoint/restore for speculative parsing
//! - Generation-checked node handles
//!
//! ## Registers (`register_file`)
//! - Bank/id register identifiers and bitsets
//! - Register sets carrying save widths
//!
//! ## Register Placement (`register_at_offset`)
//! - Deterministic slot assignment for callee-saved registers
//! - Frame-pointer based or zero-based offsets
//!
//! ## Canonical Tables (`catalog`)
//! - Baseline and optimizing tier callee-save tables per target

pub mod catalog;
pub mod error;
pub mod node_builder;
pub mod register_at_offset;
pub mod register_file;
pub mod test_utils;

pub use node_builder::{BuilderStats, Checkpoint, NodeBuilder, NodeId, DEFAULT_ARENA_SIZE};

pub use register_file::{AsmReg, RegBank, RegBitSet, RegId, RegisterSet, Width, FP_BANK, GP_BANK};

pub use register_at_offset::{OffsetBase, RegisterAtOffset, RegisterAtOffsetList};

pub use catalog::{CalleeSaveConvention, RegisterCatalog, Target, Tier};

pub use error::{
    BuilderError, BuilderResult, CheckpointResult, RegisterError, RegisterResult,
    RejectedCheckpoint,
};
