//! ARM64/AArch64 components.
//!
//! This module contains the AArch64 specific register description:
//! - AAPCS64 callee-saved registers for both tiers
//! - Register names for table dumps

pub mod calling_convention;

pub use calling_convention::{callee_save_convention, reg_name};
