//! x86-64 architecture-specific components.
//!
//! This module contains all x86-64 specific code:
//! - System V register conventions and callee-saved sets
//! - Stack frame layout built on the callee-save tables

pub mod calling_convention;
pub mod frame;

pub use calling_convention::{callee_save_convention, reg_name, CCInfo};
pub use frame::FrameLayout;
