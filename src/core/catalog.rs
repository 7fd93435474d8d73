//! Canonical callee-save tables.
//!
//! Every target has two process-wide save sets: the one the baseline tier
//! keeps its pinned values in, and the full callee-save set the optimizing
//! tier preserves. A [`RegisterCatalog`] turns an injected
//! [`CalleeSaveConvention`] into frame-pointer based
//! [`RegisterAtOffsetList`]s, each built once on first use and immutable
//! afterwards. Code generators that need to shift a table clone it first.

use super::register_at_offset::{OffsetBase, RegisterAtOffsetList};
use super::register_file::{AsmReg, RegisterSet};
use std::fmt;
use std::sync::OnceLock;

/// Code generation tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Baseline,
    Optimizing,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Baseline => f.write_str("baseline"),
            Tier::Optimizing => f.write_str("optimizing"),
        }
    }
}

/// Supported targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    X86_64,
    Aarch64,
}

impl Target {
    /// Target this process runs on; anything but AArch64 maps to x86-64.
    pub fn host() -> Self {
        if cfg!(target_arch = "aarch64") {
            Target::Aarch64
        } else {
            Target::X86_64
        }
    }
}

/// Platform description a catalog is built from.
#[derive(Debug, Clone)]
pub struct CalleeSaveConvention {
    /// Human readable convention name, e.g. "sysv-x86-64".
    pub name: &'static str,
    /// Registers the baseline tier saves.
    pub baseline: RegisterSet,
    /// Registers the optimizing tier saves.
    pub optimizing: RegisterSet,
    /// Assembly name of a register, used for dumps.
    pub reg_name: fn(AsmReg) -> Option<&'static str>,
}

/// Lazily built canonical tables for one convention.
pub struct RegisterCatalog {
    convention: CalleeSaveConvention,
    baseline: OnceLock<RegisterAtOffsetList>,
    optimizing: OnceLock<RegisterAtOffsetList>,
}

impl RegisterCatalog {
    pub fn new(convention: CalleeSaveConvention) -> Self {
        Self {
            convention,
            baseline: OnceLock::new(),
            optimizing: OnceLock::new(),
        }
    }

    /// Process-wide catalog for `target`, constructed on first access.
    pub fn for_target(target: Target) -> &'static RegisterCatalog {
        static X86_64: OnceLock<RegisterCatalog> = OnceLock::new();
        static AARCH64: OnceLock<RegisterCatalog> = OnceLock::new();

        match target {
            Target::X86_64 => X86_64.get_or_init(|| {
                RegisterCatalog::new(crate::x64::calling_convention::callee_save_convention())
            }),
            Target::Aarch64 => AARCH64.get_or_init(|| {
                RegisterCatalog::new(crate::arm64::calling_convention::callee_save_convention())
            }),
        }
    }

    pub fn convention(&self) -> &CalleeSaveConvention {
        &self.convention
    }

    /// Table of the baseline tier's saved registers.
    pub fn baseline_callee_saves(&self) -> &RegisterAtOffsetList {
        self.baseline
            .get_or_init(|| self.build(Tier::Baseline, &self.convention.baseline))
    }

    /// Table of the optimizing tier's saved registers.
    pub fn optimizing_callee_saves(&self) -> &RegisterAtOffsetList {
        self.optimizing
            .get_or_init(|| self.build(Tier::Optimizing, &self.convention.optimizing))
    }

    pub fn callee_saves(&self, tier: Tier) -> &RegisterAtOffsetList {
        match tier {
            Tier::Baseline => self.baseline_callee_saves(),
            Tier::Optimizing => self.optimizing_callee_saves(),
        }
    }

    /// Assembly name of `reg`, falling back to the generic bank/id form.
    pub fn register_name(&self, reg: AsmReg) -> String {
        match (self.convention.reg_name)(reg) {
            Some(name) => name.to_string(),
            None => reg.to_string(),
        }
    }

    fn build(&self, tier: Tier, set: &RegisterSet) -> RegisterAtOffsetList {
        log::debug!(
            "Building {} callee-save table for {}",
            tier,
            self.convention.name
        );
        RegisterAtOffsetList::new(set, OffsetBase::FramePointerBased)
    }
}

impl fmt::Debug for RegisterCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterCatalog")
            .field("convention", &self.convention.name)
            .field("baseline_built", &self.baseline.get().is_some())
            .field("optimizing_built", &self.optimizing.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::register_file::Width;

    fn toy_convention() -> CalleeSaveConvention {
        CalleeSaveConvention {
            name: "toy",
            baseline: RegisterSet::new().with(AsmReg::gp(1), Width::W64),
            optimizing: RegisterSet::new()
                .with(AsmReg::gp(1), Width::W64)
                .with(AsmReg::gp(2), Width::W64)
                .with(AsmReg::fp(0), Width::W128),
            reg_name: |reg| (reg == AsmReg::gp(1)).then_some("r1"),
        }
    }

    #[test]
    fn test_tables_built_lazily_once() {
        let catalog = RegisterCatalog::new(toy_convention());
        assert!(catalog.baseline.get().is_none());

        let first = catalog.baseline_callee_saves() as *const _;
        let second = catalog.baseline_callee_saves() as *const _;
        assert_eq!(first, second);
        assert!(catalog.optimizing.get().is_none());
    }

    #[test]
    fn test_tables_are_frame_pointer_based() {
        let catalog = RegisterCatalog::new(toy_convention());
        let table = catalog.callee_saves(Tier::Optimizing);
        let offsets: Vec<_> = table.iter().map(|e| e.offset()).collect();
        assert_eq!(offsets, vec![-32, -24, -16]);
        assert_eq!(table.size_of_area_in_bytes(), 32);
    }

    #[test]
    fn test_register_name_fallback() {
        let catalog = RegisterCatalog::new(toy_convention());
        assert_eq!(catalog.register_name(AsmReg::gp(1)), "r1");
        assert_eq!(catalog.register_name(AsmReg::gp(2)), "gp2");
    }

    #[test]
    fn test_shared_catalog_is_process_wide() {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| {
                    let table = RegisterCatalog::for_target(Target::X86_64).optimizing_callee_saves();
                    table as *const RegisterAtOffsetList as usize
                })
            })
            .collect();
        let addrs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(addrs.windows(2).all(|pair| pair[0] == pair[1]));
    }
}
