// This module describes the System V AMD64 ABI register conventions that frame bookkeeping
// needs on x86-64 Linux/Unix systems. CCInfo records which registers are allocatable, which are
// used for argument passing (RDI, RSI, RDX, RCX, R8, R9 and XMM0-XMM7), and which the callee must
// preserve (RBX, R12-R15; no XMM register is callee-saved under System V). From that description
// it derives the CalleeSaveConvention the register catalog consumes: the optimizing tier saves
// the full callee-saved set, while the baseline tier only saves the four registers it pins its
// interpreter state in (R12-R15). Register names are provided for diffable table dumps.

//! System V x86-64 register conventions.

use crate::core::catalog::CalleeSaveConvention;
use crate::core::register_file::{AsmReg, RegBitSet, RegisterSet, Width, FP_BANK, GP_BANK};

pub const RAX: AsmReg = AsmReg::gp(0);
pub const RCX: AsmReg = AsmReg::gp(1);
pub const RDX: AsmReg = AsmReg::gp(2);
pub const RBX: AsmReg = AsmReg::gp(3);
pub const RSP: AsmReg = AsmReg::gp(4);
pub const RBP: AsmReg = AsmReg::gp(5);
pub const RSI: AsmReg = AsmReg::gp(6);
pub const RDI: AsmReg = AsmReg::gp(7);
pub const R8: AsmReg = AsmReg::gp(8);
pub const R9: AsmReg = AsmReg::gp(9);
pub const R12: AsmReg = AsmReg::gp(12);
pub const R13: AsmReg = AsmReg::gp(13);
pub const R14: AsmReg = AsmReg::gp(14);
pub const R15: AsmReg = AsmReg::gp(15);

/// XMM register `n`.
pub const fn xmm(n: u8) -> AsmReg {
    AsmReg::fp(n)
}

/// System V x86-64 GP argument registers.
pub const GP_ARG_REGS: [AsmReg; 6] = [RDI, RSI, RDX, RCX, R8, R9];

/// Callee-saved GP registers, in canonical order.
pub const CALLEE_SAVED_GPRS: [AsmReg; 5] = [RBX, R12, R13, R14, R15];

/// Registers the baseline tier pins its state in.
pub const BASELINE_PINNED_GPRS: [AsmReg; 4] = [R12, R13, R14, R15];

const GPR_NAMES: [&str; 16] = [
    "rax", "rcx", "rdx", "rbx", "rsp", "rbp", "rsi", "rdi", "r8", "r9", "r10", "r11", "r12",
    "r13", "r14", "r15",
];

const XMM_NAMES: [&str; 16] = [
    "xmm0", "xmm1", "xmm2", "xmm3", "xmm4", "xmm5", "xmm6", "xmm7", "xmm8", "xmm9", "xmm10",
    "xmm11", "xmm12", "xmm13", "xmm14", "xmm15",
];

/// Information about a calling convention.
#[derive(Debug, Clone)]
pub struct CCInfo {
    /// Registers available for allocation.
    pub allocatable_regs: RegBitSet,
    /// Registers that must be preserved by callee, with their save width.
    pub callee_saved_regs: RegisterSet,
    /// Registers used for argument passing.
    pub arg_regs: RegBitSet,
}

impl CCInfo {
    /// The System V x86-64 register description.
    pub fn sysv() -> Self {
        // Build allocatable register set (all except RSP, RBP)
        let mut allocatable = RegBitSet::new();
        for i in 0..16 {
            let reg = AsmReg::gp(i);
            if reg != RSP && reg != RBP {
                allocatable.set(reg);
            }
        }
        allocatable.union(&RegBitSet::all_in_bank(FP_BANK, 16));

        let callee_saved = CALLEE_SAVED_GPRS
            .iter()
            .map(|&reg| (reg, Width::W64))
            .collect();

        let mut arg_regs: RegBitSet = GP_ARG_REGS.iter().copied().collect();
        for i in 0..8 {
            arg_regs.set(xmm(i));
        }

        Self {
            allocatable_regs: allocatable,
            callee_saved_regs: callee_saved,
            arg_regs,
        }
    }
}

/// Assembly name of an x86-64 register.
pub fn reg_name(reg: AsmReg) -> Option<&'static str> {
    let names: &[&'static str] = match reg.bank {
        GP_BANK => &GPR_NAMES,
        FP_BANK => &XMM_NAMES,
        _ => return None,
    };
    names.get(reg.id as usize).copied()
}

/// Callee-save sets of both tiers.
pub fn callee_save_convention() -> CalleeSaveConvention {
    let cc_info = CCInfo::sysv();
    let baseline = BASELINE_PINNED_GPRS
        .iter()
        .map(|&reg| (reg, Width::W64))
        .collect();

    CalleeSaveConvention {
        name: "sysv-x86-64",
        baseline,
        optimizing: cc_info.callee_saved_regs,
        reg_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::RegisterCatalog;

    #[test]
    fn test_sysv_cc_info() {
        let info = CCInfo::sysv();
        assert!(!info.allocatable_regs.contains(RSP));
        assert!(!info.allocatable_regs.contains(RBP));
        assert!(info.allocatable_regs.contains(xmm(15)));
        assert_eq!(info.allocatable_regs.len(), 30);
        assert_eq!(info.allocatable_regs.count_in_bank(FP_BANK), 16);
        assert_eq!(info.callee_saved_regs.len(), 5);
        assert!(!info.callee_saved_regs.contains(xmm(6)));
        assert_eq!(info.arg_regs.len(), 14);
        assert!(info.arg_regs.contains(RDI));
    }

    #[test]
    fn test_baseline_is_subset_of_optimizing() {
        let convention = callee_save_convention();
        for (reg, width) in convention.baseline.iter() {
            assert_eq!(convention.optimizing.width_of(reg), Some(width));
        }
    }

    #[test]
    fn test_optimizing_table_layout() {
        let catalog = RegisterCatalog::new(callee_save_convention());
        let table = catalog.optimizing_callee_saves();

        let layout: Vec<_> = table
            .iter()
            .map(|entry| (catalog.register_name(entry.reg()), entry.offset()))
            .collect();
        assert_eq!(
            layout,
            vec![
                ("rbx".to_string(), -40),
                ("r12".to_string(), -32),
                ("r13".to_string(), -24),
                ("r14".to_string(), -16),
                ("r15".to_string(), -8),
            ]
        );
        assert_eq!(table.size_of_area_in_bytes(), 40);
    }

    #[test]
    fn test_baseline_table_layout() {
        let catalog = RegisterCatalog::new(callee_save_convention());
        let table = catalog.baseline_callee_saves();
        assert_eq!(table.register_count(), 4);
        assert_eq!(table.find(R12).map(|e| e.offset()), Some(-32));
        assert_eq!(table.index_of(RBX), None);
    }

    #[test]
    fn test_reg_names() {
        assert_eq!(reg_name(RBX), Some("rbx"));
        assert_eq!(reg_name(xmm(8)), Some("xmm8"));
        assert_eq!(reg_name(AsmReg::gp(20)), None);
    }
}
