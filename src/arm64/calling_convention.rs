// This module describes the AAPCS64 (ARM Architecture Procedure Call Standard) register
// conventions frame bookkeeping needs on AArch64. X19-X28 are callee-saved general-purpose
// registers; X29 (frame pointer) and X30 (link register) are saved by the frame record and are
// not part of the table. Of the SIMD registers only the low 64 bits of V8-V15 (D8-D15) must be
// preserved, so they are saved at 64-bit width. The optimizing tier saves the whole set; the
// baseline tier saves the four registers it pins its interpreter state in (X25-X28).

//! AAPCS64 register conventions.

use crate::core::catalog::CalleeSaveConvention;
use crate::core::register_file::{AsmReg, RegisterSet, Width, FP_BANK, GP_BANK};

/// General-purpose register `xN`.
pub const fn x(n: u8) -> AsmReg {
    AsmReg::gp(n)
}

/// SIMD/FP register `vN`.
pub const fn v(n: u8) -> AsmReg {
    AsmReg::fp(n)
}

pub const FP: AsmReg = x(29);
pub const LR: AsmReg = x(30);

const GPR_NAMES: [&str; 31] = [
    "x0", "x1", "x2", "x3", "x4", "x5", "x6", "x7", "x8", "x9", "x10", "x11", "x12", "x13", "x14",
    "x15", "x16", "x17", "x18", "x19", "x20", "x21", "x22", "x23", "x24", "x25", "x26", "x27",
    "x28", "fp", "lr",
];

const FPR_NAMES: [&str; 32] = [
    "d0", "d1", "d2", "d3", "d4", "d5", "d6", "d7", "d8", "d9", "d10", "d11", "d12", "d13", "d14",
    "d15", "d16", "d17", "d18", "d19", "d20", "d21", "d22", "d23", "d24", "d25", "d26", "d27",
    "d28", "d29", "d30", "d31",
];

/// Assembly name of an AArch64 register.
pub fn reg_name(reg: AsmReg) -> Option<&'static str> {
    let names: &[&'static str] = match reg.bank {
        GP_BANK => &GPR_NAMES,
        FP_BANK => &FPR_NAMES,
        _ => return None,
    };
    names.get(reg.id as usize).copied()
}

/// Callee-save sets of both tiers.
pub fn callee_save_convention() -> CalleeSaveConvention {
    let mut optimizing = RegisterSet::new();
    for n in 19..=28 {
        optimizing.add(x(n), Width::W64);
    }
    for n in 8..=15 {
        optimizing.add(v(n), Width::W64);
    }

    let baseline = (25..=28).map(|n| (x(n), Width::W64)).collect();

    CalleeSaveConvention {
        name: "aapcs64",
        baseline,
        optimizing,
        reg_name,
    }
}
