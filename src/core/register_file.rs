//! Register identifiers and register sets.
//!
//! Registers are named by bank and id, the same way the register allocator
//! addresses them. [`RegBitSet`] is the plain membership bitmask; a
//! [`RegisterSet`] additionally records how wide each register's saved
//! value is, which is what frame bookkeeping needs.

use std::fmt;

/// Maximum number of register banks supported (GP, FP, etc.).
pub const MAX_REGISTER_BANKS: usize = 4;

/// Maximum number of registers per bank.
pub const MAX_REGISTERS_PER_BANK: usize = 64;

/// Type for register bank indices.
pub type RegBank = u8;

/// Type for register IDs within a bank.
pub type RegId = u8;

/// Bank holding general-purpose registers.
pub const GP_BANK: RegBank = 0;

/// Bank holding floating-point / vector registers.
pub const FP_BANK: RegBank = 1;

/// Combined register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AsmReg {
    pub bank: RegBank,
    pub id: RegId,
}

impl AsmReg {
    pub const fn new(bank: RegBank, id: RegId) -> Self {
        Self { bank, id }
    }

    /// General-purpose register `id`.
    pub const fn gp(id: RegId) -> Self {
        Self::new(GP_BANK, id)
    }

    /// Floating-point register `id`.
    pub const fn fp(id: RegId) -> Self {
        Self::new(FP_BANK, id)
    }

    fn in_range(&self) -> bool {
        (self.bank as usize) < MAX_REGISTER_BANKS && (self.id as usize) < MAX_REGISTERS_PER_BANK
    }
}

impl fmt::Display for AsmReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bank {
            GP_BANK => write!(f, "gp{}", self.id),
            FP_BANK => write!(f, "fp{}", self.id),
            bank => write!(f, "b{}r{}", bank, self.id),
        }
    }
}

/// Bit set for efficiently tracking register sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegBitSet {
    /// Bit mask for each register bank.
    banks: [u64; MAX_REGISTER_BANKS],
}

impl RegBitSet {
    /// Create empty register set.
    pub const fn new() -> Self {
        Self {
            banks: [0; MAX_REGISTER_BANKS],
        }
    }

    /// Create register set with the first `count` registers in bank marked.
    pub fn all_in_bank(bank: RegBank, count: u8) -> Self {
        let mut set = Self::new();
        if (bank as usize) < MAX_REGISTER_BANKS {
            set.banks[bank as usize] = match count {
                0 => 0,
                64..=u8::MAX => u64::MAX,
                n => (1u64 << n) - 1,
            };
        }
        set
    }

    /// Check if register is set.
    pub fn contains(&self, reg: AsmReg) -> bool {
        if !reg.in_range() {
            return false;
        }
        (self.banks[reg.bank as usize] & (1u64 << reg.id)) != 0
    }

    /// Set a register.
    pub fn set(&mut self, reg: AsmReg) {
        if reg.in_range() {
            self.banks[reg.bank as usize] |= 1u64 << reg.id;
        }
    }

    /// Clear a register.
    pub fn clear(&mut self, reg: AsmReg) {
        if reg.in_range() {
            self.banks[reg.bank as usize] &= !(1u64 << reg.id);
        }
    }

    /// Set union with another set.
    pub fn union(&mut self, other: &RegBitSet) {
        for i in 0..MAX_REGISTER_BANKS {
            self.banks[i] |= other.banks[i];
        }
    }

    /// Count number of set registers in bank.
    pub fn count_in_bank(&self, bank: RegBank) -> u32 {
        if bank as usize >= MAX_REGISTER_BANKS {
            return 0;
        }
        self.banks[bank as usize].count_ones()
    }

    /// Total number of set registers.
    pub fn len(&self) -> usize {
        self.banks.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.iter().all(|&b| b == 0)
    }

    /// Iterate set registers, bank by bank, lowest id first.
    pub fn iter(&self) -> impl Iterator<Item = AsmReg> + '_ {
        self.banks.iter().enumerate().flat_map(|(bank, &mask)| {
            BitIter(mask).map(move |id| AsmReg::new(bank as RegBank, id))
        })
    }
}

impl Default for RegBitSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<AsmReg> for RegBitSet {
    fn from_iter<I: IntoIterator<Item = AsmReg>>(iter: I) -> Self {
        let mut set = Self::new();
        for reg in iter {
            set.set(reg);
        }
        set
    }
}

struct BitIter(u64);

impl Iterator for BitIter {
    type Item = RegId;

    fn next(&mut self) -> Option<RegId> {
        if self.0 == 0 {
            return None;
        }
        let id = self.0.trailing_zeros() as RegId;
        self.0 &= self.0 - 1;
        Some(id)
    }
}

/// How many bytes of a register have to be preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Width {
    /// Scalar GPR or the low half of a vector register.
    W64,
    /// Full 128-bit vector register.
    W128,
}

impl Width {
    pub const fn bytes(self) -> u32 {
        match self {
            Width::W64 => 8,
            Width::W128 => 16,
        }
    }

    /// Slots are naturally aligned.
    pub const fn alignment(self) -> u32 {
        self.bytes()
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Width::W64 => f.write_str("w64"),
            Width::W128 => f.write_str("w128"),
        }
    }
}

/// A set of registers together with the width each one is saved at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RegisterSet {
    members: RegBitSet,
    /// Members that need their full 128 bits preserved.
    wide: RegBitSet,
}

impl RegisterSet {
    pub const fn new() -> Self {
        Self {
            members: RegBitSet::new(),
            wide: RegBitSet::new(),
        }
    }

    /// Add a register. Re-adding a register overwrites its width.
    pub fn add(&mut self, reg: AsmReg, width: Width) {
        self.members.set(reg);
        match width {
            Width::W64 => self.wide.clear(reg),
            Width::W128 => self.wide.set(reg),
        }
    }

    pub fn with(mut self, reg: AsmReg, width: Width) -> Self {
        self.add(reg, width);
        self
    }

    pub fn remove(&mut self, reg: AsmReg) {
        self.members.clear(reg);
        self.wide.clear(reg);
    }

    pub fn contains(&self, reg: AsmReg) -> bool {
        self.members.contains(reg)
    }

    /// Width the register is saved at, if it is a member.
    pub fn width_of(&self, reg: AsmReg) -> Option<Width> {
        if !self.members.contains(reg) {
            return None;
        }
        Some(if self.wide.contains(reg) {
            Width::W128
        } else {
            Width::W64
        })
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Plain membership mask.
    pub fn bits(&self) -> &RegBitSet {
        &self.members
    }

    /// Iterate members in canonical order (bank ascending, then id ascending).
    pub fn iter(&self) -> impl Iterator<Item = (AsmReg, Width)> + '_ {
        self.members.iter().map(move |reg| {
            let width = if self.wide.contains(reg) {
                Width::W128
            } else {
                Width::W64
            };
            (reg, width)
        })
    }

    /// Bytes needed to store every member back to back at natural alignment.
    pub fn size_of_saved_area(&self) -> u32 {
        let mut end = 0u32;
        let mut max_align = 1u32;
        for (_, width) in self.iter() {
            end = align_up(end, width.alignment()) + width.bytes();
            max_align = max_align.max(width.alignment());
        }
        align_up(end, max_align)
    }
}

impl FromIterator<(AsmReg, Width)> for RegisterSet {
    fn from_iter<I: IntoIterator<Item = (AsmReg, Width)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (reg, width) in iter {
            set.add(reg, width);
        }
        set
    }
}

/// Align a value up to the specified power-of-two alignment.
pub(crate) const fn align_up(value: u32, align: u32) -> u32 {
    (value + align - 1) & !(align - 1)
}
