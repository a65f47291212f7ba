//! LC-3 CPU registers.
//!
//! The LC-3 has:
//! - R0..R7: eight 16-bit general-purpose registers
//! - PC: 16-bit program counter
//! - COND: condition register holding exactly one of N, Z, P

use crate::word::Word;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Address the program counter starts at.
pub const PC_START: Word = 0x3000;

/// A general-purpose register index, always in `0..=7`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Reg(u8);

/// A register index outside `0..=7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no such register: R{0}")]
pub struct InvalidRegister(pub u8);

impl Reg {
    pub const R0: Reg = Reg(0);
    pub const R1: Reg = Reg(1);
    pub const R2: Reg = Reg(2);
    pub const R3: Reg = Reg(3);
    pub const R4: Reg = Reg(4);
    pub const R5: Reg = Reg(5);
    pub const R6: Reg = Reg(6);
    pub const R7: Reg = Reg(7);

    /// Build from a 3-bit instruction field. Higher bits are discarded.
    #[inline]
    pub const fn from_field(bits: Word) -> Self {
        Reg((bits & 0b111) as u8)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for Reg {
    type Error = InvalidRegister;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        if index < 8 {
            Ok(Reg(index))
        } else {
            Err(InvalidRegister(index))
        }
    }
}

impl From<Reg> for u8 {
    fn from(reg: Reg) -> u8 {
        reg.0
    }
}

impl fmt::Debug for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// The condition register. Exactly one flag holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    Negative,
    Zero,
    Positive,
}

impl Condition {
    /// Classify a word by its two's-complement sign.
    #[inline]
    pub const fn of(value: Word) -> Self {
        if value >> 15 == 1 {
            Condition::Negative
        } else if value == 0 {
            Condition::Zero
        } else {
            Condition::Positive
        }
    }

    /// The NZP bit pattern, laid out like a BR condition mask.
    #[inline]
    pub const fn bits(self) -> Word {
        match self {
            Condition::Negative => 0b100,
            Condition::Zero => 0b010,
            Condition::Positive => 0b001,
        }
    }

    /// Whether a BR mask selects this condition.
    #[inline]
    pub const fn matches(self, mask: Word) -> bool {
        mask & self.bits() != 0
    }

    pub const fn letter(self) -> char {
        match self {
            Condition::Negative => 'N',
            Condition::Zero => 'Z',
            Condition::Positive => 'P',
        }
    }
}

/// The LC-3 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// R0..R7
    pub gpr: [Word; 8],

    /// Address of the next instruction to fetch
    pub pc: Word,

    pub cond: Condition,
}

impl Registers {
    /// Create a register file in its power-on state.
    pub fn new() -> Self {
        Self {
            gpr: [0; 8],
            pc: PC_START,
            cond: Condition::Zero,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub fn get(&self, reg: Reg) -> Word {
        self.gpr[reg.index()]
    }

    #[inline]
    pub fn set(&mut self, reg: Reg, value: Word) {
        self.gpr[reg.index()] = value;
    }

    /// Write a register and recompute COND from the new value.
    #[inline]
    pub fn define(&mut self, reg: Reg, value: Word) {
        self.set(reg, value);
        self.update_flags(reg);
    }

    /// Set COND from the sign of `reg`, replacing any previous flag.
    #[inline]
    pub fn update_flags(&mut self, reg: Reg) {
        self.cond = Condition::of(self.get(reg));
    }

    /// Increment the program counter by 1, wrapping.
    /// Returns the old value.
    #[inline]
    pub fn advance_pc(&mut self) -> Word {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// PC plus a sign-extended offset, wrapping.
    #[inline]
    pub fn pc_relative(&self, offset: Word) -> Word {
        self.pc.wrapping_add(offset)
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_on_state() {
        let regs = Registers::new();
        assert_eq!(regs.pc, 0x3000);
        assert_eq!(regs.cond, Condition::Zero);
        assert_eq!(regs.gpr, [0; 8]);
    }

    #[test]
    fn test_reg_from_field_masks() {
        assert_eq!(Reg::from_field(0b1111), Reg::R7);
        assert_eq!(Reg::from_field(0b1000), Reg::R0);
        assert_eq!(Reg::R5.index(), 5);
    }

    #[test]
    fn test_reg_deserialize_rejects_out_of_range() {
        let reg: Reg = serde_json::from_str("5").unwrap();
        assert_eq!(reg, Reg::R5);
        assert_eq!(serde_json::to_string(&Reg::R3).unwrap(), "3");

        assert!(serde_json::from_str::<Reg>("8").is_err());
        assert!(serde_json::from_str::<Reg>("9").is_err());
        assert_eq!(Reg::try_from(9), Err(InvalidRegister(9)));
    }

    #[test]
    fn test_register_file_deserialize_round_trip() {
        let mut regs = Registers::new();
        regs.define(Reg::R6, 0x8001);
        let json = serde_json::to_string(&regs).unwrap();
        assert_eq!(serde_json::from_str::<Registers>(&json).unwrap(), regs);
    }

    #[test]
    fn test_update_flags() {
        let mut regs = Registers::new();

        regs.define(Reg::R1, 100);
        assert_eq!(regs.cond, Condition::Positive);

        regs.define(Reg::R1, 0x8000);
        assert_eq!(regs.cond, Condition::Negative);

        regs.define(Reg::R1, 0);
        assert_eq!(regs.cond, Condition::Zero);
    }

    #[test]
    fn test_update_flags_reads_named_register() {
        let mut regs = Registers::new();
        regs.set(Reg::R2, 0xFFFF);
        regs.set(Reg::R3, 1);
        regs.update_flags(Reg::R2);
        assert_eq!(regs.cond, Condition::Negative);
    }

    #[test]
    fn test_condition_mask() {
        assert!(Condition::Zero.matches(0b010));
        assert!(!Condition::Zero.matches(0b101));
        assert!(Condition::Negative.matches(0b111));
        assert!(!Condition::Positive.matches(0));
    }

    #[test]
    fn test_advance_pc_wraps() {
        let mut regs = Registers::new();
        regs.pc = 0xFFFF;

        let old = regs.advance_pc();
        assert_eq!(old, 0xFFFF);
        assert_eq!(regs.pc, 0x0000);
    }

    #[test]
    fn test_pc_relative_negative_offset() {
        let mut regs = Registers::new();
        regs.pc = 0x3001;
        assert_eq!(regs.pc_relative(0xFFFF), 0x3000);
    }
}
