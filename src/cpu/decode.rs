//! Instruction decoder for the LC-3.
//!
//! Every instruction is one 16-bit word. Bits 15..12 hold the opcode and
//! the remaining twelve bits hold operand fields at fixed positions. All
//! sixteen opcode values are assigned, so decoding never fails; the two
//! unsupported opcodes (RTI, RES) decode to variants that fault when
//! executed.

use crate::cpu::registers::Reg;
use crate::word::{bit, field, low_mask, sign_extend, Word};
use serde::{Deserialize, Serialize};

/// Second operand of ADD and AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// Register mode (bit 5 clear)
    Reg(Reg),
    /// Immediate mode (bit 5 set), already sign-extended from 5 bits
    Imm(Word),
}

/// Decoded LC-3 instruction.
///
/// PC-relative offsets are stored sign-extended to 16 bits, so handlers add
/// them with wrapping arithmetic and never touch bit masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Conditional branch: if COND matches `mask`, PC += offset
    Br { mask: Word, offset: Word },

    /// dst := src1 + operand
    Add { dst: Reg, src1: Reg, operand: Operand },

    /// dst := mem[PC + offset]
    Ld { dst: Reg, offset: Word },

    /// mem[PC + offset] := src
    St { src: Reg, offset: Word },

    /// R7 := PC; PC += offset
    Jsr { offset: Word },

    /// R7 := PC; PC := base
    Jsrr { base: Reg },

    /// dst := src1 & operand
    And { dst: Reg, src1: Reg, operand: Operand },

    /// dst := mem[base + offset]
    Ldr { dst: Reg, base: Reg, offset: Word },

    /// mem[base + offset] := src
    Str { src: Reg, base: Reg, offset: Word },

    /// Return from interrupt. Not supported in user mode.
    Rti,

    /// dst := !src
    Not { dst: Reg, src: Reg },

    /// dst := mem[mem[PC + offset]]
    Ldi { dst: Reg, offset: Word },

    /// mem[mem[PC + offset]] := src
    Sti { src: Reg, offset: Word },

    /// PC := base (RET when base is R7)
    Jmp { base: Reg },

    /// Reserved opcode
    Res,

    /// dst := PC + offset
    Lea { dst: Reg, offset: Word },

    /// R7 := PC; run trap routine `vector`
    Trap { vector: u8 },
}

impl Instruction {
    /// Assembly mnemonic of the instruction.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Br { .. } => "BR",
            Instruction::Add { .. } => "ADD",
            Instruction::Ld { .. } => "LD",
            Instruction::St { .. } => "ST",
            Instruction::Jsr { .. } => "JSR",
            Instruction::Jsrr { .. } => "JSRR",
            Instruction::And { .. } => "AND",
            Instruction::Ldr { .. } => "LDR",
            Instruction::Str { .. } => "STR",
            Instruction::Rti => "RTI",
            Instruction::Not { .. } => "NOT",
            Instruction::Ldi { .. } => "LDI",
            Instruction::Sti { .. } => "STI",
            Instruction::Jmp { base } if base.index() == 7 => "RET",
            Instruction::Jmp { .. } => "JMP",
            Instruction::Res => "RES",
            Instruction::Lea { .. } => "LEA",
            Instruction::Trap { .. } => "TRAP",
        }
    }

    /// Whether the instruction writes a general-purpose register and
    /// recomputes COND.
    pub fn sets_flags(&self) -> bool {
        matches!(
            self,
            Instruction::Add { .. }
                | Instruction::And { .. }
                | Instruction::Not { .. }
                | Instruction::Ld { .. }
                | Instruction::Ldi { .. }
                | Instruction::Ldr { .. }
                | Instruction::Lea { .. }
        )
    }
}

/// Raw opcode values (bits 15..12).
struct Opcode;

impl Opcode {
    const BR: Word = 0x0;
    const ADD: Word = 0x1;
    const LD: Word = 0x2;
    const ST: Word = 0x3;
    const JSR: Word = 0x4;
    const AND: Word = 0x5;
    const LDR: Word = 0x6;
    const STR: Word = 0x7;
    const RTI: Word = 0x8;
    const NOT: Word = 0x9;
    const LDI: Word = 0xA;
    const STI: Word = 0xB;
    const JMP: Word = 0xC;
    const RES: Word = 0xD;
    const LEA: Word = 0xE;
    const TRAP: Word = 0xF;
}

/// The opcode field of a raw instruction word.
#[inline]
pub const fn opcode(word: Word) -> Word {
    word >> 12
}

#[inline]
fn reg_at(word: Word, lo: u32) -> Reg {
    Reg::from_field(field(word, lo + 2, lo))
}

#[inline]
fn pc_offset9(word: Word) -> Word {
    sign_extend(word, 9)
}

fn alu_operand(word: Word) -> Operand {
    if bit(word, 5) {
        Operand::Imm(sign_extend(word, 5))
    } else {
        Operand::Reg(reg_at(word, 0))
    }
}

/// Decode a 16-bit instruction word.
pub fn decode(word: Word) -> Instruction {
    let dr = reg_at(word, 9);
    let sr1 = reg_at(word, 6);

    match opcode(word) {
        Opcode::BR => Instruction::Br {
            mask: field(word, 11, 9),
            offset: pc_offset9(word),
        },
        Opcode::ADD => Instruction::Add {
            dst: dr,
            src1: sr1,
            operand: alu_operand(word),
        },
        Opcode::LD => Instruction::Ld {
            dst: dr,
            offset: pc_offset9(word),
        },
        Opcode::ST => Instruction::St {
            src: dr,
            offset: pc_offset9(word),
        },
        Opcode::JSR => {
            if bit(word, 11) {
                Instruction::Jsr {
                    offset: sign_extend(word, 11),
                }
            } else {
                Instruction::Jsrr { base: sr1 }
            }
        }
        Opcode::AND => Instruction::And {
            dst: dr,
            src1: sr1,
            operand: alu_operand(word),
        },
        Opcode::LDR => Instruction::Ldr {
            dst: dr,
            base: sr1,
            offset: sign_extend(word, 6),
        },
        Opcode::STR => Instruction::Str {
            src: dr,
            base: sr1,
            offset: sign_extend(word, 6),
        },
        Opcode::RTI => Instruction::Rti,
        Opcode::NOT => Instruction::Not { dst: dr, src: sr1 },
        Opcode::LDI => Instruction::Ldi {
            dst: dr,
            offset: pc_offset9(word),
        },
        Opcode::STI => Instruction::Sti {
            src: dr,
            offset: pc_offset9(word),
        },
        Opcode::JMP => Instruction::Jmp { base: sr1 },
        Opcode::RES => Instruction::Res,
        Opcode::LEA => Instruction::Lea {
            dst: dr,
            offset: pc_offset9(word),
        },
        Opcode::TRAP => Instruction::Trap {
            vector: (word & 0xFF) as u8,
        },
        _ => unreachable!("opcode is a 4-bit field"),
    }
}

#[inline]
fn place_reg(reg: Reg, lo: u32) -> Word {
    (reg.index() as Word) << lo
}

#[inline]
fn place_bits(value: Word, width: u32) -> Word {
    value & low_mask(width)
}

fn encode_operand(operand: Operand) -> Word {
    match operand {
        Operand::Reg(reg) => place_reg(reg, 0),
        Operand::Imm(imm) => (1 << 5) | place_bits(imm, 5),
    }
}

/// Encode an instruction back to a 16-bit word.
///
/// Offsets and immediates are truncated to their field width, so any
/// value produced by [`decode`] encodes back to the same word.
pub fn encode(instr: &Instruction) -> Word {
    let (op, operands) = match *instr {
        Instruction::Br { mask, offset } => {
            (Opcode::BR, (place_bits(mask, 3) << 9) | place_bits(offset, 9))
        }
        Instruction::Add { dst, src1, operand } => (
            Opcode::ADD,
            place_reg(dst, 9) | place_reg(src1, 6) | encode_operand(operand),
        ),
        Instruction::Ld { dst, offset } => (Opcode::LD, place_reg(dst, 9) | place_bits(offset, 9)),
        Instruction::St { src, offset } => (Opcode::ST, place_reg(src, 9) | place_bits(offset, 9)),
        Instruction::Jsr { offset } => (Opcode::JSR, (1 << 11) | place_bits(offset, 11)),
        Instruction::Jsrr { base } => (Opcode::JSR, place_reg(base, 6)),
        Instruction::And { dst, src1, operand } => (
            Opcode::AND,
            place_reg(dst, 9) | place_reg(src1, 6) | encode_operand(operand),
        ),
        Instruction::Ldr { dst, base, offset } => (
            Opcode::LDR,
            place_reg(dst, 9) | place_reg(base, 6) | place_bits(offset, 6),
        ),
        Instruction::Str { src, base, offset } => (
            Opcode::STR,
            place_reg(src, 9) | place_reg(base, 6) | place_bits(offset, 6),
        ),
        Instruction::Rti => (Opcode::RTI, 0),
        // Bits 5..0 of NOT are all ones in the canonical encoding
        Instruction::Not { dst, src } => (Opcode::NOT, place_reg(dst, 9) | place_reg(src, 6) | 0x3F),
        Instruction::Ldi { dst, offset } => (Opcode::LDI, place_reg(dst, 9) | place_bits(offset, 9)),
        Instruction::Sti { src, offset } => (Opcode::STI, place_reg(src, 9) | place_bits(offset, 9)),
        Instruction::Jmp { base } => (Opcode::JMP, place_reg(base, 6)),
        Instruction::Res => (Opcode::RES, 0),
        Instruction::Lea { dst, offset } => (Opcode::LEA, place_reg(dst, 9) | place_bits(offset, 9)),
        Instruction::Trap { vector } => (Opcode::TRAP, vector as Word),
    };

    (op << 12) | operands
}
