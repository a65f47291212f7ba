//! Disassembler for LC-3 programs.
//!
//! Converts instruction words back to readable assembly.

use crate::cpu::decode::{decode, Instruction, Operand};
use crate::cpu::registers::Registers;
use crate::cpu::trap::TrapVector;
use crate::word::{as_signed, Word};

/// Disassemble a single instruction word to text.
pub fn disassemble_instruction(word: Word) -> String {
    format_instruction(&decode(word))
}

/// Disassemble a block of words loaded at `origin`.
pub fn disassemble(origin: Word, words: &[Word]) -> String {
    let mut output = String::new();
    output.push_str("; LC-3 Disassembly\n");
    output.push_str(&format!(".ORIG x{:04X}\n", origin));

    for (i, &word) in words.iter().enumerate() {
        let addr = origin.wrapping_add(i as Word);
        let line = disassemble_instruction(word);
        output.push_str(&format!("x{:04X}: {:<24} ; x{:04X}\n", addr, line, word));
    }

    output.push_str(".END\n");
    output
}

/// One execution trace line: the instruction at `pc` and the registers
/// after it ran.
pub fn trace_line(pc: Word, word: Word, regs: &Registers) -> String {
    format!(
        "x{:04X}: {:<24} R0={:04X} R1={:04X} R7={:04X} {}",
        pc,
        disassemble_instruction(word),
        regs.gpr[0],
        regs.gpr[1],
        regs.gpr[7],
        regs.cond.letter()
    )
}

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    match *instr {
        // BR with an empty mask never branches
        Instruction::Br { mask: 0, offset } => format!("NOP #{}", as_signed(offset)),
        Instruction::Br { mask, offset } => {
            let mut name = String::from("BR");
            if mask & 0b100 != 0 {
                name.push('n');
            }
            if mask & 0b010 != 0 {
                name.push('z');
            }
            if mask & 0b001 != 0 {
                name.push('p');
            }
            format!("{} #{}", name, as_signed(offset))
        }
        Instruction::Add { dst, src1, operand } => {
            format!("ADD {}, {}, {}", dst, src1, format_operand(operand))
        }
        Instruction::And { dst, src1, operand } => {
            format!("AND {}, {}, {}", dst, src1, format_operand(operand))
        }
        Instruction::Not { dst, src } => format!("NOT {}, {}", dst, src),

        Instruction::Ld { dst, offset } => format!("LD {}, #{}", dst, as_signed(offset)),
        Instruction::Ldi { dst, offset } => format!("LDI {}, #{}", dst, as_signed(offset)),
        Instruction::Lea { dst, offset } => format!("LEA {}, #{}", dst, as_signed(offset)),
        Instruction::St { src, offset } => format!("ST {}, #{}", src, as_signed(offset)),
        Instruction::Sti { src, offset } => format!("STI {}, #{}", src, as_signed(offset)),
        Instruction::Ldr { dst, base, offset } => {
            format!("LDR {}, {}, #{}", dst, base, as_signed(offset))
        }
        Instruction::Str { src, base, offset } => {
            format!("STR {}, {}, #{}", src, base, as_signed(offset))
        }

        Instruction::Jsr { offset } => format!("JSR #{}", as_signed(offset)),
        Instruction::Jsrr { base } => format!("JSRR {}", base),
        Instruction::Jmp { base } if base.index() == 7 => "RET".to_string(),
        Instruction::Jmp { base } => format!("JMP {}", base),

        Instruction::Trap { vector } => match TrapVector::from_u8(vector) {
            Some(routine) => routine.name().to_string(),
            None => format!("TRAP x{:02X}", vector),
        },

        Instruction::Rti => "RTI".to_string(),
        Instruction::Res => "RES".to_string(),
    }
}

fn format_operand(operand: Operand) -> String {
    match operand {
        Operand::Reg(reg) => reg.to_string(),
        Operand::Imm(imm) => format!("#{}", as_signed(imm)),
    }
}
