//! CPU execution engine for the LC-3.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::console::Console;
use crate::cpu::decode::{self, Instruction, Operand};
use crate::cpu::memory::MemoryError;
use crate::cpu::registers::{Reg, PC_START};
use crate::cpu::trap::{self, TrapVector};
use crate::cpu::{Memory, Registers};
use crate::image::Image;
use crate::word::Word;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;
use tracing::{error, info, trace};

/// Machine execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineState {
    /// Fetching and executing instructions.
    Running,
    /// Stopped by the HALT trap.
    Halted,
    /// Stopped by an illegal instruction, unknown trap or console failure.
    Faulted,
}

/// An LC-3 machine: registers, memory and run state.
#[derive(Clone)]
pub struct Machine {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: MachineState,
    /// Retired instruction count.
    pub cycles: u64,
    last_instr: Option<Instruction>,
}

impl Machine {
    /// Create a machine in its power-on state: zeroed memory, PC at
    /// x3000, COND = Z.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            state: MachineState::Running,
            cycles: 0,
            last_instr: None,
        }
    }

    /// Return to the power-on state, clearing memory.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = MachineState::Running;
        self.cycles = 0;
        self.last_instr = None;
    }

    /// Place `program` at the load address x3000.
    pub fn load_program(&mut self, program: &[Word]) -> Result<(), MemoryError> {
        self.mem.load_at(PC_START, program)
    }

    /// Copy an image's words to its origin.
    pub fn load_image(&mut self, image: &Image) -> Result<(), MemoryError> {
        self.mem.load_at(image.origin, &image.words)
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed, or an error. Any error
    /// other than [`MachineError::NotRunning`] leaves the machine
    /// [`MachineState::Faulted`].
    pub fn step<C: Console + ?Sized>(&mut self, console: &mut C) -> Result<Instruction, MachineError> {
        if self.state != MachineState::Running {
            return Err(MachineError::NotRunning(self.state));
        }

        // Fetch, then advance PC before execute so PC-relative
        // addressing sees the incremented value
        let pc = self.regs.advance_pc();
        let raw = self.mem.read(pc);
        let instr = decode::decode(raw);
        trace!(pc = format_args!("x{:04X}", pc), raw = format_args!("x{:04X}", raw), ?instr, "step");

        if let Err(e) = self.execute(instr, pc, console) {
            self.state = MachineState::Faulted;
            error!(pc = format_args!("x{:04X}", pc), error = %e, "machine fault");
            return Err(e);
        }

        self.cycles += 1;
        self.last_instr = Some(instr);

        Ok(instr)
    }

    /// Run until halt or error.
    ///
    /// Returns the number of instructions executed.
    pub fn run<C: Console + ?Sized>(&mut self, console: &mut C) -> Result<u64, MachineError> {
        let start_cycles = self.cycles;

        while self.state == MachineState::Running {
            self.step(console)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited<C: Console + ?Sized>(
        &mut self,
        console: &mut C,
        max_cycles: u64,
    ) -> Result<u64, MachineError> {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);

        while self.state == MachineState::Running && self.cycles < limit {
            self.step(console)?;
        }

        if self.state == MachineState::Running {
            info!(max_cycles, "cycle limit reached");
        }

        Ok(self.cycles - start_cycles)
    }

    /// Like [`Machine::run_limited`], calling `observe` after every
    /// instruction with its address, raw word and the resulting registers.
    /// A faulting instruction is observed before its error is returned.
    pub fn run_traced<C, F>(
        &mut self,
        console: &mut C,
        max_cycles: u64,
        mut observe: F,
    ) -> Result<u64, MachineError>
    where
        C: Console + ?Sized,
        F: FnMut(Word, Word, &Registers),
    {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);

        while self.state == MachineState::Running && self.cycles < limit {
            let pc = self.regs.pc;
            let raw = self.mem.read(pc);
            let result = self.step(console);
            observe(pc, raw, &self.regs);
            result?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Execute a decoded instruction. `pc` is the instruction's own address.
    fn execute<C: Console + ?Sized>(
        &mut self,
        instr: Instruction,
        pc: Word,
        console: &mut C,
    ) -> Result<(), MachineError> {
        match instr {
            // ==================== Control Flow ====================

            Instruction::Br { mask, offset } => {
                if self.regs.cond.matches(mask) {
                    self.regs.pc = self.regs.pc_relative(offset);
                }
            }

            Instruction::Jsr { offset } => {
                let ret = self.regs.pc;
                self.regs.pc = self.regs.pc_relative(offset);
                self.regs.set(Reg::R7, ret);
            }

            Instruction::Jsrr { base } => {
                // Read the target first: JSRR R7 jumps to the old R7
                let target = self.regs.get(base);
                let ret = self.regs.pc;
                self.regs.set(Reg::R7, ret);
                self.regs.pc = target;
            }

            Instruction::Jmp { base } => {
                self.regs.pc = self.regs.get(base);
            }

            Instruction::Trap { vector } => {
                let ret = self.regs.pc;
                self.regs.set(Reg::R7, ret);
                trap::dispatch(self, vector, pc, console)?;
            }

            // ==================== Arithmetic / Logic ====================

            Instruction::Add { dst, src1, operand } => {
                let result = self.regs.get(src1).wrapping_add(self.operand_value(operand));
                self.regs.define(dst, result);
            }

            Instruction::And { dst, src1, operand } => {
                let result = self.regs.get(src1) & self.operand_value(operand);
                self.regs.define(dst, result);
            }

            Instruction::Not { dst, src } => {
                let result = !self.regs.get(src);
                self.regs.define(dst, result);
            }

            // ==================== Data Transfer ====================

            Instruction::Ld { dst, offset } => {
                let addr = self.regs.pc_relative(offset);
                let value = self.mem.read(addr);
                self.regs.define(dst, value);
            }

            Instruction::Ldi { dst, offset } => {
                let pointer = self.mem.read(self.regs.pc_relative(offset));
                let value = self.mem.read(pointer);
                self.regs.define(dst, value);
            }

            Instruction::Ldr { dst, base, offset } => {
                let addr = self.regs.get(base).wrapping_add(offset);
                let value = self.mem.read(addr);
                self.regs.define(dst, value);
            }

            Instruction::Lea { dst, offset } => {
                let addr = self.regs.pc_relative(offset);
                self.regs.define(dst, addr);
            }

            Instruction::St { src, offset } => {
                let addr = self.regs.pc_relative(offset);
                self.mem.write(addr, self.regs.get(src));
            }

            Instruction::Sti { src, offset } => {
                let pointer = self.mem.read(self.regs.pc_relative(offset));
                self.mem.write(pointer, self.regs.get(src));
            }

            Instruction::Str { src, base, offset } => {
                let addr = self.regs.get(base).wrapping_add(offset);
                self.mem.write(addr, self.regs.get(src));
            }

            // ==================== Unsupported ====================

            Instruction::Rti | Instruction::Res => {
                return Err(MachineError::IllegalInstruction {
                    mnemonic: instr.mnemonic(),
                    pc,
                });
            }
        }

        Ok(())
    }

    #[inline]
    fn operand_value(&self, operand: Operand) -> Word {
        match operand {
            Operand::Reg(reg) => self.regs.get(reg),
            Operand::Imm(imm) => imm,
        }
    }

    /// Decode the instruction at PC without executing it.
    pub fn peek(&self) -> Instruction {
        decode::decode(self.mem.read(self.regs.pc))
    }

    /// Whether the next instruction blocks on console input.
    pub fn awaits_input(&self) -> bool {
        match self.peek() {
            Instruction::Trap { vector } => {
                TrapVector::from_u8(vector).is_some_and(TrapVector::reads_input)
            }
            _ => false,
        }
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the machine is halted.
    pub fn is_halted(&self) -> bool {
        self.state == MachineState::Halted
    }

    /// Check if the machine is running.
    pub fn is_running(&self) -> bool {
        self.state == MachineState::Running
    }

    pub fn is_faulted(&self) -> bool {
        self.state == MachineState::Faulted
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that stop the machine.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("machine not running: {0:?}")]
    NotRunning(MachineState),

    #[error("illegal instruction {mnemonic} at x{pc:04X}")]
    IllegalInstruction { mnemonic: &'static str, pc: Word },

    #[error("unknown trap vector x{vector:02X} at x{pc:04X}")]
    UnknownTrap { vector: u8, pc: Word },

    #[error("console error: {0}")]
    Console(#[from] io::Error),
}
