//! Trap dispatcher and the six host I/O routines.
//!
//! A TRAP instruction saves the return address in R7 and then lands here
//! with its 8-bit vector. Routines talk to the host only through the
//! [`Console`] handed in by the caller.

use crate::console::Console;
use crate::cpu::execute::{Machine, MachineError, MachineState};
use crate::cpu::memory::MEMORY_SIZE;
use crate::cpu::registers::Reg;
use crate::word::Word;
use tracing::{debug, info};

/// Prompt written by the IN routine.
pub const IN_PROMPT: &str = "Enter a character: ";

/// Notice written by the HALT routine.
pub const HALT_NOTICE: &str = "HALT\n";

/// Trap vectors with a service routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TrapVector {
    /// Read a character into R0, no echo
    Getc = 0x20,
    /// Write the character in R0
    Out = 0x21,
    /// Write the zero-terminated string at R0, one character per word
    Puts = 0x22,
    /// Prompt, read and echo a character into R0
    In = 0x23,
    /// Write the zero-terminated string at R0, two characters per word
    Putsp = 0x24,
    /// Stop the machine
    Halt = 0x25,
}

impl TrapVector {
    pub fn from_u8(vector: u8) -> Option<Self> {
        match vector {
            0x20 => Some(TrapVector::Getc),
            0x21 => Some(TrapVector::Out),
            0x22 => Some(TrapVector::Puts),
            0x23 => Some(TrapVector::In),
            0x24 => Some(TrapVector::Putsp),
            0x25 => Some(TrapVector::Halt),
            _ => None,
        }
    }

    /// Assembler alias for the trap.
    pub fn name(self) -> &'static str {
        match self {
            TrapVector::Getc => "GETC",
            TrapVector::Out => "OUT",
            TrapVector::Puts => "PUTS",
            TrapVector::In => "IN",
            TrapVector::Putsp => "PUTSP",
            TrapVector::Halt => "HALT",
        }
    }

    /// Whether the routine blocks on host input.
    pub fn reads_input(self) -> bool {
        matches!(self, TrapVector::Getc | TrapVector::In)
    }
}

/// Run the routine for `vector`. `pc` is the address of the TRAP
/// instruction, used for fault reporting.
pub(crate) fn dispatch<C: Console + ?Sized>(
    machine: &mut Machine,
    vector: u8,
    pc: Word,
    console: &mut C,
) -> Result<(), MachineError> {
    let routine = TrapVector::from_u8(vector).ok_or(MachineError::UnknownTrap { vector, pc })?;
    debug!(routine = routine.name(), r0 = machine.regs.get(Reg::R0), "trap");

    match routine {
        TrapVector::Getc => getc(machine, console),
        TrapVector::Out => out(machine, console),
        TrapVector::Puts => puts(machine, console),
        TrapVector::In => input(machine, console),
        TrapVector::Putsp => putsp(machine, console),
        TrapVector::Halt => halt(machine, console),
    }
}

fn getc<C: Console + ?Sized>(machine: &mut Machine, console: &mut C) -> Result<(), MachineError> {
    let ch = console.read_byte()?;
    machine.regs.define(Reg::R0, ch as Word);
    Ok(())
}

fn out<C: Console + ?Sized>(machine: &mut Machine, console: &mut C) -> Result<(), MachineError> {
    let ch = (machine.regs.get(Reg::R0) & 0xFF) as u8;
    console.write_byte(ch)?;
    console.flush()?;
    Ok(())
}

fn puts<C: Console + ?Sized>(machine: &mut Machine, console: &mut C) -> Result<(), MachineError> {
    let mut addr = machine.regs.get(Reg::R0);
    for _ in 0..MEMORY_SIZE {
        let cell = machine.mem.read(addr);
        if cell == 0 {
            break;
        }
        console.write_byte((cell & 0xFF) as u8)?;
        addr = addr.wrapping_add(1);
    }
    console.flush()?;
    Ok(())
}

fn input<C: Console + ?Sized>(machine: &mut Machine, console: &mut C) -> Result<(), MachineError> {
    console.write_str(IN_PROMPT)?;
    console.flush()?;

    let ch = console.read_byte()?;
    console.write_byte(ch)?;
    console.flush()?;

    machine.regs.define(Reg::R0, ch as Word);
    Ok(())
}

fn putsp<C: Console + ?Sized>(machine: &mut Machine, console: &mut C) -> Result<(), MachineError> {
    let mut addr = machine.regs.get(Reg::R0);
    'cells: for _ in 0..MEMORY_SIZE {
        let cell = machine.mem.read(addr);
        // Low byte first; a zero byte in either half ends the string
        for ch in [(cell & 0xFF) as u8, (cell >> 8) as u8] {
            if ch == 0 {
                break 'cells;
            }
            console.write_byte(ch)?;
        }
        addr = addr.wrapping_add(1);
    }
    console.flush()?;
    Ok(())
}

fn halt<C: Console + ?Sized>(machine: &mut Machine, console: &mut C) -> Result<(), MachineError> {
    console.write_str(HALT_NOTICE)?;
    console.flush()?;
    machine.state = MachineState::Halted;
    info!(cycles = machine.cycles + 1, "machine halted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ScriptedConsole;
    use crate::cpu::registers::Condition;

    fn run_trap(machine: &mut Machine, vector: u8, console: &mut ScriptedConsole) -> Result<(), MachineError> {
        dispatch(machine, vector, 0x3000, console)
    }

    fn store_string(machine: &mut Machine, addr: Word, cells: &[Word]) {
        for (i, &cell) in cells.iter().enumerate() {
            machine.mem.write(addr + i as Word, cell);
        }
    }

    #[test]
    fn test_vector_table() {
        for v in 0x20..=0x25u8 {
            let routine = TrapVector::from_u8(v).unwrap();
            assert_eq!(routine as u8, v);
        }
        assert_eq!(TrapVector::from_u8(0x26), None);
        assert_eq!(TrapVector::from_u8(0x00), None);
    }

    #[test]
    fn test_getc_sets_r0_and_flags_without_echo() {
        let mut machine = Machine::new();
        let mut console = ScriptedConsole::with_input("A");

        run_trap(&mut machine, 0x20, &mut console).unwrap();

        assert_eq!(machine.regs.get(Reg::R0), 0x41);
        assert_eq!(machine.regs.cond, Condition::Positive);
        assert!(console.output().is_empty());
    }

    #[test]
    fn test_getc_zero_extends_high_bytes() {
        let mut machine = Machine::new();
        let mut console = ScriptedConsole::with_input([0xE9u8]);

        run_trap(&mut machine, 0x20, &mut console).unwrap();

        assert_eq!(machine.regs.get(Reg::R0), 0x00E9);
        assert_eq!(machine.regs.cond, Condition::Positive);
    }

    #[test]
    fn test_getc_eof_is_console_error() {
        let mut machine = Machine::new();
        let mut console = ScriptedConsole::new();

        let err = run_trap(&mut machine, 0x20, &mut console).unwrap_err();
        assert!(matches!(err, MachineError::Console(_)));
    }

    #[test]
    fn test_out_writes_low_byte_and_flushes() {
        let mut machine = Machine::new();
        machine.regs.set(Reg::R0, 0x1241);
        let mut console = ScriptedConsole::new();

        run_trap(&mut machine, 0x21, &mut console).unwrap();

        assert_eq!(console.output(), b"A");
        assert_eq!(console.flushes(), 1);
    }

    #[test]
    fn test_puts_stops_at_zero_cell() {
        let mut machine = Machine::new();
        store_string(&mut machine, 0x4000, &[0x48, 0x49, 0x00, 0x4A]);
        machine.regs.set(Reg::R0, 0x4000);
        let mut console = ScriptedConsole::new();

        run_trap(&mut machine, 0x22, &mut console).unwrap();

        assert_eq!(console.output_text(), "HI");
    }

    #[test]
    fn test_puts_empty_string() {
        let mut machine = Machine::new();
        machine.regs.set(Reg::R0, 0x5000);
        let mut console = ScriptedConsole::new();

        run_trap(&mut machine, 0x22, &mut console).unwrap();

        assert!(console.output().is_empty());
        assert_eq!(console.flushes(), 1);
    }

    #[test]
    fn test_puts_wraps_past_top_of_memory() {
        let mut machine = Machine::new();
        machine.mem.write(0xFFFF, b'o' as Word);
        machine.mem.write(0x0000, b'k' as Word);
        machine.regs.set(Reg::R0, 0xFFFF);
        let mut console = ScriptedConsole::new();

        run_trap(&mut machine, 0x22, &mut console).unwrap();

        assert_eq!(console.output_text(), "ok");
    }

    #[test]
    fn test_in_prompts_and_echoes() {
        let mut machine = Machine::new();
        let mut console = ScriptedConsole::with_input("x");

        run_trap(&mut machine, 0x23, &mut console).unwrap();

        assert_eq!(console.output_text(), format!("{}x", IN_PROMPT));
        assert_eq!(machine.regs.get(Reg::R0), b'x' as Word);
        assert_eq!(machine.regs.cond, Condition::Positive);
    }

    #[test]
    fn test_putsp_unpacks_low_then_high() {
        let mut machine = Machine::new();
        // "Hello" packed two per word
        store_string(&mut machine, 0x4000, &[0x6548, 0x6C6C, 0x006F, 0x0000]);
        machine.regs.set(Reg::R0, 0x4000);
        let mut console = ScriptedConsole::new();

        run_trap(&mut machine, 0x24, &mut console).unwrap();

        assert_eq!(console.output_text(), "Hello");
    }

    #[test]
    fn test_putsp_stops_at_zero_word() {
        let mut machine = Machine::new();
        store_string(&mut machine, 0x4000, &[0x4241, 0x0000, 0x4443]);
        machine.regs.set(Reg::R0, 0x4000);
        let mut console = ScriptedConsole::new();

        run_trap(&mut machine, 0x24, &mut console).unwrap();

        assert_eq!(console.output_text(), "AB");
    }

    #[test]
    fn test_halt_stops_machine() {
        let mut machine = Machine::new();
        let mut console = ScriptedConsole::new();

        run_trap(&mut machine, 0x25, &mut console).unwrap();

        assert_eq!(machine.state, MachineState::Halted);
        assert_eq!(console.output_text(), HALT_NOTICE);
    }

    #[test]
    fn test_unknown_vector_faults() {
        let mut machine = Machine::new();
        let mut console = ScriptedConsole::new();

        let err = run_trap(&mut machine, 0x26, &mut console).unwrap_err();
        assert!(matches!(
            err,
            MachineError::UnknownTrap {
                vector: 0x26,
                pc: 0x3000
            }
        ));
    }
}
