//! CPU emulation for the LC-3.
//!
//! This module implements the complete LC-3 user-mode architecture:
//! - 65536 sixteen-bit memory cells
//! - 8 general-purpose registers, PC and the N/Z/P condition register
//! - 16 opcodes with 4-bit encoding
//! - TRAP-vectored console I/O routines

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;
pub mod trap;

pub use memory::{Memory, MemoryError};
pub use registers::{Condition, InvalidRegister, Reg, Registers, PC_START};
pub use decode::{decode, encode, Instruction, Operand};
pub use execute::{Machine, MachineError, MachineState};
pub use trap::TrapVector;
