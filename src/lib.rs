//! # LC-3 Virtual Machine
//!
//! A virtual machine for the LC-3, the 16-bit educational computer used in
//! introductory computer architecture courses.
//!
//! The core is [`Machine`]: it owns memory and registers and runs the
//! fetch-decode-execute loop. Console I/O from TRAP routines goes through
//! the [`Console`] trait so programs can be driven from a real terminal or
//! from a scripted buffer.

pub mod word;
pub mod cpu;
pub mod console;
pub mod image;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export commonly used types
pub use word::{sign_extend, Word};
pub use cpu::{Condition, Instruction, Machine, MachineError, MachineState, Memory, Reg, Registers};
pub use console::{Console, ScriptedConsole, StdConsole};
pub use image::{disassemble, load_image, Image, ImageError};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
