//! Program images and disassembly.
//!
//! This module provides:
//! - The LC-3 object image loader (big-endian words, origin first)
//! - A disassembler (words → readable assembly)

pub mod disasm;
pub mod loader;

pub use disasm::{disassemble, disassemble_instruction, trace_line};
pub use loader::{load_image, Image, ImageError};
