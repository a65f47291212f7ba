//! TUI debugger for the LC-3 virtual machine.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register and condition-flag view
//! - Scrollable memory view
//! - Step/run/breakpoint controls
//! - Disassembly view and guest console output

mod app;
mod ui;

pub use app::{run_debugger, DebuggerApp};
