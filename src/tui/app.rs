//! Debugger application state and logic.

use crate::console::ScriptedConsole;
use crate::image::{disassemble_instruction, Image};
use crate::word::Word;
use crate::Machine;
use std::collections::HashSet;

/// Number of memory rows the view can scroll through.
const MEMORY_ROWS: usize = 1 << 16;

/// Debugger application state.
pub struct DebuggerApp {
    /// The machine being debugged.
    pub machine: Machine,
    /// Original image for reset.
    pub image: Image,
    /// Guest console: keys typed while waiting go in, trap output comes out.
    pub console: ScriptedConsole,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<Word>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Paused on GETC/IN with no queued input.
    pub awaiting_input: bool,
    /// Step over a breakpoint at the PC we resume from.
    resuming: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// First address shown in the memory view.
    pub mem_scroll: Word,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded image.
    pub fn new(image: Image) -> Self {
        let mut machine = Machine::new();
        let status = match machine.load_image(&image) {
            Ok(()) => "Ready. Press 's' to step, 'r' to run, 'q' to quit.".to_string(),
            Err(e) => format!("Load error: {}", e),
        };
        let mem_scroll = image.origin;

        Self {
            machine,
            image,
            console: ScriptedConsole::new(),
            breakpoints: HashSet::new(),
            running: false,
            awaiting_input: false,
            resuming: false,
            should_quit: false,
            status,
            mem_scroll,
        }
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if !self.machine.is_running() {
            self.status = format!("Machine stopped: {:?}", self.machine.state);
            self.running = false;
            return;
        }

        if self.machine.awaits_input() && !self.console.has_input() {
            self.awaiting_input = true;
            self.status = "Waiting for input: type a character".into();
            return;
        }

        let pc = self.machine.regs.pc;
        let word = self.machine.mem.read(pc);
        match self.machine.step(&mut self.console) {
            Ok(_) => {
                self.status = format!("PC=x{:04X}: {}", pc, disassemble_instruction(word));
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
    }

    /// Run until halt, breakpoint, or error.
    pub fn run(&mut self) {
        self.running = true;
        self.resuming = true;
        self.status = "Running...".into();
    }

    /// Stop continuous execution.
    pub fn pause(&mut self) {
        self.running = false;
        self.awaiting_input = false;
        self.status = "Paused.".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running || self.awaiting_input {
            return;
        }

        if !self.machine.is_running() {
            self.running = false;
            self.status = format!("Stopped after {} cycles", self.machine.cycles);
            return;
        }

        // Check for breakpoint
        let pc = self.machine.regs.pc;
        if self.breakpoints.contains(&pc) && !self.resuming {
            self.running = false;
            self.status = format!("Breakpoint at PC=x{:04X}", pc);
            return;
        }

        self.resuming = false;
        self.step();
    }

    /// Feed one typed character to the guest.
    pub fn provide_input(&mut self, ch: u8) {
        self.console.push_input([ch]);
        self.awaiting_input = false;
        self.status = format!("Input {:?} queued", ch as char);
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.machine.regs.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC=x{:04X}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC=x{:04X}", pc);
        }
    }

    /// Reset machine to initial state.
    pub fn reset(&mut self) {
        self.machine.reset();
        self.console.clear();
        self.running = false;
        self.awaiting_input = false;
        self.status = match self.machine.load_image(&self.image) {
            Ok(()) => "Reset. Ready.".into(),
            Err(e) => format!("Load error: {}", e),
        };
    }

    pub fn scroll_up(&mut self) {
        self.mem_scroll = self.mem_scroll.wrapping_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.mem_scroll = self.mem_scroll.wrapping_add(1);
    }

    /// Get disassembly around current PC.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(Word, String, bool)> {
        let pc = self.machine.regs.pc;
        let start = pc.wrapping_sub((lines / 2) as Word);

        (0..lines.min(MEMORY_ROWS))
            .map(|i| {
                let addr = start.wrapping_add(i as Word);
                let disasm = disassemble_instruction(self.machine.mem.read(addr));
                (addr, disasm, addr == pc)
            })
            .collect()
    }

    /// Guest output as text lines, most recent last.
    pub fn output_lines(&self, max: usize) -> Vec<String> {
        let text = self.console.output_text();
        let lines: Vec<&str> = text.lines().collect();
        let skip = lines.len().saturating_sub(max);
        lines[skip..].iter().map(|s| s.to_string()).collect()
    }
}

/// Run the debugger with an image.
pub fn run_debugger(image: Image) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(image);

    // Main loop
    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if app.awaiting_input {
                        match key.code {
                            KeyCode::Esc => app.pause(),
                            KeyCode::Enter => app.provide_input(b'\n'),
                            KeyCode::Char(c) if c.is_ascii() => app.provide_input(c as u8),
                            _ => {}
                        }
                    } else {
                        match key.code {
                            KeyCode::Char('q') => app.should_quit = true,
                            KeyCode::Char('s') => {
                                app.running = false;
                                app.step();
                            }
                            KeyCode::Char('r') => app.run(),
                            KeyCode::Char('p') => app.pause(),
                            KeyCode::Char('b') => app.toggle_breakpoint(),
                            KeyCode::Char('x') => app.reset(),
                            KeyCode::Up => app.scroll_up(),
                            KeyCode::Down => app.scroll_down(),
                            _ => {}
                        }
                    }
                }
            }
        }

        // Run a burst per frame so long programs finish in reasonable time
        for _ in 0..256 {
            if !app.running || app.awaiting_input {
                break;
            }
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}
