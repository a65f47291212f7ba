//! Host console capability used by the trap routines.
//!
//! The machine never touches stdin/stdout directly. Trap routines read and
//! write single bytes through a [`Console`], which is either the real
//! terminal ([`StdConsole`]) or an in-memory double ([`ScriptedConsole`])
//! used by tests and the debugger.

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};

/// End-of-text byte sent by Ctrl-C in raw terminal mode.
const CTRL_C: u8 = 0x03;

/// Blocking single-character I/O with the host.
pub trait Console {
    /// Block until one byte of input is available.
    ///
    /// End of input is reported as [`ErrorKind::UnexpectedEof`].
    fn read_byte(&mut self) -> io::Result<u8>;

    /// Write one byte of output.
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;

    /// Push buffered output to the host.
    fn flush(&mut self) -> io::Result<()>;

    /// Write every byte of `text`.
    fn write_str(&mut self, text: &str) -> io::Result<()> {
        text.bytes().try_for_each(|b| self.write_byte(b))
    }
}

impl<C: Console + ?Sized> Console for &mut C {
    fn read_byte(&mut self) -> io::Result<u8> {
        (**self).read_byte()
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        (**self).write_byte(byte)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Console backed by the process's stdin and stdout.
pub struct StdConsole {
    stdin: io::Stdin,
    stdout: io::Stdout,
    raw: bool,
}

impl StdConsole {
    /// Console for a pipe or a line-buffered terminal.
    pub fn new() -> Self {
        Self {
            stdin: io::stdin(),
            stdout: io::stdout(),
            raw: false,
        }
    }

    /// Console for an interactive terminal. Each blocking read switches
    /// the terminal to raw mode so a single keypress is delivered without
    /// echo, and restores it before returning. Outside of reads the
    /// terminal keeps its normal line discipline, so Ctrl-C still raises
    /// SIGINT while the guest is computing.
    pub fn raw() -> Self {
        Self {
            raw: true,
            ..Self::new()
        }
    }

    fn read_raw_byte(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        loop {
            match self.stdin.lock().read(&mut buf) {
                Ok(0) => return Err(ErrorKind::UnexpectedEof.into()),
                Ok(_) => return Ok(buf[0]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for StdConsole {
    fn read_byte(&mut self) -> io::Result<u8> {
        if !self.raw {
            return self.read_raw_byte();
        }

        // Prompts written before the read must be visible while we block
        self.stdout.flush()?;
        let byte = {
            let _raw = RawModeGuard::enable()?;
            self.read_raw_byte()?
        };
        translate_key(byte)
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.stdout.lock().write_all(&[byte])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()
    }
}

/// Keeps the terminal in raw mode for as long as it lives.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::terminal::disable_raw_mode();
    }
}

/// Map a byte read in raw mode to what the guest sees.
///
/// Raw terminals deliver Enter as CR and Ctrl-C as a plain byte.
fn translate_key(byte: u8) -> io::Result<u8> {
    match byte {
        CTRL_C => Err(io::Error::new(ErrorKind::Interrupted, "interrupted by user")),
        b'\r' => Ok(b'\n'),
        other => Ok(other),
    }
}

/// In-memory console with queued input and captured output.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
    flushes: usize,
}

impl ScriptedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Console whose input stream is `input`.
    pub fn with_input(input: impl AsRef<[u8]>) -> Self {
        let mut console = Self::new();
        console.push_input(input);
        console
    }

    /// Append bytes to the pending input.
    pub fn push_input(&mut self, input: impl AsRef<[u8]>) {
        self.input.extend(input.as_ref());
    }

    /// Whether any input is queued.
    pub fn has_input(&self) -> bool {
        !self.input.is_empty()
    }

    /// Everything written so far.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Output decoded lossily as text.
    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Number of times output was flushed.
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Drop captured output and pending input.
    pub fn clear(&mut self) {
        self.input.clear();
        self.output.clear();
        self.flushes = 0;
    }
}

impl Console for ScriptedConsole {
    fn read_byte(&mut self) -> io::Result<u8> {
        self.input
            .pop_front()
            .ok_or_else(|| io::Error::new(ErrorKind::UnexpectedEof, "scripted input exhausted"))
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.output.push(byte);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
