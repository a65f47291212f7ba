//! LC-3 VM - CLI Entry Point
//!
//! Commands:
//! - `lc3-vm run <image>` - Run an object image until it halts
//! - `lc3-vm debug <image>` - Interactive debugger
//! - `lc3-vm disasm <image>` - Disassemble an object image

use clap::{Parser, Subcommand};
use lc3::{Console, Image, Machine, MachineState, StdConsole};
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lc3-vm")]
#[command(version)]
#[command(about = "A virtual machine for the LC-3 educational computer")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the LC-3 object image
        image: String,
        /// Stop after this many instructions
        #[arg(short, long)]
        max_cycles: Option<u64>,
        /// Print each executed instruction to stderr
        #[arg(short, long)]
        trace: bool,
        /// Print the final machine state as JSON to stderr
        #[arg(long)]
        dump_state: bool,
    },
    /// Interactive debugger
    #[cfg(feature = "tui")]
    Debug {
        /// Path to the LC-3 object image
        image: String,
    },
    /// Disassemble an object image
    Disasm {
        /// Path to the LC-3 object image
        image: String,
    },
}

/// Exit code when `--max-cycles` stops a program that has not halted.
const EXIT_CYCLE_LIMIT: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Run {
            image,
            max_cycles,
            trace,
            dump_state,
        }) => run_program(&image, max_cycles, trace, dump_state),
        #[cfg(feature = "tui")]
        Some(Commands::Debug { image }) => debug_program(&image),
        Some(Commands::Disasm { image }) => disassemble_file(&image),
        None => {
            println!("LC-3 VM v{}", env!("CARGO_PKG_VERSION"));
            println!("A virtual machine for the LC-3 educational computer");
            println!();
            println!("Use --help for available commands");
            ExitCode::SUCCESS
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(path: &str) -> Option<Image> {
    match lc3::load_image(path) {
        Ok(image) => Some(image),
        Err(e) => {
            eprintln!("Failed to load {}: {}", path, e);
            None
        }
    }
}

fn run_program(path: &str, max_cycles: Option<u64>, trace: bool, dump_state: bool) -> ExitCode {
    let Some(image) = load(path) else {
        return ExitCode::FAILURE;
    };

    let mut machine = Machine::new();
    if let Err(e) = machine.load_image(&image) {
        eprintln!("Failed to load program: {}", e);
        return ExitCode::FAILURE;
    }

    // Single keypresses on a terminal; raw mode is held only while a
    // trap blocks on input
    let mut console = if std::io::stdin().is_terminal() {
        StdConsole::raw()
    } else {
        StdConsole::new()
    };

    let result = execute(&mut machine, &mut console, max_cycles, trace);
    let _ = console.flush();

    if dump_state {
        let summary = serde_json::json!({
            "state": machine.state,
            "cycles": machine.cycles,
            "registers": machine.regs,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => eprintln!("{}", json),
            Err(e) => eprintln!("Failed to serialize state: {}", e),
        }
    }

    if let Err(e) = result {
        eprintln!("Machine error: {}", e);
        return ExitCode::FAILURE;
    }

    match machine.state {
        MachineState::Halted => ExitCode::SUCCESS,
        MachineState::Running => {
            eprintln!(
                "Reached max cycles limit ({}). Use --max-cycles to increase.",
                machine.cycles
            );
            ExitCode::from(EXIT_CYCLE_LIMIT)
        }
        MachineState::Faulted => ExitCode::FAILURE,
    }
}

fn execute(
    machine: &mut Machine,
    console: &mut StdConsole,
    max_cycles: Option<u64>,
    trace: bool,
) -> Result<u64, lc3::MachineError> {
    if !trace {
        return match max_cycles {
            Some(max) => machine.run_limited(console, max),
            None => machine.run(console),
        };
    }

    let limit = max_cycles.unwrap_or(u64::MAX);
    machine.run_traced(console, limit, |pc, word, regs| {
        eprintln!("{}", lc3::image::trace_line(pc, word, regs));
    })
}

#[cfg(feature = "tui")]
fn debug_program(path: &str) -> ExitCode {
    let Some(image) = load(path) else {
        return ExitCode::FAILURE;
    };

    if let Err(e) = lc3::run_debugger(image) {
        eprintln!("Debugger error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn disassemble_file(path: &str) -> ExitCode {
    let Some(image) = load(path) else {
        return ExitCode::FAILURE;
    };

    print!("{}", lc3::disassemble(image.origin, &image.words));
    ExitCode::SUCCESS
}
