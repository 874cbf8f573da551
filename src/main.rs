use clap::Parser;
use lc3_vm::cancellation::CancellationToken;
use lc3_vm::emulator::Emulator;
use lc3_vm::errors::ExecutionError;
use lc3_vm::hardware::keyboard::{
    ChannelInputProvider, KeyboardInputProvider, TerminalInputProvider,
};
use lc3_vm::hardware::memory::PROGRAM_SECTION_START;
use lc3_vm::terminal::{CrosstermTerminal, RawLock, RawModeWriter};
use std::io;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const EXIT_LOAD_FAILURE: u8 = 1;
const EXIT_IO_FAILURE: u8 = 3;
const EXIT_INTERRUPTED: u8 = 130;
const EXIT_ILLEGAL_OPCODE: u8 = 134;

/// LC-3 virtual machine: loads program images and runs them until HALT.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Program images, loaded in order, later images overwrite earlier ones
    #[arg(required = true, value_name = "IMAGE")]
    images: Vec<PathBuf>,
    /// Initial program counter, hexadecimal
    #[arg(long, env = "LC3_ENTRY", default_value = "0x3000", value_parser = parse_address)]
    entry: u16,
    /// More log output on stderr, repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_address(s: &str) -> Result<u16, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .or_else(|| s.strip_prefix('x'))
        .unwrap_or(s);
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid address {s:?}: {e}"))
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let interactive = io::stdin().is_terminal();
    let cancellation = CancellationToken::new();
    let keyboard: Box<dyn KeyboardInputProvider> = if interactive {
        Box::new(TerminalInputProvider::new(cancellation.clone()))
    } else {
        Box::new(ChannelInputProvider::from_reader(io::stdin()))
    };
    let mut emu = Emulator::new(keyboard, cancellation);
    for image in &cli.images {
        if let Err(e) = emu.load_image_file(image) {
            eprintln!("failed to load image: {}: {e}", image.display());
            return ExitCode::from(EXIT_LOAD_FAILURE);
        }
    }
    if cli.entry != PROGRAM_SECTION_START {
        tracing::info!("Starting at {:#06X}", cli.entry);
    }
    emu.registers_mut().set_pc(cli.entry);

    let result = if interactive {
        run_raw(&mut emu)
    } else {
        let mut stdout = io::stdout().lock();
        emu.execute(&mut stdout)
    };
    match result {
        Ok(()) => {
            tracing::info!(instructions = emu.instructions_executed(), "VM shut down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            // best effort, the process ends anyway
            let _ = io::stdout().flush();
            eprintln!("\n{e}");
            tracing::debug!(?emu, "Final state");
            ExitCode::from(match e {
                ExecutionError::IllegalOpcode { .. } => EXIT_ILLEGAL_OPCODE,
                ExecutionError::Interrupted => EXIT_INTERRUPTED,
                ExecutionError::Io(_) => EXIT_IO_FAILURE,
            })
        }
    }
}

/// Runs with the console in raw mode, restored on every way out of this function.
fn run_raw(emu: &mut Emulator) -> Result<(), ExecutionError> {
    let _lock = RawLock::acquire(CrosstermTerminal)?;
    let stdout = io::stdout();
    let console = stdout.is_terminal();
    execute_to(emu, stdout.lock(), console)
}

/// Newlines are only translated when `out` is the raw mode console, redirected output
/// keeps plain `\n`.
fn execute_to(
    emu: &mut Emulator,
    mut out: impl Write,
    console: bool,
) -> Result<(), ExecutionError> {
    if console {
        emu.execute(&mut RawModeWriter::new(out))
    } else {
        emu.execute(&mut out)
    }
}
