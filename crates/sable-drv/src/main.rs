//! Sable CLI - the interpreter's driver binary.
//!
//! Invocation shapes:
//!
//! - `sable` - start the line-oriented REPL. Each non-blank line is
//!   interpreted as a complete program against one long-lived VM, so
//!   globals persist between lines. Errors are reported and the loop
//!   continues; EOF exits with status 0.
//! - `sable script.sbl` - interpret the file end-to-end. Exit status 65
//!   for compile errors, 70 for runtime errors, 0 on success.
//!
//! More than one positional argument is a usage error (clap reports it
//! on stderr and exits non-zero).

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sable_vm::{InterpretError, Vm};

/// Exit status for compile errors (sysexits EX_DATAERR).
const EXIT_COMPILE_ERROR: u8 = 65;
/// Exit status for runtime errors (sysexits EX_SOFTWARE).
const EXIT_RUNTIME_ERROR: u8 = 70;
/// Exit status for unreadable input files (sysexits EX_IOERR).
const EXIT_IO_ERROR: u8 = 74;

/// The Sable interpreter.
#[derive(Parser, Debug)]
#[command(name = "sable")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "The Sable interpreter", long_about = None)]
struct Cli {
    /// Script to interpret; omit to start the REPL
    script: Option<PathBuf>,

    /// Disassemble each compiled function before executing it
    #[arg(long, env = "SABLE_DUMP_BYTECODE")]
    dump_bytecode: bool,

    /// Enable verbose logging (overrides RUST_LOG)
    #[arg(short, long, env = "SABLE_VERBOSE")]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut vm = Vm::new();
    vm.set_dump_bytecode(cli.dump_bytecode);

    match &cli.script {
        Some(path) => run_file(&mut vm, path),
        None => repl(&mut vm),
    }
}

/// Logs go to stderr: stdout belongs to the interpreted program.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_file(vm: &mut Vm, path: &Path) -> ExitCode {
    let source = match std::fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))
    {
        Ok(source) => source,
        Err(error) => {
            eprintln!("error: {:#}", error);
            return ExitCode::from(EXIT_IO_ERROR);
        }
    };

    tracing::debug!(path = %path.display(), bytes = source.len(), "interpreting file");
    match vm.interpret(&source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(InterpretError::Compile) => ExitCode::from(EXIT_COMPILE_ERROR),
        Err(InterpretError::Runtime) => ExitCode::from(EXIT_RUNTIME_ERROR),
    }
}

fn repl(vm: &mut Vm) -> ExitCode {
    let stdin = std::io::stdin();
    let mut stdin = stdin.lock();
    let mut line = String::new();

    loop {
        print!("> ");
        if std::io::stdout().flush().is_err() {
            return ExitCode::FAILURE;
        }

        line.clear();
        match stdin.read_line(&mut line) {
            // EOF: finish the prompt's line, exit cleanly.
            Ok(0) => {
                println!();
                return ExitCode::SUCCESS;
            }
            Ok(_) => {
                if line.trim().is_empty() {
                    continue;
                }
                // Errors were already reported; the REPL carries on.
                let _ = vm.interpret(&line);
            }
            Err(error) => {
                eprintln!("error: could not read input: {}", error);
                return ExitCode::FAILURE;
            }
        }
    }
}
