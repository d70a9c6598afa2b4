//! `t81vm` — the CLI frontend.
//!
//! A thin consumer of `core::state`, `core::summary`, and `format`: it
//! holds a `State`, forwards every operation to it, and renders trace
//! and snapshot text. No opcode semantics live here.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use t81vm::core::summary::snapshot_summary;
use t81vm::format::load_program_from_file;

/// Default step budget for `run_to_halt` when `--max-steps` is omitted.
const DEFAULT_MAX_STEPS: u64 = 1_000_000;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Interpreter,
    AcceleratedPreview,
}

/// A deterministic register-based virtual machine for the TISC
/// instruction set.
#[derive(Parser, Debug)]
#[command(name = "t81vm", version, about)]
struct Cli {
    /// Print one TRACE line per executed instruction.
    #[arg(long)]
    trace: bool,

    /// Print the SNAPSHOT/REGISTERS/STATE_HASH summary after execution.
    #[arg(long)]
    snapshot: bool,

    /// Watchdog step budget for run_to_halt.
    #[arg(long, value_name = "N")]
    max_steps: Option<u64>,

    /// Execution backend. `accelerated-preview` runs the same
    /// interpreter core and prints one informational line to stderr.
    #[arg(long, value_enum, default_value_t = Mode::Interpreter)]
    mode: Mode,

    /// Echo a bigint literal, stripped of leading/trailing whitespace.
    #[arg(long = "canonical-bigint", value_name = "LITERAL")]
    canonical_bigint: Option<String>,

    /// Echo a fraction literal, stripped of leading/trailing whitespace.
    #[arg(long = "canonical-fraction", value_name = "LITERAL")]
    canonical_fraction: Option<String>,

    /// Echo a tensor literal, stripped of leading/trailing whitespace.
    #[arg(long = "canonical-tensor", value_name = "LITERAL")]
    canonical_tensor: Option<String>,

    /// The program file to load (`.t81`/`.t81vm` text or `.json`).
    program: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if let Some(literal) = cli.canonical_bigint.or(cli.canonical_fraction).or(cli.canonical_tensor) {
        println!("{}", literal.trim());
        return ExitCode::SUCCESS;
    }

    let Some(program_path) = cli.program else {
        eprintln!("usage: t81vm [--trace] [--snapshot] [--max-steps N] [--mode interpreter|accelerated-preview] <program>");
        return ExitCode::from(2);
    };

    let program = match load_program_from_file(&program_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("parse error: {e}");
            return ExitCode::from(1);
        }
    };

    if cli.mode == Mode::AcceleratedPreview {
        eprintln!("accelerated-preview: no hardware backend available, running on the interpreter core");
    }

    let mut state = t81vm::core::loader::load_program(&program);
    log::info!("loaded program with {} instructions", program.insns.len());

    let max_steps = cli.max_steps.unwrap_or(DEFAULT_MAX_STEPS);
    let result = state.run_to_halt(max_steps);

    let trace_enabled = cli.trace || !cli.snapshot;
    if trace_enabled {
        for entry in &state.trace {
            print_trace_entry(entry);
        }
    }
    if cli.snapshot {
        println!("{}", snapshot_summary(&state));
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(trap) => {
            eprintln!("FAULT {}", trap.name());
            if let Some(payload) = &state.last_trap_payload {
                eprintln!("{payload}");
            }
            ExitCode::from(1)
        }
    }
}

fn print_trace_entry(entry: &t81vm::core::trap::TraceEntry) {
    let mut line = format!("TRACE pc={} opcode={}", entry.pc, entry.opcode.as_u64());
    if let Some((reg, value, tag)) = entry.write {
        line.push_str(&format!(" write=r{reg}={value}:{tag}"));
    }
    if let Some(trap) = entry.trap {
        line.push_str(&format!(" trap={}", trap.name()));
    }
    println!("{line}");
}
