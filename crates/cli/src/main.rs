//! AArch64 cycle-accurate pipeline simulator CLI.
//!
//! This binary loads a guest program (ELF or flat binary) and runs it to
//! completion. It performs:
//! 1. **Pipeline run:** Cycle-accurate execution at a chosen issue width,
//!    printing the stall profile on exit.
//! 2. **Direct run:** Serial functional execution for fast answer-only runs.
//! 3. **Config run:** JSON options files for sweep scripts.

use std::process;

use clap::Parser;

use a64sim_core::config::SimOptions;
use a64sim_core::sim::{DirectCore, Simulator, loader};

/// Default load/entry address for flat binaries.
const FLAT_LOAD_ADDR: u64 = 0x1000;

/// Safety cap for direct-mode runs of programs that never exit.
const DIRECT_STEP_CAP: u64 = 1_000_000_000;

#[derive(Parser, Debug)]
#[command(
    name = "a64sim",
    author,
    version,
    about = "AArch64 cycle-accurate pipeline simulator",
    long_about = "Run an AArch64 guest program through an M2-class superscalar pipeline \
model.\n\nExamples:\n  a64sim program.elf\n  a64sim --width 4 program.bin\n  a64sim --config sweep.json program.elf\n  a64sim --direct program.elf"
)]
struct Cli {
    /// Guest program: ELF image or flat binary (loaded at 0x1000).
    file: String,

    /// Issue width (1, 2, 4, 6, or 8); overrides the config file.
    #[arg(short, long)]
    width: Option<usize>,

    /// JSON options file (SimOptions schema).
    #[arg(short, long)]
    config: Option<String>,

    /// Serial functional execution, no timing.
    #[arg(long)]
    direct: bool,

    /// Print the stall profile even on non-zero guest exit.
    #[arg(long)]
    stats: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let bytes = match loader::read_file(&cli.file) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    let mut options = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("error: reading config {path}: {e}");
                process::exit(1);
            });
            serde_json::from_str::<SimOptions>(&text).unwrap_or_else(|e| {
                eprintln!("error: parsing config {path}: {e}");
                process::exit(1);
            })
        }
        None => SimOptions::default(),
    };
    if let Some(width) = cli.width {
        options.issue_width = width;
    }

    if cli.direct {
        run_direct(&bytes);
    }

    let mut sim = match Simulator::new(options) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };
    if let Err(e) = sim.load_program(&bytes, FLAT_LOAD_ADDR) {
        eprintln!("error: {e}");
        process::exit(1);
    }

    let code = sim.run();
    if cli.stats || code == 0 {
        eprint!("{}", sim.pipeline.stats().report());
    }
    process::exit(code as i32);
}

/// Runs the serial functional model and exits.
fn run_direct(bytes: &[u8]) -> ! {
    let mut mem = a64sim_core::mem::Memory::new();
    let entry = if loader::is_elf(bytes) {
        loader::load_elf(&mut mem, bytes).unwrap_or_else(|e| {
            eprintln!("error: {e}");
            process::exit(1);
        })
    } else {
        loader::load_flat(&mut mem, FLAT_LOAD_ADDR, bytes);
        FLAT_LOAD_ADDR
    };
    let mut core = DirectCore::new(a64sim_core::core::arch::RegisterFile::new(), mem);
    core.pc = entry;
    core.run(DIRECT_STEP_CAP);
    eprintln!("retired {} instructions", core.retired());
    process::exit(core.exit_code() as i32);
}
