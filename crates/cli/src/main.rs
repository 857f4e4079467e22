//! `apex` — run an APEX assembly program against the out-of-order simulator.

use std::path::PathBuf;
use std::process::ExitCode;

use apex_core::config::Config;
use apex_core::sim::simulator::{RunStatus, Simulator};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Run an APEX assembly program on the out-of-order core.
#[derive(Parser, Debug)]
#[command(name = "apex", version, about)]
struct Args {
    /// Path to an APEX assembly source file.
    program: PathBuf,

    /// Upper bound on cycles to execute before giving up.
    #[arg(long, default_value_t = 1_000_000)]
    max_cycles: u64,

    /// Emit the per-cycle verbose trace (§6) and a final state dump.
    #[arg(long, short = 'v')]
    trace: bool,

    /// Print accumulated statistics after the run.
    #[arg(long)]
    stats: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let config = Config {
        max_cycles: args.max_cycles,
        verbose: args.trace,
        ..Config::default()
    };

    let mut sim = match Simulator::init(&args.program, &config) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("apex: {err}");
            return ExitCode::FAILURE;
        }
    };

    let status = sim.run(config.max_cycles);
    if args.stats {
        sim.stats().print();
    }

    let snapshot = sim.snapshot();
    println!("cycles: {}", snapshot.cycles);
    println!("instructions retired: {}", snapshot.instructions_retired);
    for (r, value) in snapshot.registers.iter().enumerate() {
        println!("R{r} = {value}");
    }
    for (addr, value) in &snapshot.memory {
        println!("MEM[{addr}] = {value}");
    }

    match status {
        RunStatus::Halted => ExitCode::SUCCESS,
        RunStatus::CycleLimit => {
            eprintln!("apex: cycle limit reached before HALT retired");
            ExitCode::FAILURE
        }
    }
}
