//! CLI entry point for the rendezvous boot-test harness.

use clap::Parser;
use muster_harness::run_group;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "muster-harness")]
#[command(about = "Exercise the rendezvous protocol across simulated ranks", long_about = None)]
struct Cli {
    /// Number of simulated ranks
    #[arg(short, long, default_value = "4")]
    ranks: usize,

    /// Enable verbose logging (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.ranks == 0 {
        eprintln!("--ranks must be at least 1");
        return std::process::ExitCode::FAILURE;
    }

    let mut failed = false;
    for (rank, outcome) in run_group(cli.ranks).await.iter().enumerate() {
        match outcome {
            Ok(()) => println!("{rank}: SUCCESS"),
            Err(error) => {
                println!("{rank}: FAILED ({error:#})");
                failed = true;
            }
        }
    }

    if failed {
        std::process::ExitCode::FAILURE
    } else {
        std::process::ExitCode::SUCCESS
    }
}
