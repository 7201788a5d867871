// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use clap::{Parser, Subcommand};
use tracing::info;
use work_dispatch_core::{logging, RunArgs};
use work_dispatch_process_rpc::{run_processes, run_worker, WorkerArgs};

#[derive(Parser, Debug)]
#[command(
    name = "work-dispatch-process-rpc",
    about = "Dynamic work dispatch with one OS process per participant"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the coordinator and spawn one worker process per rank
    Coordinator {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Run a single worker; started by the coordinator
    Worker(WorkerArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    match Cli::parse().command {
        Command::Coordinator { run } => {
            let config = run.resolve()?;
            println!("=== WORK DISPATCH (process rpc) ===");
            println!("  - Items: {}", config.num_items);
            println!("  - Workers: {}", config.num_workers);
            println!("  - Categories: {}", config.num_categories());
            println!();

            let exe = std::env::current_exe()?;
            let summary = run_processes(&config, &exe).await?;
            println!("{}", summary);

            let counters = summary.counters;
            info!(
                assignments = counters.assignments_sent,
                sentinels = counters.sentinels_sent,
                accepted = counters.completions_accepted,
                rejected = counters.completions_rejected,
                idle_polls = counters.idle_polls,
                "Dispatch counters"
            );
        }
        Command::Worker(args) => {
            run_worker(&args).await?;
        }
    }
    Ok(())
}
