// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use clap::Parser;
use tracing::info;
use work_dispatch_core::{logging, RunArgs};
use work_dispatch_task_channels::run_cluster;

#[derive(Parser, Debug)]
#[command(
    name = "work-dispatch-task-channels",
    about = "Dynamic work dispatch with one tokio task per worker"
)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();
    let cli = Cli::parse();
    let config = cli.run.resolve()?;

    println!("=== WORK DISPATCH (task channels) ===");
    println!("  - Items: {}", config.num_items);
    println!("  - Workers: {}", config.num_workers);
    println!("  - Categories: {}", config.num_categories());
    println!("  - Time scale: {}", config.time_scale);
    println!();

    let (summary, workers) = run_cluster(&config).await?;

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
    for worker in &workers {
        info!(
            rank = worker.rank,
            items = worker.items_processed,
            busy = worker.busy_time,
            "Worker summary"
        );
    }
    Ok(())
}
