// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::ChannelTransportHub;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};
use work_dispatch_core::workload::{clock_seed, generate_workload};
use work_dispatch_core::{
    Coordinator, DispatchError, DispatchSummary, Rank, RunConfig, ScaledTimer, SleepSimulator,
    TokioTimer, WorkItem, WorkSimulator, Worker, WorkerChannel, WorkerSummary, COORDINATOR_RANK,
};

/// Generate a random workload and run it on one task per worker, with
/// sleep-based simulated costs
pub async fn run_cluster(
    config: &RunConfig,
) -> Result<(DispatchSummary, Vec<WorkerSummary>), DispatchError> {
    let base_seed = clock_seed();
    let mut rng = StdRng::seed_from_u64(config.seed_for(base_seed, COORDINATOR_RANK));
    let items = generate_workload(&mut rng, config.num_items, config.num_categories());

    run_cluster_with(config, items, |rank| {
        SleepSimulator::new(
            config.cost_table.clone(),
            ScaledTimer::new(TokioTimer, config.time_scale),
            config.seed_for(base_seed, rank),
        )
    })
    .await
}

/// Run `items` on `config.num_workers` worker tasks.
///
/// When a worker fails, its error is returned in preference to the
/// coordinator's, since the coordinator only sees the closed channel.
pub async fn run_cluster_with<S, F>(
    config: &RunConfig,
    items: Vec<WorkItem>,
    mut make_simulator: F,
) -> Result<(DispatchSummary, Vec<WorkerSummary>), DispatchError>
where
    S: WorkSimulator + 'static,
    F: FnMut(Rank) -> S,
{
    config.validate()?;
    let (endpoint, channels) = ChannelTransportHub::setup(config.num_workers);

    let mut handles = Vec::with_capacity(channels.len());
    for channel in channels {
        let rank = channel.rank();
        let mut worker = Worker::new(channel, make_simulator(rank));
        handles.push((rank, tokio::spawn(async move { worker.run().await })));
    }

    let coordinator = Coordinator::new(
        endpoint,
        items,
        config.num_categories(),
        config.receive_strategy,
    );
    // The endpoint is dropped when `run` returns, which unblocks any worker
    // still waiting on its inbox
    let outcome = coordinator.run().await;

    let mut summaries = Vec::with_capacity(handles.len());
    let mut worker_error = None;
    for (rank, handle) in handles {
        let reason = match handle.await {
            Ok(Ok(summary)) => {
                summaries.push(summary);
                continue;
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => e.to_string(),
        };
        warn!(rank, %reason, "Worker failed");
        worker_error.get_or_insert(DispatchError::WorkerFailed { rank, reason });
    }

    let summary = match (outcome, worker_error) {
        (_, Some(e)) => return Err(e),
        (Err(e), None) => return Err(e),
        (Ok(summary), None) => summary,
    };

    info!(workers = summaries.len(), "All worker tasks joined");
    Ok((summary, summaries))
}
