// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::{TcpCoordinatorChannel, TcpWorkerChannel};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::net::SocketAddr;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::process::{Child, Command};
use tokio::time::{interval, timeout};
use tracing::{info, warn};
use work_dispatch_core::workload::{clock_seed, generate_workload};
use work_dispatch_core::{
    ChannelError, Coordinator, CostTable, DispatchError, DispatchSummary, Rank, RunConfig,
    ScaledTimer, SleepSimulator, TokioTimer, Worker, WorkerSummary, COORDINATOR_RANK,
};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Everything a worker process needs, passed on its command line
#[derive(Debug, Clone, clap::Args)]
pub struct WorkerArgs {
    #[arg(long)]
    pub rank: Rank,

    /// Coordinator listener address
    #[arg(long)]
    pub coordinator: SocketAddr,

    #[arg(long)]
    pub seed: u64,

    #[arg(long, default_value_t = 1.0)]
    pub time_scale: f64,

    /// Cost table as JSON, e.g. `[[0.1,3.0],[2.0,5.0]]`
    #[arg(long)]
    pub cost_table: String,
}

/// Run the coordinator in this process and one worker per rank as a child
/// process of `worker_exe`
pub async fn run_processes(
    config: &RunConfig,
    worker_exe: &Path,
) -> Result<DispatchSummary, DispatchError> {
    config.validate()?;

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(ChannelError::from)?;
    let addr = listener.local_addr().map_err(ChannelError::from)?;
    let cost_table = serde_json::to_string(&config.cost_table)
        .map_err(|e| DispatchError::InvalidConfig(e.to_string()))?;

    let base_seed = clock_seed();
    let mut rng = StdRng::seed_from_u64(config.seed_for(base_seed, COORDINATOR_RANK));
    let items = generate_workload(&mut rng, config.num_items, config.num_categories());

    let mut children = Vec::with_capacity(config.num_workers);
    for rank in 1..=config.num_workers {
        let child = Command::new(worker_exe)
            .arg("worker")
            .arg("--rank")
            .arg(rank.to_string())
            .arg("--coordinator")
            .arg(addr.to_string())
            .arg("--seed")
            .arg(config.seed_for(base_seed, rank).to_string())
            .arg("--time-scale")
            .arg(config.time_scale.to_string())
            .arg("--cost-table")
            .arg(&cost_table)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(ChannelError::from)?;
        children.push((rank, child));
    }
    info!(workers = children.len(), %addr, "Worker processes spawned");

    let accept = timeout(
        HANDSHAKE_TIMEOUT,
        TcpCoordinatorChannel::accept(&listener, config.num_workers),
    );
    tokio::pin!(accept);
    let mut child_check = interval(CHILD_POLL_INTERVAL);
    let accepted = loop {
        tokio::select! {
            result = &mut accept => break result,
            _ = child_check.tick() => {
                // Workers only exit after termination, so any exit here is a failure
                if let Some(e) = exited_child(&mut children) {
                    return Err(e);
                }
            }
        }
    };
    let channel = accepted
        .map_err(|_| ChannelError::Handshake("timed out waiting for workers".to_string()))??;

    let summary = Coordinator::new(
        channel,
        items,
        config.num_categories(),
        config.receive_strategy,
    )
    .run()
    .await?;

    wait_for_children(children).await?;
    Ok(summary)
}

fn exited_child(children: &mut [(Rank, Child)]) -> Option<DispatchError> {
    children.iter_mut().find_map(|(rank, child)| match child.try_wait() {
        Ok(Some(status)) => {
            warn!(rank = *rank, %status, "Worker process exited before connecting");
            Some(DispatchError::WorkerFailed {
                rank: *rank,
                reason: format!("exited before connecting: {}", status),
            })
        }
        _ => None,
    })
}

async fn wait_for_children(children: Vec<(Rank, Child)>) -> Result<(), DispatchError> {
    let mut failure = None;
    for (rank, mut child) in children {
        let status = child.wait().await.map_err(ChannelError::from)?;
        if !status.success() {
            warn!(rank, %status, "Worker process failed");
            failure.get_or_insert(DispatchError::WorkerFailed {
                rank,
                reason: status.to_string(),
            });
        }
    }
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Body of a worker process: connect, process until terminated, exit
pub async fn run_worker(args: &WorkerArgs) -> Result<WorkerSummary, DispatchError> {
    let cost_table: CostTable = serde_json::from_str(&args.cost_table)
        .map_err(|e| DispatchError::InvalidConfig(e.to_string()))?;
    let config = RunConfig {
        cost_table,
        time_scale: args.time_scale,
        ..RunConfig::default()
    };
    config.validate()?;

    let channel = TcpWorkerChannel::connect(args.coordinator, args.rank).await?;
    let simulator = SleepSimulator::new(
        config.cost_table,
        ScaledTimer::new(TokioTimer, config.time_scale),
        args.seed,
    );

    Worker::new(channel, simulator).run().await
}
