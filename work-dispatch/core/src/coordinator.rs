// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::{
    CoordinatorChannel, DispatchError, Rank, StatsAggregator, StatsReport, WorkItem, WorkQueue,
    WorkerMessage, COORDINATOR_RANK,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// How the drain loop waits for completions.
///
/// Both strategies receive exactly one message per step. `PollThenBlock`
/// checks for a pending message first and records idle steps before falling
/// back to a blocking receive; it only affects bookkeeping, never ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiveStrategy {
    Blocking,
    #[default]
    PollThenBlock,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchCounters {
    pub assignments_sent: usize,
    pub sentinels_sent: usize,
    pub completions_accepted: usize,
    pub completions_rejected: usize,
    /// Drain steps that found nothing pending and had to block
    pub idle_polls: usize,
}

/// Everything the coordinator hands back once all workers are stopped
#[derive(Debug, Clone)]
pub struct DispatchSummary {
    pub report: StatsReport,
    pub counters: DispatchCounters,
    pub items: Vec<WorkItem>,
    pub wall_time: Duration,
}

impl fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.report)?;
        write!(
            f,
            "Total execution time: {:.3} sec",
            self.wall_time.as_secs_f64()
        )
    }
}

/// Owns the work queue and statistics, and drives the dispatch protocol
/// over a [`CoordinatorChannel`]
pub struct Coordinator<C: CoordinatorChannel> {
    channel: C,
    queue: WorkQueue,
    stats: StatsAggregator,
    strategy: ReceiveStrategy,
    /// Indexed by rank; slot 0 is the coordinator and stays false
    terminated: Vec<bool>,
    finished: usize,
    seeded: bool,
    counters: DispatchCounters,
}

impl<C: CoordinatorChannel> Coordinator<C> {
    /// `items[i].id` must equal `i`. A misnumbered queue is reported by
    /// `seed` before anything is sent.
    pub fn new(
        channel: C,
        items: Vec<WorkItem>,
        num_categories: usize,
        strategy: ReceiveStrategy,
    ) -> Self {
        let num_workers = channel.num_workers();
        Self {
            channel,
            queue: WorkQueue::new(items),
            stats: StatsAggregator::new(num_workers, num_categories),
            strategy,
            terminated: vec![false; num_workers + 1],
            finished: 0,
            seeded: false,
            counters: DispatchCounters::default(),
        }
    }

    pub fn num_workers(&self) -> usize {
        self.terminated.len() - 1
    }

    pub fn finished(&self) -> usize {
        self.finished
    }

    pub fn is_done(&self) -> bool {
        self.seeded && self.finished == self.num_workers()
    }

    pub fn head(&self) -> usize {
        self.queue.head()
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    pub fn counters(&self) -> DispatchCounters {
        self.counters
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Runs the complete dispatch protocol: seed, drain, report
    pub async fn run(mut self) -> Result<DispatchSummary, DispatchError> {
        let start = Instant::now();
        info!(
            items = self.queue.len(),
            workers = self.num_workers(),
            "Starting on {} workloads",
            self.queue.len()
        );

        if !self.seeded {
            self.seed().await?;
        }
        while !self.is_done() {
            self.handle_workers().await?;
        }

        info!(
            assignments = self.counters.assignments_sent,
            sentinels = self.counters.sentinels_sent,
            rejected = self.counters.completions_rejected,
            "All workers finished"
        );
        Ok(self.into_summary(start.elapsed()))
    }

    /// Deal one item to every worker in rank order. Workers that cannot get
    /// an item are terminated immediately.
    pub async fn seed(&mut self) -> Result<(), DispatchError> {
        if self.seeded {
            return Err(DispatchError::UnexpectedMessage(
                "coordinator already seeded".to_string(),
            ));
        }
        self.queue.check_ids()?;
        for rank in 1..=self.num_workers() {
            self.dispatch_next(rank).await?;
        }
        self.seeded = true;
        Ok(())
    }

    /// Receive exactly one completion and answer its sender.
    /// Returns how many workers were terminated by this step (0 or 1).
    pub async fn handle_workers(&mut self) -> Result<usize, DispatchError> {
        if self.strategy == ReceiveStrategy::PollThenBlock && !self.channel.poll_pending()? {
            self.counters.idle_polls += 1;
            trace!(
                in_flight = self.queue.in_flight(),
                head = self.queue.head(),
                "No completion pending, blocking"
            );
        }

        let (rank, report) = self.channel.recv_any().await?;

        let item = match self.queue.complete(rank, &report) {
            Ok(item) => item,
            Err(reason) => {
                self.counters.completions_rejected += 1;
                warn!(rank, id = report.id, %reason, "Ignoring malformed completion");
                return Ok(0);
            }
        };

        self.counters.completions_accepted += 1;
        self.stats.record(rank, item.category, item.elapsed);
        debug!(
            rank,
            id = item.id,
            category = item.category,
            elapsed = item.elapsed,
            "Completion recorded"
        );

        let terminated = self.dispatch_next(rank).await?;
        Ok(usize::from(terminated))
    }

    /// Send the next queued item to `rank`, or the sentinel when the queue is
    /// exhausted. Returns true when the worker was terminated.
    async fn dispatch_next(&mut self, rank: Rank) -> Result<bool, DispatchError> {
        match self.queue.assign_next(rank) {
            Some(item) => {
                self.channel
                    .send(rank, WorkerMessage::Assignment(item))
                    .await?;
                self.counters.assignments_sent += 1;
                Ok(false)
            }
            None => {
                self.terminate(rank).await?;
                Ok(true)
            }
        }
    }

    async fn terminate(&mut self, rank: Rank) -> Result<(), DispatchError> {
        match self.terminated.get(rank) {
            Some(false) if rank != COORDINATOR_RANK => {}
            Some(true) => {
                return Err(DispatchError::UnexpectedMessage(format!(
                    "rank {} was already terminated",
                    rank
                )))
            }
            _ => {
                return Err(DispatchError::UnexpectedMessage(format!(
                    "rank {} is not a worker",
                    rank
                )))
            }
        }

        self.channel.send(rank, WorkerMessage::Terminate).await?;
        self.terminated[rank] = true;
        self.finished += 1;
        self.counters.sentinels_sent += 1;
        info!(rank, "{}/{} finished", self.finished, self.num_workers());
        Ok(())
    }

    fn into_summary(self, wall_time: Duration) -> DispatchSummary {
        DispatchSummary {
            report: self.stats.report(),
            counters: self.counters,
            items: self.queue.into_items(),
            wall_time,
        }
    }
}
