// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use work_dispatch_core::{
    ChannelError, CoordinatorChannel, Rank, WorkItem, WorkerChannel, WorkerMessage,
};

/// Per-category cost used by simulated workers, in seconds
pub const CATEGORY_COST: [f64; 5] = [1.0, 3.0, 3.5, 6.0, 8.0];

struct SimWorker {
    speed: f64,
    in_flight: Option<(f64, WorkItem)>,
    received: Vec<WorkerMessage>,
    sentinels: usize,
}

/// Discrete-event stand-in for a pool of workers.
///
/// Every assignment finishes at `clock + cost * speed`; `recv_any` always
/// returns the earliest finisher, so slower workers report less often.
/// Protocol violations are recorded instead of panicking so tests can
/// assert on them.
pub struct SimulatedCluster {
    workers: Vec<SimWorker>,
    clock: f64,
    injected: VecDeque<(Rank, WorkItem)>,
    pub violations: Vec<String>,
    pub fail_sends_after: Option<usize>,
    sends: usize,
}

impl SimulatedCluster {
    pub fn new(num_workers: usize) -> Self {
        Self::with_speeds(vec![1.0; num_workers])
    }

    /// One speed factor per worker; rank r uses `speeds[r - 1]`
    pub fn with_speeds(speeds: Vec<f64>) -> Self {
        Self {
            workers: speeds
                .into_iter()
                .map(|speed| SimWorker {
                    speed,
                    in_flight: None,
                    received: Vec::new(),
                    sentinels: 0,
                })
                .collect(),
            clock: 0.0,
            injected: VecDeque::new(),
            violations: Vec::new(),
            fail_sends_after: None,
            sends: 0,
        }
    }

    /// Queue a forged or duplicated completion ahead of real ones
    pub fn inject(&mut self, rank: Rank, item: WorkItem) {
        self.injected.push_back((rank, item));
    }

    pub fn received(&self, rank: Rank) -> &[WorkerMessage] {
        &self.workers[rank - 1].received
    }

    pub fn sentinels(&self, rank: Rank) -> usize {
        self.workers[rank - 1].sentinels
    }

    pub fn assignments(&self, rank: Rank) -> Vec<WorkItem> {
        self.received(rank)
            .iter()
            .filter_map(|message| match message {
                WorkerMessage::Assignment(item) => Some(*item),
                WorkerMessage::Terminate => None,
            })
            .collect()
    }

    pub fn total_assignments(&self) -> usize {
        (1..=self.workers.len())
            .map(|rank| self.assignments(rank).len())
            .sum()
    }

    pub fn total_sentinels(&self) -> usize {
        self.workers.iter().map(|w| w.sentinels).sum()
    }
}

#[async_trait]
impl CoordinatorChannel for SimulatedCluster {
    fn num_workers(&self) -> usize {
        self.workers.len()
    }

    async fn send(&mut self, rank: Rank, message: WorkerMessage) -> Result<(), ChannelError> {
        if let Some(limit) = self.fail_sends_after {
            if self.sends >= limit {
                return Err(ChannelError::Closed);
            }
        }
        self.sends += 1;

        let clock = self.clock;
        let worker = self
            .workers
            .get_mut(rank.wrapping_sub(1))
            .ok_or(ChannelError::UnknownRank(rank))?;

        if worker.sentinels > 0 {
            self.violations
                .push(format!("rank {} got {:?} after its sentinel", rank, message));
        }
        worker.received.push(message);

        match message {
            WorkerMessage::Assignment(item) => {
                if worker.in_flight.is_some() {
                    self.violations
                        .push(format!("rank {} got item {} while busy", rank, item.id));
                }
                let cost = CATEGORY_COST[item.category as usize] * worker.speed;
                worker.in_flight = Some((clock + cost, item.completed(cost)));
            }
            WorkerMessage::Terminate => {
                if worker.in_flight.is_some() {
                    self.violations
                        .push(format!("rank {} terminated with work in flight", rank));
                }
                worker.sentinels += 1;
            }
        }
        Ok(())
    }

    async fn recv_any(&mut self) -> Result<(Rank, WorkItem), ChannelError> {
        if let Some(injected) = self.injected.pop_front() {
            return Ok(injected);
        }

        let next = self
            .workers
            .iter()
            .enumerate()
            .filter_map(|(idx, w)| w.in_flight.map(|(finish, _)| (finish, idx)))
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let (finish, idx) = next.ok_or(ChannelError::Closed)?;
        self.clock = finish;
        let (_, item) = self.workers[idx].in_flight.take().ok_or(ChannelError::Closed)?;
        Ok((idx + 1, item))
    }

    /// Pending means some worker has already finished at the current clock
    fn poll_pending(&mut self) -> Result<bool, ChannelError> {
        let clock = self.clock;
        Ok(!self.injected.is_empty()
            || self
                .workers
                .iter()
                .any(|w| matches!(w.in_flight, Some((finish, _)) if finish <= clock)))
    }
}

/// Feeds a fixed script of messages to a worker and records its replies
pub struct ScriptedWorkerChannel {
    rank: Rank,
    script: VecDeque<WorkerMessage>,
    pub sent: Vec<WorkItem>,
}

impl ScriptedWorkerChannel {
    pub fn new(rank: Rank, script: Vec<WorkerMessage>) -> Self {
        Self {
            rank,
            script: script.into(),
            sent: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

#[async_trait]
impl WorkerChannel for ScriptedWorkerChannel {
    fn rank(&self) -> Rank {
        self.rank
    }

    async fn recv(&mut self) -> Result<WorkerMessage, ChannelError> {
        self.script.pop_front().ok_or(ChannelError::Closed)
    }

    async fn send(&mut self, item: WorkItem) -> Result<(), ChannelError> {
        self.sent.push(item);
        Ok(())
    }
}
