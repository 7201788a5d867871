// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::{DispatchError, Rank, WorkSimulator, WorkerChannel, WorkerMessage};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    AwaitingWork,
    Computing,
    Reporting,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerSummary {
    pub rank: Rank,
    pub items_processed: usize,
    pub busy_time: f64,
}

/// Processes items from the coordinator until told to stop
pub struct Worker<C: WorkerChannel, S: WorkSimulator> {
    channel: C,
    simulator: S,
    state: WorkerState,
}

impl<C: WorkerChannel, S: WorkSimulator> Worker<C, S> {
    pub fn new(channel: C, simulator: S) -> Self {
        Self {
            channel,
            simulator,
            state: WorkerState::AwaitingWork,
        }
    }

    pub fn rank(&self) -> Rank {
        self.channel.rank()
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub async fn run(&mut self) -> Result<WorkerSummary, DispatchError> {
        let rank = self.rank();
        if self.state == WorkerState::Stopped {
            return Err(DispatchError::UnexpectedMessage(format!(
                "worker {} already stopped",
                rank
            )));
        }
        let mut summary = WorkerSummary {
            rank,
            items_processed: 0,
            busy_time: 0.0,
        };
        info!(rank, "Worker started");

        loop {
            self.state = WorkerState::AwaitingWork;
            let mut item = match self.channel.recv().await? {
                WorkerMessage::Terminate => break,
                WorkerMessage::Assignment(item) => item,
            };

            self.state = WorkerState::Computing;
            let elapsed = self.simulator.simulate(item.category).await?;
            item.elapsed = elapsed;
            debug!(rank, id = item.id, category = item.category, elapsed, "Item computed");

            self.state = WorkerState::Reporting;
            self.channel.send(item).await?;
            summary.items_processed += 1;
            summary.busy_time += elapsed;
        }

        self.state = WorkerState::Stopped;
        info!(rank, items = summary.items_processed, "[{}] Done.", rank);
        Ok(summary)
    }
}
