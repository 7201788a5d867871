// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use work_dispatch_core::{
    ChannelError, CoordinatorChannel, Rank, WorkItem, WorkerChannel, WorkerMessage,
};

/// Builds the star of tokio channels between one coordinator and its workers
pub struct ChannelTransportHub;

impl ChannelTransportHub {
    /// Worker endpoints are returned in rank order, starting at rank 1
    pub fn setup(num_workers: usize) -> (CoordinatorEndpoint, Vec<WorkerEndpoint>) {
        // Every worker has at most one completion outstanding
        let (completion_tx, completion_rx) = mpsc::channel(num_workers.max(1));

        let mut inboxes = Vec::with_capacity(num_workers);
        let mut workers = Vec::with_capacity(num_workers);
        for rank in 1..=num_workers {
            let (tx, rx) = mpsc::channel(1);
            inboxes.push(tx);
            workers.push(WorkerEndpoint {
                rank,
                inbox: rx,
                completions: completion_tx.clone(),
            });
        }

        let coordinator = CoordinatorEndpoint {
            inboxes,
            completions: completion_rx,
            lookahead: None,
        };
        (coordinator, workers)
    }
}

pub struct CoordinatorEndpoint {
    /// Index `rank - 1`
    inboxes: Vec<mpsc::Sender<WorkerMessage>>,
    completions: mpsc::Receiver<(Rank, WorkItem)>,
    /// Completion taken off the channel by `poll_pending` but not yet consumed
    lookahead: Option<(Rank, WorkItem)>,
}

#[async_trait]
impl CoordinatorChannel for CoordinatorEndpoint {
    fn num_workers(&self) -> usize {
        self.inboxes.len()
    }

    async fn send(&mut self, rank: Rank, message: WorkerMessage) -> Result<(), ChannelError> {
        let inbox = rank
            .checked_sub(1)
            .and_then(|idx| self.inboxes.get(idx))
            .ok_or(ChannelError::UnknownRank(rank))?;
        inbox.send(message).await.map_err(|_| ChannelError::Closed)
    }

    async fn recv_any(&mut self) -> Result<(Rank, WorkItem), ChannelError> {
        if let Some(pending) = self.lookahead.take() {
            return Ok(pending);
        }
        self.completions.recv().await.ok_or(ChannelError::Closed)
    }

    fn poll_pending(&mut self) -> Result<bool, ChannelError> {
        if self.lookahead.is_some() {
            return Ok(true);
        }
        match self.completions.try_recv() {
            Ok(pending) => {
                self.lookahead = Some(pending);
                Ok(true)
            }
            Err(TryRecvError::Empty) => Ok(false),
            Err(TryRecvError::Disconnected) => Err(ChannelError::Closed),
        }
    }
}

pub struct WorkerEndpoint {
    rank: Rank,
    inbox: mpsc::Receiver<WorkerMessage>,
    completions: mpsc::Sender<(Rank, WorkItem)>,
}

#[async_trait]
impl WorkerChannel for WorkerEndpoint {
    fn rank(&self) -> Rank {
        self.rank
    }

    async fn recv(&mut self) -> Result<WorkerMessage, ChannelError> {
        self.inbox.recv().await.ok_or(ChannelError::Closed)
    }

    async fn send(&mut self, item: WorkItem) -> Result<(), ChannelError> {
        self.completions
            .send((self.rank, item))
            .await
            .map_err(|_| ChannelError::Closed)
    }
}
