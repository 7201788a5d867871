// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::{ChannelError, Rank, WorkItem, WorkerMessage};
use async_trait::async_trait;

/// Coordinator end of the star topology.
/// Different implementations for tasks, sockets, processes, etc.
#[async_trait]
pub trait CoordinatorChannel: Send {
    /// Number of workers reachable through this channel
    fn num_workers(&self) -> usize;

    /// Send an assignment or the termination sentinel to a worker
    async fn send(&mut self, rank: Rank, message: WorkerMessage) -> Result<(), ChannelError>;

    /// Block until any worker reports a completed item
    /// Returns the sender's rank together with the item
    async fn recv_any(&mut self) -> Result<(Rank, WorkItem), ChannelError>;

    /// Non-blocking check for a pending completion from any worker
    fn poll_pending(&mut self) -> Result<bool, ChannelError>;
}

/// Worker end of the star topology. Workers only ever talk to the coordinator.
#[async_trait]
pub trait WorkerChannel: Send {
    fn rank(&self) -> Rank;

    /// Block until the coordinator sends the next message
    async fn recv(&mut self) -> Result<WorkerMessage, ChannelError>;

    /// Report a completed item back to the coordinator
    async fn send(&mut self, item: WorkItem) -> Result<(), ChannelError>;
}

#[async_trait]
impl<T: CoordinatorChannel + ?Sized> CoordinatorChannel for &mut T {
    fn num_workers(&self) -> usize {
        (**self).num_workers()
    }

    async fn send(&mut self, rank: Rank, message: WorkerMessage) -> Result<(), ChannelError> {
        (**self).send(rank, message).await
    }

    async fn recv_any(&mut self) -> Result<(Rank, WorkItem), ChannelError> {
        (**self).recv_any().await
    }

    fn poll_pending(&mut self) -> Result<bool, ChannelError> {
        (**self).poll_pending()
    }
}

#[async_trait]
impl<T: WorkerChannel + ?Sized> WorkerChannel for &mut T {
    fn rank(&self) -> Rank {
        (**self).rank()
    }

    async fn recv(&mut self) -> Result<WorkerMessage, ChannelError> {
        (**self).recv().await
    }

    async fn send(&mut self, item: WorkItem) -> Result<(), ChannelError> {
        (**self).send(item).await
    }
}
