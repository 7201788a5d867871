// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::WorkRecordCodec;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::codec::{Framed, FramedRead, FramedWrite};
use tracing::{debug, info, warn};
use work_dispatch_core::{
    ChannelError, CoordinatorChannel, Rank, WireRecord, WorkItem, WorkerChannel, WorkerMessage,
};

const CONNECT_ATTEMPTS: usize = 5;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(100);
const HANDSHAKE_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// What a connection reader forwards to the coordinator
#[derive(Debug)]
enum Inbound {
    Completion(Rank, WorkItem),
    Disconnected(Rank),
    Failed(Rank, ChannelError),
}

/// Coordinator side of the TCP star: one connection per worker rank
pub struct TcpCoordinatorChannel {
    /// Index `rank - 1`
    writers: Vec<FramedWrite<OwnedWriteHalf, WorkRecordCodec>>,
    inbound: mpsc::Receiver<Inbound>,
    /// Indexed by rank
    terminated: Vec<bool>,
    lookahead: Option<(Rank, WorkItem)>,
}

impl TcpCoordinatorChannel {
    /// Accept connections until every rank in `1..=num_workers` has completed
    /// the handshake. Unknown and duplicate ranks are dropped.
    pub async fn accept(listener: &TcpListener, num_workers: usize) -> Result<Self, ChannelError> {
        let mut slots: Vec<Option<FramedWrite<OwnedWriteHalf, WorkRecordCodec>>> =
            (0..num_workers).map(|_| None).collect();
        // One completion and one disconnect per worker at most
        let (tx, inbound) = mpsc::channel(2 * num_workers.max(1));
        let mut connected = 0;

        // Handshakes run concurrently so a silent peer cannot hold up the rest
        let mut handshakes = JoinSet::new();
        while connected < num_workers {
            tokio::select! {
                accepted = listener.accept() => {
                    let (mut stream, peer) = accepted?;
                    handshakes.spawn(async move {
                        let rank = timeout(HANDSHAKE_READ_TIMEOUT, stream.read_u32_le()).await;
                        (stream, peer, rank)
                    });
                }
                Some(joined) = handshakes.join_next() => {
                    let (stream, peer, rank) = match joined {
                        Ok(handshake) => handshake,
                        Err(e) => {
                            warn!(error = %e, "Handshake task failed");
                            continue;
                        }
                    };
                    let rank = match rank {
                        Ok(Ok(rank)) => rank as Rank,
                        Ok(Err(e)) => {
                            warn!(%peer, error = %e, "Handshake failed, dropping connection");
                            continue;
                        }
                        Err(_) => {
                            warn!(%peer, "Handshake timed out, dropping connection");
                            continue;
                        }
                    };

                    let slot = match rank.checked_sub(1).and_then(|idx| slots.get_mut(idx)) {
                        Some(slot) if slot.is_none() => slot,
                        Some(_) => {
                            warn!(rank, %peer, "Duplicate rank, dropping connection");
                            continue;
                        }
                        None => {
                            warn!(rank, %peer, "Unknown rank, dropping connection");
                            continue;
                        }
                    };

                    stream.set_nodelay(true)?;
                    let (read_half, write_half) = stream.into_split();
                    *slot = Some(FramedWrite::new(write_half, WorkRecordCodec));
                    spawn_reader(rank, read_half, tx.clone());
                    connected += 1;
                    debug!(rank, %peer, "Worker connected");
                }
            }
        }

        let writers = slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ChannelError::Handshake("missing worker connection".to_string()))?;
        info!(workers = num_workers, "All workers connected");

        Ok(Self {
            writers,
            inbound,
            terminated: vec![false; num_workers + 1],
            lookahead: None,
        })
    }

    /// Returns the completion carried by `event`, `None` for an expected
    /// disconnect, or the error that ends the run
    fn filter(&self, event: Inbound) -> Result<Option<(Rank, WorkItem)>, ChannelError> {
        match event {
            Inbound::Completion(rank, item) => Ok(Some((rank, item))),
            Inbound::Disconnected(rank) if self.terminated[rank] => {
                debug!(rank, "Worker disconnected after termination");
                Ok(None)
            }
            Inbound::Disconnected(rank) => {
                warn!(rank, "Worker disconnected before termination");
                Err(ChannelError::Closed)
            }
            Inbound::Failed(rank, e) => {
                warn!(rank, error = %e, "Worker connection failed");
                Err(e)
            }
        }
    }
}

fn spawn_reader(rank: Rank, read_half: OwnedReadHalf, tx: mpsc::Sender<Inbound>) {
    tokio::spawn(async move {
        let mut reader = FramedRead::new(read_half, WorkRecordCodec);
        while let Some(frame) = reader.next().await {
            let event = match frame {
                Ok(record) => Inbound::Completion(rank, record.into_item()),
                Err(e) => {
                    let _ = tx.send(Inbound::Failed(rank, e)).await;
                    return;
                }
            };
            if tx.send(event).await.is_err() {
                return;
            }
        }
        let _ = tx.send(Inbound::Disconnected(rank)).await;
    });
}

#[async_trait]
impl CoordinatorChannel for TcpCoordinatorChannel {
    fn num_workers(&self) -> usize {
        self.writers.len()
    }

    async fn send(&mut self, rank: Rank, message: WorkerMessage) -> Result<(), ChannelError> {
        let writer = rank
            .checked_sub(1)
            .and_then(|idx| self.writers.get_mut(idx))
            .ok_or(ChannelError::UnknownRank(rank))?;
        writer.send(WireRecord::from_message(&message)).await?;
        if message.is_terminate() {
            self.terminated[rank] = true;
        }
        Ok(())
    }

    async fn recv_any(&mut self) -> Result<(Rank, WorkItem), ChannelError> {
        if let Some(pending) = self.lookahead.take() {
            return Ok(pending);
        }
        loop {
            let event = self.inbound.recv().await.ok_or(ChannelError::Closed)?;
            if let Some(completion) = self.filter(event)? {
                return Ok(completion);
            }
        }
    }

    fn poll_pending(&mut self) -> Result<bool, ChannelError> {
        if self.lookahead.is_some() {
            return Ok(true);
        }
        loop {
            match self.inbound.try_recv() {
                Ok(event) => {
                    if let Some(completion) = self.filter(event)? {
                        self.lookahead = Some(completion);
                        return Ok(true);
                    }
                }
                Err(TryRecvError::Empty) => return Ok(false),
                Err(TryRecvError::Disconnected) => return Err(ChannelError::Closed),
            }
        }
    }
}

/// Worker side of the TCP star
pub struct TcpWorkerChannel {
    rank: Rank,
    framed: Framed<TcpStream, WorkRecordCodec>,
}

impl TcpWorkerChannel {
    /// Connect to the coordinator and announce `rank`
    pub async fn connect(addr: SocketAddr, rank: Rank) -> Result<Self, ChannelError> {
        let rank_id = u32::try_from(rank)
            .map_err(|_| ChannelError::Handshake(format!("rank {} does not fit in u32", rank)))?;

        let mut attempts = 0;
        let mut stream = loop {
            match TcpStream::connect(addr).await {
                Ok(stream) => break stream,
                Err(e) => {
                    attempts += 1;
                    if attempts >= CONNECT_ATTEMPTS {
                        return Err(e.into());
                    }
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                }
            }
        };

        stream.set_nodelay(true)?;
        stream.write_u32_le(rank_id).await?;
        Ok(Self {
            rank,
            framed: Framed::new(stream, WorkRecordCodec),
        })
    }
}

#[async_trait]
impl WorkerChannel for TcpWorkerChannel {
    fn rank(&self) -> Rank {
        self.rank
    }

    async fn recv(&mut self) -> Result<WorkerMessage, ChannelError> {
        match self.framed.next().await {
            Some(record) => Ok(record?.into_message()),
            None => Err(ChannelError::Closed),
        }
    }

    async fn send(&mut self, item: WorkItem) -> Result<(), ChannelError> {
        self.framed.send(WireRecord::from_item(&item)).await
    }
}
