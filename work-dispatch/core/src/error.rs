// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::Rank;
use thiserror::Error;

/// Transport-level failures. Every one of these is fatal for the run.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("channel closed")]
    Closed,

    #[error("no worker with rank {0}")]
    UnknownRank(Rank),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("handshake failed: {0}")]
    Handshake(String),
}

impl From<bincode::Error> for ChannelError {
    fn from(e: bincode::Error) -> Self {
        ChannelError::Codec(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("transport failure: {0}")]
    Channel(#[from] ChannelError),

    #[error("unknown work category {category} (cost table has {known})")]
    UnknownCategory { category: u32, known: usize },

    #[error("unexpected message: {0}")]
    UnexpectedMessage(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("worker {rank} failed: {reason}")]
    WorkerFailed { rank: Rank, reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0}")]
    Invalid(String),
}

impl From<ConfigError> for DispatchError {
    fn from(e: ConfigError) -> Self {
        DispatchError::InvalidConfig(e.to_string())
    }
}
