// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::{ChannelError, WorkItem};
use serde::{Deserialize, Serialize};

/// Wire id reserved for the termination sentinel (bit pattern of -1)
pub const SENTINEL_ID: u32 = u32::MAX;

/// Encoded size of a [`WireRecord`]: u32 + u32 + f64
pub const WIRE_RECORD_LEN: usize = 16;

/// Message types received by workers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorkerMessage {
    /// Work assignment
    Assignment(WorkItem),
    /// No more work, the worker must stop
    Terminate,
}

impl WorkerMessage {
    pub fn is_terminate(&self) -> bool {
        matches!(self, WorkerMessage::Terminate)
    }
}

/// Fixed-layout record carried by byte transports.
///
/// Assignments, completions and the termination sentinel all share this
/// layout; the field order here is the wire order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireRecord {
    pub id: u32,
    pub category: u32,
    pub elapsed: f64,
}

impl WireRecord {
    pub fn sentinel() -> Self {
        Self {
            id: SENTINEL_ID,
            category: 0,
            elapsed: 0.0,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.id == SENTINEL_ID
    }

    pub fn from_item(item: &WorkItem) -> Self {
        Self {
            id: item.id,
            category: item.category,
            elapsed: item.elapsed,
        }
    }

    pub fn into_item(self) -> WorkItem {
        WorkItem {
            id: self.id,
            category: self.category,
            elapsed: self.elapsed,
        }
    }

    pub fn from_message(message: &WorkerMessage) -> Self {
        match message {
            WorkerMessage::Assignment(item) => Self::from_item(item),
            WorkerMessage::Terminate => Self::sentinel(),
        }
    }

    /// Interpret a record arriving at a worker
    pub fn into_message(self) -> WorkerMessage {
        if self.is_sentinel() {
            WorkerMessage::Terminate
        } else {
            WorkerMessage::Assignment(self.into_item())
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ChannelError> {
        let bytes = bincode::serialize(self)?;
        debug_assert_eq!(bytes.len(), WIRE_RECORD_LEN);
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ChannelError> {
        if bytes.len() != WIRE_RECORD_LEN {
            return Err(ChannelError::Codec(format!(
                "expected {} byte record, got {}",
                WIRE_RECORD_LEN,
                bytes.len()
            )));
        }
        Ok(bincode::deserialize(bytes)?)
    }
}
