// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

/// Participant identifier. The coordinator is rank 0, workers are 1..=W.
pub type Rank = usize;

pub const COORDINATOR_RANK: Rank = 0;

/// One unit of work and its measured cost
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkItem {
    pub id: u32,
    pub category: u32,
    /// Seconds spent computing. Zero until a worker reports it.
    pub elapsed: f64,
}

impl WorkItem {
    pub fn new(id: u32, category: u32) -> Self {
        Self {
            id,
            category,
            elapsed: 0.0,
        }
    }

    /// Copy of this item carrying the worker's measurement
    pub fn completed(self, elapsed: f64) -> Self {
        Self { elapsed, ..self }
    }

    pub fn is_computed(&self) -> bool {
        self.elapsed > 0.0
    }
}
