// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::{DispatchError, Rank, WorkItem};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Pending,
    InFlight(Rank),
    Completed,
}

/// Reasons a completion report is ignored. None of these are fatal.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionRejected {
    #[error("id {id} is outside the queue of {len} items")]
    OutOfRange { id: u32, len: usize },

    #[error("id {id} was never dispatched")]
    NotDispatched { id: u32 },

    #[error("id {id} was already completed")]
    AlreadyCompleted { id: u32 },

    #[error("id {id} was sent to rank {owner}, not rank {sender}")]
    WrongSender { id: u32, owner: Rank, sender: Rank },
}

/// Fixed queue of work items with a cursor to the next unassigned one
pub struct WorkQueue {
    items: Vec<WorkItem>,
    slots: Vec<SlotState>,
    head: usize,
}

impl WorkQueue {
    /// Items must carry ids equal to their position; see [`WorkQueue::check_ids`]
    pub fn new(items: Vec<WorkItem>) -> Self {
        let slots = vec![SlotState::Pending; items.len()];
        Self {
            items,
            slots,
            head: 0,
        }
    }

    /// Completions are matched by id, so every id must equal its position
    pub fn check_ids(&self) -> Result<(), DispatchError> {
        match self
            .items
            .iter()
            .enumerate()
            .find(|(idx, item)| item.id as usize != *idx)
        {
            Some((idx, item)) => Err(DispatchError::InvalidConfig(format!(
                "item at position {} has id {}",
                idx, item.id
            ))),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn has_unassigned(&self) -> bool {
        self.head < self.items.len()
    }

    /// Take the item at `head` for `rank` and advance the cursor
    pub fn assign_next(&mut self, rank: Rank) -> Option<WorkItem> {
        if !self.has_unassigned() {
            return None;
        }
        let idx = self.head;
        self.head += 1;
        self.slots[idx] = SlotState::InFlight(rank);
        Some(self.items[idx])
    }

    /// Validate a completion and store its elapsed time.
    /// Returns the queue's copy of the item, whose category is authoritative.
    pub fn complete(
        &mut self,
        sender: Rank,
        report: &WorkItem,
    ) -> Result<WorkItem, CompletionRejected> {
        let idx = report.id as usize;
        let slot = self
            .slots
            .get_mut(idx)
            .ok_or(CompletionRejected::OutOfRange {
                id: report.id,
                len: self.items.len(),
            })?;

        match *slot {
            SlotState::Pending => Err(CompletionRejected::NotDispatched { id: report.id }),
            SlotState::Completed => Err(CompletionRejected::AlreadyCompleted { id: report.id }),
            SlotState::InFlight(owner) if owner != sender => Err(CompletionRejected::WrongSender {
                id: report.id,
                owner,
                sender,
            }),
            SlotState::InFlight(_) => {
                *slot = SlotState::Completed;
                let item = &mut self.items[idx];
                item.elapsed = report.elapsed;
                Ok(*item)
            }
        }
    }

    pub fn slot(&self, id: u32) -> Option<SlotState> {
        self.slots.get(id as usize).copied()
    }

    pub fn in_flight(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, SlotState::InFlight(_)))
            .count()
    }

    pub fn completed(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| **slot == SlotState::Completed)
            .count()
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<WorkItem> {
        self.items
    }
}
