// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

mod error;
pub use error::{ChannelError, ConfigError, DispatchError};

mod work_item;
pub use work_item::{Rank, WorkItem, COORDINATOR_RANK};

pub mod worker_message;
pub use worker_message::{WireRecord, WorkerMessage, SENTINEL_ID, WIRE_RECORD_LEN};

pub mod channel;
pub use channel::{CoordinatorChannel, WorkerChannel};

pub mod timer;
pub use timer::{ScaledTimer, Timer, TokioTimer};

pub mod simulator;
pub use simulator::{CostTable, FixedCostSimulator, SleepSimulator, WorkSimulator};

mod work_queue;
pub use work_queue::{CompletionRejected, SlotState, WorkQueue};

mod stats;
pub use stats::{StatsAggregator, StatsReport, Tally};

mod coordinator;
pub use coordinator::{Coordinator, DispatchCounters, DispatchSummary, ReceiveStrategy};

mod worker;
pub use worker::{Worker, WorkerState, WorkerSummary};

pub mod config;
pub use config::{RunArgs, RunConfig};

pub mod workload;

pub mod logging;
