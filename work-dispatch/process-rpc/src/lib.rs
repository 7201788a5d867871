// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

mod codec;
pub use codec::WorkRecordCodec;

pub mod tcp_transport;
pub use tcp_transport::{TcpCoordinatorChannel, TcpWorkerChannel};

pub mod process_cluster;
pub use process_cluster::{run_processes, run_worker, WorkerArgs};
