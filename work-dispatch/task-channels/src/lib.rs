// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

pub mod channel_transport;
pub use channel_transport::{ChannelTransportHub, CoordinatorEndpoint, WorkerEndpoint};

pub mod cluster;
pub use cluster::{run_cluster, run_cluster_with};
