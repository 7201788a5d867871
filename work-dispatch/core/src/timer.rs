// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::time::Duration;
use tokio::time::sleep;

#[async_trait::async_trait]
pub trait Timer: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioTimer;

#[async_trait::async_trait]
impl Timer for TokioTimer {
    async fn sleep(&self, duration: Duration) {
        sleep(duration).await;
    }
}

/// Stretches or shrinks every sleep by a constant factor.
/// A scaled duration too large to represent saturates to `Duration::MAX`.
pub struct ScaledTimer<T: Timer> {
    inner: T,
    scale: f64,
}

impl<T: Timer> ScaledTimer<T> {
    pub fn new(inner: T, scale: f64) -> Self {
        Self { inner, scale }
    }
}

#[async_trait::async_trait]
impl<T: Timer> Timer for ScaledTimer<T> {
    async fn sleep(&self, duration: Duration) {
        let scaled = Duration::try_from_secs_f64(duration.as_secs_f64() * self.scale)
            .unwrap_or(Duration::MAX);
        self.inner.sleep(scaled).await;
    }
}
