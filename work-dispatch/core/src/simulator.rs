// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::{DispatchError, Timer};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::time::Duration;
use tokio::time::Instant;

/// Stand-in for variable-cost work. Returns the elapsed seconds.
#[async_trait]
pub trait WorkSimulator: Send {
    async fn simulate(&mut self, category: u32) -> Result<f64, DispatchError>;
}

/// Longest simulated cost accepted for one item, in seconds (one day)
pub const MAX_COST_SECONDS: f64 = 86_400.0;

/// Per-category `[min, max)` cost ranges in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CostTable {
    ranges: Vec<[f64; 2]>,
}

impl CostTable {
    pub fn new(ranges: Vec<[f64; 2]>) -> Self {
        Self { ranges }
    }

    /// Number of categories (K)
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn range(&self, category: u32) -> Result<Range<f64>, DispatchError> {
        self.ranges
            .get(category as usize)
            .map(|[min, max]| *min..*max)
            .ok_or(DispatchError::UnknownCategory {
                category,
                known: self.ranges.len(),
            })
    }

    /// Largest upper bound over all categories, 0 for an empty table
    pub fn max_bound(&self) -> f64 {
        self.ranges.iter().map(|[_, max]| *max).fold(0.0, f64::max)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.ranges.is_empty() {
            return Err("cost table must define at least one category".to_string());
        }
        for (category, [min, max]) in self.ranges.iter().enumerate() {
            if !min.is_finite() || !max.is_finite() || *min < 0.0 || min >= max {
                return Err(format!(
                    "category {} has invalid cost range [{}, {})",
                    category, min, max
                ));
            }
            if *max > MAX_COST_SECONDS {
                return Err(format!(
                    "category {} upper bound {} exceeds {} seconds",
                    category, max, MAX_COST_SECONDS
                ));
            }
        }
        Ok(())
    }
}

impl Default for CostTable {
    fn default() -> Self {
        Self::new(vec![
            [0.1, 3.0],
            [2.0, 5.0],
            [1.0, 6.0],
            [5.0, 7.5],
            [7.0, 9.0],
        ])
    }
}

/// Sleeps for a random duration drawn from the category's range
pub struct SleepSimulator<T: Timer> {
    table: CostTable,
    timer: T,
    rng: StdRng,
}

impl<T: Timer> SleepSimulator<T> {
    pub fn new(table: CostTable, timer: T, seed: u64) -> Self {
        Self {
            table,
            timer,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn draw(&mut self, category: u32) -> Result<Duration, DispatchError> {
        let range = self.table.range(category)?;
        if !(range.start >= 0.0 && range.start < range.end && range.end.is_finite()) {
            return Err(DispatchError::InvalidConfig(format!(
                "category {} has invalid cost range {:?}",
                category, range
            )));
        }
        let secs = self.rng.random_range(range);
        Duration::try_from_secs_f64(secs)
            .map_err(|e| DispatchError::InvalidConfig(format!("cost of {} seconds: {}", secs, e)))
    }
}

#[async_trait]
impl<T: Timer> WorkSimulator for SleepSimulator<T> {
    async fn simulate(&mut self, category: u32) -> Result<f64, DispatchError> {
        let duration = self.draw(category)?;

        let begin = Instant::now();
        self.timer.sleep(duration).await;
        Ok(begin.elapsed().as_secs_f64())
    }
}

/// Reports a constant cost per category without sleeping
pub struct FixedCostSimulator {
    costs: Vec<f64>,
}

impl FixedCostSimulator {
    pub fn new(costs: Vec<f64>) -> Self {
        Self { costs }
    }

    /// `categories` categories that all cost `cost` seconds
    pub fn uniform(categories: usize, cost: f64) -> Self {
        Self::new(vec![cost; categories])
    }
}

#[async_trait]
impl WorkSimulator for FixedCostSimulator {
    async fn simulate(&mut self, category: u32) -> Result<f64, DispatchError> {
        self.costs
            .get(category as usize)
            .copied()
            .ok_or(DispatchError::UnknownCategory {
                category,
                known: self.costs.len(),
            })
    }
}
