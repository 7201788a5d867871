// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::WorkItem;
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

/// `num_items` items with ids `0..num_items` and random categories in
/// `0..num_categories`
pub fn generate_workload(
    rng: &mut impl Rng,
    num_items: usize,
    num_categories: usize,
) -> Vec<WorkItem> {
    (0..num_items)
        .map(|id| WorkItem::new(id as u32, rng.random_range(0..num_categories as u32)))
        .collect()
}

/// Every item in the same category
pub fn uniform_workload(num_items: usize, category: u32) -> Vec<WorkItem> {
    (0..num_items)
        .map(|id| WorkItem::new(id as u32, category))
        .collect()
}

/// Seed derived from the wall clock, for runs without a configured seed
pub fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
