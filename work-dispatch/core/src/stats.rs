// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::Rank;
use std::collections::BTreeMap;
use std::fmt;

/// Running count and total time
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tally {
    pub count: u64,
    pub total: f64,
}

impl Tally {
    pub fn add(&mut self, elapsed: f64) {
        self.count += 1;
        self.total += elapsed;
    }

    /// Zero when nothing was recorded
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Per-worker and per-category tallies, owned by the coordinator
pub struct StatsAggregator {
    workers: BTreeMap<Rank, Tally>,
    categories: Vec<Tally>,
}

impl StatsAggregator {
    /// Every worker rank in `1..=num_workers` and every category in
    /// `0..num_categories` starts with an empty tally
    pub fn new(num_workers: usize, num_categories: usize) -> Self {
        Self {
            workers: (1..=num_workers).map(|rank| (rank, Tally::default())).collect(),
            categories: vec![Tally::default(); num_categories],
        }
    }

    pub fn record(&mut self, rank: Rank, category: u32, elapsed: f64) {
        self.workers.entry(rank).or_default().add(elapsed);

        let idx = category as usize;
        if idx >= self.categories.len() {
            self.categories.resize(idx + 1, Tally::default());
        }
        self.categories[idx].add(elapsed);
    }

    pub fn worker(&self, rank: Rank) -> Tally {
        self.workers.get(&rank).copied().unwrap_or_default()
    }

    pub fn category(&self, category: u32) -> Tally {
        self.categories
            .get(category as usize)
            .copied()
            .unwrap_or_default()
    }

    pub fn total_count(&self) -> u64 {
        self.workers.values().map(|tally| tally.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }

    pub fn report(&self) -> StatsReport {
        StatsReport {
            categories: self.categories.iter().copied().enumerate().collect(),
            workers: self.workers.iter().map(|(rank, tally)| (*rank, *tally)).collect(),
        }
    }
}

/// Read-only snapshot for output
#[derive(Debug, Clone, PartialEq)]
pub struct StatsReport {
    pub categories: Vec<(usize, Tally)>,
    pub workers: Vec<(Rank, Tally)>,
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "### Statistics ###")?;
        for (category, tally) in &self.categories {
            writeln!(
                f,
                "Type {}:\tn={}\ttot={:.3}\tavg={:.3}",
                category,
                tally.count,
                tally.total,
                tally.average()
            )?;
        }
        writeln!(f)?;
        for (rank, tally) in &self.workers {
            writeln!(
                f,
                "Node {}:\tn={}\ttot={:.3}\tavg={:.3}",
                rank,
                tally.count,
                tally.total,
                tally.average()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_of_empty_tally_is_zero() {
        let tally = Tally::default();
        assert_eq!(tally.average(), 0.0);
        assert!(!tally.average().is_nan());
    }

    #[test]
    fn test_record_updates_worker_and_category() {
        let mut stats = StatsAggregator::new(2, 5);
        stats.record(1, 3, 2.0);
        stats.record(1, 3, 4.0);
        stats.record(2, 0, 1.0);

        assert_eq!(stats.worker(1), Tally { count: 2, total: 6.0 });
        assert_eq!(stats.worker(1).average(), 3.0);
        assert_eq!(stats.category(3).count, 2);
        assert_eq!(stats.category(0).count, 1);
        assert_eq!(stats.category(4), Tally::default());
        assert_eq!(stats.total_count(), 3);
    }

    #[test]
    fn test_report_lists_idle_workers_and_categories() {
        let stats = StatsAggregator::new(3, 5);
        let report = stats.report();

        assert_eq!(report.workers.len(), 3);
        assert_eq!(report.categories.len(), 5);
        assert!(report.workers.iter().all(|(_, t)| t.average() == 0.0));
        assert!(stats.is_empty());
    }

    #[test]
    fn test_report_format() {
        let mut stats = StatsAggregator::new(1, 1);
        stats.record(1, 0, 1.5);
        let text = stats.report().to_string();

        assert!(text.contains("Type 0:\tn=1\ttot=1.500\tavg=1.500"));
        assert!(text.contains("Node 1:\tn=1\ttot=1.500\tavg=1.500"));
    }
}
