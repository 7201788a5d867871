// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::simulator::MAX_COST_SECONDS;
use crate::{ConfigError, CostTable, Rank, ReceiveStrategy, SENTINEL_ID};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub num_items: usize,
    pub num_workers: usize,
    pub cost_table: CostTable,
    /// Multiplier applied to every simulated sleep
    pub time_scale: f64,
    pub receive_strategy: ReceiveStrategy,
    /// Base RNG seed; each participant uses `seed + rank`. Random when unset.
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            num_items: 1024,
            num_workers: 4,
            cost_table: CostTable::default(),
            time_scale: 1.0,
            receive_strategy: ReceiveStrategy::default(),
            seed: None,
        }
    }
}

impl RunConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: RunConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file is missing
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found, using default configuration");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    pub fn num_categories(&self) -> usize {
        self.cost_table.len()
    }

    pub fn seed_for(&self, base: u64, rank: Rank) -> u64 {
        self.seed.unwrap_or(base).wrapping_add(rank as u64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_workers == 0 {
            return Err(ConfigError::Invalid(
                "at least one worker is required".to_string(),
            ));
        }
        if self.num_items >= SENTINEL_ID as usize {
            return Err(ConfigError::Invalid(format!(
                "num_items must be below {}",
                SENTINEL_ID
            )));
        }
        if !self.time_scale.is_finite() || self.time_scale <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "time_scale must be positive, got {}",
                self.time_scale
            )));
        }
        self.cost_table.validate().map_err(ConfigError::Invalid)?;
        let longest = self.cost_table.max_bound() * self.time_scale;
        if longest > MAX_COST_SECONDS {
            return Err(ConfigError::Invalid(format!(
                "time_scale {} stretches the longest cost to {} seconds, above {}",
                self.time_scale, longest, MAX_COST_SECONDS
            )));
        }
        Ok(())
    }
}

/// Command-line overrides shared by every binary
#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    /// JSON configuration file; defaults are used when it does not exist
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Number of work items to generate
    #[arg(long)]
    pub items: Option<usize>,

    /// Number of worker participants
    #[arg(long)]
    pub workers: Option<usize>,

    /// Multiplier applied to every simulated sleep
    #[arg(long)]
    pub time_scale: Option<f64>,

    /// Base RNG seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Always block in the drain loop instead of polling first
    #[arg(long)]
    pub blocking: bool,
}

impl RunArgs {
    /// Load the config file, apply the overrides and validate the result
    pub fn resolve(&self) -> Result<RunConfig, ConfigError> {
        let mut config = RunConfig::load_or_default(&self.config)?;
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(items) = self.items {
            config.num_items = items;
        }
        if let Some(workers) = self.workers {
            config.num_workers = workers;
        }
        if let Some(scale) = self.time_scale {
            config.time_scale = scale;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.blocking {
            config.receive_strategy = ReceiveStrategy::Blocking;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_workload() {
        let config = RunConfig::default();
        assert_eq!(config.num_items, 1024);
        assert_eq!(config.num_categories(), 5);
        assert_eq!(config.receive_strategy, ReceiveStrategy::PollThenBlock);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: RunConfig = serde_json::from_str(
            r#"{ "num_items": 10, "receive_strategy": "blocking", "cost_table": [[0.5, 1.0]] }"#,
        )
        .unwrap();

        assert_eq!(config.num_items, 10);
        assert_eq!(config.num_workers, 4);
        assert_eq!(config.receive_strategy, ReceiveStrategy::Blocking);
        assert_eq!(config.num_categories(), 1);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let no_workers = RunConfig {
            num_workers: 0,
            ..RunConfig::default()
        };
        assert!(no_workers.validate().is_err());

        let bad_scale = RunConfig {
            time_scale: 0.0,
            ..RunConfig::default()
        };
        assert!(bad_scale.validate().is_err());

        let huge_scale = RunConfig {
            time_scale: 1e300,
            ..RunConfig::default()
        };
        assert!(matches!(
            huge_scale.validate(),
            Err(ConfigError::Invalid(_))
        ));

        let too_many = RunConfig {
            num_items: u32::MAX as usize,
            ..RunConfig::default()
        };
        assert!(too_many.validate().is_err());
    }

    #[test]
    fn test_seed_is_offset_by_rank() {
        let config = RunConfig {
            seed: Some(100),
            ..RunConfig::default()
        };
        assert_eq!(config.seed_for(0, 0), 100);
        assert_eq!(config.seed_for(0, 3), 103);

        let unseeded = RunConfig::default();
        assert_eq!(unseeded.seed_for(50, 2), 52);
    }

    #[test]
    fn test_overrides_apply_on_top_of_file() {
        let args = RunArgs {
            config: PathBuf::from("does/not/exist.json"),
            items: Some(12),
            workers: Some(3),
            time_scale: Some(0.01),
            seed: Some(5),
            blocking: true,
        };

        let config = args.resolve().unwrap();

        assert_eq!(config.num_items, 12);
        assert_eq!(config.num_workers, 3);
        assert_eq!(config.time_scale, 0.01);
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.receive_strategy, ReceiveStrategy::Blocking);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let args = RunArgs {
            config: PathBuf::from("does/not/exist.json"),
            items: None,
            workers: Some(0),
            time_scale: None,
            seed: None,
            blocking: false,
        };
        assert!(matches!(args.resolve(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = RunConfig::load_or_default("does/not/exist.json").unwrap();
        assert_eq!(config, RunConfig::default());
    }
}
