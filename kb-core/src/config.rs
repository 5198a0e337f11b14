//! Unified configuration schema.
//!
//! One YAML file configures search, the inference dispatcher, and self-play.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// MCTS algorithm settings.
    #[serde(default)]
    pub mcts: MctsSection,
    /// Batching dispatcher settings.
    #[serde(default)]
    pub inference: InferenceSection,
    /// Self-play settings.
    #[serde(default)]
    pub selfplay: SelfplaySection,
}

/// MCTS algorithm configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MctsSection {
    /// PUCT exploration constant.
    #[serde(default = "default_c_puct")]
    pub c_puct: f32,
    /// Simulation budget per decision.
    #[serde(default = "default_simulations")]
    pub simulations: u32,
    /// Maximum leaves collected per evaluation wave within one search.
    #[serde(default = "default_search_batch_size")]
    pub batch_size: u32,
}

fn default_c_puct() -> f32 {
    1.5
}

fn default_simulations() -> u32 {
    800
}

fn default_search_batch_size() -> u32 {
    64
}

impl Default for MctsSection {
    fn default() -> Self {
        Self {
            c_puct: default_c_puct(),
            simulations: default_simulations(),
            batch_size: default_search_batch_size(),
        }
    }
}

/// Batching dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InferenceSection {
    /// Maximum batch size before flushing.
    #[serde(default = "default_max_batch")]
    pub max_batch: u32,
    /// Maximum wait time in microseconds before flushing a partial batch.
    #[serde(default = "default_max_wait_us")]
    pub max_wait_us: u64,
}

fn default_max_batch() -> u32 {
    32
}

fn default_max_wait_us() -> u64 {
    2000
}

impl Default for InferenceSection {
    fn default() -> Self {
        Self {
            max_batch: default_max_batch(),
            max_wait_us: default_max_wait_us(),
        }
    }
}

/// Executed-move temperature schedule.
///
/// Note: temperature never changes the stored `pi` targets (visit-count
/// distribution); it only shapes which action gets executed.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemperatureSchedule {
    /// Constant temperature `t0`.
    Constant { t0: f32 },
    /// Step schedule: `t0` while `move < cutoff_move`, else `t1`.
    Step { t0: f32, t1: f32, cutoff_move: u32 },
}

impl Default for TemperatureSchedule {
    fn default() -> Self {
        TemperatureSchedule::Step {
            t0: 1.0,
            t1: 0.0,
            cutoff_move: 15,
        }
    }
}

impl TemperatureSchedule {
    pub fn temperature_for_move(&self, move_idx: u32) -> f32 {
        match *self {
            TemperatureSchedule::Constant { t0 } => t0,
            TemperatureSchedule::Step {
                t0,
                t1,
                cutoff_move,
            } => {
                if move_idx < cutoff_move {
                    t0
                } else {
                    t1
                }
            }
        }
    }
}

/// Self-play configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelfplaySection {
    /// Number of games to play.
    #[serde(default = "default_games")]
    pub games: u32,
    /// Number of worker threads sharing the dispatcher.
    #[serde(default = "default_workers")]
    pub workers: u32,
    /// Base seed; per-game seeds are derived from it.
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub temperature_schedule: TemperatureSchedule,
}

fn default_games() -> u32 {
    16
}

fn default_workers() -> u32 {
    4
}

impl Default for SelfplaySection {
    fn default() -> Self {
        Self {
            games: default_games(),
            workers: default_workers(),
            seed: 0,
            temperature_schedule: TemperatureSchedule::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mcts: MctsSection::default(),
            inference: InferenceSection::default(),
            selfplay: SelfplaySection::default(),
        }
    }
}
