//! Server and race configuration.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! `REGATTA_*` environment variables, then command-line flags (applied by
//! the binary).

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::RaceType;
use crate::game::course::Course;
use crate::game::polars::PolarRow;
use crate::game::wind::WindModel;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid configuration JSON.
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment variable holds an unusable value.
    #[error("invalid value {value:?} for {name}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Value found.
        value: String,
    },
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent client connections.
    pub max_clients: usize,
    /// Simulation frame period, ms.
    pub frame_period_ms: u64,
    /// Interval between heartbeats sent to each client, ms.
    pub heartbeat_interval_ms: u64,
    /// A client silent for this long is considered dead, ms.
    pub liveness_threshold_ms: u64,
    /// Interval between liveness sweeps, ms.
    pub sweep_interval_ms: u64,
    /// Consecutive failed sweeps tolerated before eviction.
    pub max_failed_sweeps: u32,
    /// Frames buffered per client before the oldest snapshots are skipped.
    pub outbound_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 4942)),
            max_clients: 16,
            frame_period_ms: 16,
            heartbeat_interval_ms: 2_500,
            liveness_threshold_ms: 10_000,
            sweep_interval_ms: 100,
            max_failed_sweeps: 5,
            outbound_queue: 256,
        }
    }
}

impl ServerConfig {
    /// Simulation frame period.
    pub fn frame_period(&self) -> Duration {
        Duration::from_millis(self.frame_period_ms.max(1))
    }

    /// Heartbeat interval.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms.max(1))
    }

    /// Liveness sweep interval.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }

    /// Override fields from `REGATTA_*` environment variables.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(addr) = env_parse("REGATTA_BIND")? {
            self.bind_addr = addr;
        }
        if let Some(max) = env_parse("REGATTA_MAX_CLIENTS")? {
            self.max_clients = max;
        }
        if let Some(period) = env_parse("REGATTA_FRAME_PERIOD_MS")? {
            self.frame_period_ms = period;
        }
        if let Some(threshold) = env_parse("REGATTA_LIVENESS_THRESHOLD_MS")? {
            self.liveness_threshold_ms = threshold;
        }
        Ok(())
    }

    /// Defaults overridden by the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }
}

/// Race configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Race identifier.
    pub race_id: u32,
    /// Race format.
    pub race_type: RaceType,
    /// Time from server start to the race start, ms.
    pub start_delay_ms: u64,
    /// Time-to-start at which the warning signal goes, ms.
    pub warning_ms: u64,
    /// Time-to-start at which the preparatory signal goes, ms.
    pub preparatory_ms: u64,
    /// Multiplier on distance sailed per tick.
    pub scale_factor: f64,
    /// Wind model.
    pub wind: WindModel,
    /// Course to sail.
    pub course: Course,
    /// Seed for every random choice the race makes.
    pub seed: u64,
    /// Replacement polar table.
    pub polars: Option<Vec<PolarRow>>,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            race_id: 1,
            race_type: RaceType::FleetRace,
            start_delay_ms: 120_000,
            warning_ms: 30_000,
            preparatory_ms: 10_000,
            scale_factor: 1.0,
            wind: WindModel::default(),
            course: Course::default(),
            seed: 0,
            polars: None,
        }
    }
}

impl RaceConfig {
    /// Override fields from `REGATTA_*` environment variables.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(race_id) = env_parse("REGATTA_RACE_ID")? {
            self.race_id = race_id;
        }
        if let Some(seed) = env_parse("REGATTA_SEED")? {
            self.seed = seed;
        }
        if let Some(delay) = env_parse("REGATTA_START_DELAY_MS")? {
            self.start_delay_ms = delay;
        }
        if let Some(scale) = env_parse("REGATTA_SCALE_FACTOR")? {
            self.scale_factor = scale;
        }
        Ok(())
    }
}

/// Complete configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Race settings.
    pub race: RaceConfig,
}

impl Config {
    /// Parse a JSON configuration document. Missing fields keep defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Apply environment overrides to both sections.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.server.apply_env()?;
        self.race.apply_env()
    }
}

fn env_parse<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { name, value }),
        Err(_) => Ok(None),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 4942);
        assert_eq!(config.max_clients, 16);
        assert_eq!(config.frame_period(), Duration::from_millis(16));
        assert_eq!(config.liveness_threshold_ms, 10_000);
        assert_eq!(config.sweep_interval(), Duration::from_millis(100));
        assert_eq!(config.max_failed_sweeps, 5);
    }

    #[test]
    fn test_race_config_default() {
        let config = RaceConfig::default();
        assert!(config.start_delay_ms > config.warning_ms);
        assert!(config.warning_ms > config.preparatory_ms);
        assert_eq!(config.scale_factor, 1.0);
        assert!(config.course.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_json(
            r#"{
                "server": { "max_clients": 2 },
                "race": { "seed": 42, "wind": { "model": "constant", "wind": { "direction": 180.0, "speed": 10.0 } } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.server.max_clients, 2);
        assert_eq!(config.server.frame_period_ms, 16);
        assert_eq!(config.race.seed, 42);
        assert_eq!(config.race.wind.initial().direction, 180.0);
        assert_eq!(config.race.course, Course::default());
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(Config::from_json("{ nope"), Err(ConfigError::Parse(_))));
    }
}
