//! Configuration types for cladeflow

use crate::CladeError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub autodetect: AutodetectConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of execution units (0 = one per available CPU)
    #[serde(default = "default_units")]
    pub units: usize,
    /// Tasks a single unit may hold at once
    #[serde(default = "default_concurrency_per_unit")]
    pub concurrency_per_unit: usize,
    /// Upper bound for constructing and initializing every unit
    #[serde(default = "default_init_timeout_secs")]
    pub init_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Records read ahead of completed results before the reader pauses
    #[serde(default = "default_max_pending_tasks")]
    pub max_pending_tasks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutodetectConfig {
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    #[serde(default = "default_min_hits")]
    pub min_hits: u64,
    #[serde(default = "default_max_score_gap")]
    pub max_score_gap: f64,
    /// Keep every dataset above the thresholds instead of chopping at the first score gap
    #[serde(default = "default_all_matches")]
    pub all_matches: bool,
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_units() -> usize { 0 }
fn default_concurrency_per_unit() -> usize { 1 }
fn default_init_timeout_secs() -> u64 { 60 }
fn default_max_pending_tasks() -> usize { 512 }
fn default_min_score() -> f64 { 0.1 }
fn default_min_hits() -> u64 { 10 }
fn default_max_score_gap() -> f64 { 0.2 }
fn default_all_matches() -> bool { false }
fn default_max_iter() -> usize { 10 }
fn default_log_level() -> String { "warn".to_string() }

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            units: default_units(),
            concurrency_per_unit: default_concurrency_per_unit(),
            init_timeout_secs: default_init_timeout_secs(),
        }
    }
}

impl PoolConfig {
    /// Unit count with `0` resolved to the number of CPUs
    pub fn resolved_units(&self) -> usize {
        if self.units == 0 {
            num_cpus::get()
        } else {
            self.units
        }
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs(self.init_timeout_secs)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_pending_tasks: default_max_pending_tasks(),
        }
    }
}

impl Default for AutodetectConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            min_hits: default_min_hits(),
            max_score_gap: default_max_score_gap(),
            all_matches: default_all_matches(),
            max_iter: default_max_iter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub fn default_config() -> Config {
    Config::default()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, CladeError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), CladeError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| CladeError::Configuration(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}

fn validate_config(config: &Config) -> Result<(), CladeError> {
    if config.pool.concurrency_per_unit == 0 {
        return Err(CladeError::Configuration(
            "pool.concurrency_per_unit must be at least 1".to_string(),
        ));
    }
    if config.analysis.max_pending_tasks == 0 {
        return Err(CladeError::Configuration(
            "analysis.max_pending_tasks must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.pool.units, 0);
        assert_eq!(config.pool.concurrency_per_unit, 1);
        assert_eq!(config.pool.init_timeout_secs, 60);

        assert_eq!(config.analysis.max_pending_tasks, 512);

        assert_eq!(config.autodetect.min_score, 0.1);
        assert_eq!(config.autodetect.min_hits, 10);
        assert_eq!(config.autodetect.max_score_gap, 0.2);
        assert!(!config.autodetect.all_matches);
        assert_eq!(config.autodetect.max_iter, 10);

        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_resolved_units() {
        let mut pool = PoolConfig::default();
        assert_eq!(pool.resolved_units(), num_cpus::get());

        pool.units = 3;
        assert_eq!(pool.resolved_units(), 3);
        assert_eq!(pool.init_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_load_valid_config() {
        let toml_content = r#"
[pool]
units = 4
concurrency_per_unit = 2
init_timeout_secs = 5

[analysis]
max_pending_tasks = 64

[autodetect]
min_score = 0.3
min_hits = 2
max_score_gap = 0.5
all_matches = true
max_iter = 3

[logging]
level = "debug"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let config = load_config(temp_file.path()).unwrap();

        assert_eq!(config.pool.units, 4);
        assert_eq!(config.pool.concurrency_per_unit, 2);
        assert_eq!(config.pool.init_timeout_secs, 5);
        assert_eq!(config.analysis.max_pending_tasks, 64);
        assert_eq!(config.autodetect.min_score, 0.3);
        assert_eq!(config.autodetect.min_hits, 2);
        assert_eq!(config.autodetect.max_score_gap, 0.5);
        assert!(config.autodetect.all_matches);
        assert_eq!(config.autodetect.max_iter, 3);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_partial_config() {
        let toml_content = r#"
[pool]
units = 2
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let config = load_config(temp_file.path()).unwrap();

        assert_eq!(config.pool.units, 2);
        assert_eq!(config.pool.concurrency_per_unit, 1);
        assert_eq!(config.analysis.max_pending_tasks, 512);
        assert_eq!(config.autodetect.min_hits, 10);
    }

    #[test]
    fn test_load_invalid_config() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "this is not valid TOML {{").unwrap();

        match load_config(temp_file.path()).unwrap_err() {
            CladeError::Configuration(msg) => assert!(msg.contains("Failed to parse config")),
            other => panic!("Expected Configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "[pool]\nconcurrency_per_unit = 0\n").unwrap();

        match load_config(temp_file.path()).unwrap_err() {
            CladeError::Configuration(msg) => assert!(msg.contains("concurrency_per_unit")),
            other => panic!("Expected Configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        match load_config("/nonexistent/path/to/config.toml").unwrap_err() {
            CladeError::Io(_) => {}
            other => panic!("Expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn test_config_round_trip() {
        let mut config = default_config();
        config.pool.units = 7;
        config.autodetect.max_score_gap = 0.05;
        config.logging.level = "trace".to_string();

        let temp_file = NamedTempFile::new().unwrap();
        save_config(temp_file.path(), &config).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(loaded.pool.units, 7);
        assert_eq!(loaded.autodetect.max_score_gap, 0.05);
        assert_eq!(loaded.logging.level, "trace");
    }
}
