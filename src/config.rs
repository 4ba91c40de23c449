//! Runtime configuration for the playground.
//!
//! Values come from an optional TOML file and a couple of environment
//! overrides. Everything has a default, so running without a config file
//! reproduces the stock demo.

use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use log::{info, warn};
use serde::Deserialize;

use crate::error::{PlaygroundError, Result};

pub const CONFIG_ENV: &str = "PLAYGROUND_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "playground.toml";

/// Integer increments performed by one repetition of the workload.
pub const DEFAULT_WORK_UNIT: u64 = 1_000_000_000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaygroundConfig {
    /// Increments per workload repetition.
    pub work_unit: u64,
    /// Worker threads of the session pool. Defaults to the CPU count.
    pub pool_threads: Option<usize>,
    /// Worker threads of the process-wide global context.
    pub global_threads: Option<usize>,
    /// Repetitions used by the "long" task of two-task scenarios.
    pub long_iterations: u32,
    /// Pause used to interleave two otherwise instant tasks.
    pub pause_ms: u64,
    /// How long a notification stays up when not acknowledged.
    pub notification_secs: u64,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            work_unit: DEFAULT_WORK_UNIT,
            pool_threads: None,
            global_threads: None,
            long_iterations: 3,
            pause_ms: 2000,
            notification_secs: 10,
        }
    }
}

impl PlaygroundConfig {
    /// Reads the config file named by `PLAYGROUND_CONFIG`, falling back to
    /// `./playground.toml`, then applies environment overrides.
    ///
    /// A missing default file is not an error; a missing file that was
    /// named explicitly is.
    pub fn load() -> Result<Self> {
        let (path, explicit) = match env::var_os(CONFIG_ENV) {
            Some(path) => (PathBuf::from(path), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let mut config = if explicit || path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| PlaygroundError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| PlaygroundError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("PLAYGROUND_WORK_UNIT") {
            self.work_unit = value.trim().parse().map_err(|_| PlaygroundError::InvalidEnv {
                key: "PLAYGROUND_WORK_UNIT",
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup("PLAYGROUND_POOL_THREADS") {
            let threads = value.trim().parse().map_err(|_| PlaygroundError::InvalidEnv {
                key: "PLAYGROUND_POOL_THREADS",
                value: value.clone(),
            })?;
            self.pool_threads = Some(threads);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool_threads == Some(0) {
            return Err(PlaygroundError::InvalidConfig("pool_threads must be at least 1".into()));
        }
        if self.global_threads == Some(0) {
            return Err(PlaygroundError::InvalidConfig("global_threads must be at least 1".into()));
        }
        if self.work_unit == 0 {
            warn!("work_unit is 0, heavy scenarios will finish instantly");
        }
        Ok(())
    }

    pub fn pool_threads(&self) -> usize {
        self.pool_threads.unwrap_or_else(num_cpus::get)
    }

    pub fn global_threads(&self) -> usize {
        self.global_threads.unwrap_or_else(num_cpus::get)
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_secs(self.notification_secs)
    }
}
