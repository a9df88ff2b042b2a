//! # Config
//!
//! Define and implement config options for module

use crate::instance::ValidationOptions;
use crate::model::{MissingLegPolicy, ModelOptions};
use anyhow::{anyhow, Result};
use config::{ConfigError, Environment};
use dotenv::dotenv;
use serde::Deserialize;
use std::time::Duration;

/// struct holding configuration options
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// path to log configuration YAML file
    pub log_config: String,

    /// comma separated list of instance files to plan
    pub instance_paths: String,

    /// solver time limit in seconds, 0 disables the limit
    pub time_limit_seconds: u64,

    /// half-width of the passenger service window
    pub time_tolerance: f64,

    /// treatment of legs without a travel time: `unreachable` or `zero_duration`
    pub missing_leg_policy: String,

    /// accept instances without aircraft
    pub allow_empty_fleet: bool,

    /// maximum number of instances solved at the same time
    pub max_parallel_runs: usize,
}

impl Default for Config {
    fn default() -> Self {
        log::warn!("(default) Creating Config object with default values.");
        Self::new()
    }
}

impl Config {
    /// Default values for Config
    pub fn new() -> Self {
        Config {
            log_config: String::from("log4rs.yaml"),
            instance_paths: String::from("data/sample_instance.json"),
            time_limit_seconds: 60,
            time_tolerance: crate::model::builder::DEFAULT_TIME_TOLERANCE,
            missing_leg_policy: MissingLegPolicy::default().to_string(),
            allow_empty_fleet: false,
            max_parallel_runs: 2,
        }
    }

    /// Create a new `Config` object using environment variables
    pub fn try_from_env() -> Result<Self, ConfigError> {
        // read .env file if present
        dotenv().ok();
        let default_config = Config::default();

        config::Config::builder()
            .set_default("log_config", default_config.log_config)?
            .set_default("instance_paths", default_config.instance_paths)?
            .set_default("time_limit_seconds", default_config.time_limit_seconds)?
            .set_default("time_tolerance", default_config.time_tolerance)?
            .set_default("missing_leg_policy", default_config.missing_leg_policy)?
            .set_default("allow_empty_fleet", default_config.allow_empty_fleet)?
            .set_default("max_parallel_runs", default_config.max_parallel_runs as u64)?
            .add_source(Environment::default().separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Instance file paths, skipping empty entries
    pub fn instance_paths(&self) -> Vec<String> {
        self.instance_paths
            .split(',')
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(String::from)
            .collect()
    }

    /// Solver time limit, `None` when disabled
    pub fn time_limit(&self) -> Option<Duration> {
        match self.time_limit_seconds {
            0 => None,
            seconds => Some(Duration::from_secs(seconds)),
        }
    }

    /// Formulation options
    pub fn model_options(&self) -> Result<ModelOptions> {
        let missing_leg_policy = self
            .missing_leg_policy
            .parse::<MissingLegPolicy>()
            .map_err(|e| anyhow!(e))?;

        Ok(ModelOptions {
            time_tolerance: self.time_tolerance,
            missing_leg_policy,
            ..Default::default()
        })
    }

    /// Instance validation options
    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            allow_empty_fleet: self.allow_empty_fleet,
        }
    }
}
