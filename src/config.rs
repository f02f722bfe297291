//! Ring configuration
//!
//! The numeric settings are plain serde data so embedding applications can
//! load them from their own config files. The hasher is a capability and is
//! attached separately.

use crate::error::{Error, Result};
use crate::hash::Digest;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Numeric settings of the ring
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Number of fixed partitions. Prime numbers spread keys more evenly.
    pub partition_count: u64,

    /// Virtual nodes placed on the ring per bin
    pub replication_factor: usize,

    /// Multiplier applied to the average load to get the per-bin ceiling.
    /// Values below 1 can make the ceiling unsatisfiable.
    pub load_balancing_parameter: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            partition_count: 271,
            replication_factor: 20,
            load_balancing_parameter: 1.25,
        }
    }
}

impl Settings {
    /// Parse settings from JSON, missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Check the settings can drive a distribution pass
    pub fn validate(&self) -> Result<()> {
        if self.partition_count == 0 {
            return Err(Error::InvalidConfig(
                "partition_count must be > 0".to_string(),
            ));
        }
        if usize::try_from(self.partition_count).is_err() {
            return Err(Error::InvalidConfig(format!(
                "partition_count {} does not fit in memory",
                self.partition_count
            )));
        }
        if self.replication_factor == 0 {
            return Err(Error::InvalidConfig(
                "replication_factor must be > 0".to_string(),
            ));
        }
        if !self.load_balancing_parameter.is_finite() || self.load_balancing_parameter <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "load_balancing_parameter must be a positive number, got {}",
                self.load_balancing_parameter
            )));
        }
        if self.load_balancing_parameter < 1.0 {
            warn!(
                "load_balancing_parameter {} is below 1, distribution may fail",
                self.load_balancing_parameter
            );
        }
        Ok(())
    }
}

/// Full configuration: settings plus the hasher
#[derive(Clone)]
pub struct Config {
    /// Produces the 64-bit digests for bins, partitions and balls
    pub hasher: Arc<dyn Digest>,

    /// Numeric settings
    pub settings: Settings,
}

impl Config {
    /// Create a configuration from a hasher and settings
    pub fn new(hasher: Arc<dyn Digest>, settings: Settings) -> Self {
        Config { hasher, settings }
    }

    /// Default settings with the given hasher
    pub fn with_hasher(hasher: Arc<dyn Digest>) -> Self {
        Self::new(hasher, Settings::default())
    }

    /// Set the partition count
    pub fn partition_count(mut self, partition_count: u64) -> Self {
        self.settings.partition_count = partition_count;
        self
    }

    /// Set the replication factor
    pub fn replication_factor(mut self, replication_factor: usize) -> Self {
        self.settings.replication_factor = replication_factor;
        self
    }

    /// Set the load balancing parameter
    pub fn load_balancing_parameter(mut self, load_balancing_parameter: f64) -> Self {
        self.settings.load_balancing_parameter = load_balancing_parameter;
        self
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        self.settings.validate()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
