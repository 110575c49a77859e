//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::synthesis::SynthesisSettings;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source instances, read in this order.
    pub sources: Vec<InstanceConfig>,

    /// Destination instance.
    pub destination: InstanceConfig,

    /// Where catalogs come from.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Rule synthesis behavior.
    #[serde(default)]
    pub synthesis: SynthesisConfig,
}

/// One database instance and the schemas to read from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Instance name, unique across the configuration.
    pub name: String,

    /// Schemas (databases) to include.
    pub schemas: Vec<String>,
}

/// Catalog source configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Catalog snapshot file (YAML or JSON). Relative paths are resolved
    /// against the directory of the configuration file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
}

/// Rule synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Synthesize a rule when a many-to-one mapping has more sources than this.
    #[serde(default = "default_threshold")]
    pub threshold: usize,

    /// Maximum proposer rounds per session (default: 5).
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Per-round proposer timeout in seconds (default: 30).
    #[serde(default = "default_round_timeout_secs")]
    pub round_timeout_secs: u64,

    /// Sessions run at once (default: 1, sequential).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            max_rounds: default_max_rounds(),
            round_timeout_secs: default_round_timeout_secs(),
            concurrency: default_concurrency(),
        }
    }
}

impl SynthesisConfig {
    /// Session limits for the synthesizer.
    pub fn settings(&self) -> SynthesisSettings {
        SynthesisSettings {
            max_rounds: self.max_rounds,
            round_timeout: Duration::from_secs(self.round_timeout_secs),
        }
    }
}

fn default_threshold() -> usize {
    2
}

fn default_max_rounds() -> usize {
    5
}

fn default_round_timeout_secs() -> u64 {
    30
}

fn default_concurrency() -> usize {
    1
}
