//! Configuration validation.

use std::collections::HashSet;

use super::Config;
use crate::error::{PlanError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.sources.is_empty() {
        return Err(PlanError::Config(
            "at least one source instance is required".into(),
        ));
    }

    // Instance names identify tables in the plan, so they must be unique.
    let mut names = HashSet::new();
    let instances = config
        .sources
        .iter()
        .map(|s| ("sources", s))
        .chain(std::iter::once(("destination", &config.destination)));
    for (section, instance) in instances {
        if instance.name.trim().is_empty() {
            return Err(PlanError::Config(format!("{}: instance name is required", section)));
        }
        if !names.insert(instance.name.as_str()) {
            return Err(PlanError::Config(format!(
                "duplicate instance name '{}'",
                instance.name
            )));
        }
        if instance.schemas.is_empty() {
            return Err(PlanError::Config(format!(
                "{} instance '{}' must list at least one schema",
                section, instance.name
            )));
        }
        if instance.schemas.iter().any(|s| s.trim().is_empty()) {
            return Err(PlanError::Config(format!(
                "{} instance '{}' has an empty schema name",
                section, instance.name
            )));
        }
    }

    if config.synthesis.max_rounds == 0 {
        return Err(PlanError::Config(
            "synthesis.max_rounds must be at least 1".into(),
        ));
    }
    if config.synthesis.round_timeout_secs == 0 {
        return Err(PlanError::Config(
            "synthesis.round_timeout_secs must be at least 1".into(),
        ));
    }
    if config.synthesis.concurrency == 0 {
        return Err(PlanError::Config(
            "synthesis.concurrency must be at least 1".into(),
        ));
    }

    Ok(())
}
