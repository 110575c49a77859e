//! Plan summaries and the pattern grouping used by the analysis report.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{MigrationPlan, PlannedMapping, RuleOutcome};
use crate::resolve::Mapping;

/// Report pattern of a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternGroup {
    /// One source table, one destination table.
    OneToOne,

    /// Shards merged into a destination without marker columns. Rows keep
    /// their own keys, so shards must not share primary key values.
    ConsolidateWithoutMarkers,

    /// Shards merged into a destination whose marker columns record the
    /// origin of every row.
    ConsolidateWithMarkers,

    /// Ambiguous, fan-out or unmatched tables.
    NeedsAttention,
}

impl PatternGroup {
    pub fn of(planned: &PlannedMapping) -> Self {
        match planned.mapping {
            Mapping::OneToOne { .. } => PatternGroup::OneToOne,
            Mapping::ManyToOne { .. } if planned.markers.any() => {
                PatternGroup::ConsolidateWithMarkers
            }
            Mapping::ManyToOne { .. } => PatternGroup::ConsolidateWithoutMarkers,
            Mapping::OneToMany { .. } | Mapping::ManyToMany { .. } | Mapping::Unmatched { .. } => {
                PatternGroup::NeedsAttention
            }
        }
    }

    /// Two-digit report code.
    pub fn code(&self) -> &'static str {
        match self {
            PatternGroup::OneToOne => "01",
            PatternGroup::ConsolidateWithoutMarkers => "02",
            PatternGroup::ConsolidateWithMarkers => "03",
            PatternGroup::NeedsAttention => "04",
        }
    }
}

impl fmt::Display for PatternGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = match self {
            PatternGroup::OneToOne => "one-to-one",
            PatternGroup::ConsolidateWithoutMarkers => "many-to-one without marker columns",
            PatternGroup::ConsolidateWithMarkers => "many-to-one with marker columns",
            PatternGroup::NeedsAttention => "many-to-many, fan-out and unmatched",
        };
        write!(f, "pattern {}: {}", self.code(), title)
    }
}

/// Counts over a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub tables: usize,
    pub classes: usize,
    pub mappings: usize,
    pub one_to_one: usize,
    pub many_to_one: usize,
    pub one_to_many: usize,
    pub unresolved: usize,
    pub rules_synthesized: usize,
    pub rules_failed: usize,
}

impl PlanSummary {
    pub(super) fn from_plan(plan: &MigrationPlan) -> Self {
        let mut summary = PlanSummary {
            tables: plan.tables_total,
            classes: plan.classes.len(),
            mappings: plan.mappings.len(),
            ..Default::default()
        };

        for m in &plan.mappings {
            match m.mapping {
                Mapping::OneToOne { .. } => summary.one_to_one += 1,
                Mapping::ManyToOne { .. } => summary.many_to_one += 1,
                Mapping::OneToMany { .. } => summary.one_to_many += 1,
                Mapping::ManyToMany { .. } | Mapping::Unmatched { .. } => summary.unresolved += 1,
            }
            match m.rule {
                Some(RuleOutcome::Synthesized(_)) => summary.rules_synthesized += 1,
                Some(RuleOutcome::Failed(_)) => summary.rules_failed += 1,
                None => {}
            }
        }
        summary
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tables in {} classes, {} mappings ({} one-to-one, {} many-to-one, {} one-to-many, {} unresolved), {} rules synthesized, {} failed",
            self.tables,
            self.classes,
            self.mappings,
            self.one_to_one,
            self.many_to_one,
            self.one_to_many,
            self.unresolved,
            self.rules_synthesized,
            self.rules_failed
        )
    }
}
