//! Planning workflow: catalog collection, classification, resolution and
//! rule synthesis.

mod report;

pub use report::{PatternGroup, PlanSummary};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classify::{Classifier, EquivalenceClass};
use crate::config::Config;
use crate::core::{CatalogReader, Role, RuleProposer, TableDescriptor};
use crate::error::{PlanError, Result};
use crate::fingerprint::{fingerprint, MarkerFlags, StructuralFingerprint};
use crate::resolve::{resolve, Mapping};
use crate::synthesis::{SynthesisFailure, Synthesizer, TableRule};

/// Outcome of rule synthesis for one consolidation mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOutcome {
    Synthesized(TableRule),
    Failed(SynthesisFailure),
}

/// One mapping with the class it came from and its routing rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedMapping {
    pub fingerprint: StructuralFingerprint,

    /// Marker columns on the destination side of the class.
    pub markers: MarkerFlags,

    pub mapping: Mapping,

    /// Present when the mapping had enough sources to need a rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleOutcome>,
}

impl PlannedMapping {
    /// Synthesized rule, if any.
    pub fn table_rule(&self) -> Option<&TableRule> {
        match self.rule {
            Some(RuleOutcome::Synthesized(ref rule)) => Some(rule),
            _ => None,
        }
    }

    pub fn rule_failed(&self) -> bool {
        matches!(self.rule, Some(RuleOutcome::Failed(_)))
    }
}

/// Result of a planning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// Unique run identifier.
    pub run_id: String,

    /// Hash of the configuration the plan was built from.
    pub config_hash: String,

    /// "complete" or "incomplete".
    pub status: String,

    /// When planning started.
    pub started_at: DateTime<Utc>,

    /// When planning completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Descriptors classified across all instances.
    pub tables_total: usize,

    pub classes: Vec<EquivalenceClass>,

    pub mappings: Vec<PlannedMapping>,
}

impl MigrationPlan {
    /// True when no mapping is unresolved and no rule synthesis failed.
    pub fn is_complete(&self) -> bool {
        self.mappings
            .iter()
            .all(|m| !m.mapping.is_unresolved() && !m.rule_failed())
    }

    /// Mappings needing operator intervention.
    pub fn unresolved(&self) -> impl Iterator<Item = &PlannedMapping> {
        self.mappings.iter().filter(|m| m.mapping.is_unresolved())
    }

    /// Counts per mapping kind and rule outcome.
    pub fn summary(&self) -> PlanSummary {
        PlanSummary::from_plan(self)
    }

    /// Mappings grouped into the four report patterns.
    pub fn patterns(&self) -> BTreeMap<PatternGroup, Vec<&PlannedMapping>> {
        let mut groups: BTreeMap<PatternGroup, Vec<&PlannedMapping>> = BTreeMap::new();
        for m in &self.mappings {
            groups.entry(PatternGroup::of(m)).or_default().push(m);
        }
        groups
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Planning workflow coordinator.
pub struct Planner {
    config: Config,
    catalog: Arc<dyn CatalogReader>,
    synthesizer: Synthesizer,
}

impl Planner {
    /// Create a planner. The synthesizer gets a fresh rule cache, so cached
    /// rules never outlive one planner.
    pub fn new(
        config: Config,
        catalog: Arc<dyn CatalogReader>,
        proposer: Arc<dyn RuleProposer>,
    ) -> Self {
        let synthesizer = Synthesizer::new(proposer, config.synthesis.settings());
        Self {
            config,
            catalog,
            synthesizer,
        }
    }

    /// Classify and resolve without synthesizing rules.
    pub async fn analyze(&self, cancel: CancellationToken) -> Result<MigrationPlan> {
        self.run(cancel, false).await
    }

    /// Run the full planning workflow.
    pub async fn plan(&self, cancel: CancellationToken) -> Result<MigrationPlan> {
        self.run(cancel, true).await
    }

    async fn run(&self, cancel: CancellationToken, synthesize: bool) -> Result<MigrationPlan> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        info!("Starting planning run: {}", run_id);

        // Phase 1: Collect catalogs
        info!("Phase 1: Reading catalogs and classifying tables");
        let classifier = self.collect(&cancel).await?;
        let tables_total = classifier.table_count();
        let classes = classifier.finish();
        info!(
            "Classified {} tables into {} equivalence classes",
            tables_total,
            classes.len()
        );

        // Phase 2: Resolve
        info!("Phase 2: Resolving mappings");
        let mut mappings: Vec<PlannedMapping> = classes
            .iter()
            .flat_map(|class| {
                resolve(class).into_iter().map(move |mapping| PlannedMapping {
                    fingerprint: class.fingerprint.clone(),
                    markers: class.markers,
                    mapping,
                    rule: None,
                })
            })
            .collect();
        for m in mappings.iter().filter(|m| m.mapping.is_unresolved()) {
            warn!("Unresolved {}", m.mapping);
        }

        // Phase 3: Synthesize routing rules
        if synthesize {
            info!("Phase 3: Synthesizing routing rules");
            self.synthesize_rules(&mut mappings, &cancel).await?;
        }

        let completed_at = Utc::now();
        let duration = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        let mut plan = MigrationPlan {
            run_id,
            config_hash: self.config.hash(),
            status: String::new(),
            started_at,
            completed_at,
            duration_seconds: duration,
            tables_total,
            classes,
            mappings,
        };
        plan.status = if plan.is_complete() {
            "complete"
        } else {
            "incomplete"
        }
        .to_string();

        info!(
            "Planning run {} {} in {:.1}s ({} mappings)",
            plan.run_id,
            plan.status,
            plan.duration_seconds,
            plan.mappings.len()
        );
        Ok(plan)
    }

    /// Read every source instance, then the destination, into a classifier.
    async fn collect(&self, cancel: &CancellationToken) -> Result<Classifier> {
        let instances = self
            .config
            .sources
            .iter()
            .map(|i| (i, Role::Source))
            .chain(std::iter::once((&self.config.destination, Role::Dest)));

        let mut classifier = Classifier::new();
        for (instance, role) in instances {
            if cancel.is_cancelled() {
                return Err(PlanError::Cancelled);
            }

            let entries = tokio::select! {
                _ = cancel.cancelled() => return Err(PlanError::Cancelled),
                res = self.catalog.read_tables(&instance.name, &instance.schemas) => res?,
            };
            debug!(
                "Read {} tables from {} instance {}",
                entries.len(),
                role,
                instance.name
            );

            for entry in entries {
                let shape = fingerprint(&entry.columns);
                classifier.insert(entry.descriptor, &shape, role);
            }
        }
        Ok(classifier)
    }

    async fn synthesize_rules(
        &self,
        mappings: &mut [PlannedMapping],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let threshold = self.config.synthesis.threshold;

        let mut jobs = Vec::new();
        for (idx, planned) in mappings.iter().enumerate() {
            let Mapping::ManyToOne { ref sources, .. } = planned.mapping else {
                continue;
            };
            if sources.len() <= threshold {
                continue;
            }
            let others: Vec<TableDescriptor> = mappings
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != idx)
                .flat_map(|(_, m)| m.mapping.sources())
                .cloned()
                .collect();
            jobs.push((idx, sources.clone(), others));
        }

        if jobs.is_empty() {
            info!("No mapping exceeds {} sources, nothing to synthesize", threshold);
            return Ok(());
        }
        info!(
            "Synthesizing rules for {} mappings ({} at a time)",
            jobs.len(),
            self.config.synthesis.concurrency
        );

        let synthesizer = &self.synthesizer;
        let sessions = stream::iter(jobs)
            .map(|(idx, sources, others): (usize, Vec<TableDescriptor>, Vec<TableDescriptor>)| async move {
                let outcome = synthesizer.synthesize_tables(&sources, &others).await;
                (idx, outcome)
            })
            .buffer_unordered(self.config.synthesis.concurrency)
            .collect::<Vec<_>>();

        let outcomes = tokio::select! {
            _ = cancel.cancelled() => return Err(PlanError::Cancelled),
            outcomes = sessions => outcomes,
        };

        for (idx, outcome) in outcomes {
            let planned = &mut mappings[idx];
            planned.rule = Some(match outcome {
                Ok(rule) => {
                    info!("Rule {} for {}", rule, planned.mapping);
                    RuleOutcome::Synthesized(rule)
                }
                Err(failure) => {
                    warn!("No rule for {}: {}", planned.mapping, failure);
                    RuleOutcome::Failed(failure)
                }
            });
        }
        Ok(())
    }
}
