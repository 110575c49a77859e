//! Propose/validate loop that turns a set of identifiers into one pattern rule.
//!
//! A session shows the proposer a bounded sample, validates every candidate
//! against the full required and excluded sets, and feeds the verdict back
//! until a candidate is valid or the round budget runs out. Accepted rules
//! are cached per identifier set for the rest of the planning run.

mod cache;
mod heuristic;
pub mod sampling;

pub use cache::RuleCache;
pub use heuristic::HeuristicProposer;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::core::{ProposalRequest, RuleProposer, TableDescriptor};
use crate::pattern::{validate, PatternOracle, ValidationVerdict};

/// A rule in the pattern dialect.
pub type PatternRule = String;

/// Default maximum proposer rounds per session.
pub const DEFAULT_MAX_ROUNDS: usize = 5;

/// Default per-round proposer timeout.
pub const DEFAULT_ROUND_TIMEOUT: Duration = Duration::from_secs(30);

/// Dialect description handed to every proposer call.
pub const DIALECT_RULES: &str = "\
Rules must follow this pattern dialect:
1. Pattern characters:
  - '*' matches zero or more characters and may only be the last character
  - '?' matches exactly one character
  - '[...]' matches one character from a set or range
2. Sets and ranges:
  - [abc] matches 'a', 'b' or 'c'
  - [a-z] matches one character from 'a' to 'z'
  - [!a-z] matches one character outside 'a' to 'z'
3. Restrictions:
  - a pattern is never empty
  - matching covers the whole name and is case-sensitive
  - everything else matches itself literally
4. Examples:
  - \"abc\" matches exactly \"abc\"
  - \"a?c\" matches \"abc\" and \"adc\"
  - \"schema*\" matches \"schema1\" and \"schema12\"
  - \"i[x-z][1-3]\" matches \"ix1\" and \"iz3\"
  - \"ik[!a-ce-g]\" matches \"ik\" followed by a character outside a-c and e-g
Answer with the rule only.";

/// Where a synthesis session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Sampling,
    Proposing,
    Validating,
    Accepted,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Sampling => "sampling",
            SessionState::Proposing => "proposing",
            SessionState::Validating => "validating",
            SessionState::Accepted => "accepted",
            SessionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A session that ended without a valid rule.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{reason} ({identifiers} identifiers, {rounds} rounds)")]
pub struct SynthesisFailure {
    pub reason: String,

    /// Distinct identifiers the rule had to match.
    pub identifiers: usize,

    /// Proposer rounds spent.
    pub rounds: usize,

    /// Verdict on the last candidate, if any round ran.
    pub last_verdict: Option<ValidationVerdict>,
}

impl SynthesisFailure {
    fn new(reason: impl Into<String>, identifiers: usize) -> Self {
        Self {
            reason: reason.into(),
            identifiers,
            rounds: 0,
            last_verdict: None,
        }
    }

    fn in_part(mut self, part: &str) -> Self {
        self.reason = format!("{} names: {}", part, self.reason);
        self
    }
}

/// A dotted routing rule: one pattern for the schema, one for the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRule {
    pub schema: PatternRule,
    pub table: PatternRule,
}

impl TableRule {
    /// Check whether a table is routed by this rule.
    pub fn matches(&self, descriptor: &TableDescriptor) -> bool {
        let schema = std::slice::from_ref(&descriptor.schema);
        let table = std::slice::from_ref(&descriptor.table);
        validate(&self.schema, schema, &[]).valid && validate(&self.table, table, &[]).valid
    }
}

impl fmt::Display for TableRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Session limits.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisSettings {
    pub max_rounds: usize,
    pub round_timeout: Duration,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            round_timeout: DEFAULT_ROUND_TIMEOUT,
        }
    }
}

/// Runs synthesis sessions against one proposer, sharing one rule cache.
pub struct Synthesizer {
    proposer: Arc<dyn RuleProposer>,
    oracle: PatternOracle,
    cache: RuleCache,
    settings: SynthesisSettings,
}

impl Synthesizer {
    pub fn new(proposer: Arc<dyn RuleProposer>, settings: SynthesisSettings) -> Self {
        Self {
            proposer,
            oracle: PatternOracle::new(),
            cache: RuleCache::new(),
            settings,
        }
    }

    pub fn cache(&self) -> &RuleCache {
        &self.cache
    }

    /// Find a rule matching every identifier in `must_match` and none in
    /// `must_not_match`.
    ///
    /// A single distinct identifier is its own rule. Otherwise a cached rule
    /// for the same set is reused when it still excludes `must_not_match`,
    /// and a new session runs when it does not.
    pub async fn synthesize(
        &self,
        must_match: &[String],
        must_not_match: &[String],
    ) -> Result<PatternRule, SynthesisFailure> {
        let distinct: Vec<String> = must_match
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        match distinct.len() {
            0 => return Err(SynthesisFailure::new("nothing to match", 0)),
            1 => {
                let literal = self.oracle.validate(&distinct[0], &distinct, must_not_match);
                if literal.valid {
                    return Ok(literal.rule);
                }
                debug!("Literal '{}' is not a valid rule, proposing one", distinct[0]);
            }
            _ => {}
        }

        let key = RuleCache::key(&distinct);
        let cell = self.cache.cell(&key);

        if let Some(cached) = cell.get() {
            if self.oracle.validate(cached, &distinct, must_not_match).valid {
                debug!("Reusing cached rule '{}' for {} names", cached, distinct.len());
                return Ok(cached.clone());
            }
            debug!(
                "Cached rule '{}' matches excluded names here, starting a new session",
                cached
            );
            return self.run_session(&key, &distinct, must_not_match).await;
        }

        let accepted = cell
            .get_or_try_init(|| self.run_session(&key, &distinct, must_not_match))
            .await?
            .clone();

        // Another session may have filled the cell under different exclusions.
        if self.oracle.validate(&accepted, &distinct, must_not_match).valid {
            Ok(accepted)
        } else {
            self.run_session(&key, &distinct, must_not_match).await
        }
    }

    /// Synthesize the dotted rule routing `tables` but none of `others`.
    ///
    /// The table half excludes the table names of `others`, minus any name
    /// the rule itself must match. The schema half then excludes the schemas
    /// of those `others` whose table name the table half still matches. A
    /// rule that routes any of `others` after that is a failure.
    pub async fn synthesize_tables(
        &self,
        tables: &[TableDescriptor],
        others: &[TableDescriptor],
    ) -> Result<TableRule, SynthesisFailure> {
        let schemas: BTreeSet<String> = tables.iter().map(|t| t.schema.clone()).collect();
        let names: BTreeSet<String> = tables.iter().map(|t| t.table.clone()).collect();

        let (overlap, exclusions): (Vec<String>, Vec<String>) = others
            .iter()
            .map(|t| t.table.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .partition(|name| names.contains(name));
        if !overlap.is_empty() {
            warn!(
                "Not excluding {} table name(s) that must also match: {}",
                overlap.len(),
                overlap.join(", ")
            );
        }

        let names: Vec<String> = names.into_iter().collect();
        let table = self
            .synthesize(&names, &exclusions)
            .await
            .map_err(|f| f.in_part("table"))?;

        let schema_exclusions: Vec<String> = others
            .iter()
            .filter(|t| self.oracle.validate(&table, std::slice::from_ref(&t.table), &[]).valid)
            .map(|t| t.schema.clone())
            .filter(|schema| !schemas.contains(schema))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let schemas: Vec<String> = schemas.into_iter().collect();
        let schema = self
            .synthesize(&schemas, &schema_exclusions)
            .await
            .map_err(|f| f.in_part("schema"))?;

        let rule = TableRule { schema, table };
        let captured: BTreeSet<String> = others
            .iter()
            .filter(|t| rule.matches(t))
            .map(TableDescriptor::qualified)
            .collect();
        if !captured.is_empty() {
            let captured: Vec<String> = captured.into_iter().collect();
            warn!("Rule {} also routes {}", rule, captured.join(", "));
            return Err(SynthesisFailure::new(
                format!(
                    "rule {} also routes tables of other mappings: {}",
                    rule,
                    captured.join(", ")
                ),
                names.len(),
            ));
        }

        Ok(rule)
    }

    async fn run_session(
        &self,
        key: &str,
        must_match: &[String],
        must_not_match: &[String],
    ) -> Result<PatternRule, SynthesisFailure> {
        let id = &key[..12];
        let mut state = SessionState::Sampling;
        let sample = sampling::sample(must_match, sampling::sample_size(must_match.len()));
        debug!(
            "Session {}: sampled {} of {} names",
            id,
            sample.len(),
            must_match.len()
        );

        let mut prior: Option<ValidationVerdict> = None;
        for round in 1..=self.settings.max_rounds {
            transition(id, &mut state, SessionState::Proposing, round);
            let request = ProposalRequest {
                sample: sample.clone(),
                dialect_rules: DIALECT_RULES.to_string(),
                prior: prior.take(),
            };

            let verdict = match timeout(self.settings.round_timeout, self.proposer.propose(&request))
                .await
            {
                Ok(Ok(candidate)) => {
                    transition(id, &mut state, SessionState::Validating, round);
                    self.oracle
                        .validate(candidate.trim(), must_match, must_not_match)
                }
                Ok(Err(e)) => {
                    warn!("Session {}: {} proposer failed: {}", id, self.proposer.name(), e);
                    ValidationVerdict::rejected("", format!("proposer error: {}", e))
                }
                Err(_) => {
                    warn!(
                        "Session {}: {} proposer timed out after {:?}",
                        id,
                        self.proposer.name(),
                        self.settings.round_timeout
                    );
                    ValidationVerdict::rejected(
                        "",
                        format!("proposer timed out after {:?}", self.settings.round_timeout),
                    )
                }
            };

            if verdict.valid {
                transition(id, &mut state, SessionState::Accepted, round);
                info!(
                    "Accepted rule '{}' for {} names in round {}",
                    verdict.rule,
                    must_match.len(),
                    round
                );
                return Ok(verdict.rule);
            }

            debug!(
                "Session {}: round {} rejected '{}' ({} missed, {} false positives)",
                id,
                round,
                verdict.rule,
                verdict.missed_matches.len(),
                verdict.false_positives.len()
            );
            prior = Some(verdict);
        }

        transition(id, &mut state, SessionState::Failed, self.settings.max_rounds);
        warn!(
            "No valid rule for {} names after {} rounds",
            must_match.len(),
            self.settings.max_rounds
        );
        Err(SynthesisFailure {
            reason: "round budget exhausted".to_string(),
            identifiers: must_match.len(),
            rounds: self.settings.max_rounds,
            last_verdict: prior,
        })
    }
}

fn transition(id: &str, state: &mut SessionState, next: SessionState, round: usize) {
    debug!("Session {}: {} -> {} (round {})", id, state, next, round);
    *state = next;
}
