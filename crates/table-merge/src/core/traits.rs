//! Collaborator traits consumed by the planning core.
//!
//! - [`CatalogReader`]: yields table descriptors and column catalogs per instance
//! - [`RuleProposer`]: proposes candidate pattern rules for a set of identifiers
//!
//! # Design Patterns
//!
//! - **Strategy**: both traits are interchangeable collaborators, so tests can
//!   substitute in-memory catalogs and deterministic stub proposers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pattern::ValidationVerdict;

use super::schema::CatalogEntry;

/// Read table catalogs from a database instance.
///
/// Implementations must be deterministic for a given catalog snapshot. The
/// SQL dialect or file format used to obtain the catalog is up to the
/// implementation.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Read every table of the given schemas on one instance.
    ///
    /// Any failure is fatal to the planning run: classification cannot
    /// proceed with a partial catalog.
    async fn read_tables(&self, instance: &str, schemas: &[String]) -> Result<Vec<CatalogEntry>>;
}

/// Input handed to a [`RuleProposer`] for one round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalRequest {
    /// Bounded sample of the identifiers the rule must match. May contain a
    /// placeholder entry noting how many middle elements were omitted.
    pub sample: Vec<String>,

    /// Instructions describing the pattern dialect.
    pub dialect_rules: String,

    /// Verdict on the previous round's candidate, if any.
    pub prior: Option<ValidationVerdict>,
}

/// Propose candidate pattern rules.
///
/// Stateless from the core's perspective: the synthesis loop owns the round
/// counter and hands back the previous verdict on every call.
#[async_trait]
pub trait RuleProposer: Send + Sync {
    /// Return one candidate rule.
    async fn propose(&self, request: &ProposalRequest) -> Result<String>;

    /// Proposer name for logging.
    fn name(&self) -> &str;
}
