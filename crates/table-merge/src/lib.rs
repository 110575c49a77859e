//! # table-merge
//!
//! Schema reconciliation and routing-rule synthesis for consolidating sharded
//! MySQL-family tables into one destination.
//!
//! This library provides:
//!
//! - **Structural fingerprints** of column catalogs, ignoring marker columns
//! - **Equivalence classes** of source and destination tables
//! - **Mapping resolution** into one-to-one and many-to-one consolidations
//! - **Routing rule synthesis** in a constrained glob dialect, validated
//!   against required and excluded names
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use table_merge::{Config, HeuristicProposer, Planner, SnapshotCatalog};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.yaml")?;
//!     let catalog = SnapshotCatalog::load("catalog.yaml")?;
//!     let planner = Planner::new(config, Arc::new(catalog), Arc::new(HeuristicProposer));
//!     let plan = planner.plan(CancellationToken::new()).await?;
//!     println!("{}", plan.summary());
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod classify;
pub mod config;
pub mod core;
pub mod error;
pub mod fingerprint;
pub mod pattern;
pub mod planner;
pub mod resolve;
pub mod synthesis;

// Re-exports for convenient access
pub use catalog::SnapshotCatalog;
pub use classify::{classify, Classifier, EquivalenceClass};
pub use config::{Config, InstanceConfig, SynthesisConfig};
pub use crate::core::{CatalogEntry, CatalogReader, ColumnSignature, RuleProposer, TableDescriptor};
pub use error::{PlanError, Result};
pub use fingerprint::{fingerprint, MarkerFlags, StructuralFingerprint};
pub use pattern::{validate, CompiledPattern, PatternOracle, ValidationVerdict};
pub use planner::{MigrationPlan, PatternGroup, PlanSummary, PlannedMapping, Planner, RuleOutcome};
pub use resolve::{resolve, Mapping};
pub use synthesis::{HeuristicProposer, SynthesisFailure, Synthesizer, TableRule};
