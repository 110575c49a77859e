//! Core abstractions shared by the planning pipeline.
//!
//! - [`schema`]: table descriptors, column signatures and catalog entries
//! - [`traits`]: collaborator traits for catalog readers and rule proposers

pub mod schema;
pub mod traits;

pub use schema::{CatalogEntry, ColumnSignature, Role, TableDescriptor};
pub use traits::{CatalogReader, ProposalRequest, RuleProposer};
