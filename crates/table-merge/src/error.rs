//! Error types for the planning library.

use thiserror::Error;

/// Exit code for configuration errors (invalid YAML, missing fields, etc.).
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code for catalog read failures.
pub const EXIT_CATALOG_ERROR: u8 = 2;
/// Exit code for rule proposer failures.
///
/// Synthesis sessions consume proposer errors as spent rounds, so the
/// planner never returns one. Callers that invoke a
/// [`RuleProposer`](crate::core::RuleProposer) directly get this code.
pub const EXIT_PROPOSER_ERROR: u8 = 3;
/// Exit code when a plan was produced but needs operator attention.
pub const EXIT_PLAN_INCOMPLETE: u8 = 4;
/// Exit code when the run was cancelled.
pub const EXIT_CANCELLED: u8 = 5;
/// Exit code for IO errors (file not found, permission denied).
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for planning operations.
#[derive(Error, Debug)]
pub enum PlanError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog reader failed; classification cannot continue with partial state.
    #[error("Catalog error on instance {instance}: {message}")]
    Catalog { instance: String, message: String },

    /// Rule proposer failed. Only seen outside a synthesis session.
    #[error("Rule proposer error: {0}")]
    Proposer(String),

    /// The plan has unresolved mappings or failed syntheses.
    #[error("Plan incomplete: {0}")]
    Incomplete(String),

    /// Planning was cancelled (SIGINT, etc.)
    #[error("Planning cancelled")]
    Cancelled,

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PlanError {
    /// Create a Catalog error for the given instance.
    pub fn catalog(instance: impl Into<String>, message: impl Into<String>) -> Self {
        PlanError::Catalog {
            instance: instance.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            PlanError::Config(_) | PlanError::Yaml(_) | PlanError::Json(_) => EXIT_CONFIG_ERROR,
            PlanError::Catalog { .. } => EXIT_CATALOG_ERROR,
            PlanError::Proposer(_) => EXIT_PROPOSER_ERROR,
            PlanError::Incomplete(_) => EXIT_PLAN_INCOMPLETE,
            PlanError::Cancelled => EXIT_CANCELLED,
            PlanError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for planning operations.
pub type Result<T> = std::result::Result<T, PlanError>;
