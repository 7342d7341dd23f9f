//! Error types for the jsonflat job.
//!
//! One error enum per concern:
//!
//! - [`FlattenError`] - Core flattening failures (malformed schema, no convergence)
//! - [`IngressError`] - Fetching and parsing the input document
//! - [`EgressError`] - Writing the flattened table
//! - [`StatusError`] - Job status registry
//! - [`ConfigError`] - Environment configuration
//! - [`JobError`] - Top-level job orchestration
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Flattening Errors
// =============================================================================

/// Fatal failures of the flattener.
///
/// Null or empty nested values are never errors; they are coalesced to a
/// single null row.
#[derive(Debug, Error)]
pub enum FlattenError {
    /// A column's cells cannot be described by one kind.
    #[error("Malformed schema for column '{column}': {message}")]
    MalformedSchema { column: String, message: String },

    /// The pass limit was reached with nested columns left.
    #[error("Flattening did not converge after {limit} passes (still nested: {})", pending.join(", "))]
    IterationLimitExceeded { limit: usize, pending: Vec<String> },
}

impl FlattenError {
    pub fn malformed(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedSchema {
            column: column.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Ingress Errors
// =============================================================================

/// Errors while supplying the input document.
#[derive(Debug, Error)]
pub enum IngressError {
    /// Failed to read the document.
    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),

    /// No document exists for the job.
    #[error("No document found for job '{0}'")]
    NotFound(String),

    /// The document is not valid JSON.
    #[error("Invalid JSON {0}")]
    Json(String),

    /// The job id is not a plain file name.
    #[error("Invalid job id: '{0}'")]
    InvalidJobId(String),

    /// The document cannot be read as rows.
    #[error("Document is not tabular: {0}")]
    NotTabular(String),
}

// =============================================================================
// Egress Errors
// =============================================================================

/// Errors while persisting the flattened table.
#[derive(Debug, Error)]
pub enum EgressError {
    /// Filesystem failure.
    #[error("Failed to write table: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A nested value reached the writer.
    #[error("Column '{column}' still holds nested values")]
    NotFlat { column: String },

    /// The logical output location is not acceptable.
    #[error("Invalid output location: {0}")]
    InvalidLocation(String),
}

// =============================================================================
// Status Errors
// =============================================================================

/// Errors from the job status registry.
#[derive(Debug, Error)]
pub enum StatusError {
    /// Job record not found.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// The job already has a final outcome.
    #[error("Job '{job_id}' is already {status}")]
    AlreadyFinal { job_id: String, status: String },

    /// IO error.
    #[error("Status registry IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Status registry JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable holds a value that cannot be used.
    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: String, value: String },
}

// =============================================================================
// Job Errors (top-level)
// =============================================================================

/// Top-level job orchestration errors.
///
/// This is the error type returned by [`crate::pipeline::JobRunner::run`].
#[derive(Debug, Error)]
pub enum JobError {
    /// Ingress error.
    #[error("Ingress error: {0}")]
    Ingress(#[from] IngressError),

    /// Flattening error.
    #[error("Flatten error: {0}")]
    Flatten(#[from] FlattenError),

    /// Egress error.
    #[error("Egress error: {0}")]
    Egress(#[from] EgressError),

    /// Status error.
    #[error("Status error: {0}")]
    Status(#[from] StatusError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for flattening.
pub type FlattenResult<T> = Result<T, FlattenError>;

/// Result type for ingress.
pub type IngressResult<T> = Result<T, IngressError>;

/// Result type for egress.
pub type EgressResult<T> = Result<T, EgressError>;

/// Result type for the status registry.
pub type StatusResult<T> = Result<T, StatusError>;

/// Result type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for job orchestration.
pub type JobResult<T> = Result<T, JobError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let flatten_err = FlattenError::malformed("info", "object and array cells");
        let job_err: JobError = flatten_err.into();
        assert!(job_err.to_string().contains("info"));

        let ingress_err = IngressError::NotFound("42-orders".into());
        let job_err: JobError = ingress_err.into();
        assert!(job_err.to_string().contains("42-orders"));
    }

    #[test]
    fn test_iteration_limit_lists_pending_columns() {
        let err = FlattenError::IterationLimitExceeded {
            limit: 3,
            pending: vec!["a".into(), "b_c".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("3 passes"));
        assert!(msg.contains("a, b_c"));
    }
}
