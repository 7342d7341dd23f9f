//! # jsonflat - Nested JSON to flat tables
//!
//! jsonflat turns a JSON document (an array of objects, or one object)
//! into a table whose cells are all scalars, then writes it as CSV.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Document   │────▶│   Dataset   │────▶│  Flattener  │────▶│  CSV table  │
//! │  (ingress)  │     │  (schema)   │     │  (passes)   │     │  (egress)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                                                    │
//!                                                             ┌─────────────┐
//!                                                             │ Job status  │
//!                                                             └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use jsonflat::{flatten_document, Flattener, FlattenOptions};
//! use serde_json::json;
//!
//! let flattener = Flattener::new(FlattenOptions::default());
//! let table = flatten_document(json!({"info": {"id": 7}, "tags": ["x", "y"]}), &flattener)?;
//! assert_eq!(table.row_count(), 2);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error enums per concern
//! - [`config`] - Environment configuration
//! - [`logs`] - Progress logging over `tracing`
//! - [`models`] - Dataset, columns, job records
//! - [`schema`] - Column kind inference
//! - [`flatten`] - The flattening passes
//! - [`ingress`] - Input documents
//! - [`egress`] - CSV output
//! - [`status`] - Job status registry
//! - [`pipeline`] - Job orchestration

// Core modules
pub mod error;
pub mod models;

// Ambient
pub mod config;
pub mod logs;

// Transformation
pub mod flatten;
pub mod schema;

// Collaborators
pub mod egress;
pub mod ingress;
pub mod status;

// Orchestration
pub mod pipeline;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{
    ConfigError, EgressError, FlattenError, IngressError, JobError, JobResult, StatusError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Column, ColumnKind, Dataset, JobOutcome, JobRecord, JobStatus};

// =============================================================================
// Re-exports - Flattening
// =============================================================================

pub use flatten::{Flattener, FlattenOptions};
pub use schema::{describe, infer_kind, SchemaHints};

// =============================================================================
// Re-exports - Collaborators
// =============================================================================

pub use egress::{write_csv, CsvOptions, FsTableSink, TableSink};
pub use ingress::{document_to_records, parse_document, DocumentSource, FsDocumentSource};
pub use status::{StatusRegistry, StatusSink};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use config::JobConfig;
pub use logs::{init_logging, LogFormat};
pub use pipeline::{flatten_document, submit, JobRunner, JobSummary};
