//! Domain models for the jsonflat job.
//!
//! - [`Dataset`] - Ordered columns with kind tags, row-major cells
//! - [`Column`] / [`ColumnKind`] - Column name and value-kind tag
//! - [`JobRecord`] - Persisted job metadata and status
//! - [`JobStatus`] / [`JobOutcome`] - Job lifecycle

pub mod dataset;

use serde::{Deserialize, Serialize};

pub use dataset::Dataset;

// =============================================================================
// Columns
// =============================================================================

/// Value-kind tag of a column.
///
/// Object columns carry their field set (union of observed keys, first-seen
/// order). JSON has no map type of its own; Map is only assigned to columns
/// declared as maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "fields", rename_all = "lowercase")]
pub enum ColumnKind {
    Scalar,
    Object(Vec<String>),
    Array,
    Map,
}

impl ColumnKind {
    pub fn is_scalar(&self) -> bool {
        matches!(self, ColumnKind::Scalar)
    }
}

/// A named column of a [`Dataset`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(flatten)]
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Scalar)
    }
}

// =============================================================================
// Jobs
// =============================================================================

/// Lifecycle state of a job record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_final(self) -> bool {
        !matches!(self, JobStatus::InProgress)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::InProgress => write!(f, "in-progress"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome reported to the status sink once a job ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { rows: usize, columns: usize },
    Failed { error: String },
}

impl JobOutcome {
    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Completed { .. } => JobStatus::Completed,
            JobOutcome::Failed { .. } => JobStatus::Failed,
        }
    }
}

/// A persisted job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    /// `<unix-millis>-<file stem>`
    pub file_id: String,
    /// Original upload name
    pub file_name: String,
    /// Logical input location (relative to the inbox)
    pub input_location: String,
    /// Logical output location (relative to the outbox)
    pub output_location: String,
    /// `jb_<unix-millis>`
    pub reference_id: String,
    pub status: JobStatus,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub row_count: Option<usize>,
    #[serde(default)]
    pub column_count: Option<usize>,
}

impl JobRecord {
    /// Build a fresh `in-progress` record.
    pub fn new(file_name: impl Into<String>, millis: i64) -> Self {
        let file_name = file_name.into();
        let stem = file_stem(&file_name);
        let file_id = format!("{}-{}", millis, stem);
        Self {
            input_location: format!("{}.json", file_id),
            output_location: format!("{}.csv", file_id),
            reference_id: format!("jb_{}", millis),
            file_id,
            file_name,
            status: JobStatus::InProgress,
            created_at: chrono::Utc::now().to_rfc3339(),
            updated_at: None,
            error_message: None,
            row_count: None,
            column_count: None,
        }
    }

    /// Apply a final outcome to the record.
    pub fn apply(&mut self, outcome: &JobOutcome) {
        self.status = outcome.status();
        self.updated_at = Some(chrono::Utc::now().to_rfc3339());
        match outcome {
            JobOutcome::Completed { rows, columns } => {
                self.row_count = Some(*rows);
                self.column_count = Some(*columns);
                self.error_message = None;
            }
            JobOutcome::Failed { error } => {
                self.error_message = Some(error.clone());
            }
        }
    }
}

/// Slug of a file name without its `.json` extension.
fn file_stem(file_name: &str) -> String {
    let base = file_name.strip_suffix(".json").unwrap_or(file_name);
    let slug: String = base
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        "document".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_record_ids() {
        let record = JobRecord::new("orders 2024.json", 1700000000000);
        assert_eq!(record.file_id, "1700000000000-orders-2024");
        assert_eq!(record.reference_id, "jb_1700000000000");
        assert_eq!(record.input_location, "1700000000000-orders-2024.json");
        assert_eq!(record.output_location, "1700000000000-orders-2024.csv");
        assert_eq!(record.status, JobStatus::InProgress);
    }

    #[test]
    fn test_apply_outcome() {
        let mut record = JobRecord::new("a.json", 1);
        record.apply(&JobOutcome::Completed { rows: 3, columns: 2 });
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.row_count, Some(3));
        assert!(record.updated_at.is_some());

        let mut record = JobRecord::new("a.json", 1);
        record.apply(&JobOutcome::Failed { error: "boom".into() });
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&JobStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        assert_eq!(JobStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_column_kind_serialization() {
        let col = Column::new("info", ColumnKind::Object(vec!["id".into()]));
        let json = serde_json::to_value(&col).unwrap();
        assert_eq!(json["name"], "info");
        assert_eq!(json["kind"], "object");
        assert_eq!(json["fields"][0], "id");

        let json = serde_json::to_value(Column::scalar("n")).unwrap();
        assert_eq!(json["kind"], "scalar");
    }
}
