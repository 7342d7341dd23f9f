//! Job orchestration: fetch → build dataset → flatten → persist → record.
//!
//! # Example
//!
//! ```rust,ignore
//! use jsonflat::{JobConfig, JobRunner};
//!
//! let config = JobConfig::from_env()?;
//! let mut runner = JobRunner::from_config(&config)?;
//! let summary = runner.run("1700000000000-orders", "1700000000000-orders.csv")?;
//! println!("{} rows written to {}", summary.rows, summary.output.display());
//! ```

use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

use crate::config::JobConfig;
use crate::egress::{CsvOptions, FsTableSink, TableSink};
use crate::error::JobResult;
use crate::flatten::Flattener;
use crate::ingress::{document_to_records, DocumentSource, FsDocumentSource};
use crate::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::models::{Dataset, JobOutcome, JobRecord};
use crate::status::{StatusRegistry, StatusSink};

/// What a successful run produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: String,
    pub rows: usize,
    pub columns: usize,
    pub output: PathBuf,
}

/// Build and flatten the dataset of a parsed document.
pub fn flatten_document(document: Value, flattener: &Flattener) -> JobResult<Dataset> {
    let records = document_to_records(document)?;
    let dataset = Dataset::from_records(records, flattener.hints())?;
    log_info_indent(
        format!(
            "{} rows, {} columns ({} nested)",
            dataset.row_count(),
            dataset.column_count(),
            dataset.nested_columns().len()
        ),
        1,
    );
    Ok(flattener.flatten(dataset)?)
}

/// Runs one job against its collaborators.
pub struct JobRunner<S, T, R> {
    source: S,
    sink: T,
    status: R,
    flattener: Flattener,
}

impl JobRunner<FsDocumentSource, FsTableSink, StatusRegistry> {
    /// Filesystem collaborators rooted at the configured data directory.
    pub fn from_config(config: &JobConfig) -> JobResult<Self> {
        Ok(Self::new(
            FsDocumentSource::new(config.inbox_dir()),
            FsTableSink::with_options(
                config.outbox_dir(),
                CsvOptions {
                    delimiter: config.delimiter,
                },
            ),
            StatusRegistry::with_dir(config.jobs_dir())?,
            Flattener::new(config.flatten_options()),
        ))
    }
}

impl<S, T, R> JobRunner<S, T, R>
where
    S: DocumentSource,
    T: TableSink,
    R: StatusSink,
{
    pub fn new(source: S, sink: T, status: R, flattener: Flattener) -> Self {
        Self {
            source,
            sink,
            status,
            flattener,
        }
    }

    pub fn status(&self) -> &R {
        &self.status
    }

    /// Run job `job_id`, writing its table at `output_location`.
    ///
    /// The job must be known to the status sink and not yet final;
    /// otherwise nothing is read or written. Past that check the outcome
    /// is recorded either way, and on failure the original error is
    /// returned after it has been recorded.
    pub fn run(&mut self, job_id: &str, output_location: &str) -> JobResult<JobSummary> {
        self.status.ensure_open(job_id)?;
        log_info(format!("Running job {job_id}"));

        match self.execute(job_id, output_location) {
            Ok(summary) => {
                self.status.record(
                    job_id,
                    &JobOutcome::Completed {
                        rows: summary.rows,
                        columns: summary.columns,
                    },
                )?;
                log_success(format!(
                    "Job {job_id}: {} rows × {} columns → {}",
                    summary.rows,
                    summary.columns,
                    summary.output.display()
                ));
                Ok(summary)
            }
            Err(err) => {
                log_error(format!("Job {job_id} failed: {err}"));
                let outcome = JobOutcome::Failed {
                    error: err.to_string(),
                };
                if let Err(status_err) = self.status.record(job_id, &outcome) {
                    log_warning(format!("Could not record failure of {job_id}: {status_err}"));
                }
                Err(err)
            }
        }
    }

    fn execute(&self, job_id: &str, output_location: &str) -> JobResult<JobSummary> {
        let document = self.source.fetch(job_id)?;
        let dataset = flatten_document(document, &self.flattener)?;
        let output = self.sink.persist(&dataset, output_location)?;
        Ok(JobSummary {
            job_id: job_id.to_string(),
            rows: dataset.row_count(),
            columns: dataset.column_count(),
            output,
        })
    }
}

/// Stage an uploaded document and open an `in-progress` job for it.
pub fn submit(
    source: &FsDocumentSource,
    registry: &mut StatusRegistry,
    file_name: &str,
    bytes: &[u8],
) -> JobResult<JobRecord> {
    let record = JobRecord::new(file_name, chrono::Utc::now().timestamp_millis());
    source.stage(&record.file_id, bytes)?;
    registry.create(record.clone())?;
    log_success(format!("Submitted {} as job {}", file_name, record.file_id));
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FlattenError, IngressError, JobError, StatusError};
    use crate::flatten::FlattenOptions;
    use crate::models::JobStatus;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn config(dir: &TempDir) -> JobConfig {
        JobConfig {
            data_dir: dir.path().to_path_buf(),
            ..JobConfig::default()
        }
    }

    fn submit_doc(config: &JobConfig, name: &str, body: &str) -> JobRecord {
        let source = FsDocumentSource::new(config.inbox_dir());
        let mut registry = StatusRegistry::with_dir(config.jobs_dir()).unwrap();
        submit(&source, &mut registry, name, body.as_bytes()).unwrap()
    }

    #[test]
    fn test_submit_stages_document() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let record = submit_doc(&config, "orders.json", r#"[{"id": 1}]"#);

        assert!(record.file_id.ends_with("-orders"));
        assert!(config.inbox_dir().join(&record.input_location).exists());

        let registry = StatusRegistry::with_dir(config.jobs_dir()).unwrap();
        assert_eq!(registry.get(&record.file_id).unwrap().status, JobStatus::InProgress);
    }

    #[test]
    fn test_submit_rejects_invalid_json() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let source = FsDocumentSource::new(config.inbox_dir());
        let mut registry = StatusRegistry::with_dir(config.jobs_dir()).unwrap();

        let err = submit(&source, &mut registry, "bad.json", b"[{").unwrap_err();
        assert!(matches!(err, JobError::Ingress(IngressError::Json(_))));
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_run_writes_csv_and_records_completion() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let record = submit_doc(
            &config,
            "orders.json",
            r#"[{"info": {"id": 7}, "tags": ["x", "y"]}]"#,
        );

        let mut runner = JobRunner::from_config(&config).unwrap();
        let summary = runner.run(&record.file_id, &record.output_location).unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.columns, 2);

        let csv = fs::read_to_string(&summary.output).unwrap();
        assert_eq!(csv, "tags,info_id\nx,7\ny,7\n");

        let stored = runner.status().get(&record.file_id).unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.row_count, Some(2));
    }

    #[test]
    fn test_run_records_failure() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let record = submit_doc(&config, "mixed.json", r#"[{"a": {"x": 1}}, {"a": [1]}]"#);

        let mut runner = JobRunner::from_config(&config).unwrap();
        let err = runner.run(&record.file_id, &record.output_location).unwrap_err();
        assert!(matches!(
            err,
            JobError::Flatten(FlattenError::MalformedSchema { ref column, .. }) if column == "a"
        ));

        let stored = runner.status().get(&record.file_id).unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert!(stored.error_message.as_deref().unwrap().contains("'a'"));
        assert!(!config.outbox_dir().join(&record.output_location).exists());
    }

    #[test]
    fn test_rerun_of_finished_job_keeps_output() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let record = submit_doc(&config, "once.json", r#"[{"a": 1}]"#);

        let mut runner = JobRunner::from_config(&config).unwrap();
        let summary = runner.run(&record.file_id, &record.output_location).unwrap();
        assert_eq!(fs::read_to_string(&summary.output).unwrap(), "a\n1\n");

        let inbox = config.inbox_dir().join(&record.input_location);
        fs::write(&inbox, r#"[{"b": 2}]"#).unwrap();

        let err = runner.run(&record.file_id, &record.output_location).unwrap_err();
        assert!(matches!(err, JobError::Status(StatusError::AlreadyFinal { .. })));
        assert_eq!(fs::read_to_string(&summary.output).unwrap(), "a\n1\n");
        assert_eq!(runner.status().get(&record.file_id).unwrap().row_count, Some(1));
    }

    #[test]
    fn test_unknown_job_writes_nothing() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let source = FsDocumentSource::new(config.inbox_dir());
        source.stage("ghost", br#"[{"a": 1}]"#).unwrap();

        let mut runner = JobRunner::from_config(&config).unwrap();
        let err = runner.run("ghost", "ghost.csv").unwrap_err();
        assert!(matches!(err, JobError::Status(StatusError::NotFound(_))));
        assert!(!config.outbox_dir().join("ghost.csv").exists());
    }

    #[test]
    fn test_run_non_tabular_document() {
        let dir = tempdir().unwrap();
        let config = config(&dir);
        let record = submit_doc(&config, "scalar.json", "42");

        let mut runner = JobRunner::from_config(&config).unwrap();
        let err = runner.run(&record.file_id, &record.output_location).unwrap_err();
        assert!(matches!(err, JobError::Ingress(IngressError::NotTabular(_))));
        assert_eq!(
            runner.status().get(&record.file_id).unwrap().status,
            JobStatus::Failed
        );
    }

    #[test]
    fn test_flatten_document_with_map_hint() {
        let flattener = Flattener::new(FlattenOptions::default().with_map_columns(["attrs"]));
        let ds = flatten_document(
            serde_json::json!([{"id": 1, "attrs": {"color": "red", "size": "L"}}]),
            &flattener,
        )
        .unwrap();
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.column_names(), vec!["id", "attrs_key", "attrs_value"]);
    }
}
