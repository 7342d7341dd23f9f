//! Job status registry.
//!
//! One pretty-printed JSON file per job, `<jobs_dir>/<file_id>.json`,
//! loaded into memory when the registry is opened. A job's outcome is
//! written once: after `completed` or `failed` the record is frozen.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{StatusError, StatusResult};
use crate::models::{JobOutcome, JobRecord};

/// Receives the final outcome of a job.
pub trait StatusSink {
    /// Fails unless `job_id` is known and still awaiting an outcome.
    fn ensure_open(&self, job_id: &str) -> StatusResult<()>;

    fn record(&mut self, job_id: &str, outcome: &JobOutcome) -> StatusResult<()>;
}

/// File-backed registry of [`JobRecord`]s.
#[derive(Debug)]
pub struct StatusRegistry {
    jobs_dir: PathBuf,
    records: BTreeMap<String, JobRecord>,
}

impl StatusRegistry {
    /// Open the registry at `dir`, loading every record found there.
    pub fn with_dir(dir: impl AsRef<Path>) -> StatusResult<Self> {
        let mut registry = Self {
            jobs_dir: dir.as_ref().to_path_buf(),
            records: BTreeMap::new(),
        };
        registry.load_all()?;
        Ok(registry)
    }

    fn load_all(&mut self) -> StatusResult<()> {
        if !self.jobs_dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(&self.jobs_dir)? {
            let path = entry?.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<JobRecord>(&content) {
                Ok(record) => {
                    self.records.insert(record.file_id.clone(), record);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable job record");
                }
            }
        }
        Ok(())
    }

    pub fn jobs_dir(&self) -> &Path {
        &self.jobs_dir
    }

    /// All records, ordered by job id.
    pub fn list(&self) -> Vec<&JobRecord> {
        self.records.values().collect()
    }

    pub fn get(&self, job_id: &str) -> Option<&JobRecord> {
        self.records.get(job_id)
    }

    /// Store a new record.
    ///
    /// Re-creating a job that is still in progress replaces it; a job with
    /// a final outcome cannot be re-created.
    pub fn create(&mut self, record: JobRecord) -> StatusResult<()> {
        if let Some(existing) = self.records.get(&record.file_id) {
            ensure_open(existing)?;
        }
        self.save(&record)?;
        self.records.insert(record.file_id.clone(), record);
        Ok(())
    }

    fn open_record(&self, job_id: &str) -> StatusResult<&JobRecord> {
        let record = self
            .records
            .get(job_id)
            .ok_or_else(|| StatusError::NotFound(job_id.to_string()))?;
        ensure_open(record)?;
        Ok(record)
    }

    fn save(&self, record: &JobRecord) -> StatusResult<()> {
        fs::create_dir_all(&self.jobs_dir)?;
        let path = self.jobs_dir.join(format!("{}.json", record.file_id));
        let content = serde_json::to_string_pretty(record)?;
        fs::write(path, content)?;
        Ok(())
    }
}

impl StatusSink for StatusRegistry {
    fn ensure_open(&self, job_id: &str) -> StatusResult<()> {
        self.open_record(job_id).map(|_| ())
    }

    fn record(&mut self, job_id: &str, outcome: &JobOutcome) -> StatusResult<()> {
        let mut updated = self.open_record(job_id)?.clone();
        updated.apply(outcome);
        self.save(&updated)?;
        self.records.insert(job_id.to_string(), updated);
        Ok(())
    }
}

fn ensure_open(record: &JobRecord) -> StatusResult<()> {
    if record.status.is_final() {
        return Err(StatusError::AlreadyFinal {
            job_id: record.file_id.clone(),
            status: record.status.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobStatus;
    use tempfile::tempdir;

    #[test]
    fn test_create_and_reload() {
        let dir = tempdir().unwrap();
        let mut registry = StatusRegistry::with_dir(dir.path()).unwrap();
        registry.create(JobRecord::new("orders.json", 1_700_000_000_000)).unwrap();

        let reopened = StatusRegistry::with_dir(dir.path()).unwrap();
        let record = reopened.get("1700000000000-orders").unwrap();
        assert_eq!(record.status, JobStatus::InProgress);
        assert_eq!(reopened.list().len(), 1);
    }

    #[test]
    fn test_record_completed() {
        let dir = tempdir().unwrap();
        let mut registry = StatusRegistry::with_dir(dir.path()).unwrap();
        registry.create(JobRecord::new("a.json", 1)).unwrap();

        registry
            .record("1-a", &JobOutcome::Completed { rows: 3, columns: 2 })
            .unwrap();

        let reopened = StatusRegistry::with_dir(dir.path()).unwrap();
        let record = reopened.get("1-a").unwrap();
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.row_count, Some(3));
        assert!(record.updated_at.is_some());
    }

    #[test]
    fn test_outcome_written_once() {
        let dir = tempdir().unwrap();
        let mut registry = StatusRegistry::with_dir(dir.path()).unwrap();
        registry.create(JobRecord::new("a.json", 1)).unwrap();
        registry
            .record("1-a", &JobOutcome::Failed { error: "boom".into() })
            .unwrap();

        let err = registry
            .record("1-a", &JobOutcome::Completed { rows: 1, columns: 1 })
            .unwrap_err();
        assert!(matches!(err, StatusError::AlreadyFinal { ref status, .. } if status == "failed"));
        assert_eq!(registry.get("1-a").unwrap().error_message.as_deref(), Some("boom"));

        assert!(registry.create(JobRecord::new("a.json", 1)).is_err());
    }

    #[test]
    fn test_unknown_job() {
        let dir = tempdir().unwrap();
        let mut registry = StatusRegistry::with_dir(dir.path()).unwrap();
        let err = registry
            .record("missing", &JobOutcome::Completed { rows: 0, columns: 0 })
            .unwrap_err();
        assert!(matches!(err, StatusError::NotFound(_)));
        assert!(matches!(registry.ensure_open("missing"), Err(StatusError::NotFound(_))));
    }

    #[test]
    fn test_ensure_open_tracks_outcome() {
        let dir = tempdir().unwrap();
        let mut registry = StatusRegistry::with_dir(dir.path()).unwrap();
        registry.create(JobRecord::new("a.json", 1)).unwrap();
        assert!(registry.ensure_open("1-a").is_ok());

        registry
            .record("1-a", &JobOutcome::Completed { rows: 1, columns: 1 })
            .unwrap();
        assert!(matches!(
            registry.ensure_open("1-a"),
            Err(StatusError::AlreadyFinal { .. })
        ));
    }

    #[test]
    fn test_unreadable_files_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("junk.json"), "not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let registry = StatusRegistry::with_dir(dir.path()).unwrap();
        assert!(registry.list().is_empty());
    }
}
