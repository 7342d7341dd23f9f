//! Input document supply.
//!
//! A job's input is one JSON document: either an array of objects (one row
//! each) or a single object (one row). [`DocumentSource`] hides where the
//! document lives; [`FsDocumentSource`] reads it from an inbox directory.

use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::error::{IngressError, IngressResult};

/// Supplies the parsed input document of a job.
pub trait DocumentSource {
    fn fetch(&self, job_id: &str) -> IngressResult<Value>;
}

/// Documents stored as `<inbox>/<job_id>.json`.
#[derive(Debug, Clone)]
pub struct FsDocumentSource {
    inbox: PathBuf,
}

impl FsDocumentSource {
    pub fn new(inbox: impl AsRef<Path>) -> Self {
        Self {
            inbox: inbox.as_ref().to_path_buf(),
        }
    }

    /// Path of the document for `job_id`.
    ///
    /// A job id is a single plain file-name component.
    pub fn document_path(&self, job_id: &str) -> IngressResult<PathBuf> {
        let mut components = Path::new(job_id).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name == job_id => {
                Ok(self.inbox.join(format!("{job_id}.json")))
            }
            _ => Err(IngressError::InvalidJobId(job_id.to_string())),
        }
    }

    /// Store `bytes` as the document for `job_id`, after checking they parse.
    pub fn stage(&self, job_id: &str, bytes: &[u8]) -> IngressResult<PathBuf> {
        parse_document(bytes)?;
        fs::create_dir_all(&self.inbox)?;
        let path = self.document_path(job_id)?;
        fs::write(&path, bytes)?;
        Ok(path)
    }
}

impl DocumentSource for FsDocumentSource {
    fn fetch(&self, job_id: &str) -> IngressResult<Value> {
        let path = self.document_path(job_id)?;
        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => IngressError::NotFound(job_id.to_string()),
            _ => IngressError::Io(e),
        })?;
        parse_document(&bytes)
    }
}

/// Parse a JSON document, reporting the JSON path of a syntax error.
pub fn parse_document(bytes: &[u8]) -> IngressResult<Value> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    let value: Value = serde_path_to_error::deserialize(&mut de).map_err(|err| {
        let path = err.path().to_string();
        IngressError::Json(format!("at JSON path {path}: {}", err.into_inner()))
    })?;
    de.end()
        .map_err(|err| IngressError::Json(format!("after document: {err}")))?;
    Ok(value)
}

/// Split a document into row objects.
pub fn document_to_records(document: Value) -> IngressResult<Vec<Map<String, Value>>> {
    match document {
        Value::Object(record) => Ok(vec![record]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| match item {
                Value::Object(record) => Ok(record),
                other => Err(IngressError::NotTabular(format!(
                    "element {idx} is {}, expected an object",
                    describe(&other)
                ))),
            })
            .collect(),
        other => Err(IngressError::NotTabular(format!(
            "top-level value is {}, expected an object or an array of objects",
            describe(&other)
        ))),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_fetch_staged_document() {
        let dir = tempdir().unwrap();
        let source = FsDocumentSource::new(dir.path().join("inbox"));
        source.stage("1-orders", br#"[{"id": 1}]"#).unwrap();

        let doc = source.fetch("1-orders").unwrap();
        assert_eq!(doc, json!([{"id": 1}]));
    }

    #[test]
    fn test_fetch_missing_document() {
        let dir = tempdir().unwrap();
        let source = FsDocumentSource::new(dir.path());
        let err = source.fetch("nope").unwrap_err();
        assert!(matches!(err, IngressError::NotFound(id) if id == "nope"));
    }

    #[test]
    fn test_stage_rejects_invalid_json() {
        let dir = tempdir().unwrap();
        let source = FsDocumentSource::new(dir.path());
        assert!(source.stage("bad", b"{\"a\": ").is_err());
        assert!(!source.document_path("bad").unwrap().exists());
    }

    #[test]
    fn test_job_id_must_stay_inside_inbox() {
        let dir = tempdir().unwrap();
        let inbox = dir.path().join("inbox");
        fs::create_dir_all(&inbox).unwrap();
        fs::write(dir.path().join("secret.json"), "[]").unwrap();
        let source = FsDocumentSource::new(&inbox);

        for job_id in ["../secret", "a/b", "/etc/passwd", "", "."] {
            assert!(
                matches!(source.fetch(job_id), Err(IngressError::InvalidJobId(_))),
                "{job_id}"
            );
        }
        assert!(matches!(
            source.stage("../escape", b"[]"),
            Err(IngressError::InvalidJobId(_))
        ));
        assert!(!dir.path().join("escape.json").exists());
        assert!(source.document_path("1700000000000-orders").is_ok());
    }

    #[test]
    fn test_parse_error_names_path() {
        let err = parse_document(br#"{"rows": [1, 2,]}"#).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("rows"), "{msg}");
    }

    #[test]
    fn test_trailing_data_rejected() {
        assert!(parse_document(br#"{"a": 1} {"b": 2}"#).is_err());
    }

    #[test]
    fn test_document_to_records() {
        let rows = document_to_records(json!([{"a": 1}, {"b": 2}])).unwrap();
        assert_eq!(rows.len(), 2);

        let rows = document_to_records(json!({"a": 1})).unwrap();
        assert_eq!(rows.len(), 1);

        assert!(document_to_records(json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_non_tabular_documents() {
        assert!(matches!(
            document_to_records(json!(42)),
            Err(IngressError::NotTabular(_))
        ));
        let err = document_to_records(json!([{"a": 1}, "x"])).unwrap_err();
        assert!(err.to_string().contains("element 1 is a string"));
    }
}
