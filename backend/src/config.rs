//! Job configuration from the environment.
//!
//! | Variable                      | Default     |
//! |-------------------------------|-------------|
//! | `JSONFLAT_DATA_DIR`           | `.jsonflat` |
//! | `JSONFLAT_BATCH_SIZE`         | `2`         |
//! | `JSONFLAT_MAX_PASSES`         | `10000`     |
//! | `JSONFLAT_PARALLEL_THRESHOLD` | `4096`      |
//! | `JSONFLAT_MAP_COLUMNS`        | empty       |
//! | `JSONFLAT_DELIMITER`          | `,`         |
//! | `JSONFLAT_LOG_LEVEL`          | `info`      |
//! | `JSONFLAT_LOG_FORMAT`         | `text`      |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};
use crate::flatten::options::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_PASSES, DEFAULT_PARALLEL_THRESHOLD};
use crate::flatten::FlattenOptions;
use crate::logs::LogFormat;

const DEFAULT_DATA_DIR: &str = ".jsonflat";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Root of the inbox, outbox and job registry.
    pub data_dir: PathBuf,
    pub batch_size: usize,
    pub max_passes: usize,
    pub parallel_threshold: usize,
    pub map_columns: Vec<String>,
    /// CSV field delimiter.
    pub delimiter: u8,
    /// Default `tracing` filter directive.
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            batch_size: DEFAULT_BATCH_SIZE,
            max_passes: DEFAULT_MAX_PASSES,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            map_columns: Vec::new(),
            delimiter: b',',
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl JobConfig {
    /// Load from process environment variables.
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            data_dir: lookup("JSONFLAT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            batch_size: parse_var(&lookup, "JSONFLAT_BATCH_SIZE")?.unwrap_or(defaults.batch_size),
            max_passes: parse_var(&lookup, "JSONFLAT_MAX_PASSES")?.unwrap_or(defaults.max_passes),
            parallel_threshold: parse_var(&lookup, "JSONFLAT_PARALLEL_THRESHOLD")?
                .unwrap_or(defaults.parallel_threshold),
            map_columns: lookup("JSONFLAT_MAP_COLUMNS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            delimiter: match lookup("JSONFLAT_DELIMITER") {
                Some(value) => parse_delimiter("JSONFLAT_DELIMITER", &value)?,
                None => defaults.delimiter,
            },
            log_level: lookup("JSONFLAT_LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: parse_var(&lookup, "JSONFLAT_LOG_FORMAT")?.unwrap_or(defaults.log_format),
        })
    }

    /// Staged input documents.
    pub fn inbox_dir(&self) -> PathBuf {
        self.data_dir.join("inbox")
    }

    /// Root that logical output locations resolve against.
    pub fn outbox_dir(&self) -> PathBuf {
        self.data_dir.join("outbox")
    }

    /// Job status records.
    pub fn jobs_dir(&self) -> PathBuf {
        self.data_dir.join("jobs")
    }

    pub fn flatten_options(&self) -> FlattenOptions {
        FlattenOptions {
            batch_size: self.batch_size,
            max_passes: self.max_passes,
            parallel_threshold: self.parallel_threshold,
            map_columns: self.map_columns.clone(),
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> ConfigResult<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value.trim().parse().map(Some).map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value,
        }),
    }
}

/// A single-byte delimiter; `\t` and `tab` name the tab character.
pub fn parse_delimiter(key: &str, value: &str) -> ConfigResult<u8> {
    match value {
        "\\t" | "tab" => Ok(b'\t'),
        v if v.len() == 1 && v.is_ascii() => Ok(v.as_bytes()[0]),
        _ => Err(ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
