//! FileSink - appends reports to a JSON-lines file

use contracts::{ContractError, Estimate};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::debug;

use crate::sinks::EstimateSink;

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file path
    pub path: PathBuf,

    /// Append to an existing file instead of truncating
    pub append: bool,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./error_estimates.jsonl"));

        let append = params.get("append").map(|v| v == "true").unwrap_or(true);

        Self { path, append }
    }
}

/// Sink that writes one wire report per line as JSON.
pub struct FileSink {
    name: String,
    writer: BufWriter<File>,
    path: PathBuf,
}

impl FileSink {
    /// Create a new FileSink
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(config.append)
            .truncate(!config.append)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            writer: BufWriter::new(file),
            path: config.path,
        })
    }

    /// Create from params map (for the factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        Self::new(name, FileSinkConfig::from_params(params))
    }
}

impl EstimateSink for FileSink {
    async fn write(&mut self, estimate: &Estimate) -> Result<(), ContractError> {
        serde_json::to_writer(&mut self.writer, &estimate.report)
            .map_err(|e| ContractError::sink(&self.name, e.to_string()))?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| ContractError::sink(&self.name, e.to_string()))?;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ContractError> {
        self.writer
            .flush()
            .map_err(|e| ContractError::sink(&self.name, e.to_string()))?;
        debug!(sink = %self.name, path = %self.path.display(), "file sink closed");
        Ok(())
    }
}
