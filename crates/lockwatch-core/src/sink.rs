//! Alert sinks.

use std::path::PathBuf;

use tokio::io::AsyncWriteExt;

use crate::error::{Result, SinkError};

/// Destination for rendered alert reports.
#[allow(async_fn_in_trait)]
pub trait AlertSink {
    /// Deliver one rendered report. No buffering, no retry.
    async fn deliver(&mut self, report: &str) -> Result<()>;

    /// Human-readable destination name for logs.
    fn describe(&self) -> String;
}

/// Appends each report to a file, opening and closing it per alert so the
/// process holds no descriptor between cycles.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AlertSink for FileSink {
    async fn deliver(&mut self, report: &str) -> Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|source| SinkError::Open {
                path: self.path.clone(),
                source,
            })?;

        let mut block = String::with_capacity(report.len() + 2);
        block.push_str(report);
        if !block.ends_with('\n') {
            block.push('\n');
        }
        block.push('\n');

        let write_err = |source| SinkError::Write {
            path: self.path.clone(),
            source,
        };
        file.write_all(block.as_bytes()).await.map_err(write_err)?;
        file.flush().await.map_err(write_err)?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
