//! # Receipt Log
//!
//! Append-only record of accepted notifications, one url-encoded parameter
//! set per line.

use pay_core::{ParameterSet, PaymentError, PaymentResult};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Default receipt file, relative to the working directory
pub const DEFAULT_RECEIPT_PATH: &str = "notify.txt";

#[derive(Debug, Clone)]
pub struct ReceiptStore {
    path: PathBuf,
}

impl ReceiptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `params` as a single line.
    ///
    /// The line is written with one `write_all` on a file opened in append
    /// mode, so concurrent notifications never interleave within a line.
    pub async fn append(&self, params: &ParameterSet) -> PaymentResult<()> {
        let mut line = params.to_form_encoded();
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                PaymentError::Internal(format!("Failed to open {}: {}", self.path.display(), e))
            })?;

        file.write_all(line.as_bytes()).await.map_err(|e| {
            PaymentError::Internal(format!("Failed to write {}: {}", self.path.display(), e))
        })?;
        file.flush()
            .await
            .map_err(|e| PaymentError::Internal(e.to_string()))?;

        debug!("Receipt appended to {}", self.path.display());
        Ok(())
    }
}

impl Default for ReceiptStore {
    fn default() -> Self {
        Self::new(DEFAULT_RECEIPT_PATH)
    }
}
