//! Snapshot capture for building test fixtures from real pages.
//!
//! Off unless `JOB_SCOUT_CAPTURE_FIXTURES` is set; never used in
//! production runs.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dom::ax::AccessibilityNode;
use crate::error::{BrowserError, Result};

/// Environment variable that turns capture on (`1` or `true`)
pub const CAPTURE_ENV: &str = "JOB_SCOUT_CAPTURE_FIXTURES";

/// Where [`SnapshotRecorder::flush_default`] writes
pub const FIXTURE_PATH: &str = "tests/fixtures/accessibility_snapshots.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotRecord {
    pub url: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    /// Nodes as they were after filtering
    pub nodes: Vec<AccessibilityNode>,
}

#[derive(Debug, Default)]
pub struct SnapshotRecorder {
    records: Mutex<Vec<SnapshotRecord>>,
}

impl SnapshotRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder if capture is switched on in the environment
    pub fn from_env() -> Option<Self> {
        let value = std::env::var(CAPTURE_ENV).ok()?;
        capture_enabled(&value).then(Self::new)
    }

    pub fn record(
        &self,
        url: impl Into<String>,
        title: impl Into<String>,
        nodes: Vec<AccessibilityNode>,
    ) {
        let record = SnapshotRecord {
            url: url.into(),
            title: title.into(),
            timestamp: Utc::now(),
            nodes,
        };
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(e) => log::warn!("Snapshot recorder lock poisoned: {}", e),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write every captured snapshot as one JSON array and clear the buffer.
    /// Returns how many records were written.
    pub async fn flush(&self, path: impl AsRef<Path>) -> Result<usize> {
        let records = {
            let mut guard = self.records.lock().map_err(|e| {
                BrowserError::Config(format!("Snapshot recorder lock poisoned: {}", e))
            })?;
            std::mem::take(&mut *guard)
        };

        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&records)?;
        tokio::fs::write(path, json).await?;

        log::info!("Wrote {} snapshot fixtures to {}", records.len(), path.display());
        Ok(records.len())
    }

    pub async fn flush_default(&self) -> Result<usize> {
        self.flush(FIXTURE_PATH).await
    }
}

fn capture_enabled(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}
