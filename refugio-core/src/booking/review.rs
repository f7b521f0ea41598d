//! Manual-review queue for payments that could not become reservations.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::{RefugioError, RefugioResult};
use crate::interval::DateInterval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewReason {
    /// Paid, but the dates were taken by the time the payment cleared.
    DateConflict,
    /// Paid, but the metadata did not describe a bookable stay.
    Unprocessable,
}

/// A captured payment with no reservation behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub payment_id: String,
    pub amount: f64,
    pub reason: ReviewReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<DateInterval>,
    #[serde(default)]
    pub conflicting_ids: Vec<String>,
    pub detail: String,
    pub flagged_at: DateTime<Utc>,
}

#[async_trait]
pub trait ReviewQueue: Send + Sync {
    async fn flag(&self, entry: ReviewEntry) -> RefugioResult<()>;

    async fn entries(&self) -> RefugioResult<Vec<ReviewEntry>>;

    async fn contains(&self, payment_id: &str) -> RefugioResult<bool> {
        Ok(self.entries().await?.iter().any(|e| e.payment_id == payment_id))
    }
}

/// Appends one JSON object per line to a local file.
#[derive(Debug, Clone)]
pub struct JsonlReviewQueue {
    path: PathBuf,
}

impl JsonlReviewQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonlReviewQueue { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReviewQueue for JsonlReviewQueue {
    async fn flag(&self, entry: ReviewEntry) -> RefugioResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut line = serde_json::to_string(&entry)
            .map_err(|e| RefugioError::Serialization(e.to_string()))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn entries(&self) -> RefugioResult<Vec<ReviewEntry>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| {
                serde_json::from_str(l).map_err(|e| RefugioError::Serialization(e.to_string()))
            })
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct MemoryReviewQueue {
    entries: Mutex<Vec<ReviewEntry>>,
}

impl MemoryReviewQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReviewQueue for MemoryReviewQueue {
    async fn flag(&self, entry: ReviewEntry) -> RefugioResult<()> {
        self.entries
            .lock()
            .map_err(|_| RefugioError::Store("review queue lock poisoned".into()))?
            .push(entry);
        Ok(())
    }

    async fn entries(&self) -> RefugioResult<Vec<ReviewEntry>> {
        Ok(self
            .entries
            .lock()
            .map_err(|_| RefugioError::Store("review queue lock poisoned".into()))?
            .clone())
    }
}
