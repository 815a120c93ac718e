//! Storage collaborator: append-only hand-off of produced records.
//!
//! Every summary and detail record is pushed as it is produced; the merge
//! stage later reads the accumulated sets back from the same sink.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::types::{DetailRecord, SearchSummary};

#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn push_summary(&self, summary: &SearchSummary) -> Result<()>;
    async fn push_detail(&self, detail: &DetailRecord) -> Result<()>;
    async fn summaries(&self) -> Result<Vec<SearchSummary>>;
    async fn details(&self) -> Result<Vec<DetailRecord>>;
}

/// In-memory sink, also the test double.
#[derive(Default)]
pub struct MemorySink {
    summaries: Mutex<Vec<SearchSummary>>,
    details: Mutex<Vec<DetailRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn push_summary(&self, summary: &SearchSummary) -> Result<()> {
        self.summaries.lock().unwrap().push(summary.clone());
        Ok(())
    }

    async fn push_detail(&self, detail: &DetailRecord) -> Result<()> {
        self.details.lock().unwrap().push(detail.clone());
        Ok(())
    }

    async fn summaries(&self) -> Result<Vec<SearchSummary>> {
        Ok(self.summaries.lock().unwrap().clone())
    }

    async fn details(&self) -> Result<Vec<DetailRecord>> {
        Ok(self.details.lock().unwrap().clone())
    }
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum SinkLine<'a> {
    Summary(&'a SearchSummary),
    Detail(&'a DetailRecord),
}

/// Appends one JSON object per record to a file, keeping an in-memory
/// mirror for the merge stage's read-back.
pub struct JsonLinesSink {
    file: tokio::sync::Mutex<tokio::fs::File>,
    mirror: MemorySink,
}

impl JsonLinesSink {
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .await
            .with_context(|| format!("failed to open sink file {}", path.as_ref().display()))?;
        Ok(Self {
            file: tokio::sync::Mutex::new(file),
            mirror: MemorySink::new(),
        })
    }

    async fn write_line(&self, line: SinkLine<'_>) -> Result<()> {
        let mut json = serde_json::to_string(&line).context("failed to serialize record")?;
        json.push('\n');
        let mut file = self.file.lock().await;
        file.write_all(json.as_bytes())
            .await
            .context("failed to append record")?;
        Ok(())
    }
}

#[async_trait]
impl RecordSink for JsonLinesSink {
    async fn push_summary(&self, summary: &SearchSummary) -> Result<()> {
        self.write_line(SinkLine::Summary(summary)).await?;
        self.mirror.push_summary(summary).await
    }

    async fn push_detail(&self, detail: &DetailRecord) -> Result<()> {
        self.write_line(SinkLine::Detail(detail)).await?;
        self.mirror.push_detail(detail).await
    }

    async fn summaries(&self) -> Result<Vec<SearchSummary>> {
        self.mirror.summaries().await
    }

    async fn details(&self) -> Result<Vec<DetailRecord>> {
        self.mirror.details().await
    }
}
