//! Record sinks: where collected records go.
//!
//! The sweep hands every successful record to a [`RecordSink`] in batch order.
//! Sinks are append-only and at-least-once; nothing here deduplicates or
//! orders records across batches.

use crate::config::SinkConfig;
use crate::error::SinkError;
use crate::types::Record;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, mpsc};

/// Destination for collected records
#[async_trait::async_trait]
pub trait RecordSink: Send + Sync {
    /// Persist one record
    ///
    /// Returns only once the record is in durable storage or with the consumer.
    async fn append(&self, record: &Record) -> Result<(), SinkError>;
}

/// Appends records as JSON lines to a file
///
/// Each call writes one line and flushes it; with `fsync` enabled the file
/// data is also synced to disk before returning.
pub struct JsonlFileSink {
    path: PathBuf,
    file: Mutex<tokio::fs::File>,
    fsync: bool,
}

impl JsonlFileSink {
    /// Open (or create) `path` in append mode
    pub async fn open(path: impl AsRef<Path>, fsync: bool) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        tracing::debug!(path = %path.display(), fsync, "Opened JSONL sink");

        Ok(Self {
            path,
            file: Mutex::new(file),
            fsync,
        })
    }

    /// Open the sink described by a [`SinkConfig`]
    pub async fn from_config(config: &SinkConfig) -> Result<Self, SinkError> {
        Self::open(&config.path, config.fsync).await
    }

    /// Output file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl RecordSink for JsonlFileSink {
    async fn append(&self, record: &Record) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(record).map_err(|source| SinkError::Encode {
            id: record.id,
            source,
        })?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        if self.fsync {
            file.sync_data().await?;
        }
        Ok(())
    }
}

/// Forwards records to an in-process consumer over a bounded channel
///
/// `append` waits for channel capacity, so a slow consumer applies
/// backpressure to the sweep instead of losing records.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Record>,
}

impl ChannelSink {
    /// Create a sink and the receiving end for its records
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Record>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait::async_trait]
impl RecordSink for ChannelSink {
    async fn append(&self, record: &Record) -> Result<(), SinkError> {
        self.tx
            .send(record.clone())
            .await
            .map_err(|_| SinkError::Closed("record receiver dropped".to_string()))
    }
}
