//! Content-Addressable Storage Backends
//!
//! A backend takes file bytes and returns a backend-assigned content
//! identifier. The primary backend streams progress as it uploads; the
//! secondary is a plain bearer-token-authenticated multipart POST used as a
//! one-shot fallback when the primary fails.
//!
//! Progress reporting is a bounded channel of `{file name, percent}` events
//! with the uploader as sole producer. Per-file percentages are clamped to
//! 0–100 and strictly monotonic: a stale or repeated percentage is dropped
//! at the reporter, so consumers never observe progress moving backwards.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// Error type for storage backend operations
#[derive(Clone, Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend could not be reached
    #[error("storage unreachable: {0}")]
    Unreachable(String),
    /// The backend answered but the upload failed
    #[error("storage backend error: {0}")]
    Backend(String),
    /// The backend reported success without a content identifier
    #[error("storage backend returned no content identifier")]
    MissingContentId,
}

/// Backend-assigned content address of an uploaded object
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        ContentId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An in-memory file selected for publication
#[derive(Clone, Debug)]
pub struct FileSource {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl FileSource {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        FileSource {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// One progress observation for one file
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub file_name: String,
    pub percent: u8,
}

/// Per-file progress producer handed to a backend during upload.
///
/// Enforces the monotonicity contract: percentages are clamped to 100 and
/// only forwarded when they increase. If the consumer has stopped listening
/// the event is dropped; the upload itself runs to completion regardless.
pub struct ProgressReporter {
    file_name: String,
    last_percent: Option<u8>,
    tx: mpsc::Sender<ProgressEvent>,
}

impl ProgressReporter {
    pub fn new(file_name: impl Into<String>, tx: mpsc::Sender<ProgressEvent>) -> Self {
        ProgressReporter {
            file_name: file_name.into(),
            last_percent: None,
            tx,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Report uploaded/total byte counts as a percentage
    pub async fn report_bytes(&mut self, uploaded: u64, total: u64) {
        let percent = if total == 0 {
            100
        } else {
            (uploaded.saturating_mul(100) / total).min(100) as u8
        };
        self.report_percent(percent).await;
    }

    pub async fn report_percent(&mut self, percent: u8) {
        let percent = percent.min(100);
        if self.last_percent.is_some_and(|last| percent <= last) {
            return;
        }
        self.last_percent = Some(percent);
        let event = ProgressEvent {
            file_name: self.file_name.clone(),
            percent,
        };
        if self.tx.send(event).await.is_err() {
            tracing::debug!(file = %self.file_name, "progress receiver dropped");
        }
    }

    pub async fn complete(&mut self) {
        self.report_percent(100).await;
    }
}

/// A content-addressable storage backend
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Upload one file, streaming progress, and return its content id
    async fn upload(
        &self,
        file: &FileSource,
        progress: &mut ProgressReporter,
    ) -> Result<ContentId, StorageError>;
}

/// Default endpoint of the plain multipart fallback node
pub const DEFAULT_FALLBACK_ENDPOINT: &str = "https://node.lighthouse.storage/api/v0/add";

/// The secondary backend: one bearer-token-authenticated multipart POST.
///
/// No streaming progress is available on this path; completion is reported
/// as a single 100 % event once the node has answered.
pub struct MultipartBackend {
    endpoint: String,
    token: String,
    client: reqwest::Client,
}

impl MultipartBackend {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        MultipartBackend {
            endpoint: endpoint.into(),
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: Option<String>,
}

#[async_trait]
impl StorageBackend for MultipartBackend {
    fn name(&self) -> &'static str {
        "multipart"
    }

    async fn upload(
        &self,
        file: &FileSource,
        progress: &mut ProgressReporter,
    ) -> Result<ContentId, StorageError> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime)
            .map_err(|err| StorageError::Backend(err.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|err| StorageError::Unreachable(err.to_string()))?
            .error_for_status()
            .map_err(|err| StorageError::Backend(err.to_string()))?;

        let body: AddResponse = response
            .json()
            .await
            .map_err(|err| StorageError::Backend(err.to_string()))?;
        let hash = body.hash.ok_or(StorageError::MissingContentId)?;

        progress.complete().await;
        Ok(ContentId::new(hash))
    }
}
