//! Storage Upload Orchestrator
//!
//! Uploads a batch of files to the primary backend, falling back per-file to
//! the secondary backend, and aggregates per-file progress and per-batch
//! completion.
//!
//! Policy:
//!
//! - Every file is validated (MIME type, size) before ANY network call; a
//!   violation fails the whole batch fast, naming the offending file.
//! - Files upload concurrently with an all-settled join: one file failing
//!   both backends never aborts its siblings.
//! - The outcome is the union of successes and failures; the caller decides
//!   whether partial success is acceptable ([`BatchOutcome::require_complete`]
//!   is the strict form the publication pipeline uses).
//!
//! Files are identified by name. Duplicate names within one batch are not
//! rejected; the later entry overwrites the earlier one's progress, matching
//! the deployed behavior (see `UploadBatch`).

use dmed_validation::validate_file;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::mpsc;

use crate::error::DmedError;
use crate::storage::{ContentId, FileSource, ProgressEvent, ProgressReporter, StorageBackend, StorageError};

/// Capacity of the progress event channel
const PROGRESS_CHANNEL_CAPACITY: usize = 64;

/// Which backend ended up storing an object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendUsed {
    Primary,
    Fallback,
}

/// A successfully stored file
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub file_name: String,
    pub content_id: ContentId,
    pub backend: BackendUsed,
}

/// A file both backends failed to store
#[derive(Debug)]
pub struct FailedUpload {
    pub file_name: String,
    pub primary: StorageError,
    pub fallback: StorageError,
}

/// Union of per-file results for one batch
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub stored: Vec<StoredObject>,
    pub failed: Vec<FailedUpload>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Demand full-batch success, as the publication pipeline does before
    /// any ledger write
    pub fn require_complete(self) -> Result<Vec<StoredObject>, DmedError> {
        match self.failed.first() {
            None => Ok(self.stored),
            Some(first) => Err(DmedError::Upload {
                file_name: first.file_name.clone(),
                primary: first.primary.to_string(),
                fallback: first.fallback.to_string(),
            }),
        }
    }
}

/// Uploads batches through a primary backend with a per-file fallback
pub struct UploadOrchestrator<P, F> {
    primary: P,
    fallback: F,
    progress_tx: mpsc::Sender<ProgressEvent>,
}

impl<P: StorageBackend, F: StorageBackend> UploadOrchestrator<P, F> {
    /// Build the orchestrator and the progress stream its uploads feed
    pub fn new(primary: P, fallback: F) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
        (
            UploadOrchestrator {
                primary,
                fallback,
                progress_tx,
            },
            progress_rx,
        )
    }

    /// Validate then upload a batch of files concurrently.
    ///
    /// Returns `Err` only for validation failures (before any upload); once
    /// uploads start, per-file failures are collected in the outcome.
    pub async fn upload_batch(&self, files: Vec<FileSource>) -> Result<BatchOutcome, DmedError> {
        for file in &files {
            validate_file(&file.name, &file.mime, file.size())?;
        }

        let uploads = files.into_iter().map(|file| self.upload_one(file));
        let results = join_all(uploads).await;

        let mut outcome = BatchOutcome::default();
        for result in results {
            match result {
                Ok(stored) => outcome.stored.push(stored),
                Err(failed) => outcome.failed.push(failed),
            }
        }
        tracing::info!(
            stored = outcome.stored.len(),
            failed = outcome.failed.len(),
            "upload batch settled"
        );
        Ok(outcome)
    }

    async fn upload_one(&self, file: FileSource) -> Result<StoredObject, FailedUpload> {
        let mut progress = ProgressReporter::new(file.name.clone(), self.progress_tx.clone());

        match self.primary.upload(&file, &mut progress).await {
            Ok(content_id) => {
                progress.complete().await;
                Ok(StoredObject {
                    file_name: file.name,
                    content_id,
                    backend: BackendUsed::Primary,
                })
            }
            Err(primary_err) => {
                tracing::warn!(file = %file.name, backend = self.primary.name(), error = %primary_err,
                    "primary storage backend failed, trying fallback");
                match self.fallback.upload(&file, &mut progress).await {
                    Ok(content_id) => {
                        progress.complete().await;
                        Ok(StoredObject {
                            file_name: file.name,
                            content_id,
                            backend: BackendUsed::Fallback,
                        })
                    }
                    Err(fallback_err) => {
                        tracing::warn!(file = %file.name, backend = self.fallback.name(), error = %fallback_err,
                            "fallback storage backend failed");
                        Err(FailedUpload {
                            file_name: file.name,
                            primary: primary_err,
                            fallback: fallback_err,
                        })
                    }
                }
            }
        }
    }
}

/// Client-session aggregate of one publication workflow's stored objects and
/// per-file progress. Exists only until the records are written or the batch
/// is abandoned.
///
/// Progress entries are keyed by file name; duplicate names within one batch
/// overwrite each other (last write wins), matching the deployed behavior.
#[derive(Debug, Default)]
pub struct UploadBatch {
    stored: Vec<StoredObject>,
    progress: HashMap<String, u8>,
}

impl UploadBatch {
    pub fn new() -> Self {
        UploadBatch::default()
    }

    /// Absorb an upload outcome's successes
    pub fn absorb(&mut self, outcome: &BatchOutcome) {
        self.stored.extend(outcome.stored.iter().cloned());
    }

    pub fn push(&mut self, object: StoredObject) {
        self.stored.push(object);
    }

    /// Track a progress event (last write wins per file name)
    pub fn observe_progress(&mut self, event: &ProgressEvent) {
        self.progress.insert(event.file_name.clone(), event.percent);
    }

    pub fn progress_of(&self, file_name: &str) -> Option<u8> {
        self.progress.get(file_name).copied()
    }

    /// Remove one stored object by file name; returns whether anything was removed
    pub fn remove(&mut self, file_name: &str) -> bool {
        let before = self.stored.len();
        self.stored.retain(|object| object.file_name != file_name);
        self.progress.remove(file_name);
        self.stored.len() != before
    }

    pub fn stored(&self) -> &[StoredObject] {
        &self.stored
    }

    pub fn len(&self) -> usize {
        self.stored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stored.is_empty()
    }

    pub fn clear(&mut self) {
        self.stored.clear();
        self.progress.clear();
    }
}
