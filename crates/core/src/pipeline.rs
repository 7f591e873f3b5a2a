//! Record Publication Pipeline
//!
//! Turns a batch of already-uploaded files into ledger records, one write
//! per file. Order of checks:
//!
//! 1. Parse the target patient address and confirm the session may publish.
//! 2. Validate the shared metadata and require a non-empty batch.
//! 3. Re-verify the access grant against the ledger, even if the client
//!    checked earlier. Grants can be revoked between upload and publish.
//! 4. Seal every stored object's retrieval URL into a locator. Sealing is a
//!    precondition too: it finishes before the first ledger write, so a
//!    sealing failure never leaves a partially written batch.
//! 5. Write the records sequentially; the first failed write aborts the
//!    remainder and reports how many records already landed.
//!
//! On full success the batch is cleared so the same files cannot be
//! published twice by accident.

use crate::config::LocatorConfig;
use crate::error::DmedError;
use crate::gateway::LedgerGateway;
use crate::ledger::Ledger;
use crate::session::SessionContext;
use crate::types::RecordMetadata;
use crate::upload::UploadBatch;
use dmed_locator_codec::encode_locator;
use dmed_validation::Identity;

/// Result of a fully successful publication
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicationOutcome {
    pub written: usize,
    pub total: usize,
}

/// Error type for publication
#[derive(Debug, thiserror::Error)]
pub enum PublicationError {
    /// A write failed mid-batch; `written` records are already on the
    /// ledger and will not be retried automatically
    #[error("publication aborted after {written} of {total} records: {source}")]
    Aborted {
        written: usize,
        total: usize,
        #[source]
        source: DmedError,
    },
    /// A precondition failed before any ledger write
    #[error(transparent)]
    Precondition(#[from] DmedError),
}

/// Publishes an upload batch as ledger records
pub struct PublicationPipeline<L> {
    gateway: LedgerGateway<L>,
    locator: LocatorConfig,
}

impl<L: Ledger> PublicationPipeline<L> {
    pub fn new(gateway: LedgerGateway<L>, locator: LocatorConfig) -> Self {
        PublicationPipeline { gateway, locator }
    }

    /// Publish every stored object in the batch as a record for
    /// `patient_address`, applying `metadata` uniformly.
    pub async fn publish(
        &self,
        session: &SessionContext,
        patient_address: &str,
        metadata: &RecordMetadata,
        batch: &mut UploadBatch,
    ) -> Result<PublicationOutcome, PublicationError> {
        let patient: Identity = patient_address
            .parse()
            .map_err(DmedError::from)
            .map_err(PublicationError::Precondition)?;
        if !session.can_publish() {
            return Err(DmedError::AccessDenied(
                "only a registered doctor can publish records".to_string(),
            )
            .into());
        }

        metadata.validate().map_err(DmedError::from)?;
        if batch.is_empty() {
            return Err(DmedError::Validation(
                "no uploaded files to publish".to_string(),
            )
            .into());
        }

        // Grants can be revoked at any time; re-check at the moment of use.
        let granted = self.gateway.has_access(patient, session.identity).await?;
        if !granted {
            return Err(DmedError::AccessDenied(format!(
                "no access grant from patient {}",
                patient.short()
            ))
            .into());
        }

        let total = batch.len();
        let mut sealed = Vec::with_capacity(total);
        for object in batch.stored() {
            let url = self
                .locator
                .gateway_base
                .retrieval_url(object.content_id.as_str());
            let locator = encode_locator(&url, &self.locator.key)
                .map_err(|err| DmedError::Validation(err.to_string()))
                .map_err(PublicationError::Precondition)?;
            sealed.push((object.file_name.clone(), locator));
        }

        let mut written = 0usize;
        for (file_name, locator) in sealed {
            if let Err(err) = self
                .gateway
                .add_medical_record(session.identity, patient, metadata, locator)
                .await
            {
                tracing::warn!(file = %file_name, written, total, error = %err,
                    "record write failed, aborting batch");
                return Err(PublicationError::Aborted {
                    written,
                    total,
                    source: err,
                });
            }
            written += 1;
        }

        batch.clear();
        tracing::info!(patient = %patient, written, "publication complete");
        Ok(PublicationOutcome { written, total })
    }
}
