//! Record Retrieval Sequencer
//!
//! Access-gated count-then-index fetching. The patient always reads their
//! own records; anyone else needs a live ledger grant, checked before any
//! record data is fetched. Records come back in ascending index order, the
//! order they were published.

use dmed_locator_codec::{decode_locator, DecodedLocator};
use dmed_validation::Identity;

use crate::config::LocatorConfig;
use crate::error::DmedError;
use crate::gateway::LedgerGateway;
use crate::ledger::Ledger;

/// A fetched record with its locator decoded for presentation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetrievedRecord {
    /// Ledger index of the record within the patient's list
    pub index: u64,
    pub doctor_name: String,
    pub reason: String,
    pub date: String,
    pub locator: DecodedLocator,
}

/// Fetches a patient's records on behalf of a requester
pub struct RecordRetriever<L> {
    gateway: LedgerGateway<L>,
    locator: LocatorConfig,
}

impl<L: Ledger> RecordRetriever<L> {
    pub fn new(gateway: LedgerGateway<L>, locator: LocatorConfig) -> Self {
        RecordRetriever { gateway, locator }
    }

    /// Fetch all of `patient`'s records for `requester`.
    ///
    /// Self-access never consults the grant table. For anyone else the
    /// grant is checked first, and on denial nothing is fetched.
    pub async fn fetch_records(
        &self,
        patient: Identity,
        requester: Identity,
    ) -> Result<Vec<RetrievedRecord>, DmedError> {
        if requester != patient {
            let granted = self.gateway.has_access(patient, requester).await?;
            if !granted {
                return Err(DmedError::AccessDenied(format!(
                    "no access grant from patient {}",
                    patient.short()
                )));
            }
        }

        let count = self.gateway.records_count(patient).await?;
        let mut records = Vec::with_capacity(count as usize);
        for index in 0..count {
            let record = self.gateway.patient_record(patient, index).await?;
            let locator = decode_locator(
                &record.locator,
                &self.locator.key,
                &self.locator.gateway_base,
            );
            if locator.is_fallback() {
                tracing::debug!(patient = %patient, index, "locator opened via gateway fallback");
            }
            records.push(RetrievedRecord {
                index,
                doctor_name: record.doctor_name,
                reason: record.reason,
                date: record.date,
                locator,
            });
        }
        tracing::debug!(patient = %patient, count, "records fetched");
        Ok(records)
    }
}
