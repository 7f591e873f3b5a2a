//! Ledger Gateway
//!
//! Wraps the raw [`Ledger`] adapter with the send strategy every write uses:
//!
//! 1. **Estimate**: ask the node to simulate the call. If estimation fails
//!    (node cannot simulate), fall back to [`FALLBACK_GAS_LIMIT`] instead of
//!    aborting.
//! 2. **Buffer**: apply a +30 % ceiling, `ceil(estimate * 1.3)`, to absorb
//!    cost fluctuation between estimation and inclusion.
//! 3. **Submit** and block for the receipt. An included-but-reverted receipt
//!    and a rejection message containing "reverted" both become
//!    [`DmedError::TransactionReverted`] with the three canonical causes;
//!    any other submission failure is [`DmedError::TransactionSubmission`]
//!    (outcome indeterminate, never blindly retried).
//!
//! Reads pass through once, with transport failures surfaced as
//! connectivity errors; the event query additionally enriches each entry
//! with the patient's name, best-effort.

use std::sync::Arc;

use dmed_validation::Identity;
use serde::{Deserialize, Serialize};

use crate::error::{DmedError, RevertReport};
use crate::ledger::{Ledger, LedgerError, TxReceipt, WriteCall};
use crate::types::{DoctorProfile, MedicalRecord, PatientProfile, RecordMetadata, Role};

/// Conservative gas ceiling used when the node cannot produce an estimate
pub const FALLBACK_GAS_LIMIT: u64 = 500_000;

/// Placeholder patient name when profile enrichment fails
pub const UNKNOWN_PATIENT: &str = "Unknown Patient";

/// `ceil(estimate * 1.3)` in integer arithmetic
pub fn buffered_gas_limit(estimate: u64) -> u64 {
    estimate.saturating_mul(13).saturating_add(9) / 10
}

/// A past record publication by a doctor, enriched with the patient's name
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessHistoryEntry {
    pub patient: Identity,
    pub record_id: u64,
    pub patient_name: String,
}

/// Shared handle over a ledger adapter; cloning is cheap.
pub struct LedgerGateway<L> {
    ledger: Arc<L>,
}

impl<L> Clone for LedgerGateway<L> {
    fn clone(&self) -> Self {
        LedgerGateway {
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl<L: Ledger> LedgerGateway<L> {
    pub fn new(ledger: L) -> Self {
        LedgerGateway {
            ledger: Arc::new(ledger),
        }
    }

    /// Direct access to the underlying adapter
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    // ---- reads -----------------------------------------------------------

    pub async fn role_of(&self, id: Identity) -> Result<Role, DmedError> {
        self.ledger
            .role_of(id)
            .await
            .map_err(DmedError::ledger_connectivity)
    }

    pub async fn patient_details(&self, id: Identity) -> Result<PatientProfile, DmedError> {
        self.ledger
            .patient_details(id)
            .await
            .map_err(DmedError::ledger_connectivity)
    }

    pub async fn doctor_details(&self, id: Identity) -> Result<DoctorProfile, DmedError> {
        self.ledger
            .doctor_details(id)
            .await
            .map_err(DmedError::ledger_connectivity)
    }

    pub async fn records_count(&self, patient: Identity) -> Result<u64, DmedError> {
        self.ledger
            .records_count(patient)
            .await
            .map_err(DmedError::ledger_connectivity)
    }

    pub async fn patient_record(
        &self,
        patient: Identity,
        index: u64,
    ) -> Result<MedicalRecord, DmedError> {
        self.ledger
            .patient_record(patient, index)
            .await
            .map_err(DmedError::ledger_connectivity)
    }

    pub async fn has_access(&self, patient: Identity, doctor: Identity) -> Result<bool, DmedError> {
        self.ledger
            .has_access(patient, doctor)
            .await
            .map_err(DmedError::ledger_connectivity)
    }

    pub async fn pending_request(
        &self,
        patient: Identity,
        doctor: Identity,
    ) -> Result<bool, DmedError> {
        self.ledger
            .pending_request(patient, doctor)
            .await
            .map_err(DmedError::ledger_connectivity)
    }

    pub async fn access_requests(&self, patient: Identity) -> Result<Vec<Identity>, DmedError> {
        self.ledger
            .access_requests(patient)
            .await
            .map_err(DmedError::ledger_connectivity)
    }

    pub async fn approved_doctors(&self, patient: Identity) -> Result<Vec<Identity>, DmedError> {
        self.ledger
            .approved_doctors(patient)
            .await
            .map_err(DmedError::ledger_connectivity)
    }

    pub async fn all_doctors(&self) -> Result<Vec<Identity>, DmedError> {
        self.ledger
            .all_doctors()
            .await
            .map_err(DmedError::ledger_connectivity)
    }

    /// Past `RecordAdded` events for a doctor, each enriched with the
    /// patient's profile name. Enrichment is best-effort: a failed profile
    /// lookup yields [`UNKNOWN_PATIENT`] rather than aborting the query.
    pub async fn access_history(
        &self,
        doctor: Identity,
    ) -> Result<Vec<AccessHistoryEntry>, DmedError> {
        let events = self
            .ledger
            .record_added_events(doctor)
            .await
            .map_err(DmedError::ledger_connectivity)?;

        let mut entries = Vec::with_capacity(events.len());
        for event in events {
            let patient_name = self
                .ledger
                .patient_details(event.patient)
                .await
                .map(|profile| profile.name)
                .unwrap_or_else(|err| {
                    tracing::debug!(patient = %event.patient, error = %err,
                        "profile enrichment failed, using placeholder");
                    UNKNOWN_PATIENT.to_string()
                });
            entries.push(AccessHistoryEntry {
                patient: event.patient,
                record_id: event.record_id,
                patient_name,
            });
        }
        Ok(entries)
    }

    // ---- writes ----------------------------------------------------------

    /// Two-phase send: estimate (with fallback), buffer, submit, classify.
    pub async fn send(&self, from: Identity, call: WriteCall) -> Result<TxReceipt, DmedError> {
        let estimate = match self.ledger.estimate_gas(from, &call).await {
            Ok(estimate) => estimate,
            Err(err) => {
                tracing::warn!(method = call.method(), error = %err,
                    "gas estimation failed, using fallback limit");
                FALLBACK_GAS_LIMIT
            }
        };
        let gas_limit = buffered_gas_limit(estimate);
        tracing::debug!(method = call.method(), gas_limit, "submitting ledger write");

        match self.ledger.submit(from, &call, gas_limit).await {
            Ok(receipt) if receipt.status => Ok(receipt),
            Ok(receipt) => {
                tracing::warn!(method = call.method(), tx_hash = %receipt.tx_hash,
                    "transaction included but reverted");
                Err(DmedError::TransactionReverted(RevertReport::canonical(
                    "transaction reverted by the ledger",
                )))
            }
            Err(err) => {
                let message = match err {
                    LedgerError::Rejected(msg) => msg,
                    other => other.to_string(),
                };
                if message.contains("reverted") {
                    Err(DmedError::TransactionReverted(RevertReport::canonical(
                        message,
                    )))
                } else {
                    Err(DmedError::TransactionSubmission(message))
                }
            }
        }
    }

    pub async fn register_patient(
        &self,
        from: Identity,
        profile: PatientProfile,
    ) -> Result<TxReceipt, DmedError> {
        self.send(from, WriteCall::RegisterPatient(profile)).await
    }

    pub async fn register_doctor(
        &self,
        from: Identity,
        profile: DoctorProfile,
    ) -> Result<TxReceipt, DmedError> {
        self.send(from, WriteCall::RegisterDoctor(profile)).await
    }

    pub async fn request_access(
        &self,
        from: Identity,
        patient: Identity,
    ) -> Result<TxReceipt, DmedError> {
        self.send(from, WriteCall::RequestAccess { patient }).await
    }

    pub async fn grant_access(
        &self,
        from: Identity,
        doctor: Identity,
    ) -> Result<TxReceipt, DmedError> {
        self.send(from, WriteCall::GrantAccess { doctor }).await
    }

    pub async fn revoke_access(
        &self,
        from: Identity,
        doctor: Identity,
    ) -> Result<TxReceipt, DmedError> {
        self.send(from, WriteCall::RevokeAccess { doctor }).await
    }

    pub async fn reject_request(
        &self,
        from: Identity,
        doctor: Identity,
    ) -> Result<TxReceipt, DmedError> {
        self.send(from, WriteCall::RejectRequest { doctor }).await
    }

    pub async fn add_medical_record(
        &self,
        from: Identity,
        patient: Identity,
        metadata: &RecordMetadata,
        locator: String,
    ) -> Result<TxReceipt, DmedError> {
        self.send(
            from,
            WriteCall::AddMedicalRecord {
                patient,
                doctor_name: metadata.doctor_name.clone(),
                reason: metadata.reason.clone(),
                date: metadata.date.clone(),
                locator,
            },
        )
        .await
    }
}
