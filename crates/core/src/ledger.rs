//! External Ledger Surface
//!
//! The ledger (the deployed records contract) is an external collaborator.
//! This module defines the exact operation set the core consumes: simple
//! request/response reads, plus a write side split into gas estimation and
//! submission so the gateway can apply its buffering strategy.
//!
//! Implementations are transport adapters (an RPC client in production, an
//! in-memory contract emulation in tests). They must not retry: the retry
//! and fallback policy lives entirely in [`crate::gateway`].

use async_trait::async_trait;
use dmed_validation::Identity;
use serde::{Deserialize, Serialize};

use crate::types::{DoctorProfile, MedicalRecord, PatientProfile, RecordAddedEvent, Role};

/// Transport-level error from a ledger adapter
#[derive(Clone, Debug, thiserror::Error)]
pub enum LedgerError {
    /// The node could not be reached at all
    #[error("ledger unreachable: {0}")]
    Unreachable(String),
    /// A read call failed
    #[error("ledger call failed: {0}")]
    Call(String),
    /// The node rejected a submitted transaction; the message is the node's
    /// own wording and is pattern-matched by the gateway
    #[error("transaction rejected: {0}")]
    Rejected(String),
}

/// A state-mutating contract call, pending gas estimation and submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteCall {
    RegisterPatient(PatientProfile),
    RegisterDoctor(DoctorProfile),
    AddMedicalRecord {
        patient: Identity,
        doctor_name: String,
        reason: String,
        date: String,
        locator: String,
    },
    RequestAccess { patient: Identity },
    GrantAccess { doctor: Identity },
    RevokeAccess { doctor: Identity },
    RejectRequest { doctor: Identity },
}

impl WriteCall {
    /// Contract method name, for logs and adapter dispatch
    pub fn method(&self) -> &'static str {
        match self {
            WriteCall::RegisterPatient(_) => "registerPatient",
            WriteCall::RegisterDoctor(_) => "registerDoctor",
            WriteCall::AddMedicalRecord { .. } => "addMedicalRecord",
            WriteCall::RequestAccess { .. } => "requestAccess",
            WriteCall::GrantAccess { .. } => "grantAccess",
            WriteCall::RevokeAccess { .. } => "revokeAccess",
            WriteCall::RejectRequest { .. } => "rejectRequest",
        }
    }
}

/// Inclusion receipt for a submitted write.
///
/// `status == false` means the transaction was included but execution
/// reverted: the state was not mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub status: bool,
}

/// The operation set the core consumes from the ledger.
///
/// Reads are single-shot; writes block until inclusion and return a receipt.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn role_of(&self, id: Identity) -> Result<Role, LedgerError>;
    async fn patient_details(&self, id: Identity) -> Result<PatientProfile, LedgerError>;
    async fn doctor_details(&self, id: Identity) -> Result<DoctorProfile, LedgerError>;

    async fn records_count(&self, patient: Identity) -> Result<u64, LedgerError>;
    async fn patient_record(
        &self,
        patient: Identity,
        index: u64,
    ) -> Result<MedicalRecord, LedgerError>;

    async fn has_access(&self, patient: Identity, doctor: Identity) -> Result<bool, LedgerError>;
    async fn pending_request(
        &self,
        patient: Identity,
        doctor: Identity,
    ) -> Result<bool, LedgerError>;
    async fn access_requests(&self, patient: Identity) -> Result<Vec<Identity>, LedgerError>;
    async fn approved_doctors(&self, patient: Identity) -> Result<Vec<Identity>, LedgerError>;
    async fn all_doctors(&self) -> Result<Vec<Identity>, LedgerError>;

    /// Past `RecordAdded` events filtered by doctor, oldest first
    async fn record_added_events(
        &self,
        doctor: Identity,
    ) -> Result<Vec<RecordAddedEvent>, LedgerError>;

    /// Ask the node to simulate the call and estimate its execution cost
    async fn estimate_gas(&self, from: Identity, call: &WriteCall) -> Result<u64, LedgerError>;

    /// Submit with a gas ceiling and block until the inclusion receipt
    async fn submit(
        &self,
        from: Identity,
        call: &WriteCall,
        gas_limit: u64,
    ) -> Result<TxReceipt, LedgerError>;
}
