//! Access Relationship State Machine
//!
//! Tracks one (patient, doctor) pair's access state on the client side. The
//! ledger is authoritative: `check` always re-reads it, and the states here
//! only cache what the ledger last said.
//!
//! States: `Unknown` (never checked, or identity changed), `Checking`
//! (ledger read in flight), `Granted`, `Pending` (request outstanding),
//! `Denied`. A failed check resets to `Unknown` rather than guessing.

use dmed_validation::Identity;

use crate::error::DmedError;
use crate::gateway::LedgerGateway;
use crate::ledger::Ledger;

/// Client-side view of a (patient, doctor) access relationship
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessState {
    /// No check performed yet for the current pair
    Unknown,
    /// A ledger check is in flight
    Checking,
    /// The ledger confirms the doctor may read and publish
    Granted,
    /// An access request is outstanding
    Pending,
    /// No grant and no outstanding request
    Denied,
}

/// Error type for access-relation operations
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// The operation is not legal from the current state
    #[error("cannot {op} while access state is {state:?}")]
    InvalidTransition { op: &'static str, state: AccessState },
    #[error(transparent)]
    Core(#[from] DmedError),
}

/// One (patient, doctor) pair and its last-known access state
#[derive(Clone, Debug)]
pub struct AccessRelation {
    patient: Identity,
    doctor: Identity,
    state: AccessState,
}

impl AccessRelation {
    pub fn new(patient: Identity, doctor: Identity) -> Self {
        AccessRelation {
            patient,
            doctor,
            state: AccessState::Unknown,
        }
    }

    pub fn patient(&self) -> Identity {
        self.patient
    }

    pub fn doctor(&self) -> Identity {
        self.doctor
    }

    pub fn state(&self) -> AccessState {
        self.state
    }

    /// Retarget the patient side. Any cached state is stale for the new
    /// pair, so the state drops back to `Unknown`.
    pub fn set_patient(&mut self, patient: Identity) {
        if patient != self.patient {
            self.patient = patient;
            self.state = AccessState::Unknown;
        }
    }

    /// Retarget the doctor side; resets to `Unknown` on change
    pub fn set_doctor(&mut self, doctor: Identity) {
        if doctor != self.doctor {
            self.doctor = doctor;
            self.state = AccessState::Unknown;
        }
    }

    /// Re-read the ledger and settle into `Granted`, `Pending`, or `Denied`.
    ///
    /// A grant wins over a stale pending flag. On a failed read the state
    /// resets to `Unknown` and the error propagates.
    pub async fn check<L: Ledger>(
        &mut self,
        gateway: &LedgerGateway<L>,
    ) -> Result<AccessState, AccessError> {
        self.state = AccessState::Checking;

        let granted = match gateway.has_access(self.patient, self.doctor).await {
            Ok(granted) => granted,
            Err(err) => {
                self.state = AccessState::Unknown;
                return Err(err.into());
            }
        };
        if granted {
            self.state = AccessState::Granted;
            return Ok(self.state);
        }

        match gateway.pending_request(self.patient, self.doctor).await {
            Ok(true) => self.state = AccessState::Pending,
            Ok(false) => self.state = AccessState::Denied,
            Err(err) => {
                self.state = AccessState::Unknown;
                return Err(err.into());
            }
        }
        Ok(self.state)
    }

    /// Ask the patient for access. Legal only from `Denied`; a granted or
    /// already-pending relation must not issue another request.
    pub async fn request_access<L: Ledger>(
        &mut self,
        gateway: &LedgerGateway<L>,
    ) -> Result<(), AccessError> {
        if self.state != AccessState::Denied {
            return Err(AccessError::InvalidTransition {
                op: "request access",
                state: self.state,
            });
        }
        gateway.request_access(self.doctor, self.patient).await?;
        self.state = AccessState::Pending;
        tracing::info!(patient = %self.patient, doctor = %self.doctor, "access requested");
        Ok(())
    }
}
