//! Error Taxonomy
//!
//! One error enum covers the whole core, with a variant per failure class:
//!
//! - `Validation`: bad input shape or size, caught before any I/O
//! - `Connectivity`: wallet/ledger/storage unreachable
//! - `AccessDenied`: ledger-confirmed lack of permission
//! - `Upload`: both storage backends failed for a file
//! - `TransactionReverted`: the ledger executed the write and rejected it;
//!   the state was NOT mutated
//! - `TransactionSubmission`: the write may or may not have landed; the
//!   caller must re-query state before retrying
//!
//! No variant is fatal: the system stays usable after any single failure.
//! Nothing here retries automatically; the only automatic fallbacks in the
//! core are the secondary storage backend and the fixed gas estimate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical causes of a ledger revert, as reported to the user.
///
/// The ledger does not say which precondition failed, so a revert is
/// reported with all three candidate causes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevertCause {
    /// The sender lacks permission for the target (e.g. no access grant)
    MissingPermission,
    /// The target identity is invalid or not registered
    InvalidTargetIdentity,
    /// A contract precondition was not met
    UnmetContractPrecondition,
}

impl RevertCause {
    pub const ALL: [RevertCause; 3] = [
        RevertCause::MissingPermission,
        RevertCause::InvalidTargetIdentity,
        RevertCause::UnmetContractPrecondition,
    ];
}

impl fmt::Display for RevertCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevertCause::MissingPermission => write!(f, "missing permission for the target"),
            RevertCause::InvalidTargetIdentity => {
                write!(f, "target identity is invalid or not registered")
            }
            RevertCause::UnmetContractPrecondition => {
                write!(f, "a contract precondition was not met")
            }
        }
    }
}

/// Classified report of a reverted ledger write
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevertReport {
    /// The ledger's rejection message
    pub message: String,
    /// Candidate causes, in reporting order
    pub causes: Vec<RevertCause>,
}

impl RevertReport {
    /// A report carrying the three canonical causes
    pub fn canonical(message: impl Into<String>) -> Self {
        RevertReport {
            message: message.into(),
            causes: RevertCause::ALL.to_vec(),
        }
    }
}

impl fmt::Display for RevertReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}; possible causes: ", self.message)?;
        for (i, cause) in self.causes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "({}) {}", i + 1, cause)?;
        }
        Ok(())
    }
}

/// Error type for all core operations
#[derive(Clone, Debug, thiserror::Error)]
pub enum DmedError {
    /// Bad input shape or size; caught before any I/O
    #[error("invalid input: {0}")]
    Validation(String),

    /// A collaborator (wallet, ledger, storage) could not be reached
    #[error("cannot reach {service}: {detail}")]
    Connectivity { service: String, detail: String },

    /// The ledger confirmed the caller lacks permission
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Both storage backends failed for a file
    #[error("upload failed for {file_name}: primary backend: {primary}; fallback backend: {fallback}")]
    Upload {
        file_name: String,
        primary: String,
        fallback: String,
    },

    /// The ledger included and rejected the write; state was not mutated
    #[error("transaction reverted: {0}")]
    TransactionReverted(RevertReport),

    /// Submission failed with the outcome unknown; re-query state before retrying
    #[error("transaction submission failed, outcome indeterminate; re-query state before retrying: {0}")]
    TransactionSubmission(String),
}

impl DmedError {
    pub(crate) fn ledger_connectivity(detail: impl fmt::Display) -> Self {
        DmedError::Connectivity {
            service: "ledger".to_string(),
            detail: detail.to_string(),
        }
    }
}

impl From<dmed_validation::ParseIdentityError> for DmedError {
    fn from(e: dmed_validation::ParseIdentityError) -> Self {
        DmedError::Validation(e.to_string())
    }
}

impl From<dmed_validation::FileValidationError> for DmedError {
    fn from(e: dmed_validation::FileValidationError) -> Self {
        DmedError::Validation(e.to_string())
    }
}

impl From<dmed_validation::MissingField> for DmedError {
    fn from(e: dmed_validation::MissingField) -> Self {
        DmedError::Validation(e.to_string())
    }
}
