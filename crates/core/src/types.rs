//! Core Data Model
//!
//! Roles, profiles, and records as the ledger stores them. Profiles are
//! written once at registration; the ledger rejects re-registration, so
//! nothing here models mutation. Records are append-only, addressed by
//! (patient, index).

use dmed_validation::{require_non_empty, Identity, MissingField};
use serde::{Deserialize, Serialize};

/// Principal role, set once at registration. The ledger is the sole source
/// of truth; the wire values are the contract's enum discriminants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Unregistered,
    Patient,
    Doctor,
}

impl Role {
    /// Decode the ledger's role discriminant (0/1/2; anything else is unregistered)
    pub fn from_wire(value: u8) -> Role {
        match value {
            1 => Role::Patient,
            2 => Role::Doctor,
            _ => Role::Unregistered,
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            Role::Unregistered => 0,
            Role::Patient => 1,
            Role::Doctor => 2,
        }
    }
}

/// Patient registration profile
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub name: String,
    pub dob: String,
    pub gender: String,
    pub blood_group: String,
    pub phone: String,
}

/// Doctor registration profile
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub name: String,
    pub specialization: String,
    pub hospital: String,
    pub phone: String,
    pub license_number: String,
}

/// Tagged profile union with capability checks.
///
/// Capabilities replace runtime role inspection at the call sites: the
/// publication pipeline asks `can_publish`, the grant/reject flows ask
/// `can_grant_access`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Profile {
    Patient(PatientProfile),
    Doctor(DoctorProfile),
}

impl Profile {
    /// Only doctors publish records
    pub fn can_publish(&self) -> bool {
        matches!(self, Profile::Doctor(_))
    }

    /// Only patients grant, reject, or revoke access
    pub fn can_grant_access(&self) -> bool {
        matches!(self, Profile::Patient(_))
    }

    pub fn display_name(&self) -> &str {
        match self {
            Profile::Patient(p) => &p.name,
            Profile::Doctor(d) => &d.name,
        }
    }
}

/// A record pointer as stored on the ledger.
///
/// `locator` is the sealed (or legacy raw) storage locator; decode it with
/// the locator codec before presenting it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub doctor_name: String,
    pub reason: String,
    pub date: String,
    pub locator: String,
}

/// Doctor-supplied metadata applied uniformly to every file in a batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub doctor_name: String,
    pub reason: String,
    pub date: String,
}

impl RecordMetadata {
    /// All fields must be non-empty after trimming
    pub fn validate(&self) -> Result<(), MissingField> {
        require_non_empty("doctor name", &self.doctor_name)?;
        require_non_empty("reason", &self.reason)?;
        require_non_empty("date", &self.date)?;
        Ok(())
    }
}

/// A past `RecordAdded` ledger event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordAddedEvent {
    pub patient: Identity,
    pub record_id: u64,
}
