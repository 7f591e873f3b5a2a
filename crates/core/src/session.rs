//! Session Context
//!
//! The explicit per-connection state object. It is created once at wallet
//! connect, passed to every component that needs the caller's identity or
//! capabilities, and dropped at logout. Nothing in the core reads ambient
//! globals.
//!
//! The cached profile is for display only; the ledger remains the sole
//! source of truth for roles and profiles.

use chrono::{DateTime, Utc};
use dmed_validation::Identity;

use crate::error::DmedError;
use crate::gateway::LedgerGateway;
use crate::ledger::Ledger;
use crate::types::{Profile, Role};

/// Per-connection session state
#[derive(Clone, Debug)]
pub struct SessionContext {
    pub identity: Identity,
    pub role: Role,
    /// Last-known profile, fetched at connect; display only
    pub profile: Option<Profile>,
    pub connected_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn can_publish(&self) -> bool {
        self.profile.as_ref().is_some_and(Profile::can_publish)
    }

    pub fn can_grant_access(&self) -> bool {
        self.profile.as_ref().is_some_and(Profile::can_grant_access)
    }

    pub fn display_name(&self) -> Option<&str> {
        self.profile.as_ref().map(Profile::display_name)
    }

    /// End the session. Consumes the context so no component can keep using
    /// a logged-out identity.
    pub fn logout(self) {
        tracing::info!(identity = %self.identity, "session invalidated");
    }
}

/// Establish a session for a connected wallet identity: look up the role,
/// then the matching profile. Unregistered identities get a session with no
/// profile (and therefore no capabilities).
pub async fn connect<L: Ledger>(
    gateway: &LedgerGateway<L>,
    identity: Identity,
) -> Result<SessionContext, DmedError> {
    let role = gateway.role_of(identity).await?;
    let profile = match role {
        Role::Patient => Some(Profile::Patient(gateway.patient_details(identity).await?)),
        Role::Doctor => Some(Profile::Doctor(gateway.doctor_details(identity).await?)),
        Role::Unregistered => None,
    };
    tracing::info!(identity = %identity, ?role, "session established");
    Ok(SessionContext {
        identity,
        role,
        profile,
        connected_at: Utc::now(),
    })
}
