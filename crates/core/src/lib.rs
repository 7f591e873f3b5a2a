//! DMed Client Core
//!
//! The access-gated record publication and retrieval pipeline: patients and
//! doctors interact with a permissioned ledger that records medical-record
//! pointers and access grants, while the record bytes live in
//! content-addressable storage reachable only through an encrypted locator.
//!
//! Components, leaf-first:
//!
//! - [`ledger`] / [`gateway`]: the external ledger surface and the
//!   two-phase (estimate, buffer, submit) write gateway with revert
//!   classification.
//! - [`storage`] / [`upload`]: content-addressable storage backends and the
//!   concurrent batch upload orchestrator with per-file progress and
//!   primary-to-fallback retry.
//! - [`access`]: the per-(patient, doctor) access relationship state
//!   machine built from ledger reads and writes.
//! - [`pipeline`]: record publication: validation, access re-verification,
//!   locator encoding, sequential ledger writes.
//! - [`retrieval`]: access-gated count-then-index record fetching.
//! - [`session`]: the explicit session context created at wallet connect.
//!
//! The ledger itself and the storage network are external collaborators;
//! this crate only orchestrates them. Locator encryption lives in
//! `dmed-locator-codec`, pure input validation in `dmed-validation`.

pub mod access;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod pipeline;
pub mod retrieval;
pub mod session;
pub mod storage;
pub mod types;
pub mod upload;

pub use access::{AccessError, AccessRelation, AccessState};
pub use config::LocatorConfig;
pub use error::{DmedError, RevertCause, RevertReport};
pub use gateway::{AccessHistoryEntry, LedgerGateway, FALLBACK_GAS_LIMIT};
pub use ledger::{Ledger, LedgerError, TxReceipt, WriteCall};
pub use pipeline::{PublicationError, PublicationOutcome, PublicationPipeline};
pub use retrieval::{RecordRetriever, RetrievedRecord};
pub use session::{connect, SessionContext};
pub use storage::{
    ContentId, FileSource, MultipartBackend, ProgressEvent, ProgressReporter, StorageBackend,
    StorageError,
};
pub use types::{
    DoctorProfile, MedicalRecord, PatientProfile, Profile, RecordAddedEvent, RecordMetadata, Role,
};
pub use upload::{BackendUsed, BatchOutcome, FailedUpload, StoredObject, UploadBatch, UploadOrchestrator};

// The identity type is defined next to its parser, the locator types next
// to their codec
pub use dmed_locator_codec::{DecodedLocator, GatewayBase, LocatorKey};
pub use dmed_validation::Identity;
