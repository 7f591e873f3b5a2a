//! Test Harness
//!
//! An in-memory emulation of the records contract plus scriptable storage
//! backends. The mock ledger enforces the contract's own rules (access
//! grants gate record writes) so tests exercise the real failure paths, and
//! it records every submitted gas limit for the buffering assertions.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use dmed_core::{
    ContentId, DoctorProfile, FileSource, Identity, Ledger, LedgerError, MedicalRecord,
    PatientProfile, ProgressReporter, Role, StorageBackend, StorageError, TxReceipt, WriteCall,
};
use dmed_core::types::RecordAddedEvent;

/// Default gas estimate the mock node returns
pub const MOCK_GAS_ESTIMATE: u64 = 100_000;

/// Identity with the given last byte, zero elsewhere
pub fn identity(last: u8) -> Identity {
    let mut bytes = [0u8; 20];
    bytes[19] = last;
    Identity::from_bytes(bytes)
}

pub fn patient_profile(name: &str) -> PatientProfile {
    PatientProfile {
        name: name.to_string(),
        dob: "1990-05-14".to_string(),
        gender: "F".to_string(),
        blood_group: "O+".to_string(),
        phone: "555-0101".to_string(),
    }
}

pub fn doctor_profile(name: &str) -> DoctorProfile {
    DoctorProfile {
        name: name.to_string(),
        specialization: "Cardiology".to_string(),
        hospital: "General Hospital".to_string(),
        phone: "555-0100".to_string(),
        license_number: "L-4711".to_string(),
    }
}

#[derive(Default)]
struct ContractState {
    roles: HashMap<Identity, Role>,
    patients: HashMap<Identity, PatientProfile>,
    doctors: HashMap<Identity, DoctorProfile>,
    records: HashMap<Identity, Vec<MedicalRecord>>,
    /// (patient, doctor) pairs with a live grant
    grants: HashSet<(Identity, Identity)>,
    /// (patient, doctor) pairs with an outstanding request
    pending: HashSet<(Identity, Identity)>,
    /// (publishing doctor, event), oldest first
    events: Vec<(Identity, RecordAddedEvent)>,
    /// Gas limits of every submitted write, in order
    submitted_gas_limits: Vec<u64>,
    fail_estimation: bool,
    /// One-shot rejection message for the next submit
    reject_next: Option<String>,
    /// Include-but-revert after this many more successful submits
    revert_in: Option<usize>,
    tx_counter: u64,
}

/// In-memory records-contract emulation
#[derive(Default)]
pub struct MockLedger {
    state: Mutex<ContractState>,
}

impl MockLedger {
    pub fn new() -> Self {
        MockLedger::default()
    }

    pub fn seed_patient(&self, id: Identity, profile: PatientProfile) {
        let mut state = self.state.lock().unwrap();
        state.roles.insert(id, Role::Patient);
        state.patients.insert(id, profile);
    }

    pub fn seed_doctor(&self, id: Identity, profile: DoctorProfile) {
        let mut state = self.state.lock().unwrap();
        state.roles.insert(id, Role::Doctor);
        state.doctors.insert(id, profile);
    }

    /// Seed a raw record, bypassing the grant check (pre-existing state)
    pub fn seed_record(&self, patient: Identity, record: MedicalRecord) {
        let mut state = self.state.lock().unwrap();
        state.records.entry(patient).or_default().push(record);
    }

    /// Make the next gas estimation fail
    pub fn fail_estimation(&self) {
        self.state.lock().unwrap().fail_estimation = true;
    }

    /// Reject the next submission with the given node message
    pub fn reject_next_submission(&self, message: &str) {
        self.state.lock().unwrap().reject_next = Some(message.to_string());
    }

    /// Include but revert the next submission
    pub fn revert_next_submission(&self) {
        self.state.lock().unwrap().revert_in = Some(0);
    }

    /// Let `n` more submissions through, then include-but-revert the next one
    pub fn revert_after_submissions(&self, n: usize) {
        self.state.lock().unwrap().revert_in = Some(n);
    }

    /// Gas limits of all submitted writes, in submission order
    pub fn submitted_gas_limits(&self) -> Vec<u64> {
        self.state.lock().unwrap().submitted_gas_limits.clone()
    }

    pub fn records_of(&self, patient: Identity) -> Vec<MedicalRecord> {
        self.state
            .lock()
            .unwrap()
            .records
            .get(&patient)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn role_of(&self, id: Identity) -> Result<Role, LedgerError> {
        let state = self.state.lock().unwrap();
        Ok(state.roles.get(&id).copied().unwrap_or(Role::Unregistered))
    }

    async fn patient_details(&self, id: Identity) -> Result<PatientProfile, LedgerError> {
        let state = self.state.lock().unwrap();
        state
            .patients
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::Call(format!("no patient registered at {id}")))
    }

    async fn doctor_details(&self, id: Identity) -> Result<DoctorProfile, LedgerError> {
        let state = self.state.lock().unwrap();
        state
            .doctors
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::Call(format!("no doctor registered at {id}")))
    }

    async fn records_count(&self, patient: Identity) -> Result<u64, LedgerError> {
        let state = self.state.lock().unwrap();
        Ok(state.records.get(&patient).map_or(0, Vec::len) as u64)
    }

    async fn patient_record(
        &self,
        patient: Identity,
        index: u64,
    ) -> Result<MedicalRecord, LedgerError> {
        let state = self.state.lock().unwrap();
        state
            .records
            .get(&patient)
            .and_then(|records| records.get(index as usize))
            .cloned()
            .ok_or_else(|| LedgerError::Call(format!("record index {index} out of range")))
    }

    async fn has_access(&self, patient: Identity, doctor: Identity) -> Result<bool, LedgerError> {
        let state = self.state.lock().unwrap();
        Ok(state.grants.contains(&(patient, doctor)))
    }

    async fn pending_request(
        &self,
        patient: Identity,
        doctor: Identity,
    ) -> Result<bool, LedgerError> {
        let state = self.state.lock().unwrap();
        Ok(state.pending.contains(&(patient, doctor)))
    }

    async fn access_requests(&self, patient: Identity) -> Result<Vec<Identity>, LedgerError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .pending
            .iter()
            .filter(|(p, _)| *p == patient)
            .map(|(_, d)| *d)
            .collect())
    }

    async fn approved_doctors(&self, patient: Identity) -> Result<Vec<Identity>, LedgerError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .grants
            .iter()
            .filter(|(p, _)| *p == patient)
            .map(|(_, d)| *d)
            .collect())
    }

    async fn all_doctors(&self) -> Result<Vec<Identity>, LedgerError> {
        let state = self.state.lock().unwrap();
        let mut doctors: Vec<Identity> = state.doctors.keys().copied().collect();
        doctors.sort();
        Ok(doctors)
    }

    async fn record_added_events(
        &self,
        doctor: Identity,
    ) -> Result<Vec<RecordAddedEvent>, LedgerError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .events
            .iter()
            .filter(|(d, _)| *d == doctor)
            .map(|(_, event)| *event)
            .collect())
    }

    async fn estimate_gas(&self, _from: Identity, call: &WriteCall) -> Result<u64, LedgerError> {
        let state = self.state.lock().unwrap();
        if state.fail_estimation {
            return Err(LedgerError::Call(format!(
                "cannot estimate gas for {}",
                call.method()
            )));
        }
        Ok(MOCK_GAS_ESTIMATE)
    }

    async fn submit(
        &self,
        from: Identity,
        call: &WriteCall,
        gas_limit: u64,
    ) -> Result<TxReceipt, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.submitted_gas_limits.push(gas_limit);

        if let Some(message) = state.reject_next.take() {
            return Err(LedgerError::Rejected(message));
        }
        state.tx_counter += 1;
        let tx_hash = format!("0xtx{:04}", state.tx_counter);
        if let Some(remaining) = state.revert_in {
            if remaining == 0 {
                state.revert_in = None;
                return Ok(TxReceipt {
                    tx_hash,
                    status: false,
                });
            }
            state.revert_in = Some(remaining - 1);
        }

        match call {
            WriteCall::RegisterPatient(profile) => {
                state.roles.insert(from, Role::Patient);
                state.patients.insert(from, profile.clone());
            }
            WriteCall::RegisterDoctor(profile) => {
                state.roles.insert(from, Role::Doctor);
                state.doctors.insert(from, profile.clone());
            }
            WriteCall::AddMedicalRecord {
                patient,
                doctor_name,
                reason,
                date,
                locator,
            } => {
                // The contract enforces the grant at execution time
                if *patient != from && !state.grants.contains(&(*patient, from)) {
                    return Err(LedgerError::Rejected(
                        "execution reverted: access not granted".to_string(),
                    ));
                }
                let records = state.records.entry(*patient).or_default();
                let record_id = records.len() as u64;
                records.push(MedicalRecord {
                    doctor_name: doctor_name.clone(),
                    reason: reason.clone(),
                    date: date.clone(),
                    locator: locator.clone(),
                });
                state.events.push((
                    from,
                    RecordAddedEvent {
                        patient: *patient,
                        record_id,
                    },
                ));
            }
            WriteCall::RequestAccess { patient } => {
                state.pending.insert((*patient, from));
            }
            WriteCall::GrantAccess { doctor } => {
                state.grants.insert((from, *doctor));
                state.pending.remove(&(from, *doctor));
            }
            WriteCall::RevokeAccess { doctor } => {
                state.grants.remove(&(from, *doctor));
            }
            WriteCall::RejectRequest { doctor } => {
                state.pending.remove(&(from, *doctor));
            }
        }
        Ok(TxReceipt {
            tx_hash,
            status: true,
        })
    }
}

/// Storage backend that succeeds for every file except the scripted ones,
/// emitting quarter-step progress on the way
pub struct ScriptedBackend {
    label: &'static str,
    content_prefix: &'static str,
    failing_files: HashSet<String>,
}

impl ScriptedBackend {
    pub fn reliable(label: &'static str, content_prefix: &'static str) -> Self {
        ScriptedBackend {
            label,
            content_prefix,
            failing_files: HashSet::new(),
        }
    }

    pub fn failing_for(mut self, file_name: &str) -> Self {
        self.failing_files.insert(file_name.to_string());
        self
    }
}

#[async_trait]
impl StorageBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        self.label
    }

    async fn upload(
        &self,
        file: &FileSource,
        progress: &mut ProgressReporter,
    ) -> Result<ContentId, StorageError> {
        if self.failing_files.contains(&file.name) {
            return Err(StorageError::Backend(format!(
                "{} rejected {}",
                self.label, file.name
            )));
        }
        let total = file.size() as u64;
        for quarter in 1..=3u64 {
            progress.report_bytes(total * quarter / 4, total).await;
        }
        progress.complete().await;
        Ok(ContentId::new(format!("{}{}", self.content_prefix, file.name)))
    }
}

/// A small in-budget PDF file
pub fn pdf_file(name: &str, bytes: usize) -> FileSource {
    FileSource::new(name, "application/pdf", vec![0x25; bytes])
}
