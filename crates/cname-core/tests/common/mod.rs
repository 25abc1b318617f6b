//! Test doubles and common utilities for publisher contract tests
//!
//! This module provides a scriptable in-memory naming service that verifies
//! the engine's behavioral contracts without a live mDNS daemon.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cname_core::engine::CnamePublisher;
use cname_core::error::{Error, Result};
use cname_core::traits::{NameService, RecordGroup};
use cname_core::types::{HostName, RecordTtl};

/// Scripted outcome for a record group reset
#[derive(Clone, Copy)]
pub enum ResetOutcome {
    /// Fail as if the service process died mid-call
    ServiceGone,
    /// Fail with an unexpected protocol error
    Protocol,
}

/// A record as committed to the fake network
#[derive(Clone)]
pub struct CommittedRecord {
    /// Which group registered it
    pub group_id: usize,
    /// Encoded record payload
    pub rdata: Vec<u8>,
    /// Requested time-to-live
    pub ttl_secs: u32,
}

/// A scriptable NameService that tracks calls.
///
/// Clones made with [`MockNameService::sharing_state_with`] observe the same
/// fake network, so a test can keep a handle after moving the service into
/// the engine.
pub struct MockNameService {
    /// FQDN handed out by local_fqdn()
    local_fqdn: String,
    /// Scripted resolve() answers: queried name -> owning host
    owners: Arc<Mutex<HashMap<String, String>>>,
    /// Committed records on the fake network, keyed by alias
    records: Arc<Mutex<HashMap<String, CommittedRecord>>>,
    /// Scripted reset() failures, keyed by alias
    reset_failures: Arc<Mutex<HashMap<String, ResetOutcome>>>,
    /// When set, every call fails as if the service process died
    gone: Arc<AtomicBool>,
    /// Id for the next record group
    next_group_id: Arc<AtomicUsize>,
    /// Call counter for local_fqdn()
    fqdn_call_count: Arc<AtomicUsize>,
    /// Call counter for resolve()
    resolve_call_count: Arc<AtomicUsize>,
    /// Call counter for version()
    version_call_count: Arc<AtomicUsize>,
    /// Call counter for create_group()
    group_call_count: Arc<AtomicUsize>,
    /// Call counter for reset(), across all groups
    reset_call_count: Arc<AtomicUsize>,
}

impl MockNameService {
    /// Create a fake service answering for `local_fqdn`
    pub fn new(local_fqdn: &str) -> Self {
        Self {
            local_fqdn: local_fqdn.to_string(),
            owners: Arc::new(Mutex::new(HashMap::new())),
            records: Arc::new(Mutex::new(HashMap::new())),
            reset_failures: Arc::new(Mutex::new(HashMap::new())),
            gone: Arc::new(AtomicBool::new(false)),
            next_group_id: Arc::new(AtomicUsize::new(0)),
            fqdn_call_count: Arc::new(AtomicUsize::new(0)),
            resolve_call_count: Arc::new(AtomicUsize::new(0)),
            version_call_count: Arc::new(AtomicUsize::new(0)),
            group_call_count: Arc::new(AtomicUsize::new(0)),
            reset_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a new MockNameService that shares state with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            local_fqdn: other.local_fqdn.clone(),
            owners: Arc::clone(&other.owners),
            records: Arc::clone(&other.records),
            reset_failures: Arc::clone(&other.reset_failures),
            gone: Arc::clone(&other.gone),
            next_group_id: Arc::clone(&other.next_group_id),
            fqdn_call_count: Arc::clone(&other.fqdn_call_count),
            resolve_call_count: Arc::clone(&other.resolve_call_count),
            version_call_count: Arc::clone(&other.version_call_count),
            group_call_count: Arc::clone(&other.group_call_count),
            reset_call_count: Arc::clone(&other.reset_call_count),
        }
    }

    /// Script resolve() to report `name` as owned by `owner`
    pub fn set_owner(&self, name: &str, owner: &str) {
        self.owners
            .lock()
            .unwrap()
            .insert(name.to_string(), owner.to_string());
    }

    /// Script the next reset() touching `alias` to fail
    pub fn script_reset_failure(&self, alias: &str, outcome: ResetOutcome) {
        self.reset_failures
            .lock()
            .unwrap()
            .insert(alias.to_string(), outcome);
    }

    /// Make every subsequent call fail as if the service process died
    pub fn kill(&self) {
        self.gone.store(true, Ordering::SeqCst);
    }

    /// Get the number of times local_fqdn() was called
    pub fn fqdn_call_count(&self) -> usize {
        self.fqdn_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times resolve() was called
    pub fn resolve_call_count(&self) -> usize {
        self.resolve_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times version() was called
    pub fn version_call_count(&self) -> usize {
        self.version_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of record groups created so far
    pub fn groups_created(&self) -> usize {
        self.group_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times reset() was called, across all groups
    pub fn reset_call_count(&self) -> usize {
        self.reset_call_count.load(Ordering::SeqCst)
    }

    /// Number of records currently live on the fake network
    pub fn live_record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// The committed record for `alias`, if one is live
    pub fn record(&self, alias: &str) -> Option<CommittedRecord> {
        self.records.lock().unwrap().get(alias).cloned()
    }

    fn check_alive(&self) -> Result<()> {
        if self.gone.load(Ordering::SeqCst) {
            return Err(Error::ServiceGone);
        }
        Ok(())
    }
}

impl NameService for MockNameService {
    fn local_fqdn(&self) -> Result<String> {
        self.fqdn_call_count.fetch_add(1, Ordering::SeqCst);
        self.check_alive()?;
        Ok(self.local_fqdn.clone())
    }

    fn resolve(&self, name: &str) -> Result<Option<String>> {
        self.resolve_call_count.fetch_add(1, Ordering::SeqCst);
        self.check_alive()?;
        Ok(self.owners.lock().unwrap().get(name).cloned())
    }

    fn create_group(&self) -> Result<Box<dyn RecordGroup>> {
        self.group_call_count.fetch_add(1, Ordering::SeqCst);
        self.check_alive()?;

        let id = self.next_group_id.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockRecordGroup {
            id,
            added: Mutex::new(Vec::new()),
            records: Arc::clone(&self.records),
            reset_failures: Arc::clone(&self.reset_failures),
            gone: Arc::clone(&self.gone),
            reset_call_count: Arc::clone(&self.reset_call_count),
        }))
    }

    fn version(&self) -> Result<String> {
        self.version_call_count.fetch_add(1, Ordering::SeqCst);
        self.check_alive()?;
        Ok("mock 0.1".to_string())
    }
}

/// A record group on the fake network
pub struct MockRecordGroup {
    id: usize,
    /// Records added but possibly not yet committed: (alias, rdata, ttl)
    added: Mutex<Vec<(String, Vec<u8>, u32)>>,
    records: Arc<Mutex<HashMap<String, CommittedRecord>>>,
    reset_failures: Arc<Mutex<HashMap<String, ResetOutcome>>>,
    gone: Arc<AtomicBool>,
    reset_call_count: Arc<AtomicUsize>,
}

impl RecordGroup for MockRecordGroup {
    fn add_cname(&self, alias: &str, rdata: &[u8], ttl: RecordTtl) -> Result<()> {
        if self.gone.load(Ordering::SeqCst) {
            return Err(Error::ServiceGone);
        }
        self.added
            .lock()
            .unwrap()
            .push((alias.to_string(), rdata.to_vec(), ttl.as_secs()));
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        if self.gone.load(Ordering::SeqCst) {
            return Err(Error::ServiceGone);
        }

        let mut records = self.records.lock().unwrap();
        for (alias, rdata, ttl_secs) in self.added.lock().unwrap().iter() {
            records.insert(
                alias.clone(),
                CommittedRecord {
                    group_id: self.id,
                    rdata: rdata.clone(),
                    ttl_secs: *ttl_secs,
                },
            );
        }
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        // Count the attempt even when it fails
        self.reset_call_count.fetch_add(1, Ordering::SeqCst);

        let scripted = {
            let mut failures = self.reset_failures.lock().unwrap();
            self.added
                .lock()
                .unwrap()
                .iter()
                .find_map(|(alias, _, _)| failures.remove(alias))
        };
        match scripted {
            Some(ResetOutcome::ServiceGone) => return Err(Error::ServiceGone),
            Some(ResetOutcome::Protocol) => {
                return Err(Error::protocol("scripted reset failure"));
            }
            None => {}
        }

        if self.gone.load(Ordering::SeqCst) {
            return Err(Error::ServiceGone);
        }

        // Withdraw only this group's records; a newer group may have
        // re-registered the same alias
        self.records
            .lock()
            .unwrap()
            .retain(|_, record| record.group_id != self.id);
        Ok(())
    }
}

/// Helper to parse a host name in tests
pub fn host(name: &str) -> HostName {
    name.parse().unwrap()
}

/// Helper to build a TTL in tests
pub fn ttl(secs: u32) -> RecordTtl {
    RecordTtl::from_secs(secs).unwrap()
}

/// Build a publisher over a handle sharing state with `service`
pub fn publisher_on(service: &MockNameService) -> CnamePublisher {
    let handle = MockNameService::sharing_state_with(service);
    CnamePublisher::new(Box::new(handle), ttl(60)).unwrap()
}
