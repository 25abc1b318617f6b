//! Core publisher engine
//!
//! The CnamePublisher is responsible for:
//! - Caching the local host identity fetched once per connection
//! - Collision-checking candidate aliases before registering them
//! - Registering one CNAME record group per alias
//! - Tracking the live set of published aliases
//! - Withdrawing every record group on teardown
//!
//! ## Event Flow
//!
//! 1. The service loop opens a `NameService` connection and hands it to
//!    [`CnamePublisher::new()`]
//! 2. Each alias goes through resolve → create group → add record → commit
//! 3. Health is polled with [`CnamePublisher::available()`]
//! 4. On connection loss the whole engine is discarded and a fresh one built
//! 5. Before process exit, [`CnamePublisher::teardown()`] withdraws
//!    everything still published

use std::collections::HashMap;

use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::traits::{NameService, RecordGroup};
use crate::types::{HostName, RecordTtl};
use crate::wire;

/// Publishes CNAME aliases for the local host on the naming service.
///
/// One engine owns one connection for its whole lifetime. All operations are
/// blocking round-trips; there is no internal concurrency and no retry. When
/// the connection is lost the engine is discarded, never repaired.
pub struct CnamePublisher {
    /// Connection to the naming service
    service: Box<dyn NameService>,

    /// The service's own name for this machine, cached for the connection's
    /// lifetime
    local_fqdn: String,

    /// RDATA for `local_fqdn`, encoded once and shared by every record
    rdata: Vec<u8>,

    /// TTL applied uniformly to every record this engine registers
    ttl: RecordTtl,

    /// Live records, one group handle per published alias
    published: HashMap<HostName, Box<dyn RecordGroup>>,
}

impl CnamePublisher {
    /// Create a publisher over a freshly opened connection.
    ///
    /// Queries the service for the local host's fully-qualified name. Any
    /// failure here is fatal for this construction attempt; the caller is
    /// expected to retry later with a new connection.
    pub fn new(service: Box<dyn NameService>, ttl: RecordTtl) -> Result<Self> {
        let local_fqdn = service.local_fqdn()?;
        let rdata = wire::encode_fqdn(&local_fqdn)?;

        debug!("mDNS publisher for '{}', record TTL {}s", local_fqdn, ttl.as_secs());

        Ok(Self {
            service,
            local_fqdn,
            rdata,
            ttl,
            published: HashMap::new(),
        })
    }

    /// The local host identity every published alias points at.
    pub fn local_fqdn(&self) -> &str {
        &self.local_fqdn
    }

    /// The TTL applied to every record this engine registers.
    pub fn ttl(&self) -> RecordTtl {
        self.ttl
    }

    /// Look up the owner currently answering for `name`.
    ///
    /// `Ok(None)` means the name is unused. This is a blocking round-trip
    /// bounded only by the naming service's own multi-second timeout.
    pub fn resolve(&self, name: &HostName) -> Result<Option<String>> {
        self.service.resolve(name.as_str())
    }

    /// Publish one CNAME alias pointing at the local host.
    ///
    /// Unless `force` is set, the alias is first resolved to detect
    /// collisions: a name owned by another machine fails with
    /// [`Error::Conflict`] and nothing is registered; a name this machine
    /// already answers for logs a warning and is re-registered.
    ///
    /// Re-publishing an alias this engine already holds withdraws the stale
    /// record group first, so exactly one group per alias stays live. If
    /// that withdrawal fails, the old entry stays in the ledger so teardown
    /// still reaches the record.
    pub fn publish(&mut self, name: &HostName, force: bool) -> Result<()> {
        if !force {
            // Takes a few seconds in the expected (unused) case, because the
            // service only gives up on resolution after its own timeout.
            info!("Checking for '{}' availability...", name);

            if let Some(owner) = self.resolve(name)? {
                if !owner.eq_ignore_ascii_case(&self.local_fqdn) {
                    return Err(Error::Conflict {
                        name: name.clone(),
                        owner,
                    });
                }
                // We may have discovered ourselves, from a previous run or a
                // duplicate request. Not fatal, re-register.
                warn!("'{}' is already being published by this machine", name);
            }
        }

        if let Some(stale) = self.published.get(name) {
            debug!("Withdrawing previous registration for '{}'", name);
            // Remove only after the reset went through, same as unpublish;
            // a record the service still holds must stay in the ledger.
            stale.reset()?;
            self.published.remove(name);
        }

        let group = self.service.create_group()?;
        group.add_cname(name.as_str(), &self.rdata, self.ttl)?;
        group.commit()?;

        self.published.insert(name.clone(), group);
        debug!("Published '{}' -> '{}'", name, self.local_fqdn);

        Ok(())
    }

    /// Withdraw one published alias.
    ///
    /// Fails with [`Error::NotPublished`] if this engine does not hold the
    /// alias. If the reset itself fails, the ledger entry stays so the
    /// caller can retry or reconnect.
    pub fn unpublish(&mut self, name: &HostName) -> Result<()> {
        let group = self
            .published
            .get(name)
            .ok_or_else(|| Error::NotPublished(name.clone()))?;

        group.reset()?;
        self.published.remove(name);
        debug!("Unpublished '{}'", name);

        Ok(())
    }

    /// Number of aliases currently published by this engine.
    ///
    /// The caller compares this against its batch size to detect partial
    /// failures.
    pub fn count(&self) -> usize {
        self.published.len()
    }

    /// Whether this engine currently holds a live record for `name`.
    pub fn is_published(&self, name: &HostName) -> bool {
        self.published.contains_key(name)
    }

    /// Probe whether the connection is still usable.
    ///
    /// Issues a no-op version query. Returns `Ok(false)` only when the
    /// service process is gone; any other failure is unexpected and
    /// propagated, so a protocol error is never masked as "service merely
    /// restarted".
    pub fn available(&self) -> Result<bool> {
        match self.service.version() {
            Ok(_) => Ok(true),
            Err(Error::ServiceGone) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Withdraw every record this engine still publishes.
    ///
    /// Every group is reset even when an earlier one fails. Failures caused
    /// by the connection already being gone are swallowed; the first
    /// unexpected failure is returned after all groups were attempted.
    /// Idempotent: a second call finds nothing to do.
    ///
    /// The naming service needs a short settling delay after this before
    /// the removal is visible network-wide; waiting it out is the caller's
    /// responsibility.
    pub fn teardown(&mut self) -> Result<()> {
        if self.published.is_empty() {
            return Ok(());
        }

        info!("Withdrawing {} published record(s)...", self.published.len());

        let mut first_failure = None;
        for (name, group) in self.published.drain() {
            match group.reset() {
                Ok(()) => debug!("Reset record group for '{}'", name),
                Err(e) if e.is_connection_lost() => {
                    debug!("Naming service already gone while resetting '{}'", name);
                }
                Err(e) => {
                    error!("Failed to reset record group for '{}': {}", name, e);
                    first_failure.get_or_insert(e);
                }
            }
        }

        match first_failure {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}
