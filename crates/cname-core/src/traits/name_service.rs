// # Naming Service Traits
//
// The engine talks to the naming service only through this seam. The one
// production implementation (Avahi over D-Bus) lives in the `cname-avahi`
// crate; contract tests substitute an in-memory fake.
//
// Every method is a blocking round-trip over the implementation's private
// connection. No timeout is layered on top of the service's own.

use crate::error::Result;
use crate::types::RecordTtl;

/// Connection-wide operations of the naming service.
///
/// One value of this type stands for one private connection, exclusively
/// owned by one engine for its entire lifetime. Reconnecting means building
/// a new value, never repairing this one.
///
/// # Error mapping
///
/// Implementations translate transport failures into the crate's error
/// kinds:
///
/// - the service process being gone surfaces as [`crate::Error::ServiceGone`]
/// - a resolver error reply means "name not resolvable" and maps to
///   `Ok(None)` from [`NameService::resolve`], not to an error
/// - failures to establish or authenticate the connection map to
///   [`crate::Error::Connection`]
/// - anything else maps to [`crate::Error::Protocol`]
pub trait NameService {
    /// The service's fully-qualified name for this machine.
    fn local_fqdn(&self) -> Result<String>;

    /// Resolve a name to the owner currently answering for it.
    ///
    /// `Ok(None)` means nobody answers for the name and it is free to take.
    fn resolve(&self, name: &str) -> Result<Option<String>>;

    /// Create a fresh, empty record group at the service.
    fn create_group(&self) -> Result<Box<dyn RecordGroup>>;

    /// Version string of the service. Used as a liveness probe.
    fn version(&self) -> Result<String>;
}

/// One record group held at the naming service.
///
/// A group collects records that are committed and withdrawn as a unit. The
/// engine owns each group handle exclusively and is the only entity that
/// resets it.
pub trait RecordGroup {
    /// Stage a CNAME record mapping `alias` to the name encoded in `rdata`.
    fn add_cname(&self, alias: &str, rdata: &[u8], ttl: RecordTtl) -> Result<()>;

    /// Publish everything staged in this group.
    fn commit(&self) -> Result<()>;

    /// Withdraw everything this group published.
    fn reset(&self) -> Result<()>;
}
