// # Avahi Name Service Binding
//
// This crate binds the publisher engine to the Avahi daemon over the D-Bus
// system bus.
//
// ## Connection model
//
// One `AvahiNameService` wraps one bus connection. The connection is opened
// eagerly in `connect()` and never repaired: when Avahi (or the bus) goes
// away, every call fails with a connection-loss error and the caller is
// expected to drop the whole binding and build a new one.
//
// All calls are synchronous round-trips on the blocking zbus API. Record
// groups registered through a connection are freed by Avahi when that
// connection closes, which is also what cleans up after a crash.
//
// ## Error mapping
//
// Avahi reports "host not found" as a D-Bus error reply, not as an empty
// result, so `resolve()` folds error replies into `Ok(None)`. The one error
// reply that must not be folded is `ServiceUnknown`, which the bus itself
// raises once the daemon is gone.

use tracing::debug;

use cname_core::error::{Error, Result};
use cname_core::traits::{NameService, RecordGroup};
use cname_core::types::RecordTtl;
use cname_core::wire;

/// Well-known bus name of the Avahi daemon
const AVAHI_BUS_NAME: &str = "org.freedesktop.Avahi";

/// Object path of the Avahi server singleton
const AVAHI_SERVER_PATH: &str = "/";

/// Interface of the Avahi server singleton
const AVAHI_SERVER_INTERFACE: &str = "org.freedesktop.Avahi.Server";

/// Interface of Avahi entry group objects
const AVAHI_ENTRY_GROUP_INTERFACE: &str = "org.freedesktop.Avahi.EntryGroup";

/// Interface index wildcard: publish and resolve on every interface
const IF_UNSPEC: i32 = -1;

/// Protocol wildcard: both IPv4 and IPv6
const PROTO_UNSPEC: i32 = -1;

/// Error reply the bus sends for calls to a name nobody owns anymore
const SERVICE_UNKNOWN_ERROR: &str = "org.freedesktop.DBus.Error.ServiceUnknown";

/// Reply shape of `ResolveHostName`:
/// (interface, protocol, name, aprotocol, address, flags)
type ResolveReply = (i32, i32, String, i32, String, u32);

/// Name service implementation talking to the Avahi daemon.
pub struct AvahiNameService {
    /// System bus connection, shared with every group proxy
    conn: zbus::blocking::Connection,

    /// Proxy for the Avahi server singleton
    server: zbus::blocking::Proxy<'static>,
}

impl AvahiNameService {
    /// Open a fresh system bus connection to the Avahi daemon.
    ///
    /// Fails if the system bus is unreachable. A missing daemon is not
    /// detected here but on the first call, since the bus accepts proxies
    /// for names it cannot activate.
    pub fn connect() -> Result<Self> {
        let conn = zbus::blocking::Connection::system()
            .map_err(|e| Error::connection(format!("cannot connect to the system bus: {}", e)))?;

        let server = zbus::blocking::Proxy::new(
            &conn,
            AVAHI_BUS_NAME,
            AVAHI_SERVER_PATH,
            AVAHI_SERVER_INTERFACE,
        )
        .map_err(map_bus_error)?;

        debug!("Connected to the system bus");

        Ok(Self { conn, server })
    }
}

impl NameService for AvahiNameService {
    fn local_fqdn(&self) -> Result<String> {
        self.server
            .call("GetHostNameFqdn", &())
            .map_err(map_bus_error)
    }

    fn resolve(&self, name: &str) -> Result<Option<String>> {
        let reply: std::result::Result<ResolveReply, zbus::Error> = self.server.call(
            "ResolveHostName",
            &(IF_UNSPEC, PROTO_UNSPEC, name, PROTO_UNSPEC, 0u32),
        );

        match reply {
            // The canonical name, after following any alias chain. For a
            // name another machine aliases, this is that machine's own fqdn.
            Ok((_, _, owner, _, _, _)) => Ok(Some(owner)),
            Err(ref e) if is_service_unknown(e) => Err(Error::ServiceGone),
            Err(zbus::Error::MethodError(error_name, _, _)) => {
                // Avahi answers "no such host" with an error reply, usually
                // after its own multi-second resolution timeout
                debug!("'{}' did not resolve: {}", name, error_name);
                Ok(None)
            }
            Err(e) => Err(map_bus_error(e)),
        }
    }

    fn create_group(&self) -> Result<Box<dyn RecordGroup>> {
        let path: zbus::zvariant::OwnedObjectPath = self
            .server
            .call("EntryGroupNew", &())
            .map_err(map_bus_error)?;

        debug!("Created entry group at '{}'", path);

        let group = zbus::blocking::Proxy::new(
            &self.conn,
            AVAHI_BUS_NAME,
            path.into_inner(),
            AVAHI_ENTRY_GROUP_INTERFACE,
        )
        .map_err(map_bus_error)?;

        Ok(Box::new(AvahiRecordGroup { group }))
    }

    fn version(&self) -> Result<String> {
        self.server
            .call("GetVersionString", &())
            .map_err(map_bus_error)
    }
}

/// One Avahi entry group, holding the records of a single alias.
struct AvahiRecordGroup {
    group: zbus::blocking::Proxy<'static>,
}

impl RecordGroup for AvahiRecordGroup {
    fn add_cname(&self, alias: &str, rdata: &[u8], ttl: RecordTtl) -> Result<()> {
        // (interface, protocol, flags, name, class, type, ttl, rdata)
        self.group
            .call(
                "AddRecord",
                &(
                    IF_UNSPEC,
                    PROTO_UNSPEC,
                    0u32,
                    alias,
                    wire::DNS_CLASS_IN,
                    wire::DNS_TYPE_CNAME,
                    ttl.as_secs(),
                    rdata,
                ),
            )
            .map_err(map_bus_error)
    }

    fn commit(&self) -> Result<()> {
        self.group.call("Commit", &()).map_err(map_bus_error)
    }

    fn reset(&self) -> Result<()> {
        self.group.call("Reset", &()).map_err(map_bus_error)
    }
}

/// Whether a bus failure means the Avahi daemon has left the bus.
fn is_service_unknown(e: &zbus::Error) -> bool {
    match e {
        zbus::Error::MethodError(name, _, _) => name.as_str() == SERVICE_UNKNOWN_ERROR,
        zbus::Error::FDO(fdo) => matches!(fdo.as_ref(), zbus::fdo::Error::ServiceUnknown(_)),
        _ => false,
    }
}

/// Map a bus failure onto the engine's error taxonomy.
///
/// A vanished daemon and a dead bus connection both mean the same thing to
/// the caller: drop this binding and reconnect. Everything else is a
/// protocol error worth surfacing verbatim.
fn map_bus_error(e: zbus::Error) -> Error {
    if is_service_unknown(&e) {
        return Error::ServiceGone;
    }

    match e {
        zbus::Error::InputOutput(_) => Error::ServiceGone,
        e => Error::protocol(e.to_string()),
    }
}
