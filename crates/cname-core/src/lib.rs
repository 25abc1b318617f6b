// # cname-core
//
// Core library for the mDNS CNAME publisher.
//
// ## Architecture Overview
//
// This library provides everything needed to publish CNAME aliases for the
// local host on an mDNS naming service, minus the RPC transport itself:
//
// - **HostName / RecordTtl**: validated input types
// - **wire**: DNS wire-format encoding for record data
// - **NameService / RecordGroup**: traits over the naming service's remote
//   control surface, implemented by a binding crate (or by test doubles)
// - **CnamePublisher**: the engine that collision-checks, registers, tracks
//   and withdraws aliases over one exclusively-owned connection
//
// ## Design Principles
//
// 1. **Synchronous and single-threaded**: every operation is one blocking
//    round-trip; reconnection means constructing a fresh engine
// 2. **Transport-agnostic core**: the engine never sees the bus, only the
//    `NameService` seam
// 3. **Errors as values**: conflict, service-gone and not-published are
//    distinct error kinds callers match on, not swallowed conditions

pub mod engine;
pub mod error;
pub mod traits;
pub mod types;
pub mod wire;

// Re-export core types for convenience
pub use engine::CnamePublisher;
pub use error::{Error, Result};
pub use traits::{NameService, RecordGroup};
pub use types::{HostName, RecordTtl};
