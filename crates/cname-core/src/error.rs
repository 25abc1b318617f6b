//! Error types for the CNAME publisher
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

use crate::types::HostName;

/// Result type alias for publisher operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the CNAME publisher
#[derive(Error, Debug)]
pub enum Error {
    /// The naming service cannot be reached or refused the connection
    #[error("cannot reach the naming service: {0}")]
    Connection(String),

    /// The alias is already owned by a different machine
    #[error("'{name}' is already owned by '{owner}'")]
    Conflict {
        /// The alias that was being published
        name: HostName,
        /// The machine currently answering for it
        owner: String,
    },

    /// The naming service process disappeared mid-session
    #[error("the naming service is gone")]
    ServiceGone,

    /// Unpublish was asked for an alias this engine never published
    #[error("'{0}' is not currently published")]
    NotPublished(HostName),

    /// A host name failed validation
    #[error("invalid host name: {0}")]
    InvalidName(String),

    /// A record TTL failed validation
    #[error("invalid TTL: {0}")]
    InvalidTtl(String),

    /// Any other RPC failure
    #[error("naming service protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create an invalid host name error
    pub fn invalid_name(msg: impl Into<String>) -> Self {
        Self::InvalidName(msg.into())
    }

    /// Create an invalid TTL error
    pub fn invalid_ttl(msg: impl Into<String>) -> Self {
        Self::InvalidTtl(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// True when the error means the connection to the naming service is no
    /// longer usable and the engine instance should be discarded.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::ServiceGone)
    }

    /// True when the error is a per-name conflict with another machine.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
