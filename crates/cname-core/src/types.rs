//! Validated input types: host names and record TTLs.
//!
//! Everything the engine accepts from the outside is validated here, so the
//! encoder and the RPC binding can assume well-formed values.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Reserved domain all published aliases must live under.
pub const LOCAL_SUFFIX: &str = "local";

/// DNS label length limit, in bytes.
pub const MAX_LABEL_LEN: usize = 63;

/// DNS name length limit, in bytes.
pub const MAX_NAME_LEN: usize = 253;

/// Default time-to-live for published records, in seconds.
pub const DEFAULT_TTL_SECS: u32 = 60;

/// A validated, lower-cased, fully-qualified host name ending in `.local`.
///
/// Each label starts with a letter or digit and may contain letters, digits,
/// hyphens and underscores. Subdomains are allowed (`db.office.local`).
/// Validation happens once, on construction; the rest of the crate treats the
/// inner string as trusted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostName(String);

impl HostName {
    /// Validate and normalize a host name.
    ///
    /// Input is lower-cased first, so `Office.LOCAL` and `office.local` are
    /// the same name.
    pub fn parse(input: &str) -> Result<Self> {
        let name = input.to_ascii_lowercase();

        if name.is_empty() {
            return Err(Error::invalid_name("name is empty"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(Error::invalid_name(format!(
                "'{input}' is {} bytes long, the limit is {MAX_NAME_LEN}",
                name.len()
            )));
        }

        let Some(prefix) = name
            .strip_suffix(LOCAL_SUFFIX)
            .and_then(|p| p.strip_suffix('.'))
        else {
            return Err(Error::invalid_name(format!(
                "'{input}' does not end in .{LOCAL_SUFFIX}"
            )));
        };

        for label in prefix.split('.') {
            check_label(label, input)?;
        }

        Ok(Self(name))
    }

    /// The normalized name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn check_label(label: &str, input: &str) -> Result<()> {
    if label.is_empty() {
        return Err(Error::invalid_name(format!("'{input}' has an empty label")));
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(Error::invalid_name(format!(
            "label '{label}' is {} bytes long, the limit is {MAX_LABEL_LEN}",
            label.len()
        )));
    }

    let bytes = label.as_bytes();
    if !bytes[0].is_ascii_alphanumeric() {
        return Err(Error::invalid_name(format!(
            "label '{label}' must start with a letter or digit"
        )));
    }
    if let Some(bad) = bytes
        .iter()
        .find(|b| !(b.is_ascii_alphanumeric() || **b == b'-' || **b == b'_'))
    {
        return Err(Error::invalid_name(format!(
            "label '{label}' contains invalid byte 0x{bad:02x}"
        )));
    }

    Ok(())
}

impl FromStr for HostName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for HostName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HostName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Time-to-live advertised with every record one engine publishes.
///
/// Fixed per engine instance, always greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordTtl(u32);

impl RecordTtl {
    /// Build a TTL from whole seconds, rejecting zero.
    pub fn from_secs(secs: u32) -> Result<Self> {
        if secs == 0 {
            return Err(Error::invalid_ttl("TTL must be greater than zero"));
        }
        Ok(Self(secs))
    }

    /// The TTL in seconds, as sent on the wire.
    pub fn as_secs(self) -> u32 {
        self.0
    }
}

impl Default for RecordTtl {
    fn default() -> Self {
        Self(DEFAULT_TTL_SECS)
    }
}

impl FromStr for RecordTtl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let secs: u32 = s
            .trim()
            .parse()
            .map_err(|_| Error::invalid_ttl(format!("'{s}' is not a whole number of seconds")))?;
        Self::from_secs(secs)
    }
}

impl fmt::Display for RecordTtl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
