//! DNS wire-format encoding for record data.
//!
//! A CNAME record's RDATA is the target name in DNS label format: each
//! dot-separated label prefixed by a one-byte length, the whole sequence
//! terminated by a zero byte. Plain single-byte characters only, no
//! compression pointers.

use crate::error::{Error, Result};
use crate::types::MAX_LABEL_LEN;

/// DNS class for Internet records, as sent in `AddRecord`.
pub const DNS_CLASS_IN: u16 = 0x01;

/// DNS record type for CNAME aliases, as sent in `AddRecord`.
pub const DNS_TYPE_CNAME: u16 = 0x05;

/// Encode a fully-qualified name into RDATA form.
///
/// Empty labels (doubled or trailing dots) are skipped rather than rejected,
/// matching how the naming service itself treats them. Labels that cannot be
/// encoded at all, because they are too long for a length byte or contain
/// non-ASCII bytes, are errors.
pub fn encode_fqdn(fqdn: &str) -> Result<Vec<u8>> {
    if !fqdn.is_ascii() {
        return Err(Error::invalid_name(format!("'{fqdn}' is not ASCII")));
    }

    let mut data = Vec::with_capacity(fqdn.len() + 2);
    for label in fqdn.split('.') {
        if label.is_empty() {
            continue;
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(Error::invalid_name(format!(
                "label '{label}' is {} bytes long, the limit is {MAX_LABEL_LEN}",
                label.len()
            )));
        }
        data.push(label.len() as u8);
        data.extend_from_slice(label.as_bytes());
    }

    if data.is_empty() {
        return Err(Error::invalid_name("name has no labels"));
    }

    data.push(0);
    Ok(data)
}

/// Decode RDATA back into a dotted name.
///
/// Counterpart of [`encode_fqdn`], mostly useful for tests and diagnostics.
pub fn decode_fqdn(data: &[u8]) -> Result<String> {
    let mut labels: Vec<&str> = Vec::new();
    let mut pos = 0;

    loop {
        let Some(&len) = data.get(pos) else {
            return Err(Error::protocol("record data ends without a terminator"));
        };
        pos += 1;

        if len == 0 {
            break;
        }
        let len = len as usize;
        if len > MAX_LABEL_LEN {
            return Err(Error::protocol(format!(
                "label length {len} exceeds the limit of {MAX_LABEL_LEN}"
            )));
        }

        let Some(raw) = data.get(pos..pos + len) else {
            return Err(Error::protocol("record data label is truncated"));
        };
        if !raw.is_ascii() {
            return Err(Error::protocol("record data label is not ASCII"));
        }
        // ASCII was checked above, so this cannot fail.
        let label = std::str::from_utf8(raw).map_err(|e| Error::protocol(e.to_string()))?;
        labels.push(label);
        pos += len;
    }

    if pos != data.len() {
        return Err(Error::protocol("trailing bytes after the terminator"));
    }
    if labels.is_empty() {
        return Err(Error::protocol("record data has no labels"));
    }

    Ok(labels.join("."))
}
