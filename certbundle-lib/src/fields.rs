//! Certificate data types.

use crate::verify::VerifyFailure;
use serde::Serialize;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// One parsed X.509 certificate plus the annotations written by a
/// verification pass.
///
/// Identity fields are fixed at parse time. The annotation fields
/// (`verified`, `verify_error`, `is_root`) are only written by
/// [`verify_bundle`](crate::verify_bundle), once per pass.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateRecord {
    /// Colon-separated uppercase hex, leading zero bytes stripped.
    pub serial: String,
    pub subject: DistinguishedName,
    pub issuer: DistinguishedName,
    pub not_before: DateTime,
    pub not_after: DateTime,
    /// BasicConstraints `cA` flag.
    pub is_ca: bool,
    /// Subject Alternative Names, grouped by kind.
    pub san: SubjectAltNames,

    pub(crate) verified: bool,
    pub(crate) verify_error: Option<VerifyFailure>,
    pub(crate) is_root: bool,

    /// DER-encoded subject name, used for trust root matching.
    #[serde(skip)]
    pub(crate) raw_subject: Vec<u8>,
    /// DER-encoded issuer name.
    #[serde(skip)]
    pub(crate) raw_issuer: Vec<u8>,
    /// Raw DER bytes of the entire certificate.
    #[serde(skip)]
    pub(crate) raw_der: Vec<u8>,
}

/// Subject Alternative Name entries, one list per name type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubjectAltNames {
    pub dns: Vec<String>,
    pub email: Vec<String>,
    pub ip: Vec<String>,
    pub uri: Vec<String>,
}

impl SubjectAltNames {
    pub fn is_empty(&self) -> bool {
        self.dns.is_empty() && self.email.is_empty() && self.ip.is_empty() && self.uri.is_empty()
    }
}

/// A distinguished name as an ordered list of `(short name, value)` pairs,
/// e.g. `("CN", "example.com")`. Unknown attribute types keep their dotted OID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistinguishedName {
    pub components: Vec<(String, String)>,
}

impl DistinguishedName {
    /// OpenSSL-style one-line form, `C = US, O = Org, CN = example.com`.
    ///
    /// Backslash, comma and equals sign inside values are backslash-escaped
    /// so the output splits unambiguously.
    pub fn to_oneline(&self) -> String {
        self.components
            .iter()
            .map(|(key, value)| format!("{} = {}", key, escape_dn_value(value)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// First value for the given short attribute name (e.g. "CN").
    pub fn get(&self, key: &str) -> Option<&str> {
        self.components
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn escape_dn_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | ',' | '=') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

impl std::fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_oneline())
    }
}

/// A point in time, kept both as a Unix timestamp and as its UTC
/// `YYYY-MM-DDTHH:MM:SSZ` rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateTime {
    pub iso8601: String,
    pub timestamp: i64,
}

const ISO8601_UTC: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
const SHORT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

impl DateTime {
    /// Timestamps outside the `time` crate's range render as the bare number.
    pub(crate) fn from_timestamp(timestamp: i64) -> Self {
        let iso8601 = OffsetDateTime::from_unix_timestamp(timestamp)
            .ok()
            .and_then(|dt| dt.format(ISO8601_UTC).ok())
            .unwrap_or_else(|| timestamp.to_string());
        DateTime { iso8601, timestamp }
    }

    /// Format as `2006-01-02 15:04:05` at the given offset, usually the
    /// local one.
    pub fn to_short(&self, offset: UtcOffset) -> String {
        OffsetDateTime::from_unix_timestamp(self.timestamp)
            .ok()
            .and_then(|dt| dt.checked_to_offset(offset))
            .and_then(|dt| dt.format(SHORT).ok())
            .unwrap_or_else(|| self.timestamp.to_string())
    }
}

impl std::fmt::Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.iso8601)
    }
}

impl CertificateRecord {
    /// Whether the last verification pass found a path to a trusted root.
    pub fn verified(&self) -> bool {
        self.verified
    }

    /// Why the last verification pass failed, if it did.
    pub fn verify_error(&self) -> Option<&VerifyFailure> {
        self.verify_error.as_ref()
    }

    /// Whether the subject matches the subject of a trusted root.
    ///
    /// This compares raw subject bytes only; it says the certificate *looks
    /// like* a known root, not that it verified. See [`Self::verified`].
    pub fn is_root(&self) -> bool {
        self.is_root
    }

    /// DER-encoded subject name.
    pub fn raw_subject(&self) -> &[u8] {
        &self.raw_subject
    }

    /// The certificate's complete DER encoding, exactly as loaded.
    pub fn raw_der(&self) -> &[u8] {
        &self.raw_der
    }

    pub fn subject_string(&self) -> String {
        self.subject.to_oneline()
    }

    pub fn issuer_string(&self) -> String {
        self.issuer.to_oneline()
    }

    /// Short human-readable name: CN, then O, then OU, else "Unknown".
    pub fn short_name(&self) -> String {
        ["CN", "O", "OU"]
            .iter()
            .find_map(|key| self.subject.get(key))
            .unwrap_or("Unknown")
            .to_string()
    }

    /// Seconds from `at` until `not_after`. Negative once expired.
    pub fn expires_in(&self, at: i64) -> i64 {
        self.not_after.timestamp.saturating_sub(at)
    }

    /// Length of the validity window in seconds.
    pub fn validity_period(&self) -> i64 {
        self.not_after
            .timestamp
            .saturating_sub(self.not_before.timestamp)
    }

    /// Colon-separated SHA-256 digest of the DER encoding.
    pub fn fingerprint(&self) -> String {
        crate::fingerprint::compute_fingerprint(&self.raw_der)
    }

    pub(crate) fn annotate(&mut self, result: Result<(), VerifyFailure>, is_root: bool) {
        match result {
            Ok(()) => {
                self.verified = true;
                self.verify_error = None;
            }
            Err(e) => {
                self.verified = false;
                self.verify_error = Some(e);
            }
        }
        self.is_root = is_root;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn oneline_escapes_separators() {
        let dn = DistinguishedName {
            components: vec![
                ("O".into(), "Acme, Inc.".into()),
                ("CN".into(), "a=b".into()),
            ],
        };
        assert_eq!(dn.to_oneline(), "O = Acme\\, Inc., CN = a\\=b");
        assert_eq!(dn.get("CN"), Some("a=b"));
        assert_eq!(dn.get("OU"), None);
    }

    #[test]
    fn datetime_formats() {
        let dt = DateTime::from_timestamp(1_394_896_200);
        assert_eq!(dt.iso8601, "2014-03-15T15:10:00Z");
        assert_eq!(dt.to_short(UtcOffset::UTC), "2014-03-15 15:10:00");
    }

    #[test]
    fn short_form_follows_offset() {
        let dt = DateTime::from_timestamp(1_394_896_200);
        let cet = UtcOffset::from_hms(1, 0, 0).unwrap();
        assert_eq!(dt.to_short(cet), "2014-03-15 16:10:00");
        let pst = UtcOffset::from_hms(-8, 0, 0).unwrap();
        assert_eq!(dt.to_short(pst), "2014-03-15 07:10:00");
    }
}
