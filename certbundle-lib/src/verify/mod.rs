//! Per-certificate verification of a bundle against a trust store.
//!
//! A bundle is verified from its tail towards its head. In chain mode the
//! certificate at index `i` is validated with every certificate after it as
//! the untrusted intermediate pool, so the root-most certificate is checked
//! alone and each step towards the leaf gets more intermediates. Every
//! certificate keeps its own outcome: a chain whose leaf is expired still
//! reports its intermediate and root as verified.
//!
//! Path validation checks validity windows, issuer signatures (through
//! x509-parser's `verify` feature), CA constraints on intermediates, and
//! trust anchoring in [`TrustRoots`].

mod chain;
mod checks;
mod helpers;
mod trust_store;

use crate::bundle::Bundle;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use x509_parser::prelude::*;

pub use trust_store::{find_system_ca_bundle, TrustRoots};

use chain::validate_path;

/// Why a single certificate failed verification.
///
/// Stored on the [`CertificateRecord`](crate::CertificateRecord); never
/// aborts the verification pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerifyFailure {
    #[error("certificate has expired: current time {at} is after {not_after} ({subject})")]
    Expired {
        subject: String,
        not_after: String,
        at: String,
    },

    #[error("certificate is not yet valid: current time {at} is before {not_before} ({subject})")]
    NotYetValid {
        subject: String,
        not_before: String,
        at: String,
    },

    #[error("certificate signed by unknown authority {issuer}{}", hint_suffix(.hint))]
    UnknownAuthority {
        subject: String,
        issuer: String,
        hint: Option<String>,
    },

    #[error("certificate ({subject}) is not authorized to sign other certificates: {reason}")]
    NotAuthorizedToSign { subject: String, reason: String },

    #[error("certificate ({subject}) path length constraint violated (pathlen={path_len}, intermediates below={intermediates})")]
    PathLenExceeded {
        subject: String,
        path_len: u32,
        intermediates: u32,
    },

    #[error("certificate could not be decoded for verification: {reason}")]
    Malformed { reason: String },
}

fn hint_suffix(hint: &Option<String>) -> String {
    hint.as_ref()
        .map(|h| format!(" (possibly because of {})", h))
        .unwrap_or_default()
}

/// Options controlling a verification pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyOptions {
    /// Validate each certificate with the certificates after it as
    /// intermediates. When `false`, every certificate is validated alone,
    /// which suits unordered CA bundles.
    pub as_chain: bool,
    /// Verify at a specific Unix timestamp instead of the current time.
    pub at_time: Option<i64>,
}

/// Outcome for one bundle index, as produced by [`verify_bundle`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertOutcome {
    /// Position in the bundle (0 = leaf).
    pub index: usize,
    pub verified: bool,
    pub error: Option<VerifyFailure>,
    /// Raw-subject match against a trusted root; independent of `verified`.
    pub is_root: bool,
}

/// Current wall-clock time as a Unix timestamp.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Verify every certificate of `bundle` against `roots` and annotate it.
///
/// Walks the bundle from the last index to the first. Each index is
/// processed exactly once, failures never stop the walk, and each record's
/// `verified`, `verify_error` and `is_root` annotations are overwritten, so
/// calling this again with the same arguments yields the same annotations.
///
/// Returns the outcomes in bundle order. An empty bundle yields no outcomes.
pub fn verify_bundle(
    bundle: &mut Bundle,
    roots: &TrustRoots,
    options: &VerifyOptions,
) -> Vec<CertOutcome> {
    let at = options.at_time.unwrap_or_else(unix_now);
    let outcomes = evaluate(bundle, roots, options.as_chain, at);

    for (record, outcome) in bundle.records_mut().iter_mut().zip(&outcomes) {
        let result = match &outcome.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        };
        record.annotate(result, outcome.is_root);
    }

    outcomes
}

fn evaluate(bundle: &Bundle, roots: &TrustRoots, as_chain: bool, at: i64) -> Vec<CertOutcome> {
    let parsed: Vec<Option<(&[u8], X509Certificate)>> = bundle
        .iter()
        .map(|record| {
            X509Certificate::from_der(&record.raw_der)
                .ok()
                .map(|(_, x509)| (record.raw_der.as_slice(), x509))
        })
        .collect();

    let mut outcomes = Vec::with_capacity(bundle.len());

    for (index, record) in bundle.iter().enumerate().rev() {
        let result = match parsed.get(index) {
            Some(Some((der, x509))) => {
                let pool: Vec<&(&[u8], X509Certificate)> = if as_chain {
                    parsed
                        .get(index + 1..)
                        .unwrap_or_default()
                        .iter()
                        .flatten()
                        .collect()
                } else {
                    Vec::new()
                };
                validate_path(x509, der, &pool, roots, at).map(|_| ())
            }
            _ => Err(VerifyFailure::Malformed {
                reason: format!("certificate #{} no longer parses", index),
            }),
        };

        if let Err(e) = &result {
            log::debug!(
                "failed to verify chain part at {}: {}",
                record.subject_string(),
                e
            );
        }

        let is_root = roots.matches_record(record);
        outcomes.push(CertOutcome {
            index,
            verified: result.is_ok(),
            error: result.err(),
            is_root,
        });
    }

    outcomes.reverse();
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bundle_is_a_no_op() {
        let mut bundle = Bundle::default();
        let outcomes = verify_bundle(
            &mut bundle,
            &TrustRoots::new(),
            &VerifyOptions {
                as_chain: true,
                at_time: Some(0),
            },
        );
        assert!(outcomes.is_empty());
        assert!(bundle.is_empty());
    }

    #[test]
    fn unknown_authority_message_includes_hint() {
        let failure = VerifyFailure::UnknownAuthority {
            subject: "CN = leaf".into(),
            issuer: "CN = ca".into(),
            hint: Some("bad signature".into()),
        };
        assert_eq!(
            failure.to_string(),
            "certificate signed by unknown authority CN = ca (possibly because of bad signature)"
        );
    }
}
