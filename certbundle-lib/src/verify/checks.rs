//! Per-certificate checks applied while building a path.

use super::helpers::subject_oneline;
use super::VerifyFailure;
use crate::fields::DateTime;
use x509_parser::prelude::*;

/// Check that `at` falls inside the validity window (bounds inclusive).
pub(crate) fn check_validity(cert: &X509Certificate, at: i64) -> Result<(), VerifyFailure> {
    let not_before = cert.validity().not_before.timestamp();
    let not_after = cert.validity().not_after.timestamp();
    if at < not_before {
        return Err(VerifyFailure::NotYetValid {
            subject: subject_oneline(cert),
            not_before: DateTime::from_timestamp(not_before).iso8601,
            at: DateTime::from_timestamp(at).iso8601,
        });
    }
    if at > not_after {
        return Err(VerifyFailure::Expired {
            subject: subject_oneline(cert),
            not_after: DateTime::from_timestamp(not_after).iso8601,
            at: DateTime::from_timestamp(at).iso8601,
        });
    }
    Ok(())
}

/// Checks for an untrusted intermediate acting as an issuer: it must be a
/// CA, may carry keyCertSign restrictions, and bounds the path below it.
pub(crate) fn check_intermediate(cert: &X509Certificate, below: u32) -> Result<(), VerifyFailure> {
    match cert.basic_constraints().ok().flatten().map(|bc| bc.value) {
        Some(bc) if bc.ca => {}
        Some(_) => {
            return Err(VerifyFailure::NotAuthorizedToSign {
                subject: subject_oneline(cert),
                reason: "BasicConstraints cA is false".into(),
            })
        }
        None => {
            return Err(VerifyFailure::NotAuthorizedToSign {
                subject: subject_oneline(cert),
                reason: "no BasicConstraints extension".into(),
            })
        }
    }

    // RFC 5280 Section 4.2.1.3: a CA signing certificates needs keyCertSign
    // when Key Usage is present at all.
    if let Ok(Some(ku)) = cert.key_usage() {
        if !ku.value.key_cert_sign() {
            return Err(VerifyFailure::NotAuthorizedToSign {
                subject: subject_oneline(cert),
                reason: "Key Usage does not include keyCertSign".into(),
            });
        }
    }

    check_path_len(cert, below)
}

/// RFC 5280 Section 6.1.4(l)-(m): `below` non-self-issued intermediates may
/// sit under an issuer whose pathLenConstraint is at least `below`.
pub(crate) fn check_path_len(cert: &X509Certificate, below: u32) -> Result<(), VerifyFailure> {
    let path_len = cert
        .basic_constraints()
        .ok()
        .flatten()
        .and_then(|bc| bc.value.path_len_constraint);
    match path_len {
        Some(limit) if below > limit => Err(VerifyFailure::PathLenExceeded {
            subject: subject_oneline(cert),
            path_len: limit,
            intermediates: below,
        }),
        _ => Ok(()),
    }
}
