//! Small helper functions for certificate verification.

use crate::parser::build_dn;
use x509_parser::prelude::*;

/// Check if a certificate is self-issued (subject == issuer).
///
/// RFC 5280 Section 6.1: self-issued intermediates do not count toward
/// pathLenConstraint.
pub(crate) fn is_self_issued(cert: &X509Certificate) -> bool {
    cert.subject().as_raw() == cert.issuer().as_raw()
}

pub(crate) fn subject_oneline(cert: &X509Certificate) -> String {
    build_dn(cert.subject()).to_oneline()
}

pub(crate) fn issuer_oneline(cert: &X509Certificate) -> String {
    build_dn(cert.issuer()).to_oneline()
}
