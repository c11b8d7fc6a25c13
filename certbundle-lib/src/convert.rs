//! PEM <-> DER format conversion.

use crate::parser::PEM_CERT_LABEL;
use crate::util;

/// Convert DER-encoded certificate bytes to a PEM string.
///
/// The base64 body is wrapped at 64 columns and the block ends with a newline.
pub fn der_to_pem(der: &[u8]) -> String {
    format!(
        "-----BEGIN {label}-----\n{}\n-----END {label}-----\n",
        util::base64_wrap(der),
        label = PEM_CERT_LABEL
    )
}
