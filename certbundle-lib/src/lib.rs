//! certbundle-lib: Library for loading and verifying X.509 certificate bundles.
//!
//! A [`Bundle`] is an ordered list of certificates as they appear in a PEM
//! file or a TLS peer chain (leaf first, see [`fetch_peer_chain`]).
//! [`verify_bundle`] walks the bundle from its tail and checks every suffix
//! against a set of [`TrustRoots`], annotating each [`CertificateRecord`]
//! with its own outcome so that a partially valid chain can still be
//! reported certificate by certificate.

mod bundle;
mod convert;
mod display;
mod fields;
mod fingerprint;
mod oid;
mod parser;
mod remote;
mod util;
pub mod verify;

pub use bundle::Bundle;
pub use convert::der_to_pem;
pub use display::{display_text, humanize_duration, to_json};
pub use fields::{CertificateRecord, DateTime, DistinguishedName, SubjectAltNames};
pub use fingerprint::compute_fingerprint;
pub use parser::{parse_der, parse_pem_certificates};
pub use remote::{fetch_peer_chain, tls_address, TlsTarget, DEFAULT_CONNECT_TIMEOUT, TLS_PORT};
pub use util::is_pem;
pub use verify::{
    find_system_ca_bundle, unix_now, verify_bundle, CertOutcome, TrustRoots, VerifyFailure,
    VerifyOptions,
};

/// Errors returned by certbundle-lib.
///
/// Per-certificate verification failures are not errors: they are recorded
/// on the certificate as a [`VerifyFailure`].
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("failed to parse certificate #{index}: {source}")]
    CertificateParse {
        index: usize,
        #[source]
        source: x509_parser::error::X509Error,
    },

    #[error("cannot load root certificates from {path}: {reason}")]
    RootsParse { path: String, reason: String },

    #[error("platform trust store unavailable: {0}")]
    PlatformStoreUnavailable(String),

    #[error("not a host or URL: {input:?}: {reason}")]
    InvalidAddress { input: String, reason: String },

    #[error("failed to fetch certificates from {addr}: {reason}")]
    Fetch { addr: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
