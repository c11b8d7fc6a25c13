//! Trusted root certificates.
//!
//! [`TrustRoots`] is either loaded from the platform trust store or from a
//! caller-supplied PEM file. It is immutable once verification starts and
//! can be shared across threads.

use crate::parser::parse_pem_certificates;
use crate::{BundleError, CertificateRecord};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use x509_parser::prelude::*;

/// Well-known CA bundle file paths, in order of preference.
pub(crate) const KNOWN_CA_BUNDLE_PATHS: &[&str] = &[
    "/etc/ssl/certs/ca-certificates.crt", // Debian/Ubuntu
    "/etc/pki/tls/certs/ca-bundle.crt",   // RHEL/CentOS/Fedora
    "/etc/ssl/ca-bundle.pem",             // openSUSE
    "/etc/ssl/cert.pem",                  // macOS, Alpine
];

/// Well-known CA certificate directory paths.
pub(crate) const KNOWN_CA_DIR_PATHS: &[&str] = &["/etc/ssl/certs"];

/// `.pem`, `.crt`, `.cer`, or an OpenSSL hash link such as `a1b2c3d4.0`.
fn is_pem_cert_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    matches!(ext, "pem" | "crt" | "cer")
        || (ext.len() == 1 && ext.bytes().next().is_some_and(|b| b.is_ascii_digit()))
}

/// The set of trusted root certificates, indexed by raw subject name.
#[derive(Clone, Default)]
pub struct TrustRoots {
    by_subject: HashMap<Vec<u8>, Vec<Vec<u8>>>,
    count: usize,
}

impl std::fmt::Debug for TrustRoots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustRoots")
            .field("count", &self.count)
            .finish()
    }
}

impl TrustRoots {
    /// An empty set; nothing verifies against it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the roots for a run: the PEM file at `explicit` if given,
    /// otherwise the platform trust store.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, BundleError> {
        match explicit {
            Some(path) => Self::from_pem_file(path),
            None => Self::system(),
        }
    }

    /// Load the platform trust store.
    ///
    /// Looks in the same places OpenSSL does:
    /// 1. the bundle file from [`find_system_ca_bundle`]
    /// 2. `SSL_CERT_DIR`, then the directory from `openssl-probe`
    /// 3. well-known certificate directories
    pub fn system() -> Result<Self, BundleError> {
        let mut roots = TrustRoots::new();

        if let Some(bundle_path) = find_system_ca_bundle() {
            match std::fs::read(&bundle_path) {
                Ok(data) => {
                    if roots.add_pem_bundle(&data) > 0 {
                        log::debug!(
                            "loaded {} system roots from {}",
                            roots.len(),
                            bundle_path.display()
                        );
                        return Ok(roots);
                    }
                }
                Err(e) => log::debug!("cannot read {}: {}", bundle_path.display(), e),
            }
        }

        let probe = openssl_probe::probe();
        let dir_candidates = std::env::var_os("SSL_CERT_DIR")
            .map(PathBuf::from)
            .into_iter()
            .chain(probe.cert_dir)
            .chain(KNOWN_CA_DIR_PATHS.iter().map(PathBuf::from));

        for dir in dir_candidates {
            if let Ok(added) = roots.add_pem_directory(&dir) {
                if added > 0 {
                    log::debug!("loaded {} system roots from {}", added, dir.display());
                    return Ok(roots);
                }
            }
        }

        Err(BundleError::PlatformStoreUnavailable(
            "no CA bundle file or certificate directory with usable roots found".into(),
        ))
    }

    /// Build roots from PEM text. Blocks that are not parseable
    /// certificates are skipped.
    pub fn from_pem(pem_data: &[u8]) -> Self {
        let mut roots = TrustRoots::new();
        roots.add_pem_bundle(pem_data);
        roots
    }

    /// Build roots from a PEM file. An unreadable file, or one without a
    /// single usable certificate, is a [`BundleError::RootsParse`].
    pub fn from_pem_file(path: &Path) -> Result<Self, BundleError> {
        let roots_error = |reason: String| BundleError::RootsParse {
            path: path.display().to_string(),
            reason,
        };

        let data = std::fs::read(path).map_err(|e| roots_error(e.to_string()))?;
        let roots = Self::from_pem(&data);
        if roots.is_empty() {
            return Err(roots_error("no certificates found".into()));
        }
        log::debug!("loaded {} roots from {}", roots.len(), path.display());
        Ok(roots)
    }

    /// Add one DER-encoded root.
    pub fn add_der(&mut self, der: &[u8]) -> Result<(), BundleError> {
        let (_, x509) = X509Certificate::from_der(der).map_err(|e| {
            BundleError::CertificateParse {
                index: self.count,
                source: crate::parser::flatten_nom(e),
            }
        })?;

        self.by_subject
            .entry(x509.subject().as_raw().to_vec())
            .or_default()
            .push(der.to_vec());
        self.count += 1;
        Ok(())
    }

    /// Add every parseable certificate from a PEM bundle and return how
    /// many were added.
    pub fn add_pem_bundle(&mut self, pem_data: &[u8]) -> usize {
        let mut added = 0;
        for der in parse_pem_certificates(pem_data) {
            match self.add_der(&der) {
                Ok(()) => added += 1,
                Err(e) => log::debug!("skipping unparseable root: {}", e),
            }
        }
        added
    }

    /// Load certificates from a directory of PEM files (like OpenSSL's -CApath).
    pub fn add_pem_directory(&mut self, dir: &Path) -> Result<usize, BundleError> {
        let mut total = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() || !is_pem_cert_file(&path) {
                continue;
            }
            if let Ok(data) = std::fs::read(&path) {
                total += self.add_pem_bundle(&data);
            }
        }
        Ok(total)
    }

    /// Trusted roots whose subject equals the given raw name.
    pub(crate) fn find_by_subject_raw(&self, subject_raw: &[u8]) -> Option<&Vec<Vec<u8>>> {
        self.by_subject.get(subject_raw)
    }

    /// Whether this exact DER encoding is a trusted root.
    pub fn contains(&self, der: &[u8]) -> bool {
        let Ok((_, x509)) = X509Certificate::from_der(der) else {
            return false;
        };
        self.find_by_subject_raw(x509.subject().as_raw())
            .is_some_and(|certs| certs.iter().any(|c| c == der))
    }

    /// Whether some trusted root has this raw subject name.
    ///
    /// Only the name is compared, so a different certificate reusing a
    /// root's subject also matches.
    pub fn contains_subject(&self, raw_subject: &[u8]) -> bool {
        self.by_subject.contains_key(raw_subject)
    }

    /// Convenience for [`Self::contains_subject`] on a parsed record.
    pub fn matches_record(&self, record: &CertificateRecord) -> bool {
        self.contains_subject(record.raw_subject())
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Find the system CA bundle path (same location OpenSSL uses).
///
/// Checks, in order:
/// 1. `SSL_CERT_FILE` environment variable
/// 2. Path discovered by `openssl-probe`
/// 3. Well-known bundle file paths ([`KNOWN_CA_BUNDLE_PATHS`])
pub fn find_system_ca_bundle() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("SSL_CERT_FILE").map(PathBuf::from) {
        if path.exists() {
            return Some(path);
        }
    }

    if let Some(file) = openssl_probe::probe().cert_file {
        if file.exists() {
            return Some(file);
        }
    }

    KNOWN_CA_BUNDLE_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}
