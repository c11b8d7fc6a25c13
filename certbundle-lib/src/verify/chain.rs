//! Path validation via DFS over trusted roots and untrusted intermediates.
//!
//! From the target certificate, each step looks for an issuer whose subject
//! matches the current issuer name: trusted roots first, then unused
//! intermediates from the pool. A candidate is accepted once its signature
//! over the current certificate checks out and it passes the CA checks in
//! [`super::checks`]. Rejected candidates are remembered so a failed search
//! can report the most specific reason instead of a generic "unknown
//! authority".

use super::checks::{check_intermediate, check_path_len, check_validity};
use super::helpers::{is_self_issued, issuer_oneline, subject_oneline};
use super::{TrustRoots, VerifyFailure};
use x509_parser::error::X509Error;
use x509_parser::prelude::*;

/// Maximum chain depth to prevent runaway searches through looping pools.
pub(crate) const MAX_CHAIN_DEPTH: usize = 32;

/// A certificate from the bundle together with its original DER.
pub(crate) type PoolEntry<'a> = (&'a [u8], X509Certificate<'a>);

/// What a failed search learned about the candidates it rejected.
#[derive(Default)]
struct Rejections {
    last: Option<VerifyFailure>,
    signature_hint: Option<String>,
}

/// Validate `target` against `roots`, using `pool` as untrusted
/// intermediates. Returns the length of the path found, target and trust
/// anchor included.
pub(crate) fn validate_path(
    target: &X509Certificate,
    target_der: &[u8],
    pool: &[&PoolEntry],
    roots: &TrustRoots,
    at: i64,
) -> Result<usize, VerifyFailure> {
    check_validity(target, at)?;

    // A certificate that is itself a trust anchor is its own path.
    if roots.contains(target_der) {
        return Ok(1);
    }

    let mut used = vec![false; pool.len()];
    let mut rejections = Rejections::default();

    match dfs_validate(target, target_der, 1, 0, &mut used, pool, roots, at, &mut rejections) {
        Some(len) => Ok(len),
        None => Err(rejections
            .last
            .unwrap_or_else(|| VerifyFailure::UnknownAuthority {
                subject: subject_oneline(target),
                issuer: issuer_oneline(target),
                hint: rejections.signature_hint,
            })),
    }
}

/// DFS recursive helper. `depth` counts certificates on the current path;
/// `below` counts non-self-issued intermediates already on it, which is
/// what a pathLenConstraint bounds.
#[allow(clippy::indexing_slicing)] // used[idx] safe: idx from pool.iter().enumerate(), same len
#[allow(clippy::too_many_arguments)]
fn dfs_validate(
    current: &X509Certificate,
    current_der: &[u8],
    depth: usize,
    below: u32,
    used: &mut [bool],
    pool: &[&PoolEntry],
    roots: &TrustRoots,
    at: i64,
    rejections: &mut Rejections,
) -> Option<usize> {
    let issuer_raw = current.issuer().as_raw();

    // Trust anchors terminate the path.
    if let Some(candidates) = roots.find_by_subject_raw(issuer_raw) {
        for root_der in candidates {
            let Ok((_, root)) = X509Certificate::from_der(root_der) else {
                continue;
            };
            if let Err(e) = current.verify_signature(Some(root.public_key())) {
                rejections.note_signature(&root, &e);
                continue;
            }
            match check_validity(&root, at).and_then(|()| check_path_len(&root, below)) {
                Ok(()) => return Some(depth + 1),
                Err(f) => rejections.last = Some(f),
            }
        }
    }

    if depth >= MAX_CHAIN_DEPTH {
        return None;
    }

    for (idx, (der, cert)) in pool.iter().map(|entry| (entry.0, &entry.1)).enumerate() {
        if used[idx] || der == current_der {
            continue;
        }
        if cert.subject().as_raw() != issuer_raw {
            continue;
        }
        if let Err(e) = current.verify_signature(Some(cert.public_key())) {
            rejections.note_signature(cert, &e);
            continue;
        }
        if let Err(f) = check_validity(cert, at).and_then(|()| check_intermediate(cert, below)) {
            rejections.last = Some(f);
            continue;
        }

        let next_below = if is_self_issued(cert) { below } else { below + 1 };

        used[idx] = true;
        if let Some(len) = dfs_validate(
            cert, der, depth + 1, next_below, used, pool, roots, at, rejections,
        ) {
            return Some(len);
        }
        used[idx] = false;
    }

    None
}

impl Rejections {
    fn note_signature(&mut self, candidate: &X509Certificate, err: &X509Error) {
        log::trace!(
            "signature check against candidate issuer {} failed: {}",
            subject_oneline(candidate),
            err
        );
        self.signature_hint = Some(format!(
            "\"{}\" while trying to verify candidate authority certificate \"{}\"",
            err,
            subject_oneline(candidate)
        ));
    }
}
