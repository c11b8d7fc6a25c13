//! Ordered certificate bundles.

use crate::convert::der_to_pem;
use crate::fields::CertificateRecord;
use crate::parser::{parse_der, parse_pem_certificates};
use crate::BundleError;
use serde::Serialize;

/// An ordered list of certificates loaded from one source.
///
/// When the bundle is a chain (a TLS peer chain or a "fullchain" file),
/// index 0 is the leaf and the last index is the most root-ward certificate.
/// A bundle of unrelated certificates, such as a CA list, is equally valid;
/// order only matters when it is verified as a chain.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Bundle {
    certs: Vec<CertificateRecord>,
}

impl Bundle {
    /// Assemble a bundle from DER blocks in source order.
    ///
    /// Fails on the first block that is not a well-formed certificate; no
    /// partial bundle is returned.
    pub fn from_der_blocks<I, B>(blocks: I) -> Result<Self, BundleError>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let certs = blocks
            .into_iter()
            .enumerate()
            .map(|(index, der)| {
                parse_der(der.as_ref())
                    .map_err(|source| BundleError::CertificateParse { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Bundle { certs })
    }

    /// Decode PEM text and assemble a bundle from its `CERTIFICATE` blocks.
    pub fn from_pem(input: &[u8]) -> Result<Self, BundleError> {
        let blocks = parse_pem_certificates(input);
        log::debug!("decoded {} certificate block(s)", blocks.len());
        Self::from_der_blocks(blocks)
    }

    /// Re-encode every certificate as a PEM block, in bundle order.
    ///
    /// The DER payloads are reproduced exactly; line wrapping is normalized.
    pub fn to_pem(&self) -> String {
        self.certs
            .iter()
            .map(|c| der_to_pem(&c.raw_der))
            .collect()
    }

    /// Whether the certificates appear to form a chain (certificate 0's
    /// issuer is certificate 1's subject) rather than an unrelated list.
    ///
    /// Bundles with zero or one certificate count as chains.
    pub fn looks_like_chain(&self) -> bool {
        match (self.certs.first(), self.certs.get(1)) {
            (Some(first), Some(second)) => first.raw_issuer == second.raw_subject,
            _ => true,
        }
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CertificateRecord> {
        self.certs.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CertificateRecord> {
        self.certs.iter()
    }

    pub fn as_slice(&self) -> &[CertificateRecord] {
        &self.certs
    }

    pub(crate) fn records_mut(&mut self) -> &mut [CertificateRecord] {
        &mut self.certs
    }
}

impl<'a> IntoIterator for &'a Bundle {
    type Item = &'a CertificateRecord;
    type IntoIter = std::slice::Iter<'a, CertificateRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.certs.iter()
    }
}
