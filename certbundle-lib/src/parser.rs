//! Certificate parsing from PEM and DER.

use crate::fields::{CertificateRecord, DateTime, DistinguishedName, SubjectAltNames};
use crate::util;
use x509_parser::error::X509Error;
use x509_parser::prelude::*;

/// PEM label of the only block type a bundle is built from.
pub(crate) const PEM_CERT_LABEL: &str = "CERTIFICATE";

/// Decode PEM text into the DER payloads of its `CERTIFICATE` blocks, in
/// source order. Blocks with any other label are skipped.
///
/// Input without any PEM block yields an empty list. A malformed block is
/// logged and skipped; the blocks around it are still returned.
pub fn parse_pem_certificates(input: &[u8]) -> Vec<Vec<u8>> {
    let mut certs = Vec::new();

    for (position, pem_result) in Pem::iter_from_buffer(input).enumerate() {
        match pem_result {
            Ok(pem) if pem.label == PEM_CERT_LABEL => certs.push(pem.contents),
            Ok(pem) => log::debug!("skipping PEM block of type {}", pem.label),
            Err(e) => log::debug!("skipping malformed PEM block #{}: {}", position, e),
        }
    }

    certs
}

/// Parse one DER-encoded certificate into a [`CertificateRecord`].
///
/// The input must hold exactly one certificate; trailing bytes are rejected
/// so that the stored DER is the complete, original encoding.
pub fn parse_der(input: &[u8]) -> Result<CertificateRecord, X509Error> {
    let (remaining, x509) = X509Certificate::from_der(input).map_err(flatten_nom)?;
    if !remaining.is_empty() {
        return Err(X509Error::InvalidCertificate);
    }
    Ok(build_record(&x509, input))
}

pub(crate) fn flatten_nom(e: x509_parser::nom::Err<X509Error>) -> X509Error {
    match e {
        x509_parser::nom::Err::Error(e) | x509_parser::nom::Err::Failure(e) => e,
        x509_parser::nom::Err::Incomplete(_) => X509Error::InvalidCertificate,
    }
}

fn build_record(x509: &X509Certificate, raw_der: &[u8]) -> CertificateRecord {
    let tbs = &x509.tbs_certificate;

    let is_ca = x509
        .basic_constraints()
        .ok()
        .flatten()
        .is_some_and(|bc| bc.value.ca);

    CertificateRecord {
        serial: format_serial(tbs.raw_serial()),
        subject: build_dn(&tbs.subject),
        issuer: build_dn(&tbs.issuer),
        not_before: DateTime::from_timestamp(tbs.validity.not_before.timestamp()),
        not_after: DateTime::from_timestamp(tbs.validity.not_after.timestamp()),
        is_ca,
        san: build_san(x509),
        verified: false,
        verify_error: None,
        is_root: false,
        raw_subject: tbs.subject.as_raw().to_vec(),
        raw_issuer: tbs.issuer.as_raw().to_vec(),
        raw_der: raw_der.to_vec(),
    }
}

/// Format a serial number as a colon-separated uppercase hex string,
/// stripping leading zero bytes but keeping at least one byte.
fn format_serial(raw: &[u8]) -> String {
    let stripped = match raw.iter().position(|&b| b != 0) {
        Some(pos) => raw.get(pos..).unwrap_or(raw),
        None => raw.get(raw.len().saturating_sub(1)..).unwrap_or(raw),
    };
    util::hex_colon_upper(stripped)
}

pub(crate) fn build_dn(name: &X509Name) -> DistinguishedName {
    let mut components = Vec::new();
    for rdn in name.iter() {
        for attr in rdn.iter() {
            let key = util::oid_short_name(&attr.attr_type().to_id_string());
            let value = attr.as_str().unwrap_or("<binary>").to_string();
            components.push((key, value));
        }
    }
    DistinguishedName { components }
}

fn build_san(x509: &X509Certificate) -> SubjectAltNames {
    let mut san = SubjectAltNames::default();
    let Ok(Some(ext)) = x509.subject_alternative_name() else {
        return san;
    };
    for gn in &ext.value.general_names {
        match gn {
            GeneralName::DNSName(name) => san.dns.push(name.to_string()),
            GeneralName::RFC822Name(email) => san.email.push(email.to_string()),
            GeneralName::IPAddress(ip_bytes) => san.ip.push(format_ip_bytes(ip_bytes)),
            GeneralName::URI(uri) => san.uri.push(uri.to_string()),
            _ => {}
        }
    }
    san
}

fn format_ip_bytes(bytes: &[u8]) -> String {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        std::net::Ipv4Addr::from(octets).to_string()
    } else if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
        std::net::Ipv6Addr::from(octets).to_string()
    } else {
        hex::encode(bytes)
    }
}
