//! Fetching the certificate chain a TLS server presents.

use crate::bundle::Bundle;
use crate::BundleError;
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Port every remote target is dialed on.
pub const TLS_PORT: u16 = 443;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A host to fetch a peer chain from, plus the `host:443` address to dial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsTarget {
    /// Host name or IP literal, without brackets. Used for SNI.
    pub host: String,
    pub addr: String,
}

/// Reduce a URL or bare host to the address of its TLS endpoint.
///
/// The scheme, user info, path, query and fragment are dropped, and so is
/// any explicit port: the result always uses port 443.
///
/// ```
/// let target = certbundle_lib::tls_address("https://example.com:8443/a?b#c").unwrap();
/// assert_eq!(target.addr, "example.com:443");
/// ```
pub fn tls_address(input: &str) -> Result<TlsTarget, BundleError> {
    let invalid = |reason: &str| BundleError::InvalidAddress {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let rest = ["https://", "http://", "//"]
        .iter()
        .find_map(|scheme| input.strip_prefix(scheme))
        .unwrap_or(input);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);

    let host = match host_port.strip_prefix('[') {
        Some(literal) => literal
            .split_once(']')
            .map(|(h, _)| h)
            .ok_or_else(|| invalid("unterminated IPv6 literal"))?,
        None => host_port.split(':').next().unwrap_or_default(),
    };

    if host.is_empty() {
        return Err(invalid("missing host"));
    }
    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | ':'))
    {
        return Err(invalid("invalid character in host"));
    }

    let addr = if host.contains(':') {
        format!("[{}]:{}", host, TLS_PORT)
    } else {
        format!("{}:{}", host, TLS_PORT)
    };
    Ok(TlsTarget {
        host: host.to_string(),
        addr,
    })
}

/// Connect to `target` and build a bundle from the certificates the server
/// presents, leaf first.
///
/// The server's chain is not checked during the handshake; run
/// [`verify_bundle`](crate::verify_bundle) on the result instead.
pub fn fetch_peer_chain(target: &TlsTarget, timeout: Duration) -> Result<Bundle, BundleError> {
    let fetch_error = |reason: String| BundleError::Fetch {
        addr: target.addr.clone(),
        reason,
    };

    let tcp = connect_tcp(&target.addr, timeout).map_err(|e| fetch_error(e.to_string()))?;
    tcp.set_read_timeout(Some(timeout))
        .and_then(|()| tcp.set_write_timeout(Some(timeout)))
        .map_err(|e| fetch_error(e.to_string()))?;

    let mut builder =
        SslConnector::builder(SslMethod::tls()).map_err(|e| fetch_error(e.to_string()))?;
    builder.set_verify(SslVerifyMode::NONE);
    let stream = builder
        .build()
        .configure()
        .map_err(|e| fetch_error(e.to_string()))?
        .verify_hostname(false)
        .connect(&target.host, tcp)
        .map_err(|e| fetch_error(format!("TLS handshake failed: {}", e)))?;

    // On the client side the peer chain starts with the leaf.
    let ders = match stream.ssl().peer_cert_chain() {
        Some(chain) => chain
            .iter()
            .map(|cert| cert.to_der())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| fetch_error(e.to_string()))?,
        None => Vec::new(),
    };
    log::debug!("{} presented {} certificate(s)", target.addr, ders.len());

    Bundle::from_der_blocks(ders)
}

/// Try every resolved address in turn, keeping the last error.
fn connect_tcp(addr: &str, timeout: Duration) -> std::io::Result<TcpStream> {
    let mut last_err = None;
    for socket_addr in addr.to_socket_addrs()? {
        match TcpStream::connect_timeout(&socket_addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                log::debug!("connect to {} failed: {}", socket_addr, e);
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "host resolved to no addresses")
    }))
}
