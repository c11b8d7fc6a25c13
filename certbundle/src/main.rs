//! certbundle: show which certificates of a PEM bundle verify.

use anyhow::{Context, Result};
use certbundle_lib::{Bundle, TrustRoots, VerifyOptions};
use clap::Parser;
use rayon::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

#[derive(Parser)]
#[command(
    name = "certbundle",
    version,
    about = "Inspect X.509 certificate bundles and show which parts of the chain verify",
    long_about = "certbundle reads a PEM bundle (a certificate chain with the leaf first,\n\
                  or an unordered list of CA certificates) and verifies every\n\
                  certificate in it against a set of trusted roots. When FILE is not\n\
                  an existing path it is taken as a host or URL, and the chain the\n\
                  server presents on port 443 is verified instead.\n\n\
                  Chains are verified from the tail: each certificate is checked with\n\
                  the certificates after it as intermediates, so a broken leaf does not\n\
                  hide a valid intermediate.",
    after_help = "EXAMPLES:\n\
                  \n  certbundle fullchain.pem\
                  \n  certbundle https://example.com\
                  \n  certbundle --roots ca.pem --time 2024-06-01T00:00:00Z chain.pem\
                  \n  certbundle --nochain /etc/ssl/certs/ca-certificates.crt\
                  \n  certbundle --json chain.pem\
                  \n  certbundle -R --failures-only /etc/letsencrypt/live\
                  \n  cat chain.pem | certbundle -"
)]
struct Cli {
    /// PEM bundle, directory of bundles, or host/URL to fetch the chain from.
    /// Reads stdin when omitted or "-".
    file: Option<PathBuf>,
    /// Verify at this time (RFC 3339) instead of now
    #[arg(short, long, value_name = "TIME", value_parser = parse_rfc3339)]
    time: Option<i64>,
    /// Verify every certificate on its own instead of as a chain
    #[arg(short = 'n', long = "nochain")]
    no_chain: bool,
    /// PEM file with trusted root certificates (default: system trust store)
    #[arg(short, long, value_name = "FILE")]
    roots: Option<PathBuf>,
    /// Print the bundle as PEM instead of text
    #[arg(short, long, conflicts_with = "json")]
    pem: bool,
    /// Print the annotated bundle as JSON
    #[arg(long)]
    json: bool,
    /// Log verification details to stderr
    #[arg(short, long)]
    verbose: bool,
    /// Recurse into subdirectories (directory mode)
    #[arg(short = 'R', long)]
    recurse: bool,
    /// Only print failures (directory mode)
    #[arg(long)]
    failures_only: bool,
    /// Connect and handshake timeout when fetching from a host
    #[arg(long, value_name = "DURATION", default_value = "5s", value_parser = humantime::parse_duration)]
    connect_timeout: Duration,
}

/// Maximum file size for bundle inputs (10 MiB).
const MAX_INPUT_BYTES: u64 = 10 * 1024 * 1024;

fn parse_rfc3339(s: &str) -> std::result::Result<i64, String> {
    OffsetDateTime::parse(s, &Rfc3339)
        .map(|t| t.unix_timestamp())
        .map_err(|e| format!("expected an RFC 3339 time such as 2024-06-01T00:00:00Z: {}", e))
}

fn is_stdin(file: Option<&PathBuf>) -> bool {
    file.map_or(true, |p| p.as_os_str() == "-")
}

fn read_input(file: Option<&PathBuf>) -> Result<Vec<u8>> {
    match file.filter(|_| !is_stdin(file)) {
        Some(path) => {
            let meta = std::fs::metadata(path)
                .with_context(|| format!("Failed to stat file: {}", path.display()))?;
            if meta.len() > MAX_INPUT_BYTES {
                anyhow::bail!(
                    "File too large ({} bytes, max {} bytes): {}",
                    meta.len(),
                    MAX_INPUT_BYTES,
                    path.display()
                );
            }
            std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .take(MAX_INPUT_BYTES)
                .read_to_end(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

/// A FILE argument that names no existing path is a host or URL to fetch
/// from.
fn remote_target(file: Option<&PathBuf>) -> Option<String> {
    let path = file.filter(|_| !is_stdin(file))?;
    match std::fs::metadata(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Some(path.to_string_lossy().into_owned())
        }
        _ => None,
    }
}

fn load_bundle(cli: &Cli) -> Result<Bundle> {
    if let Some(target) = remote_target(cli.file.as_ref()) {
        let target = certbundle_lib::tls_address(&target)?;
        log::debug!("fetching peer chain from {}", target.addr);
        return certbundle_lib::fetch_peer_chain(&target, cli.connect_timeout)
            .context("loading bundle");
    }

    let input = read_input(cli.file.as_ref())?;
    let bundle = Bundle::from_pem(&input).context("loading bundle")?;
    if bundle.is_empty() {
        if !input.is_empty() && !certbundle_lib::is_pem(&input) {
            log::warn!("input does not look like PEM; only PEM bundles are read");
        } else {
            log::warn!("no certificates found in input");
        }
    }
    Ok(bundle)
}

/// Chain mode only makes sense for more than one certificate.
fn verify_options(bundle: &Bundle, no_chain: bool, at_time: Option<i64>) -> VerifyOptions {
    VerifyOptions {
        as_chain: bundle.len() > 1 && !no_chain,
        at_time,
    }
}

/// Check if a path has a PEM bundle extension (.pem, .crt, .cer).
fn is_bundle_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case("pem")
            || ext.eq_ignore_ascii_case("crt")
            || ext.eq_ignore_ascii_case("cer")
    )
}

/// Find all bundle files in a directory, sorted by path.
fn find_bundle_files(dir: &Path, recurse: bool) -> Vec<PathBuf> {
    let walker = if recurse {
        walkdir::WalkDir::new(dir)
    } else {
        walkdir::WalkDir::new(dir).max_depth(1)
    };
    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_bundle_file(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Summary of one file in directory mode.
struct BatchResult {
    path: String,
    pass: bool,
    detail: String,
}

fn verify_file(path: &Path, roots: &TrustRoots, no_chain: bool, at_time: Option<i64>) -> BatchResult {
    let label = path.display().to_string();
    let fail = |detail: String| BatchResult {
        path: label.clone(),
        pass: false,
        detail,
    };

    let data = match read_input(Some(&path.to_path_buf())) {
        Ok(d) => d,
        Err(e) => return fail(format!("FAIL ({:#})", e)),
    };
    let mut bundle = match Bundle::from_pem(&data) {
        Ok(b) => b,
        Err(e) => return fail(format!("FAIL ({})", e)),
    };

    let options = verify_options(&bundle, no_chain, at_time);
    let outcomes = certbundle_lib::verify_bundle(&mut bundle, roots, &options);

    let failed: Vec<String> = outcomes
        .iter()
        .filter_map(|o| {
            let cert = bundle.get(o.index)?;
            let err = o.error.as_ref()?;
            Some(format!("[{}] {}: {}", o.index, cert.short_name(), err))
        })
        .collect();

    if failed.is_empty() {
        BatchResult {
            path: label.clone(),
            pass: true,
            detail: format!("OK ({} certificates)", bundle.len()),
        }
    } else {
        fail(format!("FAIL {}", failed.join("; ")))
    }
}

/// Verify files in parallel, printing `filename: result`.
///
/// Returns the number of failed files.
fn run_batch(files: &[PathBuf], failures_only: bool, op: impl Fn(&Path) -> BatchResult + Sync) -> usize {
    let results: Vec<BatchResult> = files.par_iter().map(|f| op(f)).collect();

    let mut failures = 0;
    for r in &results {
        if !r.pass {
            failures += 1;
        } else if failures_only {
            continue;
        }
        if r.pass {
            println!("{}: {}", r.path, r.detail);
        } else {
            eprintln!("{}: {}", r.path, r.detail);
        }
    }
    failures
}

fn main() -> Result<()> {
    // Read before any thread is spawned; the lookup refuses to run otherwise.
    let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Some(dir) = cli.file.as_ref().filter(|p| p.is_dir()) {
        let files = find_bundle_files(dir, cli.recurse);
        if files.is_empty() {
            anyhow::bail!("No certificate files found in {}", dir.display());
        }
        let roots = TrustRoots::resolve(cli.roots.as_deref())?;
        log::debug!("verifying {} files against {} roots", files.len(), roots.len());

        let failures = run_batch(&files, cli.failures_only, |f| {
            verify_file(f, &roots, cli.no_chain, cli.time)
        });
        if failures > 0 {
            eprintln!("{} of {} files failed verification", failures, files.len());
            std::process::exit(2);
        }
        return Ok(());
    }

    let mut bundle = load_bundle(&cli)?;

    let roots = TrustRoots::resolve(cli.roots.as_deref())?;
    let at = cli.time.unwrap_or_else(certbundle_lib::unix_now);
    let options = verify_options(&bundle, cli.no_chain, Some(at));
    if options.as_chain && !bundle.looks_like_chain() {
        log::warn!(
            "certificate 0 is not issued by certificate 1; if this is a list of CA \
             certificates rather than a chain, use --nochain"
        );
    }
    let outcomes = certbundle_lib::verify_bundle(&mut bundle, &roots, &options);

    if cli.pem {
        print!("{}", bundle.to_pem());
    } else if cli.json {
        println!("{}", certbundle_lib::to_json(&bundle)?);
    } else {
        print!("{}", certbundle_lib::display_text(&bundle, at, local_offset));
    }

    if outcomes.iter().any(|o| !o.verified) {
        std::process::exit(2);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_rfc3339_utc_and_offset() {
        assert_eq!(parse_rfc3339("2014-03-15T15:10:00Z").unwrap(), 1_394_896_200);
        assert_eq!(
            parse_rfc3339("2014-03-15T16:10:00+01:00").unwrap(),
            1_394_896_200
        );
    }

    #[test]
    fn parse_rfc3339_rejects_other_formats() {
        assert!(parse_rfc3339("2014-03-15").is_err());
        assert!(parse_rfc3339("1394896200").is_err());
        assert!(parse_rfc3339("").is_err());
    }

    #[test]
    fn dash_means_stdin() {
        assert!(is_stdin(None));
        assert!(is_stdin(Some(&PathBuf::from("-"))));
        assert!(!is_stdin(Some(&PathBuf::from("chain.pem"))));
    }

    #[test]
    fn missing_path_is_a_remote_target() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("chain.pem");
        std::fs::write(&existing, "").unwrap();

        assert_eq!(remote_target(None), None);
        assert_eq!(remote_target(Some(&PathBuf::from("-"))), None);
        assert_eq!(remote_target(Some(&existing)), None);
        assert_eq!(remote_target(Some(&dir.path().to_path_buf())), None);
        assert_eq!(
            remote_target(Some(&PathBuf::from("https://example.com/"))).as_deref(),
            Some("https://example.com/")
        );
        assert_eq!(
            remote_target(Some(&PathBuf::from("example.com"))).as_deref(),
            Some("example.com")
        );
    }

    #[test]
    fn connect_timeout_accepts_humantime() {
        let cli = Cli::parse_from(["certbundle", "--connect-timeout", "1m 30s", "example.com"]);
        assert_eq!(cli.connect_timeout, Duration::from_secs(90));
        let cli = Cli::parse_from(["certbundle", "chain.pem"]);
        assert_eq!(cli.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn single_certificate_is_never_a_chain() {
        let bundle = Bundle::default();
        assert!(!verify_options(&bundle, false, None).as_chain);
        assert_eq!(verify_options(&bundle, true, Some(7)).at_time, Some(7));
    }

    #[test]
    fn is_bundle_file_extensions() {
        assert!(is_bundle_file(Path::new("chain.pem")));
        assert!(is_bundle_file(Path::new("ca.CRT")));
        assert!(is_bundle_file(Path::new("root.cer")));
        assert!(!is_bundle_file(Path::new("cert.der")));
        assert!(!is_bundle_file(Path::new("README.md")));
        assert!(!is_bundle_file(Path::new("chain")));
    }

    #[test]
    fn find_bundle_files_sorted_and_flat() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.pem"), "").unwrap();
        std::fs::write(dir.path().join("a.crt"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/c.pem"), "").unwrap();

        let flat = find_bundle_files(dir.path(), false);
        assert_eq!(
            flat,
            vec![dir.path().join("a.crt"), dir.path().join("b.pem")]
        );

        let deep = find_bundle_files(dir.path(), true);
        assert_eq!(deep.len(), 3);
        assert!(deep.contains(&dir.path().join("sub/c.pem")));
    }

    #[test]
    fn find_bundle_files_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_bundle_files(dir.path(), true).is_empty());
    }

    #[test]
    fn unreadable_file_fails_in_batch() {
        let result = verify_file(
            Path::new("/nonexistent/chain.pem"),
            &TrustRoots::new(),
            false,
            None,
        );
        assert!(!result.pass);
        assert!(result.detail.starts_with("FAIL"));
    }
}
