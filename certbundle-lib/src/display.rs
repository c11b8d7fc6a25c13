//! Human-readable and JSON formatting of annotated bundles.

use crate::bundle::Bundle;
use crate::fields::CertificateRecord;
use crate::BundleError;
use std::time::Duration;
use time::UtcOffset;

const DAY: f64 = 24.0 * 3600.0;
const WEEK: f64 = 7.0 * DAY;
const MONTH: f64 = 30.0 * DAY;
const YEAR: f64 = 365.0 * DAY;

/// Format every certificate of the bundle as plain text.
///
/// `at` is the reference time for the "expires in" line and should be the
/// time the bundle was verified at. Validity dates are shown at `offset`.
pub fn display_text(bundle: &Bundle, at: i64, offset: UtcOffset) -> String {
    let mut out = String::new();
    for (i, cert) in bundle.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("[{}] Certificate:\n", i));
        format_record(&mut out, cert, at, offset);
    }
    out
}

fn format_record(out: &mut String, cert: &CertificateRecord, at: i64, offset: UtcOffset) {
    out.push_str(&format!("serial number: {}\n", cert.serial));
    out.push_str(&format!("subject: {}\n", cert.subject_string()));
    out.push_str(&format!("issuer: {}\n", cert.issuer_string()));
    out.push_str(&format!("isCA: {}\n", cert.is_ca));
    out.push_str(&format!("root: {}\n", cert.is_root()));

    out.push_str("valid:\n");
    out.push_str(&format!("  from: {}\n", cert.not_before.to_short(offset)));
    out.push_str(&format!("  to  : {}\n", cert.not_after.to_short(offset)));
    out.push_str(&format!(
        "  period: {}\n",
        humanize_duration(cert.validity_period())
    ));
    let remaining = cert.expires_in(at);
    if remaining >= 0 {
        out.push_str(&format!("  expires in: {}\n", humanize_duration(remaining)));
    } else {
        out.push_str(&format!(
            "  expired: {} ago\n",
            humanize_duration(remaining.saturating_neg())
        ));
    }

    let san = &cert.san;
    if !san.is_empty() {
        out.push_str("Subject Alternative Names:\n");
        for (label, names) in [
            ("DNS", &san.dns),
            ("Emails", &san.email),
            ("IPs", &san.ip),
            ("URIs", &san.uri),
        ] {
            if !names.is_empty() {
                out.push_str(&format!("  {}: {}\n", label, names.join(", ")));
            }
        }
    }

    out.push_str(&format!("fingerprint (SHA-256): {}\n", cert.fingerprint()));

    match cert.verify_error() {
        None if cert.verified() => out.push_str("verified: ✔\n"),
        None => out.push_str("verified: ✖ (not verified)\n"),
        Some(e) => out.push_str(&format!("verified: ✖ ({})\n", e)),
    }
}

/// Render a duration in seconds in coarse calendar units: years (365
/// days), months (30 days), weeks, or days, with one decimal. Anything
/// under a day falls back to humantime's format. Negative input is treated
/// as zero.
pub fn humanize_duration(secs: i64) -> String {
    let secs = secs.max(0);
    let s = secs as f64;
    if s >= YEAR {
        format!("{:.1} years", s / YEAR)
    } else if s >= MONTH {
        format!("{:.1} months", s / MONTH)
    } else if s >= WEEK {
        format!("{:.1} weeks", s / WEEK)
    } else if s >= DAY {
        format!("{:.1} days", s / DAY)
    } else {
        humantime::format_duration(Duration::from_secs(secs.unsigned_abs())).to_string()
    }
}

/// Serialize the annotated bundle to a pretty-printed JSON array.
pub fn to_json(bundle: &Bundle) -> Result<String, BundleError> {
    serde_json::to_string_pretty(bundle).map_err(BundleError::Json)
}

#[cfg(test)]
mod tests {
    use super::*;

    const D: i64 = 24 * 3600;

    #[test]
    fn humanize_calendar_units() {
        assert_eq!(humanize_duration(D), "1.0 days");
        assert_eq!(humanize_duration(9 * D), "1.3 weeks");
        assert_eq!(humanize_duration(65 * D), "2.2 months");
        assert_eq!(humanize_duration(800 * D), "2.2 years");
        assert_eq!(humanize_duration(37000 * D), "101.4 years");
    }

    #[test]
    fn humanize_sub_day() {
        assert_eq!(humanize_duration(90), "1m 30s");
        assert_eq!(humanize_duration(0), "0s");
        assert_eq!(humanize_duration(-5), "0s");
    }

    #[test]
    fn empty_bundle_renders_nothing() {
        let bundle = Bundle::default();
        assert_eq!(display_text(&bundle, 0, UtcOffset::UTC), "");
        assert_eq!(to_json(&bundle).ok().as_deref(), Some("[]"));
    }
}
