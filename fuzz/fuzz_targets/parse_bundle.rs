#![no_main]

use certbundle_lib::{verify_bundle, Bundle, TrustRoots, VerifyOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Loading and verifying must never panic, regardless of input.
    if let Ok(mut bundle) = Bundle::from_pem(data) {
        let _ = bundle.looks_like_chain();
        for cert in &bundle {
            let _ = cert.subject_string();
            let _ = cert.issuer_string();
            let _ = cert.short_name();
            let _ = cert.fingerprint();
        }

        // Use the bundle as its own trust store so some paths succeed.
        let roots = TrustRoots::from_pem(data);
        let options = VerifyOptions {
            as_chain: true,
            at_time: Some(1_700_000_000),
        };
        let _ = verify_bundle(&mut bundle, &roots, &options);

        let _ = certbundle_lib::display_text(&bundle, 1_700_000_000, time::UtcOffset::UTC);
        let _ = certbundle_lib::to_json(&bundle);
    }
});
