#![no_main]

use certbundle_lib::{der_to_pem, parse_der, parse_pem_certificates, Bundle};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // If data parses as DER, roundtrip through PEM and back
    if let Ok(cert1) = parse_der(data) {
        let pem = der_to_pem(data);
        let der_back = parse_pem_certificates(pem.as_bytes())
            .into_iter()
            .next()
            .expect("re-encoded PEM must decode");
        assert_eq!(der_back, data, "DER changed after PEM roundtrip");
        let cert2 = parse_der(&der_back).expect("roundtripped DER must parse");
        assert_eq!(cert1.serial, cert2.serial, "serial mismatch after roundtrip");
    }

    // A loaded bundle re-encodes to PEM that loads to the same DER
    if let Ok(bundle) = Bundle::from_pem(data) {
        let again = Bundle::from_pem(bundle.to_pem().as_bytes()).expect("to_pem output must load");
        assert_eq!(bundle.len(), again.len());
        for (a, b) in bundle.iter().zip(again.iter()) {
            assert_eq!(a.raw_der(), b.raw_der());
        }
    }
});
