//! Signature vectors: canonical text and HMAC output must match agents byte for byte.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use metrix_core::Signer;

mod vector_loader;
use vector_loader::load;

#[test]
fn sign_vectors() {
    let files = [
        "sign_counter.json",
        "sign_counter_negative.json",
        "sign_gauge.json",
        "sign_gauge_rounded.json",
    ];

    for f in files {
        let v = load(f);
        let signer = Signer::new(&v.key);
        let mut metric = v.metric();

        let canonical = v.canonical.as_deref().expect("missing canonical");
        assert_eq!(Signer::canonical(&metric).unwrap(), canonical, "vector={}", v.description);

        let want = v.hash.as_deref().expect("missing hash");
        assert_eq!(signer.sign_hex(&metric).unwrap(), want, "vector={}", v.description);

        metric.hash = Some(want.to_string());
        signer.verify(&metric).expect("signed vector must verify");
    }
}

#[test]
fn verify_error_vectors() {
    for f in ["verify_tampered.json", "verify_missing_value.json"] {
        let v = load(f);
        let signer = Signer::new(&v.key);
        let err = signer.verify(&v.metric()).expect_err("expected error");
        let want = v.expect_error.expect("missing expect_error block");
        assert_eq!(err.client_code().as_str(), want.code, "vector={}", v.description);
    }
}
