// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! Signed multicast formats through the provider registry.

use beacon::constraint::{Constraint, ConstraintSet, Principal};
use beacon::discovery::{DiscoveryError, FormatContext, FormatRegistry};
use beacon::protocol::{FixedSizeFactory, MulticastAnnouncement, MulticastRequest, ServiceId};
use beacon::security::{
    AllowAll, CertificateSource, PrivateCredential, SecurityError,
};
use std::collections::HashMap;

struct CertTable {
    by_principal: HashMap<Principal, Vec<u8>>,
}

impl CertificateSource for CertTable {
    fn certificate_pem(&self, principal: &Principal) -> Option<Vec<u8>> {
        self.by_principal.get(principal).cloned()
    }
}

fn mint(common_name: &str) -> (PrivateCredential, Vec<u8>) {
    let certified = rcgen::generate_simple_self_signed(vec![format!("{}.example", common_name)])
        .expect("certificate generation succeeds");
    let cert_pem = certified.cert.pem().into_bytes();
    let key_pem = certified.key_pair.serialize_pem().into_bytes();
    (
        PrivateCredential::new(
            Principal::x500(format!("CN={}", common_name)),
            cert_pem.clone(),
            key_pem,
        ),
        cert_pem,
    )
}

fn request() -> MulticastRequest {
    MulticastRequest {
        host: "client.example".into(),
        port: 4160,
        groups: vec!["public".into()],
        service_ids: vec![ServiceId { hi: 0x11, lo: 0x22 }],
    }
}

#[test]
fn test_registry_signed_request_roundtrip() {
    let (credential, cert_pem) = mint("alice");
    let certs = CertTable {
        by_principal: [(credential.principal().clone(), cert_pem)].into(),
    };
    let credentials = [credential];
    let constraints = ConstraintSet::new(
        vec![Constraint::CLIENT_AUTH_YES, Constraint::INTEGRITY_YES],
        vec![],
    )
    .expect("valid set");
    let cx = FormatContext {
        constraints: &constraints,
        credentials: &credentials,
        gate: &AllowAll,
        certificates: &certs,
    };

    let registry = FormatRegistry::with_defaults();
    let format = registry.get("x500.sha256-ecdsa").expect("registered");

    let mut factory = FixedSizeFactory::new(512);
    let datagrams = format
        .encode_request(&request(), &cx, &mut factory)
        .expect("encode succeeds");
    let decoded = format
        .decode_request(datagrams[0].as_bytes(), &cx)
        .expect("decode succeeds");
    assert_eq!(decoded, request());
}

#[test]
fn test_registry_signed_announcement_roundtrip() {
    let (credential, cert_pem) = mint("registrar");
    let certs = CertTable {
        by_principal: [(credential.principal().clone(), cert_pem)].into(),
    };
    let credentials = [credential];
    let constraints = ConstraintSet::new(vec![Constraint::SERVER_AUTH_YES], vec![])
        .expect("valid set");
    let cx = FormatContext {
        constraints: &constraints,
        credentials: &credentials,
        gate: &AllowAll,
        certificates: &certs,
    };

    let announcement = MulticastAnnouncement {
        sequence: 99,
        host: "registrar.example".into(),
        port: 4160,
        groups: vec!["public".into(), "staging".into()],
        service_id: ServiceId { hi: 0xaa, lo: 0xbb },
    };

    let registry = FormatRegistry::with_defaults();
    let format = registry.get("x500.sha256-ecdsa").expect("registered");

    let mut factory = FixedSizeFactory::new(512);
    let datagrams = format
        .encode_announcement(&announcement, &cx, &mut factory)
        .expect("encode succeeds");
    let decoded = format
        .decode_announcement(datagrams[0].as_bytes(), &cx)
        .expect("decode succeeds");
    assert_eq!(decoded, announcement);
}

#[test]
fn test_plaintext_and_signed_disagree_on_client_auth() {
    let (credential, cert_pem) = mint("alice");
    let certs = CertTable {
        by_principal: [(credential.principal().clone(), cert_pem)].into(),
    };
    let credentials = [credential];
    let constraints =
        ConstraintSet::new(vec![Constraint::CLIENT_AUTH_YES], vec![]).expect("valid set");
    let cx = FormatContext {
        constraints: &constraints,
        credentials: &credentials,
        gate: &AllowAll,
        certificates: &certs,
    };

    let registry = FormatRegistry::with_defaults();
    let mut factory = FixedSizeFactory::new(512);

    // Plaintext cannot authenticate the client.
    let plaintext = registry.get("plaintext").expect("registered");
    let err = plaintext
        .encode_request(&request(), &cx, &mut factory)
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::Constraint(_)));

    // The signed format satisfies the same requirement by signing.
    let signed = registry.get("x500.sha256-ecdsa").expect("registered");
    signed
        .encode_request(&request(), &cx, &mut factory)
        .expect("signed format satisfies client authentication");
}

#[test]
fn test_cross_format_decode_fails_as_malformed_not_tampered() {
    let (credential, cert_pem) = mint("alice");
    let certs = CertTable {
        by_principal: [(credential.principal().clone(), cert_pem)].into(),
    };
    let credentials = [credential];
    let constraints = ConstraintSet::empty();
    let cx = FormatContext {
        constraints: &constraints,
        credentials: &credentials,
        gate: &AllowAll,
        certificates: &certs,
    };

    let registry = FormatRegistry::with_defaults();
    let plaintext = registry.get("plaintext").expect("registered");
    let signed = registry.get("x500.sha256-ecdsa").expect("registered");

    let mut factory = FixedSizeFactory::new(512);
    let plain_datagrams = plaintext
        .encode_request(&request(), &cx, &mut factory)
        .expect("encode succeeds");

    // A plaintext datagram fed to the signed decoder is malformed
    // framing, not a tampering report.
    let err = signed
        .decode_request(plain_datagrams[0].as_bytes(), &cx)
        .unwrap_err();
    assert!(
        matches!(err, DiscoveryError::Decode(_) | DiscoveryError::Security(SecurityError::UnknownPrincipal(_))),
        "unexpected error {:?}",
        err
    );
}

#[test]
fn test_rsa_format_skips_ecdsa_credentials() {
    // The only credential is ECDSA; the RSA provider must reject rather
    // than sign with an incompatible key.
    let (credential, cert_pem) = mint("alice");
    let certs = CertTable {
        by_principal: [(credential.principal().clone(), cert_pem)].into(),
    };
    let credentials = [credential];
    let constraints = ConstraintSet::empty();
    let cx = FormatContext {
        constraints: &constraints,
        credentials: &credentials,
        gate: &AllowAll,
        certificates: &certs,
    };

    let registry = FormatRegistry::with_defaults();
    let rsa = registry.get("x500.sha256-rsa").expect("registered");
    let mut factory = FixedSizeFactory::new(1024);
    let err = rsa.encode_request(&request(), &cx, &mut factory).unwrap_err();
    assert!(matches!(err, DiscoveryError::Constraint(_)));
}
