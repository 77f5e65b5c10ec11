// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! X.500 identity-signed discovery format.
//!
//! One provider instance per signature algorithm. Encoding distills the
//! constraint set, selects a local credential, signs every datagram body
//! and seals it with the principal name. Decoding resolves the asserted
//! principal to a certificate through the caller's
//! [`CertificateSource`], verifies the signature and only then hands the
//! body to the plaintext codec.

use super::distill::distill;
use super::negotiator::select_credential;
use super::signing::{self, ReservingFactory};
use super::{PrivateCredential, SecurityError, SigningRole};
use crate::constraint::{ConstraintError, Principal};
use crate::discovery::{DiscoveryError, DiscoveryFormat, FormatContext};
use crate::protocol::{
    multicast, CodecError, Datagram, DatagramFactory, MulticastAnnouncement, MulticastRequest,
};

use ring::rand::SystemRandom;
use ring::signature::{self, UnparsedPublicKey};

/// Signature algorithms the X.500 format ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignatureAlgorithm {
    Sha256Rsa,
    Sha256EcdsaP256,
}

impl SignatureAlgorithm {
    /// Fixed per provider instance; the reservation in every signed
    /// datagram is sized for it.
    fn max_signature_len(self) -> usize {
        match self {
            // Large enough for RSA keys up to 4096 bits.
            Self::Sha256Rsa => 512,
            // ECDSA P-256 fixed-format signatures are exactly r || s.
            Self::Sha256EcdsaP256 => 64,
        }
    }
}

/// X.500 signed discovery format provider.
pub struct X500Format {
    name: &'static str,
    algorithm: SignatureAlgorithm,
}

impl X500Format {
    /// SHA-256 with RSA (PKCS#1 v1.5).
    pub fn sha256_rsa() -> Self {
        Self {
            name: "x500.sha256-rsa",
            algorithm: SignatureAlgorithm::Sha256Rsa,
        }
    }

    /// SHA-256 with ECDSA over P-256.
    pub fn sha256_ecdsa() -> Self {
        Self {
            name: "x500.sha256-ecdsa",
            algorithm: SignatureAlgorithm::Sha256EcdsaP256,
        }
    }

    /// Whether this provider can sign with the credential's key.
    fn supports_key(&self, credential: &PrivateCredential) -> bool {
        let Ok(pem) = pem::parse(credential.private_key_pem()) else {
            return false;
        };
        match self.algorithm {
            SignatureAlgorithm::Sha256Rsa => {
                signature::RsaKeyPair::from_pkcs8(pem.contents()).is_ok()
            }
            SignatureAlgorithm::Sha256EcdsaP256 => signature::EcdsaKeyPair::from_pkcs8(
                &signature::ECDSA_P256_SHA256_FIXED_SIGNING,
                pem.contents(),
                &SystemRandom::new(),
            )
            .is_ok(),
        }
    }

    /// Sign a datagram body with the selected credential.
    fn sign_body(
        &self,
        credential: &PrivateCredential,
        body: &[u8],
    ) -> Result<Vec<u8>, SecurityError> {
        let pem = pem::parse(credential.private_key_pem()).map_err(|e| {
            SecurityError::Credential(format!("failed to parse private key PEM: {}", e))
        })?;

        match self.algorithm {
            SignatureAlgorithm::Sha256Rsa => {
                let key_pair = signature::RsaKeyPair::from_pkcs8(pem.contents()).map_err(|e| {
                    SecurityError::Credential(format!("unusable RSA key: {:?}", e))
                })?;
                let rng = SystemRandom::new();
                let mut sig = vec![0u8; key_pair.public().modulus_len()];
                key_pair
                    .sign(&signature::RSA_PKCS1_SHA256, &rng, body, &mut sig)
                    .map_err(|e| {
                        SecurityError::Credential(format!("RSA signing failed: {:?}", e))
                    })?;
                Ok(sig)
            }
            SignatureAlgorithm::Sha256EcdsaP256 => {
                let rng = SystemRandom::new();
                let key_pair = signature::EcdsaKeyPair::from_pkcs8(
                    &signature::ECDSA_P256_SHA256_FIXED_SIGNING,
                    pem.contents(),
                    &rng,
                )
                .map_err(|e| {
                    SecurityError::Credential(format!("unusable ECDSA key: {:?}", e))
                })?;
                let sig = key_pair.sign(&rng, body).map_err(|e| {
                    SecurityError::Credential(format!("ECDSA signing failed: {:?}", e))
                })?;
                Ok(sig.as_ref().to_vec())
            }
        }
    }

    /// Verify a signature against the certificate resolved for the
    /// asserted principal.
    fn verify_body(
        &self,
        certificate_pem: &[u8],
        body: &[u8],
        sig: &[u8],
        principal: &Principal,
    ) -> Result<(), SecurityError> {
        let (_, pem) = x509_parser::pem::parse_x509_pem(certificate_pem).map_err(|e| {
            SecurityError::Credential(format!("failed to parse certificate PEM: {:?}", e))
        })?;
        let cert = pem.parse_x509().map_err(|e| {
            SecurityError::Credential(format!("failed to parse X.509 certificate: {:?}", e))
        })?;

        match self.algorithm {
            SignatureAlgorithm::Sha256Rsa => {
                // RSA verification needs the full SubjectPublicKeyInfo DER.
                let spki = cert.public_key().raw;
                let key = UnparsedPublicKey::new(&signature::RSA_PKCS1_2048_8192_SHA256, spki);
                key.verify(body, sig)
                    .map_err(|_| signing::verification_failure(principal))
            }
            SignatureAlgorithm::Sha256EcdsaP256 => {
                // ECDSA verification takes the raw EC point, not the SPKI.
                let point = &cert.public_key().subject_public_key.data;
                let fixed =
                    UnparsedPublicKey::new(&signature::ECDSA_P256_SHA256_FIXED, point.as_ref());
                if fixed.verify(body, sig).is_ok() {
                    return Ok(());
                }
                // ASN.1 DER signatures, for peers that encode them that way.
                let asn1 =
                    UnparsedPublicKey::new(&signature::ECDSA_P256_SHA256_ASN1, point.as_ref());
                asn1.verify(body, sig)
                    .map_err(|_| signing::verification_failure(principal))
            }
        }
    }

    /// Shared encode path for both message kinds.
    fn encode_signed(
        &self,
        cx: &FormatContext<'_>,
        role: SigningRole,
        factory: &mut dyn DatagramFactory,
        encode_bodies: impl FnOnce(
            &mut dyn DatagramFactory,
        ) -> Result<Vec<Datagram>, CodecError>,
    ) -> Result<Vec<Datagram>, DiscoveryError> {
        let distilled = distill(cx.constraints, role)?;
        let credential =
            select_credential(cx.credentials, &distilled, cx.gate, |c| self.supports_key(c))?;
        let principal = credential.principal();
        let overhead = signing::signed_overhead(principal, self.algorithm.max_signature_len());

        let mut reserving = ReservingFactory::new(factory, overhead);
        let bodies = encode_bodies(&mut reserving)?;

        let mut sealed = Vec::with_capacity(bodies.len());
        for body in &bodies {
            let sig = self.sign_body(credential, body.as_bytes())?;
            sealed.push(signing::seal(
                body.as_bytes(),
                principal,
                &sig,
                body.capacity() + overhead,
            )?);
        }
        log::debug!(
            "[X500] sealed {} datagram(s) as '{}' via {}",
            sealed.len(),
            principal,
            self.name
        );
        Ok(sealed)
    }

    /// Shared decode path: open the envelope, resolve and verify the
    /// signer, enforce the receiver's principal-dependent requirements.
    fn open_verified<'a>(
        &self,
        bytes: &'a [u8],
        cx: &FormatContext<'_>,
        role: SigningRole,
    ) -> Result<&'a [u8], DiscoveryError> {
        let message = signing::open(bytes)?;
        let principal = signing::asserted_principal(&message);

        let certificate = cx
            .certificates
            .certificate_pem(&principal)
            .ok_or_else(|| SecurityError::UnknownPrincipal(principal.to_string()))?;
        self.verify_body(&certificate, message.body, message.signature, &principal)?;

        let distilled = distill(cx.constraints, role)?;
        if distilled.score(&principal) < 0 {
            return Err(ConstraintError::unsupported(format!(
                "sender '{}' does not satisfy the principal requirements",
                principal
            ))
            .into());
        }
        Ok(message.body)
    }
}

impl DiscoveryFormat for X500Format {
    fn name(&self) -> &'static str {
        self.name
    }

    fn encode_request(
        &self,
        request: &MulticastRequest,
        cx: &FormatContext<'_>,
        factory: &mut dyn DatagramFactory,
    ) -> Result<Vec<Datagram>, DiscoveryError> {
        self.encode_signed(cx, SigningRole::Request, factory, |reserving| {
            multicast::encode_multicast_request(request, reserving)
        })
    }

    fn decode_request(
        &self,
        bytes: &[u8],
        cx: &FormatContext<'_>,
    ) -> Result<MulticastRequest, DiscoveryError> {
        let body = self.open_verified(bytes, cx, SigningRole::Request)?;
        Ok(multicast::decode_multicast_request(body)?)
    }

    fn encode_announcement(
        &self,
        announcement: &MulticastAnnouncement,
        cx: &FormatContext<'_>,
        factory: &mut dyn DatagramFactory,
    ) -> Result<Vec<Datagram>, DiscoveryError> {
        self.encode_signed(cx, SigningRole::Announcement, factory, |reserving| {
            multicast::encode_multicast_announcement(announcement, reserving)
        })
    }

    fn decode_announcement(
        &self,
        bytes: &[u8],
        cx: &FormatContext<'_>,
    ) -> Result<MulticastAnnouncement, DiscoveryError> {
        let body = self.open_verified(bytes, cx, SigningRole::Announcement)?;
        Ok(multicast::decode_multicast_announcement(body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{Constraint, ConstraintSet};
    use crate::protocol::{FixedSizeFactory, ServiceId};
    use crate::security::{AllowAll, CertificateSource};
    use std::collections::HashMap;

    struct TestCerts {
        by_principal: HashMap<Principal, Vec<u8>>,
    }

    impl CertificateSource for TestCerts {
        fn certificate_pem(&self, principal: &Principal) -> Option<Vec<u8>> {
            self.by_principal.get(principal).cloned()
        }
    }

    fn mint_credential(common_name: &str) -> (PrivateCredential, Vec<u8>) {
        let certified = rcgen::generate_simple_self_signed(vec![format!(
            "{}.example",
            common_name
        )])
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

    fn context<'a>(
        constraints: &'a ConstraintSet,
        credentials: &'a [PrivateCredential],
        certs: &'a TestCerts,
    ) -> FormatContext<'a> {
        FormatContext {
            constraints,
            credentials,
            gate: &AllowAll,
            certificates: certs,
        }
    }

    fn sample_request() -> MulticastRequest {
        MulticastRequest {
            host: "client.example".into(),
            port: 4160,
            groups: vec!["public".into(), "staging".into()],
            service_ids: vec![ServiceId { hi: 3, lo: 4 }],
        }
    }

    #[test]
    fn test_signed_request_roundtrip() {
        let (credential, cert_pem) = mint_credential("alice");
        let certs = TestCerts {
            by_principal: [(credential.principal().clone(), cert_pem)].into(),
        };
        let constraints =
            ConstraintSet::new(vec![Constraint::CLIENT_AUTH_YES], vec![]).expect("valid set");
        let credentials = [credential];
        let cx = context(&constraints, &credentials, &certs);

        let format = X500Format::sha256_ecdsa();
        let request = sample_request();
        let mut factory = FixedSizeFactory::new(512);
        let datagrams = format
            .encode_request(&request, &cx, &mut factory)
            .expect("encode succeeds");
        assert_eq!(datagrams.len(), 1);
        assert!(datagrams[0].len() <= 512);

        let decoded = format
            .decode_request(datagrams[0].as_bytes(), &cx)
            .expect("verify and decode succeed");
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_tampered_datagram_fails_verification_not_decode() {
        let (credential, cert_pem) = mint_credential("alice");
        let certs = TestCerts {
            by_principal: [(credential.principal().clone(), cert_pem)].into(),
        };
        let constraints = ConstraintSet::empty();
        let credentials = [credential];
        let cx = context(&constraints, &credentials, &certs);

        let format = X500Format::sha256_ecdsa();
        let mut factory = FixedSizeFactory::new(512);
        let datagrams = format
            .encode_request(&sample_request(), &cx, &mut factory)
            .expect("encode succeeds");

        // Flip one byte inside the body region.
        let mut bytes = datagrams[0].as_bytes().to_vec();
        bytes[6] ^= 0xff;
        let err = format.decode_request(&bytes, &cx).unwrap_err();
        assert!(matches!(
            err,
            DiscoveryError::Security(SecurityError::SignatureVerification(_))
        ));
    }

    #[test]
    fn test_unknown_principal_is_distinct_from_bad_signature() {
        let (credential, _cert_pem) = mint_credential("alice");
        // Empty certificate table: the asserted principal resolves to
        // nothing.
        let certs = TestCerts {
            by_principal: HashMap::new(),
        };
        let constraints = ConstraintSet::empty();
        let credentials = [credential];
        let cx = context(&constraints, &credentials, &certs);

        let format = X500Format::sha256_ecdsa();
        let mut factory = FixedSizeFactory::new(512);
        let datagrams = format
            .encode_request(&sample_request(), &cx, &mut factory)
            .expect("encode succeeds");
        let err = format
            .decode_request(datagrams[0].as_bytes(), &cx)
            .unwrap_err();
        assert!(matches!(
            err,
            DiscoveryError::Security(SecurityError::UnknownPrincipal(_))
        ));
    }

    #[test]
    fn test_unsatisfiable_constraints_fail_before_signing() {
        let (credential, cert_pem) = mint_credential("alice");
        let certs = TestCerts {
            by_principal: [(credential.principal().clone(), cert_pem)].into(),
        };
        let constraints = ConstraintSet::new(vec![Constraint::CONFIDENTIALITY_YES], vec![])
            .expect("valid set");
        let credentials = [credential];
        let cx = context(&constraints, &credentials, &certs);

        let format = X500Format::sha256_ecdsa();
        let mut factory = FixedSizeFactory::new(512);
        let err = format
            .encode_request(&sample_request(), &cx, &mut factory)
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::Constraint(_)));
    }

    #[test]
    fn test_receiver_enforces_min_principal_on_decode() {
        let (credential, cert_pem) = mint_credential("alice");
        let certs = TestCerts {
            by_principal: [(credential.principal().clone(), cert_pem)].into(),
        };
        let credentials = [credential];
        let empty = ConstraintSet::empty();
        let send_cx = context(&empty, &credentials, &certs);

        let format = X500Format::sha256_ecdsa();
        let mut factory = FixedSizeFactory::new(512);
        let datagrams = format
            .encode_request(&sample_request(), &send_cx, &mut factory)
            .expect("encode succeeds");

        // Receiver requires a different client principal.
        let strict = ConstraintSet::new(
            vec![Constraint::client_min_principal([Principal::x500("CN=mallory")])
                .expect("valid set")],
            vec![],
        )
        .expect("valid set");
        let recv_cx = context(&strict, &credentials, &certs);
        let err = format
            .decode_request(datagrams[0].as_bytes(), &recv_cx)
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::Constraint(_)));
    }

    #[test]
    fn test_spilled_signed_request_stays_within_datagram_size() {
        let (credential, cert_pem) = mint_credential("alice");
        let certs = TestCerts {
            by_principal: [(credential.principal().clone(), cert_pem)].into(),
        };
        let constraints = ConstraintSet::empty();
        let credentials = [credential];
        let cx = context(&constraints, &credentials, &certs);

        let groups: Vec<String> = (0..60)
            .map(|i| format!("group-{:02}-{}", i, "x".repeat(40)))
            .collect();
        let request = MulticastRequest {
            host: "client.example".into(),
            port: 4160,
            groups: groups.clone(),
            service_ids: vec![],
        };

        let format = X500Format::sha256_ecdsa();
        let mut factory = FixedSizeFactory::new(512);
        let datagrams = format
            .encode_request(&request, &cx, &mut factory)
            .expect("encode succeeds");
        assert!(datagrams.len() > 1, "expected spill under signing overhead");

        let mut seen = Vec::new();
        for datagram in &datagrams {
            assert!(datagram.len() <= 512);
            let decoded = format
                .decode_request(datagram.as_bytes(), &cx)
                .expect("verify and decode succeed");
            seen.extend(decoded.groups);
        }
        assert_eq!(seen, groups);
    }
}
