// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! Identity-layer building blocks: credential material, the consumed
//! certificate-lookup and permission capabilities, constraint
//! distillation, credential selection and signed datagram framing.
//!
//! # Architecture
//!
//! ```text
//! X500Format (per signature algorithm)
//! +-- distill    constraint set -> principal-dependent residue
//! +-- negotiate  score credentials, pick the signer
//! +-- signing    frame = i32 len | body | UTF(principal) | signature
//! ```
//!
//! Certificate-path building and keystores stay outside this crate; a
//! [`CertificateSource`] resolves peer principals to certificates and a
//! [`CredentialGate`] answers whether a local credential may be used in a
//! given role.

pub mod distill;
pub mod negotiator;
pub mod signing;
pub mod x500;

pub use distill::{distill, DistilledConstraints};
pub use negotiator::select_credential;
pub use x500::X500Format;

use crate::constraint::Principal;
use std::fmt;
use zeroize::Zeroizing;

/// Identity-layer errors.
///
/// Verification failures and unknown principals are deliberately distinct:
/// one means "attacker tampered with bytes", the other "we have no
/// certificate for who the sender claims to be".
#[derive(Debug)]
pub enum SecurityError {
    /// No certificate mapping exists for a peer-asserted principal.
    UnknownPrincipal(String),

    /// The signature did not verify over the received payload.
    SignatureVerification(String),

    /// Local credential material is unusable (bad PEM, wrong key
    /// algorithm, signing failure).
    Credential(String),

    /// Permission to use a credential in a role was denied. Only surfaced
    /// in detail when the caller is authorized to see it.
    Denied {
        principal: String,
        role: SigningRole,
    },
}

impl fmt::Display for SecurityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPrincipal(name) => write!(f, "unknown principal: {}", name),
            Self::SignatureVerification(msg) => {
                write!(f, "signature verification failed: {}", msg)
            }
            Self::Credential(msg) => write!(f, "credential error: {}", msg),
            Self::Denied { principal, role } => {
                write!(f, "use of credential '{}' denied for {}", principal, role)
            }
        }
    }
}

impl std::error::Error for SecurityError {}

/// Direction a credential signs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningRole {
    /// Outbound multicast request; the signer acts as the client side.
    Request,
    /// Outbound multicast announcement; the signer acts as the server side.
    Announcement,
}

impl fmt::Display for SigningRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => write!(f, "request signing"),
            Self::Announcement => write!(f, "announcement signing"),
        }
    }
}

/// A local signing identity: principal, certificate and private key.
///
/// The protocol layer borrows a credential for the duration of one
/// discovery attempt and never retains it. Key bytes are zeroized when
/// the credential is dropped.
pub struct PrivateCredential {
    principal: Principal,
    certificate_pem: Vec<u8>,
    private_key_pem: Zeroizing<Vec<u8>>,
}

impl PrivateCredential {
    pub fn new(principal: Principal, certificate_pem: Vec<u8>, private_key_pem: Vec<u8>) -> Self {
        Self {
            principal,
            certificate_pem,
            private_key_pem: Zeroizing::new(private_key_pem),
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn certificate_pem(&self) -> &[u8] {
        &self.certificate_pem
    }

    pub(crate) fn private_key_pem(&self) -> &[u8] {
        &self.private_key_pem
    }
}

impl fmt::Debug for PrivateCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateCredential")
            .field("principal", &self.principal)
            .field("certificate_pem", &self.certificate_pem.len())
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

/// Resolves a peer-asserted principal to its certificate.
///
/// Absence of a mapping is a protocol-level condition
/// ([`SecurityError::UnknownPrincipal`]), distinct from a signature that
/// fails to verify.
pub trait CertificateSource: Send + Sync {
    fn certificate_pem(&self, principal: &Principal) -> Option<Vec<u8>>;
}

/// Decides whether a local credential may be used in a signing role, and
/// whether denial details may be disclosed to the caller.
pub trait CredentialGate: Send + Sync {
    fn usable(&self, principal: &Principal, role: SigningRole) -> bool;

    /// Least information disclosure: deny-causes are elided unless this
    /// returns true.
    fn disclose_denials(&self) -> bool {
        false
    }
}

/// Gate that permits every credential in every role.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl CredentialGate for AllowAll {
    fn usable(&self, _principal: &Principal, _role: SigningRole) -> bool {
        true
    }
}

/// Empty identity environment: no certificates, no usable credentials.
/// The plaintext format runs with this.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIdentity;

impl CertificateSource for NoIdentity {
    fn certificate_pem(&self, _principal: &Principal) -> Option<Vec<u8>> {
        None
    }
}

impl CredentialGate for NoIdentity {
    fn usable(&self, _principal: &Principal, _role: SigningRole) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_redacts_key() {
        let cred = PrivateCredential::new(
            Principal::x500("CN=test"),
            b"cert".to_vec(),
            b"very secret key".to_vec(),
        );
        let rendered = format!("{:?}", cred);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("very secret key"));
    }

    #[test]
    fn test_error_kinds_are_distinct() {
        let unknown = SecurityError::UnknownPrincipal("CN=ghost".into());
        let tampered = SecurityError::SignatureVerification("bad bytes".into());
        assert!(format!("{}", unknown).contains("unknown principal"));
        assert!(format!("{}", tampered).contains("verification failed"));
    }
}
