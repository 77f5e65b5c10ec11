// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! Explicit format-provider registry.
//!
//! Formats are looked up by stable name. The registry is a plain value
//! constructed once at process start and passed by reference to whatever
//! needs it; there is no global format table.

use super::DiscoveryError;
use crate::constraint::ConstraintSet;
use crate::protocol::{Datagram, DatagramFactory, MulticastAnnouncement, MulticastRequest};
use crate::security::{CertificateSource, CredentialGate, NoIdentity, PrivateCredential};
use std::collections::HashMap;
use std::sync::Arc;

/// Per-attempt context handed to a format provider.
///
/// Credentials are borrowed for one discovery attempt; the provider never
/// retains them.
pub struct FormatContext<'a> {
    pub constraints: &'a ConstraintSet,
    pub credentials: &'a [PrivateCredential],
    pub gate: &'a dyn CredentialGate,
    pub certificates: &'a dyn CertificateSource,
}

static NO_IDENTITY: NoIdentity = NoIdentity;

impl<'a> FormatContext<'a> {
    /// A context with no identity environment, as the plaintext format
    /// uses.
    pub fn anonymous(constraints: &'a ConstraintSet) -> Self {
        Self {
            constraints,
            credentials: &[],
            gate: &NO_IDENTITY,
            certificates: &NO_IDENTITY,
        }
    }
}

/// One pluggable discovery message format.
///
/// A provider either proves up front that it can satisfy the context's
/// required constraints or fails before any bytes move; encode and decode
/// are exact mirrors of one another.
pub trait DiscoveryFormat: Send + Sync {
    /// Stable registry name, e.g. `"plaintext"` or `"x500.sha256-ecdsa"`.
    fn name(&self) -> &'static str;

    fn encode_request(
        &self,
        request: &MulticastRequest,
        cx: &FormatContext<'_>,
        factory: &mut dyn DatagramFactory,
    ) -> Result<Vec<Datagram>, DiscoveryError>;

    fn decode_request(
        &self,
        bytes: &[u8],
        cx: &FormatContext<'_>,
    ) -> Result<MulticastRequest, DiscoveryError>;

    fn encode_announcement(
        &self,
        announcement: &MulticastAnnouncement,
        cx: &FormatContext<'_>,
        factory: &mut dyn DatagramFactory,
    ) -> Result<Vec<Datagram>, DiscoveryError>;

    fn decode_announcement(
        &self,
        bytes: &[u8],
        cx: &FormatContext<'_>,
    ) -> Result<MulticastAnnouncement, DiscoveryError>;
}

/// Format name -> provider table.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    formats: HashMap<&'static str, Arc<dyn DiscoveryFormat>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in provider set: plaintext plus both X.500 signed
    /// variants.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::protocol::PlaintextFormat));
        registry.register(Arc::new(crate::security::X500Format::sha256_rsa()));
        registry.register(Arc::new(crate::security::X500Format::sha256_ecdsa()));
        registry
    }

    /// Register a provider under its own name; a later registration with
    /// the same name replaces the earlier one.
    pub fn register(&mut self, format: Arc<dyn DiscoveryFormat>) {
        log::debug!("[DISC] registering format '{}'", format.name());
        self.formats.insert(format.name(), format);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DiscoveryFormat>> {
        self.formats.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.formats.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
