// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! Beacon global configuration.
//!
//! Two levels, centralized here:
//!
//! - **Static**: compile-time wire constants (multicast groups, ports,
//!   datagram size). Never hardcode these elsewhere.
//! - **Dynamic**: [`RuntimeConfig`] for per-process settings, constructed
//!   once (optionally from `BEACON_*` environment variables) and passed by
//!   reference to the codec, negotiator and driver.

use std::net::Ipv4Addr;

/// Multicast group lookup requests are sent to.
pub const REQUEST_MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(224, 0, 1, 84);

/// Multicast group lookup services announce themselves on.
pub const ANNOUNCEMENT_MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(224, 0, 1, 85);

/// Well-known discovery port (multicast request, announcement and unicast).
pub const DISCOVERY_PORT: u16 = 4160;

/// Default capacity of one discovery datagram, in bytes.
///
/// Multicast messages must fit one or more packets of this size; the codec
/// spills to additional datagrams rather than truncating.
pub const DEFAULT_DATAGRAM_SIZE: usize = 512;

/// Default multicast TTL. Discovery traffic stays on the local segment
/// unless explicitly configured otherwise.
pub const DEFAULT_MULTICAST_TTL: u32 = 1;

/// Digest used for the unicast handshake integrity hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// Wire-compatible default for deployed peers.
    Sha1,
    Sha256,
}

impl DigestAlgorithm {
    /// Digest output length in bytes.
    pub fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
        }
    }
}

/// Per-process runtime configuration.
///
/// Constructed once at startup and passed by reference; there is no global
/// mutable configuration state.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Capacity of each multicast datagram buffer.
    pub datagram_size: usize,
    /// TTL applied to outgoing multicast packets.
    pub multicast_ttl: u32,
    /// Handshake hash algorithm. Both sides of a unicast exchange must be
    /// configured identically; the choice is not negotiated on the wire.
    pub handshake_digest: DigestAlgorithm,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            datagram_size: DEFAULT_DATAGRAM_SIZE,
            multicast_ttl: DEFAULT_MULTICAST_TTL,
            handshake_digest: DigestAlgorithm::Sha1,
        }
    }
}

impl RuntimeConfig {
    /// Build a configuration from the environment, falling back to defaults.
    ///
    /// Recognized variables:
    /// - `BEACON_DATAGRAM_SIZE` - datagram capacity in bytes (min 64)
    /// - `BEACON_MULTICAST_TTL` - multicast TTL
    /// - `BEACON_HANDSHAKE_DIGEST` - `sha1` or `sha256`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(var) = std::env::var("BEACON_DATAGRAM_SIZE") {
            match var.parse::<usize>() {
                Ok(size) if size >= 64 => {
                    log::debug!("[CFG] BEACON_DATAGRAM_SIZE override: {}", size);
                    config.datagram_size = size;
                }
                _ => log::warn!(
                    "[CFG] invalid BEACON_DATAGRAM_SIZE='{}' - using {}",
                    var,
                    config.datagram_size
                ),
            }
        }

        if let Ok(var) = std::env::var("BEACON_MULTICAST_TTL") {
            match var.parse::<u32>() {
                Ok(ttl) => {
                    log::debug!("[CFG] BEACON_MULTICAST_TTL override: {}", ttl);
                    config.multicast_ttl = ttl;
                }
                Err(_) => log::warn!(
                    "[CFG] invalid BEACON_MULTICAST_TTL='{}' - using {}",
                    var,
                    config.multicast_ttl
                ),
            }
        }

        if let Ok(var) = std::env::var("BEACON_HANDSHAKE_DIGEST") {
            match var.to_ascii_lowercase().as_str() {
                "sha1" => config.handshake_digest = DigestAlgorithm::Sha1,
                "sha256" => config.handshake_digest = DigestAlgorithm::Sha256,
                other => log::warn!("[CFG] unknown BEACON_HANDSHAKE_DIGEST='{}'", other),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.datagram_size, DEFAULT_DATAGRAM_SIZE);
        assert_eq!(config.multicast_ttl, DEFAULT_MULTICAST_TTL);
        assert_eq!(config.handshake_digest, DigestAlgorithm::Sha1);
    }

    #[test]
    fn test_digest_output_len() {
        assert_eq!(DigestAlgorithm::Sha1.output_len(), 20);
        assert_eq!(DigestAlgorithm::Sha256.output_len(), 32);
    }
}
