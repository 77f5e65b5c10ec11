// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! Discovery orchestration: the multi-address unicast driver, the format
//! registry and multicast socket plumbing.

pub mod driver;
pub mod multicast_socket;
pub mod registry;

pub use driver::{discover_addrs, discover_host, PlaintextAttempt, UnicastAttempt};
pub use registry::{DiscoveryFormat, FormatContext, FormatRegistry};

use crate::constraint::{ConstraintError, ConstraintSet};
use crate::protocol::{CodecError, UnicastResponse};
use crate::security::SecurityError;
use std::fmt;
use std::io;
use std::time::{Duration, Instant};

/// Discovery-layer errors.
#[derive(Debug)]
pub enum DiscoveryError {
    /// The shared deadline was exceeded.
    Timeout,

    /// Socket-level failure (connect refused, reset, resolution failure).
    Io(io::Error),

    /// We connected but could not use what came back.
    Decode(CodecError),

    /// Identity-layer failure (verification, unknown principal, denial).
    Security(SecurityError),

    /// The constraints cannot be satisfied; fails the whole discovery, not
    /// just one address.
    Constraint(ConstraintError),

    /// Broken internal invariant. Not expected in correct operation.
    Internal(String),
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "discovery deadline exceeded"),
            Self::Io(e) => write!(f, "discovery i/o failure: {}", e),
            Self::Decode(e) => write!(f, "discovery decode failure: {}", e),
            Self::Security(e) => write!(f, "discovery security failure: {}", e),
            Self::Constraint(e) => write!(f, "{}", e),
            Self::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Decode(e) => Some(e),
            Self::Security(e) => Some(e),
            Self::Constraint(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DiscoveryError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::WouldBlock {
            Self::Timeout
        } else {
            Self::Io(e)
        }
    }
}

impl From<CodecError> for DiscoveryError {
    fn from(e: CodecError) -> Self {
        match e {
            // Stream-level I/O inside the codec is an I/O failure for
            // retry-priority purposes, not a malformed message.
            CodecError::Io(io_err) => Self::from(io_err),
            other => Self::Decode(other),
        }
    }
}

impl From<SecurityError> for DiscoveryError {
    fn from(e: SecurityError) -> Self {
        Self::Security(e)
    }
}

impl From<ConstraintError> for DiscoveryError {
    fn from(e: ConstraintError) -> Self {
        Self::Constraint(e)
    }
}

/// What a successful discovery yields: the registrar response plus the
/// constraints the chosen format actually fulfilled.
#[derive(Debug)]
pub struct DiscoveryOutcome {
    pub response: UnicastResponse,
    pub fulfilled: ConstraintSet,
}

/// Absolute deadline shared by every blocking operation of one discovery.
///
/// Each socket connect, read and rendezvous wait is bounded by the
/// remaining time; exceeding it surfaces [`DiscoveryError::Timeout`], not
/// a hang.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(duration: Duration) -> Self {
        Self {
            at: Instant::now() + duration,
        }
    }

    pub fn at(instant: Instant) -> Self {
        Self { at: instant }
    }

    /// Time left, or `None` once the deadline has passed. A zero
    /// remainder counts as passed; socket timeouts reject `Some(0)`.
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .checked_duration_since(Instant::now())
            .filter(|d| *d > Duration::ZERO)
    }

    /// Time left, or [`DiscoveryError::Timeout`].
    pub fn require_remaining(&self) -> Result<Duration, DiscoveryError> {
        self.remaining().ok_or(DiscoveryError::Timeout)
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_none()
    }
}
