// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! Invocation-constraint algebra.
//!
//! Constraints describe what security properties a discovery exchange must
//! (requirement) or should (preference) have. Values are immutable and
//! compared order-independently; boolean-valued constraints are a closed
//! two-value enum so structural equality doubles as identity.
//!
//! # Time constraints
//!
//! Relative-time constraints carry durations and are resolved against an
//! absolute base time with [`ConstraintSet::make_absolute`] before a format
//! can evaluate them. Resolution uses saturating arithmetic: a duration
//! added to a base near the representable boundary clamps to
//! `i64::MIN`/`i64::MAX` instead of wrapping.

mod alternatives;
mod set;

pub use alternatives::Alternatives;
pub use set::ConstraintSet;

use std::collections::BTreeSet;
use std::error::Error as StdError;
use std::fmt;

/// Constraint-layer errors.
#[derive(Debug)]
pub enum ConstraintError {
    /// Malformed constraint values. Always local and synchronous; never
    /// deferred to the wire.
    Invalid(String),

    /// A format or negotiator cannot satisfy a required constraint. May
    /// chain a more detailed denial cause when the caller is authorized to
    /// see it.
    Unsupported {
        reason: String,
        cause: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl ConstraintError {
    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        Self::Unsupported {
            reason: reason.into(),
            cause: None,
        }
    }
}

impl fmt::Display for ConstraintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(msg) => write!(f, "invalid constraint: {}", msg),
            Self::Unsupported { reason, .. } => write!(f, "unsupported constraint: {}", reason),
        }
    }
}

impl StdError for ConstraintError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Invalid(_) => None,
            Self::Unsupported { cause, .. } => {
                cause.as_deref().map(|e| e as &(dyn StdError + 'static))
            }
        }
    }
}

/// Class of a principal identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrincipalKind {
    /// X.500 distinguished name, the class the signed discovery format
    /// understands.
    X500,
    /// Opaque named principal from some other identity system.
    Named,
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X500 => write!(f, "x500"),
            Self::Named => write!(f, "named"),
        }
    }
}

/// A principal identity: a name plus its class.
///
/// Ordered and comparable so principal sets are order-independent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Principal {
    kind: PrincipalKind,
    name: String,
}

impl Principal {
    /// An X.500 principal identified by distinguished name.
    pub fn x500(name: impl Into<String>) -> Self {
        Self {
            kind: PrincipalKind::X500,
            name: name.into(),
        }
    }

    /// An opaque named principal.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            kind: PrincipalKind::Named,
            name: name.into(),
        }
    }

    pub fn kind(&self) -> PrincipalKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// Delegation window: four ordered times (or durations, for the relative
/// form).
///
/// Invariant: `min_start <= max_start <= min_stop <= max_stop`, and for
/// the relative form `min_stop >= 0`. Enforced at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub min_start: i64,
    pub max_start: i64,
    pub min_stop: i64,
    pub max_stop: i64,
}

impl TimeWindow {
    fn check_ordered(&self) -> Result<(), ConstraintError> {
        if self.min_start <= self.max_start
            && self.max_start <= self.min_stop
            && self.min_stop <= self.max_stop
        {
            Ok(())
        } else {
            Err(ConstraintError::Invalid(format!(
                "delegation window out of order: {} <= {} <= {} <= {} does not hold",
                self.min_start, self.max_start, self.min_stop, self.max_stop
            )))
        }
    }
}

/// A single invocation constraint.
///
/// The set of variants is closed; a format either understands a variant or
/// reports it unsupported. Construct validated values through the
/// associated constants and constructor helpers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Message content must (not) be hidden from third parties.
    Confidentiality(bool),
    /// Tampering with message content must (not) be detectable.
    Integrity(bool),
    /// The client side must (not) authenticate to the server.
    ClientAuthentication(bool),
    /// The server side must (not) authenticate to the client.
    ServerAuthentication(bool),
    /// The server must (not) be allowed to act as the client.
    Delegation(bool),
    /// The client must authenticate as at least all of these principals.
    ClientMinPrincipal(BTreeSet<Principal>),
    /// The client may authenticate only as principals in this set.
    ClientMaxPrincipal(BTreeSet<Principal>),
    /// The client must authenticate with at least these principal classes.
    ClientMinPrincipalType(BTreeSet<PrincipalKind>),
    /// The server must authenticate as at least all of these principals.
    ServerMinPrincipal(BTreeSet<Principal>),
    /// Connections must be established by this absolute time (ms since epoch).
    ConnectionAbsoluteTime(i64),
    /// Connections must be established within this duration (ms) of the
    /// base time supplied to [`ConstraintSet::make_absolute`].
    ConnectionRelativeTime(i64),
    /// Absolute delegation window (ms since epoch).
    DelegationAbsoluteTime(TimeWindow),
    /// Delegation window relative to the base time (ms offsets).
    DelegationRelativeTime(TimeWindow),
    /// OR-group: satisfied if any member is satisfied.
    Alternatives(Alternatives),
}

impl Constraint {
    pub const CONFIDENTIALITY_YES: Self = Self::Confidentiality(true);
    pub const CONFIDENTIALITY_NO: Self = Self::Confidentiality(false);
    pub const INTEGRITY_YES: Self = Self::Integrity(true);
    pub const INTEGRITY_NO: Self = Self::Integrity(false);
    pub const CLIENT_AUTH_YES: Self = Self::ClientAuthentication(true);
    pub const CLIENT_AUTH_NO: Self = Self::ClientAuthentication(false);
    pub const SERVER_AUTH_YES: Self = Self::ServerAuthentication(true);
    pub const SERVER_AUTH_NO: Self = Self::ServerAuthentication(false);
    pub const DELEGATION_YES: Self = Self::Delegation(true);
    pub const DELEGATION_NO: Self = Self::Delegation(false);

    /// Client-min-principal constraint over a non-empty principal set.
    pub fn client_min_principal(
        principals: impl IntoIterator<Item = Principal>,
    ) -> Result<Self, ConstraintError> {
        Ok(Self::ClientMinPrincipal(non_empty_set(
            principals,
            "client min principal",
        )?))
    }

    /// Client-max-principal constraint over a non-empty principal set.
    pub fn client_max_principal(
        principals: impl IntoIterator<Item = Principal>,
    ) -> Result<Self, ConstraintError> {
        Ok(Self::ClientMaxPrincipal(non_empty_set(
            principals,
            "client max principal",
        )?))
    }

    /// Client-min-principal-type constraint over a non-empty class set.
    pub fn client_min_principal_type(
        kinds: impl IntoIterator<Item = PrincipalKind>,
    ) -> Result<Self, ConstraintError> {
        let set: BTreeSet<PrincipalKind> = kinds.into_iter().collect();
        if set.is_empty() {
            return Err(ConstraintError::Invalid(
                "client min principal type: empty class set".into(),
            ));
        }
        Ok(Self::ClientMinPrincipalType(set))
    }

    /// Server-min-principal constraint over a non-empty principal set.
    pub fn server_min_principal(
        principals: impl IntoIterator<Item = Principal>,
    ) -> Result<Self, ConstraintError> {
        Ok(Self::ServerMinPrincipal(non_empty_set(
            principals,
            "server min principal",
        )?))
    }

    /// Relative connection deadline; the duration must be non-negative.
    pub fn connection_relative_time(duration_ms: i64) -> Result<Self, ConstraintError> {
        if duration_ms < 0 {
            return Err(ConstraintError::Invalid(format!(
                "connection relative time must be >= 0, got {}",
                duration_ms
            )));
        }
        Ok(Self::ConnectionRelativeTime(duration_ms))
    }

    /// Absolute delegation window; the four times must be ordered.
    pub fn delegation_absolute_time(
        min_start: i64,
        max_start: i64,
        min_stop: i64,
        max_stop: i64,
    ) -> Result<Self, ConstraintError> {
        let window = TimeWindow {
            min_start,
            max_start,
            min_stop,
            max_stop,
        };
        window.check_ordered()?;
        Ok(Self::DelegationAbsoluteTime(window))
    }

    /// Relative delegation window; ordered, with a non-negative `min_stop`
    /// (a window that can only stop in the past is unsatisfiable).
    pub fn delegation_relative_time(
        min_start: i64,
        max_start: i64,
        min_stop: i64,
        max_stop: i64,
    ) -> Result<Self, ConstraintError> {
        let window = TimeWindow {
            min_start,
            max_start,
            min_stop,
            max_stop,
        };
        window.check_ordered()?;
        if window.min_stop < 0 {
            return Err(ConstraintError::Invalid(format!(
                "delegation relative min_stop must be >= 0, got {}",
                window.min_stop
            )));
        }
        Ok(Self::DelegationRelativeTime(window))
    }

    /// True for relative-time constraints, recursing into alternatives.
    pub fn is_relative(&self) -> bool {
        match self {
            Self::ConnectionRelativeTime(_) | Self::DelegationRelativeTime(_) => true,
            Self::Alternatives(alts) => alts.is_relative(),
            _ => false,
        }
    }

    /// Resolve a relative-time constraint against `base_ms`, saturating at
    /// the representable boundary. Non-relative constraints return
    /// themselves unchanged.
    pub fn make_absolute(&self, base_ms: i64) -> Self {
        match self {
            Self::ConnectionRelativeTime(d) => {
                Self::ConnectionAbsoluteTime(base_ms.saturating_add(*d))
            }
            Self::DelegationRelativeTime(w) => Self::DelegationAbsoluteTime(TimeWindow {
                min_start: base_ms.saturating_add(w.min_start),
                max_start: base_ms.saturating_add(w.max_start),
                min_stop: base_ms.saturating_add(w.min_stop),
                max_stop: base_ms.saturating_add(w.max_stop),
            }),
            Self::Alternatives(alts) => {
                if alts.is_relative() {
                    alternatives::fold(
                        alts.elements()
                            .iter()
                            .map(|c| c.make_absolute(base_ms))
                            .collect(),
                    )
                } else {
                    self.clone()
                }
            }
            _ => self.clone(),
        }
    }

    /// Re-check construction invariants. Used at deserialization boundaries
    /// and when building constraint sets from raw collections.
    pub fn validate(&self) -> Result<(), ConstraintError> {
        match self {
            Self::ClientMinPrincipal(set) | Self::ClientMaxPrincipal(set)
            | Self::ServerMinPrincipal(set) => {
                if set.is_empty() {
                    return Err(ConstraintError::Invalid("empty principal set".into()));
                }
            }
            Self::ClientMinPrincipalType(set) => {
                if set.is_empty() {
                    return Err(ConstraintError::Invalid("empty principal class set".into()));
                }
            }
            Self::ConnectionRelativeTime(d) => {
                if *d < 0 {
                    return Err(ConstraintError::Invalid(
                        "negative connection relative time".into(),
                    ));
                }
            }
            Self::DelegationAbsoluteTime(w) => w.check_ordered()?,
            Self::DelegationRelativeTime(w) => {
                w.check_ordered()?;
                if w.min_stop < 0 {
                    return Err(ConstraintError::Invalid(
                        "negative delegation relative min_stop".into(),
                    ));
                }
            }
            Self::Alternatives(alts) => {
                for element in alts.elements() {
                    element.validate()?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn non_empty_set(
    principals: impl IntoIterator<Item = Principal>,
    what: &str,
) -> Result<BTreeSet<Principal>, ConstraintError> {
    let set: BTreeSet<Principal> = principals.into_iter().collect();
    if set.is_empty() {
        return Err(ConstraintError::Invalid(format!(
            "{}: empty principal set",
            what
        )));
    }
    Ok(set)
}
