// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! Constraint distillation for the signed identity format.
//!
//! Given a constraint set and a signing direction, every requirement is
//! classified as satisfied outright (dropped), principal-dependent (kept
//! and evaluated per candidate credential) or unsupported (fails the
//! whole distillation). Preferences follow the same classification but
//! never abort; unsupported preferences are simply dropped.
//!
//! Classification is direction-sensitive. The signing side's
//! authentication-YES is what the signature provides; the other side does
//! not participate in a datagram exchange at all, so constraints naming
//! it are vacuously satisfied. The format never encrypts, never delegates
//! and always signs, and a datagram exchange has no connection whose
//! establishment a time constraint could bound.

use super::SigningRole;
use crate::constraint::{Constraint, ConstraintError, ConstraintSet, Principal, PrincipalKind};
use std::collections::BTreeSet;

/// Classification of one constraint against the signed format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Distilled {
    /// Satisfied outright by the format; nothing left to check.
    Satisfied,
    /// Satisfaction depends on which principal signs.
    Principal(PrincipalTest),
    /// The format cannot satisfy this constraint.
    Unsupported,
}

/// Principal-dependent residue of one constraint: a single test, or an
/// OR-group rebuilt from the principal-dependent branches of an
/// alternatives node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrincipalTest {
    Single(PrincipalConstraint),
    AnyOf(Vec<PrincipalConstraint>),
}

impl PrincipalTest {
    pub fn satisfied_by(&self, principal: &Principal) -> bool {
        match self {
            Self::Single(constraint) => constraint.satisfied_by(principal),
            Self::AnyOf(branches) => branches.iter().any(|c| c.satisfied_by(principal)),
        }
    }
}

/// The principal-dependent constraint kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrincipalConstraint {
    ClientMin(BTreeSet<Principal>),
    ClientMax(BTreeSet<Principal>),
    ClientMinType(BTreeSet<PrincipalKind>),
    ServerMin(BTreeSet<Principal>),
}

impl PrincipalConstraint {
    /// Whether the single signing principal satisfies this constraint.
    ///
    /// A discovery message is signed by exactly one principal, so a
    /// min-set is satisfiable only when it names that principal alone.
    pub fn satisfied_by(&self, principal: &Principal) -> bool {
        match self {
            Self::ClientMin(set) | Self::ServerMin(set) => {
                set.len() == 1 && set.contains(principal)
            }
            Self::ClientMax(set) => set.contains(principal),
            Self::ClientMinType(kinds) => {
                kinds.len() == 1 && kinds.contains(&principal.kind())
            }
        }
    }
}

/// Principal-dependent residue of a whole constraint set, scoped to one
/// signing direction. Created per discovery attempt and discarded after
/// credential selection.
#[derive(Debug)]
pub struct DistilledConstraints {
    role: SigningRole,
    requirements: Vec<PrincipalTest>,
    preferences: Vec<PrincipalTest>,
}

impl DistilledConstraints {
    pub fn role(&self) -> SigningRole {
        self.role
    }

    pub fn requirements(&self) -> &[PrincipalTest] {
        &self.requirements
    }

    pub fn preferences(&self) -> &[PrincipalTest] {
        &self.preferences
    }

    /// Score a candidate principal: -1 if any distilled requirement is
    /// violated, otherwise the number of distilled preferences satisfied.
    /// Requirements dominate; preferences only break the remainder apart.
    pub fn score(&self, principal: &Principal) -> i32 {
        for requirement in &self.requirements {
            if !requirement.satisfied_by(principal) {
                return -1;
            }
        }
        self.preferences
            .iter()
            .filter(|p| p.satisfied_by(principal))
            .count() as i32
    }
}

/// Distill a constraint set for the given signing direction.
///
/// Fails with [`ConstraintError::Unsupported`] when any requirement is
/// unsupported; unsupported preferences are dropped silently.
pub fn distill(
    constraints: &ConstraintSet,
    role: SigningRole,
) -> Result<DistilledConstraints, ConstraintError> {
    let mut requirements = Vec::new();
    for requirement in constraints.requirements() {
        match classify(requirement, role) {
            Distilled::Satisfied => {}
            Distilled::Principal(test) => requirements.push(test),
            Distilled::Unsupported => {
                return Err(ConstraintError::unsupported(format!(
                    "signed format cannot satisfy {:?} for {}",
                    requirement, role
                )));
            }
        }
    }

    let mut preferences = Vec::new();
    for preference in constraints.preferences() {
        if let Distilled::Principal(test) = classify(preference, role) {
            preferences.push(test);
        }
    }

    Ok(DistilledConstraints {
        role,
        requirements,
        preferences,
    })
}

/// Classify one constraint. Pure; reserves error propagation for the
/// caller deciding what unsupported means in context.
pub fn classify(constraint: &Constraint, role: SigningRole) -> Distilled {
    match constraint {
        // The signature is the integrity mechanism; a requirement to go
        // without one is the only integrity value this format cannot do.
        Constraint::Integrity(true) => Distilled::Satisfied,
        Constraint::Integrity(false) => Distilled::Unsupported,

        Constraint::Confidentiality(false) => Distilled::Satisfied,
        Constraint::Confidentiality(true) => Distilled::Unsupported,

        Constraint::Delegation(false) => Distilled::Satisfied,
        Constraint::Delegation(true) => Distilled::Unsupported,

        Constraint::ClientAuthentication(yes) => match role {
            SigningRole::Request => {
                if *yes {
                    Distilled::Satisfied
                } else {
                    Distilled::Unsupported
                }
            }
            SigningRole::Announcement => Distilled::Satisfied,
        },

        Constraint::ServerAuthentication(yes) => match role {
            SigningRole::Announcement => {
                if *yes {
                    Distilled::Satisfied
                } else {
                    Distilled::Unsupported
                }
            }
            SigningRole::Request => Distilled::Satisfied,
        },

        Constraint::ClientMinPrincipal(set) => match role {
            SigningRole::Request => {
                Distilled::Principal(PrincipalTest::Single(PrincipalConstraint::ClientMin(
                    set.clone(),
                )))
            }
            SigningRole::Announcement => Distilled::Satisfied,
        },

        Constraint::ClientMaxPrincipal(set) => match role {
            SigningRole::Request => {
                Distilled::Principal(PrincipalTest::Single(PrincipalConstraint::ClientMax(
                    set.clone(),
                )))
            }
            SigningRole::Announcement => Distilled::Satisfied,
        },

        Constraint::ClientMinPrincipalType(kinds) => match role {
            SigningRole::Request => {
                Distilled::Principal(PrincipalTest::Single(PrincipalConstraint::ClientMinType(
                    kinds.clone(),
                )))
            }
            SigningRole::Announcement => Distilled::Satisfied,
        },

        Constraint::ServerMinPrincipal(set) => match role {
            SigningRole::Announcement => {
                Distilled::Principal(PrincipalTest::Single(PrincipalConstraint::ServerMin(
                    set.clone(),
                )))
            }
            SigningRole::Request => Distilled::Satisfied,
        },

        Constraint::ConnectionAbsoluteTime(_)
        | Constraint::ConnectionRelativeTime(_)
        | Constraint::DelegationAbsoluteTime(_)
        | Constraint::DelegationRelativeTime(_) => Distilled::Unsupported,

        Constraint::Alternatives(alts) => {
            let mut branches = Vec::new();
            for element in alts.elements() {
                match classify(element, role) {
                    Distilled::Satisfied => return Distilled::Satisfied,
                    Distilled::Principal(PrincipalTest::Single(c)) => branches.push(c),
                    // Elements of an alternatives node are themselves
                    // non-alternatives, so AnyOf cannot appear here.
                    Distilled::Principal(PrincipalTest::AnyOf(mut cs)) => {
                        branches.append(&mut cs);
                    }
                    Distilled::Unsupported => {}
                }
            }
            if branches.is_empty() {
                Distilled::Unsupported
            } else {
                Distilled::Principal(PrincipalTest::AnyOf(branches))
            }
        }
    }
}
