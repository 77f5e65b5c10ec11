// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! Deduplicated requirement/preference sets.

use super::alternatives::dedup;
use super::{Constraint, ConstraintError};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// An immutable set of constraint requirements and preferences.
///
/// Requirements must hold for the exchange to proceed; preferences are
/// satisfied best-effort without violating requirements. Both collections
/// are deduplicated with order-independent equality, and no preference
/// duplicates a requirement. Cloning is cheap (shared representation).
#[derive(Clone)]
pub struct ConstraintSet {
    inner: Arc<SetInner>,
}

struct SetInner {
    requirements: Vec<Constraint>,
    preferences: Vec<Constraint>,
}

static EMPTY: OnceLock<ConstraintSet> = OnceLock::new();

impl ConstraintSet {
    /// Build a set from raw requirement and preference collections.
    ///
    /// Duplicates are dropped (first occurrence wins), preferences already
    /// present as requirements are dropped, and every element is
    /// re-validated so a malformed constraint fails here rather than at
    /// negotiation time.
    pub fn new(
        requirements: Vec<Constraint>,
        preferences: Vec<Constraint>,
    ) -> Result<Self, ConstraintError> {
        for constraint in requirements.iter().chain(preferences.iter()) {
            constraint.validate()?;
        }
        let requirements = dedup(requirements);
        let preferences: Vec<Constraint> = dedup(preferences)
            .into_iter()
            .filter(|p| !requirements.contains(p))
            .collect();
        Ok(Self {
            inner: Arc::new(SetInner {
                requirements,
                preferences,
            }),
        })
    }

    /// The distinguished empty set.
    pub fn empty() -> Self {
        EMPTY
            .get_or_init(|| Self {
                inner: Arc::new(SetInner {
                    requirements: Vec::new(),
                    preferences: Vec::new(),
                }),
            })
            .clone()
    }

    pub fn requirements(&self) -> &[Constraint] {
        &self.inner.requirements
    }

    pub fn preferences(&self) -> &[Constraint] {
        &self.inner.preferences
    }

    pub fn is_empty(&self) -> bool {
        self.inner.requirements.is_empty() && self.inner.preferences.is_empty()
    }

    /// Union of two sets: requirements are merged, and a preference that
    /// either side holds as a requirement is promoted (i.e. dropped from
    /// preferences). Commutative and associative modulo set equality.
    pub fn combine(&self, other: &Self) -> Self {
        let mut requirements = self.inner.requirements.clone();
        for req in &other.inner.requirements {
            if !requirements.contains(req) {
                requirements.push(req.clone());
            }
        }
        let mut preferences: Vec<Constraint> = Vec::new();
        for pref in self
            .inner
            .preferences
            .iter()
            .chain(other.inner.preferences.iter())
        {
            if !requirements.contains(pref) && !preferences.contains(pref) {
                preferences.push(pref.clone());
            }
        }
        Self {
            inner: Arc::new(SetInner {
                requirements,
                preferences,
            }),
        }
    }

    /// True if any element (recursing into alternatives) is relative.
    pub fn has_relative(&self) -> bool {
        self.inner
            .requirements
            .iter()
            .chain(self.inner.preferences.iter())
            .any(Constraint::is_relative)
    }

    /// Resolve every relative-time constraint against `base_ms`.
    ///
    /// Returns a new set with each relative leaf replaced by its absolute
    /// equivalent (saturating arithmetic). When nothing is relative the
    /// same shared representation is returned unchanged, so repeated
    /// application is both idempotent and allocation-free.
    pub fn make_absolute(&self, base_ms: i64) -> Self {
        if !self.has_relative() {
            return self.clone();
        }
        // Resolution can collapse formerly-distinct constraints (a relative
        // and an absolute leaf meeting at the same instant), so dedup and
        // the preference/requirement exclusion both run again.
        let requirements: Vec<Constraint> = self
            .inner
            .requirements
            .iter()
            .map(|c| c.make_absolute(base_ms))
            .collect();
        let requirements = dedup(requirements);
        let preferences: Vec<Constraint> = self
            .inner
            .preferences
            .iter()
            .map(|c| c.make_absolute(base_ms))
            .collect();
        let preferences = dedup(preferences)
            .into_iter()
            .filter(|p| !requirements.contains(p))
            .collect();
        Self {
            inner: Arc::new(SetInner {
                requirements,
                preferences,
            }),
        }
    }
}

/// Order-independent set equality over both collections.
impl PartialEq for ConstraintSet {
    fn eq(&self, other: &Self) -> bool {
        set_eq(&self.inner.requirements, &other.inner.requirements)
            && set_eq(&self.inner.preferences, &other.inner.preferences)
    }
}

impl Eq for ConstraintSet {}

impl fmt::Debug for ConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintSet")
            .field("requirements", &self.inner.requirements)
            .field("preferences", &self.inner.preferences)
            .finish()
    }
}

fn set_eq(a: &[Constraint], b: &[Constraint]) -> bool {
    a.len() == b.len() && a.iter().all(|c| b.contains(c))
}
