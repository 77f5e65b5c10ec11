// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! OR-groups of constraints.

use super::{Constraint, ConstraintError};

/// An OR-group of constraints, satisfied if any member is satisfied.
///
/// Invariants: at least two elements after deduplication, no element is
/// itself an alternatives node, no duplicates.
#[derive(Debug, Clone, Eq)]
pub struct Alternatives {
    elements: Vec<Constraint>,
}

impl Alternatives {
    /// Build an OR-group. Duplicates are dropped; fewer than two surviving
    /// elements or a nested alternatives element is an error.
    pub fn new(elements: Vec<Constraint>) -> Result<Self, ConstraintError> {
        let deduped = dedup(elements);
        for element in &deduped {
            if matches!(element, Constraint::Alternatives(_)) {
                return Err(ConstraintError::Invalid(
                    "alternatives may not nest alternatives".into(),
                ));
            }
            element.validate()?;
        }
        if deduped.len() < 2 {
            return Err(ConstraintError::Invalid(format!(
                "alternatives requires at least 2 distinct constraints, got {}",
                deduped.len()
            )));
        }
        Ok(Self { elements: deduped })
    }

    /// Like [`Alternatives::new`], but folds to the single surviving
    /// constraint when deduplication leaves exactly one element.
    pub fn create(elements: Vec<Constraint>) -> Result<Constraint, ConstraintError> {
        let mut deduped = dedup(elements);
        match deduped.len() {
            0 => Err(ConstraintError::Invalid(
                "alternatives requires at least 1 constraint".into(),
            )),
            1 => {
                let only = deduped.remove(0);
                only.validate()?;
                Ok(only)
            }
            _ => Ok(Constraint::Alternatives(Self::new(deduped)?)),
        }
    }

    pub fn elements(&self) -> &[Constraint] {
        &self.elements
    }

    /// True if any member is a relative-time constraint.
    pub fn is_relative(&self) -> bool {
        self.elements.iter().any(Constraint::is_relative)
    }
}

/// Order-independent equality: same elements regardless of position.
impl PartialEq for Alternatives {
    fn eq(&self, other: &Self) -> bool {
        self.elements.len() == other.elements.len()
            && self.elements.iter().all(|c| other.elements.contains(c))
    }
}

/// Fold an already-validated, non-empty element list: dedup, then unwrap a
/// singleton or rebuild the OR-group. Used when mapping over the elements
/// of an existing group (e.g. relative -> absolute resolution), where two
/// distinct members can resolve to the same constraint.
pub(crate) fn fold(elements: Vec<Constraint>) -> Constraint {
    let mut deduped = dedup(elements);
    match deduped.len() {
        0 => unreachable!("fold over empty alternatives element list"),
        1 => deduped.remove(0),
        _ => Constraint::Alternatives(Alternatives { elements: deduped }),
    }
}

/// Deduplicate preserving first-seen order.
pub(crate) fn dedup(elements: Vec<Constraint>) -> Vec<Constraint> {
    let mut out: Vec<Constraint> = Vec::with_capacity(elements.len());
    for element in elements {
        if !out.contains(&element) {
            out.push(element);
        }
    }
    out
}
