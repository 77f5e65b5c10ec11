// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! Credential selection for the signed format.

use super::distill::DistilledConstraints;
use super::{CredentialGate, PrivateCredential, SecurityError};
use crate::constraint::ConstraintError;

/// Pick the credential to sign with.
///
/// Candidates are filtered by key algorithm (`supports_key`) and by the
/// permission gate, then scored against the distilled constraints; the
/// highest score wins and ties resolve to the first candidate in input
/// order (deterministic for a given order, nothing stronger).
///
/// When nothing survives, the error chains the first permission denial
/// only if the gate authorizes disclosure; otherwise the caller learns
/// just that the constraints are unsupported.
pub fn select_credential<'a>(
    credentials: &'a [PrivateCredential],
    distilled: &DistilledConstraints,
    gate: &dyn CredentialGate,
    supports_key: impl Fn(&PrivateCredential) -> bool,
) -> Result<&'a PrivateCredential, ConstraintError> {
    let mut denials: Vec<SecurityError> = Vec::new();
    let mut best: Option<(&'a PrivateCredential, i32)> = None;

    for credential in credentials {
        if !supports_key(credential) {
            log::debug!(
                "[X500] skipping '{}': key algorithm not usable by this format",
                credential.principal()
            );
            continue;
        }
        if !gate.usable(credential.principal(), distilled.role()) {
            log::debug!(
                "[X500] skipping '{}': not permitted for {}",
                credential.principal(),
                distilled.role()
            );
            denials.push(SecurityError::Denied {
                principal: credential.principal().to_string(),
                role: distilled.role(),
            });
            continue;
        }

        let score = distilled.score(credential.principal());
        if score < 0 {
            log::debug!(
                "[X500] skipping '{}': violates a distilled requirement",
                credential.principal()
            );
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((credential, score)),
        }
    }

    match best {
        Some((credential, score)) => {
            log::debug!(
                "[X500] selected '{}' (score {})",
                credential.principal(),
                score
            );
            Ok(credential)
        }
        None => {
            if gate.disclose_denials() && !denials.is_empty() {
                Err(ConstraintError::Unsupported {
                    reason: "no usable signing credential".into(),
                    cause: Some(Box::new(denials.remove(0))),
                })
            } else {
                Err(ConstraintError::unsupported(
                    "no usable signing credential satisfies the constraints",
                ))
            }
        }
    }
}
