// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! The unauthenticated plaintext format.
//!
//! Plaintext carries no identity, no confidentiality and no integrity
//! protection, so the only constraints it accepts are the ones satisfied
//! by doing nothing. The check runs before any bytes are sent.

use super::{multicast, Datagram, DatagramFactory, MulticastAnnouncement, MulticastRequest};
use crate::constraint::{Constraint, ConstraintError, ConstraintSet};
use crate::discovery::{DiscoveryError, DiscoveryFormat, FormatContext};

/// Reject any required constraint the plaintext format cannot satisfy.
///
/// The allow-list is exact: `Integrity::NO`, `Confidentiality::NO`,
/// `ClientAuthentication::NO`, `ServerAuthentication::NO`,
/// `Delegation::NO`, or a principal-class constraint. An alternatives
/// group is acceptable if any branch is. Preferences never fail the
/// check; they are best-effort by definition.
pub fn check_constraints(constraints: &ConstraintSet) -> Result<(), ConstraintError> {
    for requirement in constraints.requirements() {
        if !acceptable(requirement) {
            return Err(ConstraintError::unsupported(format!(
                "plaintext format cannot satisfy {:?}",
                requirement
            )));
        }
    }
    Ok(())
}

fn acceptable(constraint: &Constraint) -> bool {
    match constraint {
        Constraint::Integrity(false)
        | Constraint::Confidentiality(false)
        | Constraint::ClientAuthentication(false)
        | Constraint::ServerAuthentication(false)
        | Constraint::Delegation(false)
        | Constraint::ClientMinPrincipalType(_) => true,
        Constraint::Alternatives(alts) => alts.elements().iter().any(acceptable),
        _ => false,
    }
}

/// Plaintext provider: the wire codec with the constraint gate in front.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextFormat;

impl DiscoveryFormat for PlaintextFormat {
    fn name(&self) -> &'static str {
        "plaintext"
    }

    fn encode_request(
        &self,
        request: &MulticastRequest,
        cx: &FormatContext<'_>,
        factory: &mut dyn DatagramFactory,
    ) -> Result<Vec<Datagram>, DiscoveryError> {
        check_constraints(cx.constraints)?;
        Ok(multicast::encode_multicast_request(request, factory)?)
    }

    fn decode_request(
        &self,
        bytes: &[u8],
        _cx: &FormatContext<'_>,
    ) -> Result<MulticastRequest, DiscoveryError> {
        Ok(multicast::decode_multicast_request(bytes)?)
    }

    fn encode_announcement(
        &self,
        announcement: &MulticastAnnouncement,
        cx: &FormatContext<'_>,
        factory: &mut dyn DatagramFactory,
    ) -> Result<Vec<Datagram>, DiscoveryError> {
        check_constraints(cx.constraints)?;
        Ok(multicast::encode_multicast_announcement(announcement, factory)?)
    }

    fn decode_announcement(
        &self,
        bytes: &[u8],
        _cx: &FormatContext<'_>,
    ) -> Result<MulticastAnnouncement, DiscoveryError> {
        Ok(multicast::decode_multicast_announcement(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{Alternatives, PrincipalKind};
    use crate::protocol::{FixedSizeFactory, ServiceId};

    #[test]
    fn test_allow_list_accepts_negative_constraints() {
        let constraints = ConstraintSet::new(
            vec![
                Constraint::INTEGRITY_NO,
                Constraint::CONFIDENTIALITY_NO,
                Constraint::CLIENT_AUTH_NO,
                Constraint::SERVER_AUTH_NO,
                Constraint::DELEGATION_NO,
                Constraint::client_min_principal_type([PrincipalKind::X500])
                    .expect("valid class set"),
            ],
            vec![],
        )
        .expect("valid set");
        check_constraints(&constraints).expect("all acceptable");
    }

    #[test]
    fn test_client_auth_yes_rejected_as_requirement() {
        let constraints =
            ConstraintSet::new(vec![Constraint::CLIENT_AUTH_YES], vec![]).expect("valid set");
        let err = check_constraints(&constraints).unwrap_err();
        assert!(matches!(err, ConstraintError::Unsupported { .. }));
    }

    #[test]
    fn test_client_auth_yes_accepted_inside_alternatives_with_no() {
        let alts = Alternatives::create(vec![
            Constraint::CLIENT_AUTH_YES,
            Constraint::CLIENT_AUTH_NO,
        ])
        .expect("valid group");
        let constraints = ConstraintSet::new(vec![alts], vec![]).expect("valid set");
        check_constraints(&constraints).expect("one branch acceptable");
    }

    #[test]
    fn test_unsupported_preference_is_ignored() {
        let constraints = ConstraintSet::new(vec![], vec![Constraint::CONFIDENTIALITY_YES])
            .expect("valid set");
        check_constraints(&constraints).expect("preferences never fail the check");
    }

    #[test]
    fn test_encode_fails_before_any_bytes_on_unsupported_requirement() {
        let constraints =
            ConstraintSet::new(vec![Constraint::INTEGRITY_YES], vec![]).expect("valid set");
        let cx = FormatContext::anonymous(&constraints);
        let request = MulticastRequest {
            host: "h".into(),
            port: 4160,
            groups: vec![],
            service_ids: vec![ServiceId { hi: 1, lo: 2 }],
        };
        let mut factory = FixedSizeFactory::new(512);
        let err = PlaintextFormat
            .encode_request(&request, &cx, &mut factory)
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::Constraint(_)));
    }

    #[test]
    fn test_format_roundtrip_with_empty_constraints() {
        let constraints = ConstraintSet::empty();
        let cx = FormatContext::anonymous(&constraints);
        let request = MulticastRequest {
            host: "client.example".into(),
            port: 4160,
            groups: vec!["public".into()],
            service_ids: vec![],
        };
        let mut factory = FixedSizeFactory::new(512);
        let datagrams = PlaintextFormat
            .encode_request(&request, &cx, &mut factory)
            .expect("encode should succeed");
        let decoded = PlaintextFormat
            .decode_request(datagrams[0].as_bytes(), &cx)
            .expect("decode should succeed");
        assert_eq!(decoded, request);
    }
}
