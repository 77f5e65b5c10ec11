// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! Unicast discovery handshake over a captured connection.
//!
//! ```text
//! Connector                                Acceptor
//!    |                                        |
//!    |---- 1. hello frame (format name) ----->|
//!    |                                        |
//!    |<--- 2. response frame (registrar) -----|
//!    |                                        |
//!    |---- 3. digest(hello || response) ----->|
//!    |                                        | (compare byte-for-byte)
//! ```
//!
//! The digest covers the exact wire bytes both sides exchanged before the
//! secure channel's own authentication fully bound them, so any MITM
//! rewriting of the early exchange is detected. A mismatch is a protocol
//! error, not a retryable condition. The digest algorithm is
//! configuration, not protocol; both sides must agree out of band.

use super::SecureConnection;
use crate::config::DigestAlgorithm;
use crate::constraint::{Constraint, ConstraintError, ConstraintSet};
use crate::discovery::{Deadline, DiscoveryError};
use crate::protocol::unicast::{
    frame_body, read_frame, read_utf_stream, read_unicast_response, write_frame,
    write_utf_stream, write_unicast_response,
};
use crate::protocol::{CodecError, UnicastResponse};
use ring::digest;
use std::io::{Read, Write};

/// Connector side of the handshake.
///
/// Checks the integrity constraint against what the captured channel
/// provides, exchanges the two frames and sends the tamper-detection
/// digest. Returns the decoded unicast response.
pub fn connect_exchange(
    connection: &mut dyn SecureConnection,
    format_name: &str,
    constraints: &ConstraintSet,
    algorithm: DigestAlgorithm,
    deadline: Deadline,
) -> Result<UnicastResponse, DiscoveryError> {
    check_integrity(constraints, connection)?;

    connection.set_io_timeout(Some(deadline.require_remaining()?))?;
    let hello = {
        let mut body = Vec::new();
        write_utf_stream(&mut body, format_name)?;
        body
    };
    let request_wire = write_frame(connection.writer(), &hello)?;
    log::debug!(
        "[UNI] sent hello for format '{}' ({} bytes)",
        format_name,
        request_wire.len()
    );

    connection.set_io_timeout(Some(deadline.require_remaining()?))?;
    let response_wire = read_frame(connection.reader())?;
    let response = read_unicast_response(&mut frame_body(&response_wire))?;

    let hash = exchange_digest(algorithm, &request_wire, &response_wire);
    connection.set_io_timeout(Some(deadline.require_remaining()?))?;
    connection.writer().write_all(&hash).map_err(CodecError::Io)?;
    connection.writer().flush().map_err(CodecError::Io)?;
    log::debug!("[UNI] exchange complete, registrar {} bytes", response.registrar.len());

    Ok(response)
}

/// Acceptor side of the handshake.
///
/// Reads the hello, serves the response and verifies the connector's
/// digest byte-for-byte. Returns the format name the connector asked for.
pub fn accept_exchange(
    connection: &mut dyn SecureConnection,
    response: &UnicastResponse,
    algorithm: DigestAlgorithm,
    deadline: Deadline,
) -> Result<String, DiscoveryError> {
    connection.set_io_timeout(Some(deadline.require_remaining()?))?;
    let request_wire = read_frame(connection.reader())?;
    let format_name = read_utf_stream(&mut frame_body(&request_wire))?;
    log::debug!("[UNI] peer requested format '{}'", format_name);

    let mut body = Vec::new();
    write_unicast_response(&mut body, response)?;
    connection.set_io_timeout(Some(deadline.require_remaining()?))?;
    let response_wire = write_frame(connection.writer(), &body)?;

    let expected = exchange_digest(algorithm, &request_wire, &response_wire);
    let mut received = vec![0u8; algorithm.output_len()];
    connection.set_io_timeout(Some(deadline.require_remaining()?))?;
    connection
        .reader()
        .read_exact(&mut received)
        .map_err(CodecError::Io)?;

    if received != expected {
        return Err(CodecError::Decode {
            offset: 0,
            reason: "handshake hash mismatch: exchanged bytes were altered in transit".into(),
        }
        .into());
    }
    Ok(format_name)
}

/// Digest of the concatenated wire exchanges.
fn exchange_digest(algorithm: DigestAlgorithm, request: &[u8], response: &[u8]) -> Vec<u8> {
    let alg: &'static digest::Algorithm = match algorithm {
        DigestAlgorithm::Sha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
        DigestAlgorithm::Sha256 => &digest::SHA256,
    };
    let mut context = digest::Context::new(alg);
    context.update(request);
    context.update(response);
    context.finish().as_ref().to_vec()
}

/// The integrity gate: a required `Integrity::YES` is satisfiable only on
/// a channel that detects tampering. An OR-group demands integrity only
/// when every branch does.
fn check_integrity(
    constraints: &ConstraintSet,
    connection: &dyn SecureConnection,
) -> Result<(), ConstraintError> {
    if connection.provides_integrity() {
        return Ok(());
    }
    for requirement in constraints.requirements() {
        if requires_integrity(requirement) {
            return Err(ConstraintError::unsupported(
                "integrity required but the captured channel does not provide it",
            ));
        }
    }
    Ok(())
}

fn requires_integrity(constraint: &Constraint) -> bool {
    match constraint {
        Constraint::Integrity(true) => true,
        Constraint::Alternatives(alts) => alts.elements().iter().all(requires_integrity),
        _ => false,
    }
}
