// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! Multi-address unicast discovery driver.
//!
//! `Resolve -> {TryAddress}* -> Success | ExhaustedFailure`: every address
//! a hostname resolves to is tried in order under one shared absolute
//! deadline. Failures are recorded and the next address attempted; this
//! is the only layer that retries, and it never resends on the same
//! address. When every address fails, the recorded errors re-raise in
//! priority order: decode ("connected but could not use the result")
//! ahead of I/O ("could not connect") ahead of security.

use super::{Deadline, DiscoveryError, DiscoveryOutcome};
use crate::config::{DigestAlgorithm, RuntimeConfig};
use crate::constraint::ConstraintSet;
use crate::endpoint::{handshake, PlainConnection, SecureConnection};
use crate::protocol::plaintext;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

/// One unicast discovery exchange over an established socket.
///
/// Implementations pick the format: plaintext framing, signed framing, or
/// an endpoint-bridge capture wrapping the stream first.
pub trait UnicastAttempt {
    fn discover(
        &self,
        stream: TcpStream,
        deadline: Deadline,
    ) -> Result<DiscoveryOutcome, DiscoveryError>;
}

/// Plaintext unicast discovery: constraint gate, then the handshake over
/// the raw stream.
pub struct PlaintextAttempt {
    constraints: ConstraintSet,
    digest: DigestAlgorithm,
}

impl PlaintextAttempt {
    pub fn new(config: &RuntimeConfig, constraints: ConstraintSet) -> Self {
        Self {
            constraints,
            digest: config.handshake_digest,
        }
    }
}

impl UnicastAttempt for PlaintextAttempt {
    fn discover(
        &self,
        stream: TcpStream,
        deadline: Deadline,
    ) -> Result<DiscoveryOutcome, DiscoveryError> {
        plaintext::check_constraints(&self.constraints)?;
        let mut connection = PlainConnection::new(stream);
        let result = handshake::connect_exchange(
            &mut connection,
            "plaintext",
            &self.constraints,
            self.digest,
            deadline,
        );
        let closed = connection.close();
        let response = result?;
        closed.map_err(DiscoveryError::Io)?;
        Ok(DiscoveryOutcome {
            response,
            // Every requirement passed the plaintext gate, so the set as
            // given is what this exchange fulfilled.
            fulfilled: self.constraints.clone(),
        })
    }
}

/// Discover against every address `host` resolves to.
///
/// If resolution fails the bare hostname is attempted once (the OS
/// resolves during connect), so resolution problems surface as a recorded
/// connect failure like any other.
pub fn discover_host(
    host: &str,
    port: u16,
    attempt: &dyn UnicastAttempt,
    deadline: Deadline,
) -> Result<DiscoveryOutcome, DiscoveryError> {
    match (host, port).to_socket_addrs() {
        Ok(addrs) => {
            let addrs: Vec<SocketAddr> = addrs.collect();
            log::debug!("[DISC] '{}' resolved to {} address(es)", host, addrs.len());
            discover_addrs(&addrs, attempt, deadline)
        }
        Err(e) => {
            log::debug!("[DISC] resolution of '{}' failed ({}), trying bare hostname", host, e);
            discover_unresolved(host, port, attempt, deadline)
        }
    }
}

/// Driver core over an explicit address list.
pub fn discover_addrs(
    addrs: &[SocketAddr],
    attempt: &dyn UnicastAttempt,
    deadline: Deadline,
) -> Result<DiscoveryOutcome, DiscoveryError> {
    let mut recorded = RecordedFailures::default();
    if addrs.is_empty() {
        return Err(recorded.into_error("no addresses to try"));
    }

    for addr in addrs {
        if deadline.is_expired() {
            log::debug!("[DISC] deadline passed before trying {}", addr);
            return Err(DiscoveryError::Timeout);
        }
        match try_address(*addr, attempt, deadline) {
            Ok(outcome) => return Ok(outcome),
            Err(e) => {
                if let Some(fatal) = recorded.record(addr.to_string(), e) {
                    return Err(fatal);
                }
            }
        }
    }
    Err(recorded.into_error("all addresses failed"))
}

fn discover_unresolved(
    host: &str,
    port: u16,
    attempt: &dyn UnicastAttempt,
    deadline: Deadline,
) -> Result<DiscoveryOutcome, DiscoveryError> {
    deadline.require_remaining()?;
    // No per-connect timeout is available for an unresolved name; the OS
    // connect timeout applies, and everything after the connect is still
    // deadline-bounded.
    let stream = TcpStream::connect((host, port)).map_err(DiscoveryError::from)?;
    try_stream(stream, attempt, deadline)
}

fn try_address(
    addr: SocketAddr,
    attempt: &dyn UnicastAttempt,
    deadline: Deadline,
) -> Result<DiscoveryOutcome, DiscoveryError> {
    let remaining = deadline.require_remaining()?;
    log::debug!("[DISC] trying {} ({:?} remaining)", addr, remaining);
    let stream = TcpStream::connect_timeout(&addr, remaining).map_err(DiscoveryError::from)?;
    try_stream(stream, attempt, deadline)
}

fn try_stream(
    stream: TcpStream,
    attempt: &dyn UnicastAttempt,
    deadline: Deadline,
) -> Result<DiscoveryOutcome, DiscoveryError> {
    stream.set_nodelay(true)?;
    attempt.discover(stream, deadline)
}

/// First-of-each-kind failure record with the re-raise priority baked in.
#[derive(Default)]
struct RecordedFailures {
    decode: Option<DiscoveryError>,
    io: Option<DiscoveryError>,
    security: Option<DiscoveryError>,
}

impl RecordedFailures {
    /// Record a per-address failure, or return it when it is fatal to the
    /// whole discovery (timeout, constraint, broken invariant).
    fn record(&mut self, addr: String, error: DiscoveryError) -> Option<DiscoveryError> {
        match &error {
            DiscoveryError::Timeout
            | DiscoveryError::Constraint(_)
            | DiscoveryError::Internal(_) => return Some(error),
            DiscoveryError::Decode(_) => {
                log::debug!("[DISC] {} returned an unusable result: {}", addr, error);
                self.decode.get_or_insert(error);
            }
            DiscoveryError::Io(_) => {
                log::debug!("[DISC] {} i/o failure: {}", addr, error);
                self.io.get_or_insert(error);
            }
            DiscoveryError::Security(_) => {
                log::debug!("[DISC] {} security failure: {}", addr, error);
                self.security.get_or_insert(error);
            }
        }
        None
    }

    fn into_error(self, context: &str) -> DiscoveryError {
        self.decode
            .or(self.io)
            .or(self.security)
            .unwrap_or_else(|| {
                DiscoveryError::Io(io::Error::new(io::ErrorKind::AddrNotAvailable, context.to_string()))
            })
    }
}
