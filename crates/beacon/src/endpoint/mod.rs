// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! Secure-transport capture bridge.
//!
//! Non-PKI formats (TLS-backed, Kerberos-backed, anything else) reuse the
//! unicast discovery handshake without per-format transport code: the
//! bridge hands a pluggable secure endpoint a stand-in connection manager
//! (client side) or a one-shot listener (server side), captures the
//! secured connection the endpoint establishes and runs the handshake
//! over its raw streams. The transport's own protocol machinery is never
//! reimplemented here.

pub mod capture;
pub mod handshake;

pub use capture::{capture_incoming, capture_outbound, OneShotListener, Rendezvous};
pub use handshake::{accept_exchange, connect_exchange};

use crate::constraint::ConstraintSet;
use crate::discovery::DiscoveryError;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::time::Duration;

/// A live, already-secured point-to-point connection.
///
/// The bridge only ever touches the raw streams; whatever cryptography
/// the transport performs stays inside the implementation.
pub trait SecureConnection: Send {
    fn reader(&mut self) -> &mut dyn Read;

    fn writer(&mut self) -> &mut dyn Write;

    /// Whether the channel itself detects tampering of exchanged bytes.
    fn provides_integrity(&self) -> bool;

    /// Bound the next blocking reads/writes. Transports without timeout
    /// control may ignore this.
    fn set_io_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        let _ = timeout;
        Ok(())
    }

    /// Release the underlying resources. Must be safe to call twice.
    fn close(&mut self) -> io::Result<()>;
}

/// What a [`ConnectionManager`] tells the endpoint to do after receiving
/// a connection. The capture manager always detaches: the endpoint must
/// perform no further I/O on the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDispatch {
    Detached,
}

/// Receives the secured connection an [`Endpoint`] establishes.
pub trait ConnectionManager {
    fn connected(&mut self, connection: Box<dyn SecureConnection>) -> RequestDispatch;
}

/// Client side of a pluggable secure transport.
pub trait Endpoint {
    /// Establish one secured outbound connection and deliver it to
    /// `manager`. An endpoint that cannot satisfy `constraints` must
    /// return an unsupported-constraint error without ever calling the
    /// manager; reaching the manager asserts satisfiability.
    fn new_request(
        &self,
        manager: &mut dyn ConnectionManager,
        constraints: &ConstraintSet,
    ) -> Result<(), DiscoveryError>;
}

/// Server side of a pluggable secure transport.
pub trait ServerEndpoint {
    /// Run the accept-and-secure loop against `listener`, delivering each
    /// secured connection to `slot` (typically from a background thread).
    /// The bridge's listener replays exactly one raw connection and then
    /// blocks, so at most one delivery can win the slot.
    fn start(
        &self,
        listener: Arc<OneShotListener>,
        slot: Arc<Rendezvous>,
    ) -> Result<(), DiscoveryError>;
}

/// Plain TCP adapter: the degenerate "secure" connection used by the
/// plaintext unicast path. Provides no integrity.
pub struct PlainConnection {
    stream: TcpStream,
}

impl PlainConnection {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }
}

impl SecureConnection for PlainConnection {
    fn reader(&mut self) -> &mut dyn Read {
        &mut self.stream
    }

    fn writer(&mut self) -> &mut dyn Write {
        &mut self.stream
    }

    fn provides_integrity(&self) -> bool {
        false
    }

    fn set_io_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_read_timeout(timeout)?;
        self.stream.set_write_timeout(timeout)
    }

    fn close(&mut self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

impl Drop for PlainConnection {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
