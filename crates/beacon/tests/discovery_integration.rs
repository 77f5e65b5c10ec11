// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! End-to-end unicast discovery over real sockets.

use beacon::config::{DigestAlgorithm, RuntimeConfig};
use beacon::constraint::{Constraint, ConstraintSet};
use beacon::discovery::{discover_addrs, Deadline, DiscoveryError, PlaintextAttempt};
use beacon::endpoint::{
    accept_exchange, capture_incoming, connect_exchange, OneShotListener, PlainConnection,
    Rendezvous, SecureConnection, ServerEndpoint,
};
use beacon::protocol::UnicastResponse;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn sample_response() -> UnicastResponse {
    UnicastResponse {
        host: "registrar.example".into(),
        port: 4160,
        groups: vec!["public".into(), "staging".into()],
        registrar: vec![0xde, 0xad, 0xbe, 0xef, 0x42],
    }
}

/// Accept one connection and serve the plaintext unicast exchange.
fn serve_once(
    listener: TcpListener,
    response: UnicastResponse,
) -> thread::JoinHandle<Result<String, DiscoveryError>> {
    thread::spawn(move || {
        let (stream, _peer) = listener.accept().map_err(DiscoveryError::Io)?;
        let mut connection = PlainConnection::new(stream);
        accept_exchange(
            &mut connection,
            &response,
            DigestAlgorithm::Sha1,
            Deadline::after(Duration::from_secs(10)),
        )
    })
}

fn refusing_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind succeeds");
    listener.local_addr().expect("local addr")
}

#[test]
fn test_plaintext_unicast_end_to_end() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind succeeds");
    let addr = listener.local_addr().expect("local addr");
    let server = serve_once(listener, sample_response());

    let config = RuntimeConfig::default();
    let attempt = PlaintextAttempt::new(&config, ConstraintSet::empty());
    let outcome = discover_addrs(
        &[addr],
        &attempt,
        Deadline::after(Duration::from_secs(10)),
    )
    .expect("discovery succeeds");

    assert_eq!(outcome.response, sample_response());
    let format = server
        .join()
        .expect("server thread exits")
        .expect("server side succeeds");
    assert_eq!(format, "plaintext");
}

#[test]
fn test_third_address_succeeds_after_two_refusals() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind succeeds");
    let live = listener.local_addr().expect("local addr");
    let server = serve_once(listener, sample_response());

    let addrs = [refusing_addr(), refusing_addr(), live];
    let config = RuntimeConfig::default();
    let attempt = PlaintextAttempt::new(&config, ConstraintSet::empty());
    let outcome = discover_addrs(
        &addrs,
        &attempt,
        Deadline::after(Duration::from_secs(10)),
    )
    .expect("third address succeeds");
    assert_eq!(outcome.response.host, "registrar.example");
    server.join().expect("server thread exits").expect("server side succeeds");
}

#[test]
fn test_unsatisfiable_constraints_abort_before_any_bytes() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind succeeds");
    let addr = listener.local_addr().expect("local addr");
    let _accepts = thread::spawn(move || {
        let _ = listener.accept();
    });

    let config = RuntimeConfig::default();
    let constraints =
        ConstraintSet::new(vec![Constraint::CLIENT_AUTH_YES], vec![]).expect("valid set");
    let attempt = PlaintextAttempt::new(&config, constraints);
    let err = discover_addrs(
        &[addr],
        &attempt,
        Deadline::after(Duration::from_secs(5)),
    )
    .unwrap_err();
    // A constraint failure is fatal to the whole discovery, not recorded
    // as a per-address error.
    assert!(matches!(err, DiscoveryError::Constraint(_)));
}

/// Server endpoint standing in for a pluggable secure transport: accepts
/// the replayed raw connection and offers it, unchanged, to the slot.
struct PassthroughServerEndpoint;

impl ServerEndpoint for PassthroughServerEndpoint {
    fn start(
        &self,
        listener: Arc<OneShotListener>,
        slot: Arc<Rendezvous>,
    ) -> Result<(), DiscoveryError> {
        thread::spawn(move || {
            if let Ok(stream) = listener.accept() {
                let connection: Box<dyn SecureConnection> =
                    Box::new(PlainConnection::new(stream));
                if let Some(mut refused) = slot.offer(connection) {
                    let _ = refused.close();
                }
            }
        });
        Ok(())
    }
}

#[test]
fn test_bridge_captures_server_connection_for_handshake() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind succeeds");
    let addr = listener.local_addr().expect("local addr");
    let response = sample_response();

    let client = thread::spawn(move || {
        let stream = TcpStream::connect(addr).expect("connect succeeds");
        let mut connection = PlainConnection::new(stream);
        connect_exchange(
            &mut connection,
            "plaintext",
            &ConstraintSet::empty(),
            DigestAlgorithm::Sha1,
            Deadline::after(Duration::from_secs(10)),
        )
    });

    let (raw, _peer) = listener.accept().expect("accept succeeds");
    let mut captured = capture_incoming(
        &PassthroughServerEndpoint,
        raw,
        Deadline::after(Duration::from_secs(10)),
    )
    .expect("bridge captures the secured connection");

    let format = accept_exchange(
        &mut *captured,
        &response,
        DigestAlgorithm::Sha1,
        Deadline::after(Duration::from_secs(10)),
    )
    .expect("server side succeeds");
    assert_eq!(format, "plaintext");

    let got = client
        .join()
        .expect("client thread exits")
        .expect("client side succeeds");
    assert_eq!(got, response);
}

/// A server endpoint that never reaches the listener; capture must time
/// out rather than hang, and the deadline bounds the wait.
struct StalledServerEndpoint;

impl ServerEndpoint for StalledServerEndpoint {
    fn start(
        &self,
        _listener: Arc<OneShotListener>,
        _slot: Arc<Rendezvous>,
    ) -> Result<(), DiscoveryError> {
        Ok(())
    }
}

#[test]
fn test_bridge_capture_times_out_when_endpoint_stalls() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind succeeds");
    let addr = listener.local_addr().expect("local addr");
    let _client = TcpStream::connect(addr).expect("connect succeeds");
    let (raw, _peer) = listener.accept().expect("accept succeeds");

    let result = capture_incoming(
        &StalledServerEndpoint,
        raw,
        Deadline::after(Duration::from_millis(50)),
    );
    let err = match result {
        Ok(_) => panic!("expected capture to fail"),
        Err(e) => e,
    };
    assert!(matches!(err, DiscoveryError::Timeout));
}
