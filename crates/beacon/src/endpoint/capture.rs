// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! Connection capture machinery.
//!
//! Client side: a stand-in connection manager records the `(connection)`
//! the endpoint would have used and detaches, leaving the endpoint
//! nothing further to do. The calling thread observes the cell after the
//! library call returns; no callback-ordering assumptions.
//!
//! Server side: a blocking single-accept listener replays one
//! pre-existing raw connection, and a single-slot rendezvous hands the
//! first secured connection to the discovery thread. This is the one
//! intentional cross-thread handoff in the engine; later connections
//! block until the slot closes. Listener and slot are closed on every
//! exit path.

use super::{ConnectionManager, Endpoint, RequestDispatch, SecureConnection, ServerEndpoint};
use crate::constraint::ConstraintSet;
use crate::discovery::{Deadline, DiscoveryError};
use parking_lot::{Condvar, Mutex};
use std::io;
use std::net::TcpStream;
use std::sync::Arc;

/// Single-assignment capture cell for the client side.
#[derive(Default)]
struct CaptureManager {
    captured: Option<Box<dyn SecureConnection>>,
}

impl ConnectionManager for CaptureManager {
    fn connected(&mut self, connection: Box<dyn SecureConnection>) -> RequestDispatch {
        if self.captured.is_none() {
            self.captured = Some(connection);
        } else {
            log::warn!("[BRIDGE] endpoint offered a second connection; keeping the first");
        }
        RequestDispatch::Detached
    }
}

/// Capture the secured connection an endpoint establishes for one
/// outbound request.
///
/// If `new_request` returns success without ever reaching the manager,
/// the endpoint broke its own contract (unsupported constraints must be
/// reported, not swallowed); that surfaces as a hard internal error, not
/// a silent miss.
pub fn capture_outbound(
    endpoint: &dyn Endpoint,
    constraints: &ConstraintSet,
) -> Result<Box<dyn SecureConnection>, DiscoveryError> {
    let mut manager = CaptureManager::default();
    endpoint.new_request(&mut manager, constraints)?;
    manager.captured.ok_or_else(|| {
        DiscoveryError::Internal(
            "endpoint completed without offering a connection; \
             unsupported constraints must be reported, not swallowed"
                .into(),
        )
    })
}

/// Capture the secured connection a server endpoint derives from one
/// pre-existing raw connection.
///
/// The listener and slot are closed whether the capture succeeds, fails
/// or times out; a leaked listen handle blocks shutdown.
pub fn capture_incoming(
    endpoint: &dyn ServerEndpoint,
    raw: TcpStream,
    deadline: Deadline,
) -> Result<Box<dyn SecureConnection>, DiscoveryError> {
    let listener = Arc::new(OneShotListener::new(raw));
    let slot = Arc::new(Rendezvous::new());

    struct CloseGuard {
        listener: Arc<OneShotListener>,
        slot: Arc<Rendezvous>,
    }

    impl Drop for CloseGuard {
        fn drop(&mut self) {
            self.listener.close();
            self.slot.close();
        }
    }

    let _guard = CloseGuard {
        listener: Arc::clone(&listener),
        slot: Arc::clone(&slot),
    };

    endpoint.start(listener, Arc::clone(&slot))?;
    slot.take(deadline)
}

enum ListenerState {
    Ready(TcpStream),
    Consumed,
    Closed,
}

/// A "listen socket" that replays one pre-existing connection, then
/// blocks every subsequent accept until closed.
pub struct OneShotListener {
    state: Mutex<ListenerState>,
    cond: Condvar,
}

impl OneShotListener {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            state: Mutex::new(ListenerState::Ready(stream)),
            cond: Condvar::new(),
        }
    }

    /// First call yields the replayed connection. Later calls block until
    /// [`OneShotListener::close`], then fail like a closed socket.
    pub fn accept(&self) -> io::Result<TcpStream> {
        let mut state = self.state.lock();
        loop {
            match &*state {
                ListenerState::Ready(_) => {
                    let taken = std::mem::replace(&mut *state, ListenerState::Consumed);
                    match taken {
                        ListenerState::Ready(stream) => return Ok(stream),
                        _ => unreachable!("listener state changed under the lock"),
                    }
                }
                ListenerState::Consumed => self.cond.wait(&mut state),
                ListenerState::Closed => {
                    return Err(io::Error::new(
                        io::ErrorKind::NotConnected,
                        "listener closed",
                    ));
                }
            }
        }
    }

    /// Close the listen handle; blocked accepts fail from here on.
    pub fn close(&self) {
        let mut state = self.state.lock();
        *state = ListenerState::Closed;
        self.cond.notify_all();
    }
}

enum Slot {
    Empty,
    Full(Box<dyn SecureConnection>),
    Taken,
    Closed,
}

/// Single-slot rendezvous between the accepting thread(s) and the
/// discovery thread. The first connection wins; later offers block until
/// the slot closes and are then handed back to their caller to release.
pub struct Rendezvous {
    slot: Mutex<Slot>,
    cond: Condvar,
}

impl Default for Rendezvous {
    fn default() -> Self {
        Self::new()
    }
}

impl Rendezvous {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
            cond: Condvar::new(),
        }
    }

    /// Deliver a secured connection. Returns `None` when the slot accepts
    /// it; a connection offered too late is returned to the caller once
    /// the slot closes, for the caller to release.
    pub fn offer(
        &self,
        connection: Box<dyn SecureConnection>,
    ) -> Option<Box<dyn SecureConnection>> {
        let mut slot = self.slot.lock();
        loop {
            match &*slot {
                Slot::Empty => {
                    *slot = Slot::Full(connection);
                    self.cond.notify_all();
                    return None;
                }
                Slot::Full(_) | Slot::Taken => self.cond.wait(&mut slot),
                Slot::Closed => return Some(connection),
            }
        }
    }

    /// Wait for the first connection, bounded by the shared deadline.
    pub fn take(&self, deadline: Deadline) -> Result<Box<dyn SecureConnection>, DiscoveryError> {
        let mut slot = self.slot.lock();
        loop {
            match &*slot {
                Slot::Full(_) => {
                    let taken = std::mem::replace(&mut *slot, Slot::Taken);
                    match taken {
                        Slot::Full(connection) => return Ok(connection),
                        _ => unreachable!("slot state changed under the lock"),
                    }
                }
                Slot::Empty => {
                    let remaining = deadline.require_remaining()?;
                    if self.cond.wait_for(&mut slot, remaining).timed_out()
                        && matches!(&*slot, Slot::Empty)
                    {
                        return Err(DiscoveryError::Timeout);
                    }
                }
                Slot::Taken => {
                    return Err(DiscoveryError::Internal(
                        "rendezvous slot taken twice".into(),
                    ));
                }
                Slot::Closed => {
                    return Err(DiscoveryError::Internal(
                        "rendezvous slot closed before a connection arrived".into(),
                    ));
                }
            }
        }
    }

    /// Close the slot, releasing any undelivered connection and waking
    /// every blocked offer.
    pub fn close(&self) {
        let mut slot = self.slot.lock();
        if let Slot::Full(mut connection) = std::mem::replace(&mut *slot, Slot::Closed) {
            let _ = connection.close();
        }
        self.cond.notify_all();
    }
}
