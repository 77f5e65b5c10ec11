// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! Multicast socket plumbing for the discovery groups.
//!
//! Requesters send to the request group and lookup services announce on
//! the announcement group; both default to the well-known discovery port.
//! Socket options (TTL, reuse, group join) are configured here and
//! nowhere else.

use super::{Deadline, DiscoveryError};
use crate::config::{
    RuntimeConfig, ANNOUNCEMENT_MULTICAST_GROUP, DISCOVERY_PORT, REQUEST_MULTICAST_GROUP,
};
use crate::protocol::Datagram;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

/// Socket for sending multicast request datagrams.
pub fn request_sender(config: &RuntimeConfig) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_multicast_ttl_v4(config.multicast_ttl)?;
    socket.set_multicast_loop_v4(true)?;
    socket.bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0).into())?;
    let socket: UdpSocket = socket.into();
    log::debug!(
        "[MCAST] request sender bound to {:?}, ttl {}",
        socket.local_addr(),
        config.multicast_ttl
    );
    Ok(socket)
}

/// Send encoded request datagrams to the request group.
pub fn send_request_datagrams(
    socket: &UdpSocket,
    datagrams: &[Datagram],
    port: u16,
) -> io::Result<()> {
    let target = SocketAddrV4::new(REQUEST_MULTICAST_GROUP, port);
    for datagram in datagrams {
        socket.send_to(datagram.as_bytes(), target)?;
    }
    log::debug!("[MCAST] sent {} request datagram(s) to {}", datagrams.len(), target);
    Ok(())
}

/// Socket joined to the announcement group on all interfaces.
///
/// `port` is almost always [`DISCOVERY_PORT`]; tests pass an ephemeral
/// port instead.
pub fn announcement_listener(port: u16) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port).into())?;
    let socket: UdpSocket = socket.into();
    match socket.join_multicast_v4(&ANNOUNCEMENT_MULTICAST_GROUP, &Ipv4Addr::UNSPECIFIED) {
        Ok(()) => {
            log::debug!(
                "[MCAST] joined {} on UNSPECIFIED",
                ANNOUNCEMENT_MULTICAST_GROUP
            );
        }
        // Non-fatal: unicast delivery to the bound port still works on
        // hosts without multicast routing.
        Err(e) => log::warn!("[MCAST] join_multicast_v4 failed (non-fatal): {}", e),
    }
    socket.set_multicast_loop_v4(true)?;
    Ok(socket)
}

/// Well-known announcement listener.
pub fn default_announcement_listener() -> io::Result<UdpSocket> {
    announcement_listener(DISCOVERY_PORT)
}

/// Receive one datagram, bounded by the shared deadline.
pub fn recv_datagram(
    socket: &UdpSocket,
    config: &RuntimeConfig,
    deadline: Deadline,
) -> Result<(Datagram, SocketAddr), DiscoveryError> {
    socket.set_read_timeout(Some(deadline.require_remaining()?))?;
    let mut buffer = vec![0u8; config.datagram_size];
    let (received, from) = socket.recv_from(&mut buffer)?;
    log::debug!("[MCAST] received {} bytes from {}", received, from);
    Ok((Datagram::from_bytes(&buffer[..received]), from))
}
