// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! Binary wire codec for discovery messages.
//!
//! Three message types cross the wire: multicast requests (clients asking
//! lookup services to announce), multicast announcements (lookup services
//! announcing themselves) and unicast responses (the registrar reference
//! itself). Multicast messages are encoded into fixed-capacity datagram
//! buffers and spill to additional buffers rather than truncating; the
//! unicast response is stream-framed.
//!
//! All integers are network byte order. Strings are `u16`-length-prefixed
//! UTF-8.

pub mod cursor;
pub mod multicast;
pub mod plaintext;
pub mod unicast;

pub use cursor::{Cursor, CursorMut};
pub use multicast::{
    decode_multicast_announcement, decode_multicast_request, encode_multicast_announcement,
    encode_multicast_request,
};
pub use plaintext::PlaintextFormat;
pub use unicast::{read_unicast_response, write_unicast_response};

use std::fmt;
use std::io;

/// Wire codec errors.
#[derive(Debug)]
pub enum CodecError {
    /// A string's UTF-8 encoding exceeds the u16 length prefix.
    StringTooLong { len: usize },

    /// Encoder ran out of room. Always loud; the codec never truncates.
    BufferOverflow { offset: usize, reason: String },

    /// Malformed bytes on the wire (truncated prefix, underflow, bad
    /// UTF-8). The message is rejected whole; no partial record escapes.
    Decode { offset: usize, reason: String },

    /// Stream-level I/O failure during a unicast exchange.
    Io(io::Error),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StringTooLong { len } => {
                write!(f, "string too long for u16 length prefix: {} bytes", len)
            }
            Self::BufferOverflow { offset, reason } => {
                write!(f, "buffer overflow at offset {}: {}", offset, reason)
            }
            Self::Decode { offset, reason } => {
                write!(f, "decode failed at offset {}: {}", offset, reason)
            }
            Self::Io(e) => write!(f, "i/o failure: {}", e),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CodecError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// 128-bit opaque service identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceId {
    pub hi: u64,
    pub lo: u64,
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            (self.hi >> 32) as u32,
            (self.hi >> 16) as u16,
            self.hi as u16,
            (self.lo >> 48) as u16,
            self.lo & 0x0000_ffff_ffff_ffff
        )
    }
}

/// Multicast request: a client asking lookup services for the named groups
/// to make themselves known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulticastRequest {
    /// Host the requester listens on for unicast responses.
    pub host: String,
    pub port: u16,
    /// Lookup groups of interest, order-significant.
    pub groups: Vec<String>,
    /// Services the requester already knows, so they need not respond.
    pub service_ids: Vec<ServiceId>,
}

impl MulticastRequest {
    /// Reassemble a request that spilled across several datagrams.
    ///
    /// Parts must share host and port; groups concatenate in part order
    /// (each group is carried by exactly one datagram) and known service
    /// IDs union with first-seen order.
    pub fn merge(parts: Vec<MulticastRequest>) -> Result<MulticastRequest, CodecError> {
        let mut iter = parts.into_iter();
        let mut merged = iter.next().ok_or(CodecError::Decode {
            offset: 0,
            reason: "no request datagrams to merge".into(),
        })?;
        for part in iter {
            if part.host != merged.host || part.port != merged.port {
                return Err(CodecError::Decode {
                    offset: 0,
                    reason: format!(
                        "request datagrams disagree on origin: {}:{} vs {}:{}",
                        merged.host, merged.port, part.host, part.port
                    ),
                });
            }
            merged.groups.extend(part.groups);
            for id in part.service_ids {
                if !merged.service_ids.contains(&id) {
                    merged.service_ids.push(id);
                }
            }
        }
        Ok(merged)
    }
}

/// Multicast announcement: a lookup service declaring itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulticastAnnouncement {
    /// Monotonic per-service sequence number; lets listeners drop stale
    /// or replayed announcements.
    pub sequence: i64,
    pub host: String,
    pub port: u16,
    pub groups: Vec<String>,
    pub service_id: ServiceId,
}

/// Unicast response carrying the registrar reference.
///
/// The registrar bytes are opaque to this engine; unmarshalling them is
/// the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnicastResponse {
    pub host: String,
    pub port: u16,
    pub groups: Vec<String>,
    pub registrar: Vec<u8>,
}

/// A fixed-capacity datagram buffer.
///
/// Encoders never grow a datagram; when a message does not fit, the codec
/// asks the caller-supplied [`DatagramFactory`] for another buffer.
#[derive(Debug)]
pub struct Datagram {
    data: Box<[u8]>,
    len: usize,
}

impl Datagram {
    /// An empty buffer of the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    /// Wrap bytes received from the network (fully occupied).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: bytes.to_vec().into_boxed_slice(),
            len: bytes.len(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The written (or received) region.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub(crate) fn buf_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub(crate) fn set_len(&mut self, len: usize) {
        debug_assert!(len <= self.data.len());
        self.len = len;
    }
}

/// Source of additional datagram buffers for spill encoding.
pub trait DatagramFactory {
    fn next_datagram(&mut self) -> Datagram;
}

/// Factory handing out uniformly sized buffers.
#[derive(Debug, Clone, Copy)]
pub struct FixedSizeFactory {
    size: usize,
}

impl FixedSizeFactory {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl DatagramFactory for FixedSizeFactory {
    fn next_datagram(&mut self) -> Datagram {
        Datagram::new(self.size)
    }
}
