// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! Unicast stream framing.
//!
//! The unicast response is exchanged over a connected stream, not a
//! datagram, so there is no spill machinery; the registrar reference is
//! carried as length-prefixed opaque bytes.

use super::{CodecError, UnicastResponse};
use std::io::{Read, Write};

/// Upper bound on a serialized registrar reference. A malformed or hostile
/// length prefix fails decoding instead of provoking an unbounded
/// allocation.
pub const MAX_REGISTRAR_LEN: usize = 8 * 1024 * 1024;

/// Upper bound on a single handshake frame.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Write a unicast response:
///
/// ```text
/// UTF(host) | u16 port | i32 nGroups | UTF(group)* | u32 len | registrar
/// ```
pub fn write_unicast_response<W: Write + ?Sized>(
    writer: &mut W,
    response: &UnicastResponse,
) -> Result<(), CodecError> {
    write_utf_stream(writer, &response.host)?;
    writer.write_all(&response.port.to_be_bytes())?;

    let n_groups = i32::try_from(response.groups.len()).map_err(|_| CodecError::BufferOverflow {
        offset: 0,
        reason: format!("group count {} exceeds i32", response.groups.len()),
    })?;
    writer.write_all(&n_groups.to_be_bytes())?;
    for group in &response.groups {
        write_utf_stream(writer, group)?;
    }

    let registrar_len =
        u32::try_from(response.registrar.len()).map_err(|_| CodecError::BufferOverflow {
            offset: 0,
            reason: format!("registrar reference {} bytes exceeds u32", response.registrar.len()),
        })?;
    writer.write_all(&registrar_len.to_be_bytes())?;
    writer.write_all(&response.registrar)?;
    writer.flush()?;
    Ok(())
}

/// Read a unicast response, mirroring [`write_unicast_response`] exactly.
pub fn read_unicast_response<R: Read + ?Sized>(reader: &mut R) -> Result<UnicastResponse, CodecError> {
    let host = read_utf_stream(reader)?;
    let port = u16::from_be_bytes(read_array(reader)?);

    let n_groups = i32::from_be_bytes(read_array(reader)?);
    if n_groups < 0 {
        return Err(CodecError::Decode {
            offset: 0,
            reason: format!("negative group count {}", n_groups),
        });
    }
    let mut groups = Vec::with_capacity(n_groups as usize);
    for _ in 0..n_groups {
        groups.push(read_utf_stream(reader)?);
    }

    let registrar_len = u32::from_be_bytes(read_array(reader)?) as usize;
    if registrar_len > MAX_REGISTRAR_LEN {
        return Err(CodecError::Decode {
            offset: 0,
            reason: format!(
                "registrar reference {} bytes exceeds limit {}",
                registrar_len, MAX_REGISTRAR_LEN
            ),
        });
    }
    let mut registrar = vec![0u8; registrar_len];
    reader.read_exact(&mut registrar)?;

    Ok(UnicastResponse {
        host,
        port,
        groups,
        registrar,
    })
}

/// Write a u32-length-prefixed frame. Used by the unicast handshake; the
/// returned bytes are exactly what went on the wire (prefix included) so
/// callers can feed them to the handshake hash.
pub fn write_frame<W: Write + ?Sized>(writer: &mut W, body: &[u8]) -> Result<Vec<u8>, CodecError> {
    let len = u32::try_from(body.len()).map_err(|_| CodecError::BufferOverflow {
        offset: 0,
        reason: format!("frame body {} bytes exceeds u32", body.len()),
    })?;
    if body.len() > MAX_FRAME_LEN {
        return Err(CodecError::BufferOverflow {
            offset: 0,
            reason: format!("frame body {} bytes exceeds limit {}", body.len(), MAX_FRAME_LEN),
        });
    }
    let mut bytes = Vec::with_capacity(4 + body.len());
    bytes.extend_from_slice(&len.to_be_bytes());
    bytes.extend_from_slice(body);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(bytes)
}

/// Read a u32-length-prefixed frame, returning `(wire_bytes, body_offset)`
/// where `wire_bytes` includes the prefix for hashing.
pub fn read_frame<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<u8>, CodecError> {
    let prefix: [u8; 4] = read_array(reader)?;
    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_FRAME_LEN {
        return Err(CodecError::Decode {
            offset: 0,
            reason: format!("frame body {} bytes exceeds limit {}", len, MAX_FRAME_LEN),
        });
    }
    let mut bytes = vec![0u8; 4 + len];
    bytes[..4].copy_from_slice(&prefix);
    reader.read_exact(&mut bytes[4..])?;
    Ok(bytes)
}

/// Body of a frame produced by [`read_frame`].
pub fn frame_body(frame: &[u8]) -> &[u8] {
    &frame[4..]
}

pub(crate) fn write_utf_stream<W: Write + ?Sized>(writer: &mut W, s: &str) -> Result<(), CodecError> {
    let bytes = s.as_bytes();
    if bytes.len() > usize::from(u16::MAX) {
        return Err(CodecError::StringTooLong { len: bytes.len() });
    }
    writer.write_all(&(bytes.len() as u16).to_be_bytes())?;
    writer.write_all(bytes)?;
    Ok(())
}

pub(crate) fn read_utf_stream<R: Read + ?Sized>(reader: &mut R) -> Result<String, CodecError> {
    let len = u16::from_be_bytes(read_array(reader)?);
    let mut bytes = vec![0u8; usize::from(len)];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| CodecError::Decode {
        offset: 0,
        reason: format!("invalid utf-8 in string: {}", e),
    })
}

fn read_array<R: Read + ?Sized, const N: usize>(reader: &mut R) -> Result<[u8; N], CodecError> {
    let mut bytes = [0u8; N];
    reader.read_exact(&mut bytes).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            CodecError::Decode {
                offset: 0,
                reason: "unexpected end of stream".into(),
            }
        } else {
            CodecError::Io(e)
        }
    })?;
    Ok(bytes)
}
