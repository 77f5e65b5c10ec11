// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! Multicast request and announcement datagram codecs.
//!
//! Both messages carry a variable-length group list that can exceed one
//! datagram. The encoder admits as many groups as fit while holding back
//! reserved space for the trailing service-ID section, then spills the
//! remainder into fresh buffers from the caller's factory. Group order is
//! preserved across buffers and nothing is ever dropped silently.

use super::{
    CodecError, Cursor, CursorMut, Datagram, DatagramFactory, MulticastAnnouncement,
    MulticastRequest, ServiceId,
};

/// Bytes one service ID occupies on the wire.
const SERVICE_ID_LEN: usize = 16;

/// Encode a multicast request into one or more datagrams.
///
/// Per-datagram layout:
///
/// ```text
/// UTF(host) | u16 port | u16 nGroups | UTF(group)*nGroups
///           | u16 nIds | (u64 hi, u64 lo)*nIds
/// ```
///
/// Every datagram repeats host and port and carries a disjoint slice of
/// the group list plus the maximal prefix of known service IDs that fits.
pub fn encode_multicast_request(
    request: &MulticastRequest,
    factory: &mut dyn DatagramFactory,
) -> Result<Vec<Datagram>, CodecError> {
    // Worst-case space for the trailing service-ID list, reserved before
    // any group is admitted.
    let ids_space = 2 + SERVICE_ID_LEN * request.service_ids.len();

    let mut out = Vec::new();
    let mut pending: &[String] = &request.groups;
    loop {
        let mut datagram = factory.next_datagram();
        let mut cursor = CursorMut::new(datagram.buf_mut());
        cursor.write_utf(&request.host)?;
        cursor.write_u16_be(request.port)?;

        let admitted = admit_groups(&cursor, pending, ids_space)?;
        cursor.write_u16_be(admitted as u16)?;
        for group in &pending[..admitted] {
            cursor.write_utf(group)?;
        }
        pending = &pending[admitted..];

        let id_fit = cursor.remaining().saturating_sub(2) / SERVICE_ID_LEN;
        let n_ids = request
            .service_ids
            .len()
            .min(id_fit)
            .min(usize::from(u16::MAX));
        cursor.write_u16_be(n_ids as u16)?;
        for id in &request.service_ids[..n_ids] {
            cursor.write_u64_be(id.hi)?;
            cursor.write_u64_be(id.lo)?;
        }

        let len = cursor.offset();
        datagram.set_len(len);
        out.push(datagram);

        if pending.is_empty() {
            break;
        }
        log::debug!(
            "[MCAST] request spilled: {} groups pending, {} datagrams so far",
            pending.len(),
            out.len()
        );
    }
    Ok(out)
}

/// Decode one multicast request datagram. A spilled request is decoded per
/// datagram and reassembled with [`MulticastRequest::merge`].
pub fn decode_multicast_request(bytes: &[u8]) -> Result<MulticastRequest, CodecError> {
    let mut cursor = Cursor::new(bytes);
    let host = cursor.read_utf()?;
    let port = cursor.read_u16_be()?;

    let n_groups = usize::from(cursor.read_u16_be()?);
    let mut groups = Vec::with_capacity(n_groups);
    for _ in 0..n_groups {
        groups.push(cursor.read_utf()?);
    }

    let n_ids = usize::from(cursor.read_u16_be()?);
    let mut service_ids = Vec::with_capacity(n_ids);
    for _ in 0..n_ids {
        let hi = cursor.read_u64_be()?;
        let lo = cursor.read_u64_be()?;
        service_ids.push(ServiceId { hi, lo });
    }

    Ok(MulticastRequest {
        host,
        port,
        groups,
        service_ids,
    })
}

/// Encode a multicast announcement into one or more datagrams.
///
/// Per-datagram layout:
///
/// ```text
/// i64 seq | UTF(host) | u16 port | u16 nGroups | UTF(group)*nGroups
///         | u64 hi | u64 lo
/// ```
///
/// The trailing service ID is reserved before groups are admitted, so a
/// group overflow spills groups into further datagrams and never drops
/// the ID.
pub fn encode_multicast_announcement(
    announcement: &MulticastAnnouncement,
    factory: &mut dyn DatagramFactory,
) -> Result<Vec<Datagram>, CodecError> {
    let mut out = Vec::new();
    let mut pending: &[String] = &announcement.groups;
    loop {
        let mut datagram = factory.next_datagram();
        let mut cursor = CursorMut::new(datagram.buf_mut());
        cursor.write_i64_be(announcement.sequence)?;
        cursor.write_utf(&announcement.host)?;
        cursor.write_u16_be(announcement.port)?;

        let admitted = admit_groups(&cursor, pending, SERVICE_ID_LEN)?;
        cursor.write_u16_be(admitted as u16)?;
        for group in &pending[..admitted] {
            cursor.write_utf(group)?;
        }
        pending = &pending[admitted..];

        cursor.write_u64_be(announcement.service_id.hi)?;
        cursor.write_u64_be(announcement.service_id.lo)?;

        let len = cursor.offset();
        datagram.set_len(len);
        out.push(datagram);

        if pending.is_empty() {
            break;
        }
        log::debug!(
            "[MCAST] announcement spilled: {} groups pending, {} datagrams so far",
            pending.len(),
            out.len()
        );
    }
    Ok(out)
}

/// Decode one multicast announcement datagram. Each datagram of a spilled
/// announcement is a complete, standalone announcement for a subset of
/// the groups.
pub fn decode_multicast_announcement(bytes: &[u8]) -> Result<MulticastAnnouncement, CodecError> {
    let mut cursor = Cursor::new(bytes);
    let sequence = cursor.read_i64_be()?;
    let host = cursor.read_utf()?;
    let port = cursor.read_u16_be()?;

    let n_groups = usize::from(cursor.read_u16_be()?);
    let mut groups = Vec::with_capacity(n_groups);
    for _ in 0..n_groups {
        groups.push(cursor.read_utf()?);
    }

    let hi = cursor.read_u64_be()?;
    let lo = cursor.read_u64_be()?;

    Ok(MulticastAnnouncement {
        sequence,
        host,
        port,
        groups,
        service_id: ServiceId { hi, lo },
    })
}

/// How many pending groups fit after the cursor position, keeping
/// `reserved` bytes (plus the u16 group count) untouched.
///
/// A fresh datagram that cannot hold even one pending group is a hard
/// error; retrying with the same capacity would loop forever.
fn admit_groups(
    cursor: &CursorMut<'_>,
    pending: &[String],
    reserved: usize,
) -> Result<usize, CodecError> {
    let available = cursor.remaining().saturating_sub(2 + reserved);
    let mut used = 0usize;
    let mut admitted = 0usize;
    for group in pending {
        let need = 2 + group.len();
        if used + need > available || admitted == usize::from(u16::MAX) {
            break;
        }
        used += need;
        admitted += 1;
    }
    if admitted == 0 && !pending.is_empty() {
        return Err(CodecError::BufferOverflow {
            offset: cursor.offset(),
            reason: format!(
                "datagram too small for group '{}' ({} bytes available)",
                pending[0], available
            ),
        });
    }
    Ok(admitted)
}
