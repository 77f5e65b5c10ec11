// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! Signed datagram framing.
//!
//! A signed datagram wraps a plaintext body with the signer's identity
//! and a detached signature:
//!
//! ```text
//! i32 len | <plaintext body, len bytes> | UTF(principalName) | signature
//! ```
//!
//! The signature runs to the end of the datagram; its length is fixed per
//! provider instance (algorithm-dependent), so no extra prefix is needed.
//!
//! Encoding reserves the trailing space up front by handing the codec a
//! body buffer shrunk by the worst-case envelope. A codec write that no
//! longer fits fails loudly with `BufferOverflow`; a signed buffer is
//! never allowed to silently truncate protocol content.

use super::SecurityError;
use crate::constraint::Principal;
use crate::protocol::{CodecError, Cursor, CursorMut, Datagram, DatagramFactory};

/// Worst-case bytes the signed envelope adds around a body.
pub fn signed_overhead(principal: &Principal, max_signature_len: usize) -> usize {
    4 + 2 + principal.name().len() + max_signature_len
}

/// Factory adapter that shrinks every buffer by the envelope reservation,
/// so the plaintext codec spills exactly where the sealed datagram would
/// have overflowed.
pub(crate) struct ReservingFactory<'f> {
    inner: &'f mut dyn DatagramFactory,
    overhead: usize,
}

impl<'f> ReservingFactory<'f> {
    pub(crate) fn new(inner: &'f mut dyn DatagramFactory, overhead: usize) -> Self {
        Self { inner, overhead }
    }
}

impl DatagramFactory for ReservingFactory<'_> {
    fn next_datagram(&mut self) -> Datagram {
        let outer = self.inner.next_datagram();
        Datagram::new(outer.capacity().saturating_sub(self.overhead))
    }
}

/// Seal one body into a signed datagram of the caller's capacity.
pub fn seal(
    body: &[u8],
    principal: &Principal,
    signature: &[u8],
    capacity: usize,
) -> Result<Datagram, CodecError> {
    let body_len = i32::try_from(body.len()).map_err(|_| CodecError::BufferOverflow {
        offset: 0,
        reason: format!("body of {} bytes exceeds i32 length prefix", body.len()),
    })?;
    let mut datagram = Datagram::new(capacity);
    let mut cursor = CursorMut::new(datagram.buf_mut());
    cursor.write_i32_be(body_len)?;
    cursor.write_bytes(body)?;
    cursor.write_utf(principal.name())?;
    cursor.write_bytes(signature)?;
    let len = cursor.offset();
    datagram.set_len(len);
    Ok(datagram)
}

/// A parsed (not yet verified) signed datagram.
#[derive(Debug)]
pub struct SignedMessage<'a> {
    pub body: &'a [u8],
    pub principal_name: String,
    pub signature: &'a [u8],
}

/// Split a signed datagram into its parts.
///
/// Framing failures surface as [`CodecError::Decode`]; verifying the
/// signature (and reporting tampering as a distinct
/// [`SecurityError`]) is the provider's job.
pub fn open(bytes: &[u8]) -> Result<SignedMessage<'_>, CodecError> {
    let mut cursor = Cursor::new(bytes);
    let body_len = cursor.read_i32_be()?;
    if body_len < 0 {
        return Err(CodecError::Decode {
            offset: 0,
            reason: format!("negative body length {}", body_len),
        });
    }
    let body = cursor.read_bytes(body_len as usize)?;
    let principal_name = cursor.read_utf()?;
    let signature = cursor.read_bytes(cursor.remaining())?;
    if signature.is_empty() {
        return Err(CodecError::Decode {
            offset: cursor.offset(),
            reason: "missing signature".into(),
        });
    }
    Ok(SignedMessage {
        body,
        principal_name,
        signature,
    })
}

/// Map a raw principal name asserted on the wire to the identity the
/// certificate lookup understands.
pub fn asserted_principal(message: &SignedMessage<'_>) -> Principal {
    Principal::x500(message.principal_name.clone())
}

/// Convenience for providers: tampering and framing problems must stay
/// distinguishable, so only a true mismatch becomes a verification error.
pub fn verification_failure(principal: &Principal) -> SecurityError {
    SecurityError::SignatureVerification(format!(
        "signature by '{}' does not cover the received bytes",
        principal
    ))
}
