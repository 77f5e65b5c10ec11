// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 beacon contributors

//! Bounds-checked read/write cursors over datagram buffers.
//!
//! Network byte order throughout. Every operation checks remaining
//! capacity; writes that would overflow fail loudly and reads that would
//! underflow reject the whole message.

use super::CodecError;

/// Generate big-endian write methods for primitive types.
macro_rules! impl_write_be {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self, value: $type) -> Result<(), CodecError> {
            if self.offset + $size > self.buffer.len() {
                return Err(CodecError::BufferOverflow {
                    offset: self.offset,
                    reason: "buffer too small".into(),
                });
            }
            self.buffer[self.offset..self.offset + $size].copy_from_slice(&value.to_be_bytes());
            self.offset += $size;
            Ok(())
        }
    };
}

/// Generate big-endian read methods for primitive types.
macro_rules! impl_read_be {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> Result<$type, CodecError> {
            if self.offset + $size > self.buffer.len() {
                return Err(CodecError::Decode {
                    offset: self.offset,
                    reason: "unexpected end of buffer".into(),
                });
            }
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(&self.buffer[self.offset..self.offset + $size]);
            self.offset += $size;
            Ok(<$type>::from_be_bytes(bytes))
        }
    };
}

/// Mutable cursor for writing.
pub struct CursorMut<'a> {
    buffer: &'a mut [u8],
    offset: usize,
}

impl<'a> CursorMut<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    impl_write_be!(write_u8, u8, 1);
    impl_write_be!(write_u16_be, u16, 2);
    impl_write_be!(write_u32_be, u32, 4);
    impl_write_be!(write_u64_be, u64, 8);
    impl_write_be!(write_i32_be, i32, 4);
    impl_write_be!(write_i64_be, i64, 8);

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), CodecError> {
        if self.offset + data.len() > self.buffer.len() {
            return Err(CodecError::BufferOverflow {
                offset: self.offset,
                reason: "buffer too small".into(),
            });
        }
        self.buffer[self.offset..self.offset + data.len()].copy_from_slice(data);
        self.offset += data.len();
        Ok(())
    }

    /// u16-length-prefixed UTF-8 string.
    pub fn write_utf(&mut self, s: &str) -> Result<(), CodecError> {
        let bytes = s.as_bytes();
        if bytes.len() > usize::from(u16::MAX) {
            return Err(CodecError::StringTooLong { len: bytes.len() });
        }
        self.write_u16_be(bytes.len() as u16)?;
        self.write_bytes(bytes)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    /// The region written so far.
    pub fn written(&self) -> &[u8] {
        &self.buffer[..self.offset]
    }
}

/// Immutable cursor for reading.
pub struct Cursor<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    impl_read_be!(read_u8, u8, 1);
    impl_read_be!(read_u16_be, u16, 2);
    impl_read_be!(read_u32_be, u32, 4);
    impl_read_be!(read_u64_be, u64, 8);
    impl_read_be!(read_i32_be, i32, 4);
    impl_read_be!(read_i64_be, i64, 8);

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if self.offset + len > self.buffer.len() {
            return Err(CodecError::Decode {
                offset: self.offset,
                reason: "unexpected end of buffer".into(),
            });
        }
        let slice = &self.buffer[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    /// u16-length-prefixed UTF-8 string.
    pub fn read_utf(&mut self) -> Result<String, CodecError> {
        let start = self.offset;
        let len = usize::from(self.read_u16_be()?);
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| CodecError::Decode {
            offset: start,
            reason: format!("invalid utf-8 in string: {}", e),
        })
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_overflow_reports_offset() {
        let mut buffer = [0u8; 2];
        let mut cursor = CursorMut::new(&mut buffer);
        cursor.write_u16_be(0xabcd).expect("fits exactly");
        let err = cursor.write_u8(0xff).unwrap_err();
        match err {
            CodecError::BufferOverflow { offset, .. } => assert_eq!(offset, 2),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_read_underflow_reports_offset() {
        let buffer = [0u8; 1];
        let mut cursor = Cursor::new(&buffer);
        cursor.read_u8().expect("one byte available");
        let err = cursor.read_u8().unwrap_err();
        match err {
            CodecError::Decode { offset, .. } => assert_eq!(offset, 1),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_roundtrip_primitives() {
        let mut buffer = [0u8; 64];
        let mut writer = CursorMut::new(&mut buffer);
        writer.write_u8(0xab).expect("write u8");
        writer.write_u16_be(0xcdef).expect("write u16");
        writer.write_u32_be(0x1234_5678).expect("write u32");
        writer.write_u64_be(0x1122_3344_5566_7788).expect("write u64");
        writer.write_i32_be(-42).expect("write i32");
        writer.write_i64_be(i64::MIN).expect("write i64");
        let written = writer.offset();

        let mut reader = Cursor::new(&buffer);
        assert_eq!(reader.read_u8().expect("read u8"), 0xab);
        assert_eq!(reader.read_u16_be().expect("read u16"), 0xcdef);
        assert_eq!(reader.read_u32_be().expect("read u32"), 0x1234_5678);
        assert_eq!(
            reader.read_u64_be().expect("read u64"),
            0x1122_3344_5566_7788
        );
        assert_eq!(reader.read_i32_be().expect("read i32"), -42);
        assert_eq!(reader.read_i64_be().expect("read i64"), i64::MIN);
        assert_eq!(reader.offset(), written);
    }

    #[test]
    fn test_big_endian_layout() {
        let mut buffer = [0u8; 4];
        let mut cursor = CursorMut::new(&mut buffer);
        cursor.write_u16_be(0x0102).expect("write u16");
        assert_eq!(&buffer[..2], &[0x01, 0x02]);
    }

    #[test]
    fn test_utf_roundtrip() {
        let mut buffer = [0u8; 32];
        let mut writer = CursorMut::new(&mut buffer);
        writer.write_utf("group/étoile").expect("write utf");
        let written = writer.offset();

        let mut reader = Cursor::new(&buffer[..written]);
        assert_eq!(reader.read_utf().expect("read utf"), "group/étoile");
        assert!(reader.is_eof());
    }

    #[test]
    fn test_utf_rejects_oversized_string() {
        let big = "x".repeat(usize::from(u16::MAX) + 1);
        let mut buffer = vec![0u8; big.len() + 8];
        let mut writer = CursorMut::new(&mut buffer);
        let err = writer.write_utf(&big).unwrap_err();
        assert!(matches!(err, CodecError::StringTooLong { .. }));
    }

    #[test]
    fn test_utf_rejects_truncated_body() {
        // Length prefix promises 10 bytes, only 3 present.
        let bytes = [0x00, 0x0a, b'a', b'b', b'c'];
        let mut reader = Cursor::new(&bytes);
        let err = reader.read_utf().unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));
    }

    #[test]
    fn test_utf_rejects_invalid_utf8() {
        let bytes = [0x00, 0x02, 0xff, 0xfe];
        let mut reader = Cursor::new(&bytes);
        let err = reader.read_utf().unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));
    }
}
