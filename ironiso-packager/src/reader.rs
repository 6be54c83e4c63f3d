/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Bounds-checked cursor over an inbound message.
//!
//! Every read is checked against the remaining bytes and reports the
//! absolute offset in the original buffer, including reads inside a
//! composite field that were carved out with [`ByteReader::sub`].

use ironiso_core::{DecodeError, FieldPath};

/// Cursor over a byte slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    /// Bytes visible to this reader.
    buf: &'a [u8],
    /// Position within `buf`.
    pos: usize,
    /// Absolute offset of `buf[0]` in the outermost buffer.
    base: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader over a complete message.
    #[inline]
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            base: 0,
        }
    }

    /// Consumes exactly `n` bytes on behalf of `field`.
    ///
    /// # Errors
    /// Returns `DecodeError::TruncatedMessage` if fewer than `n` bytes remain.
    /// The cursor does not move in that case.
    pub fn take(&mut self, n: usize, field: &FieldPath) -> Result<&'a [u8], DecodeError> {
        let available = self.remaining();
        if n > available {
            return Err(DecodeError::TruncatedMessage {
                field: field.clone(),
                offset: self.offset(),
                needed: n,
                available,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Consumes `n` bytes and returns a reader confined to them.
    ///
    /// # Errors
    /// Same as [`ByteReader::take`].
    pub fn sub(&mut self, n: usize, field: &FieldPath) -> Result<ByteReader<'a>, DecodeError> {
        let base = self.offset();
        let buf = self.take(n, field)?;
        Ok(ByteReader { buf, pos: 0, base })
    }

    /// Absolute offset of the next byte.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Number of unread bytes.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Returns true if every byte has been consumed.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_advances() {
        let mut reader = ByteReader::new(b"0200ABC");
        let path = FieldPath::new(0);
        assert_eq!(reader.take(4, &path).unwrap(), b"0200");
        assert_eq!(reader.offset(), 4);
        assert_eq!(reader.remaining(), 3);
    }

    #[test]
    fn test_take_truncated() {
        let mut reader = ByteReader::new(b"0200AB");
        let path = FieldPath::new(2);
        reader.take(4, &path).unwrap();
        let err = reader.take(3, &path).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TruncatedMessage {
                field: path,
                offset: 4,
                needed: 3,
                available: 2,
            }
        );
        assert_eq!(reader.offset(), 4);
    }

    #[test]
    fn test_sub_reports_absolute_offsets() {
        let mut reader = ByteReader::new(b"XXXXabcdef");
        let path = FieldPath::new(127);
        reader.take(4, &path).unwrap();
        let mut inner = reader.sub(3, &path).unwrap();
        assert!(reader.remaining() == 3);

        inner.take(2, &path.child(2)).unwrap();
        let err = inner.take(2, &path.child(3)).unwrap_err();
        assert_eq!(err.offset(), Some(6));
    }
}
