/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Tokio codec for length-prefixed ISO 8583 framing.
//!
//! Every message on the wire is preceded by its length. Networks differ in
//! how that length is written, so the codec supports:
//! - binary prefixes of 1 to 8 bytes, big-endian (the usual 2-byte form) or
//!   little-endian
//! - ASCII decimal prefixes (e.g. 4 digits, as jPOS `ASCIIChannel`)
//! - prefixes that count their own bytes

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::codec::{Decoder, Encoder};

/// Errors that can occur during framing operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Frame length exceeds the configured maximum or the prefix capacity.
    #[error("frame too large: {size} bytes exceeds maximum {max}")]
    FrameTooLarge {
        /// Declared or actual payload size.
        size: usize,
        /// Largest payload accepted.
        max: usize,
    },

    /// The stream ended before the declared frame was complete.
    #[error("incomplete frame: expected {expected} bytes, received {received}")]
    IncompleteFrame {
        /// Bytes needed to finish the frame, prefix included.
        expected: usize,
        /// Bytes received before the stream ended.
        received: usize,
    },

    /// The length prefix cannot be interpreted.
    #[error("invalid length prefix: {0}")]
    InvalidLengthPrefix(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// How the frame length is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrefixFormat {
    /// Unsigned integer, most significant byte first.
    #[default]
    BigEndian,
    /// Unsigned integer, least significant byte first.
    LittleEndian,
    /// Zero-filled ASCII decimal digits.
    Ascii,
}

/// Tokio codec for length-prefixed frames.
///
/// Decoding yields the payload without its prefix; encoding prepends it.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    /// Prefix width in bytes (digits for ASCII).
    prefix_len: usize,
    /// Prefix representation.
    format: PrefixFormat,
    /// Whether the prefix value counts the prefix bytes too.
    length_includes_prefix: bool,
    /// Largest payload accepted in either direction.
    max_frame_size: usize,
}

impl FrameCodec {
    /// Creates a codec with a 2-byte big-endian prefix that counts only the
    /// payload.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            prefix_len: 2,
            format: PrefixFormat::BigEndian,
            length_includes_prefix: false,
            max_frame_size: u16::MAX as usize,
        }
    }

    /// Sets the prefix width in bytes, clamped to 1..=8.
    #[must_use]
    pub fn with_prefix_len(mut self, len: usize) -> Self {
        self.prefix_len = len.clamp(1, 8);
        self
    }

    /// Sets the prefix representation.
    #[must_use]
    pub const fn with_format(mut self, format: PrefixFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets whether the prefix value includes the prefix itself.
    #[must_use]
    pub const fn with_length_includes_prefix(mut self, includes: bool) -> Self {
        self.length_includes_prefix = includes;
        self
    }

    /// Sets the maximum payload size.
    #[must_use]
    pub const fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Returns the prefix width in bytes.
    #[inline]
    #[must_use]
    pub const fn prefix_len(&self) -> usize {
        self.prefix_len
    }

    /// Returns the maximum payload size.
    #[inline]
    #[must_use]
    pub const fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Largest value the prefix can hold.
    fn prefix_capacity(&self) -> usize {
        match self.format {
            PrefixFormat::Ascii => 10usize
                .checked_pow(self.prefix_len as u32)
                .map_or(usize::MAX, |p| p - 1),
            PrefixFormat::BigEndian | PrefixFormat::LittleEndian => {
                if self.prefix_len >= size_of::<usize>() {
                    usize::MAX
                } else {
                    (1usize << (self.prefix_len * 8)) - 1
                }
            }
        }
    }

    /// Largest payload that can be framed.
    fn payload_capacity(&self) -> usize {
        let capacity = self.prefix_capacity();
        let capacity = if self.length_includes_prefix {
            capacity.saturating_sub(self.prefix_len)
        } else {
            capacity
        };
        capacity.min(self.max_frame_size)
    }

    /// Returns the payload length announced by a complete prefix.
    fn payload_len(&self, prefix: &[u8]) -> Result<usize, FrameError> {
        let declared = match self.format {
            PrefixFormat::BigEndian => prefix
                .iter()
                .fold(0usize, |acc, b| (acc << 8) | usize::from(*b)),
            PrefixFormat::LittleEndian => prefix
                .iter()
                .rev()
                .fold(0usize, |acc, b| (acc << 8) | usize::from(*b)),
            PrefixFormat::Ascii => {
                if !prefix.iter().all(u8::is_ascii_digit) {
                    return Err(FrameError::InvalidLengthPrefix(format!(
                        "non-digit ASCII prefix {:?}",
                        String::from_utf8_lossy(prefix)
                    )));
                }
                prefix
                    .iter()
                    .fold(0usize, |acc, d| acc * 10 + usize::from(d - b'0'))
            }
        };

        let payload = if self.length_includes_prefix {
            declared.checked_sub(self.prefix_len).ok_or_else(|| {
                FrameError::InvalidLengthPrefix(format!(
                    "length {} is shorter than the {}-byte prefix",
                    declared, self.prefix_len
                ))
            })?
        } else {
            declared
        };

        if payload > self.max_frame_size {
            return Err(FrameError::FrameTooLarge {
                size: payload,
                max: self.max_frame_size,
            });
        }
        Ok(payload)
    }

    fn put_prefix(&self, payload_len: usize, dst: &mut BytesMut) {
        let value = if self.length_includes_prefix {
            payload_len + self.prefix_len
        } else {
            payload_len
        };
        match self.format {
            PrefixFormat::BigEndian => {
                for i in (0..self.prefix_len).rev() {
                    dst.put_u8((value >> (i * 8)) as u8);
                }
            }
            PrefixFormat::LittleEndian => {
                for i in 0..self.prefix_len {
                    dst.put_u8((value >> (i * 8)) as u8);
                }
            }
            PrefixFormat::Ascii => {
                let mut buf = itoa::Buffer::new();
                let digits = buf.format(value).as_bytes();
                dst.put_bytes(b'0', self.prefix_len.saturating_sub(digits.len()));
                dst.put_slice(digits);
            }
        }
    }

    fn encode_slice(&self, payload: &[u8], dst: &mut BytesMut) -> Result<(), FrameError> {
        let max = self.payload_capacity();
        if payload.len() > max {
            return Err(FrameError::FrameTooLarge {
                size: payload.len(),
                max,
            });
        }
        dst.reserve(self.prefix_len + payload.len());
        self.put_prefix(payload.len(), dst);
        dst.put_slice(payload);
        Ok(())
    }

    /// Returns `prefix ++ payload`.
    ///
    /// # Errors
    /// Returns `FrameError::FrameTooLarge` if the payload exceeds the maximum
    /// frame size or what the prefix can express.
    pub fn frame(&self, payload: &[u8]) -> Result<BytesMut, FrameError> {
        let mut dst = BytesMut::with_capacity(self.prefix_len + payload.len());
        self.encode_slice(payload, &mut dst)?;
        Ok(dst)
    }

    /// Reads exactly one frame from `reader`.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly between frames.
    ///
    /// # Errors
    /// Returns `FrameError::IncompleteFrame` if the stream ends inside a
    /// frame, the prefix errors of the decoder, and `FrameError::Io`.
    pub async fn read_frame<R>(&self, reader: &mut R) -> Result<Option<BytesMut>, FrameError>
    where
        R: AsyncRead + Unpin,
    {
        let mut prefix = vec![0u8; self.prefix_len];
        let received = read_full(reader, &mut prefix).await?;
        if received == 0 {
            return Ok(None);
        }
        if received < self.prefix_len {
            return Err(FrameError::IncompleteFrame {
                expected: self.prefix_len,
                received,
            });
        }

        let len = self.payload_len(&prefix)?;
        let mut payload = BytesMut::zeroed(len);
        let received = read_full(reader, &mut payload).await?;
        if received < len {
            return Err(FrameError::IncompleteFrame {
                expected: self.prefix_len + len,
                received: self.prefix_len + received,
            });
        }
        Ok(Some(payload))
    }
}

/// Fills `buf` unless the stream ends first; returns the bytes read.
async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> Result<usize, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < self.prefix_len {
            src.reserve(self.prefix_len - src.len());
            return Ok(None);
        }

        let len = self.payload_len(&src[..self.prefix_len])?;
        let total = self.prefix_len + len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(self.prefix_len);
        Ok(Some(src.split_to(len)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let expected = if src.len() < self.prefix_len {
            self.prefix_len
        } else {
            self.prefix_len + self.payload_len(&src[..self.prefix_len])?
        };
        Err(FrameError::IncompleteFrame {
            expected,
            received: src.len(),
        })
    }
}

impl Encoder<&[u8]> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode_slice(item, dst)
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode_slice(&item, dst)
    }
}

impl Encoder<BytesMut> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: BytesMut, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode_slice(&item, dst)
    }
}
