/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! ISO 8583 bitmap handling.
//!
//! A bitmap is 64 bits, most significant bit of the first byte numbered 1.
//! Bit 1 never marks a data element: it announces that another bitmap
//! follows. Chaining up to three bitmaps addresses fields 2..=192, with
//! 65 and 129 taken by the indicators of the second and third levels.

use crate::reader::ByteReader;
use bytes::{BufMut, BytesMut};
use ironiso_core::{DecodeError, EncodeError, FieldPath};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Bytes in one raw bitmap.
pub const BITMAP_LEN: usize = 8;

/// Bits in one bitmap.
pub const BITS_PER_LEVEL: u16 = 64;

/// Deepest chain a message may carry.
pub const MAX_LEVELS: u8 = 3;

/// Decoded content of a single bitmap.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Presence {
    /// Data bits that are set, numbered 2..=64.
    pub bits: BTreeSet<u16>,
    /// Whether bit 1 is set.
    pub has_next: bool,
}

/// Decodes one bitmap. Total: every 8-byte input is a valid bitmap.
#[must_use]
pub fn decode_presence(bytes: &[u8; BITMAP_LEN]) -> Presence {
    let mut presence = Presence::default();
    for (i, byte) in bytes.iter().enumerate() {
        for j in 0..8 {
            if byte & (0x80 >> j) != 0 {
                let bit = (i * 8 + j + 1) as u16;
                if bit == 1 {
                    presence.has_next = true;
                } else {
                    presence.bits.insert(bit);
                }
            }
        }
    }
    presence
}

/// Encodes one bitmap.
///
/// # Arguments
/// * `bits` - Data bits to set, each in 2..=64
/// * `has_more` - Whether to set bit 1
///
/// # Errors
/// Returns `EncodeError::InvalidFieldNumber` for bit 1 or a bit outside 1..=64.
pub fn encode_presence(
    bits: impl IntoIterator<Item = u16>,
    has_more: bool,
) -> Result<[u8; BITMAP_LEN], EncodeError> {
    let mut bytes = [0u8; BITMAP_LEN];
    for bit in bits {
        if bit == 1 {
            return Err(EncodeError::InvalidFieldNumber {
                field: bit,
                reason: "bit 1 is the next-bitmap indicator",
            });
        }
        if bit == 0 || bit > BITS_PER_LEVEL {
            return Err(EncodeError::InvalidFieldNumber {
                field: bit,
                reason: "bit position outside 1..=64",
            });
        }
        let index = usize::from(bit - 1);
        bytes[index / 8] |= 0x80 >> (index % 8);
    }
    if has_more {
        bytes[0] |= 0x80;
    }
    Ok(bytes)
}

/// Wire representation of a bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitmapEncoding {
    /// Eight raw bytes.
    #[default]
    Binary,
    /// Sixteen uppercase hexadecimal characters.
    Hex,
}

impl BitmapEncoding {
    /// Bytes one bitmap occupies on the wire.
    #[inline]
    #[must_use]
    pub const fn wire_len(&self) -> usize {
        match self {
            Self::Binary => BITMAP_LEN,
            Self::Hex => BITMAP_LEN * 2,
        }
    }

    fn write(&self, raw: &[u8; BITMAP_LEN], out: &mut BytesMut) {
        match self {
            Self::Binary => out.put_slice(raw),
            Self::Hex => {
                const HEX: &[u8; 16] = b"0123456789ABCDEF";
                for byte in raw {
                    out.put_u8(HEX[usize::from(byte >> 4)]);
                    out.put_u8(HEX[usize::from(byte & 0x0F)]);
                }
            }
        }
    }

    fn read(
        &self,
        reader: &mut ByteReader<'_>,
        path: &FieldPath,
    ) -> Result<[u8; BITMAP_LEN], DecodeError> {
        let offset = reader.offset();
        let wire = reader.take(self.wire_len(), path)?;
        let mut raw = [0u8; BITMAP_LEN];
        match self {
            Self::Binary => raw.copy_from_slice(wire),
            Self::Hex => {
                for (i, pair) in wire.chunks_exact(2).enumerate() {
                    let high = hex_value(pair[0]);
                    let low = hex_value(pair[1]);
                    match (high, low) {
                        (Some(h), Some(l)) => raw[i] = (h << 4) | l,
                        _ => {
                            return Err(DecodeError::MalformedField {
                                field: path.clone(),
                                offset,
                                reason: format!(
                                    "non-hex bitmap characters {:?}",
                                    String::from_utf8_lossy(pair)
                                ),
                            });
                        }
                    }
                }
            }
        }
        Ok(raw)
    }
}

#[inline]
fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// Chain of one to three bitmaps addressing absolute field numbers.
///
/// Used for the message bitmap and, with a single level, for composite
/// fields that carry their own subfield bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapChain {
    encoding: BitmapEncoding,
    min_levels: u8,
    max_levels: u8,
}

impl BitmapChain {
    /// Creates a chain.
    ///
    /// `max_levels` is clamped to 1..=3 and `min_levels` to 1..=`max_levels`.
    #[must_use]
    pub fn new(encoding: BitmapEncoding, min_levels: u8, max_levels: u8) -> Self {
        let max_levels = max_levels.clamp(1, MAX_LEVELS);
        Self {
            encoding,
            min_levels: min_levels.clamp(1, max_levels),
            max_levels,
        }
    }

    /// Returns the highest field number this chain can address.
    #[inline]
    #[must_use]
    pub const fn max_field(&self) -> u16 {
        self.max_levels as u16 * BITS_PER_LEVEL
    }

    /// Returns the bitmap wire encoding.
    #[inline]
    #[must_use]
    pub const fn encoding(&self) -> BitmapEncoding {
        self.encoding
    }

    /// Writes the chain for the given absolute field numbers.
    ///
    /// The chain is as deep as the highest field requires, and at least
    /// `min_levels` deep.
    ///
    /// # Errors
    /// Returns `EncodeError::InvalidFieldNumber` for 0, for an indicator
    /// position (1, 65, 129) or for a field beyond the last level.
    pub fn write(
        &self,
        fields: impl IntoIterator<Item = u16>,
        out: &mut BytesMut,
    ) -> Result<(), EncodeError> {
        let mut per_level: [Vec<u16>; MAX_LEVELS as usize] = Default::default();
        let mut levels = usize::from(self.min_levels);

        for field in fields {
            if field == 0 || field > self.max_field() {
                return Err(EncodeError::InvalidFieldNumber {
                    field,
                    reason: "field number beyond the last bitmap",
                });
            }
            let level = usize::from((field - 1) / BITS_PER_LEVEL);
            let bit = field - level as u16 * BITS_PER_LEVEL;
            if bit == 1 {
                return Err(EncodeError::InvalidFieldNumber {
                    field,
                    reason: "position is reserved for a bitmap indicator",
                });
            }
            per_level[level].push(bit);
            levels = levels.max(level + 1);
        }

        for (level, bits) in per_level.iter().take(levels).enumerate() {
            let raw = encode_presence(bits.iter().copied(), level + 1 < levels)?;
            self.encoding.write(&raw, out);
        }
        Ok(())
    }

    /// Reads a chain and returns the absolute field numbers it announces.
    ///
    /// # Arguments
    /// * `reader` - Cursor positioned at the first bitmap
    /// * `path` - Path reported in errors (field 1 for a message bitmap)
    ///
    /// # Errors
    /// Returns `DecodeError::TruncatedMessage` if a bitmap is cut short and
    /// `DecodeError::MalformedField` if the chain is deeper than allowed.
    pub fn read(
        &self,
        reader: &mut ByteReader<'_>,
        path: &FieldPath,
    ) -> Result<BTreeSet<u16>, DecodeError> {
        let mut fields = BTreeSet::new();
        let mut level: u16 = 0;
        loop {
            let offset = reader.offset();
            let raw = self.encoding.read(reader, path)?;
            let presence = decode_presence(&raw);
            fields.extend(presence.bits.iter().map(|bit| bit + level * BITS_PER_LEVEL));
            level += 1;

            if !presence.has_next {
                return Ok(fields);
            }
            if level >= u16::from(self.max_levels) {
                return Err(DecodeError::MalformedField {
                    field: path.clone(),
                    offset,
                    reason: format!("bitmap chain exceeds {} levels", self.max_levels),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(chain: &BitmapChain, fields: &[u16]) -> Vec<u8> {
        let mut out = BytesMut::new();
        chain.write(fields.iter().copied(), &mut out).unwrap();
        out.to_vec()
    }

    #[test]
    fn test_decode_presence() {
        let presence = decode_presence(&[0xD2, 0, 0, 0, 0, 0, 0, 0x01]);
        assert!(presence.has_next);
        assert_eq!(presence.bits.into_iter().collect::<Vec<_>>(), vec![2, 4, 7, 64]);
    }

    #[test]
    fn test_encode_presence() {
        let raw = encode_presence([2, 4, 7], true).unwrap();
        assert_eq!(raw, [0xD2, 0, 0, 0, 0, 0, 0, 0]);
        let raw = encode_presence([2, 4, 11], false).unwrap();
        assert_eq!(raw, [0x50, 0x20, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_encode_presence_rejects_bad_bits() {
        assert!(matches!(
            encode_presence([1], false),
            Err(EncodeError::InvalidFieldNumber { field: 1, .. })
        ));
        assert!(matches!(
            encode_presence([65], false),
            Err(EncodeError::InvalidFieldNumber { field: 65, .. })
        ));
        assert!(encode_presence([0], false).is_err());
    }

    #[test]
    fn test_chain_min_levels() {
        let chain = BitmapChain::new(BitmapEncoding::Binary, 2, 2);
        let bytes = written(&chain, &[2, 4, 7]);
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes[0], 0xD2);
        assert!(bytes[8..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_chain_indicator_iff_next_level() {
        let chain = BitmapChain::new(BitmapEncoding::Binary, 1, 3);

        let bytes = written(&chain, &[3, 64]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(bytes[0] & 0x80, 0);

        let bytes = written(&chain, &[3, 70]);
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes[0] & 0x80, 0x80);
        assert_eq!(bytes[8] & 0x80, 0);

        let bytes = written(&chain, &[3, 130]);
        assert_eq!(bytes.len(), 24);
        assert_eq!(bytes[0] & 0x80, 0x80);
        assert_eq!(bytes[8] & 0x80, 0x80);
        assert_eq!(bytes[16] & 0x80, 0);
        // 130 is bit 2 of the third level
        assert_eq!(bytes[16], 0x40);
    }

    #[test]
    fn test_chain_rejects_unaddressable_fields() {
        let chain = BitmapChain::new(BitmapEncoding::Binary, 1, 2);
        let mut out = BytesMut::new();
        for field in [1, 65, 130] {
            let err = chain.write([field], &mut out).unwrap_err();
            assert!(matches!(err, EncodeError::InvalidFieldNumber { field: f, .. } if f == field));
        }
    }

    #[test]
    fn test_chain_read() {
        let chain = BitmapChain::new(BitmapEncoding::Binary, 1, 3);
        let bytes = written(&chain, &[2, 11, 70, 128, 130]);
        let mut reader = ByteReader::new(&bytes);
        let fields = chain.read(&mut reader, &FieldPath::new(1)).unwrap();
        assert_eq!(fields.into_iter().collect::<Vec<_>>(), vec![2, 11, 70, 128, 130]);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_chain_read_too_deep() {
        let chain = BitmapChain::new(BitmapEncoding::Binary, 1, 1);
        let bytes = [0x80, 0, 0, 0, 0, 0, 0, 0];
        let mut reader = ByteReader::new(&bytes);
        let err = chain.read(&mut reader, &FieldPath::new(1)).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedField { offset: 0, .. }));
    }

    #[test]
    fn test_chain_read_truncated() {
        let chain = BitmapChain::new(BitmapEncoding::Binary, 1, 2);
        let bytes = [0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let mut reader = ByteReader::new(&bytes);
        let err = chain.read(&mut reader, &FieldPath::new(1)).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TruncatedMessage { offset: 8, needed: 8, available: 2, .. }
        ));
    }

    #[test]
    fn test_hex_encoding() {
        let chain = BitmapChain::new(BitmapEncoding::Hex, 1, 2);
        let bytes = written(&chain, &[2, 4, 7]);
        assert_eq!(bytes, b"5200000000000000");

        let mut reader = ByteReader::new(b"d200000000000000");
        let err = chain.read(&mut reader, &FieldPath::new(1)).unwrap_err();
        assert!(matches!(err, DecodeError::TruncatedMessage { .. }));

        let mut reader = ByteReader::new(b"52000000000000ZZ");
        let err = chain.read(&mut reader, &FieldPath::new(1)).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedField { .. }));
    }
}
