/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Packed BCD conversion.
//!
//! Two decimal digits per byte, high nibble first. An odd digit count
//! leaves one filler nibble, placed according to [`BcdPadding`]. Track
//! data additionally carries the `=` separator as nibble `0xD`.

use bytes::{BufMut, BytesMut};
use ironiso_dictionary::BcdPadding;
use thiserror::Error;

/// Nibble that carries the track data field separator.
pub const TRACK_SEPARATOR_NIBBLE: u8 = 0x0D;

/// BCD conversion failure.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BcdError {
    /// Input byte is not a decimal digit (or `=` for track data).
    #[error("non-digit byte 0x{byte:02X} at position {index}")]
    InvalidDigit {
        /// Position of the byte in the input.
        index: usize,
        /// The offending byte.
        byte: u8,
    },

    /// Packed nibble is not a decimal digit (or `0xD` for track data).
    #[error("invalid BCD nibble 0x{nibble:X} at position {index}")]
    InvalidNibble {
        /// Position of the nibble, counting from the first high nibble.
        index: usize,
        /// The offending nibble.
        nibble: u8,
    },

    /// Filler nibble of an odd digit count is not zero.
    #[error("non-zero BCD filler nibble 0x{nibble:X} at position {index}")]
    InvalidFiller {
        /// Position of the filler nibble.
        index: usize,
        /// The offending nibble.
        nibble: u8,
    },
}

/// Returns the number of bytes needed to pack `digits` digits.
#[inline]
#[must_use]
pub const fn packed_len(digits: usize) -> usize {
    digits.div_ceil(2)
}

#[inline]
fn nibble_of(index: usize, byte: u8, track: bool) -> Result<u8, BcdError> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'=' if track => Ok(TRACK_SEPARATOR_NIBBLE),
        _ => Err(BcdError::InvalidDigit { index, byte }),
    }
}

/// Packs ASCII digits into BCD, appending to `out`.
///
/// # Arguments
/// * `digits` - ASCII digits (and `=` when `track` is set)
/// * `padding` - Filler nibble position for odd digit counts
/// * `track` - Whether `=` is accepted as a separator
/// * `out` - Destination buffer
///
/// # Errors
/// Returns `BcdError::InvalidDigit` for any other input byte. Nothing is
/// appended in that case.
pub fn pack(
    digits: &[u8],
    padding: BcdPadding,
    track: bool,
    out: &mut BytesMut,
) -> Result<(), BcdError> {
    let mut packed = Vec::with_capacity(packed_len(digits.len()));
    let mut high = if digits.len() % 2 == 1 && padding == BcdPadding::Left {
        Some(0)
    } else {
        None
    };

    for (index, &byte) in digits.iter().enumerate() {
        let nibble = nibble_of(index, byte, track)?;
        match high.take() {
            Some(h) => packed.push((h << 4) | nibble),
            None => high = Some(nibble),
        }
    }
    if let Some(h) = high {
        packed.push(h << 4);
    }

    out.put_slice(&packed);
    Ok(())
}

/// Unpacks `count` digits from BCD bytes.
///
/// `bytes` must hold exactly [`packed_len`]`(count)` bytes. The filler
/// nibble of an odd count must be zero.
///
/// # Errors
/// Returns `BcdError::InvalidFiller` for a non-zero filler nibble and
/// `BcdError::InvalidNibble` for a nibble above 9 (other than the
/// separator nibble when `track` is set).
pub fn unpack(
    bytes: &[u8],
    count: usize,
    padding: BcdPadding,
    track: bool,
) -> Result<Vec<u8>, BcdError> {
    let skip = usize::from(count % 2 == 1 && padding == BcdPadding::Left);
    let nibbles = bytes.iter().flat_map(|b| [b >> 4, b & 0x0F]);

    if count % 2 == 1 {
        let index = if skip == 1 { 0 } else { count };
        if let Some(nibble) = nibbles.clone().nth(index)
            && nibble != 0
        {
            return Err(BcdError::InvalidFiller { index, nibble });
        }
    }

    nibbles
        .enumerate()
        .skip(skip)
        .take(count)
        .map(|(index, nibble)| match nibble {
            0..=9 => Ok(b'0' + nibble),
            TRACK_SEPARATOR_NIBBLE if track => Ok(b'='),
            _ => Err(BcdError::InvalidNibble { index, nibble }),
        })
        .collect()
}

/// Packs an integer as `digits` BCD digits, zero-filled on the left.
///
/// Used for BCD length prefixes, where the digit count is always even
/// after rounding up to whole bytes.
pub fn pack_number(value: usize, digits: usize, out: &mut BytesMut) {
    let mut buf = itoa::Buffer::new();
    let text = buf.format(value).as_bytes();
    let mut padded = vec![b'0'; digits.saturating_sub(text.len())];
    padded.extend_from_slice(text);
    // digits only, cannot fail
    let _ = pack(&padded, BcdPadding::Left, false, out);
}

/// Unpacks a BCD integer.
///
/// # Errors
/// Returns `BcdError::InvalidNibble` if any nibble is not a decimal digit.
pub fn unpack_number(bytes: &[u8]) -> Result<usize, BcdError> {
    let digits = unpack(bytes, bytes.len() * 2, BcdPadding::Right, false)?;
    Ok(digits
        .iter()
        .fold(0usize, |acc, d| acc * 10 + usize::from(d - b'0')))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packed(digits: &str, padding: BcdPadding, track: bool) -> Vec<u8> {
        let mut out = BytesMut::new();
        pack(digits.as_bytes(), padding, track, &mut out).unwrap();
        out.to_vec()
    }

    #[test]
    fn test_pack_even() {
        assert_eq!(packed("16", BcdPadding::Right, false), vec![0x16]);
        assert_eq!(
            packed("4539681234567890", BcdPadding::Right, false),
            vec![0x45, 0x39, 0x68, 0x12, 0x34, 0x56, 0x78, 0x90]
        );
    }

    #[test]
    fn test_pack_odd_padding() {
        assert_eq!(packed("123", BcdPadding::Right, false), vec![0x12, 0x30]);
        assert_eq!(packed("840", BcdPadding::Left, false), vec![0x08, 0x40]);
    }

    #[test]
    fn test_pack_rejects_non_digit() {
        let mut out = BytesMut::new();
        let err = pack(b"12A4", BcdPadding::Right, false, &mut out).unwrap_err();
        assert_eq!(err, BcdError::InvalidDigit { index: 2, byte: b'A' });
        assert!(out.is_empty());
    }

    #[test]
    fn test_unpack() {
        assert_eq!(unpack(&[0x16], 2, BcdPadding::Right, false).unwrap(), b"16");
        assert_eq!(unpack(&[0x12, 0x30], 3, BcdPadding::Right, false).unwrap(), b"123");
        assert_eq!(unpack(&[0x08, 0x40], 3, BcdPadding::Left, false).unwrap(), b"840");
    }

    #[test]
    fn test_unpack_rejects_bad_nibble() {
        let err = unpack(&[0x1A], 2, BcdPadding::Right, false).unwrap_err();
        assert_eq!(err, BcdError::InvalidNibble { index: 1, nibble: 0x0A });
    }

    #[test]
    fn test_unpack_rejects_non_zero_filler() {
        let err = unpack(&[0x12, 0x3F], 3, BcdPadding::Right, false).unwrap_err();
        assert_eq!(err, BcdError::InvalidFiller { index: 3, nibble: 0x0F });

        let err = unpack(&[0x18, 0x40], 3, BcdPadding::Left, false).unwrap_err();
        assert_eq!(err, BcdError::InvalidFiller { index: 0, nibble: 0x01 });

        let err = unpack(&[0x1F], 1, BcdPadding::Right, false).unwrap_err();
        assert_eq!(err, BcdError::InvalidFiller { index: 1, nibble: 0x0F });
    }

    #[test]
    fn test_track_separator() {
        let bytes = packed("4539=2512", BcdPadding::Right, true);
        assert_eq!(bytes, vec![0x45, 0x39, 0xD2, 0x51, 0x20]);
        assert_eq!(
            unpack(&bytes, 9, BcdPadding::Right, true).unwrap(),
            b"4539=2512"
        );
        assert!(unpack(&bytes, 9, BcdPadding::Right, false).is_err());
    }

    #[test]
    fn test_numbers() {
        let mut out = BytesMut::new();
        pack_number(16, 2, &mut out);
        pack_number(123, 4, &mut out);
        assert_eq!(out.to_vec(), vec![0x16, 0x01, 0x23]);
        assert_eq!(unpack_number(&[0x01, 0x23]).unwrap(), 123);
        assert!(unpack_number(&[0xF1]).is_err());
    }
}
