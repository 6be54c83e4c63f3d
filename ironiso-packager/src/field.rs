/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Leaf field codecs.
//!
//! A [`FieldCodec`] is resolved once per field from its [`FieldSpec`] when
//! the packager is built, so packing never re-inspects the dictionary.
//! It combines:
//! - a [`Payload`] kind: ASCII numeric, ASCII text, packed BCD or raw bytes
//! - a [`LengthPrefix`] for LLVAR / LLLVAR fields, or a fixed length

use crate::bcd::{self, BcdError};
use crate::reader::ByteReader;
use bytes::{BufMut, Bytes, BytesMut};
use ironiso_core::{DecodeError, EncodeError, FieldPath};
use ironiso_dictionary::{
    BcdPadding, Encoding, FieldSpec, FieldType, LengthClass, PrefixEncoding,
};

/// Length prefix of a variable-length field or composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthPrefix {
    /// Prefix wire form.
    pub encoding: PrefixEncoding,
    /// Decimal digits of the prefix: 2 for LLVAR, 3 for LLLVAR.
    pub digits: usize,
    /// Largest length the field accepts.
    pub max: usize,
}

impl LengthPrefix {
    /// Builds the prefix for a length class, `None` for fixed lengths.
    #[must_use]
    pub const fn for_class(length: LengthClass, encoding: PrefixEncoding) -> Option<Self> {
        match length {
            LengthClass::Fixed(_) => None,
            LengthClass::Llvar(max) => Some(Self {
                encoding,
                digits: 2,
                max,
            }),
            LengthClass::Lllvar(max) => Some(Self {
                encoding,
                digits: 3,
                max,
            }),
        }
    }

    /// Bytes the prefix occupies on the wire.
    #[inline]
    #[must_use]
    pub const fn wire_len(&self) -> usize {
        match self.encoding {
            PrefixEncoding::Ascii => self.digits,
            PrefixEncoding::Bcd | PrefixEncoding::Binary => self.digits.div_ceil(2),
        }
    }

    /// Writes `len` as a prefix.
    ///
    /// # Errors
    /// Returns `EncodeError::ValueTooLong` if `len` exceeds the maximum.
    pub fn encode(
        &self,
        path: &FieldPath,
        len: usize,
        out: &mut BytesMut,
    ) -> Result<(), EncodeError> {
        if len > self.max {
            return Err(EncodeError::ValueTooLong {
                field: path.clone(),
                length: len,
                max_length: self.max,
            });
        }
        match self.encoding {
            PrefixEncoding::Ascii => {
                let mut buf = itoa::Buffer::new();
                let text = buf.format(len).as_bytes();
                out.put_bytes(b'0', self.digits.saturating_sub(text.len()));
                out.put_slice(text);
            }
            PrefixEncoding::Bcd => bcd::pack_number(len, self.wire_len() * 2, out),
            PrefixEncoding::Binary => {
                if self.wire_len() == 1 {
                    out.put_u8(len as u8);
                } else {
                    out.put_u16(len as u16);
                }
            }
        }
        Ok(())
    }

    /// Reads a prefix and returns the announced length.
    ///
    /// # Errors
    /// Returns `DecodeError::TruncatedMessage` if the prefix is cut short and
    /// `DecodeError::MalformedField` if it is not a legal number or exceeds
    /// the maximum.
    pub fn decode(
        &self,
        path: &FieldPath,
        reader: &mut ByteReader<'_>,
    ) -> Result<usize, DecodeError> {
        let offset = reader.offset();
        let wire = reader.take(self.wire_len(), path)?;
        let malformed = |reason: String| DecodeError::MalformedField {
            field: path.clone(),
            offset,
            reason,
        };

        let len = match self.encoding {
            PrefixEncoding::Ascii => {
                if !wire.iter().all(u8::is_ascii_digit) {
                    return Err(malformed(format!(
                        "non-digit length prefix {:?}",
                        String::from_utf8_lossy(wire)
                    )));
                }
                wire.iter()
                    .fold(0usize, |acc, d| acc * 10 + usize::from(d - b'0'))
            }
            PrefixEncoding::Bcd => bcd::unpack_number(wire)
                .map_err(|e| malformed(format!("length prefix: {}", e)))?,
            PrefixEncoding::Binary => wire
                .iter()
                .fold(0usize, |acc, b| (acc << 8) | usize::from(*b)),
        };

        if len > self.max {
            return Err(malformed(format!(
                "length prefix {} exceeds maximum {}",
                len, self.max
            )));
        }
        Ok(len)
    }
}

/// How a leaf value is represented on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// One ASCII digit per byte; short fixed values are zero-filled on the left.
    AsciiNumeric,
    /// One character per byte; short fixed values are space-filled on the right.
    AsciiText,
    /// Packed BCD digits, two per byte.
    Bcd {
        /// Filler nibble position for odd digit counts.
        padding: BcdPadding,
        /// Whether `=` is carried as nibble `0xD`.
        track: bool,
    },
    /// Raw bytes; fixed values must match the length exactly.
    Binary,
}

impl Payload {
    fn for_spec(spec: &FieldSpec) -> Self {
        match (spec.encoding, spec.field_type) {
            (Encoding::Bcd, field_type) => Self::Bcd {
                padding: spec.padding,
                track: field_type == FieldType::Track,
            },
            (Encoding::Binary, _) => Self::Binary,
            (Encoding::Ascii, FieldType::Numeric) => Self::AsciiNumeric,
            (Encoding::Ascii, _) => Self::AsciiText,
        }
    }

    /// Wire bytes needed for `len` logical units.
    #[inline]
    #[must_use]
    pub const fn wire_len(&self, len: usize) -> usize {
        match self {
            Self::Bcd { .. } => bcd::packed_len(len),
            _ => len,
        }
    }
}

/// Codec for one leaf field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldCodec {
    payload: Payload,
    /// Fixed length, or the maximum when `prefix` is set.
    length: usize,
    prefix: Option<LengthPrefix>,
}

impl FieldCodec {
    /// Resolves the codec for a leaf field specification.
    #[must_use]
    pub fn new(spec: &FieldSpec) -> Self {
        Self {
            payload: Payload::for_spec(spec),
            length: spec.length.max_length(),
            prefix: LengthPrefix::for_class(spec.length, spec.prefix),
        }
    }

    /// Returns the payload kind.
    #[inline]
    #[must_use]
    pub const fn payload(&self) -> Payload {
        self.payload
    }

    /// Returns the length prefix, `None` for fixed-length fields.
    #[inline]
    #[must_use]
    pub const fn prefix(&self) -> Option<LengthPrefix> {
        self.prefix
    }

    /// Appends the wire form of `value`.
    ///
    /// # Errors
    /// Returns `EncodeError::ValueTooLong` when the value exceeds the fixed
    /// length or variable maximum, and `EncodeError::InvalidValue` for
    /// non-digit content in a numeric field or a short fixed binary value.
    pub fn encode(
        &self,
        path: &FieldPath,
        value: &[u8],
        out: &mut BytesMut,
    ) -> Result<(), EncodeError> {
        if let Payload::AsciiNumeric = self.payload
            && let Some(index) = value.iter().position(|b| !b.is_ascii_digit())
        {
            return Err(EncodeError::InvalidValue {
                field: path.clone(),
                reason: format!("non-digit byte 0x{:02X} at position {}", value[index], index),
            });
        }

        if let Some(prefix) = &self.prefix {
            prefix.encode(path, value.len(), out)?;
            return self.write_payload(path, value, out);
        }

        if value.len() > self.length {
            return Err(EncodeError::ValueTooLong {
                field: path.clone(),
                length: value.len(),
                max_length: self.length,
            });
        }
        if value.len() == self.length {
            return self.write_payload(path, value, out);
        }

        let missing = self.length - value.len();
        let mut padded = Vec::with_capacity(self.length);
        match self.payload {
            Payload::AsciiNumeric | Payload::Bcd { track: false, .. } => {
                padded.resize(missing, b'0');
                padded.extend_from_slice(value);
            }
            Payload::AsciiText => {
                padded.extend_from_slice(value);
                padded.resize(self.length, b' ');
            }
            Payload::Binary | Payload::Bcd { track: true, .. } => {
                return Err(EncodeError::InvalidValue {
                    field: path.clone(),
                    reason: format!("expected {} units, got {}", self.length, value.len()),
                });
            }
        }
        self.write_payload(path, &padded, out)
    }

    fn write_payload(
        &self,
        path: &FieldPath,
        value: &[u8],
        out: &mut BytesMut,
    ) -> Result<(), EncodeError> {
        match self.payload {
            Payload::Bcd { padding, track } => {
                bcd::pack(value, padding, track, out).map_err(|e| EncodeError::InvalidValue {
                    field: path.clone(),
                    reason: e.to_string(),
                })
            }
            _ => {
                out.put_slice(value);
                Ok(())
            }
        }
    }

    /// Reads one value.
    ///
    /// # Errors
    /// Returns `DecodeError::TruncatedMessage` when the buffer ends inside
    /// the field and `DecodeError::MalformedField` for an illegal prefix,
    /// BCD nibble or ASCII digit.
    pub fn decode(
        &self,
        path: &FieldPath,
        reader: &mut ByteReader<'_>,
    ) -> Result<Bytes, DecodeError> {
        let len = match &self.prefix {
            Some(prefix) => prefix.decode(path, reader)?,
            None => self.length,
        };

        let offset = reader.offset();
        let wire = reader.take(self.payload.wire_len(len), path)?;
        let malformed = |reason: String| DecodeError::MalformedField {
            field: path.clone(),
            offset,
            reason,
        };

        match self.payload {
            Payload::Bcd { padding, track } => bcd::unpack(wire, len, padding, track)
                .map(Bytes::from)
                .map_err(|e: BcdError| malformed(e.to_string())),
            Payload::AsciiNumeric => match wire.iter().position(|b| !b.is_ascii_digit()) {
                Some(index) => Err(malformed(format!(
                    "non-digit byte 0x{:02X} at position {}",
                    wire[index], index
                ))),
                None => Ok(Bytes::copy_from_slice(wire)),
            },
            Payload::AsciiText | Payload::Binary => Ok(Bytes::copy_from_slice(wire)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(spec: &FieldSpec, value: &[u8]) -> Result<Vec<u8>, EncodeError> {
        let mut out = BytesMut::new();
        FieldCodec::new(spec)
            .encode(&FieldPath::new(spec.number), value, &mut out)
            .map(|()| out.to_vec())
    }

    fn decoded(spec: &FieldSpec, wire: &[u8]) -> Result<Bytes, DecodeError> {
        let mut reader = ByteReader::new(wire);
        FieldCodec::new(spec).decode(&FieldPath::new(spec.number), &mut reader)
    }

    fn pan_bcd() -> FieldSpec {
        FieldSpec::llvar(2, FieldType::Numeric, 19)
            .with_encoding(Encoding::Bcd)
            .with_prefix(PrefixEncoding::Bcd)
    }

    #[test]
    fn test_llvar_bcd_pan() {
        let wire = encoded(&pan_bcd(), b"4539681234567890").unwrap();
        assert_eq!(
            wire,
            vec![0x16, 0x45, 0x39, 0x68, 0x12, 0x34, 0x56, 0x78, 0x90]
        );
        assert_eq!(decoded(&pan_bcd(), &wire).unwrap(), &b"4539681234567890"[..]);
    }

    #[test]
    fn test_llvar_ascii_prefix() {
        let spec = FieldSpec::llvar(2, FieldType::Numeric, 19);
        let wire = encoded(&spec, b"4539681234567890").unwrap();
        assert_eq!(&wire[..2], b"16");
        assert_eq!(wire.len(), 18);
    }

    #[test]
    fn test_lllvar_prefix_forms() {
        let ascii = FieldSpec::lllvar(48, FieldType::AlphanumericSpecial, 999);
        assert_eq!(&encoded(&ascii, b"HELLO").unwrap()[..3], b"005");

        let bcd = ascii.clone().with_prefix(PrefixEncoding::Bcd);
        assert_eq!(&encoded(&bcd, b"HELLO").unwrap()[..2], &[0x00, 0x05]);

        let binary = FieldSpec::lllvar(55, FieldType::Binary, 999).with_prefix(PrefixEncoding::Binary);
        let wire = encoded(&binary, &[0xAB; 300]).unwrap();
        assert_eq!(&wire[..2], &[0x01, 0x2C]);
        assert_eq!(decoded(&binary, &wire).unwrap().len(), 300);
    }

    #[test]
    fn test_fixed_bcd_amount() {
        let spec = FieldSpec::fixed(4, FieldType::Numeric, 12).with_encoding(Encoding::Bcd);
        let wire = encoded(&spec, b"000000001000").unwrap();
        assert_eq!(wire, vec![0x00, 0x00, 0x00, 0x00, 0x10, 0x00]);
        assert_eq!(encoded(&spec, b"1000").unwrap(), wire);
    }

    #[test]
    fn test_fixed_padding() {
        let numeric = FieldSpec::fixed(11, FieldType::Numeric, 6);
        assert_eq!(encoded(&numeric, b"42").unwrap(), b"000042");

        let text = FieldSpec::fixed(41, FieldType::AlphanumericSpecial, 8);
        assert_eq!(encoded(&text, b"TERM1").unwrap(), b"TERM1   ");

        let binary = FieldSpec::fixed(52, FieldType::Binary, 8);
        assert!(matches!(
            encoded(&binary, &[0x01; 4]),
            Err(EncodeError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_value_too_long() {
        let fixed = FieldSpec::fixed(39, FieldType::Alphanumeric, 2);
        assert!(matches!(
            encoded(&fixed, b"000"),
            Err(EncodeError::ValueTooLong { length: 3, max_length: 2, .. })
        ));
        assert!(matches!(
            encoded(&pan_bcd(), &[b'4'; 20]),
            Err(EncodeError::ValueTooLong { length: 20, max_length: 19, .. })
        ));
    }

    #[test]
    fn test_numeric_rejects_letters() {
        let ascii = FieldSpec::fixed(3, FieldType::Numeric, 6);
        assert!(matches!(
            encoded(&ascii, b"00A000"),
            Err(EncodeError::InvalidValue { .. })
        ));
        let bcd = ascii.with_encoding(Encoding::Bcd);
        assert!(matches!(
            encoded(&bcd, b"00A000"),
            Err(EncodeError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_decode_truncated_mid_pan() {
        let wire = [0x16, 0x45, 0x39, 0x68];
        let err = decoded(&pan_bcd(), &wire).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TruncatedMessage {
                field: FieldPath::new(2),
                offset: 1,
                needed: 8,
                available: 3,
            }
        );
    }

    #[test]
    fn test_decode_prefix_over_max() {
        let err = decoded(&pan_bcd(), &[0x25, 0x45]).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedField { offset: 0, .. }));
    }

    #[test]
    fn test_decode_bad_nibble() {
        let spec = FieldSpec::fixed(11, FieldType::Numeric, 6).with_encoding(Encoding::Bcd);
        let err = decoded(&spec, &[0x12, 0x3A, 0x56]).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedField { .. }));
    }

    #[test]
    fn test_decode_ascii_non_digit() {
        let spec = FieldSpec::llvar(32, FieldType::Numeric, 11);
        assert!(matches!(
            decoded(&spec, b"0X123"),
            Err(DecodeError::MalformedField { .. })
        ));
        assert!(matches!(
            decoded(&spec, b"03A23"),
            Err(DecodeError::MalformedField { .. })
        ));
    }

    #[test]
    fn test_track2_bcd() {
        let spec = FieldSpec::llvar(35, FieldType::Track, 37)
            .with_encoding(Encoding::Bcd)
            .with_prefix(PrefixEncoding::Bcd);
        let wire = encoded(&spec, b"4539681234567890=2512101").unwrap();
        assert_eq!(wire[0], 0x24);
        assert_eq!(wire[9], 0xD2);
        assert_eq!(
            decoded(&spec, &wire).unwrap(),
            &b"4539681234567890=2512101"[..]
        );
    }

    #[test]
    fn test_odd_llvar_left_padding() {
        let spec = FieldSpec::llvar(32, FieldType::Numeric, 11)
            .with_encoding(Encoding::Bcd)
            .with_prefix(PrefixEncoding::Bcd)
            .with_padding(BcdPadding::Left);
        let wire = encoded(&spec, b"12345").unwrap();
        assert_eq!(wire, vec![0x05, 0x01, 0x23, 0x45]);
        assert_eq!(decoded(&spec, &wire).unwrap(), &b"12345"[..]);
    }
}
