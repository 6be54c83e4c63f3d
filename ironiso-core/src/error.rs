/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Error types for the IronIso toolkit.
//!
//! This module provides the packing and unpacking error hierarchy using
//! `thiserror`. Every decode error names the offending field and the byte
//! offset at which decoding failed.

use crate::field::FieldPath;
use thiserror::Error;

/// Result type alias using [`IsoError`] as the error type.
pub type Result<T> = std::result::Result<T, IsoError>;

/// Top-level error type for message-level IronIso operations.
#[derive(Debug, Error)]
pub enum IsoError {
    /// Error during message unpacking.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Error during message packing.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// I/O error from underlying transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that occur while unpacking an ISO 8583 message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Field bytes are present but not a legal encoding.
    #[error("malformed field {field} at offset {offset}: {reason}")]
    MalformedField {
        /// Path of the offending field.
        field: FieldPath,
        /// Byte offset where the problem was detected.
        offset: usize,
        /// Description of the problem.
        reason: String,
    },

    /// The bitmap announces a field the dictionary does not define.
    #[error("unknown field {field} at offset {offset}")]
    UnknownField {
        /// Path of the undefined field.
        field: FieldPath,
        /// Byte offset where the field would start.
        offset: usize,
    },

    /// The buffer ended in the middle of a field.
    #[error("truncated message in {field} at offset {offset}: need {needed} bytes, have {available}")]
    TruncatedMessage {
        /// Path of the field being read.
        field: FieldPath,
        /// Byte offset where the read started.
        offset: usize,
        /// Bytes required to complete the read.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },

    /// Bytes remain after the last field announced by the bitmap.
    #[error("{remaining} trailing bytes after last field at offset {offset}")]
    TrailingBytes {
        /// Offset of the first unconsumed byte.
        offset: usize,
        /// Number of unconsumed bytes.
        remaining: usize,
    },

    /// The message type indicator is not four decimal digits.
    #[error("invalid message type indicator: {0}")]
    InvalidMti(String),
}

impl DecodeError {
    /// Returns the path of the field involved, if the error is field-scoped.
    #[must_use]
    pub fn field(&self) -> Option<&FieldPath> {
        match self {
            Self::MalformedField { field, .. }
            | Self::UnknownField { field, .. }
            | Self::TruncatedMessage { field, .. } => Some(field),
            Self::TrailingBytes { .. } | Self::InvalidMti(_) => None,
        }
    }

    /// Returns the byte offset at which decoding failed, if known.
    #[must_use]
    pub const fn offset(&self) -> Option<usize> {
        match self {
            Self::MalformedField { offset, .. }
            | Self::UnknownField { offset, .. }
            | Self::TruncatedMessage { offset, .. }
            | Self::TrailingBytes { offset, .. } => Some(*offset),
            Self::InvalidMti(_) => None,
        }
    }
}

/// Errors that occur while packing an ISO 8583 message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The message carries a field the dictionary does not define.
    #[error("unknown field {field}")]
    UnknownField {
        /// Path of the undefined field.
        field: FieldPath,
    },

    /// Value exceeds the fixed length or the variable-length maximum.
    #[error("value too long for field {field}: {length} exceeds max {max_length}")]
    ValueTooLong {
        /// Path of the field.
        field: FieldPath,
        /// Actual length of the value.
        length: usize,
        /// Maximum allowed length.
        max_length: usize,
    },

    /// Field number cannot be addressed by the bitmap chain.
    #[error("invalid field number {field}: {reason}")]
    InvalidFieldNumber {
        /// The offending field or bit number.
        field: u16,
        /// Why the number is not addressable.
        reason: &'static str,
    },

    /// Value content does not fit the field type.
    #[error("invalid value for field {field}: {reason}")]
    InvalidValue {
        /// Path of the field.
        field: FieldPath,
        /// Description of why the value is invalid.
        reason: String,
    },

    /// A positional composite is missing one of its declared subfields.
    #[error("composite field {field} is missing subfield {subfield}")]
    MissingSubfield {
        /// Path of the composite field.
        field: FieldPath,
        /// Number of the missing subfield.
        subfield: u16,
    },
}
