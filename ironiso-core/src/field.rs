/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Field values and field paths for ISO 8583 messages.
//!
//! This module provides:
//! - [`FieldValue`]: a terminal payload or a nested composite of subfields
//! - [`FieldPath`]: dotted address of a field or subfield (e.g. `127.3`)

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

/// Address of a data element or a nested subfield.
///
/// The first segment is the top-level data element number, following
/// segments walk into composite subfields. Displayed as `127.3.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(SmallVec<[u16; 4]>);

impl FieldPath {
    /// Creates a path naming a top-level data element.
    ///
    /// # Arguments
    /// * `field` - The data element number
    #[must_use]
    pub fn new(field: u16) -> Self {
        let mut segments = SmallVec::new();
        segments.push(field);
        Self(segments)
    }

    /// Returns a path one level deeper, naming `subfield` of this field.
    #[must_use]
    pub fn child(&self, subfield: u16) -> Self {
        let mut segments = self.0.clone();
        segments.push(subfield);
        Self(segments)
    }

    /// Returns the top-level data element number.
    #[must_use]
    pub fn root(&self) -> u16 {
        self.0[0]
    }

    /// Returns the innermost field number.
    #[must_use]
    pub fn leaf(&self) -> u16 {
        self.0[self.0.len() - 1]
    }

    /// Returns the number of segments in the path.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Returns all path segments, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[u16] {
        &self.0
    }
}

impl From<u16> for FieldPath {
    fn from(field: u16) -> Self {
        Self::new(field)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// Value of one data element.
///
/// Leaf fields hold their logical payload: ASCII digits or characters for
/// numeric and character types, raw bytes for binary types. Composite
/// fields hold an ordered map of subfield number to value and are packed
/// by recursing into a sub-packager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Leaf payload.
    Terminal(Bytes),
    /// Nested subfields, ordered by subfield number.
    Composite(BTreeMap<u16, FieldValue>),
}

impl FieldValue {
    /// Creates an empty composite value.
    #[must_use]
    pub fn composite() -> Self {
        Self::Composite(BTreeMap::new())
    }

    /// Adds a subfield and returns the value, for chained construction.
    ///
    /// A terminal value is replaced by a composite holding only the new
    /// subfield.
    #[must_use]
    pub fn with_subfield(mut self, subfield: u16, value: impl Into<FieldValue>) -> Self {
        if let Self::Terminal(_) = self {
            self = Self::composite();
        }
        if let Self::Composite(map) = &mut self {
            map.insert(subfield, value.into());
        }
        self
    }

    /// Returns true if this is a composite value.
    #[inline]
    #[must_use]
    pub const fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }

    /// Returns the payload bytes of a terminal value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Terminal(b) => Some(b),
            Self::Composite(_) => None,
        }
    }

    /// Returns the payload of a terminal value as UTF-8 text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Returns a subfield of a composite value.
    #[must_use]
    pub fn subfield(&self, subfield: u16) -> Option<&FieldValue> {
        match self {
            Self::Composite(map) => map.get(&subfield),
            Self::Terminal(_) => None,
        }
    }

    /// Returns a mutable subfield of a composite value.
    pub fn subfield_mut(&mut self, subfield: u16) -> Option<&mut FieldValue> {
        match self {
            Self::Composite(map) => map.get_mut(&subfield),
            Self::Terminal(_) => None,
        }
    }

    /// Returns the subfield map of a composite value.
    #[must_use]
    pub fn subfields(&self) -> Option<&BTreeMap<u16, FieldValue>> {
        match self {
            Self::Composite(map) => Some(map),
            Self::Terminal(_) => None,
        }
    }

    /// Returns the payload length of a terminal value, or the subfield
    /// count of a composite.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Terminal(b) => b.len(),
            Self::Composite(map) => map.len(),
        }
    }

    /// Returns true if the value has no payload or no subfields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Terminal(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Terminal(Bytes::from(value))
    }
}

impl From<&[u8]> for FieldValue {
    fn from(value: &[u8]) -> Self {
        Self::Terminal(Bytes::copy_from_slice(value))
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Terminal(Bytes::from(value))
    }
}

impl From<Bytes> for FieldValue {
    fn from(value: Bytes) -> Self {
        Self::Terminal(value)
    }
}

impl From<BTreeMap<u16, FieldValue>> for FieldValue {
    fn from(value: BTreeMap<u16, FieldValue>) -> Self {
        Self::Composite(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal(b) => match std::str::from_utf8(b) {
                Ok(s) if s.bytes().all(|c| c.is_ascii_graphic() || c == b' ') => {
                    write!(f, "{}", s)
                }
                _ => {
                    for byte in b.iter() {
                        write!(f, "{:02X}", byte)?;
                    }
                    Ok(())
                }
            },
            Self::Composite(map) => {
                f.write_str("[")?;
                for (i, (n, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", n, v)?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_path_display() {
        assert_eq!(FieldPath::new(2).to_string(), "2");
        let nested = FieldPath::new(127).child(3).child(1);
        assert_eq!(nested.to_string(), "127.3.1");
        assert_eq!(nested.root(), 127);
        assert_eq!(nested.leaf(), 1);
        assert_eq!(nested.depth(), 3);
    }

    #[test]
    fn test_terminal_value_access() {
        let value = FieldValue::from("000000001000");
        assert_eq!(value.as_str(), Some("000000001000"));
        assert_eq!(value.len(), 12);
        assert!(!value.is_composite());
        assert!(value.subfield(1).is_none());
    }

    #[test]
    fn test_composite_value_access() {
        let value = FieldValue::composite()
            .with_subfield(2, "ABC")
            .with_subfield(3, vec![0x01, 0x02]);
        assert!(value.is_composite());
        assert_eq!(value.subfield(2).and_then(FieldValue::as_str), Some("ABC"));
        assert_eq!(value.len(), 2);
        assert!(value.as_bytes().is_none());
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::from("0200").to_string(), "0200");
        assert_eq!(FieldValue::from(vec![0xDE, 0xAD]).to_string(), "DEAD");
        let composite = FieldValue::composite().with_subfield(2, "X");
        assert_eq!(composite.to_string(), "[2=X]");
    }
}
