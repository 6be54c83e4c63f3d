/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! ISO 8583 message model.
//!
//! This module provides:
//! - [`IsoMessage`]: owned message with an MTI and an ordered field map
//! - [`Protected`]: display adapter that masks cardholder data for logging
//!
//! The bitmap is never stored on the message. It is derived from the set
//! of present fields when packing, and rebuilt from the wire when
//! unpacking.

use crate::field::FieldValue;
use crate::types::Mti;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Primary account number.
pub const FIELD_PAN: u16 = 2;

/// Fields whose content is masked by [`IsoMessage::protected`], except the
/// PAN which keeps its first six and last four digits.
const WIPED_FIELDS: [u16; 5] = [14, 35, 45, 52, 55];

/// Owned ISO 8583 message.
///
/// Fields are kept in ascending field-number order so iteration matches
/// wire order. Instances are plain data: clone them to share, move them
/// between tasks to hand off ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsoMessage {
    /// Message type indicator.
    mti: Mti,
    /// Present data elements keyed by field number.
    fields: BTreeMap<u16, FieldValue>,
}

impl IsoMessage {
    /// Creates an empty message with the given MTI.
    ///
    /// # Arguments
    /// * `mti` - The message type indicator
    #[must_use]
    pub fn new(mti: Mti) -> Self {
        Self {
            mti,
            fields: BTreeMap::new(),
        }
    }

    /// Returns the message type indicator.
    #[inline]
    #[must_use]
    pub const fn mti(&self) -> Mti {
        self.mti
    }

    /// Replaces the message type indicator.
    pub fn set_mti(&mut self, mti: Mti) {
        self.mti = mti;
    }

    /// Turns a request into its response by bumping the MTI function digit.
    ///
    /// Leaves the MTI untouched when it already denotes a response and
    /// returns whether it changed.
    pub fn set_response_mti(&mut self) -> bool {
        match self.mti.response() {
            Some(response) => {
                self.mti = response;
                true
            }
            None => false,
        }
    }

    /// Sets a field, replacing any previous value.
    ///
    /// Field numbers are validated against the bitmap chain and the
    /// dictionary when the message is packed, not here.
    pub fn set(&mut self, field: u16, value: impl Into<FieldValue>) -> &mut Self {
        self.fields.insert(field, value.into());
        self
    }

    /// Sets a field and returns the message, for chained construction.
    #[must_use]
    pub fn with(mut self, field: u16, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    /// Removes a field, returning its previous value.
    pub fn unset(&mut self, field: u16) -> Option<FieldValue> {
        self.fields.remove(&field)
    }

    /// Gets a field value.
    #[must_use]
    pub fn get(&self, field: u16) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    /// Gets a mutable field value.
    pub fn get_mut(&mut self, field: u16) -> Option<&mut FieldValue> {
        self.fields.get_mut(&field)
    }

    /// Gets a terminal field value as text.
    #[must_use]
    pub fn get_str(&self, field: u16) -> Option<&str> {
        self.fields.get(&field).and_then(FieldValue::as_str)
    }

    /// Returns true if the field is present.
    #[must_use]
    pub fn has_field(&self, field: u16) -> bool {
        self.fields.contains_key(&field)
    }

    /// Returns the present field numbers in ascending order.
    pub fn field_numbers(&self) -> impl Iterator<Item = u16> + '_ {
        self.fields.keys().copied()
    }

    /// Returns an iterator over present fields in ascending order.
    pub fn fields(&self) -> impl Iterator<Item = (u16, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (*n, v))
    }

    /// Returns the highest present field number.
    #[must_use]
    pub fn max_field(&self) -> Option<u16> {
        self.fields.keys().next_back().copied()
    }

    /// Returns the number of present fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no field is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns a display adapter that masks cardholder data.
    #[must_use]
    pub fn protected(&self) -> Protected<'_> {
        Protected(self)
    }
}

/// Display adapter produced by [`IsoMessage::protected`].
///
/// Renders `MTI [n=value ...]` with the PAN truncated to its first six and
/// last four digits and track, PIN and chip data replaced by asterisks.
#[derive(Debug, Clone, Copy)]
pub struct Protected<'a>(&'a IsoMessage);

impl fmt::Display for Protected<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.0.mti)?;
        for (i, (field, value)) in self.0.fields().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}=", field)?;
            match field {
                FIELD_PAN => match value.as_str() {
                    Some(pan) if pan.len() > 10 => {
                        match (pan.get(..6), pan.get(pan.len() - 4..)) {
                            (Some(head), Some(tail)) => {
                                let hidden = "*".repeat(pan.len() - 10);
                                write!(f, "{head}{hidden}{tail}")?;
                            }
                            _ => f.write_str("****")?,
                        }
                    }
                    _ => f.write_str("****")?,
                },
                n if WIPED_FIELDS.contains(&n) => f.write_str("****")?,
                _ => write!(f, "{}", value)?,
            }
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IsoMessage {
        IsoMessage::new(Mti::FINANCIAL_REQUEST)
            .with(2, "4539681234567890")
            .with(4, "000000001000")
            .with(11, "123456")
    }

    #[test]
    fn test_set_get_unset() {
        let mut msg = sample();
        assert_eq!(msg.get_str(4), Some("000000001000"));
        assert!(msg.has_field(11));
        assert_eq!(msg.len(), 3);

        msg.set(41, "TERM0001").set(42, "MERCHANT0000001");
        assert_eq!(msg.max_field(), Some(42));

        assert!(msg.unset(11).is_some());
        assert!(!msg.has_field(11));
        assert!(msg.unset(11).is_none());
    }

    #[test]
    fn test_fields_ascending() {
        let msg = IsoMessage::new(Mti::FINANCIAL_REQUEST)
            .with(41, "T")
            .with(3, "000000")
            .with(11, "000001");
        let numbers: Vec<u16> = msg.field_numbers().collect();
        assert_eq!(numbers, vec![3, 11, 41]);
    }

    #[test]
    fn test_set_response_mti() {
        let mut msg = sample();
        assert!(msg.set_response_mti());
        assert_eq!(msg.mti().as_str(), "0210");
        assert!(!msg.set_response_mti());
        assert_eq!(msg.mti().as_str(), "0210");
    }

    #[test]
    fn test_protected_masks_pan() {
        let msg = sample().with(35, "4539681234567890=2512101");
        let dump = msg.protected().to_string();
        assert_eq!(
            dump,
            "0200 [2=453968******7890 4=000000001000 11=123456 35=****]"
        );
        assert!(!dump.contains("4539681234567890"));
    }

    #[test]
    fn test_protected_non_ascii_pan() {
        let msg = IsoMessage::new(Mti::FINANCIAL_REQUEST).with(2, "12345é7890123");
        assert_eq!(msg.protected().to_string(), "0200 [2=****]");

        let msg = IsoMessage::new(Mti::FINANCIAL_REQUEST).with(2, "123456é89012");
        assert_eq!(msg.protected().to_string(), "0200 [2=123456***9012]");
    }
}
