/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Correlation keys.
//!
//! A request and its response must produce the same key. The default
//! [`FieldKey`] projects fields that the responder echoes back unchanged,
//! such as the terminal id and the STAN.

use ironiso_core::IsoMessage;
use std::fmt;

/// Key pairing a response with its outstanding request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    /// Creates a key from its text form.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes correlation keys.
pub trait KeyExtractor: Send + Sync + 'static {
    /// Returns the key of a request or response.
    fn key(&self, msg: &IsoMessage) -> CorrelationKey;
}

impl<F> KeyExtractor for F
where
    F: Fn(&IsoMessage) -> CorrelationKey + Send + Sync + 'static,
{
    fn key(&self, msg: &IsoMessage) -> CorrelationKey {
        self(msg)
    }
}

/// Key built from a fixed list of fields, rendered as `41=TERM0001|11=000001`.
///
/// A missing field contributes an empty value, so two messages that both
/// lack it still match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldKey {
    fields: Vec<u16>,
}

impl FieldKey {
    /// Creates a key over `fields`, in key order.
    #[must_use]
    pub fn new(fields: impl Into<Vec<u16>>) -> Self {
        Self {
            fields: fields.into(),
        }
    }

    /// Returns the key fields.
    #[must_use]
    pub fn fields(&self) -> &[u16] {
        &self.fields
    }
}

impl KeyExtractor for FieldKey {
    fn key(&self, msg: &IsoMessage) -> CorrelationKey {
        let mut key = String::new();
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                key.push('|');
            }
            key.push_str(&field.to_string());
            key.push('=');
            if let Some(value) = msg.get(*field) {
                key.push_str(&value.to_string());
            }
        }
        CorrelationKey(key)
    }
}
