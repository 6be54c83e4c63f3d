/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Core types for ISO 8583 operations.
//!
//! This module provides fundamental types used throughout the toolkit:
//! - [`Mti`]: Message Type Indicator with ASCII and packed-BCD forms
//! - [`TransmissionTime`]: UTC timestamp rendered in DE 7 / 12 / 13 formats
//! - [`Stan`] and [`StanSequence`]: System Trace Audit Number (DE 11)

use crate::error::DecodeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

/// Largest value a six-digit STAN can hold.
pub const STAN_MAX: u32 = 999_999;

/// Message Type Indicator.
///
/// Four decimal digits: version, message class, message function and
/// message origin. Stored as ASCII digits; [`Mti::to_bcd`] yields the
/// two-byte packed form used by binary dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Mti([u8; 4]);

impl Mti {
    /// Authorization request.
    pub const AUTHORIZATION_REQUEST: Self = Self(*b"0100");
    /// Financial transaction request.
    pub const FINANCIAL_REQUEST: Self = Self(*b"0200");
    /// Reversal advice.
    pub const REVERSAL_ADVICE: Self = Self(*b"0420");
    /// Network management request.
    pub const NETWORK_MANAGEMENT_REQUEST: Self = Self(*b"0800");

    /// Creates an MTI from its four-digit text form.
    ///
    /// # Errors
    /// Returns `DecodeError::InvalidMti` unless `s` is exactly four ASCII digits.
    pub fn new(s: &str) -> Result<Self, DecodeError> {
        Self::from_ascii(s.as_bytes())
    }

    /// Creates an MTI from four ASCII digit bytes.
    ///
    /// # Errors
    /// Returns `DecodeError::InvalidMti` unless `bytes` holds exactly four digits.
    pub fn from_ascii(bytes: &[u8]) -> Result<Self, DecodeError> {
        match <[u8; 4]>::try_from(bytes) {
            Ok(digits) if digits.iter().all(u8::is_ascii_digit) => Ok(Self(digits)),
            _ => Err(DecodeError::InvalidMti(
                String::from_utf8_lossy(bytes).into_owned(),
            )),
        }
    }

    /// Creates an MTI from its two-byte packed-BCD form.
    ///
    /// # Errors
    /// Returns `DecodeError::InvalidMti` if any nibble is not a decimal digit.
    pub fn from_bcd(bytes: [u8; 2]) -> Result<Self, DecodeError> {
        let nibbles = [bytes[0] >> 4, bytes[0] & 0x0F, bytes[1] >> 4, bytes[1] & 0x0F];
        if nibbles.iter().any(|n| *n > 9) {
            return Err(DecodeError::InvalidMti(format!(
                "{:02X}{:02X}",
                bytes[0], bytes[1]
            )));
        }
        Ok(Self(nibbles.map(|n| b'0' + n)))
    }

    /// Returns the two-byte packed-BCD form.
    #[must_use]
    pub const fn to_bcd(&self) -> [u8; 2] {
        let d = self.digits();
        [(d[0] << 4) | d[1], (d[2] << 4) | d[3]]
    }

    /// Returns the four ASCII digit bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Returns the MTI as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("")
    }

    const fn digits(&self) -> [u8; 4] {
        [
            self.0[0] - b'0',
            self.0[1] - b'0',
            self.0[2] - b'0',
            self.0[3] - b'0',
        ]
    }

    /// ISO 8583 version digit (0 = 1987, 1 = 1993, 2 = 2003).
    #[inline]
    #[must_use]
    pub const fn version(&self) -> u8 {
        self.digits()[0]
    }

    /// Message class digit (1 = authorization, 2 = financial, 4 = reversal, ...).
    #[inline]
    #[must_use]
    pub const fn class(&self) -> u8 {
        self.digits()[1]
    }

    /// Message function digit (0 = request, 1 = request response, ...).
    #[inline]
    #[must_use]
    pub const fn function(&self) -> u8 {
        self.digits()[2]
    }

    /// Message origin digit (0 = acquirer, 2 = issuer, ...).
    #[inline]
    #[must_use]
    pub const fn origin(&self) -> u8 {
        self.digits()[3]
    }

    /// Returns true for response functions (odd function digit).
    #[inline]
    #[must_use]
    pub const fn is_response(&self) -> bool {
        self.function() % 2 == 1
    }

    /// Returns true for request, advice, notification and instruction functions.
    #[inline]
    #[must_use]
    pub const fn is_request(&self) -> bool {
        !self.is_response()
    }

    /// Returns the MTI of the matching response, e.g. `0200` → `0210`.
    ///
    /// Returns `None` if this MTI already denotes a response.
    #[must_use]
    pub const fn response(&self) -> Option<Self> {
        if self.is_response() {
            return None;
        }
        let mut bytes = self.0;
        bytes[2] += 1;
        Some(Self(bytes))
    }
}

impl FromStr for Mti {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Mti {
    type Error = DecodeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<Mti> for String {
    fn from(mti: Mti) -> Self {
        mti.as_str().to_string()
    }
}

impl fmt::Display for Mti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UTC instant rendered in the date/time layouts of ISO 8583:1987.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransmissionTime(DateTime<Utc>);

impl TransmissionTime {
    /// Returns the current UTC time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// DE 7 transmission date and time, `MMDDhhmmss`.
    #[must_use]
    pub fn transmission_date_time(&self) -> String {
        self.0.format("%m%d%H%M%S").to_string()
    }

    /// DE 12 local transaction time, `hhmmss`.
    #[must_use]
    pub fn local_time(&self) -> String {
        self.0.format("%H%M%S").to_string()
    }

    /// DE 13 local transaction date, `MMDD`.
    #[must_use]
    pub fn local_date(&self) -> String {
        self.0.format("%m%d").to_string()
    }

    /// Returns the wrapped chrono value.
    #[must_use]
    pub const fn to_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for TransmissionTime {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl Default for TransmissionTime {
    fn default() -> Self {
        Self::now()
    }
}

/// System Trace Audit Number (DE 11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Stan(u32);

impl Stan {
    /// Creates a STAN, returning `None` outside 1..=999999.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        if value >= 1 && value <= STAN_MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Stan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

/// Thread-safe STAN allocator cycling through 1..=999999.
#[derive(Debug)]
pub struct StanSequence {
    next: AtomicU32,
}

impl StanSequence {
    /// Creates a sequence whose first STAN is 1.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Creates a sequence whose first STAN is `start` (clamped into range).
    #[must_use]
    pub fn starting_at(start: u32) -> Self {
        Self {
            next: AtomicU32::new(start.clamp(1, STAN_MAX)),
        }
    }

    /// Allocates the next STAN, wrapping from 999999 back to 1.
    pub fn allocate(&self) -> Stan {
        let value = self
            .next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
                Some(if v >= STAN_MAX { 1 } else { v + 1 })
            })
            .unwrap_or(1);
        Stan(value)
    }
}

impl Default for StanSequence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_mti_parse_and_digits() {
        let mti = Mti::new("0200").unwrap();
        assert_eq!(mti.version(), 0);
        assert_eq!(mti.class(), 2);
        assert_eq!(mti.function(), 0);
        assert_eq!(mti.origin(), 0);
        assert_eq!(mti.as_str(), "0200");
        assert!(mti.is_request());
    }

    #[test]
    fn test_mti_rejects_non_digits() {
        assert!(Mti::new("02A0").is_err());
        assert!(Mti::new("020").is_err());
        assert!(Mti::new("02000").is_err());
    }

    #[test]
    fn test_mti_bcd() {
        let mti = Mti::new("0200").unwrap();
        assert_eq!(mti.to_bcd(), [0x02, 0x00]);
        assert_eq!(Mti::from_bcd([0x08, 0x10]).unwrap().as_str(), "0810");
        assert!(Mti::from_bcd([0x0A, 0x00]).is_err());
    }

    #[test]
    fn test_mti_response() {
        assert_eq!(Mti::FINANCIAL_REQUEST.response().unwrap().as_str(), "0210");
        assert_eq!(Mti::REVERSAL_ADVICE.response().unwrap().as_str(), "0430");
        assert_eq!(Mti::new("0810").unwrap().response(), None);
    }

    #[test]
    fn test_transmission_time_formats() {
        let dt = Utc.with_ymd_and_hms(2025, 10, 13, 12, 30, 39).unwrap();
        let t = TransmissionTime::from(dt);
        assert_eq!(t.transmission_date_time(), "1013123039");
        assert_eq!(t.local_time(), "123039");
        assert_eq!(t.local_date(), "1013");
    }

    #[test]
    fn test_stan_sequence_wraps() {
        let seq = StanSequence::starting_at(STAN_MAX);
        assert_eq!(seq.allocate().value(), STAN_MAX);
        assert_eq!(seq.allocate().value(), 1);
        assert_eq!(seq.allocate().to_string(), "000002");
    }

    #[test]
    fn test_stan_range() {
        assert!(Stan::new(0).is_none());
        assert!(Stan::new(1_000_000).is_none());
        assert_eq!(Stan::new(42).unwrap().to_string(), "000042");
    }
}
