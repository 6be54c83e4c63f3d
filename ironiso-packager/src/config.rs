/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Packager configuration.
//!
//! Message-level layout choices that are not properties of any single
//! field: how the MTI and bitmaps are written, how deep the bitmap chain
//! may go and whether trailing bytes are tolerated.

use crate::bitmap::{BitmapEncoding, MAX_LEVELS};
use serde::{Deserialize, Serialize};

/// Wire form of the message type indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MtiEncoding {
    /// Four ASCII digits.
    #[default]
    Ascii,
    /// Two bytes of packed BCD.
    Bcd,
}

impl MtiEncoding {
    /// Bytes the MTI occupies on the wire.
    #[inline]
    #[must_use]
    pub const fn wire_len(&self) -> usize {
        match self {
            Self::Ascii => 4,
            Self::Bcd => 2,
        }
    }
}

/// Configuration for a [`Packager`](crate::Packager).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagerConfig {
    /// MTI wire form.
    pub mti_encoding: MtiEncoding,
    /// Bitmap wire form, also used for composite subfield bitmaps.
    pub bitmap_encoding: BitmapEncoding,
    /// Bitmaps always written, even when the upper levels are empty.
    pub min_bitmaps: u8,
    /// Deepest bitmap chain accepted or produced.
    pub max_bitmaps: u8,
    /// Whether unpacking ignores bytes after the last field.
    pub allow_trailing_bytes: bool,
}

impl PackagerConfig {
    /// Creates the default configuration: ASCII MTI, binary bitmaps, one to
    /// two bitmap levels, strict about trailing bytes.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mti_encoding: MtiEncoding::Ascii,
            bitmap_encoding: BitmapEncoding::Binary,
            min_bitmaps: 1,
            max_bitmaps: 2,
            allow_trailing_bytes: false,
        }
    }

    /// Sets the MTI wire form.
    #[must_use]
    pub const fn with_mti_encoding(mut self, encoding: MtiEncoding) -> Self {
        self.mti_encoding = encoding;
        self
    }

    /// Sets the bitmap wire form.
    #[must_use]
    pub const fn with_bitmap_encoding(mut self, encoding: BitmapEncoding) -> Self {
        self.bitmap_encoding = encoding;
        self
    }

    /// Sets the number of bitmaps always written (clamped to 1..=3).
    #[must_use]
    pub fn with_min_bitmaps(mut self, levels: u8) -> Self {
        self.min_bitmaps = levels.clamp(1, MAX_LEVELS);
        self.max_bitmaps = self.max_bitmaps.max(self.min_bitmaps);
        self
    }

    /// Sets the deepest bitmap chain (clamped to 1..=3).
    #[must_use]
    pub fn with_max_bitmaps(mut self, levels: u8) -> Self {
        self.max_bitmaps = levels.clamp(1, MAX_LEVELS);
        self.min_bitmaps = self.min_bitmaps.min(self.max_bitmaps);
        self
    }

    /// Sets whether trailing bytes are tolerated when unpacking.
    #[must_use]
    pub const fn with_allow_trailing_bytes(mut self, allow: bool) -> Self {
        self.allow_trailing_bytes = allow;
        self
    }
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self::new()
    }
}
