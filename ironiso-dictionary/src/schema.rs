/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Schema definitions for ISO 8583 field dictionaries.
//!
//! This module defines the structures that describe how each data element
//! is laid out on the wire:
//! - [`FieldSpec`]: number, type, length class, encodings, subfields
//! - [`FieldType`]: ISO content class (`n`, `a`, `an`, `ans`, `b`, `z`)
//! - [`LengthClass`]: fixed, LLVAR or LLLVAR
//! - [`Encoding`], [`PrefixEncoding`], [`BcdPadding`]: byte-level choices
//! - [`FieldDictionary`]: validated, ordered set of field specifications

use crate::error::DictionaryError;
use ironiso_core::FieldPath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Largest value an LLVAR prefix can carry.
pub const LLVAR_MAX: usize = 99;

/// Largest value an LLLVAR prefix can carry.
pub const LLLVAR_MAX: usize = 999;

/// Highest field number addressable with a tertiary bitmap.
pub const MAX_FIELD_NUMBER: u16 = 192;

/// Field numbers occupied by the "next bitmap follows" bits.
pub const BITMAP_INDICATORS: [u16; 3] = [1, 65, 129];

/// ISO 8583 content class of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Decimal digits only (`n`).
    #[serde(alias = "n")]
    Numeric,
    /// Alphabetic characters (`a`).
    #[serde(alias = "a")]
    Alpha,
    /// Alphanumeric characters (`an`).
    #[serde(alias = "an")]
    Alphanumeric,
    /// Alphanumeric and special characters (`ans`).
    #[serde(alias = "ans")]
    AlphanumericSpecial,
    /// Raw binary data (`b`).
    #[serde(alias = "b")]
    Binary,
    /// Magnetic stripe track data (`z`): digits plus the `=` separator.
    #[serde(alias = "z")]
    Track,
}

impl FieldType {
    /// Returns true if values of this type may be packed as BCD nibbles.
    #[must_use]
    pub const fn is_bcd_capable(&self) -> bool {
        matches!(self, Self::Numeric | Self::Track)
    }
}

/// Length class of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthClass {
    /// Exactly this many digits, characters or bytes.
    Fixed(usize),
    /// Up to this many units, preceded by a two-digit length.
    Llvar(usize),
    /// Up to this many units, preceded by a three-digit length.
    Lllvar(usize),
}

impl LengthClass {
    /// Returns the fixed length or the variable maximum.
    #[must_use]
    pub const fn max_length(&self) -> usize {
        match self {
            Self::Fixed(n) | Self::Llvar(n) | Self::Lllvar(n) => *n,
        }
    }

    /// Returns the number of decimal digits in the length prefix.
    #[must_use]
    pub const fn prefix_digits(&self) -> usize {
        match self {
            Self::Fixed(_) => 0,
            Self::Llvar(_) => 2,
            Self::Lllvar(_) => 3,
        }
    }

    /// Returns true for LLVAR and LLLVAR.
    #[must_use]
    pub const fn is_variable(&self) -> bool {
        !matches!(self, Self::Fixed(_))
    }
}

/// Payload encoding of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// One ASCII byte per digit or character.
    #[default]
    Ascii,
    /// Packed BCD, two digits per byte.
    Bcd,
    /// Raw bytes.
    Binary,
}

/// Encoding of an LLVAR/LLLVAR length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefixEncoding {
    /// ASCII digits: 2 bytes for LLVAR, 3 for LLLVAR.
    #[default]
    Ascii,
    /// Packed BCD: 1 byte for LLVAR, 2 for LLLVAR.
    Bcd,
    /// Big-endian integer: 1 byte for LLVAR, 2 for LLLVAR.
    Binary,
}

/// Where the filler nibble goes when an odd digit count is packed as BCD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BcdPadding {
    /// Filler in the high nibble of the first byte.
    Left,
    /// Filler in the low nibble of the last byte.
    #[default]
    Right,
}

/// Wire layout of one data element or subfield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field or subfield number.
    pub number: u16,
    /// Human readable name.
    #[serde(default)]
    pub name: String,
    /// Content class.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Length class and fixed length or maximum.
    pub length: LengthClass,
    /// Payload encoding.
    #[serde(default)]
    pub encoding: Encoding,
    /// Length prefix encoding, used by LLVAR and LLLVAR fields.
    #[serde(default)]
    pub prefix: PrefixEncoding,
    /// Filler position for odd-length BCD values.
    #[serde(default)]
    pub padding: BcdPadding,
    /// Whether a composite carries its own bitmap ahead of its subfields.
    #[serde(default)]
    pub subfield_bitmap: bool,
    /// Ordered subfields; non-empty makes this a composite field.
    #[serde(default, rename = "subfield", skip_serializing_if = "Vec::is_empty")]
    pub subfields: Vec<FieldSpec>,
}

impl FieldSpec {
    /// Creates a field specification with ASCII encodings.
    ///
    /// # Arguments
    /// * `number` - The field or subfield number
    /// * `field_type` - The content class
    /// * `length` - The length class
    #[must_use]
    pub fn new(number: u16, field_type: FieldType, length: LengthClass) -> Self {
        Self {
            number,
            name: String::new(),
            field_type,
            length,
            encoding: if field_type == FieldType::Binary {
                Encoding::Binary
            } else {
                Encoding::Ascii
            },
            prefix: PrefixEncoding::Ascii,
            padding: BcdPadding::Right,
            subfield_bitmap: false,
            subfields: Vec::new(),
        }
    }

    /// Creates a fixed-length field specification.
    #[must_use]
    pub fn fixed(number: u16, field_type: FieldType, length: usize) -> Self {
        Self::new(number, field_type, LengthClass::Fixed(length))
    }

    /// Creates an LLVAR field specification.
    #[must_use]
    pub fn llvar(number: u16, field_type: FieldType, max: usize) -> Self {
        Self::new(number, field_type, LengthClass::Llvar(max))
    }

    /// Creates an LLLVAR field specification.
    #[must_use]
    pub fn lllvar(number: u16, field_type: FieldType, max: usize) -> Self {
        Self::new(number, field_type, LengthClass::Lllvar(max))
    }

    /// Sets the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the payload encoding.
    #[must_use]
    pub const fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Sets the length prefix encoding.
    #[must_use]
    pub const fn with_prefix(mut self, prefix: PrefixEncoding) -> Self {
        self.prefix = prefix;
        self
    }

    /// Sets the filler position for odd-length BCD values.
    #[must_use]
    pub const fn with_padding(mut self, padding: BcdPadding) -> Self {
        self.padding = padding;
        self
    }

    /// Turns the field into a composite of `subfields`.
    ///
    /// # Arguments
    /// * `subfields` - The subfield specifications, in wire order
    /// * `bitmap` - Whether the composite carries its own bitmap
    #[must_use]
    pub fn with_subfields(mut self, subfields: Vec<FieldSpec>, bitmap: bool) -> Self {
        self.subfields = subfields;
        self.subfield_bitmap = bitmap;
        self
    }

    /// Returns true if the field is a composite of subfields.
    #[inline]
    #[must_use]
    pub fn is_composite(&self) -> bool {
        !self.subfields.is_empty()
    }

    /// Checks the specification, addressing errors at `path`.
    ///
    /// # Errors
    /// Returns `DictionaryError::InvalidField` describing the first problem.
    pub fn validate(&self, path: &FieldPath) -> Result<(), DictionaryError> {
        let invalid = |reason: String| DictionaryError::InvalidField {
            field: path.clone(),
            reason,
        };

        match self.length {
            LengthClass::Fixed(0) => return Err(invalid("fixed length must be positive".into())),
            LengthClass::Llvar(max) if max == 0 || max > LLVAR_MAX => {
                return Err(invalid(format!("LLVAR maximum {} outside 1..={}", max, LLVAR_MAX)));
            }
            LengthClass::Lllvar(max) if max == 0 || max > LLLVAR_MAX => {
                return Err(invalid(format!(
                    "LLLVAR maximum {} outside 1..={}",
                    max, LLLVAR_MAX
                )));
            }
            _ => {}
        }

        if self.is_composite() {
            let lowest = if self.subfield_bitmap { 2 } else { 1 };
            let mut seen = std::collections::BTreeSet::new();
            for sub in &self.subfields {
                let sub_path = path.child(sub.number);
                if sub.number < lowest || sub.number > 64 {
                    return Err(DictionaryError::InvalidField {
                        field: sub_path,
                        reason: format!("subfield number outside {}..=64", lowest),
                    });
                }
                if !seen.insert(sub.number) {
                    return Err(DictionaryError::InvalidField {
                        field: sub_path,
                        reason: "duplicate subfield".into(),
                    });
                }
                sub.validate(&sub_path)?;
            }
            return Ok(());
        }

        match self.encoding {
            Encoding::Bcd if !self.field_type.is_bcd_capable() => Err(invalid(format!(
                "{:?} fields cannot be BCD encoded",
                self.field_type
            ))),
            Encoding::Binary if self.field_type != FieldType::Binary => Err(invalid(
                "binary encoding requires binary type".into(),
            )),
            Encoding::Ascii | Encoding::Bcd if self.field_type == FieldType::Binary => {
                Err(invalid("binary type requires binary encoding".into()))
            }
            _ => Ok(()),
        }
    }
}

/// On-disk form of a dictionary.
#[derive(Debug, Deserialize)]
struct DictionaryFile {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "field")]
    fields: Vec<FieldSpec>,
}

/// Validated set of field specifications keyed by field number.
///
/// Dictionaries are assembled once, then shared read-only (typically
/// behind an `Arc`) by every packager that uses them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDictionary {
    /// Dictionary name.
    name: String,
    /// Optional description.
    description: Option<String>,
    /// Field specifications indexed by number.
    fields: BTreeMap<u16, FieldSpec>,
}

impl FieldDictionary {
    /// Creates a new empty dictionary.
    ///
    /// # Arguments
    /// * `name` - The dictionary name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: BTreeMap::new(),
        }
    }

    /// Adds a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a field after validating it.
    ///
    /// # Errors
    /// Returns `DictionaryError::InvalidField` for a malformed spec or a
    /// number a bitmap cannot address, and `DictionaryError::DuplicateField`
    /// if the number is already defined.
    pub fn add_field(&mut self, spec: FieldSpec) -> Result<(), DictionaryError> {
        let path = FieldPath::new(spec.number);
        if spec.number < 2 || spec.number > MAX_FIELD_NUMBER {
            return Err(DictionaryError::InvalidField {
                field: path,
                reason: format!("field number outside 2..={}", MAX_FIELD_NUMBER),
            });
        }
        if BITMAP_INDICATORS.contains(&spec.number) {
            return Err(DictionaryError::InvalidField {
                field: path,
                reason: "position is reserved for a bitmap indicator".into(),
            });
        }
        if self.fields.contains_key(&spec.number) {
            return Err(DictionaryError::DuplicateField { field: spec.number });
        }
        spec.validate(&path)?;
        self.fields.insert(spec.number, spec);
        Ok(())
    }

    /// Adds a field and returns the dictionary, for chained construction.
    ///
    /// # Errors
    /// Same as [`FieldDictionary::add_field`].
    pub fn with_field(mut self, spec: FieldSpec) -> Result<Self, DictionaryError> {
        self.add_field(spec)?;
        Ok(self)
    }

    /// Parses and validates a TOML dictionary.
    ///
    /// # Errors
    /// Returns `DictionaryError::Parse` for malformed TOML and the
    /// validation errors of [`FieldDictionary::add_field`].
    pub fn from_toml_str(source: &str) -> Result<Self, DictionaryError> {
        let file: DictionaryFile =
            toml::from_str(source).map_err(|e| DictionaryError::Parse(e.to_string()))?;
        let mut dict = Self::new(file.name);
        dict.description = file.description;
        for spec in file.fields {
            dict.add_field(spec)?;
        }
        Ok(dict)
    }

    /// Reads, parses and validates a TOML dictionary file.
    ///
    /// # Errors
    /// Returns `DictionaryError::Io` if the file cannot be read, otherwise
    /// the errors of [`FieldDictionary::from_toml_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| DictionaryError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }

    /// Returns the dictionary name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Gets a field specification by number.
    #[must_use]
    pub fn get(&self, number: u16) -> Option<&FieldSpec> {
        self.fields.get(&number)
    }

    /// Returns true if the field is defined.
    #[must_use]
    pub fn contains(&self, number: u16) -> bool {
        self.fields.contains_key(&number)
    }

    /// Returns an iterator over all field specifications in ascending order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.values()
    }

    /// Returns the number of defined fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no field is defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the highest defined field number.
    #[must_use]
    pub fn max_field(&self) -> Option<u16> {
        self.fields.keys().next_back().copied()
    }
}
