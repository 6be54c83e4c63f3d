/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Dictionaries compiled into the crate.
//!
//! - [`iso87_binary`]: packed-BCD numerics and BCD length prefixes, the
//!   layout of most host-to-host links
//! - [`iso87_ascii`]: every numeric and prefix as ASCII digits

use crate::error::DictionaryError;
use crate::schema::FieldDictionary;

const ISO87_BINARY: &str = include_str!("../dictionaries/iso87_binary.toml");
const ISO87_ASCII: &str = include_str!("../dictionaries/iso87_ascii.toml");

/// ISO 8583:1987 with BCD numerics and BCD length prefixes.
///
/// # Errors
/// Returns the validation error of the embedded source, which the tests of
/// this module rule out.
pub fn iso87_binary() -> Result<FieldDictionary, DictionaryError> {
    FieldDictionary::from_toml_str(ISO87_BINARY)
}

/// ISO 8583:1987 with ASCII numerics and ASCII length prefixes.
///
/// # Errors
/// Returns the validation error of the embedded source, which the tests of
/// this module rule out.
pub fn iso87_ascii() -> Result<FieldDictionary, DictionaryError> {
    FieldDictionary::from_toml_str(ISO87_ASCII)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BcdPadding, Encoding, LengthClass, PrefixEncoding};

    #[test]
    fn test_iso87_binary_loads() {
        let dict = iso87_binary().unwrap();
        assert_eq!(dict.name(), "iso87-binary");
        assert_eq!(dict.max_field(), Some(128));

        let pan = dict.get(2).unwrap();
        assert_eq!(pan.length, LengthClass::Llvar(19));
        assert_eq!(pan.encoding, Encoding::Bcd);
        assert_eq!(pan.prefix, PrefixEncoding::Bcd);

        assert_eq!(dict.get(49).unwrap().padding, BcdPadding::Left);
        assert_eq!(dict.get(52).unwrap().encoding, Encoding::Binary);
    }

    #[test]
    fn test_iso87_binary_composites() {
        let dict = iso87_binary().unwrap();

        let location = dict.get(43).unwrap();
        assert!(location.is_composite());
        assert!(!location.subfield_bitmap);
        let total: usize = location
            .subfields
            .iter()
            .map(|s| s.length.max_length())
            .sum();
        assert_eq!(total, location.length.max_length());

        let extended = dict.get(127).unwrap();
        assert!(extended.subfield_bitmap);
        assert_eq!(extended.subfields.len(), 5);
    }

    #[test]
    fn test_iso87_ascii_loads() {
        let dict = iso87_ascii().unwrap();
        assert_eq!(dict.name(), "iso87-ascii");
        assert_eq!(dict.len(), iso87_binary().unwrap().len());
        assert!(
            dict.fields()
                .all(|f| f.encoding != Encoding::Bcd && f.prefix == PrefixEncoding::Ascii)
        );
    }
}
