/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Errors raised while building or loading a field dictionary.

use ironiso_core::FieldPath;
use thiserror::Error;

/// Error type for dictionary construction and loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DictionaryError {
    /// The dictionary source is not valid TOML or does not match the schema.
    #[error("dictionary parse error: {0}")]
    Parse(String),

    /// The dictionary file could not be read.
    #[error("dictionary io error: {0}")]
    Io(String),

    /// A field specification is inconsistent.
    #[error("invalid field {field}: {reason}")]
    InvalidField {
        /// Path of the offending field or subfield.
        field: FieldPath,
        /// Description of the problem.
        reason: String,
    },

    /// The same field number is defined twice.
    #[error("duplicate field {field}")]
    DuplicateField {
        /// The repeated field number.
        field: u16,
    },

    /// The process-wide dictionary has already been installed.
    #[error("global dictionary already initialized")]
    AlreadyInitialized,
}
