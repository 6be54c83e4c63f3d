/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # IronIso Dictionary
//!
//! ISO 8583 field dictionaries for the IronIso toolkit.
//!
//! This crate provides:
//! - **Schema definitions**: Field type, length class, encodings and subfields
//! - **Dictionary loading**: TOML format with load-time validation
//! - **Embedded dictionaries**: ISO 8583:1987 in binary and ASCII flavours
//! - **Global dictionary**: Optional process-wide dictionary installed once

pub mod embedded;
pub mod error;
pub mod global;
pub mod schema;

pub use error::DictionaryError;
pub use schema::{
    BcdPadding, Encoding, FieldDictionary, FieldSpec, FieldType, LengthClass, PrefixEncoding,
};
