/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # IronIso Core
//!
//! Core message model and error definitions for the IronIso ISO 8583 toolkit.
//!
//! This crate provides the fundamental building blocks used across all IronIso crates:
//! - **Error types**: Packing and unpacking errors with `thiserror`
//! - **Field types**: `FieldValue` (terminal or composite) and `FieldPath`
//! - **Message types**: `IsoMessage` and its masked `Protected` view
//! - **Core types**: `Mti`, `Stan`, `TransmissionTime`

pub mod error;
pub mod field;
pub mod message;
pub mod types;

pub use error::{DecodeError, EncodeError, IsoError, Result};
pub use field::{FieldPath, FieldValue};
pub use message::{IsoMessage, Protected};
pub use types::{Mti, Stan, StanSequence, TransmissionTime};
