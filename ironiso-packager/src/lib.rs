/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # IronIso Packager
//!
//! Dictionary-driven ISO 8583 message packing and unpacking.
//!
//! This crate provides:
//! - **Packager**: Compiles a field dictionary once, packs and unpacks messages
//! - **Bitmaps**: Primary, secondary and tertiary chains, binary or hex
//! - **Field codecs**: Fixed, LLVAR and LLLVAR fields in ASCII, BCD or binary
//! - **Composites**: Positional or bitmap-driven subfields, nested recursively
//!
//! ## Example
//!
//! ```
//! use ironiso_core::{IsoMessage, Mti};
//! use ironiso_dictionary::embedded::iso87_binary;
//! use ironiso_packager::{Packager, PackagerConfig};
//! use std::sync::Arc;
//!
//! let packager = Packager::new(Arc::new(iso87_binary().unwrap()), PackagerConfig::default());
//! let msg = IsoMessage::new(Mti::FINANCIAL_REQUEST)
//!     .with(2, "4539681234567890")
//!     .with(4, "000000001000");
//! let wire = packager.pack(&msg).unwrap();
//! assert_eq!(packager.unpack(&wire).unwrap(), msg);
//! ```

pub mod bcd;
pub mod bitmap;
pub mod config;
pub mod field;
pub mod packager;
pub mod reader;

pub use bitmap::{BitmapChain, BitmapEncoding, Presence, decode_presence, encode_presence};
pub use config::{MtiEncoding, PackagerConfig};
pub use field::{FieldCodec, LengthPrefix, Payload};
pub use packager::Packager;
pub use reader::ByteReader;
