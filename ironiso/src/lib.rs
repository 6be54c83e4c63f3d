/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # IronIso
//!
//! ISO 8583 financial messaging for Rust.
//!
//! IronIso packs and unpacks ISO 8583 messages against a data-driven field
//! dictionary, frames them over length-prefixed byte streams and correlates
//! concurrent requests with their responses over a single connection.
//!
//! ## Features
//!
//! - **Data-driven**: Field layouts come from TOML dictionaries, not code
//! - **Dialect-aware**: ASCII or BCD MTIs, binary or hex bitmaps, BCD amounts
//! - **Nested fields**: Composite fields with their own bitmaps or positional layout
//! - **Async support**: Channels and multiplexing built on Tokio
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ironiso::prelude::*;
//! use std::sync::Arc;
//!
//! let dictionary = Arc::new(iso87_binary()?);
//! let packager = Arc::new(Packager::new(dictionary, PackagerConfig::default()));
//! let channel = IsoChannel::connect("127.0.0.1:8583", packager, FrameCodec::new()).await?;
//! let mux = Mux::new(channel, MuxConfig::default(), Arc::new(NoOpHandler));
//!
//! let request = IsoMessage::new(Mti::FINANCIAL_REQUEST)
//!     .with(2, "4111111111111111")
//!     .with(4, "000000010000")
//!     .with(11, "000001")
//!     .with(41, "TERM0001");
//! let response = mux.request_default(&request).await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`]: Messages, field values, MTIs and error definitions
//! - [`dictionary`]: Field dictionaries and their TOML format
//! - [`packager`]: Wire encoding and decoding
//! - [`transport`]: Framing and message channels
//! - [`mux`]: Request/response multiplexing

pub mod core {
    //! Messages, field values, MTIs and error definitions.
    pub use ironiso_core::*;
}

pub mod dictionary {
    //! Field dictionaries and their TOML format.
    pub use ironiso_dictionary::*;
}

pub mod packager {
    //! Wire encoding and decoding.
    pub use ironiso_packager::*;
}

pub mod transport {
    //! Framing and message channels.
    pub use ironiso_transport::*;
}

pub mod mux {
    //! Request/response multiplexing.
    pub use ironiso_mux::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types
    pub use ironiso_core::{
        DecodeError, EncodeError, FieldPath, FieldValue, IsoMessage, Mti, Stan, StanSequence,
        TransmissionTime,
    };

    // Dictionary
    pub use ironiso_dictionary::embedded::{iso87_ascii, iso87_binary};
    pub use ironiso_dictionary::{DictionaryError, FieldDictionary, FieldSpec, FieldType};

    // Packager
    pub use ironiso_packager::{BitmapEncoding, MtiEncoding, Packager, PackagerConfig};

    // Transport
    pub use ironiso_transport::{ChannelError, FrameCodec, FrameError, IsoChannel, PrefixFormat};

    // Mux
    pub use ironiso_mux::{Mux, MuxConfig, MuxError, NoOpHandler, UnsolicitedHandler};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::sync::Arc;

    #[test]
    fn test_prelude_imports() {
        let msg = IsoMessage::new(Mti::FINANCIAL_REQUEST).with(11, "000001");
        assert_eq!(msg.get_str(11), Some("000001"));
        assert!(Mti::FINANCIAL_REQUEST.response().is_some());
        let _codec = FrameCodec::new();
    }

    #[test]
    fn test_pack_through_facade() {
        let dictionary = Arc::new(iso87_binary().unwrap());
        let packager = Packager::new(dictionary, PackagerConfig::default());
        let msg = IsoMessage::new(Mti::FINANCIAL_REQUEST)
            .with(2, "4111111111111111")
            .with(4, "000000010000")
            .with(7, "0101123045");
        let wire = packager.pack(&msg).unwrap();
        assert_eq!(wire.len(), 32);
        assert_eq!(packager.unpack(&wire).unwrap(), msg);
    }
}
