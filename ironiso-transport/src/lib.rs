/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # IronIso Transport
//!
//! Network transport layer for the IronIso toolkit.
//!
//! This crate provides:
//! - **Codec**: Tokio codec for length-prefixed frames (binary or ASCII prefix)
//! - **Channel**: Message-level send and receive over any async byte stream
//! - **TCP**: Outbound connections with `IsoChannel::connect`

pub mod channel;
pub mod codec;

pub use channel::{ChannelError, ChannelReader, ChannelWriter, IsoChannel};
pub use codec::{FrameCodec, FrameError, PrefixFormat};
