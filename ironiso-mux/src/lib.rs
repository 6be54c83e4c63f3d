/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # IronIso Mux
//!
//! Concurrent request/response correlation over a single ISO 8583 channel.
//!
//! This crate provides:
//! - **Mux**: Sends requests and matches responses by correlation key
//! - **Keys**: Field-based and custom correlation key extraction
//! - **Handler**: Callback for unmatched inbound traffic
//! - **Metrics**: Lock-free traffic counters
//!
//! ## Example
//!
//! ```no_run
//! use ironiso_core::{IsoMessage, Mti};
//! use ironiso_mux::{Mux, MuxConfig, NoOpHandler};
//! use ironiso_transport::IsoChannel;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! async fn authorize(channel: IsoChannel) -> Result<(), Box<dyn std::error::Error>> {
//!     let mux = Mux::new(channel, MuxConfig::default(), Arc::new(NoOpHandler));
//!     let request = IsoMessage::new(Mti::AUTHORIZATION_REQUEST)
//!         .with(11, "000001")
//!         .with(41, "TERM0001");
//!     let response = mux.request(&request, Duration::from_secs(10)).await?;
//!     println!("response code {:?}", response.get_str(39));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod key;
pub mod metrics;
pub mod mux;

pub use config::{DEFAULT_KEY_FIELDS, MuxConfig};
pub use error::MuxError;
pub use handler::{NoOpHandler, UnsolicitedHandler};
pub use key::{CorrelationKey, FieldKey, KeyExtractor};
pub use metrics::{MetricsSnapshot, MuxMetrics};
pub use mux::Mux;
