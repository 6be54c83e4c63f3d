/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Multiplexer error types.

use ironiso_transport::ChannelError;
use thiserror::Error;

/// Errors returned to multiplexer callers.
#[derive(Debug, Error)]
pub enum MuxError {
    /// No matching response arrived in time.
    #[error("request {key} timed out after {timeout_ms} ms")]
    RequestTimeout {
        /// Correlation key of the request.
        key: String,
        /// Timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// A request with the same correlation key is already outstanding.
    #[error("duplicate correlation key {key}")]
    DuplicateKey {
        /// The colliding key.
        key: String,
    },

    /// The connection closed before a response arrived, or was already closed.
    #[error("connection lost: {}", .cause.as_deref().unwrap_or("mux closed"))]
    ConnectionLost {
        /// Why the connection ended, when known.
        cause: Option<String>,
    },

    /// The request could not be sent.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
}

impl MuxError {
    pub(crate) fn connection_lost(cause: Option<&str>) -> Self {
        Self::ConnectionLost {
            cause: cause.map(str::to_string),
        }
    }
}
