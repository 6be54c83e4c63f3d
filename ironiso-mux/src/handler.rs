/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Callback for inbound messages that match no outstanding request.
//!
//! Unmatched traffic includes late responses to requests that timed out
//! or were cancelled, and requests initiated by the peer.

use async_trait::async_trait;
use ironiso_core::IsoMessage;
use tokio::sync::mpsc;
use tracing::warn;

/// Receives unmatched inbound messages.
///
/// Called from the connection's dispatch task, one message at a time and
/// in arrival order. Long-running work should be handed off so the
/// dispatch of later responses is not delayed.
#[async_trait]
pub trait UnsolicitedHandler: Send + Sync {
    /// Called once per unmatched message.
    async fn on_unsolicited(&self, msg: IsoMessage);
}

/// Handler that logs and drops every unmatched message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpHandler;

#[async_trait]
impl UnsolicitedHandler for NoOpHandler {
    async fn on_unsolicited(&self, msg: IsoMessage) {
        warn!(msg = %msg.protected(), "dropping unsolicited message");
    }
}

/// Forwards unmatched messages to a channel, for consumption by another task.
#[async_trait]
impl UnsolicitedHandler for mpsc::UnboundedSender<IsoMessage> {
    async fn on_unsolicited(&self, msg: IsoMessage) {
        if let Err(e) = self.send(msg) {
            warn!(msg = %e.0.protected(), "unsolicited receiver gone, dropping message");
        }
    }
}
