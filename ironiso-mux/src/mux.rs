/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Request/response multiplexer.
//!
//! A [`Mux`] owns one [`IsoChannel`] and lets many tasks issue requests over
//! it concurrently. Each request registers a pending slot under its
//! correlation key before it is written; a single dispatch task reads every
//! inbound message and either resolves the slot with the same key or hands
//! the message to the [`UnsolicitedHandler`].
//!
//! Each pending slot is removed exactly once: by the dispatch task when the
//! response arrives, by the caller on timeout or cancellation, or by the
//! close path when the connection ends. Whoever removes it decides its fate.

use crate::config::MuxConfig;
use crate::error::MuxError;
use crate::handler::UnsolicitedHandler;
use crate::key::{CorrelationKey, FieldKey, KeyExtractor};
use crate::metrics::{MetricsSnapshot, MuxMetrics};
use ironiso_core::IsoMessage;
use ironiso_packager::Packager;
use ironiso_transport::{ChannelError, ChannelReader, ChannelWriter, IsoChannel};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, trace, warn};

type Reply = Result<IsoMessage, MuxError>;

struct Pending {
    id: u64,
    slot: oneshot::Sender<Reply>,
}

#[derive(Default)]
struct PendingTable {
    entries: HashMap<CorrelationKey, Pending>,
    next_id: u64,
    closed: bool,
    cause: Option<String>,
}

/// State shared between callers and the dispatch task.
#[derive(Default)]
struct Shared {
    pending: Mutex<PendingTable>,
    metrics: MuxMetrics,
}

impl Shared {
    /// Removes the pending slot for `key`, if any.
    fn claim(&self, key: &CorrelationKey) -> Option<oneshot::Sender<Reply>> {
        self.pending.lock().entries.remove(key).map(|p| p.slot)
    }

    /// Marks the connection closed and fails every pending request.
    ///
    /// The first recorded cause is kept and reported to later callers.
    fn close(&self, cause: Option<String>) {
        let (drained, cause) = {
            let mut table = self.pending.lock();
            table.closed = true;
            if table.cause.is_none() {
                table.cause = cause;
            }
            let drained: Vec<Pending> = table.entries.drain().map(|(_, p)| p).collect();
            (drained, table.cause.clone())
        };
        if !drained.is_empty() {
            debug!(count = drained.len(), cause = ?cause, "failing pending requests");
        }
        for pending in drained {
            let _ = pending.slot.send(Err(MuxError::ConnectionLost {
                cause: cause.clone(),
            }));
        }
    }

    fn closed_error(&self) -> Option<MuxError> {
        let table = self.pending.lock();
        table.closed.then(|| MuxError::ConnectionLost {
            cause: table.cause.clone(),
        })
    }
}

/// Closes the shared state when the dispatch task ends, however it ends.
struct CloseOnExit {
    shared: Arc<Shared>,
    cause: Option<String>,
}

impl Drop for CloseOnExit {
    fn drop(&mut self) {
        let cause = self.cause.take().or_else(|| {
            std::thread::panicking().then(|| "dispatch task panicked".to_string())
        });
        self.shared.close(cause);
    }
}

/// Removes a registered slot when the request ends, unless the slot has
/// already been claimed by someone else.
struct PendingGuard<'a> {
    shared: &'a Shared,
    key: CorrelationKey,
    id: u64,
}

impl PendingGuard<'_> {
    /// Returns true if this call removed the slot.
    fn remove(&self) -> bool {
        let mut table = self.shared.pending.lock();
        match table.entries.get(&self.key) {
            Some(pending) if pending.id == self.id => {
                table.entries.remove(&self.key);
                true
            }
            _ => false,
        }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Concurrent request/response multiplexer over one channel.
///
/// Must be created inside a Tokio runtime; it spawns the dispatch task.
pub struct Mux {
    shared: Arc<Shared>,
    writer: AsyncMutex<ChannelWriter>,
    packager: Arc<Packager>,
    extractor: Arc<dyn KeyExtractor>,
    config: MuxConfig,
    dispatcher: JoinHandle<()>,
}

impl Mux {
    /// Creates a multiplexer keyed on `config.key_fields`.
    ///
    /// # Arguments
    /// * `channel` - Connected channel; the mux takes both halves
    /// * `config` - Key fields, default timeout and matching policy
    /// * `handler` - Receives every inbound message that matches no request
    #[must_use]
    pub fn new(
        channel: IsoChannel,
        config: MuxConfig,
        handler: Arc<dyn UnsolicitedHandler>,
    ) -> Self {
        let extractor = Arc::new(FieldKey::new(config.key_fields.clone()));
        Self::with_extractor(channel, config, handler, extractor)
    }

    /// Creates a multiplexer with a custom key extractor.
    ///
    /// `config.key_fields` is ignored.
    #[must_use]
    pub fn with_extractor(
        channel: IsoChannel,
        config: MuxConfig,
        handler: Arc<dyn UnsolicitedHandler>,
        extractor: Arc<dyn KeyExtractor>,
    ) -> Self {
        let (reader, writer) = channel.split();
        let packager = Arc::clone(writer.packager());
        let shared = Arc::new(Shared::default());
        let dispatcher = tokio::spawn(dispatch_loop(
            reader,
            Arc::clone(&shared),
            Arc::clone(&extractor),
            handler,
            config.responses_only,
        ));
        debug!(responses_only = config.responses_only, "mux started");
        Self {
            shared,
            writer: AsyncMutex::new(writer),
            packager,
            extractor,
            config,
            dispatcher,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &MuxConfig {
        &self.config
    }

    /// Sends `msg` and waits up to `timeout` for the response with the same
    /// correlation key.
    ///
    /// The key is computed from the message as it goes on the wire, after
    /// fixed-length padding, so it matches a response that echoes the
    /// fields back. The slot is registered before the message is written,
    /// so a response cannot arrive ahead of it. `timeout` covers both the
    /// write and the wait. Dropping the returned future cancels the request;
    /// a response arriving afterwards goes to the unsolicited handler.
    ///
    /// # Errors
    /// - `DuplicateKey` if a request with the same key is outstanding
    /// - `ConnectionLost` if the connection is closed or closes while waiting
    /// - `RequestTimeout` if no response arrives in time
    /// - `Channel` if the request cannot be packed or written
    pub async fn request(
        &self,
        msg: &IsoMessage,
        timeout: Duration,
    ) -> Result<IsoMessage, MuxError> {
        let deadline = Instant::now() + timeout;
        let packed = self.packager.pack(msg).map_err(ChannelError::from)?;
        let wire_form = self.packager.unpack(&packed).map_err(ChannelError::from)?;
        let key = self.extractor.key(&wire_form);

        let (tx, mut rx) = oneshot::channel();
        let guard = self.register(key, tx)?;
        trace!(key = %guard.key, mti = %msg.mti(), "request registered");

        let exchange = async {
            match self.write(&packed).await {
                Ok(()) => (&mut rx)
                    .await
                    .unwrap_or_else(|_| Err(MuxError::connection_lost(None))),
                Err(e) => Err(e),
            }
        };
        let outcome = tokio::time::timeout_at(deadline, exchange).await;

        match outcome {
            Ok(reply) => reply,
            Err(_) if guard.remove() => {
                self.shared.metrics.record_timeout();
                let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                debug!(key = %guard.key, timeout_ms, "request timed out");
                Err(MuxError::RequestTimeout {
                    key: guard.key.to_string(),
                    timeout_ms,
                })
            }
            // The dispatcher or the close path claimed the slot first.
            Err(_) => rx
                .await
                .unwrap_or_else(|_| Err(MuxError::connection_lost(None))),
        }
    }

    /// Sends `msg` and waits for its response using the configured default
    /// timeout.
    ///
    /// # Errors
    /// Same as [`request`](Self::request).
    pub async fn request_default(&self, msg: &IsoMessage) -> Result<IsoMessage, MuxError> {
        self.request(msg, self.config.default_timeout).await
    }

    /// Sends `msg` without waiting for a response.
    ///
    /// # Errors
    /// Returns `ConnectionLost` if the connection is closed, or `Channel` if
    /// the message cannot be packed or written.
    pub async fn send(&self, msg: &IsoMessage) -> Result<(), MuxError> {
        if let Some(err) = self.shared.closed_error() {
            return Err(err);
        }
        let packed = self.packager.pack(msg).map_err(ChannelError::from)?;
        self.write(&packed).await
    }

    /// Returns the number of requests awaiting a response.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.pending.lock().entries.len()
    }

    /// Returns false once the connection has closed or the mux was shut down.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.shared.pending.lock().closed
    }

    /// Returns a snapshot of the counters.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Stops dispatching, fails pending requests with `ConnectionLost` and
    /// closes the outbound half.
    pub async fn shutdown(&self) {
        self.dispatcher.abort();
        self.shared.close(Some("mux shut down".to_string()));
        if let Err(e) = self.writer.lock().await.close().await {
            debug!(error = %e, "error closing channel");
        }
        debug!("mux shut down");
    }

    async fn write(&self, packed: &[u8]) -> Result<(), MuxError> {
        self.writer.lock().await.send_packed(packed).await?;
        self.shared.metrics.record_tx();
        Ok(())
    }

    fn register(
        &self,
        key: CorrelationKey,
        slot: oneshot::Sender<Reply>,
    ) -> Result<PendingGuard<'_>, MuxError> {
        let mut table = self.shared.pending.lock();
        if table.closed {
            return Err(MuxError::ConnectionLost {
                cause: table.cause.clone(),
            });
        }
        if table.entries.contains_key(&key) {
            return Err(MuxError::DuplicateKey {
                key: key.to_string(),
            });
        }
        let id = table.next_id;
        table.next_id += 1;
        table.entries.insert(key.clone(), Pending { id, slot });
        Ok(PendingGuard {
            shared: &self.shared,
            key,
            id,
        })
    }
}

impl Drop for Mux {
    fn drop(&mut self) {
        self.dispatcher.abort();
        self.shared.close(None);
    }
}

impl std::fmt::Debug for Mux {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mux")
            .field("config", &self.config)
            .field("pending", &self.pending_count())
            .field("connected", &self.is_connected())
            .finish()
    }
}

async fn dispatch_loop(
    mut reader: ChannelReader,
    shared: Arc<Shared>,
    extractor: Arc<dyn KeyExtractor>,
    handler: Arc<dyn UnsolicitedHandler>,
    responses_only: bool,
) {
    let mut exit = CloseOnExit {
        shared: Arc::clone(&shared),
        cause: None,
    };
    loop {
        match reader.receive().await {
            Ok(Some(msg)) => {
                shared.metrics.record_rx();
                dispatch(
                    msg,
                    &shared,
                    extractor.as_ref(),
                    handler.as_ref(),
                    responses_only,
                )
                .await;
            }
            Ok(None) => {
                debug!("connection closed by peer");
                exit.cause = Some("connection closed by peer".to_string());
                break;
            }
            Err(e) if !e.is_fatal() => {
                shared.metrics.record_malformed();
                warn!(error = %e, "dropping malformed inbound message");
            }
            Err(e) => {
                error!(error = %e, "connection failed");
                exit.cause = Some(e.to_string());
                break;
            }
        }
    }
}

async fn dispatch(
    msg: IsoMessage,
    shared: &Shared,
    extractor: &dyn KeyExtractor,
    handler: &dyn UnsolicitedHandler,
    responses_only: bool,
) {
    let msg = if responses_only && msg.mti().is_request() {
        msg
    } else {
        let key = extractor.key(&msg);
        match shared.claim(&key) {
            Some(slot) => match slot.send(Ok(msg)) {
                Ok(()) => {
                    shared.metrics.record_matched();
                    trace!(key = %key, "response matched");
                    return;
                }
                // Caller went away between claim and delivery.
                Err(reply) => match reply {
                    Ok(msg) => msg,
                    Err(_) => return,
                },
            },
            None => msg,
        }
    };
    shared.metrics.record_unsolicited();
    debug!(mti = %msg.mti(), "unsolicited message");
    handler.on_unsolicited(msg).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironiso_core::Mti;
    use ironiso_dictionary::embedded::iso87_binary;
    use ironiso_packager::PackagerConfig;
    use ironiso_transport::FrameCodec;
    use tokio::io::AsyncWriteExt;
    use tokio::sync::mpsc;

    fn packager() -> Arc<Packager> {
        Arc::new(Packager::new(
            Arc::new(iso87_binary().unwrap()),
            PackagerConfig::default(),
        ))
    }

    fn setup_with(
        config: MuxConfig,
    ) -> (Mux, IsoChannel, mpsc::UnboundedReceiver<IsoMessage>) {
        let (a, b) = tokio::io::duplex(16 * 1024);
        let (tx, rx) = mpsc::unbounded_channel();
        let mux = Mux::new(
            IsoChannel::new(a, packager(), FrameCodec::new()),
            config,
            Arc::new(tx),
        );
        (mux, IsoChannel::new(b, packager(), FrameCodec::new()), rx)
    }

    fn setup() -> (Mux, IsoChannel, mpsc::UnboundedReceiver<IsoMessage>) {
        setup_with(MuxConfig::new())
    }

    fn auth_request(stan: &str) -> IsoMessage {
        IsoMessage::new(Mti::AUTHORIZATION_REQUEST)
            .with(2, "4111111111111111")
            .with(4, "000000001000")
            .with(11, stan)
            .with(41, "TERM0001")
    }

    fn approve(mut msg: IsoMessage) -> IsoMessage {
        msg.set_response_mti();
        msg.set(39, "00");
        msg
    }

    async fn wait_pending(mux: &Mux, count: usize) {
        while mux.pending_count() != count {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_concurrent_requests_out_of_order() {
        let (mux, mut server, mut unsolicited) = setup();
        let mux = Arc::new(mux);

        let first = tokio::spawn({
            let mux = Arc::clone(&mux);
            async move { mux.request(&auth_request("000001"), Duration::from_secs(5)).await }
        });
        let second = tokio::spawn({
            let mux = Arc::clone(&mux);
            async move { mux.request(&auth_request("000002"), Duration::from_secs(5)).await }
        });

        let a = server.receive().await.unwrap().unwrap();
        let b = server.receive().await.unwrap().unwrap();
        server.send(&approve(b)).await.unwrap();
        server.send(&approve(a)).await.unwrap();

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();
        assert_eq!(first.mti().as_str(), "0110");
        assert_eq!(first.get_str(11), Some("000001"));
        assert_eq!(second.get_str(11), Some("000002"));
        assert_eq!(mux.pending_count(), 0);

        let metrics = mux.metrics();
        assert_eq!(metrics.tx, 2);
        assert_eq!(metrics.matched, 2);
        assert_eq!(metrics.unsolicited, 0);
        assert!(unsolicited.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unmatched_response_delivered_once() {
        let (mux, mut server, mut unsolicited) = setup();

        server.send(&approve(auth_request("999999"))).await.unwrap();

        let msg = unsolicited.recv().await.unwrap();
        assert_eq!(msg.get_str(11), Some("999999"));
        let again = tokio::time::timeout(Duration::from_millis(50), unsolicited.recv()).await;
        assert!(again.is_err());
        assert_eq!(mux.metrics().unsolicited, 1);
    }

    #[tokio::test]
    async fn test_late_response_after_timeout() {
        let (mux, mut server, mut unsolicited) = setup();

        let err = mux
            .request(&auth_request("000007"), Duration::from_millis(30))
            .await
            .unwrap_err();
        match err {
            MuxError::RequestTimeout { key, timeout_ms } => {
                assert_eq!(key, "41=TERM0001|11=000007");
                assert_eq!(timeout_ms, 30);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(mux.pending_count(), 0);
        assert_eq!(mux.metrics().timeouts, 1);

        let request = server.receive().await.unwrap().unwrap();
        server.send(&approve(request)).await.unwrap();

        let late = unsolicited.recv().await.unwrap();
        assert_eq!(late.get_str(11), Some("000007"));
        assert_eq!(late.get_str(39), Some("00"));
    }

    #[tokio::test]
    async fn test_cancelled_request_releases_key() {
        let (mux, mut server, mut unsolicited) = setup();
        let msg = auth_request("000011");

        let request = mux.request(&msg, Duration::from_secs(10));
        let cancelled = tokio::time::timeout(Duration::from_millis(20), request).await;
        assert!(cancelled.is_err());
        assert_eq!(mux.pending_count(), 0);

        let request = server.receive().await.unwrap().unwrap();
        server.send(&approve(request)).await.unwrap();
        assert_eq!(unsolicited.recv().await.unwrap().get_str(11), Some("000011"));
        assert_eq!(mux.metrics().timeouts, 0);
    }

    #[tokio::test]
    async fn test_duplicate_key_rejected() {
        let (mux, mut server, _unsolicited) = setup();
        let mux = Arc::new(mux);

        let outstanding = tokio::spawn({
            let mux = Arc::clone(&mux);
            async move { mux.request(&auth_request("000003"), Duration::from_secs(5)).await }
        });
        let request = server.receive().await.unwrap().unwrap();

        let err = mux
            .request(&auth_request("000003"), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, MuxError::DuplicateKey { .. }));

        server.send(&approve(request)).await.unwrap();
        assert!(outstanding.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_connection_lost_fails_pending() {
        let (mux, mut server, _unsolicited) = setup();
        let mux = Arc::new(mux);

        let waiting: Vec<_> = ["000004", "000005"]
            .into_iter()
            .map(|stan| {
                let mux = Arc::clone(&mux);
                tokio::spawn(async move {
                    mux.request(&auth_request(stan), Duration::from_secs(5)).await
                })
            })
            .collect();
        server.receive().await.unwrap().unwrap();
        server.receive().await.unwrap().unwrap();
        drop(server);

        for handle in waiting {
            match handle.await.unwrap().unwrap_err() {
                MuxError::ConnectionLost { cause } => {
                    assert_eq!(cause.as_deref(), Some("connection closed by peer"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }
        assert!(!mux.is_connected());
        assert_eq!(mux.pending_count(), 0);

        let err = mux
            .request(&auth_request("000006"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, MuxError::ConnectionLost { .. }));
    }

    #[tokio::test]
    async fn test_responses_only_routes_requests_to_handler() {
        let (mux, mut server, mut unsolicited) =
            setup_with(MuxConfig::new().with_responses_only(true));
        let mux = Arc::new(mux);

        let waiting = tokio::spawn({
            let mux = Arc::clone(&mux);
            async move { mux.request(&auth_request("000008"), Duration::from_secs(5)).await }
        });
        let request = server.receive().await.unwrap().unwrap();

        // Same key, but a request-class MTI.
        server.send(&request).await.unwrap();
        let echoed = unsolicited.recv().await.unwrap();
        assert_eq!(echoed.mti(), Mti::AUTHORIZATION_REQUEST);
        assert_eq!(mux.pending_count(), 1);

        server.send(&approve(request)).await.unwrap();
        let response = waiting.await.unwrap().unwrap();
        assert_eq!(response.mti().as_str(), "0110");
    }

    #[tokio::test]
    async fn test_malformed_frame_keeps_connection() {
        let (a, mut b) = tokio::io::duplex(16 * 1024);
        let (tx, _unsolicited) = mpsc::unbounded_channel();
        let mux = Mux::new(
            IsoChannel::new(a, packager(), FrameCodec::new()),
            MuxConfig::new(),
            Arc::new(tx),
        );

        // Frame whose body is not a valid MTI.
        b.write_all(&[0x00, 0x04, b'X', b'Y', b'Z', b'!']).await.unwrap();
        let mut server = IsoChannel::new(b, packager(), FrameCodec::new());

        let mux = Arc::new(mux);
        let waiting = tokio::spawn({
            let mux = Arc::clone(&mux);
            async move { mux.request(&auth_request("000009"), Duration::from_secs(5)).await }
        });
        let request = server.receive().await.unwrap().unwrap();
        server.send(&approve(request)).await.unwrap();

        assert!(waiting.await.unwrap().is_ok());
        assert_eq!(mux.metrics().malformed, 1);
        assert!(mux.is_connected());
    }

    #[tokio::test]
    async fn test_shutdown_fails_pending() {
        let (mux, mut server, _unsolicited) = setup();
        let mux = Arc::new(mux);

        let waiting = tokio::spawn({
            let mux = Arc::clone(&mux);
            async move { mux.request(&auth_request("000010"), Duration::from_secs(5)).await }
        });
        server.receive().await.unwrap().unwrap();
        wait_pending(&mux, 1).await;

        mux.shutdown().await;
        assert!(matches!(
            waiting.await.unwrap().unwrap_err(),
            MuxError::ConnectionLost { .. }
        ));
        assert!(!mux.is_connected());
        assert!(matches!(
            mux.send(&auth_request("000012")).await.unwrap_err(),
            MuxError::ConnectionLost { .. }
        ));
    }

    #[tokio::test]
    async fn test_short_key_fields_match_padded_response() {
        let (mux, mut server, mut unsolicited) = setup();
        let mux = Arc::new(mux);
        let request = IsoMessage::new(Mti::AUTHORIZATION_REQUEST)
            .with(4, "000000001000")
            .with(11, "7")
            .with(41, "TERM1");

        let waiting = tokio::spawn({
            let mux = Arc::clone(&mux);
            async move { mux.request(&request, Duration::from_secs(5)).await }
        });
        let received = server.receive().await.unwrap().unwrap();
        assert_eq!(received.get_str(11), Some("000007"));
        assert_eq!(received.get_str(41), Some("TERM1   "));
        server.send(&approve(received)).await.unwrap();

        let response = waiting.await.unwrap().unwrap();
        assert_eq!(response.mti().as_str(), "0110");
        assert_eq!(response.get_str(39), Some("00"));
        assert_eq!(mux.metrics().matched, 1);
        assert!(unsolicited.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_timeout_covers_stalled_write() {
        let (a, _stalled_peer) = tokio::io::duplex(16);
        let (tx, _unsolicited) = mpsc::unbounded_channel();
        let mux = Mux::new(
            IsoChannel::new(a, packager(), FrameCodec::new()),
            MuxConfig::new(),
            Arc::new(tx),
        );

        for stan in ["000021", "000022"] {
            let result = tokio::time::timeout(
                Duration::from_secs(2),
                mux.request(&auth_request(stan), Duration::from_millis(100)),
            )
            .await
            .expect("request must honour its own timeout");
            assert!(matches!(result, Err(MuxError::RequestTimeout { .. })));
        }
        assert_eq!(mux.pending_count(), 0);
        assert_eq!(mux.metrics().timeouts, 2);
        assert_eq!(mux.metrics().tx, 0);
    }

    struct PanickingHandler;

    #[async_trait::async_trait]
    impl UnsolicitedHandler for PanickingHandler {
        async fn on_unsolicited(&self, _msg: IsoMessage) {
            panic!("handler failure");
        }
    }

    #[tokio::test]
    async fn test_dispatch_panic_releases_pending() {
        let (a, b) = tokio::io::duplex(16 * 1024);
        let mux = Arc::new(Mux::new(
            IsoChannel::new(a, packager(), FrameCodec::new()),
            MuxConfig::new(),
            Arc::new(PanickingHandler),
        ));
        let mut server = IsoChannel::new(b, packager(), FrameCodec::new());

        let waiting = tokio::spawn({
            let mux = Arc::clone(&mux);
            async move { mux.request(&auth_request("000031"), Duration::from_secs(5)).await }
        });
        server.receive().await.unwrap().unwrap();
        server.send(&approve(auth_request("999999"))).await.unwrap();

        assert!(matches!(
            waiting.await.unwrap().unwrap_err(),
            MuxError::ConnectionLost { .. }
        ));
        assert!(!mux.is_connected());
    }

    #[tokio::test]
    async fn test_frame_error_reaches_pending_callers() {
        let (a, b) = tokio::io::duplex(16 * 1024);
        let (tx, _unsolicited) = mpsc::unbounded_channel();
        let mux = Arc::new(Mux::new(
            IsoChannel::new(a, packager(), FrameCodec::new()),
            MuxConfig::new(),
            Arc::new(tx),
        ));
        let (mut peer_rx, mut peer_tx) = tokio::io::split(b);

        let waiting = tokio::spawn({
            let mux = Arc::clone(&mux);
            async move { mux.request(&auth_request("000041"), Duration::from_secs(5)).await }
        });
        FrameCodec::new().read_frame(&mut peer_rx).await.unwrap().unwrap();
        peer_tx.write_all(&[0x00, 0x28, b'0', b'2']).await.unwrap();
        drop(peer_tx);
        drop(peer_rx);

        match waiting.await.unwrap().unwrap_err() {
            MuxError::ConnectionLost { cause: Some(cause) } => {
                assert!(cause.contains("incomplete frame"), "{cause}");
            }
            other => panic!("unexpected error: {other}"),
        }
        let later = mux
            .request(&auth_request("000042"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(later.to_string().contains("incomplete frame"));
    }
}
