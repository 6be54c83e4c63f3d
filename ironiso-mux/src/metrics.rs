/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Multiplexer counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, updated without locking.
#[derive(Debug, Default)]
pub struct MuxMetrics {
    tx: AtomicU64,
    rx: AtomicU64,
    matched: AtomicU64,
    unsolicited: AtomicU64,
    timeouts: AtomicU64,
    malformed: AtomicU64,
}

/// Point-in-time copy of [`MuxMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Messages written.
    pub tx: u64,
    /// Messages read and unpacked.
    pub rx: u64,
    /// Inbound messages that resolved a pending request.
    pub matched: u64,
    /// Inbound messages handed to the unsolicited handler.
    pub unsolicited: u64,
    /// Requests that timed out.
    pub timeouts: u64,
    /// Inbound frames that could not be unpacked.
    pub malformed: u64,
}

impl MuxMetrics {
    #[inline]
    pub(crate) fn record_tx(&self) {
        self.tx.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_rx(&self) {
        self.rx.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_matched(&self) {
        self.matched.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_unsolicited(&self) {
        self.unsolicited.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tx: self.tx.load(Ordering::Relaxed),
            rx: self.rx.load(Ordering::Relaxed),
            matched: self.matched.load(Ordering::Relaxed),
            unsolicited: self.unsolicited.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let metrics = MuxMetrics::default();
        metrics.record_tx();
        metrics.record_tx();
        metrics.record_rx();
        metrics.record_timeout();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tx, 2);
        assert_eq!(snapshot.rx, 1);
        assert_eq!(snapshot.timeouts, 1);
        assert_eq!(snapshot.matched, 0);
    }
}
