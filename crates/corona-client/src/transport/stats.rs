//! Per-channel counters. Plain atomics, read as a snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ChannelStats {
    transmitted: AtomicU64,
    rejected: AtomicU64,
    dropped: AtomicU64,
    dispatched: AtomicU64,
    unhandled: AtomicU64,
    decode_errors: AtomicU64,
    handler_errors: AtomicU64,
}

/// Point-in-time copy of [`ChannelStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Frames written to the connection.
    pub transmitted: u64,
    /// Sends refused (not open, buffer full).
    pub rejected: u64,
    /// Accepted frames discarded because the connection ended first.
    pub dropped: u64,
    /// Inbound messages a handler accepted.
    pub dispatched: u64,
    /// Inbound messages with no registered handler.
    pub unhandled: u64,
    pub decode_errors: u64,
    pub handler_errors: u64,
}

impl ChannelStats {
    pub(crate) fn inc_transmitted(&self) {
        self.transmitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_dropped(&self, n: u64) {
        self.dropped.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn inc_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_unhandled(&self) {
        self.unhandled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_decode_errors(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_handler_errors(&self) {
        self.handler_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            transmitted: self.transmitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            unhandled: self.unhandled.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
        }
    }
}
