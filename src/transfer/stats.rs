//! Transfer counters
//!
//! Lock-free atomic counters shared by every thread driving transfers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Cumulative transfer outcome counters
#[derive(Debug, Default)]
pub struct TransferStats {
    /// Transfers that reached COMMITTED
    pub committed: AtomicU64,
    /// Transfers that failed validation before locking
    pub rejected: AtomicU64,
    /// Transfers aborted under lock (insufficient funds or internal fault)
    pub aborted: AtomicU64,
    /// Notifications the sink refused (full queue, closed, unavailable)
    pub notifications_dropped: AtomicU64,
}

impl TransferStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn incr_committed(&self) {
        self.committed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn incr_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn incr_aborted(&self) {
        self.aborted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn incr_notifications_dropped(&self) {
        self.notifications_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TransferStatsSnapshot {
        TransferStatsSnapshot {
            committed: self.committed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
            notifications_dropped: self.notifications_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Immutable snapshot of stats (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransferStatsSnapshot {
    pub committed: u64,
    pub rejected: u64,
    pub aborted: u64,
    pub notifications_dropped: u64,
}

impl TransferStatsSnapshot {
    /// Every transfer invocation that reached a terminal state
    pub fn total(&self) -> u64 {
        self.committed + self.rejected + self.aborted
    }
}

impl fmt::Display for TransferStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transfer Stats: total={} committed={}, rejected={}, aborted={}, notifications_dropped={}",
            self.total(),
            self.committed,
            self.rejected,
            self.aborted,
            self.notifications_dropped
        )
    }
}
