use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Snapshot of a mesh socket's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MeshStats {
    /// Datagrams read from the socket.
    pub received: u64,
    /// Datagrams dropped because they did not decode.
    pub decode_failures: u64,
    /// Messages dropped by admission (whitelist or schema).
    pub rejected: u64,
    /// Messages handed to the dispatcher.
    pub dispatched: u64,
    /// Handler invocations that returned an error or panicked.
    pub handler_failures: u64,
    /// Datagrams accepted by the OS for sending.
    pub sent: u64,
    /// Sends that failed to encode or write.
    pub send_failures: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    received: AtomicU64,
    decode_failures: AtomicU64,
    rejected: AtomicU64,
    dispatched: AtomicU64,
    handler_failures: AtomicU64,
    sent: AtomicU64,
    send_failures: AtomicU64,
}

impl Counters {
    pub(crate) fn received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dispatched(&self, handler_failures: usize) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        self.handler_failures
            .fetch_add(handler_failures as u64, Ordering::Relaxed);
    }

    pub(crate) fn sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> MeshStats {
        MeshStats {
            received: self.received.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
        }
    }
}
