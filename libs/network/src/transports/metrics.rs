//! Transport Traffic Metrics
//!
//! Lock-free counters for messages and bytes moved by a transport, plus the
//! time of the last activity in either direction.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

/// Point-in-time copy of a [`MetricsTracker`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportMetrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub errors: u64,
    pub last_activity: Option<Instant>,
}

impl TransportMetrics {
    /// Mean payload size of sent messages
    pub fn average_bytes_sent(&self) -> Option<f64> {
        (self.messages_sent > 0).then(|| self.bytes_sent as f64 / self.messages_sent as f64)
    }
}

/// Shared traffic counters for one transport
#[derive(Clone, Debug, Default)]
pub struct MetricsTracker {
    messages_sent: Arc<AtomicU64>,
    messages_received: Arc<AtomicU64>,
    bytes_sent: Arc<AtomicU64>,
    bytes_received: Arc<AtomicU64>,
    errors: Arc<AtomicU64>,
    last_activity: Arc<RwLock<Option<Instant>>>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_send(&self, bytes: usize) {
        self.messages_sent.fetch_add(1, Ordering::Release);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Release);
        self.touch();
    }

    #[inline]
    pub fn record_receive(&self, bytes: usize) {
        self.messages_received.fetch_add(1, Ordering::Release);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Release);
        self.touch();
    }

    #[inline]
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Release);
    }

    fn touch(&self) {
        *self.last_activity.write() = Some(Instant::now());
    }

    pub fn snapshot(&self) -> TransportMetrics {
        TransportMetrics {
            messages_sent: self.messages_sent.load(Ordering::Acquire),
            messages_received: self.messages_received.load(Ordering::Acquire),
            bytes_sent: self.bytes_sent.load(Ordering::Acquire),
            bytes_received: self.bytes_received.load(Ordering::Acquire),
            errors: self.errors.load(Ordering::Acquire),
            last_activity: *self.last_activity.read(),
        }
    }
}
