//! Capture metrics

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::DeliveryReport;

/// Per-source capture counters
#[derive(Debug, Default)]
pub struct CaptureMetrics {
    /// Frames handed to the distributor
    pub packets_captured: AtomicU64,

    /// Bytes handed to the distributor
    pub bytes_captured: AtomicU64,

    /// Broadcasts where at least one subscriber lost the frame
    pub packets_with_loss: AtomicU64,

    /// Envelopes lost across all subscribers (drop + timeout)
    pub envelopes_lost: AtomicU64,
}

impl CaptureMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one broadcast and its outcome
    pub fn record(&self, bytes: usize, report: &DeliveryReport) {
        self.packets_captured.fetch_add(1, Ordering::Relaxed);
        self.bytes_captured.fetch_add(bytes as u64, Ordering::Relaxed);

        let lost = report.lost() as u64;
        if lost > 0 {
            self.packets_with_loss.fetch_add(1, Ordering::Relaxed);
            self.envelopes_lost.fetch_add(lost, Ordering::Relaxed);
        }
    }

    /// Get snapshot
    pub fn snapshot(&self) -> CaptureSnapshot {
        CaptureSnapshot {
            packets_captured: self.packets_captured.load(Ordering::Relaxed),
            bytes_captured: self.bytes_captured.load(Ordering::Relaxed),
            packets_with_loss: self.packets_with_loss.load(Ordering::Relaxed),
            envelopes_lost: self.envelopes_lost.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureSnapshot {
    pub packets_captured: u64,
    pub bytes_captured: u64,
    pub packets_with_loss: u64,
    pub envelopes_lost: u64,
}
