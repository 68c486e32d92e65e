//! DeliveryReport - outcome of one broadcast

use serde::{Deserialize, Serialize};

/// Per-broadcast delivery tally.
///
/// `subscribers == delivered + dropped + timed_out + closed` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    /// Subscribers in the snapshot this broadcast used
    pub subscribers: usize,
    /// Envelopes accepted by a subscriber queue
    pub delivered: usize,
    /// Envelopes dropped on a full queue
    pub dropped: usize,
    /// Envelopes dropped after the subscriber's timeout expired
    pub timed_out: usize,
    /// Subscribers found closed (retired by this broadcast)
    pub closed: usize,
}

impl DeliveryReport {
    /// True when every subscriber in the snapshot got the packet
    pub fn is_complete(&self) -> bool {
        self.delivered == self.subscribers
    }

    /// Envelopes that did not reach a live subscriber
    pub fn lost(&self) -> usize {
        self.dropped + self.timed_out
    }
}
