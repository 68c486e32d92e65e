//! Per-subscriber delivery policy

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a broadcast does when a subscriber's queue has no room.
///
/// The policy only affects the subscriber it is attached to: a dropped or
/// timed-out envelope is lost for that subscriber alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DeliveryPolicy {
    /// Wait until the queue accepts the envelope.
    ///
    /// A stalled subscriber stalls every later delivery of the same
    /// broadcast and the producer behind it.
    Block,
    /// Wait at most `timeout_ms`, then drop for this subscriber
    Timeout { timeout_ms: u64 },
    /// Drop immediately when the queue is full
    #[default]
    DropOnFull,
}

impl DeliveryPolicy {
    /// Build a timeout policy from a duration (sub-millisecond parts are truncated)
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout {
            timeout_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Whether a full queue can hold up the producer under this policy
    pub fn may_stall(&self) -> bool {
        matches!(self, Self::Block)
    }

    /// Short label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Timeout { .. } => "timeout",
            Self::DropOnFull => "drop_on_full",
        }
    }
}
