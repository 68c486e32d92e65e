//! Endpoint - a subscriber's delivery target

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};

use contracts::{DeliveryPolicy, Envelope};

use crate::metrics::SubscriberMetrics;

/// Sending half of a subscriber queue, plus how to deliver into it.
///
/// The consumer creates the queue and keeps the receiver. The distributor
/// only holds this handle and never closes the queue; a consumer leaves by
/// closing or dropping its receiver.
#[derive(Debug, Clone)]
pub struct Endpoint {
    name: String,
    tx: mpsc::Sender<Envelope>,
    policy: DeliveryPolicy,
    metrics: Arc<SubscriberMetrics>,
}

/// Outcome of handing one envelope to one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Queue was full under `DropOnFull`
    Dropped,
    /// Queue stayed full for the whole `Timeout` window
    TimedOut,
    /// Receiver is gone
    Closed,
}

impl Delivery {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Dropped => "dropped",
            Self::TimedOut => "timed_out",
            Self::Closed => "closed",
        }
    }
}

impl Endpoint {
    /// Wrap an existing sender
    pub fn new(name: impl Into<String>, tx: mpsc::Sender<Envelope>, policy: DeliveryPolicy) -> Self {
        Self {
            name: name.into(),
            tx,
            policy,
            metrics: Arc::new(SubscriberMetrics::new()),
        }
    }

    /// Create a bounded queue and return its endpoint and receiver
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn channel(
        name: impl Into<String>,
        capacity: usize,
        policy: DeliveryPolicy,
    ) -> (Self, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(name, tx, policy), rx)
    }

    /// Endpoint name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delivery policy
    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    /// Shared metrics
    pub fn metrics(&self) -> &Arc<SubscriberMetrics> {
        &self.metrics
    }

    /// Whether the consumer has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Hand one envelope over according to the endpoint's policy
    pub async fn deliver(&self, envelope: Envelope) -> Delivery {
        let outcome = match self.policy {
            DeliveryPolicy::Block => match self.tx.send(envelope).await {
                Ok(()) => Delivery::Delivered,
                Err(_) => Delivery::Closed,
            },
            DeliveryPolicy::Timeout { timeout_ms } => {
                match self
                    .tx
                    .send_timeout(envelope, Duration::from_millis(timeout_ms))
                    .await
                {
                    Ok(()) => Delivery::Delivered,
                    Err(SendTimeoutError::Timeout(_)) => Delivery::TimedOut,
                    Err(SendTimeoutError::Closed(_)) => Delivery::Closed,
                }
            }
            DeliveryPolicy::DropOnFull => match self.tx.try_send(envelope) {
                Ok(()) => Delivery::Delivered,
                Err(TrySendError::Full(_)) => Delivery::Dropped,
                Err(TrySendError::Closed(_)) => Delivery::Closed,
            },
        };

        match outcome {
            Delivery::Delivered => {
                self.metrics.inc_delivered_count();
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
            }
            Delivery::Dropped => self.metrics.inc_dropped_count(),
            Delivery::TimedOut => self.metrics.inc_timeout_count(),
            Delivery::Closed => {}
        }

        outcome
    }
}
