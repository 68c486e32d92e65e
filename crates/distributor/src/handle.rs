//! SubscriberHandle - manages a handler with its own queue and worker task

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace, warn};

use contracts::{DeliveryPolicy, Envelope, InterfaceId, PacketHandler};

use crate::distributor::{Distributor, SubscriberId};
use crate::endpoint::Endpoint;
use crate::metrics::SubscriberMetrics;

/// Handle to a running subscriber worker
pub struct SubscriberHandle {
    /// Registration id
    id: SubscriberId,
    /// Handler name
    name: String,
    /// Interface the handler represents
    interface: InterfaceId,
    /// Shared metrics
    metrics: Arc<SubscriberMetrics>,
    /// Tells the worker to stop taking new envelopes
    stop_tx: oneshot::Sender<()>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl SubscriberHandle {
    /// Create the subscriber queue, register it, and spawn the worker task
    ///
    /// # Panics
    /// Panics if `queue_capacity` is zero.
    pub fn spawn<H: PacketHandler + Send + 'static>(
        handler: H,
        distributor: &Distributor,
        queue_capacity: usize,
        policy: DeliveryPolicy,
    ) -> Self {
        let name = handler.name().to_string();
        let interface = handler.interface().clone();
        let (endpoint, rx) = Endpoint::channel(name.clone(), queue_capacity, policy);
        let metrics = Arc::clone(endpoint.metrics());
        let id = distributor.register(endpoint);

        let (stop_tx, stop_rx) = oneshot::channel();
        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            subscriber_worker(handler, rx, stop_rx, worker_metrics, worker_name).await;
        });

        Self {
            id,
            name,
            interface,
            metrics,
            stop_tx,
            worker_handle,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interface(&self) -> &InterfaceId {
        &self.interface
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<SubscriberMetrics> {
        &self.metrics
    }

    /// Stop the worker gracefully
    ///
    /// Envelopes already queued are still handled. The distributor notices
    /// the closed queue on its next broadcast and retires the slot.
    #[instrument(name = "subscriber_handle_shutdown", skip(self), fields(subscriber = %self.name))]
    pub async fn shutdown(self) {
        // Worker may already be gone if its handler panicked
        let _ = self.stop_tx.send(());
        if let Err(e) = self.worker_handle.await {
            error!(subscriber = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(subscriber = %self.name, "SubscriberHandle shutdown complete");
    }

    /// Like [`shutdown`](Self::shutdown), but abort the worker if it has not
    /// finished draining within `grace`.
    ///
    /// Returns `false` when the worker was aborted; its metrics then stop
    /// short of what was queued.
    #[instrument(
        name = "subscriber_handle_shutdown_within",
        skip(self),
        fields(subscriber = %self.name)
    )]
    pub async fn shutdown_within(self, grace: Duration) -> bool {
        let Self {
            name,
            stop_tx,
            mut worker_handle,
            ..
        } = self;
        let _ = stop_tx.send(());

        match tokio::time::timeout(grace, &mut worker_handle).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!(subscriber = %name, error = ?e, "Worker task panicked");
                true
            }
            Err(_) => {
                worker_handle.abort();
                // Wait for the cancellation so nothing touches the metrics afterwards
                let _ = worker_handle.await;
                warn!(
                    subscriber = %name,
                    grace_ms = grace.as_millis() as u64,
                    "Worker aborted before draining"
                );
                false
            }
        }
    }
}

/// Worker task that drains the subscriber queue into the handler
#[instrument(
    name = "subscriber_worker_loop",
    skip(handler, rx, stop_rx, metrics),
    fields(subscriber = %name)
)]
async fn subscriber_worker<H: PacketHandler>(
    mut handler: H,
    mut rx: mpsc::Receiver<Envelope>,
    mut stop_rx: oneshot::Receiver<()>,
    metrics: Arc<SubscriberMetrics>,
    name: String,
) {
    debug!(subscriber = %name, interface = %handler.interface(), "Subscriber worker started");

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            next = rx.recv() => match next {
                Some(envelope) => {
                    metrics.set_queue_len(rx.len());
                    observability::record_queue_depth(&name, rx.len());
                    process_envelope(&mut handler, &envelope, &metrics, &name).await;
                }
                None => break,
            },
        }
    }

    // Refuse new envelopes, finish what is already queued
    rx.close();
    while let Some(envelope) = rx.recv().await {
        process_envelope(&mut handler, &envelope, &metrics, &name).await;
    }
    metrics.set_queue_len(0);
    observability::record_queue_depth(&name, 0);

    if let Err(e) = handler.flush().await {
        error!(subscriber = %name, error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = handler.close().await {
        error!(subscriber = %name, error = %e, "Close failed on shutdown");
    }

    debug!(subscriber = %name, "Subscriber worker stopped");
}

async fn process_envelope<H: PacketHandler>(
    handler: &mut H,
    envelope: &Envelope,
    metrics: &SubscriberMetrics,
    name: &str,
) {
    if envelope.originated_from(handler.interface()) {
        metrics.inc_self_skipped_count();
        trace!(
            subscriber = %name,
            sequence = envelope.packet().meta.sequence,
            "Skipping self-originated packet"
        );
        return;
    }

    match handler.handle(envelope).await {
        Ok(()) => {
            metrics.inc_handled_count();
            observability::record_packet_handled(name, true);
        }
        Err(e) => {
            metrics.inc_failure_count();
            observability::record_packet_handled(name, false);
            error!(
                subscriber = %name,
                source = %envelope.source(),
                sequence = envelope.packet().meta.sequence,
                error = %e,
                "Handle failed"
            );
            // Continue processing - don't crash on single failure
        }
    }
}
