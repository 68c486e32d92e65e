//! Distributor - registration and broadcast of captured packets

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, instrument, trace, warn};

use contracts::{
    DeliveryReport, Envelope, HandlerType, InterfaceId, Packet, SubscriberSpec,
};

use crate::endpoint::{Delivery, Endpoint};
use crate::error::DistributorError;
use crate::handle::SubscriberHandle;
use crate::handlers::{CountingHandler, FileHandler, LogHandler, NetworkHandler};
use crate::metrics::MetricsSnapshot;

/// Registration-order identifier of a subscriber slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// One registered endpoint.
///
/// Slots are never reordered. A slot whose receiver closed is flagged
/// retired and removed by the broadcast that found it closed.
#[derive(Debug)]
struct Slot {
    id: SubscriberId,
    endpoint: Endpoint,
    retired: AtomicBool,
}

impl Slot {
    fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }
}

#[derive(Debug, Default)]
struct Registry {
    slots: Vec<Arc<Slot>>,
    next_id: u64,
}

impl Registry {
    fn prune_retired(&mut self) {
        let before = self.slots.len();
        self.slots.retain(|slot| !slot.is_retired());
        if self.slots.len() != before {
            observability::record_subscriber_count(self.slots.len());
        }
    }
}

/// Fan-out point between capture sources and subscriber queues.
///
/// Two locks, never held together across an await:
/// - `registry` guards the subscriber list. It is held only to append a
///   slot or to copy the list, so a stalled subscriber can never hold up
///   `register`.
/// - `publish` serialises broadcasts. Deliveries run against the copied
///   list while it is held, so concurrent producers cannot interleave and
///   every subscriber sees packets in the same relative order.
///
/// A `register` that returns before a `send` copies the list is part of
/// that broadcast. One that races an in-flight `send` may miss that
/// single packet and receives every later one.
#[derive(Debug, Default)]
pub struct Distributor {
    registry: Mutex<Registry>,
    publish: tokio::sync::Mutex<()>,
}

impl Distributor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an endpoint to the broadcast list.
    ///
    /// Always succeeds. Registering the same endpoint twice creates two
    /// delivery targets, and the consumer will see every packet twice.
    pub fn register(&self, endpoint: Endpoint) -> SubscriberId {
        let mut registry = self.lock_registry();
        registry.prune_retired();

        let id = SubscriberId(registry.next_id);
        registry.next_id += 1;

        debug!(
            subscriber = %id,
            endpoint = endpoint.name(),
            policy = endpoint.policy().label(),
            "Subscriber registered"
        );

        registry.slots.push(Arc::new(Slot {
            id,
            endpoint,
            retired: AtomicBool::new(false),
        }));
        observability::record_subscriber_count(registry.slots.len());

        id
    }

    /// Broadcast one packet to every registered subscriber.
    ///
    /// The source interface is carried in each envelope and never used to
    /// skip a subscriber. Dropping self-originated packets is the consumer's
    /// call.
    ///
    /// Returns once every subscriber in the snapshot has been handled
    /// according to its policy. Under `Block` that can take as long as the
    /// slowest consumer.
    #[instrument(
        name = "distributor_send",
        level = "trace",
        skip(self, packet, source),
        fields(sequence = packet.meta.sequence)
    )]
    pub async fn send(&self, packet: Packet, source: impl Into<InterfaceId>) -> DeliveryReport {
        let source = source.into();
        let packet = Arc::new(packet);

        let _publish = self.publish.lock().await;
        let snapshot = self.snapshot();

        observability::record_packet_published(&source, packet.len());

        let mut report = DeliveryReport {
            subscribers: snapshot.len(),
            ..DeliveryReport::default()
        };

        for slot in &snapshot {
            let envelope = Envelope::new(Arc::clone(&packet), source.clone());
            let outcome = slot.endpoint.deliver(envelope).await;
            observability::record_delivery(slot.endpoint.name(), outcome.label());

            match outcome {
                Delivery::Delivered => report.delivered += 1,
                Delivery::Dropped => {
                    report.dropped += 1;
                    warn!(
                        subscriber = %slot.id,
                        endpoint = slot.endpoint.name(),
                        source = %source,
                        sequence = packet.meta.sequence,
                        "Queue full, packet dropped"
                    );
                }
                Delivery::TimedOut => {
                    report.timed_out += 1;
                    warn!(
                        subscriber = %slot.id,
                        endpoint = slot.endpoint.name(),
                        source = %source,
                        sequence = packet.meta.sequence,
                        "Delivery timed out, packet dropped"
                    );
                }
                Delivery::Closed => {
                    report.closed += 1;
                    slot.retire();
                    debug!(
                        subscriber = %slot.id,
                        endpoint = slot.endpoint.name(),
                        "Subscriber closed, retiring"
                    );
                }
            }
        }

        if report.closed > 0 {
            self.lock_registry().prune_retired();
        }

        trace!(
            delivered = report.delivered,
            dropped = report.dropped,
            timed_out = report.timed_out,
            "Broadcast complete"
        );

        report
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.lock_registry()
            .slots
            .iter()
            .filter(|slot| !slot.is_retired())
            .count()
    }

    /// Metrics for every live subscriber, in registration order
    pub fn metrics(&self) -> Vec<(SubscriberId, String, MetricsSnapshot)> {
        self.lock_registry()
            .slots
            .iter()
            .filter(|slot| !slot.is_retired())
            .map(|slot| {
                (
                    slot.id,
                    slot.endpoint.name().to_string(),
                    slot.endpoint.metrics().snapshot(),
                )
            })
            .collect()
    }

    /// Copy the live subscriber list, pruning retired slots on the way
    fn snapshot(&self) -> Vec<Arc<Slot>> {
        let mut registry = self.lock_registry();
        registry.prune_retired();
        registry.slots.clone()
    }

    // Every critical section leaves the list consistent, so a panic in
    // another thread does not invalidate it.
    fn lock_registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a running subscriber from a resolved interface spec
#[instrument(
    name = "distributor_create_subscriber",
    skip(spec, distributor),
    fields(interface = %spec.interface, handler = ?spec.handler)
)]
pub async fn create_subscriber_handle(
    spec: &SubscriberSpec,
    distributor: &Distributor,
) -> Result<SubscriberHandle, DistributorError> {
    let name = format!("{}-{}", spec.interface, spec.handler.label());
    let capacity = spec.queue_capacity;
    let policy = spec.policy;

    match spec.handler {
        HandlerType::Log => {
            let handler = LogHandler::new(&name, spec.interface.clone());
            Ok(SubscriberHandle::spawn(handler, distributor, capacity, policy))
        }
        HandlerType::File => {
            let handler = FileHandler::from_params(&name, spec.interface.clone(), &spec.params)
                .map_err(|e| DistributorError::handler_creation(&name, e.to_string()))?;
            Ok(SubscriberHandle::spawn(handler, distributor, capacity, policy))
        }
        HandlerType::Network => {
            let handler =
                NetworkHandler::from_params(&name, spec.interface.clone(), &spec.params)
                    .await
                    .map_err(|e| DistributorError::handler_creation(&name, e.to_string()))?;
            Ok(SubscriberHandle::spawn(handler, distributor, capacity, policy))
        }
        HandlerType::Counting => {
            let (handler, _counters) =
                CountingHandler::from_params(&name, spec.interface.clone(), &spec.params);
            Ok(SubscriberHandle::spawn(handler, distributor, capacity, policy))
        }
    }
}

/// Create and register one subscriber per spec, in order
#[instrument(
    name = "distributor_spawn_subscribers",
    skip(specs, distributor),
    fields(subscriber_count = specs.len())
)]
pub async fn spawn_subscribers(
    specs: &[SubscriberSpec],
    distributor: &Distributor,
) -> Result<Vec<SubscriberHandle>, DistributorError> {
    let mut handles = Vec::with_capacity(specs.len());
    for spec in specs {
        match create_subscriber_handle(spec, distributor).await {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                for handle in handles {
                    handle.shutdown().await;
                }
                return Err(e);
            }
        }
    }
    Ok(handles)
}
