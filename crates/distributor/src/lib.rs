//! # Distributor
//!
//! Packet fan-out module.
//!
//! Responsibilities:
//! - Register subscriber endpoints
//! - Broadcast every captured packet to all registered endpoints
//! - Bound the damage a slow subscriber can do via per-endpoint policy
//! - Run consumer workers that skip self-originated packets
//!
//! ```text
//! capture(eth0) ──┐                        ┌──► [queue eth0] ──► worker ──► handler(eth0)
//!                 ├──► Distributor::send ──┼──► [queue eth1] ──► worker ──► handler(eth1)
//! capture(eth1) ──┘                        └──► [queue eth2] ──► worker ──► handler(eth2)
//! ```

pub mod distributor;
pub mod endpoint;
pub mod error;
pub mod handle;
pub mod handlers;
pub mod metrics;

pub use contracts::{DeliveryPolicy, DeliveryReport, Envelope, InterfaceId, Packet, PacketHandler};
pub use distributor::{create_subscriber_handle, spawn_subscribers, Distributor, SubscriberId};
pub use endpoint::{Delivery, Endpoint};
pub use error::DistributorError;
pub use handle::SubscriberHandle;
pub use handlers::{
    CountingHandler, CountingProbe, FileHandler, FileHandlerConfig, LogHandler, NetworkHandler,
    NetworkHandlerConfig, Received,
};
pub use metrics::{MetricsSnapshot, SubscriberMetrics};
