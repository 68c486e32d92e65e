//! Envelope - Distributor output
//!
//! The unit handed to every subscriber on each broadcast.

use std::sync::Arc;

use crate::{InterfaceId, Packet};

/// A packet plus the interface it was captured on.
///
/// Immutable once built. Each subscriber receives its own `Envelope`,
/// but all envelopes from one broadcast point at the same `Arc<Packet>`.
#[derive(Debug, Clone)]
pub struct Envelope {
    packet: Arc<Packet>,
    source: InterfaceId,
}

impl Envelope {
    /// Wrap a shared packet with its source interface
    pub fn new(packet: Arc<Packet>, source: InterfaceId) -> Self {
        Self { packet, source }
    }

    /// The captured packet
    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    /// Shared handle to the captured packet
    pub fn shared_packet(&self) -> &Arc<Packet> {
        &self.packet
    }

    /// Interface the packet arrived on
    pub fn source(&self) -> &InterfaceId {
        &self.source
    }

    /// True when the packet was captured on `interface`.
    ///
    /// Consumers bridging traffic use this to discard their own packets;
    /// the distributor never does.
    pub fn originated_from(&self, interface: &str) -> bool {
        self.source == *interface
    }

    /// Consume the envelope, returning its parts
    pub fn into_parts(self) -> (Arc<Packet>, InterfaceId) {
        (self.packet, self.source)
    }
}
