//! PacketHandler trait - subscriber worker output interface
//!
//! Defines what a subscriber does with each envelope it drains.

use crate::{ContractError, Envelope, InterfaceId};

/// Consumer-side packet handler
///
/// A handler stands for one interface of the bridge. The worker that
/// drives it skips envelopes captured on `interface()` before calling
/// `handle`, so implementations only see foreign traffic.
#[trait_variant::make(PacketHandler: Send)]
pub trait LocalPacketHandler {
    /// Handler name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Interface this handler represents
    fn interface(&self) -> &InterfaceId;

    /// Process one envelope
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn handle(&mut self, envelope: &Envelope) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close handler
    async fn close(&mut self) -> Result<(), ContractError>;
}
