//! LogHandler - logs packet summary via tracing

use contracts::{ContractError, Envelope, InterfaceId, PacketHandler};
use tracing::{info, instrument};

/// Handler that logs packet summaries for debugging
pub struct LogHandler {
    name: String,
    interface: InterfaceId,
}

impl LogHandler {
    /// Create a new LogHandler for the given interface
    pub fn new(name: impl Into<String>, interface: impl Into<InterfaceId>) -> Self {
        Self {
            name: name.into(),
            interface: interface.into(),
        }
    }

    fn log_packet_summary(&self, envelope: &Envelope) {
        let meta = &envelope.packet().meta;

        info!(
            handler = %self.name,
            out = %self.interface,
            source = %envelope.source(),
            sequence = meta.sequence,
            timestamp_us = meta.timestamp_us,
            len = meta.captured_len,
            truncated = envelope.packet().is_truncated(),
            "Packet forwarded"
        );
    }
}

impl PacketHandler for LogHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn interface(&self) -> &InterfaceId {
        &self.interface
    }

    #[instrument(
        name = "log_handler_handle",
        skip(self, envelope),
        fields(handler = %self.name, sequence = envelope.packet().meta.sequence)
    )]
    async fn handle(&mut self, envelope: &Envelope) -> Result<(), ContractError> {
        self.log_packet_summary(envelope);
        Ok(())
    }

    #[instrument(name = "log_handler_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Nothing to flush for log handler
        Ok(())
    }

    #[instrument(name = "log_handler_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(handler = %self.name, "LogHandler closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Packet;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_log_handler_handle() {
        let mut handler = LogHandler::new("test_log", "eth1");
        let envelope = Envelope::new(Arc::new(Packet::new(vec![0u8; 60], 1, 1)), "eth0".into());

        let result = handler.handle(&envelope).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_log_handler_identity() {
        let handler = LogHandler::new("my_logger", "eth2");
        assert_eq!(handler.name(), "my_logger");
        assert_eq!(handler.interface(), &InterfaceId::from("eth2"));
    }
}
