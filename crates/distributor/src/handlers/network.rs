//! NetworkHandler - forwards raw frames over UDP

use contracts::{ContractError, Envelope, InterfaceId, PacketHandler};
use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::{debug, error, instrument, warn};

/// Largest UDP payload over IPv4
const MAX_DATAGRAM: usize = 65_507;

/// Configuration for NetworkHandler
#[derive(Debug, Clone)]
pub struct NetworkHandlerConfig {
    /// Target address
    pub addr: SocketAddr,
    /// Frames longer than this are cut before sending
    pub max_packet_size: usize,
}

impl NetworkHandlerConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;

        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e| format!("invalid address '{}': {}", addr_str, e))?;

        let max_packet_size = params
            .get("max_packet_size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(MAX_DATAGRAM)
            .min(MAX_DATAGRAM);

        Ok(Self {
            addr,
            max_packet_size,
        })
    }
}

/// Handler that re-emits each foreign frame as one UDP datagram
///
/// Stands in for transmitting on the interface: the datagram payload is
/// the raw captured frame.
pub struct NetworkHandler {
    name: String,
    interface: InterfaceId,
    config: NetworkHandlerConfig,
    socket: Option<UdpSocket>,
}

impl NetworkHandler {
    /// Create a new NetworkHandler
    #[instrument(name = "network_handler_new", skip(name, interface, config))]
    pub async fn new(
        name: impl Into<String>,
        interface: impl Into<InterfaceId>,
        config: NetworkHandlerConfig,
    ) -> std::io::Result<Self> {
        let name = name.into();
        let bind = if config.addr.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(bind).await?;
        socket.connect(&config.addr).await?;

        debug!(
            handler = %name,
            target = %config.addr,
            "NetworkHandler connected"
        );

        Ok(Self {
            name,
            interface: interface.into(),
            config,
            socket: Some(socket),
        })
    }

    /// Create from params (for factory)
    #[instrument(name = "network_handler_from_params", skip(name, interface, params))]
    pub async fn from_params(
        name: impl Into<String>,
        interface: InterfaceId,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkHandlerConfig::from_params(params)
            .map_err(|e| ContractError::handler_connection(&name, e))?;

        Self::new(name.clone(), interface, config)
            .await
            .map_err(|e| ContractError::handler_connection(&name, e.to_string()))
    }

    fn socket(&self) -> Result<&UdpSocket, ContractError> {
        self.socket
            .as_ref()
            .ok_or_else(|| ContractError::handler_write(&self.name, "socket not connected"))
    }

    fn frame_bytes<'a>(&self, envelope: &'a Envelope) -> &'a [u8] {
        let data = &envelope.packet().data;
        if data.len() > self.config.max_packet_size {
            warn!(
                handler = %self.name,
                size = data.len(),
                max = self.config.max_packet_size,
                "Frame too large, truncating"
            );
            &data[..self.config.max_packet_size]
        } else {
            data
        }
    }

    async fn transmit(
        &self,
        socket: &UdpSocket,
        data: &[u8],
        sequence: u64,
    ) -> Result<(), ContractError> {
        match socket.send(data).await {
            Ok(sent) => {
                debug!(handler = %self.name, sequence, bytes = sent, "Sent");
                Ok(())
            }
            Err(e) => {
                error!(handler = %self.name, sequence, error = %e, "UDP send failed");
                Err(ContractError::handler_write(&self.name, e.to_string()))
            }
        }
    }
}

impl PacketHandler for NetworkHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn interface(&self) -> &InterfaceId {
        &self.interface
    }

    #[instrument(
        name = "network_handler_handle",
        skip(self, envelope),
        fields(handler = %self.name, sequence = envelope.packet().meta.sequence)
    )]
    async fn handle(&mut self, envelope: &Envelope) -> Result<(), ContractError> {
        let socket = self.socket()?;
        let data = self.frame_bytes(envelope);
        self.transmit(socket, data, envelope.packet().meta.sequence)
            .await
    }

    #[instrument(name = "network_handler_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // UDP doesn't buffer
        Ok(())
    }

    #[instrument(name = "network_handler_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        debug!(handler = %self.name, "NetworkHandler closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Packet;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_network_handler_config_parsing() {
        let mut params = HashMap::new();
        params.insert("addr".to_string(), "127.0.0.1:9999".to_string());
        params.insert("max_packet_size".to_string(), "1500".to_string());

        let config = NetworkHandlerConfig::from_params(&params).unwrap();
        assert_eq!(config.addr.port(), 9999);
        assert_eq!(config.max_packet_size, 1500);
    }

    #[test]
    fn test_network_handler_config_missing_addr() {
        let err = NetworkHandlerConfig::from_params(&HashMap::new()).unwrap_err();
        assert!(err.contains("addr"));
    }

    #[tokio::test]
    async fn test_network_handler_forwards_raw_frame() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = NetworkHandlerConfig {
            addr: receiver.local_addr().unwrap(),
            max_packet_size: MAX_DATAGRAM,
        };

        let mut handler = NetworkHandler::new("test_net", "eth1", config).await.unwrap();
        let frame = vec![0xAB_u8; 60];
        let envelope = Envelope::new(Arc::new(Packet::new(frame.clone(), 0, 1)), "eth0".into());
        handler.handle(&envelope).await.unwrap();

        let mut buf = [0u8; 128];
        let (len, _) = tokio::time::timeout(Duration::from_secs(1), receiver.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..len], frame.as_slice());
    }

    #[tokio::test]
    async fn test_send_failure_is_reported() {
        // Never connected, so every send fails with "destination address required"
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut handler = NetworkHandler {
            name: "test_net".to_string(),
            interface: "eth1".into(),
            config: NetworkHandlerConfig {
                addr: "127.0.0.1:9".parse().unwrap(),
                max_packet_size: MAX_DATAGRAM,
            },
            socket: Some(socket),
        };

        let envelope = Envelope::new(Arc::new(Packet::new(vec![0u8; 60], 0, 1)), "eth0".into());
        let result = handler.handle(&envelope).await;
        assert!(matches!(result, Err(ContractError::HandlerWrite { .. })));
    }

    #[tokio::test]
    async fn test_handle_after_close_fails() {
        let config = NetworkHandlerConfig {
            addr: "127.0.0.1:19998".parse().unwrap(),
            max_packet_size: MAX_DATAGRAM,
        };

        let mut handler = NetworkHandler::new("test_net", "eth1", config).await.unwrap();
        handler.close().await.unwrap();

        let envelope = Envelope::new(Arc::new(Packet::new(vec![0u8; 60], 0, 1)), "eth0".into());
        assert!(handler.handle(&envelope).await.is_err());
    }
}
