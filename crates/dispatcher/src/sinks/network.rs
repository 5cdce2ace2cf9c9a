//! NetworkSink - UDP fire-and-forget streaming of publication batches

use contracts::{ContractError, PublicationBatch, StateSink};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, error, instrument, warn};

/// Configuration for NetworkSink
#[derive(Debug, Clone)]
pub struct NetworkSinkConfig {
    /// Target address
    pub addr: SocketAddr,
    /// Max packet size (UDP typically 65507 for IPv4)
    pub max_packet_size: usize,
}

impl NetworkSinkConfig {
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
            .unwrap_or(65000);

        Ok(Self {
            addr,
            max_packet_size,
        })
    }
}

/// Sink that sends publication batches over UDP as JSON
pub struct NetworkSink {
    name: String,
    config: NetworkSinkConfig,
    socket: Option<UdpSocket>,
}

impl NetworkSink {
    /// Create a new NetworkSink
    #[instrument(name = "network_sink_new", skip(name, config))]
    pub async fn new(name: impl Into<String>, config: NetworkSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        let bind: SocketAddr = if config.addr.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind).await?;
        socket.connect(&config.addr).await?;

        debug!(
            sink = %name,
            target = %config.addr,
            "NetworkSink connected"
        );

        Ok(Self {
            name,
            config,
            socket: Some(socket),
        })
    }

    /// Create from params (for factory)
    #[instrument(name = "network_sink_from_params", skip(name, params))]
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkSinkConfig::from_params(params)
            .map_err(|e| ContractError::sink_write(&name, e))?;

        Self::new(name.clone(), config)
            .await
            .map_err(|e| ContractError::SinkConnection {
                sink_name: name,
                message: e.to_string(),
            })
    }

    fn socket(&self) -> Result<&UdpSocket, ContractError> {
        self.socket
            .as_ref()
            .ok_or_else(|| ContractError::sink_write(&self.name, "socket not connected"))
    }

    /// Serialize a batch into one or more datagrams
    ///
    /// A batch larger than `max_packet_size` is split into single-publication
    /// batches; a single publication that still does not fit is skipped.
    fn prepare_payloads(&self, batch: &PublicationBatch) -> Result<Vec<Vec<u8>>, ContractError> {
        let data = serde_json::to_vec(batch)
            .map_err(|e| ContractError::sink_write(&self.name, format!("json error: {}", e)))?;

        if data.len() <= self.config.max_packet_size {
            return Ok(vec![data]);
        }

        warn!(
            sink = %self.name,
            size = data.len(),
            max = self.config.max_packet_size,
            "Packet too large, splitting batch"
        );

        let mut payloads = Vec::with_capacity(batch.len());
        for publication in &batch.publications {
            let single = PublicationBatch::new(
                batch.source_id.clone(),
                batch.timestamp_ms,
                vec![publication.clone()],
            );
            let data = serde_json::to_vec(&single)
                .map_err(|e| ContractError::sink_write(&self.name, format!("json error: {}", e)))?;
            if data.len() > self.config.max_packet_size {
                warn!(sink = %self.name, state = %publication.state_id, "Publication too large, skipped");
                continue;
            }
            payloads.push(data);
        }
        Ok(payloads)
    }

    async fn transmit(&self, socket: &UdpSocket, data: &[u8]) {
        match socket.send(data).await {
            Ok(sent) => {
                debug!(sink = %self.name, bytes = sent, "Sent");
            }
            Err(e) => {
                // Log but don't fail - UDP is best-effort
                error!(sink = %self.name, error = %e, "UDP send failed");
            }
        }
    }
}

impl StateSink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_sink_write",
        skip(self, batch),
        fields(sink = %self.name, publications = batch.len())
    )]
    async fn write(&mut self, batch: &PublicationBatch) -> Result<(), ContractError> {
        let socket = self.socket()?;
        for data in self.prepare_payloads(batch)? {
            self.transmit(socket, &data).await;
        }
        Ok(())
    }

    #[instrument(name = "network_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // UDP doesn't buffer
        Ok(())
    }

    #[instrument(name = "network_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        debug!(sink = %self.name, "NetworkSink closed");
        Ok(())
    }
}
