//! NetworkSink - best-effort UDP publication of error reports
//!
//! One datagram carries one wire report (json or bincode); the internal
//! diagnostics never leave the process. Delivery is fire-and-forget, so a
//! dead receiver costs nothing but the report.

use contracts::{ContractError, ErrorReport, Estimate};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, error, warn};

use crate::sinks::EstimateSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WireFormat {
    Json,
    Bincode,
}

/// Sink that publishes reports over UDP.
pub struct NetworkSink {
    name: String,
    socket: UdpSocket,
    format: WireFormat,
    max_packet: usize,
}

impl NetworkSink {
    /// Build from sink params: `addr` (required), `format` (json|bincode),
    /// `max_packet_size`.
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();

        let target: SocketAddr = params
            .get("addr")
            .ok_or_else(|| ContractError::sink(&name, "missing 'addr' parameter"))?
            .parse()
            .map_err(|e| ContractError::sink(&name, format!("invalid address: {e}")))?;

        let format = match params.get("format").map(String::as_str) {
            Some("bincode") => WireFormat::Bincode,
            Some("json") | None => WireFormat::Json,
            Some(other) => {
                return Err(ContractError::sink(&name, format!("unknown format '{other}'")))
            }
        };

        let max_packet = params
            .get("max_packet_size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(65_000);

        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| ContractError::sink(&name, format!("bind failed: {e}")))?;
        socket
            .connect(target)
            .await
            .map_err(|e| ContractError::sink(&name, format!("connect failed: {e}")))?;

        debug!(sink = %name, target = %target, "network sink connected");

        Ok(Self {
            name,
            socket,
            format,
            max_packet,
        })
    }

    fn encode(&self, report: &ErrorReport) -> Result<Vec<u8>, ContractError> {
        match self.format {
            WireFormat::Json => serde_json::to_vec(report)
                .map_err(|e| ContractError::sink(&self.name, format!("json encode: {e}"))),
            WireFormat::Bincode => bincode::serialize(report)
                .map_err(|e| ContractError::sink(&self.name, format!("bincode encode: {e}"))),
        }
    }
}

impl EstimateSink for NetworkSink {
    async fn write(&mut self, estimate: &Estimate) -> Result<(), ContractError> {
        let payload = self.encode(&estimate.report)?;

        if payload.len() > self.max_packet {
            warn!(
                sink = %self.name,
                size = payload.len(),
                max = self.max_packet,
                "report exceeds configured packet size"
            );
        }

        match self.socket.send(&payload).await {
            Ok(sent) => {
                debug!(sink = %self.name, tag = %estimate.report.tag_mac, bytes = sent, "published");
            }
            Err(e) => {
                // UDP is best-effort; log and move on
                error!(sink = %self.name, error = %e, "UDP send failed");
            }
        }

        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, "network sink closed");
        Ok(())
    }
}
