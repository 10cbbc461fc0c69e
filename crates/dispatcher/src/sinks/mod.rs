//! Sink implementations and the factory that builds them from config.

mod file;
mod log;
mod network;

pub use file::{FileSink, FileSinkConfig};
pub use log::LogSink;
pub use network::NetworkSink;

use contracts::{ContractError, Estimate, SinkConfig, SinkType};

/// Behaviour of one estimate sink.
///
/// `shutdown` is the last call a sink receives; buffered sinks flush there.
#[trait_variant::make(EstimateSink: Send)]
pub trait LocalEstimateSink {
    /// Deliver one processed estimate.
    async fn write(&mut self, estimate: &Estimate) -> Result<(), ContractError>;

    /// Flush and release resources.
    async fn shutdown(&mut self) -> Result<(), ContractError>;
}

/// A configured sink, dispatched at runtime.
pub enum Sink {
    Log(LogSink),
    File(FileSink),
    Network(NetworkSink),
}

/// Build a sink from its blueprint entry.
pub async fn build_sink(config: &SinkConfig) -> Result<Sink, ContractError> {
    match config.sink_type {
        SinkType::Log => Ok(Sink::Log(LogSink::new(&config.name))),
        SinkType::File => FileSink::from_params(&config.name, &config.params)
            .map(Sink::File)
            .map_err(|e| ContractError::sink(&config.name, e.to_string())),
        SinkType::Network => NetworkSink::from_params(&config.name, &config.params)
            .await
            .map(Sink::Network),
    }
}

impl EstimateSink for Sink {
    async fn write(&mut self, estimate: &Estimate) -> Result<(), ContractError> {
        match self {
            Sink::Log(sink) => EstimateSink::write(sink, estimate).await,
            Sink::File(sink) => EstimateSink::write(sink, estimate).await,
            Sink::Network(sink) => EstimateSink::write(sink, estimate).await,
        }
    }

    async fn shutdown(&mut self) -> Result<(), ContractError> {
        match self {
            Sink::Log(sink) => EstimateSink::shutdown(sink).await,
            Sink::File(sink) => EstimateSink::shutdown(sink).await,
            Sink::Network(sink) => EstimateSink::shutdown(sink).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_build_log_sink() {
        let config = SinkConfig {
            name: "out".into(),
            sink_type: SinkType::Log,
            queue_capacity: 10,
            params: HashMap::new(),
        };
        assert!(matches!(build_sink(&config).await, Ok(Sink::Log(_))));
    }

    #[tokio::test]
    async fn test_build_network_sink_without_addr_fails() {
        let config = SinkConfig {
            name: "net".into(),
            sink_type: SinkType::Network,
            queue_capacity: 10,
            params: HashMap::new(),
        };
        assert!(matches!(
            build_sink(&config).await,
            Err(ContractError::Sink { .. })
        ));
    }
}
