//! ServiceBlueprint - Config Loader output
//!
//! Describes the complete service configuration: ingress bus, anchor
//! directory endpoint, estimator tuning, output routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::EstimatorConfig;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete service configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServiceBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Service identity
    #[validate(nested)]
    pub service: ServiceConfig,

    /// Fix ingress settings
    #[serde(default)]
    #[validate(nested)]
    pub input: InputConfig,

    /// Anchor coordinate directory endpoint (optional in mock runs)
    #[serde(default)]
    #[validate(nested)]
    pub directory: Option<DirectoryConfig>,

    /// Estimator tuning overrides (defaults apply to anything omitted)
    #[serde(default)]
    pub estimator: EstimatorConfig,

    /// Output routing configuration
    #[serde(default)]
    #[validate(nested)]
    pub sinks: Vec<SinkConfig>,
}

/// Service identity
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServiceConfig {
    /// Deployment name, used in logs and metrics labels
    #[validate(length(min = 1, message = "service name cannot be empty"))]
    pub name: String,
}

/// Fix ingress settings.
///
/// The pub/sub broker itself is an external collaborator; the service binds
/// a local endpoint the bridge delivers messages to. The topic string is
/// carried for routing parity with the broker configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InputConfig {
    /// Bind host for the ingress listener
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// Bind port for the ingress listener
    #[serde(default = "default_bind_port")]
    #[validate(range(min = 1, max = 65535))]
    pub bind_port: u16,

    /// Position-stream topic on the upstream bus
    #[serde(default = "default_input_topic")]
    pub topic: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            bind_port: default_bind_port(),
            topic: default_input_topic(),
        }
    }
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_bind_port() -> u16 {
    1884
}

fn default_input_topic() -> String {
    "engine/+/positions".to_string()
}

/// Anchor coordinate directory endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DirectoryConfig {
    /// URL template; `{}` is replaced with the anchor MAC
    #[validate(length(min = 1, message = "base_url cannot be empty"))]
    pub base_url: String,

    /// Basic-auth username
    #[serde(default)]
    pub username: String,

    /// Basic-auth password
    #[serde(default)]
    pub password: String,

    /// Request timeout in seconds
    #[serde(default = "default_directory_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_directory_timeout_secs() -> u64 {
    30
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    /// Sink name
    #[validate(length(min = 1, message = "sink name cannot be empty"))]
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// File output (JSON lines)
    File,
    /// Network output (UDP publish)
    Network,
}
