//! # Config Loader
//!
//! Loads and validates the service blueprint.
//!
//! TOML is the primary format; JSON is accepted by extension. Every load
//! runs the cross-field validation in [`validator`], so a blueprint that
//! comes out of this crate is safe to hand to the pipeline.
//!
//! # Example
//!
//! ```no_run
//! let blueprint = config_loader::load(std::path::Path::new("config.toml")).unwrap();
//! println!("Service: {}", blueprint.service.name);
//! ```

mod validator;

pub use contracts::ServiceBlueprint;

use contracts::ContractError;
use std::path::Path;

/// Configuration file format, inferred from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Load and validate a blueprint from a file.
///
/// # Errors
/// File read failure, unsupported extension, parse failure, or validation
/// failure.
pub fn load(path: &Path) -> Result<ServiceBlueprint, ContractError> {
    let format = format_for(path)?;
    let content = std::fs::read_to_string(path)?;
    from_str(&content, format)
}

/// Parse and validate a blueprint from a string.
pub fn from_str(content: &str, format: ConfigFormat) -> Result<ServiceBlueprint, ContractError> {
    let blueprint: ServiceBlueprint = match format {
        ConfigFormat::Toml => toml::from_str(content)
            .map_err(|e| ContractError::ConfigParse(format!("TOML parse error: {e}")))?,
        ConfigFormat::Json => serde_json::from_str(content)
            .map_err(|e| ContractError::ConfigParse(format!("JSON parse error: {e}")))?,
    };

    validator::validate(&blueprint)?;
    Ok(blueprint)
}

/// Serialize a blueprint to TOML.
pub fn to_toml(blueprint: &ServiceBlueprint) -> Result<String, ContractError> {
    toml::to_string_pretty(blueprint)
        .map_err(|e| ContractError::ConfigParse(format!("TOML serialize error: {e}")))
}

/// Serialize a blueprint to JSON.
pub fn to_json(blueprint: &ServiceBlueprint) -> Result<String, ContractError> {
    serde_json::to_string_pretty(blueprint)
        .map_err(|e| ContractError::ConfigParse(format!("JSON serialize error: {e}")))
}

fn format_for(path: &Path) -> Result<ConfigFormat, ContractError> {
    let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
        ContractError::ConfigParse("cannot determine file format from extension".to_string())
    })?;

    ConfigFormat::from_extension(ext)
        .ok_or_else(|| ContractError::ConfigParse(format!("unsupported config format: .{ext}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_TOML: &str = r#"
[service]
name = "cep-test"

[input]
bind_host = "127.0.0.1"
bind_port = 1884
topic = "engine/+/positions"

[directory]
base_url = "https://cfg.test/api/dongles?macAddress={}"
username = "admin"
password = "secret"

[[sinks]]
name = "log_sink"
sink_type = "log"
"#;

    #[test]
    fn test_load_minimal_toml() {
        let result = from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.service.name, "cep-test");
        assert_eq!(bp.input.bind_port, 1884);
        // Untouched estimator section picks up all calibrated defaults
        assert_eq!(bp.estimator.gates.max_rssi_delta_db, 12.0);
    }

    #[test]
    fn test_toml_round_trip() {
        let bp = from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = to_toml(&bp).unwrap();
        let bp2 = from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.service.name, bp2.service.name);
        assert_eq!(bp.sinks.len(), bp2.sinks.len());
        assert_eq!(
            bp.estimator.scoring.cep95_table,
            bp2.estimator.scoring.cep95_table
        );
    }

    #[test]
    fn test_json_round_trip() {
        let bp = from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = to_json(&bp).unwrap();
        let bp2 = from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(bp.service.name, bp2.service.name);
    }

    #[test]
    fn test_parse_error_reported() {
        let result = from_str("not toml [[[", ConfigFormat::Toml);
        assert!(matches!(
            result,
            Err(contracts::ContractError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_validation_runs_after_parse() {
        // Duplicate sink names parse fine but must fail validation
        let content = r#"
[service]
name = "cep-test"

[directory]
base_url = "https://cfg.test/api/dongles?macAddress={}"

[[sinks]]
name = "out"
sink_type = "log"

[[sinks]]
name = "out"
sink_type = "log"
"#;
        let result = from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
        assert!(load(Path::new("config.yaml")).is_err());
    }

    #[test]
    fn test_estimator_overrides_survive_load() {
        let content = r#"
[service]
name = "cep-test"

[directory]
base_url = "https://cfg.test/api/dongles?macAddress={}"

[estimator.selection]
max_significant = 3

[estimator.health]
z_source = "post_update"
"#;
        let bp = from_str(content, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.estimator.selection.max_significant, 3);
        assert_eq!(
            bp.estimator.health.z_source,
            contracts::HealthZSource::PostUpdate
        );
        // Sibling fields keep defaults
        assert_eq!(bp.estimator.selection.rssi_band_db, 10.0);
        assert_eq!(bp.estimator.health.lambda, 0.05);
    }
}
