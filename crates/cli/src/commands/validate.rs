//! `validate` command implementation.

use anyhow::Result;

use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    if !args.config.exists() {
        return Err(CliError::ConfigNotFound {
            path: args.config.display().to_string(),
        }
        .into());
    }

    match config_loader::load(&args.config) {
        Ok(blueprint) => {
            if args.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "valid": true,
                        "service": blueprint.service.name,
                        "sinks": blueprint.sinks.len(),
                    })
                );
            } else {
                println!(
                    "Configuration OK: service '{}', {} sink(s)",
                    blueprint.service.name,
                    blueprint.sinks.len()
                );
            }
            Ok(())
        }
        Err(e) => {
            if args.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "valid": false,
                        "error": e.to_string(),
                    })
                );
            } else {
                eprintln!("Configuration invalid: {e}");
            }
            Err(e.into())
        }
    }
}
