//! Configuration validation
//!
//! Rules:
//! - service name non-empty
//! - directory base_url carries the `{}` placeholder, timeout > 0
//! - estimator tuning within sane ranges (λ, thresholds, dof, windows)
//! - CEP95 table non-empty, confidence ascending, radius non-increasing
//! - sink names non-empty and unique; network sinks carry an `addr`

use std::collections::HashSet;

use contracts::{ContractError, ServiceBlueprint, SinkType};

/// Validate a blueprint.
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    validate_service(blueprint)?;
    validate_directory(blueprint)?;
    validate_estimator(blueprint)?;
    validate_cep_table(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

fn validate_service(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    if blueprint.service.name.is_empty() {
        return Err(ContractError::config_validation(
            "service.name",
            "service name cannot be empty",
        ));
    }
    Ok(())
}

fn validate_directory(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    let Some(directory) = &blueprint.directory else {
        return Ok(());
    };

    if !directory.base_url.contains("{}") {
        return Err(ContractError::config_validation(
            "directory.base_url",
            "base_url must contain the '{}' anchor-id placeholder",
        ));
    }
    if directory.timeout_secs == 0 {
        return Err(ContractError::config_validation(
            "directory.timeout_secs",
            "timeout must be at least 1 second",
        ));
    }
    Ok(())
}

fn validate_estimator(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    let estimator = &blueprint.estimator;

    if estimator.selection.max_significant == 0 {
        return Err(ContractError::config_validation(
            "estimator.selection.max_significant",
            "at least one significant anchor is required",
        ));
    }
    if estimator.selection.rssi_band_db <= 0.0 {
        return Err(ContractError::config_validation(
            "estimator.selection.rssi_band_db",
            "RSSI band must be positive",
        ));
    }

    let lambda = estimator.health.lambda;
    if !(lambda > 0.0 && lambda < 1.0) {
        return Err(ContractError::config_validation(
            "estimator.health.lambda",
            format!("lambda must be in (0, 1), got {lambda}"),
        ));
    }
    if estimator.health.warning_threshold >= estimator.health.faulty_threshold {
        return Err(ContractError::config_validation(
            "estimator.health.warning_threshold",
            "warning threshold must be below the faulty threshold",
        ));
    }

    if estimator.scoring.student_t_dof < 2 {
        return Err(ContractError::config_validation(
            "estimator.scoring.student_t_dof",
            "degrees of freedom must be at least 2",
        ));
    }
    if estimator.scoring.score_scale <= 0.0 {
        return Err(ContractError::config_validation(
            "estimator.scoring.score_scale",
            "score scale must be positive",
        ));
    }

    let kalman = &estimator.kalman;
    if kalman.min_window == 0 || kalman.window_cap < kalman.min_window {
        return Err(ContractError::config_validation(
            "estimator.kalman",
            format!(
                "window_cap ({}) must be >= min_window ({}) and min_window >= 1",
                kalman.window_cap, kalman.min_window
            ),
        ));
    }
    if kalman.process_alpha <= 0.0 || kalman.measurement_beta <= 0.0 {
        return Err(ContractError::config_validation(
            "estimator.kalman",
            "adaptation factors must be positive",
        ));
    }
    if kalman.initial_sigma_db <= 0.0 {
        return Err(ContractError::config_validation(
            "estimator.kalman.initial_sigma_db",
            "initial sigma must be positive",
        ));
    }

    let path_loss = &estimator.path_loss;
    if path_loss.reference_distance_m <= 0.0 || path_loss.sigma_db <= 0.0 {
        return Err(ContractError::config_validation(
            "estimator.path_loss",
            "reference distance and sigma must be positive",
        ));
    }

    Ok(())
}

fn validate_cep_table(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    let table = &blueprint.estimator.scoring.cep95_table;

    if table.is_empty() {
        return Err(ContractError::config_validation(
            "estimator.scoring.cep95_table",
            "calibration table cannot be empty",
        ));
    }

    for pair in table.windows(2) {
        let (p0, r0) = pair[0];
        let (p1, r1) = pair[1];
        if p1 <= p0 {
            return Err(ContractError::config_validation(
                "estimator.scoring.cep95_table",
                format!("confidence knots must be strictly ascending ({p0} then {p1})"),
            ));
        }
        if r1 > r0 {
            return Err(ContractError::config_validation(
                "estimator.scoring.cep95_table",
                format!("radius must be non-increasing ({r0} then {r1})"),
            ));
        }
    }

    Ok(())
}

fn validate_sinks(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].name"),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(&sink.name) {
            return Err(ContractError::config_validation(
                format!("sinks[id={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.sink_type == SinkType::Network && !sink.params.contains_key("addr") {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params", sink.name),
                "network sink requires an 'addr' parameter",
            ));
        }
    }
    Ok(())
}
