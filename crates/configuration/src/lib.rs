use std::path::Path;

use crate::error::ConfigError;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    AuditConfig, Columns, DetectorKind, LatestSettings, Logging, PeerSettings, RollingSettings,
    Thresholds,
};

/// Prefix of environment overrides, e.g. `AUDIT__ROLLING__WINDOW=12`.
pub const ENV_PREFIX: &str = "AUDIT";

/// Loads the audit configuration.
///
/// Sources, lowest priority first: built-in defaults, the TOML file at `path`
/// (or `audit.toml` in the working directory if present), then `AUDIT__*`
/// environment variables. The result is validated before it is returned.
pub fn load_config(path: Option<&Path>) -> Result<AuditConfig, ConfigError> {
    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name("audit.toml").required(false),
    };

    let builder = config::Config::builder().add_source(file).add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    finish(builder)
}

/// Parses a configuration from TOML text, without environment overrides.
pub fn config_from_str(toml: &str) -> Result<AuditConfig, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml));
    finish(builder)
}

fn finish(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<AuditConfig, ConfigError> {
    // Attempt to deserialize the entire configuration into our `AuditConfig` struct
    let config = builder.build()?.try_deserialize::<AuditConfig>()?;
    validate(&config)?;
    Ok(config)
}

/// Rejects parameter combinations the scanners cannot run with.
pub fn validate(config: &AuditConfig) -> Result<(), ConfigError> {
    let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

    if config.columns.value.trim().is_empty() {
        return invalid("columns.value must name a column".to_string());
    }
    if config.columns.period.columns().iter().any(|c| c.trim().is_empty()) {
        return invalid("columns.period must name a column".to_string());
    }

    let t = &config.thresholds;
    for (name, value) in [
        ("thresholds.k", t.k),
        ("thresholds.pct_threshold_1", t.pct_threshold_1),
        ("thresholds.pct_threshold_2", t.pct_threshold_2),
    ] {
        if !value.is_finite() || value < 0.0 {
            return invalid(format!("{name} must be a non-negative number, got {value}"));
        }
    }

    if config.rolling.window == 0 {
        return invalid("rolling.window must be at least 1".to_string());
    }

    let peer = &config.peer;
    if !(peer.contamination > 0.0 && peer.contamination <= 0.5) {
        return invalid(format!(
            "peer.contamination must be in (0, 0.5], got {}",
            peer.contamination
        ));
    }
    if !peer.z_threshold.is_finite() || peer.z_threshold < 0.0 {
        return invalid(format!(
            "peer.z_threshold must be a non-negative number, got {}",
            peer.z_threshold
        ));
    }
    if peer.min_batch_size < 2 {
        return invalid("peer.min_batch_size must be at least 2".to_string());
    }
    if peer.trees == 0 || peer.max_samples < 2 {
        return invalid("peer.trees must be positive and peer.max_samples at least 2".to_string());
    }
    if !peer.tukey_k.is_finite() || peer.tukey_k < 0.0 {
        return invalid(format!("peer.tukey_k must be non-negative, got {}", peer.tukey_k));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::PeriodSource;

    #[test]
    fn empty_file_yields_defaults() {
        let config = config_from_str("").unwrap();
        assert_eq!(config, AuditConfig::default());
        assert_eq!(config.rolling.window, 6);
        assert_eq!(config.latest.min_history, 3);
        assert_eq!(config.peer.seed, 42);
        assert_eq!(config.thresholds.k, 2.0);
    }

    #[test]
    fn reads_sections_and_year_month_period() {
        let config = config_from_str(
            r#"
            [columns]
            dimensions = ["PRODUCT", "COST_CENTER"]
            period = { year = "YEAR", month = "MONTH" }
            value = "AMOUNT"

            [rolling]
            window = 12

            [peer]
            group_by = ["PRODUCT"]
            item_column = "COST_CENTER"
            detector = "tukey"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.columns.period,
            PeriodSource::YearMonth {
                year: "YEAR".to_string(),
                month: "MONTH".to_string()
            }
        );
        assert_eq!(config.rolling.window, 12);
        assert_eq!(config.peer.detector, DetectorKind::Tukey);
        assert_eq!(config.peer.item_column.as_deref(), Some("COST_CENTER"));
        // Untouched sections keep their defaults.
        assert_eq!(config.peer.z_threshold, 2.0);
        assert_eq!(
            config.columns.schema().required_columns(),
            vec!["PRODUCT", "COST_CENTER", "YEAR", "MONTH", "AMOUNT"]
        );
    }

    #[test]
    fn rejects_zero_window() {
        let err = config_from_str("[rolling]\nwindow = 0").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn rejects_out_of_range_contamination() {
        let err = config_from_str("[peer]\ncontamination = 0.9").unwrap_err();
        assert!(err.to_string().contains("contamination"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/audit.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::LoadError(_)));
    }
}
