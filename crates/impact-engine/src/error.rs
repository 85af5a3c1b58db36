//! Error types for the impact engine
//!
//! Every failure is a value returned to the caller. Load failures are fatal
//! for the store being built; evaluation failures are fatal only for the
//! record being evaluated.

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, ImpactError>;

#[derive(Debug, Error)]
pub enum ImpactError {
    /// A reference table is missing or has a malformed row.
    #[error("failed to load table {table} (line {line}): {reason}")]
    DataLoad {
        table: String,
        line: usize,
        reason: String,
    },

    /// No energy profile exists for the model. There is no safe default.
    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("unknown resource class {class} for service {service}")]
    UnknownResourceClass { service: String, class: String },

    #[error("unsupported service type: {0}")]
    UnsupportedService(String),

    /// A coefficient from the store is negative or out of range.
    #[error("data integrity fault in {subject}: {field} = {value} ({reason})")]
    DataIntegrity {
        subject: String,
        field: String,
        value: f64,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ImpactError {
    pub(crate) fn load(table: &str, line: usize, reason: impl Into<String>) -> Self {
        ImpactError::DataLoad {
            table: table.to_string(),
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn integrity(
        subject: impl Into<String>,
        field: &str,
        value: f64,
        reason: &str,
    ) -> Self {
        ImpactError::DataIntegrity {
            subject: subject.into(),
            field: field.to_string(),
            value,
            reason: reason.to_string(),
        }
    }

    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            ImpactError::DataLoad { .. } => "data_load",
            ImpactError::UnknownModel(_) => "unknown_model",
            ImpactError::UnknownResourceClass { .. } => "unknown_resource_class",
            ImpactError::UnsupportedService(_) => "unsupported_service",
            ImpactError::DataIntegrity { .. } => "data_integrity",
            ImpactError::Config(_) => "config",
            ImpactError::Io { .. } => "io",
        }
    }

    /// True for errors tied to one candidate rather than to the whole request
    pub fn is_candidate_specific(&self) -> bool {
        matches!(
            self,
            ImpactError::UnknownModel(_)
                | ImpactError::UnknownResourceClass { .. }
                | ImpactError::DataIntegrity { .. }
        )
    }
}

impl From<::config::ConfigError> for ImpactError {
    fn from(err: ::config::ConfigError) -> Self {
        ImpactError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ImpactError::UnknownModel("x".into()).kind(), "unknown_model");
        assert_eq!(
            ImpactError::load("region_pue.csv", 3, "bad").kind(),
            "data_load"
        );
        assert_eq!(
            ImpactError::UnsupportedService("queue".into()).kind(),
            "unsupported_service"
        );
    }

    #[test]
    fn test_candidate_specific() {
        assert!(ImpactError::UnknownModel("m".into()).is_candidate_specific());
        assert!(ImpactError::integrity("us-east-1", "pue", 0.5, "below 1.0").is_candidate_specific());
        assert!(!ImpactError::UnsupportedService("queue".into()).is_candidate_specific());
    }

    #[test]
    fn test_load_error_message() {
        let err = ImpactError::load("region_pue.csv", 4, "non-numeric pue");
        let msg = err.to_string();
        assert!(msg.contains("region_pue.csv"));
        assert!(msg.contains("line 4"));
    }
}
