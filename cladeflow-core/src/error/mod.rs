//! Core error types for cladeflow

use thiserror::Error;

/// Main error type for cladeflow operations
#[derive(Error, Debug)]
pub enum CladeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Parsing error: {0}")]
    Parse(String),

    /// Missing dataset, malformed reference tree or unusable reference sequence
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Failure of the native analyzer for a single sequence
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Pool creation or execution unit startup failure
    #[error("Pool error: {0}")]
    Pool(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Other error: {0}")]
    Other(String),
}

impl CladeError {
    /// Cancellation is not a failure: a force-terminated pool produces it for
    /// every task it abandoned.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CladeError::Cancelled)
    }

    /// Errors that abort a whole run rather than a single sequence
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CladeError::Dataset(_)
                | CladeError::Pool(_)
                | CladeError::Timeout(_)
                | CladeError::Configuration(_)
        )
    }
}

/// Result type alias for cladeflow operations
pub type CladeResult<T> = Result<T, CladeError>;

impl From<serde_json::Error> for CladeError {
    fn from(err: serde_json::Error) -> Self {
        CladeError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for CladeError {
    fn from(err: toml::de::Error) -> Self {
        CladeError::Configuration(format!("Failed to parse config: {}", err))
    }
}

impl From<anyhow::Error> for CladeError {
    fn from(err: anyhow::Error) -> Self {
        CladeError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_display() {
        let io_error = CladeError::Io(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        assert!(format!("{}", io_error).contains("IO error"));

        let ser_error = CladeError::Serialization("invalid JSON".to_string());
        assert_eq!(format!("{}", ser_error), "Serialization error: invalid JSON");

        let config_error = CladeError::Configuration("missing field".to_string());
        assert_eq!(format!("{}", config_error), "Configuration error: missing field");

        let parse_error = CladeError::Parse("invalid syntax".to_string());
        assert_eq!(format!("{}", parse_error), "Parsing error: invalid syntax");

        let dataset_error = CladeError::Dataset("tree.json missing".to_string());
        assert_eq!(format!("{}", dataset_error), "Dataset error: tree.json missing");

        let analysis_error = CladeError::Analysis("unable to align".to_string());
        assert_eq!(format!("{}", analysis_error), "Analysis error: unable to align");

        let pool_error = CladeError::Pool("unit 3 failed to start".to_string());
        assert_eq!(format!("{}", pool_error), "Pool error: unit 3 failed to start");

        let timeout = CladeError::Timeout("unit initialization".to_string());
        assert_eq!(format!("{}", timeout), "Timed out: unit initialization");

        let cancelled = CladeError::Cancelled;
        assert_eq!(format!("{}", cancelled), "Operation cancelled");

        let other = CladeError::Other("unknown".to_string());
        assert_eq!(format!("{}", other), "Other error: unknown");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let clade_err: CladeError = io_err.into();

        match clade_err {
            CladeError::Io(e) => {
                assert_eq!(e.kind(), io::ErrorKind::PermissionDenied);
            }
            _ => panic!("Expected Io error variant"),
        }
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let parse_result: Result<serde_json::Value, serde_json::Error> =
            serde_json::from_str("{invalid json}");

        let clade_err: CladeError = parse_result.unwrap_err().into();
        match clade_err {
            CladeError::Serialization(msg) => {
                assert!(msg.contains("key must be a string"));
            }
            _ => panic!("Expected Serialization error variant"),
        }
    }

    #[test]
    fn test_toml_error_conversion() {
        let parse_result: Result<toml::Value, toml::de::Error> = toml::from_str("this is not = = toml");
        let clade_err: CladeError = parse_result.unwrap_err().into();
        assert!(matches!(clade_err, CladeError::Configuration(ref msg) if msg.contains("Failed to parse config")));
    }

    #[test]
    fn test_anyhow_error_conversion() {
        let clade_err: CladeError = anyhow::anyhow!("custom error message").into();

        match clade_err {
            CladeError::Other(msg) => assert_eq!(msg, "custom error message"),
            _ => panic!("Expected Other error variant"),
        }
    }

    #[test]
    fn test_cancelled_is_not_fatal() {
        assert!(CladeError::Cancelled.is_cancelled());
        assert!(!CladeError::Cancelled.is_fatal());
        assert!(!CladeError::Analysis("x".into()).is_cancelled());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(CladeError::Dataset("bad tree".into()).is_fatal());
        assert!(CladeError::Pool("spawn".into()).is_fatal());
        assert!(CladeError::Timeout("init".into()).is_fatal());
        assert!(!CladeError::Analysis("seq".into()).is_fatal());
        assert!(!CladeError::InvalidInput("seq".into()).is_fatal());
    }
}
