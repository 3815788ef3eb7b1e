//! Error taxonomy for memsweep.
//!
//! Only conditions that should stop a report from being produced live here.
//! Expected absences (missing folders, unparseable folder names, short score
//! runs) are modelled as ordinary values by the components that see them.

use std::path::PathBuf;

/// memsweep library errors.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for memsweep operations.
pub type Result<T> = std::result::Result<T, SweepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_catalog_display() {
        let err = SweepError::InvalidCatalog("no models".to_string());
        assert!(err.to_string().contains("invalid catalog"));
        assert!(err.to_string().contains("no models"));
    }

    #[test]
    fn test_persist_error_names_path() {
        let err = SweepError::Persist {
            path: PathBuf::from("/tmp/report.md"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/report.md"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SweepError = io.into();
        assert!(matches!(err, SweepError::Io(_)));
    }
}
