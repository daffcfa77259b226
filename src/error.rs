//! Error types for the harness.
//!
//! All fallible operations return [`HarnessError`] through the crate-wide
//! [`Result`] alias. The variants follow the harness error taxonomy:
//!
//! - **Config**: invalid campaign/node configuration, fatal at startup
//! - **UnknownAttribute**: rejected attribute read/write, non-fatal for the node
//! - **Transport / Timeout**: remote-call failures surfaced to the caller
//! - **Remote**: a peer answered with a structured failure
//! - **Storage**: record/metadata persistence failures
//! - **Codec**: wire payloads that could not be encoded or decoded
//! - **Payload**: payload generation failures at the producer
//!
//! Use [`HarnessError::is_fatal`] to distinguish errors that should abort the
//! process (configuration, storage, payload) from errors a running node can
//! answer and survive.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for harness operations.
pub type Result<T, E = HarnessError> = std::result::Result<T, E>;

/// Main error type for harness operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HarnessError {
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("Trying to access non-existing attribute \"{name}\"")]
    UnknownAttribute { name: String },

    #[error("Transport error on topic '{topic}': {reason}")]
    Transport { topic: String, reason: String },

    #[error("Request on topic '{topic}' timed out after {duration:?}")]
    Timeout { topic: String, duration: Duration },

    #[error("Remote call failed: {reason}")]
    Remote { reason: String },

    #[error("Storage error: {path}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Codec error in {context}: {details}")]
    Codec { context: String, details: String },

    #[error("Payload generation failed: {details}")]
    Payload { details: String },
}

impl HarnessError {
    /// Returns whether this error should abort the process.
    ///
    /// Configuration, storage and payload errors are unrecoverable; everything
    /// else is surfaced to the caller, which decides (the coordinator treats
    /// any remote failure as fatal for the campaign, a node keeps running).
    pub fn is_fatal(&self) -> bool {
        match self {
            HarnessError::Config { .. } => true,
            HarnessError::Storage { .. } => true,
            HarnessError::Payload { .. } => true,
            HarnessError::UnknownAttribute { .. } => false,
            HarnessError::Transport { .. } => false,
            HarnessError::Timeout { .. } => false,
            HarnessError::Remote { .. } => false,
            HarnessError::Codec { .. } => false,
        }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        HarnessError::Config { reason: reason.into() }
    }

    /// Helper constructor for unknown-attribute failures.
    pub fn unknown_attribute(name: impl Into<String>) -> Self {
        HarnessError::UnknownAttribute { name: name.into() }
    }

    /// Helper constructor for transport errors.
    pub fn transport(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        HarnessError::Transport { topic: topic.into(), reason: reason.into() }
    }

    /// Helper constructor for request timeouts.
    pub fn timeout(topic: impl Into<String>, duration: Duration) -> Self {
        HarnessError::Timeout { topic: topic.into(), duration }
    }

    /// Helper constructor for structured remote failures.
    pub fn remote(reason: impl Into<String>) -> Self {
        HarnessError::Remote { reason: reason.into() }
    }

    /// Helper constructor for storage errors with path context.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HarnessError::Storage { path: path.into(), source }
    }

    /// Helper constructor for codec errors.
    pub fn codec(context: impl Into<String>, details: impl Into<String>) -> Self {
        HarnessError::Codec { context: context.into(), details: details.into() }
    }
}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        HarnessError::Storage { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(err: serde_json::Error) -> Self {
        HarnessError::Codec { context: "JSON".to_string(), details: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_traits_validation() {
        // Compile-time check: HarnessError must be Send + Sync + 'static
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<HarnessError>();

        let error = HarnessError::config("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn fatal_classification_matches_taxonomy() {
        assert!(HarnessError::config("empty case list").is_fatal());
        assert!(
            HarnessError::storage(
                PathBuf::from("/tmp/x.csv"),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            )
            .is_fatal()
        );
        assert!(HarnessError::Payload { details: "rng".into() }.is_fatal());

        assert!(!HarnessError::unknown_attribute("bogus").is_fatal());
        assert!(!HarnessError::timeout("producer.set", Duration::from_secs(1)).is_fatal());
        assert!(!HarnessError::transport("producer.data", "closed").is_fatal());
        assert!(!HarnessError::remote("unknown attribute").is_fatal());
    }

    #[test]
    fn error_messages_carry_context() {
        let err = HarnessError::unknown_attribute("DATA_SIZE");
        assert!(err.to_string().contains("DATA_SIZE"));

        let err = HarnessError::timeout("consumer.get-log", Duration::from_secs(1));
        assert!(err.to_string().contains("consumer.get-log"));

        let err = HarnessError::transport("relay.data", "no subscribers");
        assert!(err.to_string().contains("relay.data"));
        assert!(err.to_string().contains("no subscribers"));
    }

    #[test]
    fn from_conversions_work() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing log dir");
        let err: HarnessError = io_err.into();
        match err {
            HarnessError::Storage { source, .. } => {
                assert_eq!(source.to_string(), "missing log dir");
            }
            _ => panic!("Expected Storage error variant"),
        }

        let json_err = serde_json::from_str::<i64>("not-json").unwrap_err();
        let err: HarnessError = json_err.into();
        assert!(matches!(err, HarnessError::Codec { .. }));
    }
}
