//! Error types shared by the translation pipeline
//!
//! Quota exhaustion is not an error: it is reported as a
//! [`LimitCheck`](crate::translation::storage::LimitCheck) value.

use std::fmt;

use thiserror::Error;

use crate::core::InterlinearError;

/// Translation error
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// Missing credential, bad config file, invalid option
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Transport failure talking to the translation API
    #[error("network error: {0}")]
    NetworkError(String),

    /// The API answered, but with an error status or an unusable body
    #[error("translation service error: {0}")]
    TranslationServiceError(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Usage counter database failure
    #[error("storage error: {0}")]
    StorageError(String),

    /// The background owner is gone or dropped a reply
    #[error("messaging error: {0}")]
    MessagingError(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl TranslationError {
    /// Severity used when the error is surfaced to the user
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslationError::ConfigError(_) => ErrorSeverity::Critical,
            TranslationError::NetworkError(_) => ErrorSeverity::Warning,
            TranslationError::TranslationServiceError(_) => ErrorSeverity::Error,
            TranslationError::InvalidInput(_) => ErrorSeverity::Info,
            TranslationError::ParseError(_) => ErrorSeverity::Error,
            TranslationError::SerializationError(_) => ErrorSeverity::Error,
            TranslationError::StorageError(_) => ErrorSeverity::Error,
            TranslationError::MessagingError(_) => ErrorSeverity::Error,
            TranslationError::InternalError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslationError::ConfigError(_) => ErrorCategory::Configuration,
            TranslationError::NetworkError(_) => ErrorCategory::Network,
            TranslationError::TranslationServiceError(_) => ErrorCategory::Service,
            TranslationError::InvalidInput(_) => ErrorCategory::Input,
            TranslationError::ParseError(_) => ErrorCategory::Parsing,
            TranslationError::SerializationError(_) => ErrorCategory::Serialization,
            TranslationError::StorageError(_) => ErrorCategory::Storage,
            TranslationError::MessagingError(_) => ErrorCategory::Messaging,
            TranslationError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// Appends context to the message, keeping the variant
    pub fn with_context<T: fmt::Display>(self, context: T) -> Self {
        let extend = |msg: String| format!("{msg} ({context})");

        match self {
            TranslationError::ConfigError(msg) => TranslationError::ConfigError(extend(msg)),
            TranslationError::NetworkError(msg) => TranslationError::NetworkError(extend(msg)),
            TranslationError::TranslationServiceError(msg) => {
                TranslationError::TranslationServiceError(extend(msg))
            }
            TranslationError::InvalidInput(msg) => TranslationError::InvalidInput(extend(msg)),
            TranslationError::ParseError(msg) => TranslationError::ParseError(extend(msg)),
            TranslationError::SerializationError(msg) => {
                TranslationError::SerializationError(extend(msg))
            }
            TranslationError::StorageError(msg) => TranslationError::StorageError(extend(msg)),
            TranslationError::MessagingError(msg) => TranslationError::MessagingError(extend(msg)),
            TranslationError::InternalError(msg) => TranslationError::InternalError(extend(msg)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Service,
    Input,
    Parsing,
    Serialization,
    Storage,
    Messaging,
    Internal,
}

impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::InternalError(format!("I/O error: {error}"))
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::SerializationError(format!("JSON error: {error}"))
    }
}

impl From<toml::de::Error> for TranslationError {
    fn from(error: toml::de::Error) -> Self {
        TranslationError::ParseError(format!("TOML parse error: {error}"))
    }
}

impl From<toml::ser::Error> for TranslationError {
    fn from(error: toml::ser::Error) -> Self {
        TranslationError::SerializationError(format!("TOML write error: {error}"))
    }
}

impl From<config::ConfigError> for TranslationError {
    fn from(error: config::ConfigError) -> Self {
        TranslationError::ConfigError(error.to_string())
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            TranslationError::TranslationServiceError(format!("malformed response: {error}"))
        } else {
            TranslationError::NetworkError(error.to_string())
        }
    }
}

macro_rules! storage_error_from {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for TranslationError {
                fn from(error: $ty) -> Self {
                    TranslationError::StorageError(error.to_string())
                }
            }
        )+
    };
}

storage_error_from!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

impl From<TranslationError> for InterlinearError {
    fn from(error: TranslationError) -> Self {
        InterlinearError::new(&error.to_string())
    }
}

pub type TranslationResult<T> = Result<T, TranslationError>;

pub mod helpers {
    use super::*;

    /// Logs at a level matching the error's severity
    pub fn log_error(error: &TranslationError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("{}", error),
            ErrorSeverity::Warning => tracing::warn!("{}", error),
            ErrorSeverity::Error | ErrorSeverity::Critical => tracing::error!("{}", error),
        }
    }

    pub fn config_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::ConfigError(msg.to_string())
    }

    pub fn service_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::TranslationServiceError(msg.to_string())
    }

    pub fn messaging_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::MessagingError(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_variant() {
        let error = TranslationError::NetworkError("timed out".to_string()).with_context("chunk 2");
        assert!(matches!(error, TranslationError::NetworkError(_)));
        assert_eq!(error.to_string(), "network error: timed out (chunk 2)");
    }

    #[test]
    fn missing_credential_is_critical() {
        let error = helpers::config_error("API key is not configured");
        assert_eq!(error.severity(), ErrorSeverity::Critical);
        assert_eq!(error.category(), ErrorCategory::Configuration);
    }
}
