//! Errors raised by backends

use doclink_core::{ErrorCode, ModelError};

/// Errors that can occur while talking to a DocLink backend
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("User is not authenticated")]
    NotAuthenticated,

    #[error("Not connected to SQL Server")]
    NoConnection,

    #[error("No credentials provided for {0} login")]
    NoCredentials(&'static str),

    #[error("Table {0} not whitelisted")]
    TableNotWhitelisted(String),

    #[error("'{operation}' is not implemented by the {backend} backend")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid SQL identifier: {0}")]
    InvalidIdentifier(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl BackendError {
    pub fn unsupported(backend: &'static str, operation: &'static str) -> Self {
        Self::Unsupported { backend, operation }
    }

    /// Stable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotAuthenticated => ErrorCode::NotAuthenticated,
            Self::NoConnection => ErrorCode::NoConnection,
            Self::NoCredentials(_) => ErrorCode::NoCredentials,
            Self::TableNotWhitelisted(_) => ErrorCode::TableNotWhitelisted,
            Self::Unsupported { .. } => ErrorCode::NotImplemented,
            Self::Transport(_) => ErrorCode::TransportError,
            Self::InvalidResponse(_) => ErrorCode::InvalidResponse,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::InvalidIdentifier(_) => ErrorCode::InvalidIdentifier,
            Self::Model(e) => e.code(),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    pub fn is_not_whitelisted(&self) -> bool {
        matches!(self, Self::TableNotWhitelisted(_))
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidResponse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doclink_core::{EntityKind, LookupKey};

    #[test]
    fn codes() {
        assert_eq!(BackendError::unsupported("api", "run_query").code(), ErrorCode::NotImplemented);
        assert_eq!(
            BackendError::TableNotWhitelisted("Workflows".into()).code().as_str(),
            "TABLE_NOT_WHITELISTED"
        );

        let model = ModelError::not_found(EntityKind::Property, LookupKey::Id, 3);
        assert_eq!(BackendError::from(model).code(), ErrorCode::InvalidPropertyId);
    }

    #[test]
    fn unsupported_message_names_backend_and_operation() {
        let err = BackendError::unsupported("api", "sproc_text");
        assert!(err.is_unsupported());
        assert_eq!(err.to_string(), "'sproc_text' is not implemented by the api backend");
    }
}
