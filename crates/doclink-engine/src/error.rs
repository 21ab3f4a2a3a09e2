//! Errors raised while populating or querying the metadata graph

use doclink_backend::BackendError;
use doclink_core::{ErrorCode, ModelError};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl GraphError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Backend(e) => e.code(),
            Self::Model(e) => e.code(),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Backend(e) if e.is_unsupported())
    }
}
