//! Error codes and model errors
//!
//! IMPORTANT: Error codes are versioned and stable.
//! NEVER rename or remove codes - scripts match on them.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code registry (v1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Lookups
    InvalidPropertyId,
    InvalidPropertyName,
    InvalidDocumentTypeId,
    InvalidDocumentTypeName,
    /// A document type has no property with the requested name
    PropertyNotFound,
    InvalidDistributionStampId,
    InvalidDistributionStampName,
    InvalidDistributionStampFieldName,
    InvalidDistributionStampFieldCaption,
    InvalidWorkflowId,
    InvalidWorkflowName,
    InvalidWorkflowActivityId,
    InvalidWorkflowActivityName,
    InvalidSprocName,

    // Rendering
    InvalidDataType,
    InvalidCreationType,
    InvalidIdentifier,

    // Backends
    TableNotWhitelisted,
    NotImplemented,
    NotAuthenticated,
    #[serde(rename = "NO_CONN")]
    NoConnection,
    NoCredentials,
    TransportError,
    InvalidResponse,

    // Generation and configuration
    TemplateNotFound,
    TemplateRenderError,
    ConfigError,
    IoError,
}

impl ErrorCode {
    /// Get the error code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidPropertyId => "INVALID_PROPERTY_ID",
            Self::InvalidPropertyName => "INVALID_PROPERTY_NAME",
            Self::InvalidDocumentTypeId => "INVALID_DOCUMENT_TYPE_ID",
            Self::InvalidDocumentTypeName => "INVALID_DOCUMENT_TYPE_NAME",
            Self::PropertyNotFound => "PROPERTY_NOT_FOUND",
            Self::InvalidDistributionStampId => "INVALID_DISTRIBUTION_STAMP_ID",
            Self::InvalidDistributionStampName => "INVALID_DISTRIBUTION_STAMP_NAME",
            Self::InvalidDistributionStampFieldName => "INVALID_DISTRIBUTION_STAMP_FIELD_NAME",
            Self::InvalidDistributionStampFieldCaption => "INVALID_DISTRIBUTION_STAMP_FIELD_CAPTION",
            Self::InvalidWorkflowId => "INVALID_WORKFLOW_ID",
            Self::InvalidWorkflowName => "INVALID_WORKFLOW_NAME",
            Self::InvalidWorkflowActivityId => "INVALID_WORKFLOW_ACTIVITY_ID",
            Self::InvalidWorkflowActivityName => "INVALID_WORKFLOW_ACTIVITY_NAME",
            Self::InvalidSprocName => "INVALID_SPROC_NAME",
            Self::InvalidDataType => "INVALID_DATA_TYPE",
            Self::InvalidCreationType => "INVALID_CREATION_TYPE",
            Self::InvalidIdentifier => "INVALID_IDENTIFIER",
            Self::TableNotWhitelisted => "TABLE_NOT_WHITELISTED",
            Self::NotImplemented => "NOT_IMPLEMENTED",
            Self::NotAuthenticated => "NOT_AUTHENTICATED",
            Self::NoConnection => "NO_CONN",
            Self::NoCredentials => "NO_CREDENTIALS",
            Self::TransportError => "TRANSPORT_ERROR",
            Self::InvalidResponse => "INVALID_RESPONSE",
            Self::TemplateNotFound => "TEMPLATE_NOT_FOUND",
            Self::TemplateRenderError => "TEMPLATE_RENDER_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of domain entity a lookup or mapping was performed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Property,
    DocumentType,
    DocumentTypeProperty,
    Workflow,
    WorkflowActivity,
    DistributionStamp,
    DistributionStampField,
    StoredProcedure,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Property => "property",
            Self::DocumentType => "document type",
            Self::DocumentTypeProperty => "document type property",
            Self::Workflow => "workflow",
            Self::WorkflowActivity => "workflow activity",
            Self::DistributionStamp => "distribution stamp",
            Self::DistributionStampField => "distribution stamp field",
            Self::StoredProcedure => "stored procedure",
        };
        f.write_str(name)
    }
}

/// Attribute a lookup searched on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKey {
    Id,
    Uuid,
    Name,
    Prompt,
    FormattedPrompt,
    Caption,
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Id => "ID",
            Self::Uuid => "UUID",
            Self::Name => "name",
            Self::Prompt => "prompt",
            Self::FormattedPrompt => "formatted prompt",
            Self::Caption => "caption",
        };
        f.write_str(name)
    }
}

/// Errors raised by the in-memory model: lookups and rendering
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("Invalid {kind} {key}: {value}")]
    NotFound {
        kind: EntityKind,
        key: LookupKey,
        value: String,
    },

    #[error("Invalid data type {code} for {kind}")]
    InvalidDataType { kind: EntityKind, code: i32 },

    #[error("Invalid creation type: {0}")]
    InvalidCreationType(String),
}

impl ModelError {
    /// Build a NotFound error for `kind` searched by `key`
    pub fn not_found(kind: EntityKind, key: LookupKey, value: impl ToString) -> Self {
        Self::NotFound {
            kind,
            key,
            value: value.to_string(),
        }
    }

    /// Stable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { kind, key, .. } => not_found_code(*kind, *key),
            Self::InvalidDataType { .. } => ErrorCode::InvalidDataType,
            Self::InvalidCreationType(_) => ErrorCode::InvalidCreationType,
        }
    }
}

fn not_found_code(kind: EntityKind, key: LookupKey) -> ErrorCode {
    use EntityKind as K;
    use LookupKey as L;

    match (kind, key) {
        (K::Property, L::Id) => ErrorCode::InvalidPropertyId,
        (K::Property, _) => ErrorCode::InvalidPropertyName,
        (K::DocumentType, L::Id) => ErrorCode::InvalidDocumentTypeId,
        (K::DocumentType, _) => ErrorCode::InvalidDocumentTypeName,
        (K::DocumentTypeProperty, _) => ErrorCode::PropertyNotFound,
        (K::DistributionStamp, L::Id | L::Uuid) => ErrorCode::InvalidDistributionStampId,
        (K::DistributionStamp, _) => ErrorCode::InvalidDistributionStampName,
        (K::DistributionStampField, L::Caption) => ErrorCode::InvalidDistributionStampFieldCaption,
        (K::DistributionStampField, _) => ErrorCode::InvalidDistributionStampFieldName,
        (K::Workflow, L::Id) => ErrorCode::InvalidWorkflowId,
        (K::Workflow, _) => ErrorCode::InvalidWorkflowName,
        (K::WorkflowActivity, L::Id) => ErrorCode::InvalidWorkflowActivityId,
        (K::WorkflowActivity, _) => ErrorCode::InvalidWorkflowActivityName,
        (K::StoredProcedure, _) => ErrorCode::InvalidSprocName,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_stability() {
        assert_eq!(ErrorCode::InvalidDataType.as_str(), "INVALID_DATA_TYPE");
        assert_eq!(ErrorCode::TableNotWhitelisted.as_str(), "TABLE_NOT_WHITELISTED");
        assert_eq!(ErrorCode::NoConnection.as_str(), "NO_CONN");
    }

    #[test]
    fn not_found_carries_kind_and_value() {
        let err = ModelError::not_found(EntityKind::Property, LookupKey::FormattedPrompt, "InvoiceNo");
        assert_eq!(err.to_string(), "Invalid property formatted prompt: InvoiceNo");
        assert_eq!(err.code(), ErrorCode::InvalidPropertyName);

        let err = ModelError::not_found(EntityKind::DistributionStamp, LookupKey::Uuid, "abc");
        assert_eq!(err.code(), ErrorCode::InvalidDistributionStampId);
    }

    #[test]
    fn error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::InvalidDistributionStampFieldCaption).unwrap();
        assert_eq!(json, "\"INVALID_DISTRIBUTION_STAMP_FIELD_CAPTION\"");
    }
}
