//! DocLink Core
//!
//! Backend-independent domain model: entity records, identifier formatting,
//! SQL type mapping, stable error codes and configuration.
//! Never rename error codes - they are part of the public API.

pub mod column;
pub mod config;
pub mod document;
pub mod error;
pub mod format;
pub mod property;
pub mod serde_util;
pub mod sproc;
pub mod stamp;
pub mod workflow;

pub use column::{ColumnClass, CreationType};
pub use config::{ApiSettings, BackendConfig, CacheConfig, Config, ConfigError, SqlSettings};
pub use document::{link_document_types, DocumentType, DocumentTypeProperty, DocumentTypePropertyRecord, DocumentTypeRecord};
pub use error::{EntityKind, ErrorCode, LookupKey, ModelError};
pub use format::{format_identifier, trim_separator, SqlType, FRAGMENT_SEPARATOR};
pub use property::Property;
pub use sproc::{SprocAction, SprocInfo};
pub use stamp::{link_distribution_stamps, DistributionStamp, DistributionStampField};
pub use workflow::{Workflow, WorkflowActivity};
