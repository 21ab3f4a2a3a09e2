//! SQL artifact generation for DocLink exports
//!
//! This crate handles:
//! - Loading `.sqldat` templates from a directory or memory
//! - Rendering staging tables and export procedures from rendered columns
//! - Writing artifacts to disk or committing them through the backend
//! - Comparing deployed procedures with their templates

pub mod delivery;
pub mod generator;
pub mod template;

pub use delivery::{deliver, identical_sproc_check, Delivered};
pub use generator::{Artifact, ArtifactGenerator, GenerateError, STAGING_FILE_NAME, STAGING_TEMPLATE};
pub use template::{decode_template, DirTemplateStore, MemoryTemplateStore, TemplateError, TemplateStore};
