//! SQL artifact generation
//!
//! Templates are rendered with minijinja in strict mode: a template that
//! references a parameter the generator does not supply fails instead of
//! rendering an empty string. Placeholders are written `{{ ACTION }}`,
//! `{{ HEADER_COLUMNS }}` and so on.

use crate::template::{TemplateError, TemplateStore};
use doclink_backend::BackendError;
use doclink_core::{ErrorCode, ModelError, SprocAction};
use doclink_engine::{ColumnSet, GraphError, RenderPass, RenderedColumns};
use minijinja::{Environment, UndefinedBehavior, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Template key of the staging table script
pub const STAGING_TEMPLATE: &str = "StagingFromProp";

/// File the staging table script is written to
pub const STAGING_FILE_NAME: &str = "StagingFromProp.sql";

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Failed to render template '{name}': {message}")]
    Render { name: String, message: String },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GenerateError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Template(e) => e.code(),
            Self::Render { .. } => ErrorCode::TemplateRenderError,
            Self::Backend(e) => e.code(),
            Self::Model(e) => e.code(),
            Self::Io { .. } => ErrorCode::IoError,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Backend(e) if e.is_unsupported())
    }
}

impl From<GraphError> for GenerateError {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::Backend(e) => Self::Backend(e),
            GraphError::Model(e) => Self::Model(e),
        }
    }
}

/// Anchor id as a SQL literal, `NULL` when the class has no columns
fn anchor_param(columns: &RenderedColumns) -> String {
    columns
        .anchor_id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "NULL".to_string())
}

/// A rendered script ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Template key the script was rendered from
    pub template: String,

    /// File name used when the script is written to disk
    pub file_name: String,

    pub sql: String,
}

/// Renders staging and procedure scripts from stored templates
pub struct ArtifactGenerator<S: TemplateStore> {
    store: S,
    env: Environment<'static>,
}

impl<S: TemplateStore> ArtifactGenerator<S> {
    pub fn new(store: S) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        Self { store, env }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Render a stored template with the given parameters
    pub fn render(&self, template: &str, params: &BTreeMap<&'static str, String>) -> Result<String, GenerateError> {
        let source = self.store.load(template)?;
        let name = format!("{}.sqldat", template);

        self.env
            .render_named_str(&name, &source, Value::from_serialize(params))
            .map_err(|e| GenerateError::Render {
                name: template.to_string(),
                message: e.to_string(),
            })
    }

    /// Staging table DDL for the header and detail typed declarations
    pub fn staging_tables(&self, columns: &ColumnSet) -> Result<Artifact, GenerateError> {
        let params = BTreeMap::from([
            ("HEADER_COLUMNS", columns.header().to_sql(RenderPass::TypedDeclarations)),
            ("DETAIL_COLUMNS", columns.detail().to_sql(RenderPass::TypedDeclarations)),
        ]);

        tracing::info!(template = STAGING_TEMPLATE, "rendering staging tables");
        Ok(Artifact {
            template: STAGING_TEMPLATE.to_string(),
            file_name: STAGING_FILE_NAME.to_string(),
            sql: self.render(STAGING_TEMPLATE, &params)?,
        })
    }

    /// Export procedure whose template key is the procedure name
    ///
    /// Pivot parameters are the identifier lists without their first entry.
    /// That first column is the anchor; its bare id is passed as
    /// `HEADER_ANCHOR_ID` / `DETAIL_ANCHOR_ID` so the template can read it
    /// outside the pivot.
    pub fn export_procedure(
        &self,
        sproc_name: &str,
        action: SprocAction,
        columns: &ColumnSet,
    ) -> Result<Artifact, GenerateError> {
        self.procedure(sproc_name, action, Some(columns))
    }

    /// Procedure whose template only takes `ACTION`
    pub fn basic_procedure(&self, sproc_name: &str, action: SprocAction) -> Result<Artifact, GenerateError> {
        self.procedure(sproc_name, action, None)
    }

    /// Render a procedure template, with column parameters when `columns` is given
    pub fn procedure(
        &self,
        sproc_name: &str,
        action: SprocAction,
        columns: Option<&ColumnSet>,
    ) -> Result<Artifact, GenerateError> {
        let mut params = BTreeMap::from([("ACTION", action.as_str().to_string())]);

        if let Some(columns) = columns {
            let header = columns.header();
            let detail = columns.detail();
            params.extend([
                ("HEADER_COLUMNS", header.to_sql(RenderPass::References)),
                ("DETAIL_COLUMNS", detail.to_sql(RenderPass::References)),
                ("SELECT_HEADER_PROP_IDS", header.to_sql(RenderPass::Identifiers)),
                ("SELECT_DETAIL_PROP_IDS", detail.to_sql(RenderPass::Identifiers)),
                ("PIVOT_HEADER_PROP_IDS", header.pivot_sql()),
                ("PIVOT_DETAIL_PROP_IDS", detail.pivot_sql()),
                ("HEADER_ANCHOR_ID", anchor_param(&header)),
                ("DETAIL_ANCHOR_ID", anchor_param(&detail)),
            ]);
        }

        tracing::info!(sproc = sproc_name, %action, "rendering stored procedure");
        Ok(Artifact {
            template: sproc_name.to_string(),
            file_name: format!("{}.sql", sproc_name),
            sql: self.render(sproc_name, &params)?,
        })
    }
}
