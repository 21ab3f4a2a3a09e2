//! Artifact delivery and procedure identity checks

use crate::generator::{Artifact, ArtifactGenerator, GenerateError};
use crate::template::TemplateStore;
use doclink_backend::{Backend, Delivery};
use doclink_core::SprocAction;
use doclink_engine::{ColumnSet, MetadataGraph};
use std::path::{Path, PathBuf};

/// Where a delivered artifact ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivered {
    Written(PathBuf),
    Committed,
}

/// Write an artifact to `output_dir` or commit it, depending on the backend
pub async fn deliver(backend: &dyn Backend, artifact: &Artifact, output_dir: &Path) -> Result<Delivered, GenerateError> {
    match backend.delivery() {
        Delivery::File => {
            let path = output_dir.join(&artifact.file_name);
            let io_error = |source| GenerateError::Io {
                path: path.clone(),
                source,
            };

            std::fs::create_dir_all(output_dir).map_err(io_error)?;
            std::fs::write(&path, &artifact.sql).map_err(io_error)?;
            tracing::info!(path = %path.display(), "artifact written");
            Ok(Delivered::Written(path))
        }
        Delivery::Commit => {
            backend.run_query(&artifact.sql).await?;
            tracing::info!(template = %artifact.template, backend = backend.name(), "artifact committed");
            Ok(Delivered::Committed)
        }
    }
}

/// Line endings normalized and trailing whitespace removed
fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n").trim_end().to_string()
}

/// Compare each existing procedure with its template rendered as CREATE
///
/// Procedures that do not exist are skipped. On a backend without
/// procedure text the check is skipped and `identical` stays unknown.
/// `columns` supplies export parameters for templates that need them.
pub async fn identical_sproc_check<S, N>(
    generator: &ArtifactGenerator<S>,
    graph: &mut MetadataGraph,
    backend: &dyn Backend,
    sproc_names: &[N],
    columns: Option<&ColumnSet>,
) -> Result<(), GenerateError>
where
    S: TemplateStore,
    N: AsRef<str>,
{
    for name in sproc_names {
        let name = name.as_ref();
        if !graph.sproc_exists(name)? {
            tracing::debug!(sproc = name, "procedure absent, skipping comparison");
            continue;
        }

        let current = match backend.sproc_text(name).await {
            Ok(text) => text,
            Err(e) if e.is_unsupported() => {
                tracing::debug!(sproc = name, error = %e, "procedure text unavailable, skipping comparison");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let expected = generator.procedure(name, SprocAction::Create, columns)?;
        let identical = normalize(&current) == normalize(&expected.sql);
        tracing::info!(sproc = name, identical, "compared procedure");
        graph.set_sproc_identical(name, identical)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::MemoryTemplateStore;
    use doclink_backend::{BackendError, MockBackend};
    use tempfile::TempDir;

    fn artifact() -> Artifact {
        Artifact {
            template: "spCleanup".to_string(),
            file_name: "spCleanup.sql".to_string(),
            sql: "CREATE PROCEDURE spCleanup AS SELECT 1".to_string(),
        }
    }

    fn generator() -> ArtifactGenerator<MemoryTemplateStore> {
        ArtifactGenerator::new(
            MemoryTemplateStore::new()
                .with_template("spSame", "{{ ACTION }} PROCEDURE spSame AS\nSELECT 1\n")
                .with_template("spChanged", "{{ ACTION }} PROCEDURE spChanged AS SELECT 2"),
        )
    }

    #[tokio::test]
    async fn test_file_delivery() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let backend = MockBackend::builder().build();

        let delivered = deliver(&backend, &artifact(), &out).await.unwrap();
        let path = out.join("spCleanup.sql");
        assert_eq!(delivered, Delivered::Written(path.clone()));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "CREATE PROCEDURE spCleanup AS SELECT 1");
        assert!(backend.executed().is_empty());
    }

    #[tokio::test]
    async fn test_commit_delivery() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::builder().with_delivery(Delivery::Commit).build();

        let delivered = deliver(&backend, &artifact(), dir.path()).await.unwrap();
        assert_eq!(delivered, Delivered::Committed);
        assert_eq!(backend.executed(), vec!["CREATE PROCEDURE spCleanup AS SELECT 1"]);
        assert!(!dir.path().join("spCleanup.sql").exists());
    }

    #[tokio::test]
    async fn test_identity_check() {
        let backend = MockBackend::builder()
            .with_sproc("spSame", "CREATE PROCEDURE spSame AS\r\nSELECT 1\r\n")
            .with_sproc("spChanged", "CREATE PROCEDURE spChanged AS SELECT 1")
            .build();
        let names = ["spSame", "spChanged", "spMissing"];

        let mut graph = MetadataGraph::new();
        graph.populate_sproc_info(&backend, &names).await.unwrap();
        identical_sproc_check(&generator(), &mut graph, &backend, &names, None).await.unwrap();

        assert_eq!(graph.sproc_info("spSame").unwrap().identical, Some(true));
        assert_eq!(graph.sproc_info("spChanged").unwrap().identical, Some(false));
        assert_eq!(graph.sproc_info("spMissing").unwrap().identical, None);
    }

    #[tokio::test]
    async fn test_identity_check_skipped_without_procedure_text() {
        let backend = MockBackend::builder()
            .with_sproc("spSame", "CREATE PROCEDURE spSame AS\nSELECT 1\n")
            .without_admin()
            .build();

        let mut graph = MetadataGraph::new();
        graph.populate_sproc_info(&backend, &["spSame"]).await.unwrap();
        identical_sproc_check(&generator(), &mut graph, &backend, &["spSame"], None).await.unwrap();

        assert_eq!(graph.sproc_info("spSame").unwrap().identical, None);
    }

    #[tokio::test]
    async fn test_identity_check_requires_known_procedure() {
        let backend = MockBackend::builder()
            .with_error("sproc_text", BackendError::Transport("reset".into()))
            .build();
        let mut graph = MetadataGraph::new();

        let err = identical_sproc_check(&generator(), &mut graph, &backend, &["spSame"], None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), doclink_core::ErrorCode::InvalidSprocName);
    }
}
