//! Template directory -> rendered artifacts -> delivery

use doclink_backend::queries::DROP_STAGING_TABLES;
use doclink_backend::{Delivery, MockBackend};
use doclink_core::{ColumnClass, CreationType, DocumentTypePropertyRecord, DocumentTypeRecord, Property, SprocAction};
use doclink_engine::{ColumnSetRenderer, MetadataGraph};
use doclink_sql::{deliver, ArtifactGenerator, Delivered, DirTemplateStore, STAGING_TEMPLATE};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const EXPORT_TEMPLATE: &str = "\u{feff}{{ ACTION }} PROCEDURE [dbo].[spDocLinkExport]\r\nAS\r\n\
SELECT DocumentID, AnchorValue\r\n\t{{ PIVOT_HEADER_PROP_IDS }}\r\n\
FROM src PIVOT (MAX(PropValue) FOR PropertyID IN ([0] {{ PIVOT_HEADER_PROP_IDS }})) AS p\r\n";

fn backend(delivery: Delivery) -> MockBackend {
    MockBackend::builder()
        .with_delivery(delivery)
        .with_property(Property::new(1, "Invoice #", 0))
        .with_property(Property::new(2, "Amount Due", 4))
        .with_property(Property::new(3, "PO Number", 0))
        .with_document_type(
            DocumentTypeRecord::new(10, "AP Invoice")
                .with_property(DocumentTypePropertyRecord::new(100, 10, 1, 1))
                .with_property(DocumentTypePropertyRecord::new(101, 10, 2, 2))
                .with_property(DocumentTypePropertyRecord::new(102, 10, 3, 3)),
        )
        .build()
}

fn template_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(format!("{}.sqldat", STAGING_TEMPLATE)),
        "CREATE TABLE Header (Id int\r\n\t{{ HEADER_COLUMNS }}\r\n)\r\nCREATE TABLE Detail (Id int\r\n\t{{ DETAIL_COLUMNS }}\r\n)",
    )
    .unwrap();
    fs::write(dir.path().join("spDocLinkExport.sqldat"), EXPORT_TEMPLATE).unwrap();
    dir
}

async fn populated(backend: &MockBackend) -> MetadataGraph {
    let mut graph = MetadataGraph::new();
    graph.populate(backend).await.unwrap();
    graph.select_document_type_by_name("AP Invoice").unwrap();
    graph.add_staging_table_columns(ColumnClass::Header, ["InvoiceNo", "AmountDue", "PONumber"]);
    graph
}

#[tokio::test]
async fn test_staging_and_export_written_to_files() {
    let templates = template_dir();
    let out = TempDir::new().unwrap();
    let backend = backend(Delivery::File);
    let graph = populated(&backend).await;

    let columns = ColumnSetRenderer::new(&graph).render_all(CreationType::DocType).unwrap();
    let generator = ArtifactGenerator::new(DirTemplateStore::new(templates.path()));

    let staging = generator.staging_tables(&columns).unwrap();
    let delivered = deliver(&backend, &staging, out.path()).await.unwrap();
    assert_eq!(delivered, Delivered::Written(out.path().join("StagingFromProp.sql")));
    assert_eq!(
        fs::read_to_string(out.path().join("StagingFromProp.sql")).unwrap(),
        "CREATE TABLE Header (Id int\r\n\t,[InvoiceNo] [varchar](250) NULL\r\n\t,[AmountDue] [decimal](18, 2) NULL\r\n\t,[PONumber] [varchar](250) NULL\r\n)\r\nCREATE TABLE Detail (Id int\r\n\t\r\n)"
    );

    let export = generator
        .export_procedure("spDocLinkExport", SprocAction::Create, &columns)
        .unwrap();
    deliver(&backend, &export, out.path()).await.unwrap();
    assert_eq!(
        fs::read_to_string(out.path().join("spDocLinkExport.sql")).unwrap(),
        "CREATE PROCEDURE [dbo].[spDocLinkExport]\r\nAS\r\nSELECT DocumentID, AnchorValue\r\n\t,[2]\r\n\t,[3]\r\nFROM src PIVOT (MAX(PropValue) FOR PropertyID IN ([0] ,[2]\r\n\t,[3])) AS p\r\n"
    );
}

#[tokio::test]
async fn test_commit_backend_runs_scripts() {
    let templates = template_dir();
    let out = TempDir::new().unwrap();
    let backend = backend(Delivery::Commit);
    let graph = populated(&backend).await;

    let columns = ColumnSetRenderer::new(&graph).render_all(CreationType::DocType).unwrap();
    let generator = ArtifactGenerator::new(DirTemplateStore::new(templates.path()));
    let export = generator
        .export_procedure("spDocLinkExport", SprocAction::Alter, &columns)
        .unwrap();

    assert_eq!(deliver(&backend, &export, out.path()).await.unwrap(), Delivered::Committed);

    let executed = backend.executed();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].starts_with("ALTER PROCEDURE [dbo].[spDocLinkExport]"));
    assert!(fs::read_dir(out.path()).unwrap().next().is_none());
}

/// Templates shipped at the workspace root
fn shipped_templates() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../templates")
}

#[tokio::test]
async fn test_shipped_staging_tables_match_drop_statement() {
    let backend = backend(Delivery::File);
    let graph = populated(&backend).await;
    let columns = ColumnSetRenderer::new(&graph).render_all(CreationType::DocType).unwrap();

    let staging = ArtifactGenerator::new(DirTemplateStore::new(shipped_templates()))
        .staging_tables(&columns)
        .unwrap();

    for table in ["Custom_StagingTable_Header", "Custom_StagingTable_Details"] {
        assert!(staging.sql.contains(&format!("CREATE TABLE [dbo].[{}]", table)), "{} not created", table);
        assert!(DROP_STAGING_TABLES.contains(table), "{} not dropped", table);
    }
}

#[tokio::test]
async fn test_shipped_export_reads_anchor_outside_pivot() {
    let backend = backend(Delivery::File);
    let graph = populated(&backend).await;
    let columns = ColumnSetRenderer::new(&graph).render_all(CreationType::DocType).unwrap();

    let export = ArtifactGenerator::new(DirTemplateStore::new(shipped_templates()))
        .export_procedure("spDocLinkExport", SprocAction::Create, &columns)
        .unwrap();

    assert!(export.sql.starts_with("CREATE PROCEDURE [dbo].[spDocLinkExport]"));
    assert!(export.sql.contains("anchor.PropertyID = 1\n"));
    assert!(export.sql.contains("SELECT DocumentID, AnchorValue ,[2]\r\n\t,[3]\n"));
    assert!(export.sql.contains("IN ([0] ,[2]\r\n\t,[3])) p"));
    assert!(!export.sql.contains(",[1]"));
    // No detail columns were chosen
    assert!(export.sql.contains("anchor.PropertyID = NULL\n"));
}
