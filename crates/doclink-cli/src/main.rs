use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use doclink_backend::{ApiBackend, ApiCredentials, Backend, BackendError, SqlBackend, TransactionJournal};
use doclink_core::{BackendConfig, ColumnClass, Config, CreationType, SprocAction};
use doclink_engine::columns::is_auto_included;
use doclink_engine::{ColumnSet, ColumnSetRenderer, GraphError, MetadataGraph};
use doclink_sql::{
    deliver, identical_sproc_check, ArtifactGenerator, Delivered, DirTemplateStore, GenerateError, TemplateStore,
};

const DEFAULT_CONFIG: &str = "doclink.toml";

/// DocLink - metadata inspection and SQL export generation
#[derive(Parser)]
#[command(name = "doclink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: doclink.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the metadata available on the backend
    Inspect {
        /// Also list the properties of this document type
        #[arg(long)]
        doc_type: Option<String>,
    },

    /// Generate the staging table script
    Staging {
        #[command(flatten)]
        target: Target,
    },

    /// Generate a pivoted export procedure
    ExportSproc {
        /// Procedure name; also the template key
        name: String,

        #[command(flatten)]
        target: Target,

        /// CREATE, ALTER or DROP (default: chosen from whether the procedure exists)
        #[arg(short, long)]
        action: Option<SprocAction>,
    },

    /// Report whether procedures exist and match their templates
    SprocStatus {
        names: Vec<String>,
    },

    /// Drop the staging tables
    DropStaging,
}

/// What an export is built from and which columns it carries
#[derive(Args)]
struct Target {
    /// Document type to export
    #[arg(long, conflicts_with = "stamp", required_unless_present = "stamp")]
    doc_type: Option<String>,

    /// Distribution stamp to export
    #[arg(long)]
    stamp: Option<String>,

    /// Header columns (formatted prompts or stamp captions)
    #[arg(long, value_delimiter = ',')]
    header: Vec<String>,

    /// Detail columns (formatted prompts or stamp captions)
    #[arg(long, value_delimiter = ',')]
    detail: Vec<String>,

    /// Do not add voucher, batch and company columns automatically
    #[arg(long)]
    no_auto: bool,
}

/// Connected backend, kept concrete so it can be closed properly
enum Session {
    Api(ApiBackend),
    Sql(SqlBackend),
}

impl Session {
    async fn open(config: &Config) -> Result<Self> {
        let backend_config = config.backend()?;
        let ttl = Duration::from_secs(config.cache.whitelist_ttl_secs);
        let password = backend_config.password();

        match backend_config {
            BackendConfig::Api(settings) => {
                let backend = ApiBackend::from_settings(settings, ttl)?;
                let credentials = ApiCredentials::from_settings(settings, password.unwrap_or_default());
                backend.connect(&credentials).await.context("API login failed")?;
                Ok(Self::Api(backend))
            }
            BackendConfig::Sql(settings) => {
                let mut backend = SqlBackend::new(ttl);
                if let Some(path) = config.journal_path() {
                    backend = backend.with_journal(TransactionJournal::new(path));
                }
                backend
                    .connect(settings, password.as_deref())
                    .await
                    .context("SQL Server connection failed")?;
                Ok(Self::Sql(backend))
            }
        }
    }

    fn backend(&self) -> &dyn Backend {
        match self {
            Self::Api(backend) => backend,
            Self::Sql(backend) => backend,
        }
    }

    async fn close(self) {
        match self {
            Self::Api(backend) => {
                if let Err(e) = backend.disconnect().await {
                    tracing::warn!(error = %e, "logout failed");
                }
            }
            Self::Sql(backend) => backend.disconnect().await,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.log_filter, cli.verbose);

    let session = Session::open(&config).await?;
    let result = run(&cli.command, &config, session.backend()).await;
    session.close().await;

    match result {
        Err(e) if is_unsupported(&e) => {
            eprintln!("{} {}", "not available on this backend:".yellow(), e);
            Ok(())
        }
        other => other,
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => Config::from_file(Path::new(DEFAULT_CONFIG))?,
        None => Config::default(),
    };
    Ok(config)
}

fn init_tracing(default_filter: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn is_unsupported(error: &anyhow::Error) -> bool {
    if let Some(e) = error.downcast_ref::<BackendError>() {
        return e.is_unsupported();
    }
    if let Some(e) = error.downcast_ref::<GraphError>() {
        return e.is_unsupported();
    }
    if let Some(e) = error.downcast_ref::<GenerateError>() {
        return e.is_unsupported();
    }
    false
}

async fn run(command: &Commands, config: &Config, backend: &dyn Backend) -> Result<()> {
    match command {
        Commands::Inspect { doc_type } => inspect_command(backend, doc_type.as_deref()).await,
        Commands::Staging { target } => staging_command(config, backend, target).await,
        Commands::ExportSproc { name, target, action } => export_command(config, backend, name, target, *action).await,
        Commands::SprocStatus { names } => sproc_status_command(config, backend, names).await,
        Commands::DropStaging => {
            backend.drop_staging_tables().await?;
            println!("{}", "Staging tables dropped".green());
            Ok(())
        }
    }
}

async fn inspect_command(backend: &dyn Backend, doc_type: Option<&str>) -> Result<()> {
    let mut graph = MetadataGraph::new();
    graph.populate(backend).await?;

    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", format!("DocLink metadata ({} backend)", backend.name()).bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Properties:       {}", graph.properties.len());
    println!("Document types:   {}", graph.document_types.len());
    println!("Workflows:        {}", graph.workflows.len());
    println!("Stamps:           {}", graph.stamps.len());
    println!("AI profiles:      {}", graph.ai_profiles.len());
    println!("Event tasks:      {}", graph.event_tasks.len());
    println!();

    println!("{}", "Document types:".bold());
    for doc in &graph.document_types {
        println!("  {} {} ({} properties)", format!("[{}]", doc.id).dimmed(), doc.name, doc.properties.len());
    }

    if !graph.stamps.is_empty() {
        println!("{}", "Distribution stamps:".bold());
        for stamp in &graph.stamps {
            println!("  {} {} ({} fields)", format!("[{}]", stamp.security_id).dimmed(), stamp.name, stamp.fields.len());
        }
    }

    if !graph.workflows.is_empty() {
        println!("{}", "Workflows:".bold());
        for workflow in &graph.workflows {
            let activities = graph.activities_by_workflow_id(workflow.id);
            println!("  {} {} ({} activities)", format!("[{}]", workflow.id).dimmed(), workflow.title, activities.len());
        }
    }

    if let Some(name) = doc_type {
        let doc = graph.document_type_by_name(name)?;
        println!();
        println!("{}", format!("Properties of {}:", doc.name).bold());
        for dtp in &doc.properties {
            let sql_type = dtp
                .property
                .sql_type()
                .map(|t| t.to_string())
                .unwrap_or_else(|e| e.to_string().red().to_string());
            let marker = if is_auto_included(&dtp.name()) { " (auto)".cyan().to_string() } else { String::new() };
            println!("  {:>3}. {:<30} {}{}", dtp.sequence_number, dtp.name(), sql_type, marker);
        }
    }

    Ok(())
}

/// Populate the graph, select the target and accumulate its columns
async fn prepare_columns(backend: &dyn Backend, target: &Target) -> Result<(MetadataGraph, CreationType)> {
    let mut graph = MetadataGraph::new();
    graph.populate(backend).await?;

    let (creation, name) = match (&target.doc_type, &target.stamp) {
        (Some(doc_type), _) => (CreationType::DocType, doc_type),
        (None, Some(stamp)) => (CreationType::DistStamp, stamp),
        (None, None) => anyhow::bail!("either --doc-type or --stamp is required"),
    };
    graph.set_selected_object_by_name(creation, name)?;

    // Names offered by the selected object, in its own order
    let available: Vec<String> = match creation {
        CreationType::DocType => graph
            .selected_document_type()
            .map(|doc| doc.properties.iter().map(|p| p.name()).collect())
            .unwrap_or_default(),
        _ => graph
            .selected_stamp()
            .map(|stamp| stamp.fields.iter().map(|f| f.caption.clone()).collect())
            .unwrap_or_default(),
    };

    let mut header = target.header.clone();
    let detail = target.detail.clone();
    if header.is_empty() && detail.is_empty() {
        header = available.clone();
    }

    if !target.no_auto {
        for name in available.iter().filter(|n| is_auto_included(n)) {
            if !header.contains(name) && !detail.contains(name) {
                tracing::debug!(column = %name, "auto-including column");
                header.push(name.clone());
            }
        }
    }

    graph.add_staging_table_columns(ColumnClass::Header, header);
    graph.add_staging_table_columns(ColumnClass::Detail, detail);
    Ok((graph, creation))
}

fn render_columns(graph: &MetadataGraph, creation: CreationType) -> Result<ColumnSet> {
    Ok(ColumnSetRenderer::new(graph).render_all(creation)?)
}

fn report_delivery(delivered: &Delivered) {
    match delivered {
        Delivered::Written(path) => println!("{} {}", "✓ Written:".green(), path.display()),
        Delivered::Committed => println!("{}", "✓ Committed to database".green()),
    }
}

async fn staging_command(config: &Config, backend: &dyn Backend, target: &Target) -> Result<()> {
    let (graph, creation) = prepare_columns(backend, target).await?;
    let columns = render_columns(&graph, creation)?;

    let generator = ArtifactGenerator::new(DirTemplateStore::new(config.template_path()));
    let artifact = generator.staging_tables(&columns)?;
    let delivered = deliver(backend, &artifact, &config.output_path()).await?;

    println!(
        "Staging tables: {} header, {} detail columns",
        columns.header().len(),
        columns.detail().len()
    );
    report_delivery(&delivered);
    Ok(())
}

async fn export_command(
    config: &Config,
    backend: &dyn Backend,
    name: &str,
    target: &Target,
    action: Option<SprocAction>,
) -> Result<()> {
    let (mut graph, creation) = prepare_columns(backend, target).await?;
    graph.populate_sproc_info(backend, &[name]).await?;

    let action = action.unwrap_or_else(|| SprocAction::for_existing(graph.sproc_exists(name).unwrap_or(false)));
    graph.set_sproc_action(name, action)?;

    let columns = render_columns(&graph, creation)?;
    let generator = ArtifactGenerator::new(DirTemplateStore::new(config.template_path()));
    let artifact = generator.export_procedure(name, action, &columns)?;
    let delivered = deliver(backend, &artifact, &config.output_path()).await?;

    println!("{} {}", format!("{} PROCEDURE", action).bold(), name);
    report_delivery(&delivered);
    Ok(())
}

/// Compare each procedure on its own so one failure does not hide the rest
async fn compare_procedures<S: TemplateStore>(
    generator: &ArtifactGenerator<S>,
    graph: &mut MetadataGraph,
    backend: &dyn Backend,
    names: &[String],
) -> Vec<(String, GenerateError)> {
    let mut failures = Vec::new();
    for name in names {
        if let Err(e) = identical_sproc_check(generator, graph, backend, std::slice::from_ref(name), None).await {
            tracing::debug!(sproc = %name, error = %e, "comparison failed");
            failures.push((name.clone(), e));
        }
    }
    failures
}

async fn sproc_status_command(config: &Config, backend: &dyn Backend, names: &[String]) -> Result<()> {
    let mut graph = MetadataGraph::new();
    graph.populate_sproc_info(backend, names).await?;

    let generator = ArtifactGenerator::new(DirTemplateStore::new(config.template_path()));
    for (name, e) in compare_procedures(&generator, &mut graph, backend, names).await {
        // Export templates need columns; those report existence only
        eprintln!("{} {}: {}", "⚠ Comparison skipped for".yellow(), name, e);
    }

    println!("{}", "Stored procedures:".bold());
    for info in graph.sprocs() {
        let exists = if info.exists { "exists".green() } else { "missing".red() };
        let identical = match info.identical {
            Some(true) => "identical".green(),
            Some(false) => "differs".yellow(),
            None => "not compared".dimmed(),
        };
        println!("  {:<40} {:<8} {}", info.name, exists, identical);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use doclink_backend::MockBackend;
    use doclink_sql::MemoryTemplateStore;

    #[tokio::test]
    async fn test_failed_comparison_does_not_stop_the_rest() {
        let backend = MockBackend::builder()
            .with_sproc("spExport", "CREATE PROCEDURE spExport AS SELECT 1")
            .with_sproc("spCleanup", "CREATE PROCEDURE spCleanup AS SELECT 1")
            .build();
        let generator = ArtifactGenerator::new(
            MemoryTemplateStore::new()
                .with_template("spExport", "{{ ACTION }} PROCEDURE spExport AS SELECT {{ SELECT_HEADER_PROP_IDS }}")
                .with_template("spCleanup", "{{ ACTION }} PROCEDURE spCleanup AS SELECT 1"),
        );
        let names = vec!["spExport".to_string(), "spCleanup".to_string()];

        let mut graph = MetadataGraph::new();
        graph.populate_sproc_info(&backend, &names).await.unwrap();
        let failures = compare_procedures(&generator, &mut graph, &backend, &names).await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "spExport");
        assert_eq!(graph.sproc_info("spExport").unwrap().identical, None);
        assert_eq!(graph.sproc_info("spCleanup").unwrap().identical, Some(true));
    }
}
