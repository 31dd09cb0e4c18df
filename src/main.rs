use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use relgraph::config::{RunConfig, RunOverrides};
use relgraph::extractor::SqliteMetadataProvider;
use relgraph::hierarchy::InheritanceDescriptor;
use relgraph::mapping_config::ConfigDocument;
use relgraph::pipeline::{ExecutionMode, LoggingListener, MappingContext, MappingPipeline};
use relgraph::resolver::{DriverTypeMap, NameResolverKind};

/// relgraph - derive a graph schema from a relational database
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// SQLite database file to read
    #[arg(long)]
    db: PathBuf,

    /// Mapping configuration (JSON or YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Inheritance descriptor (YAML or JSON)
    #[arg(long)]
    hierarchy: Option<PathBuf>,

    /// naive | naive-aggregate
    #[arg(long)]
    mode: Option<ExecutionMode>,

    /// java | original
    #[arg(long)]
    resolver: Option<NameResolverKind>,

    /// Source type table: generic, sqlite, mysql, postgresql, hsqldb, oracle, sqlserver
    #[arg(long)]
    driver: Option<DriverTypeMap>,

    /// Tables to read (repeatable)
    #[arg(long)]
    include: Vec<String>,

    /// Tables to skip (repeatable)
    #[arg(long)]
    exclude: Vec<String>,

    /// YAML run settings, overridden by the flags above
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Write the configuration rebuilt from the final model here
    #[arg(long)]
    emit_config: Option<PathBuf>,
}

impl From<&Cli> for RunOverrides {
    fn from(cli: &Cli) -> Self {
        RunOverrides {
            execution_mode: cli.mode,
            name_resolver: cli.resolver,
            driver: cli.driver,
            include_tables: (!cli.include.is_empty()).then(|| cli.include.clone()),
            exclude_tables: (!cli.exclude.is_empty()).then(|| cli.exclude.clone()),
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = RunConfig::load(cli.settings.as_deref(), RunOverrides::from(&cli))
        .context("Invalid run settings")?;

    let mut pipeline = MappingPipeline::new()
        .with_name_resolver(settings.name_resolver)
        .with_driver(settings.driver)
        .with_filter(settings.table_filter());
    if let Some(path) = &cli.config {
        pipeline = pipeline.with_configuration(ConfigDocument::from_file(path)?);
    }
    if let Some(path) = &cli.hierarchy {
        pipeline = pipeline.with_hierarchy(InheritanceDescriptor::from_file(path)?);
    }

    let mut provider = SqliteMetadataProvider::open(&cli.db)
        .with_context(|| format!("Cannot open database '{}'", cli.db.display()))?;
    let mut ctx = MappingContext::new(settings.execution_mode);
    ctx.add_listener(Box::new(LoggingListener));

    let output = pipeline.run(&mut provider, &mut ctx)?;

    println!("{}", serde_json::to_string_pretty(&output.summary())?);

    if let Some(path) = &cli.emit_config {
        let data_source = cli
            .db
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "db".to_string());
        let document = output.configuration(&data_source).to_json_pretty()?;
        std::fs::write(path, document)
            .with_context(|| format!("Cannot write configuration to '{}'", path.display()))?;
        log::info!("Configuration written to {}", path.display());
    }

    if !ctx.warnings().is_empty() {
        eprintln!("\n{} warning(s):", ctx.warnings().len());
        for warning in ctx.warnings() {
            eprintln!("  - {}", warning);
        }
    }
    Ok(())
}

fn main() {
    // Defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
