//! Trellis CLI - Command line interface for the typed graph engine

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{analyze, completions, edge, import, maintenance, node, search, traverse};
use output::OutputFormat;
use trellis_engine::GraphEngine;
use trellis_storage::{MemoryStorage, StorageBackend};

/// Storage backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    Sqlite,
    Redb,
    /// Not persisted; useful with `import` for one-off analysis
    Memory,
}

#[derive(Parser)]
#[command(name = "trellis")]
#[command(author, version, about = "Typed graph engine with analytics")]
pub struct Cli {
    /// Data directory
    #[arg(short, long, env = "TRELLIS_DATA_DIR", global = true)]
    pub data_dir: Option<String>,

    /// Engine config file (default: <data-dir>/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage backend
    #[arg(short, long, value_enum, default_value = "sqlite", global = true)]
    pub backend: BackendKind,

    /// Output format: table, json
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Get the data directory path
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(config::default_data_dir)
    }

    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from(self.format.as_str())
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage nodes
    Node(node::NodeArgs),
    /// Manage edges
    Edge(edge::EdgeArgs),
    /// Search nodes by term
    Search(search::SearchArgs),
    /// Expand the neighborhood of a node
    Traverse(traverse::TraverseArgs),
    /// Find the shortest outgoing path between two nodes
    Path(traverse::PathArgs),
    /// Run graph analytics
    Analyze(analyze::AnalyzeArgs),
    /// Ingest an extraction batch from a JSON file
    Import(import::ImportArgs),
    /// Show row counts
    Stats,
    /// Compact the database
    Vacuum,
    /// Regenerate every index row
    Reindex,
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Application context with the engine
pub struct AppContext {
    pub engine: GraphEngine,
}

impl AppContext {
    pub async fn new(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = cli.data_dir();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let engine_config = config::load_engine_config(cli.config.as_deref(), &data_dir)?;
        let backend = open_backend(cli.backend, &data_dir)?;

        let engine = GraphEngine::with_config(backend, engine_config);
        engine.initialize().await?;
        Ok(Self { engine })
    }
}

fn open_backend(kind: BackendKind, data_dir: &std::path::Path) -> anyhow::Result<Arc<dyn StorageBackend>> {
    match kind {
        #[cfg(feature = "sqlite")]
        BackendKind::Sqlite => {
            let db_path = data_dir.join("trellis.db");
            tracing::debug!("Using database at: {:?}", db_path);
            Ok(Arc::new(trellis_storage::SqliteStorage::open(&db_path)?))
        }
        #[cfg(feature = "redb")]
        BackendKind::Redb => {
            let db_path = data_dir.join("trellis.redb");
            tracing::debug!("Using database at: {:?}", db_path);
            Ok(Arc::new(trellis_storage::RedbStorage::open(&db_path)?))
        }
        BackendKind::Memory => Ok(Arc::new(MemoryStorage::new())),
        #[allow(unreachable_patterns)]
        other => anyhow::bail!("Backend {:?} is not compiled into this build", other),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    tracing::debug!("Starting trellis CLI");

    if let Commands::Completions(args) = &cli.command {
        return completions::run(args);
    }

    let ctx = AppContext::new(&cli).await?;

    match &cli.command {
        Commands::Node(args) => node::run(args, &cli, &ctx).await?,
        Commands::Edge(args) => edge::run(args, &cli, &ctx).await?,
        Commands::Search(args) => search::run(args, &cli, &ctx).await?,
        Commands::Traverse(args) => traverse::run_traverse(args, &cli, &ctx).await?,
        Commands::Path(args) => traverse::run_path(args, &cli, &ctx).await?,
        Commands::Analyze(args) => analyze::run(args, &cli, &ctx).await?,
        Commands::Import(args) => import::run(args, &cli, &ctx).await?,
        Commands::Stats => maintenance::stats(&cli, &ctx).await?,
        Commands::Vacuum => maintenance::vacuum(&cli, &ctx).await?,
        Commands::Reindex => maintenance::reindex(&cli, &ctx).await?,
        Commands::Completions(_) => {}
    }

    ctx.engine.close().await?;
    Ok(())
}
