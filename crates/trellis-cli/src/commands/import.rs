//! Import command
//!
//! Reads an extraction batch of the form
//! `{"nodes": [{"type", "label", ...}], "edges": [{"type", "from_label", "to_label", ...}]}`.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::output::{print_json, OutputFormat};
use crate::{AppContext, Cli};
use trellis_engine::{ExtractionBatch, MergeStrategy};

#[derive(Args)]
pub struct ImportArgs {
    /// Input file (JSON format)
    pub file: PathBuf,

    /// What to do with nodes and edges that already exist: merge, replace, skip
    #[arg(long, default_value = "merge")]
    pub strategy: MergeStrategy,

    /// Provenance session id recorded on every touched entity
    #[arg(short, long, default_value = "import")]
    pub session: String,
}

pub async fn run(args: &ImportArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let batch: ExtractionBatch = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid extraction batch in {}", args.file.display()))?;

    tracing::info!(
        "Importing {} nodes and {} edges from {:?}",
        batch.nodes.len(),
        batch.edges.len(),
        args.file
    );
    let report = ctx.engine.ingest(batch, args.strategy, &args.session).await?;

    match cli.output_format() {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!(
                "Nodes: {} created, {} updated, {} skipped",
                report.nodes_created, report.nodes_updated, report.nodes_skipped
            );
            println!(
                "Edges: {} created, {} updated, {} skipped",
                report.edges_created, report.edges_updated, report.edges_skipped
            );
            if !report.failures.is_empty() {
                println!("Failures:");
                for failure in &report.failures {
                    println!("  - {}", failure);
                }
            }
        }
    }
    Ok(())
}
