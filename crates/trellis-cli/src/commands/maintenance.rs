//! Stats, vacuum and reindex commands

use crate::output::{print_json, OutputFormat};
use crate::{AppContext, Cli};

pub async fn stats(cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let stats = ctx.engine.stats().await?;
    match cli.output_format() {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Table => {
            println!("Backend: {}", ctx.engine.backend().name());
            println!("Nodes:   {}", stats.node_count);
            println!("Edges:   {}", stats.edge_count);
            println!("Indexes: {}", stats.index_count);
        }
    }
    Ok(())
}

pub async fn vacuum(_cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    ctx.engine.vacuum().await?;
    println!("Vacuumed {} database", ctx.engine.backend().name());
    Ok(())
}

pub async fn reindex(cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let report = ctx.engine.rebuild_indexes().await?;
    match cli.output_format() {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => println!(
            "Reindexed {} nodes and {} edges",
            report.nodes_indexed, report.edges_indexed
        ),
    }
    Ok(())
}
