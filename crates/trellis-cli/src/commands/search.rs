//! Search command

use clap::Args;

use crate::output::{node_line, print_json, OutputFormat};
use crate::{AppContext, Cli};
use trellis_core::SearchQuery;

#[derive(Args)]
pub struct SearchArgs {
    /// Search text
    pub query: String,

    /// Maximum results (default from config)
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Drop hits scoring below this
    #[arg(long)]
    pub min_score: Option<f64>,

    /// Keep only these node types (repeatable)
    #[arg(short = 't', long = "type")]
    pub node_type: Vec<String>,
}

pub async fn run(args: &SearchArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let mut query = SearchQuery::new(&args.query)
        .with_limit(args.limit.unwrap_or(ctx.engine.config().default_search_limit));
    if let Some(min) = args.min_score {
        query = query.with_min_score(min);
    }
    for t in &args.node_type {
        query = query.with_node_type(t);
    }

    let hits = ctx.engine.search(&query).await?;

    match cli.output_format() {
        OutputFormat::Json => print_json(&hits)?,
        OutputFormat::Table => {
            if hits.is_empty() {
                println!("No results found for: {}", args.query);
                return Ok(());
            }
            println!("Found {} results for: {}", hits.len(), args.query);
            for hit in &hits {
                println!("{:>6.2}  {}", hit.score, node_line(&hit.node));
            }
        }
    }
    Ok(())
}
