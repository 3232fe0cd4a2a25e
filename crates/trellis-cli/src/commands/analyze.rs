//! Analytics commands

use std::collections::HashMap;

use clap::{Args, Subcommand};
use serde_json::json;

use super::parse_node_id;
use crate::output::{print_json, OutputFormat};
use crate::{AppContext, Cli};
use trellis_core::{Conditions, NodeId, Pagination};
use trellis_engine::PageRankConfig;

#[derive(Args)]
pub struct AnalyzeArgs {
    #[command(subcommand)]
    pub command: AnalyzeCommands,
}

#[derive(Subcommand)]
pub enum AnalyzeCommands {
    /// Degree centrality of one node, or of all nodes
    Degree {
        /// Node id (all nodes when omitted)
        node: Option<String>,
    },
    /// PageRank of all nodes
    #[command(name = "pagerank")]
    PageRank {
        /// Damping factor (default from config)
        #[arg(long)]
        damping: Option<f64>,
        /// Iteration count (default from config)
        #[arg(long)]
        iterations: Option<usize>,
    },
    /// Directed cycles
    Cycles,
    /// Weakly connected components
    Components,
    /// Maximal cliques
    Cliques {
        /// Smallest clique reported
        #[arg(long, default_value = "3")]
        min_size: usize,
    },
    /// Local clustering coefficient of a node
    Clustering {
        /// Node id
        node: String,
    },
    /// Communities by label propagation
    Communities {
        /// Round cap (default from config)
        #[arg(long)]
        max_iterations: Option<usize>,
    },
}

pub async fn run(args: &AnalyzeArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let analytics = ctx.engine.analytics();
    let format = cli.output_format();

    match &args.command {
        AnalyzeCommands::Degree { node: Some(node) } => {
            let id = parse_node_id(node)?;
            let degree = analytics.degree_centrality(&id).await?;
            match format {
                OutputFormat::Json => print_json(&json!({ "node_id": id, "degree": degree }))?,
                OutputFormat::Table => println!("{}  degree {}", id, degree),
            }
        }
        AnalyzeCommands::Degree { node: None } => {
            let degrees = analytics.degree_centralities().await?;
            match format {
                OutputFormat::Json => print_json(&degrees)?,
                OutputFormat::Table => {
                    let labels = labels(ctx).await?;
                    for (id, degree) in &degrees {
                        println!("{:>5}  {}  {}", degree, id, label_of(&labels, id));
                    }
                }
            }
        }
        AnalyzeCommands::PageRank { damping, iterations } => {
            let mut config = PageRankConfig::from(ctx.engine.config());
            if let Some(d) = damping {
                config.damping = *d;
            }
            if let Some(i) = iterations {
                config.iterations = *i;
            }
            let mut ranks = analytics.page_rank(config).await?;
            ranks.sort_by(|a, b| b.1.total_cmp(&a.1));

            match format {
                OutputFormat::Json => print_json(&ranks)?,
                OutputFormat::Table => {
                    let labels = labels(ctx).await?;
                    for (id, rank) in &ranks {
                        println!("{:.6}  {}  {}", rank, id, label_of(&labels, id));
                    }
                }
            }
        }
        AnalyzeCommands::Cycles => {
            let cycles = analytics.detect_cycles().await?;
            match format {
                OutputFormat::Json => print_json(&cycles)?,
                OutputFormat::Table => {
                    let labels = labels(ctx).await?;
                    println!("Found {} cycles", cycles.len());
                    for cycle in &cycles {
                        print_group(&labels, &cycle.node_ids, " -> ");
                    }
                }
            }
        }
        AnalyzeCommands::Components => {
            let components = analytics.connected_components().await?;
            print_groups(ctx, format, "components", &components).await?;
        }
        AnalyzeCommands::Cliques { min_size } => {
            let cliques = analytics.find_cliques(*min_size).await?;
            print_groups(ctx, format, "cliques", &cliques).await?;
        }
        AnalyzeCommands::Clustering { node } => {
            let id = parse_node_id(node)?;
            let coefficient = analytics.clustering_coefficient(&id).await?;
            match format {
                OutputFormat::Json => {
                    print_json(&json!({ "node_id": id, "clustering_coefficient": coefficient }))?
                }
                OutputFormat::Table => println!("{}  clustering {:.4}", id, coefficient),
            }
        }
        AnalyzeCommands::Communities { max_iterations } => {
            let communities = analytics.detect_communities(*max_iterations).await?;
            print_groups(ctx, format, "communities", &communities).await?;
        }
    }

    Ok(())
}

async fn labels(ctx: &AppContext) -> anyhow::Result<HashMap<NodeId, String>> {
    Ok(ctx
        .engine
        .query_nodes(&Conditions::new(), Pagination::all())
        .await?
        .into_iter()
        .map(|n| (n.id, n.label))
        .collect())
}

fn label_of<'a>(labels: &'a HashMap<NodeId, String>, id: &NodeId) -> &'a str {
    labels.get(id).map(String::as_str).unwrap_or("?")
}

fn print_group(labels: &HashMap<NodeId, String>, ids: &[NodeId], sep: &str) {
    let names: Vec<&str> = ids.iter().map(|id| label_of(labels, id)).collect();
    println!("  {}", names.join(sep));
}

async fn print_groups(
    ctx: &AppContext,
    format: OutputFormat,
    what: &str,
    groups: &[Vec<NodeId>],
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(groups)?,
        OutputFormat::Table => {
            let labels = labels(ctx).await?;
            println!("Found {} {}", groups.len(), what);
            for group in groups {
                print_group(&labels, group, ", ");
            }
        }
    }
    Ok(())
}
