//! Traversal and path commands

use clap::Args;

use super::parse_node_id;
use crate::output::{edge_line, node_line, print_json, OutputFormat};
use crate::{AppContext, Cli};
use trellis_core::{Direction, PathQuery, TraversalQuery};

#[derive(Args)]
pub struct TraverseArgs {
    /// Start node id
    pub start: String,

    /// Maximum depth (default from config)
    #[arg(long)]
    pub depth: Option<u32>,

    /// Direction: out, in, both
    #[arg(long, default_value = "both")]
    pub direction: Direction,

    /// Follow only these edge types (repeatable)
    #[arg(short = 't', long = "edge-type")]
    pub edge_type: Vec<String>,

    /// Allow nodes to be expanded more than once
    #[arg(long)]
    pub revisit: bool,
}

#[derive(Args)]
pub struct PathArgs {
    /// Source node id
    pub from: String,

    /// Target node id
    pub to: String,

    /// Follow only these edge types (repeatable)
    #[arg(short = 't', long = "edge-type")]
    pub edge_type: Vec<String>,

    /// Give up beyond this many hops
    #[arg(long)]
    pub max_depth: Option<u32>,
}

pub async fn run_traverse(args: &TraverseArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let depth = args
        .depth
        .unwrap_or(ctx.engine.config().default_traversal_depth);
    let mut query = TraversalQuery::new(parse_node_id(&args.start)?)
        .with_depth(depth)
        .with_direction(args.direction)
        .filter_edge_types(args.edge_type.clone());
    if args.revisit {
        query = query.allow_revisits();
    }

    let result = ctx.engine.traverse(&query).await?;

    match cli.output_format() {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            if result.nodes.is_empty() {
                println!("Start node not found: {}", args.start);
                return Ok(());
            }
            println!(
                "Visited {} nodes and {} edges (max depth {}, relevance {:.2}){}",
                result.stats.nodes_visited,
                result.stats.edges_traversed,
                result.stats.max_depth_reached,
                result.relevance,
                if result.stats.truncated { ", truncated" } else { "" }
            );
            println!("Nodes:");
            for node in &result.nodes {
                println!("  {}", node_line(node));
            }
            if !result.edges.is_empty() {
                println!("Edges:");
                for edge in &result.edges {
                    println!("  {}", edge_line(edge));
                }
            }
        }
    }
    Ok(())
}

pub async fn run_path(args: &PathArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let from = parse_node_id(&args.from)?;
    let to = parse_node_id(&args.to)?;
    let mut query = PathQuery::new().filter_edge_types(args.edge_type.clone());
    if let Some(depth) = args.max_depth {
        query = query.with_max_depth(depth);
    }

    let path = ctx.engine.find_shortest_path(&from, &to, &query).await?;

    match cli.output_format() {
        OutputFormat::Json => print_json(&path)?,
        OutputFormat::Table => match path {
            None => println!("No path found from {} to {}", from, to),
            Some(path) => {
                println!("Path of length {}:", path.length);
                let labels: Vec<&str> = path.nodes.iter().map(|n| n.label.as_str()).collect();
                println!("  {}", labels.join(" -> "));
                for edge in &path.edges {
                    println!("  {}", edge_line(edge));
                }
            }
        },
    }
    Ok(())
}
