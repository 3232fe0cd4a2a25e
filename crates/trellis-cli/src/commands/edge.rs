//! Edge commands

use clap::{Args, Subcommand};

use super::{parse_edge_id, parse_node_id, parse_properties};
use crate::output::{edge_line, print_json, print_properties, OutputFormat};
use crate::{AppContext, Cli};
use trellis_core::{Conditions, EdgeUpdate, NewEdge, Pagination};

#[derive(Args)]
pub struct EdgeArgs {
    #[command(subcommand)]
    pub command: EdgeCommands,
}

#[derive(Subcommand)]
pub enum EdgeCommands {
    /// Add a new edge between two existing nodes
    Add {
        /// Source node id
        from: String,
        /// Edge type
        edge_type: String,
        /// Target node id
        to: String,
        /// Property as key=value (repeatable)
        #[arg(short, long = "prop")]
        prop: Vec<String>,
        /// Confidence in [0, 1]
        #[arg(long, default_value = "1.0")]
        confidence: f64,
        /// Also add the reverse edge
        #[arg(long)]
        bidirectional: bool,
        /// Provenance session id
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Get edge details
    Get {
        /// Edge id
        id: String,
    },
    /// Update an existing edge
    Update {
        /// Edge id
        id: String,
        /// Set edge type
        #[arg(long = "set-type")]
        set_type: Option<String>,
        /// Property as key=value (repeatable)
        #[arg(short, long = "prop")]
        prop: Vec<String>,
        /// Replace the property map instead of merging into it
        #[arg(long)]
        replace: bool,
        /// Set confidence
        #[arg(long)]
        confidence: Option<f64>,
    },
    /// Delete an edge
    Delete {
        /// Edge id
        id: String,
    },
    /// List edges
    List {
        /// Filter by type
        #[arg(short = 't', long = "type")]
        edge_type: Option<String>,
        /// Filter by source node id
        #[arg(long)]
        from: Option<String>,
        /// Filter by target node id
        #[arg(long)]
        to: Option<String>,
        /// Limit results
        #[arg(short = 'n', long, default_value = "100")]
        limit: usize,
        /// Skip this many results
        #[arg(long, default_value = "0")]
        offset: usize,
    },
}

pub async fn run(args: &EdgeArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let format = cli.output_format();

    match &args.command {
        EdgeCommands::Add {
            from,
            edge_type,
            to,
            prop,
            confidence,
            bidirectional,
            session,
        } => {
            let mut new = NewEdge::new(parse_node_id(from)?, parse_node_id(to)?, edge_type)
                .with_properties(parse_properties(prop)?)
                .with_confidence(*confidence);
            if *bidirectional {
                new = new.bidirectional();
            }
            if let Some(session) = session {
                new = new.with_session(session);
            }
            let edge = ctx.engine.create_edge(new).await?;

            match format {
                OutputFormat::Json => print_json(&edge)?,
                OutputFormat::Table => println!("Created edge: {}", edge_line(&edge)),
            }
        }
        EdgeCommands::Get { id } => {
            let id = parse_edge_id(id)?;
            let Some(edge) = ctx.engine.get_edge(&id).await? else {
                anyhow::bail!("Edge not found: {}", id);
            };
            match format {
                OutputFormat::Json => print_json(&edge)?,
                OutputFormat::Table => {
                    println!("{}", edge_line(&edge));
                    print_properties(&edge.properties);
                }
            }
        }
        EdgeCommands::Update {
            id,
            set_type,
            prop,
            replace,
            confidence,
        } => {
            let id = parse_edge_id(id)?;
            let mut update = EdgeUpdate::new();
            update.edge_type = set_type.clone();
            update.confidence = *confidence;
            if !prop.is_empty() || *replace {
                update.properties = Some(parse_properties(prop)?);
            }

            let Some(edge) = ctx.engine.update_edge(&id, update, !replace).await? else {
                anyhow::bail!("Edge not found: {}", id);
            };
            match format {
                OutputFormat::Json => print_json(&edge)?,
                OutputFormat::Table => println!("Updated edge: {}", edge_line(&edge)),
            }
        }
        EdgeCommands::Delete { id } => {
            let id = parse_edge_id(id)?;
            if !ctx.engine.delete_edge(&id).await? {
                anyhow::bail!("Edge not found: {}", id);
            }
            println!("Deleted edge: {}", id);
        }
        EdgeCommands::List {
            edge_type,
            from,
            to,
            limit,
            offset,
        } => {
            let mut conditions = Conditions::new();
            if let Some(t) = edge_type {
                conditions = conditions.eq("type", t.as_str());
            }
            if let Some(from) = from {
                conditions = conditions.eq("from_node_id", parse_node_id(from)?.to_string());
            }
            if let Some(to) = to {
                conditions = conditions.eq("to_node_id", parse_node_id(to)?.to_string());
            }
            let edges = ctx
                .engine
                .query_edges(&conditions, Pagination::new(*limit, *offset))
                .await?;

            match format {
                OutputFormat::Json => print_json(&edges)?,
                OutputFormat::Table => {
                    if edges.is_empty() {
                        println!("No edges found");
                    }
                    for edge in &edges {
                        println!("{}", edge_line(edge));
                    }
                }
            }
        }
    }

    Ok(())
}
