//! Node commands

use clap::{Args, Subcommand};

use super::{parse_node_id, parse_properties};
use crate::output::{node_line, print_json, print_properties, OutputFormat};
use crate::{AppContext, Cli};
use trellis_core::{Conditions, NewNode, NodeUpdate, Pagination};

#[derive(Args)]
pub struct NodeArgs {
    #[command(subcommand)]
    pub command: NodeCommands,
}

#[derive(Subcommand)]
pub enum NodeCommands {
    /// Add a new node
    Add {
        /// Node type
        #[arg(short = 't', long = "type")]
        node_type: String,
        /// Node label
        label: String,
        /// Property as key=value (repeatable)
        #[arg(short, long = "prop")]
        prop: Vec<String>,
        /// Confidence in [0, 1]
        #[arg(long, default_value = "1.0")]
        confidence: f64,
        /// Provenance session id
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Get node details
    Get {
        /// Node id
        id: String,
    },
    /// Update an existing node
    Update {
        /// Node id
        id: String,
        /// Set node type
        #[arg(long = "set-type")]
        set_type: Option<String>,
        /// Set label
        #[arg(short, long)]
        label: Option<String>,
        /// Property as key=value (repeatable)
        #[arg(short, long = "prop")]
        prop: Vec<String>,
        /// Replace the property map instead of merging into it
        #[arg(long)]
        replace: bool,
        /// Set confidence
        #[arg(long)]
        confidence: Option<f64>,
        /// Provenance session id
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Delete a node and its edges
    Delete {
        /// Node id
        id: String,
    },
    /// List nodes
    List {
        /// Filter by type
        #[arg(short = 't', long = "type")]
        node_type: Option<String>,
        /// Filter by exact label
        #[arg(short, long)]
        label: Option<String>,
        /// Limit results
        #[arg(short = 'n', long, default_value = "100")]
        limit: usize,
        /// Skip this many results
        #[arg(long, default_value = "0")]
        offset: usize,
    },
}

pub async fn run(args: &NodeArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let format = cli.output_format();

    match &args.command {
        NodeCommands::Add {
            node_type,
            label,
            prop,
            confidence,
            session,
        } => {
            let mut new = NewNode::new(node_type, label)
                .with_properties(parse_properties(prop)?)
                .with_confidence(*confidence);
            if let Some(session) = session {
                new = new.with_session(session);
            }
            let node = ctx.engine.create_node(new).await?;

            match format {
                OutputFormat::Json => print_json(&node)?,
                OutputFormat::Table => println!("Created node: {}", node_line(&node)),
            }
        }
        NodeCommands::Get { id } => {
            let id = parse_node_id(id)?;
            let Some(node) = ctx.engine.get_node(&id).await? else {
                anyhow::bail!("Node not found: {}", id);
            };

            match format {
                OutputFormat::Json => print_json(&node)?,
                OutputFormat::Table => {
                    println!("{}", node_line(&node));
                    print_properties(&node.properties);
                    if !node.source_session_ids.is_empty() {
                        let sessions: Vec<&str> =
                            node.source_session_ids.iter().map(String::as_str).collect();
                        println!("  sessions: {}", sessions.join(", "));
                    }
                    println!("  created: {}", node.created_at.format("%Y-%m-%d %H:%M:%S"));
                    println!("  updated: {}", node.updated_at.format("%Y-%m-%d %H:%M:%S"));
                }
            }
        }
        NodeCommands::Update {
            id,
            set_type,
            label,
            prop,
            replace,
            confidence,
            session,
        } => {
            let id = parse_node_id(id)?;
            let mut update = NodeUpdate::new();
            update.node_type = set_type.clone();
            update.label = label.clone();
            update.confidence = *confidence;
            update.session_id = session.clone();
            if !prop.is_empty() || *replace {
                update.properties = Some(parse_properties(prop)?);
            }

            let Some(node) = ctx.engine.update_node(&id, update, !replace).await? else {
                anyhow::bail!("Node not found: {}", id);
            };
            match format {
                OutputFormat::Json => print_json(&node)?,
                OutputFormat::Table => println!("Updated node: {}", node_line(&node)),
            }
        }
        NodeCommands::Delete { id } => {
            let id = parse_node_id(id)?;
            if !ctx.engine.delete_node(&id).await? {
                anyhow::bail!("Node not found: {}", id);
            }
            println!("Deleted node: {}", id);
        }
        NodeCommands::List {
            node_type,
            label,
            limit,
            offset,
        } => {
            let mut conditions = Conditions::new();
            if let Some(t) = node_type {
                conditions = conditions.eq("type", t.as_str());
            }
            if let Some(l) = label {
                conditions = conditions.eq("label", l.as_str());
            }
            let nodes = ctx
                .engine
                .query_nodes(&conditions, Pagination::new(*limit, *offset))
                .await?;

            match format {
                OutputFormat::Json => print_json(&nodes)?,
                OutputFormat::Table => {
                    if nodes.is_empty() {
                        println!("No nodes found");
                    }
                    for node in &nodes {
                        println!("{}", node_line(node));
                    }
                }
            }
        }
    }

    Ok(())
}
