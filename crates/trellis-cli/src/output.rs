//! Output formatting utilities

use serde::Serialize;
use trellis_core::{Edge, Node};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Table,
        }
    }
}

/// Print `data` as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(data: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// One-line summary of a node
pub fn node_line(node: &Node) -> String {
    format!(
        "{}  [{}] {} (confidence: {:.2})",
        node.id, node.node_type, node.label, node.confidence
    )
}

/// One-line summary of an edge
pub fn edge_line(edge: &Edge) -> String {
    format!(
        "{}  {} -[{}]-> {} (confidence: {:.2})",
        edge.id, edge.from_node_id, edge.edge_type, edge.to_node_id, edge.confidence
    )
}

/// Print the properties of an entity, one per line
pub fn print_properties(properties: &trellis_core::Properties) {
    let mut keys: Vec<&String> = properties.keys().collect();
    keys.sort();
    for key in keys {
        println!("  {}: {}", key, properties[key]);
    }
}
