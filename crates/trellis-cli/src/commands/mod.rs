//! CLI command implementations

pub mod analyze;
pub mod completions;
pub mod edge;
pub mod import;
pub mod maintenance;
pub mod node;
pub mod search;
pub mod traverse;

use anyhow::Context;
use trellis_core::{EdgeId, NodeId, Properties};

/// Parse repeated `key=value` arguments.
///
/// Values that parse as JSON keep their JSON type; anything else is a string.
pub fn parse_properties(pairs: &[String]) -> anyhow::Result<Properties> {
    let mut properties = Properties::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .with_context(|| format!("Invalid property '{}', expected key=value", pair))?;
        let value = serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        properties.insert(key.trim().to_string(), value);
    }
    Ok(properties)
}

pub fn parse_node_id(raw: &str) -> anyhow::Result<NodeId> {
    raw.parse()
        .with_context(|| format!("Invalid node id '{}'", raw))
}

pub fn parse_edge_id(raw: &str) -> anyhow::Result<EdgeId> {
    raw.parse()
        .with_context(|| format!("Invalid edge id '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_properties() {
        let props = parse_properties(&[
            "born=1815".to_string(),
            "name=Ada Lovelace".to_string(),
            "active=true".to_string(),
        ])
        .unwrap();
        assert_eq!(props["born"], json!(1815));
        assert_eq!(props["name"], json!("Ada Lovelace"));
        assert_eq!(props["active"], json!(true));

        assert!(parse_properties(&["novalue".to_string()]).is_err());
    }
}
