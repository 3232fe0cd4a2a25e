//! Directed cycle detection

use super::GraphAnalytics;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use trellis_core::{Direction, Edge, NodeId, Result};

/// A directed cycle: `edges[i]` runs from `node_ids[i]` to the next node,
/// and the last edge closes back on `node_ids[0]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub node_ids: Vec<NodeId>,
    pub edges: Vec<Edge>,
}

struct Frame {
    node: NodeId,
    out: Vec<Edge>,
    next: usize,
}

impl GraphAnalytics<'_> {
    /// Depth-first search over outgoing edges; every back edge yields one
    /// cycle. Roots are taken in storage order.
    pub async fn detect_cycles(&self) -> Result<Vec<Cycle>> {
        let mut cycles = Vec::new();
        let mut done: HashSet<NodeId> = HashSet::new();

        for root in self.node_ids().await? {
            if done.contains(&root) {
                continue;
            }

            // path[i] is the node of stack[i]; path_edges[i] leads into path[i + 1]
            let mut stack = vec![self.frame(root).await?];
            let mut on_stack: HashSet<NodeId> = HashSet::from([root]);
            let mut path_edges: Vec<Edge> = Vec::new();

            while let Some(top) = stack.last_mut() {
                let Some(edge) = top.out.get(top.next).cloned() else {
                    let finished = top.node;
                    stack.pop();
                    path_edges.pop();
                    on_stack.remove(&finished);
                    done.insert(finished);
                    continue;
                };
                top.next += 1;
                let target = edge.to_node_id;

                if on_stack.contains(&target) {
                    let start = stack.iter().position(|f| f.node == target).unwrap_or(0);
                    let mut edges = path_edges[start..].to_vec();
                    edges.push(edge);
                    cycles.push(Cycle {
                        node_ids: stack[start..].iter().map(|f| f.node).collect(),
                        edges,
                    });
                } else if !done.contains(&target) {
                    let frame = self.frame(target).await?;
                    on_stack.insert(target);
                    path_edges.push(edge);
                    stack.push(frame);
                }
            }
        }

        tracing::debug!("Detected {} cycles", cycles.len());
        Ok(cycles)
    }

    async fn frame(&self, node: NodeId) -> Result<Frame> {
        Ok(Frame {
            node,
            out: self.incident_edges(&node, Direction::Outgoing).await?,
            next: 0,
        })
    }
}
