//! Graph materialization.
//!
//! Builds a directed multigraph from classified row values. Nodes are keyed
//! by identity and edges by `(start, end, relationship identity)`, so
//! parallel relationships between the same ordered pair stay distinct.
//!
//! Insertion is idempotent and first-seen wins: when an identity reappears,
//! possibly with a different property snapshot, the later occurrence is a
//! no-op.

use crate::classify::classify;
use crate::error::Result;
use crate::value::{
    properties_to_json, AttributeValue, ElementId, GraphValue, NodeValue, PathValue, Properties,
    RelationshipValue, ResultRow,
};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Attributes stored for a node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub identity: ElementId,
    /// A set while materializing, a list once normalized.
    pub labels: AttributeValue,
    pub properties: Properties,
}

/// Attributes stored for an edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeData {
    pub identity: ElementId,
    pub rel_type: String,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub start: ElementId,
    pub end: ElementId,
    pub relationship: ElementId,
}

/// An edge with its endpoint identities.
#[derive(Debug, Clone, Copy)]
pub struct EdgeView<'a> {
    pub start: &'a ElementId,
    pub end: &'a ElementId,
    pub data: &'a EdgeData,
}

#[derive(Debug, Clone, Default)]
pub struct MaterializedGraph {
    graph: DiGraph<NodeData, EdgeData>,
    node_index: HashMap<ElementId, NodeIndex>,
    edge_index: HashMap<EdgeKey, EdgeIndex>,
}

impl MaterializedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes every row and returns the complete graph. Any unrecognized
    /// cell aborts the whole materialization.
    pub fn materialize<'a, I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a ResultRow>,
    {
        let mut graph = Self::new();
        let mut row_count = 0usize;
        for row in rows {
            for (column, cell) in row {
                let value = classify(cell).inspect_err(|err| {
                    debug!(column = %column, row = row_count, error = %err, "rejecting row value");
                })?;
                graph.add_value(&value);
            }
            row_count += 1;
        }
        debug!(
            rows = row_count,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "materialized graph"
        );
        Ok(graph)
    }

    pub fn add_value(&mut self, value: &GraphValue) {
        match value {
            GraphValue::Node(node) => {
                self.add_node(node);
            }
            GraphValue::Relationship(rel) => {
                self.add_edge(rel);
            }
            GraphValue::Path(path) => self.add_path(path),
        }
    }

    /// Inserts `node` unless its identity is already present.
    pub fn add_node(&mut self, node: &NodeValue) -> NodeIndex {
        if let Some(idx) = self.node_index.get(&node.identity) {
            return *idx;
        }
        let idx = self.graph.add_node(NodeData {
            identity: node.identity.clone(),
            labels: AttributeValue::string_set(node.labels.iter().cloned()),
            properties: node.properties.clone(),
        });
        self.node_index.insert(node.identity.clone(), idx);
        idx
    }

    /// Ensures both endpoints exist, then inserts the edge unless its key is
    /// already present.
    pub fn add_edge(&mut self, rel: &RelationshipValue) -> EdgeIndex {
        let from = self.add_node(&rel.start);
        let to = self.add_node(&rel.end);
        let key = EdgeKey {
            start: rel.start_identity().clone(),
            end: rel.end_identity().clone(),
            relationship: rel.identity.clone(),
        };
        if let Some(idx) = self.edge_index.get(&key) {
            return *idx;
        }
        let idx = self.graph.add_edge(
            from,
            to,
            EdgeData {
                identity: rel.identity.clone(),
                rel_type: rel.rel_type.clone(),
                properties: rel.properties.clone(),
            },
        );
        self.edge_index.insert(key, idx);
        idx
    }

    pub fn add_path(&mut self, path: &PathValue) {
        for node in &path.nodes {
            self.add_node(node);
        }
        for rel in &path.relationships {
            self.add_edge(rel);
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_node(&self, identity: &ElementId) -> bool {
        self.node_index.contains_key(identity)
    }

    pub fn node(&self, identity: &ElementId) -> Option<&NodeData> {
        self.node_index
            .get(identity)
            .and_then(|idx| self.graph.node_weight(*idx))
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<&EdgeData> {
        self.edge_index
            .get(key)
            .and_then(|idx| self.graph.edge_weight(*idx))
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeData> + '_ {
        self.graph
            .node_indices()
            .filter_map(move |idx| self.graph.node_weight(idx))
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeView<'_>> + '_ {
        self.graph.edge_indices().filter_map(move |idx| {
            let (from, to) = self.graph.edge_endpoints(idx)?;
            Some(EdgeView {
                start: &self.graph.node_weight(from)?.identity,
                end: &self.graph.node_weight(to)?.identity,
                data: self.graph.edge_weight(idx)?,
            })
        })
    }

    /// Every edge from `start` to `end`, in insertion order.
    pub fn parallel_edges<'a>(
        &'a self,
        start: &'a ElementId,
        end: &'a ElementId,
    ) -> impl Iterator<Item = &'a EdgeData> + 'a {
        self.edges()
            .filter(move |e| e.start == start && e.end == end)
            .map(|e| e.data)
    }

    pub(crate) fn for_each_node_mut<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut NodeData) -> Result<()>,
    {
        let indices: Vec<NodeIndex> = self.graph.node_indices().collect();
        for idx in indices {
            if let Some(node) = self.graph.node_weight_mut(idx) {
                f(node)?;
            }
        }
        Ok(())
    }

    pub(crate) fn for_each_edge_mut<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut EdgeData) -> Result<()>,
    {
        let indices: Vec<EdgeIndex> = self.graph.edge_indices().collect();
        for idx in indices {
            if let Some(edge) = self.graph.edge_weight_mut(idx) {
                f(edge)?;
            }
        }
        Ok(())
    }

    /// Export form of a normalized graph.
    pub fn export(&self) -> Result<GraphExport> {
        let nodes = self
            .nodes()
            .map(|node| -> Result<ExportNode> {
                let element = format!("node {}", node.identity);
                let labels = node.labels.to_json().map_err(|detail| {
                    crate::error::KgvizError::Serialization {
                        element: element.clone(),
                        attribute: "labels".to_string(),
                        detail,
                    }
                })?;
                Ok(ExportNode {
                    identity: node.identity.clone(),
                    labels,
                    properties: properties_to_json(&element, &node.properties)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let edges = self
            .edges()
            .map(|edge| -> Result<ExportEdge> {
                let element = format!("relationship {}", edge.data.identity);
                Ok(ExportEdge {
                    identity: edge.data.identity.clone(),
                    start: edge.start.clone(),
                    end: edge.end.clone(),
                    rel_type: edge.data.rel_type.clone(),
                    properties: properties_to_json(&element, &edge.data.properties)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(GraphExport { nodes, edges })
    }
}

/// Two graphs are equal when they hold the same identities with the same
/// attributes, regardless of insertion order.
impl PartialEq for MaterializedGraph {
    fn eq(&self, other: &Self) -> bool {
        self.node_count() == other.node_count()
            && self.edge_count() == other.edge_count()
            && self
                .nodes()
                .all(|n| other.node(&n.identity) == Some(n))
            && self.edges().all(|e| {
                let key = EdgeKey {
                    start: e.start.clone(),
                    end: e.end.clone(),
                    relationship: e.data.identity.clone(),
                };
                other.edge(&key) == Some(e.data)
            })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphExport {
    pub nodes: Vec<ExportNode>,
    pub edges: Vec<ExportEdge>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportNode {
    pub identity: ElementId,
    pub labels: serde_json::Value,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportEdge {
    pub identity: ElementId,
    pub start: ElementId,
    pub end: ElementId,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub properties: serde_json::Map<String, serde_json::Value>,
}
