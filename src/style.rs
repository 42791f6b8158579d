//! Visual styling.
//!
//! Maps a normalized [`MaterializedGraph`] to a [`VisNetwork`] view-model:
//! labels, tooltips, colors and edge thickness are derived from the stored
//! attributes without touching the graph.

use crate::error::{KgvizError, Result};
use crate::graph::{EdgeView, MaterializedGraph, NodeData};
use crate::value::{properties_to_json, AttributeValue, Properties};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::warn;

pub const DEFAULT_NODE_TOOLTIP: &str =
    "Entity Type: {entity_type}\nDescription: {description}\nSource ID: {source_id}";
pub const DEFAULT_EDGE_TOOLTIP: &str = "Description: {description}\nWeight: {weight}\nOrder: {order}";
pub const DEFAULT_VIS_JS_URL: &str =
    "https://unpkg.com/vis-network@9.1.9/standalone/umd/vis-network.min.js";

const UNKNOWN: &str = "Unknown";
const NO_DESCRIPTION: &str = "No description";

/// How parallel edges between one ordered node pair are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParallelEdges {
    /// One visual edge per relationship, styled from its own attributes.
    #[default]
    Independent,
    /// One visual edge per relationship, but every parallel edge shows the
    /// label, tooltip, value and properties of the last one in its pair.
    Collapse,
}

impl std::str::FromStr for ParallelEdges {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "independent" => Ok(Self::Independent),
            "collapse" => Ok(Self::Collapse),
            other => Err(format!(
                "unknown parallel edge mode `{other}` (expected independent|collapse)"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleConfig {
    #[serde(default = "default_highlight_entity_type")]
    pub highlight_entity_type: String,

    #[serde(default = "default_highlight_color")]
    pub highlight_color: String,

    #[serde(default = "default_node_tooltip")]
    pub node_tooltip_template: String,

    #[serde(default = "default_edge_tooltip")]
    pub edge_tooltip_template: String,

    #[serde(default)]
    pub parallel_edges: ParallelEdges,

    #[serde(default = "default_height")]
    pub height: String,

    #[serde(default = "default_width")]
    pub width: String,

    #[serde(default = "default_directed")]
    pub directed: bool,

    #[serde(default = "default_vis_js_url")]
    pub vis_js_url: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            highlight_entity_type: default_highlight_entity_type(),
            highlight_color: default_highlight_color(),
            node_tooltip_template: default_node_tooltip(),
            edge_tooltip_template: default_edge_tooltip(),
            parallel_edges: ParallelEdges::default(),
            height: default_height(),
            width: default_width(),
            directed: default_directed(),
            vis_js_url: default_vis_js_url(),
        }
    }
}

fn default_highlight_entity_type() -> String {
    "PERSON".to_string()
}

fn default_highlight_color() -> String {
    "lightblue".to_string()
}

fn default_node_tooltip() -> String {
    DEFAULT_NODE_TOOLTIP.to_string()
}

fn default_edge_tooltip() -> String {
    DEFAULT_EDGE_TOOLTIP.to_string()
}

fn default_height() -> String {
    "100vh".to_string()
}

fn default_width() -> String {
    "100vw".to_string()
}

fn default_directed() -> bool {
    true
}

fn default_vis_js_url() -> String {
    DEFAULT_VIS_JS_URL.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisNode {
    pub id: String,
    pub label: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub labels: Vec<String>,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisEdge {
    pub id: String,
    pub from: String,
    pub to: String,
    pub label: String,
    pub title: String,
    pub value: f64,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// Renderable view-model of a whole graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisNetwork {
    pub nodes: Vec<VisNode>,
    pub edges: Vec<VisEdge>,
    pub directed: bool,
    pub height: String,
    pub width: String,
    /// Layout seed derived from the graph's identities.
    pub seed: u32,
}

/// Styles every node and edge of a normalized graph.
pub fn style(graph: &MaterializedGraph, config: &StyleConfig) -> Result<VisNetwork> {
    let nodes = graph
        .nodes()
        .map(|node| style_node(node, config))
        .collect::<Result<Vec<_>>>()?;

    let edges = match config.parallel_edges {
        ParallelEdges::Independent => graph
            .edges()
            .map(|edge| style_edge(&edge, &edge, config))
            .collect::<Result<Vec<_>>>()?,
        ParallelEdges::Collapse => collapse_parallel(graph, config)?,
    };

    Ok(VisNetwork {
        nodes,
        edges,
        directed: config.directed,
        height: config.height.clone(),
        width: config.width.clone(),
        seed: layout_seed(graph),
    })
}

fn style_node(node: &NodeData, config: &StyleConfig) -> Result<VisNode> {
    let element = format!("node {}", node.identity);
    let props = &node.properties;

    let label = property(props, "id")
        .map(ToString::to_string)
        .unwrap_or_else(|| UNKNOWN.to_string());
    let title = interpolate(
        &config.node_tooltip_template,
        &[
            ("entity_type", display_or(props, "entity_type", UNKNOWN)),
            ("description", display_or(props, "description", NO_DESCRIPTION)),
            ("source_id", display_or(props, "source_id", UNKNOWN)),
        ],
    );
    let color = property(props, "entity_type")
        .and_then(AttributeValue::as_str)
        .filter(|t| *t == config.highlight_entity_type)
        .map(|_| config.highlight_color.clone());

    Ok(VisNode {
        id: node.identity.to_string(),
        label,
        title,
        color,
        labels: label_list(node, &element)?,
        properties: properties_to_json(&element, props)?,
    })
}

/// Builds the visual edge for `anchor`, taking its styled fields from
/// `source`. The two differ only when collapsing parallel edges.
fn style_edge(anchor: &EdgeView<'_>, source: &EdgeView<'_>, config: &StyleConfig) -> Result<VisEdge> {
    let element = format!("relationship {}", source.data.identity);
    let props = &source.data.properties;

    let title = interpolate(
        &config.edge_tooltip_template,
        &[
            ("description", display_or(props, "description", NO_DESCRIPTION)),
            ("weight", display_or(props, "weight", "1")),
            ("order", display_or(props, "order", UNKNOWN)),
        ],
    );

    Ok(VisEdge {
        id: anchor.data.identity.to_string(),
        from: anchor.start.to_string(),
        to: anchor.end.to_string(),
        label: source.data.rel_type.clone(),
        title,
        value: edge_value(props, &element),
        rel_type: source.data.rel_type.clone(),
        properties: properties_to_json(&element, props)?,
    })
}

fn collapse_parallel(graph: &MaterializedGraph, config: &StyleConfig) -> Result<Vec<VisEdge>> {
    let mut last: HashMap<(&str, &str), EdgeView<'_>> = HashMap::new();
    for edge in graph.edges() {
        last.insert((edge.start.as_str(), edge.end.as_str()), edge);
    }
    graph
        .edges()
        .map(|edge| {
            let source = last
                .get(&(edge.start.as_str(), edge.end.as_str()))
                .copied()
                .unwrap_or(edge);
            style_edge(&edge, &source, config)
        })
        .collect()
}

fn property<'a>(props: &'a Properties, key: &str) -> Option<&'a AttributeValue> {
    props.get(key).filter(|v| !v.is_null())
}

fn display_or(props: &Properties, key: &str, default: &str) -> String {
    property(props, key)
        .map(ToString::to_string)
        .unwrap_or_else(|| default.to_string())
}

fn edge_value(props: &Properties, element: &str) -> f64 {
    match property(props, "weight") {
        None => 1.0,
        Some(weight) => weight.as_f64().unwrap_or_else(|| {
            warn!(element, weight = %weight, "non-numeric edge weight, using 1");
            1.0
        }),
    }
}

fn label_list(node: &NodeData, element: &str) -> Result<Vec<String>> {
    match &node.labels {
        AttributeValue::List(items) => Ok(items
            .iter()
            .map(|item| match item {
                AttributeValue::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()),
        other => Err(KgvizError::Serialization {
            element: element.to_string(),
            attribute: "labels".to_string(),
            detail: format!("expected a normalized label list, found {other:?}"),
        }),
    }
}

/// Single-pass `{name}` substitution. Unknown placeholders are kept as-is.
pub fn interpolate(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after[..close];
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[open..open + close + 2]),
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

/// Stable seed for the renderer's layout, so the same graph lays out the
/// same way on every render.
fn layout_seed(graph: &MaterializedGraph) -> u32 {
    let mut ids: Vec<&str> = graph
        .nodes()
        .map(|n| n.identity.as_str())
        .chain(graph.edges().map(|e| e.data.identity.as_str()))
        .collect();
    ids.sort_unstable();

    let mut hasher = Sha256::new();
    for id in ids {
        hasher.update(id.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::value::{NodeValue, RelationshipValue};

    fn normalized(build: impl FnOnce(&mut MaterializedGraph)) -> MaterializedGraph {
        let mut graph = MaterializedGraph::new();
        build(&mut graph);
        normalize(&mut graph).unwrap();
        graph
    }

    fn text(s: &str) -> AttributeValue {
        AttributeValue::String(s.to_string())
    }

    #[test]
    fn person_node_gets_its_id_label_and_highlight() {
        let graph = normalized(|g| {
            g.add_node(
                &NodeValue::new("n1")
                    .with_label("PERSON")
                    .with_property("id", text("Alice"))
                    .with_property("entity_type", text("PERSON")),
            );
        });
        let net = style(&graph, &StyleConfig::default()).unwrap();
        let node = &net.nodes[0];
        assert_eq!(node.label, "Alice");
        assert_eq!(node.color.as_deref(), Some("lightblue"));
        assert_eq!(node.labels, vec!["PERSON"]);
        assert_eq!(
            node.title,
            "Entity Type: PERSON\nDescription: No description\nSource ID: Unknown"
        );
    }

    #[test]
    fn node_defaults_apply_when_properties_are_missing() {
        let graph = normalized(|g| {
            g.add_node(
                &NodeValue::new("n1")
                    .with_property("entity_type", text("ORGANIZATION"))
                    .with_property("description", AttributeValue::Null),
            );
        });
        let net = style(&graph, &StyleConfig::default()).unwrap();
        assert_eq!(net.nodes[0].label, "Unknown");
        assert_eq!(net.nodes[0].color, None);
        assert!(net.nodes[0].title.contains("Description: No description"));
    }

    #[test]
    fn edge_defaults_and_weight() {
        let a = NodeValue::new("a");
        let b = NodeValue::new("b");
        let graph = normalized(|g| {
            g.add_edge(&RelationshipValue::new("r1", "KNOWS", a.clone(), b.clone()));
            g.add_edge(
                &RelationshipValue::new("r2", "", b.clone(), a.clone())
                    .with_property("weight", AttributeValue::Float(3.0))
                    .with_property("order", AttributeValue::Integer(2)),
            );
        });
        let net = style(&graph, &StyleConfig::default()).unwrap();

        let r1 = &net.edges[0];
        assert_eq!(r1.label, "KNOWS");
        assert_eq!(r1.value, 1.0);
        assert_eq!(
            r1.title,
            "Description: No description\nWeight: 1\nOrder: Unknown"
        );

        let r2 = &net.edges[1];
        assert_eq!(r2.label, "");
        assert_eq!(r2.value, 3.0);
        assert_eq!(r2.title, "Description: No description\nWeight: 3.0\nOrder: 2");
    }

    fn parallel_graph() -> MaterializedGraph {
        let a = NodeValue::new("a");
        let b = NodeValue::new("b");
        normalized(|g| {
            g.add_edge(
                &RelationshipValue::new("r1", "FIRST", a.clone(), b.clone())
                    .with_property("weight", AttributeValue::Integer(2)),
            );
            g.add_edge(
                &RelationshipValue::new("r2", "SECOND", a.clone(), b.clone())
                    .with_property("weight", AttributeValue::Integer(5)),
            );
        })
    }

    #[test]
    fn independent_mode_styles_each_parallel_edge() {
        let net = style(&parallel_graph(), &StyleConfig::default()).unwrap();
        let labels: Vec<_> = net.edges.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["FIRST", "SECOND"]);
        assert_eq!(net.edges[0].value, 2.0);
        assert_eq!(net.edges[1].value, 5.0);
    }

    #[test]
    fn collapse_mode_shows_the_last_parallel_edge() {
        let config = StyleConfig {
            parallel_edges: ParallelEdges::Collapse,
            ..StyleConfig::default()
        };
        let net = style(&parallel_graph(), &config).unwrap();
        assert_eq!(net.edges.len(), 2);
        let ids: Vec<_> = net.edges.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2"]);
        for edge in &net.edges {
            assert_eq!((edge.from.as_str(), edge.to.as_str()), ("a", "b"));
            assert_eq!(edge.label, "SECOND");
            assert_eq!(edge.rel_type, "SECOND");
            assert_eq!(edge.value, 5.0);
            assert_eq!(edge.properties["weight"], 5);
        }
    }

    #[test]
    fn collapse_mode_keeps_other_pairs_untouched() {
        let a = NodeValue::new("a");
        let b = NodeValue::new("b");
        let graph = normalized(|g| {
            g.add_edge(&RelationshipValue::new("r1", "FIRST", a.clone(), b.clone()));
            g.add_edge(&RelationshipValue::new("r2", "BACK", b.clone(), a.clone()));
            g.add_edge(&RelationshipValue::new("r3", "SECOND", a.clone(), b.clone()));
        });
        let config = StyleConfig {
            parallel_edges: ParallelEdges::Collapse,
            ..StyleConfig::default()
        };
        let net = style(&graph, &config).unwrap();
        let labels: Vec<_> = net
            .edges
            .iter()
            .map(|e| (e.id.as_str(), e.label.as_str()))
            .collect();
        assert_eq!(
            labels,
            vec![("r1", "SECOND"), ("r2", "BACK"), ("r3", "SECOND")]
        );
    }

    #[test]
    fn styling_an_unnormalized_graph_fails() {
        let mut graph = MaterializedGraph::new();
        graph.add_node(&NodeValue::new("n1").with_label("PERSON"));
        assert!(matches!(
            style(&graph, &StyleConfig::default()),
            Err(KgvizError::Serialization { .. })
        ));
    }

    #[test]
    fn custom_highlight_and_templates() {
        let graph = normalized(|g| {
            g.add_node(
                &NodeValue::new("n1")
                    .with_property("entity_type", text("EVENT"))
                    .with_property("source_id", text("chunk-9")),
            );
        });
        let config = StyleConfig {
            highlight_entity_type: "EVENT".into(),
            highlight_color: "#ffcc00".into(),
            node_tooltip_template: "{source_id} / {missing}".into(),
            ..StyleConfig::default()
        };
        let net = style(&graph, &config).unwrap();
        assert_eq!(net.nodes[0].color.as_deref(), Some("#ffcc00"));
        assert_eq!(net.nodes[0].title, "chunk-9 / {missing}");
    }

    #[test]
    fn interpolation_does_not_expand_substituted_text() {
        let out = interpolate(
            "{a}-{b}-{",
            &[("a", "{b}".to_string()), ("b", "x".to_string())],
        );
        assert_eq!(out, "{b}-x-{");
    }

    #[test]
    fn layout_seed_is_stable() {
        let first = style(&parallel_graph(), &StyleConfig::default()).unwrap();
        let second = style(&parallel_graph(), &StyleConfig::default()).unwrap();
        assert_eq!(first.seed, second.seed);
    }
}
