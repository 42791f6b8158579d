//! Attribute normalization.
//!
//! Replaces every unordered set held by the graph, label sets and
//! set-valued properties at any depth, with an ordered list. Runs in place
//! and is idempotent: lists are left untouched on a second pass.

use crate::error::{KgvizError, Result};
use crate::graph::MaterializedGraph;
use crate::value::{AttributeValue, Properties};
use tracing::debug;

/// Normalizes `graph` in place and returns how many sets were converted.
pub fn normalize(graph: &mut MaterializedGraph) -> Result<usize> {
    let mut converted = 0usize;

    graph.for_each_node_mut(|node| {
        let element = format!("node {}", node.identity);
        converted += normalize_value(&mut node.labels, &element, "labels")?;
        converted += normalize_properties(&mut node.properties, &element)?;
        Ok(())
    })?;

    graph.for_each_edge_mut(|edge| {
        let element = format!("relationship {}", edge.identity);
        converted += normalize_properties(&mut edge.properties, &element)?;
        Ok(())
    })?;

    debug!(converted, "normalized graph attributes");
    Ok(converted)
}

fn normalize_properties(properties: &mut Properties, element: &str) -> Result<usize> {
    let mut converted = 0;
    for (key, value) in properties.iter_mut() {
        converted += normalize_value(value, element, key)?;
    }
    Ok(converted)
}

fn normalize_value(value: &mut AttributeValue, element: &str, attribute: &str) -> Result<usize> {
    match value {
        AttributeValue::Set(items) => {
            let mut converted = 1;
            for item in items.iter_mut() {
                converted += normalize_value(item, element, attribute)?;
            }
            let items = std::mem::take(items);
            *value = AttributeValue::List(items);
            Ok(converted)
        }
        AttributeValue::List(items) => {
            let mut converted = 0;
            for item in items.iter_mut() {
                converted += normalize_value(item, element, attribute)?;
            }
            Ok(converted)
        }
        AttributeValue::Map(map) => {
            let mut converted = 0;
            for item in map.values_mut() {
                converted += normalize_value(item, element, attribute)?;
            }
            Ok(converted)
        }
        AttributeValue::Opaque { kind } => Err(KgvizError::Serialization {
            element: element.to_string(),
            attribute: attribute.to_string(),
            detail: format!("`{kind}` is neither a scalar nor a recognized container"),
        }),
        AttributeValue::Null
        | AttributeValue::Bool(_)
        | AttributeValue::Integer(_)
        | AttributeValue::Float(_)
        | AttributeValue::String(_) => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ElementId, NodeValue, RelationshipValue};

    fn labelled(id: &str) -> NodeValue {
        NodeValue::new(id).with_label("PERSON").with_label("PARTY")
    }

    #[test]
    fn label_set_becomes_a_list_with_the_same_elements() {
        let mut graph = MaterializedGraph::new();
        graph.add_node(&labelled("n1"));

        normalize(&mut graph).unwrap();

        let labels = &graph.node(&ElementId::from("n1")).unwrap().labels;
        let AttributeValue::List(items) = labels else {
            panic!("labels not normalized: {labels:?}");
        };
        let mut names: Vec<_> = items.iter().filter_map(AttributeValue::as_str).collect();
        names.sort();
        assert_eq!(names, vec!["PARTY", "PERSON"]);
    }

    #[test]
    fn second_pass_changes_nothing() {
        let mut graph = MaterializedGraph::new();
        graph.add_node(&labelled("n1").with_property(
            "aliases",
            AttributeValue::string_set(["Al", "Ally"]),
        ));

        assert_eq!(normalize(&mut graph).unwrap(), 2);
        let once = graph.clone();
        assert_eq!(normalize(&mut graph).unwrap(), 0);
        assert_eq!(graph, once);
    }

    #[test]
    fn nested_sets_in_edge_properties_are_converted() {
        let a = NodeValue::new("a");
        let b = NodeValue::new("b");
        let rel = RelationshipValue::new("r1", "MENTIONS", a, b).with_property(
            "sources",
            AttributeValue::List(vec![AttributeValue::string_set(["doc-1", "doc-2"])]),
        );
        let mut graph = MaterializedGraph::new();
        graph.add_edge(&rel);

        normalize(&mut graph).unwrap();
        let export = graph.export().unwrap();
        assert_eq!(
            export.edges[0].properties["sources"],
            serde_json::json!([["doc-1", "doc-2"]])
        );
    }

    #[test]
    fn opaque_values_are_surfaced() {
        let mut graph = MaterializedGraph::new();
        graph.add_node(&NodeValue::new("n1").with_property(
            "location",
            AttributeValue::Opaque {
                kind: "point".into(),
            },
        ));

        let err = normalize(&mut graph).unwrap_err();
        match err {
            KgvizError::Serialization { attribute, .. } => assert_eq!(attribute, "location"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
