//! Result classification.
//!
//! Each raw row cell is tagged once with its [`Shape`] and decoded into a
//! [`GraphValue`]. Anything outside the three graph shapes is rejected with
//! [`KgvizError::UnrecognizedResultShape`].

use crate::error::{KgvizError, Result};
use crate::value::{
    properties_from_json, ElementId, GraphValue, NodeValue, PathValue, RelationshipValue,
};
use serde_json::Value;

/// Shape of a raw cell, decided from its keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Node,
    Relationship,
    Path,
    Unrecognized,
}

pub fn shape_of(raw: &Value) -> Shape {
    let Some(obj) = raw.as_object() else {
        return Shape::Unrecognized;
    };
    if obj.get("nodes").is_some_and(Value::is_array)
        && obj.get("relationships").is_some_and(Value::is_array)
    {
        return Shape::Path;
    }
    if !obj.contains_key("identity") {
        return Shape::Unrecognized;
    }
    if obj.contains_key("type") && obj.contains_key("start") && obj.contains_key("end") {
        Shape::Relationship
    } else if obj.get("labels").is_some_and(Value::is_array) {
        Shape::Node
    } else {
        Shape::Unrecognized
    }
}

/// Classifies and decodes one raw cell.
pub fn classify(raw: &Value) -> Result<GraphValue> {
    match shape_of(raw) {
        Shape::Node => decode_node(raw).map(GraphValue::Node),
        Shape::Relationship => decode_relationship(raw).map(GraphValue::Relationship),
        Shape::Path => decode_path(raw).map(GraphValue::Path),
        Shape::Unrecognized => Err(KgvizError::unrecognized(
            "not a node, relationship or path",
            raw,
        )),
    }
}

fn identity(raw: &Value) -> Result<ElementId> {
    match raw.get("identity") {
        Some(Value::String(s)) if !s.is_empty() => Ok(ElementId::new(s.clone())),
        Some(Value::Number(n)) => Ok(ElementId::new(n.to_string())),
        _ => Err(KgvizError::unrecognized("missing or invalid identity", raw)),
    }
}

fn decode_node(raw: &Value) -> Result<NodeValue> {
    if shape_of(raw) != Shape::Node {
        return Err(KgvizError::unrecognized("expected a node", raw));
    }
    let identity = identity(raw)?;
    let mut labels = std::collections::BTreeSet::new();
    for label in raw["labels"].as_array().into_iter().flatten() {
        match label.as_str() {
            Some(label) => {
                labels.insert(label.to_string());
            }
            None => return Err(KgvizError::unrecognized("node label is not a string", raw)),
        }
    }
    Ok(NodeValue {
        identity,
        labels,
        properties: properties_from_json(raw.get("properties")),
    })
}

fn decode_relationship(raw: &Value) -> Result<RelationshipValue> {
    if shape_of(raw) != Shape::Relationship {
        return Err(KgvizError::unrecognized("expected a relationship", raw));
    }
    let identity = identity(raw)?;
    let rel_type = raw["type"].as_str().unwrap_or_default().to_string();
    let start = decode_node(&raw["start"])?;
    let end = decode_node(&raw["end"])?;
    Ok(RelationshipValue {
        identity,
        rel_type,
        start,
        end,
        properties: properties_from_json(raw.get("properties")),
    })
}

fn decode_path(raw: &Value) -> Result<PathValue> {
    let nodes = raw["nodes"]
        .as_array()
        .into_iter()
        .flatten()
        .map(decode_node)
        .collect::<Result<Vec<_>>>()?;
    let relationships = raw["relationships"]
        .as_array()
        .into_iter()
        .flatten()
        .map(decode_relationship)
        .collect::<Result<Vec<_>>>()?;
    Ok(PathValue {
        nodes,
        relationships,
    })
}
