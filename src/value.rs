//! Values produced by a property-graph query.
//!
//! Rows arrive as raw JSON cells (see [`crate::classify`]) and are decoded
//! into the closed set of shapes defined here: nodes, relationships and
//! paths. Attribute values keep the store's container semantics, so a set
//! stays a [`AttributeValue::Set`] until the normalizer runs.

use crate::error::{KgvizError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Store-assigned identity of a node or relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ElementId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Property map of a node or relationship.
pub type Properties = BTreeMap<String, AttributeValue>;

/// One result row: column name to raw cell.
pub type ResultRow = BTreeMap<String, serde_json::Value>;

/// An attribute value as held by the materialized graph.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<AttributeValue>),
    Map(BTreeMap<String, AttributeValue>),
    /// Unordered, deduplicated container.
    Set(Vec<AttributeValue>),
    /// A store type with no export representation.
    Opaque { kind: String },
}

impl AttributeValue {
    /// Builds a set, dropping duplicates and keeping first occurrences.
    pub fn set<I>(items: I) -> Self
    where
        I: IntoIterator<Item = AttributeValue>,
    {
        let mut unique: Vec<AttributeValue> = Vec::new();
        for item in items {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        Self::Set(unique)
    }

    pub fn string_set<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::set(items.into_iter().map(|s| Self::String(s.into())))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view, accepting numeric strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Decodes a raw JSON property value.
    ///
    /// Objects tagged `{"$type": "set", "items": [..]}` become sets; any other
    /// `$type` tag becomes an opaque value.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::String(s.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            Value::Object(obj) => match obj.get("$type").and_then(Value::as_str) {
                Some("set") => {
                    let items = obj
                        .get("items")
                        .and_then(Value::as_array)
                        .map(|items| items.iter().map(Self::from_json).collect::<Vec<_>>())
                        .unwrap_or_default();
                    Self::set(items)
                }
                Some(kind) => Self::Opaque {
                    kind: kind.to_string(),
                },
                None => Self::Map(
                    obj.iter()
                        .map(|(k, v)| (k.clone(), Self::from_json(v)))
                        .collect(),
                ),
            },
        }
    }

    /// Export form. Fails on sets and opaque values, which must be
    /// normalized first.
    pub fn to_json(&self) -> std::result::Result<serde_json::Value, String> {
        use serde_json::Value;
        Ok(match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Integer(i) => Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::String(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(
                items
                    .iter()
                    .map(Self::to_json)
                    .collect::<std::result::Result<_, _>>()?,
            ),
            Self::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| v.to_json().map(|v| (k.clone(), v)))
                    .collect::<std::result::Result<_, _>>()?,
            ),
            Self::Set(_) => return Err("unordered set is not serializable".to_string()),
            Self::Opaque { kind } => return Err(format!("unsupported value type `{kind}`")),
        })
    }

    fn to_json_lossy(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            Self::List(items) | Self::Set(items) => {
                Value::Array(items.iter().map(Self::to_json_lossy).collect())
            }
            Self::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json_lossy()))
                    .collect(),
            ),
            Self::Opaque { kind } => Value::String(format!("<{kind}>")),
            other => other.to_json().unwrap_or(Value::Null),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{x:.1}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
            other => write!(f, "{}", other.to_json_lossy()),
        }
    }
}

/// Decodes a raw JSON property object.
pub(crate) fn properties_from_json(value: Option<&serde_json::Value>) -> Properties {
    value
        .and_then(serde_json::Value::as_object)
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| (k.clone(), AttributeValue::from_json(v)))
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeValue {
    pub identity: ElementId,
    pub labels: BTreeSet<String>,
    pub properties: Properties,
}

impl NodeValue {
    pub fn new(identity: impl Into<ElementId>) -> Self {
        Self {
            identity: identity.into(),
            labels: BTreeSet::new(),
            properties: Properties::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.insert(label.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

/// A relationship together with its endpoint nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipValue {
    pub identity: ElementId,
    pub rel_type: String,
    pub start: NodeValue,
    pub end: NodeValue,
    pub properties: Properties,
}

impl RelationshipValue {
    pub fn new(
        identity: impl Into<ElementId>,
        rel_type: impl Into<String>,
        start: NodeValue,
        end: NodeValue,
    ) -> Self {
        Self {
            identity: identity.into(),
            rel_type: rel_type.into(),
            start,
            end,
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn start_identity(&self) -> &ElementId {
        &self.start.identity
    }

    pub fn end_identity(&self) -> &ElementId {
        &self.end.identity
    }
}

/// A walk: nodes and relationships in traversal order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathValue {
    pub nodes: Vec<NodeValue>,
    pub relationships: Vec<RelationshipValue>,
}

/// A classified row value.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphValue {
    Node(NodeValue),
    Relationship(RelationshipValue),
    Path(PathValue),
}

impl NodeValue {
    /// Raw cell form understood by the classifier.
    pub fn to_cell(&self) -> serde_json::Value {
        serde_json::json!({
            "identity": self.identity.as_str(),
            "labels": self.labels.iter().collect::<Vec<_>>(),
            "properties": cell_properties(&self.properties),
        })
    }
}

impl RelationshipValue {
    pub fn to_cell(&self) -> serde_json::Value {
        serde_json::json!({
            "identity": self.identity.as_str(),
            "type": self.rel_type,
            "start": self.start.to_cell(),
            "end": self.end.to_cell(),
            "properties": cell_properties(&self.properties),
        })
    }
}

impl PathValue {
    pub fn to_cell(&self) -> serde_json::Value {
        serde_json::json!({
            "nodes": self.nodes.iter().map(NodeValue::to_cell).collect::<Vec<_>>(),
            "relationships": self
                .relationships
                .iter()
                .map(RelationshipValue::to_cell)
                .collect::<Vec<_>>(),
        })
    }
}

fn cell_properties(properties: &Properties) -> serde_json::Value {
    serde_json::Value::Object(
        properties
            .iter()
            .map(|(k, v)| (k.clone(), attribute_cell(v)))
            .collect(),
    )
}

fn attribute_cell(value: &AttributeValue) -> serde_json::Value {
    match value {
        AttributeValue::Set(items) => serde_json::json!({
            "$type": "set",
            "items": items.iter().map(attribute_cell).collect::<Vec<_>>(),
        }),
        AttributeValue::Opaque { kind } => serde_json::json!({ "$type": kind }),
        AttributeValue::List(items) => {
            serde_json::Value::Array(items.iter().map(attribute_cell).collect())
        }
        AttributeValue::Map(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), attribute_cell(v)))
                .collect(),
        ),
        scalar => scalar.to_json().unwrap_or(serde_json::Value::Null),
    }
}

/// Converts a property map to its export form.
pub(crate) fn properties_to_json(
    element: &str,
    properties: &Properties,
) -> Result<serde_json::Map<String, serde_json::Value>> {
    properties
        .iter()
        .map(|(key, value)| {
            value
                .to_json()
                .map(|v| (key.clone(), v))
                .map_err(|detail| KgvizError::Serialization {
                    element: element.to_string(),
                    attribute: key.clone(),
                    detail,
                })
        })
        .collect()
}
