//! Neo4j over the transactional HTTP API.
//!
//! A session is one explicit transaction: `open` begins it, `run` commits it
//! with the query, and `close` rolls it back if it was never committed.
//! Results are requested in `row` + `graph` form and converted into the
//! shape-tagged cells the classifier understands.

use crate::error::{KgvizError, Result};
use crate::store::{GraphStore, Session};
use crate::value::ResultRow;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct Neo4jHttpStore {
    client: reqwest::Client,
    base_url: String,
    database: String,
    user: String,
    password: String,
}

impl Neo4jHttpStore {
    pub fn new(
        uri: &str,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let base_url = uri.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(KgvizError::StoreConnection(format!(
                "unsupported uri `{uri}`: the HTTP API needs an http:// or https:// address"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url,
            database: database.into(),
            user: user.into(),
            password: password.into(),
        })
    }

    fn tx_endpoint(&self) -> String {
        format!("{}/db/{}/tx", self.base_url, self.database)
    }
}

#[async_trait]
impl GraphStore for Neo4jHttpStore {
    type Session = Neo4jSession;

    fn describe(&self) -> String {
        format!("{}/db/{}", self.base_url, self.database)
    }

    async fn open(&self) -> Result<Neo4jSession> {
        let response = self
            .client
            .post(self.tx_endpoint())
            .basic_auth(&self.user, Some(&self.password))
            .header("Accept", "application/json")
            .json(&json!({ "statements": [] }))
            .send()
            .await?;
        let body = read_response(response).await?;
        let commit_url = body.commit.ok_or_else(|| {
            KgvizError::StoreConnection("server did not return a transaction".to_string())
        })?;
        let tx_url = commit_url
            .strip_suffix("/commit")
            .unwrap_or(&commit_url)
            .to_string();
        debug!(tx = %tx_url, "opened transaction");

        Ok(Neo4jSession {
            client: self.client.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            commit_url,
            tx_url,
            pending: true,
        })
    }
}

pub struct Neo4jSession {
    client: reqwest::Client,
    user: String,
    password: String,
    commit_url: String,
    tx_url: String,
    /// True until the transaction is committed or rolled back.
    pending: bool,
}

#[async_trait]
impl Session for Neo4jSession {
    async fn run(&mut self, query: &str) -> Result<Vec<ResultRow>> {
        if !self.pending {
            return Err(KgvizError::StoreConnection(
                "session already ran its query".to_string(),
            ));
        }
        let response = self
            .client
            .post(&self.commit_url)
            .basic_auth(&self.user, Some(&self.password))
            .header("Accept", "application/json")
            .json(&json!({
                "statements": [{
                    "statement": query,
                    "resultDataContents": ["row", "graph"],
                }]
            }))
            .send()
            .await?;
        // Any answer to a commit ends the transaction server-side.
        self.pending = false;
        let body = read_response(response).await?;
        let rows = rows_from_response(&body);
        info!(rows = rows.len(), "fetched query results");
        Ok(rows)
    }

    async fn close(&mut self) -> Result<()> {
        if !self.pending {
            return Ok(());
        }
        self.pending = false;
        let response = self
            .client
            .delete(&self.tx_url)
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await?;
        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            debug!(tx = %self.tx_url, "rolled back transaction");
            Ok(())
        } else {
            Err(KgvizError::StoreConnection(format!(
                "rollback failed with HTTP {status}"
            )))
        }
    }
}

async fn read_response(response: reqwest::Response) -> Result<TxResponse> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(KgvizError::StoreConnection(format!(
            "HTTP {status}: {}",
            body.chars().take(200).collect::<String>()
        )));
    }
    let body: TxResponse = response.json().await?;
    if let Some(err) = body.errors.first() {
        return Err(KgvizError::StoreConnection(format!(
            "{}: {}",
            err.code, err.message
        )));
    }
    Ok(body)
}

#[derive(Debug, Deserialize)]
pub(crate) struct TxResponse {
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default)]
    pub results: Vec<TxResult>,
    #[serde(default)]
    pub errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TxResult {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TxRow {
    #[serde(default)]
    pub row: Vec<Value>,
    #[serde(default)]
    pub meta: Vec<Value>,
    #[serde(default)]
    pub graph: TxGraph,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TxGraph {
    #[serde(default)]
    pub nodes: Vec<Value>,
    #[serde(default)]
    pub relationships: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TxError {
    pub code: String,
    pub message: String,
}

/// Converts every data row of every statement result.
pub(crate) fn rows_from_response(body: &TxResponse) -> Vec<ResultRow> {
    body.results
        .iter()
        .flat_map(|result| {
            result
                .data
                .iter()
                .map(move |row| convert_row(&result.columns, row))
        })
        .collect()
}

/// `elementId` on Neo4j 5, numeric `id` on older servers.
fn element_id(obj: &Value, primary: &str, fallback: &str) -> Option<String> {
    if let Some(id) = obj.get(primary).and_then(Value::as_str) {
        return Some(id.to_string());
    }
    match obj.get(fallback) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn convert_row(columns: &[String], row: &TxRow) -> ResultRow {
    let mut nodes: HashMap<String, Value> = HashMap::new();
    for node in &row.graph.nodes {
        if let Some(id) = element_id(node, "elementId", "id") {
            let cell = json!({
                "identity": id,
                "labels": node.get("labels").cloned().unwrap_or_else(|| json!([])),
                "properties": node.get("properties").cloned().unwrap_or_else(|| json!({})),
            });
            nodes.insert(id, cell);
        }
    }

    let mut rels: HashMap<String, Value> = HashMap::new();
    for rel in &row.graph.relationships {
        let Some(id) = element_id(rel, "elementId", "id") else {
            continue;
        };
        let endpoint = |primary: &str, fallback: &str| {
            element_id(rel, primary, fallback)
                .and_then(|id| nodes.get(&id).cloned())
                .unwrap_or(Value::Null)
        };
        let cell = json!({
            "identity": id,
            "type": rel.get("type").cloned().unwrap_or_else(|| json!("")),
            "start": endpoint("startNodeElementId", "startNode"),
            "end": endpoint("endNodeElementId", "endNode"),
            "properties": rel.get("properties").cloned().unwrap_or_else(|| json!({})),
        });
        rels.insert(id, cell);
    }

    columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let meta = row.meta.get(i).unwrap_or(&Value::Null);
            let value = row.row.get(i).unwrap_or(&Value::Null);
            (column.clone(), cell_for(meta, value, &nodes, &rels))
        })
        .collect()
}

fn meta_kind(meta: &Value) -> Option<(&str, String)> {
    let kind = meta.get("type")?.as_str()?;
    Some((kind, element_id(meta, "elementId", "id")?))
}

/// Path metadata alternates node, relationship, node, ... A lone node is
/// indistinguishable from a list value such as `[n]`, so at least one
/// relationship is required.
fn is_path(metas: &[Value]) -> bool {
    metas.len() >= 3
        && metas.len() % 2 == 1
        && metas.iter().enumerate().all(|(i, meta)| {
            let expected = if i % 2 == 0 { "node" } else { "relationship" };
            meta_kind(meta).is_some_and(|(kind, _)| kind == expected)
        })
}

/// Builds the cell for one column. Values that are not graph entities are
/// passed through unchanged and rejected later by the classifier.
fn cell_for(
    meta: &Value,
    value: &Value,
    nodes: &HashMap<String, Value>,
    rels: &HashMap<String, Value>,
) -> Value {
    let lookup = |meta: &Value| -> Option<Value> {
        let (kind, id) = meta_kind(meta)?;
        match kind {
            "node" => nodes.get(&id).cloned(),
            "relationship" => rels.get(&id).cloned(),
            _ => None,
        }
    };

    if meta.is_object() {
        return lookup(meta).unwrap_or_else(|| value.clone());
    }
    if let Some(metas) = meta.as_array().filter(|m| is_path(m)) {
        let path_nodes: Option<Vec<Value>> = metas.iter().step_by(2).map(lookup).collect();
        let path_rels: Option<Vec<Value>> =
            metas.iter().skip(1).step_by(2).map(lookup).collect();
        if let (Some(nodes), Some(relationships)) = (path_nodes, path_rels) {
            return json!({ "nodes": nodes, "relationships": relationships });
        }
    }
    value.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{shape_of, Shape};
    use crate::graph::MaterializedGraph;

    fn sample_response() -> TxResponse {
        serde_json::from_value(json!({
            "results": [{
                "columns": ["p", "name"],
                "data": [{
                    "row": [[{"id": "Alice"}, {}, {"id": "Bob"}], "Alice"],
                    "meta": [
                        [
                            {"id": 1, "elementId": "4:db:1", "type": "node", "deleted": false},
                            {"id": 9, "elementId": "5:db:9", "type": "relationship", "deleted": false},
                            {"id": 2, "elementId": "4:db:2", "type": "node", "deleted": false}
                        ],
                        null
                    ],
                    "graph": {
                        "nodes": [
                            {"id": "1", "elementId": "4:db:1", "labels": ["PERSON"], "properties": {"id": "Alice", "entity_type": "PERSON"}},
                            {"id": "2", "elementId": "4:db:2", "labels": ["PERSON"], "properties": {"id": "Bob"}}
                        ],
                        "relationships": [
                            {"id": "9", "elementId": "5:db:9", "type": "KNOWS",
                             "startNode": "1", "startNodeElementId": "4:db:1",
                             "endNode": "2", "endNodeElementId": "4:db:2",
                             "properties": {"weight": 2}}
                        ]
                    }
                }]
            }],
            "errors": []
        }))
        .unwrap()
    }

    #[test]
    fn path_meta_becomes_a_path_cell_with_embedded_endpoints() {
        let rows = rows_from_response(&sample_response());
        assert_eq!(rows.len(), 1);

        let path = &rows[0]["p"];
        assert_eq!(shape_of(path), Shape::Path);
        assert_eq!(path["nodes"][0]["identity"], "4:db:1");
        assert_eq!(path["relationships"][0]["start"]["identity"], "4:db:1");
        assert_eq!(path["relationships"][0]["end"]["properties"]["id"], "Bob");

        assert_eq!(shape_of(&rows[0]["name"]), Shape::Unrecognized);
    }

    #[test]
    fn node_and_relationship_columns_resolve_through_the_graph_section() {
        let body: TxResponse = serde_json::from_value(json!({
            "results": [{
                "columns": ["n", "r"],
                "data": [{
                    "row": [{}, {}],
                    "meta": [
                        {"id": 3, "type": "node", "deleted": false},
                        {"id": 7, "type": "relationship", "deleted": false}
                    ],
                    "graph": {
                        "nodes": [
                            {"id": "3", "labels": ["EVENT"], "properties": {}},
                            {"id": "4", "labels": [], "properties": {}}
                        ],
                        "relationships": [
                            {"id": "7", "type": "AT", "startNode": "3", "endNode": "4", "properties": {}}
                        ]
                    }
                }]
            }]
        }))
        .unwrap();

        let rows = rows_from_response(&body);
        let graph = MaterializedGraph::materialize(&rows).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn single_node_list_is_not_a_path() {
        let body: TxResponse = serde_json::from_value(json!({
            "results": [{
                "columns": ["nodes"],
                "data": [{
                    "row": [[{"id": "Alice"}]],
                    "meta": [[{"id": 1, "elementId": "4:db:1", "type": "node", "deleted": false}]],
                    "graph": {
                        "nodes": [{"id": "1", "elementId": "4:db:1", "labels": ["PERSON"], "properties": {"id": "Alice"}}],
                        "relationships": []
                    }
                }]
            }]
        }))
        .unwrap();

        let rows = rows_from_response(&body);
        assert_eq!(shape_of(&rows[0]["nodes"]), Shape::Unrecognized);
        assert!(matches!(
            MaterializedGraph::materialize(&rows),
            Err(KgvizError::UnrecognizedResultShape { .. })
        ));
    }

    #[test]
    fn bolt_uris_are_rejected() {
        let err = Neo4jHttpStore::new("bolt://localhost:7687", "neo4j", "neo4j", "pw").unwrap_err();
        assert!(matches!(err, KgvizError::StoreConnection(_)));
    }

    #[test]
    fn describe_names_the_database() {
        let store = Neo4jHttpStore::new("http://localhost:7474/", "case-17", "neo4j", "pw").unwrap();
        assert_eq!(store.describe(), "http://localhost:7474/db/case-17");
    }
}
