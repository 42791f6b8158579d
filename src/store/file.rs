//! Rows read from a JSON file, for offline rendering.
//!
//! The file holds either an array of rows (column name to cell) or a saved
//! response from the Neo4j HTTP API. The query string is ignored.

use crate::error::{KgvizError, Result};
use crate::store::neo4j::{rows_from_response, TxResponse};
use crate::store::{GraphStore, Session};
use crate::value::ResultRow;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RowsFileStore {
    path: PathBuf,
}

impl RowsFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parses rows from file contents in either supported layout.
pub fn parse_rows(contents: &str) -> Result<Vec<ResultRow>> {
    let value: serde_json::Value = serde_json::from_str(contents)?;
    if value.get("results").is_some() {
        let response: TxResponse = serde_json::from_value(value)?;
        if let Some(err) = response.errors.first() {
            return Err(KgvizError::StoreConnection(format!(
                "{}: {}",
                err.code, err.message
            )));
        }
        return Ok(rows_from_response(&response));
    }
    Ok(serde_json::from_value(value)?)
}

#[async_trait]
impl GraphStore for RowsFileStore {
    type Session = RowsFileSession;

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn open(&self) -> Result<RowsFileSession> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|err| {
            KgvizError::StoreConnection(format!("cannot read {}: {err}", self.path.display()))
        })?;
        let rows = parse_rows(&contents).map_err(|err| {
            KgvizError::StoreConnection(format!("cannot parse {}: {err}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), rows = rows.len(), "loaded rows file");
        Ok(RowsFileSession { rows: Some(rows) })
    }
}

pub struct RowsFileSession {
    rows: Option<Vec<ResultRow>>,
}

#[async_trait]
impl Session for RowsFileSession {
    async fn run(&mut self, _query: &str) -> Result<Vec<ResultRow>> {
        self.rows
            .take()
            .ok_or_else(|| KgvizError::StoreConnection("session already ran its query".into()))
    }

    async fn close(&mut self) -> Result<()> {
        self.rows = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::with_session;

    #[test]
    fn parses_plain_row_arrays() {
        let rows = parse_rows(r#"[{"n": {"identity": "a", "labels": []}}, {}]"#).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].contains_key("n"));
    }

    #[test]
    fn surfaces_errors_from_saved_responses() {
        let err = parse_rows(
            r#"{"results": [], "errors": [{"code": "Neo.ClientError.Statement.SyntaxError", "message": "bad"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, KgvizError::StoreConnection(_)));
    }

    #[tokio::test]
    async fn missing_file_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = RowsFileStore::new(dir.path().join("absent.json"));
        let err = with_session(&store, "").await.unwrap_err();
        assert!(matches!(err, KgvizError::StoreConnection(_)));
    }

    #[tokio::test]
    async fn reads_rows_once_per_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");
        std::fs::write(&path, r#"[{"n": {"identity": "a", "labels": ["X"]}}]"#).unwrap();

        let store = RowsFileStore::new(&path);
        let mut session = store.open().await.unwrap();
        assert_eq!(session.run("").await.unwrap().len(), 1);
        assert!(session.run("").await.is_err());
        session.close().await.unwrap();
    }
}
