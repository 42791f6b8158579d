//! Property-graph store access.
//!
//! A [`GraphStore`] hands out sessions; each session runs exactly one query
//! and is released on every exit path by [`with_session`].

pub mod file;
pub mod neo4j;

use crate::error::Result;
use crate::value::ResultRow;
use async_trait::async_trait;
use tracing::{debug, warn};

pub use file::RowsFileStore;
pub use neo4j::Neo4jHttpStore;

#[async_trait]
pub trait GraphStore: Send + Sync {
    type Session: Session;

    /// Human-readable location of the store, for logs.
    fn describe(&self) -> String;

    async fn open(&self) -> Result<Self::Session>;
}

#[async_trait]
pub trait Session: Send {
    /// Runs `query` and returns every row, fully fetched.
    async fn run(&mut self, query: &str) -> Result<Vec<ResultRow>>;

    /// Releases the session. Must be safe to call after a failed `run`.
    async fn close(&mut self) -> Result<()>;
}

/// Opens a session, runs one query and closes the session, even when the
/// query fails. A query error takes precedence over a close error.
pub async fn with_session<S>(store: &S, query: &str) -> Result<Vec<ResultRow>>
where
    S: GraphStore + ?Sized,
{
    debug!(store = %store.describe(), "opening session");
    let mut session = store.open().await?;
    let result = session.run(query).await;
    let closed = session.close().await;

    match (result, closed) {
        (Ok(rows), Ok(())) => {
            debug!(rows = rows.len(), "query complete");
            Ok(rows)
        }
        (Ok(_), Err(err)) => Err(err),
        (Err(err), closed) => {
            if let Err(close_err) = closed {
                warn!(error = %close_err, "failed to close session after query error");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KgvizError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counters {
        opened: AtomicUsize,
        closed: AtomicUsize,
    }

    struct FakeStore {
        counters: Arc<Counters>,
        fail_query: bool,
    }

    struct FakeSession {
        counters: Arc<Counters>,
        fail_query: bool,
    }

    #[async_trait]
    impl GraphStore for FakeStore {
        type Session = FakeSession;

        fn describe(&self) -> String {
            "fake".to_string()
        }

        async fn open(&self) -> Result<FakeSession> {
            self.counters.opened.fetch_add(1, Ordering::SeqCst);
            Ok(FakeSession {
                counters: self.counters.clone(),
                fail_query: self.fail_query,
            })
        }
    }

    #[async_trait]
    impl Session for FakeSession {
        async fn run(&mut self, _query: &str) -> Result<Vec<ResultRow>> {
            if self.fail_query {
                return Err(KgvizError::StoreConnection("query failed".into()));
            }
            Ok(vec![ResultRow::new()])
        }

        async fn close(&mut self) -> Result<()> {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn session_is_closed_after_success() {
        let counters = Arc::new(Counters::default());
        let store = FakeStore {
            counters: counters.clone(),
            fail_query: false,
        };
        let rows = with_session(&store, "MATCH (n) RETURN n").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn session_is_closed_when_the_query_fails() {
        let counters = Arc::new(Counters::default());
        let store = FakeStore {
            counters: counters.clone(),
            fail_query: true,
        };
        let err = with_session(&store, "MATCH (n) RETURN n").await.unwrap_err();
        assert!(matches!(err, KgvizError::StoreConnection(_)));
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }
}
