//! SQLite-backed tree store.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Row, SqliteConnection};

use super::node::{Node, NodeId, NodeName};
use super::queries::{self, NewNode};
use crate::config::{DatabaseConfig, DriveConfig};
use crate::error::{DriveError, Result};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// Primary result codes; extended codes such as SQLITE_BUSY_SNAPSHOT (517)
// share the low byte.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// How a transaction body is re-run after a serialization failure.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(1u32 << attempt.min(6))
    }
}

impl From<&DriveConfig> for RetryPolicy {
    fn from(config: &DriveConfig) -> Self {
        Self {
            max_retries: config.max_transaction_retries,
            base_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&DriveConfig::default())
    }
}

/// Connection pool over the `file_tree` schema.
#[derive(Debug, Clone)]
pub struct TreeStore {
    pool: SqlitePool,
    retry: RetryPolicy,
}

impl TreeStore {
    pub async fn connect(config: &DatabaseConfig, retry: RetryPolicy) -> Result<Self> {
        let pool = match config {
            DatabaseConfig::Memory => Self::memory_pool().await?,
            DatabaseConfig::File {
                path,
                max_connections,
            } => {
                Self::file_pool(path, max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS)).await?
            }
        };

        let store = Self { pool, retry };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Fresh in-memory store with the default retry policy.
    pub async fn in_memory() -> Result<Self> {
        Self::connect(&DatabaseConfig::Memory, RetryPolicy::default()).await
    }

    async fn file_pool(path: &Path, max_connections: u32) -> Result<SqlitePool> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);

        Ok(SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?)
    }

    async fn memory_pool() -> Result<SqlitePool> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // Every connection to :memory: is its own database, so the pool must
        // hold exactly one and never recycle it.
        Ok(SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run `body` inside a transaction, re-running it from scratch when
    /// SQLite reports a serialization conflict.
    ///
    /// The body must be idempotent up to its own writes: on a retry the
    /// previous attempt has been rolled back. Non-retryable errors roll back
    /// and return immediately. Once the retry budget is spent the last
    /// conflict is returned as [`DriveError::Transient`].
    pub async fn transact<T, F>(&self, mut body: F) -> Result<T>
    where
        T: Send,
        F: for<'c> FnMut(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            let err = match self.try_once(&mut body).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let source = match err {
                DriveError::Database(source) => source,
                other => return Err(other),
            };
            if !is_retryable(&source) {
                return Err(DriveError::Database(source));
            }
            if attempt >= self.retry.max_retries {
                tracing::warn!(
                    attempts = attempt + 1,
                    "transaction conflict persisted past retry budget"
                );
                return Err(DriveError::Transient {
                    attempts: attempt + 1,
                    source,
                });
            }

            let delay = self.retry.backoff(attempt);
            tracing::debug!(attempt, ?delay, error = %source, "retrying conflicted transaction");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn try_once<T, F>(&self, body: &mut F) -> Result<T>
    where
        T: Send,
        F: for<'c> FnMut(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T>>,
    {
        let mut tx = self.pool.begin().await?;
        match body(&mut *tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::debug!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Exact lookup of one child, outside any explicit transaction.
    pub async fn lookup_child(&self, parent_id: NodeId, name: &NodeName) -> Result<Node> {
        let mut conn = self.pool.acquire().await?;
        queries::lookup_child(&mut conn, parent_id, name).await
    }

    /// Direct children of a directory.
    ///
    /// An empty result is reported as [`DriveError::NotFound`], matching how
    /// callers treat "nothing here".
    pub async fn list_children(&self, parent_id: NodeId) -> Result<Vec<Node>> {
        let mut conn = self.pool.acquire().await?;
        let children = queries::children(&mut conn, parent_id).await?;
        if children.is_empty() {
            return Err(DriveError::not_found(format!(
                "no entries under {}",
                parent_id
            )));
        }
        Ok(children)
    }

    pub async fn get(&self, id: NodeId) -> Result<Node> {
        let mut conn = self.pool.acquire().await?;
        queries::get_node(&mut conn, id).await
    }

    /// Insert a single row in its own transaction.
    pub async fn insert_leaf(
        &self,
        parent_id: NodeId,
        name: &NodeName,
        content_hash: &str,
        duplicate_index: u32,
        is_directory: bool,
    ) -> Result<Node> {
        let new = NewNode {
            name: name.clone(),
            content_hash: if is_directory {
                String::new()
            } else {
                content_hash.to_string()
            },
            duplicate_index,
            parent_id: Some(parent_id),
            is_directory,
        };
        self.transact(|conn| {
            let new = new.clone();
            Box::pin(async move { queries::insert_node(conn, new).await })
        })
        .await
    }

    /// Delete a single row in its own transaction.
    pub async fn delete_node(&self, id: NodeId) -> Result<()> {
        self.transact(|conn| Box::pin(async move { queries::delete_node(conn, id).await }))
            .await
    }

    /// A fresh, parentless directory.
    pub async fn create_root(&self) -> Result<NodeId> {
        let root = self
            .transact(|conn| Box::pin(async move { queries::insert_node(conn, NewNode::root()).await }))
            .await?;
        Ok(root.id)
    }

    /// The installation-wide root, created on first use.
    ///
    /// The singleton `file_tree_config` row is cleared and rewritten inside
    /// the same transaction that creates the root, so concurrent bootstraps
    /// converge on one root.
    pub async fn root_for_installation(&self) -> Result<NodeId> {
        self.transact(|conn| Box::pin(async move { bootstrap_root(conn).await }))
            .await
    }
}

async fn bootstrap_root(conn: &mut SqliteConnection) -> Result<NodeId> {
    let existing = sqlx::query("SELECT root FROM file_tree_config LIMIT 1")
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(row) = existing {
        let root: NodeId = row.try_get("root")?;
        match queries::get_node(conn, root).await {
            Ok(node) if node.is_dir() && node.parent_id.is_none() => return Ok(root),
            Ok(_) | Err(DriveError::NotFound(_)) => {
                tracing::warn!(%root, "configured root is invalid, recreating");
            }
            Err(e) => return Err(e),
        }
    }

    let root = queries::insert_node(conn, NewNode::root()).await?;

    sqlx::query("DELETE FROM file_tree_config")
        .execute(&mut *conn)
        .await?;
    sqlx::query("INSERT INTO file_tree_config (root) VALUES (?)")
        .bind(root.id)
        .execute(&mut *conn)
        .await?;

    tracing::info!(root = %root.id, "created installation root");
    Ok(root.id)
}

/// SQLITE_BUSY, SQLITE_LOCKED and their extended codes, plus pool
/// exhaustion, are worth retrying. Everything else is final.
pub(crate) fn is_retryable(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
            .unwrap_or(false),
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn name(s: &str) -> NodeName {
        NodeName::try_from(s).unwrap()
    }

    #[tokio::test]
    async fn test_installation_root_is_stable() {
        let store = TreeStore::in_memory().await.unwrap();
        let first = store.root_for_installation().await.unwrap();
        let second = store.root_for_installation().await.unwrap();
        assert_eq!(first, second);

        let root = store.get(first).await.unwrap();
        assert!(root.is_dir());
        assert!(root.parent_id.is_none());
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let store = TreeStore::in_memory().await.unwrap();
        let root = store.create_root().await.unwrap();

        let inserted = store
            .insert_leaf(root, &name("a.txt"), "deadbeef", 0, false)
            .await
            .unwrap();
        let found = store.lookup_child(root, &name("a.txt")).await.unwrap();
        assert_eq!(inserted, found);
        assert_eq!(found.content_hash, "deadbeef");
        assert_eq!(found.parent_id, Some(root));
    }

    #[tokio::test]
    async fn test_sibling_names_are_unique() {
        let store = TreeStore::in_memory().await.unwrap();
        let root = store.create_root().await.unwrap();

        store
            .insert_leaf(root, &name("docs"), "", 0, true)
            .await
            .unwrap();
        let err = store
            .insert_leaf(root, &name("docs"), "", 0, true)
            .await
            .unwrap_err();
        assert!(matches!(err, DriveError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_same_name_under_different_roots() {
        let store = TreeStore::in_memory().await.unwrap();
        let a = store.create_root().await.unwrap();
        let b = store.create_root().await.unwrap();

        store.insert_leaf(a, &name("x"), "", 0, true).await.unwrap();
        store.insert_leaf(b, &name("x"), "", 0, true).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_children_empty_is_not_found() {
        let store = TreeStore::in_memory().await.unwrap();
        let root = store.create_root().await.unwrap();

        let err = store.list_children(root).await.unwrap_err();
        assert!(matches!(err, DriveError::NotFound(_)));

        store
            .insert_leaf(root, &name("b"), "h", 0, false)
            .await
            .unwrap();
        store.insert_leaf(root, &name("a"), "", 0, true).await.unwrap();

        let names: Vec<String> = store
            .list_children(root)
            .await
            .unwrap()
            .iter()
            .map(|n| n.name.to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_delete_node() {
        let store = TreeStore::in_memory().await.unwrap();
        let root = store.create_root().await.unwrap();
        let node = store
            .insert_leaf(root, &name("gone"), "h", 0, false)
            .await
            .unwrap();

        store.delete_node(node.id).await.unwrap();
        assert!(matches!(
            store.get(node.id).await,
            Err(DriveError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_node(node.id).await,
            Err(DriveError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_body_rolls_back() {
        let store = TreeStore::in_memory().await.unwrap();
        let root = store.create_root().await.unwrap();

        let result: Result<()> = store
            .transact(|conn| {
                Box::pin(async move {
                    queries::insert_node(conn, NewNode::directory(root, name("temp"))).await?;
                    Err(DriveError::InvalidArgument("abort".to_string()))
                })
            })
            .await;
        assert!(matches!(result, Err(DriveError::InvalidArgument(_))));
        assert!(matches!(
            store.lookup_child(root, &name("temp")).await,
            Err(DriveError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_non_retryable_errors_run_once() {
        let store = TreeStore::in_memory().await.unwrap();
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<()> = store
            .transact(|_conn| {
                let calls = calls.clone();
                Box::pin(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(DriveError::Database(sqlx::Error::RowNotFound))
                })
            })
            .await;
        assert!(matches!(result, Err(DriveError::Database(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pool_timeout_retries_until_budget() {
        let store = TreeStore::connect(
            &DatabaseConfig::Memory,
            RetryPolicy {
                max_retries: 3,
                base_backoff: Duration::from_millis(1),
            },
        )
        .await
        .unwrap();
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<()> = store
            .transact(|_conn| {
                let calls = calls.clone();
                Box::pin(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(DriveError::Database(sqlx::Error::PoolTimedOut))
                })
            })
            .await;
        match result {
            Err(DriveError::Transient { attempts, .. }) => assert_eq!(attempts, 4),
            other => panic!("expected transient error, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 8,
            base_backoff: Duration::from_millis(5),
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(5));
        assert_eq!(policy.backoff(1), Duration::from_millis(10));
        assert_eq!(policy.backoff(3), Duration::from_millis(40));
        assert_eq!(policy.backoff(20), Duration::from_millis(320));
    }
}
