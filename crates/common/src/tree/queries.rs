//! Single-statement tree queries.
//!
//! Each takes a bare connection so it can run either inside a transaction
//! (`&mut *tx`) or on a pooled connection.

use sqlx::SqliteConnection;

use super::node::{Node, NodeId, NodeName};
use crate::address::BlobAddress;
use crate::error::{DriveError, Result};

/// Columns for a row about to be inserted.
#[derive(Debug, Clone)]
pub(crate) struct NewNode {
    pub name: NodeName,
    pub content_hash: String,
    pub duplicate_index: u32,
    pub parent_id: Option<NodeId>,
    pub is_directory: bool,
}

impl NewNode {
    pub fn directory(parent_id: NodeId, name: NodeName) -> Self {
        Self {
            name,
            content_hash: String::new(),
            duplicate_index: 0,
            parent_id: Some(parent_id),
            is_directory: true,
        }
    }

    pub fn file(parent_id: NodeId, name: NodeName, address: &BlobAddress) -> Self {
        Self {
            name,
            content_hash: address.content_hash().to_string(),
            duplicate_index: address.duplicate_index(),
            parent_id: Some(parent_id),
            is_directory: false,
        }
    }

    /// A parentless directory: an installation or tenant root.
    pub fn root() -> Self {
        Self {
            name: NodeName(b"root".to_vec()),
            content_hash: String::new(),
            duplicate_index: 0,
            parent_id: None,
            is_directory: true,
        }
    }
}

/// Exact single-level lookup of `name` under `parent_id`.
pub(crate) async fn lookup_child(
    conn: &mut SqliteConnection,
    parent_id: NodeId,
    name: &NodeName,
) -> Result<Node> {
    let row = sqlx::query(
        r#"
        SELECT id, name, content_hash, duplicate_index, parent_id, is_directory
        FROM file_tree
        WHERE name = ? AND parent_id = ?
        "#,
    )
    .bind(name.as_bytes())
    .bind(parent_id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => Node::from_row(&row),
        None => Err(DriveError::not_found(format!("{} under {}", name, parent_id))),
    }
}

/// Direct children of `parent_id`, possibly none.
pub(crate) async fn children(conn: &mut SqliteConnection, parent_id: NodeId) -> Result<Vec<Node>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, content_hash, duplicate_index, parent_id, is_directory
        FROM file_tree
        WHERE parent_id = ?
        ORDER BY is_directory DESC, name ASC
        "#,
    )
    .bind(parent_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(Node::from_row).collect()
}

/// Fetch a node by id.
pub(crate) async fn get_node(conn: &mut SqliteConnection, id: NodeId) -> Result<Node> {
    let row = sqlx::query(
        r#"
        SELECT id, name, content_hash, duplicate_index, parent_id, is_directory
        FROM file_tree
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => Node::from_row(&row),
        None => Err(DriveError::not_found(format!("node {}", id))),
    }
}

/// Insert one row.
///
/// A uniqueness violation on `(name, parent_id)` becomes
/// [`DriveError::AlreadyExists`] and a parent that no longer exists becomes
/// [`DriveError::NotFound`]; everything else propagates as is.
pub(crate) async fn insert_node(conn: &mut SqliteConnection, new: NewNode) -> Result<Node> {
    let id = NodeId::new();
    let result = sqlx::query(
        r#"
        INSERT INTO file_tree (id, name, content_hash, duplicate_index, parent_id, is_directory)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(new.name.as_bytes())
    .bind(&new.content_hash)
    .bind(i64::from(new.duplicate_index))
    .bind(new.parent_id)
    .bind(new.is_directory)
    .execute(&mut *conn)
    .await;

    match result {
        Ok(_) => Ok(Node {
            id,
            name: new.name,
            content_hash: new.content_hash,
            duplicate_index: new.duplicate_index,
            parent_id: new.parent_id,
            is_directory: new.is_directory,
        }),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(DriveError::AlreadyExists(new.name.to_string()))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
            Err(DriveError::not_found(match new.parent_id {
                Some(parent) => format!("parent {}", parent),
                None => "parent".to_string(),
            }))
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete exactly one row by id. Children are the caller's problem.
pub(crate) async fn delete_node(conn: &mut SqliteConnection, id: NodeId) -> Result<()> {
    let result = sqlx::query("DELETE FROM file_tree WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DriveError::not_found(format!("node {}", id)));
    }
    Ok(())
}
