//! Path resolution over the tree.
//!
//! Both walks are iterative: one lookup per segment, never recursion. They
//! run on a caller-supplied connection, normally inside
//! [`super::TreeStore::transact`], so a whole walk sees one snapshot.

use sqlx::SqliteConnection;

use super::node::{display_path, Node, NodeId, NodeName};
use super::queries::{self, NewNode};
use crate::error::{DriveError, Result};

/// Walk `segments` from `root` and return the final node.
///
/// Every segment but the last must be a directory.
pub(crate) async fn resolve(
    conn: &mut SqliteConnection,
    root: NodeId,
    segments: &[NodeName],
) -> Result<Node> {
    let Some((last, ancestors)) = segments.split_last() else {
        return Err(DriveError::InvalidArgument(
            "path has no segments".to_string(),
        ));
    };

    let mut parent = root;
    for (depth, segment) in ancestors.iter().enumerate() {
        let node = lookup(conn, parent, segment, &segments[..=depth]).await?;
        if !node.is_dir() {
            return Err(DriveError::NotADirectory(display_path(
                &segments[..=depth],
            )));
        }
        parent = node.id;
    }

    lookup(conn, parent, last, segments).await
}

/// Make sure every ancestor of the last segment exists as a directory and
/// return the id of the immediate parent. The last segment itself is not
/// touched.
///
/// A missing directory is created. If another writer creates it first the
/// insert fails on the sibling-name constraint and the row is re-read.
pub(crate) async fn ensure_parent(
    conn: &mut SqliteConnection,
    root: NodeId,
    segments: &[NodeName],
) -> Result<NodeId> {
    let Some((_, ancestors)) = segments.split_last() else {
        return Err(DriveError::InvalidArgument(
            "path has no segments".to_string(),
        ));
    };

    let mut parent = root;
    for (depth, segment) in ancestors.iter().enumerate() {
        let prefix = &segments[..=depth];
        let node = match queries::lookup_child(conn, parent, segment).await {
            Ok(node) => node,
            Err(DriveError::NotFound(_)) => {
                match queries::insert_node(conn, NewNode::directory(parent, segment.clone())).await
                {
                    Ok(created) => {
                        tracing::debug!(path = %display_path(prefix), "created directory");
                        created
                    }
                    Err(DriveError::AlreadyExists(_)) => {
                        queries::lookup_child(conn, parent, segment).await?
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };

        if !node.is_dir() {
            return Err(DriveError::NotADirectory(display_path(prefix)));
        }
        parent = node.id;
    }

    Ok(parent)
}

/// Every node in the subtree rooted at `top`, `top` included, ordered so
/// that each node comes after all of its descendants.
pub(crate) async fn collect_subtree(conn: &mut SqliteConnection, top: Node) -> Result<Vec<Node>> {
    let mut pending = vec![top];
    let mut visited = Vec::new();

    while let Some(node) = pending.pop() {
        if node.is_dir() {
            pending.extend(queries::children(conn, node.id).await?);
        }
        visited.push(node);
    }

    // Parents are visited before their children
    visited.reverse();
    Ok(visited)
}

async fn lookup(
    conn: &mut SqliteConnection,
    parent: NodeId,
    segment: &NodeName,
    prefix: &[NodeName],
) -> Result<Node> {
    match queries::lookup_child(conn, parent, segment).await {
        Err(DriveError::NotFound(_)) => Err(DriveError::not_found(display_path(prefix))),
        other => other,
    }
}
