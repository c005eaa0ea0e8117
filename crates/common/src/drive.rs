//! The drive facade: tree operations plus blob I/O kept consistent.
//!
//! The tree and the blob store share no transaction. Consistency comes from
//! ordering alone:
//!
//! - uploads write and claim the blob first, then commit the tree row, and
//!   remove the blob again if that commit fails;
//! - deletes commit the tree change first, then remove blobs.
//!
//! A crash can therefore leave an orphan blob (harmless, collectable) but
//! never a committed row whose upload was still in flight. A row whose blob
//! later goes missing is reported as [`DriveError::MissingBlob`] on read.

use std::time::Duration;

use tokio::io::AsyncRead;

use crate::address::{derive_blob_key, BlobAddress};
use crate::blobs::{BlobStorage, BlobStream};
use crate::config::DriveConfig;
use crate::crypto::UserKey;
use crate::error::{DriveError, Result};
use crate::tree::queries::{self, NewNode};
use crate::tree::{display_path, resolver, Node, NodeId, NodeName, RetryPolicy, TreeStore};

/// Staged uploads older than this are assumed abandoned by a crashed writer.
const STALE_STAGING_AGE: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct Drive {
    tree: TreeStore,
    blobs: BlobStorage,
    installation_root: NodeId,
}

impl Drive {
    /// Connect both stores, run migrations and bootstrap the installation
    /// root.
    pub async fn open(config: DriveConfig) -> Result<Self> {
        config.validate()?;

        let tree = TreeStore::connect(&config.database, RetryPolicy::from(&config)).await?;
        let blobs = BlobStorage::new(&config.blob_store, config.chunk_size).await?;
        let installation_root = tree.root_for_installation().await?;

        if let Err(e) = blobs.sweep_staging(STALE_STAGING_AGE).await {
            tracing::warn!(error = %e, "failed to sweep stale staged blobs");
        }

        tracing::info!(root = %installation_root, chunk_size = config.chunk_size, "drive opened");
        Ok(Self {
            tree,
            blobs,
            installation_root,
        })
    }

    /// In-memory drive, gone when dropped.
    pub async fn ephemeral() -> Result<Self> {
        Self::open(DriveConfig::ephemeral()).await
    }

    pub fn installation_root(&self) -> NodeId {
        self.installation_root
    }

    pub fn tree(&self) -> &TreeStore {
        &self.tree
    }

    pub fn blobs(&self) -> &BlobStorage {
        &self.blobs
    }

    /// Resolve a path under `root` to its node.
    pub async fn resolve(&self, segments: &[NodeName], root: NodeId) -> Result<Node> {
        let owned = segments.to_vec();
        self.tree
            .transact(|conn| {
                let segments = owned.clone();
                Box::pin(async move { resolver::resolve(conn, root, &segments).await })
            })
            .await
    }

    /// Direct children of a directory node.
    ///
    /// Both "no such node" and "directory is empty" are
    /// [`DriveError::NotFound`]; resolve the directory first to tell them
    /// apart.
    pub async fn list(&self, dir: NodeId) -> Result<Vec<Node>> {
        self.tree.list_children(dir).await
    }

    /// List by path. The empty path lists `root` itself.
    pub async fn list_path(&self, segments: &[NodeName], root: NodeId) -> Result<Vec<Node>> {
        if segments.is_empty() {
            return self.list(root).await;
        }
        let dir = self.resolve(segments, root).await?;
        if !dir.is_dir() {
            return Err(DriveError::NotADirectory(display_path(segments)));
        }
        self.list(dir.id).await
    }

    /// Create a directory, along with any missing ancestors.
    #[tracing::instrument(skip_all, fields(path = %display_path(segments)))]
    pub async fn mkdir(&self, segments: &[NodeName], root: NodeId) -> Result<Node> {
        let owned = segments.to_vec();
        let node = self
            .tree
            .transact(|conn| {
                let segments = owned.clone();
                Box::pin(async move {
                    let parent = resolver::ensure_parent(conn, root, &segments).await?;
                    let Some(leaf) = segments.last() else {
                        return Err(DriveError::InvalidArgument(
                            "path has no segments".to_string(),
                        ));
                    };
                    queries::insert_node(conn, NewNode::directory(parent, leaf.clone())).await
                })
            })
            .await?;

        tracing::info!(id = %node.id, "directory created");
        Ok(node)
    }

    /// Upload a new file at `segments`, creating missing ancestors.
    ///
    /// The bytes are encrypted under `key` while streaming from `source`.
    /// Fails with [`DriveError::AlreadyExists`] if the leaf name is taken;
    /// files are never overwritten.
    #[tracing::instrument(skip_all, fields(path = %display_path(segments)))]
    pub async fn create<R>(
        &self,
        segments: &[NodeName],
        root: NodeId,
        key: &UserKey,
        source: R,
    ) -> Result<Node>
    where
        R: AsyncRead + Unpin + Send,
    {
        let Some(leaf) = segments.last().cloned() else {
            return Err(DriveError::InvalidArgument(
                "path has no segments".to_string(),
            ));
        };

        let owned = segments.to_vec();
        let parent = self
            .tree
            .transact(|conn| {
                let segments = owned.clone();
                Box::pin(async move { resolver::ensure_parent(conn, root, &segments).await })
            })
            .await?;

        // Fail before streaming any bytes when the name is already taken.
        // The insert below still enforces uniqueness.
        match self.tree.lookup_child(parent, &leaf).await {
            Ok(_) => return Err(DriveError::AlreadyExists(display_path(segments))),
            Err(DriveError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let content_hash = derive_blob_key(leaf.as_bytes(), key);
        let staged = self.blobs.stage_encrypted(key, source).await?;
        let size = staged.size();
        let address = self.blobs.claim(staged, &content_hash).await?;

        let inserted = self.commit_leaf(segments, parent, &leaf, &address).await;

        match inserted {
            Ok(node) => {
                tracing::info!(id = %node.id, blob = %address, size, "file created");
                Ok(node)
            }
            Err(e) => {
                match self.blobs.delete(&address).await {
                    Ok(_) => tracing::debug!(blob = %address, "removed blob of failed upload"),
                    Err(cleanup) => {
                        tracing::warn!(blob = %address, error = %cleanup, "failed to remove blob of failed upload")
                    }
                }
                Err(e)
            }
        }
    }

    /// Insert the row for a claimed blob under `parent`.
    ///
    /// Errors name the requested path: a taken leaf is `AlreadyExists` for
    /// the full path and a parent removed since it was ensured is `NotFound`
    /// for the parent path.
    async fn commit_leaf(
        &self,
        segments: &[NodeName],
        parent: NodeId,
        leaf: &NodeName,
        address: &BlobAddress,
    ) -> Result<Node> {
        let inserted = self
            .tree
            .transact(|conn| {
                let new = NewNode::file(parent, leaf.clone(), address);
                Box::pin(async move { queries::insert_node(conn, new).await })
            })
            .await;

        inserted.map_err(|e| match e {
            DriveError::AlreadyExists(_) => DriveError::AlreadyExists(display_path(segments)),
            DriveError::NotFound(_) => {
                let ancestors = &segments[..segments.len().saturating_sub(1)];
                DriveError::NotFound(display_path(ancestors))
            }
            other => other,
        })
    }

    /// Delete the node at `segments` and, for directories, everything below
    /// it.
    ///
    /// All rows go in one transaction, children before parents. Blobs of the
    /// removed files are deleted after the commit; a blob that cannot be
    /// removed is left as an orphan and logged.
    #[tracing::instrument(skip_all, fields(path = %display_path(segments)))]
    pub async fn delete(&self, segments: &[NodeName], root: NodeId) -> Result<()> {
        if segments.is_empty() {
            return Err(DriveError::InvalidArgument(
                "refusing to delete a root".to_string(),
            ));
        }

        let owned = segments.to_vec();
        let removed = self
            .tree
            .transact(|conn| {
                let segments = owned.clone();
                Box::pin(async move {
                    let target = resolver::resolve(conn, root, &segments).await?;
                    let doomed = resolver::collect_subtree(conn, target).await?;
                    for node in &doomed {
                        queries::delete_node(conn, node.id).await?;
                    }
                    Ok(doomed)
                })
            })
            .await?;

        let mut blobs_removed = 0usize;
        for address in removed.iter().filter_map(Node::blob_address) {
            match self.blobs.delete(&address).await {
                Ok(true) => blobs_removed += 1,
                Ok(false) => tracing::warn!(blob = %address, "blob was already missing"),
                Err(e) => tracing::warn!(blob = %address, error = %e, "failed to remove blob"),
            }
        }

        tracing::info!(nodes = removed.len(), blobs = blobs_removed, "deleted");
        Ok(())
    }

    /// Open a file node for reading as a decrypting stream.
    pub async fn open_for_read(&self, node: &Node, key: &UserKey) -> Result<BlobStream> {
        let Some(address) = node.blob_address() else {
            return Err(DriveError::InvalidArgument(format!(
                "{} is a directory",
                node.name
            )));
        };
        self.blobs.read_decrypted(&address, key).await
    }
}
