//! Shared test utilities for drive integration tests
#![allow(dead_code)]

use std::path::PathBuf;

use bytes::Bytes;
use futures::TryStreamExt;
use tempfile::TempDir;

use common::prelude::*;

/// Small enough that modest payloads span many chunks
pub const TEST_CHUNK_SIZE: usize = 64;

/// Route engine logs through the test harness; `RUST_LOG` overrides.
pub fn init_test_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Set up an on-disk drive (SQLite file + flat blob directory) in a fresh
/// temp dir, with one registered tenant.
pub async fn setup_test_env() -> (Drive, Tenant, TempDir) {
    init_test_logging();
    let temp_dir = TempDir::new().unwrap();
    let drive = open_drive(&temp_dir).await;
    let tenant = drive.register_tenant("tester").await.unwrap();
    (drive, tenant, temp_dir)
}

/// Open (or reopen) the on-disk drive rooted at `temp_dir`.
pub async fn open_drive(temp_dir: &TempDir) -> Drive {
    let config = DriveConfig {
        chunk_size: TEST_CHUNK_SIZE,
        ..DriveConfig::local(temp_dir.path())
    };
    Drive::open(config).await.unwrap()
}

/// Where the local blob store keeps its files.
pub fn blob_dir(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("blobs")
}

/// On-disk path of a node's blob.
pub fn blob_file(temp_dir: &TempDir, node: &Node) -> PathBuf {
    let address = node.blob_address().expect("node is a file");
    blob_dir(temp_dir).join(address.object_name())
}

pub fn path(p: &str) -> Vec<NodeName> {
    parse_path(p).unwrap()
}

/// Upload `data` at `p` under the tenant's root.
pub async fn put(drive: &Drive, tenant: &Tenant, p: &str, data: &[u8]) -> Node {
    drive
        .create(&path(p), tenant.root, &tenant.key, data)
        .await
        .unwrap()
}

/// Decrypt a file node fully into memory.
pub async fn read_to_vec(drive: &Drive, node: &Node, key: &UserKey) -> Vec<u8> {
    let chunks: Vec<Bytes> = drive
        .open_for_read(node, key)
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    chunks.concat()
}

/// Names of a node's ancestors from the root down, the node itself included.
pub async fn ancestor_names(drive: &Drive, node: &Node, root: NodeId) -> Vec<String> {
    let mut names = vec![node.name.to_string()];
    let mut current = node.parent_id;
    while let Some(id) = current {
        if id == root {
            break;
        }
        let parent = drive.tree().get(id).await.unwrap();
        names.push(parent.name.to_string());
        current = parent.parent_id;
    }
    names.reverse();
    names
}
