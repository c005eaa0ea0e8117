//! Drive configuration.
//!
//! Everything process-wide the engine needs is carried in a [`DriveConfig`]
//! value handed to [`crate::Drive::open`]. There is no global state.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::crypto::DEFAULT_CHUNK_SIZE;
use crate::error::{DriveError, Result};

/// Where tree metadata lives.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DatabaseConfig {
    /// In-memory SQLite (for testing)
    #[default]
    Memory,

    /// SQLite database file
    File {
        /// Path to the database file, created if missing
        path: PathBuf,
        /// Pool size (defaults to 5)
        #[serde(default)]
        max_connections: Option<u32>,
    },
}

/// Where encrypted blob bytes live.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlobStoreConfig {
    /// In-memory storage (for testing)
    #[default]
    Memory,

    /// Flat directory on the local filesystem
    Local {
        /// Path to the blob directory
        path: PathBuf,
    },

    /// S3-compatible storage (AWS S3, MinIO, etc.)
    S3 {
        /// S3 endpoint URL (e.g., "http://localhost:9000" for MinIO)
        endpoint: String,
        /// Access key ID
        access_key: String,
        /// Secret access key
        secret_key: String,
        /// Bucket name
        bucket: String,
        /// Optional region (defaults to "us-east-1")
        region: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Plaintext bytes processed per cipher step, both directions
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// How many times a serialization failure re-runs a transaction body
    #[serde(default = "default_max_transaction_retries")]
    pub max_transaction_retries: u32,
    /// Base delay before the first retry, doubled on each attempt
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    // Tables last so the TOML rendering stays valid
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub blob_store: BlobStoreConfig,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_max_transaction_retries() -> u32 {
    8
}

fn default_retry_backoff_ms() -> u64 {
    5
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            blob_store: BlobStoreConfig::default(),
            chunk_size: default_chunk_size(),
            max_transaction_retries: default_max_transaction_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl DriveConfig {
    /// Fully ephemeral configuration: in-memory database and blob store.
    pub fn ephemeral() -> Self {
        Self::default()
    }

    /// SQLite file plus flat blob directory, both under `data_dir`.
    pub fn local(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            database: DatabaseConfig::File {
                path: data_dir.join("db.sqlite"),
                max_connections: None,
            },
            blob_store: BlobStoreConfig::Local {
                path: data_dir.join("blobs"),
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(DriveError::InvalidConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if let DatabaseConfig::File {
            max_connections: Some(0),
            ..
        } = self.database
        {
            return Err(DriveError::InvalidConfig(
                "max_connections must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
