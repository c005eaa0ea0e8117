/**
 * Blob content addresses: keyed name digests
 *  and their duplicate-index suffixes.
 */
pub mod address;
/**
 * Encrypted blob storage over a flat object
 *  namespace (memory, local directory or S3).
 */
pub mod blobs;
/**
 * Engine configuration, threaded explicitly
 *  into `Drive::open`.
 */
pub mod config;
/**
 * Per-tenant keys and the AES-256-CTR
 *  blob cipher.
 */
pub mod crypto;
/**
 * The drive facade tying the tree and the
 *  blob store together.
 */
pub mod drive;
pub mod error;
/**
 * Tenant registry: usernames, roots and keys.
 */
pub mod tenant;
/**
 * Directory tree stored in SQLite, plus
 *  iterative path resolution.
 */
pub mod tree;

pub mod prelude {
    pub use crate::address::{derive_blob_key, BlobAddress};
    pub use crate::blobs::{BlobStorage, BlobStream};
    pub use crate::config::{BlobStoreConfig, DatabaseConfig, DriveConfig};
    pub use crate::crypto::UserKey;
    pub use crate::drive::Drive;
    pub use crate::error::{DriveError, ErrorKind, Result};
    pub use crate::tenant::Tenant;
    pub use crate::tree::{display_path, parse_path, Node, NodeId, NodeName};
}
