//! The directory tree: node model, SQLite storage and path resolution.

mod node;
pub(crate) mod queries;
pub(crate) mod resolver;
mod store;

pub use node::{display_path, parse_path, Node, NodeId, NodeName, MAX_NAME_LEN};
pub use store::{RetryPolicy, TreeStore};
