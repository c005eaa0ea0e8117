use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{SqliteArgumentValue, SqliteRow, SqliteTypeInfo, SqliteValueRef};
use sqlx::{Decode, Encode, Row, Sqlite, Type};
use uuid::Uuid;

use crate::address::BlobAddress;
use crate::error::{DriveError, Result};

/// Longest name a single tree level accepts, in bytes
pub const MAX_NAME_LEN: usize = 255;

/// Database-compatible node identifier, stored as TEXT
#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, PartialEq, Hash)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<NodeId> for Uuid {
    fn from(val: NodeId) -> Self {
        val.0
    }
}

impl From<Uuid> for NodeId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::str::FromStr for NodeId {
    type Err = DriveError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DriveError::InvalidArgument(format!("invalid node id: {}", e)))
    }
}

impl Decode<'_, Sqlite> for NodeId {
    fn decode(value: SqliteValueRef<'_>) -> std::result::Result<Self, BoxDynError> {
        let s = <String as Decode<Sqlite>>::decode(value)?;
        let uuid = Uuid::parse_str(&s)?;
        Ok(Self(uuid))
    }
}

impl Encode<'_, Sqlite> for NodeId {
    fn encode_by_ref(
        &self,
        args: &mut Vec<SqliteArgumentValue<'_>>,
    ) -> std::result::Result<IsNull, BoxDynError> {
        args.push(SqliteArgumentValue::Text(self.0.to_string().into()));
        Ok(IsNull::No)
    }
}

impl Type<Sqlite> for NodeId {
    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <String as Type<Sqlite>>::compatible(ty)
    }

    fn type_info() -> SqliteTypeInfo {
        <String as Type<Sqlite>>::type_info()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One path segment: an opaque, caller-supplied byte string.
///
/// The drive never interprets names. They are typically already ciphertext
/// produced by the caller, so no encoding is assumed.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct NodeName(pub(crate) Vec<u8>);

impl NodeName {
    /// Validate and wrap a name. Names must be non-empty and at most
    /// [`MAX_NAME_LEN`] bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(DriveError::InvalidArgument("empty name".to_string()));
        }
        if bytes.len() > MAX_NAME_LEN {
            return Err(DriveError::InvalidArgument(format!(
                "name is {} bytes, limit is {}",
                bytes.len(),
                MAX_NAME_LEN
            )));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeName({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl TryFrom<&str> for NodeName {
    type Error = DriveError;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s.as_bytes())
    }
}

/// Split a slash-delimited request path into segments.
///
/// Empty segments are dropped, so `"/a//b/"` is `["a", "b"]` and both `""`
/// and `"/"` are the empty path (the tenant root).
pub fn parse_path(path: &str) -> Result<Vec<NodeName>> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(NodeName::try_from)
        .collect()
}

/// Render segments back into a `/a/b` form for logs and error messages.
pub fn display_path(segments: &[NodeName]) -> String {
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        out.push_str(&segment.to_string());
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// One entry of a tenant's tree, file or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub name: NodeName,
    /// Hex content address for files, empty for directories
    pub content_hash: String,
    pub duplicate_index: u32,
    /// `None` only for roots
    pub parent_id: Option<NodeId>,
    pub is_directory: bool,
}

impl Node {
    pub fn is_dir(&self) -> bool {
        self.is_directory
    }

    pub fn is_file(&self) -> bool {
        !self.is_directory
    }

    /// Where this node's bytes live, if it is a file.
    pub fn blob_address(&self) -> Option<BlobAddress> {
        if self.is_directory {
            return None;
        }
        Some(BlobAddress::new(
            self.content_hash.clone(),
            self.duplicate_index,
        ))
    }

    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self> {
        let duplicate_index: i64 = row.try_get("duplicate_index")?;
        let duplicate_index = u32::try_from(duplicate_index).map_err(|e| {
            DriveError::Database(sqlx::Error::Decode(Box::new(e)))
        })?;
        Ok(Self {
            id: row.try_get("id")?,
            name: NodeName(row.try_get("name")?),
            content_hash: row.try_get("content_hash")?,
            duplicate_index,
            parent_id: row.try_get("parent_id")?,
            is_directory: row.try_get("is_directory")?,
        })
    }
}
