//! Tenant registry.
//!
//! A tenant owns a private root directory and a [`UserKey`]. Both are created
//! together at registration and never change.

use sqlx::{Row, SqliteConnection};

use crate::crypto::UserKey;
use crate::drive::Drive;
use crate::error::{DriveError, Result};
use crate::tree::queries::{self, NewNode};
use crate::tree::NodeId;

/// Longest accepted username, in bytes
pub const MAX_USERNAME_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct Tenant {
    pub username: String,
    pub root: NodeId,
    pub key: UserKey,
}

fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(DriveError::InvalidArgument("empty username".to_string()));
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(DriveError::InvalidArgument(format!(
            "username is {} bytes, limit is {}",
            username.len(),
            MAX_USERNAME_LEN
        )));
    }
    if username.chars().any(|c| c.is_control() || c == '/') {
        return Err(DriveError::InvalidArgument(format!(
            "username {:?} contains a forbidden character",
            username
        )));
    }
    Ok(())
}

impl Drive {
    /// Create a tenant with a fresh root and a freshly generated key.
    pub async fn register_tenant(&self, username: &str) -> Result<Tenant> {
        validate_username(username)?;
        let key = UserKey::generate()?;

        let username_owned = username.to_string();
        let encoded = key.to_base64();
        let root = self
            .tree()
            .transact(|conn| {
                let username = username_owned.clone();
                let encoded = encoded.clone();
                Box::pin(async move { insert_tenant(conn, &username, &encoded).await })
            })
            .await?;

        tracing::info!(%username, %root, "tenant registered");
        Ok(Tenant {
            username: username.to_string(),
            root,
            key,
        })
    }

    /// Look up a registered tenant.
    pub async fn tenant(&self, username: &str) -> Result<Tenant> {
        let row = sqlx::query("SELECT root_id, user_key FROM tenants WHERE username = ?")
            .bind(username)
            .fetch_optional(self.tree().pool())
            .await?;

        let Some(row) = row else {
            return Err(DriveError::not_found(format!("tenant {}", username)));
        };

        let encoded: String = row.try_get("user_key")?;
        Ok(Tenant {
            username: username.to_string(),
            root: row.try_get("root_id")?,
            key: UserKey::from_base64(&encoded)?,
        })
    }
}

async fn insert_tenant(conn: &mut SqliteConnection, username: &str, encoded_key: &str) -> Result<NodeId> {
    let root = queries::insert_node(conn, NewNode::root()).await?;

    let inserted = sqlx::query("INSERT INTO tenants (username, root_id, user_key) VALUES (?, ?, ?)")
        .bind(username)
        .bind(root.id)
        .bind(encoded_key)
        .execute(&mut *conn)
        .await;

    match inserted {
        Ok(_) => Ok(root.id),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(DriveError::AlreadyExists(format!("tenant {}", username)))
        }
        Err(e) => Err(e.into()),
    }
}
