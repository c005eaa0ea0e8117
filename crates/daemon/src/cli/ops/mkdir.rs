use clap::Args;

use common::prelude::{display_path, parse_path, DriveError};
use vault_daemon::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Mkdir {
    /// Tenant that owns the tree
    pub user: String,

    /// Directory to create, along with any missing ancestors
    pub path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MkdirError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error("{}", .0.public_message())]
    Drive(#[from] DriveError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Mkdir {
    type Error = MkdirError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let segments = parse_path(&self.path)?;
        let (drive, tenant) = ctx.open_tenant(&self.user).await?;
        drive.mkdir(&segments, tenant.root).await?;

        Ok(format!("Created {}", display_path(&segments)))
    }
}
