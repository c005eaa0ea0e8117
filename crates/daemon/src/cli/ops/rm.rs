use clap::Args;

use common::prelude::{display_path, parse_path, DriveError};
use vault_daemon::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Rm {
    /// Tenant that owns the tree
    pub user: String,

    /// File or directory to remove; directories are removed recursively
    pub path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RmError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error("{}", .0.public_message())]
    Drive(#[from] DriveError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Rm {
    type Error = RmError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let segments = parse_path(&self.path)?;
        let (drive, tenant) = ctx.open_tenant(&self.user).await?;
        drive.delete(&segments, tenant.root).await?;

        Ok(format!("Removed {}", display_path(&segments)))
    }
}
