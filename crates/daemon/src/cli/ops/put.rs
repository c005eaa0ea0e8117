use std::path::PathBuf;

use clap::Args;

use common::prelude::{display_path, parse_path, DriveError};
use vault_daemon::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Put {
    /// Tenant to upload as
    pub user: String,

    /// Destination path inside the tenant's tree
    pub path: String,

    /// Local file to upload
    pub file: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum PutError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error("{}", .0.public_message())]
    Drive(#[from] DriveError),

    #[error("failed to open {path:?}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Put {
    type Error = PutError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let segments = parse_path(&self.path)?;
        let source = tokio::fs::File::open(&self.file)
            .await
            .map_err(|source| PutError::Source {
                path: self.file.clone(),
                source,
            })?;

        let (drive, tenant) = ctx.open_tenant(&self.user).await?;
        let node = drive
            .create(&segments, tenant.root, &tenant.key, source)
            .await?;

        Ok(format!("Uploaded {} ({})", display_path(&segments), node.id))
    }
}
