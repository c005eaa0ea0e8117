use std::path::PathBuf;

use clap::Args;
use futures::TryStreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use common::prelude::{parse_path, DriveError};
use vault_daemon::state::StateError;

use super::ls::list_directory;

#[derive(Args, Debug, Clone)]
pub struct Get {
    /// Tenant that owns the tree
    pub user: String,

    /// File to download; a directory is listed instead
    pub path: String,

    /// Write the file here instead of stdout
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum GetError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error("{}", .0.public_message())]
    Drive(#[from] DriveError),

    #[error("failed to write output: {0}")]
    Write(#[source] std::io::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Get {
    type Error = GetError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let segments = parse_path(&self.path)?;
        let (drive, tenant) = ctx.open_tenant(&self.user).await?;

        if segments.is_empty() {
            return Ok(list_directory(&drive, &segments, tenant.root).await?);
        }

        let node = drive.resolve(&segments, tenant.root).await?;
        if node.is_dir() {
            return Ok(list_directory(&drive, &segments, tenant.root).await?);
        }

        let mut stream = drive.open_for_read(&node, &tenant.key).await?;
        let mut writer: Box<dyn AsyncWrite + Unpin + Send> = match &self.out {
            Some(path) => Box::new(
                tokio::fs::File::create(path)
                    .await
                    .map_err(GetError::Write)?,
            ),
            None => Box::new(tokio::io::stdout()),
        };

        let mut written = 0u64;
        while let Some(chunk) = stream.try_next().await? {
            writer.write_all(&chunk).await.map_err(GetError::Write)?;
            written += chunk.len() as u64;
        }
        writer.flush().await.map_err(GetError::Write)?;

        match &self.out {
            Some(path) => Ok(format!("Wrote {} bytes to {}", written, path.display())),
            // The bytes already went to stdout
            None => Ok(String::new()),
        }
    }
}
