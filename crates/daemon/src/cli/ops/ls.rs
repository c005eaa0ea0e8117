use clap::Args;

use common::prelude::{parse_path, Drive, DriveError, Node, NodeId, NodeName};
use vault_daemon::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Ls {
    /// Tenant that owns the tree
    pub user: String,

    /// Directory to list
    #[arg(default_value = "/")]
    pub path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LsError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error("{}", .0.public_message())]
    Drive(#[from] DriveError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Ls {
    type Error = LsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let segments = parse_path(&self.path)?;
        let (drive, tenant) = ctx.open_tenant(&self.user).await?;
        Ok(list_directory(&drive, &segments, tenant.root).await?)
    }
}

/// List a directory for display, rendering an existing but empty directory
/// as `(empty)`.
///
/// The engine reports empty and missing directories the same way, so the
/// directory itself is resolved first to tell them apart.
pub(crate) async fn list_directory(
    drive: &Drive,
    segments: &[NodeName],
    root: NodeId,
) -> Result<String, DriveError> {
    if !segments.is_empty() {
        let dir = drive.resolve(segments, root).await?;
        if dir.is_file() {
            return Err(DriveError::NotADirectory(dir.name.to_string()));
        }
    }

    match drive.list_path(segments, root).await {
        Ok(nodes) => Ok(render_listing(&nodes)),
        Err(DriveError::NotFound(_)) => Ok("(empty)".to_string()),
        Err(e) => Err(e),
    }
}

pub(crate) fn render_listing(nodes: &[Node]) -> String {
    nodes
        .iter()
        .map(|node| match node.blob_address() {
            Some(address) => format!("{} (file) [{}]", node.name, address),
            None => format!("{}/ (dir)", node.name),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
