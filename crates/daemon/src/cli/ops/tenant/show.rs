use clap::Args;

use vault_daemon::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Show {
    /// Username to look up
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TenantShowError {
    #[error(transparent)]
    State(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Show {
    type Error = TenantShowError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (drive, tenant) = ctx.open_tenant(&self.name).await?;

        let entries = match drive.list(tenant.root).await {
            Ok(nodes) => nodes.len(),
            Err(common::prelude::DriveError::NotFound(_)) => 0,
            Err(e) => return Err(StateError::from(e).into()),
        };

        // The key itself is never printed
        Ok(format!(
            "tenant: {}\nroot: {}\ntop-level entries: {}",
            tenant.username, tenant.root, entries
        ))
    }
}
