use clap::Args;

use vault_daemon::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Add {
    /// Username of the new tenant
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TenantAddError {
    #[error(transparent)]
    State(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Add {
    type Error = TenantAddError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let drive = ctx.open_drive().await?;
        let tenant = drive
            .register_tenant(&self.name)
            .await
            .map_err(StateError::from)?;

        Ok(format!("Registered {} (root {})", tenant.username, tenant.root))
    }
}
