use clap::{Args, Subcommand};

pub mod add;
pub mod show;

use crate::cli::op::Op;

crate::command_enum! {
    (Add, add::Add),
    (Show, show::Show),
}

// Rename the generated Command to TenantCommand for clarity
pub type TenantCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Tenant {
    #[command(subcommand)]
    pub command: TenantCommand,
}

#[async_trait::async_trait]
impl Op for Tenant {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
