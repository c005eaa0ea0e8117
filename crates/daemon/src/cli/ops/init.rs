use std::path::PathBuf;

use clap::Args;

use vault_daemon::state::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Default log level written to the config
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Directory for log files (logs to stderr only if not set)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("state error: {0}")]
    State(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            log_level: self.log_level.clone(),
            log_dir: self.log_dir.clone(),
            drive: None,
        };
        config.log_level()?;

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        // Opening runs migrations and bootstraps the installation root
        let drive = state.open_drive().await?;

        Ok(format!(
            "Initialized vault at {}\ninstallation root: {}",
            state.vault_dir.display(),
            drive.installation_root()
        ))
    }
}
