use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use common::prelude::{Drive, DriveConfig, DriveError};
use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

pub const APP_NAME: &str = "vault";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DB_FILE_NAME: &str = "db.sqlite";
pub const BLOBS_DIR_NAME: &str = "blobs";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default log level when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for daily rolling log files (stderr only if unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Engine configuration; a local drive inside the vault directory if unset
    #[serde(default)]
    pub drive: Option<DriveConfig>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: None,
            drive: None,
        }
    }
}

impl AppConfig {
    pub fn log_level(&self) -> Result<LevelFilter, StateError> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| StateError::InvalidConfig(format!("unknown log level {:?}", self.log_level)))
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the vault directory (~/.vault)
    pub vault_dir: PathBuf,
    /// Path to the SQLite database
    pub db_path: PathBuf,
    /// Path to the blobs directory
    pub blobs_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the vault directory path (custom or default ~/.vault)
    pub fn vault_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new vault directory with a local drive configuration.
    pub fn init(custom_path: Option<PathBuf>, config: Option<AppConfig>) -> Result<Self, StateError> {
        let vault_dir = Self::vault_dir(custom_path)?;
        if vault_dir.join(CONFIG_FILE_NAME).exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&vault_dir)?;
        let vault_dir = vault_dir.canonicalize()?;

        let blobs_path = vault_dir.join(BLOBS_DIR_NAME);
        fs::create_dir_all(&blobs_path)?;

        let mut config = config.unwrap_or_default();
        if config.drive.is_none() {
            config.drive = Some(DriveConfig::local(&vault_dir));
        }
        let config_path = vault_dir.join(CONFIG_FILE_NAME);
        fs::write(&config_path, toml::to_string_pretty(&config)?)?;

        Ok(Self {
            db_path: vault_dir.join(DB_FILE_NAME),
            vault_dir,
            blobs_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the vault directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let vault_dir = Self::vault_dir(custom_path)?;
        if !vault_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_path = vault_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }
        let config: AppConfig = toml::from_str(&fs::read_to_string(&config_path)?)?;

        Ok(Self {
            db_path: vault_dir.join(DB_FILE_NAME),
            blobs_path: vault_dir.join(BLOBS_DIR_NAME),
            vault_dir,
            config_path,
            config,
        })
    }

    /// The engine configuration this state points at.
    pub fn drive_config(&self) -> DriveConfig {
        self.config
            .drive
            .clone()
            .unwrap_or_else(|| DriveConfig::local(&self.vault_dir))
    }

    /// Open the drive described by the loaded configuration.
    pub async fn open_drive(&self) -> Result<Drive, StateError> {
        Ok(Drive::open(self.drive_config()).await?)
    }

    pub fn path(&self) -> &Path {
        &self.vault_dir
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("vault directory not initialized. Run 'vault init' first")]
    NotInitialized,

    #[error("vault directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{}", .0.public_message())]
    Drive(#[from] DriveError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use common::prelude::{BlobStoreConfig, DatabaseConfig};
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_init_then_load() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("vault");

        let created = AppState::init(Some(dir.clone()), None).unwrap();
        assert!(created.config_path.is_file());
        assert!(created.blobs_path.is_dir());

        let loaded = AppState::load(Some(dir)).unwrap();
        assert_eq!(loaded.vault_dir, created.vault_dir);
        match loaded.drive_config().database {
            DatabaseConfig::File { path, .. } => assert_eq!(path, created.db_path),
            other => panic!("unexpected database config: {:?}", other),
        }
        match loaded.drive_config().blob_store {
            BlobStoreConfig::Local { path } => assert_eq!(path, created.blobs_path),
            other => panic!("unexpected blob store config: {:?}", other),
        }
    }

    #[test]
    fn test_double_init_fails() {
        let temp = TempDir::new().unwrap();
        AppState::init(Some(temp.path().to_path_buf()), None).unwrap();
        assert!(matches!(
            AppState::init(Some(temp.path().to_path_buf()), None),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_load_uninitialized() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            AppState::load(Some(temp.path().join("missing"))),
            Err(StateError::NotInitialized)
        ));
        assert!(matches!(
            AppState::load(Some(temp.path().to_path_buf())),
            Err(StateError::MissingFile(_))
        ));
    }

    #[test]
    fn test_log_level() {
        let mut config = AppConfig::default();
        assert_eq!(config.log_level().unwrap(), LevelFilter::WARN);
        config.log_level = "debug".to_string();
        assert_eq!(config.log_level().unwrap(), LevelFilter::DEBUG);
        config.log_level = "chatty".to_string();
        assert!(config.log_level().is_err());
    }

    #[tokio::test]
    async fn test_open_drive_from_state() {
        let temp = TempDir::new().unwrap();
        let state = AppState::init(Some(temp.path().to_path_buf()), None).unwrap();

        let drive = state.open_drive().await.unwrap();
        let root = drive.installation_root();
        drop(drive);

        let reopened = AppState::load(Some(temp.path().to_path_buf()))
            .unwrap()
            .open_drive()
            .await
            .unwrap();
        assert_eq!(reopened.installation_root(), root);
        assert!(state.db_path.is_file());
    }
}
