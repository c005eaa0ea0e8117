// Logging and process setup
pub mod process;

// App state (configuration, paths)
pub mod state;

// Build metadata
pub mod version;

pub use process::init_logging;
pub use state::{AppConfig, AppState, StateError};
pub use version::{build_info, BuildInfo};
