pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vault")]
#[command(about = "Encrypted multi-tenant file drive")]
pub struct Args {
    /// Path to the vault directory (defaults to ~/.vault)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
