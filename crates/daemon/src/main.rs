// CLI modules
mod cli;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Get, Init, Ls, Mkdir, Put, Rm, Tenant, Version};
use tracing_subscriber::filter::LevelFilter;
use vault_daemon::AppConfig;

command_enum! {
    (Init, Init),
    (Tenant, Tenant),
    (Put, Put),
    (Get, Get),
    (Ls, Ls),
    (Mkdir, Mkdir),
    (Rm, Rm),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let ctx = cli::op::OpContext::new(args.config_path);

    // Before `init` there is no config yet; fall back to defaults
    let config = ctx
        .load_state()
        .map(|state| state.config)
        .unwrap_or_else(|_| AppConfig::default());
    let level = config.log_level().unwrap_or_else(|e| {
        eprintln!("Warning: {}", e);
        LevelFilter::WARN
    });
    let guards = vault_daemon::init_logging(level, config.log_dir.as_deref());

    let code = match args.command.execute(&ctx).await {
        Ok(output) => {
            let output = output.to_string();
            if !output.is_empty() {
                println!("{}", output);
            }
            0
        }
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("Error: {}", e);
            1
        }
    };

    // Flush buffered log lines before exiting
    drop(guards);
    std::process::exit(code);
}
