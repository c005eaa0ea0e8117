use std::env;
use std::process::Command;

/// Trimmed stdout of a command, if it ran and succeeded.
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn set_env(key: &str, value: &str) {
    println!("cargo:rustc-env={}={}", key, value);
}

fn report_build_profile() {
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    set_env("BUILD_PROFILE", &profile);
}

/// Cargo exposes each enabled feature as `CARGO_FEATURE_<NAME>`.
fn report_enabled_features() {
    let mut features: Vec<String> = env::vars()
        .filter_map(|(key, _)| {
            key.strip_prefix("CARGO_FEATURE_")
                .map(|name| name.to_lowercase().replace('_', "-"))
        })
        .collect();
    features.sort();
    if features.is_empty() {
        features.push("none".to_string());
    }
    set_env("BUILD_FEATURES", &features.join(","));
}

fn report_repository_version() {
    let version = env::var("CI_BUILD_REF")
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| command_output("git", &["describe", "--always", "--dirty", "--long", "--tags"]))
        .or_else(|| command_output("git", &["rev-parse", "--short", "HEAD"]))
        .or_else(|| env::var("CARGO_PKG_VERSION").ok())
        .unwrap_or_else(|| "unknown".to_string());
    set_env("REPO_VERSION", &version);
}

fn report_build_timestamp() {
    set_env("BUILD_TIMESTAMP", &chrono::Utc::now().to_rfc3339());
}

fn report_rust_version() {
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let version = command_output(&rustc, &["--version"]).unwrap_or_else(|| "unknown".to_string());
    set_env("RUST_VERSION", &version);
}

fn report_target() {
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    set_env("BUILD_TARGET", &target);
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");

    report_build_profile();
    report_enabled_features();
    report_repository_version();
    report_build_timestamp();
    report_rust_version();
    report_target();
}
