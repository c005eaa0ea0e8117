use std::fmt;

/// Compile-time build metadata, filled in by `build.rs`.
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
    pub version: &'static str,
    pub package_version: &'static str,
    pub build_profile: &'static str,
    pub build_features: &'static str,
    pub build_timestamp: &'static str,
    pub rust_version: &'static str,
    pub target: &'static str,
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("REPO_VERSION"),
        package_version: env!("CARGO_PKG_VERSION"),
        build_profile: env!("BUILD_PROFILE"),
        build_features: env!("BUILD_FEATURES"),
        build_timestamp: env!("BUILD_TIMESTAMP"),
        rust_version: env!("RUST_VERSION"),
        target: env!("BUILD_TARGET"),
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "vault {} ({})", self.package_version, self.version)?;
        writeln!(f, "profile:  {}", self.build_profile)?;
        writeln!(f, "features: {}", self.build_features)?;
        writeln!(f, "built:    {}", self.build_timestamp)?;
        writeln!(f, "target:   {}", self.target)?;
        write!(f, "rustc:    {}", self.rust_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info_is_populated() {
        let info = build_info();
        assert_eq!(info.package_version, env!("CARGO_PKG_VERSION"));
        assert!(!info.build_profile.is_empty());
        assert!(info.to_string().starts_with("vault "));
    }
}
