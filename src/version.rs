//! Version strings reported by `--version`

/// Package version, injected by the build script
pub const VERSION: &str = env!("FLASHPACK_VERSION");

/// Commit hash, when the build environment exports `GIT_COMMIT`
pub const GIT_COMMIT: Option<&str> = option_env!("GIT_COMMIT");

/// Build timestamp, when the build environment exports `BUILD_TIME`
pub const BUILD_TIME: Option<&str> = option_env!("BUILD_TIME");

/// `VERSION` plus the short commit and build time when known
pub fn full_version() -> String {
    let commit = GIT_COMMIT.map(|c| format!(" ({})", c.get(..8).unwrap_or(c)));
    let built = BUILD_TIME.map(|t| format!(" built {t}"));
    format!(
        "{VERSION}{}{}",
        commit.unwrap_or_default(),
        built.unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_version_starts_with_version() {
        assert!(full_version().starts_with(VERSION));
        assert!(!VERSION.is_empty());
    }
}
