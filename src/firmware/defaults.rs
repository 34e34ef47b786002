//! Default file names, staging list markers and environment variables

/// Staging list inside the items directory
pub const DEFAULT_ITEM_LIST_FILE: &str = "item_list.txt";
/// Signature input list inside the items directory
pub const DEFAULT_SIG_ITEM_LIST_FILE: &str = "sig_item_list.txt";

/// Marks a staging or signature list line for inclusion
pub const MARKER_INCLUDE: char = '+';
/// Shorter lines are ignored
pub const MIN_ITEM_LINE_LEN: usize = 3;

/// Log level, `json:` prefix selects JSON lines
pub const LOG_LEVEL_ENV: &str = "FLASHPACK_LOG_LEVEL";
/// File receiving JSON log lines
pub const LOG_PATH_ENV: &str = "FLASHPACK_LOG_PATH";
/// Truthy value turns checksum mismatches into failures
pub const STRICT_ENV: &str = "FLASHPACK_STRICT";

/// Whether checksum and signature failures should fail the process.
/// The flag wins; otherwise `FLASHPACK_STRICT` decides.
pub fn strict_mode(flag: bool) -> bool {
    flag || crate::utils::is_env_true(STRICT_ENV)
}
