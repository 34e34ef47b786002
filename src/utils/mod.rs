//! Shared helpers: filesystem access and environment flags

pub mod fs;

use std::env;

pub use fs::{DirStore, ItemStore, ensure_dir, read_file, write_file};

/// Whether `value` spells a truthy flag ("1", "true", "on", "yes", "t")
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes" | "t"
    )
}

/// Check if an environment variable is set to a truthy value
pub fn is_env_true(key: &str) -> bool {
    env::var(key).is_ok_and(|value| is_truthy(&value))
}
