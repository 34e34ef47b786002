//! Item identifiers: `partition:relative_path`
//!
//! The part after the first `:` names the file under the items directory,
//! both when unpacking payloads and when hashing them for a manifest.

use crate::exceptions::{FlashError, Result};
use std::path::{Component, Path, PathBuf};

/// Split an item identifier into `(partition, relative_path)`
pub fn split_item(item: &str) -> Result<(&str, &str)> {
    let Some(pos) = item.find(':') else {
        return Err(FlashError::format(format!("Cannot find ':' in item: {item}")));
    };

    let (partition, rest) = (&item[..pos], &item[pos + 1..]);
    if rest.is_empty() {
        return Err(FlashError::format(format!("Path on FS is empty in item: {item}")));
    }

    Ok((partition, rest))
}

/// Relative path part of an item identifier
pub fn item_relative_path(item: &str) -> Result<&str> {
    split_item(item).map(|(_, path)| path)
}

/// Join `relative` under `root`. Leading roots and `.` segments are dropped
/// so the result always lands inside `root`; `..` segments are rejected.
pub fn resolve_path(root: &Path, relative: &str) -> Result<PathBuf> {
    let mut resolved = root.to_path_buf();

    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
            Component::ParentDir => {
                return Err(FlashError::format(format!(
                    "Path escapes the items directory: {relative}"
                )));
            }
        }
    }

    if resolved == root {
        return Err(FlashError::format(format!(
            "Path resolves to the items directory itself: {relative}"
        )));
    }

    Ok(resolved)
}

/// Resolve the file backing an item identifier
pub fn resolve_item_path(root: &Path, item: &str) -> Result<PathBuf> {
    resolve_path(root, item_relative_path(item)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_item() {
        assert_eq!(
            split_item("update:boot/boot.img").unwrap(),
            ("update", "boot/boot.img")
        );
        // only the first ':' separates
        assert_eq!(split_item("a:b:c").unwrap(), ("a", "b:c"));
        assert_eq!(split_item(":x").unwrap(), ("", "x"));
    }

    #[test]
    fn test_split_item_errors() {
        assert!(matches!(
            split_item("no-separator"),
            Err(FlashError::Format(_))
        ));
        assert!(matches!(split_item("update:"), Err(FlashError::Format(_))));
    }

    #[test]
    fn test_resolve_strips_root() {
        let root = Path::new("/work/items");
        assert_eq!(
            resolve_path(root, "/boot/boot.img").unwrap(),
            PathBuf::from("/work/items/boot/boot.img")
        );
        assert_eq!(
            resolve_item_path(root, "flash:./vendor/a.img").unwrap(),
            PathBuf::from("/work/items/vendor/a.img")
        );
    }

    #[test]
    fn test_resolve_rejects_parent_dir() {
        let root = Path::new("/work/items");
        assert!(resolve_path(root, "../etc/passwd").is_err());
        assert!(resolve_item_path(root, "update:boot/../../x").is_err());
        assert!(resolve_path(root, "/").is_err());
    }
}
