//! Signed manifest text: `<count>\n` then `<sha256_hex> <relative_path>\n`
//! per item, in the order the items were listed.

use super::paths::item_relative_path;
use crate::exceptions::{FlashError, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Lowercase hex SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// One `<sha256_hex> <relative_path>` line
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    /// Lowercase hex SHA-256 of the item file
    pub sha256: String,
    /// Item path with its `partition:` prefix stripped
    pub path: String,
}

/// Ordered manifest entries
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    /// Entries in signing order
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Add an item by identifier and payload
    pub fn push_item(&mut self, item: &str, payload: &[u8]) -> Result<()> {
        let path = item_relative_path(item)?;
        self.entries.push(ManifestEntry {
            sha256: sha256_hex(payload),
            path: path.to_string(),
        });
        Ok(())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The exact bytes that get signed
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.entries.len());
        for entry in &self.entries {
            let _ = writeln!(out, "{} {}", entry.sha256, entry.path);
        }
        out
    }

    /// Parse manifest text. Tokens are whitespace separated; anything after
    /// the announced number of entries is ignored.
    pub fn parse(text: &[u8]) -> Result<Self> {
        let text = String::from_utf8_lossy(text);
        let mut tokens = text.split_whitespace();

        let count_token = tokens
            .next()
            .ok_or_else(|| FlashError::format("Manifest is empty"))?;
        let count = count_token
            .parse::<usize>()
            .map_err(|e| FlashError::format(format!("Invalid item count '{count_token}': {e}")))?;
        if count == 0 {
            return Err(FlashError::format("Count of items is 0 in manifest"));
        }

        let mut entries = Vec::with_capacity(count.min(4096));
        for index in 0..count {
            let (Some(sha256), Some(path)) = (tokens.next(), tokens.next()) else {
                return Err(FlashError::format(format!(
                    "Manifest announces {count} items but entry {index} is missing"
                )));
            };
            entries.push(ManifestEntry {
                sha256: sha256.to_string(),
                path: path.to_string(),
            });
        }

        Ok(Manifest { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_text_format() {
        let mut manifest = Manifest::default();
        manifest.push_item("update:boot/boot.img", b"abc").unwrap();
        manifest.push_item("update:/vendor/v.img", b"").unwrap();

        assert_eq!(
            manifest.to_text(),
            "2\n\
             ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad boot/boot.img\n\
             e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855 /vendor/v.img\n"
        );
        assert_eq!(Manifest::parse(manifest.to_text().as_bytes()).unwrap(), manifest);
    }

    #[test]
    fn test_parse_errors() {
        assert!(Manifest::parse(b"").is_err());
        assert!(Manifest::parse(b"0\n").is_err());
        assert!(Manifest::parse(b"two\n").is_err());
        assert!(Manifest::parse(b"2\nabc boot.img\n").is_err());
    }

    #[test]
    fn test_push_item_requires_separator() {
        let mut manifest = Manifest::default();
        assert!(manifest.push_item("boot.img", b"x").is_err());
    }
}
