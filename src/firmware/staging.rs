//! Text staging lists exchanged between unpack and pack/sign.
//!
//! `item_list.txt` (text-metadata form of a container):
//!
//! ```text
//! 0x5aa5a55a
//! 8 DEVICE-X
//! + 0 update:boot/boot.img boot NULL 0
//! - 1 update:recovery/recovery.img recovery 1.2 3
//! ```
//!
//! Older files carry the magic as 4 raw bytes instead of a hex literal.
//! Only `+` lines are packed. `sig_item_list.txt` holds `+ <item>` lines.

use super::codec::Firmware;
use super::constants::{HEX_MAGIC_PREFIX, MAX_PRODUCT_LIST_SIZE};
use super::defaults::{MARKER_INCLUDE, MIN_ITEM_LINE_LEN};
use super::item::ItemRecord;
use super::paths::item_relative_path;
use crate::exceptions::{FlashError, Result};
use log::{debug, trace, warn};
use serde::Serialize;
use std::fmt::Write as _;

/// Parsed `item_list.txt`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StagingList {
    /// Container magic
    pub magic: u32,
    /// Product list bytes, already clamped/padded to their stored size
    pub product_list: Vec<u8>,
    /// Included items, in file order
    pub records: Vec<ItemRecord>,
    /// Lines that were not marked for inclusion
    pub skipped: Vec<String>,
}

fn parse_magic(data: &[u8]) -> Result<(u32, &[u8])> {
    if data.starts_with(HEX_MAGIC_PREFIX) {
        let end = data
            .iter()
            .position(u8::is_ascii_whitespace)
            .unwrap_or(data.len());
        let digits = std::str::from_utf8(&data[HEX_MAGIC_PREFIX.len()..end])
            .map_err(|_| FlashError::format("Magic is not valid hex text"))?;
        let magic = u32::from_str_radix(digits, 16)
            .map_err(|e| FlashError::format(format!("Invalid hex magic '0x{digits}': {e}")))?;
        return Ok((magic, &data[end..]));
    }

    // Older lists start with the raw little-endian magic
    if data.len() < 4 {
        return Err(FlashError::format("Staging list too short for magic"));
    }
    let magic = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    Ok((magic, &data[4..]))
}

/// Apply the product list size rules: a token whose length disagrees with
/// the declared size is resized to the declared size clamped to 256 bytes.
fn clamp_product_list(declared: u16, token: &str) -> Vec<u8> {
    let mut product_list = token.as_bytes().to_vec();
    if product_list.len() != usize::from(declared) {
        let size = declared.min(MAX_PRODUCT_LIST_SIZE);
        if size != declared {
            warn!("Product list size {declared} clamped to {size}");
        }
        product_list.resize(usize::from(size), 0);
    }
    product_list
}

fn parse_item_line(fields: &str) -> Result<ItemRecord> {
    let parts: Vec<&str> = fields.split_whitespace().collect();
    let [iter, item, section, version, policy] = parts[..] else {
        return Err(FlashError::format(format!(
            "Expected '<iter> <item> <section> <version> <policy>', got: {fields}"
        )));
    };

    let iter = iter
        .parse::<u32>()
        .map_err(|e| FlashError::format(format!("Invalid iter '{iter}': {e}")))?;
    let policy = policy
        .parse::<u32>()
        .map_err(|e| FlashError::format(format!("Invalid policy '{policy}': {e}")))?;
    item_relative_path(item)?;

    ItemRecord::new(iter, item, section, version, policy)
}

impl StagingList {
    /// Parse the text-metadata form
    pub fn parse(data: &[u8]) -> Result<Self> {
        let (magic, rest) = parse_magic(data)?;
        let text = std::str::from_utf8(rest)
            .map_err(|e| FlashError::format(format!("Staging list is not UTF-8: {e}")))?;

        // "<product_list_size> <product_list>" on the next non-blank line
        let text = text.trim_start();
        let (size_line, body) = text.split_once('\n').unwrap_or((text, ""));
        let mut tokens = size_line.split_whitespace();

        let size_token = tokens
            .next()
            .ok_or_else(|| FlashError::format("Missing product list size"))?;
        let declared = size_token
            .parse::<u16>()
            .map_err(|e| FlashError::format(format!("Invalid product list size '{size_token}': {e}")))?;

        let token = tokens.next().unwrap_or("");
        let token = if declared > 0 {
            token
                .char_indices()
                .nth(usize::from(declared))
                .map_or(token, |(idx, _)| &token[..idx])
        } else {
            token
        };
        let product_list = clamp_product_list(declared, token);

        let mut records = Vec::new();
        let mut skipped = Vec::new();
        for line in body.lines() {
            if line.len() < MIN_ITEM_LINE_LEN {
                trace!("Ignoring short line: {line:?}");
                continue;
            }

            match line.strip_prefix(MARKER_INCLUDE) {
                Some(fields) => {
                    let record = parse_item_line(fields)?;
                    debug!("[ + ] Item Add: {}", record.item);
                    records.push(record);
                }
                None => {
                    debug!("[ - ] Item Skip: {line}");
                    skipped.push(line.to_string());
                }
            }
        }

        Ok(StagingList {
            magic,
            product_list,
            records,
            skipped,
        })
    }

    /// Staging list describing every entry of a container, all included
    pub fn from_firmware(fw: &Firmware) -> Self {
        StagingList {
            magic: fw.header.magic,
            product_list: fw.product_list.clone(),
            records: fw.entries.iter().map(|e| e.record.clone()).collect(),
            skipped: Vec::new(),
        }
    }

    /// Fail when nothing is marked for inclusion
    pub fn ensure_not_empty(&self) -> Result<()> {
        if self.records.is_empty() {
            return Err(FlashError::format("Count of items is 0 in item list"));
        }
        Ok(())
    }

    /// Render the text-metadata form (hex magic)
    pub fn render(&self) -> String {
        let end = self
            .product_list
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.product_list.len());

        let mut out = String::new();
        let _ = writeln!(out, "0x{:x}", self.magic);
        let _ = writeln!(
            out,
            "{} {}",
            self.product_list.len(),
            String::from_utf8_lossy(&self.product_list[..end])
        );
        for record in &self.records {
            let _ = writeln!(
                out,
                "{} {} {} {} {} {}",
                MARKER_INCLUDE,
                record.iter,
                record.item,
                record.section,
                record.version_text(),
                record.policy
            );
        }
        out
    }
}

/// One line of `sig_item_list.txt`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "item", rename_all = "lowercase")]
pub enum SignLine {
    /// `+ <item>`: hashed into the manifest
    Include(String),
    /// Any other line, marker stripped, kept for diagnostics
    Skip(String),
}

/// Parsed `sig_item_list.txt`: which items go into the signed manifest,
/// in file order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SignList {
    /// Included and skipped lines in the order they were listed
    pub lines: Vec<SignLine>,
}

impl SignList {
    /// Parse the signature input list; included items must be valid identifiers
    pub fn parse(text: &str) -> Result<Self> {
        let mut list = SignList::default();

        for line in text.lines() {
            if line.len() < MIN_ITEM_LINE_LEN {
                continue;
            }
            match line.strip_prefix(MARKER_INCLUDE) {
                Some(item) => {
                    let item = item.trim();
                    item_relative_path(item)?;
                    list.lines.push(SignLine::Include(item.to_string()));
                }
                None => {
                    // Drop the marker and its separator for display
                    let shown = line.get(2..).unwrap_or(line).trim();
                    list.lines.push(SignLine::Skip(shown.to_string()));
                }
            }
        }

        Ok(list)
    }

    /// Every item of a container, included
    pub fn from_firmware(fw: &Firmware) -> Self {
        SignList {
            lines: fw
                .entries
                .iter()
                .map(|e| SignLine::Include(e.record.item.as_str().into_owned()))
                .collect(),
        }
    }

    /// Included items, in list order
    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            SignLine::Include(item) => Some(item.as_str()),
            SignLine::Skip(_) => None,
        })
    }

    /// Skipped lines, in list order
    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            SignLine::Skip(item) => Some(item.as_str()),
            SignLine::Include(_) => None,
        })
    }

    /// Fail when nothing is marked for signing
    pub fn ensure_not_empty(&self) -> Result<()> {
        if self.items().next().is_none() {
            return Err(FlashError::format("Count of items is 0 in signature item list"));
        }
        Ok(())
    }

    /// Render the included items as `+ <item>` lines
    pub fn render(&self) -> String {
        self.items()
            .map(|item| format!("{MARKER_INCLUDE} {item}\n"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = "0x5aa5a55a\n\
                        8 DEVICE-X\n\
                        + 0 update:boot/boot.img boot NULL 0\n\
                        - 1 update:cust/cust.img cust NULL 0\n\
                        + 2 update:recovery/recovery.img recovery 1.2 3\n";

    #[test]
    fn test_parse_hex_magic() {
        let list = StagingList::parse(LIST.as_bytes()).unwrap();
        assert_eq!(list.magic, 0x5AA5_A55A);
        assert_eq!(list.product_list, b"DEVICE-X");
        assert_eq!(list.records.len(), 2);
        assert_eq!(list.records[1].iter, 2);
        assert_eq!(list.records[1].version.as_str(), "1.2");
        assert_eq!(list.records[1].policy, 3);
        assert!(list.records[0].version.is_empty());
        assert_eq!(list.skipped, vec!["- 1 update:cust/cust.img cust NULL 0"]);
    }

    #[test]
    fn test_parse_raw_magic() {
        let mut data = vec![0x5A, 0xA5, 0xA5, 0x5A, b'\n'];
        data.extend_from_slice(b"3 ABC\n+ 0 a:b c NULL 0\n");
        let list = StagingList::parse(&data).unwrap();
        assert_eq!(list.magic, 0x5AA5_A55A);
        assert_eq!(list.product_list, b"ABC");
        assert_eq!(list.records.len(), 1);
    }

    #[test]
    fn test_render_round_trip() {
        let list = StagingList::parse(LIST.as_bytes()).unwrap();
        let rendered = list.render();
        assert_eq!(
            rendered,
            "0x5aa5a55a\n8 DEVICE-X\n\
             + 0 update:boot/boot.img boot NULL 0\n\
             + 2 update:recovery/recovery.img recovery 1.2 3\n"
        );
        let again = StagingList::parse(rendered.as_bytes()).unwrap();
        assert_eq!(again.records, list.records);
    }

    #[test]
    fn test_product_list_clamped() {
        let token = "P".repeat(300);
        let text = format!("0x1\n500 {token}\n+ 0 a:b c NULL 0\n");
        let list = StagingList::parse(text.as_bytes()).unwrap();
        assert_eq!(list.product_list.len(), 256);
        assert!(list.product_list.iter().all(|&b| b == b'P'));
    }

    #[test]
    fn test_product_list_padded_to_declared() {
        let list = StagingList::parse(b"0x1\n10 DEVICE-X\n").unwrap();
        assert_eq!(list.product_list, b"DEVICE-X\0\0");
        // Padding survives a render/parse cycle
        let again = StagingList::parse(list.render().as_bytes()).unwrap();
        assert_eq!(again.product_list, list.product_list);
    }

    #[test]
    fn test_product_list_truncated_to_declared() {
        let list = StagingList::parse(b"0x1\n4 DEVICE-X\n").unwrap();
        assert_eq!(list.product_list, b"DEVI");
    }

    #[test]
    fn test_empty_product_list() {
        let list = StagingList::parse(b"0x1\n0 \n+ 0 a:b c NULL 0\n").unwrap();
        assert!(list.product_list.is_empty());
        assert_eq!(list.records.len(), 1);
    }

    #[test]
    fn test_short_lines_ignored() {
        let list = StagingList::parse(b"0x1\n1 X\n\n+\n--\n+ 0 a:b c NULL 0\n").unwrap();
        assert_eq!(list.records.len(), 1);
        assert!(list.skipped.is_empty());
    }

    #[test]
    fn test_malformed_item_line() {
        let err = StagingList::parse(b"0x1\n1 X\n+ 0 a:b c NULL\n").unwrap_err();
        assert!(matches!(err, FlashError::Format(_)));

        let err = StagingList::parse(b"0x1\n1 X\n+ 0 nocolon c NULL 0\n").unwrap_err();
        assert!(err.to_string().contains("Cannot find ':'"));
    }

    #[test]
    fn test_empty_include_set() {
        let list = StagingList::parse(b"0x1\n1 X\n- 0 a:b c NULL 0\n").unwrap();
        assert!(list.ensure_not_empty().is_err());
    }

    #[test]
    fn test_sign_list() {
        let list = SignList::parse(
            "- update:cust/cust.img\n+ update:boot/boot.img\n\n- update:misc/misc.img\n",
        )
        .unwrap();
        assert_eq!(
            list.lines,
            vec![
                SignLine::Skip("update:cust/cust.img".into()),
                SignLine::Include("update:boot/boot.img".into()),
                SignLine::Skip("update:misc/misc.img".into()),
            ]
        );
        assert_eq!(list.items().collect::<Vec<_>>(), vec!["update:boot/boot.img"]);
        assert_eq!(list.skipped().count(), 2);
        assert_eq!(list.render(), "+ update:boot/boot.img\n");
    }

    #[test]
    fn test_sign_list_rejects_bad_item() {
        assert!(SignList::parse("+ boot.img\n").is_err());
    }
}
