//! Console rendering of structured results.
//!
//! Lines are prefixed `[ + ]` (pass), `[ - ]` (fail/skip) or `[ * ]` (info).
//! Nothing here prints; the binaries decide where the text goes.

use super::checksums::{CrcCheck, CrcReport};
use super::codec::Firmware;
use super::constants::TOTAL_SIZE_BIAS;
use super::staging::{SignLine, SignList};
use super::verifier::VerifyReport;
use std::fmt;
use std::path::Path;

/// Prefix of a passing or included line
pub const PASS: &str = "[ + ]";
/// Prefix of a failing or skipped line
pub const FAIL: &str = "[ - ]";
/// Prefix of an informational line
pub const INFO: &str = "[ * ]";

/// `PASS` or `FAIL`
pub fn status(ok: bool) -> &'static str {
    if ok { PASS } else { FAIL }
}

/// Header summary of a container
pub fn header_lines(fw: &Firmware) -> Vec<String> {
    let header = &fw.header;
    vec![
        format!(
            "{INFO} File size:    \"{}\" (stored {:#x})",
            header.total_size,
            header.total_size.wrapping_sub(TOTAL_SIZE_BIAS)
        ),
        format!("{INFO} File CRC32:   \"{:#x}\"", header.total_crc32),
        format!("{INFO} Head size:    \"{}\"", header.table_size),
        format!("{INFO} Head CRC32:   \"{:#x}\"", header.table_crc32),
        format!("{INFO} Item counts:  \"{}\"", header.item_count),
        format!("{INFO} Item size:    \"{}\"", header.item_record_size),
        format!("{INFO} Product list: \"{}\"", fw.product_list_text()),
    ]
}

fn crc_line(label: &str, check: &CrcCheck, value: String) -> String {
    format!("{} Verify CRC32 {label}: {value}", status(check.is_match()))
}

/// Pass/fail lines of a checksum re-verification
pub fn crc_lines(report: &CrcReport) -> Vec<String> {
    let mut lines = Vec::with_capacity(report.items.len() + 3);
    if report.legacy_header {
        lines.push(format!("{INFO} Repack CRC32 ..."));
    }
    lines.push(crc_line("Full", &report.full, format!("{:#x}", report.full.stored)));
    lines.push(crc_line("Head", &report.header, format!("{:#x}", report.header.stored)));
    for item in &report.items {
        lines.push(crc_line("Item", item, item.name.clone()));
    }
    lines
}

/// Which items a sign run picked up and which it skipped, in list order
pub fn sign_list_lines(list: &SignList) -> Vec<String> {
    list.lines
        .iter()
        .map(|line| match line {
            SignLine::Include(item) => format!("{PASS} Verify Item Add: {item}"),
            SignLine::Skip(item) => format!("{FAIL} Verify Item Skip: {item}"),
        })
        .collect()
}

/// Per-item digest lines followed by the signature line
pub fn verify_lines(report: &VerifyReport, key_path: &Path) -> Vec<String> {
    let mut lines: Vec<String> = report
        .items
        .iter()
        .map(|check| {
            format!(
                "{} Verify sha256: {}",
                status(check.is_match()),
                check.file.display()
            )
        })
        .collect();
    lines.push(format!(
        "{} Verify Signature with public key: {}",
        status(report.signature_valid),
        key_path.display()
    ));
    lines
}

/// Bordered item table; verbose adds iter, CRC, offset, size and policy
#[derive(Debug)]
pub struct ItemTable<'a> {
    fw: &'a Firmware,
    verbose: bool,
}

impl<'a> ItemTable<'a> {
    /// Table over the entries of `fw`
    pub fn new(fw: &'a Firmware, verbose: bool) -> Self {
        ItemTable { fw, verbose }
    }

    fn rows(&self) -> (Vec<&'static str>, Vec<Vec<String>>) {
        let headers = if self.verbose {
            vec![
                "Iter",
                "Item CRC32",
                "Data offset",
                "Data size",
                "Item",
                "Section",
                "Version",
                "Policy",
            ]
        } else {
            vec!["Item", "Section", "Version"]
        };

        let rows = self
            .fw
            .entries
            .iter()
            .map(|entry| {
                let record = &entry.record;
                let named = [
                    record.item.as_str().into_owned(),
                    record.section.as_str().into_owned(),
                    record.version_text().into_owned(),
                ];
                if self.verbose {
                    let [item, section, version] = named;
                    vec![
                        record.iter.to_string(),
                        format!("{:#x}", record.item_crc32),
                        format!("{:#x}", record.data_offset),
                        record.data_size.to_string(),
                        item,
                        section,
                        version,
                        record.policy.to_string(),
                    ]
                } else {
                    named.to_vec()
                }
            })
            .collect();

        (headers, rows)
    }
}

impl fmt::Display for ItemTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (headers, rows) = self.rows();

        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(col, name)| {
                rows.iter()
                    .map(|row| row[col].chars().count())
                    .fold(name.len(), usize::max)
            })
            .collect();

        // '|' plus " value |" per column
        let border = "-".repeat(1 + widths.iter().map(|w| w + 3).sum::<usize>());

        let write_row = |f: &mut fmt::Formatter<'_>, cells: &[&str]| -> fmt::Result {
            write!(f, "|")?;
            for (cell, &width) in cells.iter().zip(&widths) {
                write!(f, " {cell:<width$} |")?;
            }
            writeln!(f)
        };

        writeln!(f, "{border}")?;
        write_row(f, &headers)?;
        writeln!(f, "{border}")?;
        for row in &rows {
            let cells: Vec<&str> = row.iter().map(String::as_str).collect();
            write_row(f, &cells)?;
        }
        writeln!(f, "{border}")
    }
}
