//! Layered CRC32 scheme of the flash container.
//!
//! Three levels are computed: per item payload, the header checksum
//! (`table_crc32`) and the full checksum (`total_crc32`). Ranges are composed
//! with the zlib `crc32_combine` operation so no buffers are concatenated:
//!
//! - `table_crc32` = header[0x14..] ‖ product list ‖ item table
//! - `total_crc32` = header[0x0C..] ‖ product list ‖ item table ‖ payloads

use super::codec::Firmware;
use super::constants::{
    FULL_CRC_OFFSET, HEADER_CRC_OFFSET, HEADER_SIZE, ITEM_RECORD_SIZE, LEGACY_HEADER_DELTA,
};
use crate::exceptions::Result;
use crc32fast::Hasher;
use log::{debug, trace, warn};
use serde::Serialize;

/// CRC32 (zlib polynomial) of a byte slice
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// CRC32 of `A ‖ B` from `crc(A)`, `crc(B)` and `len(B)`
pub fn crc32_combine(crc_a: u32, crc_b: u32, len_b: u64) -> u32 {
    let mut first = Hasher::new_with_initial(crc_a);
    let second = Hasher::new_with_initial_len(crc_b, len_b);
    first.combine(&second);
    first.finalize()
}

/// Running CRC over a sequence of adjacent byte ranges
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CrcRun {
    crc: u32,
    len: u64,
}

impl CrcRun {
    /// Empty run (CRC 0, length 0)
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a range given only its CRC and length
    pub fn push_crc(&mut self, crc: u32, len: u64) {
        self.crc = crc32_combine(self.crc, crc, len);
        self.len += len;
    }

    /// Append a range of bytes
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.push_crc(crc32(data), data.len() as u64);
    }

    /// Append another run
    pub fn push_run(&mut self, other: &CrcRun) {
        self.push_crc(other.crc, other.len);
    }

    /// CRC32 of everything pushed so far
    pub fn crc(&self) -> u32 {
        self.crc
    }

    /// Number of bytes covered
    pub fn len(&self) -> u64 {
        self.len
    }

    /// True when nothing was pushed
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Fill `item_crc32` of every record, then `table_crc32` and `total_crc32`.
/// Record layout (`data_offset`, `data_size`, `table_size`) must already be set.
pub fn calculate(fw: &mut Firmware) {
    let mut product_list = CrcRun::new();
    product_list.push_bytes(&fw.product_list);

    let mut table = CrcRun::new();
    let mut payloads = CrcRun::new();

    for entry in &mut fw.entries {
        entry.record.item_crc32 = crc32(&entry.payload);

        // Record bytes include the freshly set item_crc32
        table.push_crc(crc32(&entry.record.pack()), ITEM_RECORD_SIZE as u64);
        payloads.push_crc(entry.record.item_crc32, u64::from(entry.record.data_size));
        trace!(
            "Item {} crc32={:#010x} size={}",
            entry.record.item,
            entry.record.item_crc32,
            entry.record.data_size
        );
    }

    // table_crc32 does not cover itself: hash from item_count onwards
    let header = fw.header.pack();
    let mut head = CrcRun::new();
    head.push_bytes(&header[HEADER_CRC_OFFSET..HEADER_SIZE]);
    head.push_run(&product_list);
    head.push_run(&table);
    fw.header.table_crc32 = head.crc();

    // total_crc32 covers table_size and the table_crc32 just stored
    let header = fw.header.pack();
    let mut full = CrcRun::new();
    full.push_bytes(&header[FULL_CRC_OFFSET..HEADER_SIZE]);
    full.push_run(&product_list);
    full.push_run(&table);
    full.push_run(&payloads);
    fw.header.total_crc32 = full.crc();

    debug!(
        "CRC32 calculated: table={:#010x} total={:#010x} payload_bytes={}",
        fw.header.table_crc32,
        fw.header.total_crc32,
        payloads.len()
    );
}

/// Outcome of comparing one stored checksum against a recomputed one
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CrcCheck {
    /// `Full`, `Head` or the item identifier
    pub name: String,
    /// Value found in the image
    pub stored: u32,
    /// Value recomputed from the image contents
    pub computed: u32,
}

impl CrcCheck {
    fn new(name: impl Into<String>, stored: u32, computed: u32) -> Self {
        CrcCheck {
            name: name.into(),
            stored,
            computed,
        }
    }

    /// Stored and recomputed values agree
    pub fn is_match(&self) -> bool {
        self.stored == self.computed
    }
}

/// Result of re-verifying every checksum of a decoded image
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CrcReport {
    /// `total_crc32`
    pub full: CrcCheck,
    /// `table_crc32`
    pub header: CrcCheck,
    /// `item_crc32` of each record, in table order
    pub items: Vec<CrcCheck>,
    /// The legacy 36-byte `table_size` correction was applied
    pub legacy_header: bool,
}

impl CrcReport {
    /// Every checksum matches
    pub fn is_valid(&self) -> bool {
        self.full.is_match() && self.header.is_match() && self.items.iter().all(CrcCheck::is_match)
    }

    /// Number of checksums that do not match
    pub fn mismatches(&self) -> usize {
        std::iter::once(&self.full)
            .chain(std::iter::once(&self.header))
            .chain(self.items.iter())
            .filter(|check| !check.is_match())
            .count()
    }
}

/// Recompute layout and checksums of a copy of `fw` and compare them with
/// the stored values.
///
/// When the full checksum disagrees, `table_size` is reduced once by
/// [`LEGACY_HEADER_DELTA`] and the checksums are recomputed, matching
/// images written by the older, shorter header revision.
pub fn verify(fw: &Firmware) -> Result<CrcReport> {
    let mut fresh = fw.clone();
    fresh.layout()?;
    calculate(&mut fresh);

    let mut legacy_header = false;
    if fresh.header.total_crc32 != fw.header.total_crc32 {
        warn!("Full CRC32 mismatch, retrying with legacy header size");
        fresh.header.table_size = fresh.header.table_size.wrapping_sub(LEGACY_HEADER_DELTA);
        calculate(&mut fresh);
        legacy_header = true;
    }

    let items = fw
        .entries
        .iter()
        .zip(&fresh.entries)
        .map(|(old, new)| {
            CrcCheck::new(
                old.record.item.as_str(),
                old.record.item_crc32,
                new.record.item_crc32,
            )
        })
        .collect();

    let report = CrcReport {
        full: CrcCheck::new("Full", fw.header.total_crc32, fresh.header.total_crc32),
        header: CrcCheck::new("Head", fw.header.table_crc32, fresh.header.table_crc32),
        items,
        legacy_header,
    };
    debug!(
        "CRC32 verification: {} mismatches (legacy header: {})",
        report.mismatches(),
        legacy_header
    );
    Ok(report)
}
