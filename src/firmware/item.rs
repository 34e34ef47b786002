//! Item records - 360-byte table entries, one per packed partition image

use super::constants::{
    ITEM_FIELD_SIZE, ITEM_RECORD_SIZE, NULL_VERSION, REC_DATA_OFFSET, REC_DATA_SIZE, REC_ITEM,
    REC_ITEM_CRC32, REC_ITER, REC_POLICY, REC_RESERVED, REC_SECTION, REC_VERSION,
    SECTION_FIELD_SIZE, VERSION_FIELD_SIZE,
};
use crate::exceptions::{FlashError, Result};
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

/// Fixed-width text field. The raw bytes are kept as read so that
/// checksums over an existing table see exactly what was on disk.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FixedStr<const N: usize>([u8; N]);

impl<const N: usize> FixedStr<N> {
    /// Build a NUL-padded field; the text must leave room for the terminator
    pub fn new(text: &str) -> Result<Self> {
        let bytes = text.as_bytes();
        if bytes.len() >= N {
            return Err(FlashError::format(format!(
                "Field too long ({} bytes, max {}): {text}",
                bytes.len(),
                N - 1
            )));
        }
        let mut raw = [0u8; N];
        raw[..bytes.len()].copy_from_slice(bytes);
        Ok(FixedStr(raw))
    }

    /// Wrap bytes read from disk as they are
    pub fn from_raw(raw: [u8; N]) -> Self {
        FixedStr(raw)
    }

    /// Raw field bytes, padding included
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }

    /// Text up to the first NUL (or the whole buffer when it is full)
    pub fn as_str(&self) -> Cow<'_, str> {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(N);
        String::from_utf8_lossy(&self.0[..end])
    }

    /// True when the field starts with NUL
    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }
}

impl<const N: usize> Default for FixedStr<N> {
    fn default() -> Self {
        FixedStr([0u8; N])
    }
}

impl<const N: usize> fmt::Debug for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl<const N: usize> fmt::Display for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl<const N: usize> Serialize for FixedStr<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_str())
    }
}

/// One entry of the item table
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ItemRecord {
    /// Iteration index from the staging list
    pub iter: u32,
    /// CRC32 of the payload
    pub item_crc32: u32,
    /// Payload offset from the start of the image
    pub data_offset: u32,
    /// Payload size in bytes
    pub data_size: u32,
    /// Item identifier, `partition:relative_path`
    pub item: FixedStr<ITEM_FIELD_SIZE>,
    /// Section name
    pub section: FixedStr<SECTION_FIELD_SIZE>,
    /// Version text, empty for `NULL`
    pub version: FixedStr<VERSION_FIELD_SIZE>,
    /// Flashing policy
    pub policy: u32,
    /// Reserved, kept as read
    pub reserved: u32,
}

fn le_u32(data: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

fn field<const N: usize>(data: &[u8], offset: usize) -> FixedStr<N> {
    let mut raw = [0u8; N];
    raw.copy_from_slice(&data[offset..offset + N]);
    FixedStr::from_raw(raw)
}

impl ItemRecord {
    /// Create a record from its textual attributes. An empty version or the
    /// literal `NULL` both produce an empty version field.
    pub fn new(iter: u32, item: &str, section: &str, version: &str, policy: u32) -> Result<Self> {
        let version = if version == NULL_VERSION { "" } else { version };
        Ok(ItemRecord {
            iter,
            item: FixedStr::new(item)?,
            section: FixedStr::new(section)?,
            version: FixedStr::new(version)?,
            policy,
            ..Default::default()
        })
    }

    /// Version as written in staging lists (`NULL` when empty)
    pub fn version_text(&self) -> Cow<'_, str> {
        if self.version.is_empty() {
            Cow::Borrowed(NULL_VERSION)
        } else {
            self.version.as_str()
        }
    }

    /// Pack record to bytes
    pub fn pack(&self) -> [u8; ITEM_RECORD_SIZE] {
        let mut bytes = [0u8; ITEM_RECORD_SIZE];

        bytes[REC_ITER..REC_ITER + 4].copy_from_slice(&self.iter.to_le_bytes());
        bytes[REC_ITEM_CRC32..REC_ITEM_CRC32 + 4].copy_from_slice(&self.item_crc32.to_le_bytes());
        bytes[REC_DATA_OFFSET..REC_DATA_OFFSET + 4]
            .copy_from_slice(&self.data_offset.to_le_bytes());
        bytes[REC_DATA_SIZE..REC_DATA_SIZE + 4].copy_from_slice(&self.data_size.to_le_bytes());
        bytes[REC_ITEM..REC_SECTION].copy_from_slice(self.item.as_bytes());
        bytes[REC_SECTION..REC_VERSION].copy_from_slice(self.section.as_bytes());
        bytes[REC_VERSION..REC_POLICY].copy_from_slice(self.version.as_bytes());
        bytes[REC_POLICY..REC_POLICY + 4].copy_from_slice(&self.policy.to_le_bytes());
        bytes[REC_RESERVED..REC_RESERVED + 4].copy_from_slice(&self.reserved.to_le_bytes());

        bytes
    }

    /// Unpack record from exactly [`ITEM_RECORD_SIZE`] bytes
    pub fn unpack(data: &[u8]) -> Result<Self> {
        if data.len() != ITEM_RECORD_SIZE {
            return Err(FlashError::format(format!(
                "Invalid item record size: {} != {}",
                data.len(),
                ITEM_RECORD_SIZE
            )));
        }

        Ok(ItemRecord {
            iter: le_u32(data, REC_ITER),
            item_crc32: le_u32(data, REC_ITEM_CRC32),
            data_offset: le_u32(data, REC_DATA_OFFSET),
            data_size: le_u32(data, REC_DATA_SIZE),
            item: field(data, REC_ITEM),
            section: field(data, REC_SECTION),
            version: field(data, REC_VERSION),
            policy: le_u32(data, REC_POLICY),
            reserved: le_u32(data, REC_RESERVED),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_version_is_empty() {
        let record = ItemRecord::new(0, "update:boot/boot.img", "boot", "NULL", 0).unwrap();
        assert!(record.version.is_empty());
        assert_eq!(record.version_text(), "NULL");
    }

    #[test]
    fn test_field_too_long() {
        let long = "x".repeat(16);
        let err = ItemRecord::new(0, "a:b", &long, "", 0).unwrap_err();
        assert!(matches!(err, FlashError::Format(_)));

        // 15 characters plus the terminator still fit
        assert!(ItemRecord::new(0, "a:b", &long[..15], "", 0).is_ok());
    }

    #[test]
    fn test_pack_layout() {
        let mut record = ItemRecord::new(3, "update:boot/boot.img", "boot", "1.0", 7).unwrap();
        record.item_crc32 = 0xDEAD_BEEF;
        record.data_offset = 0x100;
        record.data_size = 4;

        let bytes = record.pack();
        assert_eq!(&bytes[0..4], &3u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &0xDEAD_BEEFu32.to_le_bytes());
        assert_eq!(&bytes[16..36], b"update:boot/boot.img");
        assert_eq!(bytes[36], 0);
        assert_eq!(&bytes[272..276], b"boot");
        assert_eq!(&bytes[288..291], b"1.0");
        assert_eq!(&bytes[352..356], &7u32.to_le_bytes());

        assert_eq!(ItemRecord::unpack(&bytes).unwrap(), record);
    }

    #[test]
    fn test_raw_bytes_after_nul_survive() {
        let mut raw = [0u8; ITEM_RECORD_SIZE];
        raw[REC_SECTION..REC_SECTION + 4].copy_from_slice(b"sys\0");
        raw[REC_SECTION + 8] = 0x7F;

        let record = ItemRecord::unpack(&raw).unwrap();
        assert_eq!(record.section.as_str(), "sys");
        assert_eq!(record.pack(), raw);
    }
}
