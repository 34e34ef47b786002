//! Flash container header - fixed 36-byte record at offset 0

use super::constants::{
    HEADER_SIZE, ITEM_RECORD_SIZE, OFF_ITEM_COUNT, OFF_ITEM_RECORD_SIZE, OFF_MAGIC,
    OFF_PRODUCT_LIST_SIZE, OFF_RESERVED, OFF_RESERVED_A, OFF_RESERVED_B, OFF_TABLE_CRC32,
    OFF_TABLE_SIZE, OFF_TOTAL_CRC32, OFF_TOTAL_SIZE, TOTAL_SIZE_BIAS,
};
use crate::exceptions::{FlashError, Result};
use serde::Serialize;

/// Container header. `total_size` holds the real image size; the biased,
/// byte-swapped form only exists on disk (see [`encode_total_size`]).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ContainerHeader {
    /// Vendor magic
    pub magic: u32,
    /// Real image size in bytes
    pub total_size: u32,
    /// CRC32 from `table_size` to the end of the image
    pub total_crc32: u32,
    /// Size of header, product list and item table
    pub table_size: u32,
    /// CRC32 from `item_count` to the end of the item table
    pub table_crc32: u32,
    /// Number of item records
    pub item_count: u32,
    /// Reserved, written as 0
    pub reserved_a: u8,
    /// Reserved, written as 0
    pub reserved_b: u8,
    /// Product list length in bytes
    pub product_list_size: u16,
    /// Item record size, always 360
    pub item_record_size: u32,
    /// Reserved, kept as read
    pub reserved: u32,
}

/// Encode the logical image size the way legacy flashing tools expect it:
/// minus [`TOTAL_SIZE_BIAS`], stored big-endian.
pub fn encode_total_size(total_size: u32) -> [u8; 4] {
    total_size.wrapping_sub(TOTAL_SIZE_BIAS).to_be_bytes()
}

/// Inverse of [`encode_total_size`].
pub fn decode_total_size(raw: [u8; 4]) -> u32 {
    u32::from_be_bytes(raw).wrapping_add(TOTAL_SIZE_BIAS)
}

fn le_u32(data: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

impl ContainerHeader {
    /// Create an empty header carrying the given magic
    pub fn new(magic: u32) -> Self {
        ContainerHeader {
            magic,
            item_record_size: ITEM_RECORD_SIZE as u32,
            ..Default::default()
        }
    }

    /// Unpack a header from the first [`HEADER_SIZE`] bytes of `data`
    pub fn unpack(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(FlashError::format(format!(
                "Header truncated: {} < {} bytes",
                data.len(),
                HEADER_SIZE
            )));
        }

        let mut total_size = [0u8; 4];
        total_size.copy_from_slice(&data[OFF_TOTAL_SIZE..OFF_TOTAL_SIZE + 4]);

        Ok(ContainerHeader {
            magic: le_u32(data, OFF_MAGIC),
            total_size: decode_total_size(total_size),
            total_crc32: le_u32(data, OFF_TOTAL_CRC32),
            table_size: le_u32(data, OFF_TABLE_SIZE),
            table_crc32: le_u32(data, OFF_TABLE_CRC32),
            item_count: le_u32(data, OFF_ITEM_COUNT),
            reserved_a: data[OFF_RESERVED_A],
            reserved_b: data[OFF_RESERVED_B],
            product_list_size: u16::from_le_bytes([
                data[OFF_PRODUCT_LIST_SIZE],
                data[OFF_PRODUCT_LIST_SIZE + 1],
            ]),
            item_record_size: le_u32(data, OFF_ITEM_RECORD_SIZE),
            reserved: le_u32(data, OFF_RESERVED),
        })
    }

    /// Pack header to bytes
    pub fn pack(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];

        bytes[OFF_MAGIC..OFF_MAGIC + 4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[OFF_TOTAL_SIZE..OFF_TOTAL_SIZE + 4]
            .copy_from_slice(&encode_total_size(self.total_size));
        bytes[OFF_TOTAL_CRC32..OFF_TOTAL_CRC32 + 4].copy_from_slice(&self.total_crc32.to_le_bytes());
        bytes[OFF_TABLE_SIZE..OFF_TABLE_SIZE + 4].copy_from_slice(&self.table_size.to_le_bytes());
        bytes[OFF_TABLE_CRC32..OFF_TABLE_CRC32 + 4].copy_from_slice(&self.table_crc32.to_le_bytes());
        bytes[OFF_ITEM_COUNT..OFF_ITEM_COUNT + 4].copy_from_slice(&self.item_count.to_le_bytes());
        bytes[OFF_RESERVED_A] = self.reserved_a;
        bytes[OFF_RESERVED_B] = self.reserved_b;
        bytes[OFF_PRODUCT_LIST_SIZE..OFF_PRODUCT_LIST_SIZE + 2]
            .copy_from_slice(&self.product_list_size.to_le_bytes());
        bytes[OFF_ITEM_RECORD_SIZE..OFF_ITEM_RECORD_SIZE + 4]
            .copy_from_slice(&self.item_record_size.to_le_bytes());
        bytes[OFF_RESERVED..OFF_RESERVED + 4].copy_from_slice(&self.reserved.to_le_bytes());

        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_size_is_biased_big_endian() {
        // 0x1000 - 0x4C = 0x0FB4
        assert_eq!(encode_total_size(0x1000), [0x00, 0x00, 0x0F, 0xB4]);
        assert_eq!(decode_total_size([0x00, 0x00, 0x0F, 0xB4]), 0x1000);
    }

    #[test]
    fn test_total_size_below_bias_wraps() {
        let raw = encode_total_size(0x10);
        assert_eq!(decode_total_size(raw), 0x10);
    }

    #[test]
    fn test_field_offsets() {
        let header = ContainerHeader {
            magic: 0xA55A_AA55,
            total_size: 0x200,
            total_crc32: 0x1111_1111,
            table_size: 0x2222_2222,
            table_crc32: 0x3333_3333,
            item_count: 2,
            reserved_a: 0,
            reserved_b: 0,
            product_list_size: 8,
            item_record_size: 360,
            reserved: 0,
        };
        let bytes = header.pack();

        assert_eq!(&bytes[0..4], &[0x55, 0xAA, 0x5A, 0xA5]);
        assert_eq!(&bytes[8..12], &[0x11; 4]);
        assert_eq!(&bytes[12..16], &[0x22; 4]);
        assert_eq!(&bytes[16..20], &[0x33; 4]);
        assert_eq!(&bytes[20..24], &2u32.to_le_bytes());
        assert_eq!(&bytes[26..28], &8u16.to_le_bytes());
        assert_eq!(&bytes[28..32], &360u32.to_le_bytes());

        assert_eq!(ContainerHeader::unpack(&bytes).unwrap(), header);
    }

    #[test]
    fn test_unpack_truncated() {
        let err = ContainerHeader::unpack(&[0u8; 20]).unwrap_err();
        assert!(matches!(err, FlashError::Format(_)));
    }
}
