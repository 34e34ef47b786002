//! Flash container codec - header, product list, item table, payloads

use super::checksums;
use super::constants::{
    HEADER_SIZE, HEX_MAGIC_PREFIX, ITEM_RECORD_SIZE, LEGACY_HEADER_DELTA,
};
use super::header::ContainerHeader;
use super::item::ItemRecord;
use super::staging::StagingList;
use crate::exceptions::{FlashError, Result};
use log::{debug, trace};

/// An item record paired with its payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Table entry describing the payload
    pub record: ItemRecord,
    /// Payload bytes
    pub payload: Vec<u8>,
}

/// In-memory flash container
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Firmware {
    /// Header; sizes and checksums are filled by [`Firmware::finalize`]
    pub header: ContainerHeader,
    /// Raw product list bytes
    pub product_list: Vec<u8>,
    /// Items in table order
    pub entries: Vec<Entry>,
}

/// What a byte buffer turned out to contain
#[derive(Debug)]
pub enum Decoded {
    /// Binary container
    Binary(Firmware),
    /// Text-metadata staging list
    Staging(StagingList),
}

/// True when `data` starts like a text-metadata staging list with a hex magic
pub fn is_staging_text(data: &[u8]) -> bool {
    data.starts_with(HEX_MAGIC_PREFIX)
}

/// Decode either form: staging list text (hex magic) or binary container
pub fn decode_any(data: &[u8]) -> Result<Decoded> {
    if is_staging_text(data) {
        debug!("Input starts with \"0x\", parsing as staging list");
        return Ok(Decoded::Staging(StagingList::parse(data)?));
    }
    Ok(Decoded::Binary(Firmware::from_bytes(data)?))
}

fn read_at<'a>(data: &'a [u8], offset: usize, len: usize, what: &str) -> Result<&'a [u8]> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| FlashError::format(format!("{what} offset overflows: {offset:#x}")))?;
    data.get(offset..end).ok_or_else(|| {
        FlashError::format(format!(
            "{what} corrupted: need {len} bytes at {offset:#x}, image is {} bytes",
            data.len()
        ))
    })
}

impl Firmware {
    /// Create an empty container
    pub fn new(magic: u32, product_list: Vec<u8>) -> Self {
        Firmware {
            header: ContainerHeader::new(magic),
            product_list,
            entries: Vec::new(),
        }
    }

    /// Build a container from a staging list, loading each payload with `load`
    pub fn from_staging<F>(list: &StagingList, mut load: F) -> Result<Self>
    where
        F: FnMut(&ItemRecord) -> Result<Vec<u8>>,
    {
        let mut fw = Firmware::new(list.magic, list.product_list.clone());
        for record in &list.records {
            let payload = load(record)?;
            trace!("Loaded {} ({} bytes)", record.item, payload.len());
            fw.push(record.clone(), payload);
        }
        Ok(fw)
    }

    /// Append an item
    pub fn push(&mut self, record: ItemRecord, payload: Vec<u8>) {
        self.entries.push(Entry { record, payload });
    }

    /// Assign counts, sizes and sequential data offsets. The real image size
    /// ends up in `header.total_size`. Fails when a size does not fit its
    /// on-disk field.
    pub fn layout(&mut self) -> Result<()> {
        let product_list_size = u16::try_from(self.product_list.len()).map_err(|_| {
            FlashError::format(format!(
                "Product list is {} bytes, max {}",
                self.product_list.len(),
                u16::MAX
            ))
        })?;
        let item_count = u32::try_from(self.entries.len())
            .map_err(|_| FlashError::format(format!("Too many items: {}", self.entries.len())))?;

        let table_size = self
            .entries
            .len()
            .checked_mul(ITEM_RECORD_SIZE)
            .and_then(|n| n.checked_add(HEADER_SIZE + usize::from(product_list_size)))
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| FlashError::format("Item table does not fit a 32-bit size"))?;

        let mut offset = table_size;
        for entry in &mut self.entries {
            let data_size = u32::try_from(entry.payload.len()).map_err(|_| {
                FlashError::format(format!(
                    "Payload of {} is {} bytes, max {}",
                    entry.record.item,
                    entry.payload.len(),
                    u32::MAX
                ))
            })?;
            entry.record.data_offset = offset;
            entry.record.data_size = data_size;
            offset = offset.checked_add(data_size).ok_or_else(|| {
                FlashError::format(format!(
                    "Container exceeds a 32-bit size at {}",
                    entry.record.item
                ))
            })?;
        }

        self.header.reserved_a = 0;
        self.header.reserved_b = 0;
        self.header.product_list_size = product_list_size;
        self.header.item_record_size = ITEM_RECORD_SIZE as u32;
        self.header.item_count = item_count;
        self.header.table_size = table_size;
        self.header.total_size = offset;

        debug!(
            "Layout: {} items, table_size={} total_size={}",
            self.header.item_count, self.header.table_size, self.header.total_size
        );
        Ok(())
    }

    /// Layout plus checksums
    pub fn finalize(&mut self) -> Result<()> {
        self.layout()?;
        checksums::calculate(self);
        Ok(())
    }

    /// Write header, product list, item table and payloads as they are
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload_len: usize = self.entries.iter().map(|e| e.payload.len()).sum();
        let mut out = Vec::with_capacity(
            HEADER_SIZE
                + self.product_list.len()
                + self.entries.len() * ITEM_RECORD_SIZE
                + payload_len,
        );

        out.extend_from_slice(&self.header.pack());
        out.extend_from_slice(&self.product_list);
        for entry in &self.entries {
            out.extend_from_slice(&entry.record.pack());
        }
        for entry in &self.entries {
            out.extend_from_slice(&entry.payload);
        }
        out
    }

    /// Finalize and write the container
    pub fn serialize(&mut self) -> Result<Vec<u8>> {
        self.finalize()?;
        Ok(self.to_bytes())
    }

    /// Decode a binary container
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let header = ContainerHeader::unpack(data)?;
        trace!("Header: {:?}", header);

        if header.item_record_size as usize != ITEM_RECORD_SIZE {
            return Err(FlashError::format(format!(
                "Item record size {} does not match {}",
                header.item_record_size, ITEM_RECORD_SIZE
            )));
        }

        let product_list = read_at(
            data,
            HEADER_SIZE,
            usize::from(header.product_list_size),
            "Product list",
        )?
        .to_vec();

        let table_start = HEADER_SIZE + product_list.len();
        let table_len = (header.item_count as usize)
            .checked_mul(ITEM_RECORD_SIZE)
            .ok_or_else(|| FlashError::format("Item count overflows"))?;
        let table_limit = u64::from(header.table_size) + u64::from(LEGACY_HEADER_DELTA);
        if (table_start + table_len) as u64 > table_limit {
            return Err(FlashError::format(format!(
                "{} item records end at {} past table size {}",
                header.item_count,
                table_start + table_len,
                header.table_size
            )));
        }

        let table = read_at(data, table_start, table_len, "Items")?;
        let mut entries = Vec::with_capacity(header.item_count as usize);
        for chunk in table.chunks_exact(ITEM_RECORD_SIZE) {
            let record = ItemRecord::unpack(chunk)?;
            let payload = read_at(
                data,
                record.data_offset as usize,
                record.data_size as usize,
                &format!("Raw data of {}", record.item),
            )?
            .to_vec();
            trace!(
                "Item {} at {:#x}, {} bytes",
                record.item, record.data_offset, record.data_size
            );
            entries.push(Entry { record, payload });
        }

        debug!(
            "Decoded container: magic={:#010x} items={} product_list={:?}",
            header.magic,
            entries.len(),
            String::from_utf8_lossy(&product_list)
        );

        Ok(Firmware {
            header,
            product_list,
            entries,
        })
    }

    /// Product list text up to the first NUL
    pub fn product_list_text(&self) -> String {
        let end = self
            .product_list
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.product_list.len());
        String::from_utf8_lossy(&self.product_list[..end]).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_items() -> Firmware {
        let mut fw = Firmware::new(0x5AA5_A55A, b"DEVICE-X".to_vec());
        fw.push(
            ItemRecord::new(0, "update:boot/boot.img", "boot", "NULL", 0).unwrap(),
            vec![1, 2, 3, 4],
        );
        fw.push(
            ItemRecord::new(1, "update:recovery/recovery.img", "recovery", "2.0", 1).unwrap(),
            vec![9; 8],
        );
        fw
    }

    #[test]
    fn test_layout_offsets() {
        let mut fw = two_items();
        let bytes = fw.serialize().unwrap();

        let first = HEADER_SIZE + 2 * ITEM_RECORD_SIZE + 8;
        assert_eq!(fw.header.item_count, 2);
        assert_eq!(fw.header.table_size as usize, first);
        assert_eq!(fw.entries[0].record.data_offset as usize, first);
        assert_eq!(fw.entries[1].record.data_offset as usize, first + 4);
        assert_eq!(fw.header.total_size as usize, first + 12);
        assert_eq!(bytes.len(), first + 12);
        assert_eq!(&bytes[first..first + 4], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_round_trip() {
        let mut fw = two_items();
        let bytes = fw.serialize().unwrap();
        let decoded = Firmware::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, fw);
        assert_eq!(decoded.to_bytes(), bytes);
    }

    #[test]
    fn test_round_trip_empty() {
        let mut fw = Firmware::new(1, Vec::new());
        let bytes = fw.serialize().unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(Firmware::from_bytes(&bytes).unwrap(), fw);
    }

    #[test]
    fn test_oversized_product_list_rejected() {
        let mut fw = Firmware::new(1, vec![b'P'; usize::from(u16::MAX) + 1]);
        fw.push(
            ItemRecord::new(0, "update:boot/boot.img", "boot", "NULL", 0).unwrap(),
            vec![1, 2, 3, 4],
        );

        let err = fw.serialize().unwrap_err();
        assert!(matches!(err, FlashError::Format(_)));
        assert!(err.to_string().contains("Product list is 65536 bytes"));
        // Header left untouched
        assert_eq!(fw.header.product_list_size, 0);
        assert_eq!(fw.header.item_count, 0);
    }

    #[test]
    fn test_largest_product_list_round_trips() {
        let mut fw = Firmware::new(1, vec![b'P'; usize::from(u16::MAX)]);
        fw.push(
            ItemRecord::new(0, "update:boot/boot.img", "boot", "NULL", 0).unwrap(),
            vec![1, 2, 3, 4],
        );

        let bytes = fw.serialize().unwrap();
        assert_eq!(fw.header.product_list_size, u16::MAX);
        let decoded = Firmware::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.entries[0].payload, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_reserved_bytes_zeroed() {
        let mut fw = two_items();
        fw.header.reserved_a = 0xAA;
        fw.header.reserved_b = 0xBB;
        let bytes = fw.serialize().unwrap();
        assert_eq!(bytes[0x18], 0);
        assert_eq!(bytes[0x19], 0);
    }

    #[test]
    fn test_truncated_payload() {
        let mut fw = two_items();
        let bytes = fw.serialize().unwrap();
        let err = Firmware::from_bytes(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, FlashError::Format(_)));
    }

    #[test]
    fn test_truncated_table() {
        let mut fw = two_items();
        let bytes = fw.serialize().unwrap();
        let err = Firmware::from_bytes(&bytes[..HEADER_SIZE + 8 + 100]).unwrap_err();
        assert!(matches!(err, FlashError::Format(_)));
    }

    #[test]
    fn test_item_count_past_table_size() {
        let mut fw = two_items();
        let mut bytes = fw.serialize().unwrap();
        // Claim five records in a table sized for two
        bytes[0x14..0x18].copy_from_slice(&5u32.to_le_bytes());
        let err = Firmware::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("past table size"));
    }

    #[test]
    fn test_wrong_record_size() {
        let mut fw = two_items();
        let mut bytes = fw.serialize().unwrap();
        bytes[0x1C..0x20].copy_from_slice(&300u32.to_le_bytes());
        assert!(Firmware::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_bad_data_offset() {
        let mut fw = two_items();
        let mut bytes = fw.serialize().unwrap();
        let rec = HEADER_SIZE + 8 + 8; // data_offset of the first record
        bytes[rec..rec + 4].copy_from_slice(&0xFFFF_0000u32.to_le_bytes());
        let err = Firmware::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("Raw data of update:boot/boot.img"));
    }

    #[test]
    fn test_decode_any_detects_staging_text() {
        let text = b"0x5aa5a55a\n8 DEVICE-X\n+ 0 update:boot/boot.img boot NULL 0\n";
        match decode_any(text).unwrap() {
            Decoded::Staging(list) => assert_eq!(list.records.len(), 1),
            Decoded::Binary(_) => panic!("expected staging list"),
        }

        let mut fw = two_items();
        let bytes = fw.serialize().unwrap();
        assert!(matches!(decode_any(&bytes).unwrap(), Decoded::Binary(_)));
    }
}
