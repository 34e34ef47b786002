//! Fixed layout constants of the flash container. These are part of the
//! on-disk format and never change.

/// Size of the container header
pub const HEADER_SIZE: usize = 36;
/// Size of one item record in the item table
pub const ITEM_RECORD_SIZE: usize = 360;

/// Width of the item identifier field, terminating NUL included
pub const ITEM_FIELD_SIZE: usize = 256;
/// Width of the section field, terminating NUL included
pub const SECTION_FIELD_SIZE: usize = 16;
/// Width of the version field, terminating NUL included
pub const VERSION_FIELD_SIZE: usize = 64;

// Header field offsets

/// Header: magic
pub const OFF_MAGIC: usize = 0x00;
/// Header: biased big-endian total size
pub const OFF_TOTAL_SIZE: usize = 0x04;
/// Header: full checksum
pub const OFF_TOTAL_CRC32: usize = 0x08;
/// Header: size of header, product list and item table
pub const OFF_TABLE_SIZE: usize = 0x0C;
/// Header: header checksum
pub const OFF_TABLE_CRC32: usize = 0x10;
/// Header: number of item records
pub const OFF_ITEM_COUNT: usize = 0x14;
/// Header: first reserved byte
pub const OFF_RESERVED_A: usize = 0x18;
/// Header: second reserved byte
pub const OFF_RESERVED_B: usize = 0x19;
/// Header: product list length (u16)
pub const OFF_PRODUCT_LIST_SIZE: usize = 0x1A;
/// Header: item record size
pub const OFF_ITEM_RECORD_SIZE: usize = 0x1C;
/// Header: trailing reserved word
pub const OFF_RESERVED: usize = 0x20;

// ItemRecord field offsets

/// Record: iteration index
pub const REC_ITER: usize = 0;
/// Record: payload checksum
pub const REC_ITEM_CRC32: usize = 4;
/// Record: payload offset in the image
pub const REC_DATA_OFFSET: usize = 8;
/// Record: payload size
pub const REC_DATA_SIZE: usize = 12;
/// Record: item identifier
pub const REC_ITEM: usize = 16;
/// Record: section name (272)
pub const REC_SECTION: usize = REC_ITEM + ITEM_FIELD_SIZE;
/// Record: version text (288)
pub const REC_VERSION: usize = REC_SECTION + SECTION_FIELD_SIZE;
/// Record: policy (352)
pub const REC_POLICY: usize = REC_VERSION + VERSION_FIELD_SIZE;
/// Record: trailing reserved word (356)
pub const REC_RESERVED: usize = REC_POLICY + 4;

/// `table_crc32` hashes the header from `item_count` onwards
pub const HEADER_CRC_OFFSET: usize = 0x14;
/// `total_crc32` hashes the header from `table_size` onwards
pub const FULL_CRC_OFFSET: usize = 0x0C;

/// Stored total_size is the real size minus this bias, big-endian
pub const TOTAL_SIZE_BIAS: u32 = 0x4C;

/// Older images carry a table_size this many bytes short
pub const LEGACY_HEADER_DELTA: u32 = 36;

/// Upper bound of the product list read from a staging list
pub const MAX_PRODUCT_LIST_SIZE: u16 = 256;

/// RSA-2048 PKCS#1 v1.5 signature appended to the manifest
pub const SIGNATURE_SIZE: usize = 256;

/// Version text standing in for an empty version field
pub const NULL_VERSION: &str = "NULL";

/// Leading bytes of a hex magic in the text-metadata form
pub const HEX_MAGIC_PREFIX: &[u8] = b"0x";
