//! Vendor flash container format
//!
//! A container is a 36-byte header, a product list, a table of 360-byte item
//! records and the item payloads, in that order. Items are also staged on
//! disk as plain files described by `item_list.txt`, and a subset of them can
//! be covered by an RSA-signed SHA-256 manifest.

pub mod checksums;
pub mod codec;
pub mod constants;
pub mod crypto;
pub mod defaults;
pub mod header;
pub mod item;
pub mod keys;
pub mod manifest;
pub mod paths;
pub mod report;
pub mod staging;
pub mod verifier;

pub use checksums::{CrcCheck, CrcReport};
pub use codec::{Decoded, Entry, Firmware, decode_any};
pub use header::ContainerHeader;
pub use item::{FixedStr, ItemRecord};
pub use manifest::{Manifest, ManifestEntry};
pub use staging::{SignLine, SignList, StagingList};
pub use verifier::{DigestCheck, VerifyReport};
