//! Flashpack - vendor flash container tooling
//!
//! Packs staged item files into a single flash container, unpacks containers
//! back into staged files, and signs/verifies a SHA-256 manifest of selected
//! items with RSA.

#![deny(
    unsafe_code,
    missing_debug_implementations,
    unreachable_pub,
    future_incompatible,
    rust_2018_idioms,
    warnings
)]
#![warn(
    missing_docs,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::wildcard_imports,
    clippy::explicit_iter_loop
)]

pub mod api;
pub mod exceptions;
pub mod exit_codes;
pub mod firmware;
pub mod logger;
pub mod utils;
pub mod version;

// Re-export main API functions
pub use api::{
    PackOptions, SignOptions, SignResult, UnpackOptions, UnpackResult, VerifyOptions,
    pack_firmware, sign_items, unpack_firmware, verify_items,
};
pub use exceptions::FlashError;

// Re-export format types for advanced usage
pub use firmware::{CrcReport, Firmware, ItemRecord, Manifest, StagingList, VerifyReport};
