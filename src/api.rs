//! High-level API for flashpack operations
//!
//! Each operation works on an items directory: the staged item files laid
//! out by relative path, plus `item_list.txt` and `sig_item_list.txt`.

use crate::exceptions::{FlashError, Result};
use crate::firmware::checksums::{self, CrcReport};
use crate::firmware::codec::{Decoded, Firmware, decode_any};
use crate::firmware::crypto::sign_manifest;
use crate::firmware::defaults::{DEFAULT_ITEM_LIST_FILE, DEFAULT_SIG_ITEM_LIST_FILE};
use crate::firmware::keys::{load_private_key, load_public_key};
use crate::firmware::manifest::Manifest;
use crate::firmware::staging::{SignList, StagingList};
use crate::firmware::verifier::{VerifyReport, verify_signed_items};
use crate::utils::{DirStore, ItemStore, ensure_dir, read_file, write_file};
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Options for packing a container
#[derive(Debug, Default)]
pub struct PackOptions {
    /// Staging list to read instead of `<items_dir>/item_list.txt`
    pub item_list: Option<PathBuf>,
}

/// Options for unpacking a container
#[derive(Debug, Default)]
pub struct UnpackOptions {
    /// Fail before writing anything when a stored CRC32 disagrees
    pub strict: bool,
}

/// Options for signing items
#[derive(Debug, Default)]
pub struct SignOptions {
    /// Signature input list to read instead of `<items_dir>/sig_item_list.txt`
    pub sign_list: Option<PathBuf>,
}

/// Options for verifying a signature file
#[derive(Debug, Default)]
pub struct VerifyOptions {
    /// Turn a failed digest or signature check into an error
    pub strict: bool,
}

/// Result of unpacking a container
#[derive(Debug)]
pub struct UnpackResult {
    /// The decoded container
    pub firmware: Firmware,
    /// Stored checksums compared with recomputed ones
    pub crc: CrcReport,
}

/// Result of signing items
#[derive(Debug, Serialize)]
pub struct SignResult {
    /// Parsed signature input list
    pub list: SignList,
    /// Manifest that was signed
    pub manifest: Manifest,
    /// Size of the written signature file
    pub signed_len: usize,
}

/// Pack the items listed in the staging list into a binary container
pub fn pack_firmware(items_dir: &Path, output_path: &Path, options: PackOptions) -> Result<Firmware> {
    let store = DirStore::new(items_dir);
    let list_path = options
        .item_list
        .unwrap_or_else(|| store.file(DEFAULT_ITEM_LIST_FILE));

    info!("Packing {:?} from {:?}", output_path, list_path);
    let list = StagingList::parse(&read_file(&list_path)?)?;
    list.ensure_not_empty()?;
    if !list.skipped.is_empty() {
        info!("{} lines not marked for packing", list.skipped.len());
    }

    let mut fw = Firmware::from_staging(&list, |record| store.read_item(&record.item.as_str()))?;
    let bytes = fw.serialize()?;
    write_file(output_path, &bytes)?;

    info!(
        "Packed {} items into {:?} ({} bytes)",
        fw.entries.len(),
        output_path,
        bytes.len()
    );
    Ok(fw)
}

/// Unpack a binary container into the items directory and re-verify its
/// checksums
pub fn unpack_firmware(
    input_path: &Path,
    items_dir: &Path,
    options: UnpackOptions,
) -> Result<UnpackResult> {
    info!("Unpacking {:?} into {:?}", input_path, items_dir);
    let data = read_file(input_path)?;

    let fw = match decode_any(&data)? {
        Decoded::Binary(fw) => fw,
        Decoded::Staging(_) => {
            return Err(FlashError::format(format!(
                "{} is a staging list, not a binary container",
                input_path.display()
            )));
        }
    };

    let crc = checksums::verify(&fw)?;
    if !crc.is_valid() {
        warn!("{} checksum(s) of {:?} do not match", crc.mismatches(), input_path);
        if options.strict {
            return Err(FlashError::ChecksumMismatch(format!(
                "{} checksum(s) of {} do not match",
                crc.mismatches(),
                input_path.display()
            )));
        }
    }

    // Every item must resolve before anything is written
    let store = DirStore::new(items_dir);
    for entry in &fw.entries {
        store.item_path(&entry.record.item.as_str())?;
    }

    ensure_dir(items_dir)?;
    for entry in &fw.entries {
        store.write_item(&entry.record.item.as_str(), &entry.payload)?;
    }

    let staging = StagingList::from_firmware(&fw);
    write_file(&store.file(DEFAULT_ITEM_LIST_FILE), staging.render().as_bytes())?;
    let sign_list = SignList::from_firmware(&fw);
    write_file(&store.file(DEFAULT_SIG_ITEM_LIST_FILE), sign_list.render().as_bytes())?;

    info!("Unpacked {} items", fw.entries.len());
    Ok(UnpackResult { firmware: fw, crc })
}

/// Hash the items of the signature input list and write the signed manifest
pub fn sign_items(
    items_dir: &Path,
    key_path: &Path,
    output_path: &Path,
    options: SignOptions,
) -> Result<SignResult> {
    let store = DirStore::new(items_dir);
    let list_path = options
        .sign_list
        .unwrap_or_else(|| store.file(DEFAULT_SIG_ITEM_LIST_FILE));

    info!("Signing items of {:?}", list_path);
    let list = SignList::parse(&String::from_utf8_lossy(&read_file(&list_path)?))?;
    list.ensure_not_empty()?;

    let key = load_private_key(key_path)?;

    let mut manifest = Manifest::default();
    for item in list.items() {
        manifest.push_item(item, &store.read_item(item)?)?;
    }

    let signed = sign_manifest(manifest.to_text().as_bytes(), &key)?;
    write_file(output_path, &signed)?;

    info!(
        "Signed {} items into {:?} ({} bytes)",
        manifest.len(),
        output_path,
        signed.len()
    );
    Ok(SignResult {
        list,
        manifest,
        signed_len: signed.len(),
    })
}

/// Check a signature file against the items directory
pub fn verify_items(
    items_dir: &Path,
    key_path: &Path,
    signature_path: &Path,
    options: VerifyOptions,
) -> Result<VerifyReport> {
    info!("Verifying {:?} against {:?}", signature_path, items_dir);
    let key = load_public_key(key_path)?;
    let signed = read_file(signature_path)?;

    let report = verify_signed_items(&signed, &key, items_dir)?;
    if options.strict && !report.is_valid() {
        let mismatched = report.items.iter().filter(|c| !c.is_match()).count();
        return Err(FlashError::Crypto(format!(
            "Verification failed: {mismatched} digest mismatch(es), signature {}",
            if report.signature_valid { "valid" } else { "invalid" }
        )));
    }
    Ok(report)
}
