//! Signature file verification.
//!
//! Two independent checks: each manifest entry against the bytes currently
//! on disk, and the RSA signature against the manifest text itself. A
//! tampered item with a stale manifest fails the first and passes the second.

use super::crypto::{split_signed, verify_signature};
use super::manifest::{Manifest, sha256_hex};
use super::paths::resolve_path;
use crate::exceptions::Result;
use crate::utils::read_file;
use log::{debug, info, warn};
use rsa::RsaPublicKey;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Digest comparison for one manifest entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DigestCheck {
    /// Relative path as listed in the manifest
    pub path: String,
    /// File that was hashed
    pub file: PathBuf,
    /// Digest from the manifest
    pub expected: String,
    /// Digest of the file on disk
    pub actual: String,
}

impl DigestCheck {
    /// Digests agree (case-insensitive hex)
    pub fn is_match(&self) -> bool {
        self.expected.eq_ignore_ascii_case(&self.actual)
    }
}

/// Outcome of verifying a signature file
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    /// One check per manifest entry, in manifest order
    pub items: Vec<DigestCheck>,
    /// RSA signature over the manifest text is valid
    pub signature_valid: bool,
}

impl VerifyReport {
    /// All digests match and the signature is valid
    pub fn is_valid(&self) -> bool {
        self.signature_valid && self.items.iter().all(DigestCheck::is_match)
    }
}

/// Hash every file the manifest names under `root` and compare
pub fn verify_contents(manifest: &Manifest, root: &Path) -> Result<Vec<DigestCheck>> {
    let mut checks = Vec::with_capacity(manifest.len());

    for entry in &manifest.entries {
        let file = resolve_path(root, &entry.path)?;
        let actual = sha256_hex(&read_file(&file)?);
        let check = DigestCheck {
            path: entry.path.clone(),
            file,
            expected: entry.sha256.clone(),
            actual,
        };

        if check.is_match() {
            debug!("sha256 ok: {}", check.path);
        } else {
            warn!(
                "sha256 mismatch: {} expected {} got {}",
                check.path, check.expected, check.actual
            );
        }
        checks.push(check);
    }

    Ok(checks)
}

/// Verify a signature file against the items under `root`
pub fn verify_signed_items(signed: &[u8], key: &RsaPublicKey, root: &Path) -> Result<VerifyReport> {
    let (manifest_text, signature) = split_signed(signed)?;
    let manifest = Manifest::parse(manifest_text)?;

    let items = verify_contents(&manifest, root)?;
    let signature_valid = verify_signature(manifest_text, signature, key);

    let report = VerifyReport {
        items,
        signature_valid,
    };
    info!(
        "Verified {} items, signature {}",
        report.items.len(),
        if signature_valid { "valid" } else { "INVALID" }
    );
    Ok(report)
}
