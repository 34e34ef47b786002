//! RSA key loading from PEM material

use crate::exceptions::{FlashError, Result};
use log::debug;
use pem::parse;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fs;
use std::path::Path;

/// Parse an RSA private key: `RSA PRIVATE KEY` (PKCS#1) or `PRIVATE KEY` (PKCS#8)
pub fn private_key_from_pem(pem_text: &[u8]) -> Result<RsaPrivateKey> {
    let parsed = parse(pem_text)
        .map_err(|e| FlashError::Crypto(format!("Failed to parse private key PEM: {e}")))?;

    let key = match parsed.tag() {
        "RSA PRIVATE KEY" => RsaPrivateKey::from_pkcs1_der(parsed.contents())
            .map_err(|e| FlashError::Crypto(format!("Invalid PKCS#1 private key: {e}")))?,
        "PRIVATE KEY" => RsaPrivateKey::from_pkcs8_der(parsed.contents())
            .map_err(|e| FlashError::Crypto(format!("Invalid PKCS#8 private key: {e}")))?,
        other => {
            return Err(FlashError::Crypto(format!(
                "Unsupported private key type: {other}"
            )));
        }
    };

    debug!("Loaded RSA private key ({} bits)", key.size() * 8);
    Ok(key)
}

/// Parse an RSA public key: `PUBLIC KEY` (SPKI) or `RSA PUBLIC KEY` (PKCS#1)
pub fn public_key_from_pem(pem_text: &[u8]) -> Result<RsaPublicKey> {
    let parsed = parse(pem_text)
        .map_err(|e| FlashError::Crypto(format!("Failed to parse public key PEM: {e}")))?;

    let key = match parsed.tag() {
        "PUBLIC KEY" => RsaPublicKey::from_public_key_der(parsed.contents())
            .map_err(|e| FlashError::Crypto(format!("Invalid public key: {e}")))?,
        "RSA PUBLIC KEY" => RsaPublicKey::from_pkcs1_der(parsed.contents())
            .map_err(|e| FlashError::Crypto(format!("Invalid PKCS#1 public key: {e}")))?,
        other => {
            return Err(FlashError::Crypto(format!(
                "Unsupported public key type: {other}"
            )));
        }
    };

    debug!("Loaded RSA public key ({} bits)", key.size() * 8);
    Ok(key)
}

/// Read and parse a private key file
pub fn load_private_key(path: &Path) -> Result<RsaPrivateKey> {
    let pem_text = fs::read(path).map_err(|e| FlashError::io_at(path, e))?;
    private_key_from_pem(&pem_text)
}

/// Read and parse a public key file
pub fn load_public_key(path: &Path) -> Result<RsaPublicKey> {
    let pem_text = fs::read(path).map_err(|e| FlashError::io_at(path, e))?;
    public_key_from_pem(&pem_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSA_PRIVATE: &str = include_str!("../../tests/fixtures/rsa_private.pem");
    const PKCS8_PRIVATE: &str = include_str!("../../tests/fixtures/pkcs8_private.pem");
    const RSA_PUBLIC: &str = include_str!("../../tests/fixtures/rsa_public.pem");

    #[test]
    fn test_pkcs1_and_pkcs8_are_the_same_key() {
        let pkcs1 = private_key_from_pem(RSA_PRIVATE.as_bytes()).unwrap();
        let pkcs8 = private_key_from_pem(PKCS8_PRIVATE.as_bytes()).unwrap();
        assert_eq!(RsaPublicKey::from(&pkcs1), RsaPublicKey::from(&pkcs8));
        assert_eq!(pkcs1.size(), 256);
    }

    #[test]
    fn test_public_key_matches_private() {
        let private = private_key_from_pem(RSA_PRIVATE.as_bytes()).unwrap();
        let public = public_key_from_pem(RSA_PUBLIC.as_bytes()).unwrap();
        assert_eq!(RsaPublicKey::from(&private), public);
    }

    #[test]
    fn test_wrong_tag() {
        let err = private_key_from_pem(RSA_PUBLIC.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Unsupported private key type: PUBLIC KEY"));
        assert!(public_key_from_pem(RSA_PRIVATE.as_bytes()).is_err());
    }

    #[test]
    fn test_garbage() {
        assert!(matches!(
            private_key_from_pem(b"not a key"),
            Err(FlashError::Crypto(_))
        ));
    }
}
