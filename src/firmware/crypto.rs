//! Manifest signing: RSA PKCS#1 v1.5 over the SHA-256 of the manifest text.
//! The signature file is the manifest followed by the raw 256-byte signature.

use super::constants::SIGNATURE_SIZE;
use crate::exceptions::{FlashError, Result};
use log::debug;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

/// Sign data with a private key, returning the raw signature
pub fn sign_data(data: &[u8], key: &RsaPrivateKey) -> Result<Vec<u8>> {
    if key.size() != SIGNATURE_SIZE {
        return Err(FlashError::Crypto(format!(
            "Key produces {}-byte signatures, expected {SIGNATURE_SIZE}",
            key.size()
        )));
    }

    let digest = Sha256::digest(data);
    key.sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .map_err(|e| FlashError::Crypto(format!("Sign error: {e}")))
}

/// Verify a signature; a mismatch is `false`, never an error
pub fn verify_signature(data: &[u8], signature: &[u8], key: &RsaPublicKey) -> bool {
    let digest = Sha256::digest(data);
    key.verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
        .is_ok()
}

/// Manifest text followed by its signature
pub fn sign_manifest(manifest_text: &[u8], key: &RsaPrivateKey) -> Result<Vec<u8>> {
    let signature = sign_data(manifest_text, key)?;
    let mut signed = Vec::with_capacity(manifest_text.len() + signature.len());
    signed.extend_from_slice(manifest_text);
    signed.extend_from_slice(&signature);
    debug!(
        "Signed manifest: {} bytes + {} byte signature",
        manifest_text.len(),
        signature.len()
    );
    Ok(signed)
}

/// Split a signature file into `(manifest_text, signature)`
pub fn split_signed(signed: &[u8]) -> Result<(&[u8], &[u8])> {
    if signed.len() <= SIGNATURE_SIZE {
        return Err(FlashError::format(format!(
            "Signature file is {} bytes, must be larger than {SIGNATURE_SIZE}",
            signed.len()
        )));
    }
    Ok(signed.split_at(signed.len() - SIGNATURE_SIZE))
}

/// Check the signature of a signature file against its own manifest text
pub fn verify_signed(signed: &[u8], key: &RsaPublicKey) -> Result<bool> {
    let (manifest_text, signature) = split_signed(signed)?;
    Ok(verify_signature(manifest_text, signature, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firmware::keys::{private_key_from_pem, public_key_from_pem};

    const RSA_PRIVATE: &str = include_str!("../../tests/fixtures/rsa_private.pem");
    const RSA_PUBLIC: &str = include_str!("../../tests/fixtures/rsa_public.pem");
    const OTHER_PUBLIC: &str = include_str!("../../tests/fixtures/other_public.pem");
    const RSA1024_PRIVATE: &str = include_str!("../../tests/fixtures/rsa1024_private.pem");

    fn keys() -> (RsaPrivateKey, RsaPublicKey) {
        (
            private_key_from_pem(RSA_PRIVATE.as_bytes()).unwrap(),
            public_key_from_pem(RSA_PUBLIC.as_bytes()).unwrap(),
        )
    }

    #[test]
    fn test_sign_and_verify() {
        let (private, public) = keys();
        let manifest = b"1\nabc boot.img\n";
        let signed = sign_manifest(manifest, &private).unwrap();

        assert_eq!(signed.len(), manifest.len() + SIGNATURE_SIZE);
        assert_eq!(&signed[..manifest.len()], manifest);
        assert!(verify_signed(&signed, &public).unwrap());
    }

    #[test]
    fn test_signature_is_deterministic() {
        let (private, _) = keys();
        assert_eq!(
            sign_data(b"payload", &private).unwrap(),
            sign_data(b"payload", &private).unwrap()
        );
    }

    #[test]
    fn test_flipped_bit_fails() {
        let (private, public) = keys();
        let signed = sign_manifest(b"1\nabc boot.img\n", &private).unwrap();

        for index in [signed.len() - SIGNATURE_SIZE, signed.len() - 1] {
            let mut tampered = signed.clone();
            tampered[index] ^= 0x01;
            assert!(!verify_signed(&tampered, &public).unwrap());
        }

        let mut tampered = signed.clone();
        tampered[0] ^= 0x01;
        assert!(!verify_signed(&tampered, &public).unwrap());
    }

    #[test]
    fn test_wrong_public_key() {
        let (private, _) = keys();
        let other = public_key_from_pem(OTHER_PUBLIC.as_bytes()).unwrap();
        let signed = sign_manifest(b"1\nabc boot.img\n", &private).unwrap();
        assert!(!verify_signed(&signed, &other).unwrap());
    }

    #[test]
    fn test_too_short() {
        let (_, public) = keys();
        let err = verify_signed(&[0u8; SIGNATURE_SIZE], &public).unwrap_err();
        assert!(matches!(err, FlashError::Format(_)));
    }

    #[test]
    fn test_small_key_rejected() {
        let small = private_key_from_pem(RSA1024_PRIVATE.as_bytes()).unwrap();
        assert!(matches!(
            sign_data(b"data", &small),
            Err(FlashError::Crypto(_))
        ));
    }
}
