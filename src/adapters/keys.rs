//! Private key loading
//!
//! Encrypted forms are exported with the RSA private key matching the
//! form's public key. Both PKCS#8 (`BEGIN PRIVATE KEY`) and PKCS#1
//! (`BEGIN RSA PRIVATE KEY`) PEM files are accepted.

use crate::domain::errors::FormexError;
use crate::domain::Result;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use std::path::Path;
use zeroize::Zeroizing;

/// Reads an RSA private key from a PEM file
///
/// # Errors
///
/// Returns [`FormexError::Configuration`] when the file cannot be read or
/// holds no RSA private key in a supported encoding.
pub fn load_private_key(path: impl AsRef<Path>) -> Result<RsaPrivateKey> {
    let path = path.as_ref();
    let pem = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
        FormexError::Configuration(format!(
            "Failed to read private key {}: {}",
            path.display(),
            e
        ))
    })?);

    let key = parse_private_key(&pem).map_err(|e| {
        FormexError::Configuration(format!("Invalid private key {}: {}", path.display(), e))
    })?;

    tracing::debug!(path = %path.display(), "Loaded private key");
    Ok(key)
}

/// Parses a PKCS#8 or PKCS#1 PEM document
pub fn parse_private_key(pem: &str) -> std::result::Result<RsaPrivateKey, String> {
    let pem = pem.trim();
    match RsaPrivateKey::from_pkcs8_pem(pem) {
        Ok(key) => Ok(key),
        Err(pkcs8_err) => RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|pkcs1_err| format!("not PKCS#8 ({pkcs8_err}) nor PKCS#1 ({pkcs1_err})")),
    }
}
