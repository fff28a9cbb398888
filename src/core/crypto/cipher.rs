//! Per-submission cipher issuance
//!
//! An encrypted submission carries one RSA-wrapped AES key. Every file of the
//! submission is encrypted with that key and a distinct IV, where IV number
//! `n` is the MD5 seed with `n` single-byte increments applied in round-robin
//! order. Decrypting therefore requires asking for ciphers in exactly the same
//! order the files were encrypted: media files in manifest order, then the
//! submission payload.

use crate::domain::errors::CryptoError;
use aes::{Aes128, Aes192, Aes256};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use md5::{Digest, Md5};
use rsa::{Oaep, RsaPrivateKey};
use zeroize::{Zeroize, ZeroizeOnDrop};

const IV_LENGTH: usize = 16;

/// Symmetric key and IV state for one submission
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct CipherFactory {
    symmetric_key: Vec<u8>,
    iv_seed: [u8; IV_LENGTH],
    counter: usize,
}

impl std::fmt::Debug for CipherFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherFactory")
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}

impl CipherFactory {
    /// Unwraps the submission's AES key and derives its IV seed
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError`] when the wrapped key is not valid base64, the
    /// private key does not match, or the unwrapped key is not an AES key.
    pub fn derive_from(
        instance_id: &str,
        base64_wrapped_key: &str,
        private_key: &RsaPrivateKey,
    ) -> Result<Self, CryptoError> {
        let wrapped = decode_base64(base64_wrapped_key)?;
        let symmetric_key = private_key
            .decrypt(oaep(), &wrapped)
            .map_err(|e| CryptoError::RsaDecryption(e.to_string()))?;

        if !matches!(symmetric_key.len(), 16 | 24 | 32) {
            return Err(CryptoError::UnsupportedKeyLength(symmetric_key.len()));
        }

        let iv_seed = derive_iv_seed(instance_id, &symmetric_key);
        Ok(Self {
            symmetric_key,
            iv_seed,
            counter: 0,
        })
    }

    /// Issues the next file cipher
    ///
    /// Mutates the IV state; calls must follow the encryption order.
    pub fn next(&mut self) -> SubmissionCipher {
        let position = self.counter % IV_LENGTH;
        self.iv_seed[position] = self.iv_seed[position].wrapping_add(1);
        self.counter += 1;
        SubmissionCipher {
            key: self.symmetric_key.clone(),
            iv: self.iv_seed,
        }
    }
}

/// Builds the MD5-based IV seed from the instance ID and raw key bytes
fn derive_iv_seed(instance_id: &str, symmetric_key: &[u8]) -> [u8; IV_LENGTH] {
    let mut hasher = Md5::new();
    hasher.update(instance_id.as_bytes());
    hasher.update(symmetric_key);
    let digest = hasher.finalize();

    let mut seed = [0u8; IV_LENGTH];
    for (i, byte) in seed.iter_mut().enumerate() {
        *byte = digest[i % digest.len()];
    }
    seed
}

/// Decrypt-mode AES/CFB/PKCS5 cipher for a single file
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SubmissionCipher {
    key: Vec<u8>,
    iv: [u8; IV_LENGTH],
}

impl SubmissionCipher {
    /// The effective IV of this cipher
    pub fn iv(&self) -> &[u8; IV_LENGTH] {
        &self.iv
    }

    /// Decrypts a whole file and strips its PKCS#5 padding
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut buffer = ciphertext.to_vec();
        match self.key.len() {
            16 => cfb_mode::Decryptor::<Aes128>::new_from_slices(&self.key, &self.iv)
                .map_err(|e| CryptoError::CipherInit(e.to_string()))?
                .decrypt(&mut buffer),
            24 => cfb_mode::Decryptor::<Aes192>::new_from_slices(&self.key, &self.iv)
                .map_err(|e| CryptoError::CipherInit(e.to_string()))?
                .decrypt(&mut buffer),
            32 => cfb_mode::Decryptor::<Aes256>::new_from_slices(&self.key, &self.iv)
                .map_err(|e| CryptoError::CipherInit(e.to_string()))?
                .decrypt(&mut buffer),
            other => return Err(CryptoError::UnsupportedKeyLength(other)),
        }
        strip_pkcs5_padding(&mut buffer)?;
        Ok(buffer)
    }
}

fn strip_pkcs5_padding(buffer: &mut Vec<u8>) -> Result<(), CryptoError> {
    let pad = *buffer.last().ok_or(CryptoError::InvalidPadding)? as usize;
    if pad == 0 || pad > IV_LENGTH || pad > buffer.len() {
        return Err(CryptoError::InvalidPadding);
    }
    if buffer[buffer.len() - pad..].iter().any(|&b| b as usize != pad) {
        return Err(CryptoError::InvalidPadding);
    }
    buffer.truncate(buffer.len() - pad);
    Ok(())
}

/// RSA-OAEP decrypter used once per submission to recover its signature
pub struct SignatureDecrypter<'a> {
    private_key: &'a RsaPrivateKey,
}

impl SignatureDecrypter<'_> {
    /// Decodes and unwraps a base64 encrypted signature
    pub fn decrypt(&self, base64_signature: &str) -> Result<Vec<u8>, CryptoError> {
        let encrypted = decode_base64(base64_signature)?;
        self.private_key
            .decrypt(oaep(), &encrypted)
            .map_err(|e| CryptoError::RsaDecryption(e.to_string()))
    }
}

/// Returns the signature decrypter for a private key
pub fn signature_decrypter(private_key: &RsaPrivateKey) -> SignatureDecrypter<'_> {
    SignatureDecrypter { private_key }
}

fn oaep() -> Oaep {
    Oaep::new::<sha2::Sha256>()
}

fn decode_base64(value: &str) -> Result<Vec<u8>, CryptoError> {
    let compact: String = value.split_whitespace().collect();
    STANDARD
        .decode(compact)
        .map_err(|e| CryptoError::InvalidBase64(e.to_string()))
}
