//! Decryption of encrypted submissions
//!
//! - [`cipher`] - Symmetric key unwrap, IV derivation and per-file ciphers
//! - [`signature`] - Canonical signature reconstruction and verification

pub mod cipher;
pub mod signature;

pub use cipher::{signature_decrypter, CipherFactory, SignatureDecrypter, SubmissionCipher};
pub use signature::{signature_digest, SignatureSource};
