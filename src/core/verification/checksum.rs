//! Checksum calculation for signature verification and media de-duplication

use crate::domain::Result;
use md5::{Digest, Md5};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Calculate the MD5 of raw bytes as 32 lowercase hex characters
///
/// # Examples
///
/// ```
/// use formex::core::verification::checksum::md5_hex;
///
/// assert_eq!(md5_hex(b"hello"), "5d41402abc4b2a76b9719d911017c592");
/// ```
pub fn md5_hex(data: &[u8]) -> String {
    let digest = Md5::digest(data);
    format!("{digest:x}")
}

/// Calculate the MD5 of a file's contents, streaming it from disk
///
/// # Errors
///
/// Returns an I/O error when the file cannot be opened or read.
pub fn md5_hex_file(path: impl AsRef<Path>) -> Result<String> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    let mut hasher = Md5::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Calculate the CRC32 of raw bytes
pub fn crc32_bytes(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}
