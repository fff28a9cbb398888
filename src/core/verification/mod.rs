//! File checksums
//!
//! Digests used to verify decrypted submissions against their signature and to
//! detect duplicate media files on export.

pub mod checksum;

pub use checksum::{crc32_bytes, md5_hex, md5_hex_file};
