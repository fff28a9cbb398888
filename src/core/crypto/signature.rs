//! Submission signature reconstruction
//!
//! The client signs an encrypted submission by RSA-encrypting the MD5 digest
//! of a canonical text describing it:
//!
//! ```text
//! <formId>
//! <version>                     (only when the form has one)
//! <base64EncryptedKey>
//! <instanceId> | crc32:<checksum>
//! <media name>::<md5 hex>       (one line per media file, manifest order)
//! <payload name>::<md5 hex>
//! ```
//!
//! Every line, including the last, ends with `\n`.

use md5::{Digest, Md5};

/// Everything that goes into the canonical signature text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSource {
    pub form_id: String,
    pub version: Option<String>,
    pub base64_encrypted_key: String,
    pub instance_id: Option<String>,
    /// CRC32 of the manifest file, used when there is no instance ID
    pub manifest_checksum: u32,
    /// Decrypted media file names with their MD5 hex digests
    pub media: Vec<(String, String)>,
    /// Decrypted payload file name with its MD5 hex digest
    pub payload: (String, String),
}

impl SignatureSource {
    /// Builds the canonical signature text
    pub fn canonical_string(&self) -> String {
        let mut parts = vec![self.form_id.clone()];
        if let Some(version) = &self.version {
            parts.push(version.clone());
        }
        parts.push(self.base64_encrypted_key.clone());
        parts.push(
            self.instance_id
                .clone()
                .unwrap_or_else(|| format!("crc32:{}", self.manifest_checksum)),
        );
        for (name, hash) in &self.media {
            parts.push(format!("{name}::{hash}"));
        }
        parts.push(format!("{}::{}", self.payload.0, self.payload.1));

        let mut text = parts.join("\n");
        text.push('\n');
        text
    }
}

/// MD5 digest of the canonical signature text
pub fn signature_digest(source: &SignatureSource) -> [u8; 16] {
    let digest = Md5::digest(source.canonical_string().as_bytes());
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SignatureSource {
        SignatureSource {
            form_id: "simple_form".to_string(),
            version: Some("2".to_string()),
            base64_encrypted_key: "S0VZ".to_string(),
            instance_id: Some("uuid:1234".to_string()),
            manifest_checksum: 3148722419,
            media: vec![(
                "photo.jpg".to_string(),
                "571c58e834fd876178aca15d610f4512".to_string(),
            )],
            payload: (
                "submission.xml".to_string(),
                "9ea284d4e9f9b96b8351e9d325906800".to_string(),
            ),
        }
    }

    #[test]
    fn test_canonical_string() {
        assert_eq!(
            sample().canonical_string(),
            "simple_form\n2\nS0VZ\nuuid:1234\n\
             photo.jpg::571c58e834fd876178aca15d610f4512\n\
             submission.xml::9ea284d4e9f9b96b8351e9d325906800\n"
        );
    }

    #[test]
    fn test_signature_digest_fixed_vector() {
        let digest = signature_digest(&sample());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        assert_eq!(hex, "48b2f7b9f624db2245145851495fcfd9");
    }

    #[test]
    fn test_crc32_replaces_missing_instance_id() {
        let mut source = sample();
        source.instance_id = None;
        source.version = None;
        let text = source.canonical_string();
        assert!(text.starts_with("simple_form\nS0VZ\ncrc32:3148722419\n"));
    }
}
