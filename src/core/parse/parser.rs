//! Submission parser
//!
//! Plain submissions are parsed in place. Encrypted submissions arrive as a
//! plaintext manifest listing an encrypted payload and encrypted media; they
//! are decrypted into a private staging directory, re-parsed, and checked
//! against their signature.

use crate::core::crypto::{signature_decrypter, signature_digest, CipherFactory, SignatureSource};
use crate::core::verification::checksum::{crc32_bytes, md5_hex};
use crate::domain::errors::{CryptoError, SubmissionError};
use crate::domain::submission::{
    checked_file_name, Submission, SubmissionMetaData, ValidationStatus,
};
use crate::domain::xml::XmlDocument;
use chrono::{DateTime, FixedOffset};
use rsa::RsaPrivateKey;
use std::path::{Path, PathBuf};

const ENCRYPTED_SUFFIX: &str = ".enc";

/// Reads only the submission date of a submission file
///
/// Best effort: any read or parse failure yields `None`.
pub fn read_submission_date(path: &Path) -> Option<DateTime<FixedOffset>> {
    let text = std::fs::read_to_string(path).ok()?;
    let document = XmlDocument::parse(&text).ok()?;
    SubmissionMetaData::from_root(document.root()).submission_date
}

/// Parses a submission file, decrypting it when it is an encryption manifest
///
/// # Errors
///
/// Returns a [`SubmissionError`] when the file is unreadable or unparsable, an
/// expected manifest element is missing, a manifest file name is not a plain
/// file name, a media file is missing, or any decryption step fails. A signature mismatch is not an error: the returned
/// submission is flagged [`ValidationStatus::Invalid`].
pub fn parse_submission(
    path: &Path,
    private_key: Option<&RsaPrivateKey>,
) -> Result<Submission, SubmissionError> {
    let bytes = std::fs::read(path).map_err(|e| SubmissionError::io(path, e))?;
    let document = parse_document(path, &bytes)?;
    let metadata = SubmissionMetaData::from_root(document.root());

    if !metadata.is_encrypted() {
        return Ok(Submission::plain(path.to_path_buf(), document, metadata));
    }

    // Manifest names are joined to the source and staging directories
    for name in metadata.media_names.iter().chain(&metadata.encrypted_xml_file) {
        checked_file_name(path, name)?;
    }

    let private_key = private_key.ok_or_else(|| SubmissionError::Decryption {
        file: path.display().to_string(),
        source: CryptoError::RsaDecryption("no private key configured".to_string()),
    })?;

    let instance_id = metadata
        .instance_id
        .as_ref()
        .ok_or_else(|| missing(path, "instanceID"))?
        .to_string();
    let wrapped_key = metadata
        .base64_encrypted_key
        .clone()
        .ok_or_else(|| missing(path, "base64EncryptedKey"))?;
    let encrypted_signature = metadata
        .encrypted_signature
        .clone()
        .ok_or_else(|| missing(path, "base64EncryptedElementSignature"))?;

    let decryption_error = |source: CryptoError| SubmissionError::Decryption {
        file: path.display().to_string(),
        source,
    };
    let cipher_factory = CipherFactory::derive_from(&instance_id, &wrapped_key, private_key)
        .map_err(decryption_error)?;
    let signature = signature_decrypter(private_key)
        .decrypt(&encrypted_signature)
        .map_err(decryption_error)?;

    let submission = Submission::encrypted(
        path.to_path_buf(),
        document,
        metadata,
        cipher_factory,
        signature,
    );
    decrypt_submission(submission, crc32_bytes(&bytes))
}

fn parse_document(path: &Path, bytes: &[u8]) -> Result<XmlDocument, SubmissionError> {
    let text = std::str::from_utf8(bytes).map_err(|e| SubmissionError::Unparsable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    XmlDocument::parse(text).map_err(|reason| SubmissionError::Unparsable {
        path: path.display().to_string(),
        reason,
    })
}

fn missing(path: &Path, element: &str) -> SubmissionError {
    SubmissionError::MissingElement {
        path: path.display().to_string(),
        element: element.to_string(),
    }
}

/// Strips the `.enc` suffix from an encrypted file name
fn decrypted_name(encrypted_name: &str) -> &str {
    encrypted_name
        .strip_suffix(ENCRYPTED_SUFFIX)
        .unwrap_or(encrypted_name)
}

/// Decrypts one file into the staging directory and returns its MD5 hex
fn decrypt_file(
    cipher_factory: &mut CipherFactory,
    source: &Path,
    destination: &Path,
) -> Result<String, SubmissionError> {
    let cipher = cipher_factory.next();
    let ciphertext = std::fs::read(source).map_err(|e| SubmissionError::io(source, e))?;
    let plaintext = cipher
        .decrypt(&ciphertext)
        .map_err(|source_err| SubmissionError::Decryption {
            file: source.display().to_string(),
            source: source_err,
        })?;
    std::fs::write(destination, &plaintext).map_err(|e| SubmissionError::io(destination, e))?;
    Ok(md5_hex(&plaintext))
}

fn decrypt_submission(
    mut submission: Submission,
    manifest_checksum: u32,
) -> Result<Submission, SubmissionError> {
    let path = submission.path().to_path_buf();
    let source_dir = submission.source_dir().to_path_buf();
    let metadata = submission.metadata().clone();

    let media_paths: Vec<PathBuf> = metadata
        .media_names
        .iter()
        .map(|name| source_dir.join(name))
        .collect();
    if let Some(absent) = media_paths.iter().find(|p| !p.is_file()) {
        return Err(SubmissionError::MissingMedia {
            path: path.display().to_string(),
            file: absent.display().to_string(),
        });
    }

    let payload_name = metadata
        .encrypted_xml_file
        .clone()
        .ok_or_else(|| missing(&path, "encryptedXmlFile"))?;

    let mut cipher_factory = submission
        .take_cipher_factory()
        .ok_or_else(|| missing(&path, "base64EncryptedKey"))?;

    let staging = tempfile::Builder::new()
        .prefix("formex-")
        .tempdir()
        .map_err(|e| SubmissionError::io(&path, e))?;

    // Media first, in manifest order, then the payload
    let mut media_hashes = Vec::with_capacity(metadata.media_names.len());
    for (name, media_path) in metadata.media_names.iter().zip(&media_paths) {
        let plain_name = decrypted_name(name);
        let hash = decrypt_file(
            &mut cipher_factory,
            media_path,
            &staging.path().join(plain_name),
        )?;
        media_hashes.push((plain_name.to_string(), hash));
    }

    let plain_payload_name = decrypted_name(&payload_name).to_string();
    let plain_payload_path = staging.path().join(&plain_payload_name);
    let payload_hash = decrypt_file(
        &mut cipher_factory,
        &source_dir.join(&payload_name),
        &plain_payload_path,
    )?;

    let payload_bytes = std::fs::read(&plain_payload_path)
        .map_err(|e| SubmissionError::io(&plain_payload_path, e))?;
    let document = parse_document(&plain_payload_path, &payload_bytes)?;

    let source = SignatureSource {
        form_id: metadata.form_id.clone().unwrap_or_default(),
        version: metadata.version.clone(),
        base64_encrypted_key: metadata.base64_encrypted_key.clone().unwrap_or_default(),
        instance_id: metadata.instance_id.as_ref().map(|id| id.to_string()),
        manifest_checksum,
        media: media_hashes,
        payload: (plain_payload_name, payload_hash),
    };
    let computed = signature_digest(&source);
    let status = if submission.signature() == Some(computed.as_slice()) {
        ValidationStatus::Valid
    } else {
        tracing::warn!(
            path = %path.display(),
            instance_id = ?metadata.instance_id,
            "Submission signature does not match its content"
        );
        ValidationStatus::Invalid
    };

    tracing::debug!(
        path = %path.display(),
        media_count = metadata.media_names.len(),
        status = ?status,
        "Decrypted submission"
    );

    Ok(submission
        .decrypted(document, staging)
        .with_validation_status(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_plain_submission() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("submission.xml");
        fs::write(
            &path,
            r#"<data id="f"><name>Bob</name><meta><instanceID>uuid:1</instanceID></meta></data>"#,
        )
        .unwrap();

        let submission = parse_submission(&path, None).unwrap();
        assert_eq!(submission.instance_id().unwrap().as_str(), "uuid:1");
        assert_eq!(submission.validation_status(), ValidationStatus::NotValidated);
        assert_eq!(submission.working_dir(), temp.path());
    }

    #[test]
    fn test_parse_unparsable_submission() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("submission.xml");
        fs::write(&path, "<data><broken></data>").unwrap();

        let result = parse_submission(&path, None);
        assert!(matches!(result, Err(SubmissionError::Unparsable { .. })));
    }

    #[test]
    fn test_encrypted_without_key_is_dropped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("submission.xml");
        fs::write(
            &path,
            r#"<data id="f" encrypted="yes"><base64EncryptedKey>a2V5</base64EncryptedKey></data>"#,
        )
        .unwrap();

        let result = parse_submission(&path, None);
        assert!(matches!(result, Err(SubmissionError::Decryption { .. })));
    }

    #[test]
    fn test_manifest_names_outside_submission_dir_are_rejected() {
        let temp = TempDir::new().unwrap();
        let manifests = [
            r#"<data id="f" encrypted="yes"><base64EncryptedKey>a2V5</base64EncryptedKey>
  <media><file>../../evil.jpg.enc</file></media>
  <encryptedXmlFile>submission.xml.enc</encryptedXmlFile></data>"#,
            r#"<data id="f" encrypted="yes"><base64EncryptedKey>a2V5</base64EncryptedKey>
  <encryptedXmlFile>/etc/passwd</encryptedXmlFile></data>"#,
        ];

        for manifest in manifests {
            let path = temp.path().join("submission.xml");
            fs::write(&path, manifest).unwrap();
            let result = parse_submission(&path, None);
            assert!(
                matches!(result, Err(SubmissionError::UnsafeFileName { .. })),
                "{manifest}"
            );
        }
    }

    #[test]
    fn test_decrypted_name() {
        assert_eq!(decrypted_name("submission.xml.enc"), "submission.xml");
        assert_eq!(decrypted_name("photo.jpg"), "photo.jpg");
    }

    #[test]
    fn test_read_submission_date_best_effort() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("submission.xml");
        fs::write(
            &path,
            r#"<data id="f" submissionDate="2020-05-05T05:05:05.000Z"/>"#,
        )
        .unwrap();

        assert!(read_submission_date(&path).is_some());
        assert!(read_submission_date(&temp.path().join("nope.xml")).is_none());
    }
}
