//! Submission domain model
//!
//! A [`Submission`] is one parsed form response. It is produced by the parser,
//! optionally replaced by a decrypted copy, and finally consumed by the CSV
//! mappers. Transitions consume the value and return a new one; nothing is
//! mutated in place once a submission leaves the parser.

use crate::core::crypto::CipherFactory;
use crate::domain::errors::SubmissionError;
use crate::domain::ids::InstanceId;
use crate::domain::xml::{XmlDocument, XmlElement};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;

/// Outcome of the signature check of an encrypted submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    /// Plain submission, nothing to validate
    NotValidated,
    /// Signature matched the decrypted content
    Valid,
    /// Signature did not match; the submission is kept but flagged
    Invalid,
}

/// Facts read once from a submission's root element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionMetaData {
    pub form_id: Option<String>,
    pub instance_id: Option<InstanceId>,
    pub version: Option<String>,
    pub submission_date: Option<DateTime<FixedOffset>>,
    pub encrypted_xml_file: Option<String>,
    pub base64_encrypted_key: Option<String>,
    pub encrypted_signature: Option<String>,
    pub media_names: Vec<String>,
}

impl SubmissionMetaData {
    /// Extracts metadata from a root element
    ///
    /// Each fact is looked up in a fixed order of candidate locations and the
    /// first present value wins. OpenRosa `meta` children are tried before the
    /// equivalent root attributes.
    pub fn from_root(root: XmlElement<'_>) -> Self {
        let meta_value = |name: &str| {
            root.find_element("meta")
                .and_then(|meta| meta.find_element(name))
                .and_then(|e| e.value())
                .map(str::to_string)
        };
        let child_value = |name: &str| {
            root.find_element(name)
                .and_then(|e| e.value())
                .map(|v| v.trim().to_string())
        };

        let instance_id = meta_value("instanceID")
            .or_else(|| root.attribute("instanceID").map(str::to_string))
            .and_then(|id| InstanceId::new(id.trim()).ok());

        let submission_date = meta_value("submissionDate")
            .or_else(|| root.attribute("submissionDate").map(str::to_string))
            .and_then(|raw| parse_submission_date(&raw));

        let media_names = root
            .find_elements_path(&["media", "file"])
            .iter()
            .filter_map(|e| e.value())
            .map(|v| v.trim().to_string())
            .collect();

        Self {
            form_id: root.attribute("id").map(str::to_string),
            instance_id,
            version: root.attribute("version").map(str::to_string),
            submission_date,
            encrypted_xml_file: child_value("encryptedXmlFile"),
            base64_encrypted_key: child_value("base64EncryptedKey"),
            encrypted_signature: child_value("base64EncryptedElementSignature"),
            media_names,
        }
    }

    /// Whether the root element is an encryption manifest
    pub fn is_encrypted(&self) -> bool {
        self.base64_encrypted_key.is_some()
    }
}

/// Parses the submission timestamps found in the wild
///
/// Accepts RFC 3339, ISO 8601 with a compact offset, and offset-less values
/// which are read as UTC.
pub fn parse_submission_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc().fixed_offset())
        })
}

/// Checks a file name taken from submission content before it is joined to a
/// directory
///
/// Only a single normal path component is accepted: no `/` or `\\`, no `.`
/// or `..`, no root and no drive prefix. `referrer` is the file or directory
/// the name was read from, reported in the error.
pub fn checked_file_name<'a>(referrer: &Path, name: &'a str) -> Result<&'a str, SubmissionError> {
    let mut components = Path::new(name).components();
    let single_component = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if single_component && !name.contains(['/', '\\']) {
        Ok(name)
    } else {
        Err(SubmissionError::UnsafeFileName {
            path: referrer.display().to_string(),
            file: name.to_string(),
        })
    }
}

/// Where a submission's plaintext files live
#[derive(Debug)]
pub enum WorkingDir {
    /// Plain submissions are read in place
    Source(PathBuf),
    /// Decrypted files are staged in a temporary directory removed on drop
    Staging(TempDir),
}

impl WorkingDir {
    pub fn path(&self) -> &Path {
        match self {
            WorkingDir::Source(path) => path,
            WorkingDir::Staging(dir) => dir.path(),
        }
    }
}

/// One parsed form response
#[derive(Debug)]
pub struct Submission {
    path: PathBuf,
    working_dir: WorkingDir,
    document: XmlDocument,
    metadata: SubmissionMetaData,
    validation_status: ValidationStatus,
    cipher_factory: Option<CipherFactory>,
    signature: Option<Vec<u8>>,
}

impl Submission {
    /// Creates a plain (unencrypted) submission
    pub fn plain(path: PathBuf, document: XmlDocument, metadata: SubmissionMetaData) -> Self {
        let working_dir = WorkingDir::Source(
            path.parent().map(Path::to_path_buf).unwrap_or_default(),
        );
        Self {
            path,
            working_dir,
            document,
            metadata,
            validation_status: ValidationStatus::NotValidated,
            cipher_factory: None,
            signature: None,
        }
    }

    /// Creates an encrypted submission still holding its manifest document
    pub fn encrypted(
        path: PathBuf,
        manifest: XmlDocument,
        metadata: SubmissionMetaData,
        cipher_factory: CipherFactory,
        signature: Vec<u8>,
    ) -> Self {
        let mut submission = Self::plain(path, manifest, metadata);
        submission.cipher_factory = Some(cipher_factory);
        submission.signature = Some(signature);
        submission
    }

    /// Replaces the manifest with the decrypted payload
    ///
    /// The cipher factory is dropped: it is single use. Metadata keeps the
    /// manifest's values, which are the ones covered by the signature.
    pub fn decrypted(self, document: XmlDocument, staging: TempDir) -> Self {
        Self {
            working_dir: WorkingDir::Staging(staging),
            document,
            cipher_factory: None,
            ..self
        }
    }

    /// Returns a copy with a different validation status
    pub fn with_validation_status(self, validation_status: ValidationStatus) -> Self {
        Self {
            validation_status,
            ..self
        }
    }

    /// Takes the cipher factory out, leaving `None` behind
    pub(crate) fn take_cipher_factory(&mut self) -> Option<CipherFactory> {
        self.cipher_factory.take()
    }

    /// Path of the `submission.xml` this submission was read from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the submission's plaintext files
    pub fn working_dir(&self) -> &Path {
        self.working_dir.path()
    }

    /// Directory the submission was read from
    pub fn source_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn root(&self) -> XmlElement<'_> {
        self.document.root()
    }

    pub fn metadata(&self) -> &SubmissionMetaData {
        &self.metadata
    }

    pub fn instance_id(&self) -> Option<&InstanceId> {
        self.metadata.instance_id.as_ref()
    }

    pub fn submission_date(&self) -> Option<DateTime<FixedOffset>> {
        self.metadata.submission_date
    }

    pub fn validation_status(&self) -> ValidationStatus {
        self.validation_status
    }

    /// Expected signature digest, as recovered from the manifest
    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    /// Row key of the submission in the main table
    ///
    /// Falls back to the instance directory name for forms whose submissions
    /// carry no instance ID.
    pub fn key(&self) -> String {
        match &self.metadata.instance_id {
            Some(id) => id.to_string(),
            None => self
                .source_dir()
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default(),
        }
    }
}
