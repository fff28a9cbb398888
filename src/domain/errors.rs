//! Domain error types
//!
//! This module defines the error hierarchy for Formex. Errors fall in three
//! families with different blast radius:
//! - [`FormexError::Configuration`] aborts a whole export before any submission is read
//! - [`SubmissionError`] drops a single submission and the batch continues
//! - [`CryptoError`] never travels alone; it is wrapped into one of the two above
//!   depending on the phase it happened in

use thiserror::Error;

/// Main Formex error type
#[derive(Debug, Error)]
pub enum FormexError {
    /// Configuration-related errors (fatal)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A single submission could not be exported
    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    /// Cryptographic provider failures
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Form definition could not be loaded
    #[error("Form definition error: {0}")]
    Form(String),

    /// Export process errors
    #[error("Export error: {0}")]
    Export(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Per-submission errors
///
/// Any of these drops the offending submission from the export. The batch
/// itself keeps going.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The XML payload could not be parsed
    #[error("Unparsable submission {path}: {reason}")]
    Unparsable { path: String, reason: String },

    /// An element the parser relies on is not present
    #[error("Missing element '{element}' in {path}")]
    MissingElement { path: String, element: String },

    /// An encrypted media file listed in the manifest is not on disk
    #[error("Missing media file {file} referenced by {path}")]
    MissingMedia { path: String, file: String },

    /// A file name read from a submission points outside its directory
    #[error("Refusing file name '{file}' referenced by {path}: not a plain file name")]
    UnsafeFileName { path: String, file: String },

    /// A file could not be decrypted
    #[error("Failed to decrypt {file}: {source}")]
    Decryption {
        file: String,
        #[source]
        source: CryptoError,
    },

    /// The form has repeat groups and the submission has no usable instance ID
    #[error("Submission {path} has no valid instance ID")]
    InvalidInstanceId { path: String },

    /// Filesystem errors while reading or staging a submission
    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },
}

impl SubmissionError {
    /// Builds an [`SubmissionError::Io`] from a path and an I/O error
    pub fn io(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        SubmissionError::Io {
            path: path.as_ref().display().to_string(),
            reason: err.to_string(),
        }
    }
}

/// Cryptographic errors
///
/// These don't expose the underlying crypto crates' error types.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A base64 payload could not be decoded
    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(String),

    /// RSA-OAEP unwrap failed (wrong key or corrupted payload)
    #[error("RSA decryption failed: {0}")]
    RsaDecryption(String),

    /// The unwrapped symmetric key has an unsupported length
    #[error("Unsupported symmetric key length: {0} bytes")]
    UnsupportedKeyLength(usize),

    /// Cipher construction failed
    #[error("Cipher initialization failed: {0}")]
    CipherInit(String),

    /// PKCS#5 padding was malformed after decryption
    #[error("Invalid padding in decrypted data")]
    InvalidPadding,
}

/// Export-specific error details
///
/// Records why a submission was skipped so the summary can report it.
#[derive(Debug, Clone)]
pub struct ExportErrorDetail {
    /// Submission directory or file associated with the error
    pub path: Option<String>,

    /// Instance ID, when it could be read before the failure
    pub instance_id: Option<String>,

    /// Error message
    pub message: String,
}

impl ExportErrorDetail {
    /// Creates a new export error detail
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            path: None,
            instance_id: None,
            message: message.into(),
        }
    }

    /// Sets the submission path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the instance ID
    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }
}

impl From<std::io::Error> for FormexError {
    fn from(err: std::io::Error) -> Self {
        FormexError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for FormexError {
    fn from(err: serde_json::Error) -> Self {
        FormexError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for FormexError {
    fn from(err: toml::de::Error) -> Self {
        FormexError::Configuration(format!("TOML parse error: {err}"))
    }
}
