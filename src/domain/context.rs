//! Error context extension trait
//!
//! Adds `.context()` and `.with_context()` to any `Result` whose error converts
//! into [`FormexError`], so library code can attach the file or table it was
//! working on without leaving the domain error type.
//!
//! ```rust
//! use formex::domain::Result;
//! use formex::domain::context::ResultExt;
//!
//! fn read_header(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))
//! }
//! ```

use crate::domain::errors::FormexError;
use crate::domain::result::Result;

/// Extension trait for adding context to `Result` types
pub trait ResultExt<T> {
    /// Adds an eagerly built context message to an error
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static;

    /// Adds a lazily built context message to an error
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

/// The variant of the wrapped error is kept where it carries meaning for the
/// caller (configuration errors stay fatal, I/O stays I/O); everything else is
/// folded into [`FormexError::Other`].
fn wrap(error: FormexError, context: impl std::fmt::Display) -> FormexError {
    match error {
        FormexError::Configuration(msg) => FormexError::Configuration(format!("{context}: {msg}")),
        FormexError::Io(msg) => FormexError::Io(format!("{context}: {msg}")),
        FormexError::Export(msg) => FormexError::Export(format!("{context}: {msg}")),
        other => FormexError::Other(format!("{context}: {other}")),
    }
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<FormexError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| wrap(e.into(), context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| wrap(e.into(), f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::CryptoError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_context_keeps_configuration_variant() {
        let result: Result<()> = Err(FormexError::Configuration("no key".to_string()));
        let err = result.context("Loading private key").unwrap_err();

        assert!(matches!(err, FormexError::Configuration(_)));
        assert_eq!(err.to_string(), "Configuration error: Loading private key: no key");
    }

    #[test]
    fn test_with_context_is_lazy() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();

        let result: Result<i32> = Ok(42);
        let result = result.with_context(|| {
            flag.store(true, Ordering::SeqCst);
            "never"
        });

        assert_eq!(result.unwrap(), 42);
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_io_error_with_context() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let result: std::result::Result<(), _> = Err(io_error);
        let err = result.context("Failed to open data.csv").unwrap_err();

        assert!(matches!(err, FormexError::Io(_)));
        assert!(err.to_string().contains("Failed to open data.csv"));
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_context_chaining_on_crypto_error() {
        let result: std::result::Result<(), CryptoError> = Err(CryptoError::InvalidPadding);
        let err = result
            .context("Decrypting payload")
            .context("Exporting uuid:1")
            .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("Exporting uuid:1"));
        assert!(msg.contains("Decrypting payload"));
        assert!(msg.contains("Invalid padding"));
    }
}
