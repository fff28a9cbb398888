//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers that flow through an export, so a form
//! ID can never be passed where an instance ID is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Form identifier newtype wrapper
///
/// The `id` attribute of a form's primary instance, e.g. `household_survey`.
///
/// # Examples
///
/// ```
/// use formex::domain::ids::FormId;
/// use std::str::FromStr;
///
/// let form_id = FormId::from_str("household_survey").unwrap();
/// assert_eq!(form_id.as_str(), "household_survey");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormId(String);

impl FormId {
    /// Creates a new FormId, rejecting blank values
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Form ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the form ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FormId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for FormId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Instance identifier newtype wrapper
///
/// Identifies one submitted response, typically `uuid:<uuid>`. It doubles as
/// the `KEY` of the submission's main-table row and as the seed of the IV
/// derivation for encrypted submissions.
///
/// # Examples
///
/// ```
/// use formex::domain::ids::InstanceId;
/// use std::str::FromStr;
///
/// let id = InstanceId::from_str("uuid:39f3dd36-161e-45cb-a1a4-395831d253a7").unwrap();
/// assert!(id.as_str().starts_with("uuid:"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(String);

impl InstanceId {
    /// Creates a new InstanceId, rejecting blank values
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Instance ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the instance ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InstanceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for InstanceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
