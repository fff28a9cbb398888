//! Form-level facts around the schema tree

use super::tree::FormModel;
use crate::domain::ids::FormId;

/// A loaded form: identity, encryption flag and schema tree
#[derive(Debug, Clone)]
pub struct FormDefinition {
    pub form_id: FormId,
    /// Human readable title, used to derive output file names
    pub name: String,
    pub version: Option<String>,
    /// Whether submissions arrive as encryption manifests
    pub encrypted: bool,
    /// Whether some binds ask for their field values to be encrypted
    pub field_encrypted: bool,
    pub model: FormModel,
}

impl FormDefinition {
    /// Whether exporting this form needs the private key
    pub fn requires_private_key(&self) -> bool {
        self.encrypted || self.field_encrypted
    }

    /// Whether rows of this form need a stable instance ID to link tables
    pub fn has_repeats(&self) -> bool {
        self.model.has_repeatable_fields()
    }
}
