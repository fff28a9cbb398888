//! Loaders for the files an export starts from
//!
//! - [`xform`] - XForm definitions into a [`FormDefinition`](crate::core::model::FormDefinition)
//! - [`keys`] - PEM private keys for encrypted forms

pub mod keys;
pub mod xform;

pub use keys::load_private_key;
pub use xform::{load_form_definition, parse_form_definition};
