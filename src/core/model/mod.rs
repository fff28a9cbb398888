//! Form schema model
//!
//! The schema of a form is a tree of groups and fields stored in an arena
//! ([`FormModel`]) and navigated through cheap [`Model`] handles. It is built
//! once per form and never changes afterwards.
//!
//! - [`data_type`] - Field data types
//! - [`tree`] - The arena, its builder and the navigation handle
//! - [`form`] - Form-level facts (id, name, encryption) around the tree

pub mod data_type;
pub mod form;
pub mod tree;

pub use data_type::DataType;
pub use form::FormDefinition;
pub use tree::{FormModel, FormModelBuilder, Model, ModelId, NodeKind};
