//! XForm definition loader
//!
//! Reads the parts of an XForm the export needs:
//! - the primary instance, which gives the shape of the schema tree
//! - `bind` types keyed by nodeset
//! - `repeat` nodesets in the body (and `jr:template` markers in the instance)
//! - `select` / `select1` choice values
//! - the title, form id and version
//! - `submission/@base64RsaPublicKey`, which marks the form as encrypted
//! - `bind/@encrypted`, which marks single fields as encrypted

use crate::core::model::{DataType, FormDefinition, FormModelBuilder, ModelId};
use crate::domain::errors::FormexError;
use crate::domain::ids::FormId;
use crate::domain::Result;
use roxmltree::{Document, Node};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;

/// Loads and parses an XForm definition file
///
/// # Errors
///
/// Returns [`FormexError::Form`] when the file cannot be read or is not a
/// usable XForm.
pub fn load_form_definition(path: impl AsRef<Path>) -> Result<FormDefinition> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        FormexError::Form(format!(
            "Failed to read form definition {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_form_definition(&text)
        .map_err(|e| FormexError::Form(format!("{}: {}", path.display(), e)))
}

/// Parses XForm text into a [`FormDefinition`]
pub fn parse_form_definition(text: &str) -> std::result::Result<FormDefinition, String> {
    let document = Document::parse(text).map_err(|e| format!("invalid XML: {e}"))?;

    let model = descendant(document.root(), "model").ok_or("no <model> element")?;
    let instance = model
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "instance")
        .find(|n| n.attribute("id").is_none())
        .ok_or("no primary <instance> in <model>")?;
    let instance_root = instance
        .children()
        .find(|n| n.is_element())
        .ok_or("primary instance is empty")?;

    let form_id = instance_root
        .attribute("id")
        .ok_or("primary instance root has no id attribute")
        .and_then(|id| FormId::new(id).map_err(|_| "primary instance root has an empty id"))?;
    let version = instance_root
        .attribute("version")
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let name = descendant(document.root(), "title")
        .and_then(|title| title.text())
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| form_id.to_string());

    let encrypted = model
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "submission")
        .any(|n| {
            n.attribute("base64RsaPublicKey")
                .is_some_and(|key| !key.trim().is_empty())
        });

    let hints = BodyHints::collect(document.root(), model);

    let mut builder = FormModelBuilder::new(instance_root.tag_name().name());
    let root_path = format!("/{}", instance_root.tag_name().name());
    let root_id = builder.root();
    add_children(&mut builder, &hints, instance_root, root_id, &root_path);

    let field_encrypted = !hints.encrypted_fields.is_empty();

    tracing::debug!(
        form_id = %form_id,
        binds = hints.types.len(),
        repeats = hints.repeats.len(),
        encrypted,
        encrypted_fields = hints.encrypted_fields.len(),
        "Parsed form definition"
    );

    Ok(FormDefinition {
        form_id,
        name,
        version,
        encrypted,
        field_encrypted,
        model: builder.build(),
    })
}

/// Facts about instance nodes gathered from binds and the body
#[derive(Debug, Default)]
struct BodyHints {
    types: HashMap<String, DataType>,
    repeats: HashSet<String>,
    choices: HashMap<String, Vec<String>>,
    encrypted_fields: HashSet<String>,
}

impl BodyHints {
    fn collect(root: Node<'_, '_>, model: Node<'_, '_>) -> Self {
        let mut hints = BodyHints::default();

        for bind in model
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "bind")
        {
            let Some(nodeset) = bind.attribute("nodeset") else {
                continue;
            };
            if is_encrypted_bind(bind) {
                hints.encrypted_fields.insert(normalize(nodeset));
            }
            if let Some(Ok(data_type)) = bind.attribute("type").map(DataType::from_str) {
                hints.types.insert(normalize(nodeset), data_type);
            }
        }

        for node in root.descendants().filter(|n| n.is_element()) {
            match node.tag_name().name() {
                "repeat" => {
                    if let Some(nodeset) = node.attribute("nodeset") {
                        hints.repeats.insert(normalize(nodeset));
                    }
                }
                control @ ("select" | "select1") => {
                    let Some(reference) = node.attribute("ref").map(normalize) else {
                        continue;
                    };
                    let values: Vec<String> = node
                        .children()
                        .filter(|n| n.is_element() && n.tag_name().name() == "item")
                        .filter_map(|item| {
                            item.children()
                                .find(|n| n.is_element() && n.tag_name().name() == "value")
                                .and_then(|v| v.text())
                                .map(|v| v.trim().to_string())
                        })
                        .filter(|v| !v.is_empty())
                        .collect();
                    let data_type = if control == "select" {
                        DataType::ChoiceList
                    } else {
                        DataType::Choice
                    };
                    // Binds usually say "string"; the control is more precise
                    let entry = hints.types.entry(reference.clone()).or_insert(data_type);
                    if *entry == DataType::Text {
                        *entry = data_type;
                    }
                    hints.choices.insert(reference, values);
                }
                _ => {}
            }
        }

        hints
    }
}

fn add_children(
    builder: &mut FormModelBuilder,
    hints: &BodyHints,
    element: Node<'_, '_>,
    parent: ModelId,
    parent_path: &str,
) {
    let mut seen: HashSet<&str> = HashSet::new();

    for child in element.children().filter(|n| n.is_element()) {
        let name = child.tag_name().name();
        // Repeats may list a template plus default instances
        if !seen.insert(name) {
            continue;
        }
        let path = format!("{parent_path}/{name}");

        let is_template = child.attributes().any(|a| a.name() == "template");
        if hints.repeats.contains(&path) || is_template {
            let id = builder.add_repeat(parent, name);
            add_children(builder, hints, child, id, &path);
        } else if child.children().any(|n| n.is_element()) {
            let id = builder.add_group(parent, name);
            add_children(builder, hints, child, id, &path);
        } else {
            let data_type = hints.types.get(&path).copied().unwrap_or_default();
            let id = builder.add_field(parent, name, data_type);
            if let Some(choices) = hints.choices.get(&path) {
                builder.set_choices(id, choices.clone());
            }
        }
    }
}

/// `encrypted="true()"` in any namespace; `true` and `yes` are accepted too
fn is_encrypted_bind(bind: Node<'_, '_>) -> bool {
    bind.attributes()
        .filter(|a| a.name() == "encrypted")
        .any(|a| matches!(a.value().trim(), "true()" | "true" | "yes"))
}

fn descendant<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

/// Strips whitespace and a trailing slash from an absolute nodeset
fn normalize(nodeset: &str) -> String {
    nodeset.trim().trim_end_matches('/').to_string()
}
