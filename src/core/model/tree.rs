//! Schema tree
//!
//! Nodes live in a vector and refer to each other by index. Node 0 is the
//! root, which stands for the form's primary instance element and never
//! contributes to fully-qualified names.

use super::data_type::DataType;
use std::collections::HashSet;

/// Index of a node inside a [`FormModel`]
pub type ModelId = usize;

/// Structural role of a schema node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Field,
    Group,
    RepeatGroup,
}

#[derive(Debug, Clone)]
struct ModelNode {
    name: String,
    kind: NodeKind,
    data_type: DataType,
    parent: Option<ModelId>,
    children: Vec<ModelId>,
    choices: Vec<String>,
}

/// Immutable schema tree of a form
#[derive(Debug, Clone)]
pub struct FormModel {
    nodes: Vec<ModelNode>,
}

impl FormModel {
    /// Handle to the root node
    pub fn root(&self) -> Model<'_> {
        Model { form: self, id: 0 }
    }

    /// Handle to an arbitrary node
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this model.
    pub fn get(&self, id: ModelId) -> Model<'_> {
        assert!(id < self.nodes.len(), "model id {id} out of range");
        Model { form: self, id }
    }

    /// Every repeating group of the form, in schema order
    pub fn repeatable_fields(&self) -> Vec<Model<'_>> {
        self.root()
            .flatten()
            .into_iter()
            .filter(|model| model.is_repeatable())
            .collect()
    }

    /// Whether the form has at least one repeating group
    pub fn has_repeatable_fields(&self) -> bool {
        self.nodes.iter().any(|n| n.kind == NodeKind::RepeatGroup)
    }
}

/// Builder for [`FormModel`]
#[derive(Debug, Clone)]
pub struct FormModelBuilder {
    nodes: Vec<ModelNode>,
}

impl FormModelBuilder {
    /// Starts a tree whose root is named after the instance element
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![ModelNode {
                name: root_name.into(),
                kind: NodeKind::Root,
                data_type: DataType::Text,
                parent: None,
                children: Vec::new(),
                choices: Vec::new(),
            }],
        }
    }

    /// The root node's id
    pub fn root(&self) -> ModelId {
        0
    }

    fn push(&mut self, parent: ModelId, name: String, kind: NodeKind, data_type: DataType) -> ModelId {
        let id = self.nodes.len();
        self.nodes.push(ModelNode {
            name,
            kind,
            data_type,
            parent: Some(parent),
            children: Vec::new(),
            choices: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    /// Adds a leaf field under `parent`
    pub fn add_field(&mut self, parent: ModelId, name: impl Into<String>, data_type: DataType) -> ModelId {
        self.push(parent, name.into(), NodeKind::Field, data_type)
    }

    /// Adds a non-repeating group under `parent`
    pub fn add_group(&mut self, parent: ModelId, name: impl Into<String>) -> ModelId {
        self.push(parent, name.into(), NodeKind::Group, DataType::Text)
    }

    /// Adds a repeating group under `parent`
    pub fn add_repeat(&mut self, parent: ModelId, name: impl Into<String>) -> ModelId {
        self.push(parent, name.into(), NodeKind::RepeatGroup, DataType::Text)
    }

    /// Sets the choice values of a select field
    pub fn set_choices(&mut self, id: ModelId, choices: Vec<String>) {
        self.nodes[id].choices = choices;
    }

    pub fn build(self) -> FormModel {
        FormModel { nodes: self.nodes }
    }
}

/// Navigation handle to one schema node
#[derive(Clone, Copy)]
pub struct Model<'a> {
    form: &'a FormModel,
    id: ModelId,
}

impl<'a> Model<'a> {
    fn node(&self) -> &'a ModelNode {
        &self.form.nodes[self.id]
    }

    fn at(&self, id: ModelId) -> Model<'a> {
        Model { form: self.form, id }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn name(&self) -> &'a str {
        &self.node().name
    }

    pub fn kind(&self) -> NodeKind {
        self.node().kind
    }

    pub fn data_type(&self) -> DataType {
        self.node().data_type
    }

    pub fn choices(&self) -> &'a [String] {
        &self.node().choices
    }

    pub fn is_root(&self) -> bool {
        self.kind() == NodeKind::Root
    }

    pub fn is_field(&self) -> bool {
        self.kind() == NodeKind::Field
    }

    /// Non-repeating group
    pub fn is_group(&self) -> bool {
        self.kind() == NodeKind::Group
    }

    pub fn is_repeatable(&self) -> bool {
        self.kind() == NodeKind::RepeatGroup
    }

    pub fn parent(&self) -> Option<Model<'a>> {
        self.node().parent.map(|id| self.at(id))
    }

    /// Children in schema order, keeping the first of any FQN duplicates
    pub fn children(&self) -> Vec<Model<'a>> {
        let mut seen = HashSet::new();
        self.node()
            .children
            .iter()
            .map(|&id| self.at(id))
            .filter(|child| seen.insert(child.fqn(0)))
            .collect()
    }

    /// This node and every descendant, depth first
    pub fn flatten(&self) -> Vec<Model<'a>> {
        let mut nodes = vec![*self];
        for child in self.children() {
            nodes.extend(child.flatten());
        }
        nodes
    }

    /// Names from the first level below the root down to this node
    pub fn name_path(&self) -> Vec<&'a str> {
        let mut names = Vec::new();
        let mut current = Some(*self);
        while let Some(model) = current {
            if model.is_root() {
                break;
            }
            names.push(model.name());
            current = model.parent();
        }
        names.reverse();
        names
    }

    /// Number of FQN segments of this node (0 for the root)
    pub fn depth(&self) -> usize {
        self.name_path().len()
    }

    /// Ancestor names joined with `-`, dropping the first `shift` segments
    pub fn fqn(&self, shift: usize) -> String {
        self.name_path()
            .into_iter()
            .skip(shift)
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Closest enclosing repeating group, if any
    pub fn nearest_repeat_ancestor(&self) -> Option<Model<'a>> {
        let mut current = self.parent();
        while let Some(model) = current {
            if model.is_repeatable() {
                return Some(model);
            }
            current = model.parent();
        }
        None
    }

    /// FQN relative to the closest enclosing repeat (or the root)
    pub fn relative_fqn(&self) -> String {
        let shift = self.nearest_repeat_ancestor().map_or(0, |r| r.depth());
        self.fqn(shift)
    }

    /// Column names this node contributes to a table
    pub fn names(&self, shift: usize) -> Vec<String> {
        self.names_with(shift, false)
    }

    /// Column names, optionally expanding select-multiple fields per choice
    pub fn names_with(&self, shift: usize, split_select_multiples: bool) -> Vec<String> {
        let fqn = self.fqn(shift);
        match self.kind() {
            NodeKind::Field if self.data_type() == DataType::Geopoint => vec![
                format!("{fqn}-Latitude"),
                format!("{fqn}-Longitude"),
                format!("{fqn}-Altitude"),
                format!("{fqn}-Accuracy"),
            ],
            NodeKind::Field
                if split_select_multiples
                    && self.data_type() == DataType::ChoiceList
                    && !self.choices().is_empty() =>
            {
                std::iter::once(fqn.clone())
                    .chain(self.choices().iter().map(|choice| format!("{fqn}/{choice}")))
                    .collect()
            }
            NodeKind::RepeatGroup => vec![format!("SET-OF-{fqn}")],
            NodeKind::Group | NodeKind::Root if !self.node().children.is_empty() => self
                .children()
                .iter()
                .flat_map(|child| child.names_with(shift, split_select_multiples))
                .collect(),
            _ => vec![fqn],
        }
    }

    /// Whether this is the `meta/audit` log attachment
    pub fn is_meta_audit(&self) -> bool {
        self.is_field()
            && self.data_type() == DataType::Binary
            && self.name() == "audit"
            && self.parent().map(|p| p.name() == "meta").unwrap_or(false)
    }

    /// Whether an empty value of this field exports as a bare empty cell
    pub fn allows_blank(&self) -> bool {
        self.data_type().allows_blank() || self.fqn(0).starts_with("meta")
    }
}

impl std::fmt::Debug for Model<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("id", &self.id)
            .field("fqn", &self.fqn(0))
            .field("kind", &self.kind())
            .field("data_type", &self.data_type())
            .finish()
    }
}
