//! Owned XML element tree
//!
//! Submissions are parsed once with `roxmltree` and copied into an owned arena
//! so they can outlive the source text and move freely between worker threads.
//! [`XmlElement`] is a cheap `Copy` handle into that arena.

use std::fmt;

#[derive(Debug, Clone)]
struct XmlNode {
    name: String,
    namespace: Option<String>,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// A parsed XML document stored as an arena of elements
///
/// Index 0 is always the document's root element.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    nodes: Vec<XmlNode>,
}

impl XmlDocument {
    /// Parses XML text into an owned document
    ///
    /// # Errors
    ///
    /// Returns the parser's message when the text is not well-formed XML.
    pub fn parse(text: &str) -> Result<Self, String> {
        let doc = roxmltree::Document::parse(text).map_err(|e| e.to_string())?;
        let mut nodes = Vec::new();
        copy_element(doc.root_element(), None, &mut nodes);
        Ok(Self { nodes })
    }

    /// Returns the document's root element
    pub fn root(&self) -> XmlElement<'_> {
        XmlElement {
            doc: self,
            index: 0,
        }
    }
}

fn copy_element(node: roxmltree::Node<'_, '_>, parent: Option<usize>, nodes: &mut Vec<XmlNode>) {
    let index = nodes.len();
    let has_element_children = node.children().any(|c| c.is_element());
    let text = if has_element_children {
        None
    } else {
        let text: String = node
            .children()
            .filter(|c| c.is_text())
            .filter_map(|c| c.text())
            .collect();
        Some(text)
    };

    nodes.push(XmlNode {
        name: node.tag_name().name().to_string(),
        namespace: node.tag_name().namespace().map(str::to_string),
        attributes: node
            .attributes()
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect(),
        text,
        parent,
        children: Vec::new(),
    });

    if let Some(parent) = parent {
        nodes[parent].children.push(index);
    }

    for child in node.children().filter(|c| c.is_element()) {
        copy_element(child, Some(index), nodes);
    }
}

/// Navigable handle to one element of an [`XmlDocument`]
#[derive(Clone, Copy)]
pub struct XmlElement<'a> {
    doc: &'a XmlDocument,
    index: usize,
}

impl<'a> XmlElement<'a> {
    fn node(&self) -> &'a XmlNode {
        &self.doc.nodes[self.index]
    }

    fn at(&self, index: usize) -> XmlElement<'a> {
        XmlElement {
            doc: self.doc,
            index,
        }
    }

    /// Local name of the element (namespace prefix stripped)
    pub fn name(&self) -> &'a str {
        &self.node().name
    }

    /// Namespace URI, if the element is namespaced
    pub fn namespace(&self) -> Option<&'a str> {
        self.node().namespace.as_deref()
    }

    /// Value of an attribute matched by local name
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.node()
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Text value of a leaf element
    ///
    /// Empty text and elements with element children both count as absent.
    pub fn value(&self) -> Option<&'a str> {
        self.node().text.as_deref().filter(|text| !text.is_empty())
    }

    /// Whether this is the document root
    pub fn is_root(&self) -> bool {
        self.node().parent.is_none()
    }

    /// Parent element, `None` for the root
    pub fn parent(&self) -> Option<XmlElement<'a>> {
        self.node().parent.map(|index| self.at(index))
    }

    /// Direct element children in document order
    pub fn children(&self) -> impl Iterator<Item = XmlElement<'a>> + 'a {
        let doc = self.doc;
        self.node()
            .children
            .iter()
            .map(move |&index| XmlElement { doc, index })
    }

    /// Whether the element has element children
    pub fn has_children(&self) -> bool {
        !self.node().children.is_empty()
    }

    /// Fully-qualified name: ancestor names joined with `-`, root excluded
    pub fn fqn(&self) -> String {
        let mut names = Vec::new();
        let mut current = Some(*self);
        while let Some(element) = current {
            if element.is_root() {
                break;
            }
            names.push(element.name());
            current = element.parent();
        }
        names.reverse();
        names.join("-")
    }

    /// First direct child with the given local name
    pub fn find_element(&self, name: &str) -> Option<XmlElement<'a>> {
        self.children().find(|child| child.name() == name)
    }

    /// All direct children with the given local name
    pub fn find_elements(&self, name: &str) -> Vec<XmlElement<'a>> {
        self.children().filter(|child| child.name() == name).collect()
    }

    /// All descendants reachable by following `path` one level per segment
    ///
    /// Every segment may match several siblings, so the result fans out across
    /// repeated elements at any level.
    pub fn find_elements_path<S: AsRef<str>>(&self, path: &[S]) -> Vec<XmlElement<'a>> {
        let mut current = vec![*self];
        for segment in path {
            current = current
                .iter()
                .flat_map(|element| element.find_elements(segment.as_ref()))
                .collect();
            if current.is_empty() {
                break;
            }
        }
        current
    }

    /// First element reachable by `path`
    pub fn find_element_path<S: AsRef<str>>(&self, path: &[S]) -> Option<XmlElement<'a>> {
        let mut current = *self;
        for segment in path {
            current = current.find_element(segment.as_ref())?;
        }
        Some(current)
    }

    /// 1-based position among the parent's children sharing this element's name
    pub fn sibling_index(&self) -> usize {
        match self.parent() {
            Some(parent) => {
                parent
                    .children()
                    .filter(|child| child.name() == self.name())
                    .position(|child| child.index == self.index)
                    .unwrap_or(0)
                    + 1
            }
            None => 1,
        }
    }
}

impl fmt::Debug for XmlElement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlElement")
            .field("name", &self.name())
            .field("fqn", &self.fqn())
            .finish()
    }
}
