// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Arena-backed materialized document tree
//!
//! All nodes live in a `Vec` owned by the [`Document`] and are referenced by
//! [`NodeId`], a newtype over `NonZeroU32`, so `Option<NodeId>` costs nothing
//! extra. Navigation goes through `&Document`, mutation through
//! `&mut Document`.
//!
//! # Examples
//!
//! ```
//! use fragpath::model::tree::Document;
//!
//! let doc = Document::with_root("order", |order| {
//!     order.attr("id", "7").child("item", |item| {
//!         item.text("widget");
//!     });
//! });
//! let order = doc.root_element().unwrap();
//! assert_eq!(doc.local_name(order), Some("order"));
//! assert_eq!(doc.attribute(order, "id", None), Some("7"));
//! ```

use crate::core::QualifiedName;
use std::borrow::Cow;
use std::num::NonZeroU32;

/// A typed index into the document's node arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    #[allow(clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::MIN.saturating_add(index as u32))
    }

    fn as_index(self) -> usize {
        (self.0.get() - 1) as usize
    }

    /// Raw non-zero value, stable for the lifetime of the document
    #[must_use]
    pub fn into_raw(self) -> u32 {
        self.0.get()
    }

    /// Rebuild an id from [`NodeId::into_raw`]; `None` for 0
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }
}

/// An attribute on an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name
    pub name: QualifiedName,
    /// Attribute value
    pub value: String,
}

impl Attribute {
    /// Create an attribute
    pub fn new(name: impl Into<QualifiedName>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Node payload
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The document node; exactly one per document
    Document,
    /// An element
    Element {
        /// Element name
        name: QualifiedName,
        /// Attributes in document order
        attributes: Vec<Attribute>,
    },
    /// Character data
    Text(String),
}

/// Storage for a single node in the arena
#[derive(Debug, Clone)]
pub struct NodeData {
    /// Payload
    pub kind: NodeKind,
    /// Parent node; the document node has none
    pub parent: Option<NodeId>,
    /// First child node
    pub first_child: Option<NodeId>,
    /// Last child node (for O(1) append)
    pub last_child: Option<NodeId>,
    /// Next sibling
    pub next_sibling: Option<NodeId>,
    /// Previous sibling
    pub prev_sibling: Option<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            prev_sibling: None,
        }
    }
}

/// A materialized document
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document holding only the document node
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(64);
        nodes.push(NodeData::new(NodeKind::Document));
        Self {
            nodes,
            root: NodeId::from_index(0),
        }
    }

    /// Create a document with one root element built by `build`
    pub fn with_root(
        name: impl Into<QualifiedName>,
        build: impl FnOnce(&mut ElementBuilder<'_>),
    ) -> Self {
        let mut document = Self::new();
        let element = document.create_element(name);
        let root = document.root;
        document.append_child(root, element);
        build(&mut ElementBuilder {
            document: &mut document,
            node: element,
        });
        document
    }

    /// The document node
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The document element, if present
    #[must_use]
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.root).find(|&id| self.is_element(id))
    }

    /// Node storage for `id`
    ///
    /// # Panics
    ///
    /// Panics if `id` was not created by this document.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    /// Number of nodes, including the document node
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Check whether `id` is an element
    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Element { .. })
    }

    /// Element name
    #[must_use]
    pub fn element_name(&self, id: NodeId) -> Option<&QualifiedName> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Element local name
    #[must_use]
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.element_name(id).map(QualifiedName::local_name)
    }

    /// Element namespace URI
    #[must_use]
    pub fn namespace(&self, id: NodeId) -> Option<&str> {
        self.element_name(id).and_then(QualifiedName::namespace)
    }

    /// Element attributes; empty for other nodes
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.node(id).kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Value of the attribute `local` in `namespace`
    #[must_use]
    pub fn attribute(&self, id: NodeId, local: &str, namespace: Option<&str>) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name.is(local, namespace))
            .map(|a| a.value.as_str())
    }

    /// Concatenated direct text children of a node
    #[must_use]
    pub fn text(&self, id: NodeId) -> Cow<'_, str> {
        let mut texts = self.children(id).filter_map(|child| match &self.node(child).kind {
            NodeKind::Text(text) => Some(text.as_str()),
            _ => None,
        });
        let Some(first) = texts.next() else {
            return Cow::Borrowed("");
        };
        match texts.next() {
            None => Cow::Borrowed(first),
            Some(second) => {
                let mut joined = String::from(first);
                joined.push_str(second);
                texts.for_each(|t| joined.push_str(t));
                Cow::Owned(joined)
            }
        }
    }

    /// 1-based position among preceding siblings with the same name
    #[must_use]
    pub fn element_index(&self, id: NodeId) -> usize {
        let Some(name) = self.element_name(id) else {
            return 1;
        };
        let mut index = 1;
        let mut sibling = self.node(id).prev_sibling;
        while let Some(prev) = sibling {
            if self.element_name(prev) == Some(name) {
                index += 1;
            }
            sibling = self.node(prev).prev_sibling;
        }
        index
    }

    /// Parent of a node
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// First child of a node
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child
    }

    /// Next sibling of a node
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling
    }

    /// Iterator over the children of a node
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.node(id).first_child,
        }
    }

    /// Iterator over a node and its ancestors, ending at the document node
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: Some(id),
        }
    }

    /// Depth-first iterator over all descendants of a node
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            root: id,
            next: self.first_child(id),
        }
    }

    /// All elements in document order
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(self.root).filter(|&id| self.is_element(id))
    }

    /// All elements with the given local name, in document order
    pub fn elements_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.elements().filter(move |&id| self.local_name(id) == Some(local))
    }

    // --- Mutation ---

    fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let index = self.nodes.len();
        self.nodes.push(NodeData::new(kind));
        NodeId::from_index(index)
    }

    /// Allocate a detached element
    pub fn create_element(&mut self, name: impl Into<QualifiedName>) -> NodeId {
        self.create_node(NodeKind::Element {
            name: name.into(),
            attributes: Vec::new(),
        })
    }

    /// Allocate a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.create_node(NodeKind::Text(text.into()))
    }

    /// Set or replace an attribute; ignored for non-elements
    pub fn set_attribute(&mut self, id: NodeId, attribute: Attribute) {
        if let NodeKind::Element { attributes, .. } = &mut self.node_mut(id).kind {
            match attributes.iter_mut().find(|a| a.name == attribute.name) {
                Some(existing) => existing.value = attribute.value,
                None => attributes.push(attribute),
            }
        }
    }

    /// Append a detached node to the end of a parent's child list
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            self.node(child).parent.is_none(),
            "child already has a parent"
        );

        self.node_mut(child).parent = Some(parent);

        if let Some(last) = self.node(parent).last_child {
            self.node_mut(last).next_sibling = Some(child);
            self.node_mut(child).prev_sibling = Some(last);
            self.node_mut(parent).last_child = Some(child);
        } else {
            self.node_mut(parent).first_child = Some(child);
            self.node_mut(parent).last_child = Some(child);
        }
    }
}

/// Nested builder handed to [`Document::with_root`] closures
pub struct ElementBuilder<'d> {
    document: &'d mut Document,
    node: NodeId,
}

impl ElementBuilder<'_> {
    /// Id of the element being built
    pub fn id(&self) -> NodeId {
        self.node
    }

    /// Set an unqualified attribute
    pub fn attr(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.document
            .set_attribute(self.node, Attribute::new(name, value));
        self
    }

    /// Set a namespaced attribute
    pub fn attr_ns(&mut self, namespace: &str, local: &str, value: impl Into<String>) -> &mut Self {
        let name = QualifiedName::with_namespace(namespace, local);
        self.document.set_attribute(self.node, Attribute::new(name, value));
        self
    }

    /// Append a text node
    pub fn text(&mut self, text: impl Into<String>) -> &mut Self {
        let child = self.document.create_text(text);
        self.document.append_child(self.node, child);
        self
    }

    /// Append a child element built by `build`
    pub fn child(
        &mut self,
        name: impl Into<QualifiedName>,
        build: impl FnOnce(&mut ElementBuilder<'_>),
    ) -> &mut Self {
        let child = self.document.create_element(name);
        self.document.append_child(self.node, child);
        build(&mut ElementBuilder {
            document: &mut *self.document,
            node: child,
        });
        self
    }

    /// Append a namespaced child element built by `build`
    pub fn child_ns(
        &mut self,
        namespace: &str,
        local: &str,
        build: impl FnOnce(&mut ElementBuilder<'_>),
    ) -> &mut Self {
        self.child(QualifiedName::with_namespace(namespace, local), build)
    }
}

// --- Iterators ---

/// Iterator over the children of a node
pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).next_sibling;
        Some(current)
    }
}

/// Iterator over a node and its ancestors
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).parent;
        Some(current)
    }
}

/// Depth-first iterator over all descendants of a node
pub struct Descendants<'a> {
    doc: &'a Document,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        if let Some(child) = self.doc.first_child(current) {
            self.next = Some(child);
            return Some(current);
        }

        let mut node = current;
        loop {
            if node == self.root {
                self.next = None;
                break;
            }
            if let Some(sibling) = self.doc.next_sibling(node) {
                self.next = Some(sibling);
                break;
            }
            match self.doc.parent(node) {
                Some(parent) if parent != self.root => node = parent,
                _ => {
                    self.next = None;
                    break;
                }
            }
        }
        Some(current)
    }
}
