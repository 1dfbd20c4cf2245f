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

//! Fragments over a materialized document

use super::{Fragment, ReservationTable, Token};
use crate::config::SessionConfig;
use crate::model::{Document, NodeId, NodeKind};
use std::borrow::Cow;

/// A node of a [`Document`] together with the session's reservation table
#[derive(Debug, Clone, Copy)]
pub struct TreeFragment<'a> {
    document: &'a Document,
    node: NodeId,
    reservations: &'a ReservationTable,
    inheritable: bool,
}

impl<'a> TreeFragment<'a> {
    /// Wrap `node`; reservations taken through it stay local to the node
    pub fn new(document: &'a Document, reservations: &'a ReservationTable, node: NodeId) -> Self {
        Self::wrap(document, reservations, node, false)
    }

    /// Wrap `node`; reservations taken through it are inherited by
    /// descendants wrapped afterwards
    pub fn inheritable(
        document: &'a Document,
        reservations: &'a ReservationTable,
        node: NodeId,
    ) -> Self {
        Self::wrap(document, reservations, node, true)
    }

    fn wrap(
        document: &'a Document,
        reservations: &'a ReservationTable,
        node: NodeId,
        inheritable: bool,
    ) -> Self {
        reservations.inherit(
            u64::from(node.into_raw()),
            document
                .ancestors(node)
                .skip(1)
                .map(|ancestor| u64::from(ancestor.into_raw())),
        );
        Self {
            document,
            node,
            reservations,
            inheritable,
        }
    }

    /// Underlying node
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Underlying document
    pub fn document(&self) -> &'a Document {
        self.document
    }
}

impl Fragment for TreeFragment<'_> {
    fn id(&self) -> u64 {
        u64::from(self.node.into_raw())
    }

    fn is_document(&self) -> bool {
        matches!(self.document.node(self.node).kind, NodeKind::Document)
    }

    fn local_name(&self) -> Option<&str> {
        self.document.local_name(self.node)
    }

    fn namespace(&self) -> Option<&str> {
        self.document.namespace(self.node)
    }

    fn attribute(&self, local: &str, namespace: Option<&str>) -> Option<&str> {
        self.document.attribute(self.node, local, namespace)
    }

    fn text(&self) -> Cow<'_, str> {
        self.document.text(self.node)
    }

    fn index(&self) -> usize {
        self.document.element_index(self.node)
    }

    fn parent(&self) -> Option<Self> {
        let parent = self.document.parent(self.node)?;
        if !self.document.is_element(parent) {
            return None;
        }
        Some(Self::wrap(
            self.document,
            self.reservations,
            parent,
            self.inheritable,
        ))
    }

    fn reserve(&self, id: u64, token: Token) -> bool {
        self.reservations
            .reserve(self.id(), id, token, self.inheritable)
    }

    fn release(&self, id: u64, token: Token) -> bool {
        self.reservations.release(self.id(), id, token)
    }

    fn reserved_by(&self, id: u64) -> Option<Token> {
        self.reservations.get(self.id(), id).map(|r| r.token)
    }
}

/// One pass over one document: the document, its reservation table and the
/// session settings
#[derive(Debug)]
pub struct TreeSession<'a> {
    document: &'a Document,
    reservations: ReservationTable,
    config: SessionConfig,
}

impl<'a> TreeSession<'a> {
    /// Start a session with default settings
    pub fn new(document: &'a Document) -> Self {
        Self::with_config(document, SessionConfig::default())
    }

    /// Start a session with explicit settings
    pub fn with_config(document: &'a Document, config: SessionConfig) -> Self {
        Self {
            document,
            reservations: ReservationTable::new(),
            config,
        }
    }

    /// Wrap a node of the session's document
    pub fn fragment(&self, node: NodeId) -> TreeFragment<'_> {
        TreeFragment::wrap(
            self.document,
            &self.reservations,
            node,
            self.config.inheritable_reservations,
        )
    }

    /// Wrap the document node
    pub fn document_fragment(&self) -> TreeFragment<'_> {
        self.fragment(self.document.root())
    }

    /// The session's reservation table
    pub fn reservations(&self) -> &ReservationTable {
        &self.reservations
    }

    /// The session's document
    pub fn document(&self) -> &'a Document {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document::with_root("order", |order| {
            order.child("item", |item| {
                item.attr("sku", "1");
            });
            order.child("item", |item| {
                item.attr("sku", "2").child("note", |note| {
                    note.text("fragile");
                });
            });
        })
    }

    #[test]
    fn test_parent_stops_at_document_element() {
        let doc = sample();
        let table = ReservationTable::new();
        let note = doc.elements_named("note").next().unwrap();
        let fragment = TreeFragment::new(&doc, &table, note);

        let chain: Vec<_> = std::iter::successors(Some(fragment), |f| f.parent())
            .map(|f| f.local_name().unwrap_or_default().to_string())
            .collect();
        assert_eq!(chain, vec!["note", "item", "order"]);
    }

    #[test]
    fn test_document_fragment() {
        let doc = sample();
        let session = TreeSession::new(&doc);
        let fragment = session.document_fragment();
        assert!(fragment.is_document());
        assert_eq!(fragment.local_name(), None);
        assert!(fragment.parent().is_none());
    }

    #[test]
    fn test_index_and_attributes() {
        let doc = sample();
        let session = TreeSession::new(&doc);
        let second = session.fragment(doc.elements_named("item").nth(1).unwrap());
        assert_eq!(second.index(), 2);
        assert_eq!(second.attribute("sku", None), Some("2"));
        assert_eq!(second.text(), "");
    }

    #[test]
    fn test_inheritable_reservation_reaches_descendants() {
        let doc = sample();
        let config = SessionConfig::default().with_inheritable_reservations(true);
        let session = TreeSession::with_config(&doc, config);
        let token = Token::new(1);

        let order = session.fragment(doc.root_element().unwrap());
        assert!(order.reserve(42, token));

        let note = session.fragment(doc.elements_named("note").next().unwrap());
        assert!(!note.reserve(42, Token::new(2)));
        assert!(note.reserve(42, token));
    }

    #[test]
    fn test_local_reservation_stays_on_node() {
        let doc = sample();
        let session = TreeSession::new(&doc);
        let order = session.fragment(doc.root_element().unwrap());
        assert!(order.reserve(42, Token::new(1)));

        let note = session.fragment(doc.elements_named("note").next().unwrap());
        assert!(note.reserve(42, Token::new(2)));
        assert!(!order.reserve(42, Token::new(2)));
    }
}
