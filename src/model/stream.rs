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

//! Streaming cursor over structural events
//!
//! The cursor keeps only the chain of open elements. Each open element is a
//! [`Frame`] holding its name, attributes, the direct text seen so far and its
//! position among same-named siblings. Ids are handed out from a counter and
//! never reused within one cursor.

use super::tree::{Attribute, Document, NodeId, NodeKind};
use crate::core::{QualifiedName, StreamError};
use crate::fragment::StreamFragment;
use rustc_hash::FxHashMap;

/// One structural event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Start of the document
    StartDocument,
    /// Element start with its attributes
    StartElement {
        /// Element name
        name: QualifiedName,
        /// Attributes in document order
        attributes: Vec<Attribute>,
    },
    /// Character data belonging to the innermost open element
    Text(String),
    /// End of the innermost open element
    EndElement,
    /// End of the document
    EndDocument,
}

/// An open element on the cursor stack
#[derive(Debug, Clone)]
pub struct Frame {
    id: u64,
    name: QualifiedName,
    attributes: Vec<Attribute>,
    text: String,
    index: usize,
    child_counts: FxHashMap<QualifiedName, usize>,
}

impl Frame {
    /// Identity assigned when the element started
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Element name
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    /// Attributes
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Value of the attribute `local` in `namespace`
    pub fn attribute(&self, local: &str, namespace: Option<&str>) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.is(local, namespace))
            .map(|a| a.value.as_str())
    }

    /// Direct text received so far
    pub fn text(&self) -> &str {
        &self.text
    }

    /// 1-based position among same-named siblings
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Ancestor stack maintained from structural events
#[derive(Debug, Clone)]
pub struct StreamCursor {
    frames: Vec<Frame>,
    root_counts: FxHashMap<QualifiedName, usize>,
    document_id: u64,
    next_id: u64,
    root_closed: bool,
}

impl Default for StreamCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamCursor {
    /// Create a cursor positioned before the document element
    pub fn new() -> Self {
        Self {
            frames: Vec::with_capacity(16),
            root_counts: FxHashMap::default(),
            document_id: 1,
            next_id: 2,
            root_closed: false,
        }
    }

    /// Number of open elements
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Id of the document fragment
    pub fn document_id(&self) -> u64 {
        self.document_id
    }

    /// Open element at `depth` (0 is the document element)
    pub fn frame(&self, depth: usize) -> Option<&Frame> {
        self.frames.get(depth)
    }

    /// Fragment for the innermost open element
    pub fn current(&self) -> Option<StreamFragment<'_>> {
        self.frames
            .len()
            .checked_sub(1)
            .map(|depth| StreamFragment::element(self, depth))
    }

    /// Fragment for the document itself
    pub fn document_fragment(&self) -> StreamFragment<'_> {
        StreamFragment::document(self)
    }

    /// Open an element, returning its id
    pub fn start_element(
        &mut self,
        name: QualifiedName,
        attributes: Vec<Attribute>,
    ) -> Result<u64, StreamError> {
        if self.frames.is_empty() && self.root_closed {
            return Err(StreamError::MultipleRoots {
                name: name.to_string(),
            });
        }

        let counts = match self.frames.last_mut() {
            Some(parent) => &mut parent.child_counts,
            None => &mut self.root_counts,
        };
        let index = {
            let count = counts.entry(name.clone()).or_insert(0);
            *count += 1;
            *count
        };

        let id = self.next_id;
        self.next_id += 1;
        log::trace!("start {name} id={id} depth={}", self.frames.len());
        self.frames.push(Frame {
            id,
            name,
            attributes,
            text: String::new(),
            index,
            child_counts: FxHashMap::default(),
        });
        Ok(id)
    }

    /// Append character data to the innermost open element
    ///
    /// Text outside the document element is ignored.
    pub fn text(&mut self, text: &str) {
        if let Some(frame) = self.frames.last_mut() {
            frame.text.push_str(text);
        }
    }

    /// Close the innermost open element
    pub fn end_element(&mut self) -> Result<Frame, StreamError> {
        let frame = self.frames.pop().ok_or(StreamError::UnbalancedEnd)?;
        if self.frames.is_empty() {
            self.root_closed = true;
        }
        Ok(frame)
    }

    /// Check that every element was closed
    pub fn end_document(&self) -> Result<(), StreamError> {
        match self.frames.len() {
            0 => Ok(()),
            open => Err(StreamError::Unclosed { open }),
        }
    }

    /// Feed one event
    pub fn apply(&mut self, event: StreamEvent) -> Result<(), StreamError> {
        match event {
            StreamEvent::StartDocument => Ok(()),
            StreamEvent::StartElement { name, attributes } => {
                self.start_element(name, attributes).map(|_| ())
            }
            StreamEvent::Text(text) => {
                self.text(&text);
                Ok(())
            }
            StreamEvent::EndElement => self.end_element().map(|_| ()),
            StreamEvent::EndDocument => self.end_document(),
        }
    }
}

enum Visit {
    Enter(NodeId),
    Exit(NodeId),
}

fn traverse(document: &Document) -> Vec<Visit> {
    let mut visits = Vec::with_capacity(document.node_count() * 2);
    let mut stack = vec![(document.root(), false)];
    while let Some((id, exiting)) = stack.pop() {
        if exiting {
            visits.push(Visit::Exit(id));
            continue;
        }
        visits.push(Visit::Enter(id));
        stack.push((id, true));
        let children: Vec<_> = document.children(id).collect();
        stack.extend(children.into_iter().rev().map(|child| (child, false)));
    }
    visits
}

/// The event sequence equivalent to a materialized document
pub fn events_of(document: &Document) -> Vec<StreamEvent> {
    traverse(document)
        .into_iter()
        .filter_map(|visit| match visit {
            Visit::Enter(id) => match &document.node(id).kind {
                NodeKind::Document => Some(StreamEvent::StartDocument),
                NodeKind::Element { name, attributes } => Some(StreamEvent::StartElement {
                    name: name.clone(),
                    attributes: attributes.clone(),
                }),
                NodeKind::Text(text) => Some(StreamEvent::Text(text.clone())),
            },
            Visit::Exit(id) => match &document.node(id).kind {
                NodeKind::Document => Some(StreamEvent::EndDocument),
                NodeKind::Element { .. } => Some(StreamEvent::EndElement),
                NodeKind::Text(_) => None,
            },
        })
        .collect()
}

/// Stream a materialized document through a fresh cursor
///
/// `on_element` runs just before each element closes, when its text is
/// complete, with the tree node it corresponds to.
pub fn replay<E, F>(document: &Document, mut on_element: F) -> Result<(), E>
where
    E: From<StreamError>,
    F: FnMut(NodeId, StreamFragment<'_>) -> Result<(), E>,
{
    let mut cursor = StreamCursor::new();
    for visit in traverse(document) {
        match visit {
            Visit::Enter(id) => match &document.node(id).kind {
                NodeKind::Document => {}
                NodeKind::Element { name, attributes } => {
                    cursor.start_element(name.clone(), attributes.clone())?;
                }
                NodeKind::Text(text) => cursor.text(text),
            },
            Visit::Exit(id) => match &document.node(id).kind {
                NodeKind::Document => cursor.end_document()?,
                NodeKind::Element { .. } => {
                    if let Some(fragment) = cursor.current() {
                        on_element(id, fragment)?;
                    }
                    cursor.end_element()?;
                }
                NodeKind::Text(_) => {}
            },
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::Fragment;

    #[test]
    fn test_sibling_indexes_and_ids() {
        let mut cursor = StreamCursor::new();
        let root = cursor.start_element("root".into(), vec![]).unwrap();
        let first = cursor.start_element("item".into(), vec![]).unwrap();
        cursor.end_element().unwrap();
        cursor.start_element("note".into(), vec![]).unwrap();
        cursor.end_element().unwrap();
        let second = cursor.start_element("item".into(), vec![]).unwrap();
        assert_eq!(cursor.frame(1).map(Frame::index), Some(2));
        assert!(root < first && first < second);
        assert_ne!(cursor.document_id(), root);
    }

    #[test]
    fn test_text_accumulates_on_innermost() {
        let mut cursor = StreamCursor::new();
        cursor.text("ignored");
        cursor.start_element("a".into(), vec![]).unwrap();
        cursor.text("x");
        cursor.start_element("b".into(), vec![]).unwrap();
        cursor.text("inner");
        cursor.end_element().unwrap();
        cursor.text("y");
        assert_eq!(cursor.current().unwrap().text(), "xy");
    }

    #[test]
    fn test_unbalanced_events() {
        let mut cursor = StreamCursor::new();
        assert_eq!(cursor.end_element().unwrap_err(), StreamError::UnbalancedEnd);
        cursor.start_element("a".into(), vec![]).unwrap();
        assert_eq!(cursor.end_document(), Err(StreamError::Unclosed { open: 1 }));
        cursor.end_element().unwrap();
        assert!(matches!(
            cursor.start_element("b".into(), vec![]),
            Err(StreamError::MultipleRoots { .. })
        ));
    }

    #[test]
    fn test_events_of_document() {
        let doc = Document::with_root("a", |a| {
            a.attr("k", "v").text("t").child("b", |_| {});
        });
        let events = events_of(&doc);
        assert_eq!(
            events,
            vec![
                StreamEvent::StartDocument,
                StreamEvent::StartElement {
                    name: "a".into(),
                    attributes: vec![Attribute::new("k", "v")],
                },
                StreamEvent::Text("t".into()),
                StreamEvent::StartElement {
                    name: "b".into(),
                    attributes: vec![],
                },
                StreamEvent::EndElement,
                StreamEvent::EndElement,
                StreamEvent::EndDocument,
            ]
        );

        let mut cursor = StreamCursor::new();
        for event in events {
            cursor.apply(event).unwrap();
        }
        assert_eq!(cursor.depth(), 0);
    }

    #[test]
    fn test_replay_visits_elements_bottom_up() {
        let doc = Document::with_root("a", |a| {
            a.child("b", |b| {
                b.text("inner");
            });
        });
        let mut seen = Vec::new();
        replay::<StreamError, _>(&doc, |node, fragment| {
            seen.push((
                doc.local_name(node).unwrap().to_string(),
                fragment.local_name().map(str::to_string),
                fragment.text().into_owned(),
            ));
            Ok(())
        })
        .unwrap();
        assert_eq!(
            seen,
            vec![
                ("b".to_string(), Some("b".to_string()), "inner".to_string()),
                ("a".to_string(), Some("a".to_string()), String::new()),
            ]
        );
    }
}
