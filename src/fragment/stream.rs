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

//! Fragments over the open-element stack of a stream

use super::{Fragment, Token};
use crate::model::stream::{Frame, StreamCursor};
use std::borrow::Cow;

/// An open element (or the document) of a [`StreamCursor`]
///
/// Only one fragment per element can ever be live, so reservations always
/// succeed and are not recorded.
#[derive(Debug, Clone, Copy)]
pub struct StreamFragment<'c> {
    cursor: &'c StreamCursor,
    depth: Option<usize>,
}

impl<'c> StreamFragment<'c> {
    pub(crate) fn element(cursor: &'c StreamCursor, depth: usize) -> Self {
        Self {
            cursor,
            depth: Some(depth),
        }
    }

    pub(crate) fn document(cursor: &'c StreamCursor) -> Self {
        Self {
            cursor,
            depth: None,
        }
    }

    /// Depth of the element, `None` for the document
    pub fn depth(&self) -> Option<usize> {
        self.depth
    }

    fn frame(&self) -> Option<&'c Frame> {
        self.cursor.frame(self.depth?)
    }
}

impl Fragment for StreamFragment<'_> {
    fn id(&self) -> u64 {
        self.frame()
            .map_or_else(|| self.cursor.document_id(), Frame::id)
    }

    fn is_document(&self) -> bool {
        self.depth.is_none()
    }

    fn local_name(&self) -> Option<&str> {
        self.frame().map(|frame| frame.name().local_name())
    }

    fn namespace(&self) -> Option<&str> {
        self.frame().and_then(|frame| frame.name().namespace())
    }

    fn attribute(&self, local: &str, namespace: Option<&str>) -> Option<&str> {
        self.frame()?.attribute(local, namespace)
    }

    fn text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.frame().map_or("", Frame::text))
    }

    fn index(&self) -> usize {
        self.frame().map_or(1, Frame::index)
    }

    fn parent(&self) -> Option<Self> {
        let depth = self.depth?.checked_sub(1)?;
        Some(Self::element(self.cursor, depth))
    }

    fn reserve(&self, _id: u64, _token: Token) -> bool {
        true
    }

    fn release(&self, _id: u64, _token: Token) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::QualifiedName;
    use crate::model::Attribute;

    #[test]
    fn test_stream_fragment_chain() {
        let mut cursor = StreamCursor::new();
        cursor.start_element("order".into(), vec![]).unwrap();
        cursor
            .start_element(
                QualifiedName::with_namespace("http://a", "item"),
                vec![Attribute::new("sku", "7")],
            )
            .unwrap();
        cursor.text("hello");

        let item = cursor.current().unwrap();
        assert_eq!(item.local_name(), Some("item"));
        assert_eq!(item.namespace(), Some("http://a"));
        assert_eq!(item.attribute("sku", None), Some("7"));
        assert_eq!(item.text(), "hello");
        assert_eq!(item.index(), 1);

        let order = item.parent().unwrap();
        assert_eq!(order.local_name(), Some("order"));
        assert!(order.parent().is_none());
        assert_ne!(order.id(), item.id());
    }

    #[test]
    fn test_stream_reservations_always_succeed() {
        let mut cursor = StreamCursor::new();
        cursor.start_element("a".into(), vec![]).unwrap();
        let fragment = cursor.current().unwrap();
        assert!(fragment.reserve(1, Token::new(1)));
        assert!(fragment.reserve(1, Token::new(2)));
        assert!(fragment.release(1, Token::new(3)));
    }

    #[test]
    fn test_document_fragment() {
        let cursor = StreamCursor::new();
        let doc = cursor.document_fragment();
        assert!(doc.is_document());
        assert_eq!(doc.id(), cursor.document_id());
        assert!(doc.parent().is_none());
        assert_eq!(doc.text(), "");
    }
}
