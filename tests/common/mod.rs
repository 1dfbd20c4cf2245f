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

//! Shared fixtures for integration tests

#![allow(dead_code)]

use fragpath::model::{Document, NodeId, StreamCursor, replay};
use fragpath::{EvaluationContext, FragPathError, Matcher, Path, TreeSession};
use std::collections::BTreeMap;

/// Install a test logger once per process
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// ```text
/// root
/// ├── order id=1
/// │   ├── item sku=A price=10 "apple"
/// │   ├── note
/// │   │   └── item sku=B price=25 "banana"
/// │   └── item sku=C price=7 "cherry"
/// └── order id=2 (urn:shop)
///     └── item sku=D (urn:shop) "date"
/// ```
pub fn shop() -> Document {
    Document::with_root("root", |root| {
        root.child("order", |order| {
            order.attr("id", "1");
            order.child("item", |item| {
                item.attr("sku", "A").attr("price", "10").text("apple");
            });
            order.child("note", |note| {
                note.child("item", |item| {
                    item.attr("sku", "B").attr("price", "25").text("banana");
                });
            });
            order.child("item", |item| {
                item.attr("sku", "C").attr("price", "7").text("cherry");
            });
        });
        root.child_ns("urn:shop", "order", |order| {
            order.attr("id", "2");
            order.child_ns("urn:shop", "item", |item| {
                item.attr("sku", "D").text("date");
            });
        });
    })
}

/// Element with local name `name` and attribute `sku`
pub fn item(doc: &Document, sku: &str) -> NodeId {
    doc.elements_named("item")
        .find(|&id| doc.attribute(id, "sku", None) == Some(sku))
        .unwrap_or_else(|| panic!("no item with sku {sku}"))
}

/// First element named `name`
pub fn first(doc: &Document, name: &str) -> NodeId {
    doc.elements_named(name)
        .next()
        .unwrap_or_else(|| panic!("no element {name}"))
}

/// Match `path` against every element of `doc` in tree mode
pub fn tree_results(
    doc: &Document,
    path: &Path,
    matcher: &Matcher,
    ctx: &EvaluationContext,
) -> BTreeMap<NodeId, bool> {
    let session = TreeSession::new(doc);
    doc.elements()
        .map(|node| {
            let matched = matcher.is_match(path, &session.fragment(node), ctx).unwrap();
            (node, matched)
        })
        .collect()
}

/// Match `path` against every element of `doc` while streaming it
pub fn stream_results(
    doc: &Document,
    path: &Path,
    matcher: &Matcher,
    ctx: &EvaluationContext,
) -> BTreeMap<NodeId, bool> {
    let mut results = BTreeMap::new();
    replay::<FragPathError, _>(doc, |node, fragment| {
        results.insert(node, matcher.is_match(path, &fragment, ctx)?);
        Ok(())
    })
    .unwrap();
    results
}

/// Match `path` against the document node in both modes
pub fn document_results(
    doc: &Document,
    path: &Path,
    matcher: &Matcher,
    ctx: &EvaluationContext,
) -> (bool, bool) {
    let session = TreeSession::new(doc);
    let tree = matcher
        .is_match(path, &session.document_fragment(), ctx)
        .unwrap();
    let cursor = StreamCursor::new();
    let stream = matcher
        .is_match(path, &cursor.document_fragment(), ctx)
        .unwrap();
    (tree, stream)
}

/// Local names of the elements `path` matches, in document order
pub fn matched_names(doc: &Document, results: &BTreeMap<NodeId, bool>) -> Vec<String> {
    doc.elements()
        .filter(|node| results.get(node).copied().unwrap_or(false))
        .map(|node| {
            let name = doc.local_name(node).unwrap_or_default();
            match doc.attribute(node, "sku", None) {
                Some(sku) => format!("{name}:{sku}"),
                None => name.to_string(),
            }
        })
        .collect()
}
