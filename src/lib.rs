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

//! Selector paths and fragment matching for document transformation
//!
//! fragpath compiles small XPath-like selectors (`order/**/item[@sku = 'A1']`,
//! `/#document`, `*/@id`) into immutable [`Path`] values and decides whether a
//! document fragment, in the context of its ancestors, satisfies them. The
//! same [`Matcher`] runs over a fully materialized tree
//! ([`model::Document`]) and over the open-element stack of an event stream
//! ([`model::StreamCursor`]) and gives identical answers for both.
//!
//! Fragments also carry a token-guarded reservation protocol used to keep a
//! handler from being invoked twice on the same fragment during nested
//! processing.
//!
//! ```rust
//! use fragpath::model::Document;
//! use fragpath::{EvaluationContext, Matcher, NamespaceMap, Path, TreeSession};
//!
//! let doc = Document::with_root("order", |order| {
//!     order.child("item", |item| {
//!         item.attr("sku", "A1");
//!     });
//! });
//! let path = Path::compile("order/item[@sku = 'A1']", &NamespaceMap::new()).unwrap();
//!
//! let session = TreeSession::new(&doc);
//! let item = session.fragment(doc.elements_named("item").next().unwrap());
//! assert!(Matcher::default().is_match(&path, &item, &EvaluationContext::new()).unwrap());
//! ```

#![warn(missing_docs)]

pub mod ast;
pub mod compiler;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod evaluator;
pub mod fragment;
pub mod matcher;
pub mod model;
pub mod parser;

pub use ast::{Path, Step, StepKind};
pub use compiler::PathCompiler;
pub use config::{CompileConfig, FragPathConfig, MatcherConfig, SessionConfig};
pub use crate::core::{
    ConfigError, EvaluationError, EvaluationResult, FragPathError, NamespaceMap,
    PathCompileError, QualifiedName, Result, StreamError,
};
pub use dispatch::{ReservationGuard, SelectorTable};
pub use evaluator::{
    BuiltinPredicateCompiler, Condition, EvaluationContext, Predicate, PredicateCompiler,
};
pub use fragment::{Fragment, ReservationTable, StreamFragment, Token, TreeFragment, TreeSession};
pub use matcher::Matcher;
pub use parser::{ParseError, UnresolvedPath};
