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

//! Selector and predicate parsing
//!
//! Selectors are read by [`selector`] into unresolved steps. Predicate clause
//! text is tokenized by [`tokenizer`] and parsed by the Pratt parser in
//! [`pratt`] into a [`PredicateExpr`](crate::ast::PredicateExpr).

pub mod error;
pub mod lexer;
pub mod pratt;
pub mod selector;
pub mod span;
pub mod tokenizer;

pub use error::{ParseError, ParseResult};
pub use pratt::parse_predicate;
pub use selector::{UnresolvedAttribute, UnresolvedPath, UnresolvedStep, parse_selector};
pub use span::Spanned;
