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

//! Uniform handles over document nodes
//!
//! A [`Fragment`] is what the matcher sees: a name, attributes, direct text,
//! a position among same-named siblings and a way up to the parent. Two
//! implementations exist, [`TreeFragment`] over a materialized
//! [`Document`](crate::model::Document) and [`StreamFragment`] over the open
//! element stack of a [`StreamCursor`](crate::model::StreamCursor). Both must
//! give identical answers for the same document.

mod reservation;
mod stream;
mod tree;

pub use reservation::{Reservation, ReservationTable, Token};
pub use stream::StreamFragment;
pub use tree::{TreeFragment, TreeSession};

use crate::ast::Step;
use std::borrow::Cow;

/// One node of a document as seen by the matcher
///
/// The document itself is a fragment too ([`Fragment::is_document`]); the
/// document element's `parent` is `None` rather than the document fragment.
pub trait Fragment {
    /// Stable identity within the current pass
    fn id(&self) -> u64;

    /// Is this the document node
    fn is_document(&self) -> bool;

    /// Element local name; `None` for the document
    fn local_name(&self) -> Option<&str>;

    /// Element namespace URI
    fn namespace(&self) -> Option<&str>;

    /// Attribute value by local name and namespace
    fn attribute(&self, local: &str, namespace: Option<&str>) -> Option<&str>;

    /// Concatenated direct text content
    fn text(&self) -> Cow<'_, str>;

    /// 1-based position among preceding siblings with the same name
    fn index(&self) -> usize;

    /// Parent element, `None` at the document element and for the document
    fn parent(&self) -> Option<Self>
    where
        Self: Sized;

    /// Claim reservation `id` for `token`
    fn reserve(&self, id: u64, token: Token) -> bool;

    /// Give up reservation `id` if `token` holds it
    fn release(&self, id: u64, token: Token) -> bool;

    /// Token currently holding reservation `id`, if tracked
    fn reserved_by(&self, _id: u64) -> Option<Token> {
        None
    }

    /// Name and namespace check against a step, without predicates or ancestry
    fn is_plausible_target(&self, step: &Step) -> bool {
        step.is_plausible(self)
    }
}
