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

//! Byte ranges of tokens, selector segments and predicate clauses
//!
//! Offsets are relative to the full selector text, so a clause cut out of a
//! segment still points into the original input.

use std::ops::Range;

/// A value together with the byte range it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    /// The value
    pub value: T,
    /// First byte
    pub start: usize,
    /// One past the last byte
    pub end: usize,
}

impl<T> Spanned<T> {
    /// Wrap `value` read from `start..end`
    pub fn new(value: T, start: usize, end: usize) -> Self {
        Self { value, start, end }
    }

    /// Byte range in the selector text
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl<'t> Spanned<&'t str> {
    /// Sub-slice `start..end` of this text, kept in selector coordinates
    pub fn slice(&self, start: usize, end: usize) -> Spanned<&'t str> {
        Spanned::new(&self.value[start..end], self.start + start, self.start + end)
    }

    /// Detach the text from the selector buffer
    pub fn into_owned(self) -> Spanned<String> {
        Spanned::new(self.value.to_string(), self.start, self.end)
    }
}
