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

//! Handler selection by path
//!
//! A [`SelectorTable`] keeps `(path, handler)` bindings bucketed by the
//! element name their target step requires, so that only bindings that can
//! possibly apply are run through the matcher. Selection preserves binding
//! order across buckets.

mod guard;

pub use guard::ReservationGuard;

use crate::ast::{Path, StepKind};
use crate::compiler::PathCompiler;
use crate::config::FragPathConfig;
use crate::core::{EvaluationResult, NamespaceMap, PathCompileError};
use crate::evaluator::EvaluationContext;
use crate::fragment::Fragment;
use crate::matcher::Matcher;
use indexmap::IndexMap;

/// A path bound to a handler
#[derive(Debug, Clone)]
pub struct Binding<H> {
    path: Path,
    handler: H,
    seq: usize,
}

impl<H> Binding<H> {
    /// Bound path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bound handler
    pub fn handler(&self) -> &H {
        &self.handler
    }
}

/// Path bindings indexed by target element name
#[derive(Debug, Clone)]
pub struct SelectorTable<H> {
    by_element: IndexMap<String, Vec<Binding<H>>>,
    wildcard: Vec<Binding<H>>,
    document: Vec<Binding<H>>,
    next_seq: usize,
    compiler: PathCompiler,
    matcher: Matcher,
}

impl<H> Default for SelectorTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> SelectorTable<H> {
    /// Empty table with default settings
    pub fn new() -> Self {
        Self::with_config(&FragPathConfig::default())
    }

    /// Empty table using the compile and matcher settings of `config`
    pub fn with_config(config: &FragPathConfig) -> Self {
        Self {
            by_element: IndexMap::new(),
            wildcard: Vec::new(),
            document: Vec::new(),
            next_seq: 0,
            compiler: PathCompiler::new(config.compile.clone()),
            matcher: Matcher::new(config.matcher.clone()),
        }
    }

    /// Use a specific compiler for [`SelectorTable::bind_selector`]
    pub fn with_compiler(mut self, compiler: PathCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// Bind an already compiled path
    pub fn bind(&mut self, path: Path, handler: H) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let binding = Binding { path, handler, seq };

        match binding.path.target_step().map(|step| step.kind()) {
            Some(StepKind::Named(name)) => self
                .by_element
                .entry(name.clone())
                .or_default()
                .push(binding),
            Some(StepKind::DocumentRoot) => self.document.push(binding),
            _ => self.wildcard.push(binding),
        }
    }

    /// Compile `selector` and bind it
    pub fn bind_selector(
        &mut self,
        selector: &str,
        namespaces: &NamespaceMap,
        handler: H,
    ) -> Result<(), PathCompileError> {
        let path = self.compiler.compile(selector, namespaces)?;
        self.bind(path, handler);
        Ok(())
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.by_element.values().map(Vec::len).sum::<usize>()
            + self.wildcard.len()
            + self.document.len()
    }

    /// No bindings
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bindings whose target step is plausible for `fragment`, in binding order
    ///
    /// Only names and namespaces are checked; predicates and ancestry are not.
    /// The namespace check follows [`Path::namespace_uri`] when it is set.
    pub fn candidates<F: Fragment>(&self, fragment: &F) -> Vec<&Binding<H>> {
        let mut candidates: Vec<&Binding<H>> = if fragment.is_document() {
            self.document.iter().collect()
        } else {
            let named = fragment
                .local_name()
                .and_then(|name| self.by_element.get(name))
                .map(Vec::as_slice)
                .unwrap_or_default();
            named.iter().chain(self.wildcard.iter()).collect()
        };
        candidates.retain(|binding| {
            let Some(step) = binding.path.target_step() else {
                return false;
            };
            // A path-level namespace replaces the target step's own.
            match binding.path.namespace_uri() {
                Some(uri) => fragment.namespace() == Some(uri) && step.accepts_name(fragment),
                None => fragment.is_plausible_target(step),
            }
        });
        candidates.sort_by_key(|binding| binding.seq);
        candidates
    }

    /// Handlers whose paths match `fragment`, in binding order
    pub fn select<F: Fragment + Clone>(
        &self,
        fragment: &F,
        ctx: &EvaluationContext,
    ) -> EvaluationResult<Vec<&H>> {
        let mut selected = Vec::new();
        for binding in self.candidates(fragment) {
            if self.matcher.is_match(&binding.path, fragment, ctx)? {
                selected.push(&binding.handler);
            }
        }
        log::trace!(
            "fragment {} selected {} handler(s)",
            fragment.id(),
            selected.len()
        );
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::TreeSession;
    use crate::model::Document;

    fn table() -> SelectorTable<&'static str> {
        let ns = NamespaceMap::new();
        let mut table = SelectorTable::new();
        table.bind_selector("**/item", &ns, "any-item").unwrap();
        table.bind_selector("*", &ns, "any").unwrap();
        table.bind_selector("order/item", &ns, "order-item").unwrap();
        table.bind_selector("/", &ns, "document").unwrap();
        table.bind_selector("note", &ns, "note").unwrap();
        table
    }

    #[test]
    fn test_select_keeps_binding_order() {
        let doc = Document::with_root("order", |order| {
            order.child("item", |_| {});
        });
        let session = TreeSession::new(&doc);
        let table = table();
        assert_eq!(table.len(), 5);

        let item = session.fragment(doc.elements_named("item").next().unwrap());
        let selected = table.select(&item, &EvaluationContext::new()).unwrap();
        assert_eq!(selected, vec![&"any-item", &"any", &"order-item"]);

        let document = table
            .select(&session.document_fragment(), &EvaluationContext::new())
            .unwrap();
        assert_eq!(document, vec![&"document"]);
    }

    #[test]
    fn test_candidates_skip_other_names() {
        let doc = Document::with_root("order", |_| {});
        let session = TreeSession::new(&doc);
        let table = table();
        let order = session.fragment(doc.root_element().unwrap());
        let names: Vec<_> = table
            .candidates(&order)
            .into_iter()
            .map(|binding| *binding.handler())
            .collect();
        assert_eq!(names, vec!["any"]);
    }

    #[test]
    fn test_path_namespace_uri_agrees_with_matcher() {
        let doc = Document::with_root("root", |root| {
            root.child_ns("http://a", "item", |_| {});
        });
        let session = TreeSession::new(&doc);
        let item = session.fragment(doc.elements_named("item").next().unwrap());
        let ctx = EvaluationContext::new();

        let namespaces = NamespaceMap::new().with("p", "http://p");
        let rescoped = Path::compile("p:item", &namespaces)
            .unwrap()
            .with_namespace_uri("http://a");
        let elsewhere = Path::compile("item", &NamespaceMap::new())
            .unwrap()
            .with_namespace_uri("http://b");

        let mut table = SelectorTable::new();
        table.bind(rescoped.clone(), "rescoped");
        table.bind(elsewhere.clone(), "elsewhere");

        let matcher = Matcher::default();
        assert!(matcher.is_match(&rescoped, &item, &ctx).unwrap());
        assert!(!matcher.is_match(&elsewhere, &item, &ctx).unwrap());
        assert_eq!(table.select(&item, &ctx).unwrap(), vec![&"rescoped"]);
    }
}
