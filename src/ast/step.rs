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

//! Compiled selector steps

use crate::core::{EvaluationResult, QualifiedName};
use crate::evaluator::{EvaluationContext, Predicate};
use crate::fragment::Fragment;
use std::fmt;

/// What a step matches at its level
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// An element with this local name
    Named(String),
    /// Any single element (`*`)
    Star,
    /// Zero or more element levels (`**`)
    StarStar,
    /// The document itself, above the document element
    DocumentRoot,
}

impl StepKind {
    /// Check if this is the recursive wildcard
    pub fn is_star_star(&self) -> bool {
        matches!(self, StepKind::StarStar)
    }

    /// Check if the kind can be satisfied by an exhausted ancestor chain
    pub fn is_wild_or_root(&self) -> bool {
        matches!(self, StepKind::StarStar | StepKind::DocumentRoot)
    }
}

/// One compiled segment of a selector path
///
/// Steps are immutable once compiled and cheap to clone: the predicate is
/// shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Step {
    kind: StepKind,
    namespace: Option<String>,
    attribute_target: Option<QualifiedName>,
    predicate: Option<Predicate>,
    rooted: bool,
}

impl Step {
    /// A step of the given kind with no constraints
    pub fn new(kind: StepKind) -> Self {
        let rooted = matches!(kind, StepKind::DocumentRoot);
        Self {
            kind,
            namespace: None,
            attribute_target: None,
            predicate: None,
            rooted,
        }
    }

    /// A named element step
    pub fn named(local_name: impl Into<String>) -> Self {
        Self::new(StepKind::Named(local_name.into()))
    }

    /// A single-level wildcard step
    pub fn star() -> Self {
        Self::new(StepKind::Star)
    }

    /// A recursive wildcard step
    pub fn star_star() -> Self {
        Self::new(StepKind::StarStar)
    }

    /// The document root anchor
    pub fn document_root() -> Self {
        Self::new(StepKind::DocumentRoot)
    }

    /// Constrain the step to a namespace URI
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Target an attribute of the element matched by this step
    pub fn with_attribute_target(mut self, attribute: QualifiedName) -> Self {
        self.attribute_target = Some(attribute);
        self
    }

    /// Add a predicate; an existing predicate is combined with `and`
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Anchor the step at the document root
    ///
    /// A recursive wildcard can never be rooted, so the flag is ignored for it.
    pub fn with_rooted(mut self, rooted: bool) -> Self {
        self.rooted = rooted && !self.kind.is_star_star();
        self
    }

    /// What the step matches
    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    /// Local name for named steps
    pub fn local_name(&self) -> Option<&str> {
        match &self.kind {
            StepKind::Named(name) => Some(name),
            _ => None,
        }
    }

    /// Namespace constraint, if any
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Attribute targeted by this step, if any
    pub fn attribute_target(&self) -> Option<&QualifiedName> {
        self.attribute_target.as_ref()
    }

    /// Predicate, if any
    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    /// Is the step anchored at the document root
    pub fn is_rooted(&self) -> bool {
        self.rooted
    }

    /// Does the predicate read text content
    pub fn accesses_text(&self) -> bool {
        self.predicate.as_ref().is_some_and(Predicate::accesses_text)
    }

    /// Name and document-ness check, ignoring namespace
    pub fn accepts_name<F: Fragment + ?Sized>(&self, fragment: &F) -> bool {
        match &self.kind {
            StepKind::DocumentRoot => fragment.is_document(),
            _ if fragment.is_document() => false,
            StepKind::Named(name) => fragment.local_name() == Some(name.as_str()),
            StepKind::Star | StepKind::StarStar => true,
        }
    }

    /// Namespace check; an unconstrained step accepts any namespace
    pub fn accepts_namespace<F: Fragment + ?Sized>(&self, fragment: &F) -> bool {
        match &self.namespace {
            Some(ns) => fragment.namespace() == Some(ns.as_str()),
            None => true,
        }
    }

    /// Cheap name/namespace check performed before any predicate
    pub fn is_plausible<F: Fragment + ?Sized>(&self, fragment: &F) -> bool {
        self.accepts_name(fragment) && self.accepts_namespace(fragment)
    }

    /// Evaluate the predicate; a step without one accepts everything
    pub fn evaluate_predicate(
        &self,
        fragment: &dyn Fragment,
        ctx: &EvaluationContext,
    ) -> EvaluationResult<bool> {
        match &self.predicate {
            Some(predicate) => predicate.evaluate(fragment, ctx),
            None => Ok(true),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ns) = &self.namespace {
            write!(f, "{{{ns}}}")?;
        }
        match &self.kind {
            StepKind::Named(name) => f.write_str(name)?,
            StepKind::Star => f.write_str("*")?,
            StepKind::StarStar => f.write_str("**")?,
            StepKind::DocumentRoot => f.write_str("#document")?,
        }
        if let Some(attribute) = &self.attribute_target {
            write!(f, "{{@{attribute}}}")?;
        }
        if let Some(predicate) = &self.predicate {
            write!(f, "{predicate}")?;
        }
        Ok(())
    }
}
