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

//! Compiled selector paths

use super::step::{Step, StepKind};
use crate::compiler::PathCompiler;
use crate::core::{EvaluationResult, NamespaceMap, PathCompileError, QualifiedName};
use crate::evaluator::{Condition, EvaluationContext};
use crate::fragment::Fragment;
use crate::matcher::Matcher;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Step storage; most selectors have only a handful of steps
pub type Steps = SmallVec<[Step; 4]>;

/// An immutable, compiled selector
///
/// Paths are built once and shared freely, including across threads.
///
/// # Examples
///
/// ```rust
/// use fragpath::{NamespaceMap, Path};
///
/// let path = Path::compile("/order/**/item[@sku = 'A1']", &NamespaceMap::new()).unwrap();
/// assert_eq!(path.len(), 3);
/// assert!(path.is_rooted());
/// assert_eq!(path.target_element(), Some("item"));
/// ```
#[derive(Debug, Clone)]
pub struct Path {
    selector: Arc<str>,
    steps: Steps,
    namespace_uri: Option<String>,
    condition: Option<Condition>,
}

impl Path {
    /// Compile a selector with the built-in predicate language and default settings
    pub fn compile(selector: &str, namespaces: &NamespaceMap) -> Result<Self, PathCompileError> {
        PathCompiler::default().compile(selector, namespaces)
    }

    /// Assemble a path from already compiled steps
    ///
    /// Fails when the steps break a path invariant: no steps at all, a
    /// document step after the first position, an attribute target or a
    /// text-reading predicate before the last step.
    pub fn from_steps(
        selector: impl Into<String>,
        steps: impl IntoIterator<Item = Step>,
    ) -> Result<Self, PathCompileError> {
        let selector: String = selector.into();
        let steps: Steps = steps.into_iter().collect();
        let Some(last) = steps.len().checked_sub(1) else {
            return Err(PathCompileError::Empty);
        };

        for (i, step) in steps.iter().enumerate() {
            if i > 0 && matches!(step.kind(), StepKind::DocumentRoot) {
                return Err(PathCompileError::MisplacedDocumentRoot { selector });
            }
            if i == last {
                continue;
            }
            if let Some(attribute) = step.attribute_target() {
                return Err(PathCompileError::MisplacedAttribute {
                    attribute: attribute.local_name().to_string(),
                    selector,
                });
            }
            if step.accesses_text() {
                return Err(PathCompileError::TextAccessNotLast { selector });
            }
        }

        Ok(Self {
            selector: Arc::from(selector),
            steps,
            namespace_uri: None,
            condition: None,
        })
    }

    /// The selector text this path was compiled from
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Steps, outermost first
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false for a compiled path
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The last step, matched against the fragment itself
    pub fn target_step(&self) -> Option<&Step> {
        self.steps.last()
    }

    /// Local name required of the target element, when the target is a named step
    pub fn target_element(&self) -> Option<&str> {
        self.target_step().and_then(Step::local_name)
    }

    /// Attribute targeted by the last step
    pub fn target_attribute(&self) -> Option<&QualifiedName> {
        self.target_step().and_then(Step::attribute_target)
    }

    /// Anchored at the document root
    pub fn is_rooted(&self) -> bool {
        self.steps
            .first()
            .is_some_and(|step| step.is_rooted() || matches!(step.kind(), StepKind::DocumentRoot))
    }

    /// Whole-path namespace checked against the target fragment
    pub fn namespace_uri(&self) -> Option<&str> {
        self.namespace_uri.as_deref()
    }

    /// Require the target fragment to be in `uri`; `"*"` removes the requirement
    pub fn with_namespace_uri(mut self, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        self.namespace_uri = (uri != "*").then_some(uri);
        self
    }

    /// External condition evaluated before any structural check
    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    /// Attach an external condition
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Match with a default [`Matcher`]
    pub fn matches<F: Fragment + Clone>(
        &self,
        fragment: &F,
        ctx: &EvaluationContext,
    ) -> EvaluationResult<bool> {
        Matcher::default().is_match(self, fragment, ctx)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 || step.is_rooted() {
                f.write_str("/")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}
