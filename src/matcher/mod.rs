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

//! Ancestor-chain matching of compiled paths against fragments
//!
//! The last step of a path is checked against the fragment itself. The
//! remaining steps are then consumed right to left while walking up through
//! the fragment's ancestors:
//!
//! - a named or `*` step consumes exactly one ancestor level;
//! - `**` absorbs levels up to the nearest ancestor whose name fits the step
//!   before it; that ancestor must then pass the step's predicate, and both
//!   steps are consumed;
//! - a document step only holds once the chain is exhausted.
//!
//! The walk never backtracks, so a match costs at most one visit per
//! ancestor. It is written once against [`Fragment`] and gives the same
//! answer for tree and stream fragments.

use crate::ast::{Path, Step, StepKind};
use crate::config::MatcherConfig;
use crate::core::EvaluationResult;
use crate::evaluator::EvaluationContext;
use crate::fragment::Fragment;

/// Decides whether a fragment's position satisfies a [`Path`]
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    config: MatcherConfig,
}

impl Matcher {
    /// Create a matcher with explicit settings
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// Matcher settings
    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Does `path` match `fragment`
    ///
    /// Structural mismatches give `Ok(false)`. Errors come only from predicate
    /// and condition evaluators and are returned unchanged.
    pub fn is_match<F: Fragment + Clone>(
        &self,
        path: &Path,
        fragment: &F,
        ctx: &EvaluationContext,
    ) -> EvaluationResult<bool> {
        if let Some(condition) = path.condition() {
            if !condition.evaluate(ctx)? {
                log::trace!("'{}' rejected: condition {condition} is false", path.selector());
                return Ok(false);
            }
        }

        let steps = path.steps();
        let Some(target) = steps.last() else {
            return Ok(false);
        };

        if !self.accepts_target(path, target, fragment, ctx)? {
            return Ok(false);
        }

        let last = steps.len() - 1;
        let (index, current) = if target.kind().is_star_star() {
            (Some(last), Some(fragment.clone()))
        } else {
            (last.checked_sub(1), fragment.parent())
        };
        self.walk(path, index, current, ctx)
    }

    fn accepts_target<F: Fragment>(
        &self,
        path: &Path,
        target: &Step,
        fragment: &F,
        ctx: &EvaluationContext,
    ) -> EvaluationResult<bool> {
        let namespace_ok = match path.namespace_uri() {
            Some(uri) => fragment.namespace() == Some(uri),
            None => target.accepts_namespace(fragment),
        };
        if !namespace_ok {
            log::trace!(
                "'{}' rejected: namespace {:?} not accepted",
                path.selector(),
                fragment.namespace()
            );
            return Ok(false);
        }

        if !target.accepts_name(fragment) {
            return Ok(false);
        }

        if target.is_rooted() && fragment.parent().is_some() {
            log::trace!("'{}' rejected: target is not at the root", path.selector());
            return Ok(false);
        }

        if let Some(attribute) = target.attribute_target() {
            if self.config.require_attribute_presence
                && fragment
                    .attribute(attribute.local_name(), attribute.namespace())
                    .is_none()
            {
                log::trace!("'{}' rejected: attribute {attribute} absent", path.selector());
                return Ok(false);
            }
        }

        let accepted = target.evaluate_predicate(fragment, ctx)?;
        if !accepted {
            log::trace!("'{}' rejected: target predicate is false", path.selector());
        }
        Ok(accepted)
    }

    fn walk<F: Fragment>(
        &self,
        path: &Path,
        mut index: Option<usize>,
        mut current: Option<F>,
        ctx: &EvaluationContext,
    ) -> EvaluationResult<bool> {
        let steps = path.steps();
        loop {
            let Some(i) = index else {
                return Ok(true);
            };
            let step = &steps[i];

            match step.kind() {
                StepKind::StarStar => {
                    let Some(anchor_index) = i.checked_sub(1) else {
                        return Ok(true);
                    };
                    let anchor = &steps[anchor_index];
                    match anchor.kind() {
                        StepKind::DocumentRoot => return Ok(true),
                        StepKind::StarStar => {
                            index = Some(anchor_index);
                            continue;
                        }
                        _ => {}
                    }

                    // The nearest plausible ancestor is the only anchor tried.
                    let mut candidate = current.take();
                    let node = loop {
                        let Some(node) = candidate else {
                            log::trace!(
                                "'{}' rejected: no ancestor plausible for {anchor}",
                                path.selector()
                            );
                            return Ok(false);
                        };
                        if anchor.is_plausible(&node) {
                            break node;
                        }
                        candidate = node.parent();
                    };
                    if !self.accepts(anchor, &node, ctx)? {
                        log::trace!(
                            "'{}' rejected: nearest {anchor} ancestor not accepted",
                            path.selector()
                        );
                        return Ok(false);
                    }
                    index = anchor_index.checked_sub(1);
                    current = node.parent();
                }
                StepKind::DocumentRoot => {
                    let at_top = current.is_none();
                    if !at_top {
                        log::trace!("'{}' rejected: elements above the root step", path.selector());
                    }
                    return Ok(at_top);
                }
                StepKind::Named(_) | StepKind::Star => {
                    let Some(node) = current.take() else {
                        log::trace!("'{}' rejected: ancestor chain exhausted at {step}", path.selector());
                        return Ok(false);
                    };
                    if !self.accepts(step, &node, ctx)? {
                        log::trace!("'{}' rejected: ancestor not accepted by {step}", path.selector());
                        return Ok(false);
                    }
                    index = i.checked_sub(1);
                    current = node.parent();
                }
            }
        }
    }

    /// Full check of an ancestor against a non-target step
    fn accepts<F: Fragment>(
        &self,
        step: &Step,
        node: &F,
        ctx: &EvaluationContext,
    ) -> EvaluationResult<bool> {
        if !step.is_plausible(node) {
            return Ok(false);
        }
        if step.is_rooted() && node.parent().is_some() {
            return Ok(false);
        }
        step.evaluate_predicate(node, ctx)
    }
}
