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

//! Path-level conditions evaluated against the evaluation context only

use super::context::{EvaluationContext, is_truthy};
use crate::core::{EvaluationError, EvaluationResult};
use std::fmt;
use std::sync::Arc;

/// Signature shared by every condition evaluator
pub type ConditionFn = dyn Fn(&EvaluationContext) -> EvaluationResult<bool> + Send + Sync;

/// An externally supplied boolean test checked before any structural matching
#[derive(Clone)]
pub struct Condition {
    description: Arc<str>,
    eval: Arc<ConditionFn>,
}

impl Condition {
    /// Wrap an evaluator closure
    pub fn new<F>(description: impl Into<String>, eval: F) -> Self
    where
        F: Fn(&EvaluationContext) -> EvaluationResult<bool> + Send + Sync + 'static,
    {
        Self {
            description: Arc::from(description.into()),
            eval: Arc::new(eval),
        }
    }

    /// Holds when the named variable is bound to a truthy value
    pub fn variable(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(format!("${name}"), move |ctx| {
            Ok(ctx.get_variable(&name).is_some_and(is_truthy))
        })
    }

    /// Like [`Condition::variable`], but an unbound variable is an error
    pub fn required_variable(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(format!("${name}!"), move |ctx| match ctx.get_variable(&name) {
            Some(value) => Ok(is_truthy(value)),
            None => Err(EvaluationError::VariableNotFound { name: name.clone() }),
        })
    }

    /// Run the evaluator
    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvaluationResult<bool> {
        (self.eval)(ctx)
    }

    /// Printable form
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_condition() {
        let condition = Condition::variable("enabled");
        assert_eq!(condition.evaluate(&EvaluationContext::new()), Ok(false));
        let ctx = EvaluationContext::new().with_variable("enabled", true);
        assert_eq!(condition.evaluate(&ctx), Ok(true));
    }

    #[test]
    fn test_required_variable_condition() {
        let condition = Condition::required_variable("enabled");
        assert_eq!(
            condition.evaluate(&EvaluationContext::new()),
            Err(EvaluationError::VariableNotFound {
                name: "enabled".to_string()
            })
        );
    }
}
