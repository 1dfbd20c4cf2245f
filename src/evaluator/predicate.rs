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

//! Step predicates and the compilers that produce them
//!
//! A [`Predicate`] is an opaque evaluator closure plus a printable form. The
//! matcher only ever calls [`Predicate::evaluate`]; the expression language
//! behind it belongs to whichever [`PredicateCompiler`] built it. The
//! [`BuiltinPredicateCompiler`] supports attribute and text comparisons,
//! positional indexes and `and`/`or` combinations.

use super::context::EvaluationContext;
use crate::ast::{ComparisonOp, Literal, Operand, PredicateExpr};
use crate::core::{EvaluationResult, NamespaceMap};
use crate::fragment::Fragment;
use crate::parser::{ParseResult, parse_predicate};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Signature shared by every predicate evaluator
pub type PredicateFn =
    dyn Fn(&dyn Fragment, &EvaluationContext) -> EvaluationResult<bool> + Send + Sync;

/// A compiled boolean test applied to one fragment
#[derive(Clone)]
pub struct Predicate {
    description: Arc<str>,
    accesses_text: bool,
    eval: Arc<PredicateFn>,
}

impl Predicate {
    /// Wrap an evaluator closure
    pub fn new<F>(description: impl Into<String>, eval: F) -> Self
    where
        F: Fn(&dyn Fragment, &EvaluationContext) -> EvaluationResult<bool> + Send + Sync + 'static,
    {
        Self {
            description: Arc::from(description.into()),
            accesses_text: false,
            eval: Arc::new(eval),
        }
    }

    /// Mark the predicate as reading text content
    ///
    /// Such predicates may only be attached to the last step of a path.
    pub fn with_text_access(mut self) -> Self {
        self.accesses_text = true;
        self
    }

    /// Build an evaluator for a built-in predicate expression
    pub fn from_expr(expr: PredicateExpr) -> Self {
        let description = expr.to_string();
        let accesses_text = expr.accesses_text();
        let expr = Arc::new(expr);
        Self {
            description: Arc::from(description),
            accesses_text,
            eval: Arc::new(move |fragment, _ctx| Ok(evaluate_expr(&expr, fragment))),
        }
    }

    /// Run the evaluator
    pub fn evaluate(&self, fragment: &dyn Fragment, ctx: &EvaluationContext) -> EvaluationResult<bool> {
        (self.eval)(fragment, ctx)
    }

    /// Combine two predicates; the second is only evaluated when the first holds
    pub fn and(self, other: Predicate) -> Self {
        let description = format!("{} and {}", self.description, other.description);
        let accesses_text = self.accesses_text || other.accesses_text;
        let (lhs, rhs) = (self.eval, other.eval);
        Self {
            description: Arc::from(description),
            accesses_text,
            eval: Arc::new(move |fragment, ctx| Ok(lhs(fragment, ctx)? && rhs(fragment, ctx)?)),
        }
    }

    /// Printable form
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Does the predicate read text content
    pub fn accesses_text(&self) -> bool {
        self.accesses_text
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("description", &self.description)
            .field("accesses_text", &self.accesses_text)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Turns predicate clause text into evaluators
///
/// Implementations must be shareable across threads; compiled paths are.
pub trait PredicateCompiler: Send + Sync {
    /// Compile the text between `[` and `]`
    fn compile(&self, clause: &str, namespaces: &NamespaceMap) -> ParseResult<Predicate>;
}

/// Compiler for the built-in predicate language
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinPredicateCompiler;

impl PredicateCompiler for BuiltinPredicateCompiler {
    fn compile(&self, clause: &str, namespaces: &NamespaceMap) -> ParseResult<Predicate> {
        let expr = parse_predicate(clause, namespaces)?;
        Ok(Predicate::from_expr(expr))
    }
}

fn evaluate_expr(expr: &PredicateExpr, fragment: &dyn Fragment) -> bool {
    match expr {
        PredicateExpr::Comparison { lhs, op, rhs } => compare(fragment, lhs, *op, rhs),
        PredicateExpr::Index(index) => fragment.index() == *index,
        PredicateExpr::And(lhs, rhs) => evaluate_expr(lhs, fragment) && evaluate_expr(rhs, fragment),
        PredicateExpr::Or(lhs, rhs) => evaluate_expr(lhs, fragment) || evaluate_expr(rhs, fragment),
    }
}

fn string_value<'a>(fragment: &'a dyn Fragment, operand: &'a Operand) -> Option<Cow<'a, str>> {
    match operand {
        Operand::Attribute(name) => fragment
            .attribute(name.local_name(), name.namespace())
            .map(Cow::Borrowed),
        Operand::Text => Some(fragment.text()),
        Operand::Literal(Literal::String(s)) => Some(Cow::Borrowed(s)),
        Operand::Literal(Literal::Number(n)) => Some(Cow::Owned(n.to_string())),
    }
}

fn number_value(fragment: &dyn Fragment, operand: &Operand) -> Option<f64> {
    match operand {
        Operand::Literal(Literal::Number(n)) => Some(*n),
        other => string_value(fragment, other)?.trim().parse().ok(),
    }
}

/// Relational operators always compare numerically; equality compares
/// numerically when either side is a number literal. A missing attribute or a
/// non-numeric value makes the comparison false.
fn compare(fragment: &dyn Fragment, lhs: &Operand, op: ComparisonOp, rhs: &Operand) -> bool {
    let numeric = lhs.is_number()
        || rhs.is_number()
        || matches!(op, ComparisonOp::LessThan | ComparisonOp::GreaterThan);

    if numeric {
        let (Some(a), Some(b)) = (number_value(fragment, lhs), number_value(fragment, rhs)) else {
            return false;
        };
        return match op {
            ComparisonOp::Equal => a == b,
            ComparisonOp::NotEqual => a != b,
            ComparisonOp::LessThan => a < b,
            ComparisonOp::GreaterThan => a > b,
        };
    }

    let (Some(a), Some(b)) = (string_value(fragment, lhs), string_value(fragment, rhs)) else {
        return false;
    };
    match op {
        ComparisonOp::NotEqual => a != b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::QualifiedName;
    use crate::fragment::{ReservationTable, TreeFragment};
    use crate::model::tree::Document;

    fn sample() -> Document {
        Document::with_root("root", |root| {
            root.child("item", |item| {
                item.attr("price", "12.50").attr("code", "A1").text("first");
            });
            root.child("item", |item| {
                item.attr_ns("http://a", "code", "B2").text(" 7 ");
            });
        })
    }

    fn check(doc: &Document, nth: usize, clause: &str) -> bool {
        let namespaces = NamespaceMap::new().with("a", "http://a");
        let predicate = BuiltinPredicateCompiler.compile(clause, &namespaces).unwrap();
        let table = ReservationTable::new();
        let node = doc.elements_named("item").nth(nth).unwrap();
        let fragment = TreeFragment::new(doc, &table, node);
        predicate.evaluate(&fragment, &EvaluationContext::new()).unwrap()
    }

    #[test]
    fn test_attribute_comparisons() {
        let doc = sample();
        assert!(check(&doc, 0, "@code = 'A1'"));
        assert!(!check(&doc, 0, "@code != 'A1'"));
        assert!(check(&doc, 0, "@price = 12.5"));
        assert!(check(&doc, 0, "@price > 10"));
        assert!(!check(&doc, 0, "@price < 10"));
        assert!(check(&doc, 1, "@a:code = 'B2'"));
        assert!(!check(&doc, 1, "@code = 'B2'"));
    }

    #[test]
    fn test_missing_attribute_is_false() {
        let doc = sample();
        assert!(!check(&doc, 1, "@price != 3"));
        assert!(!check(&doc, 1, "@price = 3"));
    }

    #[test]
    fn test_text_and_index() {
        let doc = sample();
        assert!(check(&doc, 0, "text() = 'first'"));
        assert!(check(&doc, 1, "text() = 7"));
        assert!(check(&doc, 1, "2"));
        assert!(!check(&doc, 0, "2"));
        assert!(check(&doc, 0, "1 and @code = 'A1' or text() = 'nope'"));
    }

    #[test]
    fn test_non_numeric_relational_is_false() {
        let doc = sample();
        assert!(!check(&doc, 0, "@code > 'A0'"));
    }

    #[test]
    fn test_and_combination_short_circuits() {
        let failing = Predicate::new("boom", |_, _| {
            Err(crate::core::EvaluationError::Custom("boom".into()))
        });
        let never = Predicate::new("never", |_, _| Ok(false));
        let combined = never.and(failing);
        assert_eq!(combined.description(), "never and boom");

        let doc = sample();
        let table = ReservationTable::new();
        let fragment = TreeFragment::new(&doc, &table, doc.root_element().unwrap());
        assert_eq!(combined.evaluate(&fragment, &EvaluationContext::new()), Ok(false));
    }

    #[test]
    fn test_text_access_flag() {
        let ns = NamespaceMap::new();
        assert!(BuiltinPredicateCompiler.compile("@x = text()", &ns).unwrap().accesses_text());
        assert!(!BuiltinPredicateCompiler.compile("@x = 'a'", &ns).unwrap().accesses_text());
        let name = QualifiedName::new("x");
        let expr = PredicateExpr::comparison(
            Operand::Attribute(name),
            ComparisonOp::Equal,
            Operand::Literal(Literal::Number(1.0)),
        );
        assert_eq!(Predicate::from_expr(expr).to_string(), "(@x = 1.0)");
    }
}
