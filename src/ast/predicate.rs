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

//! Abstract syntax for the built-in predicate language

use crate::core::QualifiedName;
use std::fmt;

/// Comparison operators supported inside predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `>`
    GreaterThan,
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComparisonOp::Equal => "=",
            ComparisonOp::NotEqual => "!=",
            ComparisonOp::LessThan => "<",
            ComparisonOp::GreaterThan => ">",
        })
    }
}

/// Literal operand
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Quoted string
    String(String),
    /// Number; comparisons against it are numeric
    Number(f64),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "'{s}'"),
            // Whole numbers keep one decimal place: 23 renders as 23.0
            Literal::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{n:.1}")
            }
            Literal::Number(n) => write!(f, "{n}"),
        }
    }
}

/// One side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Attribute value on the fragment being tested
    Attribute(QualifiedName),
    /// Direct text content of the fragment being tested
    Text,
    /// Constant
    Literal(Literal),
}

impl Operand {
    /// Check if this operand is a numeric literal
    pub fn is_number(&self) -> bool {
        matches!(self, Operand::Literal(Literal::Number(_)))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Attribute(name) => write!(f, "@{name}"),
            Operand::Text => f.write_str("text()"),
            Operand::Literal(literal) => write!(f, "{literal}"),
        }
    }
}

/// Predicate expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum PredicateExpr {
    /// Binary comparison
    Comparison {
        /// Left operand
        lhs: Operand,
        /// Operator
        op: ComparisonOp,
        /// Right operand
        rhs: Operand,
    },
    /// 1-based position among same-named siblings
    Index(usize),
    /// Both sides hold
    And(Box<PredicateExpr>, Box<PredicateExpr>),
    /// Either side holds
    Or(Box<PredicateExpr>, Box<PredicateExpr>),
}

impl PredicateExpr {
    /// Build a comparison
    pub fn comparison(lhs: Operand, op: ComparisonOp, rhs: Operand) -> Self {
        PredicateExpr::Comparison { lhs, op, rhs }
    }

    /// Combine with another expression using `and`
    pub fn and(self, other: PredicateExpr) -> Self {
        PredicateExpr::And(Box::new(self), Box::new(other))
    }

    /// Combine with another expression using `or`
    pub fn or(self, other: PredicateExpr) -> Self {
        PredicateExpr::Or(Box::new(self), Box::new(other))
    }

    /// Does any comparison read `text()`
    pub fn accesses_text(&self) -> bool {
        match self {
            PredicateExpr::Comparison { lhs, rhs, .. } => {
                matches!(lhs, Operand::Text) || matches!(rhs, Operand::Text)
            }
            PredicateExpr::Index(_) => false,
            PredicateExpr::And(lhs, rhs) | PredicateExpr::Or(lhs, rhs) => {
                lhs.accesses_text() || rhs.accesses_text()
            }
        }
    }
}

impl fmt::Display for PredicateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredicateExpr::Comparison { lhs, op, rhs } => write!(f, "({lhs} {op} {rhs})"),
            PredicateExpr::Index(index) => write!(f, "[{index}]"),
            PredicateExpr::And(lhs, rhs) => write!(f, "({lhs} and {rhs})"),
            PredicateExpr::Or(lhs, rhs) => write!(f, "({lhs} or {rhs})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_rendering() {
        assert_eq!(Literal::Number(23.0).to_string(), "23.0");
        assert_eq!(Literal::Number(0.5).to_string(), "0.5");
        assert_eq!(Literal::Number(-4.0).to_string(), "-4.0");
    }

    #[test]
    fn test_nested_rendering() {
        let expr = PredicateExpr::comparison(
            Operand::Attribute(QualifiedName::new("d")),
            ComparisonOp::Equal,
            Operand::Literal(Literal::Number(23.0)),
        )
        .or(PredicateExpr::comparison(
            Operand::Text,
            ComparisonOp::Equal,
            Operand::Literal(Literal::String("ddd".into())),
        ))
        .and(PredicateExpr::comparison(
            Operand::Attribute(QualifiedName::new("h")),
            ComparisonOp::Equal,
            Operand::Literal(Literal::String("rrr".into())),
        ));
        assert_eq!(
            expr.to_string(),
            "(((@d = 23.0) or (text() = 'ddd')) and (@h = 'rrr'))"
        );
        assert!(expr.accesses_text());
    }

    #[test]
    fn test_index_does_not_access_text() {
        assert!(!PredicateExpr::Index(2).accesses_text());
        assert_eq!(PredicateExpr::Index(2).to_string(), "[2]");
    }
}
