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

//! Precedence-climbing parser for predicate clauses
//!
//! The grammar is deliberately small:
//!
//! ```text
//! expr       := expr 'or' expr | expr 'and' expr | '(' expr ')' | comparison | index
//! comparison := operand ('=' | '!=' | '<' | '>') operand
//! operand    := '@' name | '@' prefix ':' name | 'text()' | string | number
//! index      := positive integer
//! ```
//!
//! Namespace prefixes are resolved while parsing, so the namespace bindings
//! must be known by the time a clause is parsed.

use super::error::{ParseError, ParseResult};
use super::lexer::TokenStream;
use super::span::Spanned;
use super::tokenizer::{Token, Tokenizer};
use crate::ast::{ComparisonOp, Literal, Operand, PredicateExpr};
use crate::core::{NamespaceMap, QualifiedName};

/// Operator precedence levels (higher = tighter binding)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    /// Logical OR
    Or = 1,
    /// Logical AND
    And = 2,
    /// Comparison operands; binds tighter than either logical operator
    Comparison = 3,
}

impl Precedence {
    /// Get the next higher precedence level for left-associative operators
    #[inline(always)]
    pub const fn next_level(self) -> Self {
        match self {
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Comparison,
            Precedence::Comparison => Precedence::Comparison,
        }
    }
}

#[inline(always)]
fn get_precedence(token: &Token<'_>) -> Option<Precedence> {
    match token {
        Token::And => Some(Precedence::And),
        Token::Or => Some(Precedence::Or),
        _ => None,
    }
}

#[inline(always)]
fn token_to_comparison(token: &Token<'_>) -> Option<ComparisonOp> {
    match token {
        Token::Equal => Some(ComparisonOp::Equal),
        Token::NotEqual => Some(ComparisonOp::NotEqual),
        Token::LessThan => Some(ComparisonOp::LessThan),
        Token::GreaterThan => Some(ComparisonOp::GreaterThan),
        _ => None,
    }
}

/// Parser over one predicate clause
pub struct PredicateParser<'input, 'ns> {
    tokens: TokenStream<'input>,
    namespaces: &'ns NamespaceMap,
}

impl<'input, 'ns> PredicateParser<'input, 'ns> {
    /// Tokenize `input` and prepare to parse it
    pub fn new(input: &'input str, namespaces: &'ns NamespaceMap) -> ParseResult<Self> {
        let tokens = Tokenizer::new(input).tokenize_all()?;
        Ok(Self {
            tokens: TokenStream::new(tokens, input.len()),
            namespaces,
        })
    }

    /// Parse the whole clause
    pub fn parse(mut self) -> ParseResult<PredicateExpr> {
        let expr = self.parse_expression(Precedence::Or)?;
        match self.tokens.next() {
            None => Ok(expr),
            Some(token) => Err(ParseError::UnexpectedToken {
                token: token.value.to_string(),
                position: token.start,
            }),
        }
    }

    fn parse_expression(&mut self, min_precedence: Precedence) -> ParseResult<PredicateExpr> {
        let mut lhs = self.parse_primary()?;

        while let Some(precedence) = self.tokens.peek().and_then(|t| get_precedence(&t.value)) {
            if precedence < min_precedence {
                break;
            }
            let operator = self.tokens.next();
            let rhs = self.parse_expression(precedence.next_level())?;
            lhs = match operator.map(|t| t.value) {
                Some(Token::Or) => lhs.or(rhs),
                _ => lhs.and(rhs),
            };
        }

        Ok(lhs)
    }

    fn parse_primary(&mut self) -> ParseResult<PredicateExpr> {
        if let Some(Token::LeftParen) = self.tokens.peek().map(|t| &t.value) {
            self.tokens.next();
            let expr = self.parse_expression(Precedence::Or)?;
            self.expect_right_paren()?;
            return Ok(expr);
        }

        // A bare number is a positional index rather than a comparison operand
        if let Some(Spanned {
            value: Token::Number(text),
            start,
            ..
        }) = self.tokens.peek().cloned()
        {
            let followed_by_comparison = self
                .tokens
                .peek_ahead(1)
                .is_some_and(|t| token_to_comparison(&t.value).is_some());
            if !followed_by_comparison {
                self.tokens.next();
                return parse_index(text, start);
            }
        }

        let lhs_start = self.tokens.offset();
        let lhs = self.parse_operand()?;
        let Some(op) = self.tokens.peek().and_then(|t| token_to_comparison(&t.value)) else {
            return Err(missing_comparison(&lhs, lhs_start, self.tokens.offset()));
        };
        self.tokens.next();
        let rhs = self.parse_operand()?;

        Ok(PredicateExpr::comparison(lhs, op, rhs))
    }

    fn parse_operand(&mut self) -> ParseResult<Operand> {
        let Some(token) = self.tokens.next() else {
            return Err(ParseError::UnexpectedEndOfInput {
                position: self.tokens.offset(),
            });
        };

        match token.value {
            Token::At => self.parse_attribute_name().map(Operand::Attribute),
            Token::String(value) => Ok(Operand::Literal(Literal::String(value.to_string()))),
            Token::Number(text) => text
                .parse::<f64>()
                .map(|n| Operand::Literal(Literal::Number(n)))
                .map_err(|_| ParseError::InvalidLiteral {
                    literal_type: "number".to_string(),
                    value: text.to_string(),
                    position: token.start,
                }),
            Token::Identifier(name) => {
                let is_call = matches!(self.tokens.peek().map(|t| &t.value), Some(Token::LeftParen));
                if !is_call {
                    return Err(ParseError::UnsupportedExpression {
                        construct: format!("child element value test '{name}'"),
                        position: token.start,
                    });
                }
                self.tokens.next();
                self.expect_right_paren()?;
                if name == "text" {
                    Ok(Operand::Text)
                } else {
                    Err(ParseError::UnsupportedExpression {
                        construct: format!("function '{name}()'"),
                        position: token.start,
                    })
                }
            }
            Token::Slash => Err(ParseError::UnsupportedExpression {
                construct: "absolute path".to_string(),
                position: token.start,
            }),
            other => Err(ParseError::UnexpectedToken {
                token: other.to_string(),
                position: token.start,
            }),
        }
    }

    fn parse_attribute_name(&mut self) -> ParseResult<QualifiedName> {
        let (first, first_start) = self.expect_identifier("attribute name")?;
        if !matches!(self.tokens.peek().map(|t| &t.value), Some(Token::Colon)) {
            return Ok(QualifiedName::new(first));
        }
        self.tokens.next();
        let (local, _) = self.expect_identifier("attribute local name")?;
        match self.namespaces.resolve(first) {
            Some(uri) => Ok(QualifiedName::with_namespace(uri, local)),
            None => Err(ParseError::UnknownPrefix {
                prefix: first.to_string(),
                position: first_start,
            }),
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> ParseResult<(&'input str, usize)> {
        match self.tokens.next() {
            Some(Spanned {
                value: Token::Identifier(name),
                start,
                ..
            }) => Ok((name, start)),
            Some(token) => Err(ParseError::ExpectedToken {
                expected: expected.to_string(),
                position: token.start,
            }),
            None => Err(ParseError::UnexpectedEndOfInput {
                position: self.tokens.offset(),
            }),
        }
    }

    fn expect_right_paren(&mut self) -> ParseResult<()> {
        match self.tokens.next() {
            Some(Spanned {
                value: Token::RightParen,
                ..
            }) => Ok(()),
            Some(token) => Err(ParseError::ExpectedToken {
                expected: "')'".to_string(),
                position: token.start,
            }),
            None => Err(ParseError::UnexpectedEndOfInput {
                position: self.tokens.offset(),
            }),
        }
    }
}

fn parse_index(text: &str, position: usize) -> ParseResult<PredicateExpr> {
    match text.parse::<usize>() {
        Ok(index) if index > 0 => Ok(PredicateExpr::Index(index)),
        _ => Err(ParseError::InvalidLiteral {
            literal_type: "index".to_string(),
            value: text.to_string(),
            position,
        }),
    }
}

fn missing_comparison(lhs: &Operand, start: usize, position: usize) -> ParseError {
    match lhs {
        Operand::Attribute(name) => ParseError::UnsupportedExpression {
            construct: format!("attribute existence test '@{name}'"),
            position: start,
        },
        _ => ParseError::ExpectedToken {
            expected: "comparison operator".to_string(),
            position,
        },
    }
}

/// Parse a predicate clause (the text between `[` and `]`)
pub fn parse_predicate(input: &str, namespaces: &NamespaceMap) -> ParseResult<PredicateExpr> {
    PredicateParser::new(input, namespaces)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> ParseResult<PredicateExpr> {
        parse_predicate(input, &NamespaceMap::new().with("a", "http://a"))
    }

    #[test]
    fn test_text_comparison() {
        assert_eq!(parse("text() = '23'").unwrap().to_string(), "(text() = '23')");
    }

    #[test]
    fn test_precedence_and_grouping() {
        let expr = parse("(@d = 23 or text() = 'ddd') and @h = 'rrr'").unwrap();
        assert_eq!(
            expr.to_string(),
            "(((@d = 23.0) or (text() = 'ddd')) and (@h = 'rrr'))"
        );

        let expr = parse("@a = 1 or @b = 2 and @c = 3").unwrap();
        assert_eq!(
            expr.to_string(),
            "((@a = 1.0) or ((@b = 2.0) and (@c = 3.0)))"
        );

        let expr = parse("@a = 1 and @b = 2 and @c = 3").unwrap();
        assert_eq!(
            expr.to_string(),
            "(((@a = 1.0) and (@b = 2.0)) and (@c = 3.0))"
        );
    }

    #[test]
    fn test_index() {
        assert_eq!(parse("2").unwrap(), PredicateExpr::Index(2));
        assert_eq!(
            parse("2 and @a = 's'").unwrap().to_string(),
            "([2] and (@a = 's'))"
        );
    }

    #[test]
    fn test_attribute_compared_to_text() {
        assert_eq!(parse("@d = text()").unwrap().to_string(), "(@d = text())");
    }

    #[test]
    fn test_prefixed_attribute() {
        assert_eq!(
            parse("@a:d = 'x'").unwrap().to_string(),
            "(@{http://a}d = 'x')"
        );
        assert!(matches!(
            parse("@b:d = 'x'"),
            Err(ParseError::UnknownPrefix { ref prefix, position: 1 }) if prefix == "b"
        ));
    }

    #[test]
    fn test_unsupported_constructs() {
        assert!(matches!(
            parse("@x"),
            Err(ParseError::UnsupportedExpression { position: 0, .. })
        ));
        assert!(matches!(
            parse("title = 'x'"),
            Err(ParseError::UnsupportedExpression { .. })
        ));
        assert!(matches!(
            parse("last()"),
            Err(ParseError::UnsupportedExpression { .. })
        ));
        assert!(matches!(
            parse("/a = 'x'"),
            Err(ParseError::UnsupportedExpression { .. })
        ));
    }

    #[test]
    fn test_invalid_index_and_trailing_tokens() {
        assert!(matches!(parse("0"), Err(ParseError::InvalidLiteral { .. })));
        assert!(matches!(parse("1.5"), Err(ParseError::InvalidLiteral { .. })));
        assert!(matches!(
            parse("@a = 1 )"),
            Err(ParseError::UnexpectedToken { position: 7, .. })
        ));
        assert!(matches!(parse(""), Err(ParseError::UnexpectedEndOfInput { position: 0 })));
        assert!(matches!(
            parse("(@a = 1"),
            Err(ParseError::UnexpectedEndOfInput { position: 7 })
        ));
    }
}
