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

//! Tokenizer for predicate clauses
//!
//! Predicate clauses are short, so the whole clause is tokenized up front and
//! handed to the parser as a [`TokenStream`](super::lexer::TokenStream).

use super::error::{ParseError, ParseResult};
use super::lexer::{is_identifier_continue, is_identifier_start};
use super::span::Spanned;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::fmt;

/// Predicate token borrowing from the clause text
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'input> {
    /// Numeric literal, parsed on demand (e.g. `2`, `23.5`, `-1`)
    Number(&'input str),
    /// String literal without its quotes
    String(&'input str),
    /// Identifier (element or attribute local name, function name)
    Identifier(&'input str),
    /// Attribute marker (@)
    At,
    /// Prefix separator (:)
    Colon,
    /// Path separator (/)
    Slash,
    /// Left parenthesis (
    LeftParen,
    /// Right parenthesis )
    RightParen,
    /// Argument separator (,)
    Comma,
    /// Equality operator (=)
    Equal,
    /// Inequality operator (!=)
    NotEqual,
    /// Less than operator (<)
    LessThan,
    /// Greater than operator (>)
    GreaterThan,
    /// Logical AND (and keyword)
    And,
    /// Logical OR (or keyword)
    Or,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => f.write_str(n),
            Token::String(s) => write!(f, "'{s}'"),
            Token::Identifier(name) => f.write_str(name),
            Token::At => f.write_str("@"),
            Token::Colon => f.write_str(":"),
            Token::Slash => f.write_str("/"),
            Token::LeftParen => f.write_str("("),
            Token::RightParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
            Token::Equal => f.write_str("="),
            Token::NotEqual => f.write_str("!="),
            Token::LessThan => f.write_str("<"),
            Token::GreaterThan => f.write_str(">"),
            Token::And => f.write_str("and"),
            Token::Or => f.write_str("or"),
        }
    }
}

/// Keyword lookup table
static KEYWORD_TABLE: Lazy<FxHashMap<&'static str, Token<'static>>> = Lazy::new(|| {
    let mut map = FxHashMap::default();
    map.insert("and", Token::And);
    map.insert("or", Token::Or);
    map
});

/// Tokenizer over a single predicate clause
#[derive(Clone)]
pub struct Tokenizer<'input> {
    input: &'input str,
    pos: usize,
}

impl<'input> Tokenizer<'input> {
    /// Create a tokenizer positioned at the start of `input`
    pub fn new(input: &'input str) -> Self {
        Self { input, pos: 0 }
    }

    /// Tokenize the remaining input
    pub fn tokenize_all(mut self) -> ParseResult<Vec<Spanned<Token<'input>>>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    /// Read the next token, or `None` at end of input
    pub fn next_token(&mut self) -> ParseResult<Option<Spanned<Token<'input>>>> {
        self.skip_whitespace();
        let start = self.pos;
        let Some(c) = self.peek_char() else {
            return Ok(None);
        };

        let token = match c {
            '@' => self.single(Token::At),
            ':' => self.single(Token::Colon),
            '/' => self.single(Token::Slash),
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            ',' => self.single(Token::Comma),
            '=' => self.single(Token::Equal),
            '<' => self.single(Token::LessThan),
            '>' => self.single(Token::GreaterThan),
            '!' if self.peek_char_at(1) == Some('=') => {
                self.pos += 2;
                Token::NotEqual
            }
            '\'' | '"' => self.string(c)?,
            '0'..='9' => self.number(),
            '-' if self.peek_char_at(1).is_some_and(|n| n.is_ascii_digit()) => self.number(),
            c if is_identifier_start(c) => self.identifier(),
            other => {
                return Err(ParseError::UnexpectedToken {
                    token: other.to_string(),
                    position: start,
                });
            }
        };

        Ok(Some(Spanned::new(token, start, self.pos)))
    }

    fn single(&mut self, token: Token<'input>) -> Token<'input> {
        self.pos += 1;
        token
    }

    fn string(&mut self, quote: char) -> ParseResult<Token<'input>> {
        let start = self.pos;
        let body_start = start + quote.len_utf8();
        match self.input[body_start..].find(quote) {
            Some(offset) => {
                let body_end = body_start + offset;
                self.pos = body_end + quote.len_utf8();
                Ok(Token::String(&self.input[body_start..body_end]))
            }
            None => Err(ParseError::UnclosedString { position: start }),
        }
    }

    fn number(&mut self) -> Token<'input> {
        let start = self.pos;
        if self.peek_char() == Some('-') {
            self.pos += 1;
        }
        let mut seen_dot = false;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.pos += 1;
            } else if c == '.' && !seen_dot && self.peek_char_at(1).is_some_and(|n| n.is_ascii_digit())
            {
                seen_dot = true;
                self.pos += 1;
            } else {
                break;
            }
        }
        Token::Number(&self.input[start..self.pos])
    }

    fn identifier(&mut self) -> Token<'input> {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if is_identifier_continue(c) {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        let text = &self.input[start..self.pos];
        match KEYWORD_TABLE.get(text) {
            Some(keyword) => keyword.clone(),
            None => Token::Identifier(text),
        }
    }
}
