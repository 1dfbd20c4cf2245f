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

//! Lexical analysis utilities

use super::span::Spanned;
use super::tokenizer::Token;

/// Check if a character can start a name
pub fn is_identifier_start(c: char) -> bool {
    unicode_xid::UnicodeXID::is_xid_start(c) || c == '_'
}

/// Check if a character can continue a name
///
/// Element names may contain `-` and `.` after the first character.
pub fn is_identifier_continue(c: char) -> bool {
    unicode_xid::UnicodeXID::is_xid_continue(c) || c == '-' || c == '.'
}

/// Check if `text` is a complete name
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if is_identifier_start(first) => chars.all(is_identifier_continue),
        _ => false,
    }
}

/// Token stream with lookahead capability
#[derive(Debug)]
pub struct TokenStream<'input> {
    tokens: Vec<Spanned<Token<'input>>>,
    position: usize,
    end: usize,
}

impl<'input> TokenStream<'input> {
    /// Create a new token stream; `end` is the input length used for end-of-input errors
    pub fn new(tokens: Vec<Spanned<Token<'input>>>, end: usize) -> Self {
        Self {
            tokens,
            position: 0,
            end,
        }
    }

    /// Peek at the current token without consuming
    pub fn peek(&self) -> Option<&Spanned<Token<'input>>> {
        self.tokens.get(self.position)
    }

    /// Peek at a token n positions ahead
    pub fn peek_ahead(&self, n: usize) -> Option<&Spanned<Token<'input>>> {
        self.tokens.get(self.position + n)
    }

    /// Consume and return the current token
    pub fn next(&mut self) -> Option<Spanned<Token<'input>>> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Check if we're at the end of the stream
    pub fn is_eof(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// Byte offset of the current token, or the input length at end of stream
    pub fn offset(&self) -> usize {
        self.peek().map_or(self.end, |t| t.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_classification() {
        assert!(is_identifier("order"));
        assert!(is_identifier("line-item"));
        assert!(is_identifier("_x.y"));
        assert!(is_identifier("ürün"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("-a"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_stream_lookahead() {
        let tokens = vec![
            Spanned::new(Token::At, 0, 1),
            Spanned::new(Token::Identifier("a"), 1, 2),
        ];
        let mut stream = TokenStream::new(tokens, 2);
        assert_eq!(stream.peek_ahead(1).map(|t| &t.value), Some(&Token::Identifier("a")));
        assert_eq!(stream.next().map(|t| t.value), Some(Token::At));
        assert_eq!(stream.offset(), 1);
        stream.next();
        assert!(stream.is_eof());
        assert_eq!(stream.offset(), 2);
    }
}
