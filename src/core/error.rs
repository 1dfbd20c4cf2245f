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

//! Error types for selector compilation and fragment matching
//!
//! Compilation failures are reported through [`PathCompileError`] and are never
//! produced while matching. Matching itself only fails when a predicate or
//! condition evaluator fails, which surfaces as [`EvaluationError`].

use crate::parser::ParseError;
use thiserror::Error;

/// Result type alias for fragpath operations
pub type Result<T> = std::result::Result<T, FragPathError>;

/// Result type for predicate and condition evaluation
pub type EvaluationResult<T> = std::result::Result<T, EvaluationError>;

/// Errors raised while compiling a selector into a [`Path`](crate::Path)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathCompileError {
    /// The selector contained no steps
    #[error("Empty selector")]
    Empty,

    /// The selector used a traversal axis other than child, attribute or descendant-or-self
    #[error("Unsupported selector '{selector}': {axis} not supported")]
    UnsupportedAxis {
        /// Selector being compiled
        selector: String,
        /// The offending axis, rendered in its explicit form
        axis: String,
    },

    /// An attribute step appeared before the final step
    #[error("Invalid selector '{selector}': attribute step '@{attribute}' is only supported at the end of the selector")]
    MisplacedAttribute {
        /// Selector being compiled
        selector: String,
        /// Attribute name as written
        attribute: String,
    },

    /// An attribute step had no element step to attach to
    #[error("Invalid selector '{selector}': attribute step '@{attribute}' must follow an element step")]
    AttributeWithoutElement {
        /// Selector being compiled
        selector: String,
        /// Attribute name as written
        attribute: String,
    },

    /// The `#document` token was used anywhere but the start
    #[error("Invalid selector '{selector}': '#document' token can only exist at the start of the selector")]
    MisplacedDocumentRoot {
        /// Selector being compiled
        selector: String,
    },

    /// A predicate reading text content was attached to a step other than the last
    #[error("Unsupported selector '{selector}': 'text()' tokens are only supported in the last step")]
    TextAccessNotLast {
        /// Selector being compiled
        selector: String,
    },

    /// A namespace prefix had no binding
    #[error("Invalid selector '{selector}': namespace prefix '{prefix}' is not bound")]
    UnboundPrefix {
        /// Selector being compiled
        selector: String,
        /// The unbound prefix
        prefix: String,
    },

    /// A segment could not be read as a step
    #[error("Invalid selector '{selector}': cannot parse segment '{segment}'")]
    InvalidSegment {
        /// Selector being compiled
        selector: String,
        /// The segment text
        segment: String,
    },

    /// A predicate clause failed to compile
    #[error("Invalid predicate in selector '{selector}': {source}")]
    Predicate {
        /// Selector being compiled
        selector: String,
        /// Underlying predicate parse error
        #[source]
        source: ParseError,
    },
}

impl PathCompileError {
    /// The selector text that failed to compile, when known
    pub fn selector(&self) -> Option<&str> {
        match self {
            PathCompileError::Empty => None,
            PathCompileError::UnsupportedAxis { selector, .. }
            | PathCompileError::MisplacedAttribute { selector, .. }
            | PathCompileError::AttributeWithoutElement { selector, .. }
            | PathCompileError::MisplacedDocumentRoot { selector }
            | PathCompileError::TextAccessNotLast { selector }
            | PathCompileError::UnboundPrefix { selector, .. }
            | PathCompileError::InvalidSegment { selector, .. }
            | PathCompileError::Predicate { selector, .. } => Some(selector),
        }
    }
}

/// Errors raised by predicate and condition evaluators
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// A step predicate failed
    #[error("Predicate '{predicate}' failed: {message}")]
    Predicate {
        /// Rendered predicate
        predicate: String,
        /// Error message
        message: String,
    },

    /// A path condition failed
    #[error("Condition '{condition}' failed: {message}")]
    Condition {
        /// Rendered condition
        condition: String,
        /// Error message
        message: String,
    },

    /// A context variable was required but missing
    #[error("Variable {name} not found")]
    VariableNotFound {
        /// Variable name
        name: String,
    },

    /// Any other evaluator failure
    #[error("Evaluation error: {0}")]
    Custom(String),
}

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration document was not valid JSON for the expected shape
    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while feeding structural events into a stream cursor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// An element end arrived with no open element
    #[error("Unbalanced end element at depth 0")]
    UnbalancedEnd,

    /// An element start arrived after the root element was closed
    #[error("Element '{name}' started after the document element was closed")]
    MultipleRoots {
        /// Name of the extra element
        name: String,
    },

    /// The document ended with open elements
    #[error("Document ended with {open} unclosed element(s)")]
    Unclosed {
        /// Number of elements still open
        open: usize,
    },
}

/// Top-level error type aggregating every failure this crate produces
#[derive(Error, Debug)]
pub enum FragPathError {
    /// Selector compilation error
    #[error(transparent)]
    Compile(#[from] PathCompileError),

    /// Predicate parse error outside selector compilation
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Predicate or condition evaluation error
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Stream cursor error
    #[error(transparent)]
    Stream(#[from] StreamError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_messages() {
        let err = PathCompileError::UnsupportedAxis {
            selector: "a/..".to_string(),
            axis: "parent::node()".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported selector 'a/..': parent::node() not supported"
        );
        assert_eq!(err.selector(), Some("a/.."));
        assert_eq!(PathCompileError::Empty.selector(), None);
    }

    #[test]
    fn test_predicate_error_keeps_source() {
        use std::error::Error as _;

        let err = PathCompileError::Predicate {
            selector: "a[@x]".to_string(),
            source: ParseError::UnexpectedEndOfInput { position: 2 },
        };
        assert!(err.source().is_some());
    }

    #[test]
    fn test_top_level_conversion() {
        let err: FragPathError = StreamError::UnbalancedEnd.into();
        assert!(matches!(err, FragPathError::Stream(StreamError::UnbalancedEnd)));
    }
}
