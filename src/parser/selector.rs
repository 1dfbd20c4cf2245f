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

//! Selector text to unresolved steps
//!
//! This is the first of the two compilation phases. It settles the shape of
//! the path (step kinds, rooting, attribute fusion) but leaves namespace
//! prefixes unresolved and predicate clauses as raw text, so a selector can be
//! read before the prefix bindings that apply to it are known.

use super::lexer::is_identifier;
use super::span::Spanned;
use crate::ast::StepKind;
use crate::config::CompileConfig;
use crate::core::PathCompileError;
use std::borrow::Cow;

const DOCUMENT_TOKEN: &str = "#document";

/// An attribute target before prefix resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedAttribute {
    /// Namespace prefix as written
    pub prefix: Option<String>,
    /// Attribute local name
    pub local: String,
}

/// A step before prefix resolution and predicate compilation
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedStep {
    /// What the step matches
    pub kind: StepKind,
    /// Namespace prefix as written
    pub prefix: Option<String>,
    /// Fused attribute target
    pub attribute: Option<UnresolvedAttribute>,
    /// Raw predicate clauses, without brackets, in selector order
    pub predicates: Vec<Spanned<String>>,
    /// Anchored at the document root
    pub rooted: bool,
}

impl UnresolvedStep {
    fn new(kind: StepKind) -> Self {
        let rooted = matches!(kind, StepKind::DocumentRoot);
        Self {
            kind,
            prefix: None,
            attribute: None,
            predicates: Vec::new(),
            rooted,
        }
    }
}

/// A selector whose shape is known but whose prefixes are not yet bound
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedPath {
    selector: String,
    steps: Vec<UnresolvedStep>,
}

impl UnresolvedPath {
    /// Read a selector
    pub fn parse(selector: &str, config: &CompileConfig) -> Result<Self, PathCompileError> {
        parse_selector(selector, config)
    }

    /// Selector text, trimmed
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Steps in selector order
    pub fn steps(&self) -> &[UnresolvedStep] {
        &self.steps
    }

    /// Distinct namespace prefixes used by element and attribute names
    pub fn prefixes(&self) -> Vec<&str> {
        let mut prefixes: Vec<&str> = Vec::new();
        let used = self.steps.iter().flat_map(|step| {
            step.prefix
                .as_deref()
                .into_iter()
                .chain(step.attribute.as_ref().and_then(|a| a.prefix.as_deref()))
        });
        for prefix in used {
            if !prefixes.contains(&prefix) {
                prefixes.push(prefix);
            }
        }
        prefixes
    }
}

/// Read a selector into an [`UnresolvedPath`]
pub fn parse_selector(
    selector: &str,
    config: &CompileConfig,
) -> Result<UnresolvedPath, PathCompileError> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Err(PathCompileError::Empty);
    }
    let parser = SelectorParser { selector, config };
    let normalized = parser.normalize_whitespace()?;
    let steps = parser.parse_steps(&normalized)?;
    Ok(UnresolvedPath {
        selector: selector.to_string(),
        steps,
    })
}

struct SelectorParser<'a> {
    selector: &'a str,
    config: &'a CompileConfig,
}

impl SelectorParser<'_> {
    fn invalid(&self, segment: &str) -> PathCompileError {
        PathCompileError::InvalidSegment {
            selector: self.selector.to_string(),
            segment: segment.to_string(),
        }
    }

    fn unsupported(&self, axis: &str) -> PathCompileError {
        PathCompileError::UnsupportedAxis {
            selector: self.selector.to_string(),
            axis: axis.to_string(),
        }
    }

    /// Drop or rewrite whitespace outside predicate clauses
    ///
    /// Whitespace between two names separates steps in the legacy contextual
    /// form; whitespace next to `/`, before `[` or at the edges is dropped.
    fn normalize_whitespace(&self) -> Result<Cow<'_, str>, PathCompileError> {
        let selector = self.selector;
        if !selector.contains(char::is_whitespace) {
            return Ok(Cow::Borrowed(selector));
        }

        let mut out = String::with_capacity(selector.len());
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut chars = selector.chars().peekable();

        while let Some(c) = chars.next() {
            if depth > 0 {
                out.push(c);
                match (quote, c) {
                    (Some(q), c) if c == q => quote = None,
                    (Some(_), _) => {}
                    (None, '\'' | '"') => quote = Some(c),
                    (None, '[') => depth += 1,
                    (None, ']') => depth -= 1,
                    _ => {}
                }
                continue;
            }

            if c.is_whitespace() {
                while chars.next_if(|n| n.is_whitespace()).is_some() {}
                let previous = out.chars().last();
                let next = chars.peek().copied();
                let separates = matches!(
                    (previous, next),
                    (Some(p), Some(n)) if p != '/' && n != '/' && n != '['
                );
                if separates {
                    if !self.config.legacy_whitespace_separators {
                        return Err(self.invalid(selector));
                    }
                    out.push('/');
                }
                continue;
            }

            if c == '[' {
                depth += 1;
            }
            out.push(c);
        }
        Ok(Cow::Owned(out))
    }

    fn parse_steps(&self, text: &str) -> Result<Vec<UnresolvedStep>, PathCompileError> {
        let mut rooted = text.starts_with('/');
        let (text, ends_star_star) = match text.strip_suffix("//") {
            Some(rest) => (rest, true),
            None => (text, false),
        };
        let (body, offset) = match text.strip_prefix('/') {
            Some(rest) if rooted => (rest, 1),
            _ => (text, 0),
        };

        let mut segments = if body.is_empty() {
            Vec::new()
        } else {
            self.split_segments(body, offset)?
        };

        if !rooted && segments.first().is_some_and(|s| s.value == DOCUMENT_TOKEN) {
            segments.remove(0);
            rooted = true;
            if segments.len() == 1 && segments[0].value.is_empty() {
                segments.clear();
            }
        }

        let encoded = !rooted
            && self.config.allow_encoded_tokens
            && segments
                .first()
                .is_some_and(|s| s.value.starts_with(['$', '#']));

        let mut steps: Vec<UnresolvedStep> = Vec::with_capacity(segments.len() + 1);
        let last = segments.len().saturating_sub(1);

        for (i, segment) in segments.iter().enumerate() {
            let value = segment.value;

            if i == 0 && encoded {
                steps.push(UnresolvedStep::new(StepKind::Named(value.to_string())));
                continue;
            }

            if value.is_empty() {
                if i == last && !ends_star_star {
                    return Err(self.invalid(self.selector));
                }
                push_star_star(&mut steps);
                continue;
            }
            if value == "**" {
                push_star_star(&mut steps);
                continue;
            }
            if value.starts_with("**") {
                return Err(self.invalid(value));
            }

            let (name, clauses) = self.split_clauses(segment)?;
            self.check_axis(name)?;

            if let Some(attribute) = name.strip_prefix('@') {
                if i != last || ends_star_star {
                    return Err(PathCompileError::MisplacedAttribute {
                        selector: self.selector.to_string(),
                        attribute: attribute.to_string(),
                    });
                }
                let (prefix, local) = self.parse_attribute_name(attribute, value)?;
                let Some(owner) = steps
                    .last_mut()
                    .filter(|step| !matches!(step.kind, StepKind::DocumentRoot))
                else {
                    return Err(PathCompileError::AttributeWithoutElement {
                        selector: self.selector.to_string(),
                        attribute: attribute.to_string(),
                    });
                };
                owner.attribute = Some(UnresolvedAttribute { prefix, local });
                owner.predicates.extend(clauses);
                continue;
            }

            if name == DOCUMENT_TOKEN {
                return Err(PathCompileError::MisplacedDocumentRoot {
                    selector: self.selector.to_string(),
                });
            }

            let (prefix, kind) = self.parse_element_name(name, value)?;
            let mut step = UnresolvedStep::new(kind);
            step.prefix = prefix;
            step.predicates = clauses;
            steps.push(step);
        }

        if ends_star_star {
            push_star_star(&mut steps);
        }

        if rooted {
            match steps.first_mut() {
                None => steps.push(UnresolvedStep::new(StepKind::DocumentRoot)),
                Some(first) if !first.kind.is_star_star() => first.rooted = true,
                Some(_) => {
                    // `/**` alone keeps its anchor as an explicit document step;
                    // `/**/x` is the same as `**/x`.
                    if steps.len() == 1 {
                        steps.insert(0, UnresolvedStep::new(StepKind::DocumentRoot));
                    }
                }
            }
        }

        if steps.is_empty() {
            return Err(PathCompileError::Empty);
        }
        Ok(steps)
    }

    /// Split on `/` outside brackets and quoted strings
    fn split_segments<'t>(
        &self,
        text: &'t str,
        offset: usize,
    ) -> Result<Vec<Spanned<&'t str>>, PathCompileError> {
        let mut segments = Vec::new();
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut start = 0;

        for (i, c) in text.char_indices() {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '\'' | '"') if depth > 0 => quote = Some(c),
                (None, '[') => depth += 1,
                (None, ']') => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| self.invalid(&text[start..]))?;
                }
                (None, '/') if depth == 0 => {
                    segments.push(Spanned::new(&text[start..i], offset + start, offset + i));
                    start = i + 1;
                }
                _ => {}
            }
        }

        if depth > 0 || quote.is_some() {
            return Err(self.invalid(&text[start..]));
        }
        segments.push(Spanned::new(&text[start..], offset + start, offset + text.len()));
        Ok(segments)
    }

    /// Separate the name part of a segment from its `[..]` clauses
    fn split_clauses<'s>(
        &self,
        segment: &Spanned<&'s str>,
    ) -> Result<(&'s str, Vec<Spanned<String>>), PathCompileError> {
        let text = segment.value;
        let name_end = text.find('[').unwrap_or(text.len());
        let name = &text[..name_end];
        if name.contains(']') {
            return Err(self.invalid(text));
        }

        let mut clauses = Vec::new();
        let mut position = name_end;
        while position < text.len() {
            let rest = &text[position..];
            if !rest.starts_with('[') {
                return Err(self.invalid(text));
            }
            let close = matching_bracket(rest).ok_or_else(|| self.invalid(text))?;
            let (inner_start, inner_end) = (position + 1, position + close);
            clauses.push(segment.slice(inner_start, inner_end).into_owned());
            position = inner_end + 1;
        }
        Ok((name, clauses))
    }

    fn check_axis(&self, name: &str) -> Result<(), PathCompileError> {
        match name {
            "." => Err(self.unsupported("self::node()")),
            ".." => Err(self.unsupported("parent::node()")),
            _ if name.contains("::") || name.contains('(') => Err(self.unsupported(name)),
            _ => Ok(()),
        }
    }

    fn parse_element_name(
        &self,
        name: &str,
        segment: &str,
    ) -> Result<(Option<String>, StepKind), PathCompileError> {
        let (prefix, local) = self.split_prefix(name, segment)?;
        let kind = match local {
            "*" => StepKind::Star,
            local if is_identifier(local) => StepKind::Named(local.to_string()),
            _ => return Err(self.invalid(segment)),
        };
        Ok((prefix, kind))
    }

    fn parse_attribute_name(
        &self,
        name: &str,
        segment: &str,
    ) -> Result<(Option<String>, String), PathCompileError> {
        let (prefix, local) = self.split_prefix(name, segment)?;
        if !is_identifier(local) {
            return Err(self.invalid(segment));
        }
        Ok((prefix, local.to_string()))
    }

    fn split_prefix<'n>(
        &self,
        name: &'n str,
        segment: &str,
    ) -> Result<(Option<String>, &'n str), PathCompileError> {
        match name.split_once(':') {
            Some((prefix, local)) if is_identifier(prefix) => Ok((Some(prefix.to_string()), local)),
            Some(_) => Err(self.invalid(segment)),
            None => Ok((None, name)),
        }
    }
}

fn push_star_star(steps: &mut Vec<UnresolvedStep>) {
    let collapses = steps
        .last()
        .is_some_and(|step| step.kind.is_star_star() && step.attribute.is_none());
    if !collapses {
        steps.push(UnresolvedStep::new(StepKind::StarStar));
    }
}

/// Byte offset of the `]` closing the `[` at the start of `text`
fn matching_bracket(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
