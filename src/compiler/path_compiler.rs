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

use crate::ast::{Path, Step};
use crate::config::CompileConfig;
use crate::core::{NamespaceMap, PathCompileError, QualifiedName};
use crate::evaluator::{BuiltinPredicateCompiler, PredicateCompiler};
use crate::parser::{UnresolvedPath, UnresolvedStep};
use std::fmt;
use std::sync::Arc;

/// Turns selector text into [`Path`] values
///
/// Holds the compile settings and the predicate compiler used for `[..]`
/// clauses. Cheap to clone and safe to share.
#[derive(Clone)]
pub struct PathCompiler {
    config: CompileConfig,
    predicates: Arc<dyn PredicateCompiler>,
}

impl Default for PathCompiler {
    fn default() -> Self {
        Self::new(CompileConfig::default())
    }
}

impl fmt::Debug for PathCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathCompiler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PathCompiler {
    /// Compiler using the built-in predicate language
    pub fn new(config: CompileConfig) -> Self {
        Self {
            config,
            predicates: Arc::new(BuiltinPredicateCompiler),
        }
    }

    /// Replace the predicate compiler
    pub fn with_predicate_compiler(mut self, predicates: impl PredicateCompiler + 'static) -> Self {
        self.predicates = Arc::new(predicates);
        self
    }

    /// Compile settings
    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    /// Read the selector shape without binding prefixes
    pub fn parse(&self, selector: &str) -> Result<UnresolvedPath, PathCompileError> {
        UnresolvedPath::parse(selector, &self.config)
    }

    /// Parse and resolve in one go
    pub fn compile(
        &self,
        selector: &str,
        namespaces: &NamespaceMap,
    ) -> Result<Path, PathCompileError> {
        let unresolved = self.parse(selector)?;
        self.resolve(&unresolved, namespaces)
    }

    /// Bind prefixes and compile predicate clauses
    pub fn resolve(
        &self,
        unresolved: &UnresolvedPath,
        namespaces: &NamespaceMap,
    ) -> Result<Path, PathCompileError> {
        let selector = unresolved.selector();
        let steps = unresolved
            .steps()
            .iter()
            .map(|raw| self.resolve_step(selector, raw, namespaces))
            .collect::<Result<Vec<_>, _>>()?;

        let path = Path::from_steps(selector, steps)?;
        log::debug!("compiled selector '{selector}' as {path}");
        Ok(path)
    }

    fn resolve_step(
        &self,
        selector: &str,
        raw: &UnresolvedStep,
        namespaces: &NamespaceMap,
    ) -> Result<Step, PathCompileError> {
        let mut step = Step::new(raw.kind.clone()).with_rooted(raw.rooted);

        if let Some(prefix) = &raw.prefix {
            step = step.with_namespace(bind(selector, prefix, namespaces)?);
        }

        if let Some(attribute) = &raw.attribute {
            let name = match &attribute.prefix {
                Some(prefix) => QualifiedName::with_namespace(
                    bind(selector, prefix, namespaces)?,
                    attribute.local.as_str(),
                ),
                None => QualifiedName::new(attribute.local.as_str()),
            };
            step = step.with_attribute_target(name);
        }

        for clause in &raw.predicates {
            let predicate = self
                .predicates
                .compile(&clause.value, namespaces)
                .map_err(|source| {
                    log::debug!(
                        "predicate at {:?} of '{selector}' rejected: {source}",
                        clause.range()
                    );
                    PathCompileError::Predicate {
                        selector: selector.to_string(),
                        source,
                    }
                })?;
            step = step.with_predicate(predicate);
        }

        Ok(step)
    }
}

fn bind<'n>(
    selector: &str,
    prefix: &str,
    namespaces: &'n NamespaceMap,
) -> Result<&'n str, PathCompileError> {
    namespaces
        .resolve(prefix)
        .ok_or_else(|| PathCompileError::UnboundPrefix {
            selector: selector.to_string(),
            prefix: prefix.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Predicate;
    use crate::parser::ParseResult;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prefixes_resolve_late() {
        let compiler = PathCompiler::default();
        let unresolved = compiler.parse("p:a/@q:b").unwrap();
        assert_eq!(unresolved.prefixes(), vec!["p", "q"]);

        assert_eq!(
            compiler.resolve(&unresolved, &NamespaceMap::new()).unwrap_err(),
            PathCompileError::UnboundPrefix {
                selector: "p:a/@q:b".to_string(),
                prefix: "p".to_string()
            }
        );

        let namespaces = NamespaceMap::new().with("p", "http://p").with("q", "http://q");
        let path = compiler.resolve(&unresolved, &namespaces).unwrap();
        assert_eq!(path.to_string(), "{http://p}a{@{http://q}b}");
    }

    #[test]
    fn test_predicate_errors_carry_selector() {
        let err = Path::compile("a[@x = ]", &NamespaceMap::new()).unwrap_err();
        assert!(matches!(err, PathCompileError::Predicate { ref selector, .. } if selector == "a[@x = ]"));
    }

    #[test]
    fn test_text_predicate_only_on_last_step() {
        let ns = NamespaceMap::new();
        assert!(Path::compile("a/b[text() = 'x']", &ns).is_ok());
        assert!(matches!(
            Path::compile("a[text() = 'x']/b", &ns),
            Err(PathCompileError::TextAccessNotLast { .. })
        ));
    }

    struct Always;

    impl PredicateCompiler for Always {
        fn compile(&self, clause: &str, _namespaces: &NamespaceMap) -> ParseResult<Predicate> {
            Ok(Predicate::new(format!("<{clause}>"), |_, _| Ok(true)))
        }
    }

    #[test]
    fn test_custom_predicate_compiler() {
        let compiler = PathCompiler::default().with_predicate_compiler(Always);
        let path = compiler.compile("a[anything goes]", &NamespaceMap::new()).unwrap();
        assert_eq!(path.to_string(), "a<anything goes>");
    }
}
