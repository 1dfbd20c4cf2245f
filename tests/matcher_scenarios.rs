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

//! Matching scenarios run in tree mode and stream mode

mod common;

use common::{document_results, matched_names, shop, stream_results, tree_results};
use fragpath::model::{Document, replay};
use fragpath::{
    Condition, EvaluationContext, EvaluationError, FragPathError, Matcher, MatcherConfig,
    NamespaceMap, Path, Predicate, Step,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn compile(selector: &str) -> Path {
    common::init_logging();
    let namespaces = NamespaceMap::new().with("shop", "urn:shop");
    Path::compile(selector, &namespaces)
        .unwrap_or_else(|e| panic!("'{selector}' failed to compile: {e}"))
}

fn both_modes(path: &Path, matcher: &Matcher, ctx: &EvaluationContext) -> Vec<String> {
    let doc = shop();
    let tree = tree_results(&doc, path, matcher, ctx);
    let stream = stream_results(&doc, path, matcher, ctx);
    assert_eq!(tree, stream, "tree and stream disagree for '{}'", path.selector());
    matched_names(&doc, &tree)
}

#[rstest]
#[case("order/item", &["item:A", "item:C", "item:D"])]
#[case("note/item", &["item:B"])]
#[case("item", &["item:A", "item:B", "item:C", "item:D"])]
#[case("**/item", &["item:A", "item:B", "item:C", "item:D"])]
#[case("order/**/item", &["item:A", "item:B", "item:C", "item:D"])]
#[case("order/*/item", &["item:B"])]
#[case("/root/**/note/item", &["item:B"])]
#[case("#document/root/order/item", &["item:A", "item:C", "item:D"])]
#[case("/order", &[])]
#[case("/root", &["root"])]
#[case("/root/order", &["order", "order"])]
#[case("root/*", &["order", "order"])]
#[case("root/*/*", &["item:A", "note", "item:C", "item:D"])]
#[case("/", &[])]
#[case("/**", &["root", "order", "item:A", "note", "item:B", "item:C", "order", "item:D"])]
#[case("**", &["root", "order", "item:A", "note", "item:B", "item:C", "order", "item:D"])]
#[case("order/**", &["order", "item:A", "note", "item:B", "item:C", "order", "item:D"])]
#[case("note/**", &["note", "item:B"])]
#[case("item[@price > 9]", &["item:A", "item:B"])]
#[case("item[@price < 9 or @sku = 'D']", &["item:C", "item:D"])]
#[case("item[2]", &["item:C"])]
#[case("item[text() = 'banana']", &["item:B"])]
#[case("order[@id = '2']/item", &["item:D"])]
#[case("order[@id = '1']/**/item[@price = 25]", &["item:B"])]
#[case("shop:item", &["item:D"])]
#[case("shop:order/item", &["item:D"])]
#[case("shop:*", &["order", "item:D"])]
#[case("*/@sku", &["item:A", "item:B", "item:C", "item:D"])]
#[case("**/@id", &["order", "order"])]
#[case("/**/@id", &["order", "order"])]
#[case("note/item/@price", &["item:B"])]
#[case("root order item", &["item:A", "item:C", "item:D"])]
fn test_scenarios(#[case] selector: &str, #[case] expected: &[&str]) {
    let path = compile(selector);
    let matched = both_modes(&path, &Matcher::default(), &EvaluationContext::new());
    assert_eq!(matched, expected, "{selector}");
}

/// `a id=1 / a id=2 / c`
fn nested_anchors() -> Document {
    Document::with_root("a", |outer| {
        outer.attr("id", "1");
        outer.child("a", |inner| {
            inner.attr("id", "2");
            inner.child("c", |_| {});
        });
    })
}

#[rstest]
#[case("a[@id = '2']/**/c", true)]
#[case("a[@id = '1']/**/c", false)]
#[case("a[@id = '1']/a/c", true)]
#[case("a/**/c", true)]
#[case("/a/**/c", false)]
#[case("/a/*/c", true)]
fn test_recursive_wildcard_anchors_on_nearest_ancestor(
    #[case] selector: &str,
    #[case] expected: bool,
) {
    let doc = nested_anchors();
    let path = compile(selector);
    let matcher = Matcher::default();
    let ctx = EvaluationContext::new();
    let c = common::first(&doc, "c");

    let tree = tree_results(&doc, &path, &matcher, &ctx);
    let stream = stream_results(&doc, &path, &matcher, &ctx);
    assert_eq!(tree, stream, "{selector}");
    assert_eq!(tree[&c], expected, "{selector}");
}

#[rstest]
#[case("/", true)]
#[case("#document", true)]
#[case("/**", false)]
#[case("**", false)]
#[case("*", false)]
#[case("item", false)]
fn test_document_fragment(#[case] selector: &str, #[case] expected: bool) {
    let doc = shop();
    let path = compile(selector);
    let (tree, stream) =
        document_results(&doc, &path, &Matcher::default(), &EvaluationContext::new());
    assert_eq!(tree, expected);
    assert_eq!(stream, expected);
}

#[test]
fn test_attribute_presence_can_be_relaxed() {
    let path = compile("*/@sku");
    let lenient = Matcher::new(MatcherConfig::default().with_attribute_presence(false));
    let matched = both_modes(&path, &lenient, &EvaluationContext::new());
    assert_eq!(matched.len(), 8);
}

#[test]
fn test_namespace_uri_constrains_target_only() {
    let path = compile("order/item").with_namespace_uri("urn:shop");
    let matched = both_modes(&path, &Matcher::default(), &EvaluationContext::new());
    assert_eq!(matched, vec!["item:D"]);

    let path = path.with_namespace_uri("*");
    let matched = both_modes(&path, &Matcher::default(), &EvaluationContext::new());
    assert_eq!(matched.len(), 3);
}

#[test]
fn test_condition_gates_every_fragment() {
    let path = compile("item").with_condition(Condition::variable("enabled"));
    let matcher = Matcher::default();

    let off = both_modes(&path, &matcher, &EvaluationContext::new());
    assert!(off.is_empty());

    let ctx = EvaluationContext::new().with_variable("enabled", "yes");
    let on = both_modes(&path, &matcher, &ctx);
    assert_eq!(on.len(), 4);
}

#[test]
fn test_predicate_errors_propagate() {
    let failing = Predicate::new("explode", |_, _| {
        Err(EvaluationError::Custom("evaluator failed".to_string()))
    });
    let path = Path::from_steps("item", [Step::named("item").with_predicate(failing)]).unwrap();
    let doc = shop();
    let matcher = Matcher::default();
    let ctx = EvaluationContext::new();

    let result = replay::<FragPathError, _>(&doc, |_, fragment| {
        matcher.is_match(&path, &fragment, &ctx)?;
        Ok(())
    });
    assert!(matches!(
        result,
        Err(FragPathError::Evaluation(EvaluationError::Custom(_)))
    ));
}

#[test]
fn test_custom_predicate_reads_fragment() {
    let long_text = Predicate::new("long text", |fragment, _| Ok(fragment.text().len() > 5))
        .with_text_access();
    let path = Path::from_steps("**/item", [Step::star_star(), Step::named("item").with_predicate(long_text)])
        .unwrap();
    let matched = both_modes(&path, &Matcher::default(), &EvaluationContext::new());
    assert_eq!(matched, vec!["item:B", "item:C"]);
}

#[test]
fn test_matching_is_idempotent() {
    let path = compile("order/**/item[@price > 5]");
    let matcher = Matcher::default();
    let ctx = EvaluationContext::new();
    let first = both_modes(&path, &matcher, &ctx);
    let second = both_modes(&path, &matcher, &ctx);
    assert_eq!(first, second);
}
