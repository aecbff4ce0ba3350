//! Background semantic highlighter behaviour.

use std::sync::Arc;

use cppmodel::hir::{UseKind, is_unused};
use cppmodel::ide::{SemanticHighlighter, SemanticInfo, SemanticInfoSource};
use cppmodel::{FilePath, SourceCache};

use crate::helpers::model_helpers::*;
use crate::helpers::source_fixtures::*;

fn foo_request(cache: &SourceCache, text: &str, revision: u32) -> SemanticInfoSource {
    SemanticInfoSource::new(FilePath::new("/w/foo.cpp"), text, revision, cache.snapshot()).at(5, 9)
}

fn next_result(highlighter: &SemanticHighlighter) -> SemanticInfo {
    highlighter
        .results()
        .recv_timeout(TIMEOUT)
        .expect("highlighter should publish a result")
}

/// A body large enough that checking it takes noticeably longer than posting.
fn large_source() -> String {
    let mut text = String::from("#include \"foo.h\"\n\nvoid Foo::bar()\n{\n");
    for i in 0..400 {
        text.push_str(&format!("    int v{i} = {i};\n    v{i} += count(v{i}, {i});\n"));
    }
    text.push_str("}\n");
    text
}

#[test]
fn test_same_revision_is_computed_once() {
    let cache = cache_from_sources(&[("/w/foo.h", FOO_HEADER), ("/w/foo.cpp", FOO_SOURCE)]);
    let highlighter = SemanticHighlighter::start(cache.clone()).unwrap();

    highlighter.rehighlight(foo_request(&cache, FOO_SOURCE, 3)).unwrap();
    let first = next_result(&highlighter);
    highlighter.rehighlight(foo_request(&cache, FOO_SOURCE, 3)).unwrap();
    let second = next_result(&highlighter);

    assert_eq!(first, second);
    assert_eq!(highlighter.parses(), 1);
    assert_eq!(highlighter.computations(), 2);
}

#[test]
fn test_forced_request_reparses() {
    let cache = cache_from_sources(&[("/w/foo.h", FOO_HEADER), ("/w/foo.cpp", FOO_SOURCE)]);
    let highlighter = SemanticHighlighter::start(cache.clone()).unwrap();

    highlighter.rehighlight(foo_request(&cache, FOO_SOURCE, 3)).unwrap();
    next_result(&highlighter);
    highlighter
        .rehighlight(foo_request(&cache, FOO_SOURCE, 3).forced(true))
        .unwrap();
    let forced = next_result(&highlighter);

    assert!(forced.forced);
    assert_eq!(highlighter.parses(), 2);
}

#[test]
fn test_burst_collapses_to_latest_revision() {
    const BURST: u32 = 100;
    let cache = cache_from_sources(&[("/w/foo.h", FOO_HEADER), ("/w/foo.cpp", FOO_SOURCE)]);
    let highlighter = SemanticHighlighter::start(cache.clone()).unwrap();
    let text = large_source();

    for revision in 1..=BURST {
        highlighter.rehighlight(foo_request(&cache, &text, revision)).unwrap();
    }

    let mut delivered = Vec::new();
    loop {
        let info = next_result(&highlighter);
        delivered.push(info.revision);
        if info.revision == BURST {
            break;
        }
    }

    assert!(delivered.windows(2).all(|w| w[0] < w[1]), "{delivered:?}");
    assert!(highlighter.computations() < BURST as usize);
}

#[test]
fn test_unused_local_is_reported() {
    let cache = cache_from_sources(&[("/w/foo.h", FOO_HEADER), ("/w/foo.cpp", FOO_SOURCE)]);
    let highlighter = SemanticHighlighter::start(cache.clone()).unwrap();

    highlighter.rehighlight(foo_request(&cache, FOO_SOURCE, 1)).unwrap();
    let info = next_result(&highlighter);

    let unused: Vec<&str> = info
        .local_uses
        .iter()
        .filter(|(key, uses)| is_unused(key, uses))
        .map(|(key, _)| key.name.as_str())
        .collect();
    assert_eq!(unused, vec!["unused"]);

    let used = info
        .local_uses
        .iter()
        .find(|(key, _)| key.name == "used")
        .map(|(_, uses)| uses.clone())
        .unwrap();
    assert_eq!(used.len(), 3);
    assert!(used.iter().all(|u| u.kind == UseKind::Local));
}

#[test]
fn test_results_carry_the_checked_document() {
    let cache = cache_from_sources(&[("/w/foo.h", FOO_HEADER)]);
    let highlighter = SemanticHighlighter::start(cache.clone()).unwrap();

    highlighter.rehighlight(foo_request(&cache, FOO_SOURCE, 7)).unwrap();
    let info = next_result(&highlighter);

    let document = info.document.clone().unwrap();
    assert_eq!(document.revision(), 7);
    assert!(info.snapshot.contains(&FilePath::new("/w/foo.h")));
    assert!(Arc::ptr_eq(
        info.snapshot.document(&FilePath::new("/w/foo.cpp")).unwrap(),
        &document
    ));
    assert!(!cache.contains(&FilePath::new("/w/foo.cpp")));
}

#[test]
fn test_local_captured_by_lambda_is_not_unused() {
    let text = "void f()\n{\n    int a = 0;\n    auto l = [&](int b) { return a + b; };\n    l(a);\n}\n";
    let cache = cache_from_sources(&[]);
    let highlighter = SemanticHighlighter::start(cache.clone()).unwrap();

    let request = SemanticInfoSource::new(FilePath::new("/w/lambda.cpp"), text, 1, cache.snapshot());
    highlighter.rehighlight(request.at(4, 35)).unwrap();
    let info = next_result(&highlighter);

    assert!(info.local_uses.keys().any(|key| key.name == "a"));
    assert_eq!(info.unused_uses().count(), 0);
}

#[test]
fn test_deep_nesting_does_not_stop_the_worker() {
    let depth = 20_000;
    let deep = format!("int x = {}1{};\n", "(".repeat(depth), ")".repeat(depth));
    let cache = cache_from_sources(&[("/w/foo.h", FOO_HEADER)]);
    let highlighter = SemanticHighlighter::start(cache.clone()).unwrap();

    highlighter.rehighlight(foo_request(&cache, &deep, 1)).unwrap();
    let info = next_result(&highlighter);
    assert!(info.diagnostics.iter().any(|d| d.text == "nesting too deep"));

    highlighter.rehighlight(foo_request(&cache, FOO_SOURCE, 2)).unwrap();
    assert_eq!(next_result(&highlighter).revision, 2);
}
