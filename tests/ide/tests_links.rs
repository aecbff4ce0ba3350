//! Find-definition and declaration/definition switching.

use cppmodel::FilePath;
use cppmodel::hir::{LookupItem, SymbolKind, SymbolRef};
use cppmodel::ide::{find_macro_link, skip_forward_declarations};
use rstest::rstest;

use crate::helpers::model_helpers::*;
use crate::helpers::source_fixtures::*;

fn foo_snapshot() -> cppmodel::Snapshot {
    snapshot_from_sources(&[("/w/foo.h", FOO_HEADER), ("/w/foo.cpp", FOO_SOURCE)])
}

// =============================================================================
// DECLARATION / DEFINITION
// =============================================================================

#[test]
fn test_switch_from_body_jumps_to_header_declaration() {
    let snapshot = foo_snapshot();
    let resolver = resolver(&snapshot, "/w/foo.cpp", FOO_SOURCE);

    let link = resolver.switch_declaration_definition(offset_of(FOO_SOURCE, "int unused", 0));

    assert_eq!(link.file, Some(FilePath::new("/w/foo.h")));
    assert_eq!((link.line, link.column), (4, 9));
}

#[test]
fn test_switch_from_header_jumps_to_definition() {
    let snapshot = foo_snapshot();
    let resolver = resolver(&snapshot, "/w/foo.h", FOO_HEADER);

    let link = resolver.switch_declaration_definition(offset_of(FOO_HEADER, "bar", 1));

    assert_eq!(link.file, Some(FilePath::new("/w/foo.cpp")));
    assert_eq!((link.line, link.column), (3, 10));
}

#[test]
fn test_definition_name_links_to_declaration() {
    let snapshot = foo_snapshot();
    let resolver = resolver(&snapshot, "/w/foo.cpp", FOO_SOURCE);

    let link = resolver.find_link_at(offset_of(FOO_SOURCE, "bar()", 1), true);

    assert_eq!(link.file, Some(FilePath::new("/w/foo.h")));
    assert_eq!((link.line, link.column), (4, 9));
    assert_eq!(&FOO_SOURCE[link.begin..link.end], "Foo::bar");
}

#[test]
fn test_declaration_name_links_to_definition() {
    let snapshot = foo_snapshot();
    let resolver = resolver(&snapshot, "/w/foo.h", FOO_HEADER);

    let link = resolver.find_link_at(offset_of(FOO_HEADER, "count", 2), false);

    assert_eq!(link.file, Some(FilePath::new("/w/foo.cpp")));
    assert_eq!((link.line, link.column), (10, 9));
    assert_eq!(&FOO_HEADER[link.begin..link.end], "count");
}

#[rstest]
#[case(true, "/w/foo.cpp", 10, 9)]
#[case(false, "/w/foo.h", 5, 8)]
fn test_call_site_link(
    #[case] resolve_target: bool,
    #[case] file: &str,
    #[case] line: u32,
    #[case] column: u32,
) {
    let snapshot = foo_snapshot();
    let resolver = resolver(&snapshot, "/w/foo.cpp", FOO_SOURCE);

    let link = resolver.find_link_at(offset_of(FOO_SOURCE, "count(used", 1), resolve_target);

    assert_eq!(link.file, Some(FilePath::new(file)));
    assert_eq!((link.line, link.column), (line, column));
    assert_eq!(&FOO_SOURCE[link.begin..link.end], "count");
}

// =============================================================================
// SIBLING CLASSES
// =============================================================================

#[test]
fn test_sibling_declarations_link_to_their_own_definitions() {
    let snapshot = snapshot_from_sources(&[("/w/tasks.cpp", SIBLING_CLASSES)]);
    let resolver = resolver(&snapshot, "/w/tasks.cpp", SIBLING_CLASSES);

    let reader = resolver.find_link_at(offset_of(SIBLING_CLASSES, "void run()", 6), true);
    let writer_offset = SIBLING_CLASSES.rfind("void run()").unwrap() + 6;
    let writer = resolver.find_link_at(writer_offset, true);

    assert_eq!((reader.line, reader.column), (13, 13));
    assert_eq!((writer.line, writer.column), (14, 13));
}

#[test]
fn test_member_call_links_to_its_class_definition() {
    let snapshot = snapshot_from_sources(&[("/w/tasks.cpp", SIBLING_CLASSES)]);
    let resolver = resolver(&snapshot, "/w/tasks.cpp", SIBLING_CLASSES);

    let link = resolver.find_link_at(offset_of(SIBLING_CLASSES, "writer.run", 8), true);

    assert_eq!((link.line, link.column), (14, 13));
}

#[test]
fn test_switch_from_sibling_definition() {
    let snapshot = snapshot_from_sources(&[("/w/tasks.cpp", SIBLING_CLASSES)]);
    let resolver = resolver(&snapshot, "/w/tasks.cpp", SIBLING_CLASSES);

    let link = resolver.switch_declaration_definition(offset_of(SIBLING_CLASSES, "Writer::run", 9));

    assert_eq!((link.line, link.column), (10, 9));
}

const MEMBERS: &str = "\
struct S
{
    int size;
    void f(int);
};
namespace bb { int xx; }
int use(S s)
{
    s.f(1);
    return s.size + use(s) + bb::xx;
}
";

#[rstest]
#[case("s.f(1)", 2, 4, "f")]
#[case("s.size", 2, 3, "size")]
#[case("use(s)", 4, 7, "s")]
#[case("bb::xx", 4, 6, "xx")]
fn test_first_character_after_punctuation_links(
    #[case] needle: &str,
    #[case] shift: usize,
    #[case] line: u32,
    #[case] name: &str,
) {
    let snapshot = snapshot_from_sources(&[("/w/members.cpp", MEMBERS)]);
    let resolver = resolver(&snapshot, "/w/members.cpp", MEMBERS);
    let offset = MEMBERS.rfind(needle).unwrap() + shift;

    let link = resolver.find_link_at(offset, false);

    assert!(link.is_valid());
    assert_eq!(link.line, line);
    assert_eq!(&MEMBERS[link.begin..link.end], name);
}

// =============================================================================
// FORWARD DECLARATIONS
// =============================================================================

const FORWARD: &str = "class Widget;\nclass Widget;\nclass Widget\n{\n};\nWidget *current;\n";

#[test]
fn test_forward_declarations_are_skipped() {
    let snapshot = snapshot_from_sources(&[("/w/fwd.cpp", FORWARD)]);
    let document = document(&snapshot, "/w/fwd.cpp");
    let items: Vec<LookupItem> = document
        .symbols()
        .symbols()
        .filter(|(_, s)| s.name() == Some("Widget"))
        .map(|(id, _)| LookupItem::of_symbol(SymbolRef::new(document.clone(), id)))
        .collect();
    let kinds: Vec<SymbolKind> = items
        .iter()
        .filter_map(|i| i.declaration.as_ref().map(|d| d.kind()))
        .collect();
    assert_eq!(
        kinds,
        vec![SymbolKind::ForwardClass, SymbolKind::ForwardClass, SymbolKind::Class]
    );

    let chosen = skip_forward_declarations(&items).and_then(|i| i.declaration.clone());
    assert_eq!(chosen.map(|d| d.line()), Some(3));
}

#[rstest]
#[case(false)]
#[case(true)]
fn test_type_use_links_past_forward_declarations(#[case] resolve_target: bool) {
    let snapshot = snapshot_from_sources(&[("/w/fwd.cpp", FORWARD)]);
    let resolver = resolver(&snapshot, "/w/fwd.cpp", FORWARD);

    let link = resolver.find_link_at(offset_of(FORWARD, "Widget *", 2), resolve_target);

    assert_eq!((link.line, link.column), (3, 6));
}

// =============================================================================
// INCLUDES AND MACROS
// =============================================================================

#[test]
fn test_include_links_to_first_line() {
    let snapshot = foo_snapshot();
    let resolver = resolver(&snapshot, "/w/foo.cpp", FOO_SOURCE);

    let link = resolver.find_link_at(offset_of(FOO_SOURCE, "foo.h", 1), false);

    assert_eq!(link.file, Some(FilePath::new("/w/foo.h")));
    assert_eq!((link.line, link.column), (1, 0));
    assert_eq!(&FOO_SOURCE[link.begin..link.end], "foo.h");
}

#[rstest]
#[case("FOO;", 1)]
#[case("TWICE(value)", 2)]
fn test_macro_use_links_to_definition(#[case] needle: &str, #[case] line: u32) {
    let snapshot =
        snapshot_from_sources(&[("/w/macros.h", MACRO_HEADER), ("/w/use.cpp", MACRO_SOURCE)]);
    let resolver = resolver(&snapshot, "/w/use.cpp", MACRO_SOURCE);

    let link = resolver.find_link_at(offset_of(MACRO_SOURCE, needle, 1), true);

    assert_eq!(link.file, Some(FilePath::new("/w/macros.h")));
    assert_eq!(link.line, line);
    let name = needle.trim_end_matches(';').split('(').next().unwrap();
    assert_eq!(&MACRO_SOURCE[link.begin..link.end], name);
}

#[test]
fn test_macro_link_through_include_graph() {
    let snapshot = snapshot_from_sources(&[
        ("/w/macros.h", MACRO_HEADER),
        ("/w/middle.h", "#include \"macros.h\"\n"),
        ("/w/use.cpp", "#include \"middle.h\"\nint v = FOO;\n"),
    ]);
    let document = document(&snapshot, "/w/use.cpp");

    let link = find_macro_link("FOO", &document, &snapshot);

    assert_eq!(link.file, Some(FilePath::new("/w/macros.h")));
    assert_eq!(link.line, 1);
}

#[test]
fn test_nothing_under_cursor_is_invalid() {
    let snapshot = foo_snapshot();
    let resolver = resolver(&snapshot, "/w/foo.cpp", FOO_SOURCE);

    assert!(!resolver.find_link_at(offset_of(FOO_SOURCE, "+=", 0), true).is_valid());
    assert!(!resolver.find_link_at(FOO_SOURCE.len() + 10, true).is_valid());
}
