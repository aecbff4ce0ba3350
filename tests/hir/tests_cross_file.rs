//! Name and expression resolution over several documents of one snapshot.

use cppmodel::Position;
use cppmodel::hir::{LookupContext, LookupItem, SymbolKind, TypeOfExpression};
use cppmodel::ide::link_to_symbol;
use cppmodel::parser::parse_expression;
use rstest::rstest;

use crate::helpers::model_helpers::*;

const SHAPES_H: &str = "\
namespace geo {
struct Point { int x; int y; };
class Shape
{
public:
    virtual Point anchor() const;
    Point *origin;
};
}
";

const CIRCLE_H: &str = "\
#include \"shapes.h\"
namespace geo {
class Circle : public Shape
{
public:
    Point anchor() const;
    int radius;
};
}
";

const MAIN_CPP: &str = "\
#include \"circle.h\"
using namespace geo;
int area(Circle *circle)
{
    return circle->radius * circle->anchor().x;
}
";

const GENERATED: &str = "\
#define DECLARE_GETTER(name) int name();
struct Settings
{
    DECLARE_GETTER(width)
};
int measure(Settings &settings)
{
    return settings.width();
}
";

fn resolve(context: &LookupContext, expression: &str, line: u32, column: u32) -> Vec<LookupItem> {
    let position = Position::new(line, column);
    let expression = parse_expression(expression, position).unwrap();
    TypeOfExpression::new(context).resolve(&expression, &context.scope_at(position), position)
}

fn main_context() -> LookupContext {
    let snapshot = snapshot_from_sources(&[
        ("/w/shapes.h", SHAPES_H),
        ("/w/circle.h", CIRCLE_H),
        ("/w/main.cpp", MAIN_CPP),
    ]);
    LookupContext::new(document(&snapshot, "/w/main.cpp"), &snapshot)
}

#[rstest]
#[case("circle->radius", "/w/circle.h", 7)]
#[case("circle->origin", "/w/shapes.h", 7)]
#[case("circle->anchor().x", "/w/shapes.h", 2)]
fn test_members_resolve_through_include_chain(
    #[case] expression: &str,
    #[case] file: &str,
    #[case] line: u32,
) {
    let context = main_context();

    let items = resolve(&context, expression, 5, 12);

    let declaration = items[0].declaration.as_ref().unwrap();
    assert_eq!(declaration.file().as_str(), file);
    assert_eq!(declaration.line(), line);
}

#[test]
fn test_override_hides_base_declaration() {
    let context = main_context();

    let items = resolve(&context, "circle->anchor", 5, 12);

    let declaration = items[0].declaration.as_ref().unwrap();
    assert_eq!(declaration.qualified_name(), vec!["geo", "Circle", "anchor"]);
}

#[test]
fn test_visible_documents_follow_includes() {
    let context = main_context();

    let mut visible: Vec<&str> = context
        .visible_documents()
        .iter()
        .map(|d| d.path().as_str())
        .collect();
    visible.sort();

    assert_eq!(visible, vec!["/w/circle.h", "/w/main.cpp", "/w/shapes.h"]);
}

#[test]
fn test_macro_generated_member_links_to_line_start() {
    let snapshot = snapshot_from_sources(&[("/w/settings.cpp", GENERATED)]);
    let width = symbol(&snapshot, "/w/settings.cpp", "width", SymbolKind::Declaration);

    assert!(width.symbol().generated);
    let link = link_to_symbol(&width);
    assert_eq!((link.line, link.column), (4, 0));
}
