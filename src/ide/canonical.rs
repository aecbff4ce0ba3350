//! Choosing the one declaration that find-usages and rename operate on.

use std::ops::Range;

use super::expression::{expression_under_cursor, touches_identifier};
use crate::base::LineIndex;
use crate::base::text_utils::{end_of_identifier, word_at};
use crate::hir::{Document, LookupContext, LookupItem, ScopeKind, Snapshot, SymbolRef, TypeOfExpression};
use crate::parser::{Macro, parse_expression};

/// The expression ending with the identifier at or right before `offset`.
///
/// The cursor may sit anywhere in the identifier; the expression always runs
/// to its end so `a.me|mber` yields `a.member`.
pub fn scope_and_expression(text: &str, offset: usize) -> Option<Range<usize>> {
    let offset = offset.min(text.len());
    if !touches_identifier(text, offset) {
        return None;
    }
    expression_under_cursor(text, end_of_identifier(text, offset))
}

/// The canonical declaration of the name under the cursor.
pub fn canonical_symbol(context: &LookupContext, text: &str, offset: usize) -> Option<SymbolRef> {
    let range = scope_and_expression(text, offset)?;
    let lines = LineIndex::new(text);
    let position = lines.position(offset.min(text.len()));
    let expression = parse_expression(&text[range.clone()], lines.position(range.start))?;
    let scope = context.scope_at(position);
    let items = TypeOfExpression::new(context).resolve(&expression, &scope, position);
    select_canonical(&items)
}

/// Walking backwards, a virtual class member wins and constructors or
/// destructors are passed over; otherwise the first candidate with a
/// declaration.
pub fn select_canonical(items: &[LookupItem]) -> Option<SymbolRef> {
    for item in items.iter().rev() {
        let Some(declaration) = &item.declaration else {
            break;
        };
        let symbol = declaration.symbol();
        let table = declaration.document.symbols();
        let scope = table.scope(symbol.scope);
        if scope.kind != ScopeKind::Class {
            continue;
        }
        let class_name = scope.owner.and_then(|owner| table.symbol(owner).name());
        let name = symbol.name().map(|n| n.trim_start_matches('~'));
        if class_name.is_some() && class_name == name {
            continue;
        }
        if symbol.function_type().is_some_and(|f| f.is_virtual) {
            return Some(declaration.clone());
        }
    }
    items.iter().find_map(|item| item.declaration.clone())
}

/// The macro whose definition or use is under the cursor.
///
/// On a `#define` line the cursor must be on the macro name; elsewhere any
/// part of a use, arguments included, selects the macro it expands.
pub fn canonical_macro(document: &Document, snapshot: &Snapshot, text: &str, offset: usize) -> Option<Macro> {
    let line = LineIndex::new(text).position(offset.min(text.len())).line;
    if let Some(definition) = document.find_macro_definition_at(line) {
        let (begin, end) = word_at(text, offset)?;
        return (text[begin..end] == definition.name).then(|| definition.clone());
    }
    let found = document.find_macro_use_at(offset)?;
    let defining = if &found.definition_file == document.path() {
        document
    } else {
        snapshot.document(&found.definition_file)?
    };
    defining
        .defined_macros()
        .iter()
        .find(|m| m.line == found.definition_line && m.name == found.name)
        .cloned()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::base::FilePath;

    fn context(files: &[(&str, &str)], current: &str) -> LookupContext {
        let mut snapshot = Snapshot::default();
        for (path, source) in files {
            let preprocessed = snapshot.preprocessed_code(source, &FilePath::new(path), &[]);
            snapshot.insert_mut(Arc::new(Document::from_source(preprocessed, 1)));
        }
        let document = snapshot.document(&FilePath::new(current)).unwrap().clone();
        LookupContext::new(document, &snapshot)
    }

    #[test]
    fn test_scope_and_expression_runs_to_identifier_end() {
        let text = "obj.member = 1;";
        let range = scope_and_expression(text, 6).unwrap();
        assert_eq!(&text[range], "obj.member");
        let range = scope_and_expression(text, 10).unwrap();
        assert_eq!(&text[range], "obj.member");
        assert!(scope_and_expression(text, 12).is_none());
    }

    fn items_named(ctx: &LookupContext, name: &str) -> Vec<LookupItem> {
        let document = ctx.document();
        document
            .symbols()
            .symbols()
            .filter(|(_, s)| s.name() == Some(name))
            .map(|(id, _)| LookupItem::of_symbol(SymbolRef::new(document.clone(), id)))
            .collect()
    }

    #[test]
    fn test_virtual_base_declaration_is_canonical() {
        let text = "\
struct Base { virtual void draw(); };
struct Derived : Base { void draw(); };
";
        let ctx = context(&[("/p/shapes.cpp", text)], "/p/shapes.cpp");
        let mut items = items_named(&ctx, "draw");
        assert_eq!(items.len(), 2);
        // the override first, so only the virtual rule can pick the base
        items.reverse();
        assert_eq!(items[0].declaration.as_ref().unwrap().line(), 2);

        let symbol = select_canonical(&items).unwrap();
        assert_eq!(symbol.line(), 1);
        assert!(symbol.symbol().function_type().unwrap().is_virtual);
    }

    #[test]
    fn test_without_virtual_first_declaration_is_canonical() {
        let text = "\
struct Base { void draw(); };
struct Derived : Base { void draw(); };
";
        let ctx = context(&[("/p/shapes.cpp", text)], "/p/shapes.cpp");
        let mut items = items_named(&ctx, "draw");
        items.reverse();

        assert_eq!(select_canonical(&items).unwrap().line(), 2);
    }

    #[test]
    fn test_call_through_base_pointer_finds_virtual() {
        let text = "\
struct Base { virtual void draw(); };
void paint(Base *b)
{
    b->draw();
}
";
        let ctx = context(&[("/p/shapes.cpp", text)], "/p/shapes.cpp");
        let offset = text.find("draw();\n}").unwrap() + 1;
        let symbol = canonical_symbol(&ctx, text, offset).unwrap();
        assert_eq!(symbol.name(), Some("draw"));
        assert_eq!(symbol.line(), 1);
    }

    #[test]
    fn test_constructor_is_not_canonical_for_class_name() {
        let text = "\
struct Widget { Widget(); int size; };
void make()
{
    Widget w;
}
";
        let ctx = context(&[("/p/w.cpp", text)], "/p/w.cpp");
        let offset = text.find("Widget w").unwrap() + 2;
        let symbol = canonical_symbol(&ctx, text, offset).unwrap();
        assert_eq!(symbol.kind(), crate::hir::SymbolKind::Class);
    }

    #[test]
    fn test_canonical_macro_from_definition_and_use() {
        let text = "#define LIMIT 10\nint a = LIMIT;\n";
        let ctx = context(&[("/p/m.cpp", text)], "/p/m.cpp");
        let document = ctx.document();
        let from_definition = canonical_macro(document, ctx.snapshot(), text, 10).unwrap();
        assert_eq!(from_definition.name, "LIMIT");
        let use_offset = text.rfind("LIMIT").unwrap() + 1;
        let from_use = canonical_macro(document, ctx.snapshot(), text, use_offset).unwrap();
        assert!(from_use.same_definition(&from_definition));
        assert!(canonical_macro(document, ctx.snapshot(), text, 2).is_none());
    }
}
