//! Find-definition and declaration/definition switching.
//!
//! Given the checked document of an editor and its raw text, turn a cursor
//! offset into a [`Link`]: a target file position plus the anchor range in the
//! editor text that should be underlined while hovering. Resolution stages, in
//! order:
//!
//! 1. the name of a function declarator pairs a definition with its
//!    declaration and vice versa
//! 2. the method inside `SIGNAL(...)`/`SLOT(...)`
//! 3. the file of an `#include`
//! 4. the expression under the cursor, typed in its scope
//! 5. a macro of the same name, searched through the include graph
//!
//! A miss is an invalid link, never an error.

use std::ops::Range;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::trace;

use super::expression::{expression_under_cursor, extend_over_call};
use super::semantic_info::SemanticInfo;
use crate::base::text_utils::{char_at, is_identifier_char, word_at};
use crate::base::{FilePath, LineIndex, Position};
use crate::hir::{
    Binding, Document, LookupContext, LookupItem, ScopeKind, ScopeRef, Snapshot, SymbolKind,
    SymbolRef, TypeOfExpression,
};
use crate::parser::ast::Declaration;
use crate::parser::{AstNode, Token, TokenKind, parse_expression, token_at, tokenize_line};

/// A navigation target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Link {
    /// Target file; `None` for an invalid link.
    pub file: Option<FilePath>,
    /// 1-based target line.
    pub line: u32,
    /// 0-based target column.
    pub column: u32,
    /// Anchor start in the editor text (byte offset).
    pub begin: usize,
    /// Anchor end in the editor text (byte offset, exclusive).
    pub end: usize,
}

impl Link {
    pub fn new(file: FilePath, line: u32, column: u32) -> Self {
        Self {
            file: Some(file),
            line,
            column,
            begin: 0,
            end: 0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.file.is_some()
    }

    pub fn with_anchor(mut self, begin: usize, end: usize) -> Self {
        self.begin = begin;
        self.end = end;
        self
    }
}

/// Link to where a symbol's name is declared. Symbols produced by a macro
/// expansion link to the start of the line.
pub fn link_to_symbol(symbol: &SymbolRef) -> Link {
    let s = symbol.symbol();
    let column = if s.generated { 0 } else { s.column().saturating_sub(1) };
    Link::new(symbol.file().clone(), s.line(), column)
}

/// The first candidate, unless it is a forward declaration: then the first
/// candidate that is not one. All forward declarations keep the first.
pub fn skip_forward_declarations(items: &[LookupItem]) -> Option<&LookupItem> {
    let first = items.first()?;
    if !is_forward(first) {
        return Some(first);
    }
    Some(items.iter().find(|item| !is_forward(item)).unwrap_or(first))
}

fn is_forward(item: &LookupItem) -> bool {
    item.declaration
        .as_ref()
        .is_some_and(|d| d.symbol().is_forward_declaration())
}

/// The definition of a function declaration; `None` for anything else.
pub fn find_definition(symbol: &SymbolRef, snapshot: &Snapshot) -> Option<SymbolRef> {
    let s = symbol.symbol();
    if s.kind == SymbolKind::Function || !s.ty.is_function() {
        return None;
    }
    snapshot.find_matching_definition(symbol)
}

/// Declarations a function definition may belong to, best first: equal
/// signature, then equal argument count, then any function of that name.
pub fn find_matching_declaration(context: &LookupContext, function: &SymbolRef) -> Vec<SymbolRef> {
    let symbol = function.symbol();
    let (Some(function_type), Some(name)) = (symbol.function_type(), symbol.name()) else {
        return Vec::new();
    };
    let table = function.document.symbols();
    let mut scope = symbol.scope;
    while !matches!(
        table.scope(scope).kind,
        ScopeKind::Namespace | ScopeKind::Class | ScopeKind::Global
    ) {
        match table.scope(scope).parent {
            Some(parent) => scope = parent,
            None => break,
        }
    }

    let from = ScopeRef::new(function.document.clone(), scope);
    let qualified = if symbol.qualifier.is_empty() {
        None
    } else {
        context.resolve_qualifier(&symbol.qualifier, false, &from, symbol.position())
    };
    let enclosing = || {
        let s = table.scope(scope);
        match (s.kind, s.owner) {
            (ScopeKind::Class, Some(owner)) => {
                Some(Binding::Class(SymbolRef::new(function.document.clone(), owner)))
            }
            (ScopeKind::Class, None) => None,
            _ => Some(Binding::Namespace(table.namespace_path(scope))),
        }
    };
    let Some(binding) = qualified.or_else(enclosing) else {
        return Vec::new();
    };

    let (mut best, mut better, mut good) = (Vec::new(), Vec::new(), Vec::new());
    for candidate in context.members(&binding, name) {
        if candidate.kind() != SymbolKind::Declaration {
            continue;
        }
        let Some(candidate_type) = candidate.symbol().function_type() else {
            continue;
        };
        if candidate_type.is_signature_equal(function_type) {
            best.insert(0, candidate);
        } else if candidate_type.arguments.len() == function_type.arguments.len() {
            better.insert(0, candidate);
        } else {
            good.push(candidate);
        }
    }
    best.append(&mut better);
    best.append(&mut good);
    best
}

/// Link to the `#define` of `name`: the document's own macros first, then its
/// includes from the last one backwards, each file visited once.
pub fn find_macro_link(name: &str, document: &Document, snapshot: &Snapshot) -> Link {
    let mut processed = FxHashSet::default();
    macro_link(name, document, snapshot, &mut processed).unwrap_or_default()
}

fn macro_link(
    name: &str,
    document: &Document,
    snapshot: &Snapshot,
    processed: &mut FxHashSet<FilePath>,
) -> Option<Link> {
    if name.is_empty() || name.starts_with('<') || !processed.insert(document.path().clone()) {
        return None;
    }
    if let Some(found) = document.defined_macros().iter().find(|m| m.name == name) {
        return Some(Link::new(found.file.clone(), found.line, 0));
    }
    document.includes().iter().rev().find_map(|include| {
        let included = snapshot.document(include.resolved.as_ref()?)?;
        macro_link(name, included, snapshot, processed)
    })
}

// ============================================================================
// Resolver
// ============================================================================

/// Link resolution for one editor: its checked document, the snapshot the
/// document lives in and the text the offsets refer to.
pub struct LinkResolver<'a> {
    context: LookupContext,
    text: &'a str,
    lines: LineIndex,
}

impl<'a> LinkResolver<'a> {
    pub fn new(document: Arc<Document>, snapshot: &Snapshot, text: &'a str) -> Self {
        let snapshot = snapshot.insert(document.clone());
        Self {
            context: LookupContext::new(document, &snapshot),
            text,
            lines: LineIndex::new(text),
        }
    }

    /// Resolver over a published result; `None` before anything was checked.
    pub fn for_semantic_info(info: &SemanticInfo, text: &'a str) -> Option<Self> {
        let document = info.document.clone()?;
        Some(Self::new(document, &info.snapshot, text))
    }

    pub fn document(&self) -> &Arc<Document> {
        self.context.document()
    }

    pub fn snapshot(&self) -> &Snapshot {
        self.context.snapshot()
    }

    pub fn position(&self, offset: usize) -> Position {
        self.lines.position(offset)
    }

    fn offset(&self, position: Position) -> usize {
        self.lines.offset(position).unwrap_or(self.text.len())
    }

    /// The target of the name at `offset`. With `resolve_target`, function
    /// declarations jump on to their definition and forward declarations to
    /// their class.
    pub fn find_link_at(&self, offset: usize, resolve_target: bool) -> Link {
        let offset = offset.min(self.text.len());
        if let Some(link) = self.attempt_func_decl_def(offset) {
            return link;
        }

        let document = self.document();
        let position = self.position(offset);
        let line_start = self.lines.line_start(position.line).unwrap_or(0);
        let line_end = self.text[line_start..]
            .find('\n')
            .map_or(self.text.len(), |i| line_start + i);
        let tokens = tokenize_line(&self.text[line_start..line_end]);
        let in_line = offset - line_start;

        let (anchor, expression_end, qt_method) = match qt_method_at(&tokens, in_line) {
            Some((name, content_end)) => (
                (line_start + name.begin(), line_start + content_end),
                line_start + name.end(),
                true,
            ),
            None => {
                let mut at = in_line;
                if at > 0 && !char_at(self.text, offset).is_some_and(is_identifier_char) {
                    at -= 1;
                }
                let Some(token) = token_at(&tokens, at) else {
                    return Link::default();
                };
                let (begin, end) = (line_start + token.begin(), line_start + token.end());
                if matches!(
                    token.kind,
                    TokenKind::StringLiteral | TokenKind::AngleStringLiteral
                ) {
                    let include = document
                        .includes()
                        .iter()
                        .find(|i| i.line == position.line && i.is_resolved());
                    if let Some(file) = include.and_then(|i| i.resolved.clone()) {
                        let inner = quoted_contents(begin..end);
                        return Link::new(file, 1, 0).with_anchor(inner.start, inner.end);
                    }
                }
                if !token.is(TokenKind::Identifier)
                    && !token.kind.is_keyword()
                    && !token.kind.is_qt_keyword()
                {
                    return Link::default();
                }
                ((begin, end), end, false)
            }
        };

        let items = self.resolve_expression(expression_end, position, !qt_method);
        if let Some(link) = self.link_for_items(&items, position, resolve_target) {
            return link.with_anchor(anchor.0, anchor.1);
        }

        let Some((begin, end)) = word_at(self.text, offset) else {
            return Link::default();
        };
        let link = find_macro_link(&self.text[begin..end], document, self.snapshot());
        if link.is_valid() {
            return link.with_anchor(begin, end);
        }
        trace!(offset, "no link");
        Link::default()
    }

    /// Type the expression ending at `end`, optionally including a call
    /// parenthesis that follows it.
    fn resolve_expression(&self, end: usize, position: Position, with_call: bool) -> Vec<LookupItem> {
        let Some(range) = expression_under_cursor(self.text, end) else {
            return Vec::new();
        };
        let end = if with_call {
            extend_over_call(self.text, range.end)
        } else {
            range.end
        };
        let origin = self.position(range.start);
        let Some(expression) = parse_expression(&self.text[range.start..end], origin) else {
            return Vec::new();
        };
        let scope = self.context.scope_at(position);
        TypeOfExpression::new(&self.context).resolve(&expression, &scope, position)
    }

    fn link_for_items(&self, items: &[LookupItem], position: Position, resolve_target: bool) -> Option<Link> {
        let document = self.document();
        let mut result = skip_forward_declarations(items)?;
        // clicking the declaration itself wins over any other candidate
        for item in items {
            let Some(d) = &item.declaration else { continue };
            if matches!(d.kind(), SymbolKind::Declaration | SymbolKind::Function)
                && d.file() == document.path()
                && d.line() == position.line
                && position.column >= d.column()
            {
                result = item;
                break;
            }
        }
        let symbol = result.declaration.as_ref()?;

        let mut target = None;
        if resolve_target {
            let last_visible = document
                .last_visible_symbol_at(position.line, position.column)
                .map(|id| SymbolRef::new(document.clone(), id));
            target = find_definition(symbol, self.snapshot());
            if target.is_some() && target == last_visible {
                target = None;
            }
            if symbol.symbol().is_forward_declaration() {
                target = self.snapshot().find_matching_class_declaration(symbol);
            }
        }
        Some(link_to_symbol(target.as_ref().unwrap_or(symbol)))
    }

    /// On the name of a function declarator: link a definition to its
    /// declaration or a declaration to its definition. The anchor is the
    /// declarator name.
    pub fn attempt_func_decl_def(&self, offset: usize) -> Option<Link> {
        let document = self.document();
        let position = self.position(offset);
        let path = document.ast_path(position.line, position.column);
        if path.len() < 3 {
            return None;
        }
        let Some(AstNode::Name(name)) = path.last() else {
            return None;
        };
        if name.segment_at(position) != Some(name.segments.len() - 1) {
            return None;
        }
        if path.nodes().iter().any(|n| matches!(n, AstNode::Parameter(_))) {
            return None;
        }
        let Some(AstNode::Declarator(declarator)) = path.get(path.len() - 2) else {
            return None;
        };
        if !declarator.is_function() {
            return None;
        }
        let parent = path.get(path.len() - 3)?;

        let start = name.last().span.start;
        let id = document.symbol_declared_at(start.line, start.column)?;
        let symbol = SymbolRef::new(document.clone(), id);
        let target = match parent {
            AstNode::Declaration(Declaration::Function(_)) if symbol.kind() == SymbolKind::Function => {
                find_matching_declaration(&self.context, &symbol).into_iter().next()
            }
            AstNode::Declaration(Declaration::Simple(_)) if symbol.symbol().is_function_declaration() => {
                self.snapshot().find_matching_definition(&symbol)
            }
            _ => None,
        }?;
        Some(link_to_symbol(&target).with_anchor(self.offset(name.span.start), self.offset(name.span.end)))
    }

    /// From inside a function definition to its declaration; from a function
    /// declaration to its definition.
    pub fn switch_declaration_definition(&self, offset: usize) -> Link {
        let document = self.document();
        let position = self.position(offset.min(self.text.len()));
        let Some(last_visible) = document.last_visible_symbol_at(position.line, position.column) else {
            return Link::default();
        };
        let symbol = document.symbol(last_visible);
        let function = if symbol.kind == SymbolKind::Function {
            Some(last_visible)
        } else {
            document.enclosing_function(position.line, position.column)
        };

        if let Some(function) = function {
            let function = SymbolRef::new(document.clone(), function);
            return find_matching_declaration(&self.context, &function)
                .first()
                .map(link_to_symbol)
                .unwrap_or_default();
        }
        if symbol.is_function_declaration() {
            let declaration = SymbolRef::new(document.clone(), last_visible);
            if let Some(definition) = self.snapshot().find_matching_definition(&declaration) {
                return link_to_symbol(&definition);
            }
        }
        Link::default()
    }
}

/// The range inside the delimiters of a quoted or angle-bracketed literal,
/// empty when the literal is too short to have any.
fn quoted_contents(literal: Range<usize>) -> Range<usize> {
    let start = (literal.start + 1).min(literal.end);
    start..literal.end.saturating_sub(1).max(start)
}

/// On the method name inside `SIGNAL(name(...))`/`SLOT(name(...))`: the name
/// token and the end of the parenthesised content (line-relative).
fn qt_method_at<'t>(tokens: &'t [Token<'t>], in_line: usize) -> Option<(&'t Token<'t>, usize)> {
    let i = tokens
        .iter()
        .rposition(|t| in_line >= t.begin() && in_line <= t.end())?;
    if i < 2
        || !tokens[i].is(TokenKind::Identifier)
        || !tokens[i - 1].is(TokenKind::LParen)
        || !(tokens[i - 2].is(TokenKind::Kw_SIGNAL) || tokens[i - 2].is(TokenKind::Kw_SLOT))
        || !tokens.get(i + 1).is_some_and(|t| t.is(TokenKind::LParen))
    {
        return None;
    }
    let mut depth = 0usize;
    for token in &tokens[i - 1..] {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Some((&tokens[i], token.begin()));
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::SymbolId;

    fn snapshot(files: &[(&str, &str)]) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for (path, source) in files {
            let path = FilePath::new(path);
            let preprocessed = snapshot.preprocessed_code(source, &path, &[]);
            snapshot.insert_mut(Arc::new(Document::from_source(preprocessed, 1)));
        }
        snapshot
    }

    fn resolver<'a>(snapshot: &Snapshot, path: &str, text: &'a str) -> LinkResolver<'a> {
        let document = snapshot.document(&FilePath::new(path)).unwrap().clone();
        LinkResolver::new(document, snapshot, text)
    }

    fn offset_of(text: &str, needle: &str) -> usize {
        text.find(needle).unwrap()
    }

    #[test]
    fn test_forward_declarations_are_skipped() {
        let snapshot = snapshot(&[("/p/a.h", "class A;\nclass A;\nclass A {};\n")]);
        let document = snapshot.document(&FilePath::new("/p/a.h")).unwrap().clone();
        let items: Vec<LookupItem> = (0..document.symbols().symbol_count())
            .map(|i| LookupItem::of_symbol(SymbolRef::new(document.clone(), SymbolId::new(i))))
            .filter(|item| item.declaration.as_ref().is_some_and(|d| d.name() == Some("A")))
            .collect();
        assert_eq!(items.len(), 3);
        let chosen = skip_forward_declarations(&items).unwrap();
        let chosen = chosen.declaration.as_ref().unwrap();
        assert_eq!(chosen.kind(), SymbolKind::Class);
        assert_eq!(chosen.line(), 3);
    }

    #[test]
    fn test_all_forward_declarations_keep_first() {
        let snapshot = snapshot(&[("/p/a.h", "class A;\nclass A;\n")]);
        let document = snapshot.document(&FilePath::new("/p/a.h")).unwrap().clone();
        let items: Vec<LookupItem> = (0..document.symbols().symbol_count())
            .map(|i| LookupItem::of_symbol(SymbolRef::new(document.clone(), SymbolId::new(i))))
            .collect();
        let chosen = skip_forward_declarations(&items).unwrap();
        assert_eq!(chosen.declaration.as_ref().unwrap().line(), 1);
        assert!(skip_forward_declarations(&[]).is_none());
    }

    #[test]
    fn test_link_to_local_declaration() {
        let text = "void f()\n{\n    int count = 0;\n    count += 1;\n}\n";
        let snapshot = snapshot(&[("/p/a.cpp", text)]);
        let resolver = resolver(&snapshot, "/p/a.cpp", text);
        let use_offset = offset_of(text, "count +=") + 2;
        let link = resolver.find_link_at(use_offset, true);
        assert_eq!(link.file, Some(FilePath::new("/p/a.cpp")));
        assert_eq!((link.line, link.column), (3, 8));
        let begin = offset_of(text, "count +=");
        assert_eq!((link.begin, link.end), (begin, begin + 5));
    }

    #[test]
    fn test_include_link_targets_resolved_file() {
        let header = "int helper();\n";
        let text = "#include \"helper.h\"\nint x;\n";
        let snapshot = snapshot(&[("/p/helper.h", header), ("/p/main.cpp", text)]);
        let resolver = resolver(&snapshot, "/p/main.cpp", text);
        let link = resolver.find_link_at(12, false);
        assert_eq!(link.file, Some(FilePath::new("/p/helper.h")));
        assert_eq!(link.line, 1);
        assert_eq!(&text[link.begin..link.end], "helper.h");
    }

    #[test]
    fn test_quoted_contents_never_inverts() {
        assert_eq!(quoted_contents(10..19), 11..18);
        assert_eq!(quoted_contents(10..12), 11..11);
        assert_eq!(quoted_contents(10..11), 11..11);
        assert_eq!(quoted_contents(10..10), 10..10);
    }

    #[test]
    fn test_unresolved_include_is_invalid() {
        let text = "#include \"missing.h\"\n";
        let snapshot = snapshot(&[("/p/main.cpp", text)]);
        let resolver = resolver(&snapshot, "/p/main.cpp", text);
        assert!(!resolver.find_link_at(12, false).is_valid());
    }

    #[test]
    fn test_qt_signal_anchor_covers_signature() {
        let text = "\
class Button {
public:
    void clicked(int);
    void wire();
};
void Button::wire()
{
    connect(this, SIGNAL(clicked(int)), this, SLOT(wire()));
}
";
        let snapshot = snapshot(&[("/p/button.cpp", text)]);
        let resolver = resolver(&snapshot, "/p/button.cpp", text);
        let link = resolver.find_link_at(offset_of(text, "clicked(int))") + 3, false);
        assert!(link.is_valid());
        assert_eq!(link.line, 3);
        assert_eq!(&text[link.begin..link.end], "clicked(int)");
    }

    #[test]
    fn test_punctuation_is_not_a_link() {
        let text = "int a = 1 + 2;\n";
        let snapshot = snapshot(&[("/p/a.cpp", text)]);
        let resolver = resolver(&snapshot, "/p/a.cpp", text);
        assert!(!resolver.find_link_at(offset_of(text, "+") + 1, true).is_valid());
    }

    #[test]
    fn test_find_matching_declaration_prefers_equal_signature() {
        let text = "\
struct S {
    void f(int);
    void f(double, int);
    void f(char);
};
void S::f(char c) {}
";
        let snapshot = snapshot(&[("/p/s.cpp", text)]);
        let document = snapshot.document(&FilePath::new("/p/s.cpp")).unwrap().clone();
        let context = LookupContext::new(document.clone(), &snapshot);
        let definition = document
            .symbols()
            .symbols()
            .find(|(_, s)| s.kind == SymbolKind::Function)
            .map(|(id, _)| SymbolRef::new(document.clone(), id))
            .unwrap();
        let lines: Vec<u32> = find_matching_declaration(&context, &definition)
            .iter()
            .map(|d| d.line())
            .collect();
        assert_eq!(lines, vec![4, 2, 3]);
    }

    #[test]
    fn test_macro_link_searches_includes_last_first() {
        let snapshot = snapshot(&[
            ("/p/a.h", "#define VALUE 1\n"),
            ("/p/b.h", "#define VALUE 2\n"),
            ("/p/main.cpp", "#include \"a.h\"\n#include \"b.h\"\nint x = VALUE;\n"),
        ]);
        let document = snapshot.document(&FilePath::new("/p/main.cpp")).unwrap();
        let link = find_macro_link("VALUE", document, &snapshot);
        assert_eq!(link.file, Some(FilePath::new("/p/b.h")));
        assert_eq!(link.line, 1);
        assert!(!find_macro_link("<VALUE", document, &snapshot).is_valid());
        assert!(!find_macro_link("OTHER", document, &snapshot).is_valid());
    }
}
