//! One file's parse result at one revision.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::trace;

use super::bind::bind;
use super::symbols::{ScopeId, ScopeKind, Symbol, SymbolId, SymbolKind, SymbolTable};
use crate::base::{FilePath, Position};
use crate::parser::ast::TranslationUnit;
use crate::parser::{
    AstPath, DiagnosticMessage, Include, Macro, MacroUse, PreprocessedSource, TuToken,
    parse_translation_unit, read_tokens,
};

/// An immutable, checked document.
///
/// Documents are shared through `Arc`; an update builds a new `Document`
/// value rather than touching an existing one.
pub struct Document {
    path: FilePath,
    revision: u32,
    tokens: Vec<TuToken>,
    unit: TranslationUnit,
    symbols: SymbolTable,
    diagnostics: Vec<DiagnosticMessage>,
    defined_macros: Vec<Macro>,
    macro_uses: Vec<MacroUse>,
    includes: Vec<Include>,
    namespaces: FxHashMap<Vec<SmolStr>, Vec<ScopeId>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("path", &self.path)
            .field("revision", &self.revision)
            .field("symbols", &self.symbols.symbol_count())
            .field("diagnostics", &self.diagnostics.len())
            .finish()
    }
}

impl Document {
    /// Parse and check preprocessed text. Never fails: problems become
    /// diagnostics and the parser recovers.
    pub fn from_source(source: PreprocessedSource, revision: u32) -> Self {
        let PreprocessedSource {
            file,
            code,
            defined_macros,
            macro_uses,
            includes,
            mut diagnostics,
        } = source;
        let tokens = read_tokens(&code);
        let (unit, parse_diagnostics) = parse_translation_unit(&tokens, &file);
        diagnostics.extend(parse_diagnostics);
        let symbols = bind(&unit);

        let mut namespaces: FxHashMap<Vec<SmolStr>, Vec<ScopeId>> = FxHashMap::default();
        for (id, scope) in symbols.scopes() {
            if matches!(scope.kind, ScopeKind::Global | ScopeKind::Namespace) {
                namespaces
                    .entry(symbols.namespace_path(id))
                    .or_default()
                    .push(id);
            }
        }
        trace!(
            path = %file,
            revision,
            symbols = symbols.symbol_count(),
            diagnostics = diagnostics.len(),
            "document checked"
        );
        Self {
            path: file,
            revision,
            tokens,
            unit,
            symbols,
            diagnostics,
            defined_macros,
            macro_uses,
            includes,
            namespaces,
        }
    }

    pub fn path(&self) -> &FilePath {
        &self.path
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn tokens(&self) -> &[TuToken] {
        &self.tokens
    }

    pub fn translation_unit(&self) -> &TranslationUnit {
        &self.unit
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        self.symbols.symbol(id)
    }

    pub fn diagnostics(&self) -> &[DiagnosticMessage] {
        &self.diagnostics
    }

    pub fn defined_macros(&self) -> &[Macro] {
        &self.defined_macros
    }

    pub fn macro_uses(&self) -> &[MacroUse] {
        &self.macro_uses
    }

    pub fn includes(&self) -> &[Include] {
        &self.includes
    }

    /// Resolved include targets in directive order.
    pub fn included_files(&self) -> impl Iterator<Item = &FilePath> {
        self.includes.iter().filter_map(|i| i.resolved.as_ref())
    }

    /// Namespace (or global) scopes of this document whose path is `path`.
    pub fn namespace_scopes(&self, path: &[SmolStr]) -> &[ScopeId] {
        self.namespaces.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether any non-generated token spells `name`; a cheap prefilter for
    /// reference searches.
    pub fn mentions(&self, name: &str) -> bool {
        self.tokens.iter().any(|t| t.text == name)
    }

    pub fn ast_path(&self, line: u32, column: u32) -> AstPath<'_> {
        AstPath::at(&self.unit, Position::new(line, column))
    }

    /// Innermost scope containing the position.
    pub fn scope_at(&self, line: u32, column: u32) -> ScopeId {
        self.symbols.scope_at(Position::new(line, column))
    }

    /// The last symbol declared at or before the position in the innermost
    /// scope, else the owner of that scope, walking outwards.
    pub fn last_visible_symbol_at(&self, line: u32, column: u32) -> Option<SymbolId> {
        let position = Position::new(line, column);
        let mut scope = Some(self.symbols.scope_at(position));
        while let Some(id) = scope {
            let s = self.symbols.scope(id);
            let last = s
                .symbols
                .iter()
                .copied()
                .filter(|sym| {
                    let symbol = self.symbols.symbol(*sym);
                    symbol.scope == id && symbol.position() <= position
                })
                .max_by_key(|sym| self.symbols.symbol(*sym).position());
            if let Some(last) = last {
                return Some(last);
            }
            if let Some(owner) = s.owner {
                return Some(owner);
            }
            scope = s.parent;
        }
        None
    }

    /// The symbol whose declared name covers the position.
    pub fn symbol_declared_at(&self, line: u32, column: u32) -> Option<SymbolId> {
        let position = Position::new(line, column);
        self.symbols
            .symbols()
            .filter(|(_, s)| {
                s.name.is_some()
                    && !matches!(s.kind, SymbolKind::UsingNamespace)
                    && s.span.contains_inclusive(position)
            })
            .min_by_key(|(_, s)| s.generated)
            .map(|(id, _)| id)
    }

    /// Function symbol whose body encloses the position.
    pub fn enclosing_function(&self, line: u32, column: u32) -> Option<SymbolId> {
        self.symbols
            .enclosing_owner(self.scope_at(line, column), ScopeKind::Function)
    }

    pub fn find_macro_definition_at(&self, line: u32) -> Option<&Macro> {
        self.defined_macros.iter().find(|m| m.line == line)
    }

    /// The macro use covering a byte offset of the raw source.
    pub fn find_macro_use_at(&self, offset: usize) -> Option<&MacroUse> {
        self.macro_uses.iter().find(|u| u.contains_offset(offset))
    }

    pub fn find_macro_definition(&self, name: &str) -> Option<&Macro> {
        self.defined_macros.iter().rev().find(|m| m.name == name)
    }

    /// Name of a symbol, qualified by its enclosing namespaces and classes.
    pub fn qualified_name(&self, id: SymbolId) -> Vec<SmolStr> {
        self.symbols.qualified_name(id)
    }
}

/// A symbol together with the document that owns it.
#[derive(Clone)]
pub struct SymbolRef {
    pub document: Arc<Document>,
    pub id: SymbolId,
}

impl SymbolRef {
    pub fn new(document: Arc<Document>, id: SymbolId) -> Self {
        Self { document, id }
    }

    pub fn symbol(&self) -> &Symbol {
        self.document.symbol(self.id)
    }

    pub fn file(&self) -> &FilePath {
        self.document.path()
    }

    pub fn name(&self) -> Option<&str> {
        self.symbol().name()
    }

    pub fn kind(&self) -> SymbolKind {
        self.symbol().kind
    }

    pub fn line(&self) -> u32 {
        self.symbol().line()
    }

    pub fn column(&self) -> u32 {
        self.symbol().column()
    }

    pub fn qualified_name(&self) -> Vec<SmolStr> {
        self.document.qualified_name(self.id)
    }

    /// Kind of the scope the symbol is declared in.
    pub fn enclosing_scope_kind(&self) -> ScopeKind {
        self.document.symbols().scope(self.symbol().scope).kind
    }

    /// Declared inside a function body or parameter list.
    pub fn is_local(&self) -> bool {
        matches!(
            self.enclosing_scope_kind(),
            ScopeKind::Function | ScopeKind::Block
        )
    }

    /// Whether both refer to the same entity: locals by declaration site,
    /// everything else by qualified name, kind family and signature.
    pub fn is_same_entity(&self, other: &SymbolRef) -> bool {
        if self == other {
            return true;
        }
        if self.is_local() || other.is_local() {
            return false;
        }
        let (a, b) = (self.symbol(), other.symbol());
        if a.name.is_none() || a.name != b.name || family(a) != family(b) {
            return false;
        }
        if self.qualified_name() != other.qualified_name() {
            return false;
        }
        match (a.function_type(), b.function_type()) {
            (Some(fa), Some(fb)) => fa.is_signature_equal(fb),
            (None, None) => true,
            _ => false,
        }
    }
}

#[derive(PartialEq, Eq)]
enum Family {
    Type,
    Namespace,
    Function,
    Value,
    Other,
}

fn family(symbol: &Symbol) -> Family {
    match symbol.kind {
        SymbolKind::Class | SymbolKind::ForwardClass | SymbolKind::Enum | SymbolKind::Typedef => {
            Family::Type
        }
        SymbolKind::Namespace => Family::Namespace,
        SymbolKind::Function => Family::Function,
        SymbolKind::Declaration if symbol.ty.is_function() => Family::Function,
        SymbolKind::Declaration | SymbolKind::Enumerator | SymbolKind::Argument => Family::Value,
        _ => Family::Other,
    }
}

impl PartialEq for SymbolRef {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.symbol(), other.symbol());
        self.file() == other.file() && a.span == b.span && a.name == b.name && a.kind == b.kind
    }
}

impl Eq for SymbolRef {}

impl fmt::Debug for SymbolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = self.symbol();
        write!(
            f,
            "{:?} {} at {}:{}:{}",
            symbol.kind,
            symbol.name().unwrap_or("<anonymous>"),
            self.file(),
            symbol.line(),
            symbol.column()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(source: &str) -> Arc<Document> {
        Arc::new(Document::from_source(
            PreprocessedSource::unprocessed(FilePath::new("/src/a.cpp"), source),
            1,
        ))
    }

    #[test]
    fn test_malformed_source_still_produces_document() {
        let doc = document("class Foo {\n  int x\n};\nvoid f( {\n");
        assert!(!doc.diagnostics().is_empty());
        assert!(doc.symbols().symbols().any(|(_, s)| s.name() == Some("Foo")));
    }

    #[test]
    fn test_symbol_declared_at_and_last_visible() {
        let doc = document("void Foo::bar()\n{\n    int x = 1;\n}\n");
        let bar = doc.symbol_declared_at(1, 12).unwrap();
        assert_eq!(doc.symbol(bar).name(), Some("bar"));
        assert_eq!(doc.last_visible_symbol_at(1, 12), Some(bar));
        assert_eq!(doc.enclosing_function(3, 10), Some(bar));
        let x = doc.last_visible_symbol_at(3, 14).unwrap();
        assert_eq!(doc.symbol(x).name(), Some("x"));
    }

    #[test]
    fn test_namespace_reopenings_are_indexed() {
        let doc = document("namespace ns { int a; }\nnamespace ns { int b; }\n");
        assert_eq!(doc.namespace_scopes(&["ns".into()]).len(), 2);
        assert_eq!(doc.namespace_scopes(&[]).len(), 1);
    }

    #[test]
    fn test_same_entity_across_declaration_sites() {
        let header = document("class Foo { void run(); };\n");
        let other = document("class Foo { void run(); void run(int); };\n");
        let find = |doc: &Arc<Document>, nth: usize| {
            let id = doc
                .symbols()
                .symbols()
                .filter(|(_, s)| s.name() == Some("run"))
                .nth(nth)
                .unwrap()
                .0;
            SymbolRef::new(doc.clone(), id)
        };
        assert!(find(&header, 0).is_same_entity(&find(&other, 0)));
        assert!(!find(&header, 0).is_same_entity(&find(&other, 1)));
    }
}
