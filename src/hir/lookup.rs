//! Scope-aware name lookup across the documents visible from one document.

use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;

use super::document::{Document, SymbolRef};
use super::snapshot::Snapshot;
use super::symbols::{FullType, ScopeId, ScopeKind, SymbolKind};
use crate::base::Position;
use crate::parser::ast::QualifiedName;

/// Guards typedef chains, base-class cycles and `using` loops.
const MAX_LOOKUP_DEPTH: usize = 16;

/// A scope of a particular document.
#[derive(Clone)]
pub struct ScopeRef {
    pub document: Arc<Document>,
    pub scope: ScopeId,
}

impl ScopeRef {
    pub fn new(document: Arc<Document>, scope: ScopeId) -> Self {
        Self { document, scope }
    }

    /// The scope a symbol is declared in.
    pub fn of(symbol: &SymbolRef) -> Self {
        Self::new(symbol.document.clone(), symbol.symbol().scope)
    }
}

impl fmt::Debug for ScopeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.document.path(), self.scope.0)
    }
}

/// What a qualifier like `std::` or `Foo::` denotes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Binding {
    Namespace(Vec<SmolStr>),
    Class(SymbolRef),
    Enum(SymbolRef),
}

/// One candidate produced by expression typing.
#[derive(Clone, Debug)]
pub struct LookupItem {
    /// The entity the expression names, when it names one.
    pub declaration: Option<SymbolRef>,
    /// The expression's type.
    pub ty: FullType,
    /// Where the names in `ty` are resolved.
    pub scope: ScopeRef,
    pub position: Position,
}

impl LookupItem {
    pub fn of_symbol(symbol: SymbolRef) -> Self {
        let ty = symbol.symbol().ty.clone();
        let position = symbol.symbol().position();
        Self {
            scope: ScopeRef::of(&symbol),
            declaration: Some(symbol),
            ty,
            position,
        }
    }
}

/// Lookup rooted at one document and the snapshot it belongs to.
pub struct LookupContext {
    document: Arc<Document>,
    snapshot: Snapshot,
    visible: Vec<Arc<Document>>,
}

impl LookupContext {
    pub fn new(document: Arc<Document>, snapshot: &Snapshot) -> Self {
        let mut visible = vec![document.clone()];
        visible.extend(
            snapshot
                .all_includes(document.path())
                .iter()
                .filter_map(|p| snapshot.document(p).cloned()),
        );
        Self {
            document,
            snapshot: snapshot.clone(),
            visible,
        }
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// The document and its transitive includes.
    pub fn visible_documents(&self) -> &[Arc<Document>] {
        &self.visible
    }

    /// Scope of this context's document at a position.
    pub fn scope_at(&self, position: Position) -> ScopeRef {
        ScopeRef::new(
            self.document.clone(),
            self.document.scope_at(position.line, position.column),
        )
    }

    // ------------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------------

    pub fn lookup(&self, name: &QualifiedName, from: &ScopeRef, position: Position) -> Vec<SymbolRef> {
        self.lookup_path(&name.path(), name.global, from, position)
    }

    pub fn lookup_path(
        &self,
        path: &[SmolStr],
        global: bool,
        from: &ScopeRef,
        position: Position,
    ) -> Vec<SymbolRef> {
        self.lookup_path_at(path, global, from, position, 0)
    }

    /// Resolve every segment of `qualifier` to a class or namespace.
    pub fn resolve_qualifier(
        &self,
        qualifier: &[SmolStr],
        global: bool,
        from: &ScopeRef,
        position: Position,
    ) -> Option<Binding> {
        self.resolve_qualifier_at(qualifier, global, from, position, 0)
    }

    /// What a type-like symbol binds to: typedefs and forward declarations
    /// are followed to the class they name.
    pub fn binding_of(&self, symbol: &SymbolRef) -> Option<Binding> {
        self.binding_of_at(symbol, 0)
    }

    /// Binding of the class or namespace spelled by `ty`.
    pub fn type_binding(&self, ty: &FullType, from: &ScopeRef, position: Position) -> Option<Binding> {
        self.type_binding_at(ty, from, position, 0)
    }

    pub fn members(&self, binding: &Binding, name: &str) -> Vec<SymbolRef> {
        self.members_at(binding, name, 0)
    }

    /// The class whose member function encloses `from`, if any.
    pub fn enclosing_class(&self, from: &ScopeRef) -> Option<SymbolRef> {
        let table = from.document.symbols();
        let mut current = Some(from.scope);
        while let Some(id) = current {
            let scope = table.scope(id);
            match (scope.kind, scope.owner) {
                (ScopeKind::Class, Some(owner)) => {
                    return Some(SymbolRef::new(from.document.clone(), owner));
                }
                (ScopeKind::Function, Some(owner)) if !table.symbol(owner).qualifier.is_empty() => {
                    let function = table.symbol(owner);
                    let outer = ScopeRef::new(from.document.clone(), function.scope);
                    if let Some(Binding::Class(class)) =
                        self.resolve_qualifier(&function.qualifier, false, &outer, function.position())
                    {
                        return Some(class);
                    }
                }
                _ => {}
            }
            current = scope.parent;
        }
        None
    }

    /// The class a forward declaration stands for.
    pub fn resolve_forward_declaration(&self, forward: &SymbolRef) -> Option<SymbolRef> {
        let name = forward.name()?;
        let qualified = forward.qualified_name();
        for document in &self.visible {
            let found = document
                .symbols()
                .symbols()
                .find(|(id, s)| {
                    s.kind == SymbolKind::Class
                        && s.name() == Some(name)
                        && document.qualified_name(*id) == qualified
                })
                .map(|(id, _)| id);
            if let Some(id) = found {
                return Some(SymbolRef::new(document.clone(), id));
            }
        }
        self.snapshot.find_matching_class_declaration(forward)
    }

    // ------------------------------------------------------------------------
    // Depth-tracked internals
    // ------------------------------------------------------------------------

    fn lookup_path_at(
        &self,
        path: &[SmolStr],
        global: bool,
        from: &ScopeRef,
        position: Position,
        depth: usize,
    ) -> Vec<SymbolRef> {
        let Some((last, qualifier)) = path.split_last() else {
            return Vec::new();
        };
        if qualifier.is_empty() && !global {
            return self.unqualified(last, from, position, depth);
        }
        match self.resolve_qualifier_at(qualifier, global, from, position, depth) {
            Some(binding) => self.members_at(&binding, last, depth),
            None => Vec::new(),
        }
    }

    fn resolve_qualifier_at(
        &self,
        qualifier: &[SmolStr],
        global: bool,
        from: &ScopeRef,
        position: Position,
        depth: usize,
    ) -> Option<Binding> {
        if depth > MAX_LOOKUP_DEPTH {
            return None;
        }
        let mut segments = qualifier.iter();
        let mut binding = if global {
            Binding::Namespace(Vec::new())
        } else {
            let first = segments.next()?;
            self.unqualified(first, from, position, depth)
                .iter()
                .find_map(|s| self.binding_of_at(s, depth + 1))?
        };
        for segment in segments {
            binding = self
                .members_at(&binding, segment, depth)
                .iter()
                .find_map(|s| self.binding_of_at(s, depth + 1))?;
        }
        Some(binding)
    }

    fn binding_of_at(&self, symbol: &SymbolRef, depth: usize) -> Option<Binding> {
        if depth > MAX_LOOKUP_DEPTH {
            return None;
        }
        let s = symbol.symbol();
        match s.kind {
            SymbolKind::Namespace => Some(Binding::Namespace(
                symbol.document.symbols().namespace_path(s.members?),
            )),
            SymbolKind::Class => Some(Binding::Class(symbol.clone())),
            SymbolKind::ForwardClass => self
                .resolve_forward_declaration(symbol)
                .map(Binding::Class),
            SymbolKind::Enum => Some(Binding::Enum(symbol.clone())),
            SymbolKind::Typedef => {
                self.type_binding_at(&s.ty, &ScopeRef::of(symbol), s.position(), depth + 1)
            }
            SymbolKind::UsingDeclaration => {
                let target = s.references.first()?;
                self.lookup_path_at(target, false, &ScopeRef::of(symbol), s.position(), depth + 1)
                    .iter()
                    .filter(|t| *t != symbol)
                    .find_map(|t| self.binding_of_at(t, depth + 1))
            }
            _ => None,
        }
    }

    fn type_binding_at(
        &self,
        ty: &FullType,
        from: &ScopeRef,
        position: Position,
        depth: usize,
    ) -> Option<Binding> {
        if ty.builtin || ty.name.is_empty() || depth > MAX_LOOKUP_DEPTH {
            return None;
        }
        self.lookup_path_at(&ty.name, false, from, position, depth + 1)
            .iter()
            .find_map(|s| self.binding_of_at(s, depth + 1))
    }

    /// Follow `using X::y;` to what it names.
    fn expand_using(&self, symbol: SymbolRef, depth: usize) -> Vec<SymbolRef> {
        let s = symbol.symbol();
        if s.kind != SymbolKind::UsingDeclaration || depth > MAX_LOOKUP_DEPTH {
            return vec![symbol];
        }
        let Some(target) = s.references.first() else {
            return vec![symbol];
        };
        let found: Vec<_> = self
            .lookup_path_at(target, false, &ScopeRef::of(&symbol), s.position(), depth + 1)
            .into_iter()
            .filter(|t| *t != symbol)
            .collect();
        if found.is_empty() { vec![symbol] } else { found }
    }

    fn unqualified(&self, name: &str, from: &ScopeRef, position: Position, depth: usize) -> Vec<SymbolRef> {
        let document = &from.document;
        let table = document.symbols();
        let mut current = Some(from.scope);
        while let Some(id) = current {
            let scope = table.scope(id);
            let found = match scope.kind {
                ScopeKind::Block | ScopeKind::Function | ScopeKind::Template | ScopeKind::Enum => {
                    let positional = matches!(scope.kind, ScopeKind::Block | ScopeKind::Function);
                    let mut found = Vec::new();
                    for sym in table.members_named(id, name) {
                        let symbol = table.symbol(sym);
                        if positional && symbol.position() > position {
                            continue;
                        }
                        found.extend(self.expand_using(SymbolRef::new(document.clone(), sym), depth));
                    }
                    if found.is_empty() && positional {
                        found = self.through_using_directives(document, id, name, Some(position), depth);
                    }
                    found
                }
                ScopeKind::Class => match scope.owner {
                    Some(owner) => self.members_at(
                        &Binding::Class(SymbolRef::new(document.clone(), owner)),
                        name,
                        depth,
                    ),
                    None => Vec::new(),
                },
                ScopeKind::Namespace | ScopeKind::Global => {
                    self.members_at(&Binding::Namespace(table.namespace_path(id)), name, depth)
                }
            };
            if !found.is_empty() {
                return found;
            }
            if let (ScopeKind::Function, Some(owner)) = (scope.kind, scope.owner) {
                let function = table.symbol(owner);
                if !function.qualifier.is_empty() {
                    let outer = ScopeRef::new(document.clone(), function.scope);
                    if let Some(binding) = self.resolve_qualifier_at(
                        &function.qualifier,
                        false,
                        &outer,
                        function.position(),
                        depth + 1,
                    ) {
                        let found = self.members_at(&binding, name, depth + 1);
                        if !found.is_empty() {
                            return found;
                        }
                    }
                }
            }
            current = scope.parent;
        }
        Vec::new()
    }

    /// Members reached through `using namespace` directives declared in `scope`.
    fn through_using_directives(
        &self,
        document: &Arc<Document>,
        scope: ScopeId,
        name: &str,
        position: Option<Position>,
        depth: usize,
    ) -> Vec<SymbolRef> {
        let table = document.symbols();
        let mut found = Vec::new();
        for sym in &table.scope(scope).symbols {
            let symbol = table.symbol(*sym);
            if symbol.kind != SymbolKind::UsingNamespace || symbol.scope != scope {
                continue;
            }
            if position.is_some_and(|p| symbol.position() > p) {
                continue;
            }
            let Some(target) = symbol.references.first() else { continue };
            let from = ScopeRef::new(document.clone(), scope);
            if let Some(binding @ Binding::Namespace(_)) =
                self.resolve_qualifier_at(target, false, &from, symbol.position(), depth + 1)
            {
                found.extend(self.members_at(&binding, name, depth + 1));
            }
        }
        found
    }

    fn members_at(&self, binding: &Binding, name: &str, depth: usize) -> Vec<SymbolRef> {
        if depth > MAX_LOOKUP_DEPTH {
            return Vec::new();
        }
        match binding {
            Binding::Namespace(path) => {
                let mut found = Vec::new();
                for document in &self.visible {
                    for scope in document.namespace_scopes(path) {
                        for sym in document.symbols().members_named(*scope, name) {
                            found.extend(self.expand_using(SymbolRef::new(document.clone(), sym), depth));
                        }
                    }
                }
                if found.is_empty() {
                    for document in &self.visible {
                        for scope in document.namespace_scopes(path) {
                            found.extend(self.through_using_directives(
                                document,
                                *scope,
                                name,
                                None,
                                depth + 1,
                            ));
                        }
                    }
                }
                found
            }
            Binding::Class(class) => {
                let symbol = class.symbol();
                let Some(members) = symbol.members else {
                    return Vec::new();
                };
                let found: Vec<_> = class
                    .document
                    .symbols()
                    .members_named(members, name)
                    .flat_map(|id| self.expand_using(SymbolRef::new(class.document.clone(), id), depth))
                    .collect();
                if !found.is_empty() {
                    return found;
                }
                let from = ScopeRef::of(class);
                for base in &symbol.references {
                    let Some(base) =
                        self.resolve_qualifier_at(base, false, &from, symbol.position(), depth + 1)
                    else {
                        continue;
                    };
                    let found = self.members_at(&base, name, depth + 1);
                    if !found.is_empty() {
                        return found;
                    }
                }
                Vec::new()
            }
            Binding::Enum(e) => match e.symbol().members {
                Some(members) => e
                    .document
                    .symbols()
                    .members_named(members, name)
                    .map(|id| SymbolRef::new(e.document.clone(), id))
                    .collect(),
                None => Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::FilePath;

    fn snapshot(files: &[(&str, &str)]) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for (path, source) in files {
            let path = FilePath::new(path);
            let pp = snapshot.preprocessed_code(source, &path, &[]);
            snapshot.insert_mut(Arc::new(Document::from_source(pp, 1)));
        }
        snapshot
    }

    fn context(snapshot: &Snapshot, path: &str) -> LookupContext {
        LookupContext::new(snapshot.document(&FilePath::new(path)).unwrap().clone(), snapshot)
    }

    fn lookup(ctx: &LookupContext, name: &str, line: u32, column: u32) -> Vec<SymbolRef> {
        let position = Position::new(line, column);
        let path: Vec<SmolStr> = name.split("::").map(SmolStr::new).collect();
        ctx.lookup_path(&path, false, &ctx.scope_at(position), position)
    }

    #[test]
    fn test_locals_shadow_and_respect_declaration_order() {
        let s = snapshot(&[(
            "/p/a.cpp",
            "int x;\nvoid f()\n{\n    x = 1;\n    int x = 2;\n    x = 3;\n}\n",
        )]);
        let ctx = context(&s, "/p/a.cpp");
        assert_eq!(lookup(&ctx, "x", 4, 5)[0].line(), 1);
        assert_eq!(lookup(&ctx, "x", 6, 5)[0].line(), 5);
    }

    #[test]
    fn test_out_of_line_member_sees_class_members_and_bases() {
        let s = snapshot(&[
            (
                "/p/foo.h",
                "class Base { protected: int shared; };\nclass Foo : public Base {\n    int own;\n    void bar();\n};\n",
            ),
            (
                "/p/foo.cpp",
                "#include \"foo.h\"\nvoid Foo::bar()\n{\n    own = shared;\n}\n",
            ),
        ]);
        let ctx = context(&s, "/p/foo.cpp");
        let own = lookup(&ctx, "own", 4, 5);
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].file(), &FilePath::new("/p/foo.h"));
        let shared = lookup(&ctx, "shared", 4, 11);
        assert_eq!(shared[0].qualified_name(), vec!["Base", "shared"]);
    }

    #[test]
    fn test_namespace_reopenings_and_using_directives() {
        let s = snapshot(&[
            ("/p/a.h", "namespace ns { int first; }\n"),
            (
                "/p/a.cpp",
                "#include \"a.h\"\nnamespace ns { int second; }\nusing namespace ns;\nint g = first + second;\n",
            ),
        ]);
        let ctx = context(&s, "/p/a.cpp");
        assert_eq!(lookup(&ctx, "ns::first", 4, 9).len(), 1);
        assert_eq!(lookup(&ctx, "first", 4, 9).len(), 1);
        assert_eq!(lookup(&ctx, "second", 4, 17).len(), 1);
    }

    #[test]
    fn test_typedef_binding_reaches_class() {
        let s = snapshot(&[(
            "/p/a.cpp",
            "struct Impl { int value; };\ntypedef Impl Alias;\nint v = Alias::value;\n",
        )]);
        let ctx = context(&s, "/p/a.cpp");
        let found = lookup(&ctx, "Alias::value", 3, 9);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line(), 1);
    }

    #[test]
    fn test_typedef_cycle_terminates() {
        let s = snapshot(&[("/p/a.cpp", "typedef B A;\ntypedef A B;\nint v = A::x;\n")]);
        let ctx = context(&s, "/p/a.cpp");
        assert!(lookup(&ctx, "A::x", 3, 9).is_empty());
    }

    #[test]
    fn test_template_parameter_resolves() {
        let s = snapshot(&[(
            "/p/a.h",
            "template <typename T>\nclass Box {\n    T value;\n};\n",
        )]);
        let ctx = context(&s, "/p/a.h");
        let found = lookup(&ctx, "T", 3, 5);
        assert_eq!(found[0].kind(), SymbolKind::TemplateParameter);
    }
}
