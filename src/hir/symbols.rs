//! Per-document symbol arena.
//!
//! A [`Document`](super::Document) owns every symbol and scope it declares in
//! one [`SymbolTable`]. Back-references (symbol → enclosing scope, scope →
//! parent, scope → owning symbol) are plain indices into that table.

use std::fmt;

use smol_str::SmolStr;

use crate::base::{Position, Span};
use crate::parser::ast::Access;

/// Index of a symbol in its document's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a scope in its document's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// The translation unit scope; always present.
    pub const GLOBAL: ScopeId = ScopeId(0);

    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Namespace,
    Class,
    /// `class Foo;`
    ForwardClass,
    Enum,
    Enumerator,
    /// A function definition (has a body).
    Function,
    /// Variables, fields and function declarations.
    Declaration,
    Argument,
    Typedef,
    TemplateParameter,
    /// `using namespace X;`
    UsingNamespace,
    /// `using X::y;`
    UsingDeclaration,
}

impl SymbolKind {
    /// Kinds that name a type or a namespace.
    pub fn is_type_like(self) -> bool {
        matches!(
            self,
            SymbolKind::Namespace
                | SymbolKind::Class
                | SymbolKind::ForwardClass
                | SymbolKind::Enum
                | SymbolKind::Typedef
                | SymbolKind::TemplateParameter
        )
    }
}

/// Function part of a [`FullType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FunctionType {
    pub arguments: Vec<FullType>,
    /// Arguments without a default value.
    pub required_arguments: usize,
    pub variadic: bool,
    pub is_const: bool,
    pub is_virtual: bool,
    pub is_pure: bool,
    pub is_override: bool,
}

impl FunctionType {
    /// Same parameter types and cv-qualification; argument names never matter.
    pub fn is_signature_equal(&self, other: &FunctionType) -> bool {
        self.arguments.len() == other.arguments.len()
            && self.is_const == other.is_const
            && self.variadic == other.variadic
            && self
                .arguments
                .iter()
                .zip(&other.arguments)
                .all(|(a, b)| a.is_equal_to(b))
    }

    /// Whether a call with `count` arguments can bind to this function.
    pub fn accepts_arity(&self, count: usize) -> bool {
        count >= self.required_arguments && (self.variadic || count <= self.arguments.len())
    }
}

/// A declared type. For functions the plain fields describe the return type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FullType {
    /// Spelled base type, split at `::`; builtin types are one segment.
    pub name: Vec<SmolStr>,
    pub builtin: bool,
    pub is_const: bool,
    pub pointer_depth: u8,
    pub is_reference: bool,
    pub function: Option<Box<FunctionType>>,
}

impl FullType {
    pub fn builtin(name: &str) -> Self {
        Self {
            name: vec![SmolStr::new(name)],
            builtin: true,
            ..Self::default()
        }
    }

    /// Type equality as used for signatures: base name, cv, pointers, references.
    pub fn is_equal_to(&self, other: &FullType) -> bool {
        self.name == other.name
            && self.is_const == other.is_const
            && self.pointer_depth == other.pointer_depth
            && self.is_reference == other.is_reference
            && match (&self.function, &other.function) {
                (None, None) => true,
                (Some(a), Some(b)) => a.is_signature_equal(b),
                _ => false,
            }
    }

    pub fn is_function(&self) -> bool {
        self.function.is_some()
    }

    /// The type with the function part dropped.
    pub fn return_type(&self) -> FullType {
        FullType {
            function: None,
            ..self.clone()
        }
    }
}

impl fmt::Display for FullType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_const {
            f.write_str("const ")?;
        }
        f.write_str(&self.name.join("::"))?;
        for _ in 0..self.pointer_depth {
            f.write_str("*")?;
        }
        if self.is_reference {
            f.write_str("&")?;
        }
        if let Some(function) = &self.function {
            f.write_str("(")?;
            for (i, arg) in function.arguments.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(")")?;
            if function.is_const {
                f.write_str(" const")?;
            }
        }
        Ok(())
    }
}

/// A declared entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// `None` for anonymous entities.
    pub name: Option<SmolStr>,
    pub kind: SymbolKind,
    pub ty: FullType,
    /// Enclosing scope.
    pub scope: ScopeId,
    /// Scope this symbol opens (namespace, class, enum or function body).
    pub members: Option<ScopeId>,
    /// Explicit qualification of an out-of-line name: `Foo` in `void Foo::bar()`.
    pub qualifier: Vec<SmolStr>,
    /// Span of the declared name.
    pub span: Span,
    /// Declared by tokens from a macro expansion.
    pub generated: bool,
    pub access: Access,
    pub is_static: bool,
    /// Base classes of a class, or the target of a `using`.
    pub references: Vec<Vec<SmolStr>>,
}

impl Symbol {
    pub fn new(name: Option<SmolStr>, kind: SymbolKind, scope: ScopeId, span: Span) -> Self {
        Self {
            name,
            kind,
            ty: FullType::default(),
            scope,
            members: None,
            qualifier: Vec::new(),
            span,
            generated: false,
            access: Access::Public,
            is_static: false,
            references: Vec::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn line(&self) -> u32 {
        self.span.start.line
    }

    pub fn column(&self) -> u32 {
        self.span.start.column
    }

    pub fn position(&self) -> Position {
        self.span.start
    }

    pub fn is_forward_declaration(&self) -> bool {
        self.kind == SymbolKind::ForwardClass
    }

    pub fn function_type(&self) -> Option<&FunctionType> {
        self.ty.function.as_deref()
    }

    /// A function declaration without a body.
    pub fn is_function_declaration(&self) -> bool {
        self.kind == SymbolKind::Declaration && self.ty.is_function()
    }

    pub fn is_definition(&self) -> bool {
        match self.kind {
            SymbolKind::Function | SymbolKind::Class | SymbolKind::Namespace | SymbolKind::Enum => true,
            SymbolKind::Declaration => !self.ty.is_function(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    Namespace,
    Class,
    Enum,
    /// Parameters and body of a function or lambda.
    Function,
    Block,
    Template,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub owner: Option<SymbolId>,
    pub symbols: Vec<SymbolId>,
    pub span: Span,
}

/// Arena of symbols and scopes for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    scopes: Vec<Scope>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            symbols: Vec::new(),
            scopes: vec![Scope {
                kind: ScopeKind::Global,
                parent: None,
                owner: None,
                symbols: Vec::new(),
                span: Span::from_coords(0, 0, u32::MAX, u32::MAX),
            }],
        }
    }

    pub fn add_scope(
        &mut self,
        kind: ScopeKind,
        parent: ScopeId,
        owner: Option<SymbolId>,
        span: Span,
    ) -> ScopeId {
        let id = ScopeId::new(self.scopes.len());
        self.scopes.push(Scope {
            kind,
            parent: Some(parent),
            owner,
            symbols: Vec::new(),
            span,
        });
        id
    }

    /// Add a symbol to the arena and to its enclosing scope.
    pub fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId::new(self.symbols.len());
        let scope = symbol.scope;
        self.symbols.push(symbol);
        self.scopes[scope.index()].symbols.push(id);
        id
    }

    /// Make an existing symbol visible in another scope too (unscoped enumerators).
    pub fn export_symbol(&mut self, id: SymbolId, scope: ScopeId) {
        self.scopes[scope.index()].symbols.push(id);
    }

    pub fn set_members(&mut self, id: SymbolId, members: ScopeId) {
        self.symbols[id.index()].members = Some(members);
        self.scopes[members.index()].owner = Some(id);
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId::new(i), s))
    }

    pub fn scopes(&self) -> impl Iterator<Item = (ScopeId, &Scope)> {
        self.scopes
            .iter()
            .enumerate()
            .map(|(i, s)| (ScopeId::new(i), s))
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Members of `scope` called `name`.
    pub fn members_named<'a>(
        &'a self,
        scope: ScopeId,
        name: &'a str,
    ) -> impl Iterator<Item = SymbolId> + 'a {
        self.scope(scope)
            .symbols
            .iter()
            .copied()
            .filter(move |id| self.symbol(*id).name() == Some(name))
    }

    /// Innermost scope containing `position`.
    ///
    /// Scopes are created parent-first, so the containing scope with the
    /// highest index is the innermost one.
    pub fn scope_at(&self, position: Position) -> ScopeId {
        self.scopes()
            .filter(|(_, scope)| scope.span.contains_inclusive(position))
            .map(|(id, _)| id)
            .last()
            .unwrap_or(ScopeId::GLOBAL)
    }

    /// The symbol that owns the nearest enclosing scope of `kind`.
    pub fn enclosing_owner(&self, mut scope: ScopeId, kind: ScopeKind) -> Option<SymbolId> {
        loop {
            let s = self.scope(scope);
            if s.kind == kind {
                if let Some(owner) = s.owner {
                    return Some(owner);
                }
            }
            scope = s.parent?;
        }
    }

    /// Whether `scope` is `ancestor` or nested inside it.
    pub fn is_within(&self, mut scope: ScopeId, ancestor: ScopeId) -> bool {
        loop {
            if scope == ancestor {
                return true;
            }
            match self.scope(scope).parent {
                Some(parent) => scope = parent,
                None => return false,
            }
        }
    }

    /// Namespace path of a namespace (or global) scope; anonymous namespaces
    /// merge into their parent.
    pub fn namespace_path(&self, mut scope: ScopeId) -> Vec<SmolStr> {
        let mut path = Vec::new();
        loop {
            let s = self.scope(scope);
            if s.kind == ScopeKind::Namespace {
                if let Some(name) = s.owner.and_then(|o| self.symbol(o).name.clone()) {
                    path.push(name);
                }
            }
            match s.parent {
                Some(parent) => scope = parent,
                None => break,
            }
        }
        path.reverse();
        path
    }

    /// Fully qualified name of a symbol: enclosing namespaces and classes,
    /// the explicit qualifier, then the name.
    pub fn qualified_name(&self, id: SymbolId) -> Vec<SmolStr> {
        let symbol = self.symbol(id);
        let mut path = Vec::new();
        let mut scope = Some(symbol.scope);
        while let Some(s) = scope {
            let sc = self.scope(s);
            if matches!(sc.kind, ScopeKind::Namespace | ScopeKind::Class) {
                if let Some(name) = sc.owner.and_then(|o| self.symbol(o).name.clone()) {
                    path.push(name);
                }
            }
            scope = sc.parent;
        }
        path.reverse();
        path.extend(symbol.qualifier.iter().cloned());
        if let Some(name) = &symbol.name {
            path.push(name.clone());
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int() -> FullType {
        FullType::builtin("int")
    }

    #[test]
    fn test_signature_ignores_nothing_but_names() {
        let a = FunctionType {
            arguments: vec![int(), FullType::builtin("double")],
            required_arguments: 2,
            ..FunctionType::default()
        };
        let mut b = a.clone();
        assert!(a.is_signature_equal(&b));
        b.is_const = true;
        assert!(!a.is_signature_equal(&b));
    }

    #[test]
    fn test_arity() {
        let f = FunctionType {
            arguments: vec![int(), int()],
            required_arguments: 1,
            ..FunctionType::default()
        };
        assert!(!f.accepts_arity(0));
        assert!(f.accepts_arity(1));
        assert!(f.accepts_arity(2));
        assert!(!f.accepts_arity(3));
    }

    #[test]
    fn test_scope_at_prefers_innermost() {
        let mut table = SymbolTable::new();
        let outer = table.add_scope(
            ScopeKind::Namespace,
            ScopeId::GLOBAL,
            None,
            Span::from_coords(1, 1, 10, 1),
        );
        let inner = table.add_scope(ScopeKind::Class, outer, None, Span::from_coords(2, 1, 4, 1));
        assert_eq!(table.scope_at(Position::new(3, 5)), inner);
        assert_eq!(table.scope_at(Position::new(6, 1)), outer);
        assert_eq!(table.scope_at(Position::new(12, 1)), ScopeId::GLOBAL);
        assert!(table.is_within(inner, outer));
    }

    #[test]
    fn test_qualified_name() {
        let mut table = SymbolTable::new();
        let ns = table.add_symbol(Symbol::new(
            Some("ns".into()),
            SymbolKind::Namespace,
            ScopeId::GLOBAL,
            Span::from_coords(1, 11, 1, 13),
        ));
        let ns_scope = table.add_scope(ScopeKind::Namespace, ScopeId::GLOBAL, None, Span::from_coords(1, 14, 5, 1));
        table.set_members(ns, ns_scope);
        let mut f = Symbol::new(Some("bar".into()), SymbolKind::Function, ns_scope, Span::from_coords(2, 10, 2, 13));
        f.qualifier = vec!["Foo".into()];
        let f = table.add_symbol(f);
        assert_eq!(table.qualified_name(f), vec!["ns", "Foo", "bar"]);
        assert_eq!(table.namespace_path(ns_scope), vec!["ns"]);
    }
}
