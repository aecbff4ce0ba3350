//! Classified uses of every name inside one function body.

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use smol_str::SmolStr;

use super::document::SymbolRef;
use super::lookup::LookupContext;
use super::symbols::{ScopeKind, SymbolKind};
use super::type_of::TypeOfExpression;
use super::walk::{FunctionBody, NameRole, function_occurrences};
use crate::base::FilePath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UseKind {
    Type,
    Field,
    Local,
    Static,
    VirtualMethod,
    Unresolved,
}

/// One occurrence of a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Use {
    pub line: u32,
    pub column: u32,
    pub length: u32,
    pub kind: UseKind,
}

/// Identity of a declaring symbol: where it is declared and what it is called.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolKey {
    pub file: FilePath,
    pub line: u32,
    pub column: u32,
    pub name: SmolStr,
}

impl SymbolKey {
    pub fn of(symbol: &SymbolRef) -> Self {
        let s = symbol.symbol();
        Self {
            file: symbol.file().clone(),
            line: s.line(),
            column: s.column(),
            name: s.name.clone().unwrap_or_default(),
        }
    }
}

/// Uses grouped by declaring symbol, in order of first appearance.
pub type LocalUseMap = IndexMap<SymbolKey, Vec<Use>, FxBuildHasher>;

/// The local use table of one function body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocalSymbols {
    pub uses: LocalUseMap,
    /// A local or argument named `q` is in scope (Qt's private-implementation idiom).
    pub has_q: bool,
    /// Likewise for `d`.
    pub has_d: bool,
}

impl LocalSymbols {
    pub fn new(context: &LookupContext, function: FunctionBody<'_>) -> Self {
        let resolver = TypeOfExpression::new(context);
        let mut table = LocalSymbols::default();
        for occurrence in function_occurrences(function) {
            let segment = occurrence.segment();
            if segment.generated {
                continue;
            }
            let candidates = resolver.resolve_occurrence(&occurrence);
            let length = segment.text.chars().count() as u32;
            let position = segment.span.start;
            let (key, kind) = match candidates.first() {
                Some(symbol) => match classify(symbol) {
                    Some(kind) => (SymbolKey::of(symbol), kind),
                    None => continue,
                },
                None if matches!(occurrence.role, NameRole::Declaration) => continue,
                None => (
                    SymbolKey {
                        file: context.document().path().clone(),
                        line: position.line,
                        column: position.column,
                        name: segment.text.clone(),
                    },
                    UseKind::Unresolved,
                ),
            };
            if kind == UseKind::Local {
                match key.name.as_str() {
                    "q" => table.has_q = true,
                    "d" => table.has_d = true,
                    _ => {}
                }
            }
            table.uses.entry(key).or_default().push(Use {
                line: position.line,
                column: position.column,
                length,
                kind,
            });
        }
        table
    }

    /// Declared symbols whose only use is the declaration itself.
    pub fn unused(&self) -> impl Iterator<Item = &SymbolKey> {
        self.uses
            .iter()
            .filter(|(key, uses)| is_unused(key, uses))
            .map(|(key, _)| key)
    }

    /// The uses of the symbol that has a use at `line`/`column`.
    pub fn uses_at(&self, line: u32, column: u32) -> Option<(&SymbolKey, &[Use])> {
        self.uses
            .iter()
            .find(|(_, uses)| {
                uses.iter()
                    .any(|u| u.line == line && column >= u.column && column <= u.column + u.length)
            })
            .map(|(key, uses)| (key, uses.as_slice()))
    }
}

/// Exactly one use, a local one, sitting where `key` is declared. A symbol
/// declared outside the analysed body (a local captured by a lambda) is never
/// unused on the strength of a single reference.
pub fn is_unused(key: &SymbolKey, uses: &[Use]) -> bool {
    matches!(
        uses,
        [only] if only.kind == UseKind::Local && only.line == key.line && only.column == key.column
    )
}

fn classify(symbol: &SymbolRef) -> Option<UseKind> {
    let s = symbol.symbol();
    let scope = symbol.enclosing_scope_kind();
    match s.kind {
        SymbolKind::Class
        | SymbolKind::ForwardClass
        | SymbolKind::Enum
        | SymbolKind::Typedef
        | SymbolKind::TemplateParameter
        | SymbolKind::Namespace => Some(UseKind::Type),
        SymbolKind::Argument => Some(UseKind::Local),
        SymbolKind::Enumerator => Some(UseKind::Static),
        SymbolKind::Declaration | SymbolKind::Function => match scope {
            ScopeKind::Block | ScopeKind::Function if !s.ty.is_function() => Some(UseKind::Local),
            ScopeKind::Class => match s.function_type() {
                Some(f) if f.is_virtual || f.is_override => Some(UseKind::VirtualMethod),
                Some(_) => None,
                None if s.is_static => Some(UseKind::Static),
                None => Some(UseKind::Field),
            },
            _ if s.ty.is_function() => None,
            _ => Some(UseKind::Static),
        },
        SymbolKind::UsingNamespace | SymbolKind::UsingDeclaration => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::base::Position;
    use crate::hir::walk::function_at;
    use crate::hir::{Document, Snapshot};

    fn local_symbols(source: &str, line: u32, column: u32) -> LocalSymbols {
        let path = FilePath::new("/p/a.cpp");
        let snapshot = Snapshot::default();
        let pp = snapshot.preprocessed_code(source, &path, &[]);
        let document = Arc::new(Document::from_source(pp, 1));
        let snapshot = snapshot.insert(document.clone());
        let context = LookupContext::new(document.clone(), &snapshot);
        let function = function_at(document.translation_unit(), Position::new(line, column)).unwrap();
        LocalSymbols::new(&context, function)
    }

    fn uses_of<'a>(symbols: &'a LocalSymbols, name: &str) -> &'a [Use] {
        entry(symbols, name).1
    }

    fn entry<'a>(symbols: &'a LocalSymbols, name: &str) -> (&'a SymbolKey, &'a [Use]) {
        symbols
            .uses
            .iter()
            .find(|(k, _)| k.name == name)
            .map(|(k, v)| (k, v.as_slice()))
            .unwrap()
    }

    fn unused(symbols: &LocalSymbols, name: &str) -> bool {
        let (key, uses) = entry(symbols, name);
        is_unused(key, uses)
    }

    const SOURCE: &str = "\
class Widget {
public:
    virtual void paint();
    void draw(int unused, int used);
    static int counter;
    int width;
};
void Widget::draw(int unused, int used)
{
    int lonely;
    int busy = used + width;
    busy += counter;
    paint();
    missing = 1;
}
";

    #[test]
    fn test_declaration_only_is_unused() {
        let symbols = local_symbols(SOURCE, 10, 5);
        assert_eq!(uses_of(&symbols, "lonely").len(), 1);
        assert!(unused(&symbols, "lonely"));
        assert!(unused(&symbols, "unused"));
        assert!(!unused(&symbols, "busy"));
        let unused: Vec<_> = symbols.unused().map(|k| k.name.as_str()).collect();
        assert_eq!(unused, vec!["unused", "lonely"]);
    }

    #[test]
    fn test_captured_local_in_lambda_is_not_unused() {
        let source = "\
void f()
{
    int a = 0;
    auto l = [&](int b) { return a + b; };
    l(a);
}
";
        let symbols = local_symbols(source, 4, 35);
        let (key, uses) = entry(&symbols, "a");
        assert_eq!((key.line, key.column), (3, 9));
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].line, 4);
        assert!(!is_unused(key, uses));
        assert!(symbols.unused().all(|k| k.name != "a"));
    }

    #[test]
    fn test_uses_are_classified() {
        let symbols = local_symbols(SOURCE, 10, 5);
        assert_eq!(uses_of(&symbols, "Widget")[0].kind, UseKind::Type);
        assert_eq!(uses_of(&symbols, "used")[1].kind, UseKind::Local);
        assert_eq!(uses_of(&symbols, "width")[0].kind, UseKind::Field);
        assert_eq!(uses_of(&symbols, "counter")[0].kind, UseKind::Static);
        assert_eq!(uses_of(&symbols, "paint")[0].kind, UseKind::VirtualMethod);
        assert_eq!(uses_of(&symbols, "missing")[0].kind, UseKind::Unresolved);
        assert!(!symbols.has_q && !symbols.has_d);
    }

    #[test]
    fn test_uses_at_cursor() {
        let symbols = local_symbols(SOURCE, 10, 5);
        let (key, uses) = symbols.uses_at(12, 6).unwrap();
        assert_eq!(key.name, "busy");
        assert_eq!(uses.len(), 2);
    }

    #[test]
    fn test_q_and_d_pointers_detected() {
        let symbols = local_symbols("void f(int *q)\n{\n    int d = *q;\n}\n", 3, 5);
        assert!(symbols.has_q);
        assert!(symbols.has_d);
    }
}
