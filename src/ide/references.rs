//! Cross-file reference search.
//!
//! Documents are filtered by a token-text prefilter, then scanned in parallel:
//! every name occurrence spelling the symbol's name is resolved in its own
//! scope and kept when it binds to the same entity.

use std::sync::Arc;

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::base::FilePath;
use crate::hir::walk::unit_occurrences;
use crate::hir::{Document, LookupContext, Snapshot, SymbolRef, TypeOfExpression};
use crate::parser::Macro;

/// One occurrence of a symbol or macro.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Usage {
    pub file: FilePath,
    /// 1-based line.
    pub line: u32,
    /// 1-based byte column.
    pub column: u32,
    /// Length in bytes of the spelled name.
    pub length: u32,
}

/// Every reference to `symbol`, declaration sites included, sorted by file
/// and position. Locals are only searched in their own document.
///
/// Returns whatever was found so far once `cancel` fires; callers that care
/// check the token before using the result.
pub fn find_references(snapshot: &Snapshot, symbol: &SymbolRef, cancel: &CancellationToken) -> Vec<Usage> {
    let Some(name) = symbol.name() else {
        return Vec::new();
    };
    let documents: Vec<Arc<Document>> = if symbol.is_local() {
        vec![symbol.document.clone()]
    } else {
        snapshot
            .documents()
            .filter(|d| d.mentions(name))
            .cloned()
            .collect()
    };
    trace!(name, candidates = documents.len(), "searching references");

    let mut usages: Vec<Usage> = documents
        .par_iter()
        .flat_map_iter(|document| {
            if cancel.is_cancelled() {
                return Vec::new();
            }
            references_in_document(snapshot, document, symbol)
        })
        .collect();
    usages.sort();
    usages.dedup();
    usages
}

/// References to `symbol` inside one document.
pub fn references_in_document(snapshot: &Snapshot, document: &Arc<Document>, symbol: &SymbolRef) -> Vec<Usage> {
    let Some(name) = symbol.name() else {
        return Vec::new();
    };
    let context = LookupContext::new(document.clone(), snapshot);
    let type_of = TypeOfExpression::new(&context);
    unit_occurrences(document.translation_unit())
        .iter()
        .filter(|occurrence| {
            let segment = occurrence.segment();
            !segment.generated && segment.text == name
        })
        .filter(|occurrence| {
            type_of
                .resolve_occurrence(occurrence)
                .iter()
                .any(|candidate| candidate.is_same_entity(symbol))
        })
        .map(|occurrence| {
            let start = occurrence.segment().span.start;
            Usage {
                file: document.path().clone(),
                line: start.line,
                column: start.column,
                length: name.len() as u32,
            }
        })
        .collect()
}

/// Every expansion of `definition` across the snapshot. The `#define` itself
/// is not a usage.
pub fn find_macro_usages(snapshot: &Snapshot, definition: &Macro, cancel: &CancellationToken) -> Vec<Usage> {
    let documents: Vec<&Arc<Document>> = snapshot.documents().collect();
    let mut usages: Vec<Usage> = documents
        .par_iter()
        .flat_map_iter(|document| {
            if cancel.is_cancelled() {
                return Vec::new();
            }
            document
                .macro_uses()
                .iter()
                .filter(|u| {
                    u.name == definition.name
                        && u.definition_file == definition.file
                        && u.definition_line == definition.line
                })
                .map(|u| Usage {
                    file: document.path().clone(),
                    line: u.line,
                    column: u.column,
                    length: definition.name.len() as u32,
                })
                .collect()
        })
        .collect();
    usages.sort();
    usages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::SymbolKind;

    fn snapshot(files: &[(&str, &str)]) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for (path, source) in files {
            let preprocessed = snapshot.preprocessed_code(source, &FilePath::new(path), &[]);
            snapshot.insert_mut(Arc::new(Document::from_source(preprocessed, 1)));
        }
        snapshot
    }

    fn symbol_named(snapshot: &Snapshot, path: &str, name: &str, kind: SymbolKind) -> SymbolRef {
        let document = snapshot.document(&FilePath::new(path)).unwrap().clone();
        let id = document
            .symbols()
            .symbols()
            .find(|(_, s)| s.name() == Some(name) && s.kind == kind)
            .map(|(id, _)| id)
            .unwrap();
        SymbolRef::new(document, id)
    }

    fn positions(usages: &[Usage]) -> Vec<(&str, u32, u32)> {
        usages
            .iter()
            .map(|u| (u.file.file_name(), u.line, u.column))
            .collect()
    }

    #[test]
    fn test_references_across_files() {
        let snapshot = snapshot(&[
            ("/p/counter.h", "class Counter {\npublic:\n    int total;\n};\n"),
            (
                "/p/main.cpp",
                "#include \"counter.h\"\nint read(Counter &c)\n{\n    return c.total;\n}\n",
            ),
        ]);
        let total = symbol_named(&snapshot, "/p/counter.h", "total", SymbolKind::Declaration);
        let usages = find_references(&snapshot, &total, &CancellationToken::new());
        assert_eq!(
            positions(&usages),
            vec![("counter.h", 3, 9), ("main.cpp", 4, 14)]
        );
    }

    #[test]
    fn test_local_references_stay_in_document() {
        let snapshot = snapshot(&[
            ("/p/a.cpp", "void f()\n{\n    int n = 0;\n    n++;\n}\n"),
            ("/p/b.cpp", "int n;\nvoid g() { n = 1; }\n"),
        ]);
        let local = symbol_named(&snapshot, "/p/a.cpp", "n", SymbolKind::Declaration);
        let usages = find_references(&snapshot, &local, &CancellationToken::new());
        assert_eq!(positions(&usages), vec![("a.cpp", 3, 9), ("a.cpp", 4, 5)]);
    }

    #[test]
    fn test_anonymous_symbol_has_no_references() {
        let snapshot = snapshot(&[("/p/a.cpp", "enum { Red };\nint shade = Red;\n")]);
        let document = snapshot.document(&FilePath::new("/p/a.cpp")).unwrap().clone();
        let id = document
            .symbols()
            .symbols()
            .find(|(_, s)| s.kind == SymbolKind::Enum)
            .map(|(id, _)| id)
            .unwrap();
        let anonymous = SymbolRef::new(document, id);
        assert_eq!(anonymous.name(), None);
        assert!(find_references(&snapshot, &anonymous, &CancellationToken::new()).is_empty());
    }

    #[test]
    fn test_cancelled_search_finds_nothing() {
        let snapshot = snapshot(&[("/p/a.cpp", "int shared;\nint f() { return shared; }\n")]);
        let shared = symbol_named(&snapshot, "/p/a.cpp", "shared", SymbolKind::Declaration);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(find_references(&snapshot, &shared, &cancel).is_empty());
    }

    #[test]
    fn test_macro_usages_exclude_definition() {
        let snapshot = snapshot(&[
            ("/p/config.h", "#define SIZE 4\n"),
            ("/p/a.cpp", "#include \"config.h\"\nint a[SIZE];\nint b = SIZE;\n"),
        ]);
        let definition = snapshot
            .document(&FilePath::new("/p/config.h"))
            .unwrap()
            .defined_macros()[0]
            .clone();
        let usages = find_macro_usages(&snapshot, &definition, &CancellationToken::new());
        assert_eq!(positions(&usages), vec![("a.cpp", 2, 7), ("a.cpp", 3, 9)]);
    }
}
