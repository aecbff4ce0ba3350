//! Preprocessor records kept on a document: macros, macro uses and includes.

use smol_str::SmolStr;

use crate::base::FilePath;

/// A `#define`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Macro {
    pub name: SmolStr,
    pub file: FilePath,
    /// 1-based line of the `#define`.
    pub line: u32,
    /// Byte offset of the macro name in the defining file.
    pub offset: u32,
    /// Parameter names for function-like macros.
    pub params: Option<Vec<SmolStr>>,
    pub variadic: bool,
    pub body: String,
}

impl Macro {
    pub fn is_function_like(&self) -> bool {
        self.params.is_some()
    }

    /// True when both records describe the same definition site.
    pub fn same_definition(&self, other: &Macro) -> bool {
        self.name == other.name && self.file == other.file && self.line == other.line
    }
}

/// One expansion of a macro in the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MacroUse {
    pub name: SmolStr,
    /// Where the expanded macro was defined.
    pub definition_file: FilePath,
    pub definition_line: u32,
    /// Byte offset and length of the use (including arguments).
    pub offset: u32,
    pub length: u32,
    pub line: u32,
    pub column: u32,
}

impl MacroUse {
    pub fn contains_offset(&self, offset: usize) -> bool {
        let start = self.offset as usize;
        offset >= start && offset <= start + self.length as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncludeKind {
    /// `#include "file.h"`
    Quoted,
    /// `#include <file.h>`
    Angle,
}

/// An `#include` directive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Include {
    /// The file name as written, without quotes or angle brackets.
    pub literal: String,
    pub kind: IncludeKind,
    /// Resolved file, `None` when the include could not be found.
    pub resolved: Option<FilePath>,
    /// 1-based line of the directive.
    pub line: u32,
}

impl Include {
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }
}
