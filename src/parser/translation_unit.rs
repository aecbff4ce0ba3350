//! Token stream of a translation unit.
//!
//! Reads preprocessed code back into tokens that carry their position in the
//! original source. Lines that start with `#` are preprocessor markers (the
//! preprocessor blanks every real directive), see [`super::preprocessor`].

use smol_str::SmolStr;

use super::lexer::Lexer;
use super::preprocessor::{EXPANSION_BEGIN, EXPANSION_END};
use super::token_kind::TokenKind;
use crate::base::{Position, Span};

/// A token of a translation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuToken {
    pub kind: TokenKind,
    pub text: SmolStr,
    pub start: Position,
    pub end: Position,
    /// Produced by a macro expansion; positioned at the macro use.
    pub generated: bool,
}

impl TuToken {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }
}

/// Tokenize preprocessed (or raw) code, applying position markers.
///
/// The returned vector always ends with an [`TokenKind::Eof`] token.
pub fn read_tokens(code: &str) -> Vec<TuToken> {
    let mut out = Vec::new();
    let mut line = 1u32;
    let mut line_start = 0usize;
    let mut prev_end = 0usize;
    let mut at_line_start = true;
    let mut skip_line = false;
    let mut pending_line: Option<u32> = None;
    let mut expansion: Option<Span> = None;

    for token in Lexer::new(code) {
        // newlines hidden in comments and line continuations
        let gap = &code[prev_end..token.begin()];
        if let Some(last) = gap.rfind('\n') {
            line += gap.matches('\n').count() as u32;
            line_start = prev_end + last + 1;
        }
        prev_end = token.end();

        if token.is(TokenKind::Newline) {
            line = pending_line.take().unwrap_or(line + 1);
            line_start = token.end();
            at_line_start = true;
            skip_line = false;
            continue;
        }
        if skip_line {
            continue;
        }
        if at_line_start && token.is(TokenKind::Hash) {
            let rest = &code[token.end()..];
            let marker = rest[..rest.find('\n').unwrap_or(rest.len())].trim();
            if let Some(args) = marker.strip_prefix(EXPANSION_BEGIN.trim_start_matches("# ")) {
                expansion = parse_expansion_site(args);
            } else if marker == EXPANSION_END.trim_start_matches("# ") {
                expansion = None;
            } else if let Ok(n) = marker.parse::<u32>() {
                pending_line = Some(n);
            }
            skip_line = true;
            continue;
        }
        at_line_start = false;

        let (start, end, generated) = match expansion {
            Some(site) => (site.start, site.end, true),
            None => {
                let column = (token.begin() - line_start) as u32 + 1;
                let width = token.text.len() as u32;
                (
                    Position::new(line, column),
                    Position::new(line, column + width),
                    false,
                )
            }
        };
        out.push(TuToken {
            kind: token.kind,
            text: SmolStr::new(token.text),
            start,
            end,
            generated,
        });
    }

    let eof = Position::new(line, (code.len() - line_start) as u32 + 1);
    out.push(TuToken {
        kind: TokenKind::Eof,
        text: SmolStr::default(),
        start: eof,
        end: eof,
        generated: false,
    });
    out
}

/// Parse `<offset>,<length> <line>:<column>` into the span of the macro use.
fn parse_expansion_site(args: &str) -> Option<Span> {
    let (range, position) = args.trim().split_once(' ')?;
    let (_, length) = range.split_once(',')?;
    let (line, column) = position.split_once(':')?;
    let line: u32 = line.parse().ok()?;
    let column: u32 = column.parse().ok()?;
    let length: u32 = length.parse().ok()?;
    Some(Span::from_coords(line, column, line, column + length))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::FilePath;
    use crate::parser::preprocessor::{NoIncludes, preprocess};

    #[test]
    fn test_raw_positions() {
        let tokens = read_tokens("int x;\n  /* a\n b */ float y;");
        let y = tokens.iter().find(|t| t.text == "y").unwrap();
        assert_eq!(y.start, Position::new(3, 13));
        assert!(!y.generated);
        assert!(tokens.last().unwrap().is(TokenKind::Eof));
    }

    #[test]
    fn test_expansion_tokens_are_generated() {
        let pp = preprocess(
            &mut NoIncludes,
            "#define DECL int value\nDECL; int after;",
            &FilePath::new("/a.cpp"),
            &[],
        );
        let tokens = read_tokens(&pp.code);
        let value = tokens.iter().find(|t| t.text == "value").unwrap();
        assert!(value.generated);
        assert_eq!(value.start, Position::new(2, 1));
        assert_eq!(value.end, Position::new(2, 5));

        let after = tokens.iter().find(|t| t.text == "after").unwrap();
        assert!(!after.generated);
        assert_eq!(after.start, Position::new(2, 11));
    }

    #[test]
    fn test_directives_are_skipped_in_raw_text() {
        let tokens = read_tokens("#include <a.h>\nint x;");
        assert_eq!(tokens[0].text, "int");
        assert_eq!(tokens[0].start, Position::new(2, 1));
    }
}
