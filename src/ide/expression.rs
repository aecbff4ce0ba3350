//! Recovering the expression that ends at the cursor from raw editor text.

use std::ops::Range;

use crate::base::text_utils::is_identifier_char;
use crate::parser::{Token, TokenKind, tokenize};

/// How many lines above the cursor an expression may start.
const MAX_EXPRESSION_LINES: usize = 8;

/// The postfix expression (`a.b->c(1)[2]::d`) that ends at `end`.
///
/// Scans backwards over identifiers, `this`, member and scope operators and
/// balanced `()`/`[]` groups. Returns `None` when nothing expression-like ends
/// at `end`.
pub fn expression_under_cursor(text: &str, end: usize) -> Option<Range<usize>> {
    let end = floor_char_boundary(text, end.min(text.len()));
    let window = window_start(text, end);
    let tokens: Vec<Token<'_>> = tokenize(&text[window..end])
        .into_iter()
        .filter(|t| t.kind != TokenKind::Newline)
        .collect();

    let mut i = tokens.len();
    let mut start = None;
    loop {
        let Some(last) = i.checked_sub(1) else { break };
        match tokens[last].kind {
            TokenKind::Identifier | TokenKind::Kw_this => {
                i = last;
                start = Some(i);
                if i > 0 && tokens[i - 1].is(TokenKind::Tilde) {
                    i -= 1;
                    start = Some(i);
                }
            }
            TokenKind::RParen | TokenKind::RBracket => {
                let Some(open) = matching_open(&tokens, last) else { break };
                i = open;
                start = Some(i);
                let callee = i
                    .checked_sub(1)
                    .is_some_and(|p| ends_operand(tokens[p].kind));
                if callee {
                    continue;
                }
            }
            _ => break,
        }
        match i.checked_sub(1).map(|p| tokens[p].kind) {
            Some(TokenKind::Dot | TokenKind::Arrow) => i -= 1,
            Some(TokenKind::ColonColon) => {
                i -= 1;
                start = Some(i);
                let leading = i.checked_sub(1).is_none_or(|p| !ends_operand(tokens[p].kind));
                if leading {
                    break;
                }
            }
            _ => break,
        }
    }
    let first = start?;
    Some(window + tokens[first].begin()..end)
}

/// Byte offset of the `)` matching the `(` at `open`.
pub fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let rest = text.get(open..)?;
    let mut depth = 0usize;
    for token in tokenize(rest) {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + token.begin());
                }
            }
            _ => {}
        }
        if depth == 0 {
            return None;
        }
    }
    None
}

/// `end` followed by any whitespace and a balanced `(...)`, extended over the
/// parenthesis so overloaded calls can be told apart.
pub fn extend_over_call(text: &str, end: usize) -> usize {
    let end = end.min(text.len());
    let rest = &text[end..];
    let skipped = rest.len() - rest.trim_start().len();
    let open = end + skipped;
    if text[open..].starts_with('(') {
        if let Some(close) = matching_paren(text, open) {
            return close + 1;
        }
    }
    end
}

/// Whether the character at `offset` (or right before it) is part of an
/// identifier.
pub fn touches_identifier(text: &str, offset: usize) -> bool {
    let at = text.get(offset..).and_then(|s| s.chars().next());
    let before = text.get(..offset).and_then(|s| s.chars().next_back());
    at.is_some_and(is_identifier_char) || before.is_some_and(is_identifier_char)
}

fn ends_operand(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Identifier | TokenKind::Kw_this | TokenKind::RParen | TokenKind::RBracket
    )
}

fn matching_open(tokens: &[Token<'_>], close: usize) -> Option<usize> {
    let (open_kind, close_kind) = match tokens[close].kind {
        TokenKind::RParen => (TokenKind::LParen, TokenKind::RParen),
        _ => (TokenKind::LBracket, TokenKind::RBracket),
    };
    let mut depth = 0usize;
    for i in (0..=close).rev() {
        let kind = tokens[i].kind;
        if kind == close_kind {
            depth += 1;
        } else if kind == open_kind {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

fn window_start(text: &str, end: usize) -> usize {
    text[..end]
        .match_indices('\n')
        .rev()
        .nth(MAX_EXPRESSION_LINES)
        .map(|(i, _)| i + 1)
        .unwrap_or(0)
}

fn floor_char_boundary(text: &str, mut offset: usize) -> usize {
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn under(text_with_cursor: &str) -> Option<String> {
        let offset = text_with_cursor.find('|').unwrap();
        let text = text_with_cursor.replacen('|', "", 1);
        expression_under_cursor(&text, offset).map(|range| text[range].to_string())
    }

    #[rstest]
    #[case("x = foo|;", Some("foo"))]
    #[case("return a.b->c|", Some("a.b->c"))]
    #[case("std::vector|", Some("std::vector"))]
    #[case("::global|", Some("::global"))]
    #[case("call(1, 2).member|", Some("call(1, 2).member"))]
    #[case("items[i].size|", Some("items[i].size"))]
    #[case("this->d|", Some("this->d"))]
    #[case("1 + |", None)]
    #[case("Foo::~Foo|", Some("Foo::~Foo"))]
    fn test_expression_under_cursor(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(under(input).as_deref(), expected);
    }

    #[test]
    fn test_extend_over_call() {
        let text = "run (a, (b)) + 1";
        assert_eq!(extend_over_call(text, 3), 12);
        assert_eq!(extend_over_call("run + 1", 3), 3);
        assert_eq!(extend_over_call("run(", 3), 3);
    }

    #[test]
    fn test_matching_paren() {
        assert_eq!(matching_paren("f(a(b), c)", 1), Some(9));
        assert_eq!(matching_paren("f(a", 1), None);
    }
}
