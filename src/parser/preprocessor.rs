//! Macro-expanding preprocessor.
//!
//! The output keeps the line structure of the input: directive lines and
//! skipped conditional groups are blanked, and every macro expansion is wrapped
//! in marker lines:
//!
//! ```text
//! # expansion begin <offset>,<length> <line>:<column>
//! <expanded tokens>
//! # expansion end
//! # <line after the use>
//! <padding up to the column after the use>
//! ```
//!
//! so the translation unit reader can give every token from the original text
//! its original position and flag every token from an expansion as generated.
//! Included files are never re-read: the macros they export come from the
//! [`IncludeEnvironment`], which hands out the already-parsed documents.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use text_size::TextRange;
use tracing::{debug, trace};

use super::diagnostics::DiagnosticMessage;
use super::directives::{Include, IncludeKind, Macro, MacroUse};
use super::lexer::{Token, tokenize};
use super::token_kind::TokenKind;
use crate::base::{FilePath, LineIndex};

/// Recursion limit for nested expansions.
const MAX_EXPANSION_DEPTH: usize = 64;

pub(crate) const EXPANSION_BEGIN: &str = "# expansion begin";
pub(crate) const EXPANSION_END: &str = "# expansion end";

/// Where the preprocessor finds included files.
pub trait IncludeEnvironment {
    /// Resolve an include directive written in `from`.
    fn resolve_include(&mut self, name: &str, kind: IncludeKind, from: &FilePath)
    -> Option<FilePath>;

    /// Macros visible after including `path`, in definition order.
    fn exported_macros(&mut self, path: &FilePath) -> Vec<Macro>;
}

/// An environment that resolves nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIncludes;

impl IncludeEnvironment for NoIncludes {
    fn resolve_include(&mut self, _: &str, _: IncludeKind, _: &FilePath) -> Option<FilePath> {
        None
    }

    fn exported_macros(&mut self, _: &FilePath) -> Vec<Macro> {
        Vec::new()
    }
}

/// Preprocessed code plus everything the preprocessor learnt on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessedSource {
    pub file: FilePath,
    pub code: String,
    pub defined_macros: Vec<Macro>,
    pub macro_uses: Vec<MacroUse>,
    pub includes: Vec<Include>,
    pub diagnostics: Vec<DiagnosticMessage>,
}

impl PreprocessedSource {
    /// Wrap text that should be parsed as-is.
    pub fn unprocessed(file: FilePath, code: impl Into<String>) -> Self {
        Self {
            file,
            code: code.into(),
            defined_macros: Vec::new(),
            macro_uses: Vec::new(),
            includes: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.code.as_bytes()
    }
}

/// Preprocess `raw` as the contents of `file`.
pub fn preprocess(
    env: &mut dyn IncludeEnvironment,
    raw: &str,
    file: &FilePath,
    predefined: &[Macro],
) -> PreprocessedSource {
    let mut pp = Preprocessor::new(env, raw, file.clone());
    for m in predefined {
        pp.macros.insert(m.name.clone(), m.clone());
    }
    pp.run()
}

/// An owned token used while expanding.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PpToken {
    kind: TokenKind,
    text: SmolStr,
}

impl From<&Token<'_>> for PpToken {
    fn from(token: &Token<'_>) -> Self {
        Self {
            kind: token.kind,
            text: SmolStr::new(token.text),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Conditional {
    parent_active: bool,
    taken: bool,
    active: bool,
    line: u32,
}

struct Preprocessor<'a> {
    env: &'a mut dyn IncludeEnvironment,
    raw: &'a str,
    file: FilePath,
    lines: LineIndex,
    macros: FxHashMap<SmolStr, Macro>,
    conditionals: Vec<Conditional>,
    edits: Vec<(TextRange, String)>,
    out: PreprocessedSource,
}

impl<'a> Preprocessor<'a> {
    fn new(env: &'a mut dyn IncludeEnvironment, raw: &'a str, file: FilePath) -> Self {
        Self {
            env,
            raw,
            lines: LineIndex::new(raw),
            macros: FxHashMap::default(),
            conditionals: Vec::new(),
            edits: Vec::new(),
            out: PreprocessedSource::unprocessed(file.clone(), String::new()),
            file,
        }
    }

    fn is_active(&self) -> bool {
        self.conditionals.last().is_none_or(|c| c.active)
    }

    fn run(mut self) -> PreprocessedSource {
        let tokens = tokenize(self.raw);
        let mut run: Vec<Token<'a>> = Vec::new();
        let mut line_start = 0usize;
        let mut group: Vec<Token<'a>> = Vec::new();

        let mut groups: Vec<(TextRange, Vec<Token<'a>>)> = Vec::new();
        for token in tokens {
            if token.is(TokenKind::Newline) {
                let range = TextRange::new((line_start as u32).into(), token.range.start());
                groups.push((range, std::mem::take(&mut group)));
                line_start = token.end();
            } else {
                group.push(token);
            }
        }
        let range = TextRange::new((line_start as u32).into(), (self.raw.len() as u32).into());
        groups.push((range, group));

        for (range, group) in groups {
            let is_directive = group.first().is_some_and(|t| t.is(TokenKind::Hash));
            if is_directive {
                self.flush(&mut run);
                self.directive(&group);
                self.blank(range);
            } else if self.is_active() {
                run.extend(group);
            } else {
                self.blank(range);
            }
        }
        self.flush(&mut run);

        if let Some(open) = self.conditionals.last().copied() {
            self.out.diagnostics.push(DiagnosticMessage::error(
                self.file.clone(),
                open.line,
                1,
                1,
                "unterminated conditional directive",
            ));
        }

        self.out.code = apply_edits(self.raw, &self.edits);
        self.out
    }

    /// Replace a range with only the newlines it contains.
    fn blank(&mut self, range: TextRange) {
        if range.is_empty() {
            return;
        }
        let newlines = self.raw[range].matches('\n').count();
        self.edits.push((range, "\n".repeat(newlines)));
    }

    fn position(&self, offset: usize) -> (u32, u32) {
        let pos = self.lines.position(offset);
        (pos.line, pos.column)
    }

    // ------------------------------------------------------------------------
    // Code runs
    // ------------------------------------------------------------------------

    fn flush(&mut self, run: &mut Vec<Token<'a>>) {
        let tokens = std::mem::take(run);
        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            if token.kind != TokenKind::Identifier {
                i += 1;
                continue;
            }
            let Some(m) = self.macros.get(token.text).cloned() else {
                i += 1;
                continue;
            };

            let (args, last) = if m.is_function_like() {
                let Some(close) = matching_paren(tokens[i + 1..].iter().map(|t| t.kind)) else {
                    i += 1;
                    continue;
                };
                let owned: Vec<PpToken> =
                    tokens[i + 1..=i + 1 + close].iter().map(PpToken::from).collect();
                match collect_arguments(&owned) {
                    Some((args, consumed)) => (Some(args), i + consumed),
                    None => {
                        i += 1;
                        continue;
                    }
                }
            } else {
                (None, i)
            };

            let mut disabled = Vec::new();
            let expansion = self.expand_macro(&m, args, &mut disabled, 0);

            let begin = token.begin();
            let end = tokens[last].end();
            let (line, column) = self.position(begin);
            let (end_line, end_column) = self.position(end);
            let text = expansion
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");

            let block = format!(
                "\n{EXPANSION_BEGIN} {begin},{len} {line}:{column}\n{text}\n{EXPANSION_END}\n# {end_line}\n{pad}",
                len = end - begin,
                pad = " ".repeat(end_column.saturating_sub(1) as usize),
            );
            self.edits.push((
                TextRange::new((begin as u32).into(), (end as u32).into()),
                block,
            ));
            self.out.macro_uses.push(MacroUse {
                name: m.name.clone(),
                definition_file: m.file.clone(),
                definition_line: m.line,
                offset: begin as u32,
                length: (end - begin) as u32,
                line,
                column,
            });
            trace!(name = %m.name, line, "expanded macro");
            i = last + 1;
        }
    }

    fn expand_macro(
        &self,
        m: &Macro,
        args: Option<Vec<Vec<PpToken>>>,
        disabled: &mut Vec<SmolStr>,
        depth: usize,
    ) -> Vec<PpToken> {
        let body: Vec<PpToken> = tokenize(&m.body)
            .iter()
            .filter(|t| !t.is(TokenKind::Newline))
            .map(PpToken::from)
            .collect();

        let substituted = match (&m.params, args) {
            (Some(params), Some(args)) => substitute(&body, params, m.variadic, &args, |arg| {
                let mut inner = disabled.clone();
                self.expand_tokens(arg, &mut inner, depth + 1)
            }),
            _ => body,
        };

        disabled.push(m.name.clone());
        let result = self.expand_tokens(&substituted, disabled, depth + 1);
        disabled.pop();
        result
    }

    fn expand_tokens(
        &self,
        tokens: &[PpToken],
        disabled: &mut Vec<SmolStr>,
        depth: usize,
    ) -> Vec<PpToken> {
        if depth > MAX_EXPANSION_DEPTH {
            return tokens.to_vec();
        }
        let mut out = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            let candidate = (token.kind == TokenKind::Identifier
                && !disabled.contains(&token.text))
                .then(|| self.macros.get(&token.text))
                .flatten();
            let Some(m) = candidate else {
                out.push(token.clone());
                i += 1;
                continue;
            };
            if m.is_function_like() {
                match collect_arguments(&tokens[i + 1..]) {
                    Some((args, consumed)) => {
                        out.extend(self.expand_macro(m, Some(args), disabled, depth));
                        i += consumed + 1;
                    }
                    None => {
                        out.push(token.clone());
                        i += 1;
                    }
                }
            } else {
                out.extend(self.expand_macro(m, None, disabled, depth));
                i += 1;
            }
        }
        out
    }

    // ------------------------------------------------------------------------
    // Directives
    // ------------------------------------------------------------------------

    fn directive(&mut self, tokens: &[Token<'a>]) {
        let Some(name) = tokens.get(1) else {
            return; // null directive
        };
        let (line, _) = self.position(name.begin());
        let active = self.is_active();

        match name.text {
            "include" | "include_next" | "import" if active => self.include(tokens, line),
            "define" if active => self.define(tokens, line),
            "undef" if active => {
                if let Some(id) = tokens.get(2) {
                    self.macros.remove(id.text);
                }
            }
            "ifdef" | "ifndef" => {
                let defined = tokens
                    .get(2)
                    .is_some_and(|id| self.macros.contains_key(id.text));
                let value = if name.text == "ifdef" { defined } else { !defined };
                self.push_conditional(active && value, active, line);
            }
            "if" => {
                let value = active && self.evaluate(&tokens[2..]) != 0;
                self.push_conditional(value, active, line);
            }
            "elif" => {
                let evaluate = self
                    .conditionals
                    .last()
                    .is_some_and(|c| c.parent_active && !c.taken);
                let value = evaluate && self.evaluate(&tokens[2..]) != 0;
                match self.conditionals.last_mut() {
                    Some(top) => {
                        top.active = value;
                        top.taken |= value;
                    }
                    None => self.unmatched(name, line),
                }
            }
            "else" => match self.conditionals.last_mut() {
                Some(top) => {
                    top.active = top.parent_active && !top.taken;
                    top.taken = true;
                }
                None => self.unmatched(name, line),
            },
            "endif" => {
                if self.conditionals.pop().is_none() {
                    self.unmatched(name, line);
                }
            }
            "error" if active => {
                let text = self.raw[name.end()..tokens.last().map_or(name.end(), |t| t.end())].trim();
                let (_, column) = self.position(tokens[0].begin());
                self.out.diagnostics.push(DiagnosticMessage::error(
                    self.file.clone(),
                    line,
                    column,
                    1,
                    format!("#error {text}"),
                ));
            }
            _ => {}
        }
    }

    fn unmatched(&mut self, name: &Token<'_>, line: u32) {
        let (_, column) = self.position(name.begin());
        self.out.diagnostics.push(DiagnosticMessage::error(
            self.file.clone(),
            line,
            column,
            name.text.len() as u32,
            format!("#{} without #if", name.text),
        ));
    }

    fn push_conditional(&mut self, value: bool, parent_active: bool, line: u32) {
        self.conditionals.push(Conditional {
            parent_active,
            taken: value,
            active: value,
            line,
        });
    }

    fn include(&mut self, tokens: &[Token<'a>], line: u32) {
        let Some(first) = tokens.get(2) else {
            return;
        };
        let (literal, kind, end) = match first.kind {
            TokenKind::StringLiteral if first.text.len() >= 2 => (
                first.text[1..first.text.len() - 1].to_string(),
                IncludeKind::Quoted,
                first.end(),
            ),
            TokenKind::Less => {
                let Some(close) = tokens.iter().skip(3).find(|t| t.is(TokenKind::Greater)) else {
                    return;
                };
                (
                    self.raw[first.end()..close.begin()].trim().to_string(),
                    IncludeKind::Angle,
                    close.end(),
                )
            }
            _ => return,
        };

        let resolved = self.env.resolve_include(&literal, kind, &self.file);
        match &resolved {
            Some(path) => {
                for m in self.env.exported_macros(path) {
                    self.macros.insert(m.name.clone(), m);
                }
            }
            None => {
                debug!(file = %self.file, include = %literal, "include not found");
                let (_, column) = self.position(first.begin());
                self.out.diagnostics.push(DiagnosticMessage::warning(
                    self.file.clone(),
                    line,
                    column,
                    (end - first.begin()) as u32,
                    format!("{literal}: No such file or directory"),
                ));
            }
        }

        self.out.includes.push(Include {
            literal,
            kind,
            resolved,
            line,
        });
    }

    fn define(&mut self, tokens: &[Token<'a>], line: u32) {
        let Some(name) = tokens.get(2) else {
            return;
        };
        if !name.text.starts_with(|c: char| c == '_' || c.is_ascii_alphabetic()) {
            return;
        }

        let mut body_start = name.end();
        let mut params = None;
        let mut variadic = false;

        let function_like = tokens
            .get(3)
            .is_some_and(|t| t.is(TokenKind::LParen) && t.begin() == name.end());
        if function_like {
            let mut names = Vec::new();
            let mut closed = false;
            let mut after_name = false;
            for token in &tokens[4..] {
                body_start = token.end();
                match token.kind {
                    TokenKind::RParen => {
                        closed = true;
                        break;
                    }
                    TokenKind::Comma => after_name = false,
                    TokenKind::Ellipsis => {
                        // `args...` names the variadic parameter
                        variadic = true;
                        if !after_name {
                            names.push(SmolStr::new("__VA_ARGS__"));
                        }
                    }
                    _ => {
                        names.push(SmolStr::new(token.text));
                        after_name = true;
                    }
                }
            }
            if !closed {
                self.out.diagnostics.push(DiagnosticMessage::error(
                    self.file.clone(),
                    line,
                    self.position(name.begin()).1,
                    name.text.len() as u32,
                    "missing ')' in macro parameter list",
                ));
                return;
            }
            params = Some(names);
        }

        let body_end = tokens.last().map_or(body_start, |t| t.end()).max(body_start);
        let body = self.raw[body_start..body_end].trim().replace("\\\n", " ");

        let m = Macro {
            name: SmolStr::new(name.text),
            file: self.file.clone(),
            line,
            offset: name.begin() as u32,
            params,
            variadic,
            body,
        };
        self.out.defined_macros.push(m.clone());
        self.macros.insert(m.name.clone(), m);
    }

    /// Evaluate a `#if` / `#elif` condition.
    fn evaluate(&self, tokens: &[Token<'_>]) -> i64 {
        let mut resolved = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            if token.text == "defined" {
                let (name, skip) = match tokens.get(i + 1) {
                    Some(t) if t.is(TokenKind::LParen) => (tokens.get(i + 2), 4),
                    other => (other, 2),
                };
                let value = name.is_some_and(|n| self.macros.contains_key(n.text));
                resolved.push(PpToken {
                    kind: TokenKind::IntLiteral,
                    text: SmolStr::new(if value { "1" } else { "0" }),
                });
                i += skip;
                continue;
            }
            resolved.push(PpToken::from(token));
            i += 1;
        }
        let expanded = self.expand_tokens(&resolved, &mut Vec::new(), 0);
        let mut eval = ConditionEvaluator {
            tokens: &expanded,
            pos: 0,
        };
        eval.conditional()
    }
}

/// Index of the `)` closing the `(` at the start of `kinds`.
fn matching_paren(kinds: impl Iterator<Item = TokenKind>) -> Option<usize> {
    let mut depth = 0usize;
    for (i, kind) in kinds.enumerate() {
        match kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ if depth == 0 => return None,
            _ => {}
        }
    }
    None
}

/// Collect `( a, b, ... )` following a function-like macro name.
///
/// Returns the arguments and the number of tokens consumed including both
/// parentheses, or `None` if the next token is not `(` or the list is unclosed.
fn collect_arguments(tokens: &[PpToken]) -> Option<(Vec<Vec<PpToken>>, usize)> {
    if tokens.first()?.kind != TokenKind::LParen {
        return None;
    }
    let mut depth = 0usize;
    let mut args: Vec<Vec<PpToken>> = vec![Vec::new()];
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LParen => {
                depth += 1;
                if depth == 1 {
                    continue;
                }
            }
            TokenKind::RParen => {
                depth -= 1;
                if depth == 0 {
                    if args.len() == 1 && args[0].is_empty() {
                        args.clear();
                    }
                    return Some((args, i + 1));
                }
            }
            TokenKind::Comma if depth == 1 => {
                args.push(Vec::new());
                continue;
            }
            _ => {}
        }
        if let Some(current) = args.last_mut() {
            current.push(token.clone());
        }
    }
    None
}

/// Substitute arguments into a function-like macro body, handling `#` and `##`.
fn substitute(
    body: &[PpToken],
    params: &[SmolStr],
    variadic: bool,
    args: &[Vec<PpToken>],
    mut expand_arg: impl FnMut(&[PpToken]) -> Vec<PpToken>,
) -> Vec<PpToken> {
    let arg_for = |name: &str| -> Option<Vec<PpToken>> {
        let idx = params.iter().position(|p| p == name)?;
        if variadic && idx == params.len() - 1 {
            let mut joined = Vec::new();
            for (n, arg) in args.iter().skip(idx).enumerate() {
                if n > 0 {
                    joined.push(PpToken {
                        kind: TokenKind::Comma,
                        text: SmolStr::new(","),
                    });
                }
                joined.extend(arg.iter().cloned());
            }
            return Some(joined);
        }
        Some(args.get(idx).cloned().unwrap_or_default())
    };
    let spell = |tokens: &[PpToken]| -> String {
        tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    };

    let mut out: Vec<PpToken> = Vec::new();
    let mut k = 0;
    while k < body.len() {
        let token = &body[k];
        if token.kind == TokenKind::Hash {
            if let Some(arg) = body.get(k + 1).and_then(|n| arg_for(&n.text)) {
                out.push(PpToken {
                    kind: TokenKind::StringLiteral,
                    text: SmolStr::new(format!("\"{}\"", spell(&arg).replace('"', "\\\""))),
                });
                k += 2;
                continue;
            }
        }
        if token.kind == TokenKind::HashHash {
            if let (Some(lhs), Some(next)) = (out.pop(), body.get(k + 1)) {
                let rhs = arg_for(&next.text)
                    .map(|arg| spell(&arg).replace(' ', ""))
                    .unwrap_or_else(|| next.text.to_string());
                let text = format!("{}{}", lhs.text, rhs);
                let kind = tokenize(&text)
                    .first()
                    .map_or(TokenKind::Identifier, |t| t.kind);
                out.push(PpToken {
                    kind,
                    text: SmolStr::new(text),
                });
                k += 2;
                continue;
            }
        }
        match arg_for(&token.text) {
            Some(arg) if token.kind == TokenKind::Identifier => {
                let pasted = body
                    .get(k + 1)
                    .is_some_and(|n| n.kind == TokenKind::HashHash);
                if pasted {
                    out.extend(arg);
                } else {
                    out.extend(expand_arg(&arg));
                }
            }
            _ => out.push(token.clone()),
        }
        k += 1;
    }
    out
}

/// Integer evaluator for conditional directives.
struct ConditionEvaluator<'t> {
    tokens: &'t [PpToken],
    pos: usize,
}

impl ConditionEvaluator<'_> {
    fn peek(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind)
    }

    fn conditional(&mut self) -> i64 {
        let cond = self.binary(1);
        if self.peek() == Some(TokenKind::Question) {
            self.pos += 1;
            let then = self.conditional();
            if self.peek() == Some(TokenKind::Colon) {
                self.pos += 1;
            }
            let otherwise = self.conditional();
            return if cond != 0 { then } else { otherwise };
        }
        cond
    }

    fn binary(&mut self, min_prec: u8) -> i64 {
        let mut lhs = self.unary();
        while let Some(kind) = self.peek() {
            let Some(prec) = kind.binary_precedence() else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let rhs = self.binary(prec + 1);
            lhs = apply_binary(kind, lhs, rhs);
        }
        lhs
    }

    fn unary(&mut self) -> i64 {
        match self.peek() {
            Some(TokenKind::Bang) => {
                self.pos += 1;
                (self.unary() == 0) as i64
            }
            Some(TokenKind::Minus) => {
                self.pos += 1;
                self.unary().wrapping_neg()
            }
            Some(TokenKind::Plus) => {
                self.pos += 1;
                self.unary()
            }
            Some(TokenKind::Tilde) => {
                self.pos += 1;
                !self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> i64 {
        let Some(token) = self.tokens.get(self.pos) else {
            return 0;
        };
        self.pos += 1;
        match token.kind {
            TokenKind::IntLiteral => parse_integer(&token.text),
            TokenKind::Kw_true => 1,
            TokenKind::LParen => {
                let value = self.conditional();
                if self.peek() == Some(TokenKind::RParen) {
                    self.pos += 1;
                }
                value
            }
            _ => 0,
        }
    }
}

fn apply_binary(op: TokenKind, lhs: i64, rhs: i64) -> i64 {
    use TokenKind::*;
    match op {
        PipePipe => (lhs != 0 || rhs != 0) as i64,
        AmpAmp => (lhs != 0 && rhs != 0) as i64,
        Pipe => lhs | rhs,
        Caret => lhs ^ rhs,
        Amp => lhs & rhs,
        EqEq => (lhs == rhs) as i64,
        BangEq => (lhs != rhs) as i64,
        Less => (lhs < rhs) as i64,
        LessEq => (lhs <= rhs) as i64,
        Greater => (lhs > rhs) as i64,
        GreaterEq => (lhs >= rhs) as i64,
        LessLess => lhs.wrapping_shl(rhs as u32),
        GreaterGreater => lhs.wrapping_shr(rhs as u32),
        Plus => lhs.wrapping_add(rhs),
        Minus => lhs.wrapping_sub(rhs),
        Star => lhs.wrapping_mul(rhs),
        Slash => lhs.checked_div(rhs).unwrap_or(0),
        Percent => lhs.checked_rem(rhs).unwrap_or(0),
        _ => 0,
    }
}

fn parse_integer(text: &str) -> i64 {
    let digits = text.trim_end_matches(['u', 'U', 'l', 'L']).replace('\'', "");
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).unwrap_or(0)
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).unwrap_or(0)
    } else {
        digits.parse().unwrap_or(0)
    }
}

fn apply_edits(raw: &str, edits: &[(TextRange, String)]) -> String {
    let mut sorted: Vec<&(TextRange, String)> = edits.iter().collect();
    sorted.sort_by_key(|(range, _)| range.start());

    let mut out = String::with_capacity(raw.len());
    let mut cursor = 0usize;
    for (range, replacement) in sorted {
        let start: usize = range.start().into();
        let end: usize = range.end().into();
        if start < cursor {
            continue;
        }
        out.push_str(&raw[cursor..start]);
        out.push_str(replacement);
        cursor = end;
    }
    out.push_str(&raw[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pp(raw: &str) -> PreprocessedSource {
        preprocess(&mut NoIncludes, raw, &FilePath::new("/t.cpp"), &[])
    }

    #[test]
    fn test_line_count_is_preserved() {
        let raw = "#define A 1\nint x = A;\n#if 0\nint y;\n#endif\nint z;\n";
        let out = pp(raw);
        assert!(!out.code.contains("int y"));
        assert!(out.code.contains("int z;"));
        assert_eq!(out.defined_macros.len(), 1);
        assert_eq!(out.macro_uses.len(), 1);
        assert_eq!(out.macro_uses[0].line, 2);
        assert_eq!(out.macro_uses[0].column, 9);
    }

    #[test]
    fn test_expansion_is_wrapped_in_markers() {
        let out = pp("#define TWO 2\nint x = TWO;");
        assert!(out.code.contains("# expansion begin 22,3 2:9\n2\n# expansion end\n# 2\n"));
    }

    #[test]
    fn test_function_like_macro() {
        let out = pp("#define ADD(a, b) ((a) + (b))\nint x = ADD(1, 2);");
        assert!(out.code.contains("( ( 1 ) + ( 2 ) )"));
        assert_eq!(out.macro_uses[0].length, "ADD(1, 2)".len() as u32);
    }

    #[test]
    fn test_recursive_macro_does_not_loop() {
        let out = pp("#define X X + 1\nint a = X;");
        assert!(out.code.contains("X + 1"));
    }

    #[test]
    fn test_conditionals() {
        let raw = "#define V 3\n#if V > 2 && defined(V)\nint a;\n#elif 1\nint b;\n#else\nint c;\n#endif\n#ifndef V\nint d;\n#endif";
        let out = pp(raw);
        assert!(out.code.contains("int a;"));
        assert!(!out.code.contains("int b;"));
        assert!(!out.code.contains("int c;"));
        assert!(!out.code.contains("int d;"));
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_unterminated_conditional_is_diagnosed() {
        let out = pp("#ifdef X\nint a;");
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].line, 1);
    }

    #[test]
    fn test_unresolved_include_is_recorded() {
        let out = pp("#include \"missing.h\"\n#include <vector>\n");
        assert_eq!(out.includes.len(), 2);
        assert!(out.includes.iter().all(|i| !i.is_resolved()));
        assert_eq!(out.includes[1].literal, "vector");
        assert_eq!(out.includes[1].kind, IncludeKind::Angle);
        assert_eq!(out.diagnostics.len(), 2);
    }

    #[test]
    fn test_stringize_and_paste() {
        let out = pp("#define S(x) #x\n#define CAT(a, b) a ## b\nconst char *s = S(hi); int CAT(fo, o);");
        assert!(out.code.contains("\"hi\""));
        assert!(out.code.contains("\nfoo\n"));
    }
}
