//! Resilient recursive-descent parser for C++.
//!
//! The parser never fails: syntax errors become diagnostics, the offending
//! tokens are skipped up to the next `;` or `}`, and an (incomplete) AST is
//! always returned. Declaration/expression ambiguities in function bodies are
//! settled with a tentative parse: a statement is a declaration when it starts
//! with a type followed by a named declarator.

use smol_str::SmolStr;

use super::ast::*;
use super::diagnostics::DiagnosticMessage;
use super::token_kind::TokenKind;
use super::translation_unit::{TuToken, read_tokens};
use crate::base::{FilePath, Position, Span};

/// Parse a whole translation unit.
pub fn parse_translation_unit(
    tokens: &[TuToken],
    file: &FilePath,
) -> (TranslationUnit, Vec<DiagnosticMessage>) {
    let mut parser = Parser::new(tokens);
    let unit = parser.translation_unit();
    let diagnostics = parser
        .errors
        .into_iter()
        .map(|(span, text)| {
            let length = if span.start.line == span.end.line {
                span.end.column.saturating_sub(span.start.column).max(1)
            } else {
                1
            };
            DiagnosticMessage::error(file.clone(), span.start.line, span.start.column, length, text)
        })
        .collect();
    (unit, diagnostics)
}

/// Parse a standalone expression whose first character sits at `origin`.
///
/// Returns `None` when the text is not a complete expression.
pub fn parse_expression(text: &str, origin: Position) -> Option<Expression> {
    let mut tokens = read_tokens(text);
    for token in &mut tokens {
        shift(&mut token.start, origin);
        shift(&mut token.end, origin);
    }
    let mut parser = Parser::new(&tokens);
    let expression = parser.expression();
    let complete = parser.errors.is_empty() && parser.at(TokenKind::Eof);
    (complete && !matches!(expression, Expression::Error(_))).then_some(expression)
}

fn shift(position: &mut Position, origin: Position) {
    if position.line == 1 {
        position.column += origin.column.saturating_sub(1);
    }
    position.line += origin.line.saturating_sub(1);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclContext {
    Namespace,
    Class,
    Block,
    Parameter,
    TypeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TemplateMode {
    /// Always try `<...>` after a name.
    Type,
    /// Only accept `<...>` when followed by a token that cannot continue a comparison.
    Expression,
}

#[derive(Clone, Copy)]
struct Checkpoint {
    pos: usize,
    errors: usize,
    split_greater: bool,
}

/// Deepest nesting of declarations, statements and expressions the parser
/// descends into. A parenthesised sub-expression costs two levels.
const MAX_NESTING: usize = 200;

/// Identifiers that act as declaration specifiers.
const SPECIFIER_IDENTIFIERS: &[&str] = &[
    "constexpr",
    "consteval",
    "register",
    "thread_local",
    "Q_INVOKABLE",
];

struct Parser<'t> {
    tokens: &'t [TuToken],
    pos: usize,
    errors: Vec<(Span, String)>,
    /// The first half of a `>>` closed a template argument list.
    split_greater: bool,
    depth: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [TuToken]) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
            split_greater: false,
            depth: 0,
        }
    }

    // ------------------------------------------------------------------------
    // Token cursor
    // ------------------------------------------------------------------------

    fn nth_token(&self, n: usize) -> Option<&'t TuToken> {
        self.tokens
            .get(self.pos + n)
            .or_else(|| self.tokens.last())
    }

    fn nth(&self, n: usize) -> TokenKind {
        self.nth_token(n).map_or(TokenKind::Eof, |t| t.kind)
    }

    fn peek(&self) -> TokenKind {
        self.nth(0)
    }

    fn peek_text(&self) -> &'t str {
        self.nth_token(0).map_or("", |t| t.text.as_str())
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    fn bump(&mut self) -> Option<&'t TuToken> {
        let token = self.tokens.get(self.pos);
        if self.pos < self.tokens.len() && !self.at(TokenKind::Eof) {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> bool {
        if self.eat(kind) {
            return true;
        }
        self.error(format!("expected {what}"));
        false
    }

    fn current_span(&self) -> Span {
        self.nth_token(0)
            .map_or(Span::from_coords(1, 1, 1, 1), |t| t.span())
    }

    fn error(&mut self, message: impl Into<String>) {
        let span = self.current_span();
        // one error per position is enough
        if self.errors.last().is_some_and(|(s, _)| *s == span) {
            return;
        }
        self.errors.push((span, message.into()));
    }

    fn span_from(&self, start: usize) -> Span {
        let first = self.tokens.get(start).or_else(|| self.tokens.last());
        let last = if self.pos > start {
            self.tokens.get(self.pos - 1)
        } else {
            first
        };
        match (first, last) {
            (Some(first), Some(last)) => Span::new(first.start, last.end.max(first.start)),
            _ => Span::from_coords(1, 1, 1, 1),
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            errors: self.errors.len(),
            split_greater: self.split_greater,
        }
    }

    fn rewind(&mut self, cp: Checkpoint) {
        self.pos = cp.pos;
        self.errors.truncate(cp.errors);
        self.split_greater = cp.split_greater;
    }

    fn at_template_close(&self) -> bool {
        matches!(self.peek(), TokenKind::Greater | TokenKind::GreaterGreater)
    }

    fn eat_template_close(&mut self) -> bool {
        match self.peek() {
            TokenKind::Greater => {
                self.bump();
                true
            }
            TokenKind::GreaterGreater => {
                if self.split_greater {
                    self.split_greater = false;
                    self.bump();
                } else {
                    self.split_greater = true;
                }
                true
            }
            _ => false,
        }
    }

    /// Skip a balanced `open ... close` group starting at the current token.
    fn skip_balanced(&mut self, open: TokenKind, close: TokenKind) {
        let mut depth = 0usize;
        loop {
            let kind = self.peek();
            if kind == TokenKind::Eof {
                return;
            }
            self.bump();
            if kind == open {
                depth += 1;
            } else if kind == close {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return;
                }
            }
        }
    }

    /// Error recovery: skip to just after the next `;`, or up to a `}`.
    fn skip_to_sync(&mut self) {
        loop {
            match self.peek() {
                TokenKind::Eof | TokenKind::RBrace => return,
                TokenKind::Semicolon => {
                    self.bump();
                    return;
                }
                TokenKind::LBrace => {
                    self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace);
                    self.eat(TokenKind::Semicolon);
                    return;
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    /// Run `parse` one nesting level deeper. Past `MAX_NESTING` the construct
    /// is reported and `too_deep` skips it and builds the error node.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> T,
        too_deep: impl FnOnce(&mut Self, usize) -> T,
    ) -> T {
        if self.depth >= MAX_NESTING {
            let start = self.pos;
            self.error("nesting too deep");
            return too_deep(self, start);
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Skip the rest of an expression, stopping before `;` or `}`.
    fn skip_expression(&mut self, start: usize) -> Expression {
        while !matches!(
            self.peek(),
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
        ) {
            self.bump();
        }
        Expression::Error(self.span_from(start))
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn translation_unit(&mut self) -> TranslationUnit {
        let mut declarations = Vec::new();
        while !self.at(TokenKind::Eof) {
            if self.at(TokenKind::RBrace) {
                self.error("unexpected '}'");
                self.bump();
                continue;
            }
            let start = self.pos;
            declarations.push(self.declaration(DeclContext::Namespace));
            if self.pos == start {
                self.bump();
            }
        }
        TranslationUnit { declarations }
    }

    fn member_list(&mut self, context: DeclContext) -> Vec<Declaration> {
        let mut members = Vec::new();
        while !matches!(self.peek(), TokenKind::RBrace | TokenKind::Eof) {
            let start = self.pos;
            members.push(self.declaration(context));
            if self.pos == start {
                self.error("unexpected token");
                self.bump();
            }
        }
        members
    }

    fn declaration(&mut self, context: DeclContext) -> Declaration {
        self.nested(
            |p| p.declaration_body(context),
            |p, start| {
                p.skip_to_sync();
                Declaration::Error(p.span_from(start))
            },
        )
    }

    fn declaration_body(&mut self, context: DeclContext) -> Declaration {
        let start = self.pos;
        match self.peek() {
            TokenKind::Semicolon => {
                self.bump();
                return Declaration::Empty(self.span_from(start));
            }
            TokenKind::Kw_inline if self.nth(1) == TokenKind::Kw_namespace => {
                self.bump();
                return self.namespace_definition();
            }
            TokenKind::Kw_namespace => return self.namespace_definition(),
            TokenKind::Kw_template => return self.template_declaration(context),
            TokenKind::Kw_using => return self.using_declaration(),
            TokenKind::Kw_extern if self.nth(1) == TokenKind::StringLiteral => {
                self.bump();
                self.bump();
                if self.eat(TokenKind::LBrace) {
                    let members = self.member_list(DeclContext::Namespace);
                    self.expect(TokenKind::RBrace, "'}'");
                    return Declaration::Linkage {
                        members,
                        span: self.span_from(start),
                    };
                }
                return self.declaration(context);
            }
            TokenKind::Kw_public
            | TokenKind::Kw_protected
            | TokenKind::Kw_private
            | TokenKind::Kw_signals
            | TokenKind::Kw_slots
                if context == DeclContext::Class =>
            {
                return self.access_specifier();
            }
            TokenKind::Identifier if context == DeclContext::Class && self.skip_unexpanded_macro() => {
                return Declaration::Empty(self.span_from(start));
            }
            _ => {}
        }
        self.simple_or_function_declaration(context)
    }

    /// `Q_OBJECT`-style macros the preprocessor could not expand.
    fn skip_unexpanded_macro(&mut self) -> bool {
        let text = self.peek_text();
        let macro_like = text.len() > 1
            && text.starts_with(|c: char| c.is_ascii_uppercase())
            && text
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
        if !macro_like {
            return false;
        }
        let next = self.nth(1);
        let ends_member = matches!(
            next,
            TokenKind::Kw_public
                | TokenKind::Kw_protected
                | TokenKind::Kw_private
                | TokenKind::Kw_signals
                | TokenKind::Kw_slots
                | TokenKind::RBrace
                | TokenKind::Kw_virtual
                | TokenKind::Kw_static
                | TokenKind::Kw_explicit
                | TokenKind::Kw_inline
                | TokenKind::Kw_friend
                | TokenKind::Kw_enum
                | TokenKind::Kw_typedef
                | TokenKind::Kw_using
                | TokenKind::Kw_class
                | TokenKind::Kw_struct
                | TokenKind::Kw_template
                | TokenKind::Tilde
        ) || next.is_builtin_type();
        if ends_member {
            self.bump();
            return true;
        }
        if next == TokenKind::LParen {
            let cp = self.checkpoint();
            self.bump();
            self.skip_balanced(TokenKind::LParen, TokenKind::RParen);
            let statement_like = matches!(
                self.peek(),
                TokenKind::Semicolon
                    | TokenKind::LBrace
                    | TokenKind::Colon
                    | TokenKind::Kw_const
                    | TokenKind::Eq
            );
            if !statement_like {
                return true;
            }
            self.rewind(cp);
        }
        false
    }

    fn access_specifier(&mut self) -> Declaration {
        let start = self.pos;
        let mut access = Access::Public;
        let mut signals = false;
        let mut slots = false;
        match self.peek() {
            TokenKind::Kw_protected => access = Access::Protected,
            TokenKind::Kw_private => access = Access::Private,
            TokenKind::Kw_signals => {
                access = Access::Protected;
                signals = true;
            }
            TokenKind::Kw_slots => slots = true,
            _ => {}
        }
        self.bump();
        if self.eat(TokenKind::Kw_slots) {
            slots = true;
        }
        self.expect(TokenKind::Colon, "':'");
        Declaration::Access {
            access,
            signals,
            slots,
            span: self.span_from(start),
        }
    }

    fn namespace_definition(&mut self) -> Declaration {
        let start = self.pos;
        self.bump(); // namespace
        let name = if self.at(TokenKind::Identifier) {
            self.name_segment_here()
        } else {
            None
        };

        // namespace alias: `namespace fs = std::filesystem;`
        if self.at(TokenKind::Eq) {
            self.skip_to_sync();
            return Declaration::Empty(self.span_from(start));
        }

        let body_start = self.pos;
        if !self.expect(TokenKind::LBrace, "'{'") {
            self.skip_to_sync();
            return Declaration::Error(self.span_from(start));
        }
        let members = self.member_list(DeclContext::Namespace);
        self.expect(TokenKind::RBrace, "'}'");
        Declaration::Namespace(NamespaceDefinition {
            name,
            members,
            body: self.span_from(body_start),
            span: self.span_from(start),
        })
    }

    fn template_declaration(&mut self, context: DeclContext) -> Declaration {
        let start = self.pos;
        self.bump(); // template
        let mut params = Vec::new();
        if self.eat(TokenKind::Less) && !self.eat_template_close() {
            loop {
                match self.template_parameter() {
                    Some(param) => params.push(param),
                    None => {
                        self.error("expected template parameter");
                        self.skip_to_sync();
                        return Declaration::Error(self.span_from(start));
                    }
                }
                if self.eat(TokenKind::Comma) {
                    continue;
                }
                if !self.eat_template_close() {
                    self.error("expected '>'");
                }
                break;
            }
        }
        let declaration = Box::new(self.declaration(context));
        Declaration::Template(TemplateDeclaration {
            params,
            declaration,
            span: self.span_from(start),
        })
    }

    fn template_parameter(&mut self) -> Option<TemplateParameter> {
        let start = self.pos;
        let kind = match self.peek() {
            TokenKind::Kw_class | TokenKind::Kw_typename => {
                self.bump();
                TemplateParameterKind::Type
            }
            TokenKind::Kw_template => {
                self.bump();
                if self.at(TokenKind::Less) {
                    self.bump();
                    while !self.at_template_close() && !self.at(TokenKind::Eof) {
                        self.bump();
                    }
                    self.eat_template_close();
                }
                if !matches!(self.peek(), TokenKind::Kw_class | TokenKind::Kw_typename) {
                    return None;
                }
                self.bump();
                TemplateParameterKind::Template
            }
            _ => {
                let specifiers = self.decl_specifiers(DeclContext::Parameter);
                specifiers.type_spec.as_ref()?;
                // pointer/reference value parameters
                while matches!(self.peek(), TokenKind::Star | TokenKind::Amp) {
                    self.bump();
                }
                TemplateParameterKind::Value(specifiers)
            }
        };
        self.eat(TokenKind::Ellipsis);
        let name = if self.at(TokenKind::Identifier) {
            self.name_segment_here()
        } else {
            None
        };
        if self.eat(TokenKind::Eq) {
            match kind {
                TemplateParameterKind::Value(_) => {
                    self.binary(8);
                }
                _ => {
                    self.type_id();
                }
            }
        }
        Some(TemplateParameter {
            kind,
            name,
            span: self.span_from(start),
        })
    }

    fn using_declaration(&mut self) -> Declaration {
        let start = self.pos;
        self.bump(); // using
        if self.eat(TokenKind::Kw_namespace) {
            let Some(name) = self.qualified_name(TemplateMode::Type) else {
                self.error("expected namespace name");
                self.skip_to_sync();
                return Declaration::Error(self.span_from(start));
            };
            self.expect(TokenKind::Semicolon, "';'");
            return Declaration::UsingDirective {
                name,
                span: self.span_from(start),
            };
        }

        if self.at(TokenKind::Identifier) && self.nth(1) == TokenKind::Eq {
            let Some(name) = self.name_segment_here() else {
                return Declaration::Error(self.span_from(start));
            };
            self.bump(); // =
            let Some(type_id) = self.type_id() else {
                self.error("expected type");
                self.skip_to_sync();
                return Declaration::Error(self.span_from(start));
            };
            self.expect(TokenKind::Semicolon, "';'");
            return Declaration::Alias {
                name,
                type_id,
                span: self.span_from(start),
            };
        }

        self.eat(TokenKind::Kw_typename);
        let Some(name) = self.qualified_name(TemplateMode::Type) else {
            self.error("expected name");
            self.skip_to_sync();
            return Declaration::Error(self.span_from(start));
        };
        self.expect(TokenKind::Semicolon, "';'");
        Declaration::Using {
            name,
            span: self.span_from(start),
        }
    }

    fn simple_or_function_declaration(&mut self, context: DeclContext) -> Declaration {
        let start = self.pos;
        let specifiers = self.decl_specifiers(context);
        self.declaration_rest(start, specifiers, context)
    }

    fn declaration_rest(
        &mut self,
        start: usize,
        specifiers: DeclSpecifiers,
        context: DeclContext,
    ) -> Declaration {
        if self.eat(TokenKind::Semicolon) {
            if specifiers.type_spec.is_none() {
                self.errors.push((self.span_from(start), "expected declaration".into()));
            }
            return Declaration::Simple(SimpleDeclaration {
                specifiers,
                declarators: Vec::new(),
                span: self.span_from(start),
            });
        }

        let mut declarators = Vec::new();
        loop {
            let declarator = self.declarator(context);
            if declarator.name.is_none() {
                self.error("expected declarator");
                self.skip_to_sync();
                return Declaration::Error(self.span_from(start));
            }

            let is_definition = declarators.is_empty()
                && declarator.is_function()
                && context != DeclContext::Block
                && (self.at(TokenKind::LBrace)
                    || self.at(TokenKind::Colon)
                    || (self.at(TokenKind::Identifier) && self.peek_text() == "try"));
            if is_definition {
                return self.function_definition(start, specifiers, declarator);
            }

            let mut bit_width = None;
            if context == DeclContext::Class && self.at(TokenKind::Colon) {
                self.bump();
                bit_width = Some(self.conditional());
            }
            let initializer = self.initializer(&declarator);
            declarators.push(InitDeclarator {
                declarator,
                initializer,
                bit_width,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        if !self.eat(TokenKind::Semicolon) {
            self.error("expected ';'");
            if !self.at(TokenKind::RBrace) {
                self.skip_to_sync();
            }
        }
        Declaration::Simple(SimpleDeclaration {
            specifiers,
            declarators,
            span: self.span_from(start),
        })
    }

    fn initializer(&mut self, declarator: &Declarator) -> Option<Initializer> {
        match self.peek() {
            TokenKind::Eq => {
                self.bump();
                if self.at(TokenKind::LBrace) {
                    Some(Initializer::Braced(self.braced_list()))
                } else {
                    Some(Initializer::Assign(self.assignment()))
                }
            }
            TokenKind::LBrace => Some(Initializer::Braced(self.braced_list())),
            TokenKind::LParen if !declarator.is_function() => {
                self.bump();
                let args = self.argument_list();
                Some(Initializer::Call(args))
            }
            _ => None,
        }
    }

    fn function_definition(
        &mut self,
        start: usize,
        specifiers: DeclSpecifiers,
        declarator: Declarator,
    ) -> Declaration {
        let is_try = self.at(TokenKind::Identifier) && self.peek_text() == "try";
        if is_try {
            self.bump();
        }
        let mut ctor_initializers = Vec::new();
        if self.eat(TokenKind::Colon) {
            loop {
                let Some(name) = self.qualified_name(TemplateMode::Type) else {
                    self.error("expected member initializer");
                    break;
                };
                let args = if self.eat(TokenKind::LParen) {
                    self.argument_list()
                } else if self.at(TokenKind::LBrace) {
                    self.braced_list()
                } else {
                    self.error("expected '('");
                    Vec::new()
                };
                ctor_initializers.push(MemInitializer { name, args });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        let body = if self.at(TokenKind::LBrace) {
            self.compound_statement()
        } else {
            self.error("expected function body");
            self.skip_to_sync();
            CompoundStatement {
                statements: Vec::new(),
                span: self.span_from(start),
            }
        };
        if is_try {
            self.catch_clauses();
        }
        Declaration::Function(Box::new(FunctionDefinition {
            specifiers,
            declarator,
            ctor_initializers,
            body,
            span: self.span_from(start),
        }))
    }

    // ------------------------------------------------------------------------
    // Specifiers
    // ------------------------------------------------------------------------

    fn decl_specifiers(&mut self, context: DeclContext) -> DeclSpecifiers {
        let start = self.pos;
        let mut specs = DeclSpecifiers::default();
        let mut builtin: Option<(usize, String)> = None;

        loop {
            match self.peek() {
                TokenKind::Kw_static => specs.flags.is_static = true,
                TokenKind::Kw_virtual => specs.flags.is_virtual = true,
                TokenKind::Kw_typedef => specs.flags.is_typedef = true,
                TokenKind::Kw_friend => specs.flags.is_friend = true,
                TokenKind::Kw_inline => specs.flags.is_inline = true,
                TokenKind::Kw_explicit => specs.flags.is_explicit = true,
                TokenKind::Kw_extern => specs.flags.is_extern = true,
                TokenKind::Kw_mutable => specs.flags.is_mutable = true,
                TokenKind::Kw_const => specs.is_const = true,
                TokenKind::Kw_volatile => specs.is_volatile = true,
                TokenKind::Identifier if SPECIFIER_IDENTIFIERS.contains(&self.peek_text()) => {}
                TokenKind::LBracket if self.nth(1) == TokenKind::LBracket => {
                    // [[attribute]]
                    self.skip_balanced(TokenKind::LBracket, TokenKind::RBracket);
                    continue;
                }
                kind if kind.is_builtin_type() && (specs.type_spec.is_none() || builtin.is_some()) => {
                    let text = self.peek_text();
                    let first = match &mut builtin {
                        Some((first, spelled)) => {
                            spelled.push(' ');
                            spelled.push_str(text);
                            *first
                        }
                        None => {
                            builtin = Some((self.pos, text.to_string()));
                            self.pos
                        }
                    };
                    self.bump();
                    let spelled = builtin.as_ref().map_or("", |(_, s)| s.as_str());
                    specs.type_spec = Some(TypeSpecifier::Builtin {
                        text: SmolStr::new(spelled),
                        span: self.span_from(first),
                    });
                    continue;
                }
                TokenKind::Kw_class | TokenKind::Kw_struct | TokenKind::Kw_union
                    if specs.type_spec.is_none() =>
                {
                    specs.type_spec = self.class_specifier(context);
                    continue;
                }
                TokenKind::Kw_enum if specs.type_spec.is_none() => {
                    specs.type_spec = self.enum_specifier();
                    continue;
                }
                TokenKind::Kw_typename if specs.type_spec.is_none() => {
                    self.bump();
                    if let Some(name) = self.qualified_name(TemplateMode::Type) {
                        specs.type_spec = Some(TypeSpecifier::Named(name));
                    }
                    continue;
                }
                TokenKind::Identifier | TokenKind::ColonColon if specs.type_spec.is_none() => {
                    let cp = self.checkpoint();
                    let Some(name) = self.qualified_name(TemplateMode::Type) else {
                        break;
                    };
                    let is_declarator = matches!(
                        name.last().kind,
                        NameKind::Destructor | NameKind::Operator | NameKind::Conversion
                    ) || (self.at(TokenKind::LParen)
                        && !matches!(context, DeclContext::Parameter | DeclContext::TypeId)
                        && !matches!(self.nth(1), TokenKind::Star | TokenKind::Amp));
                    if is_declarator {
                        self.rewind(cp);
                        break;
                    }
                    specs.type_spec = Some(TypeSpecifier::Named(name));
                    continue;
                }
                _ => break,
            }
            self.bump();
        }

        if self.pos > start {
            specs.span = Some(self.span_from(start));
        }
        specs
    }

    fn class_specifier(&mut self, context: DeclContext) -> Option<TypeSpecifier> {
        let start = self.pos;
        let key = match self.peek() {
            TokenKind::Kw_struct => ClassKey::Struct,
            TokenKind::Kw_union => ClassKey::Union,
            _ => ClassKey::Class,
        };
        self.bump();

        // export macros: `class Q_CORE_EXPORT QObject`
        while self.at(TokenKind::Identifier) && self.nth(1) == TokenKind::Identifier {
            self.bump();
        }
        let name = if matches!(self.peek(), TokenKind::Identifier | TokenKind::ColonColon) {
            self.qualified_name(TemplateMode::Type)
        } else {
            None
        };
        if self.at(TokenKind::Identifier) && self.peek_text() == "final" {
            self.bump();
        }

        let mut bases = Vec::new();
        if self.at(TokenKind::Colon) && context != DeclContext::Parameter {
            self.bump();
            loop {
                let mut access = None;
                let mut is_virtual = false;
                loop {
                    match self.peek() {
                        TokenKind::Kw_public => access = Some(Access::Public),
                        TokenKind::Kw_protected => access = Some(Access::Protected),
                        TokenKind::Kw_private => access = Some(Access::Private),
                        TokenKind::Kw_virtual => is_virtual = true,
                        _ => break,
                    }
                    self.bump();
                }
                match self.qualified_name(TemplateMode::Type) {
                    Some(name) => bases.push(BaseSpecifier {
                        name,
                        access,
                        is_virtual,
                    }),
                    None => {
                        self.error("expected base class name");
                        break;
                    }
                }
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        if self.at(TokenKind::LBrace) {
            let body_start = self.pos;
            self.bump();
            let members = self.member_list(DeclContext::Class);
            self.expect(TokenKind::RBrace, "'}'");
            return Some(TypeSpecifier::Class(Box::new(ClassSpecifier {
                key,
                name,
                bases,
                members,
                body: self.span_from(body_start),
                span: self.span_from(start),
            })));
        }

        match name {
            Some(name) => Some(TypeSpecifier::Elaborated {
                key: Some(key),
                name,
                span: self.span_from(start),
            }),
            None => {
                self.error("expected class name");
                None
            }
        }
    }

    fn enum_specifier(&mut self) -> Option<TypeSpecifier> {
        let start = self.pos;
        self.bump(); // enum
        let scoped = self.eat(TokenKind::Kw_class) || self.eat(TokenKind::Kw_struct);
        let name = if self.at(TokenKind::Identifier) {
            self.qualified_name(TemplateMode::Type)
        } else {
            None
        };
        if self.at(TokenKind::Colon) {
            self.bump();
            self.decl_specifiers(DeclContext::TypeId);
        }

        if !self.at(TokenKind::LBrace) {
            return match name {
                Some(name) => Some(TypeSpecifier::Elaborated {
                    key: None,
                    name,
                    span: self.span_from(start),
                }),
                None => {
                    self.error("expected enum name");
                    None
                }
            };
        }

        let body_start = self.pos;
        self.bump();
        let mut enumerators = Vec::new();
        while self.at(TokenKind::Identifier) {
            let Some(name) = self.name_segment_here() else {
                break;
            };
            let value = self.eat(TokenKind::Eq).then(|| self.conditional());
            enumerators.push(Enumerator { name, value });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        if !self.eat(TokenKind::RBrace) {
            self.error("expected '}'");
            while !matches!(self.peek(), TokenKind::RBrace | TokenKind::Eof | TokenKind::Semicolon) {
                self.bump();
            }
            self.eat(TokenKind::RBrace);
        }
        Some(TypeSpecifier::Enum(Box::new(EnumSpecifier {
            name: name.map(|n| n.last().clone()),
            scoped,
            enumerators,
            body: self.span_from(body_start),
            span: self.span_from(start),
        })))
    }

    // ------------------------------------------------------------------------
    // Declarators
    // ------------------------------------------------------------------------

    fn declarator(&mut self, context: DeclContext) -> Declarator {
        self.nested(
            |p| p.declarator_body(context),
            |p, start| Declarator {
                ptr_ops: Vec::new(),
                name: None,
                function: None,
                is_function_pointer: false,
                array_dims: 0,
                span: p.span_from(start),
            },
        )
    }

    fn declarator_body(&mut self, context: DeclContext) -> Declarator {
        let start = self.pos;
        let mut ptr_ops = self.ptr_operators();
        let mut name = None;
        let mut is_function_pointer = false;

        if self.at(TokenKind::LParen)
            && matches!(self.nth(1), TokenKind::Star | TokenKind::Amp | TokenKind::AmpAmp)
        {
            self.bump();
            let inner = self.declarator(context);
            self.expect(TokenKind::RParen, "')'");
            ptr_ops.extend(inner.ptr_ops);
            name = inner.name;
            is_function_pointer = true;
        } else if matches!(
            self.peek(),
            TokenKind::Identifier | TokenKind::ColonColon | TokenKind::Tilde | TokenKind::Kw_operator
        ) {
            name = self.qualified_name(TemplateMode::Type);
        }

        let mut function = None;
        let mut array_dims = 0;
        loop {
            match self.peek() {
                TokenKind::LBracket => {
                    self.skip_balanced(TokenKind::LBracket, TokenKind::RBracket);
                    array_dims += 1;
                }
                TokenKind::LParen if function.is_none() => {
                    let cp = self.checkpoint();
                    match self.function_declarator() {
                        Some(fd) if !(context == DeclContext::Block && looks_like_call(&fd)) => {
                            function = Some(fd);
                        }
                        _ => {
                            self.rewind(cp);
                            break;
                        }
                    }
                }
                _ => break,
            }
        }

        Declarator {
            ptr_ops,
            name,
            function,
            is_function_pointer,
            array_dims,
            span: self.span_from(start),
        }
    }

    fn ptr_operators(&mut self) -> Vec<PtrOperator> {
        let mut ops = Vec::new();
        loop {
            match self.peek() {
                TokenKind::Star => {
                    self.bump();
                    let mut is_const = false;
                    while matches!(self.peek(), TokenKind::Kw_const | TokenKind::Kw_volatile) {
                        is_const |= self.at(TokenKind::Kw_const);
                        self.bump();
                    }
                    ops.push(PtrOperator::Pointer { is_const });
                }
                TokenKind::Amp => {
                    self.bump();
                    ops.push(PtrOperator::Reference);
                }
                TokenKind::AmpAmp => {
                    self.bump();
                    ops.push(PtrOperator::RValueReference);
                }
                _ => return ops,
            }
        }
    }

    fn function_declarator(&mut self) -> Option<FunctionDeclarator> {
        let start = self.pos;
        self.bump(); // (
        let mut params = Vec::new();
        let mut variadic = false;

        if self.at(TokenKind::Kw_void) && self.nth(1) == TokenKind::RParen {
            self.bump();
        }
        while !self.at(TokenKind::RParen) {
            if self.eat(TokenKind::Ellipsis) {
                variadic = true;
                break;
            }
            params.push(self.parameter_declaration()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        if !self.eat(TokenKind::RParen) {
            return None;
        }

        let mut fd = FunctionDeclarator {
            params,
            variadic,
            is_const: false,
            is_pure: false,
            is_override: false,
            trailing_return: None,
            span: Span::from_coords(0, 0, 0, 0),
        };
        loop {
            match self.peek() {
                TokenKind::Kw_const => fd.is_const = true,
                TokenKind::Kw_volatile | TokenKind::Amp | TokenKind::AmpAmp => {}
                TokenKind::Identifier => match self.peek_text() {
                    "override" | "Q_DECL_OVERRIDE" => fd.is_override = true,
                    "final" | "Q_DECL_FINAL" | "Q_DECL_NOEXCEPT" => {}
                    "noexcept" | "throw" => {
                        self.bump();
                        if self.at(TokenKind::LParen) {
                            self.skip_balanced(TokenKind::LParen, TokenKind::RParen);
                        }
                        continue;
                    }
                    _ => break,
                },
                TokenKind::Arrow => {
                    self.bump();
                    fd.trailing_return = self.type_id().map(Box::new);
                    continue;
                }
                _ => break,
            }
            self.bump();
        }
        if self.at(TokenKind::Eq) {
            match self.nth(1) {
                TokenKind::IntLiteral if self.nth_token(1).is_some_and(|t| t.text == "0") => {
                    fd.is_pure = true;
                    self.bump();
                    self.bump();
                }
                TokenKind::Kw_default | TokenKind::Kw_delete => {
                    self.bump();
                    self.bump();
                }
                _ => {}
            }
        }
        fd.span = self.span_from(start);
        Some(fd)
    }

    fn parameter_declaration(&mut self) -> Option<ParameterDeclaration> {
        let start = self.pos;
        let specifiers = self.decl_specifiers(DeclContext::Parameter);
        specifiers.type_spec.as_ref()?;
        let declarator = self.declarator(DeclContext::Parameter);
        let default_value = self.eat(TokenKind::Eq).then(|| self.assignment());
        Some(ParameterDeclaration {
            specifiers,
            declarator,
            default_value,
            span: self.span_from(start),
        })
    }

    fn type_id(&mut self) -> Option<TypeId> {
        let start = self.pos;
        let specifiers = self.decl_specifiers(DeclContext::TypeId);
        specifiers.type_spec.as_ref()?;
        let declarator = self.declarator(DeclContext::TypeId);
        if declarator.name.is_some() {
            return None;
        }
        Some(TypeId {
            specifiers,
            declarator,
            span: self.span_from(start),
        })
    }

    // ------------------------------------------------------------------------
    // Names
    // ------------------------------------------------------------------------

    fn name_segment_here(&mut self) -> Option<NameSegment> {
        let token = self.bump()?;
        Some(NameSegment {
            kind: NameKind::Identifier,
            text: token.text.clone(),
            span: token.span(),
            generated: token.generated,
            template_args: None,
        })
    }

    fn qualified_name(&mut self, mode: TemplateMode) -> Option<QualifiedName> {
        let start = self.pos;
        let cp = self.checkpoint();
        let global = self.eat(TokenKind::ColonColon);
        let mut segments = Vec::new();

        loop {
            let segment_start = self.pos;
            let first = self.nth_token(0)?;
            let mut segment = match self.peek() {
                TokenKind::Identifier => {
                    self.bump();
                    NameSegment {
                        kind: NameKind::Identifier,
                        text: first.text.clone(),
                        span: first.span(),
                        generated: first.generated,
                        template_args: None,
                    }
                }
                TokenKind::Tilde if self.nth(1) == TokenKind::Identifier => {
                    self.bump();
                    let id = self.bump()?;
                    NameSegment {
                        kind: NameKind::Destructor,
                        text: SmolStr::new(format!("~{}", id.text)),
                        span: self.span_from(segment_start),
                        generated: id.generated,
                        template_args: None,
                    }
                }
                TokenKind::Kw_operator => self.operator_name()?,
                _ => {
                    if segments.is_empty() {
                        self.rewind(cp);
                        return None;
                    }
                    self.error("expected name");
                    break;
                }
            };

            if segment.kind == NameKind::Identifier && self.at(TokenKind::Less) {
                let targs_cp = self.checkpoint();
                match self.template_arguments() {
                    Some(args)
                        if mode == TemplateMode::Type
                            || matches!(
                                self.peek(),
                                TokenKind::LParen
                                    | TokenKind::ColonColon
                                    | TokenKind::LBrace
                                    | TokenKind::RParen
                                    | TokenKind::Semicolon
                                    | TokenKind::Comma
                            ) =>
                    {
                        segment.template_args = Some(args);
                    }
                    _ => self.rewind(targs_cp),
                }
            }
            segments.push(segment);

            if self.at(TokenKind::ColonColon)
                && matches!(
                    self.nth(1),
                    TokenKind::Identifier | TokenKind::Tilde | TokenKind::Kw_operator | TokenKind::Kw_template
                )
            {
                self.bump();
                self.eat(TokenKind::Kw_template);
                continue;
            }
            break;
        }

        Some(QualifiedName {
            global,
            segments,
            span: self.span_from(start),
        })
    }

    fn operator_name(&mut self) -> Option<NameSegment> {
        let start = self.pos;
        let keyword = self.bump()?;
        let text = match self.peek() {
            TokenKind::LParen if self.nth(1) == TokenKind::RParen => {
                self.bump();
                self.bump();
                "operator()".to_string()
            }
            TokenKind::LBracket if self.nth(1) == TokenKind::RBracket => {
                self.bump();
                self.bump();
                "operator[]".to_string()
            }
            TokenKind::Kw_new | TokenKind::Kw_delete => {
                let word = self.peek_text();
                self.bump();
                if self.at(TokenKind::LBracket) && self.nth(1) == TokenKind::RBracket {
                    self.bump();
                    self.bump();
                    format!("operator {word}[]")
                } else {
                    format!("operator {word}")
                }
            }
            kind if is_overloadable_operator(kind) => {
                let op = self.peek_text();
                self.bump();
                format!("operator{op}")
            }
            _ => {
                let type_start = self.pos;
                let specs = self.decl_specifiers(DeclContext::TypeId);
                specs.type_spec.as_ref()?;
                self.ptr_operators();
                let spelled = self.tokens[type_start..self.pos]
                    .iter()
                    .map(|t| t.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                return Some(NameSegment {
                    kind: NameKind::Conversion,
                    text: SmolStr::new(format!("operator {spelled}")),
                    span: self.span_from(start),
                    generated: keyword.generated,
                    template_args: None,
                });
            }
        };
        Some(NameSegment {
            kind: NameKind::Operator,
            text: SmolStr::new(text),
            span: self.span_from(start),
            generated: keyword.generated,
            template_args: None,
        })
    }

    fn template_arguments(&mut self) -> Option<Vec<TemplateArgument>> {
        self.bump(); // <
        let mut args = Vec::new();
        if self.eat_template_close() {
            return Some(args);
        }
        loop {
            let cp = self.checkpoint();
            match self.type_id() {
                Some(type_id) if self.at(TokenKind::Comma) || self.at_template_close() => {
                    args.push(TemplateArgument::Type(type_id));
                }
                _ => {
                    self.rewind(cp);
                    let errors = self.errors.len();
                    let expression = self.binary(8);
                    if self.errors.len() > errors || matches!(expression, Expression::Error(_)) {
                        return None;
                    }
                    args.push(TemplateArgument::Expression(expression));
                }
            }
            if self.eat(TokenKind::Comma) {
                continue;
            }
            return self.eat_template_close().then_some(args);
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn compound_statement(&mut self) -> CompoundStatement {
        let start = self.pos;
        self.bump(); // {
        let mut statements = Vec::new();
        while !matches!(self.peek(), TokenKind::RBrace | TokenKind::Eof) {
            let before = self.pos;
            statements.push(self.statement());
            if self.pos == before {
                self.error("unexpected token");
                self.bump();
            }
        }
        self.expect(TokenKind::RBrace, "'}'");
        CompoundStatement {
            statements,
            span: self.span_from(start),
        }
    }

    fn statement(&mut self) -> Statement {
        self.nested(Self::statement_body, |p, start| {
            p.skip_to_sync();
            Statement::Error(p.span_from(start))
        })
    }

    fn statement_body(&mut self) -> Statement {
        let start = self.pos;
        match self.peek() {
            TokenKind::LBrace => Statement::Compound(self.compound_statement()),
            TokenKind::Semicolon => {
                self.bump();
                Statement::Empty(self.span_from(start))
            }
            TokenKind::Kw_if => {
                self.bump();
                self.expect(TokenKind::LParen, "'('");
                let condition = self.condition();
                self.expect(TokenKind::RParen, "')'");
                let then_branch = Box::new(self.statement());
                let else_branch = self.eat(TokenKind::Kw_else).then(|| Box::new(self.statement()));
                Statement::If {
                    condition,
                    then_branch,
                    else_branch,
                    span: self.span_from(start),
                }
            }
            TokenKind::Kw_while => {
                self.bump();
                self.expect(TokenKind::LParen, "'('");
                let condition = self.condition();
                self.expect(TokenKind::RParen, "')'");
                let body = Box::new(self.statement());
                Statement::While {
                    condition,
                    body,
                    span: self.span_from(start),
                }
            }
            TokenKind::Kw_do => {
                self.bump();
                let body = Box::new(self.statement());
                self.expect(TokenKind::Kw_while, "'while'");
                self.expect(TokenKind::LParen, "'('");
                let condition = self.expression();
                self.expect(TokenKind::RParen, "')'");
                self.expect(TokenKind::Semicolon, "';'");
                Statement::Do {
                    body,
                    condition,
                    span: self.span_from(start),
                }
            }
            TokenKind::Kw_for => self.for_statement(),
            TokenKind::Kw_switch => {
                self.bump();
                self.expect(TokenKind::LParen, "'('");
                let condition = self.condition();
                self.expect(TokenKind::RParen, "')'");
                let body = Box::new(self.statement());
                Statement::Switch {
                    condition,
                    body,
                    span: self.span_from(start),
                }
            }
            TokenKind::Kw_case => {
                self.bump();
                let value = self.conditional();
                self.expect(TokenKind::Colon, "':'");
                Statement::Case {
                    value: Some(value),
                    span: self.span_from(start),
                }
            }
            TokenKind::Kw_default if self.nth(1) == TokenKind::Colon => {
                self.bump();
                self.bump();
                Statement::Case {
                    value: None,
                    span: self.span_from(start),
                }
            }
            TokenKind::Kw_return => {
                self.bump();
                let value = (!self.at(TokenKind::Semicolon)).then(|| {
                    if self.at(TokenKind::LBrace) {
                        let list_start = self.pos;
                        let elements = self.braced_list();
                        Expression::Braced {
                            elements,
                            span: self.span_from(list_start),
                        }
                    } else {
                        self.expression()
                    }
                });
                self.end_statement();
                Statement::Return {
                    value,
                    span: self.span_from(start),
                }
            }
            TokenKind::Kw_break => {
                self.bump();
                self.end_statement();
                Statement::Break(self.span_from(start))
            }
            TokenKind::Kw_continue => {
                self.bump();
                self.end_statement();
                Statement::Continue(self.span_from(start))
            }
            TokenKind::Kw_class
            | TokenKind::Kw_struct
            | TokenKind::Kw_union
            | TokenKind::Kw_enum
            | TokenKind::Kw_typedef
            | TokenKind::Kw_using
            | TokenKind::Kw_namespace
            | TokenKind::Kw_template
            | TokenKind::Kw_static
            | TokenKind::Kw_extern => {
                Statement::Declaration(Box::new(self.declaration(DeclContext::Block)))
            }
            TokenKind::Identifier => match self.peek_text() {
                "emit" | "Q_EMIT" => {
                    self.bump();
                    self.statement()
                }
                "throw" => {
                    self.bump();
                    if self.eat(TokenKind::Semicolon) {
                        return Statement::Empty(self.span_from(start));
                    }
                    let expression = self.expression();
                    self.end_statement();
                    Statement::Expression {
                        expression,
                        span: self.span_from(start),
                    }
                }
                "try" if self.nth(1) == TokenKind::LBrace => {
                    self.bump();
                    let body = self.compound_statement();
                    let mut statements = vec![Statement::Compound(body)];
                    statements.extend(self.catch_clauses());
                    Statement::Compound(CompoundStatement {
                        statements,
                        span: self.span_from(start),
                    })
                }
                _ if self.nth(1) == TokenKind::Colon => {
                    // label
                    self.bump();
                    self.bump();
                    Statement::Empty(self.span_from(start))
                }
                _ => self.declaration_or_expression_statement(),
            },
            _ => self.declaration_or_expression_statement(),
        }
    }

    fn catch_clauses(&mut self) -> Vec<Statement> {
        let mut handlers = Vec::new();
        while self.at(TokenKind::Identifier) && self.peek_text() == "catch" {
            let start = self.pos;
            self.bump();
            let mut statements = Vec::new();
            if self.expect(TokenKind::LParen, "'('") {
                if !self.eat(TokenKind::Ellipsis) {
                    let param_start = self.pos;
                    if let Some(param) = self.parameter_declaration() {
                        statements.push(Statement::Declaration(Box::new(Declaration::Simple(
                            SimpleDeclaration {
                                specifiers: param.specifiers,
                                declarators: vec![InitDeclarator {
                                    declarator: param.declarator,
                                    initializer: None,
                                    bit_width: None,
                                }],
                                span: self.span_from(param_start),
                            },
                        ))));
                    }
                }
                self.expect(TokenKind::RParen, "')'");
            }
            if self.at(TokenKind::LBrace) {
                statements.push(Statement::Compound(self.compound_statement()));
            }
            handlers.push(Statement::Compound(CompoundStatement {
                statements,
                span: self.span_from(start),
            }));
        }
        handlers
    }

    fn end_statement(&mut self) {
        if !self.eat(TokenKind::Semicolon) {
            self.error("expected ';'");
            if !self.at(TokenKind::RBrace) {
                self.skip_to_sync();
            }
        }
    }

    fn for_statement(&mut self) -> Statement {
        let start = self.pos;
        self.bump(); // for
        self.expect(TokenKind::LParen, "'('");

        let init_start = self.pos;
        let cp = self.checkpoint();
        if let Some((specifiers, declarator)) = self.tentative_declarator() {
            if self.eat(TokenKind::Colon) {
                let declaration = Box::new(SimpleDeclaration {
                    specifiers,
                    declarators: vec![InitDeclarator {
                        declarator,
                        initializer: None,
                        bit_width: None,
                    }],
                    span: self.span_from(init_start),
                });
                let range = self.expression();
                self.expect(TokenKind::RParen, "')'");
                let body = Box::new(self.statement());
                return Statement::ForRange {
                    declaration,
                    range,
                    body,
                    span: self.span_from(start),
                };
            }
            self.rewind(cp);
        }

        let init = (!self.eat(TokenKind::Semicolon)).then(|| Box::new(self.statement()));
        let condition = (!self.at(TokenKind::Semicolon)).then(|| self.condition());
        self.expect(TokenKind::Semicolon, "';'");
        let step = (!self.at(TokenKind::RParen)).then(|| self.expression());
        self.expect(TokenKind::RParen, "')'");
        let body = Box::new(self.statement());
        Statement::For {
            init,
            condition,
            step,
            body,
            span: self.span_from(start),
        }
    }

    fn condition(&mut self) -> Condition {
        let start = self.pos;
        let cp = self.checkpoint();
        if let Some((specifiers, declarator)) = self.tentative_declarator() {
            if self.at(TokenKind::Eq) || self.at(TokenKind::LBrace) {
                let initializer = self.initializer(&declarator);
                return Condition::Declaration(Box::new(SimpleDeclaration {
                    specifiers,
                    declarators: vec![InitDeclarator {
                        declarator,
                        initializer,
                        bit_width: None,
                    }],
                    span: self.span_from(start),
                }));
            }
            self.rewind(cp);
        }
        Condition::Expression(self.expression())
    }

    /// Try `specifiers declarator` where the declarator has a name.
    ///
    /// Leaves the cursor after the declarator on success and restores it on
    /// failure.
    fn tentative_declarator(&mut self) -> Option<(DeclSpecifiers, Declarator)> {
        let cp = self.checkpoint();
        let specifiers = self.decl_specifiers(DeclContext::Block);
        if specifiers.type_spec.is_none() {
            self.rewind(cp);
            return None;
        }
        let declarator = self.declarator(DeclContext::Block);
        if declarator.name.is_none() || self.errors.len() > cp.errors {
            self.rewind(cp);
            return None;
        }
        Some((specifiers, declarator))
    }

    fn declaration_or_expression_statement(&mut self) -> Statement {
        let start = self.pos;
        let cp = self.checkpoint();
        if let Some((specifiers, _)) = self.tentative_declarator() {
            let decisive = specifiers_are_decisive(&specifiers);
            let follows = matches!(
                self.peek(),
                TokenKind::Semicolon
                    | TokenKind::Eq
                    | TokenKind::Comma
                    | TokenKind::LBrace
                    | TokenKind::LParen
                    | TokenKind::LBracket
            );
            self.rewind(cp);
            if decisive || follows {
                let specifiers = self.decl_specifiers(DeclContext::Block);
                return Statement::Declaration(Box::new(self.declaration_rest(
                    start,
                    specifiers,
                    DeclContext::Block,
                )));
            }
        }

        let expression = self.expression();
        self.end_statement();
        Statement::Expression {
            expression,
            span: self.span_from(start),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expression(&mut self) -> Expression {
        let start = self.pos;
        let mut lhs = self.assignment();
        while self.at(TokenKind::Comma) {
            self.bump();
            let rhs = self.assignment();
            lhs = Expression::Binary {
                op: TokenKind::Comma,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span: self.span_from(start),
            };
        }
        lhs
    }

    fn assignment(&mut self) -> Expression {
        self.nested(Self::assignment_body, Self::skip_expression)
    }

    fn assignment_body(&mut self) -> Expression {
        let start = self.pos;
        let lhs = self.conditional();
        let op = self.peek();
        if op.is_assignment() {
            self.bump();
            let rhs = if self.at(TokenKind::LBrace) {
                let list_start = self.pos;
                let elements = self.braced_list();
                Expression::Braced {
                    elements,
                    span: self.span_from(list_start),
                }
            } else {
                self.assignment()
            };
            return Expression::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span: self.span_from(start),
            };
        }
        lhs
    }

    fn conditional(&mut self) -> Expression {
        let start = self.pos;
        let condition = self.binary(1);
        if !self.eat(TokenKind::Question) {
            return condition;
        }
        let then_value = self.expression();
        self.expect(TokenKind::Colon, "':'");
        let else_value = self.assignment();
        Expression::Conditional {
            condition: Box::new(condition),
            then_value: Box::new(then_value),
            else_value: Box::new(else_value),
            span: self.span_from(start),
        }
    }

    fn binary(&mut self, min_prec: u8) -> Expression {
        let start = self.pos;
        let mut lhs = self.unary();
        loop {
            let op = self.peek();
            let Some(prec) = op.binary_precedence() else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.bump();
            let rhs = self.binary(prec + 1);
            lhs = Expression::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span: self.span_from(start),
            };
        }
        lhs
    }

    fn unary(&mut self) -> Expression {
        self.nested(Self::unary_body, Self::skip_expression)
    }

    fn unary_body(&mut self) -> Expression {
        let start = self.pos;
        match self.peek() {
            op @ (TokenKind::PlusPlus
            | TokenKind::MinusMinus
            | TokenKind::Star
            | TokenKind::Amp
            | TokenKind::Bang
            | TokenKind::Tilde
            | TokenKind::Minus
            | TokenKind::Plus) => {
                self.bump();
                let operand = self.unary();
                Expression::Unary {
                    op,
                    operand: Box::new(operand),
                    postfix: false,
                    span: self.span_from(start),
                }
            }
            TokenKind::Kw_sizeof => {
                self.bump();
                if self.at(TokenKind::LParen) {
                    let cp = self.checkpoint();
                    self.bump();
                    if let Some(type_id) = self.type_id() {
                        if self.eat(TokenKind::RParen) {
                            return Expression::SizeofType {
                                type_id: Box::new(type_id),
                                span: self.span_from(start),
                            };
                        }
                    }
                    self.rewind(cp);
                }
                let operand = self.unary();
                Expression::Unary {
                    op: TokenKind::Kw_sizeof,
                    operand: Box::new(operand),
                    postfix: false,
                    span: self.span_from(start),
                }
            }
            TokenKind::Kw_new => self.new_expression(),
            TokenKind::Kw_delete => {
                self.bump();
                if self.at(TokenKind::LBracket) {
                    self.skip_balanced(TokenKind::LBracket, TokenKind::RBracket);
                }
                let operand = self.unary();
                Expression::Delete {
                    operand: Box::new(operand),
                    span: self.span_from(start),
                }
            }
            TokenKind::LParen => {
                if let Some(cast) = self.c_style_cast() {
                    return cast;
                }
                self.postfix()
            }
            _ => self.postfix(),
        }
    }

    fn c_style_cast(&mut self) -> Option<Expression> {
        let start = self.pos;
        let cp = self.checkpoint();
        self.bump(); // (
        let Some(type_id) = self.type_id() else {
            self.rewind(cp);
            return None;
        };
        if !self.eat(TokenKind::RParen) {
            self.rewind(cp);
            return None;
        }
        let decisive = specifiers_are_decisive(&type_id.specifiers) || !type_id.declarator.ptr_ops.is_empty();
        let operand_follows = match self.peek() {
            TokenKind::Identifier
            | TokenKind::LParen
            | TokenKind::Kw_this
            | TokenKind::Bang
            | TokenKind::Tilde
            | TokenKind::Kw_new
            | TokenKind::Kw_sizeof => true,
            kind if kind.is_literal() => true,
            TokenKind::Minus | TokenKind::Plus | TokenKind::Star | TokenKind::Amp => decisive,
            _ => false,
        };
        if !operand_follows {
            self.rewind(cp);
            return None;
        }
        let operand = self.unary();
        Some(Expression::Cast {
            kind: CastKind::CStyle,
            type_id: Box::new(type_id),
            operand: Box::new(operand),
            span: self.span_from(start),
        })
    }

    fn new_expression(&mut self) -> Expression {
        let start = self.pos;
        self.bump(); // new
        // placement arguments
        if self.at(TokenKind::LParen) {
            let cp = self.checkpoint();
            self.bump();
            let is_type = self.type_id().is_some() && self.at(TokenKind::RParen);
            self.rewind(cp);
            if !is_type {
                self.skip_balanced(TokenKind::LParen, TokenKind::RParen);
            }
        }
        let parenthesized = self.eat(TokenKind::LParen);
        let type_id = match self.new_type_id() {
            Some(type_id) => type_id,
            None => {
                self.error("expected type");
                return Expression::Error(self.span_from(start));
            }
        };
        if parenthesized {
            self.expect(TokenKind::RParen, "')'");
        }
        while self.at(TokenKind::LBracket) {
            self.skip_balanced(TokenKind::LBracket, TokenKind::RBracket);
        }
        let args = match self.peek() {
            TokenKind::LParen => {
                self.bump();
                self.argument_list()
            }
            TokenKind::LBrace => self.braced_list(),
            _ => Vec::new(),
        };
        Expression::New {
            type_id: Box::new(type_id),
            args,
            span: self.span_from(start),
        }
    }

    /// `new` type: specifiers and pointer operators only, so `new Foo(1)` keeps its arguments.
    fn new_type_id(&mut self) -> Option<TypeId> {
        let start = self.pos;
        let specifiers = self.decl_specifiers(DeclContext::TypeId);
        specifiers.type_spec.as_ref()?;
        let ptr_ops = self.ptr_operators();
        let span = self.span_from(start);
        Some(TypeId {
            specifiers,
            declarator: Declarator {
                ptr_ops,
                name: None,
                function: None,
                is_function_pointer: false,
                array_dims: 0,
                span,
            },
            span,
        })
    }

    fn postfix(&mut self) -> Expression {
        let start = self.pos;
        let mut expression = self.primary();
        loop {
            match self.peek() {
                TokenKind::LParen => {
                    self.bump();
                    let args = self.argument_list();
                    expression = Expression::Call {
                        callee: Box::new(expression),
                        args,
                        span: self.span_from(start),
                    };
                }
                TokenKind::LBracket => {
                    self.bump();
                    let index = self.expression();
                    self.expect(TokenKind::RBracket, "']'");
                    expression = Expression::Subscript {
                        base: Box::new(expression),
                        index: Box::new(index),
                        span: self.span_from(start),
                    };
                }
                TokenKind::Dot | TokenKind::Arrow => {
                    let arrow = self.at(TokenKind::Arrow);
                    self.bump();
                    self.eat(TokenKind::Kw_template);
                    let Some(member) = self.qualified_name(TemplateMode::Expression) else {
                        self.error("expected member name");
                        return Expression::Error(self.span_from(start));
                    };
                    expression = Expression::Member {
                        base: Box::new(expression),
                        arrow,
                        member,
                        span: self.span_from(start),
                    };
                }
                op @ (TokenKind::PlusPlus | TokenKind::MinusMinus) => {
                    self.bump();
                    expression = Expression::Unary {
                        op,
                        operand: Box::new(expression),
                        postfix: true,
                        span: self.span_from(start),
                    };
                }
                _ => return expression,
            }
        }
    }

    /// Arguments after an already consumed `(`, including the closing `)`.
    fn argument_list(&mut self) -> Vec<Expression> {
        let mut args = Vec::new();
        if self.eat(TokenKind::RParen) {
            return args;
        }
        loop {
            if self.at(TokenKind::LBrace) {
                let start = self.pos;
                let elements = self.braced_list();
                args.push(Expression::Braced {
                    elements,
                    span: self.span_from(start),
                });
            } else {
                args.push(self.assignment());
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        if !self.eat(TokenKind::RParen) {
            self.error("expected ')'");
            while !matches!(
                self.peek(),
                TokenKind::RParen | TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
            ) {
                self.bump();
            }
            self.eat(TokenKind::RParen);
        }
        args
    }

    fn braced_list(&mut self) -> Vec<Expression> {
        self.bump(); // {
        let mut elements = Vec::new();
        while !matches!(self.peek(), TokenKind::RBrace | TokenKind::Eof) {
            if self.at(TokenKind::LBrace) {
                let start = self.pos;
                let inner = self.braced_list();
                elements.push(Expression::Braced {
                    elements: inner,
                    span: self.span_from(start),
                });
            } else {
                let before = self.pos;
                elements.push(self.assignment());
                if self.pos == before {
                    self.bump();
                }
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "'}'");
        elements
    }

    fn primary(&mut self) -> Expression {
        let start = self.pos;
        let kind = self.peek();
        match kind {
            kind if kind.is_literal() => {
                let text = self.peek_text();
                self.bump();
                let mut text = SmolStr::new(text);
                // adjacent string literals concatenate
                while kind == TokenKind::StringLiteral && self.at(TokenKind::StringLiteral) {
                    text = SmolStr::new(format!("{text} {}", self.peek_text()));
                    self.bump();
                }
                Expression::Literal {
                    kind,
                    text,
                    span: self.span_from(start),
                }
            }
            TokenKind::Kw_true | TokenKind::Kw_false | TokenKind::Kw_nullptr => {
                let text = SmolStr::new(self.peek_text());
                self.bump();
                Expression::Literal {
                    kind,
                    text,
                    span: self.span_from(start),
                }
            }
            TokenKind::Kw_this => {
                self.bump();
                Expression::This(self.span_from(start))
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.expression();
                self.expect(TokenKind::RParen, "')'");
                inner
            }
            TokenKind::LBrace => {
                let elements = self.braced_list();
                Expression::Braced {
                    elements,
                    span: self.span_from(start),
                }
            }
            TokenKind::LBracket => self.lambda(),
            TokenKind::Kw_static_cast
            | TokenKind::Kw_dynamic_cast
            | TokenKind::Kw_const_cast
            | TokenKind::Kw_reinterpret_cast => {
                let cast = match kind {
                    TokenKind::Kw_static_cast => CastKind::Static,
                    TokenKind::Kw_dynamic_cast => CastKind::Dynamic,
                    TokenKind::Kw_const_cast => CastKind::Const,
                    _ => CastKind::Reinterpret,
                };
                self.bump();
                self.expect(TokenKind::Less, "'<'");
                let Some(type_id) = self.type_id() else {
                    self.error("expected type");
                    return Expression::Error(self.span_from(start));
                };
                if !self.eat_template_close() {
                    self.error("expected '>'");
                }
                self.expect(TokenKind::LParen, "'('");
                let operand = self.expression();
                self.expect(TokenKind::RParen, "')'");
                Expression::Cast {
                    kind: cast,
                    type_id: Box::new(type_id),
                    operand: Box::new(operand),
                    span: self.span_from(start),
                }
            }
            TokenKind::Kw_SIGNAL | TokenKind::Kw_SLOT => {
                self.bump();
                let content_start = self.pos + 1;
                if !self.at(TokenKind::LParen) {
                    self.error("expected '('");
                    return Expression::Error(self.span_from(start));
                }
                self.skip_balanced(TokenKind::LParen, TokenKind::RParen);
                let content = match (self.tokens.get(content_start), self.tokens.get(self.pos.saturating_sub(2))) {
                    (Some(first), Some(last)) if self.pos >= content_start + 2 => {
                        Span::new(first.start, last.end)
                    }
                    _ => self.span_from(start),
                };
                Expression::QtMethod {
                    is_signal: kind == TokenKind::Kw_SIGNAL,
                    content,
                    span: self.span_from(start),
                }
            }
            TokenKind::Identifier | TokenKind::ColonColon | TokenKind::Kw_operator => {
                match self.qualified_name(TemplateMode::Expression) {
                    Some(name) => Expression::Name(name),
                    None => {
                        self.error("expected expression");
                        Expression::Error(self.span_from(start))
                    }
                }
            }
            kind if kind.is_builtin_type() => {
                // functional cast: `int(x)`
                let Some(type_id) = self.new_type_id() else {
                    return Expression::Error(self.span_from(start));
                };
                let operand = if self.eat(TokenKind::LParen) {
                    let args = self.argument_list();
                    args.into_iter().next().unwrap_or(Expression::Error(self.span_from(start)))
                } else if self.at(TokenKind::LBrace) {
                    let elements = self.braced_list();
                    Expression::Braced {
                        elements,
                        span: self.span_from(start),
                    }
                } else {
                    self.error("expected '('");
                    Expression::Error(self.span_from(start))
                };
                Expression::Cast {
                    kind: CastKind::CStyle,
                    type_id: Box::new(type_id),
                    operand: Box::new(operand),
                    span: self.span_from(start),
                }
            }
            _ => {
                self.error("expected expression");
                if !matches!(
                    kind,
                    TokenKind::RParen
                        | TokenKind::RBrace
                        | TokenKind::RBracket
                        | TokenKind::Semicolon
                        | TokenKind::Comma
                        | TokenKind::Eof
                ) {
                    self.bump();
                }
                Expression::Error(self.span_from(start))
            }
        }
    }

    fn lambda(&mut self) -> Expression {
        let start = self.pos;
        self.bump(); // [
        let mut captures = Vec::new();
        while !matches!(self.peek(), TokenKind::RBracket | TokenKind::Eof) {
            if self.at(TokenKind::Identifier) {
                if let Some(segment) = self.name_segment_here() {
                    captures.push(segment);
                }
                if self.eat(TokenKind::Eq) {
                    self.assignment();
                }
            } else {
                self.bump();
            }
        }
        self.expect(TokenKind::RBracket, "']'");

        let mut params = Vec::new();
        if self.at(TokenKind::LParen) {
            match self.function_declarator() {
                Some(fd) => params = fd.params,
                None => {
                    self.error("expected lambda parameters");
                    return Expression::Error(self.span_from(start));
                }
            }
        }
        while self.at(TokenKind::Kw_mutable)
            || (self.at(TokenKind::Identifier) && self.peek_text() == "noexcept")
        {
            self.bump();
        }
        if self.eat(TokenKind::Arrow) {
            self.type_id();
        }
        if !self.at(TokenKind::LBrace) {
            self.error("expected lambda body");
            return Expression::Error(self.span_from(start));
        }
        let body = self.compound_statement();
        Expression::Lambda(Box::new(LambdaExpression {
            captures,
            params,
            body,
            span: self.span_from(start),
        }))
    }
}

fn is_overloadable_operator(kind: TokenKind) -> bool {
    kind.binary_precedence().is_some()
        || kind.is_assignment()
        || matches!(
            kind,
            TokenKind::Bang
                | TokenKind::Tilde
                | TokenKind::PlusPlus
                | TokenKind::MinusMinus
                | TokenKind::Comma
                | TokenKind::Arrow
                | TokenKind::ArrowStar
        )
}

/// Specifiers that can only start a declaration.
fn specifiers_are_decisive(specifiers: &DeclSpecifiers) -> bool {
    let flags = specifiers.flags;
    specifiers.is_const
        || flags.is_static
        || flags.is_typedef
        || flags.is_extern
        || flags.is_inline
        || matches!(
            specifiers.type_spec,
            Some(TypeSpecifier::Builtin { .. })
                | Some(TypeSpecifier::Class(_))
                | Some(TypeSpecifier::Enum(_))
                | Some(TypeSpecifier::Elaborated { .. })
        )
}

/// `Foo x(bar)` inside a function body is a variable, not a function declaration.
fn looks_like_call(fd: &FunctionDeclarator) -> bool {
    fd.params.iter().any(|p| {
        p.declarator.name.is_none()
            && p.declarator.ptr_ops.is_empty()
            && p.declarator.function.is_none()
            && !p.specifiers.is_const
            && matches!(p.specifiers.type_spec, Some(TypeSpecifier::Named(_)))
    })
}
