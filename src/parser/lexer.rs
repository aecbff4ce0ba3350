//! Logos-based lexer for C++
//!
//! Fast tokenization using the logos crate. Whitespace and comments are
//! skipped, newlines are kept because the preprocessor needs them to find the
//! end of a directive.

use super::token_kind::TokenKind;
use logos::Logos;
use text_size::{TextRange, TextSize};

/// A token with its kind, text, and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub range: TextRange,
}

impl Token<'_> {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn begin(&self) -> usize {
        self.range.start().into()
    }

    pub fn end(&self) -> usize {
        self.range.end().into()
    }
}

/// Lexer wrapping the logos-generated tokenizer
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, LogosToken>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: LogosToken::lexer(input),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let logos_token = self.inner.next()?;
        let text = self.inner.slice();
        let span = self.inner.span();
        let range = TextRange::new(TextSize::new(span.start as u32), TextSize::new(span.end as u32));

        let kind = match logos_token {
            Ok(t) => t.into(),
            Err(()) => TokenKind::Error,
        };

        Some(Token { kind, text, range })
    }
}

/// Tokenize an entire string into a Vec
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

/// Tokenize a single editor line, recognising `<header>` on include lines.
///
/// This is the lexer the link resolver runs over the block under the cursor;
/// it never sees preprocessed text.
pub fn tokenize_line(line: &str) -> Vec<Token<'_>> {
    let mut tokens: Vec<Token<'_>> = tokenize(line)
        .into_iter()
        .filter(|t| t.kind != TokenKind::Newline)
        .collect();

    let is_include = tokens.len() >= 3
        && tokens[0].is(TokenKind::Hash)
        && tokens[1].is(TokenKind::Identifier)
        && matches!(tokens[1].text, "include" | "include_next" | "import")
        && tokens[2].is(TokenKind::Less);

    if is_include {
        if let Some(close) = tokens.iter().skip(3).position(|t| t.is(TokenKind::Greater)) {
            let close = close + 3;
            let range = TextRange::new(tokens[2].range.start(), tokens[close].range.end());
            let angle = Token {
                kind: TokenKind::AngleStringLiteral,
                text: &line[range],
                range,
            };
            tokens.splice(2..=close, std::iter::once(angle));
        }
    }

    tokens
}

/// Find the token that contains `offset`, preferring the token that starts at it.
pub fn token_at<'a>(tokens: &'a [Token<'a>], offset: usize) -> Option<&'a Token<'a>> {
    tokens
        .iter()
        .rev()
        .find(|t| offset >= t.begin() && offset <= t.end())
}

/// Logos token enum - maps to TokenKind
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\f\v]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
#[logos(skip r"\\\r?\n")]
pub enum LogosToken {
    #[token("\n")]
    Newline,

    // =========================================================================
    // LITERALS
    // =========================================================================
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    #[regex(r"[0-9][0-9a-zA-Z_']*")]
    Integer,

    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?[fFlL]?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?[fFlL]?")]
    Float,

    #[regex(r"(u8|u|U|L)?'([^'\\\n]|\\.)*'")]
    Char,

    #[regex(r#"(u8|u|U|L)?"([^"\\\n]|\\.)*""#)]
    String,

    // =========================================================================
    // PUNCTUATION (logos picks the longest match)
    // =========================================================================
    #[token("##")]
    HashHash,
    #[token("#")]
    Hash,
    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token("...")]
    Ellipsis,
    #[token(".*")]
    DotStar,
    #[token(".")]
    Dot,
    #[token("->*")]
    ArrowStar,
    #[token("->")]
    Arrow,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("?")]
    Question,
    #[token("~")]
    Tilde,
    #[token("!=")]
    BangEq,
    #[token("!")]
    Bang,
    #[token("++")]
    PlusPlus,
    #[token("+=")]
    PlusEq,
    #[token("+")]
    Plus,
    #[token("--")]
    MinusMinus,
    #[token("-=")]
    MinusEq,
    #[token("-")]
    Minus,
    #[token("*=")]
    StarEq,
    #[token("*")]
    Star,
    #[token("/=")]
    SlashEq,
    #[token("/")]
    Slash,
    #[token("%=")]
    PercentEq,
    #[token("%")]
    Percent,
    #[token("&&")]
    AmpAmp,
    #[token("&=")]
    AmpEq,
    #[token("&")]
    Amp,
    #[token("||")]
    PipePipe,
    #[token("|=")]
    PipeEq,
    #[token("|")]
    Pipe,
    #[token("^=")]
    CaretEq,
    #[token("^")]
    Caret,
    #[token("==")]
    EqEq,
    #[token("=")]
    Eq,
    #[token("<<=")]
    LessLessEq,
    #[token("<<")]
    LessLess,
    #[token("<=")]
    LessEq,
    #[token("<")]
    Less,
    #[token(">>=")]
    GreaterGreaterEq,
    #[token(">>")]
    GreaterGreater,
    #[token(">=")]
    GreaterEq,
    #[token(">")]
    Greater,

    // =========================================================================
    // KEYWORDS (exact tokens win over the identifier regex)
    // =========================================================================
    #[token("auto")]
    Auto,
    #[token("bool")]
    Bool,
    #[token("break")]
    Break,
    #[token("case")]
    Case,
    #[token("char")]
    CharKw,
    #[token("class")]
    Class,
    #[token("const")]
    Const,
    #[token("const_cast")]
    ConstCast,
    #[token("continue")]
    Continue,
    #[token("default")]
    Default,
    #[token("delete")]
    Delete,
    #[token("do")]
    Do,
    #[token("double")]
    Double,
    #[token("dynamic_cast")]
    DynamicCast,
    #[token("else")]
    Else,
    #[token("enum")]
    Enum,
    #[token("explicit")]
    Explicit,
    #[token("extern")]
    Extern,
    #[token("false")]
    False,
    #[token("float")]
    FloatKw,
    #[token("for")]
    For,
    #[token("friend")]
    Friend,
    #[token("if")]
    If,
    #[token("inline")]
    Inline,
    #[token("int")]
    Int,
    #[token("long")]
    Long,
    #[token("mutable")]
    Mutable,
    #[token("namespace")]
    Namespace,
    #[token("new")]
    New,
    #[token("nullptr")]
    Nullptr,
    #[token("operator")]
    Operator,
    #[token("private")]
    Private,
    #[token("protected")]
    Protected,
    #[token("public")]
    Public,
    #[token("reinterpret_cast")]
    ReinterpretCast,
    #[token("return")]
    Return,
    #[token("short")]
    Short,
    #[token("signed")]
    Signed,
    #[token("sizeof")]
    Sizeof,
    #[token("static")]
    Static,
    #[token("static_cast")]
    StaticCast,
    #[token("struct")]
    Struct,
    #[token("switch")]
    Switch,
    #[token("template")]
    Template,
    #[token("this")]
    This,
    #[token("true")]
    True,
    #[token("typedef")]
    Typedef,
    #[token("typename")]
    Typename,
    #[token("union")]
    Union,
    #[token("unsigned")]
    Unsigned,
    #[token("using")]
    Using,
    #[token("virtual")]
    Virtual,
    #[token("void")]
    Void,
    #[token("volatile")]
    Volatile,
    #[token("while")]
    While,

    #[token("SIGNAL")]
    QtSignal,
    #[token("SLOT")]
    QtSlot,
    #[token("signals")]
    QtSignals,
    #[token("slots")]
    QtSlots,
}

impl From<LogosToken> for TokenKind {
    fn from(token: LogosToken) -> Self {
        use LogosToken as L;
        use TokenKind as K;
        match token {
            L::Newline => K::Newline,
            L::Ident => K::Identifier,
            L::Integer => K::IntLiteral,
            L::Float => K::FloatLiteral,
            L::Char => K::CharLiteral,
            L::String => K::StringLiteral,
            L::HashHash => K::HashHash,
            L::Hash => K::Hash,
            L::ColonColon => K::ColonColon,
            L::Colon => K::Colon,
            L::Semicolon => K::Semicolon,
            L::Comma => K::Comma,
            L::Ellipsis => K::Ellipsis,
            L::DotStar => K::DotStar,
            L::Dot => K::Dot,
            L::ArrowStar => K::ArrowStar,
            L::Arrow => K::Arrow,
            L::LParen => K::LParen,
            L::RParen => K::RParen,
            L::LBrace => K::LBrace,
            L::RBrace => K::RBrace,
            L::LBracket => K::LBracket,
            L::RBracket => K::RBracket,
            L::Question => K::Question,
            L::Tilde => K::Tilde,
            L::BangEq => K::BangEq,
            L::Bang => K::Bang,
            L::PlusPlus => K::PlusPlus,
            L::PlusEq => K::PlusEq,
            L::Plus => K::Plus,
            L::MinusMinus => K::MinusMinus,
            L::MinusEq => K::MinusEq,
            L::Minus => K::Minus,
            L::StarEq => K::StarEq,
            L::Star => K::Star,
            L::SlashEq => K::SlashEq,
            L::Slash => K::Slash,
            L::PercentEq => K::PercentEq,
            L::Percent => K::Percent,
            L::AmpAmp => K::AmpAmp,
            L::AmpEq => K::AmpEq,
            L::Amp => K::Amp,
            L::PipePipe => K::PipePipe,
            L::PipeEq => K::PipeEq,
            L::Pipe => K::Pipe,
            L::CaretEq => K::CaretEq,
            L::Caret => K::Caret,
            L::EqEq => K::EqEq,
            L::Eq => K::Eq,
            L::LessLessEq => K::LessLessEq,
            L::LessLess => K::LessLess,
            L::LessEq => K::LessEq,
            L::Less => K::Less,
            L::GreaterGreaterEq => K::GreaterGreaterEq,
            L::GreaterGreater => K::GreaterGreater,
            L::GreaterEq => K::GreaterEq,
            L::Greater => K::Greater,
            L::Auto => K::Kw_auto,
            L::Bool => K::Kw_bool,
            L::Break => K::Kw_break,
            L::Case => K::Kw_case,
            L::CharKw => K::Kw_char,
            L::Class => K::Kw_class,
            L::Const => K::Kw_const,
            L::ConstCast => K::Kw_const_cast,
            L::Continue => K::Kw_continue,
            L::Default => K::Kw_default,
            L::Delete => K::Kw_delete,
            L::Do => K::Kw_do,
            L::Double => K::Kw_double,
            L::DynamicCast => K::Kw_dynamic_cast,
            L::Else => K::Kw_else,
            L::Enum => K::Kw_enum,
            L::Explicit => K::Kw_explicit,
            L::Extern => K::Kw_extern,
            L::False => K::Kw_false,
            L::FloatKw => K::Kw_float,
            L::For => K::Kw_for,
            L::Friend => K::Kw_friend,
            L::If => K::Kw_if,
            L::Inline => K::Kw_inline,
            L::Int => K::Kw_int,
            L::Long => K::Kw_long,
            L::Mutable => K::Kw_mutable,
            L::Namespace => K::Kw_namespace,
            L::New => K::Kw_new,
            L::Nullptr => K::Kw_nullptr,
            L::Operator => K::Kw_operator,
            L::Private => K::Kw_private,
            L::Protected => K::Kw_protected,
            L::Public => K::Kw_public,
            L::ReinterpretCast => K::Kw_reinterpret_cast,
            L::Return => K::Kw_return,
            L::Short => K::Kw_short,
            L::Signed => K::Kw_signed,
            L::Sizeof => K::Kw_sizeof,
            L::Static => K::Kw_static,
            L::StaticCast => K::Kw_static_cast,
            L::Struct => K::Kw_struct,
            L::Switch => K::Kw_switch,
            L::Template => K::Kw_template,
            L::This => K::Kw_this,
            L::True => K::Kw_true,
            L::Typedef => K::Kw_typedef,
            L::Typename => K::Kw_typename,
            L::Union => K::Kw_union,
            L::Unsigned => K::Kw_unsigned,
            L::Using => K::Kw_using,
            L::Virtual => K::Kw_virtual,
            L::Void => K::Kw_void,
            L::Volatile => K::Kw_volatile,
            L::While => K::Kw_while,
            L::QtSignal => K::Kw_SIGNAL,
            L::QtSlot => K::Kw_SLOT,
            L::QtSignals => K::Kw_signals,
            L::QtSlots => K::Kw_slots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_win_over_identifiers() {
        assert_eq!(
            kinds("class classy"),
            vec![TokenKind::Kw_class, TokenKind::Identifier]
        );
    }

    #[test]
    fn test_comments_are_skipped_newlines_kept() {
        assert_eq!(
            kinds("a // x\n/* y\n z */ b"),
            vec![TokenKind::Identifier, TokenKind::Newline, TokenKind::Identifier]
        );
    }

    #[test]
    fn test_longest_punctuation() {
        assert_eq!(
            kinds("a->b::c >>= d"),
            vec![
                TokenKind::Identifier,
                TokenKind::Arrow,
                TokenKind::Identifier,
                TokenKind::ColonColon,
                TokenKind::Identifier,
                TokenKind::GreaterGreaterEq,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_token_ranges() {
        let tokens = tokenize("int  foo;");
        assert_eq!(tokens[1].text, "foo");
        assert_eq!(tokens[1].begin(), 5);
        assert_eq!(tokens[1].end(), 8);
    }

    #[test]
    fn test_token_at_prefers_token_starting_at_offset() {
        let line = "s.size + use(s) + bb::xx";
        let tokens = tokenize_line(line);
        for (needle, expected) in [("size", "size"), ("(s)", "("), ("s)", "s"), ("xx", "xx")] {
            let offset = line.find(needle).unwrap();
            assert_eq!(token_at(&tokens, offset).unwrap().text, expected);
        }
        // the end of the last token still maps back onto it
        assert_eq!(token_at(&tokens, line.len()).unwrap().text, "xx");
        assert!(token_at(&tokens, line.len() + 1).is_none());
    }

    #[test]
    fn test_line_lexer_angle_include() {
        let tokens = tokenize_line("#include <vector>");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2].kind, TokenKind::AngleStringLiteral);
        assert_eq!(tokens[2].text, "<vector>");

        let tokens = tokenize_line("#include \"foo.h\"");
        assert_eq!(tokens[2].kind, TokenKind::StringLiteral);
    }

    #[test]
    fn test_qt_keywords() {
        assert_eq!(
            kinds("SIGNAL(clicked())")[0],
            TokenKind::Kw_SIGNAL
        );
    }
}
