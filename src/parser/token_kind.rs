//! Token kinds produced by the C++ lexer.

/// Every token kind the front-end distinguishes.
///
/// Keywords are split out so that the parser can match on them directly; Qt's
/// `SIGNAL`/`SLOT` macros and `signals`/`slots` sections are lexed as keywords
/// (the "moc run" mode of the original front-end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(non_camel_case_types)]
pub enum TokenKind {
    // Trivia the parser still cares about
    Newline,
    Error,
    Eof,

    // Literals
    Identifier,
    IntLiteral,
    FloatLiteral,
    CharLiteral,
    StringLiteral,
    /// `<foo.h>` on an include line; only produced by the line lexer.
    AngleStringLiteral,

    // Punctuation
    Hash,
    HashHash,
    ColonColon,
    Colon,
    Semicolon,
    Comma,
    Dot,
    DotStar,
    Arrow,
    ArrowStar,
    Ellipsis,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Question,
    Tilde,
    Bang,
    Plus,
    PlusPlus,
    PlusEq,
    Minus,
    MinusMinus,
    MinusEq,
    Star,
    StarEq,
    Slash,
    SlashEq,
    Percent,
    PercentEq,
    Amp,
    AmpAmp,
    AmpEq,
    Pipe,
    PipePipe,
    PipeEq,
    Caret,
    CaretEq,
    Eq,
    EqEq,
    BangEq,
    Less,
    LessEq,
    LessLess,
    LessLessEq,
    Greater,
    GreaterEq,
    GreaterGreater,
    GreaterGreaterEq,

    // Keywords
    Kw_auto,
    Kw_bool,
    Kw_break,
    Kw_case,
    Kw_char,
    Kw_class,
    Kw_const,
    Kw_const_cast,
    Kw_continue,
    Kw_default,
    Kw_delete,
    Kw_do,
    Kw_double,
    Kw_dynamic_cast,
    Kw_else,
    Kw_enum,
    Kw_explicit,
    Kw_extern,
    Kw_false,
    Kw_float,
    Kw_for,
    Kw_friend,
    Kw_if,
    Kw_inline,
    Kw_int,
    Kw_long,
    Kw_mutable,
    Kw_namespace,
    Kw_new,
    Kw_nullptr,
    Kw_operator,
    Kw_private,
    Kw_protected,
    Kw_public,
    Kw_reinterpret_cast,
    Kw_return,
    Kw_short,
    Kw_signed,
    Kw_sizeof,
    Kw_static,
    Kw_static_cast,
    Kw_struct,
    Kw_switch,
    Kw_template,
    Kw_this,
    Kw_true,
    Kw_typedef,
    Kw_typename,
    Kw_union,
    Kw_unsigned,
    Kw_using,
    Kw_virtual,
    Kw_void,
    Kw_volatile,
    Kw_while,

    // Qt keywords
    Kw_SIGNAL,
    Kw_SLOT,
    Kw_signals,
    Kw_slots,
}

impl TokenKind {
    pub fn is_keyword(self) -> bool {
        self >= TokenKind::Kw_auto && self <= TokenKind::Kw_while
    }

    pub fn is_qt_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Kw_SIGNAL | TokenKind::Kw_SLOT | TokenKind::Kw_signals | TokenKind::Kw_slots
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::IntLiteral
                | TokenKind::FloatLiteral
                | TokenKind::CharLiteral
                | TokenKind::StringLiteral
                | TokenKind::AngleStringLiteral
        )
    }

    /// Keywords that can start a builtin type specifier.
    pub fn is_builtin_type(self) -> bool {
        matches!(
            self,
            TokenKind::Kw_auto
                | TokenKind::Kw_bool
                | TokenKind::Kw_char
                | TokenKind::Kw_double
                | TokenKind::Kw_float
                | TokenKind::Kw_int
                | TokenKind::Kw_long
                | TokenKind::Kw_short
                | TokenKind::Kw_signed
                | TokenKind::Kw_unsigned
                | TokenKind::Kw_void
        )
    }

    /// Binary operator precedence (higher binds tighter); `None` if not binary.
    pub fn binary_precedence(self) -> Option<u8> {
        use TokenKind::*;
        let prec = match self {
            PipePipe => 1,
            AmpAmp => 2,
            Pipe => 3,
            Caret => 4,
            Amp => 5,
            EqEq | BangEq => 6,
            Less | LessEq | Greater | GreaterEq => 7,
            LessLess | GreaterGreater => 8,
            Plus | Minus => 9,
            Star | Slash | Percent => 10,
            DotStar | ArrowStar => 11,
            _ => return None,
        };
        Some(prec)
    }

    pub fn is_assignment(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Eq | PlusEq
                | MinusEq
                | StarEq
                | SlashEq
                | PercentEq
                | AmpEq
                | PipeEq
                | CaretEq
                | LessLessEq
                | GreaterGreaterEq
        )
    }
}
