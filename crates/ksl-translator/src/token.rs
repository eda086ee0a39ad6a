//! Lexical tokens produced by [`crate::lexer::tokenize`].

use std::fmt;

/// A 1-based line/column position in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The closed set of lexical token kinds recognized by KSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Int16,
    Int32,
    Int64,
    Uint16,
    Uint32,
    Uint64,
    Flt32,
    Flt64,

    Colon,
    Semicolon,
    Comma,
    Dot,
    At,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Question,
    Tilde,
    Bang,

    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    PipeEq,
    AmpEq,
    CaretEq,
    ShlEq,
    ShrEq,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Pipe,
    Amp,
    Caret,
    Shl,
    Shr,

    EqEq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,

    AndAnd,
    OrOr,

    Inc,
    Dec,

    Ident,
    Eof,
}

impl TokenKind {
    /// True for the six sized-integer literal kinds.
    pub fn is_int_literal(self) -> bool {
        matches!(
            self,
            TokenKind::Int16 | TokenKind::Int32 | TokenKind::Int64 | TokenKind::Uint16 | TokenKind::Uint32 | TokenKind::Uint64
        )
    }

    /// True for the two float literal kinds.
    pub fn is_float_literal(self) -> bool {
        matches!(self, TokenKind::Flt32 | TokenKind::Flt64)
    }
}

/// The value carried by a token. Numeric literals carry the 64-bit member of
/// their family (unsigned, signed, or float); the token's `kind` says which
/// narrower width the literal was written with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenValue<'src> {
    Str(&'src str),
    U64(u64),
    I64(i64),
    F64(f64),
    None,
}

impl<'src> TokenValue<'src> {
    pub fn as_str(&self) -> Option<&'src str> {
        match self {
            TokenValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            TokenValue::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TokenValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TokenValue::F64(v) => Some(*v),
            _ => None,
        }
    }
}

/// A single lexed token: kind, source position, and payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub loc: SourceLocation,
    pub value: TokenValue<'src>,
}

impl<'src> Token<'src> {
    pub fn new(kind: TokenKind, loc: SourceLocation, value: TokenValue<'src>) -> Self {
        Self { kind, loc, value }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn text(&self) -> Option<&'src str> {
        self.value.as_str()
    }
}
