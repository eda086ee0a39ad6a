//! Byte stream to token sequence.
//!
//! Splitting is delegated to `logos`, which already gives us longest-match
//! operator resolution for free (`>>=` beats `>>` beats `>`, `+=` beats `+`,
//! and so on). What logos can't do — numeric literal typing with suffix
//! rules and overflow checks — is done in a second pass over the raw
//! `Number` slices it hands back.
//!
//! Position tracking does not happen token-by-token; instead the whole
//! source is scanned once up front for newline offsets (`LineIndex`), and
//! every token's byte offset is mapped through it. This sidesteps having to
//! hand-roll `advance()`/column-increment bookkeeping around `logos::skip`.

use crate::error::LexError;
use crate::token::{SourceLocation, Token, TokenKind, TokenValue};
use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum Raw<'src> {
    #[regex(r"0[xX][0-9A-Fa-f]+[A-Za-z]*")]
    #[regex(r"[0-9]+(\.[0-9]+)?[A-Za-z]*")]
    Number(&'src str),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident(&'src str),

    #[token(">>=")]
    ShrEq,
    #[token("<<=")]
    ShlEq,
    #[token(">>")]
    Shr,
    #[token("<<")]
    Shl,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,
    #[token("|=")]
    PipeEq,
    #[token("&=")]
    AmpEq,
    #[token("^=")]
    CaretEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token(">=")]
    GtEq,
    #[token("<=")]
    LtEq,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("++")]
    Inc,
    #[token("--")]
    Dec,

    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("@")]
    At,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("?")]
    Question,
    #[token("~")]
    Tilde,
    #[token("!")]
    Bang,
    #[token("=")]
    Eq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("|")]
    Pipe,
    #[token("&")]
    Amp,
    #[token("^")]
    Caret,
    #[token(">")]
    Gt,
    #[token("<")]
    Lt,

    #[regex(r"//[^\n]*", logos::skip)]
    #[regex(r"[ \t\r\n]+", logos::skip)]
    #[error]
    Error,
}

/// Maps byte offsets into the source to 1-based (line, column) pairs.
struct LineIndex {
    /// Byte offset of the start of each line; `line_starts[0] == 0`.
    line_starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    fn locate(&self, offset: usize) -> SourceLocation {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert_at) => insert_at - 1,
        };
        let column = offset - self.line_starts[line];
        SourceLocation { line: line as u32 + 1, column: column as u32 + 1 }
    }
}

/// Tokenizes `source`, returning the ordered token sequence terminated by
/// `TokenKind::Eof`, or the first lexical error encountered.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, LexError> {
    let index = LineIndex::new(source);
    let mut out = Vec::new();

    let mut lexer = Raw::lexer(source);
    while let Some(raw) = lexer.next() {
        let loc = index.locate(lexer.span().start);
        let slice = lexer.slice();

        let token = match raw {
            Raw::Error => return Err(LexError::UnknownByte { loc, byte: slice.as_bytes()[0] }),
            Raw::Number(text) => parse_numeric_literal(text, loc)?,
            Raw::Ident(text) => Token::new(TokenKind::Ident, loc, TokenValue::Str(text)),
            Raw::ShrEq => Token::new(TokenKind::ShrEq, loc, TokenValue::None),
            Raw::ShlEq => Token::new(TokenKind::ShlEq, loc, TokenValue::None),
            Raw::Shr => Token::new(TokenKind::Shr, loc, TokenValue::None),
            Raw::Shl => Token::new(TokenKind::Shl, loc, TokenValue::None),
            Raw::PlusEq => Token::new(TokenKind::PlusEq, loc, TokenValue::None),
            Raw::MinusEq => Token::new(TokenKind::MinusEq, loc, TokenValue::None),
            Raw::StarEq => Token::new(TokenKind::StarEq, loc, TokenValue::None),
            Raw::SlashEq => Token::new(TokenKind::SlashEq, loc, TokenValue::None),
            Raw::PercentEq => Token::new(TokenKind::PercentEq, loc, TokenValue::None),
            Raw::PipeEq => Token::new(TokenKind::PipeEq, loc, TokenValue::None),
            Raw::AmpEq => Token::new(TokenKind::AmpEq, loc, TokenValue::None),
            Raw::CaretEq => Token::new(TokenKind::CaretEq, loc, TokenValue::None),
            Raw::EqEq => Token::new(TokenKind::EqEq, loc, TokenValue::None),
            Raw::NotEq => Token::new(TokenKind::NotEq, loc, TokenValue::None),
            Raw::GtEq => Token::new(TokenKind::GtEq, loc, TokenValue::None),
            Raw::LtEq => Token::new(TokenKind::LtEq, loc, TokenValue::None),
            Raw::AndAnd => Token::new(TokenKind::AndAnd, loc, TokenValue::None),
            Raw::OrOr => Token::new(TokenKind::OrOr, loc, TokenValue::None),
            Raw::Inc => Token::new(TokenKind::Inc, loc, TokenValue::None),
            Raw::Dec => Token::new(TokenKind::Dec, loc, TokenValue::None),
            Raw::Colon => Token::new(TokenKind::Colon, loc, TokenValue::None),
            Raw::Semicolon => Token::new(TokenKind::Semicolon, loc, TokenValue::None),
            Raw::Comma => Token::new(TokenKind::Comma, loc, TokenValue::None),
            Raw::Dot => Token::new(TokenKind::Dot, loc, TokenValue::None),
            Raw::At => Token::new(TokenKind::At, loc, TokenValue::None),
            Raw::LParen => Token::new(TokenKind::LParen, loc, TokenValue::None),
            Raw::RParen => Token::new(TokenKind::RParen, loc, TokenValue::None),
            Raw::LBracket => Token::new(TokenKind::LBracket, loc, TokenValue::None),
            Raw::RBracket => Token::new(TokenKind::RBracket, loc, TokenValue::None),
            Raw::LBrace => Token::new(TokenKind::LBrace, loc, TokenValue::None),
            Raw::RBrace => Token::new(TokenKind::RBrace, loc, TokenValue::None),
            Raw::Question => Token::new(TokenKind::Question, loc, TokenValue::None),
            Raw::Tilde => Token::new(TokenKind::Tilde, loc, TokenValue::None),
            Raw::Bang => Token::new(TokenKind::Bang, loc, TokenValue::None),
            Raw::Eq => Token::new(TokenKind::Eq, loc, TokenValue::None),
            Raw::Plus => Token::new(TokenKind::Plus, loc, TokenValue::None),
            Raw::Minus => Token::new(TokenKind::Minus, loc, TokenValue::None),
            Raw::Star => Token::new(TokenKind::Star, loc, TokenValue::None),
            Raw::Slash => Token::new(TokenKind::Slash, loc, TokenValue::None),
            Raw::Percent => Token::new(TokenKind::Percent, loc, TokenValue::None),
            Raw::Pipe => Token::new(TokenKind::Pipe, loc, TokenValue::None),
            Raw::Amp => Token::new(TokenKind::Amp, loc, TokenValue::None),
            Raw::Caret => Token::new(TokenKind::Caret, loc, TokenValue::None),
            Raw::Gt => Token::new(TokenKind::Gt, loc, TokenValue::None),
            Raw::Lt => Token::new(TokenKind::Lt, loc, TokenValue::None),
        };
        out.push(token);
    }

    let eof_loc = index.locate(source.len());
    out.push(Token::new(TokenKind::Eof, eof_loc, TokenValue::None));
    Ok(out)
}

/// Splits a raw numeric slice (e.g. `"123u"`, `"0x1Ful"`, `"3.5f"`) into its
/// digits and trailing alphabetic suffix.
fn split_suffix(text: &str) -> (&str, &str) {
    let suffix_start = text.find(|c: char| c.is_ascii_alphabetic() && c != 'x' && c != 'X').unwrap_or(text.len());
    // The hex prefix's own "x"/"X" must not be mistaken for a suffix letter;
    // skip past it before searching for the first true suffix character.
    if let Some(rest) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        let offset = text.len() - rest.len();
        let suffix_start = offset + rest.find(|c: char| c.is_ascii_alphabetic()).unwrap_or(rest.len());
        return (&text[..suffix_start], &text[suffix_start..]);
    }
    (&text[..suffix_start], &text[suffix_start..])
}

fn parse_numeric_literal<'src>(text: &'src str, loc: SourceLocation) -> Result<Token<'src>, LexError> {
    let is_hex = text.starts_with("0x") || text.starts_with("0X");

    if is_hex {
        let (digits, suffix) = split_suffix(text);
        let hex_digits = &digits[2..];
        if hex_digits.is_empty() {
            return Err(LexError::MalformedNumber { loc, reason: "hexadecimal literal has no digits".into() });
        }
        let value = u64::from_str_radix(hex_digits, 16)
            .map_err(|e| LexError::MalformedNumber { loc, reason: e.to_string() })?;
        return int_token_with_suffix(value, suffix, loc);
    }

    let (digits, suffix) = split_suffix(text);
    if let Some(dot) = digits.find('.') {
        let (int_part, frac_part) = (&digits[..dot], &digits[dot + 1..]);
        if frac_part.is_empty() {
            return Err(LexError::MalformedNumber { loc, reason: "missing fractional digits".into() });
        }
        let _ = int_part;
        let value: f64 =
            digits.parse().map_err(|_| LexError::MalformedNumber { loc, reason: "invalid floating-point literal".into() })?;
        return float_token_with_suffix(value, suffix, loc);
    }

    let value: u64 = digits.parse().map_err(|_| LexError::Overflow { loc, suffix: "i64" })?;
    int_token_with_suffix(value, suffix, loc)
}

fn int_token_with_suffix(value: u64, suffix: &str, loc: SourceLocation) -> Result<Token<'static>, LexError> {
    let (kind, token_value) = match suffix {
        "us" => {
            if value > u16::MAX as u64 {
                return Err(LexError::Overflow { loc, suffix: "u16" });
            }
            (TokenKind::Uint16, TokenValue::U64(value))
        }
        "ul" => (TokenKind::Uint64, TokenValue::U64(value)),
        "u" => {
            if value > u32::MAX as u64 {
                return Err(LexError::Overflow { loc, suffix: "u32" });
            }
            (TokenKind::Uint32, TokenValue::U64(value))
        }
        "s" => {
            if value > i16::MAX as u64 {
                return Err(LexError::Overflow { loc, suffix: "i16" });
            }
            (TokenKind::Int16, TokenValue::I64(value as i64))
        }
        "l" => {
            if value > i64::MAX as u64 {
                return Err(LexError::Overflow { loc, suffix: "i64" });
            }
            (TokenKind::Int64, TokenValue::I64(value as i64))
        }
        "i" | "" => {
            if value > i32::MAX as u64 {
                return Err(LexError::Overflow { loc, suffix: "i32" });
            }
            (TokenKind::Int32, TokenValue::I64(value as i64))
        }
        other => return Err(LexError::MalformedNumber { loc, reason: format!("unknown integer suffix `{other}`") }),
    };
    Ok(Token::new(kind, loc, token_value))
}

fn float_token_with_suffix(value: f64, suffix: &str, loc: SourceLocation) -> Result<Token<'static>, LexError> {
    match suffix {
        "f" => {
            if value.is_finite() && value.abs() <= f32::MAX as f64 {
                Ok(Token::new(TokenKind::Flt32, loc, TokenValue::F64(value)))
            } else {
                Err(LexError::Overflow { loc, suffix: "f32" })
            }
        }
        "d" | "" => Ok(Token::new(TokenKind::Flt64, loc, TokenValue::F64(value))),
        other => Err(LexError::MalformedNumber { loc, reason: format!("unknown float suffix `{other}`") }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_one_based_and_track_newlines() {
        let toks = tokenize("a\nb").unwrap();
        assert_eq!(toks[0].loc, SourceLocation { line: 1, column: 1 });
        assert_eq!(toks[1].loc, SourceLocation { line: 2, column: 1 });
    }

    #[test]
    fn line_comment_is_skipped() {
        let toks = tokenize("a // comment\nb").unwrap();
        assert_eq!(toks.len(), 3); // a, b, eof
        assert_eq!(toks[1].loc.line, 2);
    }

    #[test]
    fn integer_suffixes_select_width() {
        let toks = tokenize("1us 2ul 3u 4s 5l 6i 7").unwrap();
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            &kinds[..7],
            &[TokenKind::Uint16, TokenKind::Uint64, TokenKind::Uint32, TokenKind::Int16, TokenKind::Int64, TokenKind::Int32, TokenKind::Int32]
        );
    }

    #[test]
    fn float_suffixes() {
        let toks = tokenize("1.5f 2.5d 3.5").unwrap();
        assert_eq!(toks[0].kind, TokenKind::Flt32);
        assert_eq!(toks[1].kind, TokenKind::Flt64);
        assert_eq!(toks[2].kind, TokenKind::Flt64);
    }

    #[test]
    fn hex_literal() {
        let toks = tokenize("0x1F").unwrap();
        assert_eq!(toks[0].kind, TokenKind::Int32);
        assert_eq!(toks[0].value.as_i64(), Some(31));
    }

    #[test]
    fn integer_overflow_is_fatal() {
        let err = tokenize("99999s").unwrap_err();
        assert!(matches!(err, LexError::Overflow { suffix: "i16", .. }));
    }

    #[test]
    fn greedy_longest_match_operators() {
        let toks = tokenize(">>= >> > += +").unwrap();
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(&kinds[..5], &[TokenKind::ShrEq, TokenKind::Shr, TokenKind::Gt, TokenKind::PlusEq, TokenKind::Plus]);
    }

    #[test]
    fn unknown_byte_is_fatal() {
        let err = tokenize("$").unwrap_err();
        assert!(matches!(err, LexError::UnknownByte { byte: b'$', .. }));
    }
}
