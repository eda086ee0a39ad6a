//! Diagnostics for every pipeline stage.
//!
//! The lexer and resolver are fatal-on-error stages (per the pipeline
//! contract); the parser recovers and accumulates [`ParseError`]s instead of
//! stopping at the first one. All three compose into [`TranslatorError`] for
//! callers that just want `Result<_, TranslatorError>` from the top-level
//! entry points in `lib.rs`.

use crate::token::SourceLocation;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("{loc}: unrecognized byte {byte:#04x}")]
    UnknownByte { loc: SourceLocation, byte: u8 },

    #[error("{loc}: malformed numeric literal: {reason}")]
    MalformedNumber { loc: SourceLocation, reason: String },

    #[error("{loc}: numeric literal does not fit in {suffix}")]
    Overflow { loc: SourceLocation, suffix: &'static str },
}

/// A parser diagnostic. `Display` renders exactly the
/// `PARSER ERROR (line:col): <message>` format the pipeline's error callback
/// emits.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("PARSER ERROR ({loc}): {message}")]
pub struct ParseError {
    pub loc: SourceLocation,
    pub message: String,
}

impl ParseError {
    pub fn new(loc: SourceLocation, message: impl Into<String>) -> Self {
        Self { loc, message: message.into() }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("undefined name `{name}`")]
    UndefinedName { name: String },

    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch { expected: String, found: String },

    #[error("`{name}` is not a type")]
    NotAType { name: String },

    #[error("`{name}` is not callable")]
    NotCallable { name: String },

    #[error("wrong argument count calling `{name}`: expected {expected}, found {found}")]
    ArgCountMismatch { name: String, expected: usize, found: usize },

    #[error("duplicate member name `{name}` in struct `{struct_name}`")]
    DuplicateMember { struct_name: String, name: String },

    #[error("array size is not a compile-time constant")]
    ArraySizeNotConstant,

    #[error("array index {index} is out of range for array of size {size}")]
    IndexOutOfRange { index: i64, size: u64 },

    #[error("member or swizzle access on non-aggregate type `{ty}`")]
    AccessOnNonAggregate { ty: String },

    #[error("swizzle component `{ch}` is out of range for a {width}-wide vector")]
    SwizzleOutOfRange { ch: char, width: u8 },

    #[error("index operator requires an integer index, found `{ty}`")]
    NonIntegerIndex { ty: String },

    #[error("constructor for `{ty}` expects {expected} slots, found {found}")]
    ConstructorArity { ty: String, expected: u64, found: u64 },

    #[error("array types cannot be constructed with a call; use an array literal")]
    ArrayConstructorCall,

    #[error("return type mismatch: function returns `{expected}`, found `{found}`")]
    ReturnTypeMismatch { expected: String, found: String },

    #[error("array literal elements have mismatched types: `{first}` and `{other}`")]
    ArrayLiteralTypeMismatch { first: String, other: String },

    #[error("variable `{name}` has no declared type and no initializer to infer one from")]
    MissingVarType { name: String },

    #[error("division by zero in constant expression")]
    ConstDivByZero,

    #[error("unsupported operator in constant expression")]
    ConstUnsupportedOp,

    #[error("buffer/uniform element type `{ty}` must have a fixed size here")]
    RuntimeSizedArrayNotAllowed { ty: String },
}

#[derive(Error, Debug)]
pub enum TranslatorError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("parsing failed with {} error(s)", .0.len())]
    Parse(Vec<ParseError>),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
