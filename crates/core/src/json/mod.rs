//! Verbose-JSON plumbing: a character-level tokenizer, a structural event
//! reader layered on top of it, and a streaming writer.

mod reader;
mod source;
mod tokenizer;
mod writer;

pub use reader::{JsonEvent, JsonEventReader, JsonScalar, ReaderState, DEFAULT_MAX_DEPTH};
pub use source::{CharSource, ReadSource, StrSource};
pub use tokenizer::{JsonToken, JsonTokenizer};
pub use writer::{format_double, format_single, JsonWriter};

/// Lexical and structural JSON failures.
#[derive(Debug, thiserror::Error)]
pub enum JsonError {
    // ── lexical ──────────────────────────────────
    #[error("unrecognized literal '{text}' at offset {offset}")]
    UnrecognizedLiteral { text: String, offset: usize },

    #[error("no JSON format: unexpected '{ch}' after '{after}' at offset {offset}")]
    UnexpectedCharacter {
        ch: char,
        after: String,
        offset: usize,
    },

    #[error("malformed number '{text}' at offset {offset}")]
    MalformedNumber { text: String, offset: usize },

    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("illegal escaped character '\\{ch}' at offset {offset}")]
    IllegalEscape { ch: char, offset: usize },

    #[error("invalid unicode escape '\\u{text}' at offset {offset}")]
    InvalidUnicodeEscape { text: String, offset: usize },

    #[error("input is not valid UTF-8")]
    InvalidUtf8,

    #[error("can push back only one character")]
    PushbackOverflow,

    #[error("failed to read JSON input: {0}")]
    Io(#[from] std::io::Error),

    // ── structural ───────────────────────────────
    #[error("unexpected {found} in {state:?} state, expected {expected}")]
    Unexpected {
        state: ReaderState,
        found: String,
        expected: &'static str,
    },

    #[error(": expected after property \"{property}\", found {found}")]
    MissingColon { property: String, found: String },

    #[error("premature end of JSON input in {state:?} state")]
    PrematureEnd { state: ReaderState },

    #[error("JSON nesting deeper than {max} levels")]
    DepthExceeded { max: usize },
}
