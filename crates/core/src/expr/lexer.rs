use std::fmt;

use tracing::debug;

use super::{Expr, ExprError};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Whitespace,
    /// Quoted string as written, quotes and `''` doubling included.
    Quoted(String),
    /// Letters, digits, `/`, `_` and `-`, starting with a letter or `_`.
    Word(String),
    /// Digits, with a leading `-` when it was immediately followed by one.
    Number(String),
    /// One of `, . + = : -`.
    Symbol(char),
    OpenParen,
    CloseParen,
    /// A parenthesised span already folded into a tree.
    Expression(Box<Expr>),
}

impl Token {
    pub(crate) fn is_word(&self, text: &str) -> bool {
        matches!(self, Token::Word(w) if w == text)
    }

    pub(crate) fn is_symbol(&self, c: char) -> bool {
        matches!(self, Token::Symbol(s) if *s == c)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Whitespace => f.write_str("[ ]"),
            Token::Quoted(s) | Token::Word(s) | Token::Number(s) => write!(f, "[{}]", s),
            Token::Symbol(c) => write!(f, "[{}]", c),
            Token::OpenParen => f.write_str("[(]"),
            Token::CloseParen => f.write_str("[)]"),
            Token::Expression(e) => write!(f, "[{}]", e),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Spanned {
    pub token: Token,
    pub offset: usize,
}

const SYMBOLS: &str = ",.+=:";

pub(crate) fn tokenize(src: &str) -> Result<Vec<Spanned>, ExprError> {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut tokens = Vec::new();
    let mut pos = 0usize;

    let text = |from: usize, to: usize| -> String {
        let start = chars[from].0;
        let end = chars.get(to).map_or(src.len(), |(o, _)| *o);
        src[start..end].to_owned()
    };

    while pos < chars.len() {
        let (offset, c) = chars[pos];
        let (token, end) = if c.is_whitespace() {
            let end = scan_while(&chars, pos + 1, char::is_whitespace);
            (Token::Whitespace, end)
        } else if c == '\'' {
            let end = scan_quoted(&chars, pos + 1)
                .ok_or(ExprError::UnterminatedString { offset })?;
            (Token::Quoted(text(pos, end)), end)
        } else if c.is_alphabetic() || c == '_' {
            let end = scan_while(&chars, pos + 1, is_word_char);
            (Token::Word(text(pos, end)), end)
        } else if c.is_ascii_digit() {
            let end = scan_while(&chars, pos + 1, |c| c.is_ascii_digit());
            (Token::Number(text(pos, end)), end)
        } else if c == '(' {
            (Token::OpenParen, pos + 1)
        } else if c == ')' {
            (Token::CloseParen, pos + 1)
        } else if c == '-' {
            match chars.get(pos + 1) {
                Some((_, d)) if d.is_ascii_digit() => {
                    let end = scan_while(&chars, pos + 1, |c| c.is_ascii_digit());
                    (Token::Number(text(pos, end)), end)
                }
                _ => (Token::Symbol('-'), pos + 1),
            }
        } else if SYMBOLS.contains(c) {
            (Token::Symbol(c), pos + 1)
        } else {
            dump_tokens(&tokens);
            return Err(ExprError::Tokenize {
                text: src[offset..].to_owned(),
                offset,
            });
        };
        tokens.push(Spanned { token, offset });
        pos = end;
    }
    Ok(tokens)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '/' | '_' | '-')
}

fn scan_while(chars: &[(usize, char)], mut pos: usize, pred: impl Fn(char) -> bool) -> usize {
    while pos < chars.len() && pred(chars[pos].1) {
        pos += 1;
    }
    pos
}

/// Index just past the closing quote, treating `''` as an embedded quote.
fn scan_quoted(chars: &[(usize, char)], mut pos: usize) -> Option<usize> {
    loop {
        let (_, c) = chars.get(pos)?;
        if *c != '\'' {
            pos += 1;
        } else if matches!(chars.get(pos + 1), Some((_, '\''))) {
            pos += 2;
        } else {
            return Some(pos + 1);
        }
    }
}

/// `'it''s'` → `it's`
pub(crate) fn unquote(quoted: &str) -> String {
    let inner = quoted
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(quoted);
    inner.replace("''", "'")
}

pub(crate) fn dump_tokens(tokens: &[Spanned]) {
    if tracing::enabled!(tracing::Level::DEBUG) {
        let joined: String = tokens.iter().map(|t| t.token.to_string()).collect();
        debug!(tokens = %joined, "expression tokens");
    }
}

pub(crate) fn render(tokens: &[Spanned]) -> String {
    tokens.iter().map(|t| t.token.to_string()).collect()
}
