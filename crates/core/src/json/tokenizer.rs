//! Character stream to JSON tokens.
//!
//! Three scanning modes (default, string, number) are selected by the first
//! significant character. A single pushback slot provides the one character
//! of lookahead the grammar needs: number mode hands back the character that
//! ended the number, and a `,` `}` `]` that ends a bare constant is handed
//! back to be delivered as its own token.

use std::fmt;

use tracing::debug;

use super::source::CharSource;
use super::JsonError;

#[derive(Debug, Clone, PartialEq)]
pub enum JsonToken {
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Colon,
    True,
    False,
    Null,
    /// Number text exactly as written.
    Number(String),
    /// String content with escapes resolved.
    String(String),
}

impl fmt::Display for JsonToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonToken::LeftBrace => f.write_str("'{'"),
            JsonToken::RightBrace => f.write_str("'}'"),
            JsonToken::LeftBracket => f.write_str("'['"),
            JsonToken::RightBracket => f.write_str("']'"),
            JsonToken::Comma => f.write_str("','"),
            JsonToken::Colon => f.write_str("':'"),
            JsonToken::True => f.write_str("true"),
            JsonToken::False => f.write_str("false"),
            JsonToken::Null => f.write_str("null"),
            JsonToken::Number(n) => write!(f, "number {}", n),
            JsonToken::String(s) => write!(f, "string \"{}\"", s),
        }
    }
}

pub struct JsonTokenizer<S> {
    source: S,
    pushback: Option<char>,
    /// Characters consumed from the source so far.
    offset: usize,
    /// One token of lookahead so `has_next` is exact.
    current: Option<JsonToken>,
}

impl<S: CharSource> JsonTokenizer<S> {
    pub fn new(source: S) -> Result<Self, JsonError> {
        let mut t = JsonTokenizer {
            source,
            pushback: None,
            offset: 0,
            current: None,
        };
        t.current = t.scan()?;
        Ok(t)
    }

    pub fn has_next(&self) -> bool {
        self.current.is_some()
    }

    /// The next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<JsonToken>, JsonError> {
        let token = self.current.take();
        if token.is_some() {
            self.current = self.scan()?;
        }
        if let Some(t) = &token {
            debug!(token = %t, "json token");
        }
        Ok(token)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    fn read(&mut self) -> Result<Option<char>, JsonError> {
        if let Some(c) = self.pushback.take() {
            return Ok(Some(c));
        }
        let c = self.source.next_char()?;
        if c.is_some() {
            self.offset += 1;
        }
        Ok(c)
    }

    fn push_back(&mut self, c: char) -> Result<(), JsonError> {
        if self.pushback.is_some() {
            return Err(JsonError::PushbackOverflow);
        }
        self.pushback = Some(c);
        Ok(())
    }

    fn scan(&mut self) -> Result<Option<JsonToken>, JsonError> {
        let mut word = String::new();
        loop {
            let Some(c) = self.read()? else {
                return if word.is_empty() {
                    Ok(None)
                } else {
                    self.constant(&word).map(Some)
                };
            };
            if !word.is_empty() {
                match c {
                    ',' | '}' | ']' => {
                        self.push_back(c)?;
                        return self.constant(&word).map(Some);
                    }
                    c if c.is_whitespace() => return self.constant(&word).map(Some),
                    '{' | '[' | ':' | '"' => {
                        return Err(JsonError::UnexpectedCharacter {
                            ch: c,
                            after: word,
                            offset: self.offset,
                        })
                    }
                    _ => {
                        word.push(c);
                        continue;
                    }
                }
            }
            match c {
                c if c.is_whitespace() => {}
                '{' => return Ok(Some(JsonToken::LeftBrace)),
                '}' => return Ok(Some(JsonToken::RightBrace)),
                '[' => return Ok(Some(JsonToken::LeftBracket)),
                ']' => return Ok(Some(JsonToken::RightBracket)),
                ',' => return Ok(Some(JsonToken::Comma)),
                ':' => return Ok(Some(JsonToken::Colon)),
                '"' => return self.scan_string().map(Some),
                '-' | '0'..='9' => return self.scan_number(c).map(Some),
                _ => word.push(c),
            }
        }
    }

    /// Bare constants are matched exactly once a terminator is seen.
    fn constant(&self, word: &str) -> Result<JsonToken, JsonError> {
        match word {
            "true" => Ok(JsonToken::True),
            "false" => Ok(JsonToken::False),
            "null" => Ok(JsonToken::Null),
            _ => Err(JsonError::UnrecognizedLiteral {
                text: word.to_owned(),
                offset: self.offset,
            }),
        }
    }

    fn scan_number(&mut self, first: char) -> Result<JsonToken, JsonError> {
        let start = self.offset;
        let mut text = String::from(first);
        while let Some(c) = self.read()? {
            if matches!(c, '0'..='9' | '-' | '+' | '.' | 'e' | 'E') {
                text.push(c);
            } else {
                self.push_back(c)?;
                break;
            }
        }
        // The character filter lets through things like "1-2" or "--".
        if text.parse::<f64>().is_err() {
            return Err(JsonError::MalformedNumber {
                text,
                offset: start,
            });
        }
        Ok(JsonToken::Number(text))
    }

    fn scan_string(&mut self) -> Result<JsonToken, JsonError> {
        let start = self.offset;
        let mut s = String::new();
        loop {
            match self.read()? {
                None => return Err(JsonError::UnterminatedString { offset: start }),
                Some('"') => return Ok(JsonToken::String(s)),
                Some('\\') => {
                    let esc = self
                        .read()?
                        .ok_or(JsonError::UnterminatedString { offset: start })?;
                    match esc {
                        'b' => s.push('\u{8}'),
                        'f' => s.push('\u{c}'),
                        'n' => s.push('\n'),
                        'r' => s.push('\r'),
                        't' => s.push('\t'),
                        '/' => s.push('/'),
                        '\\' => s.push('\\'),
                        '"' => s.push('"'),
                        'u' => s.push(self.unicode_escape(start)?),
                        other => {
                            return Err(JsonError::IllegalEscape {
                                ch: other,
                                offset: self.offset,
                            })
                        }
                    }
                }
                Some(c) => s.push(c),
            }
        }
    }

    fn hex4(&mut self, start: usize) -> Result<u32, JsonError> {
        let mut text = String::with_capacity(4);
        for _ in 0..4 {
            let c = self
                .read()?
                .ok_or(JsonError::UnterminatedString { offset: start })?;
            text.push(c);
        }
        // from_str_radix alone would take a leading '+'
        if !text.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(JsonError::InvalidUnicodeEscape {
                text,
                offset: self.offset,
            });
        }
        u32::from_str_radix(&text, 16).map_err(|_| JsonError::InvalidUnicodeEscape {
            text,
            offset: self.offset,
        })
    }

    /// Decode the digits after `\u`, pairing surrogates.
    fn unicode_escape(&mut self, start: usize) -> Result<char, JsonError> {
        let unit = self.hex4(start)?;
        let code = match unit {
            0xD800..=0xDBFF => {
                let (a, b) = (self.read()?, self.read()?);
                if (a, b) != (Some('\\'), Some('u')) {
                    return Err(self.bad_escape(unit));
                }
                let low = self.hex4(start)?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(self.bad_escape(unit));
                }
                0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00)
            }
            0xDC00..=0xDFFF => return Err(self.bad_escape(unit)),
            _ => unit,
        };
        char::from_u32(code).ok_or_else(|| self.bad_escape(unit))
    }

    fn bad_escape(&self, unit: u32) -> JsonError {
        JsonError::InvalidUnicodeEscape {
            text: format!("{:04X}", unit),
            offset: self.offset,
        }
    }
}
