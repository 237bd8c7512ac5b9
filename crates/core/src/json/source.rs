use std::io::{BufReader, Bytes, Read};

use super::JsonError;

/// A pull source of characters for the tokenizer.
pub trait CharSource {
    fn next_char(&mut self) -> Result<Option<char>, JsonError>;
}

/// Characters of an in-memory string.
pub struct StrSource<'a> {
    chars: std::str::Chars<'a>,
}

impl<'a> StrSource<'a> {
    pub fn new(text: &'a str) -> Self {
        StrSource { chars: text.chars() }
    }
}

impl CharSource for StrSource<'_> {
    fn next_char(&mut self) -> Result<Option<char>, JsonError> {
        Ok(self.chars.next())
    }
}

/// UTF-8 decoded characters of a byte stream. The stream is owned and
/// dropped together with the source.
pub struct ReadSource<R: Read> {
    bytes: Bytes<BufReader<R>>,
}

impl<R: Read> ReadSource<R> {
    pub fn new(reader: R) -> Self {
        ReadSource {
            bytes: BufReader::new(reader).bytes(),
        }
    }

    fn next_byte(&mut self) -> Result<Option<u8>, JsonError> {
        self.bytes.next().transpose().map_err(JsonError::from)
    }
}

impl<R: Read> CharSource for ReadSource<R> {
    fn next_char(&mut self) -> Result<Option<char>, JsonError> {
        let Some(first) = self.next_byte()? else {
            return Ok(None);
        };
        let width = match first {
            0x00..=0x7F => return Ok(Some(first as char)),
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => return Err(JsonError::InvalidUtf8),
        };
        let mut buf = [first, 0, 0, 0];
        for slot in buf.iter_mut().take(width).skip(1) {
            *slot = self.next_byte()?.ok_or(JsonError::InvalidUtf8)?;
        }
        let decoded = std::str::from_utf8(&buf[..width]).map_err(|_| JsonError::InvalidUtf8)?;
        Ok(decoded.chars().next())
    }
}
