//! Structural events over the token stream.
//!
//! The whole grammar memory is a stack of [`ReaderState`]s paired with a
//! stack of "expect comma or terminator" flags, one per open object/array.

use std::io::Read;

use tracing::trace;

use super::source::{CharSource, ReadSource, StrSource};
use super::tokenizer::{JsonToken, JsonTokenizer};
use super::JsonError;

pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    None,
    Object,
    Array,
    Property,
}

/// A scalar JSON value as it appeared on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonScalar {
    Null,
    Bool(bool),
    /// Number text exactly as written.
    Number(String),
    String(String),
}

impl JsonScalar {
    /// Text form of the value; `None` for JSON null.
    pub fn raw(&self) -> Option<&str> {
        match self {
            JsonScalar::Null => None,
            JsonScalar::Bool(true) => Some("true"),
            JsonScalar::Bool(false) => Some("false"),
            JsonScalar::Number(n) => Some(n),
            JsonScalar::String(s) => Some(s),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsonScalar::Null)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsonEvent {
    StartObject,
    EndObject,
    StartProperty(String),
    /// Closes a property. Carries the scalar value, or `None` when the
    /// property's value was an object or array that has just closed.
    EndProperty(Option<JsonScalar>),
    StartArray,
    EndArray,
    Value(JsonScalar),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Idle,
    /// A nested object/array that was a property value just closed; the
    /// property's own EndProperty goes out before any token is read.
    EndProperty,
}

pub struct JsonEventReader<S> {
    tokenizer: JsonTokenizer<S>,
    states: Vec<ReaderState>,
    expect_comma_or_end: bool,
    expect_stack: Vec<bool>,
    pending: Pending,
    previous: Option<JsonEvent>,
    max_depth: usize,
}

impl<'a> JsonEventReader<StrSource<'a>> {
    pub fn from_text(text: &'a str) -> Result<Self, JsonError> {
        Ok(JsonEventReader::new(JsonTokenizer::new(StrSource::new(
            text,
        ))?))
    }
}

impl<R: Read> JsonEventReader<ReadSource<R>> {
    pub fn from_read(reader: R) -> Result<Self, JsonError> {
        Ok(JsonEventReader::new(JsonTokenizer::new(ReadSource::new(
            reader,
        ))?))
    }
}

impl<S: CharSource> JsonEventReader<S> {
    pub fn new(tokenizer: JsonTokenizer<S>) -> Self {
        JsonEventReader {
            tokenizer,
            states: Vec::new(),
            expect_comma_or_end: false,
            expect_stack: Vec::new(),
            pending: Pending::Idle,
            previous: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn has_next(&self) -> bool {
        self.pending == Pending::EndProperty || self.tokenizer.has_next()
    }

    /// The most recently emitted event.
    pub fn previous_event(&self) -> Option<&JsonEvent> {
        self.previous.as_ref()
    }

    pub fn state(&self) -> ReaderState {
        self.states.last().copied().unwrap_or(ReaderState::None)
    }

    pub fn next_event(&mut self) -> Result<JsonEvent, JsonError> {
        let event = self.read_event()?;
        trace!(?event, "json event");
        self.previous = Some(event.clone());
        Ok(event)
    }

    fn read_event(&mut self) -> Result<JsonEvent, JsonError> {
        if self.pending == Pending::EndProperty {
            self.pending = Pending::Idle;
            self.states.pop();
            return Ok(JsonEvent::EndProperty(None));
        }

        let token = self.token()?;
        match self.state() {
            ReaderState::None => match token {
                JsonToken::LeftBrace => self.start_object(),
                t => Err(self.unexpected(t, "'{'")),
            },
            ReaderState::Object => {
                let token = if self.expect_comma_or_end {
                    match token {
                        JsonToken::Comma => {
                            self.expect_comma_or_end = false;
                            match self.token()? {
                                t @ JsonToken::String(_) => t,
                                t => return Err(self.unexpected(t, "property name")),
                            }
                        }
                        JsonToken::RightBrace => JsonToken::RightBrace,
                        t => return Err(self.unexpected(t, "',' or '}'")),
                    }
                } else {
                    token
                };
                match token {
                    JsonToken::String(name) => {
                        match self.token()? {
                            JsonToken::Colon => {}
                            t => {
                                return Err(JsonError::MissingColon {
                                    property: name,
                                    found: t.to_string(),
                                })
                            }
                        }
                        self.expect_comma_or_end = true;
                        self.states.push(ReaderState::Property);
                        Ok(JsonEvent::StartProperty(name))
                    }
                    JsonToken::RightBrace => Ok(self.end_structure(JsonEvent::EndObject)),
                    t => Err(self.unexpected(t, "property name or '}'")),
                }
            }
            ReaderState::Property => match token {
                JsonToken::LeftBrace => self.start_object(),
                JsonToken::LeftBracket => self.start_array(),
                t => match scalar(t) {
                    Ok(value) => {
                        self.states.pop();
                        Ok(JsonEvent::EndProperty(Some(value)))
                    }
                    Err(t) => Err(self.unexpected(t, "property value")),
                },
            },
            ReaderState::Array => {
                let token = if self.expect_comma_or_end {
                    match token {
                        JsonToken::Comma => {
                            self.expect_comma_or_end = false;
                            match self.token()? {
                                JsonToken::RightBracket => {
                                    return Err(self.unexpected(JsonToken::RightBracket, "value"))
                                }
                                t => t,
                            }
                        }
                        JsonToken::RightBracket => JsonToken::RightBracket,
                        t => return Err(self.unexpected(t, "',' or ']'")),
                    }
                } else {
                    token
                };
                match token {
                    JsonToken::RightBracket => Ok(self.end_structure(JsonEvent::EndArray)),
                    JsonToken::LeftBrace => {
                        self.expect_comma_or_end = true;
                        self.start_object()
                    }
                    JsonToken::LeftBracket => {
                        self.expect_comma_or_end = true;
                        self.start_array()
                    }
                    t => match scalar(t) {
                        Ok(value) => {
                            self.expect_comma_or_end = true;
                            Ok(JsonEvent::Value(value))
                        }
                        Err(t) => Err(self.unexpected(t, "value or ']'")),
                    },
                }
            }
        }
    }

    fn token(&mut self) -> Result<JsonToken, JsonError> {
        self.tokenizer
            .next_token()?
            .ok_or(JsonError::PrematureEnd {
                state: self.state(),
            })
    }

    fn push_level(&mut self, state: ReaderState) -> Result<(), JsonError> {
        let depth = self.expect_stack.len();
        if depth >= self.max_depth {
            return Err(JsonError::DepthExceeded {
                max: self.max_depth,
            });
        }
        self.expect_stack.push(self.expect_comma_or_end);
        self.expect_comma_or_end = false;
        self.states.push(state);
        Ok(())
    }

    fn start_object(&mut self) -> Result<JsonEvent, JsonError> {
        self.push_level(ReaderState::Object)?;
        Ok(JsonEvent::StartObject)
    }

    fn start_array(&mut self) -> Result<JsonEvent, JsonError> {
        self.push_level(ReaderState::Array)?;
        Ok(JsonEvent::StartArray)
    }

    fn end_structure(&mut self, event: JsonEvent) -> JsonEvent {
        self.states.pop();
        self.expect_comma_or_end = self.expect_stack.pop().unwrap_or(false);
        if self.state() == ReaderState::Property {
            self.pending = Pending::EndProperty;
        }
        event
    }

    fn unexpected(&self, token: JsonToken, expected: &'static str) -> JsonError {
        JsonError::Unexpected {
            state: self.state(),
            found: token.to_string(),
            expected,
        }
    }
}

fn scalar(token: JsonToken) -> Result<JsonScalar, JsonToken> {
    match token {
        JsonToken::String(s) => Ok(JsonScalar::String(s)),
        JsonToken::Number(n) => Ok(JsonScalar::Number(n)),
        JsonToken::True => Ok(JsonScalar::Bool(true)),
        JsonToken::False => Ok(JsonScalar::Bool(false)),
        JsonToken::Null => Ok(JsonScalar::Null),
        other => Err(other),
    }
}
