use std::fmt;

use time::{OffsetDateTime, PrimitiveDateTime};

use super::{EntityError, SimpleValue};
use crate::expr::{self, Expr, Literal};
use crate::uri;

/// An entity key, as carried in a URI predicate such as `('a')` or
/// `(k1='a',k2=2)`.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityKey {
    Single(SimpleValue),
    Named(Vec<(String, SimpleValue)>),
}

impl EntityKey {
    pub fn single(value: impl Into<String>) -> Self {
        EntityKey::Single(SimpleValue::String(value.into()))
    }

    /// Parse a predicate including its parentheses.
    pub fn parse_predicate(text: &str) -> Result<EntityKey, EntityError> {
        let malformed = || EntityError::MalformedKey {
            text: text.to_owned(),
        };
        let inner = text
            .trim()
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(malformed)?;
        let parts = split_outside_quotes(inner, ',');
        if parts.len() == 1 && split_outside_quotes(parts[0], '=').len() == 1 {
            return key_value(parts[0]).map(EntityKey::Single).ok_or_else(malformed);
        }
        let mut named = Vec::with_capacity(parts.len());
        for part in parts {
            let (name, value) = match split_outside_quotes(part, '=').as_slice() {
                [name, value] => (name.trim(), *value),
                _ => return Err(malformed()),
            };
            if name.is_empty() {
                return Err(malformed());
            }
            named.push((name.to_owned(), key_value(value).ok_or_else(malformed)?));
        }
        Ok(EntityKey::Named(named))
    }

    /// The key of an entity URI: the predicate that closes its last path
    /// segment, percent-decoded.
    pub fn from_uri(entity_uri: &str) -> Result<EntityKey, EntityError> {
        let malformed = || EntityError::MalformedKey {
            text: entity_uri.to_owned(),
        };
        let predicate = last_predicate(entity_uri).ok_or_else(malformed)?;
        let decoded = uri::decode(predicate, false).ok_or_else(malformed)?;
        EntityKey::parse_predicate(&decoded)
    }

    /// The predicate, percent-encoded for use in a URI path.
    pub fn to_segment(&self) -> String {
        uri::encode_key_segment(&self.to_string())
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Single(v) => write!(f, "({})", to_literal(v)),
            EntityKey::Named(pairs) => {
                f.write_str("(")?;
                for (i, (name, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}={}", name, to_literal(v))?;
                }
                f.write_str(")")
            }
        }
    }
}

/// The `(...)` that ends the path of `entity_uri`. Quoted key text may hold
/// `/`, `?`, `#` or parentheses.
fn last_predicate(entity_uri: &str) -> Option<&str> {
    let mut quoted = false;
    let mut open = None;
    let mut end = entity_uri.len();
    for (i, c) in entity_uri.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            _ if quoted => {}
            '/' => open = None,
            '(' if open.is_none() => open = Some(i),
            '?' | '#' => {
                end = i;
                break;
            }
            _ => {}
        }
    }
    open.map(|start| &entity_uri[start..end])
}

fn split_outside_quotes(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if c == '\'' {
            quoted = !quoted;
        } else if c == sep && !quoted {
            parts.push(&text[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}

fn key_value(text: &str) -> Option<SimpleValue> {
    match expr::parse_value(text).ok()? {
        Expr::Literal { value } => from_literal(value),
        _ => None,
    }
}

fn from_literal(literal: Literal) -> Option<SimpleValue> {
    let value = match literal {
        Literal::Null => return None,
        Literal::Boolean(b) => SimpleValue::Boolean(b),
        Literal::String(s) => SimpleValue::String(s),
        Literal::Int32(n) => SimpleValue::Int32(n),
        Literal::Int64(n) => SimpleValue::Int64(n),
        Literal::Single(v) => SimpleValue::Single(v),
        Literal::Double(v) => SimpleValue::Double(v),
        Literal::Decimal(d) => SimpleValue::Decimal(d),
        Literal::DateTime(dt) => {
            SimpleValue::DateTime((dt.unix_timestamp_nanos() / 1_000_000) as i64)
        }
        Literal::DateTimeOffset(dt) => SimpleValue::DateTimeOffset(dt),
        Literal::Time(t) => SimpleValue::Time(t),
        Literal::Guid(g) => SimpleValue::Guid(g),
        Literal::Binary(b) => SimpleValue::Binary(b),
    };
    Some(value)
}

fn to_literal(value: &SimpleValue) -> Literal {
    match value {
        SimpleValue::Binary(b) => Literal::Binary(b.clone()),
        SimpleValue::Boolean(b) => Literal::Boolean(*b),
        SimpleValue::Byte(n) => Literal::Int32(i32::from(*n)),
        SimpleValue::SByte(n) => Literal::Int32(i32::from(*n)),
        SimpleValue::Int16(n) => Literal::Int32(i32::from(*n)),
        SimpleValue::Int32(n) => Literal::Int32(*n),
        SimpleValue::Int64(n) => Literal::Int64(*n),
        SimpleValue::DateTime(ms) => {
            match OffsetDateTime::from_unix_timestamp_nanos(i128::from(*ms) * 1_000_000) {
                Ok(dt) => Literal::DateTime(PrimitiveDateTime::new(dt.date(), dt.time()).assume_utc()),
                Err(_) => Literal::Int64(*ms),
            }
        }
        SimpleValue::DateTimeOffset(dt) => Literal::DateTimeOffset(*dt),
        SimpleValue::Decimal(d) => Literal::Decimal(*d),
        SimpleValue::Double(v) => Literal::Double(*v),
        SimpleValue::Guid(g) => Literal::Guid(*g),
        SimpleValue::Single(v) => Literal::Single(*v),
        SimpleValue::String(s) => Literal::String(s.clone()),
        SimpleValue::Time(t) => Literal::Time(*t),
    }
}
