//! Percent-encoding helpers for query strings, key predicates and `__next`
//! links.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left bare inside a query parameter value.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b',')
    .remove(b':')
    .remove(b'/');

/// Characters left bare inside a key predicate path segment.
const KEY_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b',')
    .remove(b'=')
    .remove(b':');

pub fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

pub fn encode_key_segment(value: &str) -> String {
    utf8_percent_encode(value, KEY_SEGMENT).to_string()
}

/// Percent-decode; `+` is a space only when `plus_as_space` is set, as in
/// form-encoded query strings.
pub fn decode(value: &str, plus_as_space: bool) -> Option<String> {
    let replaced;
    let input = if plus_as_space && value.contains('+') {
        replaced = value.replace('+', " ");
        replaced.as_str()
    } else {
        value
    };
    percent_decode_str(input)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

/// Split a query string into raw (still encoded) `name=value` pairs.
pub fn split_query(query: &str) -> Vec<(&str, &str)> {
    query
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| part.split_once('=').unwrap_or((part, "")))
        .collect()
}
