//! Verbose-JSON response envelopes: entry, feed, single link and links.

use std::io::{self, Write};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use super::validate::date_envelope;
use super::{Entity, OValue, SimpleValue};
use crate::json::JsonWriter;
use crate::timefmt;
use crate::uri;

/// One page of a collection response.
#[derive(Debug, Clone, Copy)]
pub struct Feed<'a> {
    pub entities: &'a [Entity],
    /// Total count for `$inlinecount=allpages`.
    pub inline_count: Option<u64>,
    pub continuation: Option<&'a Continuation>,
}

/// Where the next page starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Continuation {
    /// The URI of the request that produced this page, query included.
    pub request_uri: String,
    pub skip_token: String,
}

/// `{"d": {"__metadata": ..., <properties>, <links>}}`
pub fn write_entry<W: Write>(out: W, base_uri: &str, entity: &Entity) -> io::Result<()> {
    let mut w = JsonWriter::new(out);
    w.start_object()?;
    w.write_name("d")?;
    entry_object(&mut w, base_uri, entity)?;
    w.end_object()
}

/// `{"d": {"results": [...], "__count": "n", "__next": "..."}}`
pub fn write_feed<W: Write>(out: W, base_uri: &str, feed: &Feed<'_>) -> io::Result<()> {
    let mut w = JsonWriter::new(out);
    w.start_object()?;
    w.write_name("d")?;
    w.start_object()?;
    w.write_name("results")?;
    w.start_array()?;
    for entity in feed.entities {
        entry_object(&mut w, base_uri, entity)?;
    }
    w.end_array()?;
    if let Some(count) = feed.inline_count {
        w.write_name("__count")?;
        w.write_string(&count.to_string())?;
    }
    if let Some(cont) = feed.continuation {
        w.write_name("__next")?;
        w.write_string(&next_link(cont, feed.entities.len()))?;
    }
    w.end_object()?;
    w.end_object()
}

/// `{"d": {"uri": "..."}}`
pub fn write_single_link<W: Write>(out: W, uri: &str) -> io::Result<()> {
    let mut w = JsonWriter::new(out);
    w.start_object()?;
    w.write_name("d")?;
    w.start_object()?;
    w.write_name("uri")?;
    w.write_string(uri)?;
    w.end_object()?;
    w.end_object()
}

/// `{"d": {"results": [{"uri": "..."}, ...], "__count": "n"}}`
pub fn write_links<W: Write>(out: W, uris: &[String], count: Option<u64>) -> io::Result<()> {
    let mut w = JsonWriter::new(out);
    w.start_object()?;
    w.write_name("d")?;
    w.start_object()?;
    w.write_name("results")?;
    w.start_array()?;
    for uri in uris {
        w.start_object()?;
        w.write_name("uri")?;
        w.write_string(uri)?;
        w.end_object()?;
    }
    w.end_array()?;
    if let Some(count) = count {
        w.write_name("__count")?;
        w.write_string(&count.to_string())?;
    }
    w.end_object()?;
    w.end_object()
}

/// `<base>/<EntitySet>(<key>)`, or the bare set URI for a keyless entity.
pub fn entity_uri(base_uri: &str, entity: &Entity) -> String {
    let base = base_uri.trim_end_matches('/');
    match &entity.key {
        Some(key) => format!("{}/{}{}", base, entity.entity_set, key.to_segment()),
        None => format!("{}/{}", base, entity.entity_set),
    }
}

/// The `__next` URL: the request URI without `$skip`, `$skiptoken` and
/// `$top`, plus the skip token and whatever remains of the original `$top`
/// once `emitted` entities have been sent.
pub fn next_link(cont: &Continuation, emitted: usize) -> String {
    let (path, query) = cont
        .request_uri
        .split_once('?')
        .unwrap_or((cont.request_uri.as_str(), ""));
    let mut top: Option<i64> = None;
    let mut params: Vec<String> = Vec::new();
    for (name, value) in uri::split_query(query) {
        match uri::decode(name, true).as_deref() {
            Some("$top") => {
                top = uri::decode(value, true).and_then(|v| v.trim().parse().ok());
            }
            Some("$skip") | Some("$skiptoken") => {}
            _ if value.is_empty() => params.push(name.to_owned()),
            _ => params.push(format!("{}={}", name, value)),
        }
    }
    params.push(format!(
        "$skiptoken={}",
        uri::encode_query_value(&cont.skip_token)
    ));
    if let Some(top) = top {
        let remaining = top - i64::try_from(emitted).unwrap_or(i64::MAX);
        if remaining > 0 {
            params.push(format!("$top={}", remaining));
        }
    }
    format!("{}?{}", path, params.join("&"))
}

// ──────────────────────────────────────────────
// Entry body
// ──────────────────────────────────────────────

fn entry_object<W: Write>(
    w: &mut JsonWriter<W>,
    base_uri: &str,
    entity: &Entity,
) -> io::Result<()> {
    let uri = entity_uri(base_uri, entity);
    w.start_object()?;
    w.write_name("__metadata")?;
    w.start_object()?;
    if entity.key.is_some() {
        w.write_name("uri")?;
        w.write_string(&uri)?;
    }
    w.write_name("type")?;
    w.write_string(&entity.entity_type)?;
    if let Some(etag) = &entity.etag {
        w.write_name("etag")?;
        w.write_string(etag)?;
    }
    w.end_object()?;

    for prop in &entity.properties {
        w.write_name(&prop.name)?;
        write_value(w, &prop.value)?;
    }
    for link in &entity.links {
        w.write_name(&link.name)?;
        w.start_object()?;
        w.write_name("__deferred")?;
        w.start_object()?;
        w.write_name("uri")?;
        w.write_string(&link.uri)?;
        w.end_object()?;
        w.end_object()?;
    }
    w.end_object()
}

fn write_value<W: Write>(w: &mut JsonWriter<W>, value: &OValue) -> io::Result<()> {
    match value {
        OValue::Simple { value: None, .. }
        | OValue::Complex {
            properties: None, ..
        }
        | OValue::Collection { items: None, .. } => w.write_null(),
        OValue::Simple {
            value: Some(v), ..
        } => write_simple(w, v),
        OValue::Complex {
            properties: Some(props),
            ..
        } => {
            w.start_object()?;
            for p in props {
                w.write_name(&p.name)?;
                write_value(w, &p.value)?;
            }
            w.end_object()
        }
        OValue::Collection {
            items: Some(items), ..
        } => {
            w.start_array()?;
            for item in items {
                write_value(w, item)?;
            }
            w.end_array()
        }
    }
}

fn write_simple<W: Write>(w: &mut JsonWriter<W>, value: &SimpleValue) -> io::Result<()> {
    match value {
        SimpleValue::Boolean(b) => w.write_boolean(*b),
        SimpleValue::Byte(n) => w.write_integer(i64::from(*n)),
        SimpleValue::SByte(n) => w.write_integer(i64::from(*n)),
        SimpleValue::Int16(n) => w.write_integer(i64::from(*n)),
        SimpleValue::Int32(n) => w.write_integer(i64::from(*n)),
        SimpleValue::Single(v) => w.write_single(*v),
        SimpleValue::Double(v) => w.write_double(*v),
        // 64-bit integers and decimals exceed what JSON numbers carry safely
        SimpleValue::Int64(n) => w.write_string(&n.to_string()),
        SimpleValue::Decimal(d) => w.write_string(&d.to_string()),
        SimpleValue::Guid(g) => w.write_string(&g.to_string()),
        SimpleValue::String(s) => w.write_string(s),
        SimpleValue::DateTime(ms) => w.write_string(&date_envelope(*ms)),
        SimpleValue::DateTimeOffset(dt) => w.write_string(&timefmt::format_rfc3339(*dt)),
        SimpleValue::Time(t) => w.write_string(&timefmt::format_time(*t)),
        SimpleValue::Binary(b) => w.write_string(&BASE64.encode(b)),
    }
}
