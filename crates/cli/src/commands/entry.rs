use std::fs::File;
use std::path::Path;

use odatawire_core::entity::{next_link, write_entry, Continuation};
use odatawire_core::{EntityKey, EntityParser, Limits, RequestClock, WireError};
use tracing::info;

use crate::{fail, print_json, OutputFormat};

/// Inputs of `odw entry`.
pub(crate) struct EntryRequest<'a> {
    pub payload: &'a Path,
    pub schema: &'a Path,
    pub entity_set: &'a str,
    pub base_uri: &'a str,
    pub key: Option<&'a str>,
    pub now: Option<i64>,
}

pub(crate) fn cmd_entry(req: &EntryRequest<'_>, limits: &Limits, output: OutputFormat, quiet: bool) {
    match run_entry(req, limits) {
        Ok(written) => println!("{}", written),
        Err(e) => fail(e, output, quiet),
    }
}

fn run_entry(req: &EntryRequest<'_>, limits: &Limits) -> Result<String, WireError> {
    let ds = odatawire_edm::parse_reader(File::open(req.schema)?)?;
    let clock = match req.now {
        Some(millis) => RequestClock::fixed(millis),
        None => RequestClock::now(),
    };
    let mut parser = EntityParser::new(&ds, req.entity_set, limits, clock)?;
    if let Some(predicate) = req.key {
        parser = parser.with_default_key(EntityKey::parse_predicate(predicate)?);
    }
    let entity = parser.parse_read(File::open(req.payload)?)?;
    info!(
        entity_set = %entity.entity_set,
        entity_type = %entity.entity_type,
        properties = entity.properties.len(),
        links = entity.links.len(),
        "entity parsed"
    );

    let mut out = Vec::new();
    write_entry(&mut out, req.base_uri, &entity)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

pub(crate) fn cmd_next(request_uri: String, skip_token: String, emitted: usize, output: OutputFormat) {
    let link = next_link(
        &Continuation {
            request_uri,
            skip_token,
        },
        emitted,
    );
    match output {
        OutputFormat::Text => println!("{}", link),
        OutputFormat::Json => print_json(&serde_json::json!({ "__next": link }), output, false),
    }
}
