use std::fs::File;
use std::path::Path;

use odatawire_core::json::{JsonEvent, JsonEventReader, JsonScalar};
use odatawire_core::{Limits, WireError};
use serde_json::{json, Value};

use crate::{fail, print_json, OutputFormat};

pub(crate) fn cmd_events(path: &Path, limits: &Limits, output: OutputFormat, quiet: bool) {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => fail(WireError::Io(e), output, quiet),
    };
    let events = match read_all(file, limits.max_depth) {
        Ok(events) => events,
        Err(e) => fail(e, output, quiet),
    };
    match output {
        OutputFormat::Json => {
            let values: Vec<Value> = events.iter().map(event_json).collect();
            print_json(&values, output, quiet);
        }
        OutputFormat::Text => {
            let mut depth = 0usize;
            for event in &events {
                if matches!(event, JsonEvent::EndObject | JsonEvent::EndArray | JsonEvent::EndProperty(_)) {
                    depth = depth.saturating_sub(1);
                }
                println!("{}{}", "  ".repeat(depth), event_text(event));
                if matches!(event, JsonEvent::StartObject | JsonEvent::StartArray | JsonEvent::StartProperty(_)) {
                    depth += 1;
                }
            }
        }
    }
}

fn read_all(file: File, max_depth: usize) -> Result<Vec<JsonEvent>, WireError> {
    let mut reader = JsonEventReader::from_read(file)?.with_max_depth(max_depth);
    let mut events = Vec::new();
    while reader.has_next() {
        events.push(reader.next_event()?);
    }
    Ok(events)
}

fn scalar_text(s: &JsonScalar) -> String {
    match s {
        JsonScalar::Null => "null".to_owned(),
        JsonScalar::Bool(b) => b.to_string(),
        JsonScalar::Number(n) => n.clone(),
        JsonScalar::String(s) => format!("{:?}", s),
    }
}

fn event_text(event: &JsonEvent) -> String {
    match event {
        JsonEvent::StartObject => "StartObject".to_owned(),
        JsonEvent::EndObject => "EndObject".to_owned(),
        JsonEvent::StartArray => "StartArray".to_owned(),
        JsonEvent::EndArray => "EndArray".to_owned(),
        JsonEvent::StartProperty(name) => format!("StartProperty {}", name),
        JsonEvent::EndProperty(Some(s)) => format!("EndProperty {}", scalar_text(s)),
        JsonEvent::EndProperty(None) => "EndProperty".to_owned(),
        JsonEvent::Value(s) => format!("Value {}", scalar_text(s)),
    }
}

fn scalar_json(s: &JsonScalar) -> Value {
    match s {
        JsonScalar::Null => Value::Null,
        JsonScalar::Bool(b) => Value::Bool(*b),
        // number text is kept exactly as written
        JsonScalar::Number(n) => json!({ "number": n }),
        JsonScalar::String(s) => Value::String(s.clone()),
    }
}

fn event_json(event: &JsonEvent) -> Value {
    match event {
        JsonEvent::StartObject => json!({ "event": "start_object" }),
        JsonEvent::EndObject => json!({ "event": "end_object" }),
        JsonEvent::StartArray => json!({ "event": "start_array" }),
        JsonEvent::EndArray => json!({ "event": "end_array" }),
        JsonEvent::StartProperty(name) => json!({ "event": "start_property", "name": name }),
        JsonEvent::EndProperty(Some(s)) => json!({ "event": "end_property", "value": scalar_json(s) }),
        JsonEvent::EndProperty(None) => json!({ "event": "end_property" }),
        JsonEvent::Value(s) => json!({ "event": "value", "value": scalar_json(s) }),
    }
}
