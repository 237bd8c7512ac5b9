use std::fs::File;
use std::path::Path;

use odatawire_core::WireError;
use odatawire_edm::{DataServices, Property, PropertyType, TypeRef};
use serde_json::{json, Value};

use crate::{fail, print_json, OutputFormat};

pub(crate) fn cmd_schema(path: &Path, output: OutputFormat, quiet: bool) {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => fail(WireError::Io(e), output, quiet),
    };
    let ds = match odatawire_edm::parse_reader(file) {
        Ok(ds) => ds,
        Err(e) => fail(e, output, quiet),
    };
    let summary = summarize(&ds);
    match output {
        OutputFormat::Json => print_json(&summary, output, quiet),
        OutputFormat::Text => print_text(&summary),
    }
}

fn property_json(ds: &DataServices, p: &Property) -> Value {
    let type_name = match p.property_type {
        PropertyType::Simple(t) => t.name().to_owned(),
        PropertyType::Complex(id) => ds.complex_type(id).full_name(),
    };
    let mut v = json!({
        "name": p.name,
        "type": type_name,
        "nullable": p.nullable,
    });
    if p.collection_kind.is_collection() {
        v["collection"] = json!(p.collection_kind);
    }
    v
}

fn type_ref_name(ds: &DataServices, t: TypeRef) -> String {
    match t {
        TypeRef::Simple(t) => t.name().to_owned(),
        TypeRef::Complex(id) => ds.complex_type(id).full_name(),
        TypeRef::Entity(id) => ds.entity_type(id).full_name(),
    }
}

fn summarize(ds: &DataServices) -> Value {
    let entity_types: Vec<Value> = ds
        .entity_types()
        .map(|(id, et)| {
            let navigation: Vec<Value> = et
                .navigation_properties
                .iter()
                .map(|nav| {
                    let (target, multiplicity) = ds.navigation_target(nav);
                    json!({
                        "name": nav.name,
                        "target": ds.entity_type(target).full_name(),
                        "multiplicity": multiplicity,
                    })
                })
                .collect();
            json!({
                "name": et.full_name(),
                "base_type": et.base_type.map(|b| ds.entity_type(b).full_name()),
                "open": et.open,
                "keys": ds.keys(id),
                "properties": ds
                    .all_properties(id)
                    .into_iter()
                    .map(|p| property_json(ds, p))
                    .collect::<Vec<_>>(),
                "navigation": navigation,
            })
        })
        .collect();

    let complex_types: Vec<Value> = ds
        .complex_types()
        .map(|(_, ct)| {
            json!({
                "name": ct.full_name(),
                "properties": ct.properties.iter().map(|p| property_json(ds, p)).collect::<Vec<_>>(),
            })
        })
        .collect();

    let associations: Vec<Value> = ds
        .associations()
        .map(|(_, a)| {
            json!({
                "name": a.full_name(),
                "ends": a.ends.iter().map(|end| json!({
                    "role": end.role,
                    "type": ds.entity_type(end.entity_type).full_name(),
                    "multiplicity": end.multiplicity,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();

    let mut entity_sets = Vec::new();
    let mut function_imports = Vec::new();
    for container in ds.containers() {
        for set in &container.entity_sets {
            entity_sets.push(json!({
                "container": container.name,
                "name": set.name,
                "entity_type": ds.entity_type(set.entity_type).full_name(),
            }));
        }
        for f in &container.function_imports {
            let returns = f.return_type.map(|r| {
                let item = type_ref_name(ds, r.item);
                if r.collection {
                    format!("Collection({})", item)
                } else {
                    item
                }
            });
            function_imports.push(json!({
                "name": f.name,
                "returns": returns,
                "http_method": f.http_method,
                "parameters": f.parameters.iter().map(|p| json!({
                    "name": p.name,
                    "type": type_ref_name(ds, p.parameter_type),
                })).collect::<Vec<_>>(),
            }));
        }
    }

    json!({
        "version": ds.version(),
        "entity_types": entity_types,
        "complex_types": complex_types,
        "associations": associations,
        "entity_sets": entity_sets,
        "function_imports": function_imports,
    })
}

fn print_text(summary: &Value) {
    let list = |key: &str| summary[key].as_array().cloned().unwrap_or_default();
    for et in list("entity_types") {
        let keys: Vec<&str> = et["keys"]
            .as_array()
            .map(|k| k.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let mut header = format!("EntityType {}", et["name"].as_str().unwrap_or_default());
        if let Some(base) = et["base_type"].as_str() {
            header.push_str(&format!(" : {}", base));
        }
        if et["open"].as_bool() == Some(true) {
            header.push_str(" (open)");
        }
        println!("{}  key({})", header, keys.join(", "));
        print_properties(&et["properties"]);
        for nav in et["navigation"].as_array().into_iter().flatten() {
            println!(
                "  -> {} {}[{}]",
                nav["name"].as_str().unwrap_or_default(),
                nav["target"].as_str().unwrap_or_default(),
                nav["multiplicity"].as_str().unwrap_or_default()
            );
        }
    }
    for ct in list("complex_types") {
        println!("ComplexType {}", ct["name"].as_str().unwrap_or_default());
        print_properties(&ct["properties"]);
    }
    for a in list("associations") {
        let ends: Vec<String> = a["ends"]
            .as_array()
            .into_iter()
            .flatten()
            .map(|end| {
                format!(
                    "{}[{}]",
                    end["type"].as_str().unwrap_or_default(),
                    end["multiplicity"].as_str().unwrap_or_default()
                )
            })
            .collect();
        println!(
            "Association {} : {}",
            a["name"].as_str().unwrap_or_default(),
            ends.join(" - ")
        );
    }
    for set in list("entity_sets") {
        println!(
            "EntitySet {} : {}",
            set["name"].as_str().unwrap_or_default(),
            set["entity_type"].as_str().unwrap_or_default()
        );
    }
    for f in list("function_imports") {
        match f["returns"].as_str() {
            Some(returns) => println!(
                "FunctionImport {} -> {}",
                f["name"].as_str().unwrap_or_default(),
                returns
            ),
            None => println!("FunctionImport {}", f["name"].as_str().unwrap_or_default()),
        }
    }
}

fn print_properties(props: &Value) {
    for p in props.as_array().into_iter().flatten() {
        let collection = p["collection"]
            .as_str()
            .map(|c| format!(" ({})", c))
            .unwrap_or_default();
        let nullable = if p["nullable"].as_bool() == Some(false) {
            " not null"
        } else {
            ""
        };
        println!(
            "  {}: {}{}{}",
            p["name"].as_str().unwrap_or_default(),
            p["type"].as_str().unwrap_or_default(),
            collection,
            nullable
        );
    }
}
