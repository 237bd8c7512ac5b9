//! Entity parsing and writing against the shared sales schema fixture.

use std::path::Path;

use odatawire_core::entity::{write_entry, EntityKey};
use odatawire_core::{Entity, EntityError, EntityParser, Limits, OValue, RequestClock, SimpleValue};
use odatawire_edm::{CollectionKind, DataServices, EdmSimpleType};
use rust_decimal::Decimal;
use uuid::Uuid;

const NOW: i64 = 1_700_000_000_000;

fn sales() -> DataServices {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/schema/sales.edmx");
    let file = std::fs::File::open(&path)
        .unwrap_or_else(|e| panic!("failed to open {}: {}", path.display(), e));
    odatawire_edm::parse_reader(file).unwrap()
}

fn parse(entity_set: &str, json: &str) -> Result<Entity, EntityError> {
    let schema = sales();
    let limits = Limits::default();
    EntityParser::new(&schema, entity_set, &limits, RequestClock::fixed(NOW))?.parse_str(json)
}

fn simple<'e>(entity: &'e Entity, name: &str) -> Option<&'e SimpleValue> {
    entity
        .property(name)
        .unwrap_or_else(|| panic!("missing property {}", name))
        .simple_value()
}

const CUSTOMER: &str = r#"{
  "__metadata": {
    "uri": "https://example.org/svc/Customer('c1')",
    "type": "UserData.Customer",
    "etag": "W/\"1-1700000000000\""
  },
  "__id": "c1",
  "__published": "SYSUTCDATETIME()",
  "__updated": "/Date(1000)/",
  "Name": "Ann",
  "Age": 30,
  "Rating": 4.5,
  "Balance": 1234.5,
  "Active": true,
  "Address": {"City": "Tokyo", "Zip": "100-0001", "Geo": {"Lat": 35.6, "Lng": 139.7}},
  "Tags": ["vip", "early"],
  "Contacts": [{"Kind": "mail", "Value": "ann@example.org"}],
  "Nick": "annie",
  "Score": 3,
  "Extra": null,
  "_Order": {"__deferred": {"uri": "https://example.org/svc/Customer('c1')/_Order"}}
}"#;

// ──────────────────────────────────────────────
// Declared properties
// ──────────────────────────────────────────────

#[test]
fn full_customer_payload() {
    let entity = parse("Customer", CUSTOMER).unwrap();
    assert_eq!(entity.entity_set, "Customer");
    assert_eq!(entity.entity_type, "UserData.Customer");
    assert_eq!(entity.key, Some(EntityKey::single("c1")));
    assert_eq!(entity.etag.as_deref(), Some("W/\"1-1700000000000\""));

    assert_eq!(simple(&entity, "Name"), Some(&SimpleValue::String("Ann".into())));
    assert_eq!(simple(&entity, "Age"), Some(&SimpleValue::Int32(30)));
    assert_eq!(simple(&entity, "Rating"), Some(&SimpleValue::Single(4.5)));
    assert_eq!(simple(&entity, "Balance"), Some(&SimpleValue::Double(1234.5)));
    assert_eq!(simple(&entity, "Active"), Some(&SimpleValue::Boolean(true)));

    assert_eq!(entity.links.len(), 1);
    assert_eq!(entity.links[0].name, "_Order");
    assert_eq!(
        entity.links[0].uri,
        "https://example.org/svc/Customer('c1')/_Order"
    );
}

#[test]
fn sysutcdatetime_expands_to_request_clock() {
    let entity = parse("Customer", CUSTOMER).unwrap();
    assert_eq!(simple(&entity, "__published"), Some(&SimpleValue::DateTime(NOW)));
    assert_eq!(simple(&entity, "__updated"), Some(&SimpleValue::DateTime(1000)));
}

#[test]
fn complex_and_collection_values() {
    let entity = parse("Customer", CUSTOMER).unwrap();

    match &entity.property("Address").unwrap().value {
        OValue::Complex {
            type_name,
            properties: Some(props),
        } => {
            assert_eq!(type_name, "UserData.Address");
            assert_eq!(props.len(), 3);
            match &props[2].value {
                OValue::Complex {
                    type_name,
                    properties: Some(geo),
                } => {
                    assert_eq!(type_name, "UserData.Geo");
                    assert_eq!(geo[0].simple_value(), Some(&SimpleValue::Double(35.6)));
                }
                other => panic!("unexpected Geo value: {:?}", other),
            }
        }
        other => panic!("unexpected Address value: {:?}", other),
    }

    match &entity.property("Tags").unwrap().value {
        OValue::Collection {
            kind,
            item_type,
            items: Some(items),
        } => {
            assert_eq!(*kind, CollectionKind::List);
            assert_eq!(item_type, "Edm.String");
            assert_eq!(items.len(), 2);
        }
        other => panic!("unexpected Tags value: {:?}", other),
    }

    match &entity.property("Contacts").unwrap().value {
        OValue::Collection {
            kind,
            item_type,
            items: Some(items),
        } => {
            assert_eq!(*kind, CollectionKind::Bag);
            assert_eq!(item_type, "UserData.Contact");
            assert!(matches!(&items[0], OValue::Complex { properties: Some(p), .. } if p.len() == 2));
        }
        other => panic!("unexpected Contacts value: {:?}", other),
    }
}

#[test]
fn nulls_for_every_shape() {
    let entity = parse(
        "Customer",
        r#"{"Name": null, "Address": null, "Tags": null, "Contacts": [{"Kind": "k"}, null]}"#,
    )
    .unwrap();
    assert!(entity.property("Name").unwrap().value.is_null());
    assert!(entity.property("Address").unwrap().value.is_null());
    assert!(entity.property("Tags").unwrap().value.is_null());
    match &entity.property("Contacts").unwrap().value {
        OValue::Collection {
            items: Some(items), ..
        } => {
            assert_eq!(items.len(), 2);
            assert!(!items[0].is_null());
            assert!(items[1].is_null());
        }
        other => panic!("unexpected Contacts value: {:?}", other),
    }
}

#[test]
fn empty_complex_object_is_accepted() {
    let entity = parse("Customer", r#"{"Address": {}}"#).unwrap();
    assert!(matches!(
        &entity.property("Address").unwrap().value,
        OValue::Complex { properties: Some(p), .. } if p.is_empty()
    ));
}

#[test]
fn order_wire_types() {
    let entity = parse(
        "Order",
        r#"{"__id": "o1", "Total": "12.50", "Count": "9007199254740993",
            "PlacedAt": "/Date(0)/", "Ref": "0f8fad5b-d9cb-469f-a165-70867728950e"}"#,
    )
    .unwrap();
    assert_eq!(
        simple(&entity, "Total"),
        Some(&SimpleValue::Decimal(Decimal::new(1250, 2)))
    );
    assert_eq!(
        simple(&entity, "Count"),
        Some(&SimpleValue::Int64(9_007_199_254_740_993))
    );
    assert_eq!(simple(&entity, "PlacedAt"), Some(&SimpleValue::DateTime(0)));
    assert_eq!(
        simple(&entity, "Ref"),
        Some(&SimpleValue::Guid(
            Uuid::parse_str("0f8fad5b-d9cb-469f-a165-70867728950e").unwrap()
        ))
    );
}

#[test]
fn int64_and_decimal_accept_json_numbers() {
    let entity = parse("Order", r#"{"Total": 12.5, "Count": 42}"#).unwrap();
    assert_eq!(
        simple(&entity, "Total"),
        Some(&SimpleValue::Decimal(Decimal::new(125, 1)))
    );
    assert_eq!(simple(&entity, "Count"), Some(&SimpleValue::Int64(42)));
}

// ──────────────────────────────────────────────
// Open types
// ──────────────────────────────────────────────

#[test]
fn dynamic_properties_take_their_json_kind() {
    let entity = parse(
        "Customer",
        r#"{"Nick": "x", "Score": 3, "Vip": false, "Extra": null}"#,
    )
    .unwrap();
    assert_eq!(simple(&entity, "Nick"), Some(&SimpleValue::String("x".into())));
    assert_eq!(simple(&entity, "Score"), Some(&SimpleValue::Double(3.0)));
    assert_eq!(simple(&entity, "Vip"), Some(&SimpleValue::Boolean(false)));
    assert_eq!(
        entity.property("Extra").unwrap().value,
        OValue::Simple {
            edm_type: EdmSimpleType::String,
            value: None
        }
    );
}

#[test]
fn dynamic_structured_value_is_rejected() {
    let err = parse("Customer", r#"{"Meta": {"a": 1}}"#).unwrap_err();
    assert!(matches!(err, EntityError::InvalidType { ref property } if property == "Meta"));
    let err = parse("Customer", r#"{"List": [1, 2]}"#).unwrap_err();
    assert!(matches!(err, EntityError::InvalidType { ref property } if property == "List"));
}

#[test]
fn closed_type_rejects_unknown_property() {
    let err = parse("Order", r#"{"__id": "o1", "Bogus": 1}"#).unwrap_err();
    match err {
        EntityError::UnknownProperty {
            property,
            type_name,
        } => {
            assert_eq!(property, "Bogus");
            assert_eq!(type_name, "UserData.Order");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn complex_type_rejects_unknown_member() {
    let err = parse("Customer", r#"{"Address": {"Country": "JP"}}"#).unwrap_err();
    assert!(matches!(
        err,
        EntityError::UnknownProperty { ref property, ref type_name }
            if property == "Country" && type_name == "UserData.Address"
    ));
}

// ──────────────────────────────────────────────
// Malformed values
// ──────────────────────────────────────────────

#[test]
fn malformed_value_names_the_property() {
    let err = parse("Customer", r#"{"__id": "c1", "Age": "abc"}"#).unwrap_err();
    assert!(matches!(err, EntityError::InvalidType { ref property } if property == "Age"));

    let err = parse("Customer", r#"{"Age": 1.5}"#).unwrap_err();
    assert!(matches!(err, EntityError::FieldFormat { ref property, .. } if property == "Age"));

    let err = parse("Customer", r#"{"Active": "true"}"#).unwrap_err();
    assert!(matches!(err, EntityError::InvalidType { ref property } if property == "Active"));
}

#[test]
fn out_of_range_values() {
    let err = parse("Customer", r#"{"__updated": "/Date(253402300800000)/"}"#).unwrap_err();
    assert!(matches!(err, EntityError::FieldFormat { ref property, .. } if property == "__updated"));

    let err = parse("Customer", r#"{"Rating": 123456.5}"#).unwrap_err();
    assert!(matches!(err, EntityError::FieldFormat { ref property, .. } if property == "Rating"));

    let err = parse("Customer", r#"{"Balance": 1e-320}"#).unwrap_err();
    assert!(matches!(err, EntityError::FieldFormat { ref property, .. } if property == "Balance"));
}

#[test]
fn scalar_in_complex_collection_is_rejected() {
    let err = parse("Customer", r#"{"Contacts": ["x"]}"#).unwrap_err();
    assert!(matches!(err, EntityError::FieldFormat { ref property, .. } if property == "Contacts"));
}

#[test]
fn complex_property_given_a_scalar() {
    let err = parse("Customer", r#"{"Address": "Tokyo"}"#).unwrap_err();
    assert!(matches!(err, EntityError::FieldFormat { ref property, .. } if property == "Address"));
}

#[test]
fn string_byte_cap() {
    let schema = sales();
    let limits = Limits {
        max_string_bytes: 4,
        ..Limits::default()
    };
    let parser = EntityParser::new(&schema, "Customer", &limits, RequestClock::fixed(NOW)).unwrap();
    assert!(parser.parse_str(r#"{"Name": "abcd"}"#).is_ok());
    let err = parser.parse_str(r#"{"Name": "abcde"}"#).unwrap_err();
    assert!(matches!(err, EntityError::FieldFormat { ref property, .. } if property == "Name"));
}

#[test]
fn syntax_errors_surface_as_json_errors() {
    assert!(matches!(
        parse("Customer", r#"{"Name": "a",}"#).unwrap_err(),
        EntityError::Json(_)
    ));
    assert!(matches!(
        parse("Customer", r#"{"Name": "a"}{}"#).unwrap_err(),
        EntityError::Json(_)
    ));
    assert!(matches!(
        parse("Customer", r#"["Name"]"#).unwrap_err(),
        EntityError::Json(_)
    ));
}

// ──────────────────────────────────────────────
// __metadata, keys and links
// ──────────────────────────────────────────────

#[test]
fn derived_type_from_metadata() {
    let entity = parse(
        "Order",
        r#"{"__metadata": {"type": "U.PriorityOrder"}, "__id": "o2", "Total": "1", "Priority": 3}"#,
    )
    .unwrap();
    assert_eq!(entity.entity_type, "UserData.PriorityOrder");
    assert_eq!(simple(&entity, "Priority"), Some(&SimpleValue::Int16(3)));
}

#[test]
fn derived_property_needs_derived_type() {
    let err = parse("Order", r#"{"__id": "o2", "Priority": 3}"#).unwrap_err();
    assert!(matches!(err, EntityError::UnknownProperty { ref property, .. } if property == "Priority"));
}

#[test]
fn metadata_type_outside_hierarchy() {
    let err = parse("Order", r#"{"__metadata": {"type": "UserData.Customer"}}"#).unwrap_err();
    match err {
        EntityError::TypeMismatch {
            type_name,
            entity_type,
        } => {
            assert_eq!(type_name, "UserData.Customer");
            assert_eq!(entity_type, "UserData.Order");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let err = parse("Order", r#"{"__metadata": {"type": "UserData.Nope"}}"#).unwrap_err();
    assert!(matches!(err, EntityError::Metadata { .. }));
}

#[test]
fn metadata_must_be_an_object_of_strings() {
    assert!(matches!(
        parse("Order", r#"{"__metadata": "x"}"#).unwrap_err(),
        EntityError::Metadata { .. }
    ));
    assert!(matches!(
        parse("Order", r#"{"__metadata": {"uri": 1}}"#).unwrap_err(),
        EntityError::Metadata { .. }
    ));
    // unrecognised members are skipped
    let entity = parse(
        "Order",
        r#"{"__metadata": {"media_src": {"a": [1, {"b": 2}]}, "etag": "e"}, "__id": "o"}"#,
    )
    .unwrap();
    assert_eq!(entity.etag.as_deref(), Some("e"));
}

#[test]
fn compound_key_from_metadata_uri() {
    let entity = parse(
        "Order",
        r#"{"__metadata": {"uri": "https://example.org/svc/Order(Region='eu',Id=7)"}}"#,
    )
    .unwrap();
    assert_eq!(
        entity.key,
        Some(EntityKey::Named(vec![
            ("Region".into(), SimpleValue::String("eu".into())),
            ("Id".into(), SimpleValue::Int32(7)),
        ]))
    );
}

#[test]
fn key_falls_back_to_default_then_none() {
    let schema = sales();
    let limits = Limits::default();
    let parser = EntityParser::new(&schema, "Order", &limits, RequestClock::fixed(NOW)).unwrap();
    assert_eq!(parser.parse_str(r#"{"__id": "o1"}"#).unwrap().key, None);

    let parser = parser.with_default_key(EntityKey::single("from-url"));
    assert_eq!(
        parser.parse_str(r#"{"__id": "o1"}"#).unwrap().key,
        Some(EntityKey::single("from-url"))
    );
    let entity = parser
        .parse_str(r#"{"__metadata": {"uri": "Order('in-body')"}}"#)
        .unwrap();
    assert_eq!(entity.key, Some(EntityKey::single("in-body")));
}

#[test]
fn navigation_links() {
    let entity = parse("Order", r#"{"_Customer": null}"#).unwrap();
    assert!(entity.links.is_empty());

    let err = parse("Order", r#"{"_Customer": {"__id": "c1"}}"#).unwrap_err();
    assert!(matches!(err, EntityError::FieldFormat { ref property, .. } if property == "_Customer"));

    let err = parse("Order", r#"{"_Customer": {"__deferred": {}}}"#).unwrap_err();
    assert!(matches!(err, EntityError::FieldFormat { .. }));
}

#[test]
fn d_envelope_is_unwrapped() {
    let entity = parse("Customer", r#"{"d": {"__id": "c9", "Age": 1}}"#).unwrap();
    assert_eq!(simple(&entity, "__id"), Some(&SimpleValue::String("c9".into())));
    assert_eq!(simple(&entity, "Age"), Some(&SimpleValue::Int32(1)));
}

#[test]
fn unknown_entity_set() {
    let schema = sales();
    let limits = Limits::default();
    let err = EntityParser::new(&schema, "Nope", &limits, RequestClock::now())
        .err()
        .unwrap();
    assert!(matches!(err, EntityError::UnknownEntitySet { ref name } if name == "Nope"));
}

#[test]
fn parse_read_matches_parse_str() {
    let schema = sales();
    let limits = Limits::default();
    let parser = EntityParser::new(&schema, "Customer", &limits, RequestClock::fixed(NOW)).unwrap();
    let from_str = parser.parse_str(CUSTOMER).unwrap();
    let from_read = parser.parse_read(CUSTOMER.as_bytes()).unwrap();
    assert_eq!(from_str, from_read);
}

// ──────────────────────────────────────────────
// Writer round trip
// ──────────────────────────────────────────────

#[test]
fn written_entry_parses_back_to_the_same_entity() {
    let first = parse("Customer", CUSTOMER).unwrap();
    let mut out = Vec::new();
    write_entry(&mut out, "https://example.org/svc/", &first).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with(r#"{"d":{"__metadata":{"uri":"https:\/\/example.org\/svc\/Customer('c1')""#));

    let second = parse("Customer", &text).unwrap();
    assert_eq!(first, second);
}

#[test]
fn written_derived_entry_keeps_its_type() {
    let first = parse(
        "Order",
        r#"{"__metadata": {"uri": "Order('o2')", "type": "UserData.PriorityOrder"},
            "Total": "19.99", "Count": "5", "Priority": 2}"#,
    )
    .unwrap();
    let mut out = Vec::new();
    write_entry(&mut out, "https://example.org/svc", &first).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains(r#""Total":"19.99""#));
    assert!(text.contains(r#""Count":"5""#));
    assert_eq!(parse("Order", &text).unwrap(), first);
}
