//! Query strings end to end: decoding, option bounds and the expression
//! grammar as seen through the public API.

use odatawire_core::expr::{parse_value, Expr, ExprError};
use odatawire_core::{InlineCount, Limits, QueryError, QueryInfo};

fn parse(q: &str) -> Result<QueryInfo, QueryError> {
    QueryInfo::parse(q, &Limits::default())
}

fn literal_type(text: &str) -> Option<&'static str> {
    match parse_value(text).unwrap_or_else(|e| panic!("{}: {}", text, e)) {
        Expr::Literal { value } => value.edm_type(),
        other => panic!("{} parsed as {:?}", text, other),
    }
}

// ──────────────────────────────────────────────
// Literal classification
// ──────────────────────────────────────────────

#[test]
fn literal_types() {
    let cases = [
        ("2", Some("Edm.Int32")),
        ("2147483648", Some("Edm.Int64")),
        ("10L", Some("Edm.Int64")),
        ("2.0", Some("Edm.Double")),
        ("2f", Some("Edm.Single")),
        ("2.0f", Some("Edm.Single")),
        ("2m", Some("Edm.Decimal")),
        ("1E+10", Some("Edm.Double")),
        ("1.2E-10", Some("Edm.Double")),
        ("'it''s'", Some("Edm.String")),
        ("true", Some("Edm.Boolean")),
        ("null", None),
        ("datetime'2020-01-02T03:04:05'", Some("Edm.DateTime")),
        ("datetimeoffset'2020-01-02T03:04:05Z'", Some("Edm.DateTimeOffset")),
        ("time'13:20:00'", Some("Edm.Time")),
        ("guid'936da01f-9abd-4d9d-80c7-02af85c822a8'", Some("Edm.Guid")),
        ("X'0A'", Some("Edm.Binary")),
    ];
    for (text, expected) in cases {
        assert_eq!(literal_type(text), expected, "literal: {}", text);
    }
}

#[test]
fn integer_overflow_is_an_error() {
    assert!(matches!(
        parse_value("99999999999999999999").unwrap_err(),
        ExprError::InvalidLiteral { .. }
    ));
}

// ──────────────────────────────────────────────
// Query strings
// ──────────────────────────────────────────────

#[test]
fn encoded_options() {
    let info = parse(
        "?$filter=Name%20eq%20'foo'%20and%20Age%20gt%2010&$top=5&$skip=10&$orderby=Age%20desc,Name",
    )
    .unwrap();
    assert_eq!(
        info.filter.as_ref().map(ToString::to_string).as_deref(),
        Some("(and (eq Name 'foo') (gt Age 10))")
    );
    assert_eq!(info.top, 5);
    assert_eq!(info.skip, Some(10));
    let orderby: Vec<String> = info.orderby.iter().map(ToString::to_string).collect();
    assert_eq!(orderby, vec!["Age desc", "Name asc"]);
}

#[test]
fn plus_decodes_to_space() {
    let info = parse("$filter=Age+gt+1+and+startswith(Name,'A')").unwrap();
    assert_eq!(
        info.filter.unwrap().to_string(),
        "(and (gt Age 1) (startswith Name 'A'))"
    );
}

#[test]
fn filter_must_be_boolean() {
    match parse("$filter=Age+add+1").unwrap_err() {
        QueryError::Expression { option, source } => {
            assert_eq!(option, "$filter");
            assert!(matches!(source, ExprError::TypeMismatch { .. }));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn first_occurrence_wins() {
    assert_eq!(parse("$top=1&$top=2").unwrap().top, 1);
}

#[test]
fn bounds_on_top_skip_and_expand() {
    assert!(matches!(
        parse("$top=10001").unwrap_err(),
        QueryError::InvalidValue { ref name, .. } if name == "$top"
    ));
    assert!(matches!(
        parse("$skip=-1").unwrap_err(),
        QueryError::InvalidValue { ref name, .. } if name == "$skip"
    ));
    assert!(matches!(
        parse("$expand=_Order&$top=101").unwrap_err(),
        QueryError::InvalidValue { ref name, .. } if name == "$top"
    ));
    assert_eq!(parse("$expand=_Order&$top=100").unwrap().top, 100);
    assert!(matches!(
        parse("$expand=_a,_b,_c").unwrap_err(),
        QueryError::ExpandLimit { count: 3, max: 2 }
    ));
}

#[test]
fn configured_limits_apply() {
    let limits = Limits {
        top_default: 7,
        expand_max: 5,
        ..Limits::default()
    };
    let info = QueryInfo::parse("$expand=_a,_b,_c", &limits).unwrap();
    assert_eq!(info.top, 7);
    assert_eq!(info.expand.len(), 3);
}

#[test]
fn search_custom_and_unknown_options() {
    let info = parse("q=hello+world&mode=fast&$inlinecount=allpages&$format=json").unwrap();
    assert_eq!(info.search.as_deref(), Some("hello world"));
    assert_eq!(info.custom_options, vec![("mode".to_owned(), "fast".to_owned())]);
    assert_eq!(info.inline_count, InlineCount::AllPages);
    assert_eq!(info.format.as_deref(), Some("json"));

    assert!(matches!(
        parse("$bogus=1").unwrap_err(),
        QueryError::UnknownOption { ref name } if name == "$bogus"
    ));
    assert!(matches!(
        parse("$inlinecount=some").unwrap_err(),
        QueryError::InvalidValue { .. }
    ));
}

#[test]
fn serializes_for_tooling() {
    let info = parse("$filter=Tags/any(t:+t+eq+'x')&$select=Name,Age").unwrap();
    let v = serde_json::to_value(&info).unwrap();
    assert_eq!(v["filter"]["kind"], "aggregate");
    assert_eq!(v["filter"]["variable"], "t");
    assert_eq!(v["select"], serde_json::json!(["Name", "Age"]));
    assert_eq!(v["inline_count"], "none");
}
