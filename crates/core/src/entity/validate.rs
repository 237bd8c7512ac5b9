//! Per-type checks on raw property text, followed by conversion into a
//! [`SimpleValue`].

use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use odatawire_edm::EdmSimpleType;
use rust_decimal::Decimal;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{EntityError, SimpleValue};
use crate::clock::RequestClock;
use crate::config::Limits;
use crate::timefmt;

/// Property text replaced by the request timestamp.
pub const SYSUTCDATETIME: &str = "SYSUTCDATETIME()";
/// 1753-01-01T00:00:00.000Z
pub const DATETIME_MIN: i64 = -6_847_804_800_000;
/// 9999-12-31T23:59:59.999Z
pub const DATETIME_MAX: i64 = 253_402_300_799_999;

const DOUBLE_MIN: f64 = 2.23e-308;
const DOUBLE_MAX: f64 = 1.79e308;

/// `/Date(<millis>)/`
pub(crate) fn parse_date_envelope(raw: &str) -> Option<i64> {
    raw.strip_prefix("/Date(")?
        .strip_suffix(")/")?
        .parse::<i64>()
        .ok()
}

pub(crate) fn date_envelope(millis: i64) -> String {
    format!("/Date({})/", millis)
}

/// `-?[0-9]{1,5}\.[0-9]{1,5}`
fn is_single_with_fraction(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    let Some((int, frac)) = digits.split_once('.') else {
        return false;
    };
    let ok = |s: &str| (1..=5).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit());
    ok(int) && ok(frac)
}

/// Validate `raw` against `edm_type` and convert it.
pub(crate) fn simple_value(
    property: &str,
    edm_type: EdmSimpleType,
    raw: &str,
    limits: &Limits,
    clock: RequestClock,
) -> Result<SimpleValue, EntityError> {
    let bad = |reason: &str| EntityError::field_format(property, format!("{} ({})", reason, raw));
    let value = match edm_type {
        EdmSimpleType::Boolean => match raw {
            "true" => SimpleValue::Boolean(true),
            "false" => SimpleValue::Boolean(false),
            _ => return Err(bad("not a boolean")),
        },
        EdmSimpleType::String => {
            if raw.len() > limits.max_string_bytes {
                return Err(EntityError::field_format(
                    property,
                    format!(
                        "string of {} bytes exceeds {}",
                        raw.len(),
                        limits.max_string_bytes
                    ),
                ));
            }
            SimpleValue::String(raw.to_owned())
        }
        EdmSimpleType::DateTime => {
            if raw == SYSUTCDATETIME {
                SimpleValue::DateTime(clock.millis())
            } else {
                let millis = parse_date_envelope(raw).ok_or_else(|| bad("not a /Date(n)/ value"))?;
                if !(DATETIME_MIN..=DATETIME_MAX).contains(&millis) {
                    return Err(bad("date out of range"));
                }
                SimpleValue::DateTime(millis)
            }
        }
        EdmSimpleType::Single => {
            if raw.contains('.') && !is_single_with_fraction(raw) {
                return Err(bad("too many digits for Edm.Single"));
            }
            match raw.parse::<f32>() {
                Ok(v) if v.is_finite() => SimpleValue::Single(v),
                _ => return Err(bad("not a single")),
            }
        }
        EdmSimpleType::Double => {
            let v = raw.parse::<f64>().map_err(|_| bad("not a double"))?;
            if v != 0.0 && !(DOUBLE_MIN..=DOUBLE_MAX).contains(&v.abs()) {
                return Err(bad("double out of range"));
            }
            SimpleValue::Double(v)
        }
        EdmSimpleType::Int32 => SimpleValue::Int32(raw.parse().map_err(|_| bad("not an Int32"))?),
        EdmSimpleType::Int16 => SimpleValue::Int16(raw.parse().map_err(|_| bad("not an Int16"))?),
        EdmSimpleType::Int64 => SimpleValue::Int64(raw.parse().map_err(|_| bad("not an Int64"))?),
        EdmSimpleType::Byte => SimpleValue::Byte(raw.parse().map_err(|_| bad("not a Byte"))?),
        EdmSimpleType::SByte => SimpleValue::SByte(raw.parse().map_err(|_| bad("not an SByte"))?),
        EdmSimpleType::Decimal => SimpleValue::Decimal(
            Decimal::from_str(raw)
                .or_else(|_| Decimal::from_scientific(raw))
                .map_err(|_| bad("not a decimal"))?,
        ),
        EdmSimpleType::Guid => {
            SimpleValue::Guid(Uuid::parse_str(raw).map_err(|_| bad("not a guid"))?)
        }
        EdmSimpleType::Binary => {
            SimpleValue::Binary(BASE64.decode(raw).map_err(|_| bad("not base64"))?)
        }
        EdmSimpleType::DateTimeOffset => SimpleValue::DateTimeOffset(
            OffsetDateTime::parse(raw, &Rfc3339).map_err(|_| bad("not an RFC 3339 timestamp"))?,
        ),
        EdmSimpleType::Time => {
            SimpleValue::Time(timefmt::parse_time(raw).ok_or_else(|| bad("not a time of day"))?)
        }
    };
    Ok(value)
}
