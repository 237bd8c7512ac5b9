//! Shared text forms for EDM date and time values.

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, Time};

/// `HH:MM[:SS[.fffffffff]]`
pub(crate) fn parse_time(text: &str) -> Option<Time> {
    let fmt = format_description!(
        "[hour]:[minute][optional [:[second][optional [.[subsecond]]]]]"
    );
    Time::parse(text, &fmt).ok()
}

pub(crate) fn format_time(t: Time) -> String {
    let base = format!("{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second());
    if t.nanosecond() == 0 {
        return base;
    }
    let frac = format!("{:09}", t.nanosecond());
    format!("{}.{}", base, frac.trim_end_matches('0'))
}

/// ISO local date-time, `YYYY-MM-DDTHH:MM[:SS[.f]]`.
pub(crate) fn parse_local_datetime(text: &str) -> Option<PrimitiveDateTime> {
    let fmt = format_description!(
        "[year]-[month]-[day]T[hour]:[minute][optional [:[second][optional [.[subsecond]]]]]"
    );
    PrimitiveDateTime::parse(text, &fmt).ok()
}

/// ISO date-time with an optional `Z` or `±HH:MM` offset; no offset means UTC.
pub(crate) fn parse_datetime_offset(text: &str) -> Option<OffsetDateTime> {
    if let Ok(dt) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(dt);
    }
    if let Some(local) = text.strip_suffix('Z') {
        return parse_local_datetime(local).map(PrimitiveDateTime::assume_utc);
    }
    let with_offset = format_description!(
        "[year]-[month]-[day]T[hour]:[minute][optional [:[second][optional [.[subsecond]]]]][offset_hour sign:mandatory]:[offset_minute]"
    );
    if let Ok(dt) = OffsetDateTime::parse(text, &with_offset) {
        return Some(dt);
    }
    parse_local_datetime(text).map(PrimitiveDateTime::assume_utc)
}

pub(crate) fn format_rfc3339(dt: OffsetDateTime) -> String {
    dt.format(&Rfc3339).unwrap_or_else(|_| dt.to_string())
}
