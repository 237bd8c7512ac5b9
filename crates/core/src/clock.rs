use time::OffsetDateTime;

/// The request timestamp used to expand the `SYSUTCDATETIME()` sentinel.
///
/// Captured once per request and handed to the parser, so every sentinel in
/// one payload expands to the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestClock {
    now_millis: i64,
}

impl RequestClock {
    /// Read the system clock.
    pub fn now() -> Self {
        let now = OffsetDateTime::now_utc();
        let millis = now.unix_timestamp_nanos() / 1_000_000;
        RequestClock {
            now_millis: millis as i64,
        }
    }

    pub fn fixed(now_millis: i64) -> Self {
        RequestClock { now_millis }
    }

    pub fn millis(&self) -> i64 {
        self.now_millis
    }
}
