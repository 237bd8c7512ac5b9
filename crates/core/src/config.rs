//! Size and paging limits applied while parsing payloads and query options.
//!
//! Every field has a default, so a partial `[limits]` table is enough:
//!
//! ```toml
//! [limits]
//! top_max = 500
//! expand_max = 5
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Byte cap for `Edm.String` property values.
    pub max_string_bytes: usize,
    /// Upper bound for `$top`.
    pub top_max: u32,
    /// Upper bound for `$skip`.
    pub skip_max: u32,
    /// Upper bound for `$top` when `$expand` is present.
    pub top_max_with_expand: u32,
    /// Maximum number of `$expand` navigation properties.
    pub expand_max: usize,
    /// `$top` applied when the query does not carry one.
    pub top_default: u32,
    /// Maximum byte length of the `q` full-text option.
    pub search_max_bytes: usize,
    /// Maximum JSON nesting depth of a request body.
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_string_bytes: 51_200,
            top_max: 10_000,
            skip_max: 100_000,
            top_max_with_expand: 100,
            expand_max: 2,
            top_default: 25,
            search_max_bytes: 255,
            max_depth: crate::json::DEFAULT_MAX_DEPTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let limits: Limits = serde_json::from_str(r#"{"top_max": 50}"#).unwrap();
        assert_eq!(limits.top_max, 50);
        assert_eq!(limits.skip_max, 100_000);
        assert_eq!(limits.max_string_bytes, 51_200);
    }
}
