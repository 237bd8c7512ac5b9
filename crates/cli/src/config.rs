//! Settings file for `odw --config`.
//!
//! ```toml
//! [service]
//! base_uri = "https://example.org/svc"
//!
//! [limits]
//! top_max = 500
//! expand_max = 5
//! max_string_bytes = 1024
//! ```
//!
//! Both tables are optional. Unset limits keep their defaults.

use std::path::Path;

use odatawire_core::Limits;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    pub service: ServiceConfig,
    pub limits: Limits,
}

/// `[service]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ServiceConfig {
    /// Service root used to build entity and `__next` URIs.
    pub base_uri: Option<String>,
}

pub(crate) fn load(path: &Path) -> Result<Config, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    toml::from_str(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
}
