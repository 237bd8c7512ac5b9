//! odatawire-core: the OData verbose-JSON wire format.
//!
//! Layers, bottom-up:
//!
//! - [`json`] -- character tokenizer, structural event reader, and writer
//! - [`entity`] -- schema-driven entity parser and the response envelopes
//! - [`expr`] -- the `$filter` / `$orderby` / `$select` / `$expand` language
//! - [`query`] -- system query options of a collection request
//!
//! Schemas come from `odatawire-edm`; a resolved [`DataServices`] is
//! immutable and can be shared across threads while requests are parsed.
//!
//! [`DataServices`]: odatawire_edm::DataServices

pub mod clock;
pub mod config;
pub mod entity;
pub mod error;
pub mod expr;
pub mod json;
pub mod query;
pub mod uri;

mod timefmt;

pub use clock::RequestClock;
pub use config::Limits;
pub use entity::{
    Entity, EntityError, EntityKey, EntityParser, Link, OProperty, OValue, SimpleValue,
};
pub use error::WireError;
pub use expr::{
    parse_expand, parse_filter, parse_orderby, parse_select, Expr, ExprError, Literal, OrderBy,
};
pub use query::{InlineCount, QueryError, QueryInfo};
