mod entry;
mod events;
mod expr;
mod query;
mod schema;

pub(crate) use entry::{cmd_entry, cmd_next, EntryRequest};
pub(crate) use events::cmd_events;
pub(crate) use expr::{cmd_filter, cmd_orderby};
pub(crate) use query::cmd_query;
pub(crate) use schema::cmd_schema;
