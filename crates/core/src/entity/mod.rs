//! Typed entities and their schema-driven JSON parser and writer.

mod key;
mod parser;
mod validate;
mod writer;

use odatawire_edm::{CollectionKind, EdmSimpleType};
use rust_decimal::Decimal;
use time::{OffsetDateTime, Time};
use uuid::Uuid;

use crate::json::JsonError;

pub use key::EntityKey;
pub use parser::EntityParser;
pub use validate::{DATETIME_MAX, DATETIME_MIN, SYSUTCDATETIME};
pub use writer::{
    entity_uri, next_link, write_entry, write_feed, write_links, write_single_link, Continuation,
    Feed,
};

/// Schema-typed payload failures.
#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    #[error(transparent)]
    Json(#[from] JsonError),

    #[error("unknown entity set: {name}")]
    UnknownEntitySet { name: String },

    #[error("unknown property {property} for {type_name}")]
    UnknownProperty { property: String, type_name: String },

    #[error("field format error for property {property}: {reason}")]
    FieldFormat { property: String, reason: String },

    #[error("invalid value type for property {property}")]
    InvalidType { property: String },

    #[error("type {type_name} is not {entity_type} or derived from it")]
    TypeMismatch {
        type_name: String,
        entity_type: String,
    },

    #[error("unknown complex type: {name}")]
    UnknownComplexType { name: String },

    #[error("invalid __metadata: {reason}")]
    Metadata { reason: String },

    #[error("malformed entity key '{text}'")]
    MalformedKey { text: String },
}

impl EntityError {
    pub(crate) fn field_format(property: &str, reason: impl Into<String>) -> Self {
        EntityError::FieldFormat {
            property: property.to_owned(),
            reason: reason.into(),
        }
    }
}

/// A non-null EDM primitive value.
#[derive(Debug, Clone, PartialEq)]
pub enum SimpleValue {
    Binary(Vec<u8>),
    Boolean(bool),
    Byte(u8),
    /// Milliseconds since the Unix epoch, UTC.
    DateTime(i64),
    DateTimeOffset(OffsetDateTime),
    Decimal(Decimal),
    Double(f64),
    Guid(Uuid),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    SByte(i8),
    Single(f32),
    String(String),
    Time(Time),
}

impl SimpleValue {
    pub fn edm_type(&self) -> EdmSimpleType {
        match self {
            SimpleValue::Binary(_) => EdmSimpleType::Binary,
            SimpleValue::Boolean(_) => EdmSimpleType::Boolean,
            SimpleValue::Byte(_) => EdmSimpleType::Byte,
            SimpleValue::DateTime(_) => EdmSimpleType::DateTime,
            SimpleValue::DateTimeOffset(_) => EdmSimpleType::DateTimeOffset,
            SimpleValue::Decimal(_) => EdmSimpleType::Decimal,
            SimpleValue::Double(_) => EdmSimpleType::Double,
            SimpleValue::Guid(_) => EdmSimpleType::Guid,
            SimpleValue::Int16(_) => EdmSimpleType::Int16,
            SimpleValue::Int32(_) => EdmSimpleType::Int32,
            SimpleValue::Int64(_) => EdmSimpleType::Int64,
            SimpleValue::SByte(_) => EdmSimpleType::SByte,
            SimpleValue::Single(_) => EdmSimpleType::Single,
            SimpleValue::String(_) => EdmSimpleType::String,
            SimpleValue::Time(_) => EdmSimpleType::Time,
        }
    }
}

/// A property value. `None` payloads are JSON nulls.
#[derive(Debug, Clone, PartialEq)]
pub enum OValue {
    Simple {
        edm_type: EdmSimpleType,
        value: Option<SimpleValue>,
    },
    Complex {
        type_name: String,
        properties: Option<Vec<OProperty>>,
    },
    Collection {
        kind: CollectionKind,
        item_type: String,
        items: Option<Vec<OValue>>,
    },
}

impl OValue {
    pub fn is_null(&self) -> bool {
        match self {
            OValue::Simple { value, .. } => value.is_none(),
            OValue::Complex { properties, .. } => properties.is_none(),
            OValue::Collection { items, .. } => items.is_none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OProperty {
    pub name: String,
    pub value: OValue,
}

impl OProperty {
    pub fn simple(name: impl Into<String>, value: SimpleValue) -> Self {
        OProperty {
            name: name.into(),
            value: OValue::Simple {
                edm_type: value.edm_type(),
                value: Some(value),
            },
        }
    }

    pub fn null(name: impl Into<String>, edm_type: EdmSimpleType) -> Self {
        OProperty {
            name: name.into(),
            value: OValue::Simple {
                edm_type,
                value: None,
            },
        }
    }

    /// The scalar payload, if this is a non-null simple property.
    pub fn simple_value(&self) -> Option<&SimpleValue> {
        match &self.value {
            OValue::Simple { value, .. } => value.as_ref(),
            _ => None,
        }
    }
}

/// A `__deferred` navigation link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub name: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub entity_set: String,
    /// Qualified name of the entity type.
    pub entity_type: String,
    /// `None` for a create request that carries no key yet.
    pub key: Option<EntityKey>,
    pub etag: Option<String>,
    pub properties: Vec<OProperty>,
    pub links: Vec<Link>,
}

impl Entity {
    pub fn property(&self, name: &str) -> Option<&OProperty> {
        self.properties.iter().find(|p| p.name == name)
    }
}
