//! odatawire-edm: EDMX schema reader and resolved entity data model.
//!
//! Reading a schema runs two passes:
//!
//! 1. [`edmx`] walks the XML element stream into mutable builder records
//!    that still refer to each other by name.
//! 2. [`resolve`] turns every name into a typed id and freezes the result
//!    into a [`DataServices`].
//!
//! Only the resolved form is public. It is immutable and safe to share
//! between threads.

mod builder;
mod edmx;
pub mod error;
pub mod model;
mod resolve;
pub mod types;

use std::io::Read;

pub use error::SchemaError;
pub use model::{
    Association, AssociationEnd, AssociationId, AssociationSet, AssociationSetEnd, ComplexType,
    ComplexTypeId, DataServices, EntityContainer, EntitySet, EntityType, EntityTypeId,
    FunctionImport, FunctionParameter, NavigationProperty, Property, PropertyType, ReturnType,
    Schema, TypeRef,
};
pub use types::{CollectionKind, EdmSimpleType, Multiplicity, ParameterMode};

/// Parse and resolve an EDMX document.
pub fn parse_str(xml: &str) -> Result<DataServices, SchemaError> {
    let built = edmx::parse_edmx(xml)?;
    resolve::resolve(built)
}

/// Parse and resolve an EDMX document from any reader.
pub fn parse_reader<R: Read>(mut reader: R) -> Result<DataServices, SchemaError> {
    let mut xml = String::new();
    reader.read_to_string(&mut xml)?;
    parse_str(&xml)
}
