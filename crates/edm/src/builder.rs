//! Mutable records filled in while walking the EDMX document.
//!
//! Every cross-reference is still a name here. Nothing outside this crate
//! sees these types: [`crate::resolve`] turns them into the immutable model.

use crate::types::{CollectionKind, Multiplicity, ParameterMode};

#[derive(Debug, Default)]
pub(crate) struct DataServicesBuilder {
    pub version: Option<String>,
    pub schemas: Vec<SchemaBuilder>,
}

#[derive(Debug, Default)]
pub(crate) struct SchemaBuilder {
    pub namespace: String,
    pub alias: Option<String>,
    pub entity_types: Vec<EntityTypeBuilder>,
    pub complex_types: Vec<ComplexTypeBuilder>,
    pub associations: Vec<AssociationBuilder>,
    pub containers: Vec<EntityContainerBuilder>,
}

#[derive(Debug, Default)]
pub(crate) struct EntityTypeBuilder {
    pub name: String,
    pub base_type_name: Option<String>,
    pub keys: Vec<String>,
    pub properties: Vec<PropertyBuilder>,
    pub navigation_properties: Vec<NavigationPropertyBuilder>,
    pub open: bool,
    pub is_abstract: bool,
    pub has_stream: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ComplexTypeBuilder {
    pub name: String,
    pub is_abstract: bool,
    pub properties: Vec<PropertyBuilder>,
}

#[derive(Debug, Default)]
pub(crate) struct PropertyBuilder {
    pub name: String,
    pub type_name: String,
    pub nullable: bool,
    pub collection_kind: CollectionKind,
    pub default_value: Option<String>,
    pub max_length: Option<u32>,
    pub fixed_length: Option<bool>,
    pub unicode: Option<bool>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub store_generated_pattern: Option<String>,
    pub is_declared: Option<bool>,
    pub format: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct NavigationPropertyBuilder {
    pub name: String,
    pub relationship_name: String,
    pub from_role_name: String,
    pub to_role_name: String,
}

#[derive(Debug, Default)]
pub(crate) struct AssociationBuilder {
    pub name: String,
    pub ends: Vec<AssociationEndBuilder>,
}

#[derive(Debug)]
pub(crate) struct AssociationEndBuilder {
    pub role: String,
    pub type_name: String,
    pub multiplicity: Multiplicity,
}

#[derive(Debug, Default)]
pub(crate) struct EntityContainerBuilder {
    pub name: String,
    pub is_default: bool,
    pub lazy_loading_enabled: Option<bool>,
    pub entity_sets: Vec<EntitySetBuilder>,
    pub association_sets: Vec<AssociationSetBuilder>,
    pub function_imports: Vec<FunctionImportBuilder>,
}

#[derive(Debug, Default)]
pub(crate) struct EntitySetBuilder {
    pub name: String,
    pub entity_type_name: String,
}

#[derive(Debug, Default)]
pub(crate) struct AssociationSetBuilder {
    pub name: String,
    pub association_name: String,
    pub ends: Vec<AssociationSetEndBuilder>,
}

#[derive(Debug, Default)]
pub(crate) struct AssociationSetEndBuilder {
    pub role: String,
    pub entity_set_name: String,
}

#[derive(Debug, Default)]
pub(crate) struct FunctionImportBuilder {
    pub name: String,
    pub entity_set_name: Option<String>,
    pub return_type_name: Option<String>,
    pub http_method: Option<String>,
    pub parameters: Vec<FunctionParameterBuilder>,
}

#[derive(Debug)]
pub(crate) struct FunctionParameterBuilder {
    pub name: String,
    pub type_name: String,
    pub mode: Option<ParameterMode>,
}
