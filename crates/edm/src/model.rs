//! The resolved, immutable entity data model.
//!
//! Types, complex types and associations live in arenas owned by
//! [`DataServices`]; every cross-reference is a typed id into those arenas.
//! A resolved model is `Send + Sync` and is shared read-only between
//! request threads.

use std::collections::HashMap;

use crate::types::{CollectionKind, EdmSimpleType, Multiplicity, ParameterMode};

// ──────────────────────────────────────────────
// Ids
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityTypeId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComplexTypeId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssociationId(pub(crate) usize);

// ──────────────────────────────────────────────
// Types
// ──────────────────────────────────────────────

/// The type of a structural property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    Simple(EdmSimpleType),
    Complex(ComplexTypeId),
}

/// Any type a function import may accept or return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRef {
    Simple(EdmSimpleType),
    Complex(ComplexTypeId),
    Entity(EntityTypeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnType {
    pub item: TypeRef,
    pub collection: bool,
}

#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    /// The type name as written in the document.
    pub type_name: String,
    pub property_type: PropertyType,
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

#[derive(Debug, Clone)]
pub struct NavigationProperty {
    pub name: String,
    pub relationship: AssociationId,
    /// Index of the association end bound to `FromRole`.
    pub from_end: usize,
    /// Index of the association end bound to `ToRole`.
    pub to_end: usize,
}

#[derive(Debug, Clone)]
pub struct EntityType {
    pub namespace: String,
    pub alias: Option<String>,
    pub name: String,
    pub base_type: Option<EntityTypeId>,
    pub keys: Vec<String>,
    pub properties: Vec<Property>,
    pub navigation_properties: Vec<NavigationProperty>,
    pub open: bool,
    pub is_abstract: bool,
    pub has_stream: bool,
}

impl EntityType {
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

#[derive(Debug, Clone)]
pub struct ComplexType {
    pub namespace: String,
    pub alias: Option<String>,
    pub name: String,
    pub is_abstract: bool,
    pub properties: Vec<Property>,
}

impl ComplexType {
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    pub fn find_property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct AssociationEnd {
    pub role: String,
    pub entity_type: EntityTypeId,
    pub multiplicity: Multiplicity,
}

#[derive(Debug, Clone)]
pub struct Association {
    pub namespace: String,
    pub alias: Option<String>,
    pub name: String,
    pub ends: [AssociationEnd; 2],
}

impl Association {
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

#[derive(Debug, Clone)]
pub struct EntitySet {
    pub name: String,
    pub entity_type: EntityTypeId,
}

#[derive(Debug, Clone)]
pub struct AssociationSetEnd {
    pub role: String,
    /// Index into the association's ends.
    pub end: usize,
    /// Index into the owning container's entity sets.
    pub entity_set: usize,
}

#[derive(Debug, Clone)]
pub struct AssociationSet {
    pub name: String,
    pub association: AssociationId,
    pub ends: [AssociationSetEnd; 2],
}

#[derive(Debug, Clone)]
pub struct FunctionParameter {
    pub name: String,
    pub parameter_type: TypeRef,
    pub mode: Option<ParameterMode>,
}

#[derive(Debug, Clone)]
pub struct FunctionImport {
    pub name: String,
    /// Index into the owning container's entity sets.
    pub entity_set: Option<usize>,
    pub return_type: Option<ReturnType>,
    pub http_method: Option<String>,
    pub parameters: Vec<FunctionParameter>,
}

#[derive(Debug, Clone)]
pub struct EntityContainer {
    pub name: String,
    pub is_default: bool,
    pub lazy_loading_enabled: Option<bool>,
    pub entity_sets: Vec<EntitySet>,
    pub association_sets: Vec<AssociationSet>,
    pub function_imports: Vec<FunctionImport>,
}

impl EntityContainer {
    pub fn find_entity_set(&self, name: &str) -> Option<&EntitySet> {
        self.entity_sets.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    pub namespace: String,
    pub alias: Option<String>,
    pub entity_types: Vec<EntityTypeId>,
    pub complex_types: Vec<ComplexTypeId>,
    pub associations: Vec<AssociationId>,
    pub containers: Vec<EntityContainer>,
}

// ──────────────────────────────────────────────
// DataServices
// ──────────────────────────────────────────────

/// A fully resolved EDMX document.
#[derive(Debug, Clone)]
pub struct DataServices {
    pub(crate) version: Option<String>,
    pub(crate) schemas: Vec<Schema>,
    pub(crate) entity_types: Vec<EntityType>,
    pub(crate) complex_types: Vec<ComplexType>,
    pub(crate) associations: Vec<Association>,
    pub(crate) entity_type_index: HashMap<String, EntityTypeId>,
    pub(crate) complex_type_index: HashMap<String, ComplexTypeId>,
}

impl DataServices {
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    pub fn entity_type(&self, id: EntityTypeId) -> &EntityType {
        &self.entity_types[id.0]
    }

    pub fn complex_type(&self, id: ComplexTypeId) -> &ComplexType {
        &self.complex_types[id.0]
    }

    pub fn association(&self, id: AssociationId) -> &Association {
        &self.associations[id.0]
    }

    pub fn entity_types(&self) -> impl Iterator<Item = (EntityTypeId, &EntityType)> {
        self.entity_types
            .iter()
            .enumerate()
            .map(|(i, t)| (EntityTypeId(i), t))
    }

    pub fn complex_types(&self) -> impl Iterator<Item = (ComplexTypeId, &ComplexType)> {
        self.complex_types
            .iter()
            .enumerate()
            .map(|(i, t)| (ComplexTypeId(i), t))
    }

    pub fn associations(&self) -> impl Iterator<Item = (AssociationId, &Association)> {
        self.associations
            .iter()
            .enumerate()
            .map(|(i, a)| (AssociationId(i), a))
    }

    pub fn containers(&self) -> impl Iterator<Item = &EntityContainer> {
        self.schemas.iter().flat_map(|s| s.containers.iter())
    }

    /// Entity type by namespace- or alias-qualified name.
    pub fn find_entity_type(&self, name: &str) -> Option<EntityTypeId> {
        self.entity_type_index.get(name).copied()
    }

    /// Complex type by namespace- or alias-qualified name.
    pub fn find_complex_type(&self, name: &str) -> Option<ComplexTypeId> {
        self.complex_type_index.get(name).copied()
    }

    /// Entity set by name. The default container is searched first.
    pub fn find_entity_set(&self, name: &str) -> Option<&EntitySet> {
        let mut containers: Vec<&EntityContainer> = self.containers().collect();
        containers.sort_by_key(|c| !c.is_default);
        containers.into_iter().find_map(|c| c.find_entity_set(name))
    }

    /// Declared property, searching the base-type chain.
    pub fn find_property(&self, id: EntityTypeId, name: &str) -> Option<&Property> {
        self.base_chain(id)
            .find_map(|t| t.properties.iter().find(|p| p.name == name))
    }

    /// Navigation property, searching the base-type chain.
    pub fn find_navigation_property(
        &self,
        id: EntityTypeId,
        name: &str,
    ) -> Option<&NavigationProperty> {
        self.base_chain(id)
            .find_map(|t| t.navigation_properties.iter().find(|n| n.name == name))
    }

    /// Key property names; a derived type without its own key inherits one.
    pub fn keys(&self, id: EntityTypeId) -> &[String] {
        self.base_chain(id)
            .map(|t| t.keys.as_slice())
            .find(|k| !k.is_empty())
            .unwrap_or(&[])
    }

    /// All structural properties, base type first.
    pub fn all_properties(&self, id: EntityTypeId) -> Vec<&Property> {
        let mut chain: Vec<&EntityType> = self.base_chain(id).collect();
        chain.reverse();
        chain.into_iter().flat_map(|t| t.properties.iter()).collect()
    }

    /// Whether `derived` is `base` or inherits from it.
    pub fn is_assignable(&self, derived: EntityTypeId, base: EntityTypeId) -> bool {
        let mut cur = Some(derived);
        while let Some(id) = cur {
            if id == base {
                return true;
            }
            cur = self.entity_type(id).base_type;
        }
        false
    }

    /// Target type and multiplicity of a navigation property.
    pub fn navigation_target(&self, nav: &NavigationProperty) -> (EntityTypeId, Multiplicity) {
        let end = &self.association(nav.relationship).ends[nav.to_end];
        (end.entity_type, end.multiplicity)
    }

    fn base_chain(&self, id: EntityTypeId) -> impl Iterator<Item = &EntityType> {
        let mut cur = Some(id);
        std::iter::from_fn(move || {
            let t = self.entity_type(cur?);
            cur = t.base_type;
            Some(t)
        })
    }
}
