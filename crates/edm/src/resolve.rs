//! Pass 2: resolve every name reference in the builder records into typed
//! ids, producing the immutable [`DataServices`].
//!
//! Everything is built before anything is resolved, so forward references
//! inside a document are fine. Any unresolved name fails the whole schema,
//! except a function import's entity set, which is dropped with a warning.

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::builder::*;
use crate::error::SchemaError;
use crate::model::*;
use crate::types::EdmSimpleType;

struct Names {
    entity_types: HashMap<String, EntityTypeId>,
    complex_types: HashMap<String, ComplexTypeId>,
    associations: HashMap<String, AssociationId>,
}

/// Qualified names a declaration is reachable under.
fn qualified(namespace: &str, alias: Option<&str>, name: &str) -> Vec<String> {
    let mut names = vec![format!("{}.{}", namespace, name)];
    if let Some(alias) = alias.filter(|a| *a != namespace) {
        names.push(format!("{}.{}", alias, name));
    }
    names
}

fn register<Id: Copy + PartialEq>(
    map: &mut HashMap<String, Id>,
    kind: &'static str,
    names: Vec<String>,
    id: Id,
) -> Result<(), SchemaError> {
    for name in names {
        match map.insert(name.clone(), id) {
            Some(existing) if existing != id => {
                return Err(SchemaError::Duplicate { kind, name });
            }
            _ => {}
        }
    }
    Ok(())
}

pub(crate) fn resolve(ds: DataServicesBuilder) -> Result<DataServices, SchemaError> {
    let names = index_names(&ds)?;

    let mut entity_types = Vec::new();
    let mut complex_types = Vec::new();
    let mut associations = Vec::new();

    // Association ends first: navigation properties bind against them.
    for schema in &ds.schemas {
        for a in &schema.associations {
            associations.push(resolve_association(schema, a, &names)?);
        }
    }

    for schema in &ds.schemas {
        for ct in &schema.complex_types {
            complex_types.push(ComplexType {
                namespace: schema.namespace.clone(),
                alias: schema.alias.clone(),
                name: ct.name.clone(),
                is_abstract: ct.is_abstract,
                properties: resolve_properties(&ct.properties, &names)?,
            });
        }
        for et in &schema.entity_types {
            entity_types.push(resolve_entity_type(schema, et, &names, &associations)?);
        }
    }

    check_base_cycles(&entity_types)?;

    let mut schemas = Vec::new();
    let (mut next_et, mut next_ct, mut next_assoc) = (0usize, 0usize, 0usize);
    for schema in &ds.schemas {
        let containers = schema
            .containers
            .iter()
            .map(|c| resolve_container(c, &names, &associations))
            .collect::<Result<Vec<_>, _>>()?;
        schemas.push(Schema {
            namespace: schema.namespace.clone(),
            alias: schema.alias.clone(),
            entity_types: (next_et..next_et + schema.entity_types.len())
                .map(EntityTypeId)
                .collect(),
            complex_types: (next_ct..next_ct + schema.complex_types.len())
                .map(ComplexTypeId)
                .collect(),
            associations: (next_assoc..next_assoc + schema.associations.len())
                .map(AssociationId)
                .collect(),
            containers,
        });
        next_et += schema.entity_types.len();
        next_ct += schema.complex_types.len();
        next_assoc += schema.associations.len();
    }

    info!(
        schemas = schemas.len(),
        entity_types = entity_types.len(),
        complex_types = complex_types.len(),
        associations = associations.len(),
        "schema resolved"
    );

    Ok(DataServices {
        version: ds.version,
        schemas,
        entity_types,
        complex_types,
        associations,
        entity_type_index: names.entity_types,
        complex_type_index: names.complex_types,
    })
}

fn index_names(ds: &DataServicesBuilder) -> Result<Names, SchemaError> {
    let mut names = Names {
        entity_types: HashMap::new(),
        complex_types: HashMap::new(),
        associations: HashMap::new(),
    };
    let (mut et, mut ct, mut assoc) = (0usize, 0usize, 0usize);
    for schema in &ds.schemas {
        let alias = schema.alias.as_deref();
        for t in &schema.entity_types {
            let q = qualified(&schema.namespace, alias, &t.name);
            register(&mut names.entity_types, "entity type", q, EntityTypeId(et))?;
            et += 1;
        }
        for t in &schema.complex_types {
            let q = qualified(&schema.namespace, alias, &t.name);
            register(&mut names.complex_types, "complex type", q, ComplexTypeId(ct))?;
            ct += 1;
        }
        for a in &schema.associations {
            let q = qualified(&schema.namespace, alias, &a.name);
            register(&mut names.associations, "association", q, AssociationId(assoc))?;
            assoc += 1;
        }
    }
    Ok(names)
}

fn resolve_association(
    schema: &SchemaBuilder,
    a: &AssociationBuilder,
    names: &Names,
) -> Result<Association, SchemaError> {
    let end = |e: &AssociationEndBuilder| -> Result<AssociationEnd, SchemaError> {
        let entity_type = names.entity_types.get(&e.type_name).copied().ok_or_else(|| {
            SchemaError::UnresolvedEntityType {
                name: e.type_name.clone(),
            }
        })?;
        Ok(AssociationEnd {
            role: e.role.clone(),
            entity_type,
            multiplicity: e.multiplicity,
        })
    };
    match a.ends.as_slice() {
        [e1, e2] => Ok(Association {
            namespace: schema.namespace.clone(),
            alias: schema.alias.clone(),
            name: a.name.clone(),
            ends: [end(e1)?, end(e2)?],
        }),
        ends => Err(SchemaError::AssociationEnds {
            association: a.name.clone(),
            found: ends.len(),
        }),
    }
}

fn resolve_properties(
    props: &[PropertyBuilder],
    names: &Names,
) -> Result<Vec<Property>, SchemaError> {
    props
        .iter()
        .map(|p| {
            let property_type = if let Some(simple) = EdmSimpleType::from_name(&p.type_name) {
                PropertyType::Simple(simple)
            } else if let Some(id) = names.complex_types.get(&p.type_name) {
                PropertyType::Complex(*id)
            } else {
                return Err(SchemaError::UnresolvedType {
                    name: p.type_name.clone(),
                });
            };
            Ok(Property {
                name: p.name.clone(),
                type_name: p.type_name.clone(),
                property_type,
                nullable: p.nullable,
                collection_kind: p.collection_kind,
                default_value: p.default_value.clone(),
                max_length: p.max_length,
                fixed_length: p.fixed_length,
                unicode: p.unicode,
                precision: p.precision,
                scale: p.scale,
                store_generated_pattern: p.store_generated_pattern.clone(),
                is_declared: p.is_declared,
                format: p.format.clone(),
            })
        })
        .collect()
}

/// Bind `from`/`to` role names against an association's two ends.
fn bind_roles(
    association: &Association,
    from: &str,
    to: &str,
) -> Result<(usize, usize), SchemaError> {
    let [e1, e2] = &association.ends;
    if e1.role == from && e2.role == to {
        Ok((0, 1))
    } else if e2.role == from && e1.role == to {
        Ok((1, 0))
    } else {
        let role = if e1.role != from && e2.role != from {
            from
        } else {
            to
        };
        Err(SchemaError::InvalidRole {
            association: association.full_name(),
            role: role.to_owned(),
        })
    }
}

fn resolve_entity_type(
    schema: &SchemaBuilder,
    et: &EntityTypeBuilder,
    names: &Names,
    associations: &[Association],
) -> Result<EntityType, SchemaError> {
    let base_type = match &et.base_type_name {
        None => None,
        Some(base) => Some(names.entity_types.get(base).copied().ok_or_else(|| {
            SchemaError::UnresolvedBaseType {
                entity_type: et.name.clone(),
                name: base.clone(),
            }
        })?),
    };

    let mut navigation_properties = Vec::new();
    for nav in &et.navigation_properties {
        let relationship = names
            .associations
            .get(&nav.relationship_name)
            .copied()
            .ok_or_else(|| SchemaError::UnresolvedAssociation {
                name: nav.relationship_name.clone(),
            })?;
        let (from_end, to_end) = bind_roles(
            &associations[relationship.0],
            &nav.from_role_name,
            &nav.to_role_name,
        )?;
        navigation_properties.push(NavigationProperty {
            name: nav.name.clone(),
            relationship,
            from_end,
            to_end,
        });
    }

    Ok(EntityType {
        namespace: schema.namespace.clone(),
        alias: schema.alias.clone(),
        name: et.name.clone(),
        base_type,
        keys: et.keys.clone(),
        properties: resolve_properties(&et.properties, names)?,
        navigation_properties,
        open: et.open,
        is_abstract: et.is_abstract,
        has_stream: et.has_stream,
    })
}

fn check_base_cycles(entity_types: &[EntityType]) -> Result<(), SchemaError> {
    for (i, start) in entity_types.iter().enumerate() {
        let mut seen = HashSet::from([i]);
        let mut cur = start.base_type;
        while let Some(EntityTypeId(id)) = cur {
            if !seen.insert(id) {
                return Err(SchemaError::BaseTypeCycle {
                    entity_type: start.full_name(),
                });
            }
            cur = entity_types[id].base_type;
        }
    }
    Ok(())
}

fn resolve_type_ref(name: &str, names: &Names) -> Result<TypeRef, SchemaError> {
    if let Some(simple) = EdmSimpleType::from_name(name) {
        return Ok(TypeRef::Simple(simple));
    }
    if let Some(id) = names.complex_types.get(name) {
        return Ok(TypeRef::Complex(*id));
    }
    if let Some(id) = names.entity_types.get(name) {
        return Ok(TypeRef::Entity(*id));
    }
    Err(SchemaError::UnresolvedType {
        name: name.to_owned(),
    })
}

fn resolve_return_type(declared: &str, names: &Names) -> Result<ReturnType, SchemaError> {
    match declared
        .strip_prefix("Collection(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => Ok(ReturnType {
            item: resolve_type_ref(inner, names)?,
            collection: true,
        }),
        None => Ok(ReturnType {
            item: resolve_type_ref(declared, names)?,
            collection: false,
        }),
    }
}

fn resolve_container(
    c: &EntityContainerBuilder,
    names: &Names,
    associations: &[Association],
) -> Result<EntityContainer, SchemaError> {
    let mut entity_sets = Vec::new();
    for set in &c.entity_sets {
        let entity_type = names
            .entity_types
            .get(&set.entity_type_name)
            .copied()
            .ok_or_else(|| SchemaError::UnresolvedEntityType {
                name: set.entity_type_name.clone(),
            })?;
        entity_sets.push(EntitySet {
            name: set.name.clone(),
            entity_type,
        });
    }

    let set_index = |owner: &str, name: &str| -> Result<usize, SchemaError> {
        entity_sets
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| SchemaError::UnresolvedEntitySet {
                owner: owner.to_owned(),
                name: name.to_owned(),
            })
    };

    let mut association_sets = Vec::new();
    for set in &c.association_sets {
        let association = names
            .associations
            .get(&set.association_name)
            .copied()
            .ok_or_else(|| SchemaError::UnresolvedAssociation {
                name: set.association_name.clone(),
            })?;
        let assoc = &associations[association.0];
        let [s1, s2] = set.ends.as_slice() else {
            return Err(SchemaError::AssociationEnds {
                association: set.name.clone(),
                found: set.ends.len(),
            });
        };
        let (end1, end2) = bind_roles(assoc, &s1.role, &s2.role)?;
        association_sets.push(AssociationSet {
            name: set.name.clone(),
            association,
            ends: [
                AssociationSetEnd {
                    role: s1.role.clone(),
                    end: end1,
                    entity_set: set_index(&set.name, &s1.entity_set_name)?,
                },
                AssociationSetEnd {
                    role: s2.role.clone(),
                    end: end2,
                    entity_set: set_index(&set.name, &s2.entity_set_name)?,
                },
            ],
        });
    }

    let mut function_imports = Vec::new();
    for f in &c.function_imports {
        let entity_set = f.entity_set_name.as_deref().and_then(|name| {
            let found = set_index(&f.name, name).ok();
            if found.is_none() {
                warn!(function_import = %f.name, entity_set = name, "entity set not found");
            }
            found
        });
        let return_type = match &f.return_type_name {
            Some(declared) => Some(resolve_return_type(declared, names)?),
            None => None,
        };
        let parameters = f
            .parameters
            .iter()
            .map(|p| {
                Ok(FunctionParameter {
                    name: p.name.clone(),
                    parameter_type: resolve_type_ref(&p.type_name, names)?,
                    mode: p.mode,
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;
        function_imports.push(FunctionImport {
            name: f.name.clone(),
            entity_set,
            return_type,
            http_method: f.http_method.clone(),
            parameters,
        });
    }

    Ok(EntityContainer {
        name: c.name.clone(),
        is_default: c.is_default,
        lazy_loading_enabled: c.lazy_loading_enabled,
        entity_sets,
        association_sets,
        function_imports,
    })
}
