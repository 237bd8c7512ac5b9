//! Schema-driven parsing of verbose-JSON entity payloads.
//!
//! Every structural property is dispatched on its schema descriptor:
//! simple, complex, or a collection of either. Complex and collection
//! values recurse through the same functions, all sharing one
//! [`EntityParser`] context and one event reader.

use std::io::Read;

use odatawire_edm::{
    CollectionKind, ComplexTypeId, DataServices, EdmSimpleType, EntitySet, EntityTypeId,
    Property, PropertyType,
};
use tracing::{debug, warn};

use super::key::EntityKey;
use super::validate;
use super::{Entity, EntityError, Link, OProperty, OValue};
use crate::clock::RequestClock;
use crate::config::Limits;
use crate::json::{CharSource, JsonError, JsonEvent, JsonEventReader, JsonScalar};

const METADATA: &str = "__metadata";
const DEFERRED: &str = "__deferred";
const ENVELOPE: &str = "d";

pub struct EntityParser<'a> {
    schema: &'a DataServices,
    entity_set: &'a EntitySet,
    limits: &'a Limits,
    clock: RequestClock,
    default_key: Option<EntityKey>,
}

/// What has been read so far for the entity under construction.
struct Accum {
    entity_type: EntityTypeId,
    key: Option<EntityKey>,
    etag: Option<String>,
    properties: Vec<OProperty>,
    links: Vec<Link>,
}

impl<'a> EntityParser<'a> {
    pub fn new(
        schema: &'a DataServices,
        entity_set_name: &str,
        limits: &'a Limits,
        clock: RequestClock,
    ) -> Result<Self, EntityError> {
        let entity_set =
            schema
                .find_entity_set(entity_set_name)
                .ok_or_else(|| EntityError::UnknownEntitySet {
                    name: entity_set_name.to_owned(),
                })?;
        Ok(EntityParser {
            schema,
            entity_set,
            limits,
            clock,
            default_key: None,
        })
    }

    /// Key used when the payload carries no `__metadata.uri`.
    pub fn with_default_key(mut self, key: EntityKey) -> Self {
        self.default_key = Some(key);
        self
    }

    pub fn parse_str(&self, text: &str) -> Result<Entity, EntityError> {
        let mut reader = JsonEventReader::from_text(text)?.with_max_depth(self.limits.max_depth);
        let entity = self.parse_events(&mut reader)?;
        ensure_consumed(&reader)?;
        Ok(entity)
    }

    pub fn parse_read<R: Read>(&self, input: R) -> Result<Entity, EntityError> {
        let mut reader = JsonEventReader::from_read(input)?.with_max_depth(self.limits.max_depth);
        let entity = self.parse_events(&mut reader)?;
        ensure_consumed(&reader)?;
        Ok(entity)
    }

    /// Parse one entity from a reader positioned before its `{`.
    pub fn parse_events<S: CharSource>(
        &self,
        reader: &mut JsonEventReader<S>,
    ) -> Result<Entity, EntityError> {
        expect(reader, |e| matches!(e, JsonEvent::StartObject), "'{'")?;
        let first = reader.next_event()?;
        let enveloped = matches!(&first, JsonEvent::StartProperty(name) if name == ENVELOPE)
            && self
                .schema
                .find_property(self.entity_set.entity_type, ENVELOPE)
                .is_none();

        let acc = if enveloped {
            expect(reader, |e| matches!(e, JsonEvent::StartObject), "'{'")?;
            let acc = self.entity_body(reader, None)?;
            expect(reader, |e| matches!(e, JsonEvent::EndProperty(None)), "end of \"d\"")?;
            expect(reader, |e| matches!(e, JsonEvent::EndObject), "'}'")?;
            acc
        } else {
            self.entity_body(reader, Some(first))?
        };

        let key = acc.key.or_else(|| self.default_key.clone());
        if key.is_none() {
            debug!(entity_set = %self.entity_set.name, "no entity key; parsing as create");
        }
        Ok(Entity {
            entity_set: self.entity_set.name.clone(),
            entity_type: self.schema.entity_type(acc.entity_type).full_name(),
            key,
            etag: acc.etag,
            properties: acc.properties,
            links: acc.links,
        })
    }

    // ──────────────────────────────────────────────
    // Entity level
    // ──────────────────────────────────────────────

    /// Members of the entity object up to and including its `}`.
    fn entity_body<S: CharSource>(
        &self,
        reader: &mut JsonEventReader<S>,
        mut pending: Option<JsonEvent>,
    ) -> Result<Accum, EntityError> {
        let mut acc = Accum {
            entity_type: self.entity_set.entity_type,
            key: None,
            etag: None,
            properties: Vec::new(),
            links: Vec::new(),
        };
        loop {
            let event = match pending.take() {
                Some(event) => event,
                None => reader.next_event()?,
            };
            match event {
                JsonEvent::EndObject => return Ok(acc),
                JsonEvent::StartProperty(name) if name == METADATA => {
                    self.metadata(reader, &mut acc)?;
                }
                JsonEvent::StartProperty(name) => self.entity_property(reader, name, &mut acc)?,
                other => return Err(unexpected(reader, &other, "property or '}'")),
            }
        }
    }

    fn metadata<S: CharSource>(
        &self,
        reader: &mut JsonEventReader<S>,
        acc: &mut Accum,
    ) -> Result<(), EntityError> {
        match reader.next_event()? {
            JsonEvent::EndProperty(Some(JsonScalar::Null)) => return Ok(()),
            JsonEvent::StartObject => {}
            _ => {
                return Err(EntityError::Metadata {
                    reason: "expected an object".into(),
                })
            }
        }
        loop {
            let name = match reader.next_event()? {
                JsonEvent::EndObject => break,
                JsonEvent::StartProperty(name) => name,
                other => return Err(unexpected(reader, &other, "property or '}'")),
            };
            let text = match name.as_str() {
                "uri" | "type" | "etag" => match reader.next_event()? {
                    JsonEvent::EndProperty(Some(JsonScalar::String(s))) => s,
                    _ => {
                        return Err(EntityError::Metadata {
                            reason: format!("{} must be a string", name),
                        })
                    }
                },
                _ => {
                    skip_value(reader)?;
                    continue;
                }
            };
            match name.as_str() {
                "uri" => acc.key = Some(EntityKey::from_uri(&text)?),
                "type" => acc.entity_type = self.metadata_type(&text)?,
                _ => acc.etag = Some(text),
            }
        }
        expect(reader, |e| matches!(e, JsonEvent::EndProperty(None)), "end of __metadata")
    }

    /// `__metadata.type` must name the set's type or one derived from it.
    fn metadata_type(&self, name: &str) -> Result<EntityTypeId, EntityError> {
        let declared = self.entity_set.entity_type;
        let id = self
            .schema
            .find_entity_type(name)
            .ok_or_else(|| EntityError::Metadata {
                reason: format!("unknown entity type {}", name),
            })?;
        if !self.schema.is_assignable(id, declared) {
            return Err(EntityError::TypeMismatch {
                type_name: name.to_owned(),
                entity_type: self.schema.entity_type(declared).full_name(),
            });
        }
        Ok(id)
    }

    fn entity_property<S: CharSource>(
        &self,
        reader: &mut JsonEventReader<S>,
        name: String,
        acc: &mut Accum,
    ) -> Result<(), EntityError> {
        let schema = self.schema;
        if let Some(prop) = schema.find_property(acc.entity_type, &name) {
            let value = self.property_value(reader, prop)?;
            acc.properties.push(OProperty { name, value });
        } else if schema
            .find_navigation_property(acc.entity_type, &name)
            .is_some()
        {
            if let Some(uri) = deferred_link(reader, &name)? {
                acc.links.push(Link { name, uri });
            }
        } else if schema.entity_type(acc.entity_type).open {
            let value = self.open_value(reader, &name)?;
            acc.properties.push(OProperty { name, value });
        } else {
            return Err(EntityError::UnknownProperty {
                property: name,
                type_name: schema.entity_type(acc.entity_type).full_name(),
            });
        }
        Ok(())
    }

    /// Undeclared property of an open type: the JSON literal decides.
    fn open_value<S: CharSource>(
        &self,
        reader: &mut JsonEventReader<S>,
        name: &str,
    ) -> Result<OValue, EntityError> {
        let scalar = match reader.next_event()? {
            JsonEvent::EndProperty(Some(scalar)) => scalar,
            _ => {
                return Err(EntityError::InvalidType {
                    property: name.to_owned(),
                })
            }
        };
        let edm_type = match &scalar {
            JsonScalar::Bool(_) => EdmSimpleType::Boolean,
            JsonScalar::Number(_) => EdmSimpleType::Double,
            JsonScalar::String(_) => EdmSimpleType::String,
            JsonScalar::Null => {
                warn!(property = name, "null dynamic property coerced to Edm.String");
                EdmSimpleType::String
            }
        };
        debug!(property = name, %edm_type, "dynamic property");
        self.scalar_value(name, edm_type, scalar)
    }

    // ──────────────────────────────────────────────
    // Structural values
    // ──────────────────────────────────────────────

    /// The value of a declared property, through its closing EndProperty.
    fn property_value<S: CharSource>(
        &self,
        reader: &mut JsonEventReader<S>,
        prop: &Property,
    ) -> Result<OValue, EntityError> {
        if prop.collection_kind.is_collection() {
            return self.collection(reader, prop);
        }
        match prop.property_type {
            PropertyType::Simple(edm_type) => match reader.next_event()? {
                JsonEvent::EndProperty(Some(scalar)) => {
                    self.scalar_value(&prop.name, edm_type, scalar)
                }
                _ => Err(EntityError::InvalidType {
                    property: prop.name.clone(),
                }),
            },
            PropertyType::Complex(ct) => {
                let type_name = self.schema.complex_type(ct).full_name();
                match reader.next_event()? {
                    JsonEvent::EndProperty(Some(JsonScalar::Null)) => Ok(OValue::Complex {
                        type_name,
                        properties: None,
                    }),
                    JsonEvent::StartObject => {
                        let properties = self.complex_body(reader, ct)?;
                        expect(reader, |e| matches!(e, JsonEvent::EndProperty(None)), "end of property")?;
                        Ok(OValue::Complex {
                            type_name,
                            properties: Some(properties),
                        })
                    }
                    JsonEvent::EndProperty(Some(_)) => Err(EntityError::field_format(
                        &prop.name,
                        format!("expected a {} object", type_name),
                    )),
                    _ => Err(EntityError::InvalidType {
                        property: prop.name.clone(),
                    }),
                }
            }
        }
    }

    /// Members of a complex object up to and including its `}`.
    fn complex_body<S: CharSource>(
        &self,
        reader: &mut JsonEventReader<S>,
        ct: ComplexTypeId,
    ) -> Result<Vec<OProperty>, EntityError> {
        let complex = self.schema.complex_type(ct);
        let mut properties = Vec::new();
        loop {
            let name = match reader.next_event()? {
                JsonEvent::EndObject => return Ok(properties),
                JsonEvent::StartProperty(name) => name,
                other => return Err(unexpected(reader, &other, "property or '}'")),
            };
            let prop = complex
                .find_property(&name)
                .ok_or_else(|| EntityError::UnknownProperty {
                    property: name.clone(),
                    type_name: complex.full_name(),
                })?;
            let value = self.property_value(reader, prop)?;
            properties.push(OProperty { name, value });
        }
    }

    fn collection<S: CharSource>(
        &self,
        reader: &mut JsonEventReader<S>,
        prop: &Property,
    ) -> Result<OValue, EntityError> {
        let kind: CollectionKind = prop.collection_kind;
        let item_type = match prop.property_type {
            PropertyType::Simple(edm_type) => edm_type.name().to_owned(),
            PropertyType::Complex(ct) => self.schema.complex_type(ct).full_name(),
        };
        match reader.next_event()? {
            JsonEvent::EndProperty(Some(JsonScalar::Null)) => {
                return Ok(OValue::Collection {
                    kind,
                    item_type,
                    items: None,
                })
            }
            JsonEvent::StartArray => {}
            _ => {
                return Err(EntityError::InvalidType {
                    property: prop.name.clone(),
                })
            }
        }
        let mut items = Vec::new();
        loop {
            let event = reader.next_event()?;
            let item = match (prop.property_type, event) {
                (_, JsonEvent::EndArray) => break,
                (PropertyType::Simple(edm_type), JsonEvent::Value(scalar)) => {
                    self.scalar_value(&prop.name, edm_type, scalar)?
                }
                (PropertyType::Complex(ct), JsonEvent::StartObject) => OValue::Complex {
                    type_name: item_type.clone(),
                    properties: Some(self.complex_body(reader, ct)?),
                },
                (PropertyType::Complex(_), JsonEvent::Value(JsonScalar::Null)) => {
                    OValue::Complex {
                        type_name: item_type.clone(),
                        properties: None,
                    }
                }
                (PropertyType::Complex(_), JsonEvent::Value(_)) => {
                    return Err(EntityError::field_format(
                        &prop.name,
                        format!("collection items must be {} objects", item_type),
                    ))
                }
                _ => {
                    return Err(EntityError::InvalidType {
                        property: prop.name.clone(),
                    })
                }
            };
            items.push(item);
        }
        expect(reader, |e| matches!(e, JsonEvent::EndProperty(None)), "end of property")?;
        Ok(OValue::Collection {
            kind,
            item_type,
            items: Some(items),
        })
    }

    fn scalar_value(
        &self,
        property: &str,
        edm_type: EdmSimpleType,
        scalar: JsonScalar,
    ) -> Result<OValue, EntityError> {
        if scalar.is_null() {
            return Ok(OValue::Simple {
                edm_type,
                value: None,
            });
        }
        if !accepts(edm_type, &scalar) {
            return Err(EntityError::InvalidType {
                property: property.to_owned(),
            });
        }
        let raw = scalar.raw().unwrap_or_default();
        let value = validate::simple_value(property, edm_type, raw, self.limits, self.clock)?;
        Ok(OValue::Simple {
            edm_type,
            value: Some(value),
        })
    }
}

/// Which JSON value kinds carry each EDM type on the wire.
fn accepts(edm_type: EdmSimpleType, scalar: &JsonScalar) -> bool {
    match edm_type {
        EdmSimpleType::Boolean => matches!(scalar, JsonScalar::Bool(_)),
        EdmSimpleType::Byte
        | EdmSimpleType::SByte
        | EdmSimpleType::Int16
        | EdmSimpleType::Int32
        | EdmSimpleType::Single
        | EdmSimpleType::Double => matches!(scalar, JsonScalar::Number(_)),
        EdmSimpleType::Int64 | EdmSimpleType::Decimal => {
            matches!(scalar, JsonScalar::Number(_) | JsonScalar::String(_))
        }
        _ => matches!(scalar, JsonScalar::String(_)),
    }
}

/// `{"__deferred": {"uri": "..."}}`, or `null` for no link.
fn deferred_link<S: CharSource>(
    reader: &mut JsonEventReader<S>,
    name: &str,
) -> Result<Option<String>, EntityError> {
    let malformed = || EntityError::field_format(name, "expected a __deferred link");
    match reader.next_event()? {
        JsonEvent::EndProperty(Some(JsonScalar::Null)) => return Ok(None),
        JsonEvent::StartObject => {}
        _ => return Err(malformed()),
    }
    match reader.next_event()? {
        JsonEvent::StartProperty(p) if p == DEFERRED => {}
        JsonEvent::StartProperty(_) => {
            return Err(EntityError::field_format(name, "inline entries are not accepted"))
        }
        _ => return Err(malformed()),
    }
    expect(reader, |e| matches!(e, JsonEvent::StartObject), "'{'")?;
    let mut uri = None;
    loop {
        match reader.next_event()? {
            JsonEvent::EndObject => break,
            JsonEvent::StartProperty(p) if p == "uri" => match reader.next_event()? {
                JsonEvent::EndProperty(Some(JsonScalar::String(s))) => uri = Some(s),
                _ => return Err(malformed()),
            },
            JsonEvent::StartProperty(_) => skip_value(reader)?,
            _ => return Err(malformed()),
        }
    }
    expect(reader, |e| matches!(e, JsonEvent::EndProperty(None)), "end of __deferred")?;
    expect(reader, |e| matches!(e, JsonEvent::EndObject), "'}'")?;
    expect(reader, |e| matches!(e, JsonEvent::EndProperty(None)), "end of property")?;
    uri.map(Some).ok_or_else(malformed)
}

// ──────────────────────────────────────────────
// Event helpers
// ──────────────────────────────────────────────

/// Skip a property value, through its EndProperty.
fn skip_value<S: CharSource>(reader: &mut JsonEventReader<S>) -> Result<(), EntityError> {
    let mut depth = 0usize;
    loop {
        match reader.next_event()? {
            JsonEvent::StartObject | JsonEvent::StartArray => depth += 1,
            JsonEvent::EndObject | JsonEvent::EndArray => depth = depth.saturating_sub(1),
            JsonEvent::EndProperty(_) if depth == 0 => return Ok(()),
            _ => {}
        }
    }
}

fn expect<S: CharSource>(
    reader: &mut JsonEventReader<S>,
    want: impl Fn(&JsonEvent) -> bool,
    expected: &'static str,
) -> Result<(), EntityError> {
    let event = reader.next_event()?;
    if want(&event) {
        Ok(())
    } else {
        Err(unexpected(reader, &event, expected))
    }
}

fn unexpected<S: CharSource>(
    reader: &JsonEventReader<S>,
    event: &JsonEvent,
    expected: &'static str,
) -> EntityError {
    EntityError::Json(JsonError::Unexpected {
        state: reader.state(),
        found: format!("{:?}", event),
        expected,
    })
}

fn ensure_consumed<S: CharSource>(reader: &JsonEventReader<S>) -> Result<(), EntityError> {
    if reader.has_next() {
        return Err(EntityError::Json(JsonError::Unexpected {
            state: reader.state(),
            found: "trailing content".into(),
            expected: "end of input",
        }));
    }
    Ok(())
}
