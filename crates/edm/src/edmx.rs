//! Pass 1: walk the EDMX element stream into builder records.
//!
//! Elements and attributes are matched by local name, so the `edmx:`, `m:`
//! and `p:` prefixes used by EDMX documents need no namespace bookkeeping.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::builder::*;
use crate::error::SchemaError;
use crate::types::{CollectionKind, Multiplicity, ParameterMode};

// ──────────────────────────────────────────────
// Element events
// ──────────────────────────────────────────────

#[derive(Debug)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
}

impl Element {
    fn from_start(e: &BytesStart<'_>) -> Result<Self, SchemaError> {
        let name = std::str::from_utf8(e.local_name().as_ref())?.to_owned();
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.local_name().as_ref())?.to_owned();
            let value = attr.unescape_value()?.into_owned();
            attrs.push((key, value));
        }
        Ok(Element { name, attrs })
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn owned(&self, key: &str) -> Option<String> {
        self.attr(key).map(str::to_owned)
    }

    fn required(&self, key: &str) -> Result<String, SchemaError> {
        self.owned(key)
            .ok_or_else(|| SchemaError::missing(&self.name, key))
    }

    fn bool_attr(&self, key: &str) -> Result<Option<bool>, SchemaError> {
        match self.attr(key) {
            None => Ok(None),
            Some("true") => Ok(Some(true)),
            Some("false") => Ok(Some(false)),
            Some(other) => Err(SchemaError::invalid(&self.name, key, other)),
        }
    }

    fn u32_attr(&self, key: &str) -> Result<Option<u32>, SchemaError> {
        match self.attr(key) {
            None => Ok(None),
            Some(v) => v
                .parse::<u32>()
                .map(Some)
                .map_err(|_| SchemaError::invalid(&self.name, key, v)),
        }
    }
}

enum XmlEvent {
    Start(Element),
    End,
    Eof,
}

struct ElementReader<'a> {
    reader: Reader<&'a [u8]>,
    /// An empty element owes its caller an End event.
    pending_end: bool,
}

impl<'a> ElementReader<'a> {
    fn new(xml: &'a str) -> Self {
        ElementReader {
            reader: Reader::from_str(xml),
            pending_end: false,
        }
    }

    fn next(&mut self) -> Result<XmlEvent, SchemaError> {
        if self.pending_end {
            self.pending_end = false;
            return Ok(XmlEvent::End);
        }
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => return Ok(XmlEvent::Start(Element::from_start(&e)?)),
                Event::Empty(e) => {
                    self.pending_end = true;
                    return Ok(XmlEvent::Start(Element::from_start(&e)?));
                }
                Event::End(_) => return Ok(XmlEvent::End),
                Event::Eof => return Ok(XmlEvent::Eof),
                _ => continue,
            }
        }
    }

    /// Next child of `parent`, or `None` once `parent` closes.
    fn child(&mut self, parent: &str) -> Result<Option<Element>, SchemaError> {
        match self.next()? {
            XmlEvent::Start(el) => {
                debug!(element = %el.name, parent, "edmx element");
                Ok(Some(el))
            }
            XmlEvent::End => Ok(None),
            XmlEvent::Eof => Err(SchemaError::UnexpectedEof {
                element: parent.to_owned(),
            }),
        }
    }

    /// Consume the remainder of an element we do not model.
    fn skip(&mut self, element: &str) -> Result<(), SchemaError> {
        let mut depth = 0usize;
        loop {
            match self.next()? {
                XmlEvent::Start(_) => depth += 1,
                XmlEvent::End if depth == 0 => return Ok(()),
                XmlEvent::End => depth -= 1,
                XmlEvent::Eof => {
                    return Err(SchemaError::UnexpectedEof {
                        element: element.to_owned(),
                    })
                }
            }
        }
    }
}

// ──────────────────────────────────────────────
// Document walk
// ──────────────────────────────────────────────

/// Read an EDMX document into unresolved builder records.
pub(crate) fn parse_edmx(xml: &str) -> Result<DataServicesBuilder, SchemaError> {
    let mut r = ElementReader::new(xml);
    let mut found: Option<DataServicesBuilder> = None;
    loop {
        match r.next()? {
            XmlEvent::Start(el) if el.name == "DataServices" => {
                let mut ds = found.take().unwrap_or_default();
                if ds.version.is_none() {
                    ds.version = el.owned("DataServiceVersion");
                }
                parse_data_services(&mut r, &mut ds)?;
                found = Some(ds);
            }
            XmlEvent::Start(_) | XmlEvent::End => {}
            XmlEvent::Eof => break,
        }
    }
    found.ok_or(SchemaError::MissingDataServices)
}

fn parse_data_services(
    r: &mut ElementReader<'_>,
    ds: &mut DataServicesBuilder,
) -> Result<(), SchemaError> {
    while let Some(el) = r.child("DataServices")? {
        if el.name == "Schema" {
            let schema = parse_schema(r, &el)?;
            ds.schemas.push(schema);
        } else {
            r.skip(&el.name)?;
        }
    }
    Ok(())
}

fn parse_schema(r: &mut ElementReader<'_>, el: &Element) -> Result<SchemaBuilder, SchemaError> {
    let mut schema = SchemaBuilder {
        namespace: el.required("Namespace")?,
        alias: el.owned("Alias"),
        ..Default::default()
    };
    while let Some(child) = r.child("Schema")? {
        match child.name.as_str() {
            "EntityType" => schema.entity_types.push(parse_entity_type(r, &child)?),
            "ComplexType" => schema.complex_types.push(parse_complex_type(r, &child)?),
            "Association" => schema.associations.push(parse_association(r, &child)?),
            "EntityContainer" => schema.containers.push(parse_container(r, &child)?),
            _ => r.skip(&child.name)?,
        }
    }
    Ok(schema)
}

fn parse_entity_type(
    r: &mut ElementReader<'_>,
    el: &Element,
) -> Result<EntityTypeBuilder, SchemaError> {
    let mut et = EntityTypeBuilder {
        name: el.required("Name")?,
        base_type_name: el.owned("BaseType"),
        open: el.bool_attr("OpenType")?.unwrap_or(false),
        is_abstract: el.bool_attr("Abstract")?.unwrap_or(false),
        has_stream: el.bool_attr("HasStream")?.unwrap_or(false),
        ..Default::default()
    };
    while let Some(child) = r.child("EntityType")? {
        match child.name.as_str() {
            "Key" => {
                while let Some(key) = r.child("Key")? {
                    if key.name == "PropertyRef" {
                        et.keys.push(key.required("Name")?);
                    }
                    r.skip(&key.name)?;
                }
            }
            "Property" => et.properties.push(parse_property(r, &child)?),
            "NavigationProperty" => {
                et.navigation_properties.push(NavigationPropertyBuilder {
                    name: child.required("Name")?,
                    relationship_name: child.required("Relationship")?,
                    from_role_name: child.required("FromRole")?,
                    to_role_name: child.required("ToRole")?,
                });
                r.skip(&child.name)?;
            }
            _ => r.skip(&child.name)?,
        }
    }
    Ok(et)
}

fn parse_complex_type(
    r: &mut ElementReader<'_>,
    el: &Element,
) -> Result<ComplexTypeBuilder, SchemaError> {
    let mut ct = ComplexTypeBuilder {
        name: el.required("Name")?,
        is_abstract: el.bool_attr("Abstract")?.unwrap_or(false),
        ..Default::default()
    };
    while let Some(child) = r.child("ComplexType")? {
        if child.name == "Property" {
            ct.properties.push(parse_property(r, &child)?);
        } else {
            r.skip(&child.name)?;
        }
    }
    Ok(ct)
}

fn parse_property(r: &mut ElementReader<'_>, el: &Element) -> Result<PropertyBuilder, SchemaError> {
    let collection_kind = match el.attr("CollectionKind") {
        None => CollectionKind::None,
        Some(v) => CollectionKind::parse(v)
            .ok_or_else(|| SchemaError::invalid(&el.name, "CollectionKind", v))?,
    };
    let max_length = match el.attr("MaxLength") {
        Some("Max") => Some(u32::MAX),
        _ => el.u32_attr("MaxLength")?,
    };
    let prop = PropertyBuilder {
        name: el.required("Name")?,
        type_name: el.required("Type")?,
        nullable: el.bool_attr("Nullable")?.unwrap_or(true),
        collection_kind,
        default_value: el.owned("DefaultValue"),
        max_length,
        fixed_length: el.bool_attr("FixedLength")?,
        unicode: el.bool_attr("Unicode")?,
        precision: el.u32_attr("Precision")?,
        scale: el.u32_attr("Scale")?,
        store_generated_pattern: el.owned("StoreGeneratedPattern"),
        is_declared: el.bool_attr("IsDeclared")?,
        format: el.owned("Format"),
    };
    r.skip(&el.name)?;
    Ok(prop)
}

fn parse_association(
    r: &mut ElementReader<'_>,
    el: &Element,
) -> Result<AssociationBuilder, SchemaError> {
    let mut assoc = AssociationBuilder {
        name: el.required("Name")?,
        ends: Vec::new(),
    };
    while let Some(child) = r.child("Association")? {
        if child.name == "End" {
            let multiplicity = child.required("Multiplicity")?;
            assoc.ends.push(AssociationEndBuilder {
                role: child.required("Role")?,
                type_name: child.required("Type")?,
                multiplicity: Multiplicity::parse(&multiplicity).ok_or_else(|| {
                    SchemaError::invalid(&child.name, "Multiplicity", &multiplicity)
                })?,
            });
        }
        r.skip(&child.name)?;
    }
    if assoc.ends.len() != 2 {
        return Err(SchemaError::AssociationEnds {
            association: assoc.name,
            found: assoc.ends.len(),
        });
    }
    Ok(assoc)
}

fn parse_container(
    r: &mut ElementReader<'_>,
    el: &Element,
) -> Result<EntityContainerBuilder, SchemaError> {
    let mut container = EntityContainerBuilder {
        name: el.required("Name")?,
        is_default: el.bool_attr("IsDefaultEntityContainer")?.unwrap_or(false),
        lazy_loading_enabled: el.bool_attr("LazyLoadingEnabled")?,
        ..Default::default()
    };
    while let Some(child) = r.child("EntityContainer")? {
        match child.name.as_str() {
            "EntitySet" => {
                container.entity_sets.push(EntitySetBuilder {
                    name: child.required("Name")?,
                    entity_type_name: child.required("EntityType")?,
                });
                r.skip(&child.name)?;
            }
            "AssociationSet" => {
                let mut set = AssociationSetBuilder {
                    name: child.required("Name")?,
                    association_name: child.required("Association")?,
                    ends: Vec::new(),
                };
                while let Some(end) = r.child("AssociationSet")? {
                    if end.name == "End" {
                        set.ends.push(AssociationSetEndBuilder {
                            role: end.required("Role")?,
                            entity_set_name: end.required("EntitySet")?,
                        });
                    }
                    r.skip(&end.name)?;
                }
                container.association_sets.push(set);
            }
            "FunctionImport" => {
                let mut import = FunctionImportBuilder {
                    name: child.required("Name")?,
                    entity_set_name: child.owned("EntitySet"),
                    return_type_name: child.owned("ReturnType"),
                    http_method: child.owned("HttpMethod"),
                    parameters: Vec::new(),
                };
                while let Some(param) = r.child("FunctionImport")? {
                    if param.name == "Parameter" {
                        let mode = match param.attr("Mode") {
                            None => None,
                            Some(m) => Some(
                                ParameterMode::parse(m)
                                    .ok_or_else(|| SchemaError::invalid(&param.name, "Mode", m))?,
                            ),
                        };
                        import.parameters.push(FunctionParameterBuilder {
                            name: param.required("Name")?,
                            type_name: param.required("Type")?,
                            mode,
                        });
                    }
                    r.skip(&param.name)?;
                }
                container.function_imports.push(import);
            }
            _ => r.skip(&child.name)?,
        }
    }
    Ok(container)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_elements_are_balanced() {
        let xml = r#"<edmx:Edmx xmlns:edmx="x"><edmx:DataServices m:DataServiceVersion="1.0" xmlns:m="y">
            <Schema Namespace="NS">
              <EntityType Name="A"><Key><PropertyRef Name="id"/></Key>
                <Property Name="id" Type="Edm.String" Nullable="false"/>
                <Property Name="n" Type="Edm.Int32"/>
              </EntityType>
              <EntityType Name="B" BaseType="NS.A"/>
            </Schema></edmx:DataServices></edmx:Edmx>"#;
        let ds = parse_edmx(xml).unwrap();
        assert_eq!(ds.version.as_deref(), Some("1.0"));
        let schema = &ds.schemas[0];
        assert_eq!(schema.entity_types.len(), 2);
        let a = &schema.entity_types[0];
        assert_eq!(a.keys, vec!["id".to_string()]);
        assert_eq!(a.properties.len(), 2);
        assert!(!a.properties[0].nullable);
        assert!(a.properties[1].nullable);
        assert_eq!(schema.entity_types[1].base_type_name.as_deref(), Some("NS.A"));
    }

    #[test]
    fn invalid_nullable_is_rejected() {
        let xml = r#"<DataServices><Schema Namespace="NS"><ComplexType Name="C">
            <Property Name="x" Type="Edm.String" Nullable="maybe"/></ComplexType></Schema></DataServices>"#;
        let err = parse_edmx(xml).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidAttribute { ref attribute, .. } if attribute == "Nullable"));
    }

    #[test]
    fn max_length_max_is_unbounded() {
        let xml = r#"<DataServices><Schema Namespace="NS"><ComplexType Name="C">
            <Property Name="x" Type="Edm.String" MaxLength="Max"/>
            <Property Name="y" Type="Edm.String" MaxLength="128"/></ComplexType></Schema></DataServices>"#;
        let ds = parse_edmx(xml).unwrap();
        let props = &ds.schemas[0].complex_types[0].properties;
        assert_eq!(props[0].max_length, Some(u32::MAX));
        assert_eq!(props[1].max_length, Some(128));
    }

    #[test]
    fn missing_data_services() {
        let err = parse_edmx("<Edmx></Edmx>").unwrap_err();
        assert!(matches!(err, SchemaError::MissingDataServices));
    }

    #[test]
    fn association_needs_two_ends() {
        let xml = r#"<DataServices><Schema Namespace="NS">
            <Association Name="R"><End Role="a" Type="NS.A" Multiplicity="1"/></Association>
            </Schema></DataServices>"#;
        let err = parse_edmx(xml).unwrap_err();
        assert!(matches!(err, SchemaError::AssociationEnds { found: 1, .. }));
    }

    #[test]
    fn unknown_elements_are_skipped() {
        let xml = r#"<DataServices><Schema Namespace="NS">
            <Documentation><Summary>text</Summary></Documentation>
            <EntityType Name="A"><Documentation/><Key><PropertyRef Name="id"/></Key>
              <Property Name="id" Type="Edm.String"><Documentation>x</Documentation></Property>
            </EntityType></Schema></DataServices>"#;
        let ds = parse_edmx(xml).unwrap();
        assert_eq!(ds.schemas[0].entity_types[0].properties.len(), 1);
    }

    #[test]
    fn truncated_document_is_an_error() {
        let err = parse_edmx(r#"<DataServices><Schema Namespace="NS"><EntityType Name="A">"#)
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnexpectedEof { .. } | SchemaError::Xml(_)
        ));
    }
}
