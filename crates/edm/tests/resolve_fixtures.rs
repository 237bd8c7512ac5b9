//! Resolution tests over the shared EDMX fixtures and hand-written
//! failure documents.

use std::path::{Path, PathBuf};

use odatawire_edm::{
    CollectionKind, DataServices, EdmSimpleType, Multiplicity, PropertyType, SchemaError, TypeRef,
};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures/schema")
        .join(name)
}

fn sales() -> DataServices {
    let file = std::fs::File::open(fixture("sales.edmx")).unwrap();
    odatawire_edm::parse_reader(file).unwrap()
}

/// Wrap schema body XML in the EDMX envelope.
fn doc(body: &str) -> String {
    format!(
        r#"<edmx:Edmx xmlns:edmx="http://schemas.microsoft.com/ado/2007/06/edmx">
<edmx:DataServices><Schema Namespace="NS">{}</Schema></edmx:DataServices></edmx:Edmx>"#,
        body
    )
}

// ──────────────────────────────────────────────
// Resolved fixture
// ──────────────────────────────────────────────

#[test]
fn sales_fixture_resolves() {
    let ds = sales();
    assert_eq!(ds.version(), Some("1.0"));
    assert_eq!(ds.schemas().len(), 1);
    assert_eq!(ds.entity_types().count(), 3);
    assert_eq!(ds.complex_types().count(), 3);
    assert_eq!(ds.associations().count(), 1);
}

#[test]
fn customer_properties_and_facets() {
    let ds = sales();
    let customer = ds.find_entity_type("UserData.Customer").unwrap();
    let et = ds.entity_type(customer);
    assert!(et.open);
    assert_eq!(ds.keys(customer), ["__id".to_string()]);

    let id = ds.find_property(customer, "__id").unwrap();
    assert!(!id.nullable);
    assert_eq!(id.default_value.as_deref(), Some("UUID()"));
    assert!(id.format.as_deref().unwrap().starts_with("regEx("));

    let published = ds.find_property(customer, "__published").unwrap();
    assert_eq!(
        published.property_type,
        PropertyType::Simple(EdmSimpleType::DateTime)
    );
    assert_eq!(published.precision, Some(3));

    let tags = ds.find_property(customer, "Tags").unwrap();
    assert_eq!(tags.collection_kind, CollectionKind::List);

    let contacts = ds.find_property(customer, "Contacts").unwrap();
    let contact = ds.find_complex_type("UserData.Contact").unwrap();
    assert_eq!(contacts.property_type, PropertyType::Complex(contact));
    assert_eq!(contacts.collection_kind, CollectionKind::Bag);
}

#[test]
fn nested_complex_types_resolve() {
    let ds = sales();
    let address = ds.find_complex_type("U.Address").unwrap();
    let geo = ds.find_complex_type("UserData.Geo").unwrap();
    let ct = ds.complex_type(address);
    assert_eq!(ct.full_name(), "UserData.Address");
    assert_eq!(
        ct.find_property("Geo").unwrap().property_type,
        PropertyType::Complex(geo)
    );
    assert_eq!(ct.find_property("Zip").unwrap().max_length, Some(16));
}

#[test]
fn navigation_properties_bind_both_ends() {
    let ds = sales();
    let customer = ds.find_entity_type("UserData.Customer").unwrap();
    let order = ds.find_entity_type("UserData.Order").unwrap();

    let nav = ds.find_navigation_property(customer, "_Order").unwrap();
    assert_eq!((nav.from_end, nav.to_end), (0, 1));
    assert_eq!(ds.navigation_target(nav), (order, Multiplicity::Many));

    let back = ds.find_navigation_property(order, "_Customer").unwrap();
    assert_eq!((back.from_end, back.to_end), (1, 0));
    assert_eq!(back.relationship, nav.relationship);
    assert_eq!(ds.navigation_target(back), (customer, Multiplicity::ZeroToOne));
}

#[test]
fn derived_type_inherits_properties_keys_and_navigation() {
    let ds = sales();
    let order = ds.find_entity_type("UserData.Order").unwrap();
    let priority = ds.find_entity_type("UserData.PriorityOrder").unwrap();
    assert_eq!(ds.entity_type(priority).base_type, Some(order));
    assert_eq!(ds.keys(priority), ["__id".to_string()]);
    assert!(ds.find_property(priority, "Total").is_some());
    assert!(ds.find_property(priority, "Priority").is_some());
    assert!(ds.find_property(order, "Priority").is_none());
    assert!(ds.find_navigation_property(priority, "_Customer").is_some());

    let names: Vec<&str> = ds
        .all_properties(priority)
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(names.first(), Some(&"__id"));
    assert_eq!(names.last(), Some(&"Priority"));
}

#[test]
fn container_sets_and_function_imports() {
    let ds = sales();
    let container = ds.containers().next().unwrap();
    assert!(container.is_default);
    assert_eq!(container.entity_sets.len(), 2);

    let assoc_set = &container.association_sets[0];
    assert_eq!(container.entity_sets[assoc_set.ends[0].entity_set].name, "Customer");
    assert_eq!(container.entity_sets[assoc_set.ends[1].entity_set].name, "Order");
    assert_eq!(assoc_set.ends[1].end, 1);

    let top = &container.function_imports[0];
    let customer = ds.find_entity_type("UserData.Customer").unwrap();
    let rt = top.return_type.unwrap();
    assert!(rt.collection);
    assert_eq!(rt.item, TypeRef::Entity(customer));
    assert_eq!(top.http_method.as_deref(), Some("GET"));
    assert_eq!(
        top.parameters[0].parameter_type,
        TypeRef::Simple(EdmSimpleType::Int32)
    );
    assert_eq!(container.entity_sets[top.entity_set.unwrap()].name, "Customer");

    let ping = &container.function_imports[1];
    assert_eq!(
        ping.return_type.unwrap().item,
        TypeRef::Simple(EdmSimpleType::String)
    );
    assert!(ping.entity_set.is_none());
}

#[test]
fn resolved_schema_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DataServices>();
}

// ──────────────────────────────────────────────
// Resolution failures
// ──────────────────────────────────────────────

const TWO_TYPES: &str = r#"
  <EntityType Name="A"><Key><PropertyRef Name="id"/></Key><Property Name="id" Type="Edm.String"/></EntityType>
  <EntityType Name="B"><Key><PropertyRef Name="id"/></Key><Property Name="id" Type="Edm.String"/></EntityType>
  <Association Name="AB">
    <End Role="a" Type="NS.A" Multiplicity="1"/>
    <End Role="b" Type="NS.B" Multiplicity="*"/>
  </Association>"#;

#[test]
fn navigation_role_mismatch_fails_resolution() {
    let xml = doc(&format!(
        r#"{}<EntityType Name="C"><NavigationProperty Name="x" Relationship="NS.AB" FromRole="a" ToRole="z"/></EntityType>"#,
        TWO_TYPES
    ));
    match odatawire_edm::parse_str(&xml) {
        Err(SchemaError::InvalidRole { association, role }) => {
            assert_eq!(association, "NS.AB");
            assert_eq!(role, "z");
        }
        other => panic!("expected InvalidRole, got {:?}", other),
    }
}

#[test]
fn navigation_unknown_relationship_fails_resolution() {
    let xml = doc(&format!(
        r#"{}<EntityType Name="C"><NavigationProperty Name="x" Relationship="NS.Nope" FromRole="a" ToRole="b"/></EntityType>"#,
        TWO_TYPES
    ));
    assert!(matches!(
        odatawire_edm::parse_str(&xml),
        Err(SchemaError::UnresolvedAssociation { name }) if name == "NS.Nope"
    ));
}

#[test]
fn entity_set_with_unknown_type_fails() {
    let xml = doc(
        r#"<EntityContainer Name="C"><EntitySet Name="S" EntityType="NS.Missing"/></EntityContainer>"#,
    );
    assert!(matches!(
        odatawire_edm::parse_str(&xml),
        Err(SchemaError::UnresolvedEntityType { name }) if name == "NS.Missing"
    ));
}

#[test]
fn unknown_base_type_fails() {
    let xml = doc(r#"<EntityType Name="A" BaseType="NS.Ghost"/>"#);
    assert!(matches!(
        odatawire_edm::parse_str(&xml),
        Err(SchemaError::UnresolvedBaseType { .. })
    ));
}

#[test]
fn unknown_property_type_fails() {
    let xml = doc(r#"<EntityType Name="A"><Property Name="p" Type="NS.Ghost"/></EntityType>"#);
    assert!(matches!(
        odatawire_edm::parse_str(&xml),
        Err(SchemaError::UnresolvedType { name }) if name == "NS.Ghost"
    ));
}

#[test]
fn association_end_with_unknown_type_fails() {
    let xml = doc(
        r#"<Association Name="R"><End Role="a" Type="NS.A" Multiplicity="1"/><End Role="b" Type="NS.B" Multiplicity="1"/></Association>"#,
    );
    assert!(matches!(
        odatawire_edm::parse_str(&xml),
        Err(SchemaError::UnresolvedEntityType { .. })
    ));
}

#[test]
fn association_set_with_unknown_entity_set_fails() {
    let xml = doc(&format!(
        r#"{}<EntityContainer Name="C">
             <EntitySet Name="As" EntityType="NS.A"/>
             <AssociationSet Name="S" Association="NS.AB">
               <End Role="a" EntitySet="As"/><End Role="b" EntitySet="Bs"/>
             </AssociationSet></EntityContainer>"#,
        TWO_TYPES
    ));
    assert!(matches!(
        odatawire_edm::parse_str(&xml),
        Err(SchemaError::UnresolvedEntitySet { owner, name }) if owner == "S" && name == "Bs"
    ));
}

#[test]
fn association_set_with_wrong_role_fails() {
    let xml = doc(&format!(
        r#"{}<EntityContainer Name="C">
             <EntitySet Name="As" EntityType="NS.A"/><EntitySet Name="Bs" EntityType="NS.B"/>
             <AssociationSet Name="S" Association="NS.AB">
               <End Role="a" EntitySet="As"/><End Role="q" EntitySet="Bs"/>
             </AssociationSet></EntityContainer>"#,
        TWO_TYPES
    ));
    assert!(matches!(
        odatawire_edm::parse_str(&xml),
        Err(SchemaError::InvalidRole { .. })
    ));
}

#[test]
fn function_import_with_unknown_return_type_fails() {
    let xml = doc(
        r#"<EntityContainer Name="C"><FunctionImport Name="f" ReturnType="Collection(NS.Ghost)"/></EntityContainer>"#,
    );
    assert!(matches!(
        odatawire_edm::parse_str(&xml),
        Err(SchemaError::UnresolvedType { .. })
    ));
}

#[test]
fn function_import_with_unknown_entity_set_has_no_set() {
    let xml = doc(
        r#"<EntityType Name="A"><Key><PropertyRef Name="id"/></Key><Property Name="id" Type="Edm.Int32"/></EntityType>
           <EntityContainer Name="C"><EntitySet Name="As" EntityType="NS.A"/>
             <FunctionImport Name="f" EntitySet="Ghosts" ReturnType="Collection(NS.A)"/></EntityContainer>"#,
    );
    let ds = odatawire_edm::parse_str(&xml).unwrap();
    let f = &ds.containers().next().unwrap().function_imports[0];
    assert_eq!(f.name, "f");
    assert_eq!(f.entity_set, None);
    assert!(f.return_type.unwrap().collection);
}

#[test]
fn alias_equal_to_namespace_registers_once() {
    let xml = r#"<edmx:Edmx xmlns:edmx="http://schemas.microsoft.com/ado/2007/06/edmx">
<edmx:DataServices><Schema Namespace="UserData" Alias="UserData">
  <EntityType Name="Box"><Key><PropertyRef Name="id"/></Key><Property Name="id" Type="Edm.String"/></EntityType>
  <EntityContainer Name="C"><EntitySet Name="Boxes" EntityType="UserData.Box"/></EntityContainer>
</Schema></edmx:DataServices></edmx:Edmx>"#;
    let ds = odatawire_edm::parse_str(xml).unwrap();
    let boxes = ds.find_entity_set("Boxes").unwrap();
    assert_eq!(ds.find_entity_type("UserData.Box"), Some(boxes.entity_type));
}

#[test]
fn same_name_twice_in_a_schema_is_a_duplicate() {
    let xml = doc(
        r#"<EntityType Name="A"><Key><PropertyRef Name="id"/></Key><Property Name="id" Type="Edm.Int32"/></EntityType>
           <EntityType Name="A"><Key><PropertyRef Name="id"/></Key><Property Name="id" Type="Edm.Int32"/></EntityType>"#,
    );
    assert!(matches!(
        odatawire_edm::parse_str(&xml),
        Err(SchemaError::Duplicate { name, .. }) if name == "NS.A"
    ));
}

#[test]
fn invalid_multiplicity_is_rejected() {
    let xml = doc(
        r#"<Association Name="R"><End Role="a" Type="NS.A" Multiplicity="many"/><End Role="b" Type="NS.A" Multiplicity="1"/></Association>"#,
    );
    assert!(matches!(
        odatawire_edm::parse_str(&xml),
        Err(SchemaError::InvalidAttribute { attribute, .. }) if attribute == "Multiplicity"
    ));
}

#[test]
fn forward_references_resolve() {
    let xml = doc(
        r#"<EntityType Name="Late" BaseType="NS.Early"><Property Name="c" Type="NS.Shape"/></EntityType>
           <EntityType Name="Early"><Key><PropertyRef Name="id"/></Key><Property Name="id" Type="Edm.Int32"/></EntityType>
           <ComplexType Name="Shape"><Property Name="sides" Type="Edm.Int32"/></ComplexType>"#,
    );
    let ds = odatawire_edm::parse_str(&xml).unwrap();
    let late = ds.find_entity_type("NS.Late").unwrap();
    assert_eq!(ds.keys(late), ["id".to_string()]);
}

#[test]
fn malformed_xml_is_a_schema_error() {
    let err = odatawire_edm::parse_str("<DataServices><Schema Namespace=\"NS\"></Oops>").unwrap_err();
    assert!(matches!(err, SchemaError::Xml(_) | SchemaError::UnexpectedEof { .. }));
}
