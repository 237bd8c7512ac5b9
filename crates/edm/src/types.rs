use serde::Serialize;

/// EDM primitive types understood by the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EdmSimpleType {
    #[serde(rename = "Edm.Binary")]
    Binary,
    #[serde(rename = "Edm.Boolean")]
    Boolean,
    #[serde(rename = "Edm.Byte")]
    Byte,
    #[serde(rename = "Edm.DateTime")]
    DateTime,
    #[serde(rename = "Edm.DateTimeOffset")]
    DateTimeOffset,
    #[serde(rename = "Edm.Decimal")]
    Decimal,
    #[serde(rename = "Edm.Double")]
    Double,
    #[serde(rename = "Edm.Guid")]
    Guid,
    #[serde(rename = "Edm.Int16")]
    Int16,
    #[serde(rename = "Edm.Int32")]
    Int32,
    #[serde(rename = "Edm.Int64")]
    Int64,
    #[serde(rename = "Edm.SByte")]
    SByte,
    #[serde(rename = "Edm.Single")]
    Single,
    #[serde(rename = "Edm.String")]
    String,
    #[serde(rename = "Edm.Time")]
    Time,
}

impl EdmSimpleType {
    pub const ALL: [EdmSimpleType; 15] = [
        EdmSimpleType::Binary,
        EdmSimpleType::Boolean,
        EdmSimpleType::Byte,
        EdmSimpleType::DateTime,
        EdmSimpleType::DateTimeOffset,
        EdmSimpleType::Decimal,
        EdmSimpleType::Double,
        EdmSimpleType::Guid,
        EdmSimpleType::Int16,
        EdmSimpleType::Int32,
        EdmSimpleType::Int64,
        EdmSimpleType::SByte,
        EdmSimpleType::Single,
        EdmSimpleType::String,
        EdmSimpleType::Time,
    ];

    /// Look up a simple type by its qualified name, e.g. `Edm.Int32`.
    pub fn from_name(name: &str) -> Option<EdmSimpleType> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            EdmSimpleType::Binary => "Edm.Binary",
            EdmSimpleType::Boolean => "Edm.Boolean",
            EdmSimpleType::Byte => "Edm.Byte",
            EdmSimpleType::DateTime => "Edm.DateTime",
            EdmSimpleType::DateTimeOffset => "Edm.DateTimeOffset",
            EdmSimpleType::Decimal => "Edm.Decimal",
            EdmSimpleType::Double => "Edm.Double",
            EdmSimpleType::Guid => "Edm.Guid",
            EdmSimpleType::Int16 => "Edm.Int16",
            EdmSimpleType::Int32 => "Edm.Int32",
            EdmSimpleType::Int64 => "Edm.Int64",
            EdmSimpleType::SByte => "Edm.SByte",
            EdmSimpleType::Single => "Edm.Single",
            EdmSimpleType::String => "Edm.String",
            EdmSimpleType::Time => "Edm.Time",
        }
    }
}

impl std::fmt::Display for EdmSimpleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// `CollectionKind` facet of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CollectionKind {
    #[default]
    None,
    List,
    Bag,
}

impl CollectionKind {
    pub fn parse(s: &str) -> Option<CollectionKind> {
        match s {
            "None" => Some(CollectionKind::None),
            "List" => Some(CollectionKind::List),
            "Bag" => Some(CollectionKind::Bag),
            _ => None,
        }
    }

    pub fn is_collection(self) -> bool {
        self != CollectionKind::None
    }
}

/// Association end multiplicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Multiplicity {
    #[serde(rename = "0..1")]
    ZeroToOne,
    #[serde(rename = "1")]
    One,
    #[serde(rename = "*")]
    Many,
}

impl Multiplicity {
    pub fn parse(s: &str) -> Option<Multiplicity> {
        match s {
            "0..1" => Some(Multiplicity::ZeroToOne),
            "1" => Some(Multiplicity::One),
            "*" => Some(Multiplicity::Many),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Multiplicity::ZeroToOne => "0..1",
            Multiplicity::One => "1",
            Multiplicity::Many => "*",
        }
    }
}

/// Function-import parameter direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParameterMode {
    In,
    Out,
    InOut,
}

impl ParameterMode {
    pub fn parse(s: &str) -> Option<ParameterMode> {
        match s {
            "In" => Some(ParameterMode::In),
            "Out" => Some(ParameterMode::Out),
            "InOut" => Some(ParameterMode::InOut),
            _ => None,
        }
    }
}
