/// Errors raised while reading or resolving an EDMX document.
///
/// Every variant is fatal for the schema as a whole: a document that fails
/// here must not be used to serve requests.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The XML itself is malformed.
    #[error("malformed EDMX: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An attribute could not be decoded.
    #[error("malformed EDMX attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("failed to read EDMX: {0}")]
    Io(#[from] std::io::Error),

    /// Element or attribute name bytes were not valid UTF-8.
    #[error("EDMX is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute { element: String, attribute: String },

    #[error("invalid {attribute} value '{value}' on <{element}>")]
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
    },

    /// An element appeared outside the element that must contain it.
    #[error("unexpected <{element}> inside <{parent}>")]
    UnexpectedElement { element: String, parent: String },

    #[error("association {association} must declare exactly two ends, found {found}")]
    AssociationEnds { association: String, found: usize },

    #[error("document ended inside <{element}>")]
    UnexpectedEof { element: String },

    #[error("no DataServices element found")]
    MissingDataServices,

    #[error("Invalid entity type: {name}")]
    UnresolvedEntityType { name: String },

    #[error("Invalid baseType: {name} (on {entity_type})")]
    UnresolvedBaseType { entity_type: String, name: String },

    #[error("base type cycle through {entity_type}")]
    BaseTypeCycle { entity_type: String },

    #[error("Edm-type not found: {name}")]
    UnresolvedType { name: String },

    #[error("Invalid association: {name}")]
    UnresolvedAssociation { name: String },

    #[error("Invalid role name {role} for association {association}")]
    InvalidRole { association: String, role: String },

    #[error("Invalid entity set {name} referenced by {owner}")]
    UnresolvedEntitySet { owner: String, name: String },

    #[error("duplicate {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },
}

impl SchemaError {
    pub(crate) fn missing(element: &str, attribute: &str) -> Self {
        SchemaError::MissingAttribute {
            element: element.to_owned(),
            attribute: attribute.to_owned(),
        }
    }

    pub(crate) fn invalid(element: &str, attribute: &str, value: &str) -> Self {
        SchemaError::InvalidAttribute {
            element: element.to_owned(),
            attribute: attribute.to_owned(),
            value: value.to_owned(),
        }
    }
}
