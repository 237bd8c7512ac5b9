use odatawire_edm::SchemaError;

use crate::entity::EntityError;
use crate::expr::ExprError;
use crate::json::JsonError;
use crate::query::QueryError;

/// Any failure raised by this crate.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error(transparent)]
    Json(#[from] JsonError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Entity(#[from] EntityError),

    #[error(transparent)]
    Expr(#[from] ExprError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// Short machine-readable category.
    pub fn kind(&self) -> &'static str {
        match self {
            WireError::Json(_) => "json",
            WireError::Schema(_) => "schema",
            WireError::Entity(_) => "entity",
            WireError::Expr(_) => "expression",
            WireError::Query(_) => "query",
            WireError::Io(_) => "io",
        }
    }

    /// Caused by request input rather than by the server. Schema failures
    /// happen at load time, and I/O failures are the server's own.
    pub fn is_client_error(&self) -> bool {
        match self {
            WireError::Json(JsonError::Io(_)) => false,
            WireError::Entity(EntityError::Json(JsonError::Io(_))) => false,
            WireError::Schema(_) | WireError::Io(_) => false,
            WireError::Json(_) | WireError::Entity(_) | WireError::Expr(_) | WireError::Query(_) => {
                true
            }
        }
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "kind":    self.kind(),
            "message": self.to_string(),
        })
    }
}
