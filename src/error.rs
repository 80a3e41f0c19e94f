//! Errors raised while decoding, validating and compiling a scheme.

#[derive(Debug, thiserror::Error)]
pub enum SchemeError {
    #[error("duplicate entities in scheme: '{0}'")]
    DuplicateEntities(String),
    #[error("duplicate attributes in an entity: '{table}.{attribute}'")]
    DuplicateAttributes { table: String, attribute: String },
    #[error("unknown attribute type: '{table}.{attribute}'")]
    UnknownAttributeType { table: String, attribute: String },
    #[error("unknown attribute constraint {code} on '{table}.{attribute}'")]
    UnknownConstraint {
        table: String,
        attribute: String,
        code: i64,
    },
    #[error("entity or attribute does not exist: {0}")]
    InvalidRelationshipDestination(String),
    #[error("no scheme present")]
    NoScheme,
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("malformed scheme: {0}")]
    Json(#[from] serde_json::Error),
}
