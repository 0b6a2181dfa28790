use thiserror::Error;

pub type Result<T> = std::result::Result<T, EncodeError>;

/// Errors raised while turning a domain graph into a compound document.
///
/// Every variant aborts the encode call that produced it; no partial
/// document is returned.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// A value reached the encoder but no schema is registered for its type.
    #[error("no schema registered for `{type_name}` at path '{path}'")]
    SchemaNotFound {
        type_name: &'static str,
        /// Include path where the value was met; empty at the root.
        path: String,
    },

    /// A relationship description has none of data, links or meta.
    #[error("relationship '{name}' of '{resource_type}' must have data, links or meta")]
    MalformedRelationship { resource_type: String, name: String },

    /// An attribute or relationship is named `type` or `id`.
    #[error("'{resource_type}' uses reserved member name '{name}'")]
    ReservedKeyCollision { resource_type: String, name: String },

    /// A field value could not be converted to JSON.
    #[error("field '{field}' of '{resource_type}' is not representable as JSON: {source}")]
    NonSerializableValue {
        resource_type: String,
        field: String,
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
