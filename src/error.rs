//! Error types for schema construction and transformation.
//!
//! Everything raised while building, mapping, healing or wiring a schema is a
//! [`SchemaError`]. Failures inside resolvers at request time are a separate
//! [`ResolverError`](crate::graph::ResolverError) and never abort a build.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    // ─── Configuration ───
    #[error("{0}")]
    Configuration(String),

    #[error("Syntax error in {location}: {message}")]
    Syntax { location: String, message: String },

    // ─── Schema validation ───
    #[error("Duplicate schema type name {0}")]
    DuplicateTypeName(String),

    #[error("\"{0}\" defined in resolvers, but not in schema")]
    UnknownType(String),

    #[error("{type_name}.{field_name} defined in resolvers, but not in schema")]
    UnknownField {
        type_name: String,
        field_name: String,
    },

    #[error("Type \"{0}\" is missing a \"__resolveType\" resolver. Pass 'ignore' into \"resolverValidationOptions.requireResolversForResolveType\" to disable this error.")]
    MissingResolveType(String),

    #[error("Resolver missing for \"{hint}\".\nTo disable this validator, use:\n  resolverValidationOptions: {{\n    {validator}: 'ignore'\n  }}")]
    MissingResolver { hint: String, validator: String },

    #[error("{0}")]
    Validation(String),

    // ─── Values ───
    #[error("Invalid default value for {location}: {message}")]
    InvalidDefaultValue { location: String, message: String },

    // ─── Execution bridge ───
    #[error("Failed to build executable schema: {0}")]
    Executable(String),

    // ─── I/O and config files ───
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl SchemaError {
    /// Malformed input: bad resolver-map shapes, missing or unparsable type definitions.
    pub fn is_configuration(&self) -> bool {
        matches!(self, SchemaError::Configuration(_) | SchemaError::Syntax { .. })
    }

    /// The schema and its resolvers disagree, or the canonical graph is inconsistent.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SchemaError::DuplicateTypeName(_)
                | SchemaError::UnknownType(_)
                | SchemaError::UnknownField { .. }
                | SchemaError::MissingResolveType(_)
                | SchemaError::MissingResolver { .. }
                | SchemaError::Validation(_)
        )
    }
}

impl From<toml::de::Error> for SchemaError {
    fn from(e: toml::de::Error) -> Self {
        SchemaError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_families() {
        assert!(SchemaError::DuplicateTypeName("Foo".into()).is_validation());
        assert!(SchemaError::Configuration("Must provide typeDefs".into()).is_configuration());
        assert!(!SchemaError::Configuration("x".into()).is_validation());
    }

    #[test]
    fn test_messages() {
        let err = SchemaError::UnknownField {
            type_name: "Query".into(),
            field_name: "bogus".into(),
        };
        assert_eq!(err.to_string(), "Query.bogus defined in resolvers, but not in schema");
        assert_eq!(
            SchemaError::DuplicateTypeName("Foo".into()).to_string(),
            "Duplicate schema type name Foo"
        );
    }
}
