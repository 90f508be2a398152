//! # Schemawire
//!
//! GraphQL schema graphs you can transform, heal, wire and execute.
//!
//! Schemawire builds a typed graph from SDL and keeps it consistent while
//! you change it: every transform ends with a rewiring pass, so renamed or
//! deleted types never leave dangling references behind.
//!
//! ## Key Features
//!
//! - **Structural mapper**: per-kind transforms with most-specific dispatch
//! - **Healing**: one canonical instance per type name, dangling references dropped
//! - **Resolver wiring**: strict/warn/ignore policies, interface inheritance, in-place or rebuild
//! - **Pruning**: unused, empty and unimplemented types removed to a fixed point
//! - **Execution**: run queries through async-graphql's dynamic executor
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use schemawire::graphql::{ExecutableSchema, GraphQLRequest};
//! use schemawire::{make_executable_schema, ExecutableSchemaDefinition, FieldResolver, ResolverMap};
//! use async_graphql::Value;
//!
//! # async fn run() -> schemawire::Result<()> {
//! let resolvers = ResolverMap::new().field(
//!     "Query",
//!     "hello",
//!     FieldResolver::constant(Value::String("world".into())),
//! );
//! let graph = make_executable_schema(
//!     ExecutableSchemaDefinition::new("type Query { hello: String }").with_resolvers(resolvers),
//! )?;
//!
//! let schema = ExecutableSchema::new(graph)?;
//! let result = schema.execute(GraphQLRequest::new("{ hello }"), None, None).await;
//! // {"data": {"hello": "world"}}
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod directives;
pub mod error;
pub mod executable;
pub mod graph;
pub mod graphql;
pub mod heal;
pub mod mapper;
pub mod prune;
pub mod resolvers;

// Re-exports for convenience
pub use error::{Result, SchemaError};

pub use config::SchemaConfig;
pub use executable::{make_executable_schema, ExecutableSchemaDefinition, SchemaTransform};
pub use graph::{
    build_schema_from_type_definitions, print_schema, FieldResolver, GraphStats, ParseOptions, ResolverError,
    SchemaGraph, TypeDefs,
};
pub use heal::{heal_schema, rewire_types};
pub use mapper::{map_schema, Mapped, MapperKind, SchemaMapper};
pub use prune::{prune_schema, PruneOptions};
pub use resolvers::{
    add_resolvers_to_schema, AddResolversOptions, ResolverMap, ResolverValidationOptions, TypeResolvers,
    ValidatorBehavior,
};
