//! Schema graph model.
//!
//! Named types live in an arena inside [`SchemaGraph`]; fields, arguments,
//! interface lists and union members refer to them by [`TypeId`]. The graph
//! is built from SDL, transformed by the mapper, reconciled by the healer and
//! finally handed to the executor.

pub mod builder;
pub mod engine;
pub mod printer;
pub mod resolve;
pub mod sdl;
pub mod types;
pub mod values;

pub use builder::{build_schema_from_type_definitions, TypeDefs};
pub use engine::{
    is_specified_directive, is_specified_scalar, GraphStats, RootKind, SchemaGraph,
    SPECIFIED_DIRECTIVES, SPECIFIED_SCALARS,
};
pub use printer::print_schema;
pub use resolve::{
    ContextValue, FieldResolver, IsTypeOf, LeafCoercion, RequestScope, ResolveInfo,
    ResolveParams, ResolverError, ResolverResult, TypeResolver,
};
pub use sdl::{concatenate_type_defs, parse_graphql_sdl, ParseOptions};
pub use types::{
    is_reserved_name, Directive, DirectiveLocation, DirectiveUse, EnumType, EnumValue, Field,
    InputObjectType, InputValue, InterfaceType, NamedType, ObjectType, ScalarType,
    SourcePosition, TypeId, TypeKind, TypeRef, UnionType, DEFAULT_DEPRECATION_REASON,
};
pub use values::{
    for_each_default_value, for_each_field, parse_input_value, serialize_input_value,
    transform_input_value,
};
