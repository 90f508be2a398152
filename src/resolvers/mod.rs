//! Resolver wiring: resolver maps, attachment, presence checks and
//! schema-wide resolver decorators.

pub mod attach;
pub mod check;
pub mod decorate;
pub mod inherit;
pub mod map;

pub use attach::{add_resolvers_to_schema, AddResolversOptions, ResolverValidationOptions, ValidatorBehavior};
pub use check::{assert_resolvers_present, check_for_resolve_type_resolver};
pub use decorate::{
    add_catch_undefined_to_schema, add_error_logging_to_schema, add_schema_level_resolver,
    attach_directive_resolvers, DirectiveResolver, DirectiveResolvers, Next, ResolverLogger, TracingLogger,
};
pub use inherit::extend_resolvers_from_interfaces;
pub use map::{merge_resolvers, FieldOverrides, ResolverEntry, ResolverMap, TypeResolvers};
