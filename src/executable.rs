//! One-call assembly of an executable schema graph.

use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::config::SchemaConfig;
use crate::error::Result;
use crate::graph::{build_schema_from_type_definitions, ParseOptions, SchemaGraph, TypeDefs};
use crate::prune::{prune_schema, PruneOptions};
use crate::resolvers::{
    add_catch_undefined_to_schema, add_error_logging_to_schema, add_resolvers_to_schema,
    add_schema_level_resolver, assert_resolvers_present, attach_directive_resolvers, merge_resolvers,
    AddResolversOptions, DirectiveResolvers, ResolverLogger, ResolverMap, ResolverValidationOptions,
    TracingLogger,
};

/// A user transform run after the resolvers are wired.
pub type SchemaTransform = Arc<dyn Fn(SchemaGraph) -> Result<SchemaGraph> + Send + Sync>;

/// Everything [`make_executable_schema`] needs.
#[derive(Clone)]
pub struct ExecutableSchemaDefinition {
    pub type_defs: TypeDefs,
    /// Merged left to right.
    pub resolvers: Vec<ResolverMap>,
    pub parse_options: ParseOptions,
    pub resolver_validation_options: ResolverValidationOptions,
    pub inherit_resolvers_from_interfaces: bool,
    pub update_resolvers_in_place: bool,
    /// When false, object fields whose resolver produces no value fail.
    pub allow_undefined_in_resolve: bool,
    pub logger: Option<Arc<dyn ResolverLogger>>,
    pub schema_transforms: Vec<SchemaTransform>,
    pub directive_resolvers: Option<DirectiveResolvers>,
    /// Pruning runs only when set.
    pub pruning_options: Option<PruneOptions>,
}

impl ExecutableSchemaDefinition {
    pub fn new(type_defs: impl Into<TypeDefs>) -> Self {
        Self {
            type_defs: type_defs.into(),
            resolvers: Vec::new(),
            parse_options: ParseOptions::default(),
            resolver_validation_options: ResolverValidationOptions::default(),
            inherit_resolvers_from_interfaces: false,
            update_resolvers_in_place: false,
            allow_undefined_in_resolve: true,
            logger: None,
            schema_transforms: Vec::new(),
            directive_resolvers: None,
            pruning_options: None,
        }
    }

    pub fn with_resolvers(mut self, resolvers: ResolverMap) -> Self {
        self.resolvers.push(resolvers);
        self
    }

    pub fn with_transform<F>(mut self, f: F) -> Self
    where
        F: Fn(SchemaGraph) -> Result<SchemaGraph> + Send + Sync + 'static,
    {
        self.schema_transforms.push(Arc::new(f));
        self
    }

    /// Take parse, validation, build and pruning settings from `config`.
    pub fn with_config(mut self, config: &SchemaConfig) -> Self {
        self.parse_options = config.parse.clone();
        self.resolver_validation_options = config.validation.clone();
        self.inherit_resolvers_from_interfaces = config.build.inherit_resolvers_from_interfaces;
        self.update_resolvers_in_place = config.build.update_resolvers_in_place;
        self.allow_undefined_in_resolve = config.build.allow_undefined_in_resolve;
        if config.build.log_errors && self.logger.is_none() {
            self.logger = Some(Arc::new(TracingLogger));
        }
        self.pruning_options = config.pruning.as_ref().map(PruneOptions::from);
        self
    }
}

impl fmt::Debug for ExecutableSchemaDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutableSchemaDefinition")
            .field("type_defs", &self.type_defs)
            .field("resolvers", &self.resolvers.len())
            .field("parse_options", &self.parse_options)
            .field("resolver_validation_options", &self.resolver_validation_options)
            .field("inherit_resolvers_from_interfaces", &self.inherit_resolvers_from_interfaces)
            .field("update_resolvers_in_place", &self.update_resolvers_in_place)
            .field("allow_undefined_in_resolve", &self.allow_undefined_in_resolve)
            .field("logger", &self.logger.is_some())
            .field("schema_transforms", &self.schema_transforms.len())
            .field("directive_resolvers", &self.directive_resolvers)
            .field("pruning_options", &self.pruning_options)
            .finish()
    }
}

/// Build a schema graph from SDL and wire its resolvers.
///
/// Steps, in order: build, attach resolvers, check resolver presence,
/// catch undefined results, log errors, install the schema-level resolver,
/// run user transforms, attach directive resolvers, prune.
pub fn make_executable_schema(definition: ExecutableSchemaDefinition) -> Result<SchemaGraph> {
    let schema = build_schema_from_type_definitions(&definition.type_defs, &definition.parse_options)?;

    let resolvers = merge_resolvers(&definition.resolvers);
    let options = AddResolversOptions {
        resolver_validation_options: definition.resolver_validation_options.clone(),
        inherit_resolvers_from_interfaces: definition.inherit_resolvers_from_interfaces,
        update_resolvers_in_place: definition.update_resolvers_in_place,
        default_field_resolver: None,
    };
    let mut schema = add_resolvers_to_schema(schema, &resolvers, &options)?;

    if definition.resolver_validation_options.requires_resolvers() {
        assert_resolvers_present(&schema, &definition.resolver_validation_options)?;
    }
    if !definition.allow_undefined_in_resolve {
        schema = add_catch_undefined_to_schema(&schema)?;
    }
    if let Some(logger) = &definition.logger {
        schema = add_error_logging_to_schema(&schema, Arc::clone(logger))?;
    }
    if let Some(schema_resolver) = &resolvers.schema_resolver {
        schema = add_schema_level_resolver(&schema, schema_resolver.clone())?;
    }
    for transform in &definition.schema_transforms {
        schema = transform(schema)?;
    }
    if let Some(directive_resolvers) = &definition.directive_resolvers {
        schema = attach_directive_resolvers(&schema, directive_resolvers)?;
    }
    if let Some(pruning) = &definition.pruning_options {
        schema = prune_schema(&schema, pruning)?;
    }

    let stats = schema.stats();
    info!(
        types = stats.type_count,
        fields = stats.field_count,
        "executable schema built"
    );
    Ok(schema)
}
