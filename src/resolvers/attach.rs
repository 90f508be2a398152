//! Attaching a resolver map to a schema graph.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::check::check_for_resolve_type_resolver;
use super::inherit::extend_resolvers_from_interfaces;
use super::map::{is_meta_key, ResolverEntry, ResolverMap, TypeResolvers, SCHEMA_KEY};
use crate::error::{Result, SchemaError};
use crate::graph::{
    for_each_default_value, for_each_field, parse_input_value, serialize_input_value, Field,
    FieldResolver, NamedType, SchemaGraph, TypeKind,
};
use crate::heal::heal_schema;
use crate::mapper::{map_schema, Mapped, MapperKind, SchemaMapper};

/// What a validator does when its check fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorBehavior {
    Error,
    Warn,
    Ignore,
}

impl ValidatorBehavior {
    /// Raise `err`, log it, or drop it.
    pub(crate) fn report(self, err: SchemaError) -> Result<()> {
        match self {
            ValidatorBehavior::Error => Err(err),
            ValidatorBehavior::Warn => {
                warn!("{}", err);
                Ok(())
            }
            ValidatorBehavior::Ignore => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverValidationOptions {
    /// Resolver entries naming unknown types or fields. Unset means `Error`;
    /// `Warn` is treated as `Error` because the entry cannot be attached.
    pub require_resolvers_to_match_schema: Option<ValidatorBehavior>,
    pub require_resolvers_for_resolve_type: Option<ValidatorBehavior>,
    pub require_resolvers_for_args: Option<ValidatorBehavior>,
    pub require_resolvers_for_non_scalar: Option<ValidatorBehavior>,
    pub require_resolvers_for_all_fields: Option<ValidatorBehavior>,
}

impl ResolverValidationOptions {
    fn match_schema(&self) -> ValidatorBehavior {
        self.require_resolvers_to_match_schema
            .unwrap_or(ValidatorBehavior::Error)
    }

    /// Whether any of the `require_resolvers_for_*` presence checks is set.
    pub fn requires_resolvers(&self) -> bool {
        self.require_resolvers_for_args.is_some()
            || self.require_resolvers_for_non_scalar.is_some()
            || self.require_resolvers_for_all_fields.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AddResolversOptions {
    pub resolver_validation_options: ResolverValidationOptions,
    /// Concrete types inherit their interfaces' field resolvers.
    pub inherit_resolvers_from_interfaces: bool,
    /// Mutate the owned graph instead of rebuilding it through the mapper.
    pub update_resolvers_in_place: bool,
    /// Backfills fields left without a resolver.
    pub default_field_resolver: Option<FieldResolver>,
}

/// Attach `resolvers` to `schema`.
///
/// The graph is taken by value: the rebuild mode maps it into a fresh graph,
/// the in-place mode mutates it and heals the result.
pub fn add_resolvers_to_schema(
    schema: SchemaGraph,
    resolvers: &ResolverMap,
    options: &AddResolversOptions,
) -> Result<SchemaGraph> {
    let validation = &options.resolver_validation_options;
    let resolvers = if options.inherit_resolvers_from_interfaces {
        extend_resolvers_from_interfaces(&schema, resolvers)
    } else {
        resolvers.clone()
    };

    validate_resolver_map(&schema, &resolvers, validation.match_schema())?;

    let graph = if options.update_resolvers_in_place {
        add_resolvers_in_place(schema, &resolvers, options.default_field_resolver.as_ref())?
    } else {
        add_resolvers_by_rebuild(&schema, resolvers.clone(), options.default_field_resolver.clone())?
    };

    check_for_resolve_type_resolver(&graph, validation.require_resolvers_for_resolve_type)?;

    debug!(
        types = resolvers.types.len(),
        in_place = options.update_resolvers_in_place,
        "resolvers attached"
    );
    Ok(graph)
}

/// Check every entry against the schema before anything is attached.
fn validate_resolver_map(schema: &SchemaGraph, resolvers: &ResolverMap, behavior: ValidatorBehavior) -> Result<()> {
    let strict = behavior != ValidatorBehavior::Ignore;

    for (type_name, entries) in &resolvers.types {
        if type_name == SCHEMA_KEY {
            return Err(SchemaError::Configuration(format!(
                "\"{}\" defined in resolvers, but has invalid value. A schema resolver must be set as the schema-level resolver.",
                type_name
            )));
        }
        let Some(ty) = schema.get_type(type_name) else {
            if strict {
                return Err(SchemaError::UnknownType(type_name.clone()));
            }
            continue;
        };

        for (key, entry) in entries.iter() {
            if is_meta_key(key) {
                check_meta_entry(ty, key, entry)?;
                continue;
            }
            match &ty.kind {
                TypeKind::Scalar(_) => {
                    if !matches!(
                        entry,
                        ResolverEntry::Serialize(_)
                            | ResolverEntry::ParseValue(_)
                            | ResolverEntry::Description(_)
                            | ResolverEntry::SpecifiedByUrl(_)
                    ) {
                        return Err(SchemaError::Configuration(format!(
                            "Resolver {}.{} must be a serialize, parseValue, description or specifiedByUrl override",
                            type_name, key
                        )));
                    }
                }
                TypeKind::Enum(enum_type) => {
                    if !enum_type.values.contains_key(key.as_str()) {
                        if strict {
                            return Err(SchemaError::Validation(format!(
                                "{}.{} was defined in resolvers, but not present within {}",
                                type_name, key, type_name
                            )));
                        }
                    } else if !matches!(entry, ResolverEntry::Value(_)) {
                        return Err(SchemaError::Configuration(format!(
                            "Resolver {}.{} must be an enum value",
                            type_name, key
                        )));
                    }
                }
                TypeKind::Union(_) => {
                    if strict {
                        return Err(SchemaError::Validation(format!(
                            "{}.{} was defined in resolvers, but {} is not an object or interface type",
                            type_name, key, type_name
                        )));
                    }
                }
                TypeKind::Object(_) | TypeKind::Interface(_) => {
                    let declared = ty.fields().is_some_and(|f| f.contains_key(key.as_str()));
                    if !declared && strict {
                        return Err(SchemaError::UnknownField {
                            type_name: type_name.clone(),
                            field_name: key.clone(),
                        });
                    }
                    if !entry.is_field_shape() {
                        return Err(SchemaError::Configuration(format!(
                            "Resolver {}.{} must be object or function",
                            type_name, key
                        )));
                    }
                }
                TypeKind::InputObject(_) => {}
            }
        }
    }
    Ok(())
}

fn check_meta_entry(ty: &NamedType, key: &str, entry: &ResolverEntry) -> Result<()> {
    let fits = match entry {
        ResolverEntry::ResolveType(_) => ty.is_abstract(),
        ResolverEntry::IsTypeOf(_) => matches!(ty.kind, TypeKind::Object(_)),
        ResolverEntry::Serialize(_) | ResolverEntry::ParseValue(_) | ResolverEntry::SpecifiedByUrl(_) => {
            matches!(ty.kind, TypeKind::Scalar(_))
        }
        ResolverEntry::Description(_) => true,
        ResolverEntry::Resolve(_) | ResolverEntry::Field(_) | ResolverEntry::Value(_) => false,
    };
    if fits {
        Ok(())
    } else {
        Err(SchemaError::Configuration(format!(
            "Resolver {}.{} does not apply to {} {}",
            ty.name,
            key,
            ty.kind.label(),
            ty.name
        )))
    }
}

/// Apply type-level entries (meta keys, scalar overrides, enum values) to `ty`.
fn apply_type_entries(ty: &mut NamedType, entries: &TypeResolvers) {
    for (key, entry) in entries.iter() {
        if let ResolverEntry::Description(text) = entry {
            if is_meta_key(key) || matches!(ty.kind, TypeKind::Scalar(_)) {
                ty.description = Some(text.clone());
            }
            continue;
        }
        match (&mut ty.kind, entry) {
            (TypeKind::Scalar(scalar), ResolverEntry::Serialize(f)) => scalar.serialize = Some(f.clone()),
            (TypeKind::Scalar(scalar), ResolverEntry::ParseValue(f)) => scalar.parse_value = Some(f.clone()),
            (TypeKind::Scalar(scalar), ResolverEntry::SpecifiedByUrl(url)) => {
                scalar.specified_by_url = Some(url.clone())
            }
            (TypeKind::Enum(enum_type), ResolverEntry::Value(value)) => {
                if let Some(enum_value) = enum_type.values.get_mut(key.as_str()) {
                    enum_value.value = value.clone();
                }
            }
            (TypeKind::Interface(interface), ResolverEntry::ResolveType(r)) => {
                interface.resolve_type = Some(r.clone())
            }
            (TypeKind::Union(union), ResolverEntry::ResolveType(r)) => union.resolve_type = Some(r.clone()),
            (TypeKind::Object(object), ResolverEntry::IsTypeOf(check)) => object.is_type_of = Some(check.clone()),
            _ => {}
        }
    }
}

/// Apply a field entry. Returns false when the entry has no field shape.
fn apply_field_entry(field: &mut Field, entry: &ResolverEntry) -> bool {
    match entry {
        ResolverEntry::Resolve(resolver) => {
            field.resolve = Some(resolver.clone());
            true
        }
        ResolverEntry::Field(overrides) => {
            if let Some(resolve) = &overrides.resolve {
                field.resolve = Some(resolve.clone());
            }
            if let Some(subscribe) = &overrides.subscribe {
                field.subscribe = Some(subscribe.clone());
            }
            if let Some(description) = &overrides.description {
                field.description = Some(description.clone());
            }
            if let Some(reason) = &overrides.deprecation_reason {
                field.deprecation_reason = Some(reason.clone());
            }
            true
        }
        _ => false,
    }
}

fn add_resolvers_by_rebuild(
    schema: &SchemaGraph,
    resolvers: ResolverMap,
    default_field_resolver: Option<FieldResolver>,
) -> Result<SchemaGraph> {
    let resolvers = Arc::new(resolvers);
    let for_types = Arc::clone(&resolvers);
    let for_fields = Arc::clone(&resolvers);

    let mapper = SchemaMapper::new()
        .on_type(MapperKind::Type, move |ty, _| match for_types.get(&ty.name) {
            Some(entries) if !entries.is_empty() => {
                let mut ty = ty.clone();
                apply_type_entries(&mut ty, entries);
                Mapped::Replace(ty)
            }
            _ => Mapped::Keep,
        })
        .on_field(MapperKind::CompositeField, move |field, field_name, type_name, _| {
            let Some(entry) = for_fields.get(type_name).and_then(|t| t.get(field_name)) else {
                return Mapped::Keep;
            };
            let mut field = field.clone();
            if apply_field_entry(&mut field, entry) {
                Mapped::Replace(field)
            } else {
                Mapped::Keep
            }
        });
    let mut graph = map_schema(schema, &mapper)?;

    if let Some(default) = default_field_resolver {
        let mapper = SchemaMapper::new().on_field(MapperKind::ObjectField, move |field, _, _, _| {
            if field.resolve.is_some() {
                return Mapped::Keep;
            }
            let mut field = field.clone();
            field.resolve = Some(default.clone());
            Mapped::Replace(field)
        });
        graph = map_schema(&graph, &mapper)?;
    }
    Ok(graph)
}

fn add_resolvers_in_place(
    mut graph: SchemaGraph,
    resolvers: &ResolverMap,
    default_field_resolver: Option<&FieldResolver>,
) -> Result<SchemaGraph> {
    for (type_name, entries) in &resolvers.types {
        let Some(id) = graph.type_id(type_name) else {
            continue;
        };
        if graph[id].is_leaf() {
            // Leaves get a new instance; references still see the old one
            // until defaults have been serialized against it.
            let mut ty = graph[id].clone();
            apply_type_entries(&mut ty, entries);
            let new_id = graph.add_type(ty);
            graph.set_type(type_name.clone(), new_id);
            continue;
        }
        let ty = &mut graph[id];
        apply_type_entries(ty, entries);
        let Some(fields) = ty.fields_mut() else {
            continue;
        };
        for (key, entry) in entries.iter() {
            if is_meta_key(key) {
                continue;
            }
            if let Some(field) = fields.get_mut(key.as_str()) {
                apply_field_entry(field, entry);
            }
        }
    }

    for_each_default_value(&mut graph, |g, ty, value| serialize_input_value(g, ty, value))?;
    heal_schema(&mut graph)?;
    for_each_default_value(&mut graph, |g, ty, value| parse_input_value(g, ty, value))?;

    if let Some(default) = default_field_resolver {
        for_each_field(&mut graph, |field, _, _| {
            if field.resolve.is_none() {
                field.resolve = Some(default.clone());
            }
        });
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{build_schema_from_type_definitions, ParseOptions, ResolveInfo, ResolveParams, TypeResolver};
    use async_graphql::Value;

    fn build(sdl: &str) -> SchemaGraph {
        build_schema_from_type_definitions(&sdl.into(), &ParseOptions::default()).unwrap()
    }

    fn strictness(behavior: ValidatorBehavior) -> AddResolversOptions {
        AddResolversOptions {
            resolver_validation_options: ResolverValidationOptions {
                require_resolvers_to_match_schema: Some(behavior),
                ..ResolverValidationOptions::default()
            },
            ..AddResolversOptions::default()
        }
    }

    async fn run(field: &Field, parent: Value) -> Option<Value> {
        let params = ResolveParams::new(parent, ResolveInfo::new("Query", "hello"));
        field.resolve.as_ref().unwrap().resolve(params).await.unwrap()
    }

    #[tokio::test]
    async fn test_attach_field_resolver_by_rebuild() {
        let schema = build("type Query { hello: String other: Int }");
        let resolvers = ResolverMap::new().field(
            "Query",
            "hello",
            FieldResolver::constant(Value::String("world".into())),
        );
        let graph = add_resolvers_to_schema(schema, &resolvers, &AddResolversOptions::default()).unwrap();

        let fields = graph.query_type().unwrap().fields().unwrap();
        assert_eq!(run(&fields["hello"], Value::Null).await, Some(Value::String("world".into())));
        assert!(fields["other"].resolve.is_none(), "no default resolver requested");
    }

    #[test]
    fn test_unknown_field_policy() {
        let bogus = ResolverMap::new().field("Query", "bogus", FieldResolver::default_resolver());

        let err = add_resolvers_to_schema(build("type Query { a: Int }"), &bogus, &strictness(ValidatorBehavior::Error))
            .unwrap_err();
        assert_eq!(err.to_string(), "Query.bogus defined in resolvers, but not in schema");
        assert!(err.is_validation());

        let err = add_resolvers_to_schema(build("type Query { a: Int }"), &bogus, &strictness(ValidatorBehavior::Warn))
            .unwrap_err();
        assert!(err.is_validation(), "warn cannot attach the entry either");

        let graph =
            add_resolvers_to_schema(build("type Query { a: Int }"), &bogus, &strictness(ValidatorBehavior::Ignore))
                .unwrap();
        let fields = graph.query_type().unwrap().fields().unwrap();
        assert!(!fields.contains_key("bogus"), "ignored entry is not added");
    }

    #[test]
    fn test_unknown_type_policy() {
        let resolvers = ResolverMap::new().field("Missing", "a", FieldResolver::default_resolver());
        let err =
            add_resolvers_to_schema(build("type Query { a: Int }"), &resolvers, &AddResolversOptions::default())
                .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType(ref n) if n == "Missing"));
        assert!(
            add_resolvers_to_schema(build("type Query { a: Int }"), &resolvers, &strictness(ValidatorBehavior::Ignore))
                .is_ok()
        );
    }

    #[test]
    fn test_bad_shapes_are_configuration_errors() {
        let schema = build("type Query { a: Int } union U = Query enum Color { RED }");
        let not_a_field = ResolverMap::new().with_type(
            "Query",
            TypeResolvers::new().with("a", ResolverEntry::Value(Value::Null)),
        );
        let err = add_resolvers_to_schema(schema.clone(), &not_a_field, &AddResolversOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "Resolver Query.a must be object or function");
        assert!(err.is_configuration());

        let union_field = ResolverMap::new().field("U", "x", FieldResolver::default_resolver());
        let err = add_resolvers_to_schema(schema.clone(), &union_field, &AddResolversOptions::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "U.x was defined in resolvers, but U is not an object or interface type"
        );

        let enum_miss = ResolverMap::new().with_type("Color", TypeResolvers::new().enum_value("BLUE", Value::Null));
        let err = add_resolvers_to_schema(schema, &enum_miss, &AddResolversOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "Color.BLUE was defined in resolvers, but not present within Color");
    }

    #[test]
    fn test_enum_internal_values_reparse_defaults_in_both_modes() {
        let sdl = "enum Color { RED GREEN } type Query { paint(color: Color = GREEN): Boolean }";
        let resolvers = ResolverMap::new().with_type(
            "Color",
            TypeResolvers::new().enum_value("GREEN", Value::String("#00ff00".into())),
        );

        for in_place in [false, true] {
            let options = AddResolversOptions {
                update_resolvers_in_place: in_place,
                ..AddResolversOptions::default()
            };
            let graph = add_resolvers_to_schema(build(sdl), &resolvers, &options).unwrap();
            let paint = &graph.query_type().unwrap().fields().unwrap()["paint"];
            assert_eq!(
                paint.args["color"].default_value,
                Some(Value::String("#00ff00".into())),
                "in_place = {}",
                in_place
            );
            assert_eq!(
                paint.args["color"].ty.named_type(),
                graph.type_id("Color").unwrap(),
                "argument points at the canonical enum (in_place = {})",
                in_place
            );
        }
    }

    #[tokio::test]
    async fn test_in_place_mode_and_default_resolver() {
        let schema = build("type Query { hello: String n: Int }");
        let resolvers = ResolverMap::new().field("Query", "n", FieldResolver::constant(Value::Number(7.into())));
        let options = AddResolversOptions {
            update_resolvers_in_place: true,
            default_field_resolver: Some(FieldResolver::default_resolver()),
            ..AddResolversOptions::default()
        };
        let graph = add_resolvers_to_schema(schema, &resolvers, &options).unwrap();
        let fields = graph.query_type().unwrap().fields().unwrap();

        let parent = Value::from_json(serde_json::json!({"hello": "from parent"})).unwrap();
        assert_eq!(
            run(&fields["hello"], parent).await,
            Some(Value::String("from parent".into())),
            "default resolver backfills"
        );
        assert_eq!(run(&fields["n"], Value::Null).await, Some(Value::Number(7.into())));
    }

    #[test]
    fn test_default_resolver_skips_interface_fields_in_both_modes() {
        let sdl = "interface Node { id: ID } type User implements Node { id: ID } type Query { node: Node }";
        for in_place in [false, true] {
            let options = AddResolversOptions {
                update_resolvers_in_place: in_place,
                default_field_resolver: Some(FieldResolver::default_resolver()),
                resolver_validation_options: ResolverValidationOptions {
                    require_resolvers_for_resolve_type: Some(ValidatorBehavior::Ignore),
                    ..ResolverValidationOptions::default()
                },
                ..AddResolversOptions::default()
            };
            let graph = add_resolvers_to_schema(build(sdl), &ResolverMap::new(), &options).unwrap();
            let node = graph.get_type("Node").unwrap().fields().unwrap();
            assert!(node["id"].resolve.is_none(), "interface field untouched (in_place = {})", in_place);
            let user = graph.get_type("User").unwrap().fields().unwrap();
            assert!(user["id"].resolve.is_some(), "object field backfilled (in_place = {})", in_place);
        }
    }

    #[test]
    fn test_resolve_type_attached_and_checked() {
        let sdl = "interface Node { id: ID } type User implements Node { id: ID } type Query { node: Node }";
        let strict = AddResolversOptions {
            resolver_validation_options: ResolverValidationOptions {
                require_resolvers_for_resolve_type: Some(ValidatorBehavior::Error),
                ..ResolverValidationOptions::default()
            },
            ..AddResolversOptions::default()
        };

        let err = add_resolvers_to_schema(build(sdl), &ResolverMap::new(), &strict).unwrap_err();
        assert!(matches!(err, SchemaError::MissingResolveType(ref n) if n == "Node"));

        let resolvers = ResolverMap::new().with_type(
            "Node",
            TypeResolvers::new().resolve_type(TypeResolver::new(|_| Some("User".to_string()))),
        );
        let graph = add_resolvers_to_schema(build(sdl), &resolvers, &strict).unwrap();
        let node = graph.get_type("Node").unwrap();
        assert_eq!(
            node.resolve_type().unwrap().resolve(&Value::Null).as_deref(),
            Some("User")
        );
    }

    #[test]
    fn test_schema_key_in_types_is_rejected() {
        let resolvers = ResolverMap::new().with_type(SCHEMA_KEY, TypeResolvers::new());
        let err =
            add_resolvers_to_schema(build("type Query { a: Int }"), &resolvers, &AddResolversOptions::default())
                .unwrap_err();
        assert!(err.is_configuration());
    }
}
