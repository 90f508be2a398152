//! Post-attachment resolver checks.

use super::attach::{ResolverValidationOptions, ValidatorBehavior};
use crate::error::{Result, SchemaError};
use crate::graph::{is_reserved_name, SchemaGraph, TypeKind};

/// Report every union or interface without a `resolve_type` function.
/// `None` checks nothing.
pub fn check_for_resolve_type_resolver(graph: &SchemaGraph, behavior: Option<ValidatorBehavior>) -> Result<()> {
    let Some(behavior) = behavior else {
        return Ok(());
    };
    for (_, ty) in graph.types() {
        if is_reserved_name(&ty.name) || !ty.is_abstract() {
            continue;
        }
        if ty.resolve_type().is_none() {
            behavior.report(SchemaError::MissingResolveType(ty.name.clone()))?;
        }
    }
    Ok(())
}

/// Check object fields for missing resolvers.
///
/// `require_resolvers_for_all_fields` cannot be combined with the narrower
/// `require_resolvers_for_args` / `require_resolvers_for_non_scalar`.
pub fn assert_resolvers_present(graph: &SchemaGraph, options: &ResolverValidationOptions) -> Result<()> {
    let all_fields = options.require_resolvers_for_all_fields;
    let args = options.require_resolvers_for_args;
    let non_scalar = options.require_resolvers_for_non_scalar;

    if all_fields.is_some() && (args.is_some() || non_scalar.is_some()) {
        return Err(SchemaError::Configuration(
            "requireResolversForAllFields takes precedence over the more specific assertions. \
             Please configure either requireResolversForAllFields or requireResolversForArgs / \
             requireResolversForNonScalar, but not a combination of them."
                .to_string(),
        ));
    }

    for (_, ty) in graph.types() {
        if is_reserved_name(&ty.name) || !matches!(ty.kind, TypeKind::Object(_)) {
            continue;
        }
        for (field_name, field) in ty.fields().into_iter().flatten() {
            if field.resolve.is_some() {
                continue;
            }
            let hint = format!("{}.{}", ty.name, field_name);
            if let Some(behavior) = all_fields {
                behavior.report(missing_resolver(&hint, "requireResolversForAllFields"))?;
            }
            if let Some(behavior) = args {
                if !field.args.is_empty() {
                    behavior.report(missing_resolver(&hint, "requireResolversForArgs"))?;
                }
            }
            if let Some(behavior) = non_scalar {
                if !matches!(graph[field.ty.named_type()].kind, TypeKind::Scalar(_)) {
                    behavior.report(missing_resolver(&hint, "requireResolversForNonScalar"))?;
                }
            }
        }
    }
    Ok(())
}

fn missing_resolver(hint: &str, validator: &str) -> SchemaError {
    SchemaError::MissingResolver {
        hint: hint.to_string(),
        validator: validator.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{build_schema_from_type_definitions, FieldResolver, ParseOptions};
    use async_graphql::Value;

    fn build(sdl: &str) -> SchemaGraph {
        build_schema_from_type_definitions(&sdl.into(), &ParseOptions::default()).unwrap()
    }

    #[test]
    fn test_resolve_type_policies() {
        let graph = build("union U = A type A { x: Int } type Query { u: U }");
        assert!(check_for_resolve_type_resolver(&graph, None).is_ok());
        assert!(check_for_resolve_type_resolver(&graph, Some(ValidatorBehavior::Warn)).is_ok());
        assert!(check_for_resolve_type_resolver(&graph, Some(ValidatorBehavior::Ignore)).is_ok());
        let err = check_for_resolve_type_resolver(&graph, Some(ValidatorBehavior::Error)).unwrap_err();
        assert!(err.to_string().starts_with("Type \"U\" is missing a \"__resolveType\" resolver."));
    }

    #[test]
    fn test_non_scalar_fields_need_resolvers() {
        let graph = build("type Query { a: Int thing: Thing } type Thing { n: Int }");
        let options = ResolverValidationOptions {
            require_resolvers_for_non_scalar: Some(ValidatorBehavior::Error),
            ..ResolverValidationOptions::default()
        };
        let err = assert_resolvers_present(&graph, &options).unwrap_err();
        assert!(
            err.to_string().starts_with("Resolver missing for \"Query.thing\"."),
            "got: {}",
            err
        );
        assert!(err.to_string().contains("requireResolversForNonScalar: 'ignore'"));
    }

    #[test]
    fn test_all_fields_conflicts_with_narrower_checks() {
        let graph = build("type Query { a: Int }");
        let options = ResolverValidationOptions {
            require_resolvers_for_all_fields: Some(ValidatorBehavior::Warn),
            require_resolvers_for_args: Some(ValidatorBehavior::Error),
            ..ResolverValidationOptions::default()
        };
        assert!(assert_resolvers_present(&graph, &options).unwrap_err().is_configuration());
    }

    #[test]
    fn test_interface_fields_need_no_resolvers() {
        let mut graph = build("interface Node { id: ID } type User implements Node { id: ID } type Query { node: Node }");
        let options = ResolverValidationOptions {
            require_resolvers_for_all_fields: Some(ValidatorBehavior::Error),
            ..ResolverValidationOptions::default()
        };
        for (type_name, field_name) in [("Query", "node"), ("User", "id")] {
            let id = graph.type_id(type_name).unwrap();
            graph[id].fields_mut().unwrap()[field_name].resolve = Some(FieldResolver::constant(Value::Null));
        }
        assert!(
            assert_resolvers_present(&graph, &options).is_ok(),
            "every object field is resolved"
        );

        let user = graph.type_id("User").unwrap();
        graph[user].fields_mut().unwrap()["id"].resolve = None;
        let err = assert_resolvers_present(&graph, &options).unwrap_err();
        assert!(err.to_string().starts_with("Resolver missing for \"User.id\"."), "got: {}", err);
    }
}
