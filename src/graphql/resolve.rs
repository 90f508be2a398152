//! Field resolution glue between the executor and graph resolvers.

use async_graphql::dynamic::{FieldValue, ResolverContext};
use async_graphql::{ErrorExtensionValues, Value};
use futures::FutureExt;
use indexmap::IndexMap;
use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::error;

use crate::graph::values::serialize_leaf;
use crate::graph::{
    parse_input_value, ContextValue, FieldResolver, InputValue, RequestScope, ResolveInfo, ResolveParams,
    ResolverError, SchemaGraph, TypeId, TypeKind, TypeRef, TypeResolver,
};

/// Root value handed to top-level resolvers.
#[derive(Debug, Clone)]
pub struct RootValue(pub Value);

/// Resolved object value travelling down to child fields.
pub(crate) struct ParentValue(pub(crate) Value);

/// Executor-wide fallbacks.
#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
    /// Used for fields without their own resolver instead of the
    /// property-reading default.
    pub field_resolver: Option<FieldResolver>,
    /// Consulted for abstract types without their own `resolve_type`.
    pub type_resolver: Option<TypeResolver>,
    /// Adds `errorType` and `stacktrace` extensions to resolver failures.
    pub debug: bool,
}

/// Shared by every field plan of one executable schema.
pub(crate) struct Bridge {
    pub(crate) graph: Arc<SchemaGraph>,
    pub(crate) options: ExecutorOptions,
}

/// What one object field needs at request time.
pub(crate) struct FieldPlan {
    pub(crate) bridge: Arc<Bridge>,
    pub(crate) parent_type: String,
    pub(crate) field_name: String,
    pub(crate) ty: TypeRef,
    pub(crate) args: IndexMap<String, InputValue>,
    pub(crate) resolver: Option<FieldResolver>,
}

type GqlResult<T> = async_graphql::Result<T>;

impl FieldPlan {
    pub(crate) async fn resolve<'a>(&self, ctx: ResolverContext<'a>) -> GqlResult<Option<FieldValue<'a>>> {
        let graph = &self.bridge.graph;

        let parent = match ctx.parent_value.downcast_ref::<ParentValue>() {
            Some(ParentValue(value)) => value.clone(),
            None => ctx
                .ctx
                .data_opt::<RootValue>()
                .map(|root| root.0.clone())
                .unwrap_or(Value::Null),
        };

        let mut info = ResolveInfo::new(self.parent_type.clone(), self.field_name.clone());
        info.return_type = graph.display_type_ref(&self.ty);
        info.scope = ctx.ctx.data_opt::<RequestScope>().cloned().unwrap_or_default();

        let mut params = ResolveParams::new(parent, info);
        params.args = self.parse_args(&ctx)?;
        params.context = ctx.ctx.data_opt::<ContextValue>().cloned();

        let resolver = self
            .resolver
            .clone()
            .or_else(|| self.bridge.options.field_resolver.clone())
            .unwrap_or_else(FieldResolver::default_resolver);

        // A panicking resolver fails its field, not the request.
        let outcome = AssertUnwindSafe(async move { resolver.resolve(params).await })
            .catch_unwind()
            .await;
        let resolved = match outcome {
            Ok(result) => result.map_err(|err| self.field_error(err, "ResolverError"))?,
            Err(payload) => {
                let message = format!(
                    "Resolver for \"{}.{}\" panicked: {}",
                    self.parent_type,
                    self.field_name,
                    panic_message(payload.as_ref())
                );
                error!(field = %self.field_name, parent = %self.parent_type, "{}", message);
                return Err(self.field_error(ResolverError::new(message), "Panic"));
            }
        };

        match resolved {
            None | Some(Value::Null) => Ok(None),
            Some(value) => self.complete(&self.ty, value).map(Some),
        }
    }

    fn field_error(&self, err: ResolverError, error_type: &str) -> async_graphql::Error {
        let mut out = into_graphql_error(err);
        if self.bridge.options.debug {
            let trace: Vec<Value> = Backtrace::force_capture()
                .to_string()
                .lines()
                .map(|line| Value::String(line.trim().to_string()))
                .collect();
            let extensions = out.extensions.get_or_insert_with(ErrorExtensionValues::default);
            extensions.set("errorType", Value::String(error_type.to_string()));
            extensions.set("stacktrace", Value::List(trace));
        }
        out
    }

    /// Arguments as internal values; declared defaults fill the gaps.
    fn parse_args(&self, ctx: &ResolverContext<'_>) -> GqlResult<IndexMap<String, Value>> {
        let graph = &self.bridge.graph;
        let mut args = IndexMap::new();
        for (name, accessor) in ctx.args.iter() {
            let Some(declared) = self.args.get(name.as_str()) else {
                continue;
            };
            let value = parse_input_value(graph, &declared.ty, accessor.as_value()).map_err(|message| {
                async_graphql::Error::new(format!("Argument \"{}\" has invalid value: {}", name, message))
            })?;
            args.insert(name.to_string(), value);
        }
        for (name, declared) in &self.args {
            if let (false, Some(default)) = (args.contains_key(name), &declared.default_value) {
                args.insert(name.clone(), default.clone());
            }
        }
        Ok(args)
    }

    /// Turn a resolved value into what the executor expects for `ty`.
    fn complete<'a>(&self, ty: &TypeRef, value: Value) -> GqlResult<FieldValue<'a>> {
        if matches!(value, Value::Null) {
            return Ok(FieldValue::NULL);
        }
        match ty {
            TypeRef::NonNull(inner) => self.complete(inner, value),
            TypeRef::List(inner) => match value {
                Value::List(items) => {
                    let items = items
                        .into_iter()
                        .map(|item| self.complete(inner, item))
                        .collect::<GqlResult<Vec<_>>>()?;
                    Ok(FieldValue::list(items))
                }
                other => Err(async_graphql::Error::new(format!(
                    "Expected a list for field \"{}.{}\", found {}",
                    self.parent_type, self.field_name, other
                ))),
            },
            TypeRef::Named(id) => {
                let named = &self.bridge.graph[*id];
                match &named.kind {
                    TypeKind::Scalar(_) | TypeKind::Enum(_) => serialize_leaf(named, &value)
                        .map(FieldValue::value)
                        .map_err(async_graphql::Error::new),
                    TypeKind::Object(_) => Ok(FieldValue::owned_any(ParentValue(value))),
                    TypeKind::Interface(_) | TypeKind::Union(_) => {
                        let concrete = self.concrete_type(*id, &value)?;
                        Ok(FieldValue::owned_any(ParentValue(value)).with_type(concrete))
                    }
                    TypeKind::InputObject(_) => Err(async_graphql::Error::new(format!(
                        "Input type \"{}\" cannot be an output type",
                        named.name
                    ))),
                }
            }
        }
    }

    /// Concrete object type for `value` of an abstract type: its own
    /// `resolve_type`, then the executor's, then `is_type_of` on each
    /// possible type, then a `__typename` property.
    fn concrete_type(&self, abstract_type: TypeId, value: &Value) -> GqlResult<String> {
        let graph = &self.bridge.graph;
        let named = &graph[abstract_type];

        let resolved = named
            .resolve_type()
            .or(self.bridge.options.type_resolver.as_ref())
            .and_then(|resolver| resolver.resolve(value))
            .or_else(|| {
                graph.possible_types(abstract_type).into_iter().find_map(|id| match &graph[id].kind {
                    TypeKind::Object(object) if object.is_type_of.as_ref().is_some_and(|f| f.check(value)) => {
                        Some(graph[id].name.clone())
                    }
                    _ => None,
                })
            })
            .or_else(|| match value {
                Value::Object(map) => match map.get("__typename") {
                    Some(Value::String(name)) => Some(name.clone()),
                    _ => None,
                },
                _ => None,
            });

        resolved.ok_or_else(|| {
            async_graphql::Error::new(format!(
                "Abstract type \"{}\" must resolve to an Object type at runtime for field \"{}.{}\". \
                 Either the \"{}\" type should provide a \"resolveType\" function or each possible type should provide an \"isTypeOf\" function.",
                named.name, self.parent_type, self.field_name, named.name
            ))
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}

pub(crate) fn into_graphql_error(err: ResolverError) -> async_graphql::Error {
    let mut out = async_graphql::Error::new(err.message);
    if let Some(extensions) = err.extensions {
        let mut values = ErrorExtensionValues::default();
        for (key, value) in extensions {
            if let Ok(value) = Value::from_json(value) {
                values.set(key, value);
            }
        }
        out.extensions = Some(values);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolver_error_keeps_extensions() {
        let err = ResolverError::new("denied").with_extension("code", serde_json::json!("FORBIDDEN"));
        let converted = into_graphql_error(err);
        assert_eq!(converted.message, "denied");
        let extensions = serde_json::to_value(converted.extensions.unwrap()).unwrap();
        assert_eq!(extensions, serde_json::json!({"code": "FORBIDDEN"}));
    }

    #[test]
    fn test_panic_message_from_payload() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload = std::panic::catch_unwind(|| panic!("{} failed", "lookup")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "lookup failed");
    }
}
