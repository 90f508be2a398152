//! Resolver decorators applied across a whole schema.
//!
//! Each decorator maps the schema and wraps field resolvers; the input graph
//! is left as it was.

use async_graphql::Value;
use futures::future::BoxFuture;
use futures::FutureExt;
use indexmap::IndexMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::directives::{get_directives, DirectiveArgs};
use crate::error::Result;
use crate::graph::{FieldResolver, ResolveParams, ResolverError, ResolverResult, SchemaGraph, TypeKind};
use crate::mapper::{map_schema, Mapped, MapperKind, SchemaMapper};

/// Make object fields fail when their resolver produces no value at all.
pub fn add_catch_undefined_to_schema(graph: &SchemaGraph) -> Result<SchemaGraph> {
    let mapper = SchemaMapper::new().on_field(MapperKind::ObjectField, |field, field_name, type_name, _| {
        let mut field = field.clone();
        let hint = format!("{}.{}", type_name, field_name);
        field.resolve = Some(decorate_to_catch_undefined(field.resolve.clone(), hint));
        Mapped::Replace(field)
    });
    map_schema(graph, &mapper)
}

fn decorate_to_catch_undefined(inner: Option<FieldResolver>, hint: String) -> FieldResolver {
    let inner = inner.unwrap_or_else(FieldResolver::default_resolver);
    FieldResolver::new(move |params| {
        let inner = inner.clone();
        let hint = hint.clone();
        async move {
            match inner.resolve(params).await? {
                Some(value) => Ok(Some(value)),
                None => Err(ResolverError::new(format!("Resolver for \"{}\" returned undefined", hint))),
            }
        }
    })
}

/// Receives resolver failures before they are returned to the executor.
pub trait ResolverLogger: Send + Sync {
    fn log(&self, error: &ResolverError);
}

/// Logs resolver failures through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ResolverLogger for TracingLogger {
    fn log(&self, err: &ResolverError) {
        error!("{}", err.message);
    }
}

/// Report every object-field failure to `logger` as
/// `Error in resolver T.f\n<message>`, then pass the original error on.
pub fn add_error_logging_to_schema(graph: &SchemaGraph, logger: Arc<dyn ResolverLogger>) -> Result<SchemaGraph> {
    let mapper = SchemaMapper::new().on_field(MapperKind::ObjectField, move |field, field_name, type_name, _| {
        let mut field = field.clone();
        let hint = format!("{}.{}", type_name, field_name);
        field.resolve = Some(decorate_with_logger(field.resolve.clone(), Arc::clone(&logger), hint));
        Mapped::Replace(field)
    });
    map_schema(graph, &mapper)
}

fn decorate_with_logger(inner: Option<FieldResolver>, logger: Arc<dyn ResolverLogger>, hint: String) -> FieldResolver {
    let inner = inner.unwrap_or_else(FieldResolver::default_resolver);
    FieldResolver::new(move |params| {
        let inner = inner.clone();
        let logger = Arc::clone(&logger);
        let hint = hint.clone();
        async move {
            let result = inner.resolve(params).await;
            if let Err(err) = &result {
                let mut logged = ResolverError::new(format!("Error in resolver {}\n{}", hint, err.message));
                logged.extensions = err.extensions.clone();
                logger.log(&logged);
            }
            result
        }
    })
}

/// Wrap every root field so `resolver` computes the root value it receives.
///
/// For query and mutation roots the schema resolver runs at most once per
/// request: the memo lives in the request's [`RequestScope`](crate::graph::RequestScope)
/// under a token drawn here. Subscription fields run it on every call.
pub fn add_schema_level_resolver(graph: &SchemaGraph, resolver: FieldResolver) -> Result<SchemaGraph> {
    let token = Uuid::new_v4();
    let subscription = graph.subscription_type().map(|s| s.name.clone());

    let mapper = SchemaMapper::new().on_field(MapperKind::RootField, move |field, _, type_name, _| {
        let once = subscription.as_deref() != Some(type_name);
        let mut field = field.clone();
        field.resolve = Some(chain_root_resolver(
            field.resolve.clone(),
            resolver.clone(),
            once.then_some(token),
        ));
        Mapped::Replace(field)
    });
    map_schema(graph, &mapper)
}

fn chain_root_resolver(inner: Option<FieldResolver>, outer: FieldResolver, token: Option<Uuid>) -> FieldResolver {
    let inner = inner.unwrap_or_else(FieldResolver::default_resolver);
    FieldResolver::new(move |params: ResolveParams| {
        let inner = inner.clone();
        let outer = outer.clone();
        async move {
            let root = match token {
                Some(token) => {
                    let scope = params.info.scope.clone();
                    let outer_params = params.clone();
                    scope.run_once(token, move || outer.resolve(outer_params)).await?
                }
                None => outer.resolve(params.clone()).await?,
            };
            let mut params = params;
            params.parent = root.unwrap_or(Value::Null);
            inner.resolve(params).await
        }
    })
}

/// Runs the resolver a directive resolver wraps.
pub struct Next {
    resolver: FieldResolver,
    params: ResolveParams,
}

impl Next {
    pub async fn run(self) -> ResolverResult {
        self.resolver.resolve(self.params).await
    }

    /// Parameters the wrapped resolver will receive.
    pub fn params(&self) -> &ResolveParams {
        &self.params
    }
}

type DirectiveResolveFn =
    dyn Fn(Next, DirectiveArgs, ResolveParams) -> BoxFuture<'static, ResolverResult> + Send + Sync;

/// Runtime behaviour for a schema directive on field definitions.
#[derive(Clone)]
pub struct DirectiveResolver(Arc<DirectiveResolveFn>);

impl DirectiveResolver {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Next, DirectiveArgs, ResolveParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        Self(Arc::new(move |next, args, params| f(next, args, params).boxed()))
    }
}

impl fmt::Debug for DirectiveResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DirectiveResolver(..)")
    }
}

pub type DirectiveResolvers = IndexMap<String, DirectiveResolver>;

/// Wrap every object field that carries a usage of a directive in
/// `directive_resolvers`. Usages apply in source order, so the first one
/// ends up innermost.
pub fn attach_directive_resolvers(graph: &SchemaGraph, directive_resolvers: &DirectiveResolvers) -> Result<SchemaGraph> {
    // Coerce usage arguments up front; the mapper callbacks cannot fail.
    let mut wrappers: IndexMap<(String, String), Vec<(DirectiveResolver, DirectiveArgs)>> = IndexMap::new();
    for (_, ty) in graph.types() {
        if !matches!(ty.kind, TypeKind::Object(_)) {
            continue;
        }
        for (field_name, field) in ty.fields().into_iter().flatten() {
            let usages: Vec<_> = field
                .directives
                .iter()
                .filter(|d| directive_resolvers.contains_key(&d.name))
                .cloned()
                .collect();
            if usages.is_empty() {
                continue;
            }
            let mut applied = Vec::new();
            for usage in &usages {
                let values = get_directives(graph, std::slice::from_ref(usage))?;
                let args = values
                    .get(&usage.name)
                    .and_then(|v| v.first())
                    .cloned()
                    .unwrap_or_else(|| usage.arguments.clone());
                if let Some(resolver) = directive_resolvers.get(&usage.name) {
                    applied.push((resolver.clone(), args));
                }
            }
            wrappers.insert((ty.name.clone(), field_name.clone()), applied);
        }
    }
    if wrappers.is_empty() {
        return map_schema(graph, &SchemaMapper::new());
    }

    let wrappers = Arc::new(wrappers);
    let mapper = SchemaMapper::new().on_field(MapperKind::ObjectField, move |field, field_name, type_name, _| {
        let Some(applied) = wrappers.get(&(type_name.to_string(), field_name.to_string())) else {
            return Mapped::Keep;
        };
        let mut resolver = field.resolve.clone().unwrap_or_else(FieldResolver::default_resolver);
        for (directive, args) in applied {
            resolver = wrap_with_directive(resolver, directive.clone(), args.clone());
        }
        let mut field = field.clone();
        field.resolve = Some(resolver);
        Mapped::Replace(field)
    });
    map_schema(graph, &mapper)
}

fn wrap_with_directive(inner: FieldResolver, directive: DirectiveResolver, args: DirectiveArgs) -> FieldResolver {
    FieldResolver::new(move |params: ResolveParams| {
        let next = Next {
            resolver: inner.clone(),
            params: params.clone(),
        };
        (directive.0)(next, args.clone(), params)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{build_schema_from_type_definitions, ParseOptions, RequestScope, ResolveInfo};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn build(sdl: &str) -> SchemaGraph {
        build_schema_from_type_definitions(&sdl.into(), &ParseOptions::default()).unwrap()
    }

    fn resolver_of(graph: &SchemaGraph, type_name: &str, field: &str) -> FieldResolver {
        graph.get_type(type_name).unwrap().fields().unwrap()[field]
            .resolve
            .clone()
            .expect("field has a resolver")
    }

    fn params(type_name: &str, field: &str, scope: &RequestScope) -> ResolveParams {
        let mut info = ResolveInfo::new(type_name, field);
        info.scope = scope.clone();
        ResolveParams::new(Value::Null, info)
    }

    #[tokio::test]
    async fn test_catch_undefined() {
        let graph = add_catch_undefined_to_schema(&build("type Query { a: Int }")).unwrap();
        let err = resolver_of(&graph, "Query", "a")
            .resolve(params("Query", "a", &RequestScope::new()))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Resolver for \"Query.a\" returned undefined");
    }

    struct Collect(Mutex<Vec<String>>);

    impl ResolverLogger for Collect {
        fn log(&self, err: &ResolverError) {
            self.0.lock().unwrap().push(err.message.clone());
        }
    }

    #[tokio::test]
    async fn test_error_logging_reports_and_rethrows() {
        let mut graph = build("type Query { a: Int }");
        let query = graph.query.unwrap();
        graph[query].fields_mut().unwrap()["a"].resolve =
            Some(FieldResolver::sync(|_| Err(ResolverError::new("boom"))));

        let logger = Arc::new(Collect(Mutex::new(Vec::new())));
        let graph = add_error_logging_to_schema(&graph, logger.clone()).unwrap();
        let err = resolver_of(&graph, "Query", "a")
            .resolve(params("Query", "a", &RequestScope::new()))
            .await
            .unwrap_err();

        assert_eq!(err.message, "boom", "original error is passed on");
        assert_eq!(*logger.0.lock().unwrap(), vec!["Error in resolver Query.a\nboom".to_string()]);
    }

    #[tokio::test]
    async fn test_schema_level_resolver_runs_once_per_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let schema_resolver = FieldResolver::sync(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Some(Value::from_json(serde_json::json!({"a": 1, "b": 2})).unwrap()))
        });
        let graph = add_schema_level_resolver(&build("type Query { a: Int b: Int }"), schema_resolver).unwrap();

        let scope = RequestScope::new();
        let a = resolver_of(&graph, "Query", "a").resolve(params("Query", "a", &scope)).await.unwrap();
        let b = resolver_of(&graph, "Query", "b").resolve(params("Query", "b", &scope)).await.unwrap();
        assert_eq!(a, Some(Value::Number(1.into())), "root value reaches the default resolver");
        assert_eq!(b, Some(Value::Number(2.into())));
        assert_eq!(calls.load(Ordering::SeqCst), 1, "once within one request");

        let next_request = RequestScope::new();
        resolver_of(&graph, "Query", "a")
            .resolve(params("Query", "a", &next_request))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2, "a new request runs it again");
    }

    #[tokio::test]
    async fn test_schema_level_resolver_on_subscriptions_runs_every_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let schema_resolver = FieldResolver::sync(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        });
        let graph = add_schema_level_resolver(
            &build("type Query { a: Int } type Subscription { tick: Int tock: Int }"),
            schema_resolver,
        )
        .unwrap();

        let scope = RequestScope::new();
        for field in ["tick", "tock"] {
            resolver_of(&graph, "Subscription", field)
                .resolve(params("Subscription", field, &scope))
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_directive_resolver_wraps_field() {
        let mut graph = build(
            r#"
            directive @upper(suffix: String = "") on FIELD_DEFINITION
            type Query { greeting: String @upper(suffix: "!") plain: String }
            "#,
        );
        let query = graph.query.unwrap();
        graph[query].fields_mut().unwrap()["greeting"].resolve =
            Some(FieldResolver::constant(Value::String("hello".into())));

        let mut directive_resolvers = DirectiveResolvers::new();
        directive_resolvers.insert(
            "upper".to_string(),
            DirectiveResolver::new(|next: Next, args: DirectiveArgs, _params| async move {
                let suffix = match args.get("suffix") {
                    Some(Value::String(s)) => s.clone(),
                    _ => String::new(),
                };
                match next.run().await? {
                    Some(Value::String(s)) => Ok(Some(Value::String(format!("{}{}", s.to_uppercase(), suffix)))),
                    other => Ok(other),
                }
            }),
        );
        let graph = attach_directive_resolvers(&graph, &directive_resolvers).unwrap();

        let result = resolver_of(&graph, "Query", "greeting")
            .resolve(params("Query", "greeting", &RequestScope::new()))
            .await
            .unwrap();
        assert_eq!(result, Some(Value::String("HELLO!".into())));
        let plain = &graph.query_type().unwrap().fields().unwrap()["plain"];
        assert!(plain.resolve.is_none(), "fields without the directive are untouched");
    }
}
