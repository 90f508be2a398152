//! Runtime callables stored on schema nodes.
//!
//! Resolvers are shared, cheaply cloneable handles (`Arc` inside) so that
//! mapping a schema copies wiring instead of re-creating it.

use async_graphql::Value;
use futures::future::BoxFuture;
use futures::FutureExt;
use indexmap::IndexMap;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Error produced by a resolver while a request executes.
///
/// Cloneable so memoized results (see [`RequestScope::run_once`]) can be
/// handed to every caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ResolverError {
    pub message: String,
    pub extensions: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ResolverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            extensions: None,
        }
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value);
        self
    }
}

/// `Ok(None)` means the resolver produced no value at all (as opposed to `null`).
pub type ResolverResult = std::result::Result<Option<Value>, ResolverError>;

/// Opaque per-request context handed to every resolver.
#[derive(Clone)]
pub struct ContextValue(Arc<dyn Any + Send + Sync>);

impl ContextValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContextValue(..)")
    }
}

/// State that lives exactly as long as one request.
///
/// Memoized values are keyed by a registration token, never by the parsed
/// query document, so concurrent requests sharing a document do not see
/// each other's results.
#[derive(Clone, Default)]
pub struct RequestScope {
    cells: Arc<Mutex<HashMap<Uuid, Arc<OnceCell<ResolverResult>>>>>,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `init` at most once for `token` within this request and return its result.
    pub async fn run_once<F, Fut>(&self, token: Uuid, init: F) -> ResolverResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ResolverResult>,
    {
        let cell = {
            let mut cells = match self.cells.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            cells.entry(token).or_default().clone()
        };
        cell.get_or_init(init).await.clone()
    }
}

impl fmt::Debug for RequestScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RequestScope(..)")
    }
}

/// Where a resolver is running.
#[derive(Debug, Clone)]
pub struct ResolveInfo {
    pub field_name: String,
    pub parent_type: String,
    /// Printed return type, e.g. `[String!]!`.
    pub return_type: String,
    pub scope: RequestScope,
}

impl ResolveInfo {
    pub fn new(parent_type: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            parent_type: parent_type.into(),
            return_type: String::new(),
            scope: RequestScope::new(),
        }
    }
}

/// Everything a field resolver receives.
#[derive(Debug, Clone)]
pub struct ResolveParams {
    pub parent: Value,
    pub args: IndexMap<String, Value>,
    pub context: Option<ContextValue>,
    pub info: ResolveInfo,
}

impl ResolveParams {
    pub fn new(parent: Value, info: ResolveInfo) -> Self {
        Self {
            parent,
            args: IndexMap::new(),
            context: None,
            info,
        }
    }

    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }
}

type ResolveFn = dyn Fn(ResolveParams) -> BoxFuture<'static, ResolverResult> + Send + Sync;

/// Resolves one field.
#[derive(Clone)]
pub struct FieldResolver(Arc<ResolveFn>);

impl FieldResolver {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(ResolveParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        Self(Arc::new(move |params| f(params).boxed()))
    }

    /// Wrap a synchronous function.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&ResolveParams) -> ResolverResult + Send + Sync + 'static,
    {
        Self(Arc::new(move |params| {
            let result = f(&params);
            async move { result }.boxed()
        }))
    }

    /// Always resolve to `value`.
    pub fn constant(value: Value) -> Self {
        Self::sync(move |_| Ok(Some(value.clone())))
    }

    /// Read the property named after the field from the parent object.
    pub fn default_resolver() -> Self {
        Self::sync(|params| Ok(default_property(&params.parent, &params.info.field_name)))
    }

    pub fn resolve(&self, params: ResolveParams) -> BoxFuture<'static, ResolverResult> {
        (self.0)(params)
    }

    pub fn ptr_eq(&self, other: &FieldResolver) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for FieldResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldResolver(..)")
    }
}

pub(crate) fn default_property(parent: &Value, field_name: &str) -> Option<Value> {
    match parent {
        Value::Object(map) => map.get(field_name).cloned(),
        _ => None,
    }
}

/// Picks the concrete object type name for a value of an abstract type.
#[derive(Clone)]
pub struct TypeResolver(Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>);

impl TypeResolver {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn resolve(&self, value: &Value) -> Option<String> {
        (self.0)(value)
    }
}

impl fmt::Debug for TypeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TypeResolver(..)")
    }
}

/// Object-side counterpart of [`TypeResolver`].
#[derive(Clone)]
pub struct IsTypeOf(Arc<dyn Fn(&Value) -> bool + Send + Sync>);

impl IsTypeOf {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn check(&self, value: &Value) -> bool {
        (self.0)(value)
    }
}

impl fmt::Debug for IsTypeOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IsTypeOf(..)")
    }
}

/// A scalar's serialize or parse function.
#[derive(Clone)]
pub struct LeafCoercion(Arc<dyn Fn(&Value) -> std::result::Result<Value, String> + Send + Sync>);

impl LeafCoercion {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn apply(&self, value: &Value) -> std::result::Result<Value, String> {
        (self.0)(value)
    }
}

impl fmt::Debug for LeafCoercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LeafCoercion(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::Name;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn object(pairs: &[(&str, Value)]) -> Value {
        Value::Object(
            pairs
                .iter()
                .map(|(k, v)| (Name::new(k), v.clone()))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_default_resolver_reads_parent_property() {
        let parent = object(&[("hello", Value::String("world".into()))]);
        let params = ResolveParams::new(parent, ResolveInfo::new("Query", "hello"));
        let result = FieldResolver::default_resolver().resolve(params).await.unwrap();
        assert_eq!(result, Some(Value::String("world".into())));

        let params = ResolveParams::new(Value::Null, ResolveInfo::new("Query", "hello"));
        let result = FieldResolver::default_resolver().resolve(params).await.unwrap();
        assert_eq!(result, None, "non-object parent has no properties");
    }

    #[tokio::test]
    async fn test_run_once_per_scope() {
        let calls = Arc::new(AtomicUsize::new(0));
        let token = Uuid::new_v4();
        let scope = RequestScope::new();

        for _ in 0..3 {
            let calls = calls.clone();
            let result = scope
                .run_once(token, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(Value::Boolean(true)))
                })
                .await;
            assert_eq!(result, Ok(Some(Value::Boolean(true))));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1, "same scope runs once");

        let other = RequestScope::new();
        let calls2 = calls.clone();
        other
            .run_once(token, || async move {
                calls2.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2, "a new request runs again");
    }

    #[test]
    fn test_context_downcast() {
        let ctx = ContextValue::new(42u32);
        assert_eq!(ctx.downcast_ref::<u32>(), Some(&42));
        assert!(ctx.downcast_ref::<String>().is_none());
    }
}
