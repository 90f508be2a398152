//! Query execution over a schema graph.
//!
//! [`ExecutableSchema`] registers a canonical graph with async-graphql's
//! dynamic executor; field resolvers, leaf coercions and type resolution
//! stay those of the graph.
//!
//! ## Example
//!
//! ```rust,no_run
//! # async fn run() -> schemawire::Result<()> {
//! use schemawire::graphql::{ExecutableSchema, GraphQLRequest};
//! use schemawire::{make_executable_schema, ExecutableSchemaDefinition};
//!
//! let graph = make_executable_schema(ExecutableSchemaDefinition::new("type Query { hello: String }"))?;
//! let schema = ExecutableSchema::new(graph)?;
//! let result = schema.execute(GraphQLRequest::new("{ hello }"), None, None).await;
//! # Ok(())
//! # }
//! ```

pub mod resolve;
pub mod schema;

use async_graphql::Value;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::graph::{ContextValue, RequestScope, SchemaGraph};
pub use resolve::{ExecutorOptions, RootValue};
use resolve::Bridge;

/// JSON request body: `{query, operationName?, variables?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
}

impl GraphQLRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            operation_name: None,
            variables: None,
        }
    }

    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    pub fn variables(mut self, variables: serde_json::Value) -> Self {
        self.variables = Some(variables);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// One entry of `errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Response body: `{data?, errors?}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
}

impl ExecutionResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A schema graph ready to run queries.
#[derive(Clone)]
pub struct ExecutableSchema {
    graph: Arc<SchemaGraph>,
    schema: async_graphql::dynamic::Schema,
}

impl ExecutableSchema {
    pub fn new(graph: SchemaGraph) -> Result<Self> {
        Self::with_options(graph, ExecutorOptions::default())
    }

    pub fn with_options(graph: SchemaGraph, options: ExecutorOptions) -> Result<Self> {
        if options.debug {
            warn!("debug mode on: resolver errors carry errorType and stacktrace extensions");
        }
        let graph = Arc::new(graph);
        let bridge = Arc::new(Bridge {
            graph: Arc::clone(&graph),
            options,
        });
        let schema = schema::build_dynamic_schema(&bridge)?;
        Ok(Self { graph, schema })
    }

    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    /// Run one request. Failures of any kind end up in `errors`.
    pub async fn execute(
        &self,
        request: GraphQLRequest,
        root_value: Option<Value>,
        context: Option<ContextValue>,
    ) -> ExecutionResult {
        let mut gql = async_graphql::Request::new(request.query).data(RequestScope::new());
        if let Some(name) = request.operation_name {
            gql = gql.operation_name(name);
        }
        if let Some(variables) = request.variables {
            gql = gql.variables(async_graphql::Variables::from_json(variables));
        }
        if let Some(root) = root_value {
            gql = gql.data(RootValue(root));
        }
        if let Some(context) = context {
            gql = gql.data(context);
        }

        let response = self.schema.execute(gql).await;
        debug!(errors = response.errors.len(), "request executed");
        into_execution_result(response)
    }

    /// Run a bare query and return the result as pretty JSON.
    pub async fn execute_to_json(&self, query: &str) -> String {
        let result = self.execute(GraphQLRequest::new(query), None, None).await;
        serde_json::to_string_pretty(&result).unwrap_or_else(|_| "{}".to_string())
    }
}

fn into_execution_result(response: async_graphql::Response) -> ExecutionResult {
    let errors: Vec<GraphQLError> = response
        .errors
        .iter()
        .map(|err| {
            serde_json::to_value(err)
                .ok()
                .and_then(|json| serde_json::from_value(json).ok())
                .unwrap_or_else(|| GraphQLError {
                    message: err.message.clone(),
                    locations: Vec::new(),
                    path: Vec::new(),
                    extensions: None,
                })
        })
        .collect();

    // A request that never reached execution has no data at all.
    let data = match response.data {
        Value::Null if !errors.is_empty() => None,
        data => data.into_json().ok(),
    };
    ExecutionResult { data, errors }
}
