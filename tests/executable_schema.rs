//! End-to-end behaviour: build, transform, wire, prune and execute.

use async_graphql::Value;
use schemawire::graph::{RootKind, TypeId, TypeKind};
use schemawire::graphql::{ExecutableSchema, GraphQLRequest};
use schemawire::{
    build_schema_from_type_definitions, heal_schema, make_executable_schema, map_schema, prune_schema,
    ExecutableSchemaDefinition, FieldResolver, Mapped, MapperKind, ParseOptions, PruneOptions, ResolverMap,
    SchemaGraph, SchemaMapper, TypeResolvers, ValidatorBehavior,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn build(sdl: &str) -> SchemaGraph {
    build_schema_from_type_definitions(&sdl.into(), &ParseOptions::default()).unwrap()
}

/// Every type id referenced by a field, argument, interface or member.
fn references(graph: &SchemaGraph) -> Vec<(String, TypeId)> {
    let mut out = Vec::new();
    for (_, ty) in graph.types() {
        for (name, field) in ty.fields().into_iter().flatten() {
            out.push((format!("{}.{}", ty.name, name), field.ty.named_type()));
            for (arg_name, arg) in &field.args {
                out.push((format!("{}.{}({})", ty.name, name, arg_name), arg.ty.named_type()));
            }
        }
        if let TypeKind::InputObject(input) = &ty.kind {
            for (name, field) in &input.fields {
                out.push((format!("{}.{}", ty.name, name), field.ty.named_type()));
            }
        }
        for &interface in ty.interfaces() {
            out.push((format!("{} implements", ty.name), interface));
        }
        if let TypeKind::Union(union) = &ty.kind {
            for &member in &union.members {
                out.push((format!("{} member", ty.name), member));
            }
        }
    }
    out
}

fn assert_no_dangling(graph: &SchemaGraph) {
    for (site, id) in references(graph) {
        let name = &graph[id].name;
        assert_eq!(graph.type_id(name), Some(id), "{} points at a non-canonical {}", site, name);
    }
}

#[tokio::test]
async fn hello_world_end_to_end() {
    let resolvers = ResolverMap::new().field(
        "Query",
        "hello",
        FieldResolver::sync(|_| Ok(Some(Value::String("world".into())))),
    );
    let graph = make_executable_schema(
        ExecutableSchemaDefinition::new("type Query { hello: String }").with_resolvers(resolvers),
    )
    .unwrap();
    let schema = ExecutableSchema::new(graph).unwrap();

    let result = schema.execute(GraphQLRequest::new("{ hello }"), None, None).await;
    assert_eq!(result.data, Some(json!({"hello": "world"})));
    assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
}

#[test]
fn rename_propagates_to_every_reference() {
    let graph = build(
        r#"
        type Foo { id: ID next: Foo }
        input FooFilter { like: Foo2 }
        input Foo2 { id: ID }
        type Query { foo(filter: FooFilter): Foo foos: [Foo!]! }
        "#,
    );
    let mapper = SchemaMapper::new().on_type(MapperKind::ObjectType, |ty, _| {
        if ty.name == "Foo" {
            Mapped::Rename("Bar".to_string(), ty.clone())
        } else {
            Mapped::Keep
        }
    });
    let mapped = map_schema(&graph, &mapper).unwrap();

    assert!(mapped.get_type("Foo").is_none(), "old name is gone");
    let bar = mapped.type_id("Bar").unwrap();
    let query = mapped.query_type().unwrap().fields().unwrap();
    assert_eq!(query["foo"].ty.named_type(), bar);
    assert_eq!(mapped.display_type_ref(&query["foos"].ty), "[Bar!]!");
    assert_eq!(mapped.get_type("Bar").unwrap().fields().unwrap()["next"].ty.named_type(), bar);
    assert_no_dangling(&mapped);
}

#[test]
fn deleting_a_scalar_cascades_through_pruning() {
    let graph = build(
        r#"
        scalar X
        type Holder { x: X }
        input Search { x: X term: String }
        type Query { holder: Holder find(x: X, search: Search): Int ok: Int }
        "#,
    );
    let mapper = SchemaMapper::new().on_type(MapperKind::ScalarType, |ty, _| {
        if ty.name == "X" {
            Mapped::Remove
        } else {
            Mapped::Keep
        }
    });
    let mapped = map_schema(&graph, &mapper).unwrap();
    assert!(mapped.get_type("X").is_none());
    assert!(
        mapped.get_type("Holder").unwrap().fields().unwrap().is_empty(),
        "field of the deleted type removed from its owner"
    );
    let find = &mapped.query_type().unwrap().fields().unwrap()["find"];
    assert!(!find.args.contains_key("x"), "argument of the deleted type removed");

    let pruned = prune_schema(&mapped, &PruneOptions::default()).unwrap();
    assert!(pruned.get_type("Holder").is_none(), "emptied object pruned");
    assert!(!pruned.query_type().unwrap().fields().unwrap().contains_key("holder"));
    assert!(pruned.get_type("Search").is_some());
    assert!(
        references(&pruned).iter().all(|(_, id)| pruned[*id].name != "X"),
        "no reference to X remains"
    );
    assert_no_dangling(&pruned);
}

#[test]
fn resolver_strictness_policies() {
    let sdl = "type Query { hello: String }";
    let resolvers = ResolverMap::new().field("Query", "bogus", FieldResolver::constant(Value::Null));

    let mut strict = ExecutableSchemaDefinition::new(sdl).with_resolvers(resolvers.clone());
    strict.resolver_validation_options.require_resolvers_to_match_schema = Some(ValidatorBehavior::Error);
    let err = make_executable_schema(strict).unwrap_err();
    assert!(err.is_validation(), "got: {}", err);
    assert_eq!(err.to_string(), "Query.bogus defined in resolvers, but not in schema");

    let mut lenient = ExecutableSchemaDefinition::new(sdl).with_resolvers(resolvers);
    lenient.resolver_validation_options.require_resolvers_to_match_schema = Some(ValidatorBehavior::Ignore);
    let graph = make_executable_schema(lenient).unwrap();
    let fields = graph.query_type().unwrap().fields().unwrap();
    assert!(!fields.contains_key("bogus"));
    assert_eq!(fields.len(), 1);
}

#[tokio::test]
async fn schema_level_resolver_runs_once_per_request() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let resolvers = ResolverMap::new().with_schema_resolver(FieldResolver::sync(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Value::from_json(json!({"a": "A", "b": "B"})).unwrap()))
    }));
    let graph = make_executable_schema(
        ExecutableSchemaDefinition::new("type Query { a: String b: String }").with_resolvers(resolvers),
    )
    .unwrap();
    let schema = ExecutableSchema::new(graph).unwrap();

    let first = schema.execute(GraphQLRequest::new("{ a b }"), None, None).await;
    assert_eq!(first.data, Some(json!({"a": "A", "b": "B"})));
    assert_eq!(calls.load(Ordering::SeqCst), 1, "once for two root fields");

    // Two requests in flight over the same schema do not share the memo.
    let (second, third) = tokio::join!(
        schema.execute(GraphQLRequest::new("{ a b }"), None, None),
        schema.execute(GraphQLRequest::new("{ b }"), None, None),
    );
    assert!(second.errors.is_empty() && third.errors.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn in_place_attachment_executes() {
    let resolvers = ResolverMap::new()
        .field("Query", "color", FieldResolver::constant(Value::Number(1.into())))
        .with_type("Color", TypeResolvers::new().enum_value("RED", Value::Number(1.into())));
    let mut definition =
        ExecutableSchemaDefinition::new("enum Color { RED GREEN } type Query { color: Color }").with_resolvers(resolvers);
    definition.update_resolvers_in_place = true;
    let graph = make_executable_schema(definition).unwrap();
    assert_no_dangling(&graph);

    let schema = ExecutableSchema::new(graph).unwrap();
    let result = schema.execute(GraphQLRequest::new("{ color }"), None, None).await;
    assert_eq!(result.data, Some(json!({"color": "RED"})), "internal value serialized to its name");
}

#[tokio::test]
async fn interface_resolvers_are_inherited() {
    let resolvers = ResolverMap::new()
        .field("Node", "id", FieldResolver::constant(Value::String("inherited".into())))
        .field(
            "Query",
            "user",
            FieldResolver::constant(Value::from_json(json!({"name": "ann"})).unwrap()),
        );
    let mut definition = ExecutableSchemaDefinition::new(
        "interface Node { id: ID } type User implements Node { id: ID name: String } type Query { user: User }",
    )
    .with_resolvers(resolvers);
    definition.inherit_resolvers_from_interfaces = true;
    definition.resolver_validation_options.require_resolvers_for_resolve_type = Some(ValidatorBehavior::Ignore);
    let schema = ExecutableSchema::new(make_executable_schema(definition).unwrap()).unwrap();

    let result = schema
        .execute(GraphQLRequest::new("{ user { id name } }"), None, None)
        .await;
    assert_eq!(result.data, Some(json!({"user": {"id": "inherited", "name": "ann"}})));
}

#[test]
fn healing_cycles_terminates_and_is_idempotent() {
    let mut graph = build("type A { b: B } type B { a: A } type Query { a: A }");
    heal_schema(&mut graph).unwrap();
    let before: Vec<(String, TypeId)> = graph.type_map().iter().map(|(k, v)| (k.clone(), *v)).collect();
    heal_schema(&mut graph).unwrap();
    let after: Vec<(String, TypeId)> = graph.type_map().iter().map(|(k, v)| (k.clone(), *v)).collect();
    assert_eq!(before, after, "healing a canonical graph changes nothing");

    let a = graph.type_id("A").unwrap();
    let b = graph.type_id("B").unwrap();
    assert_eq!(graph[a].fields().unwrap()["b"].ty.named_type(), b);
    assert_eq!(graph[b].fields().unwrap()["a"].ty.named_type(), a);
    assert_eq!(graph.root(RootKind::Query), graph.type_id("Query"));
}
