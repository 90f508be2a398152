//! Resolver inheritance from interfaces.

use indexmap::IndexSet;

use super::map::{is_meta_key, ResolverMap, TypeResolvers, IS_TYPE_OF_KEY};
use crate::graph::{SchemaGraph, TypeKind};

/// Give every object and interface the field entries (and `__isTypeOf`) of
/// the interfaces it implements.
///
/// Interfaces are applied in declaration order, so a later interface wins a
/// conflict; the type's own entries override everything inherited. Other
/// entries are carried over unchanged.
pub fn extend_resolvers_from_interfaces(graph: &SchemaGraph, resolvers: &ResolverMap) -> ResolverMap {
    let type_names: IndexSet<&String> = graph.type_map().keys().chain(resolvers.types.keys()).collect();

    let mut extended = ResolverMap {
        schema_resolver: resolvers.schema_resolver.clone(),
        types: Default::default(),
    };
    for type_name in type_names {
        let own = resolvers.get(type_name);
        let implements = graph
            .get_type(type_name)
            .filter(|ty| matches!(ty.kind, TypeKind::Object(_) | TypeKind::Interface(_)));

        let Some(ty) = implements else {
            if let Some(own) = own {
                extended.types.insert(type_name.clone(), own.clone());
            }
            continue;
        };

        let mut merged = TypeResolvers::new();
        for interface in ty.interfaces() {
            let Some(inherited) = resolvers.get(&graph[*interface].name) else {
                continue;
            };
            for (key, entry) in inherited.iter() {
                if key == IS_TYPE_OF_KEY || !is_meta_key(key) {
                    merged.entries.insert(key.clone(), entry.clone());
                }
            }
        }
        if let Some(own) = own {
            for (key, entry) in own.iter() {
                merged.entries.insert(key.clone(), entry.clone());
            }
        }
        if !merged.is_empty() {
            extended.types.insert(type_name.clone(), merged);
        }
    }
    extended
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{build_schema_from_type_definitions, FieldResolver, ParseOptions, TypeResolver};
    use crate::resolvers::map::{ResolverEntry, RESOLVE_TYPE_KEY};
    use async_graphql::Value;

    #[test]
    fn test_concrete_types_inherit_interface_fields() {
        let graph = build_schema_from_type_definitions(
            &r#"
            interface Node { id: ID }
            interface Named { id: ID name: String }
            type User implements Node & Named { id: ID name: String }
            type Query { node: Node }
            "#
            .into(),
            &ParseOptions::default(),
        )
        .unwrap();

        let node_id = FieldResolver::constant(Value::String("node".into()));
        let named_id = FieldResolver::constant(Value::String("named".into()));
        let own_name = FieldResolver::constant(Value::String("own".into()));
        let resolvers = ResolverMap::new()
            .with_type(
                "Node",
                TypeResolvers::new()
                    .field("id", node_id)
                    .resolve_type(TypeResolver::new(|_| Some("User".into()))),
            )
            .with_type(
                "Named",
                TypeResolvers::new()
                    .field("id", named_id.clone())
                    .field("name", FieldResolver::default_resolver()),
            )
            .with_type("User", TypeResolvers::new().field("name", own_name.clone()));

        let extended = extend_resolvers_from_interfaces(&graph, &resolvers);
        let user = extended.get("User").unwrap();

        match user.get("id") {
            Some(ResolverEntry::Resolve(r)) => assert!(r.ptr_eq(&named_id), "later interface wins"),
            other => panic!("unexpected {:?}", other),
        }
        match user.get("name") {
            Some(ResolverEntry::Resolve(r)) => assert!(r.ptr_eq(&own_name), "own entry wins"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(user.get(RESOLVE_TYPE_KEY).is_none(), "__resolveType is not inherited");
        assert!(extended.get("Node").unwrap().get(RESOLVE_TYPE_KEY).is_some());
    }
}
