//! The schema graph: an arena of named types plus the name index over it.

use indexmap::IndexMap;
use serde::Serialize;
use std::ops::{Index, IndexMut};

use super::types::{
    is_reserved_name, Directive, DirectiveLocation, InputValue, NamedType, TypeId, TypeKind,
    TypeRef, DEFAULT_DEPRECATION_REASON,
};
use async_graphql::Value;

/// Built-in scalars, added to a graph the first time they are referenced.
pub const SPECIFIED_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// Built-in directives, present in every graph built from SDL.
pub const SPECIFIED_DIRECTIVES: [&str; 4] = ["include", "skip", "deprecated", "specifiedBy"];

pub fn is_specified_scalar(name: &str) -> bool {
    SPECIFIED_SCALARS.contains(&name)
}

pub fn is_specified_directive(name: &str) -> bool {
    SPECIFIED_DIRECTIVES.contains(&name)
}

/// Operation root of a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RootKind {
    Query,
    Mutation,
    Subscription,
}

impl RootKind {
    pub const ALL: [RootKind; 3] = [RootKind::Query, RootKind::Mutation, RootKind::Subscription];

    /// Conventional type name when no `schema {}` block is given.
    pub fn default_type_name(&self) -> &'static str {
        match self {
            RootKind::Query => "Query",
            RootKind::Mutation => "Mutation",
            RootKind::Subscription => "Subscription",
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            RootKind::Query => "query",
            RootKind::Mutation => "mutation",
            RootKind::Subscription => "subscription",
        }
    }
}

/// A complete schema.
///
/// `types` is an arena: mapping appends new instances and leaves the old ones
/// in place, so references taken before a transform stay valid until the
/// graph is rewired into a fresh arena. `type_map` is the name index, kept
/// in insertion order for stable printing.
#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    pub(crate) types: Vec<NamedType>,
    pub(crate) type_map: IndexMap<String, TypeId>,
    pub(crate) directives: Vec<Directive>,
    pub(crate) query: Option<TypeId>,
    pub(crate) mutation: Option<TypeId>,
    pub(crate) subscription: Option<TypeId>,
    pub description: Option<String>,
}

impl SchemaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Arena ───

    /// Push a type into the arena without registering its name.
    pub fn add_type(&mut self, ty: NamedType) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    /// Push a type and register it under its own name.
    ///
    /// An existing entry with the same name keeps its position in the type map
    /// but now points at the new instance.
    pub fn insert_type(&mut self, ty: NamedType) -> TypeId {
        let name = ty.name.clone();
        let id = self.add_type(ty);
        self.type_map.insert(name, id);
        id
    }

    pub fn get_type_by_id(&self, id: TypeId) -> Option<&NamedType> {
        self.types.get(id.index())
    }

    /// Number of instances in the arena, canonical or not.
    pub fn arena_len(&self) -> usize {
        self.types.len()
    }

    // ─── Name index ───

    pub fn type_map(&self) -> &IndexMap<String, TypeId> {
        &self.type_map
    }

    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.type_map.get(name).copied()
    }

    pub fn get_type(&self, name: &str) -> Option<&NamedType> {
        self.type_id(name).map(|id| &self[id])
    }

    pub fn get_type_mut(&mut self, name: &str) -> Option<&mut NamedType> {
        let id = self.type_id(name)?;
        Some(&mut self[id])
    }

    /// Point `name` at `id`, keeping the key's position if it already exists.
    pub fn set_type(&mut self, name: impl Into<String>, id: TypeId) {
        self.type_map.insert(name.into(), id);
    }

    /// Drop a name from the index. The instance stays in the arena.
    pub fn remove_type(&mut self, name: &str) -> Option<TypeId> {
        let id = self.type_map.shift_remove(name)?;
        for root in [&mut self.query, &mut self.mutation, &mut self.subscription] {
            if *root == Some(id) {
                *root = None;
            }
        }
        Some(id)
    }

    /// Registered types in type-map order.
    pub fn types(&self) -> impl Iterator<Item = (TypeId, &NamedType)> + '_ {
        self.type_map.values().map(move |&id| (id, &self[id]))
    }

    /// Registered type ids whose names are not reserved.
    pub fn user_type_ids(&self) -> Vec<TypeId> {
        self.type_map
            .iter()
            .filter(|(name, _)| !is_reserved_name(name))
            .map(|(_, &id)| id)
            .collect()
    }

    /// Make sure a built-in scalar is registered, returning its id.
    pub fn ensure_specified_scalar(&mut self, name: &str) -> Option<TypeId> {
        if !is_specified_scalar(name) {
            return None;
        }
        if let Some(id) = self.type_id(name) {
            return Some(id);
        }
        let mut scalar = NamedType::scalar(name);
        scalar.description = Some(specified_scalar_description(name).to_string());
        Some(self.insert_type(scalar))
    }

    // ─── Roots ───

    pub fn root(&self, kind: RootKind) -> Option<TypeId> {
        match kind {
            RootKind::Query => self.query,
            RootKind::Mutation => self.mutation,
            RootKind::Subscription => self.subscription,
        }
    }

    pub fn set_root(&mut self, kind: RootKind, id: Option<TypeId>) {
        match kind {
            RootKind::Query => self.query = id,
            RootKind::Mutation => self.mutation = id,
            RootKind::Subscription => self.subscription = id,
        }
    }

    pub fn query_type(&self) -> Option<&NamedType> {
        self.query.map(|id| &self[id])
    }

    pub fn mutation_type(&self) -> Option<&NamedType> {
        self.mutation.map(|id| &self[id])
    }

    pub fn subscription_type(&self) -> Option<&NamedType> {
        self.subscription.map(|id| &self[id])
    }

    /// Which root, if any, the type with this id is.
    pub fn root_kind_of(&self, id: TypeId) -> Option<RootKind> {
        RootKind::ALL.into_iter().find(|kind| self.root(*kind) == Some(id))
    }

    /// Root name by kind, used to carry roots across a rewire.
    pub fn root_name(&self, kind: RootKind) -> Option<String> {
        self.root(kind).map(|id| self[id].name.clone())
    }

    // ─── Directives ───

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn directive(&self, name: &str) -> Option<&Directive> {
        self.directives.iter().find(|d| d.name == name)
    }

    pub fn add_directive(&mut self, directive: Directive) {
        match self.directives.iter_mut().find(|d| d.name == directive.name) {
            Some(existing) => *existing = directive,
            None => self.directives.push(directive),
        }
    }

    /// Add `@include`, `@skip`, `@deprecated` and `@specifiedBy` unless already defined.
    pub fn add_specified_directives(&mut self) {
        let boolean = self.ensure_specified_scalar("Boolean");
        let string = self.ensure_specified_scalar("String");
        let (Some(boolean), Some(string)) = (boolean, string) else {
            return;
        };
        let required_bool = TypeRef::non_null(TypeRef::named(boolean));

        let mut specified = Vec::new();
        for name in ["include", "skip"] {
            let mut d = Directive::new(
                name,
                vec![
                    DirectiveLocation::Field,
                    DirectiveLocation::FragmentSpread,
                    DirectiveLocation::InlineFragment,
                ],
            );
            d.args.insert("if".to_string(), InputValue::new(required_bool.clone()));
            specified.push(d);
        }

        let mut deprecated = Directive::new(
            "deprecated",
            vec![
                DirectiveLocation::FieldDefinition,
                DirectiveLocation::ArgumentDefinition,
                DirectiveLocation::InputFieldDefinition,
                DirectiveLocation::EnumValue,
            ],
        );
        deprecated.args.insert(
            "reason".to_string(),
            InputValue::new(TypeRef::named(string))
                .with_default(Value::String(DEFAULT_DEPRECATION_REASON.to_string())),
        );
        specified.push(deprecated);

        let mut specified_by = Directive::new("specifiedBy", vec![DirectiveLocation::Scalar]);
        specified_by.args.insert(
            "url".to_string(),
            InputValue::new(TypeRef::non_null(TypeRef::named(string))),
        );
        specified.push(specified_by);

        for d in specified {
            if self.directive(&d.name).is_none() {
                self.directives.push(d);
            }
        }
    }

    // ─── Queries ───

    /// Name of the innermost type of a reference.
    pub fn type_ref_name(&self, ty: &TypeRef) -> &str {
        &self[ty.named_type()].name
    }

    /// SDL rendering of a reference, e.g. `[Int!]!`.
    pub fn display_type_ref(&self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Named(id) => self[*id].name.clone(),
            TypeRef::List(inner) => format!("[{}]", self.display_type_ref(inner)),
            TypeRef::NonNull(inner) => format!("{}!", self.display_type_ref(inner)),
        }
    }

    /// Registered object types implementing the given interface.
    pub fn implementations(&self, interface: TypeId) -> Vec<TypeId> {
        self.types()
            .filter(|(_, ty)| matches!(ty.kind, TypeKind::Object(_)))
            .filter(|(_, ty)| ty.interfaces().contains(&interface))
            .map(|(id, _)| id)
            .collect()
    }

    /// Object types a value of this abstract type may have at runtime.
    pub fn possible_types(&self, abstract_type: TypeId) -> Vec<TypeId> {
        match &self[abstract_type].kind {
            TypeKind::Union(union) => union.members.clone(),
            TypeKind::Interface(_) => self.implementations(abstract_type),
            TypeKind::Object(_) => vec![abstract_type],
            _ => Vec::new(),
        }
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            directive_count: self.directives.len(),
            ..GraphStats::default()
        };
        for (_, ty) in self.types() {
            stats.type_count += 1;
            match &ty.kind {
                TypeKind::Scalar(_) => stats.scalar_count += 1,
                TypeKind::Object(_) => stats.object_count += 1,
                TypeKind::Interface(_) => stats.interface_count += 1,
                TypeKind::Union(_) => stats.union_count += 1,
                TypeKind::Enum(_) => stats.enum_count += 1,
                TypeKind::InputObject(_) => stats.input_object_count += 1,
            }
            if let Some(fields) = ty.fields() {
                stats.field_count += fields.len();
                stats.argument_count += fields.values().map(|f| f.args.len()).sum::<usize>();
            }
        }
        stats
    }
}

impl Index<TypeId> for SchemaGraph {
    type Output = NamedType;

    fn index(&self, id: TypeId) -> &NamedType {
        &self.types[id.index()]
    }
}

impl IndexMut<TypeId> for SchemaGraph {
    fn index_mut(&mut self, id: TypeId) -> &mut NamedType {
        &mut self.types[id.index()]
    }
}

fn specified_scalar_description(name: &str) -> &'static str {
    match name {
        "Int" => "The `Int` scalar type represents non-fractional signed whole numeric values.",
        "Float" => "The `Float` scalar type represents signed double-precision fractional values.",
        "String" => "The `String` scalar type represents textual data, represented as UTF-8 character sequences.",
        "Boolean" => "The `Boolean` scalar type represents `true` or `false`.",
        _ => "The `ID` scalar type represents a unique identifier.",
    }
}

/// Counts by kind, for the CLI and logs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub type_count: usize,
    pub object_count: usize,
    pub interface_count: usize,
    pub union_count: usize,
    pub enum_count: usize,
    pub scalar_count: usize,
    pub input_object_count: usize,
    pub field_count: usize,
    pub argument_count: usize,
    pub directive_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::Field;

    #[test]
    fn test_insert_type_keeps_position() {
        let mut graph = SchemaGraph::new();
        let a = graph.insert_type(NamedType::object("A"));
        graph.insert_type(NamedType::object("B"));
        let a2 = graph.insert_type(NamedType::object("A"));

        assert_ne!(a, a2, "re-inserting creates a new instance");
        let names: Vec<&str> = graph.type_map().keys().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(graph.type_id("A"), Some(a2));
        assert_eq!(graph.arena_len(), 3);
    }

    #[test]
    fn test_specified_directives_and_scalars() {
        let mut graph = SchemaGraph::new();
        graph.add_specified_directives();
        assert!(graph.directive("deprecated").is_some());
        assert!(graph.get_type("Boolean").is_some());
        assert!(graph.get_type("String").is_some());
        assert!(graph.ensure_specified_scalar("Date").is_none());
    }

    #[test]
    fn test_display_type_ref_and_stats() {
        let mut graph = SchemaGraph::new();
        let string = graph.ensure_specified_scalar("String").unwrap();
        let ty = TypeRef::non_null(TypeRef::list(TypeRef::named(string)));
        assert_eq!(graph.display_type_ref(&ty), "[String]!");

        let query = graph.insert_type(NamedType::object("Query").with_field("hello", Field::new(ty)));
        graph.set_root(RootKind::Query, Some(query));

        let stats = graph.stats();
        assert_eq!(stats.type_count, 2);
        assert_eq!(stats.object_count, 1);
        assert_eq!(stats.field_count, 1);
        assert_eq!(graph.root_kind_of(query), Some(RootKind::Query));

        graph.remove_type("Query");
        assert!(graph.query_type().is_none(), "removing a root clears it");
    }
}
