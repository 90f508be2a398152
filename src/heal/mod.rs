//! Reference healing.
//!
//! After a transform, fields may still point at pre-transform instances and
//! the type map may hold stale keys from renames. Healing makes every
//! reference point at the canonical instance for its name, drops references
//! to deleted types and rejects two instances claiming one name.
//!
//! Two flavours: [`heal_schema`] repairs a graph in place (the arena keeps
//! any superseded instances), [`rewire_types`] builds a fresh, compact graph.

pub mod rewire;

use indexmap::IndexMap;
use tracing::debug;

pub use rewire::{rewire_types, WorkingTypeMap};

use crate::error::{Result, SchemaError};
use crate::graph::{is_reserved_name, Field, RootKind, SchemaGraph, TypeId, TypeKind};

/// Heal types, directives and root pointers in place.
pub fn heal_schema(graph: &mut SchemaGraph) -> Result<()> {
    let lookup = HealLookup::new(graph)?;

    for kind in RootKind::ALL {
        let healed = graph.root(kind).and_then(|id| lookup.resolve(graph, id));
        graph.set_root(kind, healed);
    }
    heal_with(graph, &lookup);
    Ok(())
}

/// Heal the type map and directive arguments in place. Root pointers are
/// left alone; see [`heal_schema`].
pub fn heal_types(graph: &mut SchemaGraph) -> Result<()> {
    let lookup = HealLookup::new(graph)?;
    heal_with(graph, &lookup);
    Ok(())
}

impl SchemaGraph {
    /// Copy the canonical types into a fresh arena, dropping superseded instances.
    pub fn canonicalize(&self) -> Result<SchemaGraph> {
        let map: WorkingTypeMap = self
            .type_map()
            .iter()
            .map(|(name, &id)| (name.clone(), Some(id)))
            .collect();
        let mut graph = rewire_types(self, &map, self.directives())?;
        for kind in RootKind::ALL {
            let id = self.root_name(kind).and_then(|name| graph.type_id(&name));
            graph.set_root(kind, id);
        }
        graph.description = self.description.clone();
        Ok(graph)
    }
}

/// Canonical instance per declared name, plus the stale keys that still
/// route to one (left behind by renames).
struct HealLookup {
    canonical: IndexMap<String, TypeId>,
    aliases: IndexMap<String, TypeId>,
}

impl HealLookup {
    // Step 1: every check happens before anything is mutated
    fn new(graph: &SchemaGraph) -> Result<Self> {
        let mut canonical: IndexMap<String, TypeId> = IndexMap::new();
        let mut aliases = IndexMap::new();
        for (key, &id) in graph.type_map() {
            if is_reserved_name(key) {
                continue;
            }
            let name = &graph[id].name;
            if is_reserved_name(name) {
                continue;
            }
            match canonical.get(name) {
                Some(&existing) if existing != id => {
                    return Err(SchemaError::DuplicateTypeName(name.clone()));
                }
                Some(_) => {}
                None => {
                    canonical.insert(name.clone(), id);
                }
            }
            if key != name {
                aliases.insert(key.clone(), id);
            }
        }
        Ok(Self { canonical, aliases })
    }

    /// Canonical instance for whatever `id` refers to, by name.
    fn resolve(&self, graph: &SchemaGraph, id: TypeId) -> Option<TypeId> {
        let name = &graph[id].name;
        if is_reserved_name(name) {
            return Some(id);
        }
        self.canonical
            .get(name)
            .or_else(|| self.aliases.get(name))
            .copied()
    }
}

fn heal_with(graph: &mut SchemaGraph, lookup: &HealLookup) {
    // Step 2: directive arguments
    let mut directives = graph.directives.clone();
    for directive in &mut directives {
        directive
            .args
            .retain(|_, arg| match arg.ty.map_named(&mut |id| lookup.resolve(graph, id)) {
                Some(ty) => {
                    arg.ty = ty;
                    true
                }
                None => false,
            });
    }
    graph.directives = directives;

    // Steps 3-5: fields, arguments, interfaces, union members
    let mut dropped = 0usize;
    let targets: Vec<TypeId> = graph
        .type_map()
        .values()
        .copied()
        .filter(|id| lookup.canonical.values().any(|c| c == id) || is_reserved_name(&graph[*id].name))
        .collect();
    for id in targets {
        let mut ty = graph[id].clone();
        let mut resolve = |tid: TypeId| lookup.resolve(graph, tid);
        match &mut ty.kind {
            TypeKind::Object(object) => {
                object.interfaces = object.interfaces.iter().filter_map(|i| resolve(*i)).collect();
                dropped += heal_fields(&mut object.fields, &mut resolve);
            }
            TypeKind::Interface(interface) => {
                interface.interfaces = interface.interfaces.iter().filter_map(|i| resolve(*i)).collect();
                dropped += heal_fields(&mut interface.fields, &mut resolve);
            }
            TypeKind::Union(union) => {
                union.members = union.members.iter().filter_map(|m| resolve(*m)).collect();
            }
            TypeKind::InputObject(input) => {
                dropped += heal_fields(&mut input.fields, &mut resolve);
            }
            TypeKind::Scalar(_) | TypeKind::Enum(_) => {}
        }
        graph[id] = ty;
    }

    // Step 6: stale keys go; renamed types keep their position under the new name
    let mut healed = IndexMap::with_capacity(graph.type_map.len());
    for (key, &id) in &graph.type_map {
        if is_reserved_name(key) {
            healed.insert(key.clone(), id);
            continue;
        }
        let name = &graph[id].name;
        if lookup.canonical.get(name) == Some(&id) && !healed.contains_key(name) {
            healed.insert(name.clone(), id);
        }
    }
    graph.type_map = healed;

    debug!(types = graph.type_map.len(), dropped, "types healed");
}

/// Heal field and argument types, removing those whose type is gone.
/// Returns how many fields were removed.
fn heal_fields<F>(fields: &mut IndexMap<String, Field>, resolve: &mut F) -> usize
where
    F: FnMut(TypeId) -> Option<TypeId>,
{
    let before = fields.len();
    fields.retain(|_, field| match field.ty.map_named(resolve) {
        Some(ty) => {
            field.ty = ty;
            field
                .args
                .retain(|_, arg| match arg.ty.map_named(resolve) {
                    Some(ty) => {
                        arg.ty = ty;
                        true
                    }
                    None => false,
                });
            true
        }
        None => false,
    });
    before - fields.len()
}
