//! Pruning of unused and empty types.
//!
//! Reachability runs over a `petgraph` digraph with one node per named type
//! and one edge per reference. Removal goes through the mapper, so references
//! to a pruned type disappear with it; the pass repeats until nothing else
//! can be removed.

use indexmap::IndexSet;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::graph::{is_reserved_name, is_specified_scalar, NamedType, SchemaGraph, TypeId, TypeKind};
use crate::mapper::{map_schema, Mapped, MapperKind, SchemaMapper};

/// Predicate deciding which types are exempt from pruning.
pub type SkipPruningFn = Arc<dyn Fn(&NamedType) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub struct PruneOptions {
    /// Keep objects, interfaces and input objects without fields.
    pub skip_empty_composite_type_pruning: bool,
    /// Keep interfaces no object implements.
    pub skip_unimplemented_interfaces_pruning: bool,
    /// Keep unions without members.
    pub skip_empty_union_pruning: bool,
    /// Keep types unreachable from the roots.
    pub skip_unused_types_pruning: bool,
    pub skip_pruning: Option<SkipPruningFn>,
}

impl PruneOptions {
    pub fn with_skip_pruning<F>(mut self, f: F) -> Self
    where
        F: Fn(&NamedType) -> bool + Send + Sync + 'static,
    {
        self.skip_pruning = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for PruneOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PruneOptions")
            .field("skip_empty_composite_type_pruning", &self.skip_empty_composite_type_pruning)
            .field("skip_unimplemented_interfaces_pruning", &self.skip_unimplemented_interfaces_pruning)
            .field("skip_empty_union_pruning", &self.skip_empty_union_pruning)
            .field("skip_unused_types_pruning", &self.skip_unused_types_pruning)
            .field("skip_pruning", &self.skip_pruning.is_some())
            .finish()
    }
}

/// Why one type refers to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reference {
    FieldType,
    Argument,
    Interface,
    Implementor,
    Member,
    InputField,
}

/// Type reference graph of a schema.
struct ReferenceGraph {
    graph: DiGraph<TypeId, Reference>,
    nodes: HashMap<TypeId, NodeIndex>,
}

impl ReferenceGraph {
    fn build(schema: &SchemaGraph) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();
        for (id, ty) in schema.types() {
            if !is_reserved_name(&ty.name) {
                nodes.insert(id, graph.add_node(id));
            }
        }

        let mut out = Self { graph, nodes };
        for (id, ty) in schema.types() {
            match &ty.kind {
                TypeKind::Object(_) | TypeKind::Interface(_) => {
                    for field in ty.fields().into_iter().flat_map(|f| f.values()) {
                        out.link(id, field.ty.named_type(), Reference::FieldType);
                        for arg in field.args.values() {
                            out.link(id, arg.ty.named_type(), Reference::Argument);
                        }
                    }
                    for &interface in ty.interfaces() {
                        out.link(id, interface, Reference::Interface);
                        // Implementors of a reachable interface are reachable too.
                        out.link(interface, id, Reference::Implementor);
                    }
                }
                TypeKind::Union(union) => {
                    for &member in &union.members {
                        out.link(id, member, Reference::Member);
                    }
                }
                TypeKind::InputObject(input) => {
                    for field in input.fields.values() {
                        out.link(id, field.ty.named_type(), Reference::InputField);
                    }
                }
                TypeKind::Scalar(_) | TypeKind::Enum(_) => {}
            }
        }
        out
    }

    fn link(&mut self, from: TypeId, to: TypeId, reference: Reference) {
        if let (Some(&a), Some(&b)) = (self.nodes.get(&from), self.nodes.get(&to)) {
            self.graph.add_edge(a, b, reference);
        }
    }

    /// Types reachable from the roots and from directive arguments.
    fn reachable(&self, schema: &SchemaGraph) -> IndexSet<TypeId> {
        let starts = crate::graph::RootKind::ALL
            .into_iter()
            .filter_map(|kind| schema.root(kind))
            .chain(
                schema
                    .directives()
                    .iter()
                    .flat_map(|d| d.args.values().map(|arg| arg.ty.named_type())),
            );

        let mut seen = IndexSet::new();
        let mut dfs = Dfs::empty(&self.graph);
        for start in starts {
            let Some(&node) = self.nodes.get(&start) else {
                continue;
            };
            dfs.move_to(node);
            while let Some(visited) = dfs.next(&self.graph) {
                seen.insert(self.graph[visited]);
            }
        }
        seen
    }
}

/// Names of types to remove in one pass.
fn prunable_types(schema: &SchemaGraph, options: &PruneOptions) -> IndexSet<String> {
    let references = ReferenceGraph::build(schema);
    let reachable = references.reachable(schema);

    let mut prunable = IndexSet::new();
    for (id, ty) in schema.types() {
        if is_reserved_name(&ty.name) || is_specified_scalar(&ty.name) {
            continue;
        }
        if options.skip_pruning.as_ref().is_some_and(|skip| skip(ty)) {
            continue;
        }

        let unused = !options.skip_unused_types_pruning && !reachable.contains(&id);
        let empty = match &ty.kind {
            TypeKind::Object(_) | TypeKind::InputObject(_) => {
                !options.skip_empty_composite_type_pruning && ty.fields().map_or(true, |f| f.is_empty())
            }
            TypeKind::Interface(_) => {
                (!options.skip_empty_composite_type_pruning && ty.fields().map_or(true, |f| f.is_empty()))
                    || (!options.skip_unimplemented_interfaces_pruning && schema.implementations(id).is_empty())
            }
            TypeKind::Union(union) => !options.skip_empty_union_pruning && union.members.is_empty(),
            TypeKind::Scalar(_) | TypeKind::Enum(_) => false,
        };
        if unused || empty {
            prunable.insert(ty.name.clone());
        }
    }
    prunable
}

/// Remove unused and empty types from `schema`.
///
/// Removing a type drops every field, argument, member and interface entry
/// that referred to it, which may empty further types; pruning repeats until
/// a pass removes nothing.
pub fn prune_schema(schema: &SchemaGraph, options: &PruneOptions) -> Result<SchemaGraph> {
    let mut current = schema.canonicalize()?;
    let mut removed = 0;
    loop {
        let prunable = Arc::new(prunable_types(&current, options));
        if prunable.is_empty() {
            break;
        }
        removed += prunable.len();
        debug!(types = ?prunable, "pruning types");

        let names = Arc::clone(&prunable);
        let mapper = SchemaMapper::new().on_type(MapperKind::Type, move |ty, _| {
            if names.contains(&ty.name) {
                Mapped::Remove
            } else {
                Mapped::Keep
            }
        });
        current = map_schema(&current, &mapper)?;
    }
    debug!(removed, "schema pruned");
    Ok(current)
}
