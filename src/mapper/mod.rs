//! Structural mapper.
//!
//! [`map_schema`] walks a schema graph and applies caller-supplied transforms
//! per node kind, then rewires the result into a fresh canonical graph. The
//! input graph is never modified.
//!
//! Order of passes:
//!
//! 1. serialize default values against the current leaf types
//! 2. leaf type transforms (scalars, enums), then enum value transforms
//! 3. parse default values against the (possibly new) leaf types
//! 4. composite type transforms
//! 5. field transforms, then argument transforms
//! 6. directive transforms
//! 7. rewire every reference to its canonical instance

pub mod kind;

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::graph::values::{map_defaults_of, parse_leaf, serialize_leaf};
use crate::graph::{
    is_reserved_name, transform_input_value, Directive, EnumValue, Field, InputValue, NamedType,
    RootKind, SchemaGraph, TypeKind,
};
use crate::heal::{rewire_types, WorkingTypeMap};
pub use kind::{field_specifiers, most_specific, type_specifiers, MapperKind};

/// Outcome of one transform.
#[derive(Debug, Clone)]
pub enum Mapped<T> {
    /// Leave the node as it is.
    Keep,
    /// Use this node instead.
    Replace(T),
    /// Use this node under a new name. Source positions are dropped.
    Rename(String, T),
    /// Delete the node and every reference to it.
    Remove,
}

pub type TypeMapperFn = Arc<dyn Fn(&NamedType, &SchemaGraph) -> Mapped<NamedType> + Send + Sync>;
pub type EnumValueMapperFn =
    Arc<dyn Fn(&EnumValue, &str, &str, &SchemaGraph) -> Mapped<EnumValue> + Send + Sync>;
pub type FieldMapperFn = Arc<dyn Fn(&Field, &str, &str, &SchemaGraph) -> Mapped<Field> + Send + Sync>;
pub type ArgumentMapperFn =
    Arc<dyn Fn(&InputValue, &str, &str, &str, &SchemaGraph) -> Mapped<InputValue> + Send + Sync>;
pub type DirectiveMapperFn = Arc<dyn Fn(&Directive, &SchemaGraph) -> Mapped<Directive> + Send + Sync>;

/// A set of transforms keyed by node kind.
#[derive(Clone, Default)]
pub struct SchemaMapper {
    types: HashMap<MapperKind, TypeMapperFn>,
    fields: HashMap<MapperKind, FieldMapperFn>,
    enum_value: Option<EnumValueMapperFn>,
    argument: Option<ArgumentMapperFn>,
    directive: Option<DirectiveMapperFn>,
}

impl SchemaMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type transform: `f(type, original_schema)`.
    ///
    /// `kind` must be one of the type kinds; anything else is ignored.
    pub fn on_type<F>(mut self, kind: MapperKind, f: F) -> Self
    where
        F: Fn(&NamedType, &SchemaGraph) -> Mapped<NamedType> + Send + Sync + 'static,
    {
        if kind.is_type_kind() {
            self.types.insert(kind, Arc::new(f));
        }
        self
    }

    /// Register a field transform: `f(field, field_name, type_name, original_schema)`.
    ///
    /// `kind` must be one of the field kinds; anything else is ignored.
    pub fn on_field<F>(mut self, kind: MapperKind, f: F) -> Self
    where
        F: Fn(&Field, &str, &str, &SchemaGraph) -> Mapped<Field> + Send + Sync + 'static,
    {
        if kind.is_field_kind() {
            self.fields.insert(kind, Arc::new(f));
        }
        self
    }

    /// Register an enum value transform: `f(value, type_name, value_name, original_schema)`.
    pub fn on_enum_value<F>(mut self, f: F) -> Self
    where
        F: Fn(&EnumValue, &str, &str, &SchemaGraph) -> Mapped<EnumValue> + Send + Sync + 'static,
    {
        self.enum_value = Some(Arc::new(f));
        self
    }

    /// Register an argument transform: `f(arg, arg_name, field_name, type_name, original_schema)`.
    pub fn on_argument<F>(mut self, f: F) -> Self
    where
        F: Fn(&InputValue, &str, &str, &str, &SchemaGraph) -> Mapped<InputValue> + Send + Sync + 'static,
    {
        self.argument = Some(Arc::new(f));
        self
    }

    /// Register a directive definition transform.
    pub fn on_directive<F>(mut self, f: F) -> Self
    where
        F: Fn(&Directive, &SchemaGraph) -> Mapped<Directive> + Send + Sync + 'static,
    {
        self.directive = Some(Arc::new(f));
        self
    }

    fn type_mapper(&self, specifiers: &[MapperKind]) -> Option<&TypeMapperFn> {
        let kind = most_specific(specifiers, |k| self.types.contains_key(&k))?;
        self.types.get(&kind)
    }

    fn field_mapper(&self, specifiers: &[MapperKind]) -> Option<&FieldMapperFn> {
        let kind = most_specific(specifiers, |k| self.fields.contains_key(&k))?;
        self.fields.get(&kind)
    }
}

/// Apply `mapper` to `schema` and return the rewired, canonical result.
pub fn map_schema(schema: &SchemaGraph, mapper: &SchemaMapper) -> Result<SchemaGraph> {
    let mut state = MapState::new(schema);

    state.map_default_values(DefaultPass::Serialize)?;
    state.map_types(mapper, TypeGroup::Leaf);
    state.map_enum_values(mapper);
    state.map_default_values(DefaultPass::Parse)?;
    state.map_types(mapper, TypeGroup::Composite);
    state.map_fields(mapper);
    state.map_arguments(mapper);
    let directives = map_directives(schema, mapper);

    let roots: Vec<(RootKind, Option<String>)> = RootKind::ALL
        .into_iter()
        .map(|kind| (kind, state.root_name(kind)))
        .collect();

    let mut graph = rewire_types(&state.graph, &state.map, &directives)?;
    for (kind, name) in roots {
        let id = name.and_then(|n| graph.type_id(&n));
        graph.set_root(kind, id);
    }
    graph.description = schema.description.clone();

    debug!(
        before = schema.type_map().len(),
        after = graph.type_map().len(),
        "schema mapped"
    );
    Ok(graph)
}

#[derive(Clone, Copy)]
enum DefaultPass {
    Serialize,
    Parse,
}

#[derive(Clone, Copy)]
enum TypeGroup {
    Leaf,
    Composite,
}

/// Working copy: a private arena clone plus the key → instance map being
/// transformed. `None` marks a deleted type.
struct MapState<'a> {
    original: &'a SchemaGraph,
    graph: SchemaGraph,
    map: WorkingTypeMap,
}

impl<'a> MapState<'a> {
    fn new(original: &'a SchemaGraph) -> Self {
        let map = original
            .type_map()
            .iter()
            .map(|(name, &id)| (name.clone(), Some(id)))
            .collect();
        Self {
            original,
            graph: original.clone(),
            map,
        }
    }

    /// Live (non-reserved, not deleted) entries, in type-map order.
    fn live(&self) -> Vec<(String, crate::graph::TypeId)> {
        self.map
            .iter()
            .filter(|(key, _)| !is_reserved_name(key))
            .filter_map(|(key, slot)| slot.map(|id| (key.clone(), id)))
            .collect()
    }

    fn replace(&mut self, key: &str, ty: NamedType) {
        let id = self.graph.add_type(ty);
        self.map.insert(key.to_string(), Some(id));
    }

    fn root_name(&self, kind: RootKind) -> Option<String> {
        let key = self.original.root_name(kind)?;
        let id = self.map.get(&key).copied().flatten()?;
        Some(self.graph[id].name.clone())
    }

    fn map_default_values(&mut self, pass: DefaultPass) -> Result<()> {
        let ids: Vec<_> = self.live().into_iter().map(|(_, id)| id).collect();
        let map = self.map.clone();
        map_defaults_of(&mut self.graph, &ids, |graph, ty, value| {
            // Leaves are looked up by name so the current instance is used.
            transform_input_value(graph, ty, value, &mut |named, v| {
                let current = match map.get(&named.name) {
                    Some(Some(id)) => &graph[*id],
                    Some(None) => return Ok(v.clone()),
                    None => named,
                };
                match pass {
                    DefaultPass::Serialize => serialize_leaf(current, v),
                    DefaultPass::Parse => parse_leaf(current, v),
                }
            })
        })
    }

    fn map_types(&mut self, mapper: &SchemaMapper, group: TypeGroup) {
        for (key, id) in self.live() {
            let ty = &self.graph[id];
            let wanted = match group {
                TypeGroup::Leaf => ty.is_leaf(),
                TypeGroup::Composite => !ty.is_leaf(),
            };
            if !wanted {
                continue;
            }
            let Some(transform) = mapper.type_mapper(type_specifiers(self.original, &key)) else {
                continue;
            };
            match transform(ty, self.original) {
                Mapped::Keep => {}
                Mapped::Replace(new_type) => self.replace(&key, new_type),
                Mapped::Rename(name, mut new_type) => {
                    new_type.name = name;
                    new_type.position = None;
                    self.replace(&key, new_type);
                }
                Mapped::Remove => {
                    self.map.insert(key, None);
                }
            }
        }
    }

    fn map_enum_values(&mut self, mapper: &SchemaMapper) {
        let Some(transform) = &mapper.enum_value else {
            return;
        };
        for (key, id) in self.live() {
            let ty = &self.graph[id];
            let TypeKind::Enum(enum_type) = &ty.kind else {
                continue;
            };
            let values = apply_all(&enum_type.values, |value_name, value| {
                transform(value, &ty.name, value_name, self.original)
            });
            if let Some(values) = values {
                let mut new_type = ty.clone();
                if let TypeKind::Enum(e) = &mut new_type.kind {
                    e.values = values;
                }
                self.replace(&key, new_type);
            }
        }
    }

    fn map_fields(&mut self, mapper: &SchemaMapper) {
        for (key, id) in self.live() {
            let ty = &self.graph[id];
            let Some(fields) = ty.fields() else {
                continue;
            };
            let Some(transform) = mapper.field_mapper(field_specifiers(self.original, &key, ty)) else {
                continue;
            };
            let new_fields = apply_all(fields, |field_name, field| {
                transform(field, field_name, &ty.name, self.original)
            });
            if let Some(new_fields) = new_fields {
                let mut new_type = ty.clone();
                if let Some(fields) = new_type.fields_mut() {
                    *fields = new_fields;
                }
                self.replace(&key, new_type);
            }
        }
    }

    fn map_arguments(&mut self, mapper: &SchemaMapper) {
        let Some(transform) = &mapper.argument else {
            return;
        };
        for (key, id) in self.live() {
            let ty = &self.graph[id];
            if !matches!(ty.kind, TypeKind::Object(_) | TypeKind::Interface(_)) {
                continue;
            }
            let mut new_type = ty.clone();
            let mut changed = false;
            if let Some(fields) = new_type.fields_mut() {
                for (field_name, field) in fields.iter_mut() {
                    let args = apply_all(&field.args, |arg_name, arg| {
                        transform(arg, arg_name, field_name, &ty.name, self.original)
                    });
                    if let Some(args) = args {
                        field.args = args;
                        changed = true;
                    }
                }
            }
            if changed {
                self.replace(&key, new_type);
            }
        }
    }
}

fn map_directives(schema: &SchemaGraph, mapper: &SchemaMapper) -> Vec<Directive> {
    let Some(transform) = &mapper.directive else {
        return schema.directives().to_vec();
    };
    let mut out = Vec::with_capacity(schema.directives().len());
    for directive in schema.directives() {
        match transform(directive, schema) {
            Mapped::Keep => out.push(directive.clone()),
            Mapped::Replace(new_directive) => out.push(new_directive),
            Mapped::Rename(name, mut new_directive) => {
                new_directive.name = name;
                new_directive.position = None;
                out.push(new_directive);
            }
            Mapped::Remove => {}
        }
    }
    out
}

/// Nodes that may lose their source position on rename.
trait Positioned {
    fn clear_position(&mut self);
}

impl Positioned for Field {
    fn clear_position(&mut self) {
        self.position = None;
    }
}

impl Positioned for InputValue {
    fn clear_position(&mut self) {
        self.position = None;
    }
}

impl Positioned for EnumValue {
    fn clear_position(&mut self) {
        self.position = None;
    }
}

/// Run `transform` over every entry. Returns `None` when nothing changed.
fn apply_all<T, F>(entries: &IndexMap<String, T>, mut transform: F) -> Option<IndexMap<String, T>>
where
    T: Clone + Positioned,
    F: FnMut(&str, &T) -> Mapped<T>,
{
    let mut changed = false;
    let mut out = IndexMap::with_capacity(entries.len());
    for (name, entry) in entries {
        match transform(name, entry) {
            Mapped::Keep => {
                out.insert(name.clone(), entry.clone());
            }
            Mapped::Replace(new_entry) => {
                changed = true;
                out.insert(name.clone(), new_entry);
            }
            Mapped::Rename(new_name, mut new_entry) => {
                changed = true;
                new_entry.clear_position();
                out.insert(new_name, new_entry);
            }
            Mapped::Remove => changed = true,
        }
    }
    changed.then_some(out)
}
