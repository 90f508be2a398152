//! Rewiring: rebuild a transformed type map into a fresh arena where every
//! reference points at its canonical instance.
//!
//! References are followed lazily. When a reference reaches a type that has
//! not been copied yet, a slot is allocated and memoized *before* the type's
//! own references are rewired, so `A.b: B` / `B.a: A` and self references
//! terminate on the second visit.

use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::trace;

use crate::error::{Result, SchemaError};
use crate::graph::{
    is_reserved_name, Directive, Field, InputValue, NamedType, SchemaGraph, TypeId, TypeKind, TypeRef,
};

/// Type map under transformation: key → instance, `None` for a deleted type.
pub type WorkingTypeMap = IndexMap<String, Option<TypeId>>;

/// Copy the types named in `type_map` (instances from `source`) into a new
/// graph, healing references and dropping those to deleted types. Roots are
/// left unset for the caller to re-point by name.
pub fn rewire_types(source: &SchemaGraph, type_map: &WorkingTypeMap, directives: &[Directive]) -> Result<SchemaGraph> {
    let mut rewirer = Rewirer {
        source,
        references: type_map.clone(),
        memo: HashMap::new(),
        target: SchemaGraph::new(),
    };

    // Pass 1: claim canonical names left to right; the first clash is fatal
    let mut pending = Vec::new();
    for (key, slot) in type_map {
        let Some(id) = *slot else {
            continue;
        };
        if is_reserved_name(key) {
            pending.push((id, rewirer.claim(id, key.clone())));
            continue;
        }
        let name = &source[id].name;
        if let Some(existing) = rewirer.target.type_id(name) {
            if rewirer.memo.get(&id) == Some(&existing) {
                continue;
            }
            return Err(SchemaError::DuplicateTypeName(name.clone()));
        }
        pending.push((id, rewirer.claim(id, name.clone())));
    }

    // Pass 2: rewire bodies
    for (old, new) in pending {
        let ty = rewirer.rewire_named_type(old);
        rewirer.target[new] = ty;
    }

    for directive in directives {
        let directive = rewirer.rewire_directive(directive);
        rewirer.target.directives.push(directive);
    }

    trace!(types = rewirer.target.type_map().len(), "types rewired");
    Ok(rewirer.target)
}

struct Rewirer<'a> {
    source: &'a SchemaGraph,
    /// Name → instance lookups for references, extended with adopted strays.
    references: WorkingTypeMap,
    /// Source instance → target instance.
    memo: HashMap<TypeId, TypeId>,
    target: SchemaGraph,
}

impl<'a> Rewirer<'a> {
    /// Allocate the target slot for `old` and register it under `name`.
    /// The slot holds an unhealed copy until [`Self::rewire_named_type`] fills it.
    fn claim(&mut self, old: TypeId, name: String) -> TypeId {
        let new = self.target.add_type(self.source[old].clone());
        self.target.set_type(name, new);
        self.memo.insert(old, new);
        new
    }

    fn rewire_id(&mut self, old: TypeId) -> Option<TypeId> {
        let source = self.source;
        let name = &source[old].name;
        let target_old = match self.references.get(name) {
            Some(Some(id)) => *id,
            Some(None) => return None,
            None => old,
        };
        if let Some(&new) = self.memo.get(&target_old) {
            return Some(new);
        }

        // A type only reachable through a reference: adopt it under its own name.
        let adopted_name = &source[target_old].name;
        if let Some(existing) = self.target.type_id(adopted_name) {
            self.memo.insert(target_old, existing);
            return Some(existing);
        }
        let new = self.claim(target_old, adopted_name.clone());
        self.references.insert(name.clone(), Some(target_old));
        let ty = self.rewire_named_type(target_old);
        self.target[new] = ty;
        Some(new)
    }

    fn rewire_ref(&mut self, ty: &TypeRef) -> Option<TypeRef> {
        ty.map_named(&mut |id| self.rewire_id(id))
    }

    fn rewire_ids(&mut self, ids: &[TypeId]) -> Vec<TypeId> {
        ids.iter().filter_map(|id| self.rewire_id(*id)).collect()
    }

    fn rewire_named_type(&mut self, old: TypeId) -> NamedType {
        let source = self.source;
        let mut ty = source[old].clone();
        match &mut ty.kind {
            TypeKind::Object(object) => {
                object.interfaces = self.rewire_ids(&object.interfaces);
                object.fields = self.rewire_fields(&object.fields);
            }
            TypeKind::Interface(interface) => {
                interface.interfaces = self.rewire_ids(&interface.interfaces);
                interface.fields = self.rewire_fields(&interface.fields);
            }
            TypeKind::Union(union) => {
                union.members = self.rewire_ids(&union.members);
            }
            TypeKind::InputObject(input) => {
                input.fields = self.rewire_fields(&input.fields);
            }
            TypeKind::Scalar(_) | TypeKind::Enum(_) => {}
        }
        ty
    }

    fn rewire_fields(&mut self, fields: &IndexMap<String, Field>) -> IndexMap<String, Field> {
        let mut out = IndexMap::with_capacity(fields.len());
        for (name, field) in fields {
            let Some(ty) = self.rewire_ref(&field.ty) else {
                continue;
            };
            let mut field = field.clone();
            field.ty = ty;
            field.args = self.rewire_args(&field.args);
            out.insert(name.clone(), field);
        }
        out
    }

    fn rewire_args(&mut self, args: &IndexMap<String, InputValue>) -> IndexMap<String, InputValue> {
        let mut out = IndexMap::with_capacity(args.len());
        for (name, arg) in args {
            if let Some(ty) = self.rewire_ref(&arg.ty) {
                let mut arg = arg.clone();
                arg.ty = ty;
                out.insert(name.clone(), arg);
            }
        }
        out
    }

    fn rewire_directive(&mut self, directive: &Directive) -> Directive {
        let mut directive = directive.clone();
        directive.args = self.rewire_args(&directive.args);
        directive
    }
}
