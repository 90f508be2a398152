//! Node-kind specifiers for schema transforms.
//!
//! Every node matches a chain of kinds from general to specific. A field of
//! the query root matches `Field`, `CompositeField`, `ObjectField`,
//! `RootField` and `QueryRootField`; the most specific kind with a
//! registered transform wins. Chains are static tables, listed least
//! specific first and searched from the end.

use crate::graph::{NamedType, RootKind, SchemaGraph, TypeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapperKind {
    // Types
    Type,
    ScalarType,
    EnumType,
    CompositeType,
    ObjectType,
    InputObjectType,
    AbstractType,
    UnionType,
    InterfaceType,
    RootObject,
    QueryObject,
    MutationObject,
    SubscriptionObject,
    // Fields
    Field,
    CompositeField,
    ObjectField,
    RootField,
    QueryRootField,
    MutationRootField,
    SubscriptionRootField,
    InterfaceField,
    InputObjectField,
    // Everything else
    Argument,
    EnumValue,
    Directive,
}

use MapperKind::*;

const SCALAR: &[MapperKind] = &[Type, ScalarType];
const ENUM: &[MapperKind] = &[Type, EnumType];
const INPUT_OBJECT: &[MapperKind] = &[Type, InputObjectType];
const UNION: &[MapperKind] = &[Type, CompositeType, AbstractType, UnionType];
const INTERFACE: &[MapperKind] = &[Type, CompositeType, AbstractType, InterfaceType];
const OBJECT: &[MapperKind] = &[Type, CompositeType, ObjectType];
const QUERY: &[MapperKind] = &[Type, CompositeType, ObjectType, RootObject, QueryObject];
const MUTATION: &[MapperKind] = &[Type, CompositeType, ObjectType, RootObject, MutationObject];
const SUBSCRIPTION: &[MapperKind] = &[Type, CompositeType, ObjectType, RootObject, SubscriptionObject];

const OBJECT_FIELD: &[MapperKind] = &[Field, CompositeField, ObjectField];
const QUERY_FIELD: &[MapperKind] = &[Field, CompositeField, ObjectField, RootField, QueryRootField];
const MUTATION_FIELD: &[MapperKind] = &[Field, CompositeField, ObjectField, RootField, MutationRootField];
const SUBSCRIPTION_FIELD: &[MapperKind] =
    &[Field, CompositeField, ObjectField, RootField, SubscriptionRootField];
const INTERFACE_FIELD: &[MapperKind] = &[Field, CompositeField, InterfaceField];
const INPUT_FIELD: &[MapperKind] = &[Field, InputObjectField];

impl MapperKind {
    pub fn is_type_kind(&self) -> bool {
        matches!(
            self,
            Type | ScalarType
                | EnumType
                | CompositeType
                | ObjectType
                | InputObjectType
                | AbstractType
                | UnionType
                | InterfaceType
                | RootObject
                | QueryObject
                | MutationObject
                | SubscriptionObject
        )
    }

    pub fn is_field_kind(&self) -> bool {
        matches!(
            self,
            Field
                | CompositeField
                | ObjectField
                | RootField
                | QueryRootField
                | MutationRootField
                | SubscriptionRootField
                | InterfaceField
                | InputObjectField
        )
    }
}

/// Kinds matched by the type registered as `key` in `schema`, least specific first.
pub fn type_specifiers(schema: &SchemaGraph, key: &str) -> &'static [MapperKind] {
    let Some(id) = schema.type_id(key) else {
        return &[Type];
    };
    match &schema[id].kind {
        TypeKind::Scalar(_) => SCALAR,
        TypeKind::Enum(_) => ENUM,
        TypeKind::InputObject(_) => INPUT_OBJECT,
        TypeKind::Union(_) => UNION,
        TypeKind::Interface(_) => INTERFACE,
        TypeKind::Object(_) => match schema.root_kind_of(id) {
            Some(RootKind::Query) => QUERY,
            Some(RootKind::Mutation) => MUTATION,
            Some(RootKind::Subscription) => SUBSCRIPTION,
            None => OBJECT,
        },
    }
}

/// Kinds matched by fields of the type registered as `key`, least specific first.
pub fn field_specifiers(schema: &SchemaGraph, key: &str, current: &NamedType) -> &'static [MapperKind] {
    let original = schema.type_id(key);
    let kind = original.map(|id| &schema[id].kind).unwrap_or(&current.kind);
    match kind {
        TypeKind::Object(_) => match original.and_then(|id| schema.root_kind_of(id)) {
            Some(RootKind::Query) => QUERY_FIELD,
            Some(RootKind::Mutation) => MUTATION_FIELD,
            Some(RootKind::Subscription) => SUBSCRIPTION_FIELD,
            None => OBJECT_FIELD,
        },
        TypeKind::Interface(_) => INTERFACE_FIELD,
        TypeKind::InputObject(_) => INPUT_FIELD,
        _ => &[],
    }
}

/// The most specific kind in `specifiers` accepted by `registered`.
pub fn most_specific<F>(specifiers: &[MapperKind], registered: F) -> Option<MapperKind>
where
    F: Fn(MapperKind) -> bool,
{
    specifiers.iter().rev().copied().find(|kind| registered(*kind))
}
