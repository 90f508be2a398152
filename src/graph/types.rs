//! Node types of the schema graph.
//!
//! Named types live in an arena owned by [`SchemaGraph`](super::SchemaGraph);
//! every cross-reference is a [`TypeId`] into that arena. Two references are
//! "the same instance" exactly when their ids are equal.

use async_graphql::Value;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

use super::resolve::{FieldResolver, IsTypeOf, LeafCoercion, TypeResolver};

/// Prefix reserved for introspection names.
pub const RESERVED_PREFIX: &str = "__";

/// Names beginning with the introspection prefix are never mapped, healed or deleted.
pub fn is_reserved_name(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

/// Reason recorded for `@deprecated` without an explicit argument.
pub const DEFAULT_DEPRECATION_REASON: &str = "No longer supported";

/// Index of a named type in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Possibly wrapped reference to a named type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(TypeId),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(id: TypeId) -> Self {
        TypeRef::Named(id)
    }

    pub fn non_null(inner: TypeRef) -> Self {
        TypeRef::NonNull(Box::new(inner))
    }

    pub fn list(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    /// Innermost named type.
    pub fn named_type(&self) -> TypeId {
        match self {
            TypeRef::Named(id) => *id,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.named_type(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    /// Rebuild the same wrapper structure around a different named type, or
    /// drop the reference when `f` yields nothing.
    pub fn map_named<F>(&self, f: &mut F) -> Option<TypeRef>
    where
        F: FnMut(TypeId) -> Option<TypeId>,
    {
        Some(match self {
            TypeRef::Named(id) => TypeRef::Named(f(*id)?),
            TypeRef::List(inner) => TypeRef::List(Box::new(inner.map_named(f)?)),
            TypeRef::NonNull(inner) => TypeRef::NonNull(Box::new(inner.map_named(f)?)),
        })
    }
}

/// Line/column in the SDL the node came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

/// A directive applied to a node, e.g. `@auth(role: ADMIN)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveUse {
    pub name: String,
    pub arguments: IndexMap<String, Value>,
}

impl DirectiveUse {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: IndexMap::new(),
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }
}

/// A field or directive argument. The name is the key in the owning map.
#[derive(Debug, Clone)]
pub struct InputValue {
    pub description: Option<String>,
    pub ty: TypeRef,
    /// Internal (parsed) representation.
    pub default_value: Option<Value>,
    pub deprecation_reason: Option<String>,
    pub directives: Vec<DirectiveUse>,
    pub position: Option<SourcePosition>,
}

impl InputValue {
    pub fn new(ty: TypeRef) -> Self {
        Self {
            description: None,
            ty,
            default_value: None,
            deprecation_reason: None,
            directives: Vec::new(),
            position: None,
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// A field of an object, interface or input object.
///
/// `args`, `resolve` and `subscribe` only apply to output fields;
/// `default_value` only to input-object fields.
#[derive(Debug, Clone)]
pub struct Field {
    pub description: Option<String>,
    pub ty: TypeRef,
    pub args: IndexMap<String, InputValue>,
    pub resolve: Option<FieldResolver>,
    pub subscribe: Option<FieldResolver>,
    pub default_value: Option<Value>,
    pub deprecation_reason: Option<String>,
    pub directives: Vec<DirectiveUse>,
    pub position: Option<SourcePosition>,
}

impl Field {
    pub fn new(ty: TypeRef) -> Self {
        Self {
            description: None,
            ty,
            args: IndexMap::new(),
            resolve: None,
            subscribe: None,
            default_value: None,
            deprecation_reason: None,
            directives: Vec::new(),
            position: None,
        }
    }

    pub fn with_arg(mut self, name: impl Into<String>, arg: InputValue) -> Self {
        self.args.insert(name.into(), arg);
        self
    }

    pub fn with_resolver(mut self, resolver: FieldResolver) -> Self {
        self.resolve = Some(resolver);
        self
    }
}

#[derive(Debug, Clone)]
pub struct EnumValue {
    pub description: Option<String>,
    /// Internal value; defaults to the value's name as a string.
    pub value: Value,
    pub deprecation_reason: Option<String>,
    pub directives: Vec<DirectiveUse>,
    pub position: Option<SourcePosition>,
}

impl EnumValue {
    pub fn new(name: &str) -> Self {
        Self {
            description: None,
            value: Value::String(name.to_string()),
            deprecation_reason: None,
            directives: Vec::new(),
            position: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScalarType {
    pub serialize: Option<LeafCoercion>,
    pub parse_value: Option<LeafCoercion>,
    pub specified_by_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectType {
    pub interfaces: Vec<TypeId>,
    pub fields: IndexMap<String, Field>,
    pub is_type_of: Option<IsTypeOf>,
}

#[derive(Debug, Clone, Default)]
pub struct InterfaceType {
    pub interfaces: Vec<TypeId>,
    pub fields: IndexMap<String, Field>,
    pub resolve_type: Option<TypeResolver>,
}

#[derive(Debug, Clone, Default)]
pub struct UnionType {
    pub members: Vec<TypeId>,
    pub resolve_type: Option<TypeResolver>,
}

#[derive(Debug, Clone, Default)]
pub struct EnumType {
    pub values: IndexMap<String, EnumValue>,
}

#[derive(Debug, Clone, Default)]
pub struct InputObjectType {
    pub fields: IndexMap<String, Field>,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Scalar(ScalarType),
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    Enum(EnumType),
    InputObject(InputObjectType),
}

impl TypeKind {
    pub fn label(&self) -> &'static str {
        match self {
            TypeKind::Scalar(_) => "scalar",
            TypeKind::Object(_) => "type",
            TypeKind::Interface(_) => "interface",
            TypeKind::Union(_) => "union",
            TypeKind::Enum(_) => "enum",
            TypeKind::InputObject(_) => "input",
        }
    }
}

/// A uniquely named node of the schema graph.
#[derive(Debug, Clone)]
pub struct NamedType {
    pub name: String,
    pub description: Option<String>,
    pub directives: Vec<DirectiveUse>,
    pub position: Option<SourcePosition>,
    pub kind: TypeKind,
}

impl NamedType {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            description: None,
            directives: Vec::new(),
            position: None,
            kind,
        }
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Scalar(ScalarType::default()))
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Object(ObjectType::default()))
    }

    pub fn with_field(mut self, name: impl Into<String>, field: Field) -> Self {
        if let Some(fields) = self.fields_mut() {
            fields.insert(name.into(), field);
        }
        self
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, TypeKind::Scalar(_) | TypeKind::Enum(_))
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self.kind, TypeKind::Interface(_) | TypeKind::Union(_))
    }

    pub fn is_input(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Scalar(_) | TypeKind::Enum(_) | TypeKind::InputObject(_)
        )
    }

    /// Fields of objects, interfaces and input objects.
    pub fn fields(&self) -> Option<&IndexMap<String, Field>> {
        match &self.kind {
            TypeKind::Object(t) => Some(&t.fields),
            TypeKind::Interface(t) => Some(&t.fields),
            TypeKind::InputObject(t) => Some(&t.fields),
            _ => None,
        }
    }

    pub fn fields_mut(&mut self) -> Option<&mut IndexMap<String, Field>> {
        match &mut self.kind {
            TypeKind::Object(t) => Some(&mut t.fields),
            TypeKind::Interface(t) => Some(&mut t.fields),
            TypeKind::InputObject(t) => Some(&mut t.fields),
            _ => None,
        }
    }

    /// Interfaces implemented by objects and interfaces.
    pub fn interfaces(&self) -> &[TypeId] {
        match &self.kind {
            TypeKind::Object(t) => &t.interfaces,
            TypeKind::Interface(t) => &t.interfaces,
            _ => &[],
        }
    }

    pub fn resolve_type(&self) -> Option<&TypeResolver> {
        match &self.kind {
            TypeKind::Interface(t) => t.resolve_type.as_ref(),
            TypeKind::Union(t) => t.resolve_type.as_ref(),
            _ => None,
        }
    }
}

/// Where a directive may be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveLocation {
    Query,
    Mutation,
    Subscription,
    Field,
    FragmentDefinition,
    FragmentSpread,
    InlineFragment,
    VariableDefinition,
    Schema,
    Scalar,
    Object,
    FieldDefinition,
    ArgumentDefinition,
    Interface,
    Union,
    Enum,
    EnumValue,
    InputObject,
    InputFieldDefinition,
}

impl DirectiveLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveLocation::Query => "QUERY",
            DirectiveLocation::Mutation => "MUTATION",
            DirectiveLocation::Subscription => "SUBSCRIPTION",
            DirectiveLocation::Field => "FIELD",
            DirectiveLocation::FragmentDefinition => "FRAGMENT_DEFINITION",
            DirectiveLocation::FragmentSpread => "FRAGMENT_SPREAD",
            DirectiveLocation::InlineFragment => "INLINE_FRAGMENT",
            DirectiveLocation::VariableDefinition => "VARIABLE_DEFINITION",
            DirectiveLocation::Schema => "SCHEMA",
            DirectiveLocation::Scalar => "SCALAR",
            DirectiveLocation::Object => "OBJECT",
            DirectiveLocation::FieldDefinition => "FIELD_DEFINITION",
            DirectiveLocation::ArgumentDefinition => "ARGUMENT_DEFINITION",
            DirectiveLocation::Interface => "INTERFACE",
            DirectiveLocation::Union => "UNION",
            DirectiveLocation::Enum => "ENUM",
            DirectiveLocation::EnumValue => "ENUM_VALUE",
            DirectiveLocation::InputObject => "INPUT_OBJECT",
            DirectiveLocation::InputFieldDefinition => "INPUT_FIELD_DEFINITION",
        }
    }
}

/// Schema-level directive definition.
#[derive(Debug, Clone)]
pub struct Directive {
    pub name: String,
    pub description: Option<String>,
    pub args: IndexMap<String, InputValue>,
    pub is_repeatable: bool,
    pub locations: Vec<DirectiveLocation>,
    pub position: Option<SourcePosition>,
}

impl Directive {
    pub fn new(name: impl Into<String>, locations: Vec<DirectiveLocation>) -> Self {
        Self {
            name: name.into(),
            description: None,
            args: IndexMap::new(),
            is_repeatable: false,
            locations,
            position: None,
        }
    }
}
