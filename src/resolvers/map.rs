//! Resolver maps: type name → field resolvers and type-level overrides.

use async_graphql::Value;
use indexmap::IndexMap;

use crate::error::{Result, SchemaError};
use crate::graph::{is_reserved_name, FieldResolver, IsTypeOf, LeafCoercion, TypeResolver};

/// Pseudo type name for the schema-level resolver.
pub const SCHEMA_KEY: &str = "__schema";
pub const RESOLVE_TYPE_KEY: &str = "__resolveType";
pub const IS_TYPE_OF_KEY: &str = "__isTypeOf";
pub const SERIALIZE_KEY: &str = "__serialize";
pub const PARSE_VALUE_KEY: &str = "__parseValue";
pub const DESCRIPTION_KEY: &str = "__description";

/// Keys starting with the reserved prefix configure the type itself, not a field.
pub fn is_meta_key(key: &str) -> bool {
    is_reserved_name(key)
}

/// Field properties set by a structured resolver entry. Unset properties
/// leave the field as declared.
#[derive(Debug, Clone, Default)]
pub struct FieldOverrides {
    pub resolve: Option<FieldResolver>,
    pub subscribe: Option<FieldResolver>,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
}

impl FieldOverrides {
    fn merge(&mut self, later: &FieldOverrides) {
        if later.resolve.is_some() {
            self.resolve = later.resolve.clone();
        }
        if later.subscribe.is_some() {
            self.subscribe = later.subscribe.clone();
        }
        if later.description.is_some() {
            self.description = later.description.clone();
        }
        if later.deprecation_reason.is_some() {
            self.deprecation_reason = later.deprecation_reason.clone();
        }
    }
}

/// One entry of a type's resolver map.
#[derive(Debug, Clone)]
pub enum ResolverEntry {
    /// Shorthand for `Field(FieldOverrides { resolve, .. })`.
    Resolve(FieldResolver),
    Field(FieldOverrides),
    ResolveType(TypeResolver),
    IsTypeOf(IsTypeOf),
    Serialize(LeafCoercion),
    ParseValue(LeafCoercion),
    /// Internal value of an enum value.
    Value(Value),
    Description(String),
    SpecifiedByUrl(String),
}

impl ResolverEntry {
    pub fn is_field_shape(&self) -> bool {
        matches!(self, ResolverEntry::Resolve(_) | ResolverEntry::Field(_))
    }
}

/// Resolver entries for one type, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct TypeResolvers {
    pub entries: IndexMap<String, ResolverEntry>,
}

impl TypeResolvers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, entry: ResolverEntry) -> Self {
        self.entries.insert(key.into(), entry);
        self
    }

    pub fn field(self, name: impl Into<String>, resolver: FieldResolver) -> Self {
        self.with(name, ResolverEntry::Resolve(resolver))
    }

    pub fn resolve_type(self, resolver: TypeResolver) -> Self {
        self.with(RESOLVE_TYPE_KEY, ResolverEntry::ResolveType(resolver))
    }

    pub fn is_type_of(self, check: IsTypeOf) -> Self {
        self.with(IS_TYPE_OF_KEY, ResolverEntry::IsTypeOf(check))
    }

    pub fn serialize(self, f: LeafCoercion) -> Self {
        self.with(SERIALIZE_KEY, ResolverEntry::Serialize(f))
    }

    pub fn parse_value(self, f: LeafCoercion) -> Self {
        self.with(PARSE_VALUE_KEY, ResolverEntry::ParseValue(f))
    }

    pub fn enum_value(self, name: impl Into<String>, value: Value) -> Self {
        self.with(name, ResolverEntry::Value(value))
    }

    pub fn get(&self, key: &str) -> Option<&ResolverEntry> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ResolverEntry)> {
        self.entries.iter()
    }
}

/// Resolvers for a whole schema.
#[derive(Debug, Clone, Default)]
pub struct ResolverMap {
    /// Computes the root value handed to every root field.
    pub schema_resolver: Option<FieldResolver>,
    pub types: IndexMap<String, TypeResolvers>,
}

impl ResolverMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, name: impl Into<String>, resolvers: TypeResolvers) -> Self {
        self.types.insert(name.into(), resolvers);
        self
    }

    /// Add a field resolver, creating the type entry if needed.
    pub fn field(mut self, type_name: &str, field_name: &str, resolver: FieldResolver) -> Self {
        self.types
            .entry(type_name.to_string())
            .or_default()
            .entries
            .insert(field_name.to_string(), ResolverEntry::Resolve(resolver));
        self
    }

    pub fn with_schema_resolver(mut self, resolver: FieldResolver) -> Self {
        self.schema_resolver = Some(resolver);
        self
    }

    pub fn get(&self, type_name: &str) -> Option<&TypeResolvers> {
        self.types.get(type_name)
    }

    pub fn is_empty(&self) -> bool {
        self.schema_resolver.is_none() && self.types.is_empty()
    }

    /// Constant resolvers from JSON shaped `{"Type": {"field": value}}`.
    pub fn from_json_constants(fixtures: &serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(types) = fixtures else {
            return Err(SchemaError::Configuration(
                "Resolver fixtures must be a JSON object keyed by type name".to_string(),
            ));
        };
        let mut map = ResolverMap::new();
        for (type_name, fields) in types {
            let serde_json::Value::Object(fields) = fields else {
                return Err(SchemaError::Configuration(format!(
                    "\"{}\" defined in resolvers, but has invalid value \"{}\". The resolver's value must be of type object.",
                    type_name, fields
                )));
            };
            for (field_name, value) in fields {
                let value = Value::from_json(value.clone())
                    .map_err(|e| SchemaError::Configuration(format!("{}.{}: {}", type_name, field_name, e)))?;
                map = map.field(type_name, field_name, FieldResolver::constant(value));
            }
        }
        Ok(map)
    }
}

/// Merge maps left to right. Later entries win; structured field entries
/// merge property by property.
pub fn merge_resolvers(maps: &[ResolverMap]) -> ResolverMap {
    let mut merged = ResolverMap::new();
    for map in maps {
        if map.schema_resolver.is_some() {
            merged.schema_resolver = map.schema_resolver.clone();
        }
        for (type_name, resolvers) in &map.types {
            let target = merged.types.entry(type_name.clone()).or_default();
            for (key, entry) in &resolvers.entries {
                if let (Some(ResolverEntry::Field(existing)), ResolverEntry::Field(later)) =
                    (target.entries.get_mut(key), entry)
                {
                    existing.merge(later);
                    continue;
                }
                target.entries.insert(key.clone(), entry.clone());
            }
        }
    }
    merged
}
