//! Graph builder: turns SDL type definitions into a [`SchemaGraph`].
//!
//! Types are declared first so fields can refer to types defined later in
//! the document (or in another document), then filled in, then extended.

use async_graphql::Value;
use async_graphql_parser::types as ast;
use async_graphql_parser::{Pos, Positioned};
use indexmap::IndexMap;
use tracing::{debug, info};

use super::engine::{RootKind, SchemaGraph};
use super::sdl::{concatenate_type_defs, parse_graphql_sdl, ParseOptions};
use super::types::{
    Directive, DirectiveLocation, DirectiveUse, EnumType, EnumValue, Field, InputObjectType,
    InputValue, InterfaceType, NamedType, ObjectType, ScalarType, SourcePosition, TypeId,
    TypeKind, TypeRef, UnionType, DEFAULT_DEPRECATION_REASON,
};
use super::values::{for_each_default_value, parse_input_value};
use crate::error::{Result, SchemaError};

/// Type definitions in any of the accepted shapes.
#[derive(Debug, Clone)]
pub enum TypeDefs {
    Sdl(String),
    Document(ast::ServiceDocument),
    Many(Vec<TypeDefs>),
}

impl From<&str> for TypeDefs {
    fn from(sdl: &str) -> Self {
        TypeDefs::Sdl(sdl.to_string())
    }
}

impl From<String> for TypeDefs {
    fn from(sdl: String) -> Self {
        TypeDefs::Sdl(sdl)
    }
}

impl From<ast::ServiceDocument> for TypeDefs {
    fn from(doc: ast::ServiceDocument) -> Self {
        TypeDefs::Document(doc)
    }
}

impl<T: Into<TypeDefs>> From<Vec<T>> for TypeDefs {
    fn from(defs: Vec<T>) -> Self {
        TypeDefs::Many(defs.into_iter().map(Into::into).collect())
    }
}

impl TypeDefs {
    fn flatten<'a>(&'a self, sdl: &mut Vec<&'a str>, docs: &mut Vec<&'a ast::ServiceDocument>) {
        match self {
            TypeDefs::Sdl(s) => sdl.push(s),
            TypeDefs::Document(d) => docs.push(d),
            TypeDefs::Many(all) => all.iter().for_each(|d| d.flatten(sdl, docs)),
        }
    }
}

/// Build a schema graph from type definitions.
pub fn build_schema_from_type_definitions(type_defs: &TypeDefs, options: &ParseOptions) -> Result<SchemaGraph> {
    let mut sources = Vec::new();
    let mut documents = Vec::new();
    type_defs.flatten(&mut sources, &mut documents);

    let sdl = concatenate_type_defs(&sources);
    if sdl.is_empty() && documents.is_empty() {
        return Err(SchemaError::Configuration("Must provide typeDefs".to_string()));
    }

    let parsed = parse_graphql_sdl("GraphQL request", &sdl, options)?;
    let mut all = vec![&parsed];
    all.extend(documents);

    let mut builder = GraphBuilder::new(options);
    builder.declare_types(&all)?;
    builder.fill_types(&all)?;
    builder.add_directive_definitions(&all)?;
    builder.set_roots(&all)?;
    let graph = builder.finish()?;

    let stats = graph.stats();
    info!(
        types = stats.type_count,
        fields = stats.field_count,
        directives = stats.directive_count,
        "schema graph built"
    );
    Ok(graph)
}

struct GraphBuilder<'a> {
    graph: SchemaGraph,
    options: &'a ParseOptions,
}

impl<'a> GraphBuilder<'a> {
    fn new(options: &'a ParseOptions) -> Self {
        Self {
            graph: SchemaGraph::new(),
            options,
        }
    }

    fn position(&self, pos: Pos) -> Option<SourcePosition> {
        if self.options.no_location {
            None
        } else {
            Some(SourcePosition {
                line: pos.line,
                column: pos.column,
            })
        }
    }

    // Phase 1: register an empty shell for every type definition
    fn declare_types(&mut self, docs: &[&ast::ServiceDocument]) -> Result<()> {
        for def in type_definitions(docs).filter(|def| !def.node.extend) {
            let name = def.node.name.node.to_string();
            if self.graph.type_id(&name).is_some() {
                return Err(SchemaError::Validation(format!(
                    "There can be only one type named \"{}\".",
                    name
                )));
            }
            let kind = match &def.node.kind {
                ast::TypeKind::Scalar => TypeKind::Scalar(ScalarType::default()),
                ast::TypeKind::Object(_) => TypeKind::Object(ObjectType::default()),
                ast::TypeKind::Interface(_) => TypeKind::Interface(InterfaceType::default()),
                ast::TypeKind::Union(_) => TypeKind::Union(UnionType::default()),
                ast::TypeKind::Enum(_) => TypeKind::Enum(EnumType::default()),
                ast::TypeKind::InputObject(_) => TypeKind::InputObject(InputObjectType::default()),
            };
            let mut ty = NamedType::new(name, kind);
            ty.description = def.node.description.as_ref().map(|d| d.node.clone());
            ty.position = self.position(def.pos);
            self.graph.insert_type(ty);
        }
        Ok(())
    }

    // Phase 2: fields, members, values; extensions merge into their base
    fn fill_types(&mut self, docs: &[&ast::ServiceDocument]) -> Result<()> {
        for def in type_definitions(docs) {
            let name = def.node.name.node.as_str();
            let Some(id) = self.graph.type_id(name) else {
                return Err(SchemaError::Validation(format!(
                    "Cannot extend type \"{}\" because it is not defined.",
                    name
                )));
            };
            let directives = convert_directives(&def.node.directives);

            match &def.node.kind {
                ast::TypeKind::Scalar => {
                    let url = specified_by_url(&directives);
                    let TypeKind::Scalar(scalar) = &mut self.graph[id].kind else {
                        return Err(kind_mismatch(name, "scalar"));
                    };
                    if url.is_some() {
                        scalar.specified_by_url = url;
                    }
                }
                ast::TypeKind::Object(object) => {
                    let interfaces = self.resolve_names(&object.implements)?;
                    let fields = self.convert_fields(&object.fields)?;
                    let TypeKind::Object(target) = &mut self.graph[id].kind else {
                        return Err(kind_mismatch(name, "type"));
                    };
                    target.interfaces.extend(interfaces);
                    merge_fields(name, &mut target.fields, fields)?;
                }
                ast::TypeKind::Interface(interface) => {
                    let interfaces = self.resolve_names(&interface.implements)?;
                    let fields = self.convert_fields(&interface.fields)?;
                    let TypeKind::Interface(target) = &mut self.graph[id].kind else {
                        return Err(kind_mismatch(name, "interface"));
                    };
                    target.interfaces.extend(interfaces);
                    merge_fields(name, &mut target.fields, fields)?;
                }
                ast::TypeKind::Union(union) => {
                    let members = self.resolve_names(&union.members)?;
                    let TypeKind::Union(target) = &mut self.graph[id].kind else {
                        return Err(kind_mismatch(name, "union"));
                    };
                    target.members.extend(members);
                }
                ast::TypeKind::Enum(enum_type) => {
                    let values = enum_type
                        .values
                        .iter()
                        .map(|v| (v.node.value.node.to_string(), self.convert_enum_value(v)))
                        .collect::<Vec<_>>();
                    let TypeKind::Enum(target) = &mut self.graph[id].kind else {
                        return Err(kind_mismatch(name, "enum"));
                    };
                    for (value_name, value) in values {
                        if target.values.insert(value_name.clone(), value).is_some() {
                            return Err(SchemaError::Validation(format!(
                                "Enum value \"{}.{}\" can only be defined once.",
                                name, value_name
                            )));
                        }
                    }
                }
                ast::TypeKind::InputObject(input) => {
                    let mut fields = Vec::new();
                    for field in &input.fields {
                        let value = self.convert_input_value(field)?;
                        let mut converted = Field::new(value.ty);
                        converted.description = value.description;
                        converted.default_value = value.default_value;
                        converted.deprecation_reason = value.deprecation_reason;
                        converted.directives = value.directives;
                        converted.position = value.position;
                        fields.push((field.node.name.node.to_string(), converted));
                    }
                    let TypeKind::InputObject(target) = &mut self.graph[id].kind else {
                        return Err(kind_mismatch(name, "input"));
                    };
                    merge_fields(name, &mut target.fields, fields)?;
                }
            }

            self.graph[id].directives.extend(directives);
        }
        Ok(())
    }

    // Phase 3: directive definitions
    fn add_directive_definitions(&mut self, docs: &[&ast::ServiceDocument]) -> Result<()> {
        for doc in docs {
            for def in &doc.definitions {
                let ast::TypeSystemDefinition::Directive(directive) = def else {
                    continue;
                };
                let name = directive.node.name.node.to_string();
                if self.graph.directive(&name).is_some() {
                    return Err(SchemaError::Validation(format!(
                        "There can be only one directive named \"@{}\".",
                        name
                    )));
                }
                let mut converted = Directive::new(
                    name,
                    directive
                        .node
                        .locations
                        .iter()
                        .map(|l| convert_location(&l.node))
                        .collect(),
                );
                converted.description = directive.node.description.as_ref().map(|d| d.node.clone());
                converted.is_repeatable = directive.node.is_repeatable;
                converted.position = self.position(directive.pos);
                for arg in &directive.node.arguments {
                    converted
                        .args
                        .insert(arg.node.name.node.to_string(), self.convert_input_value(arg)?);
                }
                self.graph.add_directive(converted);
            }
        }
        Ok(())
    }

    // Phase 4: roots from `schema {}` or by naming convention
    fn set_roots(&mut self, docs: &[&ast::ServiceDocument]) -> Result<()> {
        let mut explicit = false;
        for doc in docs {
            for def in &doc.definitions {
                let ast::TypeSystemDefinition::Schema(schema) = def else {
                    continue;
                };
                explicit = true;
                let roots = [
                    (RootKind::Query, &schema.node.query),
                    (RootKind::Mutation, &schema.node.mutation),
                    (RootKind::Subscription, &schema.node.subscription),
                ];
                for (kind, name) in roots {
                    if let Some(name) = name {
                        let id = self.lookup(&name.node)?;
                        self.graph.set_root(kind, Some(id));
                    }
                }
            }
        }

        if !explicit {
            for kind in RootKind::ALL {
                let id = self
                    .graph
                    .type_id(kind.default_type_name())
                    .filter(|id| matches!(self.graph[*id].kind, TypeKind::Object(_)));
                self.graph.set_root(kind, id);
            }
        }
        Ok(())
    }

    // Phase 5: built-in directives and internal default values
    fn finish(mut self) -> Result<SchemaGraph> {
        self.graph.add_specified_directives();
        for_each_default_value(&mut self.graph, parse_input_value)?;

        let mut directives = std::mem::take(&mut self.graph.directives);
        for directive in &mut directives {
            for (arg_name, arg) in directive.args.iter_mut() {
                let Some(default) = &arg.default_value else {
                    continue;
                };
                let parsed = parse_input_value(&self.graph, &arg.ty, default).map_err(|message| {
                    SchemaError::InvalidDefaultValue {
                        location: format!("@{}({}:)", directive.name, arg_name),
                        message,
                    }
                })?;
                arg.default_value = Some(parsed);
            }
        }
        self.graph.directives = directives;

        debug!(arena = self.graph.arena_len(), "graph builder finished");
        Ok(self.graph)
    }

    fn lookup(&mut self, name: &str) -> Result<TypeId> {
        self.graph
            .type_id(name)
            .or_else(|| self.graph.ensure_specified_scalar(name))
            .ok_or_else(|| SchemaError::Validation(format!("Unknown type \"{}\".", name)))
    }

    fn resolve_names(&mut self, names: &[Positioned<async_graphql::Name>]) -> Result<Vec<TypeId>> {
        names.iter().map(|n| self.lookup(&n.node)).collect()
    }

    fn resolve_type(&mut self, ty: &ast::Type) -> Result<TypeRef> {
        let base = match &ty.base {
            ast::BaseType::Named(name) => TypeRef::Named(self.lookup(name)?),
            ast::BaseType::List(inner) => TypeRef::list(self.resolve_type(inner)?),
        };
        Ok(if ty.nullable { base } else { TypeRef::non_null(base) })
    }

    fn convert_fields(
        &mut self,
        fields: &[Positioned<ast::FieldDefinition>],
    ) -> Result<Vec<(String, Field)>> {
        let mut out = Vec::with_capacity(fields.len());
        for field in fields {
            let mut converted = Field::new(self.resolve_type(&field.node.ty.node)?);
            converted.description = field.node.description.as_ref().map(|d| d.node.clone());
            converted.directives = convert_directives(&field.node.directives);
            converted.deprecation_reason = deprecation_reason(&converted.directives);
            converted.position = self.position(field.pos);
            for arg in &field.node.arguments {
                converted
                    .args
                    .insert(arg.node.name.node.to_string(), self.convert_input_value(arg)?);
            }
            out.push((field.node.name.node.to_string(), converted));
        }
        Ok(out)
    }

    /// Default values stay in external form until [`Self::finish`].
    fn convert_input_value(&mut self, value: &Positioned<ast::InputValueDefinition>) -> Result<InputValue> {
        let mut converted = InputValue::new(self.resolve_type(&value.node.ty.node)?);
        converted.description = value.node.description.as_ref().map(|d| d.node.clone());
        converted.default_value = value.node.default_value.as_ref().map(|v| v.node.clone());
        converted.directives = convert_directives(&value.node.directives);
        converted.deprecation_reason = deprecation_reason(&converted.directives);
        converted.position = self.position(value.pos);
        Ok(converted)
    }

    fn convert_enum_value(&self, value: &Positioned<ast::EnumValueDefinition>) -> EnumValue {
        let mut converted = EnumValue::new(&value.node.value.node);
        converted.description = value.node.description.as_ref().map(|d| d.node.clone());
        converted.directives = convert_directives(&value.node.directives);
        converted.deprecation_reason = deprecation_reason(&converted.directives);
        converted.position = self.position(value.pos);
        converted
    }
}

fn type_definitions<'d>(
    docs: &'d [&'d ast::ServiceDocument],
) -> impl Iterator<Item = &'d Positioned<ast::TypeDefinition>> + 'd {
    docs.iter().flat_map(|doc| {
        doc.definitions.iter().filter_map(|def| match def {
            ast::TypeSystemDefinition::Type(ty) => Some(ty),
            _ => None,
        })
    })
}

fn merge_fields(type_name: &str, target: &mut IndexMap<String, Field>, fields: Vec<(String, Field)>) -> Result<()> {
    for (name, field) in fields {
        if target.contains_key(&name) {
            return Err(SchemaError::Validation(format!(
                "Field \"{}.{}\" can only be defined once.",
                type_name, name
            )));
        }
        target.insert(name, field);
    }
    Ok(())
}

fn kind_mismatch(name: &str, expected: &str) -> SchemaError {
    SchemaError::Validation(format!(
        "Cannot extend non-{} type \"{}\" with a {} extension.",
        expected, name, expected
    ))
}

fn convert_directives(directives: &[Positioned<ast::ConstDirective>]) -> Vec<DirectiveUse> {
    directives
        .iter()
        .map(|d| DirectiveUse {
            name: d.node.name.node.to_string(),
            arguments: d
                .node
                .arguments
                .iter()
                .map(|(name, value)| (name.node.to_string(), value.node.clone()))
                .collect(),
        })
        .collect()
}

fn deprecation_reason(directives: &[DirectiveUse]) -> Option<String> {
    let deprecated = directives.iter().find(|d| d.name == "deprecated")?;
    Some(match deprecated.arguments.get("reason") {
        Some(Value::String(reason)) => reason.clone(),
        _ => DEFAULT_DEPRECATION_REASON.to_string(),
    })
}

fn specified_by_url(directives: &[DirectiveUse]) -> Option<String> {
    let specified = directives.iter().find(|d| d.name == "specifiedBy")?;
    match specified.arguments.get("url") {
        Some(Value::String(url)) => Some(url.clone()),
        _ => None,
    }
}

fn convert_location(location: &ast::DirectiveLocation) -> DirectiveLocation {
    match location {
        ast::DirectiveLocation::Query => DirectiveLocation::Query,
        ast::DirectiveLocation::Mutation => DirectiveLocation::Mutation,
        ast::DirectiveLocation::Subscription => DirectiveLocation::Subscription,
        ast::DirectiveLocation::Field => DirectiveLocation::Field,
        ast::DirectiveLocation::FragmentDefinition => DirectiveLocation::FragmentDefinition,
        ast::DirectiveLocation::FragmentSpread => DirectiveLocation::FragmentSpread,
        ast::DirectiveLocation::InlineFragment => DirectiveLocation::InlineFragment,
        ast::DirectiveLocation::VariableDefinition => DirectiveLocation::VariableDefinition,
        ast::DirectiveLocation::Schema => DirectiveLocation::Schema,
        ast::DirectiveLocation::Scalar => DirectiveLocation::Scalar,
        ast::DirectiveLocation::Object => DirectiveLocation::Object,
        ast::DirectiveLocation::FieldDefinition => DirectiveLocation::FieldDefinition,
        ast::DirectiveLocation::ArgumentDefinition => DirectiveLocation::ArgumentDefinition,
        ast::DirectiveLocation::Interface => DirectiveLocation::Interface,
        ast::DirectiveLocation::Union => DirectiveLocation::Union,
        ast::DirectiveLocation::Enum => DirectiveLocation::Enum,
        ast::DirectiveLocation::EnumValue => DirectiveLocation::EnumValue,
        ast::DirectiveLocation::InputObject => DirectiveLocation::InputObject,
        ast::DirectiveLocation::InputFieldDefinition => DirectiveLocation::InputFieldDefinition,
    }
}
