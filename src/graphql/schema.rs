//! Registration of a schema graph with the dynamic executor.

use async_graphql::dynamic::{
    Enum, EnumItem, Field, FieldFuture, InputObject, InputValue, Interface, InterfaceField, Object, Scalar,
    Schema, TypeRef as DynTypeRef, Union,
};
use indexmap::IndexMap;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

use super::resolve::{Bridge, FieldPlan};
use crate::error::{Result, SchemaError};
use crate::graph::{
    is_reserved_name, is_specified_scalar, serialize_input_value, InputValue as GraphInputValue, NamedType,
    SchemaGraph, TypeKind, TypeRef,
};

/// Register every user type of the bridged graph and finish the schema.
///
/// Subscription types are registered but no subscription root is set.
pub(crate) fn build_dynamic_schema(bridge: &Arc<Bridge>) -> Result<Schema> {
    let graph = &bridge.graph;
    let query = graph
        .query_type()
        .map(|ty| ty.name.clone())
        .ok_or_else(|| SchemaError::Executable("Query root type must be provided.".to_string()))?;
    let mutation = graph.mutation_type().map(|ty| ty.name.clone());

    let mut builder = Schema::build(&query, mutation.as_deref(), None);
    let mut registered = 0;
    for (_, ty) in graph.types() {
        if is_reserved_name(&ty.name) || is_specified_scalar(&ty.name) {
            continue;
        }
        builder = match &ty.kind {
            TypeKind::Scalar(scalar) => {
                let mut out = Scalar::new(ty.name.as_str());
                if let Some(url) = &scalar.specified_by_url {
                    out = out.specified_by_url(url.as_str());
                }
                builder.register(with_description(out, ty, Scalar::description))
            }
            TypeKind::Enum(enum_type) => {
                let mut out = Enum::new(ty.name.as_str());
                for (name, value) in &enum_type.values {
                    let mut item = EnumItem::new(name.as_str()).deprecation(value.deprecation_reason.as_deref());
                    if let Some(description) = &value.description {
                        item = item.description(description.as_str());
                    }
                    out = out.item(item);
                }
                builder.register(with_description(out, ty, Enum::description))
            }
            TypeKind::Object(object) => {
                let mut out = Object::new(ty.name.as_str());
                for &interface in &object.interfaces {
                    out = out.implement(graph[interface].name.as_str());
                }
                for (field_name, field) in &object.fields {
                    let plan = Arc::new(FieldPlan {
                        bridge: Arc::clone(bridge),
                        parent_type: ty.name.clone(),
                        field_name: field_name.clone(),
                        ty: field.ty.clone(),
                        args: field.args.clone(),
                        resolver: field.resolve.clone(),
                    });
                    let mut dyn_field = Field::new(field_name.as_str(), dyn_type_ref(graph, &field.ty), move |ctx| {
                        let plan = Arc::clone(&plan);
                        FieldFuture::new(async move { plan.resolve(ctx).await })
                    })
                    .deprecation(field.deprecation_reason.as_deref());
                    for arg in arguments(graph, &field.args)? {
                        dyn_field = dyn_field.argument(arg);
                    }
                    if let Some(description) = &field.description {
                        dyn_field = dyn_field.description(description.as_str());
                    }
                    out = out.field(dyn_field);
                }
                builder.register(with_description(out, ty, Object::description))
            }
            TypeKind::Interface(interface) => {
                let mut out = Interface::new(ty.name.as_str());
                for &parent in &interface.interfaces {
                    out = out.implement(graph[parent].name.as_str());
                }
                for (field_name, field) in &interface.fields {
                    let mut dyn_field = InterfaceField::new(field_name.as_str(), dyn_type_ref(graph, &field.ty))
                        .deprecation(field.deprecation_reason.as_deref());
                    for arg in arguments(graph, &field.args)? {
                        dyn_field = dyn_field.argument(arg);
                    }
                    if let Some(description) = &field.description {
                        dyn_field = dyn_field.description(description.as_str());
                    }
                    out = out.field(dyn_field);
                }
                builder.register(with_description(out, ty, Interface::description))
            }
            TypeKind::Union(union) => {
                let mut out = Union::new(ty.name.as_str());
                for &member in &union.members {
                    out = out.possible_type(graph[member].name.as_str());
                }
                builder.register(with_description(out, ty, Union::description))
            }
            TypeKind::InputObject(input) => {
                let mut out = InputObject::new(ty.name.as_str());
                for (field_name, field) in &input.fields {
                    let as_input = GraphInputValue {
                        description: field.description.clone(),
                        ty: field.ty.clone(),
                        default_value: field.default_value.clone(),
                        deprecation_reason: field.deprecation_reason.clone(),
                        directives: Vec::new(),
                        position: None,
                    };
                    out = out.field(input_value(graph, field_name, &as_input)?);
                }
                builder.register(with_description(out, ty, InputObject::description))
            }
        };
        registered += 1;
    }

    debug!(types = registered, query = %query, "dynamic schema registered");
    builder.finish().map_err(|e| SchemaError::Executable(e.to_string()))
}

fn with_description<T>(out: T, ty: &NamedType, describe: fn(T, String) -> T) -> T {
    match &ty.description {
        Some(description) => describe(out, description.clone()),
        None => out,
    }
}

fn dyn_type_ref(graph: &SchemaGraph, ty: &TypeRef) -> DynTypeRef {
    match ty {
        TypeRef::Named(id) => DynTypeRef::Named(Cow::Owned(graph[*id].name.clone())),
        TypeRef::List(inner) => DynTypeRef::List(Box::new(dyn_type_ref(graph, inner))),
        TypeRef::NonNull(inner) => DynTypeRef::NonNull(Box::new(dyn_type_ref(graph, inner))),
    }
}

fn arguments(graph: &SchemaGraph, args: &IndexMap<String, GraphInputValue>) -> Result<Vec<InputValue>> {
    args.iter().map(|(name, arg)| input_value(graph, name, arg)).collect()
}

/// Defaults are handed over in external form.
fn input_value(graph: &SchemaGraph, name: &str, arg: &GraphInputValue) -> Result<InputValue> {
    let mut out = InputValue::new(name, dyn_type_ref(graph, &arg.ty));
    if let Some(default) = &arg.default_value {
        let external = serialize_input_value(graph, &arg.ty, default).map_err(|message| {
            SchemaError::InvalidDefaultValue {
                location: name.to_string(),
                message,
            }
        })?;
        out = out.default_value(external);
    }
    if let Some(description) = &arg.description {
        out = out.description(description.as_str());
    }
    Ok(out)
}
