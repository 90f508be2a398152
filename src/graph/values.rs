//! Input value coercion and walkers over fields and default values.

use async_graphql::{Name, Value};

use super::engine::SchemaGraph;
use super::types::{Field, NamedType, TypeId, TypeKind, TypeRef};
use crate::error::{Result, SchemaError};

/// Walk `value` along its input type, applying `leaf` to every scalar or
/// enum position. Lists map element-wise (a bare value is treated as a single
/// element), input objects map per declared field and drop unknown keys.
pub fn transform_input_value<F>(
    graph: &SchemaGraph,
    ty: &TypeRef,
    value: &Value,
    leaf: &mut F,
) -> std::result::Result<Value, String>
where
    F: FnMut(&NamedType, &Value) -> std::result::Result<Value, String>,
{
    if matches!(value, Value::Null) {
        return Ok(Value::Null);
    }
    match ty {
        TypeRef::NonNull(inner) => transform_input_value(graph, inner, value, leaf),
        TypeRef::List(inner) => match value {
            Value::List(items) => items
                .iter()
                .map(|item| transform_input_value(graph, inner, item, leaf))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::List),
            other => transform_input_value(graph, inner, other, leaf),
        },
        TypeRef::Named(id) => {
            let named = &graph[*id];
            match &named.kind {
                TypeKind::InputObject(input) => {
                    let Value::Object(map) = value else {
                        return Err(format!(
                            "Expected an object for input type \"{}\", found {}",
                            named.name, value
                        ));
                    };
                    let mut out = indexmap::IndexMap::new();
                    for (key, item) in map {
                        if let Some(field) = input.fields.get(key.as_str()) {
                            out.insert(key.clone(), transform_input_value(graph, &field.ty, item, leaf)?);
                        }
                    }
                    Ok(Value::Object(out))
                }
                TypeKind::Scalar(_) | TypeKind::Enum(_) => leaf(named, value),
                _ => Ok(value.clone()),
            }
        }
    }
}

/// Internal value to its external form, using leaf `serialize` functions.
pub fn serialize_input_value(
    graph: &SchemaGraph,
    ty: &TypeRef,
    value: &Value,
) -> std::result::Result<Value, String> {
    transform_input_value(graph, ty, value, &mut serialize_leaf)
}

/// External value to its internal form, using leaf `parse_value` functions.
pub fn parse_input_value(
    graph: &SchemaGraph,
    ty: &TypeRef,
    value: &Value,
) -> std::result::Result<Value, String> {
    transform_input_value(graph, ty, value, &mut parse_leaf)
}

pub(crate) fn serialize_leaf(named: &NamedType, value: &Value) -> std::result::Result<Value, String> {
    match &named.kind {
        TypeKind::Enum(e) => {
            if let Some((name, _)) = e.values.iter().find(|(_, v)| &v.value == value) {
                return Ok(Value::Enum(Name::new(name)));
            }
            // Values that already carry the external name pass through.
            if let Value::Enum(name) = value {
                if e.values.contains_key(name.as_str()) {
                    return Ok(value.clone());
                }
            }
            Err(format!("Enum \"{}\" cannot represent value: {}", named.name, value))
        }
        TypeKind::Scalar(s) => match &s.serialize {
            Some(f) => f.apply(value),
            None => Ok(value.clone()),
        },
        _ => Ok(value.clone()),
    }
}

pub(crate) fn parse_leaf(named: &NamedType, value: &Value) -> std::result::Result<Value, String> {
    match &named.kind {
        TypeKind::Enum(e) => {
            let key = match value {
                Value::Enum(name) => name.as_str(),
                Value::String(s) => s.as_str(),
                other => {
                    return Err(format!(
                        "Enum \"{}\" cannot represent non-enum value: {}",
                        named.name, other
                    ))
                }
            };
            e.values
                .get(key)
                .map(|v| v.value.clone())
                .ok_or_else(|| format!("Value \"{}\" does not exist in \"{}\" enum.", key, named.name))
        }
        TypeKind::Scalar(s) => match &s.parse_value {
            Some(f) => f.apply(value),
            None => Ok(value.clone()),
        },
        _ => Ok(value.clone()),
    }
}

/// Visit every object field. Interface fields never execute and are skipped.
pub fn for_each_field<F>(graph: &mut SchemaGraph, mut f: F)
where
    F: FnMut(&mut Field, &str, &str),
{
    for id in graph.user_type_ids() {
        let ty = &mut graph[id];
        let type_name = ty.name.clone();
        let TypeKind::Object(object) = &mut ty.kind else {
            continue;
        };
        let fields = &mut object.fields;
        for (field_name, field) in fields.iter_mut() {
            f(field, &type_name, field_name);
        }
    }
}

/// Replace every argument and input-field default with `f(graph, type, default)`.
///
/// New values are computed against the graph as it is before any of them
/// are written back.
pub fn for_each_default_value<F>(graph: &mut SchemaGraph, f: F) -> Result<()>
where
    F: FnMut(&SchemaGraph, &TypeRef, &Value) -> std::result::Result<Value, String>,
{
    let ids = graph.user_type_ids();
    map_defaults_of(graph, &ids, f)
}

/// [`for_each_default_value`] restricted to the given type instances.
pub(crate) fn map_defaults_of<F>(graph: &mut SchemaGraph, ids: &[TypeId], mut f: F) -> Result<()>
where
    F: FnMut(&SchemaGraph, &TypeRef, &Value) -> std::result::Result<Value, String>,
{
    enum Slot {
        Argument(String, String),
        InputField(String),
    }

    let mut updates = Vec::new();
    for &id in ids {
        let ty = &graph[id];
        match &ty.kind {
            TypeKind::Object(_) | TypeKind::Interface(_) => {
                for (field_name, field) in ty.fields().into_iter().flatten() {
                    for (arg_name, arg) in &field.args {
                        if let Some(default) = &arg.default_value {
                            let value = f(graph, &arg.ty, default).map_err(|message| {
                                SchemaError::InvalidDefaultValue {
                                    location: format!("{}.{}({}:)", ty.name, field_name, arg_name),
                                    message,
                                }
                            })?;
                            updates.push((id, Slot::Argument(field_name.clone(), arg_name.clone()), value));
                        }
                    }
                }
            }
            TypeKind::InputObject(input) => {
                for (field_name, field) in &input.fields {
                    if let Some(default) = &field.default_value {
                        let value = f(graph, &field.ty, default).map_err(|message| {
                            SchemaError::InvalidDefaultValue {
                                location: format!("{}.{}", ty.name, field_name),
                                message,
                            }
                        })?;
                        updates.push((id, Slot::InputField(field_name.clone()), value));
                    }
                }
            }
            _ => {}
        }
    }

    for (id, slot, value) in updates {
        let Some(fields) = graph[id].fields_mut() else {
            continue;
        };
        match slot {
            Slot::Argument(field_name, arg_name) => {
                if let Some(arg) = fields
                    .get_mut(&field_name)
                    .and_then(|field| field.args.get_mut(&arg_name))
                {
                    arg.default_value = Some(value);
                }
            }
            Slot::InputField(field_name) => {
                if let Some(field) = fields.get_mut(&field_name) {
                    field.default_value = Some(value);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::{EnumType, EnumValue, InputObjectType, InputValue, ScalarType};
    use crate::graph::LeafCoercion;

    fn color_graph() -> (SchemaGraph, TypeRef) {
        let mut graph = SchemaGraph::new();
        let mut values = indexmap::IndexMap::new();
        let mut red = EnumValue::new("RED");
        red.value = Value::Number(1.into());
        values.insert("RED".to_string(), red);
        values.insert("BLUE".to_string(), EnumValue::new("BLUE"));
        let color = graph.insert_type(NamedType::new("Color", TypeKind::Enum(EnumType { values })));
        (graph, TypeRef::list(TypeRef::named(color)))
    }

    #[test]
    fn test_enum_parse_and_serialize() {
        let (graph, ty) = color_graph();
        let external = Value::List(vec![Value::Enum(Name::new("RED")), Value::Enum(Name::new("BLUE"))]);

        let internal = parse_input_value(&graph, &ty, &external).unwrap();
        assert_eq!(
            internal,
            Value::List(vec![Value::Number(1.into()), Value::String("BLUE".into())])
        );
        let back = serialize_input_value(&graph, &ty, &internal).unwrap();
        assert_eq!(back, external);

        let err = parse_input_value(&graph, &ty, &Value::Enum(Name::new("GREEN"))).unwrap_err();
        assert!(err.contains("does not exist"), "got: {}", err);
    }

    #[test]
    fn test_bare_value_for_list_type() {
        let (graph, ty) = color_graph();
        let parsed = parse_input_value(&graph, &ty, &Value::Enum(Name::new("RED"))).unwrap();
        assert_eq!(parsed, Value::Number(1.into()));
    }

    #[test]
    fn test_input_object_drops_unknown_keys_and_uses_scalar_parse() {
        let mut graph = SchemaGraph::new();
        let upper = graph.insert_type(NamedType::new(
            "Upper",
            TypeKind::Scalar(ScalarType {
                parse_value: Some(LeafCoercion::new(|v| match v {
                    Value::String(s) => Ok(Value::String(s.to_uppercase())),
                    other => Err(format!("not a string: {}", other)),
                })),
                ..ScalarType::default()
            }),
        ));
        let mut fields = indexmap::IndexMap::new();
        fields.insert("name".to_string(), Field::new(TypeRef::named(upper)));
        let input = graph.insert_type(NamedType::new(
            "Filter",
            TypeKind::InputObject(InputObjectType { fields }),
        ));

        let value = Value::from_json(serde_json::json!({"name": "ada", "extra": 1})).unwrap();
        let parsed = parse_input_value(&graph, &TypeRef::named(input), &value).unwrap();
        assert_eq!(parsed, Value::from_json(serde_json::json!({"name": "ADA"})).unwrap());
    }

    #[test]
    fn test_for_each_default_value_reports_location() {
        let (mut graph, ty) = color_graph();
        let query = NamedType::object("Query").with_field(
            "paint",
            Field::new(ty.clone()).with_arg(
                "colors",
                InputValue::new(ty).with_default(Value::String("PURPLE".into())),
            ),
        );
        graph.insert_type(query);

        let err = for_each_default_value(&mut graph, |g, ty, v| parse_input_value(g, ty, v)).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefaultValue { ref location, .. } if location == "Query.paint(colors:)"));
    }
}
