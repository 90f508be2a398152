//! SDL printer. Output follows type-map order so it is stable across runs.

use async_graphql::Value;
use indexmap::IndexMap;
use std::fmt::Write;

use super::engine::{is_specified_directive, is_specified_scalar, RootKind, SchemaGraph};
use super::types::{
    is_reserved_name, Directive, DirectiveUse, Field, InputValue, NamedType, TypeKind, TypeRef,
    DEFAULT_DEPRECATION_REASON,
};
use super::values::serialize_input_value;

/// Print the graph as SDL, leaving out built-ins and reserved names.
pub fn print_schema(graph: &SchemaGraph) -> String {
    let mut blocks = Vec::new();

    if let Some(schema) = print_schema_definition(graph) {
        blocks.push(schema);
    }
    for directive in graph.directives() {
        if !is_specified_directive(&directive.name) {
            blocks.push(print_directive(graph, directive));
        }
    }
    for (_, ty) in graph.types() {
        if is_reserved_name(&ty.name) || is_specified_scalar(&ty.name) {
            continue;
        }
        blocks.push(print_type(graph, ty));
    }

    let mut out = blocks.join("\n\n");
    out.push('\n');
    out
}

fn print_schema_definition(graph: &SchemaGraph) -> Option<String> {
    let conventional = RootKind::ALL.iter().all(|kind| match graph.root(*kind) {
        Some(id) => graph[id].name == kind.default_type_name(),
        None => true,
    });
    if conventional {
        return None;
    }
    let mut out = String::from("schema {\n");
    for kind in RootKind::ALL {
        if let Some(id) = graph.root(kind) {
            let _ = writeln!(out, "  {}: {}", kind.keyword(), graph[id].name);
        }
    }
    out.push('}');
    Some(out)
}

fn print_directive(graph: &SchemaGraph, directive: &Directive) -> String {
    let mut out = description(&directive.description, "");
    let _ = write!(out, "directive @{}{}", directive.name, print_args(graph, &directive.args, ""));
    if directive.is_repeatable {
        out.push_str(" repeatable");
    }
    let locations: Vec<&str> = directive.locations.iter().map(|l| l.as_str()).collect();
    let _ = write!(out, " on {}", locations.join(" | "));
    out
}

fn print_type(graph: &SchemaGraph, ty: &NamedType) -> String {
    let mut out = description(&ty.description, "");
    let directives = print_directive_uses(&ty.directives);
    match &ty.kind {
        TypeKind::Scalar(_) => {
            let _ = write!(out, "scalar {}{}", ty.name, directives);
        }
        TypeKind::Object(object) => {
            let _ = write!(
                out,
                "type {}{}{}{}",
                ty.name,
                print_implements(graph, &object.interfaces),
                directives,
                print_fields(graph, &object.fields)
            );
        }
        TypeKind::Interface(interface) => {
            let _ = write!(
                out,
                "interface {}{}{}{}",
                ty.name,
                print_implements(graph, &interface.interfaces),
                directives,
                print_fields(graph, &interface.fields)
            );
        }
        TypeKind::Union(union) => {
            let members: Vec<&str> = union.members.iter().map(|m| graph[*m].name.as_str()).collect();
            let _ = write!(out, "union {}{}", ty.name, directives);
            if !members.is_empty() {
                let _ = write!(out, " = {}", members.join(" | "));
            }
        }
        TypeKind::Enum(enum_type) => {
            let values = enum_type.values.iter().map(|(name, value)| {
                format!(
                    "{}  {}{}",
                    description(&value.description, "  "),
                    name,
                    print_deprecated(value.deprecation_reason.as_deref())
                )
            });
            let _ = write!(out, "enum {}{}{}", ty.name, directives, print_block(values));
        }
        TypeKind::InputObject(input) => {
            let fields = input.fields.iter().map(|(name, field)| {
                format!(
                    "{}  {}: {}{}",
                    description(&field.description, "  "),
                    name,
                    graph.display_type_ref(&field.ty),
                    print_default(graph, &field.ty, field.default_value.as_ref())
                )
            });
            let _ = write!(out, "input {}{}{}", ty.name, directives, print_block(fields));
        }
    }
    out
}

fn print_implements(graph: &SchemaGraph, interfaces: &[super::types::TypeId]) -> String {
    if interfaces.is_empty() {
        return String::new();
    }
    let names: Vec<&str> = interfaces.iter().map(|i| graph[*i].name.as_str()).collect();
    format!(" implements {}", names.join(" & "))
}

/// ` {\n...\n}`, or nothing at all for an empty body.
fn print_block(lines: impl Iterator<Item = String>) -> String {
    let lines: Vec<String> = lines.collect();
    if lines.is_empty() {
        return String::new();
    }
    format!(" {{\n{}\n}}", lines.join("\n"))
}

fn print_fields(graph: &SchemaGraph, fields: &IndexMap<String, Field>) -> String {
    print_block(fields.iter().map(|(name, field)| {
        format!(
            "{}  {}{}: {}{}{}",
            description(&field.description, "  "),
            name,
            print_args(graph, &field.args, "  "),
            graph.display_type_ref(&field.ty),
            print_deprecated(field.deprecation_reason.as_deref()),
            print_directive_uses(
                &field
                    .directives
                    .iter()
                    .filter(|d| d.name != "deprecated")
                    .cloned()
                    .collect::<Vec<_>>()
            )
        )
    }))
}

fn print_args(graph: &SchemaGraph, args: &IndexMap<String, InputValue>, indent: &str) -> String {
    if args.is_empty() {
        return String::new();
    }
    let multiline = args.values().any(|a| a.description.is_some());
    let printed: Vec<String> = args
        .iter()
        .map(|(name, arg)| {
            let inner_indent = format!("{}  ", indent);
            let prefix = if multiline {
                description(&arg.description, &inner_indent)
            } else {
                String::new()
            };
            format!(
                "{}{}{}: {}{}{}",
                prefix,
                if multiline { inner_indent.as_str() } else { "" },
                name,
                graph.display_type_ref(&arg.ty),
                print_default(graph, &arg.ty, arg.default_value.as_ref()),
                print_deprecated(arg.deprecation_reason.as_deref())
            )
        })
        .collect();
    if multiline {
        format!("(\n{}\n{})", printed.join("\n"), indent)
    } else {
        format!("({})", printed.join(", "))
    }
}

fn print_default(graph: &SchemaGraph, ty: &TypeRef, value: Option<&Value>) -> String {
    match value {
        Some(value) => {
            let external = serialize_input_value(graph, ty, value).unwrap_or_else(|_| value.clone());
            format!(" = {}", external)
        }
        None => String::new(),
    }
}

fn print_deprecated(reason: Option<&str>) -> String {
    match reason {
        None => String::new(),
        Some(DEFAULT_DEPRECATION_REASON) => " @deprecated".to_string(),
        Some(reason) => format!(" @deprecated(reason: {})", Value::String(reason.to_string())),
    }
}

fn print_directive_uses(directives: &[DirectiveUse]) -> String {
    let mut out = String::new();
    for directive in directives {
        let _ = write!(out, " @{}", directive.name);
        if !directive.arguments.is_empty() {
            let args: Vec<String> = directive
                .arguments
                .iter()
                .map(|(name, value)| format!("{}: {}", name, value))
                .collect();
            let _ = write!(out, "({})", args.join(", "));
        }
    }
    out
}

fn description(text: &Option<String>, indent: &str) -> String {
    match text {
        Some(text) if !text.contains('\n') && !text.contains('"') => {
            format!("{}\"{}\"\n", indent, text)
        }
        Some(text) => {
            let mut out = format!("{}\"\"\"\n", indent);
            for line in text.replace("\"\"\"", "\\\"\"\"").lines() {
                let _ = writeln!(out, "{}{}", indent, line);
            }
            let _ = writeln!(out, "{}\"\"\"", indent);
            out
        }
        None => String::new(),
    }
}
