//! Reading directive usages back as coerced argument values.

use async_graphql::Value;
use indexmap::IndexMap;

use crate::error::{Result, SchemaError};
use crate::graph::{parse_input_value, DirectiveUse, SchemaGraph};

/// Arguments of one directive usage, in internal form.
pub type DirectiveArgs = IndexMap<String, Value>;

/// Usages of one directive on a node.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveValues {
    Single(DirectiveArgs),
    /// Every usage of a repeatable directive, in source order.
    Repeated(Vec<DirectiveArgs>),
}

impl DirectiveValues {
    /// First (or only) usage.
    pub fn first(&self) -> Option<&DirectiveArgs> {
        match self {
            DirectiveValues::Single(args) => Some(args),
            DirectiveValues::Repeated(all) => all.first(),
        }
    }
}

/// Directive usages keyed by name with their arguments coerced against the
/// directive definitions in `graph`. Usages of undefined directives are skipped.
pub fn get_directives(graph: &SchemaGraph, usages: &[DirectiveUse]) -> Result<IndexMap<String, DirectiveValues>> {
    let mut out: IndexMap<String, DirectiveValues> = IndexMap::new();
    for usage in usages {
        let Some(definition) = graph.directive(&usage.name) else {
            continue;
        };

        let mut args = DirectiveArgs::new();
        for (arg_name, arg) in &definition.args {
            let value = match usage.arguments.get(arg_name) {
                Some(given) => parse_input_value(graph, &arg.ty, given).map_err(|message| {
                    SchemaError::Validation(format!(
                        "Argument \"{}\" of directive \"@{}\" has invalid value: {}",
                        arg_name, usage.name, message
                    ))
                })?,
                None => match &arg.default_value {
                    Some(default) => default.clone(),
                    None => continue,
                },
            };
            args.insert(arg_name.clone(), value);
        }

        if definition.is_repeatable {
            match out.get_mut(&usage.name) {
                Some(DirectiveValues::Repeated(all)) => all.push(args),
                _ => {
                    out.insert(usage.name.clone(), DirectiveValues::Repeated(vec![args]));
                }
            }
        } else {
            out.insert(usage.name.clone(), DirectiveValues::Single(args));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{build_schema_from_type_definitions, ParseOptions};
    use async_graphql::Name;

    #[test]
    fn test_directive_arguments_are_coerced() {
        let graph = build_schema_from_type_definitions(
            &r#"
            enum Role { ADMIN USER }
            directive @auth(role: Role = USER, strict: Boolean) on FIELD_DEFINITION
            directive @tag(name: String) repeatable on FIELD_DEFINITION
            type Query {
              a: Int @auth(role: ADMIN) @tag(name: "x") @tag(name: "y") @unknown
              b: Int @auth
            }
            "#
            .into(),
            &ParseOptions::default(),
        )
        .unwrap();
        let fields = graph.query_type().unwrap().fields().unwrap();

        let a = get_directives(&graph, &fields["a"].directives).unwrap();
        assert_eq!(a.len(), 2, "undefined directives are skipped");
        assert_eq!(
            a["auth"].first().unwrap()["role"],
            Value::String("ADMIN".into()),
            "enum argument parsed to its internal value"
        );
        let DirectiveValues::Repeated(tags) = &a["tag"] else {
            panic!("repeatable directive collects usages");
        };
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[1]["name"], Value::String("y".into()));

        let b = get_directives(&graph, &fields["b"].directives).unwrap();
        assert_eq!(b["auth"].first().unwrap()["role"], Value::String("USER".into()), "default applied");
        assert!(!b["auth"].first().unwrap().contains_key("strict"));

        let bad = vec![DirectiveUse::new("auth").with_argument("role", Value::Enum(Name::new("ROOT")))];
        assert!(get_directives(&graph, &bad).unwrap_err().is_validation());
    }
}
