//! SDL text handling: parse options, legacy comment descriptions and
//! concatenation of several type-definition sources.

use async_graphql_parser::types::ServiceDocument;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SchemaError};

/// How SDL text is turned into a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Treat `#` comment blocks above definitions as their descriptions.
    pub comment_descriptions: bool,
    /// Do not record source positions on graph nodes.
    pub no_location: bool,
}

/// Parse one SDL source.
///
/// A source holding nothing but comments and whitespace yields an empty
/// document instead of a syntax error.
pub fn parse_graphql_sdl(location: &str, sdl: &str, options: &ParseOptions) -> Result<ServiceDocument> {
    if is_blank_sdl(sdl) {
        debug!(location, "empty type definitions");
        return Ok(ServiceDocument {
            definitions: Vec::new(),
        });
    }

    let source = if options.comment_descriptions {
        transform_comments_to_descriptions(sdl)
    } else {
        sdl.to_string()
    };

    async_graphql_parser::parse_schema(&source).map_err(|e| SchemaError::Syntax {
        location: location.to_string(),
        message: e.to_string(),
    })
}

/// Join several SDL sources, dropping exact duplicates.
pub fn concatenate_type_defs<S: AsRef<str>>(sources: &[S]) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for source in sources {
        let trimmed = source.as_ref().trim();
        if !trimmed.is_empty() && !seen.contains(&trimmed) {
            seen.push(trimmed);
        }
    }
    seen.join("\n")
}

fn is_blank_sdl(sdl: &str) -> bool {
    sdl.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

/// Rewrite blocks of `#` comments directly above a describable line into
/// block-string descriptions. A blank line ends a block.
fn transform_comments_to_descriptions(sdl: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut block: Vec<String> = Vec::new();

    for line in sdl.lines() {
        let trimmed = line.trim_start();

        if let Some(comment) = trimmed.strip_prefix('#') {
            block.push(comment.trim().to_string());
            continue;
        }

        if !block.is_empty() && is_describable(trimmed) {
            let indent = &line[..line.len() - trimmed.len()];
            out.push(format!("{}\"\"\"", indent));
            for comment in block.drain(..) {
                out.push(format!("{}{}", indent, comment.replace("\"\"\"", "\\\"\"\"")));
            }
            out.push(format!("{}\"\"\"", indent));
        }
        block.clear();
        out.push(line.to_string());
    }

    out.join("\n")
}

fn is_describable(line: &str) -> bool {
    const NOT_DESCRIBABLE: [&str; 3] = ["extend", "schema", "implements"];
    let Some(first) = line.chars().next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    let word: String = line
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    !NOT_DESCRIBABLE.contains(&word.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql_parser::types::{TypeKind, TypeSystemDefinition};

    #[test]
    fn test_comment_descriptions() {
        let sdl = "# The root\n# of all queries\ntype Query {\n  # Greets\n  hello: String\n\n  # stray\n\n  other: Int\n}\n";
        let options = ParseOptions {
            comment_descriptions: true,
            ..ParseOptions::default()
        };
        let doc = parse_graphql_sdl("test", sdl, &options).unwrap();

        let TypeSystemDefinition::Type(query) = &doc.definitions[0] else {
            panic!("expected a type definition");
        };
        assert_eq!(
            query.node.description.as_ref().map(|d| d.node.as_str()),
            Some("The root\nof all queries")
        );
        let TypeKind::Object(object) = &query.node.kind else {
            panic!("expected an object");
        };
        assert_eq!(
            object.fields[0].node.description.as_ref().map(|d| d.node.as_str()),
            Some("Greets")
        );
        assert!(
            object.fields[1].node.description.is_none(),
            "a blank line separates a comment from the next field"
        );
    }

    #[test]
    fn test_comment_only_sdl_is_empty() {
        let doc = parse_graphql_sdl("test", "# nothing here\n\n", &ParseOptions::default()).unwrap();
        assert!(doc.definitions.is_empty());
    }

    #[test]
    fn test_syntax_error_names_location() {
        let err = parse_graphql_sdl("users.graphql", "type Query {", &ParseOptions::default()).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("users.graphql"), "got: {}", err);
    }

    #[test]
    fn test_concatenate_dedupes() {
        let joined = concatenate_type_defs(&["type A { a: Int }", "  type A { a: Int }", "", "type B { b: Int }"]);
        assert_eq!(joined, "type A { a: Int }\ntype B { b: Int }");
    }
}
