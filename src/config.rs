//! TOML configuration for building executable schemas.
//!
//! ```toml
//! [parse]
//! comment_descriptions = true
//!
//! [validation]
//! require_resolvers_to_match_schema = "warn"
//! require_resolvers_for_resolve_type = "error"
//!
//! [build]
//! inherit_resolvers_from_interfaces = true
//! allow_undefined_in_resolve = false
//! log_errors = true
//!
//! [pruning]
//! skip_unused_types_pruning = true
//! ```

use serde::Deserialize;
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::graph::ParseOptions;
use crate::prune::PruneOptions;
use crate::resolvers::ResolverValidationOptions;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    /// SDL parsing
    #[serde(default)]
    pub parse: ParseOptions,
    /// Resolver validation policies
    #[serde(default)]
    pub validation: ResolverValidationOptions,
    /// Resolver wiring
    #[serde(default)]
    pub build: BuildConfig,
    /// Pruning runs only when this section is present
    pub pruning: Option<PruningConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    pub inherit_resolvers_from_interfaces: bool,
    pub update_resolvers_in_place: bool,
    pub allow_undefined_in_resolve: bool,
    /// Report resolver errors through `tracing`.
    pub log_errors: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            inherit_resolvers_from_interfaces: false,
            update_resolvers_in_place: false,
            allow_undefined_in_resolve: true,
            log_errors: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PruningConfig {
    pub skip_empty_composite_type_pruning: bool,
    pub skip_unimplemented_interfaces_pruning: bool,
    pub skip_empty_union_pruning: bool,
    pub skip_unused_types_pruning: bool,
}

impl From<&PruningConfig> for PruneOptions {
    fn from(config: &PruningConfig) -> Self {
        PruneOptions {
            skip_empty_composite_type_pruning: config.skip_empty_composite_type_pruning,
            skip_unimplemented_interfaces_pruning: config.skip_unimplemented_interfaces_pruning,
            skip_empty_union_pruning: config.skip_empty_union_pruning,
            skip_unused_types_pruning: config.skip_unused_types_pruning,
            skip_pruning: None,
        }
    }
}

impl SchemaConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading schema config");
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolvers::ValidatorBehavior;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = SchemaConfig::from_toml_str("").unwrap();
        assert_eq!(config, SchemaConfig::default());
        assert!(config.build.allow_undefined_in_resolve);
        assert!(config.pruning.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[parse]
comment_descriptions = true

[validation]
require_resolvers_to_match_schema = "ignore"
require_resolvers_for_args = "warn"

[build]
allow_undefined_in_resolve = false

[pruning]
skip_empty_union_pruning = true
"#
        )
        .unwrap();

        let config = SchemaConfig::load(file.path()).unwrap();
        assert!(config.parse.comment_descriptions);
        assert_eq!(config.validation.require_resolvers_to_match_schema, Some(ValidatorBehavior::Ignore));
        assert_eq!(config.validation.require_resolvers_for_args, Some(ValidatorBehavior::Warn));
        assert!(!config.build.allow_undefined_in_resolve);
        let pruning = PruneOptions::from(config.pruning.as_ref().unwrap());
        assert!(pruning.skip_empty_union_pruning);
        assert!(!pruning.skip_unused_types_pruning);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = SchemaConfig::from_toml_str("[build]\nfrobnicate = true\n").unwrap_err();
        assert!(err.to_string().starts_with("Config error"), "got: {}", err);
        assert!(SchemaConfig::load(Path::new("/nonexistent/schemawire.toml")).is_err());
    }
}
