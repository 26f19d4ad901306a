//! Service definition resolution
//!
//! Definitions come from exactly one of two mutually exclusive sources: a YAML
//! config file holding a `bundles` sequence, or the four per-definition CLI
//! flags describing a single bundle. Partial configuration is never accepted;
//! any failure here is fatal before anything is registered or watched.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A single declarative service definition.
///
/// Names the custom resource kind to watch, the bundle image backing it, and
/// the provisioning plan to resolve against the bundle's specification.
/// Immutable once created.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ServiceDefinition {
    /// Kubernetes apiVersion in `$GROUP/$VERSION` format (e.g. `app.example.com/v1alpha1`)
    #[serde(rename = "api-version")]
    pub api_version: String,

    /// CustomResourceDefinition kind (e.g. `Postgresql`)
    pub kind: String,

    /// Bundle image reference from which the specification is fetched
    pub image: String,

    /// Plan the operator should resolve for this bundle
    pub plan: String,
}

/// Top-level shape of the config file
#[derive(Debug, Deserialize)]
struct ConfigDocument {
    bundles: Vec<ServiceDefinition>,
}

/// Per-definition flag values used when no config file is given
#[derive(Clone, Debug, Default)]
pub struct DefinitionFlags {
    /// `--api-version` flag value
    pub api_version: Option<String>,
    /// `--kind` flag value
    pub kind: Option<String>,
    /// `--apb-image` flag value
    pub image: Option<String>,
    /// `--plan` flag value
    pub plan: Option<String>,
}

/// Resolve the ordered definition list from file or flags.
///
/// A config file, when supplied, exclusively determines the list; the flag
/// values are only consulted otherwise.
pub fn resolve_definitions(
    config_file: Option<&Path>,
    flags: DefinitionFlags,
) -> Result<Vec<ServiceDefinition>> {
    match config_file {
        Some(path) => from_file(path),
        None => Ok(vec![from_flags(flags)?]),
    }
}

/// Load the `bundles` sequence from a YAML config file.
///
/// Entries decode structurally in document order, so the definition sequence
/// is deterministic across runs.
pub fn from_file(path: &Path) -> Result<Vec<ServiceDefinition>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("failed to read config file {}: {e}", path.display())))?;

    let document: ConfigDocument = serde_yaml::from_str(&content)
        .map_err(|e| Error::config(format!("failed to parse config file {}: {e}", path.display())))?;

    Ok(document.bundles)
}

/// Build exactly one definition from the individually-supplied flag values
pub fn from_flags(flags: DefinitionFlags) -> Result<ServiceDefinition> {
    let require = |value: Option<String>, flag: &str| {
        value
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::config(format!("--{flag} is required when no config file is given")))
    };

    Ok(ServiceDefinition {
        api_version: require(flags.api_version, "api-version")?,
        kind: require(flags.kind, "kind")?,
        image: require(flags.image, "apb-image")?,
        plan: require(flags.plan, "plan")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp config");
        file.write_all(content.as_bytes()).expect("write temp config");
        file
    }

    fn all_flags() -> DefinitionFlags {
        DefinitionFlags {
            api_version: Some("app.example.com/v1alpha1".to_string()),
            kind: Some("Postgresql".to_string()),
            image: Some("img/postgresql-apb".to_string()),
            plan: Some("dev".to_string()),
        }
    }

    #[test]
    fn file_with_two_entries_yields_two_definitions_in_order() {
        let file = write_config(
            r#"
bundles:
  - api-version: app.example.com/v1alpha1
    kind: Postgresql
    image: img/postgresql-apb
    plan: dev
  - api-version: app.example.com/v1alpha1
    kind: Mediawiki
    image: img/mediawiki-apb
    plan: prod
"#,
        );

        let definitions = from_file(file.path()).expect("valid config must resolve");
        assert_eq!(definitions.len(), 2);
        assert_eq!(
            definitions[0],
            ServiceDefinition {
                api_version: "app.example.com/v1alpha1".to_string(),
                kind: "Postgresql".to_string(),
                image: "img/postgresql-apb".to_string(),
                plan: "dev".to_string(),
            }
        );
        assert_eq!(definitions[1].kind, "Mediawiki");
        assert_eq!(definitions[1].plan, "prod");
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        let err = from_file(Path::new("/nonexistent/bundles.yaml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn unparsable_document_is_a_config_error() {
        let file = write_config("bundles: [not, closed");
        let err = from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn entry_missing_a_field_is_a_config_error() {
        let file = write_config(
            r#"
bundles:
  - api-version: app.example.com/v1alpha1
    kind: Postgresql
    image: img/postgresql-apb
"#,
        );
        let err = from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn document_without_bundles_collection_is_a_config_error() {
        let file = write_config("services: []");
        let err = from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn flags_build_exactly_one_definition() {
        let definitions = resolve_definitions(None, all_flags()).expect("flags must resolve");
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].api_version, "app.example.com/v1alpha1");
        assert_eq!(definitions[0].image, "img/postgresql-apb");
    }

    #[test]
    fn missing_flag_is_a_config_error() {
        let mut flags = all_flags();
        flags.plan = None;
        let err = from_flags(flags).unwrap_err();
        assert!(err.to_string().contains("--plan"));

        let mut flags = all_flags();
        flags.image = Some(String::new());
        assert!(from_flags(flags).is_err());
    }

    #[test]
    fn config_file_takes_precedence_over_flags() {
        let file = write_config(
            r#"
bundles:
  - api-version: db.example.com/v1
    kind: Mysql
    image: img/mysql-apb
    plan: prod
"#,
        );

        let definitions =
            resolve_definitions(Some(file.path()), all_flags()).expect("file must win");
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].kind, "Mysql");
    }
}
