//! Bundle specification fetching, parsing, and plan validation
//!
//! A bundle image carries a versioned YAML specification document describing
//! the service it provisions and the plans it offers. The resolver obtains the
//! document through a [`SpecFetcher`], parses it, stamps it with the image it
//! came from plus the runtime marker, and validates that the requested plan
//! actually exists. A missing plan aborts the entire startup: the operator
//! must not partially start and silently omit coverage of a declared kind.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use crate::config::ServiceDefinition;
use crate::{Error, Result};

/// Runtime version stamped on every parsed specification
pub const SPEC_RUNTIME_VERSION: u32 = 2;

/// A parsed bundle specification
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Specification {
    /// Schema version of the specification document
    pub version: String,

    /// Bundle name (e.g. `postgresql-apb`)
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,

    /// Whether provisioned instances can be bound to
    #[serde(default)]
    pub bindable: bool,

    /// Async provisioning mode declared by the bundle (`optional`, `required`, `unsupported`)
    #[serde(rename = "async", default)]
    pub async_mode: Option<String>,

    /// Classification tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Free-form bundle metadata
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_yaml::Value>,

    /// Provisioning plans, in document order
    #[serde(default)]
    pub plans: Vec<Plan>,

    /// Image reference the specification was resolved from; stamped after parse
    #[serde(default)]
    pub image: String,

    /// Bundle runtime version marker; stamped after parse
    #[serde(default)]
    pub runtime: u32,
}

impl Specification {
    /// Linear-search the plans for an exact, case-sensitive name match
    pub fn plan(&self, name: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.name == name)
    }
}

/// A named, parameterized provisioning profile within a specification
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Plan {
    /// Plan name, matched exactly against a definition's requested plan
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,

    /// Whether the plan is free of charge
    #[serde(default)]
    pub free: bool,

    /// Free-form plan metadata
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_yaml::Value>,

    /// Parameter descriptors, in document order
    #[serde(default)]
    pub parameters: Vec<Parameter>,

    /// Plans this plan can be updated to
    #[serde(default)]
    pub updates_to: Vec<String>,
}

impl Plan {
    /// Look up a parameter descriptor by name
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// A single plan parameter descriptor
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Parameter {
    /// Parameter name
    pub name: String,

    /// Declared parameter type (`string`, `enum`, ...)
    #[serde(rename = "type", default)]
    pub type_: String,

    /// Display title
    #[serde(default)]
    pub title: Option<String>,

    /// Default value, if any
    #[serde(default)]
    pub default: Option<serde_yaml::Value>,

    /// Whether the parameter must be supplied
    #[serde(default)]
    pub required: bool,

    /// Validation pattern for the value
    #[serde(default)]
    pub pattern: Option<String>,

    /// Allowed values for enum-typed parameters
    #[serde(rename = "enum", default)]
    pub enum_values: Vec<String>,

    /// Maximum value length
    #[serde(rename = "maxlength", default)]
    pub max_length: Option<u32>,

    /// Display hint for UIs (e.g. `password`)
    #[serde(default)]
    pub display_type: Option<String>,

    /// Whether the value may change on plan update
    #[serde(default)]
    pub updatable: bool,
}

/// Trait abstracting retrieval of bundle specification documents
///
/// The registry that serves bundle images is an external collaborator; this
/// seam lets tests substitute documents and lets the binary swap in a real
/// registry client. No retry or timeout is applied: a stalled fetch stalls
/// startup.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpecFetcher: Send + Sync {
    /// Fetch the raw specification document for a bundle image
    async fn fetch(&self, image: &str) -> Result<String>;
}

/// Fetcher serving the bundled reference specification for every image.
///
/// Stands in for the registry client in development deployments.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbeddedSpecFetcher;

#[async_trait]
impl SpecFetcher for EmbeddedSpecFetcher {
    async fn fetch(&self, _image: &str) -> Result<String> {
        Ok(REFERENCE_SPEC.to_string())
    }
}

/// Resolve a definition into its specification and validated plan.
///
/// Fetches and parses the bundle's specification document, stamps provenance
/// (image reference and runtime marker), then validates that the requested
/// plan exists. The returned pair is what the dispatch table routes to.
pub async fn resolve_spec(
    fetcher: &dyn SpecFetcher,
    definition: &ServiceDefinition,
) -> Result<(Specification, Plan)> {
    let document = fetcher.fetch(&definition.image).await?;

    let mut spec: Specification = serde_yaml::from_str(&document).map_err(|e| {
        Error::serialization(format!(
            "failed to parse specification for image {}: {e}",
            definition.image
        ))
    })?;
    spec.image = definition.image.clone();
    spec.runtime = SPEC_RUNTIME_VERSION;

    let plan = spec
        .plan(&definition.plan)
        .cloned()
        .ok_or_else(|| Error::PlanNotFound {
            plan: definition.plan.clone(),
            spec: spec.name.clone(),
        })?;

    Ok((spec, plan))
}

/// Reference bundle specification served by [`EmbeddedSpecFetcher`]
pub const REFERENCE_SPEC: &str = r#"
version: "1.0"
name: postgresql-apb
description: SCL PostgreSQL apb implementation
bindable: true
async: optional
tags:
  - database
  - postgresql
metadata:
  documentationUrl: https://www.postgresql.org/docs/
  longDescription: An apb that deploys postgresql 9.4, 9.5, or 9.6.
  displayName: PostgreSQL (APB)
  providerDisplayName: "Red Hat, Inc."
plans:
  - name: dev
    description: A single DB server with no storage
    free: true
    metadata:
      displayName: Development
      cost: $0.00
    parameters:
      - name: postgresql_database
        default: admin
        type: string
        title: PostgreSQL Database Name
        pattern: "^[a-zA-Z_][a-zA-Z0-9_]*$"
        required: true
      - name: postgresql_user
        default: admin
        title: PostgreSQL User
        type: string
        maxlength: 63
        pattern: "^[a-zA-Z_][a-zA-Z0-9_]*$"
        required: true
      - name: postgresql_password
        type: string
        title: PostgreSQL Password
        display_type: password
        pattern: "^[a-zA-Z0-9_~!@#$%^&*()-=<>,.?;:|]+$"
        required: true
      - name: postgresql_version
        default: "9.6"
        enum: ["9.6", "9.5", "9.4"]
        type: enum
        title: PostgreSQL Version
        required: true
        updatable: true
    updates_to:
      - prod
  - name: prod
    description: A single DB server with persistent storage
    free: true
    metadata:
      displayName: Production
      cost: $0.00
    parameters:
      - name: postgresql_database
        default: admin
        type: string
        title: PostgreSQL Database Name
        pattern: "^[a-zA-Z_][a-zA-Z0-9_]*$"
        required: true
      - name: postgresql_user
        default: admin
        title: PostgreSQL User
        type: string
        maxlength: 63
        pattern: "^[a-zA-Z_][a-zA-Z0-9_]*$"
        required: true
      - name: postgresql_password
        type: string
        title: PostgreSQL Password
        display_type: password
        pattern: "^[a-zA-Z0-9_~!@#$%^&*()-=<>,.?;:|]+$"
        required: true
      - name: postgresql_version
        default: "9.6"
        enum: ["9.6", "9.5", "9.4"]
        type: enum
        title: PostgreSQL Version
        required: true
        updatable: true
      - name: postgresql_volume_size
        type: enum
        default: 1Gi
        enum: ["1Gi", "5Gi", "10Gi"]
        title: PostgreSQL Volume Size
        required: true
    updates_to:
      - dev
"#;
