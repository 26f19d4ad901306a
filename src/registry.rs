//! Dynamic resource type registration
//!
//! The operator watches kinds it has no compiled representation for, so each
//! definition's (group, version, kind) triple is registered as a dynamically
//! decodable type: a [`kube::api::ApiResource`] that lets the watch runtime
//! decode instances as [`kube::api::DynamicObject`]. A watch can only be
//! established from a [`RegisteredType`], so registration always precedes the
//! watch that depends on it.

use kube::api::{ApiResource, GroupVersionKind};

use crate::config::ServiceDefinition;
use crate::{Error, Result};

/// Split an apiVersion into (group, version).
///
/// The identifier must contain exactly one `/` separating non-empty group and
/// version. Anything else is rejected outright rather than registering a
/// corrupt triple.
pub fn split_api_version(api_version: &str) -> Result<(String, String)> {
    let mut parts = api_version.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(group), Some(version), None) if !group.is_empty() && !version.is_empty() => {
            Ok((group.to_string(), version.to_string()))
        }
        _ => Err(Error::invalid_identifier(format!(
            "apiVersion {api_version:?} must have the format $GROUP/$VERSION"
        ))),
    }
}

/// A resource type registered for dynamic decoding
#[derive(Clone, Debug)]
pub struct RegisteredType {
    /// The (group, version, kind) triple identifying the resource type
    pub gvk: GroupVersionKind,
    /// Decode metadata for `DynamicObject` instances of the kind
    pub resource: ApiResource,
}

impl RegisteredType {
    /// The `group/version` identifier this type was registered under
    pub fn api_version(&self) -> String {
        format!("{}/{}", self.gvk.group, self.gvk.version)
    }
}

/// Registry of dynamically decodable resource types
#[derive(Debug, Default)]
pub struct TypeRegistry {
    registered: Vec<RegisteredType>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition's (group, version, kind) triple.
    ///
    /// Returns the registered type, the handle required to establish a watch
    /// for the kind. A malformed apiVersion leaves the registry untouched.
    pub fn register(&mut self, definition: &ServiceDefinition) -> Result<RegisteredType> {
        let (group, version) = split_api_version(&definition.api_version)?;
        let gvk = GroupVersionKind {
            group,
            version,
            kind: definition.kind.clone(),
        };
        let registered = RegisteredType {
            resource: ApiResource::from_gvk(&gvk),
            gvk,
        };
        self.registered.push(registered.clone());
        Ok(registered)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.registered.len()
    }

    /// Whether no types have been registered
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    /// Look up the registered type for an apiVersion/kind pair
    pub fn get(&self, api_version: &str, kind: &str) -> Option<&RegisteredType> {
        self.registered
            .iter()
            .find(|r| r.api_version() == api_version && r.gvk.kind == kind)
    }
}
