//! Immutable dispatch table keyed by resource identity
//!
//! The table maps `apiVersion:kind` to the resolved specification+plan pair
//! for that kind. It is built exactly once during startup by a single thread;
//! after [`DispatchTableBuilder::build`] it is read-only, so concurrent
//! lookups from reconcile callbacks need no locking.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::config::ServiceDefinition;
use crate::spec::{Plan, Specification};
use crate::{Error, Result};

/// Compose the dispatch key for an apiVersion/kind pair
pub fn dispatch_key(api_version: &str, kind: &str) -> String {
    format!("{api_version}:{kind}")
}

/// The resolved specification+plan pair for one resource identity
#[derive(Clone, Debug, PartialEq)]
pub struct DispatchEntry {
    /// The resolved bundle specification
    pub spec: Specification,
    /// The validated plan within that specification
    pub plan: Plan,
}

/// Builder folding resolved definitions into a dispatch table.
///
/// Key collisions are rejected: two definitions resolving to the same
/// `apiVersion:kind` is a configuration fault, never a silent overwrite.
#[derive(Debug, Default)]
pub struct DispatchTableBuilder {
    entries: HashMap<String, DispatchEntry>,
}

impl DispatchTableBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the resolved pair for a definition.
    ///
    /// Fails with [`Error::DuplicateKey`] if the definition's identity is
    /// already present, leaving the existing entry untouched.
    pub fn insert(
        &mut self,
        definition: &ServiceDefinition,
        spec: Specification,
        plan: Plan,
    ) -> Result<()> {
        let key = dispatch_key(&definition.api_version, &definition.kind);
        match self.entries.entry(key) {
            Entry::Occupied(occupied) => Err(Error::DuplicateKey(occupied.key().clone())),
            Entry::Vacant(vacant) => {
                vacant.insert(DispatchEntry { spec, plan });
                Ok(())
            }
        }
    }

    /// Number of entries inserted so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries have been inserted
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finalize the table. No further writes are possible afterwards.
    pub fn build(self) -> DispatchTable {
        DispatchTable {
            entries: self.entries,
        }
    }
}

/// Read-only mapping from resource identity to its resolved pair
#[derive(Debug)]
pub struct DispatchTable {
    entries: HashMap<String, DispatchEntry>,
}

impl DispatchTable {
    /// Look up the entry for an apiVersion/kind pair
    pub fn lookup(&self, api_version: &str, kind: &str) -> Option<&DispatchEntry> {
        self.entries.get(&dispatch_key(api_version, kind))
    }

    /// Look up the entry for a precomposed dispatch key
    pub fn get(&self, key: &str) -> Option<&DispatchEntry> {
        self.entries.get(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the dispatch keys
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{EmbeddedSpecFetcher, resolve_spec};

    fn definition(kind: &str, plan: &str) -> ServiceDefinition {
        ServiceDefinition {
            api_version: "app.example.com/v1alpha1".to_string(),
            kind: kind.to_string(),
            image: "img/postgresql-apb".to_string(),
            plan: plan.to_string(),
        }
    }

    async fn resolved(kind: &str, plan: &str) -> (ServiceDefinition, Specification, Plan) {
        let def = definition(kind, plan);
        let (spec, plan) = resolve_spec(&EmbeddedSpecFetcher, &def).await.unwrap();
        (def, spec, plan)
    }

    #[test]
    fn keys_compose_api_version_and_kind() {
        assert_eq!(
            dispatch_key("app.example.com/v1alpha1", "Postgresql"),
            "app.example.com/v1alpha1:Postgresql"
        );
    }

    #[tokio::test]
    async fn built_table_routes_identity_to_resolved_pair() {
        let mut builder = DispatchTableBuilder::new();
        let (def, spec, plan) = resolved("Postgresql", "dev").await;
        builder.insert(&def, spec, plan).unwrap();

        let table = builder.build();
        assert_eq!(table.len(), 1);

        let entry = table
            .lookup("app.example.com/v1alpha1", "Postgresql")
            .expect("entry present");
        assert_eq!(entry.spec.name, "postgresql-apb");
        assert_eq!(entry.plan.name, "dev");
        assert_eq!(
            table.get("app.example.com/v1alpha1:Postgresql").unwrap(),
            entry
        );
        assert!(table.lookup("app.example.com/v1alpha1", "Mysql").is_none());
    }

    #[tokio::test]
    async fn duplicate_key_is_rejected_and_first_entry_kept() {
        let mut builder = DispatchTableBuilder::new();
        let (def, spec, plan) = resolved("Postgresql", "dev").await;
        builder.insert(&def, spec, plan).unwrap();

        // Same identity, different plan: must fail the same way every run.
        let (def2, spec2, plan2) = resolved("Postgresql", "prod").await;
        let err = builder.insert(&def2, spec2, plan2).unwrap_err();
        match err {
            Error::DuplicateKey(key) => assert_eq!(key, "app.example.com/v1alpha1:Postgresql"),
            other => panic!("expected DuplicateKey, got {other:?}"),
        }

        let table = builder.build();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table
                .lookup("app.example.com/v1alpha1", "Postgresql")
                .unwrap()
                .plan
                .name,
            "dev"
        );
    }

    #[tokio::test]
    async fn distinct_kinds_do_not_collide() {
        let mut builder = DispatchTableBuilder::new();
        let (def_a, spec_a, plan_a) = resolved("Postgresql", "dev").await;
        let (def_b, spec_b, plan_b) = resolved("Mediawiki", "prod").await;
        builder.insert(&def_a, spec_a, plan_a).unwrap();
        builder.insert(&def_b, spec_b, plan_b).unwrap();

        let table = builder.build();
        assert_eq!(table.len(), 2);
        let mut keys: Vec<_> = table.keys().collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "app.example.com/v1alpha1:Mediawiki",
                "app.example.com/v1alpha1:Postgresql"
            ]
        );
    }
}
