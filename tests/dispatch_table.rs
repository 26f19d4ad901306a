//! Concurrent read-path tests for the finalized dispatch table
//!
//! The table is built once, before any reader exists, and never mutated
//! afterwards. These tests exercise the resulting guarantee: lookups from
//! many simultaneous readers return identical results regardless of
//! invocation order or interleaving, with no locking anywhere.

use std::sync::Arc;
use std::thread;

use bundle_operator::config::ServiceDefinition;
use bundle_operator::dispatch::{DispatchTable, DispatchTableBuilder};
use bundle_operator::spec::{Specification, REFERENCE_SPEC};

fn definition(kind: &str, plan: &str) -> ServiceDefinition {
    ServiceDefinition {
        api_version: "app.example.com/v1alpha1".to_string(),
        kind: kind.to_string(),
        image: "img/postgresql-apb".to_string(),
        plan: plan.to_string(),
    }
}

fn build_table() -> Arc<DispatchTable> {
    let mut builder = DispatchTableBuilder::new();
    for (kind, plan_name) in [("Postgresql", "dev"), ("Mediawiki", "prod")] {
        let mut spec: Specification = serde_yaml::from_str(REFERENCE_SPEC).expect("reference parses");
        spec.image = "img/postgresql-apb".to_string();
        let plan = spec.plan(plan_name).expect("plan present").clone();
        builder
            .insert(&definition(kind, plan_name), spec, plan)
            .expect("no collisions");
    }
    Arc::new(builder.build())
}

#[test]
fn concurrent_lookups_return_identical_results() {
    let table = build_table();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                for i in 0..250 {
                    // Vary the access order per worker and iteration.
                    let (first, second) = if (worker + i) % 2 == 0 {
                        ("Postgresql", "Mediawiki")
                    } else {
                        ("Mediawiki", "Postgresql")
                    };

                    let entry = table
                        .lookup("app.example.com/v1alpha1", first)
                        .expect("entry present");
                    assert_eq!(entry.spec.name, "postgresql-apb");

                    let other = table
                        .lookup("app.example.com/v1alpha1", second)
                        .expect("entry present");
                    assert_eq!(other.spec.name, "postgresql-apb");

                    assert!(table.lookup("app.example.com/v1alpha1", "Mysql").is_none());
                }

                let plan = table
                    .lookup("app.example.com/v1alpha1", "Postgresql")
                    .map(|entry| entry.plan.name.clone());
                (worker, plan)
            })
        })
        .collect();

    for handle in handles {
        let (_, plan) = handle.join().expect("reader thread panicked");
        assert_eq!(plan.as_deref(), Some("dev"));
    }
}

#[test]
fn table_observed_by_readers_matches_what_was_built() {
    let table = build_table();
    assert_eq!(table.len(), 2);

    let mut keys: Vec<_> = table.keys().map(str::to_string).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec![
            "app.example.com/v1alpha1:Mediawiki".to_string(),
            "app.example.com/v1alpha1:Postgresql".to_string(),
        ]
    );

    let prod = table.get("app.example.com/v1alpha1:Mediawiki").unwrap();
    assert_eq!(prod.plan.name, "prod");
    assert!(prod.plan.parameter("postgresql_volume_size").is_some());
}
