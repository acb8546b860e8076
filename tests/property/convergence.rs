// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Reconciliation Convergence
//!
//! For arbitrary sets of colliding device names, one run yields one device
//! per discovered resource with unique names, and a second run writes
//! nothing.

use std::collections::HashSet;

use cim_netbox_sync::store::{Device, ResourceKind};
use cim_netbox_sync::{MemoryStore, Reconciler};
use proptest::prelude::*;

use crate::fixtures::{nic, scenario, settings, LOCATION};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_rerun_converges(names in prop::collection::vec("[a-c]{1,2}(\\.corp)?", 1..12)) {
        let endpoints: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut endpoint = nic(
                    name,
                    &format!("10.0.1.{}", i + 10),
                    LOCATION,
                    &format!("AA:BB:CC:DD:EE:{:02X}", i),
                    None,
                );
                // Distinct resources even when names repeat
                endpoint.id = format!("/networkInterfaces/{}", i);
                endpoint
            })
            .collect();
        let topology = scenario(&endpoints, &[]);
        let reconciler = Reconciler::new(MemoryStore::new(), settings());

        let first = tokio_test::block_on(reconciler.run(&[topology.clone()])).unwrap();
        prop_assert!(!first.has_failures());
        prop_assert_eq!(reconciler.store().count(ResourceKind::Device), names.len());

        let device_names: HashSet<_> = reconciler
            .store()
            .records::<Device>()
            .into_iter()
            .filter_map(|d| d.name)
            .collect();
        prop_assert_eq!(device_names.len(), names.len());

        let writes = reconciler.store().writes();
        let second = tokio_test::block_on(reconciler.run(&[topology])).unwrap();
        prop_assert_eq!(second.created(), 0);
        prop_assert_eq!(second.updated(), 0);
        prop_assert_eq!(reconciler.store().writes(), writes);
    }
}
