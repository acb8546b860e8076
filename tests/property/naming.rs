// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Name Normalization

use cim_netbox_sync::domain::naming::{normalize, slugify, with_suffix, DeviceName};
use proptest::prelude::*;

proptest! {
    /// Normalized names never exceed the limit
    #[test]
    fn prop_normalize_respects_max_length(raw in "\\PC{0,200}", max in 1usize..128) {
        prop_assert!(normalize(&raw, max).chars().count() <= max);
    }

    /// Normalization keeps only the part before the first dot
    #[test]
    fn prop_normalize_drops_domain(host in "[a-z0-9-]{1,40}", domain in "[a-z.]{0,30}") {
        let raw = format!("{}.{}", host, domain);
        let name = normalize(&raw, 64);
        prop_assert_eq!(&name, &host);
        prop_assert!(!name.contains('.'));
    }

    /// Normalizing twice changes nothing
    #[test]
    fn prop_normalize_is_idempotent(raw in "\\PC{0,100}", max in 1usize..80) {
        let once = normalize(&raw, max);
        prop_assert_eq!(normalize(&once, max), once.clone());
    }

    /// Suffixed names fit the limit and end with the suffix
    #[test]
    fn prop_suffix_fits(base in "[a-z]{1,100}", suffix in 1u32..10_000, max in 8usize..80) {
        let name = with_suffix(&base, suffix, max);
        let tail = format!("-{}", suffix);
        prop_assert!(name.chars().count() <= max);
        prop_assert!(name.ends_with(&tail));
    }

    /// Every disambiguation candidate is distinct from the others
    #[test]
    fn prop_candidates_are_distinct(raw in "[a-z]{1,70}", attempts in 2u32..50) {
        let name = DeviceName::new(&raw, 64).unwrap();
        let mut candidates: Vec<String> = (0..attempts).map(|n| name.candidate(n)).collect();
        candidates.sort();
        candidates.dedup();
        prop_assert_eq!(candidates.len(), attempts as usize);
    }

    /// Slugs only contain characters NetBox accepts
    #[test]
    fn prop_slug_charset(name in "\\PC{0,60}") {
        let slug = slugify(&name);
        prop_assert!(slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_'));
    }
}
