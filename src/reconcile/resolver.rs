// Copyright (c) 2025 - Cowboy AI, Inc.
//! Entity Resolver
//!
//! Idempotent get-or-create/update of one record against a [`TargetStore`]:
//!
//! 1. Look the record up by natural key
//! 2. Found: patch the tracked attributes that drifted
//! 3. Not found: create it
//! 4. Create conflicted: another writer got there first, so re-fetch with
//!    bounded backoff and continue as in 2
//!
//! Devices add a disambiguation loop on top: when `(name, site)` is held by a
//! record mirroring a different cloud resource, the name is retried with
//! `-1`, `-2`, ... suffixes up to a configured cap.

use tracing::{debug, info, warn};

use crate::config::{ConflictRetry, SyncSettings};
use crate::domain::DeviceName;
use crate::errors::{SyncError, SyncResult};
use crate::store::{Device, DeviceSpec, Resource, TargetStore};

/// What resolving a record did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
}

/// A resolved record and how it was obtained
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<R> {
    pub record: R,
    pub outcome: Outcome,
}

impl<R> Resolved<R> {
    pub fn was_created(&self) -> bool {
        self.outcome == Outcome::Created
    }
}

/// Resolves desired records against a target store
pub struct Resolver<'a, S: ?Sized> {
    store: &'a S,
    retry: ConflictRetry,
    max_disambiguation_attempts: u32,
}

impl<'a, S> Resolver<'a, S>
where
    S: TargetStore + ?Sized,
{
    pub fn new(store: &'a S, settings: &SyncSettings) -> Self {
        Self {
            store,
            retry: settings.conflict_retry,
            max_disambiguation_attempts: settings.max_disambiguation_attempts,
        }
    }

    /// Get-or-create `spec`, updating drifted attributes of an existing record
    pub async fn resolve<R: Resource>(&self, spec: &R::Spec) -> SyncResult<Resolved<R>> {
        let key = R::spec_key(spec);

        if let Some(existing) = self.lookup::<R>(&key).await? {
            return self.reconcile(existing, spec).await;
        }

        match self.store.create::<R>(spec).await {
            Ok(record) => {
                info!("Created {}: {}", R::KIND, key);
                Ok(Resolved {
                    record,
                    outcome: Outcome::Created,
                })
            }
            Err(e) if e.is_conflict() => {
                debug!("{} {} created concurrently, re-fetching", R::KIND, key);
                let existing = self.refetch::<R>(&key).await?;
                self.reconcile(existing, spec).await
            }
            Err(e) => Err(SyncError::store(R::KIND, &key, e)),
        }
    }

    /// Resolve a device, disambiguating its name on collision
    ///
    /// `template` carries everything but the name and resource ID. A record
    /// already holding a candidate name is reused when it mirrors
    /// `resource_id` (or mirrors nothing yet); otherwise the next suffix is
    /// tried.
    pub async fn resolve_device(
        &self,
        name: &DeviceName,
        template: &DeviceSpec,
        resource_id: &str,
    ) -> SyncResult<Resolved<Device>> {
        for attempt in 0..=self.max_disambiguation_attempts {
            let mut spec = template.clone();
            spec.name = name.candidate(attempt);
            spec.custom_fields.cloud_resource_id = Some(resource_id.to_string());
            let key = Device::spec_key(&spec);

            if let Some(existing) = self.lookup::<Device>(&key).await? {
                if existing.belongs_to(resource_id) {
                    return self.reconcile(existing, &spec).await;
                }
                warn!(
                    "Device name {} already used by another resource, trying next suffix",
                    key
                );
                continue;
            }

            match self.store.create::<Device>(&spec).await {
                Ok(record) => {
                    if attempt > 0 {
                        info!("Created device: {} (renamed from {})", key, name.base());
                    } else {
                        info!("Created device: {}", key);
                    }
                    return Ok(Resolved {
                        record,
                        outcome: Outcome::Created,
                    });
                }
                Err(e) if e.is_conflict() => {
                    let existing = self.refetch::<Device>(&key).await?;
                    if existing.belongs_to(resource_id) {
                        return self.reconcile(existing, &spec).await;
                    }
                    warn!(
                        "Device name {} taken concurrently by another resource, trying next suffix",
                        key
                    );
                }
                Err(e) => return Err(SyncError::store(Device::KIND, &key, e)),
            }
        }

        Err(SyncError::DisambiguationExhausted {
            base: name.base().to_string(),
            site: template.site,
            attempts: self.max_disambiguation_attempts,
        })
    }

    async fn lookup<R: Resource>(&self, key: &R::Key) -> SyncResult<Option<R>> {
        self.store
            .lookup::<R>(key)
            .await
            .map_err(|e| SyncError::store(R::KIND, key, e))
    }

    /// Re-fetch a record whose creation conflicted
    async fn refetch<R: Resource>(&self, key: &R::Key) -> SyncResult<R> {
        let attempts = self.retry.attempts.max(1);
        for attempt in 0..attempts {
            let delay = self.retry.delay(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if let Some(record) = self.lookup::<R>(key).await? {
                return Ok(record);
            }
            debug!(
                "{} {} not visible yet (lookup {}/{})",
                R::KIND,
                key,
                attempt + 1,
                attempts
            );
        }

        Err(SyncError::ConflictUnresolved {
            kind: R::KIND,
            key: key.to_string(),
            attempts,
        })
    }

    /// Bring an existing record in line with `spec`
    async fn reconcile<R: Resource>(&self, existing: R, spec: &R::Spec) -> SyncResult<Resolved<R>> {
        let key = existing.key();
        match existing.drift(spec) {
            None => {
                debug!("Found existing {}: {}", R::KIND, key);
                Ok(Resolved {
                    record: existing,
                    outcome: Outcome::Unchanged,
                })
            }
            Some(patch) => {
                let fields: Vec<&str> = patch.keys().map(String::as_str).collect();
                let record = self
                    .store
                    .update::<R>(existing.id(), &patch)
                    .await
                    .map_err(|e| SyncError::store(R::KIND, &key, e))?;
                info!("Updated {}: {} ({})", R::KIND, key, fields.join(", "));
                Ok(Resolved {
                    record,
                    outcome: Outcome::Updated,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{
        DeviceCustomFields, MemoryStore, Prefix, PrefixCustomFields, PrefixSpec, ResourceKind,
        Site, SiteSpec, Tag, TagSpec,
    };
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn settings() -> SyncSettings {
        SyncSettings {
            conflict_retry: ConflictRetry {
                attempts: 3,
                base_delay: Duration::from_millis(1),
            },
            max_disambiguation_attempts: 3,
            ..SyncSettings::default()
        }
    }

    fn tag_spec() -> TagSpec {
        SyncSettings::default().tag.spec()
    }

    fn site_spec(description: &str) -> SiteSpec {
        SiteSpec {
            name: "Azure-eastus".to_string(),
            slug: "azure-eastus".to_string(),
            status: "active".to_string(),
            description: description.to_string(),
            tags: vec![1],
        }
    }

    fn prefix_spec(prefix: &str) -> PrefixSpec {
        PrefixSpec {
            prefix: prefix.to_string(),
            status: "active".to_string(),
            description: "Azure VNet: core (Subscription: s1)".to_string(),
            tags: vec![1],
            custom_fields: PrefixCustomFields::default(),
        }
    }

    fn device_template(site: u64) -> DeviceSpec {
        DeviceSpec {
            name: String::new(),
            device_type: 1,
            role: 2,
            site,
            status: "active".to_string(),
            tags: vec![1],
            custom_fields: DeviceCustomFields::default(),
        }
    }

    #[tokio::test]
    async fn test_second_resolve_is_unchanged() {
        let store = MemoryStore::new();
        let settings = settings();
        let resolver = Resolver::new(&store, &settings);

        let first = resolver.resolve::<Tag>(&tag_spec()).await.unwrap();
        let second = resolver.resolve::<Tag>(&tag_spec()).await.unwrap();

        assert!(first.was_created());
        assert_eq!(second.outcome, Outcome::Unchanged);
        assert_eq!(first.record.id, second.record.id);
        assert_eq!(store.count(ResourceKind::Tag), 1);
    }

    #[tokio::test]
    async fn test_changed_attributes_update_in_place() {
        let store = MemoryStore::new();
        let settings = settings();
        let resolver = Resolver::new(&store, &settings);

        let first = resolver
            .resolve::<Site>(&site_spec("Azure Region: eastus"))
            .await
            .unwrap();
        let second = resolver
            .resolve::<Site>(&site_spec("Azure Region: East US"))
            .await
            .unwrap();

        assert_eq!(second.outcome, Outcome::Updated);
        assert_eq!(second.record.id, first.record.id);
        assert_eq!(second.record.description, "Azure Region: East US");
        assert_eq!(store.count(ResourceKind::Site), 1);
    }

    #[tokio::test]
    async fn test_create_race_recovers_existing_record() {
        let store = MemoryStore::new();
        let settings = settings();
        let resolver = Resolver::new(&store, &settings);
        store.race_next_create(ResourceKind::Prefix);

        let resolved = resolver
            .resolve::<Prefix>(&prefix_spec("10.0.0.0/16"))
            .await
            .unwrap();

        assert_eq!(resolved.outcome, Outcome::Unchanged);
        assert_eq!(resolved.record.prefix, "10.0.0.0/16");
        assert_eq!(store.count(ResourceKind::Prefix), 1);
    }

    #[tokio::test]
    async fn test_unresolvable_conflict_is_reported() {
        let store = MemoryStore::new();
        let settings = settings();
        let resolver = Resolver::new(&store, &settings);
        store.phantom_conflict(ResourceKind::Prefix);

        let err = resolver
            .resolve::<Prefix>(&prefix_spec("10.0.0.0/16"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::ConflictUnresolved { attempts: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_other_create_failures_propagate() {
        let store = MemoryStore::new();
        let settings = settings();
        let resolver = Resolver::new(&store, &settings);
        store.fail_next_create(ResourceKind::Tag, "database is down");

        let err = resolver.resolve::<Tag>(&tag_spec()).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Store {
                kind: ResourceKind::Tag,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_device_collisions_get_numeric_suffixes() {
        let store = MemoryStore::new();
        let settings = settings();
        let resolver = Resolver::new(&store, &settings);
        let name = DeviceName::new("vm-a", 64).unwrap();
        let template = device_template(7);

        let first = resolver
            .resolve_device(&name, &template, "/vms/one")
            .await
            .unwrap();
        let second = resolver
            .resolve_device(&name, &template, "/vms/two")
            .await
            .unwrap();
        let third = resolver
            .resolve_device(&name, &template, "/vms/three")
            .await
            .unwrap();

        assert_eq!(first.record.name.as_deref(), Some("vm-a"));
        assert_eq!(second.record.name.as_deref(), Some("vm-a-1"));
        assert_eq!(third.record.name.as_deref(), Some("vm-a-2"));
        assert_eq!(store.count(ResourceKind::Device), 3);
    }

    #[tokio::test]
    async fn test_device_rerun_finds_its_suffixed_record() {
        let store = MemoryStore::new();
        let settings = settings();
        let resolver = Resolver::new(&store, &settings);
        let name = DeviceName::new("vm-a", 64).unwrap();
        let template = device_template(7);

        resolver
            .resolve_device(&name, &template, "/vms/one")
            .await
            .unwrap();
        let created = resolver
            .resolve_device(&name, &template, "/vms/two")
            .await
            .unwrap();
        let again = resolver
            .resolve_device(&name, &template, "/vms/two")
            .await
            .unwrap();

        assert_eq!(again.outcome, Outcome::Unchanged);
        assert_eq!(again.record.id, created.record.id);
        assert_eq!(store.count(ResourceKind::Device), 2);
    }

    #[tokio::test]
    async fn test_same_name_on_another_site_is_not_a_collision() {
        let store = MemoryStore::new();
        let settings = settings();
        let resolver = Resolver::new(&store, &settings);
        let name = DeviceName::new("vm-a", 64).unwrap();

        resolver
            .resolve_device(&name, &device_template(7), "/vms/one")
            .await
            .unwrap();
        let other = resolver
            .resolve_device(&name, &device_template(8), "/vms/two")
            .await
            .unwrap();

        assert_eq!(other.record.name.as_deref(), Some("vm-a"));
    }

    #[tokio::test]
    async fn test_unstamped_device_is_adopted() {
        let store = MemoryStore::new();
        let settings = settings();
        let resolver = Resolver::new(&store, &settings);
        let mut legacy = device_template(7);
        legacy.name = "vm-a".to_string();
        let seeded = store.seed::<Device>(&legacy).unwrap();

        let resolved = resolver
            .resolve_device(&DeviceName::new("vm-a", 64).unwrap(), &device_template(7), "/vms/one")
            .await
            .unwrap();

        assert_eq!(resolved.outcome, Outcome::Updated);
        assert_eq!(resolved.record.id, seeded.id);
        assert_eq!(
            resolved.record.custom_fields.cloud_resource_id.as_deref(),
            Some("/vms/one")
        );
    }

    #[tokio::test]
    async fn test_suffixed_name_respects_length_limit() {
        let store = MemoryStore::new();
        let settings = settings();
        let resolver = Resolver::new(&store, &settings);
        let name = DeviceName::new(&"x".repeat(100), 64).unwrap();
        let template = device_template(7);

        resolver
            .resolve_device(&name, &template, "/vms/one")
            .await
            .unwrap();
        let second = resolver
            .resolve_device(&name, &template, "/vms/two")
            .await
            .unwrap();

        let renamed = second.record.name.unwrap();
        assert_eq!(renamed.chars().count(), 64);
        assert!(renamed.ends_with("-1"));
    }

    #[tokio::test]
    async fn test_disambiguation_is_capped() {
        let store = MemoryStore::new();
        let settings = settings();
        let resolver = Resolver::new(&store, &settings);
        let name = DeviceName::new("vm-a", 64).unwrap();
        let template = device_template(7);

        // base name plus three suffixes fill the cap
        for n in 0..4 {
            resolver
                .resolve_device(&name, &template, &format!("/vms/{}", n))
                .await
                .unwrap();
        }

        let err = resolver
            .resolve_device(&name, &template, "/vms/overflow")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::DisambiguationExhausted {
                site: 7,
                attempts: 3,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_device_race_recovers_own_record() {
        let store = MemoryStore::new();
        let settings = settings();
        let resolver = Resolver::new(&store, &settings);
        let name = DeviceName::new("vm-a", 64).unwrap();

        // A concurrent run creates the same device first
        store.race_next_create(ResourceKind::Device);
        let resolved = resolver
            .resolve_device(&name, &device_template(7), "/vms/one")
            .await
            .unwrap();

        assert_eq!(resolved.outcome, Outcome::Unchanged);
        assert_eq!(resolved.record.name.as_deref(), Some("vm-a"));
        assert_eq!(store.count(ResourceKind::Device), 1);
    }
}
