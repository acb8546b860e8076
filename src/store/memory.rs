// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-Memory Target Store
//!
//! A [`TargetStore`] that keeps records in process and enforces natural-key
//! uniqueness the way NetBox does for the kinds we manage. Used for dry runs
//! and as the store under test.
//!
//! Records are held as JSON values in their serialized record shape, so
//! creating from a spec and applying a patch go through the same serde
//! paths a NetBox round-trip would.
//!
//! # Fault injection
//!
//! Tests can script store behavior per kind:
//!
//! - [`MemoryStore::fail_next_create`] - next create fails with a non-conflict error
//! - [`MemoryStore::race_next_create`] - a concurrent writer wins the next create
//! - [`MemoryStore::phantom_conflict`] - next create conflicts on a record nobody can see

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use tracing::debug;

use super::{Patch, RecordId, Resource, ResourceKind, StoreError, StoreResult, TargetStore};

#[derive(Debug, Clone)]
enum Fault {
    Fail(String),
    Race,
    Phantom,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: RecordId,
    tables: HashMap<ResourceKind, BTreeMap<RecordId, Value>>,
    faults: HashMap<ResourceKind, VecDeque<Fault>>,
    writes: usize,
}

impl MemoryState {
    fn allocate_id(&mut self) -> RecordId {
        self.next_id += 1;
        self.next_id
    }

    fn records<R: Resource>(&self) -> StoreResult<Vec<R>> {
        self.tables
            .get(&R::KIND)
            .map(|table| table.values().map(decode::<R>).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn find<R: Resource>(&self, key: &R::Key) -> StoreResult<Option<R>> {
        Ok(self
            .records::<R>()?
            .into_iter()
            .find(|record| record.key() == *key))
    }

    fn insert<R: Resource>(&mut self, spec: &R::Spec) -> StoreResult<R> {
        let id = self.allocate_id();
        let mut value = serde_json::to_value(spec).map_err(|e| decode_error::<R>(e))?;
        if let Value::Object(fields) = &mut value {
            fields.insert("id".to_string(), Value::from(id));
        }
        let record: R = decode(&value)?;
        let stored = serde_json::to_value(&record).map_err(|e| decode_error::<R>(e))?;
        self.tables.entry(R::KIND).or_default().insert(id, stored);
        self.writes += 1;
        Ok(record)
    }

    fn next_fault(&mut self, kind: ResourceKind) -> Option<Fault> {
        self.faults.get_mut(&kind).and_then(VecDeque::pop_front)
    }
}

fn decode<R: Resource>(value: &Value) -> StoreResult<R> {
    serde_json::from_value(value.clone()).map_err(|e| decode_error::<R>(e))
}

fn decode_error<R: Resource>(error: serde_json::Error) -> StoreError {
    StoreError::Decode {
        kind: R::KIND,
        message: error.to_string(),
    }
}

/// Merge `patch` into `target`, one level deep for nested objects
fn merge(target: &mut Value, patch: &Patch) {
    let Value::Object(fields) = target else {
        return;
    };
    for (name, value) in patch {
        match (fields.get_mut(name), value) {
            (Some(Value::Object(current)), Value::Object(update)) => {
                for (k, v) in update {
                    current.insert(k.clone(), v.clone());
                }
            }
            _ => {
                fields.insert(name.clone(), value.clone());
            }
        }
    }
}

/// In-process target store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> T {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// Insert a record directly, bypassing conflict checks and faults
    pub fn seed<R: Resource>(&self, spec: &R::Spec) -> StoreResult<R> {
        self.with_state(|state| state.insert::<R>(spec))
    }

    /// All records of kind `R`, in creation order
    pub fn records<R: Resource>(&self) -> Vec<R> {
        self.with_state(|state| state.records::<R>().unwrap_or_default())
    }

    /// Number of records of `kind`
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.with_state(|state| state.tables.get(&kind).map_or(0, BTreeMap::len))
    }

    /// Number of successful creates and updates so far
    pub fn writes(&self) -> usize {
        self.with_state(|state| state.writes)
    }

    /// Make the next create of `kind` fail with a non-conflict error
    pub fn fail_next_create(&self, kind: ResourceKind, message: impl Into<String>) {
        let fault = Fault::Fail(message.into());
        self.with_state(|state| state.faults.entry(kind).or_default().push_back(fault));
    }

    /// Make a concurrent writer win the next create of `kind`
    ///
    /// The record is stored exactly as requested, but the caller sees a
    /// conflict and must re-fetch it.
    pub fn race_next_create(&self, kind: ResourceKind) {
        self.with_state(|state| state.faults.entry(kind).or_default().push_back(Fault::Race));
    }

    /// Make the next create of `kind` conflict without any visible record
    pub fn phantom_conflict(&self, kind: ResourceKind) {
        self.with_state(|state| {
            state
                .faults
                .entry(kind)
                .or_default()
                .push_back(Fault::Phantom)
        });
    }
}

#[async_trait]
impl TargetStore for MemoryStore {
    async fn lookup<R: Resource>(&self, key: &R::Key) -> StoreResult<Option<R>> {
        self.with_state(|state| state.find::<R>(key))
    }

    async fn create<R: Resource>(&self, spec: &R::Spec) -> StoreResult<R> {
        let key = R::spec_key(spec);
        self.with_state(|state| {
            let conflict = || StoreError::Conflict {
                kind: R::KIND,
                key: key.to_string(),
            };

            match state.next_fault(R::KIND) {
                Some(Fault::Fail(message)) => {
                    return Err(StoreError::Rejected {
                        kind: R::KIND,
                        status: 500,
                        body: message,
                    })
                }
                Some(Fault::Race) => {
                    debug!("Concurrent writer creates {} '{}'", R::KIND, key);
                    state.insert::<R>(spec)?;
                    return Err(conflict());
                }
                Some(Fault::Phantom) => return Err(conflict()),
                None => {}
            }

            if state.find::<R>(&key)?.is_some() {
                return Err(conflict());
            }
            state.insert::<R>(spec)
        })
    }

    async fn update<R: Resource>(&self, id: RecordId, patch: &Patch) -> StoreResult<R> {
        self.with_state(|state| {
            let current = state
                .tables
                .get(&R::KIND)
                .and_then(|table| table.get(&id))
                .cloned()
                .ok_or(StoreError::NotFound { kind: R::KIND, id })?;

            let mut value = current;
            merge(&mut value, patch);
            let record: R = decode(&value)?;

            let key = record.key();
            let taken = state
                .records::<R>()?
                .iter()
                .any(|other| other.id() != id && other.key() == key);
            if taken {
                return Err(StoreError::Conflict {
                    kind: R::KIND,
                    key: key.to_string(),
                });
            }

            let stored = serde_json::to_value(&record).map_err(|e| decode_error::<R>(e))?;
            state.tables.entry(R::KIND).or_default().insert(id, stored);
            state.writes += 1;
            Ok(record)
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Tag, TagSpec};

    fn tag_spec(slug: &str) -> TagSpec {
        TagSpec {
            name: slug.to_string(),
            slug: slug.to_string(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn test_create_then_lookup() {
        let store = MemoryStore::new();
        let created = store.create::<Tag>(&tag_spec("azure-sync")).await.unwrap();

        let found: Option<Tag> = store.lookup::<Tag>(&"azure-sync".to_string()).await.unwrap();
        assert_eq!(found, Some(created));
        assert_eq!(store.count(ResourceKind::Tag), 1);
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let store = MemoryStore::new();
        store.create::<Tag>(&tag_spec("azure-sync")).await.unwrap();

        let err = store.create::<Tag>(&tag_spec("azure-sync")).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.count(ResourceKind::Tag), 1);
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let store = MemoryStore::new();
        let tag = store.create::<Tag>(&tag_spec("azure-sync")).await.unwrap();

        let mut patch = Patch::new();
        patch.insert("description".to_string(), Value::from("Synced from Azure"));
        let updated = store.update::<Tag>(tag.id, &patch).await.unwrap();

        assert_eq!(updated.id, tag.id);
        assert_eq!(updated.slug, "azure-sync");
        assert_eq!(updated.description, "Synced from Azure");
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let store = MemoryStore::new();
        let err = store.update::<Tag>(99, &Patch::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 99, .. }));
    }

    #[tokio::test]
    async fn test_race_leaves_record_behind() {
        let store = MemoryStore::new();
        store.race_next_create(ResourceKind::Tag);

        let err = store.create::<Tag>(&tag_spec("azure-sync")).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(store
            .lookup::<Tag>(&"azure-sync".to_string())
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_injected_failure_is_not_a_conflict() {
        let store = MemoryStore::new();
        store.fail_next_create(ResourceKind::Tag, "boom");

        let err = store.create::<Tag>(&tag_spec("azure-sync")).await.unwrap_err();
        assert!(!err.is_conflict());

        // Faults are one-shot
        store.create::<Tag>(&tag_spec("azure-sync")).await.unwrap();
    }
}
