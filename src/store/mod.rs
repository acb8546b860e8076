// Copyright (c) 2025 - Cowboy AI, Inc.
//! Target Store Abstraction
//!
//! The reconciler never talks HTTP directly. It works against
//! [`TargetStore`], a get-by-key / create / update capability set that is
//! generic over [`Resource`], one impl per NetBox record kind.
//!
//! # Outcomes
//!
//! Store calls distinguish the three outcomes the resolver branches on
//! without inspecting error text:
//!
//! - **Not found**: `lookup` returns `Ok(None)`
//! - **Conflict**: `create` returns [`StoreError::Conflict`] when the natural
//!   key is already taken
//! - **Failure**: every other [`StoreError`]
//!
//! # Implementations
//!
//! - [`NetBoxStore`](crate::adapters::NetBoxStore) - NetBox REST API
//! - [`MemoryStore`] - in-process store enforcing natural-key uniqueness

pub mod memory;
pub mod records;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use memory::MemoryStore;
pub use records::{
    Device, DeviceCustomFields, DeviceKey, DeviceRole, DeviceRoleSpec, DeviceSpec, DeviceType,
    DeviceTypeSpec, Interface, InterfaceKey, InterfaceSpec, IpAddress, IpAddressSpec,
    Manufacturer, ManufacturerSpec, Prefix, PrefixCustomFields, PrefixSpec, Site, SiteSpec, Tag,
    TagSpec,
};

/// Surrogate ID assigned by the target store
pub type RecordId = u64;

/// Partial update body: only the attributes that drifted
pub type Patch = serde_json::Map<String, serde_json::Value>;

/// Record kinds managed by the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Tag,
    Prefix,
    Manufacturer,
    DeviceType,
    DeviceRole,
    Site,
    Device,
    Interface,
    IpAddress,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Tag => "tag",
            ResourceKind::Prefix => "prefix",
            ResourceKind::Manufacturer => "manufacturer",
            ResourceKind::DeviceType => "device type",
            ResourceKind::DeviceRole => "device role",
            ResourceKind::Site => "site",
            ResourceKind::Device => "device",
            ResourceKind::Interface => "interface",
            ResourceKind::IpAddress => "IP address",
        };
        f.write_str(name)
    }
}

/// A NetBox record kind with a natural key
///
/// The record type doubles as the read model: it deserializes from NetBox
/// responses (nested objects and choice fields included). `Spec` is the
/// desired state, serialized as the create body.
pub trait Resource:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: ResourceKind;

    /// API path below `/api/`, without slashes (e.g. `dcim/devices`)
    const ENDPOINT: &'static str;

    type Key: Clone + fmt::Debug + fmt::Display + PartialEq + Send + Sync + 'static;
    type Spec: Clone + fmt::Debug + Serialize + Send + Sync + 'static;

    fn id(&self) -> RecordId;

    fn key(&self) -> Self::Key;

    fn spec_key(spec: &Self::Spec) -> Self::Key;

    /// Query parameters selecting the record with `key`
    fn key_filter(key: &Self::Key) -> Vec<(&'static str, String)>;

    /// Tracked attributes that differ from `spec`, or `None` when in sync
    fn drift(&self, spec: &Self::Spec) -> Option<Patch>;
}

/// Errors reported by a target store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The natural key is already taken
    #[error("{kind} '{key}' already exists")]
    Conflict { kind: ResourceKind, key: String },

    /// Update addressed a record that does not exist
    #[error("{kind} with id {id} not found")]
    NotFound { kind: ResourceKind, id: RecordId },

    /// The store refused the request
    #[error("{kind} request rejected with status {status}: {body}")]
    Rejected {
        kind: ResourceKind,
        status: u16,
        body: String,
    },

    /// Network or protocol failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body did not match the record shape
    #[error("Failed to decode {kind}: {message}")]
    Decode { kind: ResourceKind, message: String },

    /// The store cannot be reached or is misconfigured
    #[error("Target unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Get-by-key / create / update access to target records
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Find the record with natural key `key`
    async fn lookup<R: Resource>(&self, key: &R::Key) -> StoreResult<Option<R>>;

    /// Create a record from its desired state
    ///
    /// Returns [`StoreError::Conflict`] when the natural key already exists.
    async fn create<R: Resource>(&self, spec: &R::Spec) -> StoreResult<R>;

    /// Apply a partial update to record `id`
    async fn update<R: Resource>(&self, id: RecordId, patch: &Patch) -> StoreResult<R>;

    /// Prepare the store for a run (connectivity, custom fields)
    ///
    /// Should be idempotent - safe to call on every run.
    async fn initialize(&self) -> StoreResult<()> {
        self.health_check().await
    }

    /// Verify connectivity
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Get the name of this store
    fn name(&self) -> &str;
}
