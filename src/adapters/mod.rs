// Copyright (c) 2025 - Cowboy AI, Inc.

//! Adapter implementations
//!
//! Concrete implementations of the [`TargetStore`](crate::store::TargetStore)
//! and [`InventorySource`](crate::inventory::InventorySource) traits.

#[cfg(feature = "netbox")]
pub mod netbox;

#[cfg(feature = "netbox")]
pub use netbox::NetBoxStore;

#[cfg(feature = "azure")]
pub mod azure;

#[cfg(feature = "azure")]
pub use azure::{ArmInventorySource, CredentialMode};

pub mod snapshot;

pub use snapshot::{SnapshotInventorySource, SubscriptionSnapshot};
