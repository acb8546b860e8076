// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cloud network inventory to NetBox reconciliation
//!
//! Discovers virtual networks, subnets, network interfaces and virtual
//! machines from a cloud provider and makes NetBox mirror them: prefixes,
//! devices, interfaces and IP addresses are created on first sight and
//! updated in place afterwards. Nothing is ever deleted.
//!
//! # Layers
//!
//! - [`domain`] - Value objects and discovered inventory
//! - [`topology`] - Pure network → subnet → device tree building
//! - [`store`] - Target store abstraction and NetBox record kinds
//! - [`reconcile`] - Entity resolver and reconciliation driver
//! - [`inventory`] - Inventory source abstraction
//! - [`adapters`] - NetBox, Azure Resource Manager and snapshot adapters

pub mod adapters;
pub mod config;
pub mod domain;
pub mod errors;
pub mod inventory;
pub mod reconcile;
pub mod store;
pub mod topology;

// Re-export commonly used types
pub use config::{ConflictRetry, NetBoxConfig, SyncSettings};
pub use errors::{SyncError, SyncResult};
pub use inventory::{discover, InventoryError, InventorySource};
pub use reconcile::{Outcome, Reconciler, Resolved, Resolver, SyncReport};
pub use store::{MemoryStore, StoreError, TargetStore};
pub use topology::{build_topology, Topology};
