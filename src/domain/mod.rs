// Copyright (c) 2025 - Cowboy AI, Inc.
//! Sync Domain Models
//!
//! Value objects and discovered inventory shared by the topology builder,
//! the resolver and the inventory adapters.
//!
//! # Value Objects with Invariants
//!
//! - [`Cidr`] - Address range with containment checks
//! - [`MacAddress`] - 48-bit MAC address validation
//! - [`DeviceName`] - Normalized, length-bounded device name with suffix candidates
//!
//! # Discovered Inventory
//!
//! - [`Subscription`] - Inventory scope
//! - [`DiscoveredNetwork`] / [`DiscoveredSubnet`] - Address hierarchy
//! - [`DiscoveredEndpoint`] / [`DiscoveredHost`] - Attached devices

pub mod discovery;
pub mod naming;
pub mod network;

pub use discovery::{
    DeviceKind, DiscoveredEndpoint, DiscoveredHost, DiscoveredNetwork, DiscoveredSubnet,
    IpConfiguration, Subscription,
};
pub use naming::{normalize, slugify, DeviceName, NamingError, DEFAULT_MAX_NAME_LENGTH};
pub use network::{Cidr, MacAddress, NetworkError};
