// Copyright (c) 2025 - Cowboy AI, Inc.
//! Inventory Source
//!
//! Read access to discovered cloud inventory. Implementations:
//!
//! - [`ArmInventorySource`](crate::adapters::ArmInventorySource) - Azure Resource Manager REST API
//! - [`SnapshotInventorySource`](crate::adapters::SnapshotInventorySource) - JSON inventory snapshot
//!
//! [`discover`] enumerates the selected scopes and builds one [`Topology`]
//! per subscription before any target-store write happens.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{DiscoveredEndpoint, DiscoveredHost, DiscoveredNetwork, Subscription};
use crate::topology::{build_topology, Topology};

/// Errors raised while enumerating inventory
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Could not obtain credentials for the provider
    #[error("Credential error: {0}")]
    Credential(String),

    /// Network or HTTP failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider returned a non-success status
    #[error("Request to {url} failed with status {status}: {body}")]
    Status { url: String, status: u16, body: String },

    /// Response or snapshot did not match the expected shape
    #[error("Failed to decode {what}: {message}")]
    Decode { what: String, message: String },

    /// Requested scope is not known to the source
    #[error("Unknown subscription: {0}")]
    UnknownScope(String),

    /// Snapshot file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for inventory operations
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Read-only access to discovered inventory
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// All scopes visible to the credentials
    async fn list_scopes(&self) -> InventoryResult<Vec<Subscription>>;

    /// Virtual networks with their address ranges and subnets
    async fn list_networks(&self, scope: &Subscription) -> InventoryResult<Vec<DiscoveredNetwork>>;

    /// Network endpoints with their IP configurations
    async fn list_endpoints(&self, scope: &Subscription)
        -> InventoryResult<Vec<DiscoveredEndpoint>>;

    /// Hosts endpoints may be attached to
    async fn list_hosts(&self, scope: &Subscription) -> InventoryResult<Vec<DiscoveredHost>>;

    /// Get the name of this source
    fn name(&self) -> &str;
}

/// Enumerate inventory and build the topology of every selected scope
///
/// With `only` set, just that subscription is processed and the account is
/// not enumerated.
pub async fn discover<I>(source: &I, only: Option<Subscription>) -> InventoryResult<Vec<Topology>>
where
    I: InventorySource + ?Sized,
{
    let scopes = match only {
        Some(scope) => vec![scope],
        None => source.list_scopes().await?,
    };

    if scopes.is_empty() {
        warn!("No subscriptions visible to {} inventory source", source.name());
    }

    let mut topologies = Vec::with_capacity(scopes.len());
    for scope in scopes {
        info!("Processing subscription: {}", scope);

        let (networks, endpoints, hosts) = futures::try_join!(
            source.list_networks(&scope),
            source.list_endpoints(&scope),
            source.list_hosts(&scope),
        )?;

        let topology = build_topology(scope, networks, &endpoints, &hosts);
        info!(
            "Discovered {} networks, {} devices ({} endpoint configurations dropped)",
            topology.networks.len(),
            topology.device_count(),
            topology.dropped.len()
        );
        for dropped in &topology.dropped {
            warn!("Skipping endpoint {}: {}", dropped.endpoint, dropped.reason);
        }

        topologies.push(topology);
    }

    Ok(topologies)
}
