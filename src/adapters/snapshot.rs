// Copyright (c) 2025 - Cowboy AI, Inc.

//! Snapshot Inventory Source
//!
//! Serves inventory from a JSON document instead of a live provider, for
//! offline runs and tests:
//!
//! ```json
//! {
//!   "subscriptions": [{
//!     "id": "0000-1111",
//!     "display_name": "Production",
//!     "networks":  [{"id": "...", "name": "core", "location": "eastus",
//!                    "address_space": ["10.0.0.0/16"],
//!                    "subnets": [{"id": "...", "name": "web", "address_prefix": "10.0.1.0/24"}]}],
//!     "endpoints": [{"id": "...", "name": "web-1-nic", "location": "eastus",
//!                    "mac_address": "AA:BB:CC:DD:EE:FF", "host_id": "...",
//!                    "ip_configurations": [{"private_address": "10.0.1.5", "subnet_id": "..."}]}],
//!     "hosts":     [{"id": "...", "name": "web-1", "os_type": "Linux"}]
//!   }]
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::domain::{DiscoveredEndpoint, DiscoveredHost, DiscoveredNetwork, Subscription};
use crate::inventory::{InventoryError, InventoryResult, InventorySource};

/// Inventory of one subscription
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub networks: Vec<DiscoveredNetwork>,
    #[serde(default)]
    pub endpoints: Vec<DiscoveredEndpoint>,
    #[serde(default)]
    pub hosts: Vec<DiscoveredHost>,
}

impl SubscriptionSnapshot {
    fn scope(&self) -> Subscription {
        match &self.display_name {
            Some(name) => Subscription::new(self.id.clone(), name.clone()),
            None => Subscription::from_id(self.id.clone()),
        }
    }
}

/// Inventory source reading a JSON snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotInventorySource {
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionSnapshot>,
}

impl SnapshotInventorySource {
    pub fn from_json(json: &str) -> InventoryResult<Self> {
        serde_json::from_str(json).map_err(|e| InventoryError::Decode {
            what: "inventory snapshot".to_string(),
            message: e.to_string(),
        })
    }

    pub async fn from_path(path: impl AsRef<Path>) -> InventoryResult<Self> {
        let path = path.as_ref();
        info!("Loading inventory snapshot from {}", path.display());
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    fn find(&self, scope: &Subscription) -> InventoryResult<&SubscriptionSnapshot> {
        self.subscriptions
            .iter()
            .find(|sub| sub.id.eq_ignore_ascii_case(&scope.id))
            .ok_or_else(|| InventoryError::UnknownScope(scope.id.clone()))
    }
}

#[async_trait]
impl InventorySource for SnapshotInventorySource {
    async fn list_scopes(&self) -> InventoryResult<Vec<Subscription>> {
        Ok(self
            .subscriptions
            .iter()
            .map(SubscriptionSnapshot::scope)
            .collect())
    }

    async fn list_networks(&self, scope: &Subscription) -> InventoryResult<Vec<DiscoveredNetwork>> {
        Ok(self.find(scope)?.networks.clone())
    }

    async fn list_endpoints(
        &self,
        scope: &Subscription,
    ) -> InventoryResult<Vec<DiscoveredEndpoint>> {
        Ok(self.find(scope)?.endpoints.clone())
    }

    async fn list_hosts(&self, scope: &Subscription) -> InventoryResult<Vec<DiscoveredHost>> {
        Ok(self.find(scope)?.hosts.clone())
    }

    fn name(&self) -> &str {
        "snapshot"
    }
}
