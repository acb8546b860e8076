// Copyright (c) 2025 - Cowboy AI, Inc.
//! Discovered Cloud Inventory
//!
//! Plain values produced by an [`InventorySource`](crate::inventory::InventorySource):
//! subscriptions, virtual networks with their subnets, network endpoints
//! (NICs) and the hosts (VMs) they are attached to. Nothing here talks to
//! NetBox; these are the inputs of the topology builder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

use super::network::{Cidr, MacAddress};

/// A single inventory scope (an Azure subscription)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub display_name: String,
}

impl Subscription {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }

    /// Scope selected by ID alone, without enumerating the account
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        let display_name = format!("Subscription {}", id);
        Self { id, display_name }
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.id)
    }
}

/// Virtual network with its address ranges and subnets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredNetwork {
    pub id: String,
    pub name: String,
    pub location: String,
    pub address_space: Vec<Cidr>,
    #[serde(default)]
    pub subnets: Vec<DiscoveredSubnet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredSubnet {
    pub id: String,
    pub name: String,
    pub address_prefix: Cidr,
}

/// Network endpoint (NIC) with its IP configurations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredEndpoint {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub mac_address: Option<MacAddress>,
    /// Resource ID of the host this endpoint is attached to
    #[serde(default)]
    pub host_id: Option<String>,
    #[serde(default)]
    pub ip_configurations: Vec<IpConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpConfiguration {
    #[serde(default)]
    pub private_address: Option<IpAddr>,
    #[serde(default)]
    pub subnet_id: Option<String>,
}

/// Compute host (VM)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredHost {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub os_type: Option<String>,
}

/// What a synced device represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Endpoint attached to a known VM; the device is the VM
    Vm,
    /// Free-standing endpoint; the device is the NIC itself
    NetworkInterface,
}

impl DeviceKind {
    /// Human label used in device type and role names
    pub fn label(&self) -> &'static str {
        match self {
            DeviceKind::Vm => "VM",
            DeviceKind::NetworkInterface => "Network Interface",
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, DeviceKind::Vm)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_from_id() {
        let sub = Subscription::from_id("0000-1111");
        assert_eq!(sub.id, "0000-1111");
        assert_eq!(sub.display_name, "Subscription 0000-1111");
    }

    #[test]
    fn test_endpoint_deserialization_defaults() {
        let endpoint: DiscoveredEndpoint = serde_json::from_value(serde_json::json!({
            "id": "/subscriptions/s/nic-1",
            "name": "nic-1",
            "location": "eastus"
        }))
        .unwrap();

        assert!(endpoint.mac_address.is_none());
        assert!(endpoint.host_id.is_none());
        assert!(endpoint.ip_configurations.is_empty());
    }

    #[test]
    fn test_device_kind_labels() {
        assert_eq!(DeviceKind::Vm.label(), "VM");
        assert!(DeviceKind::Vm.is_virtual());
        assert!(!DeviceKind::NetworkInterface.is_virtual());
        assert_eq!(
            serde_json::to_string(&DeviceKind::NetworkInterface).unwrap(),
            "\"network_interface\""
        );
    }
}
