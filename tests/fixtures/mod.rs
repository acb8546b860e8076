// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-netbox-sync
//!
//! Deterministic inventory for reconciliation tests: one subscription with
//! network `10.0.0.0/16`, subnet `10.0.1.0/24` and VM `web-1` at `10.0.1.5`.
//!
//! # Design Principles
//! - All resource IDs, addresses and names are fixed constants
//! - Topologies are built through `build_topology`, never by hand
//! - Retry delays are shortened so conflict paths stay fast

#![allow(dead_code)]

use std::time::Duration;

use cim_netbox_sync::domain::{
    Cidr, DiscoveredEndpoint, DiscoveredHost, DiscoveredNetwork, DiscoveredSubnet,
    IpConfiguration, MacAddress, Subscription,
};
use cim_netbox_sync::{build_topology, ConflictRetry, SyncSettings, Topology};

pub const SUBSCRIPTION_ID: &str = "0000-1111-2222";
pub const VNET_ID: &str = "/subscriptions/0000-1111-2222/virtualNetworks/core";
pub const SUBNET_ID: &str = "/subscriptions/0000-1111-2222/virtualNetworks/core/subnets/web";
pub const WEB_VM_ID: &str = "/subscriptions/0000-1111-2222/virtualMachines/web-1";

pub const WEB_MAC: &str = "AA:BB:CC:DD:EE:FF";
pub const WEB_ADDRESS: &str = "10.0.1.5";
pub const LOCATION: &str = "eastus";

pub fn cidr(s: &str) -> Cidr {
    s.parse().expect("Invalid CIDR in test fixture")
}

pub fn subscription() -> Subscription {
    Subscription::new(SUBSCRIPTION_ID, "Production")
}

/// Settings with millisecond conflict backoff
pub fn settings() -> SyncSettings {
    SyncSettings {
        conflict_retry: ConflictRetry {
            attempts: 3,
            base_delay: Duration::from_millis(1),
        },
        ..SyncSettings::default()
    }
}

pub fn core_network() -> DiscoveredNetwork {
    DiscoveredNetwork {
        id: VNET_ID.to_string(),
        name: "core".to_string(),
        location: LOCATION.to_string(),
        address_space: vec![cidr("10.0.0.0/16")],
        subnets: vec![DiscoveredSubnet {
            id: SUBNET_ID.to_string(),
            name: "web".to_string(),
            address_prefix: cidr("10.0.1.0/24"),
        }],
    }
}

pub fn vm(id: &str, name: &str) -> DiscoveredHost {
    DiscoveredHost {
        id: id.to_string(),
        name: name.to_string(),
        os_type: Some("Linux".to_string()),
    }
}

/// NIC in the web subnet, attached to `host_id` when given
pub fn nic(
    name: &str,
    address: &str,
    location: &str,
    mac: &str,
    host_id: Option<&str>,
) -> DiscoveredEndpoint {
    DiscoveredEndpoint {
        id: format!("/subscriptions/{}/networkInterfaces/{}", SUBSCRIPTION_ID, name),
        name: name.to_string(),
        location: location.to_string(),
        mac_address: Some(MacAddress::new(mac).expect("Invalid MAC in test fixture")),
        host_id: host_id.map(str::to_string),
        ip_configurations: vec![IpConfiguration {
            private_address: Some(address.parse().expect("Invalid IP in test fixture")),
            subnet_id: Some(SUBNET_ID.to_string()),
        }],
    }
}

/// The reference scenario, with the VM's location and MAC adjustable
pub fn web_scenario(location: &str, mac: &str) -> Topology {
    build_topology(
        subscription(),
        vec![core_network()],
        &[nic("web-1-nic", WEB_ADDRESS, location, mac, Some(WEB_VM_ID))],
        &[vm(WEB_VM_ID, "web-1")],
    )
}

/// Scenario with arbitrary endpoints and hosts in the core network
pub fn scenario(endpoints: &[DiscoveredEndpoint], hosts: &[DiscoveredHost]) -> Topology {
    build_topology(subscription(), vec![core_network()], endpoints, hosts)
}
