// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Builder
//!
//! Pure transformation from discovered inventory into the ordered tree the
//! reconciler walks:
//!
//! ```text
//! Subscription
//!   └─ Network (address ranges)
//!        └─ Subnet (parent range)
//!             └─ Device placement (name, address, MAC, site)
//! ```
//!
//! Network and subnet discovery order is preserved. Endpoints are placed in
//! the subnet named by their IP configuration. Configurations without a
//! resolvable subnet reference are not synced; they are collected in
//! [`Topology::dropped`] so the run can report them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

use crate::domain::{
    Cidr, DeviceKind, DiscoveredEndpoint, DiscoveredHost, DiscoveredNetwork, DiscoveredSubnet,
    MacAddress, Subscription,
};

/// Topology of one subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub subscription: Subscription,
    pub networks: Vec<NetworkNode>,
    pub dropped: Vec<DroppedEndpoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: String,
    pub name: String,
    pub location: String,
    pub ranges: Vec<Cidr>,
    pub subnets: Vec<SubnetNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubnetNode {
    pub subnet: DiscoveredSubnet,
    /// Network range this subnet hangs under
    pub parent_range: Option<Cidr>,
    pub devices: Vec<DevicePlacement>,
}

/// One device to sync, placed in a subnet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevicePlacement {
    pub name: String,
    /// Cloud resource ID of the VM, or of the NIC for free-standing endpoints
    pub resource_id: String,
    pub kind: DeviceKind,
    pub address: IpAddr,
    pub mac_address: Option<MacAddress>,
    pub location: String,
    pub os_type: Option<String>,
}

/// An endpoint configuration left out of the topology
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedEndpoint {
    pub endpoint: String,
    pub reason: DropReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// The endpoint has no IP configuration at all
    NoIpConfiguration,
    /// The IP configuration carries no private address
    NoAddress,
    /// The IP configuration does not reference a subnet
    NoSubnetReference,
    /// The referenced subnet is not part of any discovered network
    UnknownSubnet(String),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::NoIpConfiguration => write!(f, "no IP configuration"),
            DropReason::NoAddress => write!(f, "no private address"),
            DropReason::NoSubnetReference => write!(f, "no subnet reference"),
            DropReason::UnknownSubnet(id) => write!(f, "unknown subnet {}", id),
        }
    }
}

impl Topology {
    /// Total number of device placements
    pub fn device_count(&self) -> usize {
        self.networks
            .iter()
            .flat_map(|n| &n.subnets)
            .map(|s| s.devices.len())
            .sum()
    }
}

/// Build the topology of one subscription
pub fn build_topology(
    subscription: Subscription,
    networks: Vec<DiscoveredNetwork>,
    endpoints: &[DiscoveredEndpoint],
    hosts: &[DiscoveredHost],
) -> Topology {
    let mut nodes: Vec<NetworkNode> = networks.into_iter().map(network_node).collect();

    // Azure resource IDs compare case-insensitively
    let subnet_index: HashMap<String, (usize, usize)> = nodes
        .iter()
        .enumerate()
        .flat_map(|(n, node)| {
            node.subnets
                .iter()
                .enumerate()
                .map(move |(s, subnet)| (subnet.subnet.id.to_lowercase(), (n, s)))
        })
        .collect();

    let host_index: HashMap<String, &DiscoveredHost> = hosts
        .iter()
        .map(|host| (host.id.to_lowercase(), host))
        .collect();

    let mut dropped = Vec::new();

    for endpoint in endpoints {
        if endpoint.ip_configurations.is_empty() {
            dropped.push(DroppedEndpoint {
                endpoint: endpoint.name.clone(),
                reason: DropReason::NoIpConfiguration,
            });
            continue;
        }

        let host = endpoint
            .host_id
            .as_ref()
            .and_then(|id| host_index.get(&id.to_lowercase()).copied());

        for config in &endpoint.ip_configurations {
            let Some(address) = config.private_address else {
                dropped.push(DroppedEndpoint {
                    endpoint: endpoint.name.clone(),
                    reason: DropReason::NoAddress,
                });
                continue;
            };

            let slot = match &config.subnet_id {
                Some(subnet_id) => subnet_index
                    .get(&subnet_id.to_lowercase())
                    .copied()
                    .ok_or_else(|| DropReason::UnknownSubnet(subnet_id.clone())),
                None => Err(DropReason::NoSubnetReference),
            };

            match slot {
                Ok((n, s)) => {
                    nodes[n].subnets[s]
                        .devices
                        .push(placement(endpoint, host, address));
                }
                Err(reason) => dropped.push(DroppedEndpoint {
                    endpoint: endpoint.name.clone(),
                    reason,
                }),
            }
        }
    }

    Topology {
        subscription,
        networks: nodes,
        dropped,
    }
}

fn network_node(network: DiscoveredNetwork) -> NetworkNode {
    let ranges = network.address_space;
    let subnets = network
        .subnets
        .into_iter()
        .map(|subnet| {
            let parent_range = ranges
                .iter()
                .find(|range| range.contains_range(&subnet.address_prefix))
                .or_else(|| ranges.first())
                .copied();
            SubnetNode {
                subnet,
                parent_range,
                devices: Vec::new(),
            }
        })
        .collect();

    NetworkNode {
        id: network.id,
        name: network.name,
        location: network.location,
        ranges,
        subnets,
    }
}

fn placement(
    endpoint: &DiscoveredEndpoint,
    host: Option<&DiscoveredHost>,
    address: IpAddr,
) -> DevicePlacement {
    match host {
        Some(host) => DevicePlacement {
            name: host.name.clone(),
            resource_id: host.id.clone(),
            kind: DeviceKind::Vm,
            address,
            mac_address: endpoint.mac_address,
            location: endpoint.location.clone(),
            os_type: host.os_type.clone(),
        },
        None => DevicePlacement {
            name: endpoint.name.clone(),
            resource_id: endpoint.id.clone(),
            kind: DeviceKind::NetworkInterface,
            address,
            mac_address: endpoint.mac_address,
            location: endpoint.location.clone(),
            os_type: None,
        },
    }
}
