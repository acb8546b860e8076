// Copyright (c) 2025 - Cowboy AI, Inc.

//! Azure Resource Manager Inventory Source
//!
//! Implements [`InventorySource`] over the ARM REST API:
//!
//! ```text
//! list_scopes()      = GET /subscriptions
//! list_networks(s)   = GET /subscriptions/{s}/providers/Microsoft.Network/virtualNetworks
//! list_endpoints(s)  = GET /subscriptions/{s}/providers/Microsoft.Network/networkInterfaces
//! list_hosts(s)      = GET /subscriptions/{s}/providers/Microsoft.Compute/virtualMachines
//! ```
//!
//! List responses are followed through `nextLink` until exhausted.
//!
//! # Credentials
//!
//! A bearer token is taken from `AZURE_ACCESS_TOKEN` when set, otherwise
//! from the Azure CLI (`az account get-access-token`). In interactive mode
//! `az login` runs first.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::domain::{
    Cidr, DiscoveredEndpoint, DiscoveredHost, DiscoveredNetwork, DiscoveredSubnet,
    IpConfiguration, MacAddress, Subscription,
};
use crate::inventory::{InventoryError, InventoryResult, InventorySource};

/// Public cloud ARM endpoint
pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";

/// Environment variable holding a pre-acquired ARM token
pub const ACCESS_TOKEN_ENV: &str = "AZURE_ACCESS_TOKEN";

const SUBSCRIPTIONS_API_VERSION: &str = "2022-12-01";
const NETWORK_API_VERSION: &str = "2023-09-01";
const COMPUTE_API_VERSION: &str = "2023-09-01";

/// How to obtain ARM credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialMode {
    /// Environment token, else the current Azure CLI login
    #[default]
    Default,
    /// Run `az login` before acquiring the token
    Interactive,
}

/// Acquire an ARM bearer token
pub async fn acquire_token(mode: CredentialMode) -> InventoryResult<String> {
    if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
        if !token.trim().is_empty() {
            debug!("Using ARM token from {}", ACCESS_TOKEN_ENV);
            return Ok(token.trim().to_string());
        }
    }

    if mode == CredentialMode::Interactive {
        info!("Starting interactive Azure login");
        let status = Command::new("az")
            .arg("login")
            .status()
            .await
            .map_err(|e| InventoryError::Credential(format!("Failed to run az login: {}", e)))?;
        if !status.success() {
            return Err(InventoryError::Credential(format!(
                "az login exited with {}",
                status
            )));
        }
    }

    let output = Command::new("az")
        .args([
            "account",
            "get-access-token",
            "--resource",
            "https://management.azure.com/",
            "--output",
            "json",
        ])
        .output()
        .await
        .map_err(|e| InventoryError::Credential(format!("Failed to run Azure CLI: {}", e)))?;

    if !output.status.success() {
        return Err(InventoryError::Credential(format!(
            "az account get-access-token failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_cli_token(&output.stdout)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
}

fn parse_cli_token(stdout: &[u8]) -> InventoryResult<String> {
    serde_json::from_slice::<CliToken>(stdout)
        .map(|token| token.access_token)
        .map_err(|e| InventoryError::Decode {
            what: "Azure CLI token".to_string(),
            message: e.to_string(),
        })
}

// ============================================================================
// ARM wire types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmPage<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(default)]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmSubscription {
    subscription_id: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArmResourceRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ArmVirtualNetwork {
    id: String,
    name: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    properties: ArmVirtualNetworkProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmVirtualNetworkProperties {
    #[serde(default)]
    address_space: ArmAddressSpace,
    #[serde(default)]
    subnets: Vec<ArmSubnet>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmAddressSpace {
    #[serde(default)]
    address_prefixes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ArmSubnet {
    id: String,
    name: String,
    #[serde(default)]
    properties: ArmSubnetProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmSubnetProperties {
    #[serde(default)]
    address_prefix: Option<String>,
    #[serde(default)]
    address_prefixes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ArmNetworkInterface {
    id: String,
    name: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    properties: ArmNetworkInterfaceProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmNetworkInterfaceProperties {
    #[serde(default)]
    mac_address: Option<String>,
    #[serde(default)]
    virtual_machine: Option<ArmResourceRef>,
    #[serde(default)]
    ip_configurations: Vec<ArmIpConfiguration>,
}

#[derive(Debug, Deserialize)]
struct ArmIpConfiguration {
    #[serde(default)]
    properties: ArmIpConfigurationProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmIpConfigurationProperties {
    #[serde(default, rename = "privateIPAddress")]
    private_ip_address: Option<String>,
    #[serde(default)]
    subnet: Option<ArmResourceRef>,
}

#[derive(Debug, Deserialize)]
struct ArmVirtualMachine {
    id: String,
    name: String,
    #[serde(default)]
    properties: ArmVirtualMachineProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmVirtualMachineProperties {
    #[serde(default)]
    storage_profile: Option<ArmStorageProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmStorageProfile {
    #[serde(default)]
    os_disk: Option<ArmOsDisk>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmOsDisk {
    #[serde(default)]
    os_type: Option<String>,
}

fn parse_ranges(owner: &str, prefixes: &[String]) -> Vec<Cidr> {
    prefixes
        .iter()
        .filter_map(|prefix| match Cidr::new(prefix) {
            Ok(cidr) => Some(cidr),
            Err(e) => {
                warn!("Ignoring address range {} of {}: {}", prefix, owner, e);
                None
            }
        })
        .collect()
}

impl From<ArmSubscription> for Subscription {
    fn from(sub: ArmSubscription) -> Self {
        match sub.display_name {
            Some(name) => Subscription::new(sub.subscription_id, name),
            None => Subscription::from_id(sub.subscription_id),
        }
    }
}

impl From<ArmVirtualNetwork> for DiscoveredNetwork {
    fn from(vnet: ArmVirtualNetwork) -> Self {
        let address_space = parse_ranges(&vnet.name, &vnet.properties.address_space.address_prefixes);
        let subnets = vnet
            .properties
            .subnets
            .into_iter()
            .filter_map(|subnet| {
                let props = subnet.properties;
                let prefixes: Vec<String> = props
                    .address_prefix
                    .into_iter()
                    .chain(props.address_prefixes)
                    .collect();
                match parse_ranges(&subnet.name, &prefixes).first() {
                    Some(cidr) => Some(DiscoveredSubnet {
                        id: subnet.id,
                        name: subnet.name,
                        address_prefix: *cidr,
                    }),
                    None => {
                        warn!("Subnet {} has no usable address prefix", subnet.name);
                        None
                    }
                }
            })
            .collect();

        DiscoveredNetwork {
            id: vnet.id,
            name: vnet.name,
            location: vnet.location,
            address_space,
            subnets,
        }
    }
}

impl From<ArmNetworkInterface> for DiscoveredEndpoint {
    fn from(nic: ArmNetworkInterface) -> Self {
        let props = nic.properties;
        let mac_address = props.mac_address.and_then(|mac| match MacAddress::new(&mac) {
            Ok(mac) => Some(mac),
            Err(e) => {
                warn!("Ignoring MAC address of {}: {}", nic.name, e);
                None
            }
        });

        let ip_configurations = props
            .ip_configurations
            .into_iter()
            .map(|config| {
                let private_address = config
                    .properties
                    .private_ip_address
                    .and_then(|ip| ip.parse().ok());
                IpConfiguration {
                    private_address,
                    subnet_id: config.properties.subnet.map(|subnet| subnet.id),
                }
            })
            .collect();

        DiscoveredEndpoint {
            id: nic.id,
            name: nic.name,
            location: nic.location,
            mac_address,
            host_id: props.virtual_machine.map(|vm| vm.id),
            ip_configurations,
        }
    }
}

impl From<ArmVirtualMachine> for DiscoveredHost {
    fn from(vm: ArmVirtualMachine) -> Self {
        let os_type = vm
            .properties
            .storage_profile
            .and_then(|profile| profile.os_disk)
            .and_then(|disk| disk.os_type);
        DiscoveredHost {
            id: vm.id,
            name: vm.name,
            os_type,
        }
    }
}

// ============================================================================
// Source
// ============================================================================

/// Inventory source backed by Azure Resource Manager
pub struct ArmInventorySource {
    endpoint: String,
    token: String,
    client: Client,
}

impl ArmInventorySource {
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> InventoryResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InventoryError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        })
    }

    /// Acquire credentials and connect to the public ARM endpoint
    pub async fn connect(mode: CredentialMode, timeout: Duration) -> InventoryResult<Self> {
        let token = acquire_token(mode).await?;
        info!("Authenticated against Azure Resource Manager");
        Self::new(DEFAULT_ARM_ENDPOINT, token, timeout)
    }

    fn subscription_url(&self, scope: &Subscription, provider: &str, api_version: &str) -> String {
        format!(
            "{}/subscriptions/{}/providers/{}?api-version={}",
            self.endpoint, scope.id, provider, api_version
        )
    }

    /// Fetch every item of a list, following `nextLink`
    async fn list_all<T: DeserializeOwned>(&self, url: String) -> InventoryResult<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(url);

        while let Some(url) = next {
            debug!("GET {}", url);
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await
                .map_err(|e| InventoryError::Transport(format!("ARM request failed: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(InventoryError::Status {
                    url,
                    status: status.as_u16(),
                    body,
                });
            }

            let page: ArmPage<T> = response.json().await.map_err(|e| InventoryError::Decode {
                what: url.clone(),
                message: e.to_string(),
            })?;
            items.extend(page.value);
            next = page.next_link;
        }

        Ok(items)
    }
}

#[async_trait]
impl InventorySource for ArmInventorySource {
    async fn list_scopes(&self) -> InventoryResult<Vec<Subscription>> {
        let url = format!(
            "{}/subscriptions?api-version={}",
            self.endpoint, SUBSCRIPTIONS_API_VERSION
        );
        let subscriptions: Vec<ArmSubscription> = self.list_all(url).await?;
        Ok(subscriptions.into_iter().map(Subscription::from).collect())
    }

    async fn list_networks(&self, scope: &Subscription) -> InventoryResult<Vec<DiscoveredNetwork>> {
        let url = self.subscription_url(
            scope,
            "Microsoft.Network/virtualNetworks",
            NETWORK_API_VERSION,
        );
        let vnets: Vec<ArmVirtualNetwork> = self.list_all(url).await?;
        Ok(vnets.into_iter().map(DiscoveredNetwork::from).collect())
    }

    async fn list_endpoints(
        &self,
        scope: &Subscription,
    ) -> InventoryResult<Vec<DiscoveredEndpoint>> {
        let url = self.subscription_url(
            scope,
            "Microsoft.Network/networkInterfaces",
            NETWORK_API_VERSION,
        );
        let nics: Vec<ArmNetworkInterface> = self.list_all(url).await?;
        Ok(nics.into_iter().map(DiscoveredEndpoint::from).collect())
    }

    async fn list_hosts(&self, scope: &Subscription) -> InventoryResult<Vec<DiscoveredHost>> {
        let url = self.subscription_url(
            scope,
            "Microsoft.Compute/virtualMachines",
            COMPUTE_API_VERSION,
        );
        let vms: Vec<ArmVirtualMachine> = self.list_all(url).await?;
        Ok(vms.into_iter().map(DiscoveredHost::from).collect())
    }

    fn name(&self) -> &str {
        "azure-arm"
    }
}
