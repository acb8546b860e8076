// Copyright (c) 2025 - Cowboy AI, Inc.

//! NetBox Target Store
//!
//! Implements [`TargetStore`] over the NetBox REST API.
//!
//! NetBox is a widely-used Data Center Infrastructure Management (DCIM) tool that
//! models infrastructure assets including devices, IP addresses, prefixes, and more.
//!
//! # Architecture
//!
//! Every [`Resource`] maps onto one API endpoint:
//!
//! ```text
//! lookup(key)     = GET   /api/{endpoint}/?{key filter}
//! create(spec)    = POST  /api/{endpoint}/
//! update(id, Δ)   = PATCH /api/{endpoint}/{id}/
//! ```
//!
//! # Conflict Classification
//!
//! NetBox reports a taken natural key as a validation error. A create is a
//! conflict when NetBox answers `409 Conflict`, or `400 Bad Request` and the
//! natural key resolves to an existing record right after. Error bodies are
//! never inspected.
//!
//! # Custom Fields
//!
//! [`TargetStore::initialize`] makes sure the custom fields the reconciler
//! writes exist:
//!
//! - `cloud_resource_id` (text, on devices) - cloud resource a device mirrors
//! - `parent_prefix` (object, on prefixes) - network prefix a subnet prefix belongs to
//!
//! # Example
//!
//! ```rust,no_run
//! use cim_netbox_sync::adapters::NetBoxStore;
//! use cim_netbox_sync::config::NetBoxConfig;
//! use cim_netbox_sync::store::TargetStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NetBoxConfig::new("https://netbox.example.com", "your-token-here");
//!
//!     let store = NetBoxStore::new(config)?;
//!     store.initialize().await?;
//!
//!     // Reconcile...
//!
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::NetBoxConfig;
use crate::store::{Patch, RecordId, Resource, StoreError, StoreResult, TargetStore};

/// Paginated list response
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default)]
    count: u64,
    results: Vec<T>,
}

/// Custom field definition the reconciler depends on
#[derive(Debug, Clone, Serialize)]
struct CustomFieldSpec {
    name: &'static str,
    label: &'static str,
    #[serde(rename = "type")]
    field_type: &'static str,
    description: &'static str,
    /// NetBox 4.x
    object_types: [&'static str; 1],
    /// NetBox 3.x
    content_types: [&'static str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    related_object_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    object_type: Option<&'static str>,
}

const CUSTOM_FIELDS: [CustomFieldSpec; 2] = [
    CustomFieldSpec {
        name: "cloud_resource_id",
        label: "Cloud Resource ID",
        field_type: "text",
        description: "Cloud resource mirrored by this device",
        object_types: ["dcim.device"],
        content_types: ["dcim.device"],
        related_object_type: None,
        object_type: None,
    },
    CustomFieldSpec {
        name: "parent_prefix",
        label: "Parent Prefix",
        field_type: "object",
        description: "Network prefix this prefix belongs to",
        object_types: ["ipam.prefix"],
        content_types: ["ipam.prefix"],
        related_object_type: Some("ipam.prefix"),
        object_type: Some("ipam.prefix"),
    },
];

/// NetBox REST target store
pub struct NetBoxStore {
    config: NetBoxConfig,
    client: Client,
}

impl NetBoxStore {
    /// Create a new NetBox store client
    pub fn new(config: NetBoxConfig) -> StoreResult<Self> {
        config
            .validate()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        info!("Connecting to NetBox at {}", config.base_url);
        if !config.verify_tls {
            warn!("TLS certificate verification is disabled for NetBox");
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(!config.verify_tls)
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    "Authorization",
                    format!("Token {}", config.api_token)
                        .parse()
                        .map_err(|e| StoreError::Unavailable(format!("Invalid API token: {}", e)))?,
                );
                headers.insert(
                    "Accept",
                    "application/json"
                        .parse()
                        .map_err(|e| StoreError::Unavailable(format!("Invalid header: {}", e)))?,
                );
                headers
            })
            .build()
            .map_err(|e| {
                StoreError::Unavailable(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/api/{}/",
            self.config.base_url.trim_end_matches('/'),
            endpoint
        )
    }

    fn record_url(&self, endpoint: &str, id: RecordId) -> String {
        format!("{}{}/", self.url(endpoint), id)
    }

    async fn decode<T: DeserializeOwned, R: Resource>(response: Response) -> StoreResult<T> {
        response.json::<T>().await.map_err(|e| StoreError::Decode {
            kind: R::KIND,
            message: e.to_string(),
        })
    }

    async fn rejected<R: Resource>(response: Response) -> StoreError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        StoreError::Rejected {
            kind: R::KIND,
            status,
            body,
        }
    }

    /// Create every custom field the reconciler writes that is still missing
    async fn ensure_custom_fields(&self) -> StoreResult<()> {
        let url = self.url("extras/custom-fields");

        for field in &CUSTOM_FIELDS {
            let response = self
                .client
                .get(&url)
                .query(&[("name", field.name)])
                .send()
                .await
                .map_err(transport)?;
            if !response.status().is_success() {
                return Err(StoreError::Unavailable(format!(
                    "Listing custom fields returned status: {}",
                    response.status()
                )));
            }
            let page: Page<serde_json::Value> = response
                .json()
                .await
                .map_err(|e| StoreError::Unavailable(format!("Invalid custom field list: {}", e)))?;
            if page.count > 0 || !page.results.is_empty() {
                debug!("Custom field {} present", field.name);
                continue;
            }

            let response = self
                .client
                .post(&url)
                .json(field)
                .send()
                .await
                .map_err(transport)?;
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(StoreError::Unavailable(format!(
                    "Creating custom field {} returned {}: {}",
                    field.name, status, body
                )));
            }
            info!("Created custom field: {}", field.name);
        }

        Ok(())
    }
}

fn transport(error: reqwest::Error) -> StoreError {
    if error.is_timeout() {
        StoreError::Transport(format!("NetBox request timed out: {}", error))
    } else {
        StoreError::Transport(format!("NetBox API error: {}", error))
    }
}

#[async_trait]
impl TargetStore for NetBoxStore {
    async fn lookup<R: Resource>(&self, key: &R::Key) -> StoreResult<Option<R>> {
        let response = self
            .client
            .get(self.url(R::ENDPOINT))
            .query(&R::key_filter(key))
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(Self::rejected::<R>(response).await);
        }

        let page: Page<R> = Self::decode::<_, R>(response).await?;
        Ok(page.results.into_iter().find(|record| record.key() == *key))
    }

    async fn create<R: Resource>(&self, spec: &R::Spec) -> StoreResult<R> {
        let response = self
            .client
            .post(self.url(R::ENDPOINT))
            .json(spec)
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            StatusCode::CREATED | StatusCode::OK => Self::decode::<R, R>(response).await,
            StatusCode::CONFLICT => Err(StoreError::Conflict {
                kind: R::KIND,
                key: R::spec_key(spec).to_string(),
            }),
            StatusCode::BAD_REQUEST => {
                let rejection = Self::rejected::<R>(response).await;
                let key = R::spec_key(spec);
                // A validation error is a conflict only if the key is now taken
                match self.lookup::<R>(&key).await {
                    Ok(Some(_)) => Err(StoreError::Conflict {
                        kind: R::KIND,
                        key: key.to_string(),
                    }),
                    _ => Err(rejection),
                }
            }
            _ => Err(Self::rejected::<R>(response).await),
        }
    }

    async fn update<R: Resource>(&self, id: RecordId, patch: &Patch) -> StoreResult<R> {
        let response = self
            .client
            .patch(self.record_url(R::ENDPOINT, id))
            .json(patch)
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            status if status.is_success() => Self::decode::<R, R>(response).await,
            StatusCode::NOT_FOUND => Err(StoreError::NotFound { kind: R::KIND, id }),
            _ => Err(Self::rejected::<R>(response).await),
        }
    }

    async fn initialize(&self) -> StoreResult<()> {
        info!("Initializing NetBox target store");

        // Verify connectivity by checking API status
        self.health_check().await?;
        self.ensure_custom_fields().await?;

        info!("NetBox target store initialized successfully");
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        let url = self.url("status");
        let response = self.client.get(&url).send().await.map_err(|e| {
            StoreError::Unavailable(format!("NetBox health check failed: {}", e))
        })?;

        if response.status().is_success() {
            debug!("NetBox health check passed");
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!(
                "NetBox returned status: {}",
                response.status()
            )))
        }
    }

    fn name(&self) -> &str {
        "netbox"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Device, Prefix};
    use serde_json::json;

    fn store(base_url: &str) -> NetBoxStore {
        NetBoxStore::new(NetBoxConfig::new(base_url, "0123456789abcdef")).unwrap()
    }

    #[test]
    fn test_endpoint_urls() {
        let store = store("https://netbox.example.com/");
        assert_eq!(
            store.url(Prefix::ENDPOINT),
            "https://netbox.example.com/api/ipam/prefixes/"
        );
        assert_eq!(
            store.record_url(Device::ENDPOINT, 42),
            "https://netbox.example.com/api/dcim/devices/42/"
        );
    }

    #[test]
    fn test_missing_token_rejected() {
        let result = NetBoxStore::new(NetBoxConfig::new("https://netbox.example.com", ""));
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_insecure_client_builds() {
        let mut config = NetBoxConfig::new("https://netbox.local", "token");
        config.verify_tls = false;
        assert!(NetBoxStore::new(config).is_ok());
    }

    #[test]
    fn test_page_of_prefixes_decodes() {
        let page: Page<Prefix> = serde_json::from_value(json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [{
                "id": 7,
                "prefix": "10.0.0.0/16",
                "status": {"value": "active", "label": "Active"},
                "description": "Azure VNet: core (Subscription: s1)",
                "tags": [{"id": 1, "name": "azure-sync", "slug": "azure-sync"}],
                "custom_fields": {"parent_prefix": null}
            }]
        }))
        .unwrap();

        assert_eq!(page.count, 1);
        assert_eq!(page.results[0].id, 7);
        assert_eq!(page.results[0].tags, vec![1]);
        assert_eq!(page.results[0].parent(), None);
    }

    #[test]
    fn test_custom_field_bodies() {
        let body = serde_json::to_value(&CUSTOM_FIELDS[1]).unwrap();
        assert_eq!(body["type"], "object");
        assert_eq!(body["related_object_type"], "ipam.prefix");
        assert_eq!(body["object_types"], json!(["ipam.prefix"]));

        let body = serde_json::to_value(&CUSTOM_FIELDS[0]).unwrap();
        assert!(body.get("related_object_type").is_none());
    }
}
