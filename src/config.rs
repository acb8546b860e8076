// Copyright (c) 2025 - Cowboy AI, Inc.
//! Sync configuration
//!
//! - [`NetBoxConfig`] - how to reach the target store
//! - [`SyncSettings`] - how discovered inventory maps onto NetBox records

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::naming::{slugify, DEFAULT_MAX_NAME_LENGTH};
use crate::errors::{SyncError, SyncResult};
use crate::store::TagSpec;

/// Configuration for NetBox connection
///
/// Passed to [`NetBoxStore::new`](crate::adapters::NetBoxStore::new); there is
/// no process-wide client state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetBoxConfig {
    /// NetBox base URL (e.g., "https://netbox.example.com")
    pub base_url: String,

    /// API token for authentication
    pub api_token: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Verify the server certificate
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
}

fn default_timeout() -> u64 {
    30
}

fn default_verify_tls() -> bool {
    true
}

impl NetBoxConfig {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: api_token.into(),
            timeout_secs: default_timeout(),
            verify_tls: default_verify_tls(),
        }
    }

    /// Reject configurations that cannot authenticate
    pub fn validate(&self) -> SyncResult<()> {
        if self.base_url.trim().is_empty() || self.api_token.trim().is_empty() {
            return Err(SyncError::Configuration(
                "NetBox URL and token must be provided either as arguments or environment variables"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Provenance tag attached to every record the sync touches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSettings {
    pub name: String,
    pub slug: String,
    pub description: String,
}

impl TagSettings {
    pub fn spec(&self) -> TagSpec {
        TagSpec {
            name: self.name.clone(),
            slug: self.slug.clone(),
            description: self.description.clone(),
        }
    }
}

impl Default for TagSettings {
    fn default() -> Self {
        Self {
            name: "azure-sync".to_string(),
            slug: "azure-sync".to_string(),
            description: "Synced from Azure".to_string(),
        }
    }
}

/// Names derived from the cloud provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderLabels {
    /// Provider label used in model, role and site names ("Azure")
    pub label: String,
    /// Manufacturer of all synced device types
    pub manufacturer: String,
}

impl ProviderLabels {
    pub fn manufacturer_slug(&self) -> String {
        slugify(&self.manufacturer)
    }

    /// Site name for a provider region
    pub fn site_name(&self, location: &str) -> String {
        format!("{}-{}", self.label, location)
    }
}

impl Default for ProviderLabels {
    fn default() -> Self {
        Self {
            label: "Azure".to_string(),
            manufacturer: "Microsoft Azure".to_string(),
        }
    }
}

/// Re-fetch policy after a create conflict
///
/// The first lookup is immediate; each further lookup waits twice as long
/// as the previous one, starting at `base_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictRetry {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl ConflictRetry {
    /// Delay before lookup number `attempt` (0-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            Duration::ZERO
        } else {
            self.base_delay
                .saturating_mul(1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX))
        }
    }
}

impl Default for ConflictRetry {
    fn default() -> Self {
        Self {
            attempts: 4,
            base_delay: Duration::from_millis(100),
        }
    }
}

/// Reconciliation settings
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub tag: TagSettings,
    pub provider: ProviderLabels,
    pub max_name_length: usize,
    /// Highest numeric suffix tried before a device name collision is fatal
    pub max_disambiguation_attempts: u32,
    pub conflict_retry: ConflictRetry,
    pub interface_name: String,
    pub interface_type: String,
    /// Status given to every created record
    pub status: String,
    /// Upper bound on a whole run
    pub run_deadline: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            tag: TagSettings::default(),
            provider: ProviderLabels::default(),
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            max_disambiguation_attempts: 256,
            conflict_retry: ConflictRetry::default(),
            interface_name: "eth0".to_string(),
            interface_type: "1000base-t".to_string(),
            status: "active".to_string(),
            run_deadline: Duration::from_secs(30 * 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_fields() {
        let config: NetBoxConfig = serde_json::from_value(serde_json::json!({
            "base_url": "https://netbox.example.com",
            "api_token": "secret"
        }))
        .unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert!(config.verify_tls);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_requires_url_and_token() {
        assert!(NetBoxConfig::new("", "token").validate().is_err());
        assert!(NetBoxConfig::new("https://netbox", " ").validate().is_err());
    }

    #[test]
    fn test_provider_labels() {
        let provider = ProviderLabels::default();
        assert_eq!(provider.manufacturer_slug(), "microsoft-azure");
        assert_eq!(provider.site_name("eastus"), "Azure-eastus");
    }

    #[test]
    fn test_conflict_retry_backoff() {
        let retry = ConflictRetry {
            attempts: 4,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(retry.delay(0), Duration::ZERO);
        assert_eq!(retry.delay(1), Duration::from_millis(100));
        assert_eq!(retry.delay(2), Duration::from_millis(200));
        assert_eq!(retry.delay(3), Duration::from_millis(400));
    }
}
