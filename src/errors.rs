// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for reconciliation runs

use std::time::Duration;

use thiserror::Error;

use crate::domain::naming::NamingError;
use crate::inventory::InventoryError;
use crate::store::{ResourceKind, StoreError};

/// Errors raised while resolving entities or driving a sync run
#[derive(Debug, Error)]
pub enum SyncError {
    /// The target store failed while resolving an entity
    #[error("{kind} '{key}': {source}")]
    Store {
        kind: ResourceKind,
        key: String,
        #[source]
        source: StoreError,
    },

    /// Creation reported a conflict but the existing record never became visible
    #[error("{kind} '{key}' conflicted on create but was not found after {attempts} lookups")]
    ConflictUnresolved {
        kind: ResourceKind,
        key: String,
        attempts: u32,
    },

    /// Every disambiguation suffix up to the cap was taken
    #[error("no free device name for '{base}' at site {site} after {attempts} suffixes")]
    DisambiguationExhausted {
        base: String,
        site: u64,
        attempts: u32,
    },

    /// A discovered name could not be turned into a record name
    #[error("Naming error: {0}")]
    Naming(#[from] NamingError),

    /// The inventory source could not be enumerated
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The whole run took longer than its deadline
    #[error("Sync run exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

/// Result type for reconciliation operations
pub type SyncResult<T> = Result<T, SyncError>;

impl SyncError {
    /// Wrap a store error with the entity it was resolving
    pub fn store(kind: ResourceKind, key: impl ToString, source: StoreError) -> Self {
        SyncError::Store {
            kind,
            key: key.to_string(),
            source,
        }
    }
}
