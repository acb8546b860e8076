// Copyright (c) 2025 - Cowboy AI, Inc.
//! Sync run report

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::resolver::Outcome;
use crate::store::ResourceKind;
use crate::topology::DroppedEndpoint;

/// Outcome counts for one record kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindTally {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl KindTally {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Unchanged => self.unchanged += 1,
        }
    }
}

/// An entity whose resolution failed without aborting the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityFailure {
    pub subscription: String,
    /// Human-readable entity reference, e.g. "device web-1"
    pub entity: String,
    pub error: String,
}

/// A subnet left out of the run because its network has no address range
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSubnet {
    pub subscription: String,
    pub network: String,
    pub subnet: String,
    /// Devices placed in the subnet, none of which were synced
    pub devices: usize,
}

/// Summary of one reconciliation run
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub subscriptions: usize,
    pub tallies: BTreeMap<ResourceKind, KindTally>,
    pub devices_synced: usize,
    pub failures: Vec<EntityFailure>,
    pub dropped: Vec<DroppedEndpoint>,
    pub skipped_subnets: Vec<SkippedSubnet>,
}

impl SyncReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            subscriptions: 0,
            tallies: BTreeMap::new(),
            devices_synced: 0,
            failures: Vec::new(),
            dropped: Vec::new(),
            skipped_subnets: Vec::new(),
        }
    }

    pub fn record(&mut self, kind: ResourceKind, outcome: Outcome) {
        self.tallies.entry(kind).or_default().record(outcome);
    }

    pub fn fail(
        &mut self,
        subscription: &str,
        entity: impl Into<String>,
        error: &dyn std::error::Error,
    ) {
        let failure = EntityFailure {
            subscription: subscription.to_string(),
            entity: entity.into(),
            error: error.to_string(),
        };
        error!(
            "Failed to sync {} in subscription {}: {}",
            failure.entity, failure.subscription, failure.error
        );
        self.failures.push(failure);
    }

    pub fn skip_subnet(&mut self, skipped: SkippedSubnet) {
        warn!(
            "Skipping subnet {} in VNet {} ({} devices): network has no address range",
            skipped.subnet, skipped.network, skipped.devices
        );
        self.skipped_subnets.push(skipped);
    }

    pub fn tally(&self, kind: ResourceKind) -> KindTally {
        self.tallies.get(&kind).copied().unwrap_or_default()
    }

    pub fn created(&self) -> usize {
        self.tallies.values().map(|t| t.created).sum()
    }

    pub fn updated(&self) -> usize {
        self.tallies.values().map(|t| t.updated).sum()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at.unwrap_or_else(Utc::now) - self.started_at
    }

    pub fn log_summary(&self) {
        info!(
            "Sync finished in {}ms: {} subscriptions, {} devices synced, {} created, {} updated",
            self.elapsed().num_milliseconds(),
            self.subscriptions,
            self.devices_synced,
            self.created(),
            self.updated()
        );
        for (kind, tally) in &self.tallies {
            info!(
                "  {}: {} created, {} updated, {} unchanged",
                kind, tally.created, tally.updated, tally.unchanged
            );
        }
        if !self.dropped.is_empty() {
            warn!(
                "{} endpoint configurations were not synced (no resolvable subnet)",
                self.dropped.len()
            );
        }
        if !self.skipped_subnets.is_empty() {
            warn!(
                "{} subnets were not synced (network without address range)",
                self.skipped_subnets.len()
            );
        }
        if self.has_failures() {
            warn!("{} entities failed to sync", self.failures.len());
        }
    }
}
