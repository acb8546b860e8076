// Copyright (c) 2025 - Cowboy AI, Inc.
//! Reconciliation Driver
//!
//! Walks the topology of every subscription once and resolves the records
//! it implies, parents before children:
//!
//! ```text
//! Tag (shared, fatal on failure)
//!   └─ Network prefix (per address range, no parent)
//!        └─ Subnet prefix (parent = network prefix)
//!             └─ Manufacturer / device role / site
//!                  └─ Device type
//!                       └─ Device → Interface → IP address
//! ```
//!
//! A failed prefix skips its subtree and a failed device skips the rest of
//! its chain; both are recorded in the [`SyncReport`] and the run carries on.
//! Subnets of a network without any address range are skipped, since their
//! prefix would have no parent.
//! Only tag resolution failure and an exceeded run deadline abort the run.

pub mod report;
pub mod resolver;

use std::collections::HashMap;

use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::SyncSettings;
use crate::domain::{slugify, Cidr, DeviceName};
use crate::errors::{SyncError, SyncResult};
use crate::store::records::INTERFACE_OBJECT_TYPE;
use crate::store::{
    Device, DeviceCustomFields, DeviceRole, DeviceRoleSpec, DeviceSpec, DeviceType,
    DeviceTypeSpec, Interface, InterfaceSpec, IpAddress, IpAddressSpec, Manufacturer,
    ManufacturerSpec, Prefix, PrefixCustomFields, PrefixSpec, RecordId, Resource, Site, SiteSpec,
    Tag, TargetStore,
};
use crate::topology::{DevicePlacement, NetworkNode, Topology};

pub use report::{EntityFailure, KindTally, SkippedSubnet, SyncReport};
pub use resolver::{Outcome, Resolved, Resolver};

/// Drives reconciliation runs against a target store
pub struct Reconciler<S> {
    store: S,
    settings: SyncSettings,
}

impl<S: TargetStore> Reconciler<S> {
    pub fn new(store: S, settings: SyncSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Reconcile every topology, bounded by the run deadline
    pub async fn run(&self, topologies: &[Topology]) -> SyncResult<SyncReport> {
        let run_id = Uuid::now_v7();
        let deadline = self.settings.run_deadline;
        let span = info_span!("sync_run", %run_id, store = self.store.name());

        let run = self.execute(run_id, topologies).instrument(span);
        match tokio::time::timeout(deadline, run).await {
            Ok(result) => result,
            Err(_) => {
                error!(%run_id, "Sync run exceeded its deadline of {:?}", deadline);
                Err(SyncError::DeadlineExceeded(deadline))
            }
        }
    }

    async fn execute(&self, run_id: Uuid, topologies: &[Topology]) -> SyncResult<SyncReport> {
        let mut report = SyncReport::new(run_id);
        let resolver = Resolver::new(&self.store, &self.settings);

        info!("Starting sync of {} subscriptions", topologies.len());

        let tag = resolver.resolve::<Tag>(&self.settings.tag.spec()).await?;
        report.record(Tag::KIND, tag.outcome);
        let tag_id = tag.record.id;

        for topology in topologies {
            info!("Syncing subscription: {}", topology.subscription);
            report.subscriptions += 1;
            report.dropped.extend(topology.dropped.iter().cloned());

            for network in &topology.networks {
                self.sync_network(&resolver, topology, network, tag_id, &mut report)
                    .await;
            }
        }

        report.finish();
        report.log_summary();
        Ok(report)
    }

    async fn sync_network(
        &self,
        resolver: &Resolver<'_, S>,
        topology: &Topology,
        network: &NetworkNode,
        tag_id: RecordId,
        report: &mut SyncReport,
    ) {
        let label = &self.settings.provider.label;
        let subscription = &topology.subscription.id;
        info!("Processing VNet: {}", network.name);

        let mut parents: HashMap<Cidr, RecordId> = HashMap::new();
        for range in &network.ranges {
            let spec = PrefixSpec {
                prefix: range.to_string(),
                status: self.settings.status.clone(),
                description: format!(
                    "{} VNet: {} (Subscription: {})",
                    label, network.name, subscription
                ),
                tags: vec![tag_id],
                custom_fields: PrefixCustomFields::default(),
            };
            match resolver.resolve::<Prefix>(&spec).await {
                Ok(resolved) => {
                    report.record(Prefix::KIND, resolved.outcome);
                    parents.insert(*range, resolved.record.id);
                }
                Err(e) => report.fail(subscription, format!("prefix {}", range), &e),
            }
        }

        for subnet in &network.subnets {
            let cidr = subnet.subnet.address_prefix;
            let parent = match subnet.parent_range {
                Some(range) => match parents.get(&range) {
                    Some(id) => *id,
                    None => {
                        warn!(
                            "Skipping subnet {} ({}): network prefix {} was not synced",
                            subnet.subnet.name, cidr, range
                        );
                        continue;
                    }
                },
                None => {
                    report.skip_subnet(SkippedSubnet {
                        subscription: subscription.clone(),
                        network: network.name.clone(),
                        subnet: subnet.subnet.name.clone(),
                        devices: subnet.devices.len(),
                    });
                    continue;
                }
            };

            let spec = PrefixSpec {
                prefix: cidr.to_string(),
                status: self.settings.status.clone(),
                description: format!(
                    "{} Subnet: {} (VNet: {})",
                    label, subnet.subnet.name, network.name
                ),
                tags: vec![tag_id],
                custom_fields: PrefixCustomFields {
                    parent_prefix: Some(parent),
                },
            };
            match resolver.resolve::<Prefix>(&spec).await {
                Ok(resolved) => report.record(Prefix::KIND, resolved.outcome),
                Err(e) => {
                    report.fail(subscription, format!("prefix {}", cidr), &e);
                    continue;
                }
            }

            for device in &subnet.devices {
                match self.sync_device(resolver, device, tag_id, report).await {
                    Ok(()) => report.devices_synced += 1,
                    Err(e) => report.fail(subscription, format!("device {}", device.name), &e),
                }
            }
        }
    }

    /// Resolve one device and its dependency chain
    async fn sync_device(
        &self,
        resolver: &Resolver<'_, S>,
        device: &DevicePlacement,
        tag_id: RecordId,
        report: &mut SyncReport,
    ) -> SyncResult<()> {
        let settings = &self.settings;
        let provider = &settings.provider;
        let tags = vec![tag_id];

        let name = DeviceName::new(&device.name, settings.max_name_length)?;
        let model = format!("{} {}", provider.label, device.kind.label());
        let site_name = provider.site_name(&device.location);

        let manufacturer_spec = ManufacturerSpec {
            name: provider.manufacturer.clone(),
            slug: provider.manufacturer_slug(),
            description: String::new(),
            tags: tags.clone(),
        };
        let role_spec = DeviceRoleSpec {
            name: model.clone(),
            slug: slugify(&model),
            vm_role: device.kind.is_virtual(),
            tags: tags.clone(),
        };
        let site_spec = SiteSpec {
            slug: slugify(&site_name),
            name: site_name,
            status: settings.status.clone(),
            description: format!("{} Region: {}", provider.label, device.location),
            tags: tags.clone(),
        };

        let (manufacturer, role, site) = futures::try_join!(
            resolver.resolve::<Manufacturer>(&manufacturer_spec),
            resolver.resolve::<DeviceRole>(&role_spec),
            resolver.resolve::<Site>(&site_spec),
        )?;
        report.record(Manufacturer::KIND, manufacturer.outcome);
        report.record(DeviceRole::KIND, role.outcome);
        report.record(Site::KIND, site.outcome);

        let device_type = resolver
            .resolve::<DeviceType>(&DeviceTypeSpec {
                slug: slugify(&model),
                model,
                manufacturer: manufacturer.record.id,
                tags: tags.clone(),
            })
            .await?;
        report.record(DeviceType::KIND, device_type.outcome);

        let template = DeviceSpec {
            name: String::new(),
            device_type: device_type.record.id,
            role: role.record.id,
            site: site.record.id,
            status: settings.status.clone(),
            tags: tags.clone(),
            custom_fields: DeviceCustomFields::default(),
        };
        let resolved = resolver
            .resolve_device(&name, &template, &device.resource_id)
            .await?;
        report.record(Device::KIND, resolved.outcome);
        let device_name = resolved.record.key().name;

        let interface = resolver
            .resolve::<Interface>(&InterfaceSpec {
                device: resolved.record.id,
                name: settings.interface_name.clone(),
                interface_type: settings.interface_type.clone(),
                mac_address: device.mac_address.map(|mac| mac.to_string()),
                tags: tags.clone(),
            })
            .await?;
        report.record(Interface::KIND, interface.outcome);

        let ip = resolver
            .resolve::<IpAddress>(&IpAddressSpec {
                address: Cidr::host(device.address).to_string(),
                status: settings.status.clone(),
                description: format!("IP for {}", device_name),
                tags,
                assigned_object_type: INTERFACE_OBJECT_TYPE.to_string(),
                assigned_object_id: interface.record.id,
            })
            .await?;
        report.record(IpAddress::KIND, ip.outcome);

        info!(
            "Synced {} {} at {} ({})",
            device.kind, device_name, ip.record.address, site.record.name
        );
        Ok(())
    }
}
