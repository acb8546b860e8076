// Copyright (c) 2025 - Cowboy AI, Inc.
//! NetBox Record Kinds
//!
//! One record/spec pair per kind the reconciler manages:
//!
//! | Kind          | Natural key          | Tracked attributes                      |
//! |---------------|----------------------|-----------------------------------------|
//! | Tag           | slug                 | name, description                       |
//! | Prefix        | CIDR                 | description, status, parent, tag        |
//! | Manufacturer  | slug                 | name                                    |
//! | Device type   | model                | manufacturer, tag                       |
//! | Device role   | slug                 | name, vm_role, tag                      |
//! | Site          | slug                 | name, status, description, tag          |
//! | Device        | (name, site)         | type, role, status, tag, resource ID    |
//! | Interface     | (device, name)       | MAC address                             |
//! | IP address    | address              | assigned interface                      |
//!
//! Tags are only ever added: a record missing the sync tag gets it appended,
//! tags applied by other processes are preserved.
//!
//! Records deserialize from both NetBox responses (where references are
//! nested objects and choices are `{value, label}` objects) and plain IDs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::{Patch, RecordId, Resource, ResourceKind};
use crate::domain::MacAddress;

/// Deserializers for NetBox's nested representations
mod nested {
    use serde::{Deserialize, Deserializer};

    use super::RecordId;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRef {
        Id(RecordId),
        Object { id: RecordId },
    }

    impl IdRef {
        fn into_id(self) -> RecordId {
            match self {
                IdRef::Id(id) | IdRef::Object { id } => id,
            }
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ChoiceRef {
        Value(String),
        Object { value: String },
    }

    impl ChoiceRef {
        fn into_value(self) -> String {
            match self {
                ChoiceRef::Value(value) | ChoiceRef::Object { value } => value,
            }
        }
    }

    pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RecordId, D::Error> {
        IdRef::deserialize(deserializer).map(IdRef::into_id)
    }

    pub fn opt_id<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<RecordId>, D::Error> {
        Option::<IdRef>::deserialize(deserializer).map(|id| id.map(IdRef::into_id))
    }

    pub fn ids<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<RecordId>, D::Error> {
        Option::<Vec<IdRef>>::deserialize(deserializer)
            .map(|ids| ids.unwrap_or_default().into_iter().map(IdRef::into_id).collect())
    }

    pub fn opt_choice<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Option::<ChoiceRef>::deserialize(deserializer).map(|c| c.map(ChoiceRef::into_value))
    }
}

/// Accumulates drifted attributes into a patch
#[derive(Default)]
struct Drift(Patch);

impl Drift {
    fn set<T: Serialize>(&mut self, field: &str, desired: &T) {
        if let Ok(value) = serde_json::to_value(desired) {
            self.0.insert(field.to_string(), value);
        }
    }

    fn field<T: PartialEq + Serialize>(mut self, field: &str, current: &T, desired: &T) -> Self {
        if current != desired {
            self.set(field, desired);
        }
        self
    }

    fn choice(mut self, field: &str, current: &Option<String>, desired: &str) -> Self {
        if current.as_deref() != Some(desired) {
            self.set(field, &desired);
        }
        self
    }

    fn tags(mut self, current: &[RecordId], desired: &[RecordId]) -> Self {
        if desired.iter().any(|tag| !current.contains(tag)) {
            let mut merged = current.to_vec();
            merged.extend(desired.iter().filter(|tag| !current.contains(tag)));
            self.set("tags", &merged);
        }
        self
    }

    fn custom_field<T: PartialEq + Serialize>(
        mut self,
        field: &str,
        current: &T,
        desired: &T,
    ) -> Self {
        if current != desired {
            if let Ok(value) = serde_json::to_value(desired) {
                let entry = self
                    .0
                    .entry("custom_fields")
                    .or_insert_with(|| Value::Object(Default::default()));
                if let Value::Object(fields) = entry {
                    fields.insert(field.to_string(), value);
                }
            }
        }
        self
    }

    fn finish(self) -> Option<Patch> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0)
        }
    }
}

// ============================================================================
// Tag
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: RecordId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagSpec {
    pub name: String,
    pub slug: String,
    pub description: String,
}

impl Resource for Tag {
    const KIND: ResourceKind = ResourceKind::Tag;
    const ENDPOINT: &'static str = "extras/tags";
    type Key = String;
    type Spec = TagSpec;

    fn id(&self) -> RecordId {
        self.id
    }

    fn key(&self) -> String {
        self.slug.clone()
    }

    fn spec_key(spec: &TagSpec) -> String {
        spec.slug.clone()
    }

    fn key_filter(key: &String) -> Vec<(&'static str, String)> {
        vec![("slug", key.clone())]
    }

    fn drift(&self, spec: &TagSpec) -> Option<Patch> {
        Drift::default()
            .field("name", &self.name, &spec.name)
            .field("description", &self.description, &spec.description)
            .finish()
    }
}

// ============================================================================
// Prefix
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrefixCustomFields {
    /// Network prefix this subnet prefix belongs to
    #[serde(default, deserialize_with = "nested::opt_id")]
    pub parent_prefix: Option<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prefix {
    pub id: RecordId,
    pub prefix: String,
    #[serde(default, deserialize_with = "nested::opt_choice")]
    pub status: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "nested::ids")]
    pub tags: Vec<RecordId>,
    #[serde(default)]
    pub custom_fields: PrefixCustomFields,
}

impl Prefix {
    pub fn parent(&self) -> Option<RecordId> {
        self.custom_fields.parent_prefix
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrefixSpec {
    pub prefix: String,
    pub status: String,
    pub description: String,
    pub tags: Vec<RecordId>,
    pub custom_fields: PrefixCustomFields,
}

impl Resource for Prefix {
    const KIND: ResourceKind = ResourceKind::Prefix;
    const ENDPOINT: &'static str = "ipam/prefixes";
    type Key = String;
    type Spec = PrefixSpec;

    fn id(&self) -> RecordId {
        self.id
    }

    fn key(&self) -> String {
        self.prefix.clone()
    }

    fn spec_key(spec: &PrefixSpec) -> String {
        spec.prefix.clone()
    }

    fn key_filter(key: &String) -> Vec<(&'static str, String)> {
        vec![("prefix", key.clone())]
    }

    fn drift(&self, spec: &PrefixSpec) -> Option<Patch> {
        Drift::default()
            .field("description", &self.description, &spec.description)
            .choice("status", &self.status, &spec.status)
            .tags(&self.tags, &spec.tags)
            .custom_field(
                "parent_prefix",
                &self.custom_fields.parent_prefix,
                &spec.custom_fields.parent_prefix,
            )
            .finish()
    }
}

// ============================================================================
// Manufacturer
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manufacturer {
    pub id: RecordId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "nested::ids")]
    pub tags: Vec<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManufacturerSpec {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub tags: Vec<RecordId>,
}

impl Resource for Manufacturer {
    const KIND: ResourceKind = ResourceKind::Manufacturer;
    const ENDPOINT: &'static str = "dcim/manufacturers";
    type Key = String;
    type Spec = ManufacturerSpec;

    fn id(&self) -> RecordId {
        self.id
    }

    fn key(&self) -> String {
        self.slug.clone()
    }

    fn spec_key(spec: &ManufacturerSpec) -> String {
        spec.slug.clone()
    }

    fn key_filter(key: &String) -> Vec<(&'static str, String)> {
        vec![("slug", key.clone())]
    }

    fn drift(&self, spec: &ManufacturerSpec) -> Option<Patch> {
        Drift::default()
            .field("name", &self.name, &spec.name)
            .tags(&self.tags, &spec.tags)
            .finish()
    }
}

// ============================================================================
// Device type
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceType {
    pub id: RecordId,
    pub model: String,
    pub slug: String,
    #[serde(deserialize_with = "nested::id")]
    pub manufacturer: RecordId,
    #[serde(default, deserialize_with = "nested::ids")]
    pub tags: Vec<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceTypeSpec {
    pub model: String,
    pub slug: String,
    pub manufacturer: RecordId,
    pub tags: Vec<RecordId>,
}

impl Resource for DeviceType {
    const KIND: ResourceKind = ResourceKind::DeviceType;
    const ENDPOINT: &'static str = "dcim/device-types";
    type Key = String;
    type Spec = DeviceTypeSpec;

    fn id(&self) -> RecordId {
        self.id
    }

    fn key(&self) -> String {
        self.model.clone()
    }

    fn spec_key(spec: &DeviceTypeSpec) -> String {
        spec.model.clone()
    }

    fn key_filter(key: &String) -> Vec<(&'static str, String)> {
        vec![("model", key.clone())]
    }

    fn drift(&self, spec: &DeviceTypeSpec) -> Option<Patch> {
        Drift::default()
            .field("manufacturer", &self.manufacturer, &spec.manufacturer)
            .tags(&self.tags, &spec.tags)
            .finish()
    }
}

// ============================================================================
// Device role
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRole {
    pub id: RecordId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub vm_role: bool,
    #[serde(default, deserialize_with = "nested::ids")]
    pub tags: Vec<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceRoleSpec {
    pub name: String,
    pub slug: String,
    pub vm_role: bool,
    pub tags: Vec<RecordId>,
}

impl Resource for DeviceRole {
    const KIND: ResourceKind = ResourceKind::DeviceRole;
    const ENDPOINT: &'static str = "dcim/device-roles";
    type Key = String;
    type Spec = DeviceRoleSpec;

    fn id(&self) -> RecordId {
        self.id
    }

    fn key(&self) -> String {
        self.slug.clone()
    }

    fn spec_key(spec: &DeviceRoleSpec) -> String {
        spec.slug.clone()
    }

    fn key_filter(key: &String) -> Vec<(&'static str, String)> {
        vec![("slug", key.clone())]
    }

    fn drift(&self, spec: &DeviceRoleSpec) -> Option<Patch> {
        Drift::default()
            .field("name", &self.name, &spec.name)
            .field("vm_role", &self.vm_role, &spec.vm_role)
            .tags(&self.tags, &spec.tags)
            .finish()
    }
}

// ============================================================================
// Site
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: RecordId,
    pub name: String,
    pub slug: String,
    #[serde(default, deserialize_with = "nested::opt_choice")]
    pub status: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "nested::ids")]
    pub tags: Vec<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteSpec {
    pub name: String,
    pub slug: String,
    pub status: String,
    pub description: String,
    pub tags: Vec<RecordId>,
}

impl Resource for Site {
    const KIND: ResourceKind = ResourceKind::Site;
    const ENDPOINT: &'static str = "dcim/sites";
    type Key = String;
    type Spec = SiteSpec;

    fn id(&self) -> RecordId {
        self.id
    }

    fn key(&self) -> String {
        self.slug.clone()
    }

    fn spec_key(spec: &SiteSpec) -> String {
        spec.slug.clone()
    }

    fn key_filter(key: &String) -> Vec<(&'static str, String)> {
        vec![("slug", key.clone())]
    }

    fn drift(&self, spec: &SiteSpec) -> Option<Patch> {
        Drift::default()
            .field("name", &self.name, &spec.name)
            .choice("status", &self.status, &spec.status)
            .field("description", &self.description, &spec.description)
            .tags(&self.tags, &spec.tags)
            .finish()
    }
}

// ============================================================================
// Device
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceCustomFields {
    /// Cloud resource this device mirrors
    #[serde(default)]
    pub cloud_resource_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: RecordId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(deserialize_with = "nested::id")]
    pub device_type: RecordId,
    #[serde(alias = "device_role", deserialize_with = "nested::id")]
    pub role: RecordId,
    #[serde(deserialize_with = "nested::id")]
    pub site: RecordId,
    #[serde(default, deserialize_with = "nested::opt_choice")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "nested::ids")]
    pub tags: Vec<RecordId>,
    #[serde(default)]
    pub custom_fields: DeviceCustomFields,
}

impl Device {
    /// Whether this record mirrors the cloud resource `resource_id`
    ///
    /// Records without a stored resource ID predate the identity field and
    /// are claimed by whichever resource resolves them first.
    pub fn belongs_to(&self, resource_id: &str) -> bool {
        match &self.custom_fields.cloud_resource_id {
            Some(current) => current.eq_ignore_ascii_case(resource_id),
            None => true,
        }
    }
}

/// Device natural key: name unique within a site
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceKey {
    pub name: String,
    pub site: RecordId,
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (site {})", self.name, self.site)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSpec {
    pub name: String,
    pub device_type: RecordId,
    pub role: RecordId,
    pub site: RecordId,
    pub status: String,
    pub tags: Vec<RecordId>,
    pub custom_fields: DeviceCustomFields,
}

impl Resource for Device {
    const KIND: ResourceKind = ResourceKind::Device;
    const ENDPOINT: &'static str = "dcim/devices";
    type Key = DeviceKey;
    type Spec = DeviceSpec;

    fn id(&self) -> RecordId {
        self.id
    }

    fn key(&self) -> DeviceKey {
        DeviceKey {
            name: self.name.clone().unwrap_or_default(),
            site: self.site,
        }
    }

    fn spec_key(spec: &DeviceSpec) -> DeviceKey {
        DeviceKey {
            name: spec.name.clone(),
            site: spec.site,
        }
    }

    fn key_filter(key: &DeviceKey) -> Vec<(&'static str, String)> {
        vec![("name", key.name.clone()), ("site_id", key.site.to_string())]
    }

    fn drift(&self, spec: &DeviceSpec) -> Option<Patch> {
        Drift::default()
            .field("device_type", &self.device_type, &spec.device_type)
            .field("role", &self.role, &spec.role)
            .choice("status", &self.status, &spec.status)
            .tags(&self.tags, &spec.tags)
            .custom_field(
                "cloud_resource_id",
                &self.custom_fields.cloud_resource_id,
                &spec.custom_fields.cloud_resource_id,
            )
            .finish()
    }
}

// ============================================================================
// Interface
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    pub id: RecordId,
    #[serde(deserialize_with = "nested::id")]
    pub device: RecordId,
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "nested::opt_choice")]
    pub interface_type: Option<String>,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default, deserialize_with = "nested::ids")]
    pub tags: Vec<RecordId>,
}

/// Interface natural key: name unique on a device
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceKey {
    pub device: RecordId,
    pub name: String,
}

impl fmt::Display for InterfaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (device {})", self.name, self.device)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceSpec {
    pub device: RecordId,
    pub name: String,
    #[serde(rename = "type")]
    pub interface_type: String,
    pub mac_address: Option<String>,
    pub tags: Vec<RecordId>,
}

impl Resource for Interface {
    const KIND: ResourceKind = ResourceKind::Interface;
    const ENDPOINT: &'static str = "dcim/interfaces";
    type Key = InterfaceKey;
    type Spec = InterfaceSpec;

    fn id(&self) -> RecordId {
        self.id
    }

    fn key(&self) -> InterfaceKey {
        InterfaceKey {
            device: self.device,
            name: self.name.clone(),
        }
    }

    fn spec_key(spec: &InterfaceSpec) -> InterfaceKey {
        InterfaceKey {
            device: spec.device,
            name: spec.name.clone(),
        }
    }

    fn key_filter(key: &InterfaceKey) -> Vec<(&'static str, String)> {
        vec![("device_id", key.device.to_string()), ("name", key.name.clone())]
    }

    /// Only the MAC address is reconciled, and only towards a known value
    fn drift(&self, spec: &InterfaceSpec) -> Option<Patch> {
        let mut drift = Drift::default();
        if let Some(desired) = &spec.mac_address {
            if !same_mac(self.mac_address.as_deref(), desired) {
                drift.set("mac_address", desired);
            }
        }
        drift.finish()
    }
}

fn same_mac(current: Option<&str>, desired: &str) -> bool {
    let Some(current) = current else {
        return false;
    };
    match (MacAddress::new(current), MacAddress::new(desired)) {
        (Ok(a), Ok(b)) => a == b,
        _ => current.eq_ignore_ascii_case(desired),
    }
}

// ============================================================================
// IP address
// ============================================================================

/// Assigned object type for interface assignments
pub const INTERFACE_OBJECT_TYPE: &str = "dcim.interface";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpAddress {
    pub id: RecordId,
    pub address: String,
    #[serde(default, deserialize_with = "nested::opt_choice")]
    pub status: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assigned_object_type: Option<String>,
    #[serde(default)]
    pub assigned_object_id: Option<RecordId>,
    #[serde(default, deserialize_with = "nested::ids")]
    pub tags: Vec<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IpAddressSpec {
    pub address: String,
    pub status: String,
    pub description: String,
    pub tags: Vec<RecordId>,
    pub assigned_object_type: String,
    pub assigned_object_id: RecordId,
}

impl Resource for IpAddress {
    const KIND: ResourceKind = ResourceKind::IpAddress;
    const ENDPOINT: &'static str = "ipam/ip-addresses";
    type Key = String;
    type Spec = IpAddressSpec;

    fn id(&self) -> RecordId {
        self.id
    }

    fn key(&self) -> String {
        self.address.clone()
    }

    fn spec_key(spec: &IpAddressSpec) -> String {
        spec.address.clone()
    }

    fn key_filter(key: &String) -> Vec<(&'static str, String)> {
        vec![("address", key.clone())]
    }

    /// Only the assignment is reconciled
    fn drift(&self, spec: &IpAddressSpec) -> Option<Patch> {
        let mut drift = Drift::default();
        if self.assigned_object_type.as_deref() != Some(spec.assigned_object_type.as_str())
            || self.assigned_object_id != Some(spec.assigned_object_id)
        {
            drift.set("assigned_object_type", &spec.assigned_object_type);
            drift.set("assigned_object_id", &spec.assigned_object_id);
        }
        drift.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_device_from_netbox_response() {
        let device: Device = serde_json::from_value(json!({
            "id": 42,
            "url": "https://netbox.example.com/api/dcim/devices/42/",
            "name": "web-1",
            "device_type": {"id": 3, "model": "Azure VM", "slug": "azure-vm"},
            "role": {"id": 4, "name": "Azure VM"},
            "site": {"id": 5, "slug": "azure-eastus"},
            "status": {"value": "active", "label": "Active"},
            "tags": [{"id": 1, "slug": "azure-sync"}],
            "custom_fields": {"cloud_resource_id": "/subscriptions/s1/vms/web-1", "other": 7}
        }))
        .unwrap();

        assert_eq!(device.device_type, 3);
        assert_eq!(device.role, 4);
        assert_eq!(device.site, 5);
        assert_eq!(device.status.as_deref(), Some("active"));
        assert_eq!(device.tags, vec![1]);
        assert_eq!(
            device.key(),
            DeviceKey {
                name: "web-1".to_string(),
                site: 5
            }
        );
        assert!(device.belongs_to("/SUBSCRIPTIONS/S1/VMS/WEB-1"));
        assert!(!device.belongs_to("/subscriptions/s1/vms/web-2"));
    }

    #[test]
    fn test_legacy_device_role_field_accepted() {
        let device: Device = serde_json::from_value(json!({
            "id": 1,
            "name": null,
            "device_type": 2,
            "device_role": {"id": 9},
            "site": 3,
            "custom_fields": {}
        }))
        .unwrap();

        assert_eq!(device.role, 9);
        assert!(device.belongs_to("anything"));
    }

    #[test]
    fn test_prefix_parent_from_object_custom_field() {
        let prefix: Prefix = serde_json::from_value(json!({
            "id": 12,
            "prefix": "10.0.1.0/24",
            "status": {"value": "active"},
            "custom_fields": {"parent_prefix": {"id": 11, "display": "10.0.0.0/16"}}
        }))
        .unwrap();

        assert_eq!(prefix.parent(), Some(11));
        assert!(prefix.tags.is_empty());
    }

    #[test]
    fn test_prefix_drift_adds_tag_and_parent() {
        let prefix = Prefix {
            id: 12,
            prefix: "10.0.1.0/24".to_string(),
            status: Some("active".to_string()),
            description: "Azure Subnet: web (VNet: core)".to_string(),
            tags: vec![7],
            custom_fields: PrefixCustomFields::default(),
        };
        let spec = PrefixSpec {
            prefix: "10.0.1.0/24".to_string(),
            status: "active".to_string(),
            description: "Azure Subnet: web (VNet: core)".to_string(),
            tags: vec![1],
            custom_fields: PrefixCustomFields {
                parent_prefix: Some(11),
            },
        };

        let patch = prefix.drift(&spec).unwrap();
        assert_eq!(
            Value::Object(patch),
            json!({"tags": [7, 1], "custom_fields": {"parent_prefix": 11}})
        );
    }

    #[test]
    fn test_untagged_manufacturer_gains_tag() {
        let manufacturer: Manufacturer = serde_json::from_value(json!({
            "id": 4,
            "name": "Microsoft Azure",
            "slug": "microsoft-azure"
        }))
        .unwrap();
        assert!(manufacturer.tags.is_empty());

        let spec = ManufacturerSpec {
            name: "Microsoft Azure".to_string(),
            slug: "microsoft-azure".to_string(),
            description: String::new(),
            tags: vec![1],
        };
        let patch = manufacturer.drift(&spec).unwrap();
        assert_eq!(Value::Object(patch), json!({"tags": [1]}));
        assert_eq!(serde_json::to_value(&spec).unwrap()["tags"], json!([1]));
    }

    #[test]
    fn test_in_sync_records_have_no_drift() {
        let tag = Tag {
            id: 1,
            name: "azure-sync".to_string(),
            slug: "azure-sync".to_string(),
            description: "Synced from Azure".to_string(),
        };
        let spec = TagSpec {
            name: "azure-sync".to_string(),
            slug: "azure-sync".to_string(),
            description: "Synced from Azure".to_string(),
        };
        assert_eq!(tag.drift(&spec), None);
    }

    #[test]
    fn test_interface_mac_compared_by_value() {
        let interface = Interface {
            id: 1,
            device: 2,
            name: "eth0".to_string(),
            interface_type: Some("1000base-t".to_string()),
            mac_address: Some("aa:bb:cc:dd:ee:ff".to_string()),
            tags: vec![],
        };
        let mut spec = InterfaceSpec {
            device: 2,
            name: "eth0".to_string(),
            interface_type: "1000base-t".to_string(),
            mac_address: Some("AA:BB:CC:DD:EE:FF".to_string()),
            tags: vec![1],
        };
        assert_eq!(interface.drift(&spec), None);

        spec.mac_address = None;
        assert_eq!(interface.drift(&spec), None);

        spec.mac_address = Some("AA:BB:CC:DD:EE:00".to_string());
        assert!(interface.drift(&spec).is_some());
    }

    #[test]
    fn test_ip_drift_only_touches_assignment() {
        let ip = IpAddress {
            id: 1,
            address: "10.0.1.5/32".to_string(),
            status: Some("active".to_string()),
            description: "hand edited".to_string(),
            assigned_object_type: Some(INTERFACE_OBJECT_TYPE.to_string()),
            assigned_object_id: Some(3),
            tags: vec![],
        };
        let spec = IpAddressSpec {
            address: "10.0.1.5/32".to_string(),
            status: "active".to_string(),
            description: "IP for web-1".to_string(),
            tags: vec![1],
            assigned_object_type: INTERFACE_OBJECT_TYPE.to_string(),
            assigned_object_id: 3,
        };
        assert_eq!(ip.drift(&spec), None);

        let moved = IpAddressSpec {
            assigned_object_id: 4,
            ..spec
        };
        assert_eq!(
            Value::Object(ip.drift(&moved).unwrap()),
            json!({"assigned_object_type": "dcim.interface", "assigned_object_id": 4})
        );
    }
}
