//! Domain descriptor decoding.
//!
//! The descriptor is the XML configuration libvirt returns for a domain.
//! Only the parts needed to enrich bulk statistics are decoded: the disk and
//! interface device lists and the OpenStack Nova `<metadata>` block.
//! Prefixed elements (`nova:instance`) match by local name.

use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{HypervisorError, Result};

// =============================================================================
// RAW XML SHAPE
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DomainXml {
    metadata: MetadataXml,
    devices: DevicesXml,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetadataXml {
    instance: Option<InstanceXml>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InstanceXml {
    name: String,
    flavor: FlavorXml,
    owner: OwnerXml,
    root: RootXml,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FlavorXml {
    #[serde(rename = "@name")]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwnerXml {
    user: NamedRefXml,
    project: NamedRefXml,
}

/// `<nova:user uuid="...">name</nova:user>`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NamedRefXml {
    #[serde(rename = "@uuid")]
    uuid: String,
    #[serde(rename = "$text")]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RootXml {
    #[serde(rename = "@type")]
    kind: String,
    #[serde(rename = "@uuid")]
    uuid: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DevicesXml {
    disk: Vec<DiskXml>,
    interface: Vec<InterfaceXml>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DiskXml {
    #[serde(rename = "@type")]
    kind: String,
    serial: String,
    target: DiskTargetXml,
    driver: DriverXml,
    source: DiskSourceXml,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DiskTargetXml {
    #[serde(rename = "@dev")]
    dev: String,
    #[serde(rename = "@bus")]
    bus: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DriverXml {
    #[serde(rename = "@type")]
    kind: String,
    #[serde(rename = "@cache")]
    cache: String,
    #[serde(rename = "@discard")]
    discard: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DiskSourceXml {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@file")]
    file: String,
    #[serde(rename = "@dev")]
    dev: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InterfaceXml {
    target: InterfaceTargetXml,
    source: InterfaceSourceXml,
    virtualport: VirtualPortXml,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InterfaceTargetXml {
    #[serde(rename = "@dev")]
    dev: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InterfaceSourceXml {
    #[serde(rename = "@bridge")]
    bridge: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VirtualPortXml {
    parameters: VirtualPortParamsXml,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VirtualPortParamsXml {
    #[serde(rename = "@interfaceid")]
    interface_id: String,
}

// =============================================================================
// PUBLIC VIEW
// =============================================================================

/// Static attributes of one disk, keyed by its target device name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskDescriptor {
    pub target: String,
    pub serial: String,
    pub bus: String,
    /// Disk type attribute (`file`, `block`, `network`, ...)
    pub disk_type: String,
    pub driver_type: String,
    pub cache: String,
    pub discard: String,
    /// Source name for network disks, else the file or device path
    pub source_name: String,
}

/// Static attributes of one network interface, keyed by its target device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub target: String,
    pub source_bridge: String,
    /// Open vSwitch virtual port interface id
    pub virtual_interface: String,
}

/// Ownership metadata written by the cloud layer. Every field is an empty
/// string when the domain carries no such metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerMetadata {
    pub instance_name: String,
    pub flavor: String,
    pub user_name: String,
    pub user_uuid: String,
    pub project_name: String,
    pub project_uuid: String,
    pub root_type: String,
    pub root_uuid: String,
}

/// Decoded domain descriptor with per-device lookup tables.
#[derive(Debug, Clone, Default)]
pub struct DomainDescriptor {
    pub metadata: OwnerMetadata,
    disks: HashMap<String, DiskDescriptor>,
    interfaces: HashMap<String, InterfaceDescriptor>,
}

impl DomainDescriptor {
    /// Decode a domain descriptor from its XML text.
    pub fn parse(xml: &str) -> Result<Self> {
        let raw: DomainXml = quick_xml::de::from_str(xml)
            .map_err(|e| HypervisorError::Descriptor(e.to_string()))?;

        let metadata = raw
            .metadata
            .instance
            .map(|i| OwnerMetadata {
                instance_name: i.name,
                flavor: i.flavor.name,
                user_name: i.owner.user.name,
                user_uuid: i.owner.user.uuid,
                project_name: i.owner.project.name,
                project_uuid: i.owner.project.uuid,
                root_type: i.root.kind,
                root_uuid: i.root.uuid,
            })
            .unwrap_or_default();

        let mut disks = HashMap::new();
        for d in raw.devices.disk {
            let source_name = [d.source.name, d.source.file, d.source.dev]
                .into_iter()
                .find(|s| !s.is_empty())
                .unwrap_or_default();
            // First entry wins when a target name repeats
            disks.entry(d.target.dev.clone()).or_insert(DiskDescriptor {
                target: d.target.dev,
                serial: d.serial,
                bus: d.target.bus,
                disk_type: d.kind,
                driver_type: d.driver.kind,
                cache: d.driver.cache,
                discard: d.driver.discard,
                source_name,
            });
        }

        let mut interfaces = HashMap::new();
        for i in raw.devices.interface {
            interfaces
                .entry(i.target.dev.clone())
                .or_insert(InterfaceDescriptor {
                    target: i.target.dev,
                    source_bridge: i.source.bridge,
                    virtual_interface: i.virtualport.parameters.interface_id,
                });
        }

        Ok(Self {
            metadata,
            disks,
            interfaces,
        })
    }

    /// Look up a disk by target device name.
    pub fn disk(&self, target: &str) -> Option<&DiskDescriptor> {
        self.disks.get(target)
    }

    /// Look up an interface by target device name.
    pub fn interface(&self, target: &str) -> Option<&InterfaceDescriptor> {
        self.interfaces.get(target)
    }

    /// Number of disks in the descriptor.
    pub fn disk_count(&self) -> usize {
        self.disks.len()
    }

    /// Number of interfaces in the descriptor.
    pub fn interface_count(&self) -> usize {
        self.interfaces.len()
    }
}
