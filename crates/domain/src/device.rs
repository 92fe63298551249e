//! Device roster — the mesh devices fetched once from the cloud at startup.
//!
//! Groups are not stored entities: the [`GroupIndex`] is derived from the
//! group memberships each [`Device`] lists.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::address::{GroupId, MeshAddress};
use crate::error::ValidationError;

/// A mesh device as reported by the cloud roster.
///
/// Field aliases accept the vendor's camel-cased JSON keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    #[serde(alias = "uniID")]
    pub unique_id: String,
    #[serde(alias = "macAddress")]
    pub mac_address: String,
    #[serde(alias = "displayName")]
    pub display_name: String,
    #[serde(alias = "meshAddress")]
    pub mesh_address: MeshAddress,
    #[serde(default, alias = "deviceType")]
    pub device_type: u32,
    #[serde(default, alias = "controlType")]
    pub control_type: u32,
    #[serde(default, alias = "wiringType")]
    pub wiring_type: u32,
    /// Raw group memberships; `0` means "no group".
    #[serde(default)]
    pub groups: Vec<u16>,
}

impl Device {
    /// Whether the device drives a light (non-zero wiring type).
    #[must_use]
    pub fn is_light(&self) -> bool {
        self.wiring_type != 0
    }

    /// Group memberships with the "ungrouped" marker removed.
    pub fn group_ids(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.groups.iter().filter_map(|raw| GroupId::new(*raw).ok())
    }
}

/// Mapping from group id to the mesh addresses enrolled in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupIndex {
    groups: BTreeMap<GroupId, BTreeSet<MeshAddress>>,
}

impl GroupIndex {
    /// Derive the index from device memberships.
    #[must_use]
    pub fn from_devices(devices: &[Device]) -> Self {
        let mut groups: BTreeMap<GroupId, BTreeSet<MeshAddress>> = BTreeMap::new();
        for device in devices {
            for group in device.group_ids() {
                groups.entry(group).or_default().insert(device.mesh_address);
            }
        }
        Self { groups }
    }

    /// Build an index from explicit memberships.
    pub fn from_groups(groups: impl IntoIterator<Item = (GroupId, BTreeSet<MeshAddress>)>) -> Self {
        Self {
            groups: groups
                .into_iter()
                .filter(|(_, members)| !members.is_empty())
                .collect(),
        }
    }

    /// Members of `group`, if the group is known.
    #[must_use]
    pub fn members(&self, group: GroupId) -> Option<&BTreeSet<MeshAddress>> {
        self.groups.get(&group)
    }

    /// Iterate groups in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (GroupId, &BTreeSet<MeshAddress>)> {
        self.groups.iter().map(|(id, members)| (*id, members))
    }

    /// Number of known groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no device belongs to any group.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// The full device list for one session, immutable once fetched.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    devices: Vec<Device>,
    groups: GroupIndex,
}

impl Roster {
    /// Build a roster, enforcing unique mesh addresses.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateMeshAddress`] when two devices
    /// share an address.
    pub fn new(devices: Vec<Device>) -> Result<Self, ValidationError> {
        let mut seen = HashSet::with_capacity(devices.len());
        for device in &devices {
            if !seen.insert(device.mesh_address) {
                return Err(ValidationError::DuplicateMeshAddress(
                    device.mesh_address.get(),
                ));
            }
        }
        let groups = GroupIndex::from_devices(&devices);
        Ok(Self { devices, groups })
    }

    /// All devices, in roster order.
    #[must_use]
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Devices exposed as lights.
    pub fn lights(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter().filter(|device| device.is_light())
    }

    /// Look a device up by mesh address.
    #[must_use]
    pub fn get(&self, address: MeshAddress) -> Option<&Device> {
        self.devices
            .iter()
            .find(|device| device.mesh_address == address)
    }

    /// The derived group index.
    #[must_use]
    pub fn groups(&self) -> &GroupIndex {
        &self.groups
    }

    /// Whether the roster holds no device at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
