//! Demo account: a fixed roster and fake broker identities.

use std::future::Future;

use meshlight_app::ports::{CloudError, CloudSession};
use meshlight_domain::address::MeshAddress;
use meshlight_domain::credentials::{ChannelKind, ControlCredentials};
use meshlight_domain::device::Device;

/// Group shared by the two living-room lamps.
pub const LIVING_ROOM_GROUP: u16 = 100;
/// Group spanning every light downstairs.
pub const DOWNSTAIRS_GROUP: u16 = 101;

/// Cloud session backed by a built-in demo roster.
#[derive(Debug, Clone, Default)]
pub struct VirtualSession;

impl VirtualSession {
    /// The demo roster: four lights and one non-light device.
    #[must_use]
    pub fn devices() -> Vec<Device> {
        let specs: [(u16, &str, u32, &[u16]); 5] = [
            (2, "Living Room Lamp", 1, &[LIVING_ROOM_GROUP, DOWNSTAIRS_GROUP]),
            (3, "Living Room Strip", 1, &[LIVING_ROOM_GROUP, DOWNSTAIRS_GROUP]),
            (4, "Kitchen", 1, &[DOWNSTAIRS_GROUP]),
            (5, "Bedroom", 1, &[0]),
            (6, "Mesh Gateway", 0, &[]),
        ];
        specs
            .into_iter()
            .filter_map(|(address, name, wiring_type, groups)| {
                Some(Device {
                    unique_id: format!("virtual-{address:04}"),
                    mac_address: format!("02:00:00:00:00:{address:02X}"),
                    display_name: name.to_string(),
                    mesh_address: MeshAddress::new(address).ok()?,
                    device_type: 1,
                    control_type: 1,
                    wiring_type,
                    groups: groups.to_vec(),
                })
            })
            .collect()
    }

    fn credentials() -> Vec<ControlCredentials> {
        [
            (ChannelKind::Hardware, "virtual-hw"),
            (ChannelKind::Software, "virtual-sw"),
        ]
        .into_iter()
        .map(|(kind, name)| ControlCredentials {
            kind,
            device_name: name.to_string(),
            product_key: "virtual".to_string(),
            device_secret: "virtual".to_string(),
        })
        .collect()
    }
}

impl CloudSession for VirtualSession {
    fn login(&self) -> impl Future<Output = Result<(), CloudError>> + Send {
        std::future::ready(Ok(()))
    }

    fn fetch_devices(&self) -> impl Future<Output = Result<Vec<Device>, CloudError>> + Send {
        std::future::ready(Ok(Self::devices()))
    }

    fn fetch_broker_credentials(
        &self,
    ) -> impl Future<Output = Result<Vec<ControlCredentials>, CloudError>> + Send {
        std::future::ready(Ok(Self::credentials()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshlight_app::setup::bootstrap_roster;
    use meshlight_domain::address::GroupId;

    #[tokio::test]
    async fn should_bootstrap_demo_roster() {
        let bootstrap = bootstrap_roster(&VirtualSession).await.unwrap();

        assert_eq!(bootstrap.roster.devices().len(), 5);
        assert_eq!(bootstrap.roster.lights().count(), 4);
        assert_eq!(bootstrap.channels.software.device_name, "virtual-sw");
    }

    #[tokio::test]
    async fn should_derive_demo_groups() {
        let bootstrap = bootstrap_roster(&VirtualSession).await.unwrap();
        let groups = bootstrap.roster.groups();

        let living_room = groups.members(GroupId::new(LIVING_ROOM_GROUP).unwrap()).unwrap();
        assert_eq!(living_room.len(), 2);
        let downstairs = groups.members(GroupId::new(DOWNSTAIRS_GROUP).unwrap()).unwrap();
        assert_eq!(downstairs.len(), 3);
    }
}
