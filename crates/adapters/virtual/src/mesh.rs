//! In-memory mesh bridge implementing [`MeshTransport`].
//!
//! Every control message is recorded, applied to the bulbs it addresses
//! (expanding groups through the roster's [`GroupIndex`]) and answered with
//! a status message on the feed, just like the real bridge does.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use meshlight_app::ports::{MeshTransport, StatusFeed, TransportError};
use meshlight_domain::address::{GroupId, MeshAddress};
use meshlight_domain::device::{GroupIndex, Roster};
use meshlight_domain::message::{ControlMessage, StatusEntry};
use tokio::sync::mpsc;

use crate::bulb::VirtualBulb;

const FEED_CAPACITY: usize = 64;

/// Simulated mesh of bulbs, one per light in the roster.
pub struct VirtualMesh {
    groups: GroupIndex,
    bulbs: Mutex<BTreeMap<MeshAddress, VirtualBulb>>,
    published: Mutex<Vec<ControlMessage>>,
    dropping: AtomicUsize,
    feed: mpsc::Sender<Vec<u8>>,
}

impl VirtualMesh {
    /// Build the mesh and the feed its status messages are pushed into.
    #[must_use]
    pub fn new(roster: &Roster) -> (Self, StatusFeed) {
        let (feed, status) = mpsc::channel(FEED_CAPACITY);
        let bulbs = roster
            .lights()
            .map(|device| (device.mesh_address, VirtualBulb::default()))
            .collect();
        let mesh = Self {
            groups: roster.groups().clone(),
            bulbs: Mutex::new(bulbs),
            published: Mutex::new(Vec::new()),
            dropping: AtomicUsize::new(0),
            feed,
        };
        (mesh, status)
    }

    /// Silently lose the next `count` control messages, as a congested
    /// mesh would.
    pub fn drop_next(&self, count: usize) {
        self.dropping.store(count, Ordering::SeqCst);
    }

    /// Every control message received so far, lost ones included.
    #[must_use]
    pub fn published(&self) -> Vec<ControlMessage> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of one bulb.
    #[must_use]
    pub fn bulb(&self, address: MeshAddress) -> Option<VirtualBulb> {
        self.bulbs().get(&address).cloned()
    }

    fn bulbs(&self) -> MutexGuard<'_, BTreeMap<MeshAddress, VirtualBulb>> {
        self.bulbs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_drop(&self) -> bool {
        self.dropping
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }

    fn targets(&self, wire_address: u16) -> Vec<MeshAddress> {
        let Ok(address) = MeshAddress::new(wire_address) else {
            return Vec::new();
        };
        if self.bulbs().contains_key(&address) {
            return vec![address];
        }
        GroupId::new(wire_address)
            .ok()
            .and_then(|group| self.groups.members(group))
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    fn deliver(&self, message: &ControlMessage) -> Vec<StatusEntry> {
        let targets = self.targets(message.destination);
        let mut bulbs = self.bulbs();
        let mut entries = Vec::with_capacity(targets.len());
        for address in targets {
            let Some(bulb) = bulbs.get_mut(&address) else {
                continue;
            };
            if !bulb.apply(message.op_code, &message.data) {
                tracing::warn!(
                    %address,
                    op_code = %message.op_code,
                    data = %message.data,
                    "virtual bulb ignored unknown payload"
                );
                continue;
            }
            entries.push(StatusEntry {
                address: address.get(),
                data: bulb.status(),
            });
        }
        entries
    }

    fn push_status(&self, entries: &[StatusEntry]) -> Result<(), TransportError> {
        if entries.is_empty() {
            return Ok(());
        }
        let payload =
            serde_json::to_vec(entries).map_err(|err| TransportError::Rejected(Box::new(err)))?;
        match self.feed.try_send(payload) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("status feed full, dropping virtual status message");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(TransportError::Disconnected),
        }
    }
}

impl MeshTransport for VirtualMesh {
    fn publish_control(
        &self,
        message: &ControlMessage,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());

        let result = if self.take_drop() {
            tracing::debug!(destination = message.destination, "virtual mesh lost message");
            Ok(())
        } else {
            let entries = self.deliver(message);
            if entries.is_empty() {
                tracing::debug!(destination = message.destination, "no virtual bulb addressed");
            }
            self.push_status(&entries)
        };
        std::future::ready(result)
    }

    fn request_status(&self) -> impl Future<Output = Result<(), TransportError>> + Send {
        let entries: Vec<_> = self
            .bulbs()
            .iter()
            .map(|(address, bulb)| StatusEntry {
                address: address.get(),
                data: bulb.status(),
            })
            .collect();
        std::future::ready(self.push_status(&entries))
    }
}
