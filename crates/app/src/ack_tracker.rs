//! Delivery confirmation bookkeeping.
//!
//! Every inbound status entry counts as an observation of its address.
//! Arming a command right before it is published snapshots the observation
//! counters of the addresses it targets; the command is confirmed once each
//! of them has been observed again since.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use meshlight_domain::address::{Destination, MeshAddress};
use meshlight_domain::command::OutboundCommand;
use meshlight_domain::device::GroupIndex;
use tokio::time::Instant;

#[derive(Debug, Default, Clone, Copy)]
struct AckEntry {
    last_seen: Option<Instant>,
    observations: u64,
}

/// A published command waiting for its status echo.
#[derive(Debug, Clone)]
pub struct PendingAck {
    pub command: OutboundCommand,
    pub armed_at: Instant,
    baseline: Vec<(MeshAddress, u64)>,
}

/// Per-address record of the last status notification.
#[derive(Debug)]
pub struct AckTracker {
    groups: GroupIndex,
    entries: Mutex<HashMap<MeshAddress, AckEntry>>,
}

impl AckTracker {
    #[must_use]
    pub fn new(groups: GroupIndex) -> Self {
        Self {
            groups,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<MeshAddress, AckEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a status notification for `address`.
    pub fn observe(&self, address: MeshAddress) {
        let mut entries = self.entries();
        let entry = entries.entry(address).or_default();
        entry.last_seen = Some(Instant::now());
        entry.observations += 1;
    }

    /// When `address` last reported, if ever.
    #[must_use]
    pub fn last_seen(&self, address: MeshAddress) -> Option<Instant> {
        self.entries().get(&address).and_then(|entry| entry.last_seen)
    }

    /// Start waiting for the echo of a command about to be published.
    #[must_use]
    pub fn arm(&self, command: OutboundCommand) -> PendingAck {
        let entries = self.entries();
        let baseline = self
            .targets(command.destination)
            .into_iter()
            .map(|address| {
                let seen = entries.get(&address).map_or(0, |entry| entry.observations);
                (address, seen)
            })
            .collect();
        PendingAck {
            command,
            armed_at: Instant::now(),
            baseline,
        }
    }

    /// Whether every address targeted by `pending` reported since it was
    /// armed.
    #[must_use]
    pub fn is_confirmed(&self, pending: &PendingAck) -> bool {
        let entries = self.entries();
        pending.baseline.iter().all(|(address, seen)| {
            entries
                .get(address)
                .is_some_and(|entry| entry.observations > *seen)
        })
    }

    fn targets(&self, destination: Destination) -> Vec<MeshAddress> {
        match destination {
            Destination::Device(address) => vec![address],
            Destination::Group(group) => self
                .groups
                .members(group)
                .map(|members| members.iter().copied().collect())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshlight_domain::address::GroupId;
    use meshlight_domain::command::turn_on;

    fn addr(value: u16) -> MeshAddress {
        MeshAddress::new(value).unwrap()
    }

    fn tracker() -> AckTracker {
        let group = GroupId::new(1).unwrap();
        AckTracker::new(GroupIndex::from_groups([(
            group,
            [addr(10), addr(11)].into_iter().collect(),
        )]))
    }

    #[test]
    fn should_not_confirm_without_observation() {
        let acks = tracker();
        let pending = acks.arm(turn_on(addr(10)));
        assert!(!acks.is_confirmed(&pending));
    }

    #[test]
    fn should_confirm_after_observation() {
        let acks = tracker();
        let pending = acks.arm(turn_on(addr(10)));
        acks.observe(addr(10));
        assert!(acks.is_confirmed(&pending));
    }

    #[test]
    fn should_ignore_observations_before_arming() {
        let acks = tracker();
        acks.observe(addr(10));
        let pending = acks.arm(turn_on(addr(10)));
        assert!(!acks.is_confirmed(&pending));
        assert!(acks.last_seen(addr(10)).is_some());
    }

    #[test]
    fn should_require_every_group_member() {
        let acks = tracker();
        let pending = acks.arm(turn_on(Destination::Group(GroupId::new(1).unwrap())));
        acks.observe(addr(10));
        assert!(!acks.is_confirmed(&pending));
        acks.observe(addr(11));
        assert!(acks.is_confirmed(&pending));
    }

    #[test]
    fn should_not_confirm_through_other_address() {
        let acks = tracker();
        let pending = acks.arm(turn_on(addr(10)));
        acks.observe(addr(11));
        assert!(!acks.is_confirmed(&pending));
        assert!(acks.last_seen(addr(12)).is_none());
    }
}
