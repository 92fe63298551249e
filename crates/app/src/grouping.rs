//! Grouping engine — compacts a flushed batch into as few commands as
//! possible by addressing whole groups.
//!
//! Commands are partitioned by operation code, then by payload. Within a
//! partition, a group broadcast replaces the per-device commands only when
//! every member of the group is among the partition's destinations, so a
//! broadcast never reaches a bulb that was not asked to change.
//!
//! Partitions are arranged in layers. A bulb's commands always land in
//! strictly increasing layers, so whatever the grouping, every bulb still
//! receives its commands in submission order.

use std::collections::{BTreeSet, HashMap};

use meshlight_domain::address::{Destination, GroupId, MeshAddress};
use meshlight_domain::command::{OpCode, OutboundCommand};
use meshlight_domain::device::GroupIndex;

/// Commands sharing the same operation code and payload within one layer.
struct Partition {
    layer: usize,
    op_code: OpCode,
    payload: String,
    devices: BTreeSet<MeshAddress>,
    groups: Vec<GroupId>,
}

/// Rewrite `pending` into the commands to publish.
///
/// - A later command for the same destination and operation code replaces
///   an earlier one.
/// - Two surviving commands reaching the same bulb are published in the
///   order they were submitted. A group command reaches all its members.
/// - Partitions are emitted layer by layer, in order of first appearance
///   within a layer. Within each, group-addressed commands come first, then
///   per-device commands in ascending address order.
/// - Candidate groups are tried largest first, then by id; a group is used
///   only if none of its members is already covered.
#[must_use]
pub fn compact(pending: Vec<OutboundCommand>, groups: &GroupIndex) -> Vec<OutboundCommand> {
    let mut partitions: Vec<Partition> = Vec::new();
    // Layer of the last command placed for each destination.
    let mut depth: HashMap<Destination, usize> = HashMap::new();

    for command in latest_per_destination(pending) {
        let touched = reached(command.destination, groups);
        let floor = touched
            .iter()
            .filter_map(|destination| depth.get(destination).map(|layer| layer + 1))
            .max()
            .unwrap_or(0);

        let existing = partitions
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                p.layer >= floor && p.op_code == command.op_code && p.payload == command.payload
            })
            .min_by_key(|(_, p)| p.layer)
            .map(|(index, _)| index);
        let index = if let Some(index) = existing {
            index
        } else {
            partitions.push(Partition {
                layer: floor,
                op_code: command.op_code,
                payload: command.payload.clone(),
                devices: BTreeSet::new(),
                groups: Vec::new(),
            });
            partitions.len() - 1
        };

        let partition = &mut partitions[index];
        for destination in touched {
            depth.insert(destination, partition.layer);
        }
        match command.destination {
            Destination::Device(address) => {
                partition.devices.insert(address);
            }
            Destination::Group(group) => partition.groups.push(group),
        }
    }
    partitions.sort_by_key(|p| p.layer);

    let candidates = candidate_groups(groups);
    let mut output = Vec::new();
    for partition in partitions {
        let mut uncovered = partition.devices;
        let mut group_targets = partition.groups;
        for (group, members) in &candidates {
            if members.is_subset(&uncovered) {
                for member in *members {
                    uncovered.remove(member);
                }
                group_targets.push(*group);
            }
        }

        output.extend(group_targets.into_iter().map(|group| {
            OutboundCommand::new(group.into(), partition.op_code, partition.payload.clone())
        }));
        output.extend(uncovered.into_iter().map(|address| {
            OutboundCommand::new(address.into(), partition.op_code, partition.payload.clone())
        }));
    }
    output
}

/// Every destination whose ordering a command to `destination` affects.
fn reached(destination: Destination, groups: &GroupIndex) -> Vec<Destination> {
    let mut reached = vec![destination];
    if let Destination::Group(group) = destination {
        reached.extend(
            groups
                .members(group)
                .into_iter()
                .flatten()
                .map(|member| Destination::Device(*member)),
        );
    }
    reached
}

/// Keep only the last command per (destination, operation code), in the
/// order those survivors were submitted.
fn latest_per_destination(pending: Vec<OutboundCommand>) -> Vec<OutboundCommand> {
    let mut last: HashMap<(Destination, OpCode), usize> = HashMap::with_capacity(pending.len());
    for (index, command) in pending.iter().enumerate() {
        last.insert((command.destination, command.op_code), index);
    }
    pending
        .into_iter()
        .enumerate()
        .filter(|(index, command)| last.get(&(command.destination, command.op_code)) == Some(index))
        .map(|(_, command)| command)
        .collect()
}

fn candidate_groups(groups: &GroupIndex) -> Vec<(GroupId, &BTreeSet<MeshAddress>)> {
    let mut candidates: Vec<_> = groups
        .iter()
        .filter(|(_, members)| !members.is_empty())
        .collect();
    candidates.sort_by(|(a_id, a), (b_id, b)| b.len().cmp(&a.len()).then(a_id.cmp(b_id)));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshlight_domain::command::{set_color, turn_off, turn_on};

    fn addr(value: u16) -> MeshAddress {
        MeshAddress::new(value).unwrap()
    }

    fn group(value: u16) -> GroupId {
        GroupId::new(value).unwrap()
    }

    fn index(groups: &[(u16, &[u16])]) -> GroupIndex {
        GroupIndex::from_groups(groups.iter().map(|(id, members)| {
            (group(*id), members.iter().map(|m| addr(*m)).collect())
        }))
    }

    fn red(address: u16) -> OutboundCommand {
        set_color(addr(address), 255, 0, 0).unwrap()
    }

    #[test]
    fn should_emit_single_group_command_for_full_group() {
        let groups = index(&[(1, &[10, 11, 12])]);
        let output = compact(vec![red(10), red(11), red(12)], &groups);
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].destination, Destination::Group(group(1)));
        assert_eq!(output[0].payload, red(10).payload);
    }

    #[test]
    fn should_send_individually_for_partial_group() {
        let groups = index(&[(1, &[10, 11, 12])]);
        let output = compact(vec![red(11), red(10)], &groups);
        let destinations: Vec<_> = output.iter().map(|c| c.destination).collect();
        assert_eq!(
            destinations,
            vec![Destination::Device(addr(10)), Destination::Device(addr(11))]
        );
    }

    #[test]
    fn should_never_merge_different_payloads() {
        let groups = index(&[(1, &[10, 11])]);
        let blue = set_color(addr(11), 0, 0, 255).unwrap();
        let output = compact(vec![red(10), blue], &groups);
        assert_eq!(output.len(), 2);
        assert!(output.iter().all(|c| matches!(c.destination, Destination::Device(_))));
    }

    #[test]
    fn should_partition_by_op_code() {
        let groups = index(&[(1, &[10, 11])]);
        let output = compact(vec![turn_on(addr(10)), turn_on(addr(11)), red(11)], &groups);
        assert_eq!(output.len(), 2);
        assert_eq!(output[0], turn_on(Destination::Group(group(1))));
        assert_eq!(output[1], red(11));
    }

    #[test]
    fn should_keep_latest_command_per_destination() {
        let groups = GroupIndex::default();
        let output = compact(vec![turn_on(addr(10)), turn_off(addr(10))], &groups);
        assert_eq!(output, vec![turn_off(addr(10))]);
    }

    #[test]
    fn should_cover_remaining_members_with_smaller_group() {
        let groups = index(&[(1, &[10, 11, 12]), (2, &[13, 14]), (3, &[12, 13])]);
        let output = compact((10..=14).map(red).collect(), &groups);
        let destinations: Vec<_> = output.iter().map(|c| c.destination).collect();
        assert_eq!(
            destinations,
            vec![
                Destination::Group(group(1)),
                Destination::Group(group(2)),
            ]
        );
    }

    #[test]
    fn should_not_cover_an_address_twice() {
        let groups = index(&[(1, &[10, 11]), (2, &[11, 12])]);
        let output = compact(vec![red(10), red(11), red(12)], &groups);
        let destinations: Vec<_> = output.iter().map(|c| c.destination).collect();
        assert_eq!(
            destinations,
            vec![Destination::Group(group(1)), Destination::Device(addr(12))]
        );
    }

    #[test]
    fn should_pass_group_commands_through() {
        let groups = index(&[(1, &[10, 11])]);
        let broadcast = turn_off(Destination::Group(group(7)));
        let output = compact(vec![broadcast.clone()], &groups);
        assert_eq!(output, vec![broadcast]);
    }

    #[test]
    fn should_emit_partitions_in_first_appearance_order() {
        let groups = GroupIndex::default();
        let output = compact(vec![turn_off(addr(12)), red(10), turn_off(addr(11))], &groups);
        assert_eq!(output, vec![turn_off(addr(11)), turn_off(addr(12)), red(10)]);
    }

    #[test]
    fn should_keep_submission_order_per_device_across_op_codes() {
        let groups = GroupIndex::default();
        let output = compact(vec![red(11), turn_off(addr(10)), red(10)], &groups);
        assert_eq!(output, vec![red(11), turn_off(addr(10)), red(10)]);
    }

    #[test]
    fn should_still_group_commands_queued_after_another_op_code() {
        let groups = index(&[(1, &[10, 11])]);
        let output = compact(vec![turn_on(addr(10)), red(10), red(11)], &groups);
        assert_eq!(
            output,
            vec![
                turn_on(addr(10)),
                set_color(Destination::Group(group(1)), 255, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn should_order_device_command_after_earlier_group_broadcast() {
        let groups = index(&[(1, &[10, 11])]);
        let broadcast = turn_off(Destination::Group(group(1)));
        let output = compact(vec![red(12), broadcast.clone(), red(10)], &groups);
        assert_eq!(output, vec![red(12), broadcast, red(10)]);
    }
}
