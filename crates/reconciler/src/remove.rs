use crate::options::DeletedOffsetSize;
use gadget_types::{GadgetVolume, OnDiskVolume, Role};

/// The plan produced by the reverse direction of the reconciler: which
/// on-disk indices correspond to structures the installer previously
/// created, and the exact `(offset, size)` each occupied, so a later
/// `create_missing_partitions` can reproduce the identical geometry (I8).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemovalPlan {
    pub disk_indices: Vec<u32>,
    pub deleted: DeletedOffsetSize,
}

/// Identifies previously-installer-created partitions on `disk` so they can
/// be deleted ahead of a reinstall (§4.1 reverse direction, §4.3
/// `RemoveCreatedPartitions` step 1).
///
/// A gadget structure's *expected* start offset is computed the same way
/// `build_partition_list` computes it for creation: the explicit `offset`
/// if present, else packed directly after the previous non-MBR structure.
/// An on-disk structure matches the first not-yet-claimed creatable-role
/// gadget structure whose expected start equals its observed start (I7),
/// walking on-disk structures in disk order so each gadget structure is
/// claimed at most once.
pub fn remove_created_partitions(disk: &OnDiskVolume, gadget: &GadgetVolume) -> RemovalPlan {
    let mut expected: Vec<(usize, Role, u64)> = Vec::new();
    let mut last_end = 0u64;

    for structure in &gadget.structures {
        if structure.is_mbr() {
            continue;
        }

        let offset = structure.offset.unwrap_or(last_end);
        if let Some(role) = structure.role {
            expected.push((structure.yaml_index, role, offset));
        }
        last_end = offset + structure.size;
    }

    let mut claimed = vec![false; expected.len()];
    let mut plan = RemovalPlan::default();

    let mut ordered: Vec<&gadget_types::OnDiskStructure> = disk.structures.iter().collect();
    ordered.sort_by_key(|s| s.disk_index);

    for on_disk in ordered {
        let candidate = expected
            .iter()
            .enumerate()
            .find(|(i, (_, role, start))| !claimed[*i] && role.creatable() && *start == on_disk.start);

        if let Some((i, (yaml_index, _, _))) = candidate {
            claimed[i] = true;
            plan.disk_indices.push(on_disk.disk_index);
            plan.deleted.insert(*yaml_index, (on_disk.start, on_disk.size));
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use gadget_types::{GadgetStructure, OnDiskStructure, PartitionTableSchema, PartitionTypeTag};
    use std::path::PathBuf;

    fn gadget() -> GadgetVolume {
        GadgetVolume {
            name: "pc".into(),
            schema: Some(PartitionTableSchema::Gpt),
            structures: vec![
                GadgetStructure {
                    yaml_index: 0,
                    name: "ubuntu-seed".into(),
                    role: Some(Role::SystemSeed),
                    partition_type: PartitionTypeTag::new("0C"),
                    filesystem_label: None,
                    filesystem: None,
                    size: 1_200 * 1024 * 1024,
                    offset: Some(1024 * 1024),
                },
                GadgetStructure {
                    yaml_index: 1,
                    name: "ubuntu-boot".into(),
                    role: Some(Role::SystemBoot),
                    partition_type: PartitionTypeTag::new("0C"),
                    filesystem_label: None,
                    filesystem: None,
                    size: 750 * 1024 * 1024,
                    offset: None,
                },
                GadgetStructure {
                    yaml_index: 2,
                    name: "ubuntu-save".into(),
                    role: Some(Role::SystemSave),
                    partition_type: PartitionTypeTag::new("83"),
                    filesystem_label: None,
                    filesystem: None,
                    size: 16 * 1024 * 1024,
                    offset: None,
                },
            ],
        }
    }

    #[test]
    fn identifies_creatable_partitions_by_start_offset() {
        let seed_end = 1024 * 1024 + 1_200 * 1024 * 1024;
        let boot_end = seed_end + 750 * 1024 * 1024;

        let disk = OnDiskVolume {
            schema: PartitionTableSchema::Gpt,
            device: PathBuf::from("/dev/mmcblk0"),
            sector_size: 512,
            usable_sectors_end: u64::MAX,
            structures: vec![
                OnDiskStructure {
                    node: PathBuf::from("/dev/mmcblk0p1"),
                    disk_index: 1,
                    start: 1024 * 1024,
                    size: 1_200 * 1024 * 1024,
                    partition_type: "0C".into(),
                    filesystem_label: None,
                    filesystem: None,
                    gadget_yaml_index: None,
                    role: None,
                },
                OnDiskStructure {
                    node: PathBuf::from("/dev/mmcblk0p2"),
                    disk_index: 2,
                    start: seed_end,
                    size: 750 * 1024 * 1024,
                    partition_type: "0C".into(),
                    filesystem_label: None,
                    filesystem: None,
                    gadget_yaml_index: None,
                    role: None,
                },
                OnDiskStructure {
                    node: PathBuf::from("/dev/mmcblk0p3"),
                    disk_index: 3,
                    start: boot_end,
                    size: 16 * 1024 * 1024,
                    partition_type: "83".into(),
                    filesystem_label: None,
                    filesystem: None,
                    gadget_yaml_index: None,
                    role: None,
                },
            ],
        };

        let plan = remove_created_partitions(&disk, &gadget());
        assert_eq!(plan.disk_indices, vec![2, 3]);
        assert_eq!(plan.deleted.get(&1), Some(&(seed_end, 750 * 1024 * 1024)));
        assert_eq!(plan.deleted.get(&2), Some(&(boot_end, 16 * 1024 * 1024)));
    }
}
