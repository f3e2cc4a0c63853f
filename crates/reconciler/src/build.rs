use crate::{checker::VolumeCompatibilityChecker, error::ReconcileError, options::{DeletedOffsetSize, ReconcileOptions}};
use gadget_types::{GadgetStructure, GadgetVolume, OnDiskVolume, PartitionTableSchema, Role, SectorExt};
use std::fmt::Write as _;

/// One gadget structure the reconciler has decided to create, with its
/// planned on-disk geometry (§4.1's "list of {disk-structure,
/// gadget-structure} pairs").
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStructure {
    pub gadget: GadgetStructure,
    pub disk_index: u32,
    pub node: std::path::PathBuf,
    pub start_sector: u64,
    pub size_sectors: u64,
}

/// Computes the partition-table edit script and the list of structures
/// that need to be created, per §4.1's forward algorithm.
pub fn build_partition_list(
    disk: &OnDiskVolume,
    gadget: &GadgetVolume,
    opts: &ReconcileOptions,
    deleted: &DeletedOffsetSize,
    checker: &dyn VolumeCompatibilityChecker,
) -> Result<(String, Vec<PlannedStructure>), ReconcileError> {
    // Step 1: emmc is managed entirely outside the installer.
    if disk.schema == PartitionTableSchema::Emmc {
        return Ok((String::new(), Vec::new()));
    }

    // Step 2: new partitions continue from the highest existing disk index.
    let mut next_disk_index = disk.max_disk_index() + 1;

    // Step 3: resolve already-matched gadget structures.
    let matched = if opts.create_all_missing {
        Default::default()
    } else {
        checker.ensure_compatible(gadget, disk, opts)?
    };

    // Step 4: expand-data applies iff the last structure is system-data.
    let expand_data = gadget.expands_data();

    let sector_size = disk.sector_size();
    let mut script = String::new();
    let mut planned = Vec::new();
    let mut last_end_bytes = 0u64;

    for structure in &gadget.structures {
        if structure.is_mbr() {
            continue;
        }

        if let Some(existing) = matched.get(&structure.yaml_index) {
            last_end_bytes = existing.end();
            continue;
        }

        let (offset, size) = match deleted.get(&structure.yaml_index) {
            Some((offset, size)) => (*offset, *size),
            None => (structure.offset.unwrap_or(last_end_bytes), structure.size),
        };

        if !opts.create_all_missing && !structure.role.map_or(false, Role::creatable) {
            return Err(ReconcileError::NotCreatable {
                index: structure.yaml_index,
                name: structure.name.clone(),
            });
        }

        let start_sector = offset / sector_size;
        let mut size_sectors = size / sector_size;

        if structure.role == Some(Role::SystemData)
            && expand_data
            && start_sector + size_sectors < disk.usable_sectors_end
        {
            size_sectors = disk.usable_sectors_end - start_sector;
        }

        let node = sector_math::device_name(&disk.device, next_disk_index);
        let type_tag = structure.partition_type.resolve(disk.schema);

        writeln!(
            script,
            "{} : start={}, size={}, type={}, name=\"{}\"",
            node.display(),
            start_sector,
            size_sectors,
            type_tag,
            structure.name,
        )
        .expect("writing to a String cannot fail");

        planned.push(PlannedStructure {
            gadget: structure.clone(),
            disk_index: next_disk_index,
            node,
            start_sector,
            size_sectors,
        });

        last_end_bytes = offset + size;
        next_disk_index += 1;
    }

    Ok((script, planned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gadget_types::PartitionTypeTag;
    use std::collections::BTreeMap;

    const MIB: u64 = 1024 * 1024;

    /// Matches every gadget structure whose yaml-index has a corresponding
    /// on-disk structure tagged with that same yaml-index — standing in for
    /// the external volume-compatibility checker (§6) across these tests.
    struct MatchByYamlIndexChecker;

    impl VolumeCompatibilityChecker for MatchByYamlIndexChecker {
        fn ensure_compatible(
            &self,
            _volume: &GadgetVolume,
            disk: &OnDiskVolume,
            _opts: &ReconcileOptions,
        ) -> Result<BTreeMap<usize, gadget_types::OnDiskStructure>, ReconcileError> {
            let mut map = BTreeMap::new();
            for s in &disk.structures {
                if let Some(idx) = s.gadget_yaml_index {
                    map.insert(idx, s.clone());
                }
            }
            Ok(map)
        }
    }

    fn pi_gadget() -> GadgetVolume {
        GadgetVolume {
            name: "pi".into(),
            schema: Some(PartitionTableSchema::Dos),
            structures: vec![
                GadgetStructure {
                    yaml_index: 0,
                    name: "mbr".into(),
                    role: Some(Role::Mbr),
                    partition_type: PartitionTypeTag::new("bare"),
                    filesystem_label: None,
                    filesystem: None,
                    size: 1 * MIB,
                    offset: Some(0),
                },
                GadgetStructure {
                    yaml_index: 1,
                    name: "ubuntu-seed".into(),
                    role: Some(Role::SystemSeed),
                    partition_type: PartitionTypeTag::new("0C"),
                    filesystem_label: Some("ubuntu-seed".into()),
                    filesystem: None,
                    size: 1_200 * MIB,
                    offset: Some(1 * MIB),
                },
                GadgetStructure {
                    yaml_index: 2,
                    name: "ubuntu-boot".into(),
                    role: Some(Role::SystemBoot),
                    partition_type: PartitionTypeTag::new("0C"),
                    filesystem_label: Some("ubuntu-boot".into()),
                    filesystem: None,
                    size: 750 * MIB,
                    offset: None,
                },
                GadgetStructure {
                    yaml_index: 3,
                    name: "ubuntu-save".into(),
                    role: Some(Role::SystemSave),
                    partition_type: PartitionTypeTag::new("83"),
                    filesystem_label: Some("ubuntu-save".into()),
                    filesystem: None,
                    size: 16 * MIB,
                    offset: None,
                },
                GadgetStructure {
                    yaml_index: 4,
                    name: "ubuntu-data".into(),
                    role: Some(Role::SystemData),
                    partition_type: PartitionTypeTag::new("83"),
                    filesystem_label: Some("ubuntu-data".into()),
                    filesystem: None,
                    size: 1_500 * MIB,
                    offset: None,
                },
            ],
        }
    }

    fn disk_with_only_seed() -> OnDiskVolume {
        OnDiskVolume {
            schema: PartitionTableSchema::Dos,
            device: std::path::PathBuf::from("/dev/mmcblk0"),
            sector_size: 512,
            usable_sectors_end: (4 * 1024 * MIB) / 512,
            structures: vec![gadget_types::OnDiskStructure {
                node: std::path::PathBuf::from("/dev/mmcblk0p1"),
                disk_index: 1,
                start: 1 * MIB,
                size: 1_200 * MIB,
                partition_type: "0C".into(),
                filesystem_label: Some("ubuntu-seed".into()),
                filesystem: None,
                gadget_yaml_index: Some(1),
                role: Some(Role::SystemSeed),
            }],
        }
    }

    #[test]
    fn scenario1_happy_install_creates_boot_save_data() {
        let disk = disk_with_only_seed();
        let gadget = pi_gadget();
        let opts = ReconcileOptions::default();
        let deleted = DeletedOffsetSize::new();

        let (script, planned) = build_partition_list(
            &disk,
            &gadget,
            &opts,
            &deleted,
            &MatchByYamlIndexChecker,
        )
        .unwrap();

        assert_eq!(planned.len(), 3);
        assert_eq!(planned[0].disk_index, 2);
        assert_eq!(planned[1].disk_index, 3);
        assert_eq!(planned[2].disk_index, 4);
        assert_eq!(planned[0].node, std::path::PathBuf::from("/dev/mmcblk0p2"));
        assert_eq!(planned[2].node, std::path::PathBuf::from("/dev/mmcblk0p4"));
        assert!(script.contains("/dev/mmcblk0p2"));
        assert!(script.contains("/dev/mmcblk0p3"));
        assert!(script.contains("/dev/mmcblk0p4"));

        // P5: the expandable data structure's end lands exactly on
        // usable_sectors_end.
        let data = &planned[2];
        assert_eq!(data.start_sector + data.size_sectors, disk.usable_sectors_end);
    }

    #[test]
    fn p1_determinism_same_inputs_same_output() {
        let disk = disk_with_only_seed();
        let gadget = pi_gadget();
        let opts = ReconcileOptions::default();
        let deleted = DeletedOffsetSize::new();

        let (script_a, planned_a) =
            build_partition_list(&disk, &gadget, &opts, &deleted, &MatchByYamlIndexChecker).unwrap();
        let (script_b, planned_b) =
            build_partition_list(&disk, &gadget, &opts, &deleted, &MatchByYamlIndexChecker).unwrap();

        assert_eq!(script_a, script_b);
        assert_eq!(planned_a, planned_b);
    }

    #[test]
    fn p3_reusing_deleted_offset_size_reproduces_geometry() {
        let disk = disk_with_only_seed();
        let gadget = pi_gadget();
        let opts = ReconcileOptions::default();

        let mut deleted = DeletedOffsetSize::new();
        // Pretend yaml_index 2 (ubuntu-boot) previously occupied 700 MiB
        // rather than the gadget's declared 750 MiB, as it would if an
        // overlapping non-gadget partition had shrunk it before removal.
        deleted.insert(2, (1 * MIB + 1_200 * MIB, 700 * MIB));

        let (_, planned) =
            build_partition_list(&disk, &gadget, &opts, &deleted, &MatchByYamlIndexChecker).unwrap();

        let boot = planned.iter().find(|p| p.gadget.yaml_index == 2).unwrap();
        assert_eq!(boot.start_sector, (1 * MIB + 1_200 * MIB) / 512);
        assert_eq!(boot.size_sectors, 700 * MIB / 512);
    }

    #[test]
    fn p4_non_creatable_role_without_override_fails() {
        let mut gadget = pi_gadget();
        gadget.structures.push(GadgetStructure {
            yaml_index: 5,
            name: "extra".into(),
            role: Some(Role::SystemSeedNull),
            partition_type: PartitionTypeTag::new("83"),
            filesystem_label: None,
            filesystem: None,
            size: 1 * MIB,
            offset: None,
        });

        let disk = disk_with_only_seed();
        let opts = ReconcileOptions::default();
        let deleted = DeletedOffsetSize::new();

        let err = build_partition_list(&disk, &gadget, &opts, &deleted, &MatchByYamlIndexChecker)
            .unwrap_err();

        match err {
            ReconcileError::NotCreatable { index, name } => {
                assert_eq!(index, 5);
                assert_eq!(name, "extra");
            }
            other => panic!("expected NotCreatable, got {:?}", other),
        }
    }

    #[test]
    fn create_all_missing_bypasses_creatable_role_gate() {
        let mut gadget = pi_gadget();
        gadget.structures.push(GadgetStructure {
            yaml_index: 5,
            name: "extra".into(),
            role: Some(Role::SystemSeedNull),
            partition_type: PartitionTypeTag::new("83"),
            filesystem_label: None,
            filesystem: None,
            size: 1 * MIB,
            offset: None,
        });

        let disk = disk_with_only_seed();
        let opts = ReconcileOptions { create_all_missing: true, ..ReconcileOptions::default() };
        let deleted = DeletedOffsetSize::new();

        let (_, planned) =
            build_partition_list(&disk, &gadget, &opts, &deleted, &MatchByYamlIndexChecker).unwrap();
        // CreateAllMissing skips the compatibility-matching step entirely
        // (§4.1 step 3), so even the already-present seed is treated as
        // unmatched here, alongside boot/save/data/extra.
        assert_eq!(planned.len(), 5);
    }

    #[test]
    fn emmc_schema_short_circuits_to_empty_result() {
        let mut disk = disk_with_only_seed();
        disk.schema = PartitionTableSchema::Emmc;
        let gadget = pi_gadget();
        let opts = ReconcileOptions::default();
        let deleted = DeletedOffsetSize::new();

        let (script, planned) =
            build_partition_list(&disk, &gadget, &opts, &deleted, &MatchByYamlIndexChecker).unwrap();
        assert!(script.is_empty());
        assert!(planned.is_empty());
    }

    #[test]
    fn p2_idempotent_when_all_structures_already_matched() {
        let mut disk = disk_with_only_seed();
        disk.structures.push(gadget_types::OnDiskStructure {
            node: std::path::PathBuf::from("/dev/mmcblk0p2"),
            disk_index: 2,
            start: 1 * MIB + 1_200 * MIB,
            size: 750 * MIB,
            partition_type: "0C".into(),
            filesystem_label: Some("ubuntu-boot".into()),
            filesystem: None,
            gadget_yaml_index: Some(2),
            role: Some(Role::SystemBoot),
        });
        disk.structures.push(gadget_types::OnDiskStructure {
            node: std::path::PathBuf::from("/dev/mmcblk0p3"),
            disk_index: 3,
            start: 1 * MIB + 1_200 * MIB + 750 * MIB,
            size: 16 * MIB,
            partition_type: "83".into(),
            filesystem_label: Some("ubuntu-save".into()),
            filesystem: None,
            gadget_yaml_index: Some(3),
            role: Some(Role::SystemSave),
        });
        disk.structures.push(gadget_types::OnDiskStructure {
            node: std::path::PathBuf::from("/dev/mmcblk0p4"),
            disk_index: 4,
            start: 1 * MIB + 1_200 * MIB + 750 * MIB + 16 * MIB,
            size: 1_500 * MIB,
            partition_type: "83".into(),
            filesystem_label: Some("ubuntu-data".into()),
            filesystem: None,
            gadget_yaml_index: Some(4),
            role: Some(Role::SystemData),
        });

        let gadget = pi_gadget();
        let opts = ReconcileOptions::default();
        let deleted = DeletedOffsetSize::new();

        let (script, planned) =
            build_partition_list(&disk, &gadget, &opts, &deleted, &MatchByYamlIndexChecker).unwrap();
        assert!(script.is_empty());
        assert!(planned.is_empty());
    }
}
