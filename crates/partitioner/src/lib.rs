//! Drives a `dyn DeviceOps` through a reconciler edit: append partitions,
//! reload the kernel's view of the table, settle udev, and wait for the
//! new device nodes to appear (§4.3).

#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate log;

mod error;

pub use self::error::PartitionerError;

use device_ops::DeviceOps;
use gadget_types::{GadgetVolume, OnDiskVolume};
use reconciler::{
    build_partition_list, remove_created_partitions, DeletedOffsetSize, PlannedStructure,
    ReconcileOptions, VolumeCompatibilityChecker,
};
use std::{
    path::Path,
    thread,
    time::{Duration, Instant},
};

/// Presence of this file in the gadget tree selects the sysfs-rescan
/// partition-table reload strategy over the default reloader (§4.3 step 3,
/// §6.1).
pub const RESCAN_MARKER: &str = "meta/force-partition-table-reload-via-device-rescan";

const UDEV_SETTLE_TIMEOUT: Duration = Duration::from_secs(180);
const NODE_WAIT_TIMEOUT: Duration = Duration::from_secs(5);
const NODE_POLL_INTERVAL: Duration = Duration::from_millis(100);

fn reload_via_rescan(gadget_root: &Path) -> bool { gadget_root.join(RESCAN_MARKER).exists() }

/// Creates every partition the reconciler decides is missing. Returns the
/// planned structures actually created; an empty gadget root / unchanged
/// disk produces an empty, no-op result (§4.3, I3).
pub fn create_missing_partitions(
    device_ops: &dyn DeviceOps,
    disk: &OnDiskVolume,
    gadget: &GadgetVolume,
    opts: &ReconcileOptions,
    deleted: &DeletedOffsetSize,
    checker: &dyn VolumeCompatibilityChecker,
) -> Result<Vec<PlannedStructure>, PartitionerError> {
    let (script, planned) = build_partition_list(disk, gadget, opts, deleted, checker)?;

    if planned.is_empty() {
        return Ok(Vec::new());
    }

    let device = disk.device_path();

    info!("appending {} new partition(s) to {:?}", planned.len(), device);
    device_ops
        .ptable_append(device, script.as_bytes())
        .map_err(|why| PartitionerError::TableWrite { device: device.to_path_buf(), why })?;

    let via_rescan = reload_via_rescan(&opts.gadget_root_dir);
    device_ops
        .reload_ptable(device, via_rescan)
        .map_err(|why| PartitionerError::TableReload { device: device.to_path_buf(), why })?;

    device_ops
        .udev_settle(UDEV_SETTLE_TIMEOUT)
        .map_err(|why| PartitionerError::Settle { device: device.to_path_buf(), why })?;

    let mut nodes: Vec<&Path> = planned.iter().map(|p| p.node.as_path()).collect();
    nodes.sort();

    for node in nodes {
        wait_for_node(device_ops, node)?;
        device_ops.udev_trigger_settle(node).ok();
    }

    Ok(planned)
}

fn wait_for_node(device_ops: &dyn DeviceOps, node: &Path) -> Result<(), PartitionerError> {
    let deadline = Instant::now() + NODE_WAIT_TIMEOUT;

    while !device_ops.node_exists(node) {
        if Instant::now() >= deadline {
            return Err(PartitionerError::NotAvailable { node: node.to_path_buf() });
        }
        thread::sleep(NODE_POLL_INTERVAL);
    }

    Ok(())
}

/// Deletes every partition the installer previously created, returning the
/// `(offset, size)` each occupied so a subsequent `create_missing_partitions`
/// reproduces identical geometry (§4.3, I8).
pub fn remove_created(
    device_ops: &dyn DeviceOps,
    disk: &mut OnDiskVolume,
    gadget: &GadgetVolume,
    gadget_root: &Path,
) -> Result<DeletedOffsetSize, PartitionerError> {
    let plan = remove_created_partitions(disk, gadget);

    if plan.disk_indices.is_empty() {
        return Ok(DeletedOffsetSize::new());
    }

    let device = disk.device_path().to_path_buf();

    info!("removing previously-created partition(s) {:?} from {:?}", plan.disk_indices, device);
    device_ops
        .ptable_delete(&device, &plan.disk_indices)
        .map_err(|why| PartitionerError::TableWrite { device: device.clone(), why })?;

    let via_rescan = reload_via_rescan(gadget_root);
    device_ops
        .reload_ptable(&device, via_rescan)
        .map_err(|why| PartitionerError::TableReload { device: device.clone(), why })?;

    disk.structures.retain(|s| !plan.disk_indices.contains(&s.disk_index));

    Ok(plan.deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use device_ops::MockDeviceOps;
    use gadget_types::{GadgetStructure, PartitionTableSchema, PartitionTypeTag, Role};
    use std::path::PathBuf;

    fn disk() -> OnDiskVolume {
        OnDiskVolume {
            schema: PartitionTableSchema::Gpt,
            device: PathBuf::from("/dev/mmcblk0"),
            sector_size: 512,
            usable_sectors_end: 20_000_000,
            structures: Vec::new(),
        }
    }

    fn gadget() -> GadgetVolume {
        GadgetVolume {
            name: "pc".into(),
            schema: Some(PartitionTableSchema::Gpt),
            structures: vec![GadgetStructure {
                yaml_index: 0,
                name: "ubuntu-boot".into(),
                role: Some(Role::SystemBoot),
                partition_type: PartitionTypeTag::new("0C"),
                filesystem_label: None,
                filesystem: None,
                size: 750 * 1024 * 1024,
                offset: Some(1024 * 1024),
            }],
        }
    }

    #[test]
    fn create_waits_for_and_settles_each_new_node() {
        let mock = MockDeviceOps::new();
        let opts = ReconcileOptions::default();
        let checker = reconciler::NullCompatibilityChecker;
        let deleted = DeletedOffsetSize::new();

        // the mock "creates" a node as soon as it is settled; seed it ahead
        // of time to avoid the poll loop actually sleeping in a test.
        mock.existing_nodes.borrow_mut().insert(PathBuf::from("/dev/mmcblk0p1"));

        let created =
            create_missing_partitions(&mock, &disk(), &gadget(), &opts, &deleted, &checker).unwrap();

        assert_eq!(created.len(), 1);
        assert!(mock.calls.borrow().iter().any(|c| matches!(c, device_ops::RecordedCall::PtableAppend { .. })));
        assert!(mock.calls.borrow().iter().any(|c| matches!(c, device_ops::RecordedCall::UdevSettle)));
    }

    #[test]
    fn create_is_a_no_op_when_nothing_is_missing() {
        let mock = MockDeviceOps::new();
        let opts = ReconcileOptions {
            create_all_missing: false,
            gadget_root_dir: PathBuf::new(),
            assume_creatable_partitions_created: false,
        };

        let mut matched_disk = disk();
        matched_disk.structures.push(gadget_types::OnDiskStructure {
            node: PathBuf::from("/dev/mmcblk0p1"),
            disk_index: 1,
            start: 1024 * 1024,
            size: 750 * 1024 * 1024,
            partition_type: "0C".into(),
            filesystem_label: None,
            filesystem: None,
            gadget_yaml_index: Some(0),
            role: Some(Role::SystemBoot),
        });

        struct AlwaysMatched;
        impl VolumeCompatibilityChecker for AlwaysMatched {
            fn ensure_compatible(
                &self,
                _volume: &GadgetVolume,
                disk: &OnDiskVolume,
                _opts: &ReconcileOptions,
            ) -> Result<std::collections::BTreeMap<usize, gadget_types::OnDiskStructure>, reconciler::ReconcileError>
            {
                Ok(disk
                    .structures
                    .iter()
                    .filter_map(|s| s.gadget_yaml_index.map(|idx| (idx, s.clone())))
                    .collect())
            }
        }

        let deleted = DeletedOffsetSize::new();
        let created = create_missing_partitions(
            &mock,
            &matched_disk,
            &gadget(),
            &opts,
            &deleted,
            &AlwaysMatched,
        )
        .unwrap();

        assert!(created.is_empty());
        assert!(mock.calls.borrow().is_empty());
    }
}
