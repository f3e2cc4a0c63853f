//! Parses the partition-table reader's JSON dump into an `OnDiskVolume`
//! (§6, "Partition table writer / reader ... dumps JSON describing the
//! current partition table when queried").

use crate::error::InstallError;
use device_ops::DeviceOps;
use gadget_types::{OnDiskStructure, OnDiskVolume, PartitionTableSchema};
use std::{path::Path, str::FromStr};

/// The subset of `sfdisk --json` this installer depends on.
#[derive(Debug, Deserialize)]
struct SfdiskDump {
    partitiontable: SfdiskTable,
}

#[derive(Debug, Deserialize)]
struct SfdiskTable {
    label: String,
    device: std::path::PathBuf,
    #[serde(default = "default_sector_size")]
    sectorsize: u64,
    #[serde(default)]
    lastlba: u64,
    #[serde(default)]
    partitions: Vec<SfdiskPartition>,
}

fn default_sector_size() -> u64 {
    512
}

#[derive(Debug, Deserialize)]
struct SfdiskPartition {
    node: std::path::PathBuf,
    start: u64,
    size: u64,
    #[serde(rename = "type")]
    partition_type: String,
    #[serde(default)]
    name: Option<String>,
}

/// Reads and parses the partition table of `device` into an `OnDiskVolume`.
/// Filesystem labels/types aren't carried by the table dump itself — a
/// freshly-created or not-yet-formatted partition has neither — so both are
/// left `None` here; the reconciler only needs geometry and partition type
/// to match gadget structures (§4.1, §4.2).
pub fn read_on_disk_volume(device_ops: &dyn DeviceOps, device: &Path) -> Result<OnDiskVolume, InstallError> {
    let raw = device_ops
        .ptable_read(device)
        .map_err(|why| InstallError::Collaborator { why: format!("cannot read partition table of {:?}: {}", device, why) })?;

    let dump: SfdiskDump = serde_json::from_slice(&raw)
        .map_err(|why| InstallError::Collaborator { why: format!("cannot parse partition table dump: {}", why) })?;

    let schema = PartitionTableSchema::from_str(&dump.partitiontable.label)
        .map_err(|why| InstallError::Collaborator { why: format!("{}: {}", why, dump.partitiontable.label) })?;

    let sector_size = dump.partitiontable.sectorsize.max(1);

    let structures = dump
        .partitiontable
        .partitions
        .iter()
        .enumerate()
        .map(|(i, p)| OnDiskStructure {
            node: p.node.clone(),
            disk_index: (i + 1) as u32,
            start: p.start * sector_size,
            size: p.size * sector_size,
            partition_type: p.partition_type.clone(),
            filesystem_label: None,
            filesystem: None,
            gadget_yaml_index: None,
            role: None,
        })
        .collect();

    Ok(OnDiskVolume {
        schema,
        device: dump.partitiontable.device,
        sector_size,
        usable_sectors_end: dump.partitiontable.lastlba,
        structures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use device_ops::MockDeviceOps;

    #[test]
    fn parses_an_sfdisk_style_dump() {
        let mock = MockDeviceOps::new();
        *mock.ptable_dump.borrow_mut() = br#"{
            "partitiontable": {
                "label": "gpt",
                "device": "/dev/mmcblk0",
                "sectorsize": 512,
                "lastlba": 20000000,
                "partitions": [
                    {"node": "/dev/mmcblk0p1", "start": 2048, "size": 2457600, "type": "0C", "name": "ubuntu-seed"}
                ]
            }
        }"#
        .to_vec();

        let disk = read_on_disk_volume(&mock, Path::new("/dev/mmcblk0")).unwrap();
        assert_eq!(disk.schema, PartitionTableSchema::Gpt);
        assert_eq!(disk.structures.len(), 1);
        assert_eq!(disk.structures[0].start, 2048 * 512);
        assert_eq!(disk.structures[0].disk_index, 1);
    }
}
