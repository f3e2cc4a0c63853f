use crate::{fs::FileSystem, role::Role, table::PartitionTableSchema};
use std::path::{Path, PathBuf};

/// A structure observed on the physical disk (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct OnDiskStructure {
    pub node: PathBuf,
    /// 1-based index within the on-disk partition table.
    pub disk_index: u32,
    pub start: u64,
    pub size: u64,
    pub partition_type: String,
    pub filesystem_label: Option<String>,
    pub filesystem: Option<FileSystem>,
    /// Set after reconciliation: the yaml-index of the gadget structure
    /// this on-disk structure was matched to, if any.
    pub gadget_yaml_index: Option<usize>,
    /// The role of the gadget structure this was matched to or created
    /// from, if known. Lets `MountVolumes`/`WriteContent` work from an
    /// `OnDiskVolume` alone without re-walking the gadget (§4.8).
    pub role: Option<Role>,
}

impl OnDiskStructure {
    pub fn end(&self) -> u64 { self.start + self.size }
}

/// Trait implemented by anything that can report its sector geometry.
pub trait SectorExt {
    fn sector_size(&self) -> u64;
}

/// A whole-disk-worth of observed, physical partition state.
#[derive(Debug, Clone, PartialEq)]
pub struct OnDiskVolume {
    pub schema: PartitionTableSchema,
    pub device: PathBuf,
    pub sector_size: u64,
    /// The last sector usable for partitions, after accounting for the
    /// GPT back-of-disk reserved area (§3).
    pub usable_sectors_end: u64,
    pub structures: Vec<OnDiskStructure>,
}

impl OnDiskVolume {
    pub fn device_path(&self) -> &Path { &self.device }

    pub fn max_disk_index(&self) -> u32 {
        self.structures.iter().map(|s| s.disk_index).max().unwrap_or(0)
    }

    pub fn find_by_index(&self, idx: u32) -> Option<&OnDiskStructure> {
        self.structures.iter().find(|s| s.disk_index == idx)
    }
}

impl SectorExt for OnDiskVolume {
    fn sector_size(&self) -> u64 { self.sector_size }
}
