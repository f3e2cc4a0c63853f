use crate::{fs::FileSystem, role::Role, table::PartitionTypeTag};
use std::path::PathBuf;

/// A single structure (usually a partition, occasionally the MBR bytes)
/// described by the gadget, in declaration order (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct GadgetStructure {
    /// The stable identity of this structure within the gadget's YAML list,
    /// used to track it across `RemoveCreatedPartitions`/`CreateMissingPartitions`
    /// cycles (I7).
    pub yaml_index: usize,
    pub name: String,
    pub role: Option<Role>,
    pub partition_type: PartitionTypeTag,
    pub filesystem_label: Option<String>,
    /// `None` means a raw structure (no filesystem).
    pub filesystem: Option<FileSystem>,
    pub size: u64,
    /// Absent means "packed after the previous structure".
    pub offset: Option<u64>,
}

impl GadgetStructure {
    /// The MBR pseudo-structure is not a partition and is never created,
    /// matched, or deleted by the reconciler (§4.1 step 5).
    pub fn is_mbr(&self) -> bool { self.role == Some(Role::Mbr) }
}

/// An ordered sequence of gadget structures describing one disk's worth of
/// desired layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GadgetVolume {
    pub name: String,
    pub schema: Option<crate::table::PartitionTableSchema>,
    pub structures: Vec<GadgetStructure>,
}

impl GadgetVolume {
    /// True iff the last structure has role `system-data` (§4.1 step 4).
    pub fn expands_data(&self) -> bool {
        self.structures.last().map_or(false, |s| s.role == Some(Role::SystemData))
    }

    pub fn find_by_role(&self, role: Role) -> Option<&GadgetStructure> {
        self.structures.iter().find(|s| s.role == Some(role))
    }
}

/// One (source on the gadget tree, target on the filesystem) content entry,
/// or a raw-image entry with an explicit offset (§3, Laid-out Structure).
#[derive(Debug, Clone, PartialEq)]
pub enum ContentEntry {
    File { source: PathBuf, target: PathBuf },
    RawImage { source: PathBuf, offset: u64 },
}

/// A gadget structure enriched with resolved content, as produced by the
/// external `LayoutVolumeStructure` collaborator (§6).
#[derive(Debug, Clone, PartialEq)]
pub struct LaidOutStructure {
    pub structure: GadgetStructure,
    pub content: Vec<ContentEntry>,
}
