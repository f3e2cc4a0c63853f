use std::{collections::BTreeMap, path::PathBuf};

/// Per-yaml-index (offset, size) pairs preserved from a prior
/// `remove_created_partitions` in the same transaction, so a subsequent
/// create reuses the exact pre-removal geometry (I8, P3).
pub type DeletedOffsetSize = BTreeMap<usize, (u64, u64)>;

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Installer-mode override: every gadget structure may be created,
    /// regardless of the Creatable Roles gate (I1).
    pub create_all_missing: bool,
    pub gadget_root_dir: PathBuf,
    /// Set by `FactoryReset`: the creatable-role structures are assumed to
    /// already exist on disk, so the external compatibility checker should
    /// match them rather than report them missing (§4.8 FactoryReset).
    pub assume_creatable_partitions_created: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        ReconcileOptions {
            create_all_missing: false,
            gadget_root_dir: PathBuf::new(),
            assume_creatable_partitions_created: false,
        }
    }
}
