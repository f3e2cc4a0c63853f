use crate::{error::ReconcileError, options::ReconcileOptions};
use gadget_types::{GadgetVolume, OnDiskStructure, OnDiskVolume};
use std::collections::BTreeMap;

/// The external volume-compatibility checker (§6): given a gadget volume
/// and the disk observed so far, returns the gadget structures that are
/// already present on disk, keyed by yaml-index. Gadget YAML parsing and
/// the layout computer live outside this crate (§1's "explicitly out of
/// scope"); this trait is the seam the reconciler calls through.
pub trait VolumeCompatibilityChecker {
    fn ensure_compatible(
        &self,
        volume: &GadgetVolume,
        disk: &OnDiskVolume,
        opts: &ReconcileOptions,
    ) -> Result<BTreeMap<usize, OnDiskStructure>, ReconcileError>;
}

/// A checker that treats every gadget structure as unmatched — useful when
/// a caller has already done the matching out of band, or in tests that
/// don't exercise the compatibility path.
pub struct NullCompatibilityChecker;

impl VolumeCompatibilityChecker for NullCompatibilityChecker {
    fn ensure_compatible(
        &self,
        _volume: &GadgetVolume,
        _disk: &OnDiskVolume,
        _opts: &ReconcileOptions,
    ) -> Result<BTreeMap<usize, OnDiskStructure>, ReconcileError> {
        Ok(BTreeMap::new())
    }
}
