//! The narrow seams through which the orchestrator calls the external
//! collaborators §1 places out of scope: gadget YAML parsing/validation,
//! the on-disk layout computer, and the kernel-drivers-tree builder (§6's
//! "Gadget readers").

use crate::error::InstallError;
use gadget_types::{GadgetStructure, GadgetVolume, LaidOutStructure};
use std::{collections::BTreeMap, path::Path};

/// Parses and validates `meta/gadget.yaml` under `gadget_root`, returning
/// every volume it describes, keyed by volume name (§6's
/// `ReadInfoAndValidate`).
pub trait GadgetReader {
    fn read_info_and_validate(
        &self,
        gadget_root: &Path,
    ) -> Result<BTreeMap<String, GadgetVolume>, InstallError>;
}

/// Opaque kernel driver-tree metadata, read from the kernel snap for use
/// while resolving content during `installOnePartition` (§4.8 step 10).
/// The driver-tree builder itself is out of scope (§1).
#[derive(Debug, Clone, Default)]
pub struct KernelInfo {
    pub kernel_root: Option<std::path::PathBuf>,
}

pub trait KernelInfoReader {
    fn read(&self, kernel_root: Option<&Path>) -> Result<KernelInfo, InstallError>;
}

/// Resolves a gadget structure's declared content (source-tree paths, raw
/// image offsets) to concrete filesystem targets (§6's
/// `LayoutVolumeStructure`). The file-copy mechanics proper stay in
/// `content-writer`; this trait only resolves *what* to copy *where*.
pub trait ContentLayouter {
    fn layout(
        &self,
        structure: &GadgetStructure,
        gadget_root: &Path,
        kernel_info: &KernelInfo,
    ) -> Result<LaidOutStructure, InstallError>;
}

/// Finds the disk device backing a gadget structure of the given role,
/// used to resolve the boot device when the caller hasn't supplied one
/// directly (§4.8 step 4) and by `MatchDisksToGadgetVolumes`.
pub trait DeviceLocator {
    fn device_for_seed(&self) -> Result<std::path::PathBuf, InstallError>;

    fn device_for_volume(&self, volume_name: &str) -> Result<std::path::PathBuf, InstallError>;
}
