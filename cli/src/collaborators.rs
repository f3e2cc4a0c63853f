//! Concrete implementations of the narrow collaborator seams `gadgetinst`
//! expects its caller to supply: gadget YAML parsing, content resolution,
//! boot-device discovery, and kernel driver-tree metadata.

use crate::gadget_yaml;
use gadgetinst::{
    collaborators::{ContentLayouter, DeviceLocator, GadgetReader, KernelInfo, KernelInfoReader},
    DeviceSetupHookInvoker, DeviceSetupRequest, GadgetStructure, GadgetVolume, InstallError, LaidOutStructure,
    OnDiskStructure, OnDiskVolume,
};
use proc_mounts::MountIter;
use reconciler::{ReconcileError, ReconcileOptions, VolumeCompatibilityChecker};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    process::Command,
};

pub(crate) struct FsGadgetReader;

impl GadgetReader for FsGadgetReader {
    fn read_info_and_validate(&self, gadget_root: &Path) -> Result<BTreeMap<String, GadgetVolume>, InstallError> {
        gadget_yaml::read_info_and_validate(gadget_root)
    }
}

pub(crate) struct FsContentLayouter;

impl ContentLayouter for FsContentLayouter {
    fn layout(
        &self,
        structure: &GadgetStructure,
        gadget_root: &Path,
        _kernel_info: &KernelInfo,
    ) -> Result<LaidOutStructure, InstallError> {
        let content = gadget_yaml::content_for_structure(gadget_root, &structure.name)?;
        Ok(LaidOutStructure { structure: structure.clone(), content })
    }
}

pub(crate) struct NoopKernelInfoReader;

impl KernelInfoReader for NoopKernelInfoReader {
    fn read(&self, kernel_root: Option<&Path>) -> Result<KernelInfo, InstallError> {
        Ok(KernelInfo { kernel_root: kernel_root.map(Path::to_path_buf) })
    }
}

/// Matches gadget structures to on-disk ones positionally by resolved
/// partition-type tag (§6's "Volume compatibility checker"): the first
/// unclaimed on-disk structure whose type matches a gadget structure's
/// resolved tag is considered that structure's existing match. Gadget
/// structures with an empty type tag (raw/MBR-only gadgets) are left
/// unmatched, same as `NullCompatibilityChecker`.
pub(crate) struct SimpleCompatibilityChecker;

impl VolumeCompatibilityChecker for SimpleCompatibilityChecker {
    fn ensure_compatible(
        &self,
        volume: &GadgetVolume,
        disk: &OnDiskVolume,
        _opts: &ReconcileOptions,
    ) -> Result<BTreeMap<usize, OnDiskStructure>, ReconcileError> {
        let mut claimed = vec![false; disk.structures.len()];
        let mut matched = BTreeMap::new();

        for structure in &volume.structures {
            if structure.is_mbr() {
                continue;
            }

            let want_type = structure.partition_type.resolve(disk.schema).to_lowercase();
            if want_type.is_empty() {
                continue;
            }

            let found = disk.structures.iter().enumerate().find(|(i, on_disk)| {
                !claimed[*i] && on_disk.partition_type.to_lowercase() == want_type
            });

            if let Some((i, on_disk)) = found {
                claimed[i] = true;
                matched.insert(structure.yaml_index, on_disk.clone());
            }
        }

        Ok(matched)
    }
}

/// Resolves the boot device from the mounted seed partition via
/// `/proc/mounts`, falling back to a caller-supplied `--boot-device` for
/// hosts where nothing is mounted yet (first install from a live medium).
pub(crate) struct MountedSeedDeviceLocator {
    pub(crate) seed_mountpoint: PathBuf,
    pub(crate) volume_mountpoints: BTreeMap<String, PathBuf>,
}

impl MountedSeedDeviceLocator {
    fn device_for_mountpoint(&self, mountpoint: &Path) -> Result<PathBuf, InstallError> {
        let mounts = MountIter::new().map_err(|why| InstallError::Collaborator {
            why: format!("cannot read /proc/mounts: {}", why),
        })?;

        for mount in mounts {
            let mount = mount.map_err(|why| InstallError::Collaborator { why: format!("cannot read /proc/mounts: {}", why) })?;
            if mount.dest == mountpoint {
                return Ok(mount.source);
            }
        }

        Err(InstallError::Collaborator {
            why: format!("no mounted filesystem was found at {:?}", mountpoint),
        })
    }
}

impl DeviceLocator for MountedSeedDeviceLocator {
    fn device_for_seed(&self) -> Result<PathBuf, InstallError> {
        self.device_for_mountpoint(&self.seed_mountpoint)
    }

    fn device_for_volume(&self, volume_name: &str) -> Result<PathBuf, InstallError> {
        match self.volume_mountpoints.get(volume_name) {
            Some(mountpoint) => self.device_for_mountpoint(mountpoint),
            None => self.device_for_seed(),
        }
    }
}

/// Shells out to an external device-setup-hook binary (§4.4, §6): the hook
/// is handed the mapper device and partition name as arguments and the key
/// on stdin, matching the convention `EncryptionType::DeviceSetupHook`
/// callers (e.g. a UC20 gadget's install hook) are expected to provide.
pub(crate) struct ExternalDeviceSetupHook {
    pub(crate) hook_path: PathBuf,
}

impl DeviceSetupHookInvoker for ExternalDeviceSetupHook {
    fn invoke(&self, request: &DeviceSetupRequest) -> Result<(), String> {
        use std::io::Write;

        let mut child = Command::new(&self.hook_path)
            .arg(&request.mapper_device)
            .arg(&request.partition_name)
            .stdin(std::process::Stdio::piped())
            .spawn()
            .map_err(|why| format!("failed to spawn device setup hook at {:?}: {}", self.hook_path, why))?;

        child
            .stdin
            .as_mut()
            .expect("stdin was piped")
            .write_all(request.key)
            .map_err(|why| format!("failed to write key to device setup hook: {}", why))?;

        let status = child
            .wait()
            .map_err(|why| format!("failed to wait on device setup hook: {}", why))?;

        if !status.success() {
            return Err(format!("device setup hook at {:?} exited with {}", self.hook_path, status));
        }

        Ok(())
    }
}
