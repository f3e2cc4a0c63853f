//! Top-level routines that sequence every component in §4 (§4.8).

use crate::{
    collaborators::{ContentLayouter, DeviceLocator, GadgetReader, KernelInfo, KernelInfoReader},
    disk_reader::read_on_disk_volume,
    error::InstallError,
    model::Model,
    options::{FactoryResetOptions, InstallOptions, DEFAULT_RUN_DIR},
};
use device_ops::DeviceOps;
use encryption::{DeviceSetupHook, DeviceSetupHookInvoker, EncryptedVolume, Luks};
use fs_builder::{make_filesystem, MakeFilesystem};
use fs_mounter::{mount_filesystem, mount_point_for_device, unmount_with_fallback_to_lazy, MountOptions};
use gadget_types::{
    EncryptedDevice, EncryptionMethod, EncryptionSetupData, EncryptionType, GadgetStructure, GadgetVolume, Role,
};
use reconciler::{DeletedOffsetSize, ReconcileOptions, VolumeCompatibilityChecker};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use traits_persister::{DiskMapping, DiskVolumeDeviceTraits, StructureEncryptionParameters};

/// A structure the orchestrator has created or reset, carrying its final
/// (possibly-encrypted) device node (§3, "Laid-out Structure" +
/// Encryption Setup Data threaded through).
#[derive(Debug, Clone)]
pub struct InstalledStructure {
    pub gadget: GadgetStructure,
    /// The raw partition device node (pre-encryption).
    pub raw_device: PathBuf,
}

/// Everything a top-level installer step hands back to its caller:
/// role→device, role→key, and whether a save partition is present (§4.8
/// step 12). `mounts` is `Some` only when `InstallOptions`/
/// `FactoryResetOptions::mount` asked every volume to be left mounted at
/// its canonical path (§4.8 step 14) — the caller owns the handle from
/// there and is responsible for eventually unmounting it.
#[derive(Debug, Default)]
pub struct InstallResult {
    pub devices: BTreeMap<Role, PathBuf>,
    pub keys: BTreeMap<Role, Vec<u8>>,
    pub encryption: EncryptionSetupData,
    pub has_save: bool,
    pub mounts: Option<fs_mounter::Mounts>,
}

/// Renames creatable, encryptable structures to `<label>-enc` before
/// reconciliation, so the partition the reconciler creates already carries
/// the label I6 requires for the raw (pre-open) LUKS container. DeviceSetupHook
/// has no such scheme — its precondition instead requires the partition
/// name, partition label, and filesystem label to already agree — so this
/// is a no-op for anything but `EncryptionType::Luks`.
fn apply_encryption_naming(gadget: &GadgetVolume, encryption_type: EncryptionType) -> GadgetVolume {
    if encryption_type != EncryptionType::Luks {
        return gadget.clone();
    }

    let mut gadget = gadget.clone();
    for structure in &mut gadget.structures {
        if structure.role.map_or(false, Role::encryptable) {
            let label = structure.filesystem_label.clone().unwrap_or_else(|| structure.name.clone());
            structure.name = format!("{}-enc", label);
        }
    }
    gadget
}

/// The single canonical key a structure is filed under in
/// `EncryptionSetupData`: its declared filesystem label, or — for a
/// structure `apply_encryption_naming` suffixed with `-enc` because it had
/// none — its name with that suffix stripped back off. `encrypt_partitions`'s
/// insert and every later lookup (`target_device`, `persist_traits`,
/// `save_storage_traits`) must derive the key this same way or they
/// silently disagree once a structure has no filesystem label.
fn encryption_label(gadget: &GadgetStructure) -> String {
    gadget
        .filesystem_label
        .clone()
        .unwrap_or_else(|| gadget.name.trim_end_matches("-enc").to_string())
}

/// `EncryptPartitions` (§4.8): sets up the encryption layer for every
/// structure in `installed` whose role requires it, given `encryption_type`
/// and a caller-supplied key per role.
pub fn encrypt_partitions(
    installed: &[InstalledStructure],
    encryption_type: EncryptionType,
    keys: &BTreeMap<Role, Vec<u8>>,
    hook_invoker: &dyn DeviceSetupHookInvoker,
) -> Result<EncryptionSetupData, InstallError> {
    let mut setup = EncryptionSetupData::new();

    if encryption_type == EncryptionType::None {
        return Ok(setup);
    }

    for structure in installed {
        let role = match structure.gadget.role {
            Some(role) if role.encryptable() => role,
            _ => continue,
        };

        let key = keys
            .get(&role)
            .ok_or_else(|| InstallError::MissingDevice { name: structure.gadget.name.clone() })?;

        // The canonical `<structure label>` (I6): used both as the map key
        // every later lookup must agree on, and — for Luks — as the mapper
        // name, never the `-enc`-suffixed partition name
        // `apply_encryption_naming` gave the raw partition.
        let label = encryption_label(&structure.gadget);

        let (encrypted_node, method) = match encryption_type {
            EncryptionType::Luks => {
                let luks = Luks::create(&structure.raw_device, &label, key)?;
                (luks.node().to_path_buf(), EncryptionMethod::Luks)
            }
            EncryptionType::DeviceSetupHook => {
                // Unlike Luks, DeviceSetupHook has no `-enc` renaming scheme
                // to undo: its precondition instead requires the partition
                // name, partition label, and filesystem label to already
                // agree, so the three are passed through as distinct
                // fields rather than unified through `label` — a real
                // disagreement among them must still surface as an error.
                let name = structure.gadget.name.clone();
                let filesystem_label = structure.gadget.filesystem_label.clone().unwrap_or_else(|| name.clone());
                let hook = DeviceSetupHook::create(
                    &structure.raw_device,
                    structure.gadget.size,
                    &name,
                    &name,
                    &filesystem_label,
                    key,
                    hook_invoker,
                )?;
                (hook.node().to_path_buf(), EncryptionMethod::Ice)
            }
            EncryptionType::None => unreachable!(),
        };

        setup.insert(
            label.clone(),
            EncryptedDevice {
                role,
                raw_device: structure.raw_device.clone(),
                encrypted_device: encrypted_node,
                volume_name: label,
                key: key.clone(),
                encrypted_sector_size: 512,
                method,
            },
        );
    }

    Ok(setup)
}

/// Resolves the device a structure's filesystem should be built on, and
/// content written to: the encrypted mapper if one was set up, else the
/// raw partition (§3, `EncryptionSetupData::target_device`).
fn target_device<'a>(structure: &'a InstalledStructure, enc: &'a EncryptionSetupData) -> &'a std::path::Path {
    enc.target_device(&encryption_label(&structure.gadget), &structure.raw_device)
}

/// Formats and writes one structure's content, mounting and unmounting
/// around the write regardless of whether the caller ultimately wants the
/// filesystem left mounted (that is `MountVolumes`'s job) — every
/// top-level call that mounts must also unmount (I4).
fn install_one_partition(
    device_ops: &dyn DeviceOps,
    structure: &InstalledStructure,
    enc: &EncryptionSetupData,
    layouter: &dyn ContentLayouter,
    kernel_info: &KernelInfo,
    gadget_root: &std::path::Path,
    observer: &dyn content_writer::ContentObserver,
) -> Result<(), InstallError> {
    let device = target_device(structure, enc);

    let fs = match structure.gadget.filesystem {
        Some(fs) => fs,
        None => return Ok(()), // raw structures carry no filesystem to build or mount
    };

    make_filesystem(
        device_ops,
        &MakeFilesystem {
            fs,
            device,
            label: structure.gadget.filesystem_label.as_deref(),
            sector_size: 0,
        },
    )?;

    let laid_out = layouter.layout(&structure.gadget, gadget_root, kernel_info)?;

    if laid_out.content.is_empty() {
        return Ok(());
    }

    let mount_point = mount_point_for_device(std::path::Path::new(DEFAULT_RUN_DIR), device);
    mount_filesystem(device_ops, device, fs.into(), &mount_point, MountOptions::default())?;

    let result = content_writer::write_content(&laid_out, &mount_point, device, observer);

    // Unmount on every exit path, regardless of whether the write
    // succeeded, and never mask a primary content-write error with a
    // secondary unmount failure (§4.6, §7, P8).
    let unmount_result =
        unmount_with_fallback_to_lazy(device_ops, &mount_point, "writing filesystem content");

    result?;
    unmount_result.map_err(InstallError::from)
}

/// Removes every file under `<seed_mountpoint>/device/fde` left behind by a
/// prior, possibly-aborted install attempt (§4.8 step 8, LP:#1879338): a
/// stale sealed key for a key-slot the fresh install won't recreate would
/// otherwise linger and confuse later unsealing. Best-effort: a missing
/// seed mount or key directory is not an error, since a first-ever install
/// has neither.
fn clear_stale_sealed_keys(seed_mountpoint: &Path) {
    let key_dir = seed_mountpoint.join(crate::options::SEED_ENCRYPTION_KEY_DIR);

    let result = gadgetinst_utils::read_dirs(&key_dir, |entry| {
        if entry.path().is_file() {
            if let Err(why) = std::fs::remove_file(entry.path()) {
                warn!("cannot remove stale sealed key {:?}: {}", entry.path(), why);
            }
        }
    });

    if let Err(why) = result {
        debug!("no stale sealed keys to clear at {:?}: {}", key_dir, why);
    }
}

/// `Install` (§4.8).
#[allow(clippy::too_many_arguments)]
pub fn install(
    device_ops: &dyn DeviceOps,
    gadget_reader: &dyn GadgetReader,
    locator: &dyn DeviceLocator,
    checker: &dyn VolumeCompatibilityChecker,
    layouter: &dyn ContentLayouter,
    kernel_reader: &dyn KernelInfoReader,
    hook_invoker: &dyn DeviceSetupHookInvoker,
    observer: &dyn content_writer::ContentObserver,
    model: &Model,
    opts: &InstallOptions,
    keys: &BTreeMap<Role, Vec<u8>>,
) -> Result<InstallResult, InstallError> {
    // Step 1: validate.
    if opts.gadget_root.as_os_str().is_empty() {
        return Err(InstallError::EmptyGadgetRoot { path: opts.gadget_root.clone() });
    }
    if !model.grade.has_install_mode() {
        return Err(InstallError::PreModernModel);
    }

    info!("installing gadget from {:?}", opts.gadget_root);

    // Step 2: load gadget info.
    let volumes = gadget_reader.read_info_and_validate(&opts.gadget_root)?;

    // Step 3: find the boot volume (the one with a system-seed structure).
    let (_volume_name, gadget) = volumes
        .iter()
        .find(|(_, v)| v.structures.iter().any(|s| s.role.map_or(false, Role::is_seed)))
        .ok_or(InstallError::NoBootVolume)?;

    let gadget = apply_encryption_naming(gadget, opts.encryption_type);

    // Step 4-5: resolve the boot device and read the on-disk volume.
    let boot_device = match &opts.boot_device {
        Some(device) => device.clone(),
        None => locator.device_for_seed()?,
    };

    debug!("boot device resolved to {:?}", boot_device);
    let mut disk = read_on_disk_volume(device_ops, &boot_device)?;

    // Step 6-7: compatibility check (ignoring not-yet-created partitions),
    // then remove any partitions the installer created on a prior attempt
    // (idempotent reinstall, I8).
    let reconcile_opts = ReconcileOptions {
        create_all_missing: false,
        gadget_root_dir: opts.gadget_root.clone(),
        assume_creatable_partitions_created: false,
    };

    let deleted: DeletedOffsetSize = partitioner::remove_created(device_ops, &mut disk, &gadget, &opts.gadget_root)?;

    // Step 8: remove stale sealed-key files left over from a prior install
    // attempt (LP:#1879338) — best-effort, a missing directory is not an error.
    clear_stale_sealed_keys(Path::new(crate::options::UBUNTU_SEED_MOUNTPOINT));

    // Step 9: create missing partitions.
    let planned =
        partitioner::create_missing_partitions(device_ops, &disk, &gadget, &reconcile_opts, &deleted, checker)?;

    // Step 10: kernel driver-tree metadata.
    let kernel_info = kernel_reader.read(opts.kernel_root.as_deref())?;

    let installed: Vec<InstalledStructure> = planned
        .iter()
        .map(|p| InstalledStructure { gadget: p.gadget.clone(), raw_device: p.node.clone() })
        .collect();

    // Step 11: encrypt → mkfs → write-content, per structure, declaration order.
    let encryption = encrypt_partitions(&installed, opts.encryption_type, keys, hook_invoker)?;

    for structure in &installed {
        install_one_partition(
            device_ops,
            structure,
            &encryption,
            layouter,
            &kernel_info,
            &opts.gadget_root,
            observer,
        )?;
    }

    // Step 12: accumulate the role→device and role→key maps.
    let mut result = InstallResult { encryption: encryption.clone(), ..Default::default() };

    for structure in &installed {
        if let Some(role) = structure.gadget.role {
            let device = target_device(structure, &encryption).to_path_buf();
            result.devices.insert(role, device);

            if let Some(key) = keys.get(&role) {
                result.keys.insert(role, key.clone());
            }
            if role == Role::SystemSave {
                result.has_save = true;
            }
        }
    }

    // Step 13: persist traits to data (and save, if present).
    persist_traits(device_ops, &gadget, &installed, &encryption, &result)?;

    // Step 14: leave every volume mounted at its canonical path, if asked.
    if opts.mount {
        let mount_structures = match_all_structures(device_ops, checker, &gadget, &boot_device, &opts.gadget_root)?;
        let (_seed_mount, mounts) = mount_volumes(device_ops, &mount_structures, &encryption)?;
        result.mounts = Some(mounts);
    }

    info!("install complete: {} structure(s) created", installed.len());
    Ok(result)
}

/// `FactoryReset` (§4.8): resets `system-boot` and `system-data`, leaves
/// `system-save` untouched (its device is still reported), performs no
/// creation step.
#[allow(clippy::too_many_arguments)]
pub fn factory_reset(
    device_ops: &dyn DeviceOps,
    gadget_reader: &dyn GadgetReader,
    locator: &dyn DeviceLocator,
    checker: &dyn VolumeCompatibilityChecker,
    layouter: &dyn ContentLayouter,
    kernel_reader: &dyn KernelInfoReader,
    hook_invoker: &dyn DeviceSetupHookInvoker,
    observer: &dyn content_writer::ContentObserver,
    model: &Model,
    opts: &FactoryResetOptions,
    keys: &BTreeMap<Role, Vec<u8>>,
) -> Result<InstallResult, InstallError> {
    if opts.gadget_root.as_os_str().is_empty() {
        return Err(InstallError::EmptyGadgetRoot { path: opts.gadget_root.clone() });
    }
    if !model.grade.has_install_mode() {
        return Err(InstallError::PreModernModel);
    }

    info!("factory-resetting gadget from {:?}", opts.gadget_root);

    let volumes = gadget_reader.read_info_and_validate(&opts.gadget_root)?;
    let (_name, gadget) = volumes
        .iter()
        .find(|(_, v)| v.structures.iter().any(|s| s.role.map_or(false, Role::is_seed)))
        .ok_or(InstallError::NoBootVolume)?;
    let gadget = apply_encryption_naming(gadget, opts.encryption_type);

    let boot_device = match &opts.boot_device {
        Some(device) => device.clone(),
        None => locator.device_for_seed()?,
    };
    let disk = read_on_disk_volume(device_ops, &boot_device)?;

    let reconcile_opts = ReconcileOptions {
        create_all_missing: false,
        gadget_root_dir: opts.gadget_root.clone(),
        assume_creatable_partitions_created: true,
    };

    // The layout is assumed to already exist: every creatable-role
    // structure is matched via `checker`, nothing is created or deleted.
    let matched = checker.ensure_compatible(&gadget, &disk, &reconcile_opts)?;

    let installed: Vec<InstalledStructure> = gadget
        .structures
        .iter()
        .filter(|s| !s.is_mbr() && s.role.map_or(false, |r| r == Role::SystemBoot || r == Role::SystemData))
        .filter_map(|s| {
            matched.get(&s.yaml_index).map(|on_disk| InstalledStructure {
                gadget: s.clone(),
                raw_device: on_disk.node.clone(),
            })
        })
        .collect();

    let kernel_info = kernel_reader.read(opts.kernel_root.as_deref())?;
    let encryption = encrypt_partitions(&installed, opts.encryption_type, keys, hook_invoker)?;

    for structure in &installed {
        install_one_partition(
            device_ops,
            structure,
            &encryption,
            layouter,
            &kernel_info,
            &opts.gadget_root,
            observer,
        )?;
    }

    let mut result = InstallResult { encryption: encryption.clone(), ..Default::default() };

    for structure in &installed {
        if let Some(role) = structure.gadget.role {
            result.devices.insert(role, target_device(structure, &encryption).to_path_buf());
            if let Some(key) = keys.get(&role) {
                result.keys.insert(role, key.clone());
            }
        }
    }

    // system-save is preserved: report its device without touching it.
    if let Some(save) = gadget.find_by_role(Role::SystemSave) {
        if let Some(on_disk) = matched.get(&save.yaml_index) {
            result.devices.insert(Role::SystemSave, on_disk.node.clone());
            result.has_save = true;
        }
    }

    persist_traits(device_ops, &gadget, &installed, &encryption, &result)?;

    if opts.mount {
        let mount_structures = build_full_installed(&gadget, &matched);
        let (_seed_mount, mounts) = mount_volumes(device_ops, &mount_structures, &encryption)?;
        result.mounts = Some(mounts);
    }

    Ok(result)
}

fn persist_traits(
    _device_ops: &dyn DeviceOps,
    gadget: &GadgetVolume,
    installed: &[InstalledStructure],
    encryption: &EncryptionSetupData,
    result: &InstallResult,
) -> Result<(), InstallError> {
    let data_device = match result.devices.get(&Role::SystemData) {
        Some(device) => device,
        None => return Ok(()),
    };

    let mut structure_encryption = BTreeMap::new();
    for structure in installed {
        let label = encryption_label(&structure.gadget);

        if let Some(enc) = encryption.get(&label) {
            structure_encryption.insert(structure.gadget.name.clone(), StructureEncryptionParameters { method: enc.method });
        }
    }

    let traits = DiskVolumeDeviceTraits {
        kernel_path: data_device.clone(),
        disk_id: String::new(),
        schema: gadget.schema.unwrap_or(gadget_types::PartitionTableSchema::Gpt),
        size: 0,
        sector_size: 512,
        gpt_table_uuid: None,
        structure_encryption,
    };

    let mut mapping = DiskMapping::new();
    mapping.insert(gadget.name.clone(), traits);

    let data_mount = mount_point_for_device(std::path::Path::new(DEFAULT_RUN_DIR), data_device);
    let save_mount = result.devices.get(&Role::SystemSave).map(|d| mount_point_for_device(std::path::Path::new(DEFAULT_RUN_DIR), d));

    traits_persister::persist_to_data_and_save(&data_mount, save_mount.as_deref(), &mapping)
        .map_err(InstallError::from)
}

/// The path `MountVolumes` mounts a structure of the given role (and, for
/// roles outside the closed set, name) at, per §6's canonical-path table.
fn canonical_mount_path(role: Option<Role>, name: &str) -> PathBuf {
    let run_mnt = Path::new(crate::options::INITRAMFS_RUN_MNT);

    match role {
        Some(Role::SystemSeed) | Some(Role::SystemSeedNull) => run_mnt.join("ubuntu-seed"),
        Some(Role::SystemBoot) => run_mnt.join("ubuntu-boot"),
        Some(Role::SystemSave) => run_mnt.join("ubuntu-save"),
        Some(Role::SystemData) => PathBuf::from(crate::options::INSTALL_UBUNTU_DATA_DIR),
        _ => run_mnt.join(name),
    }
}

/// Builds the `InstalledStructure` list `MountVolumes` needs from an
/// already-resolved match map: every non-MBR structure the gadget
/// declares, including ones `install`/`factory_reset` didn't themselves
/// create or touch (the seed, and — for factory reset — `system-save`).
fn build_full_installed(gadget: &GadgetVolume, matched: &BTreeMap<usize, gadget_types::OnDiskStructure>) -> Vec<InstalledStructure> {
    gadget
        .structures
        .iter()
        .filter(|s| !s.is_mbr())
        .filter_map(|s| matched.get(&s.yaml_index).map(|on_disk| InstalledStructure { gadget: s.clone(), raw_device: on_disk.node.clone() }))
        .collect()
}

/// Re-reads the boot device and matches every non-MBR structure in
/// `gadget` against it, for `--mount`'s "leave every volume mounted,
/// including structures this call didn't itself create" need (§4.8 step
/// 14). `install` only tracks the structures it just created/wrote, so
/// this re-resolves the full on-disk layout the same way `factory_reset`'s
/// own `ensure_compatible` call already does.
fn match_all_structures(
    device_ops: &dyn DeviceOps,
    checker: &dyn VolumeCompatibilityChecker,
    gadget: &GadgetVolume,
    boot_device: &Path,
    gadget_root: &Path,
) -> Result<Vec<InstalledStructure>, InstallError> {
    let disk = read_on_disk_volume(device_ops, boot_device)?;
    let reconcile_opts = ReconcileOptions {
        create_all_missing: false,
        gadget_root_dir: gadget_root.to_path_buf(),
        assume_creatable_partitions_created: true,
    };
    let matched = checker.ensure_compatible(gadget, &disk, &reconcile_opts)?;

    Ok(build_full_installed(gadget, &matched))
}

/// `MountVolumes` (§4.8): mounts every structure with a filesystem at its
/// canonical path, requiring exactly one seed structure. Returns the
/// seed's mount point and a `Mounts` handle whose `unmount_all` rolls
/// every mounted point back, including ones already made when a later
/// structure fails to mount.
pub fn mount_volumes(
    device_ops: &dyn DeviceOps,
    installed: &[InstalledStructure],
    encryption: &EncryptionSetupData,
) -> Result<(PathBuf, fs_mounter::Mounts), InstallError> {
    let seed_count = installed.iter().filter(|s| s.gadget.role.map_or(false, Role::is_seed)).count();
    if seed_count != 1 {
        return Err(InstallError::AmbiguousSeed { count: seed_count });
    }

    let mut mounts = fs_mounter::Mounts::new();
    let mut seed_mount_dir = None;

    for structure in installed {
        if structure.gadget.is_mbr() {
            continue;
        }
        let fs = match structure.gadget.filesystem {
            Some(fs) => fs,
            None => continue,
        };

        let device = target_device(structure, encryption);
        let mount_point = canonical_mount_path(structure.gadget.role, &structure.gadget.name);

        let mount_result = mount_filesystem(device_ops, device, fs.into(), &mount_point, MountOptions::default());
        if let Err(why) = mount_result {
            mounts.unmount_all(device_ops, "rolling back a failed MountVolumes").ok();
            return Err(InstallError::from(why));
        }

        mounts.push(mount_point.clone());

        if structure.gadget.role.map_or(false, Role::is_seed) {
            seed_mount_dir = Some(mount_point);
        }
    }

    Ok((seed_mount_dir.expect("exactly one seed structure was checked above"), mounts))
}

/// `WriteContent` (§4.8): for each `(structure, laid-out content)` pair with
/// a filesystem, mounts the (possibly encrypted) target device, writes its
/// content, then unmounts — independent of `Install`'s combined
/// encrypt→mkfs→write-content sequence, for callers that format separately.
pub fn write_content(
    device_ops: &dyn DeviceOps,
    pairs: &[(InstalledStructure, gadget_types::LaidOutStructure)],
    encryption: &EncryptionSetupData,
    observer: &dyn content_writer::ContentObserver,
) -> Result<(), InstallError> {
    for (structure, laid_out) in pairs {
        if structure.gadget.is_mbr() {
            continue;
        }
        let fs = match structure.gadget.filesystem {
            Some(fs) => fs,
            None => continue,
        };

        let device = target_device(structure, encryption);
        let mount_point = mount_point_for_device(Path::new(DEFAULT_RUN_DIR), device);

        mount_filesystem(device_ops, device, fs.into(), &mount_point, MountOptions::default())?;

        let write_result = content_writer::write_content(laid_out, &mount_point, device, observer);
        let unmount_result = unmount_with_fallback_to_lazy(device_ops, &mount_point, "WriteContent");

        write_result?;
        unmount_result?;
    }

    Ok(())
}

/// `SaveStorageTraits` (§4.8): like `persist_traits`, but merges the
/// encryption parameters of every volume into a single manifest before
/// writing, so multi-volume gadgets get one coherent `disk-mapping.json`.
pub fn save_storage_traits(
    volumes: &BTreeMap<String, (GadgetVolume, Vec<InstalledStructure>)>,
    encryption: &EncryptionSetupData,
    data_mount: &Path,
    save_mount: Option<&Path>,
) -> Result<(), InstallError> {
    let mut mapping = DiskMapping::new();

    for (volume_name, (gadget, installed)) in volumes {
        let data_device = match installed.iter().find(|s| s.gadget.role == Some(Role::SystemData)) {
            Some(s) => target_device(s, encryption).to_path_buf(),
            None => continue,
        };

        let mut structure_encryption = BTreeMap::new();
        for structure in installed {
            let label = encryption_label(&structure.gadget);

            if let Some(enc) = encryption.get(&label) {
                structure_encryption
                    .insert(structure.gadget.name.clone(), StructureEncryptionParameters { method: enc.method });
            }
        }

        mapping.insert(
            volume_name.clone(),
            DiskVolumeDeviceTraits {
                kernel_path: data_device,
                disk_id: String::new(),
                schema: gadget.schema.unwrap_or(gadget_types::PartitionTableSchema::Gpt),
                size: 0,
                sector_size: 512,
                gpt_table_uuid: None,
                structure_encryption,
            },
        );
    }

    traits_persister::persist_to_data_and_save(data_mount, save_mount, &mapping).map_err(InstallError::from)
}

/// `MatchDisksToGadgetVolumes` (§4.8): for each gadget volume, reads its
/// on-disk volume from the device the caller has pre-assigned to it and
/// runs the compatibility checker, without creating or deleting anything.
pub fn match_disks_to_gadget_volumes(
    device_ops: &dyn DeviceOps,
    volumes: &BTreeMap<String, GadgetVolume>,
    devices: &BTreeMap<String, PathBuf>,
    checker: &dyn VolumeCompatibilityChecker,
    opts: &ReconcileOptions,
) -> Result<BTreeMap<String, BTreeMap<usize, gadget_types::OnDiskStructure>>, InstallError> {
    let mut result = BTreeMap::new();

    for (name, gadget) in volumes {
        let device = devices
            .get(name)
            .ok_or_else(|| InstallError::MissingDevice { name: name.clone() })?;

        let disk = read_on_disk_volume(device_ops, device)?;
        let matched = checker.ensure_compatible(gadget, &disk, opts)?;
        result.insert(name.clone(), matched);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encryption_naming_appends_enc_suffix_to_encryptable_roles_only() {
        let gadget = GadgetVolume {
            name: "pc".into(),
            schema: Some(gadget_types::PartitionTableSchema::Gpt),
            structures: vec![
                GadgetStructure {
                    yaml_index: 0,
                    name: "ubuntu-boot".into(),
                    role: Some(Role::SystemBoot),
                    partition_type: gadget_types::PartitionTypeTag::new("0C"),
                    filesystem_label: None,
                    filesystem: None,
                    size: 0,
                    offset: None,
                },
                GadgetStructure {
                    yaml_index: 1,
                    name: "ubuntu-data".into(),
                    role: Some(Role::SystemData),
                    partition_type: gadget_types::PartitionTypeTag::new("83"),
                    filesystem_label: Some("ubuntu-data".into()),
                    filesystem: None,
                    size: 0,
                    offset: None,
                },
            ],
        };

        let renamed = apply_encryption_naming(&gadget, EncryptionType::Luks);
        assert_eq!(renamed.structures[0].name, "ubuntu-boot");
        assert_eq!(renamed.structures[1].name, "ubuntu-data-enc");

        let untouched = apply_encryption_naming(&gadget, EncryptionType::None);
        assert_eq!(untouched, gadget);
    }

    #[test]
    fn clear_stale_sealed_keys_removes_files_and_tolerates_a_missing_directory() {
        let tmp = std::env::temp_dir().join("gadgetinst-orchestrator-stale-keys-test");
        let _ = std::fs::remove_dir_all(&tmp);

        // No seed mount / key directory at all: must not panic or error.
        clear_stale_sealed_keys(&tmp);

        let key_dir = tmp.join(crate::options::SEED_ENCRYPTION_KEY_DIR);
        std::fs::create_dir_all(&key_dir).unwrap();
        std::fs::write(key_dir.join("ubuntu-data.sealed-key"), b"stale").unwrap();
        std::fs::write(key_dir.join("ubuntu-save.sealed-key"), b"stale").unwrap();

        clear_stale_sealed_keys(&tmp);

        assert_eq!(std::fs::read_dir(&key_dir).unwrap().count(), 0);

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
