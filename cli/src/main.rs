extern crate clap;
#[macro_use]
extern crate failure_derive;
extern crate gadgetinst;
extern crate gadgetinst_utils;
extern crate libc;
#[macro_use]
extern crate log;
extern crate proc_mounts;
extern crate reconciler;
extern crate serde_derive;
extern crate serde_yaml;

mod collaborators;
mod errors;
mod gadget_yaml;

use clap::{App, Arg, ArgMatches, SubCommand};
use collaborators::{
    ExternalDeviceSetupHook, FsContentLayouter, FsGadgetReader, MountedSeedDeviceLocator, NoopKernelInfoReader,
    SimpleCompatibilityChecker,
};
use errors::CliError;
use gadgetinst::{
    collaborators::DeviceLocator, install, factory_reset, mount_volumes, read_on_disk_volume, DeviceOps,
    DeviceSetupHookInvoker, DeviceSetupRequest, EncryptionSetupData, EncryptionType, FactoryResetOptions,
    InstallOptions, InstalledStructure, Model, ModelGrade, PermissiveObserver, RealDeviceOps, Role,
};
use reconciler::{ReconcileOptions, VolumeCompatibilityChecker};
use std::{collections::BTreeMap, path::PathBuf, process::exit};

const DEFAULT_LOG_FILE: &str = "/var/log/gadgetinst.log";

struct NoopDeviceSetupHook;

impl DeviceSetupHookInvoker for NoopDeviceSetupHook {
    fn invoke(&self, _request: &DeviceSetupRequest) -> Result<(), String> {
        Err("no --device-setup-hook was given".into())
    }
}

fn model_grade_arg() -> Arg<'static, 'static> {
    Arg::with_name("model-grade")
        .long("model-grade")
        .help("the model's grade: dangerous, signed, secured, or classic")
        .takes_value(true)
        .default_value("signed")
}

fn gadget_root_arg() -> Arg<'static, 'static> {
    Arg::with_name("gadget-root")
        .long("gadget-root")
        .help("path to the root of the mounted gadget snap")
        .takes_value(true)
        .required(true)
}

fn boot_device_arg() -> Arg<'static, 'static> {
    Arg::with_name("boot-device")
        .long("boot-device")
        .help("the disk device to partition, overriding seed-mount discovery")
        .takes_value(true)
}

fn kernel_root_arg() -> Arg<'static, 'static> {
    Arg::with_name("kernel-root").long("kernel-root").help("path to the mounted kernel snap").takes_value(true)
}

fn encryption_arg() -> Arg<'static, 'static> {
    Arg::with_name("encryption")
        .long("encryption")
        .help("none, luks, or device-setup-hook")
        .takes_value(true)
        .default_value("none")
}

fn key_arg() -> Arg<'static, 'static> {
    Arg::with_name("key")
        .long("key")
        .help("ROLE=PATH to a file containing the encryption key for ROLE (system-data or system-save)")
        .takes_value(true)
        .multiple(true)
        .number_of_values(1)
}

fn device_setup_hook_arg() -> Arg<'static, 'static> {
    Arg::with_name("device-setup-hook")
        .long("device-setup-hook")
        .help("path to the external device-setup-hook binary, required with --encryption=device-setup-hook")
        .takes_value(true)
}

fn mount_after_arg() -> Arg<'static, 'static> {
    Arg::with_name("mount").long("mount").help("also mount every volume at its canonical path once done")
}

fn parse_model_grade(matches: &ArgMatches) -> Result<ModelGrade, CliError> {
    match matches.value_of("model-grade").unwrap_or("signed") {
        "dangerous" => Ok(ModelGrade::Dangerous),
        "signed" => Ok(ModelGrade::Signed),
        "secured" => Ok(ModelGrade::Secured),
        "classic" => Ok(ModelGrade::Classic),
        other => Err(CliError::InvalidEncryptionType { value: other.to_string() }),
    }
}

fn parse_encryption_type(matches: &ArgMatches) -> Result<EncryptionType, CliError> {
    match matches.value_of("encryption").unwrap_or("none") {
        "none" => Ok(EncryptionType::None),
        "luks" => Ok(EncryptionType::Luks),
        "device-setup-hook" => Ok(EncryptionType::DeviceSetupHook),
        other => Err(CliError::InvalidEncryptionType { value: other.to_string() }),
    }
}

fn parse_keys(matches: &ArgMatches) -> Result<BTreeMap<Role, Vec<u8>>, CliError> {
    let mut keys = BTreeMap::new();

    for entry in matches.values_of("key").into_iter().flatten() {
        let mut parts = entry.splitn(2, '=');
        let (role, path) = match (parts.next(), parts.next()) {
            (Some(role), Some(path)) => (role, path),
            _ => return Err(CliError::MalformedKeyArg { entry: entry.to_string() }),
        };

        let role: Role =
            role.parse().map_err(|_| CliError::UnknownRole { name: "--key".into(), role: role.into() })?;

        let key =
            gadgetinst_utils::read(path).map_err(|why| CliError::GadgetRead { path: PathBuf::from(path), why })?;

        keys.insert(role, key);
    }

    Ok(keys)
}

fn device_setup_hook(matches: &ArgMatches) -> Result<ExternalDeviceSetupHook, CliError> {
    let path = matches.value_of("device-setup-hook").ok_or(CliError::NoDeviceSetupHook)?;
    Ok(ExternalDeviceSetupHook { hook_path: PathBuf::from(path) })
}

fn seed_locator() -> MountedSeedDeviceLocator {
    MountedSeedDeviceLocator {
        seed_mountpoint: PathBuf::from(gadgetinst::options::UBUNTU_SEED_MOUNTPOINT),
        volume_mountpoints: BTreeMap::new(),
    }
}

/// Resolves the `InstalledStructure` list a `--mount`/`mount-volumes`
/// invocation needs: the gadget's boot volume, its boot device, and the
/// gadget structures already present on that device (§4.8's
/// `MatchDisksToGadgetVolumes` combined with `MountVolumes`).
fn resolve_installed_structures(
    device_ops: &dyn DeviceOps,
    gadget_root: &std::path::Path,
    boot_device: Option<&std::path::Path>,
) -> Result<Vec<InstalledStructure>, CliError> {
    let volumes = gadget_yaml::read_info_and_validate(gadget_root)?;

    let gadget = volumes
        .values()
        .find(|v| v.structures.iter().any(|s| s.role.map_or(false, Role::is_seed)))
        .ok_or_else(|| CliError::EmptyVolumes { path: gadget_root.to_path_buf() })?;

    let boot_device = match boot_device {
        Some(device) => device.to_path_buf(),
        None => seed_locator().device_for_seed()?,
    };

    let disk = read_on_disk_volume(device_ops, &boot_device)?;
    let checker = SimpleCompatibilityChecker;
    let opts = ReconcileOptions {
        create_all_missing: false,
        gadget_root_dir: gadget_root.to_path_buf(),
        assume_creatable_partitions_created: true,
    };

    let matched = checker.ensure_compatible(gadget, &disk, &opts).map_err(|why| CliError::SeedLookup {
        mountpoint: boot_device.clone(),
        why: std::io::Error::new(std::io::ErrorKind::Other, why.to_string()),
    })?;

    Ok(gadget
        .structures
        .iter()
        .filter(|s| !s.is_mbr())
        .filter_map(|s| matched.get(&s.yaml_index).map(|on_disk| InstalledStructure { gadget: s.clone(), raw_device: on_disk.node.clone() }))
        .collect())
}

fn mount_after_install(device_ops: &dyn DeviceOps, gadget_root: &std::path::Path, boot_device: Option<&std::path::Path>, encryption: &EncryptionSetupData) -> Result<(), CliError> {
    let installed = resolve_installed_structures(device_ops, gadget_root, boot_device)?;
    // `Mounts` has no `Drop` unwind of its own (§4.6): every mount point it
    // tracks stays mounted once this returns, which is exactly "leave
    // volumes mounted" (§4.8 step 14).
    let (seed_mount, _mounts) = mount_volumes(device_ops, &installed, encryption)?;
    info!("mounted every volume; seed is at {:?}", seed_mount);
    Ok(())
}

fn run_install(matches: &ArgMatches) -> Result<(), CliError> {
    let model = Model::new(parse_model_grade(matches)?);
    let encryption_type = parse_encryption_type(matches)?;
    let keys = parse_keys(matches)?;

    let opts = InstallOptions {
        gadget_root: PathBuf::from(matches.value_of("gadget-root").expect("required")),
        encryption_type,
        boot_device: matches.value_of("boot-device").map(PathBuf::from),
        kernel_root: matches.value_of("kernel-root").map(PathBuf::from),
        mount: matches.is_present("mount"),
    };

    let device_ops = RealDeviceOps;
    let gadget_reader = FsGadgetReader;
    let locator = seed_locator();
    let checker = SimpleCompatibilityChecker;
    let layouter = FsContentLayouter;
    let kernel_reader = NoopKernelInfoReader;
    let observer = PermissiveObserver;
    let hook_invoker: Box<dyn DeviceSetupHookInvoker> = if encryption_type == EncryptionType::DeviceSetupHook {
        Box::new(device_setup_hook(matches)?)
    } else {
        Box::new(NoopDeviceSetupHook)
    };

    let result = install(
        &device_ops,
        &gadget_reader,
        &locator,
        &checker,
        &layouter,
        &kernel_reader,
        hook_invoker.as_ref(),
        &observer,
        &model,
        &opts,
        &keys,
    )?;

    info!("install finished; {} device(s) populated", result.devices.len());

    if result.mounts.is_some() {
        info!("every volume left mounted at its canonical path");
    }

    Ok(())
}

fn run_factory_reset(matches: &ArgMatches) -> Result<(), CliError> {
    let model = Model::new(parse_model_grade(matches)?);
    let encryption_type = parse_encryption_type(matches)?;
    let keys = parse_keys(matches)?;

    let opts = FactoryResetOptions {
        gadget_root: PathBuf::from(matches.value_of("gadget-root").expect("required")),
        encryption_type,
        boot_device: matches.value_of("boot-device").map(PathBuf::from),
        kernel_root: matches.value_of("kernel-root").map(PathBuf::from),
        mount: matches.is_present("mount"),
    };

    let device_ops = RealDeviceOps;
    let gadget_reader = FsGadgetReader;
    let locator = seed_locator();
    let checker = SimpleCompatibilityChecker;
    let layouter = FsContentLayouter;
    let kernel_reader = NoopKernelInfoReader;
    let observer = PermissiveObserver;
    let hook_invoker: Box<dyn DeviceSetupHookInvoker> = if encryption_type == EncryptionType::DeviceSetupHook {
        Box::new(device_setup_hook(matches)?)
    } else {
        Box::new(NoopDeviceSetupHook)
    };

    let result = factory_reset(
        &device_ops,
        &gadget_reader,
        &locator,
        &checker,
        &layouter,
        &kernel_reader,
        hook_invoker.as_ref(),
        &observer,
        &model,
        &opts,
        &keys,
    )?;

    info!("factory reset finished; save partition present: {}", result.has_save);

    if result.mounts.is_some() {
        info!("every volume left mounted at its canonical path");
    }

    Ok(())
}

fn run_mount_volumes(matches: &ArgMatches) -> Result<(), CliError> {
    let gadget_root = PathBuf::from(matches.value_of("gadget-root").expect("required"));
    let boot_device = matches.value_of("boot-device").map(PathBuf::from);

    let device_ops = RealDeviceOps;
    mount_after_install(&device_ops, &gadget_root, boot_device.as_deref(), &EncryptionSetupData::default())
}

fn main() {
    if let Err(why) = gadgetinst::logging::init(DEFAULT_LOG_FILE) {
        eprintln!("gadgetinst: failed to initialize logging: {}", why);
    }

    let matches = App::new("gadgetinst")
        .about("installs and resets an immutable-root gadget system's partition layout")
        .subcommand(
            SubCommand::with_name("install")
                .about("partitions, formats, and populates a fresh system")
                .arg(gadget_root_arg())
                .arg(boot_device_arg())
                .arg(kernel_root_arg())
                .arg(model_grade_arg())
                .arg(encryption_arg())
                .arg(key_arg())
                .arg(device_setup_hook_arg())
                .arg(mount_after_arg()),
        )
        .subcommand(
            SubCommand::with_name("factory-reset")
                .about("resets system-boot and system-data, preserving system-save")
                .arg(gadget_root_arg())
                .arg(boot_device_arg())
                .arg(kernel_root_arg())
                .arg(model_grade_arg())
                .arg(encryption_arg())
                .arg(key_arg())
                .arg(device_setup_hook_arg())
                .arg(mount_after_arg()),
        )
        .subcommand(
            SubCommand::with_name("mount-volumes")
                .about("mounts every already-installed volume at its canonical path (unencrypted only)")
                .arg(gadget_root_arg())
                .arg(boot_device_arg()),
        )
        .get_matches();

    let result = match matches.subcommand() {
        ("install", Some(sub)) => run_install(sub),
        ("factory-reset", Some(sub)) => run_factory_reset(sub),
        ("mount-volumes", Some(sub)) => run_mount_volumes(sub),
        _ => {
            eprintln!("gadgetinst: a subcommand is required (install, factory-reset, mount-volumes)");
            exit(1);
        }
    };

    if let Err(why) = result {
        eprintln!("gadgetinst: {}", why);
        exit(1);
    }
}
