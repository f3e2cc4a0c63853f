//! The gadget installer core: reconciles a gadget's declared partition
//! layout against a disk, creates and encrypts partitions, builds
//! filesystems, writes content, and persists the resulting device traits.
//!
//! Everything this crate needs from the surrounding system — gadget YAML
//! parsing, the on-disk layout computer, the kernel driver-tree builder —
//! is consumed through the narrow seams in [`collaborators`].

#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

pub mod collaborators;
mod disk_reader;
pub mod error;
pub mod logging;
mod model;
pub mod options;
mod orchestrator;

pub use self::disk_reader::read_on_disk_volume;
pub use self::error::InstallError;
pub use self::model::{Model, ModelGrade};
pub use self::options::{FactoryResetOptions, InstallOptions};
pub use self::orchestrator::{
    encrypt_partitions, factory_reset, install, match_disks_to_gadget_volumes, mount_volumes,
    save_storage_traits, write_content, InstalledStructure, InstallResult,
};

pub use content_writer::{ContentObserver, ContentOp, ObserveAction, PermissiveObserver};
pub use device_ops::{DeviceOps, MockDeviceOps, RealDeviceOps};
pub use encryption::{DeviceSetupHookInvoker, DeviceSetupRequest};
pub use gadget_types::*;
pub use reconciler::{NullCompatibilityChecker, VolumeCompatibilityChecker};
