//! Mockable wrappers around every OS/tooling operation the installer
//! drives, promoted to a first-class trait object so the orchestrator and
//! every component in the pipeline depend on `&dyn DeviceOps` instead of
//! calling free functions directly (§9, "Replacing global mutables").

#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate log;

mod error;
mod mock;
mod real;

pub use self::error::DeviceOpsError;
pub use self::mock::{MockDeviceOps, RecordedCall};
pub use self::real::RealDeviceOps;

use gadget_types::FileSystem;
use std::{io, path::Path, time::Duration};
pub use sys_mount::MountFlags;

pub trait DeviceOps: Send + Sync {
    fn mount(&self, device: &Path, target: &Path, fstype: &str, flags: MountFlags) -> io::Result<()>;
    fn unmount(&self, target: &Path, lazy: bool) -> io::Result<()>;
    fn ptable_append(&self, device: &Path, script: &[u8]) -> io::Result<()>;
    fn ptable_delete(&self, device: &Path, indices: &[u32]) -> io::Result<()>;
    fn ptable_read(&self, device: &Path) -> io::Result<Vec<u8>>;
    fn reload_ptable(&self, device: &Path, via_rescan: bool) -> io::Result<()>;
    fn udev_settle(&self, timeout: Duration) -> io::Result<()>;
    fn udev_trigger_settle(&self, node: &Path) -> io::Result<()>;
    fn node_exists(&self, node: &Path) -> bool;
    fn mkfs(&self, device: &Path, fs: FileSystem, label: Option<&str>, sector_size: u32) -> io::Result<()>;
    fn wipe_signatures(&self, device: &Path) -> io::Result<()>;
}
