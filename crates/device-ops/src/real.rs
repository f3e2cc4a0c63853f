use crate::DeviceOps;
use gadget_types::FileSystem;
use gadgetinst_external as external;
use std::{io, path::Path, time::Duration};
use sys_mount::{Mount, MountFlags, UnmountFlags};

/// The production `DeviceOps`: every call shells out to the tool named in
/// the external-interfaces table via `gadgetinst-external`.
pub struct RealDeviceOps;

impl DeviceOps for RealDeviceOps {
    fn mount(&self, device: &Path, target: &Path, fstype: &str, flags: MountFlags) -> io::Result<()> {
        Mount::new(device, target, fstype, flags, None).map(|_| ())
    }

    fn unmount(&self, target: &Path, lazy: bool) -> io::Result<()> {
        let flags = if lazy { UnmountFlags::DETACH } else { UnmountFlags::empty() };
        sys_mount::unmount(target, flags)
    }

    fn ptable_append(&self, device: &Path, script: &[u8]) -> io::Result<()> {
        external::sfdisk_append(device, &String::from_utf8_lossy(script))
    }

    fn ptable_delete(&self, device: &Path, indices: &[u32]) -> io::Result<()> {
        external::sfdisk_delete(device, indices)
    }

    fn ptable_read(&self, device: &Path) -> io::Result<Vec<u8>> {
        external::sfdisk_dump(device)
    }

    fn reload_ptable(&self, device: &Path, via_rescan: bool) -> io::Result<()> {
        if via_rescan {
            let rescan = sysfs_rescan_path(device);
            external::sysfs_rescan(&rescan)
        } else {
            external::partprobe(device)
        }
    }

    fn udev_settle(&self, timeout: Duration) -> io::Result<()> {
        external::settle(timeout.as_secs() as u32)
    }

    fn udev_trigger_settle(&self, node: &Path) -> io::Result<()> {
        external::trigger_settle(node)
    }

    fn node_exists(&self, node: &Path) -> bool { node.exists() }

    fn mkfs(&self, device: &Path, fs: FileSystem, label: Option<&str>, sector_size: u32) -> io::Result<()> {
        external::mkfs(device, fs, label, sector_size)
    }

    fn wipe_signatures(&self, device: &Path) -> io::Result<()> { external::wipefs(device) }
}

/// The sysfs path whose `rescan` attribute triggers a kernel rescan of a
/// block device (§6.1's rescan-marker path).
fn sysfs_rescan_path(device: &Path) -> std::path::PathBuf {
    let name = device.file_name().unwrap_or_default().to_string_lossy().into_owned();
    Path::new("/sys/class/block").join(name).join("device").join("rescan")
}
