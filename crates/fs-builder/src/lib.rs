//! `mkfs`-dispatched filesystem creation (§4.5).

#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate log;

use device_ops::DeviceOps;
use gadget_types::FileSystem;
use std::path::Path;

#[derive(Debug, Fail)]
pub enum FsBuilderError {
    #[fail(display = "cannot format {:?} as {}: {}", device, fs, why)]
    Mkfs { device: std::path::PathBuf, fs: FileSystem, why: std::io::Error },

    #[fail(display = "udev did not settle after formatting {:?}: {}", device, why)]
    Settle { device: std::path::PathBuf, why: std::io::Error },
}

/// The parameters a single filesystem is built with (§4.5).
pub struct MakeFilesystem<'a> {
    pub fs: FileSystem,
    pub device: &'a Path,
    pub label: Option<&'a str>,
    /// `0` means "let the formatting tool choose" (§4.5).
    pub sector_size: u32,
}

/// Formats `params.device`, then triggers a udev settle on it so the new
/// filesystem's superblock is visible to subsequent reads (§4.5, §6.1's
/// per-node `udevadm trigger --settle <device>` binding, as distinct from
/// the partitioner's global `udev settle --timeout=180`).
pub fn make_filesystem(device_ops: &dyn DeviceOps, params: &MakeFilesystem) -> Result<(), FsBuilderError> {
    info!("formatting {:?} as {}", params.device, params.fs);

    device_ops
        .mkfs(params.device, params.fs, params.label, params.sector_size)
        .map_err(|why| FsBuilderError::Mkfs { device: params.device.to_path_buf(), why })?;

    device_ops
        .udev_trigger_settle(params.device)
        .map_err(|why| FsBuilderError::Settle { device: params.device.to_path_buf(), why })
}

#[cfg(test)]
mod tests {
    use super::*;
    use device_ops::{MockDeviceOps, RecordedCall};
    use std::path::PathBuf;

    #[test]
    fn formats_then_settles() {
        let mock = MockDeviceOps::new();
        let device = PathBuf::from("/dev/mmcblk0p4");

        make_filesystem(
            &mock,
            &MakeFilesystem { fs: FileSystem::Ext4, device: &device, label: Some("writable"), sector_size: 0 },
        )
        .unwrap();

        let calls = mock.calls.borrow();
        assert!(matches!(calls[0], RecordedCall::Mkfs { .. }));
        assert!(matches!(calls[1], RecordedCall::UdevTriggerSettle { .. }));
    }
}
