use crate::DeviceOps;
use gadget_types::FileSystem;
use std::{
    cell::RefCell,
    collections::HashSet,
    io,
    path::{Path, PathBuf},
    time::Duration,
};
use sys_mount::MountFlags;

/// One call recorded by `MockDeviceOps`, for assertions in component tests.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Mount { device: PathBuf, target: PathBuf, fstype: String },
    Unmount { target: PathBuf, lazy: bool },
    PtableAppend { device: PathBuf, script: Vec<u8> },
    PtableDelete { device: PathBuf, indices: Vec<u32> },
    ReloadPtable { device: PathBuf, via_rescan: bool },
    UdevSettle,
    UdevTriggerSettle { node: PathBuf },
    Mkfs { device: PathBuf, fs: FileSystem, label: Option<String> },
    WipeSignatures { device: PathBuf },
}

/// A recording, in-memory `DeviceOps` that substitutes for real block-device
/// access in tests rather than touching actual hardware.
#[derive(Default)]
pub struct MockDeviceOps {
    pub calls: RefCell<Vec<RecordedCall>>,
    /// Nodes this mock pretends exist, seeded by the test and appended to
    /// by `ptable_append`/`mkfs` as a naive "creation" simulation.
    pub existing_nodes: RefCell<HashSet<PathBuf>>,
    pub ptable_dump: RefCell<Vec<u8>>,
    pub fail_next_mount: RefCell<bool>,
}

impl MockDeviceOps {
    pub fn new() -> Self { Self::default() }

    pub fn with_existing_nodes<I: IntoIterator<Item = PathBuf>>(nodes: I) -> Self {
        let mock = Self::new();
        mock.existing_nodes.borrow_mut().extend(nodes);
        mock
    }
}

impl DeviceOps for MockDeviceOps {
    fn mount(&self, device: &Path, target: &Path, fstype: &str, _flags: MountFlags) -> io::Result<()> {
        if *self.fail_next_mount.borrow() {
            *self.fail_next_mount.borrow_mut() = false;
            return Err(io::Error::new(io::ErrorKind::Other, "mock mount failure"));
        }
        self.calls.borrow_mut().push(RecordedCall::Mount {
            device: device.to_path_buf(),
            target: target.to_path_buf(),
            fstype: fstype.to_string(),
        });
        Ok(())
    }

    fn unmount(&self, target: &Path, lazy: bool) -> io::Result<()> {
        self.calls.borrow_mut().push(RecordedCall::Unmount { target: target.to_path_buf(), lazy });
        Ok(())
    }

    fn ptable_append(&self, device: &Path, script: &[u8]) -> io::Result<()> {
        self.calls.borrow_mut().push(RecordedCall::PtableAppend {
            device: device.to_path_buf(),
            script: script.to_vec(),
        });
        Ok(())
    }

    fn ptable_delete(&self, device: &Path, indices: &[u32]) -> io::Result<()> {
        self.calls.borrow_mut().push(RecordedCall::PtableDelete {
            device: device.to_path_buf(),
            indices: indices.to_vec(),
        });
        Ok(())
    }

    fn ptable_read(&self, _device: &Path) -> io::Result<Vec<u8>> { Ok(self.ptable_dump.borrow().clone()) }

    fn reload_ptable(&self, device: &Path, via_rescan: bool) -> io::Result<()> {
        self.calls
            .borrow_mut()
            .push(RecordedCall::ReloadPtable { device: device.to_path_buf(), via_rescan });
        Ok(())
    }

    fn udev_settle(&self, _timeout: Duration) -> io::Result<()> {
        self.calls.borrow_mut().push(RecordedCall::UdevSettle);
        Ok(())
    }

    fn udev_trigger_settle(&self, node: &Path) -> io::Result<()> {
        self.calls.borrow_mut().push(RecordedCall::UdevTriggerSettle { node: node.to_path_buf() });
        self.existing_nodes.borrow_mut().insert(node.to_path_buf());
        Ok(())
    }

    fn node_exists(&self, node: &Path) -> bool { self.existing_nodes.borrow().contains(node) }

    fn mkfs(&self, device: &Path, fs: FileSystem, label: Option<&str>, _sector_size: u32) -> io::Result<()> {
        self.calls.borrow_mut().push(RecordedCall::Mkfs {
            device: device.to_path_buf(),
            fs,
            label: label.map(String::from),
        });
        Ok(())
    }

    fn wipe_signatures(&self, device: &Path) -> io::Result<()> {
        self.calls.borrow_mut().push(RecordedCall::WipeSignatures { device: device.to_path_buf() });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let mock = MockDeviceOps::new();
        mock.wipe_signatures(Path::new("/dev/sda")).unwrap();
        mock.ptable_append(Path::new("/dev/sda"), b"script").unwrap();
        assert_eq!(mock.calls.borrow().len(), 2);
    }

    #[test]
    fn node_exists_tracks_triggered_nodes() {
        let mock = MockDeviceOps::new();
        assert!(!mock.node_exists(Path::new("/dev/sda3")));
        mock.udev_trigger_settle(Path::new("/dev/sda3")).unwrap();
        assert!(mock.node_exists(Path::new("/dev/sda3")));
    }
}
