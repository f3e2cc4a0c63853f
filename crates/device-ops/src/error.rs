#[derive(Debug, Fail)]
pub enum DeviceOpsError {
    #[fail(display = "failed to mount {:?} at {:?}: {}", device, target, why)]
    Mount { device: std::path::PathBuf, target: std::path::PathBuf, why: std::io::Error },

    #[fail(display = "failed to unmount {:?}: {}", target, why)]
    Unmount { target: std::path::PathBuf, why: std::io::Error },

    #[fail(display = "failed to write partition table on {:?}: {}", device, why)]
    PartitionTable { device: std::path::PathBuf, why: std::io::Error },

    #[fail(display = "udev did not settle within the configured timeout: {}", why)]
    UdevTimeout { why: std::io::Error },

    #[fail(display = "device node {:?} did not appear before the deadline", node)]
    NodeUnavailable { node: std::path::PathBuf },

    #[fail(display = "failed to format {:?} as {}: {}", device, fs, why)]
    Mkfs { device: std::path::PathBuf, fs: gadget_types::FileSystem, why: std::io::Error },
}

impl From<DeviceOpsError> for std::io::Error {
    fn from(error: DeviceOpsError) -> Self {
        std::io::Error::new(std::io::ErrorKind::Other, error.to_string())
    }
}
