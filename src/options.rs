use gadget_types::EncryptionType;
use std::path::PathBuf;

/// Parameters for `install` (§4.8 Install).
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub gadget_root: PathBuf,
    pub encryption_type: EncryptionType,
    /// Overrides the boot-device discovery in step 4 when the caller
    /// already knows which disk to use.
    pub boot_device: Option<PathBuf>,
    pub kernel_root: Option<PathBuf>,
    /// Leave filesystems mounted at their canonical paths once install
    /// completes (§4.8 step 14). When set, `install` returns with
    /// `InstallResult::mounts` populated and the caller owns unmounting.
    pub mount: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        InstallOptions {
            gadget_root: PathBuf::new(),
            encryption_type: EncryptionType::None,
            boot_device: None,
            kernel_root: None,
            mount: false,
        }
    }
}

/// Parameters for `factory_reset` (§4.8 FactoryReset).
#[derive(Debug, Clone)]
pub struct FactoryResetOptions {
    pub gadget_root: PathBuf,
    pub encryption_type: EncryptionType,
    pub boot_device: Option<PathBuf>,
    pub kernel_root: Option<PathBuf>,
    pub mount: bool,
}

impl Default for FactoryResetOptions {
    fn default() -> Self {
        FactoryResetOptions {
            gadget_root: PathBuf::new(),
            encryption_type: EncryptionType::None,
            boot_device: None,
            kernel_root: None,
            mount: false,
        }
    }
}

/// The directory under which scoped mount points are created (§4.7, §5).
pub const DEFAULT_RUN_DIR: &str = "/run";

/// The initramfs mount namespace's conventional mount root, used to build
/// the canonical per-role mount paths `MountVolumes` targets (§6).
pub const INITRAMFS_RUN_MNT: &str = "/run/mnt";

/// Where `system-data` is canonically mounted once installed, distinct
/// from the other roles' `<initramfs-run-mnt>/<name>` paths (§6).
pub const INSTALL_UBUNTU_DATA_DIR: &str = "/run/mnt/ubuntu-data";

/// Where the seed-role partition is expected to already be mounted, used
/// by the boot-device discovery fallback (§4.8 step 4).
pub const UBUNTU_SEED_MOUNTPOINT: &str = "/run/mnt/ubuntu-seed";

/// Seed-encryption-key directory cleaned of stale sealed keys before a
/// reinstall (§4.8 step 8, LP:#1879338).
pub const SEED_ENCRYPTION_KEY_DIR: &str = "device/fde";
