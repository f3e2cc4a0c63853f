use crate::role::Role;
use std::{collections::BTreeMap, path::PathBuf};

/// The two encryption backends an encrypted structure may use (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionMethod {
    Luks,
    Ice,
}

/// An encryption request for a single structure, as accepted by
/// `EncryptPartitions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionType {
    None,
    Luks,
    DeviceSetupHook,
}

/// One encrypted device's bookkeeping, keyed by the structure's filesystem
/// label in `EncryptionSetupData` (§3). Kept in memory across API calls so
/// that `EncryptPartitions` and later `WriteContent`/`MountVolumes` can be
/// called separately.
#[derive(Clone)]
pub struct EncryptedDevice {
    pub role: Role,
    pub raw_device: PathBuf,
    pub encrypted_device: PathBuf,
    pub volume_name: String,
    pub key: Vec<u8>,
    pub encrypted_sector_size: u64,
    pub method: EncryptionMethod,
}

impl std::fmt::Debug for EncryptedDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("EncryptedDevice")
            .field("role", &self.role)
            .field("raw_device", &self.raw_device)
            .field("encrypted_device", &self.encrypted_device)
            .field("volume_name", &self.volume_name)
            .field("key", &"<redacted>")
            .field("encrypted_sector_size", &self.encrypted_sector_size)
            .field("method", &self.method)
            .finish()
    }
}

/// A map keyed by filesystem label, accumulated by `EncryptPartitions` and
/// consumed by later orchestrator steps (§3).
#[derive(Debug, Clone, Default)]
pub struct EncryptionSetupData(pub BTreeMap<String, EncryptedDevice>);

impl EncryptionSetupData {
    pub fn new() -> Self { EncryptionSetupData(BTreeMap::new()) }

    pub fn insert(&mut self, label: String, device: EncryptedDevice) {
        self.0.insert(label, device);
    }

    pub fn get(&self, label: &str) -> Option<&EncryptedDevice> { self.0.get(label) }

    /// Resolves the device a filesystem should be built on / content written
    /// to: the mapper node if the structure was encrypted, else the raw
    /// partition node (used by `WriteContent`/`MountVolumes`).
    pub fn target_device<'a>(&'a self, label: &str, raw: &'a std::path::Path) -> &'a std::path::Path {
        self.get(label).map_or(raw, |dev| dev.encrypted_device.as_path())
    }
}
