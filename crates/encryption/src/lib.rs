//! The block-encryption layer (§4.4): two variants — LUKS (format + open)
//! and `DeviceSetupHook` (linear mapper + external finaliser) — sharing a
//! single `{node, close}` capability so the orchestrator can treat either
//! uniformly once created.

#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate log;

mod error;
mod hook;

pub use self::error::EncryptionError;
pub use self::hook::{DeviceSetupHookInvoker, DeviceSetupRequest};

use gadgetinst_external as external;
use std::path::{Path, PathBuf};

/// `dmsetup`/`cryptsetup` table offsets are always expressed in 512-byte
/// sectors, independent of the underlying device's logical sector size
/// (the kernel `dm` and `cryptsetup` ABIs fix this; see §6.1).
const DM_SECTOR_SIZE: u64 = 512;
const HEADER_RESERVE_BYTES: u64 = 1024 * 1024;
const HEADER_RESERVE_SECTORS: u64 = HEADER_RESERVE_BYTES / DM_SECTOR_SIZE;

/// The capability every encryption variant exposes once created (§4.4).
pub trait EncryptedVolume {
    fn node(&self) -> &Path;
    fn close(&self) -> Result<(), EncryptionError>;
}

/// A LUKS-formatted-and-opened partition.
pub struct Luks {
    mapper_node: PathBuf,
    mapper_name: String,
}

impl Luks {
    /// Formats `raw_device` as LUKS and opens it as `/dev/mapper/<base>`
    /// (I6, §4.4). The `<base>-enc` partition-table label itself is applied
    /// earlier, to the gadget structure's own name, before reconciliation
    /// (`apply_encryption_naming`) — the GPT/MBR writer burns it into the
    /// table when the raw partition is created, so `cryptsetup` here never
    /// needs to carry a label of its own.
    pub fn create(raw_device: &Path, base: &str, key: &[u8]) -> Result<Self, EncryptionError> {
        external::luks_format(raw_device, key).map_err(|why| EncryptionError::Format { why })?;

        external::luks_open(raw_device, base, key)
            .map_err(|why| EncryptionError::Open { node: raw_device.to_path_buf(), why })?;

        Ok(Luks { mapper_node: PathBuf::from(format!("/dev/mapper/{}", base)), mapper_name: base.into() })
    }

    /// Adds a recovery passphrase slot to an already-formatted device. LUKS
    /// only; `DeviceSetupHook` has no counterpart (§4.4, §9 Open Questions).
    pub fn add_recovery_key(
        raw_device: &Path,
        existing_key: &[u8],
        recovery_key: &[u8],
    ) -> Result<(), EncryptionError> {
        external::luks_add_recovery_key(raw_device, existing_key, recovery_key)
            .map_err(|why| EncryptionError::RecoveryKey { node: raw_device.to_path_buf(), why })
    }
}

impl EncryptedVolume for Luks {
    fn node(&self) -> &Path { &self.mapper_node }

    fn close(&self) -> Result<(), EncryptionError> {
        external::luks_close(&self.mapper_name)
            .map_err(|why| EncryptionError::Close { node: self.mapper_node.clone(), why })
    }
}

/// A linear-mapper device reserving the first MiB of the raw partition for
/// a future on-disk header, with encryption finalised by an external hook.
pub struct DeviceSetupHook {
    mapper_node: PathBuf,
    mapper_name: String,
}

impl DeviceSetupHook {
    /// `name` must equal the gadget partition's name, partition label, and
    /// filesystem label (§4.4's precondition).
    pub fn create(
        raw_device: &Path,
        size_bytes: u64,
        name: &str,
        partition_label: &str,
        filesystem_label: &str,
        key: &[u8],
        invoker: &dyn DeviceSetupHookInvoker,
    ) -> Result<Self, EncryptionError> {
        if name != partition_label || name != filesystem_label {
            return Err(EncryptionError::NameMismatch {
                name: name.into(),
                partition_label: partition_label.into(),
                filesystem_label: filesystem_label.into(),
            });
        }

        let length_sectors = (size_bytes - HEADER_RESERVE_BYTES) / DM_SECTOR_SIZE;

        external::dmsetup_create_linear(name, raw_device, HEADER_RESERVE_SECTORS, length_sectors)
            .map_err(|why| EncryptionError::MapperCreate { node: raw_device.to_path_buf(), why })?;

        let mapper_node = PathBuf::from(format!("/dev/mapper/{}", name));

        let request = DeviceSetupRequest {
            key,
            mapper_device: mapper_node.clone(),
            partition_name: name.to_string(),
        };

        invoker.invoke(&request).map_err(|why| EncryptionError::DeviceSetupHook { why })?;

        Ok(DeviceSetupHook { mapper_node, mapper_name: name.into() })
    }
}

impl EncryptedVolume for DeviceSetupHook {
    fn node(&self) -> &Path { &self.mapper_node }

    fn close(&self) -> Result<(), EncryptionError> {
        external::dmsetup_remove(&self.mapper_name)
            .map_err(|why| EncryptionError::Close { node: self.mapper_node.clone(), why })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_setup_hook_rejects_mismatched_names() {
        struct NeverCalled;
        impl DeviceSetupHookInvoker for NeverCalled {
            fn invoke(&self, _request: &DeviceSetupRequest) -> Result<(), String> {
                panic!("hook should not be invoked when names mismatch");
            }
        }

        let result = DeviceSetupHook::create(
            Path::new("/dev/mmcblk0p4"),
            64 * 1024 * 1024,
            "ubuntu-data",
            "ubuntu-data",
            "not-ubuntu-data",
            b"key",
            &NeverCalled,
        );

        assert!(matches!(result, Err(EncryptionError::NameMismatch { .. })));
    }

    #[test]
    fn header_reserve_is_one_mebibyte_in_512_byte_sectors() {
        assert_eq!(HEADER_RESERVE_SECTORS, 2048);
    }
}
