//! Persists the role→device-node registry as a traits manifest so
//! boot-time code can re-identify each gadget volume's backing disk
//! without re-running reconciliation (§4.9).

#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate serde_derive;

use gadget_types::{EncryptionMethod, PartitionTableSchema};
use std::{collections::BTreeMap, path::Path};

/// Relative to a mounted root, where snapd expects to find the traits
/// manifest.
pub const SNAP_DEVICE_DIR: &str = "var/lib/snapd/device";
pub const DISK_MAPPING_FILE: &str = "disk-mapping.json";

#[derive(Debug, Fail)]
pub enum TraitsError {
    #[fail(display = "cannot write disk traits manifest to {:?}: {}", path, why)]
    Write { path: std::path::PathBuf, why: std::io::Error },

    #[fail(display = "cannot serialise disk traits manifest: {}", why)]
    Serialize { why: serde_json::Error },
}

/// Encryption parameters recorded per encrypted structure (I5/I6; only
/// `Luks` structures are recorded per §4.9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureEncryptionParameters {
    pub method: EncryptionMethod,
}

/// One gadget volume's backing-disk identity, as persisted for later
/// boot-time re-identification (§4.9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskVolumeDeviceTraits {
    pub kernel_path: std::path::PathBuf,
    pub disk_id: String,
    pub schema: PartitionTableSchema,
    pub size: u64,
    pub sector_size: u64,
    pub gpt_table_uuid: Option<String>,
    /// Keyed by structure name.
    pub structure_encryption: BTreeMap<String, StructureEncryptionParameters>,
}

/// The full manifest written to `disk-mapping.json`: volume name →
/// traits.
pub type DiskMapping = BTreeMap<String, DiskVolumeDeviceTraits>;

/// Serialises `mapping` and writes it to `<mount_root>/var/lib/snapd/device/disk-mapping.json`,
/// creating the directory if needed.
pub fn persist(mount_root: &Path, mapping: &DiskMapping) -> Result<(), TraitsError> {
    let dir = mount_root.join(SNAP_DEVICE_DIR);
    let path = dir.join(DISK_MAPPING_FILE);

    gadgetinst_utils::mkdir_p(&dir).map_err(|why| TraitsError::Write { path: path.clone(), why })?;

    let json = serde_json::to_vec_pretty(mapping).map_err(|why| TraitsError::Serialize { why })?;

    gadgetinst_utils::write(&path, &json).map_err(|why| TraitsError::Write { path, why })
}

/// Persists `mapping` under `data_root` and, if `save_root` is present,
/// under it too, so the two `disk-mapping.json` files end up byte-identical
/// (P11).
pub fn persist_to_data_and_save(
    data_root: &Path,
    save_root: Option<&Path>,
    mapping: &DiskMapping,
) -> Result<(), TraitsError> {
    persist(data_root, mapping)?;

    if let Some(save_root) = save_root {
        persist(save_root, mapping)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, path::PathBuf};

    fn sample_mapping() -> DiskMapping {
        let mut mapping = DiskMapping::new();
        mapping.insert(
            "pc".into(),
            DiskVolumeDeviceTraits {
                kernel_path: PathBuf::from("/dev/mmcblk0"),
                disk_id: "deadbeef".into(),
                schema: PartitionTableSchema::Gpt,
                size: 32_000_000_000,
                sector_size: 512,
                gpt_table_uuid: Some("0FC63DAF-8483-4772-8E79-3D69D8477DE4".into()),
                structure_encryption: {
                    let mut m = BTreeMap::new();
                    m.insert("ubuntu-data".into(), StructureEncryptionParameters { method: EncryptionMethod::Luks });
                    m
                },
            },
        );
        mapping
    }

    #[test]
    fn p11_data_and_save_manifests_are_byte_identical() {
        let tmp = std::env::temp_dir().join("gadgetinst-traits-persister-test");
        let data_root = tmp.join("data");
        let save_root = tmp.join("save");
        let _ = fs::remove_dir_all(&tmp);

        let mapping = sample_mapping();
        persist_to_data_and_save(&data_root, Some(&save_root), &mapping).unwrap();

        let data_bytes = fs::read(data_root.join(SNAP_DEVICE_DIR).join(DISK_MAPPING_FILE)).unwrap();
        let save_bytes = fs::read(save_root.join(SNAP_DEVICE_DIR).join(DISK_MAPPING_FILE)).unwrap();
        assert_eq!(data_bytes, save_bytes);

        let roundtripped: DiskMapping = serde_json::from_slice(&data_bytes).unwrap();
        assert_eq!(roundtripped, mapping);

        let _ = fs::remove_dir_all(&tmp);
    }
}
