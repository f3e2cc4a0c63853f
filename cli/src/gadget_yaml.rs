//! A minimal, honestly-scoped reader for `meta/gadget.yaml`. Parsing and
//! validating the gadget description is explicitly outside the installer
//! core's scope; this module exists only so the command-line front end has
//! something real to hand the core's `GadgetReader` seam.

use gadget_types::{ContentEntry, FileSystem, GadgetError, GadgetStructure, GadgetVolume, PartitionTableSchema, PartitionTypeTag, Role};
use gadgetinst::InstallError;
use serde_derive::Deserialize;
use std::{collections::BTreeMap, path::Path, str::FromStr};

#[derive(Debug, Deserialize)]
struct RawGadget {
    volumes: BTreeMap<String, RawVolume>,
}

#[derive(Debug, Deserialize)]
struct RawVolume {
    schema: Option<String>,
    structure: Vec<RawStructure>,
}

#[derive(Debug, Deserialize)]
struct RawStructure {
    name: Option<String>,
    role: Option<String>,
    #[serde(rename = "type")]
    partition_type: Option<String>,
    filesystem: Option<String>,
    #[serde(rename = "filesystem-label")]
    filesystem_label: Option<String>,
    size: String,
    offset: Option<String>,
    #[serde(default)]
    content: Vec<RawContentEntry>,
}

#[derive(Debug, Deserialize)]
struct RawContentEntry {
    source: Option<String>,
    target: Option<String>,
    image: Option<String>,
    offset: Option<String>,
}

/// Parses a size or offset such as `"1200M"`/`"750M"`/`"2048"` into bytes,
/// the same suffix set snapd's own gadget.yaml accepts (no fractional
/// values, case-sensitive suffix).
fn parse_size(value: &str) -> Option<u64> {
    let value = value.trim();
    let (digits, multiplier) = match value.chars().last() {
        Some('M') => (&value[..value.len() - 1], 1024 * 1024),
        Some('G') => (&value[..value.len() - 1], 1024 * 1024 * 1024),
        Some('K') => (&value[..value.len() - 1], 1024),
        _ => (value, 1),
    };
    digits.parse::<u64>().ok().map(|n| n * multiplier)
}

/// Reads and parses `<gadget_root>/meta/gadget.yaml` (§6's `ReadInfoAndValidate`).
pub(crate) fn read_info_and_validate(gadget_root: &Path) -> Result<BTreeMap<String, GadgetVolume>, InstallError> {
    let path = gadget_root.join("meta").join("gadget.yaml");

    let raw = gadgetinst_utils::read(&path).map_err(InstallError::from)?;

    let parsed: RawGadget = serde_yaml::from_slice(&raw)
        .map_err(|why| InstallError::Collaborator { why: format!("cannot parse {:?}: {}", path, why) })?;

    let mut volumes = BTreeMap::new();

    for (volume_name, raw_volume) in parsed.volumes {
        let schema = match &raw_volume.schema {
            Some(schema) => Some(
                PartitionTableSchema::from_str(schema)
                    .map_err(|_| InstallError::from(GadgetError::UnknownSchema { schema: schema.clone() }))?,
            ),
            None => None,
        };

        if raw_volume.structure.is_empty() {
            return Err(InstallError::from(GadgetError::EmptyGadgetRoot { volume: volume_name.clone() }));
        }

        let mut structures = Vec::with_capacity(raw_volume.structure.len());
        for (yaml_index, raw) in raw_volume.structure.into_iter().enumerate() {
            let name = raw.name.unwrap_or_else(|| format!("{}-{}", volume_name, yaml_index));

            let role = match &raw.role {
                Some(role) => Some(
                    Role::from_str(role)
                        .map_err(|_| InstallError::Collaborator { why: format!("structure '{}': unknown role '{}'", name, role) })?,
                ),
                None => None,
            };

            let filesystem = match &raw.filesystem {
                Some(fs) => Some(
                    FileSystem::from_str(fs)
                        .map_err(|_| InstallError::Collaborator { why: format!("structure '{}': unknown filesystem '{}'", name, fs) })?,
                ),
                None => None,
            };

            let size = parse_size(&raw.size)
                .ok_or_else(|| InstallError::Collaborator { why: format!("structure '{}': invalid size '{}'", name, raw.size) })?;

            let offset = match &raw.offset {
                Some(offset) => Some(
                    parse_size(offset)
                        .ok_or_else(|| InstallError::Collaborator { why: format!("structure '{}': invalid offset '{}'", name, offset) })?,
                ),
                None => None,
            };

            structures.push(GadgetStructure {
                yaml_index,
                name,
                role,
                partition_type: PartitionTypeTag::new(raw.partition_type.unwrap_or_default()),
                filesystem_label: raw.filesystem_label,
                filesystem,
                size,
                offset,
            });
        }

        volumes.insert(volume_name.clone(), GadgetVolume { name: volume_name, schema, structures });
    }

    Ok(volumes)
}

/// Re-reads `meta/gadget.yaml` to resolve the content declared for one
/// named structure, the other half of the `ReadInfoAndValidate` collaborator
/// the core leaves out of `GadgetStructure` itself (§3, "Laid-out Structure").
pub(crate) fn content_for_structure(gadget_root: &Path, structure_name: &str) -> Result<Vec<ContentEntry>, InstallError> {
    let path = gadget_root.join("meta").join("gadget.yaml");
    let raw = gadgetinst_utils::read(&path).map_err(InstallError::from)?;
    let parsed: RawGadget = serde_yaml::from_slice(&raw)
        .map_err(|why| InstallError::Collaborator { why: format!("cannot parse {:?}: {}", path, why) })?;

    for raw_volume in parsed.volumes.values() {
        for raw in &raw_volume.structure {
            if raw.name.as_deref() != Some(structure_name) {
                continue;
            }

            let mut entries = Vec::with_capacity(raw.content.len());
            for entry in &raw.content {
                match (&entry.source, &entry.target, &entry.image, &entry.offset) {
                    (Some(source), Some(target), _, _) => {
                        entries.push(ContentEntry::File { source: gadget_root.join(source), target: target.into() });
                    }
                    (_, _, Some(image), offset) => {
                        let offset = match offset {
                            Some(offset) => parse_size(offset).ok_or_else(|| InstallError::Collaborator {
                                why: format!("structure '{}': invalid content offset '{}'", structure_name, offset),
                            })?,
                            None => 0,
                        };
                        entries.push(ContentEntry::RawImage { source: gadget_root.join(image), offset });
                    }
                    _ => {
                        return Err(InstallError::Collaborator {
                            why: format!("structure '{}': content entry has neither source/target nor image", structure_name),
                        })
                    }
                }
            }

            return Ok(entries);
        }
    }

    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes_with_suffixes() {
        assert_eq!(parse_size("1200M"), Some(1200 * 1024 * 1024));
        assert_eq!(parse_size("1G"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_size("2048"), Some(2048));
    }

    #[test]
    fn parses_a_minimal_gadget_yaml() {
        let dir = tempdir::TempDir::new("gadget-yaml-test").unwrap();
        let meta = dir.path().join("meta");
        std::fs::create_dir_all(&meta).unwrap();
        std::fs::write(
            meta.join("gadget.yaml"),
            r#"
volumes:
  pc:
    schema: gpt
    structure:
      - name: ubuntu-seed
        role: system-seed
        type: EF,C12A7328-F81F-11D2-BA4B-00A0C93EC93B
        filesystem: vfat
        filesystem-label: ubuntu-seed
        size: 1200M
      - name: ubuntu-boot
        role: system-boot
        type: 83,0FC63DAF-8483-4772-8E79-3D69D8477DE4
        filesystem: ext4
        filesystem-label: ubuntu-boot
        size: 750M
"#,
        )
        .unwrap();

        let volumes = read_info_and_validate(dir.path()).unwrap();
        let pc = volumes.get("pc").unwrap();
        assert_eq!(pc.schema, Some(PartitionTableSchema::Gpt));
        assert_eq!(pc.structures.len(), 2);
        assert_eq!(pc.structures[0].role, Some(Role::SystemSeed));
        assert_eq!(pc.structures[1].size, 750 * 1024 * 1024);
    }
}
