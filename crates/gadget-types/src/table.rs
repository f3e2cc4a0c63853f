use std::{fmt, str::FromStr};

/// The on-disk partition table schema. `Emmc` covers devices whose
/// partitioning is managed entirely outside of the installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartitionTableSchema {
    Gpt,
    Dos,
    Emmc,
}

impl FromStr for PartitionTableSchema {
    type Err = &'static str;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let schema = match string {
            "gpt" => PartitionTableSchema::Gpt,
            "dos" | "mbr" => PartitionTableSchema::Dos,
            "emmc" => PartitionTableSchema::Emmc,
            _ => return Err("invalid partition table schema"),
        };
        Ok(schema)
    }
}

impl From<PartitionTableSchema> for &'static str {
    fn from(schema: PartitionTableSchema) -> Self {
        match schema {
            PartitionTableSchema::Gpt => "gpt",
            PartitionTableSchema::Dos => "dos",
            PartitionTableSchema::Emmc => "emmc",
        }
    }
}

impl fmt::Display for PartitionTableSchema {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s: &'static str = (*self).into();
        f.write_str(s)
    }
}

/// A partition type tag as carried in a gadget structure: either a bare
/// MBR id (`"83"`) or an MBR id paired with a GPT GUID (`"83,<uuid>"`).
/// See §4.2: `partition_type` selects the half that matches the schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionTypeTag(pub String);

impl PartitionTypeTag {
    pub fn new<S: Into<String>>(tag: S) -> Self { PartitionTypeTag(tag.into()) }

    /// Selects the MBR half or the GPT half of the tag for the given schema.
    /// An empty result is not an error at this layer (§4.2).
    pub fn resolve(&self, schema: PartitionTableSchema) -> &str {
        match self.0.find(',') {
            Some(comma) => match schema {
                PartitionTableSchema::Gpt => &self.0[comma + 1..],
                PartitionTableSchema::Dos | PartitionTableSchema::Emmc => &self.0[..comma],
            },
            None => &self.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p7_partition_type_selection() {
        let tag = PartitionTypeTag::new("83,0FC63DAF-8483-4772-8E79-3D69D8477DE4");
        assert_eq!(tag.resolve(PartitionTableSchema::Gpt), "0FC63DAF-8483-4772-8E79-3D69D8477DE4");
        assert_eq!(tag.resolve(PartitionTableSchema::Dos), "83");
    }

    #[test]
    fn bare_mbr_id_resolves_identically_on_both_schemas() {
        let tag = PartitionTypeTag::new("83");
        assert_eq!(tag.resolve(PartitionTableSchema::Gpt), "83");
        assert_eq!(tag.resolve(PartitionTableSchema::Dos), "83");
    }
}
