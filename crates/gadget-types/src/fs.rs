use std::{fmt, str::FromStr};

/// A filesystem that a structure may be formatted with. An empty gadget
/// `filesystem` field (a raw structure) is represented as `None` at the
/// call site rather than as a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileSystem {
    Ext4,
    Vfat,
    Btrfs,
    F2fs,
}

impl FromStr for FileSystem {
    type Err = &'static str;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let fs = match string.to_lowercase().as_str() {
            "ext4" => FileSystem::Ext4,
            "vfat" | "fat32" | "fat16" => FileSystem::Vfat,
            "btrfs" => FileSystem::Btrfs,
            "f2fs" => FileSystem::F2fs,
            _ => return Err("invalid file system name"),
        };
        Ok(fs)
    }
}

impl From<FileSystem> for &'static str {
    fn from(fs: FileSystem) -> Self {
        match fs {
            FileSystem::Ext4 => "ext4",
            FileSystem::Vfat => "vfat",
            FileSystem::Btrfs => "btrfs",
            FileSystem::F2fs => "f2fs",
        }
    }
}

impl fmt::Display for FileSystem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s: &'static str = (*self).into();
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_aliases() {
        assert_eq!("fat32".parse::<FileSystem>().unwrap(), FileSystem::Vfat);
        assert_eq!("vfat".parse::<FileSystem>().unwrap(), FileSystem::Vfat);
        assert_eq!("ext4".parse::<FileSystem>().unwrap(), FileSystem::Ext4);
    }

    #[test]
    fn rejects_unknown() {
        assert!("zfs".parse::<FileSystem>().is_err());
    }
}
