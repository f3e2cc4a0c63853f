use crate::exec;
use gadget_types::FileSystem;
use std::{ffi::OsString, io, path::Path};

/// Formats `part` with the requested filesystem, dispatching to the right
/// `mkfs.*` tool per kind. `label` sets the volume label inline where the
/// tool supports it; `sector_size` is passed through to tools that accept a
/// logical sector size override (0 leaves the tool's default in place).
pub fn mkfs<P: AsRef<Path>>(
    part: P,
    kind: FileSystem,
    label: Option<&str>,
    sector_size: u32,
) -> io::Result<()> {
    let (cmd, base_args): (&'static str, &'static [&'static str]) = match kind {
        FileSystem::Ext4 => ("mkfs.ext4", &["-F", "-q", "-E", "lazy_itable_init"]),
        FileSystem::Vfat => ("mkfs.fat", &["-F", "32"]),
        FileSystem::Btrfs => ("mkfs.btrfs", &["-f"]),
        FileSystem::F2fs => {
            ("mkfs.f2fs", &["-f", "-q", "-O", "extra_attr,inode_checksum,sb_checksum,compression"])
        }
    };

    let mut args = base_args.iter().map(Into::into).collect::<Vec<OsString>>();

    if let Some(label) = label {
        match kind {
            FileSystem::Ext4 | FileSystem::Btrfs | FileSystem::F2fs => {
                args.push("-L".into());
                args.push(label.into());
            }
            FileSystem::Vfat => {
                args.push("-n".into());
                args.push(label.into());
            }
        }
    }

    if sector_size != 0 && kind == FileSystem::Ext4 {
        args.push("-b".into());
        args.push(sector_size.to_string().into());
    }

    args.push(part.as_ref().into());
    exec(cmd, None, None, &args)
}
