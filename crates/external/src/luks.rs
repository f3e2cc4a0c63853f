use crate::exec;
use std::{io, path::Path};

/// Formats `device` as a LUKS2 volume, feeding `key` on stdin (§6.1).
pub fn luks_format<P: AsRef<Path>>(device: P, key: &[u8]) -> io::Result<()> {
    exec(
        "cryptsetup",
        Some(key),
        None,
        &[
            "-s".into(),
            "512".into(),
            "luksFormat".into(),
            "--type".into(),
            "luks2".into(),
            device.as_ref().into(),
        ],
    )
}

/// Opens `device` as `mapper_name`, feeding `key` on stdin (§6.1).
pub fn luks_open<P: AsRef<Path>>(device: P, mapper_name: &str, key: &[u8]) -> io::Result<()> {
    exec("cryptsetup", Some(key), None, &["open".into(), device.as_ref().into(), mapper_name.into()])
}

/// Adds a recovery passphrase to an already-formatted LUKS `device`. The
/// existing key is fed on stdin followed by the new passphrase, matching
/// `cryptsetup luksAddKey`'s two-line prompt sequence (§6.1).
pub fn luks_add_recovery_key<P: AsRef<Path>>(
    device: P,
    existing_key: &[u8],
    recovery_key: &[u8],
) -> io::Result<()> {
    let mut stdin = Vec::with_capacity(existing_key.len() + recovery_key.len() + 2);
    stdin.extend_from_slice(existing_key);
    stdin.push(b'\n');
    stdin.extend_from_slice(recovery_key);
    stdin.push(b'\n');

    exec("cryptsetup", Some(&stdin), None, &["luksAddKey".into(), device.as_ref().into()])
}

/// Closes an opened LUKS mapping by name (§6.1).
pub fn luks_close(mapper_name: &str) -> io::Result<()> {
    exec("cryptsetup", None, Some(&[4]), &["close".into(), mapper_name.into()])
}
