use crate::exec;
use std::{io, path::Path};

/// Creates a linear device-mapper target over `device` at `offset`
/// covering `length_sectors` sectors — the `DeviceSetupHook` alternative
/// to LUKS encryption (§6.1, §4.4).
pub fn dmsetup_create_linear<P: AsRef<Path>>(
    name: &str,
    device: P,
    offset_sectors: u64,
    length_sectors: u64,
) -> io::Result<()> {
    let table = format!("0 {} linear {} {}", length_sectors, device.as_ref().display(), offset_sectors);
    exec("dmsetup", Some(table.as_bytes()), None, &["create".into(), name.into()])
}

/// Removes a device-mapper target by name (§6.1).
pub fn dmsetup_remove(name: &str) -> io::Result<()> {
    exec("dmsetup", None, None, &["remove".into(), name.into()])
}
