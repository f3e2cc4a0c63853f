use crate::exec;
use gadgetinst_utils::write;
use std::{ffi::OsString, io, path::Path};

/// Wipes all filesystem/partition-table signatures from `device` (§6.1).
pub fn wipefs<P: AsRef<Path>>(device: P) -> io::Result<()> {
    info!("wiping signatures from {:?}", device.as_ref());
    exec("wipefs", None, None, &["-a".into(), device.as_ref().into()])
}

/// Appends the partitions described by `script` (an sfdisk edit script, one
/// `<node> : start=..., size=..., type=..., name="..."` line per partition)
/// to `device`'s existing table, without forcing a kernel rescan (§6.1).
pub fn sfdisk_append<P: AsRef<Path>>(device: P, script: &str) -> io::Result<()> {
    exec(
        "sfdisk",
        Some(script.as_bytes()),
        None,
        &["--append".into(), "--no-reread".into(), device.as_ref().into()],
    )
}

/// Deletes the given 1-based partition indices from `device`'s table (§6.1).
pub fn sfdisk_delete<P: AsRef<Path>>(device: P, indices: &[u32]) -> io::Result<()> {
    let mut args: Vec<OsString> =
        vec!["--no-reread".into(), "--delete".into(), device.as_ref().into()];
    args.extend(indices.iter().map(|i| i.to_string().into()));
    exec("sfdisk", None, None, &args)
}

/// Dumps `device`'s partition table as JSON (§6.1), for the reconciler's
/// on-disk-volume reader.
pub fn sfdisk_dump<P: AsRef<Path>>(device: P) -> io::Result<Vec<u8>> {
    crate::exec_with_output("sfdisk", None, &["--json".into(), device.as_ref().into()])
}

/// Asks the kernel to reread `device`'s partition table the ordinary way.
pub fn partprobe<P: AsRef<Path>>(device: P) -> io::Result<()> {
    exec("partprobe", None, None, &[device.as_ref().into()])
}

/// Forces a kernel rescan via the block device's sysfs `rescan` attribute,
/// used in place of `partprobe` when a platform's rescan marker is present
/// (§6.1).
pub fn sysfs_rescan(rescan_path: &Path) -> io::Result<()> {
    write(rescan_path, b"1\n")
}
