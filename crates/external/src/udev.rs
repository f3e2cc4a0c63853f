use crate::exec;
use std::{io, path::Path};

/// Triggers and waits for udev to finish processing events on a single
/// node, used after creating or encrypting one partition (§6.1).
pub fn trigger_settle<P: AsRef<Path>>(node: P) -> io::Result<()> {
    exec("udevadm", None, None, &["trigger".into(), "--settle".into(), node.as_ref().into()])
}

/// Waits, with a hard ceiling, for the entire udev queue to drain. Used
/// once after a batch of partition-table edits (§6.1).
pub fn settle(timeout_secs: u32) -> io::Result<()> {
    exec("udevadm", None, None, &["settle".into(), format!("--timeout={}", timeout_secs).into()])
}
