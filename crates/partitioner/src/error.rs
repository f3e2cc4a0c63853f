#[derive(Debug, Fail)]
pub enum PartitionerError {
    #[fail(display = "failed to write partition table on {:?}: {}", device, why)]
    TableWrite { device: std::path::PathBuf, why: std::io::Error },

    #[fail(display = "failed to reload partition table on {:?}: {}", device, why)]
    TableReload { device: std::path::PathBuf, why: std::io::Error },

    #[fail(display = "udev did not settle after partitioning {:?}: {}", device, why)]
    Settle { device: std::path::PathBuf, why: std::io::Error },

    #[fail(display = "device {:?} not available", node)]
    NotAvailable { node: std::path::PathBuf },

    #[fail(display = "{}", _0)]
    Reconcile(#[fail(cause)] reconciler::ReconcileError),
}

impl From<reconciler::ReconcileError> for PartitionerError {
    fn from(why: reconciler::ReconcileError) -> Self { PartitionerError::Reconcile(why) }
}
