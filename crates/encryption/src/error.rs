#[derive(Debug, Fail)]
pub enum EncryptionError {
    #[fail(display = "cannot format encrypted device: {}", why)]
    Format { why: std::io::Error },

    #[fail(display = "cannot open encrypted device on {:?}: {}", node, why)]
    Open { node: std::path::PathBuf, why: std::io::Error },

    #[fail(display = "cannot close encrypted device {:?}: {}", node, why)]
    Close { node: std::path::PathBuf, why: std::io::Error },

    #[fail(
        display = "cannot use partition name {:?} for an encrypted structure with partition label {:?} or filesystem label {:?}",
        name, partition_label, filesystem_label
    )]
    NameMismatch { name: String, partition_label: String, filesystem_label: String },

    #[fail(display = "cannot create linear mapper for {:?}: {}", node, why)]
    MapperCreate { node: std::path::PathBuf, why: std::io::Error },

    #[fail(display = "device setup failed with: {}", why)]
    DeviceSetupHook { why: String },

    #[fail(display = "recovery key is not supported by the device-setup-hook encryption variant")]
    RecoveryKeyUnsupported,

    #[fail(display = "cannot add recovery key to {:?}: {}", node, why)]
    RecoveryKey { node: std::path::PathBuf, why: std::io::Error },
}
