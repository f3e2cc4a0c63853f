/// The top-level error returned by `Install`/`FactoryReset`/etc., with a
/// `From` conversion from every component error (§7.1).
#[derive(Debug, Fail)]
pub enum InstallError {
    #[fail(display = "gadget root does not exist or is empty: {:?}", path)]
    EmptyGadgetRoot { path: std::path::PathBuf },

    #[fail(display = "model grade does not support install mode")]
    PreModernModel,

    #[fail(display = "no volume with a system-seed structure was found in the gadget")]
    NoBootVolume,

    #[fail(display = "there are {} system-seed{{,-null}} partitions, expected one", count)]
    AmbiguousSeed { count: usize },

    #[fail(display = "structure {} requires an assigned device but has none", name)]
    MissingDevice { name: String },

    #[fail(display = "{}", _0)]
    Gadget(#[fail(cause)] gadget_types::GadgetError),

    #[fail(display = "{}", _0)]
    Reconcile(#[fail(cause)] reconciler::ReconcileError),

    #[fail(display = "{}", _0)]
    Partition(#[fail(cause)] partitioner::PartitionerError),

    #[fail(display = "{}", _0)]
    Encryption(#[fail(cause)] encryption::EncryptionError),

    #[fail(display = "{}", _0)]
    Fs(#[fail(cause)] fs_builder::FsBuilderError),

    #[fail(display = "{}", _0)]
    Mount(#[fail(cause)] fs_mounter::MountError),

    #[fail(display = "cannot create filesystem image: {}", _0)]
    Content(#[fail(cause)] content_writer::ContentError),

    #[fail(display = "{}", _0)]
    Traits(#[fail(cause)] traits_persister::TraitsError),

    #[fail(display = "collaborator error: {}", why)]
    Collaborator { why: String },

    #[fail(display = "I/O error: {}", _0)]
    Io(#[fail(cause)] std::io::Error),
}

impl From<gadget_types::GadgetError> for InstallError {
    fn from(why: gadget_types::GadgetError) -> Self { InstallError::Gadget(why) }
}

impl From<reconciler::ReconcileError> for InstallError {
    fn from(why: reconciler::ReconcileError) -> Self { InstallError::Reconcile(why) }
}

impl From<partitioner::PartitionerError> for InstallError {
    fn from(why: partitioner::PartitionerError) -> Self { InstallError::Partition(why) }
}

impl From<encryption::EncryptionError> for InstallError {
    fn from(why: encryption::EncryptionError) -> Self { InstallError::Encryption(why) }
}

impl From<fs_builder::FsBuilderError> for InstallError {
    fn from(why: fs_builder::FsBuilderError) -> Self { InstallError::Fs(why) }
}

impl From<fs_mounter::MountError> for InstallError {
    fn from(why: fs_mounter::MountError) -> Self { InstallError::Mount(why) }
}

impl From<content_writer::ContentError> for InstallError {
    fn from(why: content_writer::ContentError) -> Self { InstallError::Content(why) }
}

impl From<traits_persister::TraitsError> for InstallError {
    fn from(why: traits_persister::TraitsError) -> Self { InstallError::Traits(why) }
}

impl From<std::io::Error> for InstallError {
    fn from(why: std::io::Error) -> Self { InstallError::Io(why) }
}
