/// Configuration-level errors raised while parsing or validating a gadget
/// description, as opposed to the I/O errors raised by the crates that act
/// on one (§7.1).
#[derive(Debug, Fail)]
pub enum GadgetError {
    #[fail(display = "unknown partition table schema: {}", schema)]
    UnknownSchema { schema: String },

    #[fail(display = "unknown encryption type: {}", kind)]
    UnknownEncryptionType { kind: String },

    #[fail(display = "gadget volume '{}' has no structures", volume)]
    EmptyGadgetRoot { volume: String },

    #[fail(
        display = "on-disk volume at {} predates the current schema and cannot be reconciled",
        device
    )]
    PreModernModel { device: String },

    #[fail(display = "structure '{}' has no resolvable partition type for schema {}", name, schema)]
    UnresolvedPartitionType { name: String, schema: String },

    #[fail(display = "gadget tree root does not exist: {}", path)]
    MissingGadgetRoot { path: String },
}

impl GadgetError {
    pub fn missing_gadget_root(path: &std::path::Path) -> Self {
        GadgetError::MissingGadgetRoot { path: path.display().to_string() }
    }
}

pub type GadgetResult<T> = Result<T, GadgetError>;
