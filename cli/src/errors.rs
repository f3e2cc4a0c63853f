use gadgetinst::InstallError;
use std::path::PathBuf;

#[derive(Debug, Fail)]
pub(crate) enum CliError {
    #[fail(display = "{}", _0)]
    Install(#[fail(cause)] InstallError),

    #[fail(display = "cannot read gadget tree at {:?}: {}", path, why)]
    GadgetRead { path: PathBuf, why: std::io::Error },

    #[fail(display = "gadget.yaml at {:?} declares no volumes", path)]
    EmptyVolumes { path: PathBuf },

    #[fail(display = "'{}' is not in ROLE=PATH form", entry)]
    MalformedKeyArg { entry: String },

    #[fail(display = "structure '{}' has an unknown role: {}", name, role)]
    UnknownRole { name: String, role: String },

    #[fail(display = "cannot find the disk backing the mounted seed partition at {:?}: {}", mountpoint, why)]
    SeedLookup { mountpoint: PathBuf, why: std::io::Error },

    #[fail(display = "device-setup hook required for --encryption=device-setup-hook but none was given (--device-setup-hook)")]
    NoDeviceSetupHook,

    #[fail(display = "'{}' is not a recognised --encryption value (expected none, luks, or device-setup-hook)", value)]
    InvalidEncryptionType { value: String },
}

impl From<InstallError> for CliError {
    fn from(why: InstallError) -> Self {
        CliError::Install(why)
    }
}
