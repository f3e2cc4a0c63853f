use std::path::PathBuf;

/// The request passed to the external device-setup hook (§6): the caller's
/// key, the mapper device the hook should finalise encryption on, and the
/// gadget partition's name.
pub struct DeviceSetupRequest<'a> {
    pub key: &'a [u8],
    pub mapper_device: PathBuf,
    pub partition_name: String,
}

/// The seam through which `DeviceSetupHook` encryption calls out to an
/// external finalisation step. The hook's own output is opaque to the
/// core; only a non-nil error is meaningful (§4.4, §6).
pub trait DeviceSetupHookInvoker {
    fn invoke(&self, request: &DeviceSetupRequest) -> Result<(), String>;
}
