#[derive(Debug, Fail)]
pub enum ReconcileError {
    #[fail(display = "cannot create partition #{} ({})", index, name)]
    NotCreatable { index: usize, name: String },

    #[fail(
        display = "gadget and system-boot device {} partition table not compatible: {}",
        device, why
    )]
    Incompatible { device: String, why: String },
}
