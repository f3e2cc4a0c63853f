#[derive(Debug, Fail)]
pub enum MountError {
    #[fail(display = "cannot create mountpoint {:?}: {}", path, why)]
    CreateMountpoint { path: std::path::PathBuf, why: std::io::Error },

    #[fail(display = "cannot mount filesystem {:?} at {:?}: {}", device, target, why)]
    Mount { device: std::path::PathBuf, target: std::path::PathBuf, why: std::io::Error },

    #[fail(display = "cannot unmount {:?}: {} (lazy unmount also failed: {})", target, plain, lazy)]
    UnmountFallbackFailed { target: std::path::PathBuf, plain: std::io::Error, lazy: std::io::Error },
}
