//! Device-node naming and sector/byte arithmetic (§4.2).

use gadget_types::SectorExt;
use std::path::{Path, PathBuf};

/// Names the Nth partition of `base`, following the kernel's convention of
/// inserting a `p` before the index when the base device name itself ends
/// in a digit (`mmcblk0` → `mmcblk0p3`, `nvme0n1` → `nvme0n1p2`), and
/// appending the index directly otherwise (`sda` → `sda3`).
pub fn device_name(base: &Path, index: u32) -> PathBuf {
    let base_str = base.to_string_lossy();
    let ends_in_digit = base_str.chars().last().map_or(false, |c| c.is_ascii_digit());

    let mut name = base_str.into_owned();
    if ends_in_digit {
        name.push('p');
    }
    name.push_str(&index.to_string());
    PathBuf::from(name)
}

/// Converts a byte offset into a sector count, rounding down.
pub fn bytes_to_sectors<V: SectorExt>(volume: &V, bytes: u64) -> u64 {
    bytes / volume.sector_size()
}

/// Converts a sector count into a byte offset.
pub fn sectors_to_bytes<V: SectorExt>(volume: &V, sectors: u64) -> u64 {
    sectors * volume.sector_size()
}

/// Rounds `bytes` up to the next whole sector, in bytes.
pub fn align_up<V: SectorExt>(volume: &V, bytes: u64) -> u64 {
    let sector_size = volume.sector_size();
    let remainder = bytes % sector_size;
    if remainder == 0 {
        bytes
    } else {
        bytes + (sector_size - remainder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p6_device_name_matches_kernel_convention() {
        assert_eq!(device_name(Path::new("/dev/sda"), 3), PathBuf::from("/dev/sda3"));
        assert_eq!(device_name(Path::new("/dev/mmcblk0"), 3), PathBuf::from("/dev/mmcblk0p3"));
        assert_eq!(device_name(Path::new("/dev/nvme0n1"), 2), PathBuf::from("/dev/nvme0n1p2"));
    }

    struct FakeVolume(u64);
    impl SectorExt for FakeVolume {
        fn sector_size(&self) -> u64 { self.0 }
    }

    #[test]
    fn byte_sector_round_trip() {
        let volume = FakeVolume(512);
        assert_eq!(bytes_to_sectors(&volume, 1024), 2);
        assert_eq!(sectors_to_bytes(&volume, 2), 1024);
    }

    #[test]
    fn align_up_rounds_to_next_sector() {
        let volume = FakeVolume(512);
        assert_eq!(align_up(&volume, 1024), 1024);
        assert_eq!(align_up(&volume, 1025), 1536);
    }
}
