//! Copies a laid-out structure's resolved content onto a mounted
//! filesystem (or, for raw-image entries, directly onto the raw partition
//! device), calling the `ContentObserver` for every file (§4.7).

#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate log;

mod error;
mod observer;

pub use self::error::ContentError;
pub use self::observer::{ContentObserver, ContentOp, ObserveAction, PermissiveObserver};

use gadget_types::{ContentEntry, LaidOutStructure};
use std::{
    fs::OpenOptions,
    io::{Seek, SeekFrom, Write},
    path::Path,
};

/// Writes every content entry of `laid_out` to `mount_point` (for `File`
/// entries) or `raw_device` (for `RawImage` entries), calling `observer`
/// for each file. An observer error or veto aborts the whole write and is
/// wrapped per §4.7/§7's taxonomy.
pub fn write_content(
    laid_out: &LaidOutStructure,
    mount_point: &Path,
    raw_device: &Path,
    observer: &dyn ContentObserver,
) -> Result<(), ContentError> {
    let role = laid_out.structure.role;

    for entry in &laid_out.content {
        match entry {
            ContentEntry::File { source, target } => {
                write_file(source, target, mount_point, role, observer)?;
            }
            ContentEntry::RawImage { source, offset } => {
                write_raw_image(source, *offset, raw_device, role, observer)?;
            }
        }
    }

    Ok(())
}

fn write_file(
    source: &Path,
    relative_target: &Path,
    mount_point: &Path,
    role: Option<gadget_types::Role>,
    observer: &dyn ContentObserver,
) -> Result<(), ContentError> {
    let absolute_target = mount_point.join(relative_target);
    let source_label = source.display().to_string();

    let action = observer
        .observe(ContentOp::WriteFile, role, mount_point, relative_target, Some(source), &absolute_target)
        .map_err(|why| ContentError::Observed { source: source_label.clone(), why })?;

    if action == ObserveAction::Ignore {
        debug!("observer ignored write of {:?}", relative_target);
        return Ok(());
    }

    if let Some(parent) = absolute_target.parent() {
        gadgetinst_utils::mkdir_p(parent).map_err(|why| ContentError::Io { source: source_label.clone(), why })?;
    }

    gadgetinst_utils::cp(source, &absolute_target).map(|_| ()).map_err(|why| ContentError::Io {
        source: source_label,
        why,
    })
}

fn write_raw_image(
    source: &Path,
    offset: u64,
    raw_device: &Path,
    role: Option<gadget_types::Role>,
    observer: &dyn ContentObserver,
) -> Result<(), ContentError> {
    let source_label = source.display().to_string();

    let action = observer
        .observe(ContentOp::WriteRawImage, role, raw_device, Path::new(""), Some(source), raw_device)
        .map_err(|why| ContentError::Observed { source: source_label.clone(), why })?;

    if action == ObserveAction::Ignore {
        debug!("observer ignored raw-image write of {:?}", source);
        return Ok(());
    }

    let bytes = gadgetinst_utils::read(source).map_err(|why| ContentError::Io {
        source: source_label.clone(),
        why,
    })?;

    let mut device = OpenOptions::new()
        .write(true)
        .open(raw_device)
        .map_err(|why| ContentError::Io { source: source_label.clone(), why })?;

    device
        .seek(SeekFrom::Start(offset))
        .and_then(|_| device.write_all(&bytes))
        .map_err(|why| ContentError::Io { source: source_label, why })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gadget_types::GadgetStructure;
    use std::{cell::RefCell, fs, path::PathBuf};

    fn structure() -> GadgetStructure {
        GadgetStructure {
            yaml_index: 0,
            name: "ubuntu-seed".into(),
            role: Some(gadget_types::Role::SystemSeed),
            partition_type: gadget_types::PartitionTypeTag::new("0C"),
            filesystem_label: None,
            filesystem: Some(gadget_types::FileSystem::Vfat),
            size: 0,
            offset: None,
        }
    }

    struct VetoFirst(RefCell<bool>);

    impl ContentObserver for VetoFirst {
        fn observe(
            &self,
            _op: ContentOp,
            _role: Option<gadget_types::Role>,
            _target_root_dir: &Path,
            _relative_target_path: &Path,
            _before: Option<&Path>,
            _after: &Path,
        ) -> Result<ObserveAction, String> {
            if *self.0.borrow() {
                Ok(ObserveAction::Apply)
            } else {
                *self.0.borrow_mut() = true;
                Err("observe error".into())
            }
        }
    }

    #[test]
    fn observer_veto_aborts_with_wrapped_error() {
        let tmp = std::env::temp_dir().join("gadgetinst-content-writer-test");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("gadget")).unwrap();
        fs::write(tmp.join("gadget").join("grubx64.efi"), b"stub").unwrap();

        let laid_out = LaidOutStructure {
            structure: structure(),
            content: vec![ContentEntry::File {
                source: tmp.join("gadget").join("grubx64.efi"),
                target: PathBuf::from("EFI/boot/grubx64.efi"),
            }],
        };

        let observer = VetoFirst(RefCell::new(false));
        let result = write_content(&laid_out, &tmp.join("mnt"), Path::new("/dev/null"), &observer);

        match result {
            Err(ContentError::Observed { source, why }) => {
                assert!(source.ends_with("grubx64.efi"));
                assert_eq!(why, "observe error");
            }
            other => panic!("expected an observed veto error, got {:?}", other.err().map(|e| e.to_string())),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn apply_copies_file_to_mount_point() {
        let tmp = std::env::temp_dir().join("gadgetinst-content-writer-apply-test");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("gadget")).unwrap();
        fs::write(tmp.join("gadget").join("grubx64.efi"), b"stub content").unwrap();

        let laid_out = LaidOutStructure {
            structure: structure(),
            content: vec![ContentEntry::File {
                source: tmp.join("gadget").join("grubx64.efi"),
                target: PathBuf::from("EFI/boot/grubx64.efi"),
            }],
        };

        write_content(&laid_out, &tmp.join("mnt"), Path::new("/dev/null"), &PermissiveObserver).unwrap();

        let written = fs::read(tmp.join("mnt").join("EFI/boot/grubx64.efi")).unwrap();
        assert_eq!(written, b"stub content");

        let _ = fs::remove_dir_all(&tmp);
    }
}
