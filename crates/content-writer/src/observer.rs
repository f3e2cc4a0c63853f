use gadget_types::Role;
use std::path::Path;

/// The kind of write being observed (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentOp {
    WriteFile,
    WriteRawImage,
}

/// The observer's decision for a single file write (§4.7, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveAction {
    Apply,
    Ignore,
}

/// Called exactly once per file written, before the write is applied.
/// `before`/`after` are the source content (if any existed there already)
/// and the content about to be written, letting an implementation apply a
/// shadow policy without the core knowing anything about that policy's
/// rules (§6, §9's "Observer callback shape").
pub trait ContentObserver {
    fn observe(
        &self,
        op: ContentOp,
        role: Option<Role>,
        target_root_dir: &Path,
        relative_target_path: &Path,
        before: Option<&Path>,
        after: &Path,
    ) -> Result<ObserveAction, String>;
}

/// An observer that applies every write unconditionally — the default for
/// callers with no shadow policy of their own.
pub struct PermissiveObserver;

impl ContentObserver for PermissiveObserver {
    fn observe(
        &self,
        _op: ContentOp,
        _role: Option<Role>,
        _target_root_dir: &Path,
        _relative_target_path: &Path,
        _before: Option<&Path>,
        _after: &Path,
    ) -> Result<ObserveAction, String> {
        Ok(ObserveAction::Apply)
    }
}
