use std::path::Path;

use cfprobe_core::{LineEnding, PlaceholderState, PlatformKind, SyncRootFlag};

use crate::Platform;

/// Strategy for hosts without shell path rewriting, sync roots, or
/// placeholder files. Every operation returns its constant default.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnmanagedPlatform;

impl Platform for UnmanagedPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Unmanaged
    }

    fn normalize_root_path(&self, pattern: &str) -> String {
        pattern.to_string()
    }

    fn native_line_ending(&self) -> LineEnding {
        LineEnding::Lf
    }

    fn is_managed_sync_root(&self, _path: &Path) -> bool {
        false
    }

    fn classify_placeholder(&self, _path: &Path) -> PlaceholderState {
        PlaceholderState::Skipped
    }

    fn sync_root_flag(&self) -> Option<&SyncRootFlag> {
        None
    }
}
