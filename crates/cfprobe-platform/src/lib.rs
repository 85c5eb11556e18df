//! cfprobe-platform: path rewriting and placeholder detection for the
//! smudge filter
//!
//! Before a tracked file is compared or hashed, the smudge filter asks this
//! crate two kinds of questions:
//! - Shell root rewriting: turn `C:/Program Files/Git/foo`, produced by the
//!   Git for Windows shell from `/foo`, back into `/foo`
//! - Placeholder detection: is the file a dehydrated Cloud Files placeholder
//!   (or missing inside a sync root) whose content must be fetched?
//!
//! ## Architecture
//!
//! ```text
//! smudge filter
//!       │
//!       └── dyn Platform (chosen once per process from the host OS)
//!                 │
//!                 ├── UnmanagedPlatform  → identity / "\n" / false / false
//!                 └── ManagedPlatform
//!                           ├── RootPathNormalizer → ShellLocator (pwd on PATH)
//!                           ├── SyncRootRegistry   → RegistrySource (HKLM)
//!                           └── PlaceholderDetector → AttributeSource
//!                                                     (gated by SyncRootFlag)
//! ```
//!
//! Every operation is infallible: OS failures degrade to "unchanged path"
//! or `false`, and are only visible in `debug`/`trace` logs.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use cfprobe_core::{LineEnding, PlaceholderState, PlatformKind, ProbeConfig, SyncRootFlag};
use rayon::prelude::*;
use tracing::debug;

pub mod managed;
pub mod normalize;
pub mod placeholder;
pub mod registry;
pub mod unmanaged;

#[cfg(target_os = "windows")]
pub mod native;

#[cfg(test)]
mod testing;

pub use managed::ManagedPlatform;
pub use normalize::{PathLookup, RootPathNormalizer, ShellLocator};
pub use placeholder::{AttributeSource, PlaceholderDetector};
pub use registry::{RegistryKey, RegistrySource, SyncRootRegistry};
pub use unmanaged::UnmanagedPlatform;

/// Host-specific behaviour behind OS-agnostic call sites.
pub trait Platform: Send + Sync {
    fn kind(&self) -> PlatformKind;

    /// Undo the shell's expansion of `/` into its install directory.
    fn normalize_root_path(&self, pattern: &str) -> String;

    fn native_line_ending(&self) -> LineEnding;

    /// True if `path` is registered as a sync root by our cloud provider.
    fn is_managed_sync_root(&self, path: &Path) -> bool;

    fn classify_placeholder(&self, path: &Path) -> PlaceholderState;

    /// True if the caller must fetch `path` instead of trusting local bytes.
    fn is_placeholder(&self, path: &Path) -> bool {
        self.classify_placeholder(path).is_placeholder()
    }

    /// Session flag gating placeholder probes, if this platform has one.
    fn sync_root_flag(&self) -> Option<&SyncRootFlag>;

    fn sync_root(&self) -> bool {
        self.sync_root_flag().is_some_and(SyncRootFlag::get)
    }

    /// Set the session flag. Returns false if it was already set or the
    /// platform has no placeholders.
    fn set_sync_root(&self, value: bool) -> bool {
        self.sync_root_flag().is_some_and(|flag| flag.set(value))
    }

    /// Decide the session flag from the working-tree root, unless it is
    /// already decided. Returns the flag's value.
    fn init_sync_root(&self, root: &Path) -> bool {
        let Some(flag) = self.sync_root_flag() else {
            return false;
        };
        if !flag.is_set() {
            flag.set(self.is_managed_sync_root(root));
        }
        flag.get()
    }

    /// Classify many paths in parallel. Output order matches input order.
    fn scan(&self, paths: &[PathBuf]) -> Vec<PlaceholderState> {
        paths.par_iter().map(|p| self.classify_placeholder(p)).collect()
    }
}

/// Pick the strategy for the running OS.
pub fn select(config: &ProbeConfig) -> Box<dyn Platform> {
    let platform = if std::env::consts::OS == "windows" {
        managed(config)
    } else {
        Box::new(UnmanagedPlatform)
    };
    debug!(os = std::env::consts::OS, kind = ?platform.kind(), "selected platform");
    platform
}

#[cfg(target_os = "windows")]
fn managed(config: &ProbeConfig) -> Box<dyn Platform> {
    Box::new(ManagedPlatform::native(config))
}

#[cfg(not(target_os = "windows"))]
fn managed(_config: &ProbeConfig) -> Box<dyn Platform> {
    Box::new(UnmanagedPlatform)
}

static GLOBAL: OnceLock<Box<dyn Platform>> = OnceLock::new();

/// Install the process-wide strategy. Later calls return the first one.
pub fn init_global(config: &ProbeConfig) -> &'static dyn Platform {
    GLOBAL.get_or_init(|| select(config)).as_ref()
}

/// The process-wide strategy, selected with default config on first use.
pub fn global() -> &'static dyn Platform {
    init_global(&ProbeConfig::default())
}

pub fn normalize_root_path(pattern: &str) -> String {
    global().normalize_root_path(pattern)
}

pub fn native_line_ending() -> LineEnding {
    global().native_line_ending()
}

pub fn is_managed_sync_root(path: &Path) -> bool {
    global().is_managed_sync_root(path)
}

pub fn is_placeholder(path: &Path) -> bool {
    global().is_placeholder(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_matches_host() {
        let platform = select(&ProbeConfig::default());
        if cfg!(windows) {
            assert_eq!(platform.kind(), PlatformKind::Managed);
            assert_eq!(platform.native_line_ending(), LineEnding::CrLf);
        } else {
            assert_eq!(platform.kind(), PlatformKind::Unmanaged);
            assert_eq!(platform.native_line_ending(), LineEnding::Lf);
        }
    }

    #[test]
    fn global_is_stable() {
        let a = global() as *const dyn Platform as *const ();
        let b = init_global(&ProbeConfig::default()) as *const dyn Platform as *const ();
        assert_eq!(a, b);
    }
}
