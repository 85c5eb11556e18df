use std::path::{Path, PathBuf};

use cfprobe_core::{LineEnding, PlaceholderState, PlatformKind, ProbeConfig, SyncRootFlag};

use crate::normalize::{RootPathNormalizer, ShellLocator};
use crate::placeholder::{AttributeSource, PlaceholderDetector};
use crate::registry::{RegistrySource, SyncRootRegistry};
use crate::Platform;

/// Strategy for Windows-class hosts, assembled from the three probing
/// components and the OS backends they read from.
pub struct ManagedPlatform {
    normalizer: RootPathNormalizer,
    registry: SyncRootRegistry,
    detector: PlaceholderDetector,
}

impl ManagedPlatform {
    pub fn new(
        config: &ProbeConfig,
        shell: Box<dyn ShellLocator>,
        registry: Box<dyn RegistrySource>,
        attributes: Box<dyn AttributeSource>,
    ) -> Self {
        let platform = Self {
            normalizer: RootPathNormalizer::new(shell, config.shell.levels_up),
            registry: SyncRootRegistry::new(registry, config.sync_root.clone()),
            detector: PlaceholderDetector::new(attributes),
        };
        if let Some(forced) = config.placeholder.sync_root {
            platform.detector.sync_root().set(forced);
        }
        platform
    }

    /// Backed by `PATH` lookup, HKEY_LOCAL_MACHINE and `GetFileAttributesW`.
    #[cfg(target_os = "windows")]
    pub fn native(config: &ProbeConfig) -> Self {
        use crate::normalize::PathLookup;
        use crate::native::{NativeAttributes, NativeRegistry};

        Self::new(
            config,
            Box::new(PathLookup::new(config.shell.pwd_program.clone())),
            Box::new(NativeRegistry),
            Box::new(NativeAttributes),
        )
    }

    pub fn normalizer(&self) -> &RootPathNormalizer {
        &self.normalizer
    }
}

impl Platform for ManagedPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Managed
    }

    fn normalize_root_path(&self, pattern: &str) -> String {
        self.normalizer.normalize(pattern)
    }

    fn native_line_ending(&self) -> LineEnding {
        LineEnding::CrLf
    }

    fn is_managed_sync_root(&self, path: &Path) -> bool {
        self.registry.is_managed_sync_root(path)
    }

    fn classify_placeholder(&self, path: &Path) -> PlaceholderState {
        self.detector.classify(path)
    }

    fn sync_root_flag(&self) -> Option<&SyncRootFlag> {
        Some(self.detector.sync_root())
    }

    fn scan(&self, paths: &[PathBuf]) -> Vec<PlaceholderState> {
        self.detector.scan(paths)
    }
}
