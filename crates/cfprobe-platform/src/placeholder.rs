//! Placeholder detection: is a file's content actually on disk?
//!
//! Inside a Cloud Files sync root, files can be dehydrated placeholders:
//! the directory entry exists with its real size, but opening it makes the
//! minifilter fetch the content first. Such files carry one of the recall
//! attributes below. Callers use the verdict to force a download instead of
//! hashing bytes that are not resident.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cfprobe_core::{PlaceholderState, ProbeResult, SyncRootFlag};
use rayon::prelude::*;
use tracing::{debug, trace};

/// Opening the file triggers a recall of its content.
pub const FILE_ATTRIBUTE_RECALL_ON_OPEN: u32 = 0x0004_0000;

/// Reading the file's data triggers a recall of its content.
pub const FILE_ATTRIBUTE_RECALL_ON_DATA_ACCESS: u32 = 0x0040_0000;

pub fn has_recall_bits(attributes: u32) -> bool {
    attributes & (FILE_ATTRIBUTE_RECALL_ON_OPEN | FILE_ATTRIBUTE_RECALL_ON_DATA_ACCESS) != 0
}

/// File existence and native attribute bits.
pub trait AttributeSource: Send + Sync {
    /// Anything other than "not found" counts as existing.
    fn exists(&self, path: &Path) -> bool {
        match std::fs::metadata(path) {
            Ok(_) => true,
            Err(e) => e.kind() != std::io::ErrorKind::NotFound,
        }
    }

    fn attributes(&self, path: &Path) -> ProbeResult<u32>;
}

impl<T: AttributeSource + ?Sized> AttributeSource for Arc<T> {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn attributes(&self, path: &Path) -> ProbeResult<u32> {
        (**self).attributes(path)
    }
}

pub struct PlaceholderDetector {
    source: Box<dyn AttributeSource>,
    sync_root: SyncRootFlag,
}

impl PlaceholderDetector {
    pub fn new(source: Box<dyn AttributeSource>) -> Self {
        Self {
            source,
            sync_root: SyncRootFlag::new(),
        }
    }

    /// Flag gating every probe. Nothing is inspected until it is set to true.
    pub fn sync_root(&self) -> &SyncRootFlag {
        &self.sync_root
    }

    pub fn classify(&self, path: &Path) -> PlaceholderState {
        if !self.sync_root.get() {
            return PlaceholderState::Skipped;
        }

        // The parent directory may itself be virtual; a missing file still
        // has to go through the fetch path.
        if !self.source.exists(path) {
            trace!(path = %path.display(), "missing file treated as placeholder");
            return PlaceholderState::Missing;
        }

        match self.source.attributes(path) {
            Ok(bits) if has_recall_bits(bits) => {
                trace!(path = %path.display(), attributes = bits, "recall attribute set");
                PlaceholderState::Recall
            }
            Ok(_) => PlaceholderState::Resident,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "attribute probe failed");
                PlaceholderState::Unknown
            }
        }
    }

    pub fn is_placeholder(&self, path: &Path) -> bool {
        self.classify(path).is_placeholder()
    }

    /// Classify many paths in parallel. Output order matches input order.
    pub fn scan(&self, paths: &[PathBuf]) -> Vec<PlaceholderState> {
        paths.par_iter().map(|p| self.classify(p)).collect()
    }
}
