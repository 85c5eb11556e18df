//! Sync-root lookup: is a directory registered with the Cloud Files sync
//! root manager by our provider?
//!
//! Registered roots live under
//! `HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\Explorer\SyncRootManager`,
//! one subkey per provider registration (`<Provider>!<SID>!<Account>`), each
//! with a `UserSyncRoots` child whose string values are root paths ending in
//! `\`.

use std::path::Path;
use std::sync::Arc;

use cfprobe_core::config::SyncRootConfig;
use cfprobe_core::{ProbeError, ProbeResult};
use tracing::{debug, trace};

/// Read access to a hierarchical registry.
pub trait RegistrySource: Send + Sync {
    /// Open a key by its full path below the hive root.
    fn open(&self, path: &str) -> ProbeResult<Box<dyn RegistryKey + '_>>;
}

impl<T: RegistrySource + ?Sized> RegistrySource for Arc<T> {
    fn open(&self, path: &str) -> ProbeResult<Box<dyn RegistryKey + '_>> {
        (**self).open(path)
    }
}

/// An open registry key. Closed on drop.
pub trait RegistryKey {
    fn subkey_names(&self) -> ProbeResult<Vec<String>>;
    fn value_names(&self) -> ProbeResult<Vec<String>>;
    fn string_value(&self, name: &str) -> ProbeResult<String>;
}

/// Result of asking for the name at one index of a key's subkeys or values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStep {
    /// The name was written to the front of the buffer; this many code units.
    Name(usize),
    /// The index is past the last entry.
    End,
    /// Any other OS status code.
    Failed(u32),
}

/// Drive an index-based enumeration from 0 until it reports [`NameStep::End`].
///
/// `next` gets the index and a scratch buffer of `capacity` UTF-16 units.
/// The first failure aborts the whole enumeration.
pub fn collect_names(
    step: &'static str,
    key: &str,
    capacity: usize,
    mut next: impl FnMut(u32, &mut [u16]) -> NameStep,
) -> ProbeResult<Vec<String>> {
    let mut names = Vec::new();
    let mut buf = vec![0u16; capacity];
    for index in 0u32.. {
        match next(index, &mut buf) {
            NameStep::Name(len) => {
                names.push(String::from_utf16_lossy(&buf[..len.min(buf.len())]));
            }
            NameStep::End => break,
            NameStep::Failed(code) => return Err(ProbeError::registry(step, key, code)),
        }
    }
    Ok(names)
}

/// `path` with trailing separators collapsed to a single `\`.
pub fn with_trailing_separator(path: &str) -> String {
    format!("{}\\", path.trim_end_matches(['\\', '/']))
}

pub struct SyncRootRegistry {
    source: Box<dyn RegistrySource>,
    config: SyncRootConfig,
}

impl SyncRootRegistry {
    pub fn new(source: Box<dyn RegistrySource>, config: SyncRootConfig) -> Self {
        Self { source, config }
    }

    /// True if some provider registration lists `path` as a user sync root.
    ///
    /// Never fails: an unreadable registry means "not a sync root".
    pub fn is_managed_sync_root(&self, path: &Path) -> bool {
        let wanted = with_trailing_separator(&path.to_string_lossy());
        match self.find(&wanted) {
            Ok(found) => {
                debug!(path = %wanted, found, "sync root lookup");
                found
            }
            Err(e) => {
                debug!(path = %wanted, error = %e, "sync root registry unavailable");
                false
            }
        }
    }

    fn find(&self, wanted: &str) -> ProbeResult<bool> {
        let root = self.source.open(&self.config.registry_path)?;
        let providers = root.subkey_names()?;

        for provider in providers
            .iter()
            .filter(|name| name.contains(self.config.provider_name.as_str()))
        {
            let roots_path = format!(
                r"{}\{}\{}",
                self.config.registry_path, provider, self.config.user_sync_roots_key
            );
            match self.roots_contain(&roots_path, wanted) {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => trace!(key = %roots_path, error = %e, "skipping provider registration"),
            }
        }

        Ok(false)
    }

    fn roots_contain(&self, roots_path: &str, wanted: &str) -> ProbeResult<bool> {
        let key = self.source.open(roots_path)?;
        for name in key.value_names()? {
            match key.string_value(&name) {
                Ok(value) if value == wanted => return Ok(true),
                Ok(_) => {}
                Err(e) => trace!(key = %roots_path, value = %name, error = %e, "skipping value"),
            }
        }
        Ok(false)
    }
}
