//! In-memory OS backends for unit tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use cfprobe_core::{ProbeError, ProbeResult};

use crate::normalize::ShellLocator;
use crate::placeholder::AttributeSource;
use crate::registry::{RegistryKey, RegistrySource};

const ERROR_FILE_NOT_FOUND: u32 = 2;
const ERROR_ACCESS_DENIED: u32 = 5;

pub struct FixedShell {
    executable: Option<String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FixedShell {
    pub fn found(executable: &str) -> Self {
        Self {
            executable: Some(executable.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn missing() -> Self {
        Self {
            executable: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ShellLocator for FixedShell {
    fn locate(&self) -> ProbeResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.executable
            .clone()
            .ok_or_else(|| ProbeError::ShellNotFound("pwd".into()))
    }
}

#[derive(Default)]
pub struct MemoryRegistry {
    keys: BTreeMap<String, BTreeMap<String, String>>,
    failing_enumeration: BTreeSet<String>,
    failing_values: BTreeSet<(String, String)>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `path` and every ancestor key.
    pub fn with_key(mut self, path: &str) -> Self {
        let mut current = String::new();
        for part in path.split('\\') {
            if !current.is_empty() {
                current.push('\\');
            }
            current.push_str(part);
            self.keys.entry(current.clone()).or_default();
        }
        self
    }

    pub fn with_value(mut self, key: &str, name: &str, data: &str) -> Self {
        self = self.with_key(key);
        if let Some(values) = self.keys.get_mut(key) {
            values.insert(name.to_string(), data.to_string());
        }
        self
    }

    pub fn failing_enumeration(mut self, key: &str) -> Self {
        self.failing_enumeration.insert(key.to_string());
        self
    }

    pub fn failing_value(mut self, key: &str, name: &str) -> Self {
        self.failing_values.insert((key.to_string(), name.to_string()));
        self
    }
}

impl RegistrySource for MemoryRegistry {
    fn open(&self, path: &str) -> ProbeResult<Box<dyn RegistryKey + '_>> {
        if !self.keys.contains_key(path) {
            return Err(ProbeError::registry("open", path, ERROR_FILE_NOT_FOUND));
        }
        Ok(Box::new(MemoryKey {
            registry: self,
            path: path.to_string(),
        }))
    }
}

struct MemoryKey<'a> {
    registry: &'a MemoryRegistry,
    path: String,
}

impl RegistryKey for MemoryKey<'_> {
    fn subkey_names(&self) -> ProbeResult<Vec<String>> {
        if self.registry.failing_enumeration.contains(&self.path) {
            return Err(ProbeError::registry("enumerate subkeys", &self.path, ERROR_ACCESS_DENIED));
        }
        let prefix = format!("{}\\", self.path);
        Ok(self
            .registry
            .keys
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter(|rest| !rest.contains('\\'))
            .map(str::to_string)
            .collect())
    }

    fn value_names(&self) -> ProbeResult<Vec<String>> {
        Ok(self.registry.keys[&self.path].keys().cloned().collect())
    }

    fn string_value(&self, name: &str) -> ProbeResult<String> {
        let failing = (self.path.clone(), name.to_string());
        if self.registry.failing_values.contains(&failing) {
            return Err(ProbeError::registry("read value", &self.path, ERROR_ACCESS_DENIED));
        }
        self.registry.keys[&self.path]
            .get(name)
            .cloned()
            .ok_or_else(|| ProbeError::registry("read value", &self.path, ERROR_FILE_NOT_FOUND))
    }
}

/// Attribute bits per path; paths not listed do not exist.
#[derive(Default)]
pub struct StaticAttributes {
    files: HashMap<PathBuf, Option<u32>>,
    probes: AtomicUsize,
}

impl StaticAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, attributes: u32) -> Self {
        self.files.insert(PathBuf::from(path), Some(attributes));
        self
    }

    /// A file that exists but whose attributes cannot be read.
    pub fn with_unreadable(mut self, path: &str) -> Self {
        self.files.insert(PathBuf::from(path), None);
        self
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl AttributeSource for StaticAttributes {
    fn exists(&self, path: &Path) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.files.contains_key(path)
    }

    fn attributes(&self, path: &Path) -> ProbeResult<u32> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        match self.files.get(path) {
            Some(Some(bits)) => Ok(*bits),
            _ => Err(ProbeError::Attributes {
                path: path.to_path_buf(),
                code: ERROR_ACCESS_DENIED,
            }),
        }
    }
}
