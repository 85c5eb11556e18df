//! Shell root-path rewriting.
//!
//! The POSIX shell bundled with Git for Windows expands an argument such as
//! `/foo` into the native directory it maps its root to, with forward
//! slashes:
//!
//! ```text
//! $ git /foo
//! git: 'C:/Program Files/Git/foo' is not a git command.
//! ```
//!
//! [`RootPathNormalizer`] undoes that expansion by replacing the shell root
//! prefix with `/`. The prefix is derived from where the shell's `pwd`
//! program is installed (`<root>\usr\bin\pwd.exe`), discovered on first use
//! and kept for the rest of the process.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, OnceLock, PoisonError};

use cfprobe_core::{ProbeError, ProbeResult};
use regex::Regex;
use tracing::debug;

const SEPARATORS: [char; 2] = ['/', '\\'];

static DRIVE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A(?-u:\w):[/\\]").expect("valid regex"));

/// Finds the executable path of the shell's `pwd` program.
pub trait ShellLocator: Send + Sync {
    fn locate(&self) -> ProbeResult<String>;
}

impl<T: ShellLocator + ?Sized> ShellLocator for Arc<T> {
    fn locate(&self) -> ProbeResult<String> {
        (**self).locate()
    }
}

/// Resolves a program name against `PATH` the way a process spawn would.
#[derive(Debug, Clone)]
pub struct PathLookup {
    program: String,
    search_path: Option<OsString>,
}

impl PathLookup {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            search_path: None,
        }
    }

    /// Search these directories instead of the process `PATH`.
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    fn candidates(&self, dir: &Path) -> Vec<PathBuf> {
        let mut names = Vec::new();
        if !cfg!(windows) || Path::new(&self.program).extension().is_some() {
            names.push(dir.join(&self.program));
        }
        if cfg!(windows) {
            let pathext = std::env::var("PATHEXT").unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".into());
            for ext in pathext.split(';').filter(|e| !e.is_empty()) {
                names.push(dir.join(format!("{}{}", self.program, ext.to_ascii_lowercase())));
            }
        }
        names
    }
}

impl ShellLocator for PathLookup {
    fn locate(&self) -> ProbeResult<String> {
        let search_path = self
            .search_path
            .clone()
            .or_else(|| std::env::var_os("PATH"))
            .ok_or_else(|| ProbeError::ShellNotFound(self.program.clone()))?;

        std::env::split_paths(&search_path)
            .filter(|dir| !dir.as_os_str().is_empty())
            .flat_map(|dir| self.candidates(&dir))
            .find(|candidate| candidate.is_file())
            .map(|found| found.to_string_lossy().into_owned())
            .ok_or_else(|| ProbeError::ShellNotFound(self.program.clone()))
    }
}

/// True if `pattern` starts with a drive letter and a separator (`C:/`, `d:\`).
pub fn has_drive_prefix(pattern: &str) -> bool {
    DRIVE_PREFIX.is_match(pattern)
}

/// Replace the first occurrence of `prefix` in `pattern` with `/`.
///
/// Only the first occurrence is rewritten; a pattern that repeats the prefix
/// keeps the later copies.
pub fn replace_first(pattern: &str, prefix: &str) -> String {
    pattern.replacen(prefix, "/", 1)
}

/// Directory containing `path`, treating both `/` and `\` as separators.
fn parent_dir(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches(SEPARATORS);
    let idx = trimmed.rfind(SEPARATORS)?;
    Some(trimmed[..idx].trim_end_matches(SEPARATORS))
}

/// Shell root prefix for an executable installed `levels_up` directories
/// below it, with forward slashes and one trailing `/`.
///
/// `C:\Program Files\Git\usr\bin\pwd.exe` with 3 levels gives
/// `C:/Program Files/Git/`.
pub fn derive_shell_root(executable: &str, levels_up: usize) -> ProbeResult<String> {
    let mut root = executable;
    for _ in 0..levels_up {
        root = parent_dir(root).ok_or_else(|| ProbeError::PrefixDerivation {
            path: executable.to_string(),
            reason: format!("fewer than {levels_up} parent directories"),
        })?;
    }
    Ok(format!("{}/", root.replace('\\', "/")))
}

pub struct RootPathNormalizer {
    locator: Box<dyn ShellLocator>,
    levels_up: usize,
    prefix: OnceLock<String>,
    discovery: Mutex<()>,
}

impl RootPathNormalizer {
    pub fn new(locator: Box<dyn ShellLocator>, levels_up: usize) -> Self {
        Self {
            locator,
            levels_up,
            prefix: OnceLock::new(),
            discovery: Mutex::new(()),
        }
    }

    /// Strip the shell root prefix from a drive-letter path.
    ///
    /// Patterns without a drive prefix, and every pattern while the shell
    /// cannot be located, are returned unchanged.
    pub fn normalize(&self, pattern: &str) -> String {
        if !has_drive_prefix(pattern) {
            return pattern.to_string();
        }
        match self.prefix() {
            Some(prefix) => replace_first(pattern, prefix),
            None => pattern.to_string(),
        }
    }

    /// The prefix, if it has already been discovered.
    pub fn cached_prefix(&self) -> Option<&str> {
        self.prefix.get().map(String::as_str)
    }

    /// The prefix, discovering it if needed. Concurrent callers wait for a
    /// single discovery; a failed discovery is retried on the next call.
    pub fn prefix(&self) -> Option<&str> {
        if let Some(prefix) = self.cached_prefix() {
            return Some(prefix);
        }

        let _guard = self.discovery.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prefix) = self.cached_prefix() {
            return Some(prefix);
        }

        match self.discover() {
            Ok(prefix) => {
                debug!(prefix = %prefix, "discovered shell root prefix");
                Some(self.prefix.get_or_init(|| prefix).as_str())
            }
            Err(e) => {
                debug!(error = %e, "shell root prefix unavailable");
                None
            }
        }
    }

    fn discover(&self) -> ProbeResult<String> {
        let executable = self.locator.locate()?;
        derive_shell_root(&executable, self.levels_up)
    }
}
