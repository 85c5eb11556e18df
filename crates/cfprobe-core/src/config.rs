use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ProbeError, ProbeResult};

/// Top-level configuration (loaded from cfprobe.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub log: LogConfig,
    pub shell: ShellConfig,
    pub sync_root: SyncRootConfig,
    pub placeholder: PlaceholderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: warn)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

/// POSIX-emulation shell used to derive the root prefix
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Program looked up on PATH (default: pwd)
    pub pwd_program: String,
    /// Directory levels between the shell root and the program
    /// (`<root>\usr\bin\pwd.exe` is 3)
    pub levels_up: usize,
}

/// Cloud sync-root registration lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncRootConfig {
    /// Key under HKEY_LOCAL_MACHINE holding one subkey per registered provider
    pub registry_path: String,
    /// Substring identifying our provider's subkeys
    pub provider_name: String,
    /// Child key listing the registered roots as string values
    pub user_sync_roots_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceholderConfig {
    /// Force the sync-root flag instead of detecting it from the registry
    pub sync_root: Option<bool>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            pwd_program: "pwd".into(),
            levels_up: 3,
        }
    }
}

impl Default for SyncRootConfig {
    fn default() -> Self {
        Self {
            registry_path: r"SOFTWARE\Microsoft\Windows\CurrentVersion\Explorer\SyncRootManager"
                .into(),
            provider_name: "AnchorpointGitCloudProvider".into(),
            user_sync_roots_key: "UserSyncRoots".into(),
        }
    }
}

impl ProbeConfig {
    /// Load from a TOML file. `None` if the file does not exist.
    pub fn load(path: &Path) -> ProbeResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
            .map(Some)
            .map_err(|e| ProbeError::Config(format!("parsing {}: {e}", path.display())))
    }

    pub fn parse(content: &str) -> ProbeResult<Self> {
        toml::from_str(content).map_err(|e| ProbeError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> ProbeResult<String> {
        toml::to_string_pretty(self).map_err(|e| ProbeError::Config(e.to_string()))
    }
}
