use std::path::PathBuf;

use thiserror::Error;

pub type ProbeResult<T> = Result<T, ProbeError>;

/// Failures inside the probing components.
///
/// None of these reach callers of the platform operations: every public
/// entry point collapses them to its conservative default.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("shell program not found on PATH: {0}")]
    ShellNotFound(String),

    #[error("cannot derive shell root from {path}: {reason}")]
    PrefixDerivation { path: String, reason: String },

    #[error("registry {step} failed for {key}: code {code}")]
    Registry {
        step: &'static str,
        key: String,
        code: u32,
    },

    #[error("file attributes unavailable for {}: code {code}", path.display())]
    Attributes { path: PathBuf, code: u32 },

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    pub fn registry(step: &'static str, key: impl Into<String>, code: u32) -> Self {
        ProbeError::Registry {
            step,
            key: key.into(),
            code,
        }
    }
}
