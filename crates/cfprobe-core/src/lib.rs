pub mod config;
pub mod error;
pub mod types;

pub use config::ProbeConfig;
pub use error::{ProbeError, ProbeResult};
pub use types::{LineEnding, PlaceholderState, PlatformKind, SyncRootFlag};
