use std::fmt;
use std::sync::OnceLock;

/// Which probing strategy is active for this process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformKind {
    /// Windows-class host: shell root rewriting, registry, recall attributes
    Managed,
    /// Every other host: all operations are no-ops
    Unmanaged,
}

/// Native text line terminator of the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    /// `\n`
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a path was (or was not) judged to be a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderState {
    /// Working tree is not a managed sync root; nothing was probed
    Skipped,
    /// File does not exist; its parent may be a virtual directory
    Missing,
    /// A recall-on-open or recall-on-data-access bit is set
    Recall,
    /// File exists and its content is on disk
    Resident,
    /// Attributes could not be read
    Unknown,
}

impl PlaceholderState {
    /// True when the caller must fetch the content instead of trusting local bytes.
    pub fn is_placeholder(self) -> bool {
        matches!(self, PlaceholderState::Missing | PlaceholderState::Recall)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlaceholderState::Skipped => "skipped",
            PlaceholderState::Missing => "missing",
            PlaceholderState::Recall => "recall",
            PlaceholderState::Resident => "resident",
            PlaceholderState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PlaceholderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session-wide "working tree is inside a managed sync root" flag.
///
/// Written once during initialization, read-only afterwards. Reads before
/// the first write observe `false`.
#[derive(Debug, Default)]
pub struct SyncRootFlag {
    value: OnceLock<bool>,
}

impl SyncRootFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag. Returns false if it had already been set; the stored
    /// value is left untouched in that case.
    pub fn set(&self, value: bool) -> bool {
        self.value.set(value).is_ok()
    }

    pub fn get(&self) -> bool {
        self.value.get().copied().unwrap_or(false)
    }

    pub fn is_set(&self) -> bool {
        self.value.get().is_some()
    }
}
