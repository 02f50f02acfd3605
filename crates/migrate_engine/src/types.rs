use std::fmt;
use std::path::PathBuf;

use crate::dom::SelectorError;
use crate::persist::PersistError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

impl FetchOutput {
    /// Declared content type, empty when the server sent none.
    pub fn content_type(&self) -> &str {
        self.metadata.content_type.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub redirect_count: usize,
    pub content_type: Option<String>,
    pub byte_len: u64,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind, FailureKind::InvalidUrl)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Page,
    Board,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Page => write!(f, "page"),
            TargetKind::Board => write!(f, "board"),
        }
    }
}

/// Failure while turning one fetched page into fragment HTML.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Selector(#[from] SelectorError),
}

/// Failure of one top-level target. Never aborts the batch.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("write failed: {0}")]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOutcome {
    pub path: PathBuf,
    pub bytes_written: u64,
    /// Number of cards for boards, `None` for standalone pages.
    pub items: Option<usize>,
    /// Standalone pages are persisted even when their text looks like spam.
    pub spam_flagged: bool,
}

#[derive(Debug)]
pub struct TargetReport {
    pub fragment_name: String,
    pub kind: TargetKind,
    pub result: Result<TargetOutcome, TargetError>,
}

#[derive(Debug, Default)]
pub struct MigrationReport {
    pub targets: Vec<TargetReport>,
    pub assets_written: usize,
}

impl MigrationReport {
    pub fn failures(&self) -> impl Iterator<Item = &TargetReport> {
        self.targets.iter().filter(|t| t.result.is_err())
    }

    pub fn succeeded(&self) -> usize {
        self.targets.iter().filter(|t| t.result.is_ok()).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} of {} targets saved, {} failed, {} assets written",
            self.succeeded(),
            self.targets.len(),
            self.failures().count(),
            self.assets_written
        )
    }
}
