use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Rejection of a block by a document builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("document builder rejected data (code {code})")]
pub struct DocumentError {
    pub code: i32,
}

impl DocumentError {
    /// Not enough memory to hold the document
    pub const OUT_OF_MEMORY: DocumentError = DocumentError { code: 1 };

    pub fn new(code: i32) -> Self {
        Self { code }
    }
}

/// Errors that can end a file transfer
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("short write: {written} of {expected} bytes accepted")]
    ShortWrite { expected: usize, written: usize },

    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    #[error("close failed: {0}")]
    Close(#[source] io::Error),
}

impl TransferError {
    /// Whether the data on disk may be incomplete
    pub fn is_write_failure(&self) -> bool {
        matches!(
            self,
            TransferError::ShortWrite { .. } | TransferError::Write(_) | TransferError::Close(_)
        )
    }
}

pub type TransferResult<T> = Result<T, TransferError>;

/// How a transfer ended
///
/// Cancellation is a normal ending: the caller decides whether to keep
/// partial results.
#[derive(Debug)]
pub enum Completion {
    Finished,
    Cancelled,
    Failed(TransferError),
}

impl Completion {
    pub fn is_finished(&self) -> bool {
        matches!(self, Completion::Finished)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Completion::Cancelled)
    }

    pub fn error(&self) -> Option<&TransferError> {
        match self {
            Completion::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Convert into a `Result`, treating cancellation as success
    pub fn into_result(self) -> TransferResult<()> {
        match self {
            Completion::Finished | Completion::Cancelled => Ok(()),
            Completion::Failed(err) => Err(err),
        }
    }
}

impl std::fmt::Display for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Completion::Finished => write!(f, "finished"),
            Completion::Cancelled => write!(f, "cancelled"),
            Completion::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}
