use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop a comment from reaching the NSPs.
///
/// Device indices are 0-based; messages print them the way the rig labels
/// them (`NSP-1`, `NSP-2`).
#[derive(Debug, Error)]
pub enum CommentError {
    #[error("invalid comment request: {0}")]
    InvalidRequest(String),

    #[error("missing NSP address: environment variable {var} is not set")]
    MissingConfiguration { var: String },

    #[error("error connecting to NSP-{}: {reason}", .device + 1)]
    ConnectionFailure { device: usize, reason: String },

    #[error("failed to send comment to NSP-{}: {reason}", .device + 1)]
    Transmit { device: usize, reason: String },

    #[error("malformed ledger {}: {reason}", .path.display())]
    MalformedLedger { path: PathBuf, reason: String },

    #[error("ledger {} has no sessions yet", .path.display())]
    EmptyLedger { path: PathBuf },

    #[error("cannot set up comment relay client: {0}")]
    RelayClient(String),

    #[error("ledger i/o on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CommentError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CommentError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        CommentError::MalformedLedger {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
