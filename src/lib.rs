pub mod annotation;
pub mod config;
pub mod transports;
pub mod utils;

#[cfg(feature = "python")]
pub mod bindings;

pub use annotation::{
    send_comment, CommentBackend, CommentError, CommentRequest, EventKind, ExperimentSession,
    NspCommentDispatcher, RelayCommentBackend,
};
