// src/annotation/mod.rs

pub mod annotator;
pub mod backend;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod filename;
pub mod ledger;
pub mod marker;
pub mod relay;
pub mod session;

pub use backend::{send_comment, CommentBackend, CommentRequest};
pub use connection::{AddressSource, ConnectionManager, ConnectionPolicy, NspTransport, NSP_COUNT};
pub use dispatcher::NspCommentDispatcher;
pub use error::CommentError;
pub use filename::SessionLabel;
pub use marker::{EventKind, EventMarker, MarkerColor};
pub use relay::RelayCommentBackend;
pub use session::ExperimentSession;
