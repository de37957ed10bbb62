use tracing::debug;

use super::annotator::annotate;
use super::backend::{CommentBackend, CommentRequest};
use super::connection::{ConnectionManager, NspTransport};
use super::error::CommentError;
use super::filename::{synthesize, SessionLabel};
use super::ledger::{peek_current, peek_next, LedgerLock};
use super::marker::EventKind;

/// Comments straight onto the NSPs through the SDK transport.
///
/// Every request runs: connect, number the session, send. Any failure is
/// returned as-is; nothing is retried or rolled back.
pub struct NspCommentDispatcher<T> {
    links: ConnectionManager<T>,
}

impl<T: NspTransport> NspCommentDispatcher<T> {
    pub fn new(links: ConnectionManager<T>) -> Self {
        Self { links }
    }

    pub fn links(&self) -> &ConnectionManager<T> {
        &self.links
    }

    pub fn links_mut(&mut self) -> &mut ConnectionManager<T> {
        &mut self.links
    }

    /// Runs one request and returns the session label it was sent under.
    pub fn dispatch(&mut self, request: &CommentRequest) -> Result<SessionLabel, CommentError> {
        self.links.ensure_connections()?;

        let path = request.ledger_path.as_path();
        let label = if request.event == EventKind::Start {
            // Held until the new row is on disk, so two starts cannot share an id.
            let _lock = LedgerLock::acquire(path)?;
            let mut entry = peek_next(path)?;
            synthesize(
                path,
                &mut entry.table,
                entry.sequence_id,
                &entry.subject_id,
                &request.task,
                true,
            )?
        } else {
            let mut entry = peek_current(path)?;
            synthesize(
                path,
                &mut entry.table,
                entry.sequence_id,
                &entry.subject_id,
                &request.task,
                false,
            )?
        };
        debug!(%label, event = %request.event, "resolved session label");

        annotate(
            &mut self.links,
            &request.event,
            label.as_str(),
            &request.additional_text,
        )?;
        Ok(label)
    }
}

impl<T: NspTransport> CommentBackend for NspCommentDispatcher<T> {
    fn send(&mut self, request: &CommentRequest) -> Result<(), CommentError> {
        self.dispatch(request).map(|_| ())
    }

    fn name(&self) -> &'static str {
        "nsp"
    }
}
