use std::path::{Path, PathBuf};

use super::error::CommentError;
use super::marker::EventKind;

/// One comment as the experiment asks for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRequest {
    pub event: EventKind,
    pub task: String,
    pub ledger_path: PathBuf,
    pub additional_text: String,
}

impl CommentRequest {
    /// Checks that both `event` and `task` are given.
    pub fn new(
        event: &str,
        task: &str,
        ledger_path: impl Into<PathBuf>,
        additional_text: &str,
    ) -> Result<Self, CommentError> {
        if task.trim().is_empty() {
            return Err(CommentError::InvalidRequest(
                "both event and task must be provided".to_string(),
            ));
        }
        let event = event.trim().parse::<EventKind>().map_err(|_| {
            CommentError::InvalidRequest("both event and task must be provided".to_string())
        })?;

        Ok(Self {
            event,
            task: task.trim().to_string(),
            ledger_path: ledger_path.into(),
            additional_text: additional_text.to_string(),
        })
    }
}

/// A way of getting comments onto the recording. Swapping backends never
/// touches the call sites.
pub trait CommentBackend: Send {
    fn send(&mut self, request: &CommentRequest) -> Result<(), CommentError>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

impl<B: CommentBackend + ?Sized> CommentBackend for Box<B> {
    fn send(&mut self, request: &CommentRequest) -> Result<(), CommentError> {
        (**self).send(request)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Validates the request and hands it to `backend`.
pub fn send_comment<B: CommentBackend + ?Sized>(
    backend: &mut B,
    event: &str,
    task: &str,
    ledger_path: &Path,
    additional_text: &str,
) -> Result<(), CommentError> {
    let request = CommentRequest::new(event, task, ledger_path, additional_text)?;
    backend.send(&request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_task_or_event_is_invalid() {
        for (event, task) in [("", "InstrWM"), ("start", ""), ("  ", "InstrWM"), ("stop", " ")] {
            let err = CommentRequest::new(event, task, "P01.csv", "").unwrap_err();
            assert!(matches!(err, CommentError::InvalidRequest(_)), "{event:?}/{task:?}");
        }
    }

    #[test]
    fn known_and_custom_events_parse() {
        let request = CommentRequest::new("stim_on", "InstrWM", "P01.csv", "axis=2").unwrap();
        assert_eq!(request.event, EventKind::Other("stim_on".to_string()));
        assert_eq!(request.additional_text, "axis=2");

        let request = CommentRequest::new("start", "InstrWM", "P01.csv", "").unwrap();
        assert_eq!(request.event, EventKind::Start);
    }
}
