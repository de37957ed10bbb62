use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::backend::{send_comment, CommentBackend};
use super::connection::{ConnectionManager, NspTransport};
use super::dispatcher::NspCommentDispatcher;
use super::error::CommentError;
use super::relay::RelayCommentBackend;
use crate::config::{BackendKind, Config};
use crate::utils::log::append_event_line;

/// Everything the task needs to comment on one run, passed around
/// explicitly. Covers the four places the task comments: start, per-trial
/// annotation, stop, and fatal error.
pub struct ExperimentSession {
    backend: Box<dyn CommentBackend>,
    task: String,
    ledger_path: PathBuf,
    enabled: bool,
    event_log: Option<PathBuf>,
}

impl ExperimentSession {
    pub fn new(
        backend: Box<dyn CommentBackend>,
        task: impl Into<String>,
        ledger_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backend,
            task: task.into(),
            ledger_path: ledger_path.into(),
            enabled: true,
            event_log: None,
        }
    }

    /// Builds the session described by `config`. The NSP backend drives
    /// `transport`; the other backends ignore it.
    pub fn from_config<T: NspTransport + 'static>(
        config: &Config,
        transport: T,
    ) -> Result<Self, CommentError> {
        let backend: Box<dyn CommentBackend> = match config.session.backend {
            BackendKind::Nsp | BackendKind::Disabled => {
                let links = ConnectionManager::new(transport, config.nsp.address_source())
                    .with_policy(config.nsp.connection_policy);
                Box::new(NspCommentDispatcher::new(links))
            }
            BackendKind::Relay => Box::new(RelayCommentBackend::new(
                &config.relay.url,
                config.relay.timeout(),
            )?),
        };

        let mut session = Self::new(
            backend,
            config.session.task.clone(),
            config.session.ledger_path.clone(),
        )
        .enabled(config.session.backend != BackendKind::Disabled);
        if let Some(log) = &config.session.event_log {
            session = session.with_event_log(log);
        }
        Ok(session)
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_event_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.event_log = Some(path.into());
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn start(&mut self) -> Result<(), CommentError> {
        self.send("start", "")
    }

    pub fn annotate(&mut self, text: &str) -> Result<(), CommentError> {
        self.send("annotate", text)
    }

    pub fn stop(&mut self) -> Result<(), CommentError> {
        self.send("stop", "")
    }

    pub fn kill(&mut self) -> Result<(), CommentError> {
        self.send("kill", "")
    }

    pub fn error(&mut self, text: &str) -> Result<(), CommentError> {
        self.send("error", text)
    }

    /// Sends any event by name. A no-op when comments are disabled.
    pub fn send(&mut self, event: &str, text: &str) -> Result<(), CommentError> {
        if !self.enabled {
            return Ok(());
        }

        send_comment(
            self.backend.as_mut(),
            event,
            &self.task,
            &self.ledger_path,
            text,
        )?;

        if let Some(log) = &self.event_log {
            let message = if text.is_empty() { self.task.as_str() } else { text };
            if let Err(e) = append_event_line(log, event, message) {
                warn!(log = %log.display(), error = %e, "failed to write event log");
            }
        }
        info!(event, backend = self.backend.name(), "comment sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::backend::CommentRequest;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    #[derive(Clone, Default)]
    struct Collect(Arc<Mutex<Vec<CommentRequest>>>);

    impl CommentBackend for Collect {
        fn send(&mut self, request: &CommentRequest) -> Result<(), CommentError> {
            self.0.lock().unwrap().push(request.clone());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "collect"
        }
    }

    #[test]
    fn call_points_map_to_events() {
        let sent = Collect::default();
        let mut session = ExperimentSession::new(Box::new(sent.clone()), "InstrWM", "P01.csv");

        session.start().unwrap();
        session.annotate("trial=1").unwrap();
        session.error("display lost").unwrap();

        let sent = sent.0.lock().unwrap();
        let events: Vec<&str> = sent.iter().map(|r| r.event.as_str()).collect();
        assert_eq!(events, ["start", "annotate", "error"]);
        assert_eq!(sent[1].additional_text, "trial=1");
        assert!(sent.iter().all(|r| r.task == "InstrWM"));
    }

    #[test]
    fn disabled_session_sends_nothing() {
        let sent = Collect::default();
        let mut session =
            ExperimentSession::new(Box::new(sent.clone()), "InstrWM", "P01.csv").enabled(false);

        session.start().unwrap();
        session.stop().unwrap();
        assert!(sent.0.lock().unwrap().is_empty());
    }

    #[test]
    fn sent_events_are_mirrored_to_the_event_log() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("events.tsv");
        let mut session = ExperimentSession::new(Box::new(Collect::default()), "InstrWM", "P01.csv")
            .with_event_log(&log);

        session.start().unwrap();
        session.annotate("trial=2").unwrap();

        let contents = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert!(lines[0].ends_with("\tstart\tInstrWM"));
        assert!(lines[1].ends_with("\tannotate\ttrial=2"));
    }

    #[test]
    fn disabled_backend_in_config_builds_a_quiet_session() {
        let mut config = Config::default();
        config.session.backend = BackendKind::Disabled;

        let session = ExperimentSession::from_config(
            &config,
            crate::transports::memory::RecordingTransport::new(),
        )
        .unwrap();
        assert!(!session.is_enabled());
    }
}
