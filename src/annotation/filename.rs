use std::fmt;
use std::path::Path;

use tracing::info;

use super::error::CommentError;
use super::ledger::{LedgerRow, LedgerTable};

/// Canonical recording name, `EMU-{id:04}_subj-{subject}_{task}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionLabel(String);

impl SessionLabel {
    pub fn new(sequence_id: u32, subject_id: &str, task: &str) -> Self {
        SessionLabel(format!("EMU-{:04}_subj-{}_{}", sequence_id, subject_id, task))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the session label and, when `persist` is set, appends
/// `(sequence_id, label)` to `table` and rewrites the ledger file.
///
/// Non-start events call this with `persist = false` to reproduce the label
/// of the session already on record.
pub fn synthesize(
    ledger_path: &Path,
    table: &mut LedgerTable,
    sequence_id: u32,
    subject_id: &str,
    task: &str,
    persist: bool,
) -> Result<SessionLabel, CommentError> {
    let label = SessionLabel::new(sequence_id, subject_id, task);

    if persist {
        table.push(LedgerRow {
            sequence_id,
            label: label.to_string(),
        });
        table.write(ledger_path)?;
        info!(ledger = %ledger_path.display(), %label, "recorded new session");
    }

    Ok(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::ledger::{peek_current, peek_next};
    use tempfile::tempdir;

    #[test]
    fn label_is_zero_padded() {
        assert_eq!(
            SessionLabel::new(7, "P01", "InstrWM").as_str(),
            "EMU-0007_subj-P01_InstrWM"
        );
        assert_eq!(
            SessionLabel::new(12345, "P01", "InstrWM").as_str(),
            "EMU-12345_subj-P01_InstrWM"
        );
    }

    #[test]
    fn non_persisting_synthesis_leaves_ledger_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("P01.csv");
        let mut table = LedgerTable::default();

        let label = synthesize(&path, &mut table, 7, "P01", "InstrWM", false).unwrap();

        assert_eq!(label.as_str(), "EMU-0007_subj-P01_InstrWM");
        assert!(table.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn current_matches_what_was_just_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("P01_sessions.csv");

        let mut entry = peek_next(&path).unwrap();
        let label = synthesize(
            &path,
            &mut entry.table,
            entry.sequence_id,
            &entry.subject_id,
            "InstrWM",
            true,
        )
        .unwrap();

        let current = peek_current(&path).unwrap();
        assert_eq!(current.sequence_id, entry.sequence_id);
        assert_eq!(current.table.last().unwrap().label, label.as_str());
    }

    #[test]
    fn repeated_persists_count_up_from_one() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("P02.csv");

        for expected in 1..=4 {
            let mut entry = peek_next(&path).unwrap();
            assert_eq!(entry.sequence_id, expected);
            synthesize(
                &path,
                &mut entry.table,
                entry.sequence_id,
                &entry.subject_id,
                "Training",
                true,
            )
            .unwrap();
        }

        let ids: Vec<u32> = peek_current(&path)
            .unwrap()
            .table
            .rows()
            .iter()
            .map(|row| row.sequence_id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }
}
