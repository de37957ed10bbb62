use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::CommentError;

pub const SEQUENCE_COLUMN: &str = "emu_id";
pub const LABEL_COLUMN: &str = "file_name";

// -----------------------------------------------------------------------------
// LEDGER TABLE
// -----------------------------------------------------------------------------

/// One recorded session: `emu_id,file_name` in the CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    #[serde(rename = "emu_id")]
    pub sequence_id: u32,
    #[serde(rename = "file_name", default)]
    pub label: String,
}

/// The whole ledger, in file order. Rows are only ever appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerTable {
    rows: Vec<LedgerRow>,
}

impl LedgerTable {
    pub fn rows(&self) -> &[LedgerRow] {
        &self.rows
    }

    pub fn last(&self) -> Option<&LedgerRow> {
        self.rows.last()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: LedgerRow) {
        self.rows.push(row);
    }

    /// Reads the ledger at `path`.
    ///
    /// A missing or zero-length file is an empty ledger, as is a file whose
    /// header has no `emu_id` column. Anything else that does not parse is
    /// `MalformedLedger`.
    pub fn read(path: &Path) -> Result<Self, CommentError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(ledger = %path.display(), "ledger does not exist yet");
                return Ok(Self::default());
            }
            Err(e) => return Err(CommentError::io(path, e)),
        };

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(file);
        let headers = rdr
            .headers()
            .map_err(|e| CommentError::malformed(path, e))?
            .clone();

        if headers.is_empty() {
            return Ok(Self::default());
        }
        if !headers.iter().any(|h| h == SEQUENCE_COLUMN) {
            warn!(
                ledger = %path.display(),
                "ledger has no {} column, treating it as empty", SEQUENCE_COLUMN
            );
            return Ok(Self::default());
        }

        let mut rows = Vec::new();
        for (line, result) in rdr.deserialize::<LedgerRow>().enumerate() {
            let row = result.map_err(|e| CommentError::malformed(path, e))?;
            if row.sequence_id == 0 {
                return Err(CommentError::malformed(
                    path,
                    format!("row {} has {} = 0", line + 1, SEQUENCE_COLUMN),
                ));
            }
            rows.push(row);
        }

        Ok(Self { rows })
    }

    /// Rewrites the full table to `path` via a temp file in the same
    /// directory renamed over the original, so readers never see a partial
    /// file.
    pub fn write(&self, path: &Path) -> Result<(), CommentError> {
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| CommentError::io(&parent, e))?;

        let mut temp =
            tempfile::NamedTempFile::new_in(&parent).map_err(|e| CommentError::io(&parent, e))?;
        {
            let mut wtr = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(temp.as_file_mut());
            wtr.write_record([SEQUENCE_COLUMN, LABEL_COLUMN])
                .map_err(|e| CommentError::malformed(path, e))?;
            for row in &self.rows {
                wtr.serialize(row)
                    .map_err(|e| CommentError::malformed(path, e))?;
            }
            wtr.flush().map_err(|e| CommentError::io(path, e))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| CommentError::io(path, e))?;
        temp.persist(path)
            .map_err(|e| CommentError::io(path, e.error))?;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// PEEKS
// -----------------------------------------------------------------------------

/// What a peek found: the sequence id to use, the subject the ledger
/// belongs to, and the rows read.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub sequence_id: u32,
    pub subject_id: String,
    pub table: LedgerTable,
}

/// Sequence id the next session should take: last id + 1, or 1 for an empty
/// ledger. Never writes.
pub fn peek_next(path: &Path) -> Result<LedgerEntry, CommentError> {
    let subject_id = subject_id_from_path(path)?;
    let table = LedgerTable::read(path)?;
    let sequence_id = match table.last() {
        Some(row) => row
            .sequence_id
            .checked_add(1)
            .ok_or_else(|| CommentError::malformed(path, "sequence id overflow"))?,
        None => 1,
    };
    Ok(LedgerEntry {
        sequence_id,
        subject_id,
        table,
    })
}

/// Sequence id of the session already running (the last row).
pub fn peek_current(path: &Path) -> Result<LedgerEntry, CommentError> {
    let subject_id = subject_id_from_path(path)?;
    let table = LedgerTable::read(path)?;
    let sequence_id = table
        .last()
        .map(|row| row.sequence_id)
        .ok_or_else(|| CommentError::EmptyLedger {
            path: path.to_path_buf(),
        })?;
    Ok(LedgerEntry {
        sequence_id,
        subject_id,
        table,
    })
}

/// Subject id is the ledger's file name up to the first `_` or `.`,
/// e.g. `P01_sessions.csv` and `P01.csv` both give `P01`.
pub fn subject_id_from_path(path: &Path) -> Result<String, CommentError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CommentError::malformed(path, "ledger path has no file name"))?;

    let subject = name
        .split('_')
        .next()
        .and_then(|s| s.split('.').next())
        .unwrap_or_default();

    if subject.is_empty() {
        return Err(CommentError::malformed(
            path,
            "cannot derive a subject id from the file name",
        ));
    }
    Ok(subject.to_string())
}

// -----------------------------------------------------------------------------
// LOCKING
// -----------------------------------------------------------------------------

/// Exclusive lock on `<ledger>.lock`, held across peek-next and the
/// persisting write of a start event. Released on drop.
pub struct LedgerLock {
    file: File,
    path: PathBuf,
}

impl LedgerLock {
    pub fn acquire(ledger_path: &Path) -> Result<Self, CommentError> {
        let path = lock_path(ledger_path);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| CommentError::io(dir, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| CommentError::io(&path, e))?;
        FileExt::lock_exclusive(&file).map_err(|e| CommentError::io(&path, e))?;

        // Leave the holder's pid behind for whoever finds a stale lock file.
        if let Err(e) = file.set_len(0) {
            debug!(lock = %path.display(), error = %e, "could not clear ledger lock file");
        }
        if let Err(e) = writeln!(file, "{}", std::process::id()) {
            debug!(lock = %path.display(), error = %e, "could not record pid in ledger lock file");
        }

        debug!(lock = %path.display(), "ledger lock acquired");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(lock = %self.path.display(), error = %e, "failed to release ledger lock");
        }
    }
}

fn lock_path(ledger_path: &Path) -> PathBuf {
    let mut name = OsString::from(ledger_path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}
