use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use chrono::Local;
use tracing_subscriber::EnvFilter;

/// Appends one line to the session event log, creating the file (and its
/// directory) on first use
///
/// # Arguments
///
/// * `path` - The event log file
/// * `event` - The event name (`start`, `annotate`, ...)
/// * `message` - Free text for the line, e.g. the session label or trial info
///
/// # Returns
///
/// * `io::Result<()>` - Success or error result
pub fn append_event_line(path: &Path, event: &str, message: &str) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    // Tabs would shift columns for whoever reads the log back in
    let message = message.replace(['\t', '\n'], " ");
    let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");

    writeln!(file, "{}\t{}\t{}", timestamp, event, message)?;
    file.flush()?;

    Ok(())
}

/// Installs the global `tracing` subscriber for the binary
///
/// # Arguments
///
/// * `default_level` - Filter used when `RUST_LOG` is not set
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}
