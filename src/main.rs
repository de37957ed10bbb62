use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use nsp_annotator::annotation::filename::SessionLabel;
use nsp_annotator::annotation::ledger::{peek_current, peek_next};
use nsp_annotator::config::{load_config, save_config, BackendKind, Config};
use nsp_annotator::transports::console::ConsoleTransport;
use nsp_annotator::utils::log::init_tracing;
use nsp_annotator::ExperimentSession;

#[derive(Parser)]
#[command(name = "nsp-annotate", about = "Session numbering and NSP comment markers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one comment for the current task
    Send {
        #[arg(long)]
        event: String,
        #[arg(long)]
        task: Option<String>,
        #[arg(long)]
        ledger: Option<PathBuf>,
        #[arg(long, default_value = "")]
        text: String,
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Inspect a session ledger without changing it
    Ledger {
        #[command(subcommand)]
        peek: LedgerPeek,
    },
    /// Write a default config file
    InitConfig { path: PathBuf },
}

#[derive(Subcommand)]
enum LedgerPeek {
    Next {
        path: PathBuf,
        #[arg(long, default_value = "InstrWM")]
        task: String,
    },
    Current {
        path: PathBuf,
        #[arg(long, default_value = "InstrWM")]
        task: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Nsp,
    Relay,
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Send {
            event,
            task,
            ledger,
            text,
            backend,
            config,
        } => {
            let mut config = match config {
                Some(path) => load_config(path)?,
                None => Config::default(),
            };
            if let Some(task) = task {
                config.session.task = task;
            }
            if let Some(ledger) = ledger {
                config.session.ledger_path = ledger;
            }
            match backend {
                Some(BackendArg::Nsp) => config.session.backend = BackendKind::Nsp,
                Some(BackendArg::Relay) => config.session.backend = BackendKind::Relay,
                None => {}
            }

            let mut session = ExperimentSession::from_config(&config, ConsoleTransport::new())
                .map_err(|e| e.to_string())?;
            session.send(&event, &text).map_err(|e| e.to_string())
        }
        Command::Ledger { peek } => {
            let (entry, task) = match peek {
                LedgerPeek::Next { path, task } => (peek_next(&path), task),
                LedgerPeek::Current { path, task } => (peek_current(&path), task),
            };
            let entry = entry.map_err(|e| e.to_string())?;
            let label = SessionLabel::new(entry.sequence_id, &entry.subject_id, &task);
            println!(
                "{} {}  {} {}  {}",
                "emu_id:".bold(),
                entry.sequence_id,
                "subject:".bold(),
                entry.subject_id,
                label.as_str().green()
            );
            Ok(())
        }
        Command::InitConfig { path } => {
            save_config(&Config::default(), &path)?;
            println!("Wrote default config to {}", path.display());
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    init_tracing("info");

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
