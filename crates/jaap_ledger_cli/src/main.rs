//! Command-line front end for the jaap ledger.
//!
//! # Responsibility
//! - Resolve configuration, start logging, and open one ledger session.
//! - Format snapshots and operation outcomes for the terminal.
//!
//! # Invariants
//! - All ledger rules live in `jaap_ledger_core`; this binary only prints.
//! - A missing or malformed calendar aborts startup.

use clap::{Args, Parser, Subcommand};
use jaap_ledger_core::db::open_db;
use jaap_ledger_core::{
    init_logging, init_stderr_logging, load_calendar, local_today, BackupSummary, EntryDate,
    EntryView, LedgerConfig, LedgerEntry, LedgerSession, LedgerSnapshot, LedgerStore,
    PersistenceGateway, RestoreOutcome, SqliteLedgerStore, UpdateOutcome,
};
use log::error;
use std::error::Error;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "jaap-ledger", version, about = "Personal daily jaap ledger")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// SQLite database file (overrides JAAP_LEDGER_DB_PATH).
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Poornima calendar JSON (overrides JAAP_LEDGER_CALENDAR_PATH).
    #[arg(long, global = true)]
    calendar: Option<PathBuf>,
    /// Absolute directory for rolling log files; stderr when unset.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Treat this date as today instead of the local date.
    #[arg(long, global = true, value_parser = parse_date)]
    today: Option<EntryDate>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print totals, milestone progress and the ledger list.
    Show {
        /// Emit the snapshot as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Record the count and notes for an editable date.
    ///
    /// A field left off the command line keeps its stored value.
    Update {
        #[arg(value_parser = parse_date)]
        date: EntryDate,
        #[arg(long, conflicts_with = "clear_count")]
        count: Option<u64>,
        /// Remove the recorded count for the date.
        #[arg(long)]
        clear_count: bool,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Replace the ledger with the latest automatic backup.
    Restore {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Print the core version.
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_exit module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let command = match cli.command {
        Command::Version => {
            print_version();
            return Ok(());
        }
        command => command,
    };

    let config = resolve_config(&cli.global);
    config.validate()?;
    start_logging(&config);

    let calendar = load_calendar(&config.calendar_path)?;
    let conn = open_db(&config.db_path)?;
    let store = SqliteLedgerStore::try_new(&conn)?;
    let today = cli.global.today.unwrap_or_else(local_today);
    let mut session = LedgerSession::start(PersistenceGateway::new(store), calendar, today);
    execute(&mut session, command)
}

fn execute<S: LedgerStore>(
    session: &mut LedgerSession<S>,
    command: Command,
) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Show { json } => {
            let snapshot = session.snapshot();
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_snapshot(&snapshot);
            }
        }
        Command::Update {
            date,
            count,
            clear_count,
            notes,
        } => {
            let (count, notes) =
                merge_update(session.ledger().get(&date), count, clear_count, notes);
            match session.update_entry(&date, count, notes)? {
                UpdateOutcome::Saved(entry) => {
                    println!("Saved {}: {}", entry.date, format_count(entry.count));
                    print_summary(&session.snapshot());
                }
                UpdateOutcome::Rejected => {
                    println!("Entry {date} is locked (older than 7 days or in the future).");
                }
            }
        }
        Command::Restore { yes } => {
            match session.restore_from_backup(|summary| yes || confirm_restore(summary))? {
                RestoreOutcome::NoBackup => println!("No backup found to restore."),
                RestoreOutcome::Declined => println!("Restore cancelled."),
                RestoreOutcome::Restored { entry_count } => {
                    println!("Ledger restored from backup ({entry_count} entries).")
                }
            }
        }
        Command::Version => print_version(),
    }
    Ok(())
}

fn print_version() {
    println!("jaap_ledger_core version={}", jaap_ledger_core::core_version());
}

fn resolve_config(args: &GlobalArgs) -> LedgerConfig {
    let mut config = LedgerConfig::from_env();
    if let Some(db) = &args.db {
        config.db_path = db.clone();
    }
    if let Some(calendar) = &args.calendar {
        config.calendar_path = calendar.clone();
    }
    if let Some(log_dir) = &args.log_dir {
        config.log_dir = Some(log_dir.clone());
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    config
}

fn start_logging(config: &LedgerConfig) {
    let result = match &config.log_dir {
        Some(dir) => init_logging(&config.log_level, &dir.to_string_lossy()),
        None => init_stderr_logging(&config.log_level),
    };
    if let Err(err) = result {
        eprintln!("warning: logging disabled: {err}");
    }
}

/// Fills fields missing from the command line with the stored entry values.
fn merge_update(
    existing: Option<&LedgerEntry>,
    count: Option<u64>,
    clear_count: bool,
    notes: Option<String>,
) -> (Option<u64>, String) {
    let count = match (count, clear_count) {
        (Some(count), _) => Some(count),
        (None, true) => None,
        (None, false) => existing.and_then(|entry| entry.count),
    };
    let notes = notes
        .or_else(|| existing.map(|entry| entry.notes.clone()))
        .unwrap_or_default();
    (count, notes)
}

fn parse_date(raw: &str) -> Result<EntryDate, String> {
    EntryDate::parse(raw).map_err(|err| err.to_string())
}

fn confirm_restore(summary: &BackupSummary) -> bool {
    let backed_up_at = summary
        .backed_up_at
        .map(|at| at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    print!(
        "Restore ledger from backup?\n  Backup date: {backed_up_at}\n  Entries: {}\nThis will replace current ledger data. [y/N] ",
        summary.entry_count
    );
    if std::io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    match std::io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

fn print_snapshot(snapshot: &LedgerSnapshot) {
    let moon = if snapshot.today_is_poornima {
        " (Poornima)"
    } else {
        ""
    };
    println!(
        "Today {}{moon}: {}",
        snapshot.today.date,
        format_count(snapshot.today.count)
    );
    print_summary(snapshot);
    println!();
    for row in &snapshot.rows {
        print_row(row);
    }
}

fn print_summary(snapshot: &LedgerSnapshot) {
    let summary = &snapshot.summary;
    println!("Total jaap: {}", summary.total);
    println!(
        "Next milestone: {} crore ({}%)",
        summary.progress.completed + 1,
        summary.progress.percent
    );
    for (year, total) in summary.yearly_totals.iter().rev() {
        println!("  {year}: {total}");
    }
}

fn print_row(row: &EntryView) {
    let mut markers = Vec::new();
    if let Some(crore) = row.milestone {
        markers.push(format!("{crore} crore completed"));
    }
    if row.poornima {
        markers.push("poornima".to_string());
    }
    if row.sunday {
        markers.push("sunday".to_string());
    }
    if !row.editable {
        markers.push("locked".to_string());
    }
    let markers = if markers.is_empty() {
        String::new()
    } else {
        format!(" [{}]", markers.join(", "))
    };
    println!("{} {:>12}{markers}", row.date, format_count(row.count));
    if !row.notes.is_empty() {
        println!("    {}", row.notes.replace('\n', "\n    "));
    }
}

fn format_count(count: Option<u64>) -> String {
    count.map_or_else(|| "—".to_string(), |value| value.to_string())
}
