use anyhow::Result;
use clap::{Parser, Subcommand};
use meldisp_core::snapshot::SnapshotStore;
use meldisp_core::{
    aggregate_tail, import_csv_file, render, DispatchError, Glossary, ImportResult, MelDocIndex,
    RuleTable,
};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the MEL action rule table
    #[arg(short, long, env = "MELDISP_RULES", default_value = "data/actions.json")]
    rules: PathBuf,

    /// Optional MEL document index (per-code category summary)
    #[arg(long, env = "MELDISP_MEL_INDEX")]
    mel_index: Option<PathBuf>,

    /// Optional capability-token glossary
    #[arg(long, env = "MELDISP_GLOSSARY")]
    glossary: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a work-order CSV and list impacted aircraft by severity
    Fleet { csv: PathBuf },
    /// Full dispatch checklist for one aircraft
    Tail { csv: PathBuf, registration: String },
    /// Fleet-wide handover summary
    Handover { csv: PathBuf },
}

fn import(cli: &Cli, csv: &PathBuf) -> Result<(ImportResult, Option<MelDocIndex>)> {
    let table = RuleTable::load_or_empty(&cli.rules);
    let index = cli.mel_index.as_deref().and_then(MelDocIndex::load);
    match import_csv_file(csv, &table, index.as_ref()) {
        Ok(result) => Ok((result, index)),
        Err(DispatchError::EmptyImport) => {
            println!("CSV is empty or not interpretable (no data rows).");
            std::process::exit(0);
        }
        Err(e) => Err(e.into()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );

    match &cli.command {
        Commands::Fleet { csv } => {
            let (result, _) = import(&cli, csv)?;
            let delta = SnapshotStore::new().compute_delta(&result.digest);
            println!(
                "Imported rows: {} | dispatch-relevant aircraft: {} | delta: {} ({})",
                result.report.imported_rows,
                result.report.tails.len(),
                delta.label(),
                delta.detail()
            );
            println!();
            for entry in &result.report.tails {
                let badge = if entry.score >= 4.0 {
                    "CRIT"
                } else if entry.score >= 2.0 {
                    "HOT"
                } else {
                    "    "
                };
                let tags: Vec<String> = entry
                    .tag_counts
                    .iter()
                    .map(|(tag, count)| {
                        if *count > 1 {
                            format!("{} x{}", tag, count)
                        } else {
                            tag.clone()
                        }
                    })
                    .collect();
                println!(
                    "[{}] {} | {} MEL | {}",
                    badge,
                    entry.tail,
                    entry.distinct_rules(),
                    tags.join(", ")
                );
            }
        }
        Commands::Tail { csv, registration } => {
            let (result, _) = import(&cli, csv)?;
            let glossary = cli.glossary.as_deref().and_then(Glossary::load);
            match result.report.tail(registration) {
                Some(entry) => {
                    let checklist = aggregate_tail(entry);
                    println!(
                        "{}",
                        render::tail_checklist_text(entry, &checklist, glossary.as_ref())
                    );
                }
                None => println!("No dispatch-relevant findings for {}.", registration),
            }
        }
        Commands::Handover { csv } => {
            let (result, _) = import(&cli, csv)?;
            // Read-only view; does not advance the stored snapshot.
            println!("{}", render::handover_text(&result.report, chrono::Local::now()));
        }
    }

    Ok(())
}
