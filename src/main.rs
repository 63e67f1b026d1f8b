use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{ArgGroup, Parser, Subcommand};

use attendance_ledger::aggregator::FineAggregator;
use attendance_ledger::config::AppConfig;
use attendance_ledger::fine::format_percentage;
use attendance_ledger::models::{ClassOutcome, Subject};
use attendance_ledger::stats::{compute_stats, summarize};
use attendance_ledger::store::{find_subject, Store, SubjectEdit};
use attendance_ledger::{logging, report};

#[derive(Parser)]
#[command(name = "attendance-ledger")]
#[command(about = "Per-subject attendance tracking with shortfall fines", long_about = None)]
struct Cli {
    /// Directory holding subjects.csv and attendance.csv
    #[arg(long, global = true, default_value = "attendance-data")]
    data_dir: PathBuf,
    /// Fine per percentage point below target (overrides ATTENDANCE_FINE_RATE)
    #[arg(long, global = true, allow_negative_numbers = true)]
    fine_rate: Option<i64>,
    /// Leave fines out of the output
    #[arg(long, global = true)]
    hide_fines: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the demo roster
    Seed,
    /// Add a subject to the roster
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        code: String,
        #[arg(long)]
        instructor: Option<String>,
        #[arg(long, default_value_t = 75, value_parser = clap::value_parser!(u32).range(50..=100))]
        target: u32,
        /// Classes held so far
        #[arg(long, default_value_t = 0)]
        total: u32,
        /// Classes attended so far
        #[arg(long, default_value_t = 0)]
        attended: u32,
    },
    /// Change fields of an existing subject
    Edit {
        /// Subject id or course code
        #[arg(long)]
        subject: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        instructor: Option<String>,
        #[arg(long, value_parser = clap::value_parser!(u32).range(50..=100))]
        target: Option<u32>,
        #[arg(long)]
        total: Option<u32>,
        #[arg(long)]
        attended: Option<u32>,
    },
    /// Remove a subject and its attendance log
    Delete {
        /// Subject id or course code
        #[arg(long)]
        subject: String,
    },
    /// Record one class for a subject
    #[command(group(
        ArgGroup::new("outcome")
            .args(["absent", "cancelled"])
            .multiple(false)
    ))]
    Mark {
        /// Subject id or course code
        #[arg(long)]
        subject: String,
        #[arg(long)]
        absent: bool,
        #[arg(long)]
        cancelled: bool,
        /// Class date, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Show the attendance log for a subject
    History {
        #[arg(long)]
        subject: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show per-subject attendance stats
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Show fines for subjects below target
    Fines {
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "attendance-report.md")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env().context("failed to read configuration")?;
    logging::init_tracing(&config.log_level);

    let store = Store::open(&cli.data_dir)?;
    let mut fines = FineAggregator::new(config.fines);
    if cli.hide_fines {
        fines.set_show_fines(false);
    }

    match cli.command {
        Commands::Seed => {
            let inserted = store.seed()?;
            println!("Seeded {inserted} subjects into {}.", cli.data_dir.display());
        }
        Commands::Add {
            name,
            code,
            instructor,
            target,
            total,
            attended,
        } => {
            let mut subject = Subject::new(&name, &code, target).with_counts(attended, total);
            subject.instructor = instructor;
            let subject = store.add_subject(subject)?;
            println!("Added {} ({}) with id {}.", subject.name, subject.code, subject.id);
        }
        Commands::Edit {
            subject,
            name,
            code,
            instructor,
            target,
            total,
            attended,
        } => {
            let edit = SubjectEdit {
                name,
                code,
                instructor,
                target_attendance: target,
                attended_classes: attended,
                total_classes: total,
            };
            let updated = store.update_subject(&subject, edit)?;
            let stats = compute_stats(&updated);
            println!(
                "Updated {} ({}): {} against a {}% target, {}.",
                updated.name,
                updated.code,
                format_percentage(stats.current_percentage),
                stats.target_percentage,
                stats.status
            );
        }
        Commands::Delete { subject } => {
            let (removed, dropped) = store.delete_subject(&subject)?;
            println!(
                "Deleted {} ({}) and {dropped} attendance records.",
                removed.name, removed.code
            );
        }
        Commands::Mark {
            subject,
            absent,
            cancelled,
            date,
            note,
        } => {
            let outcome = if cancelled {
                ClassOutcome::Cancelled
            } else if absent {
                ClassOutcome::Absent
            } else {
                ClassOutcome::Present
            };
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let updated = store.record_attendance(&subject, outcome, date, note)?;
            let stats = compute_stats(&updated);
            println!(
                "{} is now at {} ({} of {} classes, {}).",
                updated.name,
                format_percentage(stats.current_percentage),
                updated.attended_classes,
                updated.total_classes,
                stats.status
            );
        }
        Commands::History { subject, limit } => {
            let subjects = store.load_subjects()?;
            let subject = &subjects[find_subject(&subjects, &subject)?];
            let records = store.history(&subject.id)?;

            if records.is_empty() {
                println!("No attendance recorded for {}.", subject.name);
                return Ok(());
            }

            println!("Attendance log for {} ({}):", subject.name, subject.code);
            for record in records.iter().take(limit) {
                let label = if record.class_cancelled {
                    "cancelled"
                } else if record.attended {
                    "present"
                } else {
                    "absent"
                };
                match &record.notes {
                    Some(note) => println!("- {} {label}: {note}", record.date),
                    None => println!("- {} {label}", record.date),
                }
            }
        }
        Commands::Stats { json } => {
            let subjects = store.load_subjects()?;
            if json {
                let stats: Vec<_> = subjects
                    .iter()
                    .map(|subject| {
                        serde_json::json!({
                            "id": subject.id,
                            "code": subject.code,
                            "stats": compute_stats(subject),
                        })
                    })
                    .collect();
                let payload = serde_json::json!({ "summary": summarize(&subjects), "subjects": stats });
                println!("{}", serde_json::to_string_pretty(&payload)?);
                return Ok(());
            }

            if subjects.is_empty() {
                println!("No subjects tracked yet.");
                return Ok(());
            }

            let summary = summarize(&subjects);
            println!(
                "Overall {} ({} of {} classes), {} subjects need attention.",
                format_percentage(summary.overall_percentage),
                summary.total_attended,
                summary.total_classes,
                summary.needing_attention
            );
            for subject in &subjects {
                let stats = compute_stats(subject);
                println!(
                    "- {} ({}) {} vs {}% target, {}: need {} more, can miss {}",
                    subject.name,
                    subject.code,
                    format_percentage(stats.current_percentage),
                    stats.target_percentage,
                    stats.status,
                    stats.classes_needed,
                    stats.can_miss_classes
                );
            }
        }
        Commands::Fines { json } => {
            let subjects = store.load_subjects()?;
            if let Some(rate) = cli.fine_rate {
                fines.set_fine_rate(rate, &subjects)?;
            } else {
                fines.recalculate(&subjects);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&report::fines_json(&fines))?);
            } else {
                print!("{}", report::render_fines(&subjects, &fines));
            }
        }
        Commands::Report { out } => {
            let subjects = store.load_subjects()?;
            if let Some(rate) = cli.fine_rate {
                fines.set_fine_rate(rate, &subjects)?;
            } else {
                fines.recalculate(&subjects);
            }
            let report = report::build_report(Utc::now().date_naive(), &subjects, &fines);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
