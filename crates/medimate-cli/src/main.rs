//! MediMate command-line front end.
//!
//! One-shot commands manage the medicine list; `watch` runs the alarm task.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use medimate_core::config::{self, DayPolicy, EngineConfig};
use medimate_core::{
    AlarmEngine, AlarmPlayer, DoseTime, MedicineInput, MedicineRecord, MedicineStore, ScheduleEntry,
    SilentPlayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod watch;

#[derive(Debug, Parser)]
#[command(name = "medimate", version, about = "Medicine schedules and dose alarms")]
struct Cli {
    /// Medicine data file
    #[arg(long, global = true, env = "MEDIMATE_DATA", default_value = config::DEFAULT_DATA_FILE)]
    data: PathBuf,

    /// Keep doses marked taken across days instead of resetting at midnight
    #[arg(long, global = true)]
    keep_taken: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add a medicine
    Add(MedicineArgs),
    /// Replace a medicine's details
    Edit {
        id: u64,
        #[command(flatten)]
        fields: MedicineArgs,
    },
    /// Delete a medicine
    Delete { id: u64 },
    /// List medicines
    List {
        /// Only show names containing this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Show today's schedule
    Schedule,
    /// List medicines running low
    LowStock,
    /// Dashboard totals
    Summary,
    /// Mark a dose as taken, e.g. `ack 08:00 "Paracetamol - 500mg"`
    Ack { time: DoseTime, medicine: String },
    /// Poll the clock and ring due doses until `quit`
    Watch {
        #[arg(long, default_value_t = config::DEFAULT_POLL_INTERVAL.as_secs())]
        interval_secs: u64,
    },
}

#[derive(Debug, Args)]
struct MedicineArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    dose: String,
    #[arg(long, default_value_t = 0)]
    stock: u32,
    #[arg(long, default_value = "tablet")]
    unit: String,
    /// Dose time (HH:MM); repeat for several doses a day
    #[arg(long = "time", required = true)]
    times: Vec<DoseTime>,
    #[arg(long)]
    notes: Option<String>,
}

impl From<MedicineArgs> for MedicineInput {
    fn from(args: MedicineArgs) -> Self {
        let mut input = MedicineInput::new(args.name, args.dose, args.stock, args.times);
        input.stock_unit = args.unit;
        input.notes = args.notes;
        input
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!(version = config::APP_VERSION, data = ?cli.data, "{} starting", config::APP_NAME);
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let mut store = MedicineStore::open(&cli.data);
    let engine_config = EngineConfig {
        day_policy: if cli.keep_taken {
            DayPolicy::KeepForever
        } else {
            DayPolicy::ResetDaily
        },
    };

    let player: Box<dyn AlarmPlayer> = match cli.command {
        Command::Watch { .. } => Box::new(watch::TerminalPlayer),
        _ => Box::new(SilentPlayer),
    };
    let mut engine = AlarmEngine::with_player(engine_config, player);
    engine.roll_over(&mut store, Local::now().date_naive());

    match cli.command {
        Command::Add(fields) => {
            let id = store
                .add(fields.into())
                .context("Failed to add medicine")?;
            println!("Added medicine #{}", id);
        }
        Command::Edit { id, fields } => {
            store
                .edit(id, fields.into())
                .with_context(|| format!("Failed to edit medicine #{}", id))?;
            println!("Updated medicine #{}", id);
        }
        Command::Delete { id } => {
            let removed = store
                .delete(id)
                .with_context(|| format!("Failed to delete medicine #{}", id))?;
            println!("Deleted {}", removed.display_name());
        }
        Command::List { search } => {
            let records: Vec<&MedicineRecord> = match search {
                Some(query) => store.search(&query),
                None => store.records().iter().collect(),
            };
            print_medicines(&records);
        }
        Command::Schedule => print_schedule(&store.schedule_with_status()),
        Command::LowStock => print_medicines(&store.low_stock()),
        Command::Summary => {
            let summary = store.summary();
            println!("Medicines:     {}", summary.total_medicines);
            println!("Doses today:   {}", summary.doses_today);
            println!("Doses taken:   {}", summary.doses_taken);
            println!("Low stock:     {}", summary.low_stock);
        }
        Command::Ack { time, medicine } => {
            let entry = ScheduleEntry::new(time, medicine);
            if engine.acknowledge(&mut store, &entry) {
                println!("Marked {} at {} as taken", entry.medicine, entry.time);
            } else {
                anyhow::bail!("No scheduled dose '{}' at {}", entry.medicine, entry.time);
            }
        }
        Command::Watch { interval_secs } => {
            watch::run(store, engine, Duration::from_secs(interval_secs.max(1)))?;
        }
    }

    Ok(())
}

fn print_medicines(records: &[&MedicineRecord]) {
    if records.is_empty() {
        println!("No medicines.");
        return;
    }
    for record in records {
        let times: Vec<String> = record.times.iter().map(|t| t.to_string()).collect();
        let flag = if record.is_low_stock() { "  (low stock)" } else { "" };
        println!(
            "#{:<3} {:<30} {:>4} {:<8} [{}]{}",
            record.id,
            record.display_name(),
            record.stock,
            record.stock_unit,
            times.join(", "),
            flag
        );
        if let Some(notes) = &record.notes {
            println!("     {}", notes);
        }
    }
}

fn print_schedule(schedule: &[ScheduleEntry]) {
    if schedule.is_empty() {
        println!("Nothing scheduled today.");
        return;
    }
    for entry in schedule {
        println!("{}  {:<30} {}", entry.time, entry.medicine, entry.status.label());
    }
}
