//! CLI binary for pillbox.

use anyhow::Context;
use clap::{Parser, Subcommand};
use pillbox::scheduler::StoreWatcher;
use pillbox::{MedicineDirectory, PillboxConfig, Reminder, ReminderInput, SchedulingEngine, TimeOfDay};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Pillbox: local medicine dose reminders.
#[derive(Parser)]
#[command(name = "pillbox", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reminder file, overriding the configured one.
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// List stored reminders.
    List {
        /// Only reminders for this medicine id.
        #[arg(short, long)]
        medicine: Option<u64>,
    },

    /// Add a reminder.
    Add {
        /// Medicine id.
        #[arg(short, long)]
        medicine: u64,

        /// Local time of day, HH:MM.
        #[arg(short, long)]
        time: TimeOfDay,

        /// Notification text instead of "Time to take ...".
        #[arg(short, long)]
        label: Option<String>,

        /// Weekdays to fire on, 0 = Sunday (e.g. 1,3,5). Every day if omitted.
        #[arg(short, long, value_delimiter = ',')]
        days: Vec<u8>,

        /// Store the reminder without arming it.
        #[arg(long)]
        disabled: bool,
    },

    /// Delete a reminder.
    Remove {
        /// Reminder id.
        id: String,
    },

    /// Arm a disabled reminder.
    Enable {
        /// Reminder id.
        id: String,
    },

    /// Stop a reminder from firing without deleting it.
    Disable {
        /// Reminder id.
        id: String,
    },

    /// Show the next fire time of every enabled reminder.
    Upcoming,

    /// Arm all reminders and deliver notifications until Ctrl+C.
    Run {
        /// JSON medicine list (`[{"id": 1, "medicineName": "..."}]`) for
        /// notification text.
        #[arg(long)]
        medicines: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pillbox=info")),
        )
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .unwrap_or_else(PillboxConfig::default_config_path);
    let mut config = PillboxConfig::load_or_default(&config_path)
        .with_context(|| format!("cannot load config {}", config_path.display()))?;
    if let Some(store) = cli.store {
        config.storage.reminders_file = Some(store);
    }

    let mut engine = SchedulingEngine::from_config(&config)?;

    match cli.command {
        Command::List { medicine } => {
            let reminders = match medicine {
                Some(id) => engine.list_by_medicine(id),
                None => engine.list_all(),
            };
            print_reminders(&reminders);
        }
        Command::Add {
            medicine,
            time,
            label,
            days,
            disabled,
        } => {
            let mut input = ReminderInput::new(medicine, time).with_enabled(!disabled);
            if let Some(label) = label {
                input = input.with_label(label);
            }
            if !days.is_empty() {
                input = input.with_days(days);
            }
            let reminder = engine.add(input)?;
            println!("{}", reminder.id);
        }
        Command::Remove { id } => {
            if !engine.remove(&id)? {
                println!("no reminder {id}");
            }
        }
        Command::Enable { id } => toggle(&mut engine, &id, true)?,
        Command::Disable { id } => toggle(&mut engine, &id, false)?,
        Command::Upcoming => {
            let doses = engine.upcoming();
            if doses.is_empty() {
                println!("no enabled reminders");
            }
            for dose in doses {
                println!(
                    "{}\tmedicine {}\t{}\t{}",
                    dose.fires_at.format("%a %Y-%m-%d %H:%M"),
                    dose.medicine_id,
                    dose.time,
                    dose.reminder_id
                );
            }
        }
        Command::Run { medicines } => run_host(engine, &config, medicines).await?,
    }

    Ok(())
}

fn toggle(engine: &mut SchedulingEngine, id: &str, enabled: bool) -> anyhow::Result<()> {
    if !engine.set_enabled(id, enabled)? {
        println!("no reminder {id}");
    }
    Ok(())
}

fn print_reminders(reminders: &[Reminder]) {
    if reminders.is_empty() {
        println!("no reminders");
        return;
    }
    for reminder in reminders {
        let days = match &reminder.days_of_week {
            Some(days) if !days.is_empty() => days
                .iter()
                .map(u8::to_string)
                .collect::<Vec<_>>()
                .join(","),
            _ => "daily".to_owned(),
        };
        println!(
            "{}\tmedicine {}\t{}\t{}\t{}\t{}",
            reminder.id,
            reminder.medicine_id,
            reminder.time,
            days,
            if reminder.enabled { "on" } else { "off" },
            reminder.label.as_deref().unwrap_or("")
        );
    }
}

async fn run_host(
    mut engine: SchedulingEngine,
    config: &PillboxConfig,
    medicines: Option<PathBuf>,
) -> anyhow::Result<()> {
    let medicines = match medicines {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read medicines {}", path.display()))?;
            Some(MedicineDirectory::from_json(&json)?)
        }
        None => None,
    };

    let armed = engine.init(medicines);
    println!("Pillbox v{}: {armed} reminders armed. Press Ctrl+C to stop.", env!("CARGO_PKG_VERSION"));

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down...");
            cancel_clone.cancel();
        }
    });

    let (tx, mut changes) = mpsc::channel(4);
    if let Some(interval) = config.scheduler.reload_poll() {
        let watcher = StoreWatcher::new(config.storage.reminders_path());
        tokio::spawn(watcher.run(interval, tx, cancel.child_token()));
    } else {
        drop(tx);
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            Some(()) = changes.recv() => {
                info!("reminder file changed, rescheduling");
                engine.reschedule_all(None);
            }
        }
    }

    info!("stopping, {} timers armed", engine.timers().len());
    Ok(())
}
