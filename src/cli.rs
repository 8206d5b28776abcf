use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dosekeeper", version, about = "Medicine reminders on a recurring schedule")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as human-readable text instead of JSON
    #[arg(long = "human", short = 'H', global = true)]
    pub human: bool,

    /// Act as this user instead of the configured one
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default config and create the database
    Init,

    /// Manage medicines and their schedules
    Med {
        #[command(subcommand)]
        action: MedAction,
    },

    /// Inspect and act on scheduled doses
    Dose {
        #[command(subcommand)]
        action: DoseCommand,
    },

    /// Manage where reminders are delivered
    Target {
        #[command(subcommand)]
        action: TargetAction,
    },

    /// Send reminders for doses that are due now (run this every minute)
    Poll,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print a shell completion script
    Completions { shell: clap_complete::Shell },
}

#[derive(Subcommand)]
pub enum MedAction {
    /// Add a medicine and generate its dose schedule
    Add {
        name: String,

        /// Free-text dosage, e.g. "500mg" or "2 drops"
        #[arg(long)]
        dosage: Option<String>,

        /// daily | weekdays:mon,wed,fri | every:N
        #[arg(long, default_value = "daily")]
        freq: String,

        /// Comma-separated HH:MM slots
        #[arg(long)]
        times: String,

        /// Doses on hand; the schedule never exceeds this
        #[arg(long)]
        quantity: u32,

        /// First dosing day (default: today)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Track doses without sending reminders
        #[arg(long)]
        no_reminders: bool,
    },

    /// Change a medicine and regenerate its upcoming doses
    Edit {
        /// Medicine id or name
        medicine: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        dosage: Option<String>,
        #[arg(long)]
        freq: Option<String>,
        #[arg(long)]
        times: Option<String>,
        /// Doses on hand from now on
        #[arg(long)]
        quantity: Option<u32>,
        #[arg(long)]
        start: Option<NaiveDate>,
        /// true or false
        #[arg(long)]
        reminders: Option<bool>,
    },

    /// List medicines
    List {
        /// Include stopped medicines
        #[arg(long)]
        all: bool,
    },

    /// Show one medicine
    Show {
        /// Medicine id or name
        medicine: String,
    },

    /// Stop a medicine, keeping its history
    Stop {
        /// Medicine id or name
        medicine: String,
    },

    /// Delete a medicine and all of its doses
    Remove {
        /// Medicine id or name
        medicine: String,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum DoseCommand {
    /// List dose events
    List {
        /// Only this medicine (id or name)
        #[arg(long)]
        medicine: Option<String>,
        /// pending | sent | taken | missed
        #[arg(long)]
        status: Option<String>,
        /// Only doses on this day
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Mark a dose taken
    Take { id: String },
    /// Mark a dose missed
    Miss { id: String },
    /// Push a dose's reminder back
    Snooze {
        id: String,
        /// Minutes to wait (default from config)
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// Mark long-overdue open doses as missed
    Sweep {
        /// Grace period in minutes (default from config)
        #[arg(long)]
        grace: Option<u32>,
    },
}

#[derive(Subcommand)]
pub enum TargetAction {
    /// Register the delivery token for the current user
    Set { token: String },
    /// Show the delivery token for the current user
    Show,
    /// Remove the delivery token for the current user
    Clear,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set a config value
    Set {
        /// Config key (e.g. user, reminders.lookback_secs, notifier.url)
        key: String,
        /// Config value
        value: String,
    },
}
