mod cli;
mod cmd;

use clap::Parser;
use cli::{Cli, Commands, ConfigAction, DoseCommand, MedAction, TargetAction};
use std::process;
use tracing_subscriber::EnvFilter;

use dosekeeper::output;

fn command_name(c: &Commands) -> &'static str {
    match c {
        Commands::Init => "init",
        Commands::Med { action } => match action {
            MedAction::Add { .. } => "med_add",
            MedAction::Edit { .. } => "med_edit",
            MedAction::List { .. } => "med_list",
            MedAction::Show { .. } => "med_show",
            MedAction::Stop { .. } => "med_stop",
            MedAction::Remove { .. } => "med_remove",
        },
        Commands::Dose { action } => match action {
            DoseCommand::List { .. } => "dose_list",
            DoseCommand::Take { .. } => "dose_take",
            DoseCommand::Miss { .. } => "dose_miss",
            DoseCommand::Snooze { .. } => "dose_snooze",
            DoseCommand::Sweep { .. } => "dose_sweep",
        },
        Commands::Target { action } => match action {
            TargetAction::Set { .. } => "target_set",
            TargetAction::Show => "target_show",
            TargetAction::Clear => "target_clear",
        },
        Commands::Poll => "poll",
        Commands::Config { .. } => "config",
        Commands::Completions { .. } => "completions",
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "dosekeeper=debug"
    } else {
        "dosekeeper=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let name = command_name(&cli.command);
    let human = cli.human;
    let user = cli.user.as_deref();

    let result = match cli.command {
        Commands::Init => cmd::init::run(human),
        Commands::Med { action } => match action {
            MedAction::Add {
                name,
                dosage,
                freq,
                times,
                quantity,
                start,
                no_reminders,
            } => cmd::med::run_add(
                user,
                cmd::med::AddArgs {
                    name: &name,
                    dosage: dosage.as_deref(),
                    freq: &freq,
                    times: &times,
                    quantity,
                    start,
                    reminders: !no_reminders,
                },
                human,
            ),
            MedAction::Edit {
                medicine,
                name,
                dosage,
                freq,
                times,
                quantity,
                start,
                reminders,
            } => cmd::med::run_edit(
                user,
                &medicine,
                dosekeeper::core::medicine::EditMedicineParams {
                    name: name.as_deref(),
                    dosage: dosage.as_deref(),
                    freq: freq.as_deref(),
                    times: times.as_deref(),
                    quantity,
                    start,
                    reminders,
                },
                human,
            ),
            MedAction::List { all } => cmd::med::run_list(user, all, human),
            MedAction::Show { medicine } => cmd::med::run_show(user, &medicine, human),
            MedAction::Stop { medicine } => cmd::med::run_stop(user, &medicine, human),
            MedAction::Remove { medicine, yes } => cmd::med::run_remove(user, &medicine, yes, human),
        },
        Commands::Dose { action } => match action {
            DoseCommand::List {
                medicine,
                status,
                date,
                limit,
            } => cmd::dose::run_list(
                user,
                medicine.as_deref(),
                status.as_deref(),
                date,
                limit,
                human,
            ),
            DoseCommand::Take { id } => cmd::dose::run_action(user, &id, cmd::dose::Act::Take, human),
            DoseCommand::Miss { id } => cmd::dose::run_action(user, &id, cmd::dose::Act::Miss, human),
            DoseCommand::Snooze { id, minutes } => {
                cmd::dose::run_action(user, &id, cmd::dose::Act::Snooze(minutes), human)
            }
            DoseCommand::Sweep { grace } => cmd::dose::run_sweep(grace, human),
        },
        Commands::Target { action } => match action {
            TargetAction::Set { token } => cmd::target::run_set(user, &token, human),
            TargetAction::Show => cmd::target::run_show(user, human),
            TargetAction::Clear => cmd::target::run_clear(user, human),
        },
        Commands::Poll => cmd::poll::run(user, human),
        Commands::Config { action } => match action {
            ConfigAction::Show => cmd::config::run_show(human),
            ConfigAction::Set { key, value } => cmd::config::run_set(&key, &value),
        },
        Commands::Completions { shell } => cmd::completions::run(shell),
    };

    if let Err(e) = result {
        let err = output::from_error(name, &e);
        match serde_json::to_string(&err) {
            Ok(s) => eprintln!("{s}"),
            Err(_) => eprintln!("{e}"),
        }
        process::exit(1);
    }
}
