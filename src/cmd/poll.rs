use anyhow::Result;
use serde_json::json;

use dosekeeper::core::clock::SystemClock;
use dosekeeper::core::notify;
use dosekeeper::core::poller::{self, UserPollOutcome};
use dosekeeper::db::Database;
use dosekeeper::models::config::Config;
use dosekeeper::output;
use dosekeeper::output::human;

use super::print_json;

/// One poll pass. With `--user` only that user is scanned and a failure
/// is the command's failure; otherwise every user is scanned independently.
pub fn run(user: Option<&str>, human: bool) -> Result<()> {
    let config = Config::load()?;
    let db = Database::open_with_timeout(&Config::db_path(), config.busy_timeout())?;
    let notifier = notify::from_config(&config.notifier)?;
    let settings = config.poll_settings()?;

    let outcomes = match user {
        Some(user_id) => {
            let report =
                poller::scan_and_notify(&db, notifier.as_ref(), &SystemClock, user_id, &settings)?;
            vec![UserPollOutcome {
                user_id: user_id.to_string(),
                report: Some(report),
                error: None,
            }]
        }
        None => poller::poll_all(&db, notifier.as_ref(), &SystemClock, &settings)?,
    };

    if human {
        println!("{}", human::format_poll(&outcomes));
    } else {
        let sent: usize = outcomes
            .iter()
            .filter_map(|o| o.report.as_ref())
            .map(|r| r.sent)
            .sum();
        print_json(&output::success(
            "poll",
            json!({ "users": outcomes, "sent": sent }),
        ))?;
    }
    Ok(())
}
