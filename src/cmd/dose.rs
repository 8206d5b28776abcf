use anyhow::Result;
use chrono::{Duration, NaiveDate};
use serde_json::json;
use std::collections::HashMap;

use dosekeeper::core::clock::SystemClock;
use dosekeeper::core::dose;
use dosekeeper::db::DoseFilter;
use dosekeeper::error::Error;
use dosekeeper::models::dose::{DoseEvent, DoseStatus};
use dosekeeper::models::medicine::Medicine;
use dosekeeper::output;
use dosekeeper::output::human;

use super::{Session, print_json};

pub enum Act {
    Take,
    Miss,
    /// Minutes; `None` uses the configured default.
    Snooze(Option<u32>),
}

/// Load a dose and its medicine, hiding doses that belong to another user.
fn owned_dose(s: &Session, id: &str) -> Result<(DoseEvent, Medicine)> {
    let found = s.db.get_dose_event(id)?;
    let Some(event) = found else {
        return Err(Error::not_found("dose", id).into());
    };
    match s.db.get_medicine(&event.medicine_id)? {
        Some(med) if med.user_id == s.user_id => Ok((event, med)),
        _ => Err(Error::not_found("dose", id).into()),
    }
}

pub fn run_list(
    user: Option<&str>,
    medicine: Option<&str>,
    status: Option<&str>,
    date: Option<NaiveDate>,
    limit: Option<u32>,
    human: bool,
) -> Result<()> {
    let s = Session::open(user)?;

    let meds = s.db.list_medicines(&s.user_id, true)?;
    let medicine_id = match medicine {
        Some(key) => Some(
            s.db.find_medicine(&s.user_id, key)?
                .ok_or_else(|| Error::not_found("medicine", key))?
                .id,
        ),
        None => None,
    };
    let status = status.map(str::parse::<DoseStatus>).transpose()?;

    let (from, to) = match date {
        Some(d) => (d.and_hms_opt(0, 0, 0), d.and_hms_opt(23, 59, 59)),
        None => (None, None),
    };
    let filter = DoseFilter {
        user_id: Some(s.user_id.clone()),
        medicine_id,
        status,
        from,
        to,
        limit,
    };
    let doses = s.db.list_dose_events(&filter)?;

    if human {
        let names: HashMap<String, String> =
            meds.into_iter().map(|m| (m.id, m.name)).collect();
        println!("{}", human::format_dose_table(&doses, &names));
    } else {
        print_json(&output::success(
            "dose_list",
            json!({ "doses": doses, "count": doses.len() }),
        ))?;
    }
    Ok(())
}

pub fn run_action(user: Option<&str>, id: &str, act: Act, human: bool) -> Result<()> {
    let s = Session::open(user)?;
    let (_, med) = owned_dose(&s, id)?;

    let (command, updated) = match act {
        Act::Take => ("dose_take", dose::take(&s.db, &SystemClock, id)?),
        Act::Miss => ("dose_miss", dose::miss(&s.db, &SystemClock, id)?),
        Act::Snooze(minutes) => {
            let minutes = minutes.unwrap_or(s.config.reminders.snooze_minutes);
            ("dose_snooze", dose::snooze(&s.db, &SystemClock, id, minutes)?)
        }
    };

    if human {
        println!("{}", human::format_dose_change(&updated, &med.name));
    } else {
        print_json(&output::success(
            command,
            json!({ "dose": updated, "medicine": med.name }),
        ))?;
    }
    Ok(())
}

pub fn run_sweep(grace: Option<u32>, human: bool) -> Result<()> {
    let s = Session::open(None)?;
    let minutes = grace.unwrap_or(s.config.reminders.sweep_grace_minutes);
    let closed = dose::sweep_overdue(&s.db, &SystemClock, Duration::minutes(minutes as i64))?;

    if human {
        println!("Marked {} overdue dose(s) as missed", closed.len());
    } else {
        print_json(&output::success(
            "dose_sweep",
            json!({ "missed": closed, "count": closed.len() }),
        ))?;
    }
    Ok(())
}
