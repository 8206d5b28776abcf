use anyhow::Result;
use chrono::NaiveDate;
use serde_json::json;
use std::io::{self, Write};

use dosekeeper::core::clock::SystemClock;
use dosekeeper::core::medicine::{self, AddMedicineParams, EditMedicineParams};
use dosekeeper::output;
use dosekeeper::output::human;

use super::{Session, print_json};

pub struct AddArgs<'a> {
    pub name: &'a str,
    pub dosage: Option<&'a str>,
    pub freq: &'a str,
    pub times: &'a str,
    pub quantity: u32,
    pub start: Option<NaiveDate>,
    pub reminders: bool,
}

pub fn run_add(user: Option<&str>, args: AddArgs<'_>, human: bool) -> Result<()> {
    let s = Session::open(user)?;
    let params = AddMedicineParams {
        user_id: &s.user_id,
        name: args.name,
        dosage: args.dosage,
        freq: args.freq,
        times: args.times,
        quantity: args.quantity,
        start: args.start,
        reminders: args.reminders,
    };
    let (med, events) = medicine::add_medicine(&s.db, &SystemClock, params)?;

    if human {
        println!("{}", human::format_medicine_added(&med, events.len()));
    } else {
        let first = events.first().map(|e| e.scheduled_at);
        let last = events.last().map(|e| e.scheduled_at);
        print_json(&output::success(
            "med_add",
            json!({
                "medicine": med,
                "scheduled": events.len(),
                "first_dose": first,
                "last_dose": last,
            }),
        ))?;
    }
    Ok(())
}

pub fn run_edit(
    user: Option<&str>,
    key: &str,
    params: EditMedicineParams<'_>,
    human: bool,
) -> Result<()> {
    let s = Session::open(user)?;
    let (med, replaced) = medicine::edit_medicine(&s.db, &SystemClock, &s.user_id, key, params)?;

    if human {
        println!("{}", human::format_medicine_edited(&med, &replaced));
    } else {
        print_json(&output::success(
            "med_edit",
            json!({ "medicine": med, "schedule": replaced }),
        ))?;
    }
    Ok(())
}

pub fn run_list(user: Option<&str>, all: bool, human: bool) -> Result<()> {
    let s = Session::open(user)?;
    let meds = medicine::list_medicines(&s.db, &s.user_id, all)?;

    if human {
        println!("{}", human::format_medicine_table(&meds));
    } else {
        print_json(&output::success(
            "med_list",
            json!({ "medicines": meds, "count": meds.len() }),
        ))?;
    }
    Ok(())
}

pub fn run_show(user: Option<&str>, key: &str, human: bool) -> Result<()> {
    let s = Session::open(user)?;
    let med = medicine::show_medicine(&s.db, &s.user_id, key)?;

    if human {
        println!("{}", human::format_medicine(&med));
    } else {
        print_json(&output::success("med_show", json!({ "medicine": med })))?;
    }
    Ok(())
}

pub fn run_stop(user: Option<&str>, key: &str, human: bool) -> Result<()> {
    let s = Session::open(user)?;
    let med = medicine::stop_medicine(&s.db, &SystemClock, &s.user_id, key)?;

    if human {
        println!("Stopped {}", med.name);
    } else {
        print_json(&output::success("med_stop", json!({ "medicine": med })))?;
    }
    Ok(())
}

pub fn run_remove(user: Option<&str>, key: &str, yes: bool, human: bool) -> Result<()> {
    let s = Session::open(user)?;
    let med = medicine::show_medicine(&s.db, &s.user_id, key)?;

    if !yes && !confirm(&format!("Delete {} and all of its dose history?", med.name))? {
        if human {
            println!("Cancelled.");
        } else {
            print_json(&output::success(
                "med_remove",
                json!({ "removed": false, "id": med.id }),
            ))?;
        }
        return Ok(());
    }

    medicine::remove_medicine(&s.db, &s.user_id, &med.id)?;
    if human {
        println!("Removed {}", med.name);
    } else {
        print_json(&output::success(
            "med_remove",
            json!({ "removed": true, "id": med.id, "name": med.name }),
        ))?;
    }
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N]: ");
    io::stdout().flush()?;
    let mut buf = String::new();
    io::stdin().read_line(&mut buf)?;
    Ok(matches!(buf.trim(), "y" | "Y" | "yes"))
}
