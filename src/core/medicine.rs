use chrono::NaiveDate;
use tracing::info;

use crate::core::clock::Clock;
use crate::core::schedule;
use crate::db::{Database, ScheduleReplacement};
use crate::error::{Error, Result};
use crate::models::dose::DoseEvent;
use crate::models::medicine::{Frequency, Medicine, parse_time_slots};

// ---------------------------------------------------------------------------
// AddMedicineParams
// ---------------------------------------------------------------------------

/// Parameters for adding a new medicine.
pub struct AddMedicineParams<'a> {
    pub user_id: &'a str,
    pub name: &'a str,
    pub dosage: Option<&'a str>,
    pub freq: &'a str,
    pub times: &'a str,
    pub quantity: u32,
    pub start: Option<NaiveDate>,
    pub reminders: bool,
}

/// Changes to an existing medicine. `None` keeps the current value.
#[derive(Default)]
pub struct EditMedicineParams<'a> {
    pub name: Option<&'a str>,
    pub dosage: Option<&'a str>,
    pub freq: Option<&'a str>,
    pub times: Option<&'a str>,
    pub quantity: Option<u32>,
    pub start: Option<NaiveDate>,
    pub reminders: Option<bool>,
}

fn is_unique_violation(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn lookup(db: &Database, user_id: &str, key: &str) -> Result<Medicine> {
    db.find_medicine(user_id, key)?
        .ok_or_else(|| Error::not_found("medicine", key))
}

// ---------------------------------------------------------------------------
// add_medicine
// ---------------------------------------------------------------------------

/// Validate a new medicine, generate its schedule and store both atomically.
pub fn add_medicine(
    db: &Database,
    clock: &dyn Clock,
    params: AddMedicineParams<'_>,
) -> Result<(Medicine, Vec<DoseEvent>)> {
    let frequency: Frequency = params.freq.parse()?;
    let slots = parse_time_slots(params.times)?;
    let start = params.start.unwrap_or_else(|| clock.now().date());

    let mut med = Medicine::new(
        params.user_id,
        params.name.trim(),
        frequency,
        start,
        slots,
        params.quantity,
    );
    med.dosage = params.dosage.map(str::to_string);
    med.reminders_enabled = params.reminders;
    med.created_at = clock.now();

    let events = schedule::plan(&med)?;

    if let Err(e) = db.insert_medicine_with_schedule(&med, &events) {
        if is_unique_violation(&e) {
            return Err(Error::validation(format!(
                "medicine '{}' is already active; stop it before adding it again",
                med.name
            )));
        }
        return Err(e.into());
    }

    info!(
        medicine = %med.id,
        name = %med.name,
        doses = events.len(),
        "medicine added"
    );
    Ok((med, events))
}

// ---------------------------------------------------------------------------
// edit_medicine
// ---------------------------------------------------------------------------

/// Replace a medicine and regenerate its schedule from now on.
///
/// Taken and missed doses, and open doses already in the past, are kept.
/// `quantity` is read as the doses available from this point forward.
pub fn edit_medicine(
    db: &Database,
    clock: &dyn Clock,
    user_id: &str,
    key: &str,
    params: EditMedicineParams<'_>,
) -> Result<(Medicine, ScheduleReplacement)> {
    let mut med = lookup(db, user_id, key)?;
    if !med.active {
        return Err(Error::validation(format!(
            "medicine '{}' is stopped and cannot be edited",
            med.name
        )));
    }

    if let Some(name) = params.name {
        med.name = name.trim().to_string();
    }
    if let Some(dosage) = params.dosage {
        med.dosage = if dosage.is_empty() {
            None
        } else {
            Some(dosage.to_string())
        };
    }
    if let Some(freq) = params.freq {
        med.frequency = freq.parse()?;
    }
    if let Some(times) = params.times {
        med.time_slots = parse_time_slots(times)?;
    }
    if let Some(q) = params.quantity {
        med.total_quantity = q;
    }
    if let Some(start) = params.start {
        med.start_date = start;
    }
    if let Some(r) = params.reminders {
        med.reminders_enabled = r;
    }

    let now = clock.now();
    let fresh = schedule::plan_from(&med, now)?;

    let replaced = match db.replace_medicine_schedule(&med, now, &fresh) {
        Ok(r) => r,
        Err(e) if is_unique_violation(&e) => {
            return Err(Error::validation(format!(
                "another active medicine is already named '{}'",
                med.name
            )));
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        medicine = %med.id,
        removed = replaced.removed,
        inserted = replaced.inserted,
        "medicine schedule replaced"
    );
    Ok((med, replaced))
}

// ---------------------------------------------------------------------------
// stop / remove / list
// ---------------------------------------------------------------------------

/// Soft-delete: deactivate and cancel future open doses, keeping history.
pub fn stop_medicine(db: &Database, clock: &dyn Clock, user_id: &str, key: &str) -> Result<Medicine> {
    let mut med = lookup(db, user_id, key)?;
    let now = clock.now();
    if !db.stop_medicine(&med.id, now)? {
        return Err(Error::validation(format!(
            "medicine '{}' is already stopped",
            med.name
        )));
    }
    med.active = false;
    med.stopped_at = Some(now);
    info!(medicine = %med.id, "medicine stopped");
    Ok(med)
}

/// Hard delete, cascading to every dose event of the medicine.
pub fn remove_medicine(db: &Database, user_id: &str, key: &str) -> Result<Medicine> {
    let med = lookup(db, user_id, key)?;
    if !db.remove_medicine(&med.id)? {
        return Err(Error::not_found("medicine", key));
    }
    info!(medicine = %med.id, "medicine removed");
    Ok(med)
}

pub fn list_medicines(db: &Database, user_id: &str, include_stopped: bool) -> Result<Vec<Medicine>> {
    Ok(db.list_medicines(user_id, include_stopped)?)
}

pub fn show_medicine(db: &Database, user_id: &str, key: &str) -> Result<Medicine> {
    lookup(db, user_id, key)
}
