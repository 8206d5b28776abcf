use chrono::{Duration, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::core::calendar::is_dosing_day;
use crate::error::{Error, Result};
use crate::models::dose::DoseEvent;
use crate::models::medicine::Medicine;

/// Days ahead a single generation pass materializes.
pub const HORIZON_DAYS: i64 = 180;

/// All dose events for `medicine`, starting at its start date.
///
/// Events come out in ascending date-time order and never number more than
/// `total_quantity`. Inactive medicines and medicines with reminders off
/// produce nothing.
pub fn generate(medicine: &Medicine) -> Vec<DoseEvent> {
    generate_from(medicine, medicine.start_date.and_time(NaiveTime::MIN))
}

/// Like [`generate`], but only emits events at or after `not_before`.
///
/// The dosing-day phase stays anchored to the start date; the horizon is
/// counted from whichever of the start date and `not_before` is later, and
/// the quantity cap counts emitted events only.
pub fn generate_from(medicine: &Medicine, not_before: NaiveDateTime) -> Vec<DoseEvent> {
    let cap = medicine.total_quantity as usize;
    if cap == 0 || !medicine.active || !medicine.reminders_enabled {
        return Vec::new();
    }

    let slots = medicine.sorted_slots();
    let first_day = medicine.start_date.max(not_before.date());

    let mut events = Vec::with_capacity(cap.min(slots.len() * HORIZON_DAYS as usize));
    'days: for offset in 0..HORIZON_DAYS {
        let date = first_day + Duration::days(offset);
        if !is_dosing_day(date, medicine) {
            continue;
        }
        for slot in &slots {
            let at = date.and_time(*slot);
            if at < not_before {
                continue;
            }
            events.push(DoseEvent::new(medicine.id.clone(), at));
            if events.len() == cap {
                break 'days;
            }
        }
    }

    debug!(
        medicine = %medicine.id,
        count = events.len(),
        "generated dose events"
    );
    events
}

/// Validate `medicine` and generate its schedule.
///
/// A medicine that should remind but yields no events inside the horizon is
/// reported as [`Error::EmptySchedule`] instead of succeeding silently.
pub fn plan(medicine: &Medicine) -> Result<Vec<DoseEvent>> {
    plan_from(medicine, medicine.start_date.and_time(NaiveTime::MIN))
}

pub fn plan_from(medicine: &Medicine, not_before: NaiveDateTime) -> Result<Vec<DoseEvent>> {
    medicine.validate()?;
    let events = generate_from(medicine, not_before);
    if events.is_empty()
        && medicine.active
        && medicine.reminders_enabled
        && medicine.total_quantity > 0
    {
        return Err(Error::EmptySchedule {
            medicine: medicine.name.clone(),
        });
    }
    Ok(events)
}
