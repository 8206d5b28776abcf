use anyhow::Result;
use chrono::NaiveDateTime;
use rusqlite::{OptionalExtension, params};
use serde::Serialize;

use crate::models::dose::DoseEvent;
use crate::models::medicine::{Frequency, Medicine, format_time_slots, parse_time_slots};

use super::{Database, doses, fmt_date, fmt_ts, parse_date, parse_ts};

struct MedicineRow {
    id: String,
    user_id: String,
    name: String,
    dosage: Option<String>,
    total_quantity: u32,
    frequency: String,
    start_date: String,
    time_slots: String,
    reminders_enabled: bool,
    active: bool,
    created_at: String,
    stopped_at: Option<String>,
}

fn row_to_medicine(r: MedicineRow) -> Result<Medicine> {
    let frequency: Frequency = r.frequency.parse()?;
    let time_slots = parse_time_slots(&r.time_slots)?;
    let stopped_at = match r.stopped_at {
        Some(ref s) => Some(parse_ts(s)?),
        None => None,
    };

    Ok(Medicine {
        id: r.id,
        user_id: r.user_id,
        name: r.name,
        dosage: r.dosage,
        total_quantity: r.total_quantity,
        frequency,
        start_date: parse_date(&r.start_date)?,
        time_slots,
        reminders_enabled: r.reminders_enabled,
        active: r.active,
        created_at: parse_ts(&r.created_at)?,
        stopped_at,
    })
}

const SELECT_COLS: &str = "id, user_id, name, dosage, total_quantity, frequency, start_date, time_slots, reminders_enabled, active, created_at, stopped_at";

macro_rules! map_row {
    ($row:expr) => {
        Ok(MedicineRow {
            id: $row.get(0)?,
            user_id: $row.get(1)?,
            name: $row.get(2)?,
            dosage: $row.get(3)?,
            total_quantity: $row.get(4)?,
            frequency: $row.get(5)?,
            start_date: $row.get(6)?,
            time_slots: $row.get(7)?,
            reminders_enabled: $row.get(8)?,
            active: $row.get(9)?,
            created_at: $row.get(10)?,
            stopped_at: $row.get(11)?,
        })
    };
}

/// What an edit did to a medicine's schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduleReplacement {
    pub removed: usize,
    pub inserted: usize,
}

impl Database {
    pub fn insert_medicine(&self, med: &Medicine) -> Result<()> {
        self.conn.execute(
            "INSERT INTO medicines (id, user_id, name, dosage, total_quantity, frequency, start_date, time_slots, reminders_enabled, active, created_at, stopped_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                med.id,
                med.user_id,
                med.name,
                med.dosage,
                med.total_quantity,
                med.frequency.to_string(),
                fmt_date(med.start_date),
                format_time_slots(&med.time_slots),
                med.reminders_enabled as i32,
                med.active as i32,
                fmt_ts(med.created_at),
                med.stopped_at.map(fmt_ts),
            ],
        )?;
        Ok(())
    }

    /// Insert a medicine together with its generated schedule, all or nothing.
    pub fn insert_medicine_with_schedule(&self, med: &Medicine, events: &[DoseEvent]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        self.insert_medicine(med)?;
        doses::insert_events(&tx, events)?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_medicine(&self, id: &str) -> Result<Option<Medicine>> {
        let sql = format!("SELECT {SELECT_COLS} FROM medicines WHERE id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![id], |row| map_row!(row))
            .optional()?;
        row.map(row_to_medicine).transpose()
    }

    /// Look a medicine up by id, or by name among the user's active medicines.
    pub fn find_medicine(&self, user_id: &str, key: &str) -> Result<Option<Medicine>> {
        if let Some(m) = self.get_medicine(key)?
            && m.user_id == user_id
        {
            return Ok(Some(m));
        }
        let sql = format!(
            "SELECT {SELECT_COLS} FROM medicines WHERE user_id = ?1 AND name = ?2 ORDER BY active DESC, created_at DESC LIMIT 1"
        );
        let row = self
            .conn
            .query_row(&sql, params![user_id, key], |row| map_row!(row))
            .optional()?;
        row.map(row_to_medicine).transpose()
    }

    pub fn list_medicines(&self, user_id: &str, include_stopped: bool) -> Result<Vec<Medicine>> {
        let sql = if include_stopped {
            format!("SELECT {SELECT_COLS} FROM medicines WHERE user_id = ?1 ORDER BY name ASC")
        } else {
            format!(
                "SELECT {SELECT_COLS} FROM medicines WHERE user_id = ?1 AND active = 1 ORDER BY name ASC"
            )
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], |row| map_row!(row))?;

        let mut meds = Vec::new();
        for row in rows {
            meds.push(row_to_medicine(row?)?);
        }
        Ok(meds)
    }

    /// Replace a medicine definition and its future open doses in one
    /// transaction.
    ///
    /// Pending and sent doses whose original slot is at or after `not_before`
    /// are dropped; history and earlier open doses stay, snoozed ones included. `fresh` events whose slot is
    /// already occupied by a kept dose are skipped.
    pub fn replace_medicine_schedule(
        &self,
        med: &Medicine,
        not_before: NaiveDateTime,
        fresh: &[DoseEvent],
    ) -> Result<ScheduleReplacement> {
        let tx = self.conn.unchecked_transaction()?;
        let updated = tx.execute(
            "UPDATE medicines SET name = ?2, dosage = ?3, total_quantity = ?4, frequency = ?5,
                 start_date = ?6, time_slots = ?7, reminders_enabled = ?8
             WHERE id = ?1",
            params![
                med.id,
                med.name,
                med.dosage,
                med.total_quantity,
                med.frequency.to_string(),
                fmt_date(med.start_date),
                format_time_slots(&med.time_slots),
                med.reminders_enabled as i32,
            ],
        )?;
        if updated == 0 {
            anyhow::bail!("medicine {} vanished during edit", med.id);
        }
        let removed = doses::delete_open_slots_from(&tx, &med.id, not_before)?;
        let inserted = doses::insert_events_skipping_taken_slots(&tx, fresh)?;
        tx.commit()?;
        Ok(ScheduleReplacement { removed, inserted })
    }

    /// Deactivate a medicine and drop its future open doses. History stays.
    pub fn stop_medicine(&self, id: &str, stopped_at: NaiveDateTime) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let count = tx.execute(
            "UPDATE medicines SET active = 0, stopped_at = ?1 WHERE id = ?2 AND active = 1",
            params![fmt_ts(stopped_at), id],
        )?;
        if count > 0 {
            doses::delete_open_from(&tx, id, stopped_at)?;
        }
        tx.commit()?;
        Ok(count > 0)
    }

    /// Hard delete; dose events go with it.
    pub fn remove_medicine(&self, id: &str) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM medicines WHERE id = ?1", params![id])?;
        Ok(count > 0)
    }
}
