use anyhow::Result;
use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use crate::models::dose::{DoseEvent, DoseStatus};

use super::{Database, fmt_ts, parse_ts};

struct DoseRow {
    id: String,
    medicine_id: String,
    scheduled_at: String,
    original_scheduled_at: String,
    status: String,
    action_at: Option<String>,
    snooze_count: u32,
}

fn row_to_dose(r: DoseRow) -> Result<DoseEvent> {
    let action_at = match r.action_at {
        Some(ref s) => Some(parse_ts(s)?),
        None => None,
    };
    Ok(DoseEvent {
        id: r.id,
        medicine_id: r.medicine_id,
        scheduled_at: parse_ts(&r.scheduled_at)?,
        original_scheduled_at: parse_ts(&r.original_scheduled_at)?,
        status: r.status.parse()?,
        action_at,
        snooze_count: r.snooze_count,
    })
}

const SELECT_COLS: &str = "d.id, d.medicine_id, d.scheduled_at, d.original_scheduled_at, d.status, d.action_at, d.snooze_count";

macro_rules! map_row {
    ($row:expr) => {
        Ok(DoseRow {
            id: $row.get(0)?,
            medicine_id: $row.get(1)?,
            scheduled_at: $row.get(2)?,
            original_scheduled_at: $row.get(3)?,
            status: $row.get(4)?,
            action_at: $row.get(5)?,
            snooze_count: $row.get(6)?,
        })
    };
}

const INSERT_SQL: &str = "INSERT INTO dose_events (id, medicine_id, scheduled_at, original_scheduled_at, status, action_at, snooze_count)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

fn insert_with(conn: &Connection, sql: &str, events: &[DoseEvent]) -> Result<usize> {
    let mut stmt = conn.prepare(sql)?;
    let mut inserted = 0;
    for e in events {
        inserted += stmt.execute(params![
            e.id,
            e.medicine_id,
            fmt_ts(e.scheduled_at),
            fmt_ts(e.original_scheduled_at),
            e.status.to_string(),
            e.action_at.map(fmt_ts),
            e.snooze_count,
        ])?;
    }
    Ok(inserted)
}

/// Insert events; a second event for an occupied slot fails the batch.
pub(super) fn insert_events(conn: &Connection, events: &[DoseEvent]) -> Result<usize> {
    insert_with(conn, INSERT_SQL, events)
}

/// Insert events, silently skipping slots that already hold a dose.
pub(super) fn insert_events_skipping_taken_slots(
    conn: &Connection,
    events: &[DoseEvent],
) -> Result<usize> {
    let sql = INSERT_SQL.replacen("INSERT INTO", "INSERT OR IGNORE INTO", 1);
    insert_with(conn, &sql, events)
}

/// Delete pending/sent doses of a medicine scheduled at or after `from`.
pub(super) fn delete_open_from(
    conn: &Connection,
    medicine_id: &str,
    from: NaiveDateTime,
) -> Result<usize> {
    let n = conn.execute(
        "DELETE FROM dose_events
         WHERE medicine_id = ?1 AND status IN ('pending', 'sent') AND scheduled_at >= ?2",
        params![medicine_id, fmt_ts(from)],
    )?;
    Ok(n)
}

/// Delete pending/sent doses whose original slot is at or after `from`.
/// A snoozed dose from an earlier slot keeps its reminder.
pub(super) fn delete_open_slots_from(
    conn: &Connection,
    medicine_id: &str,
    from: NaiveDateTime,
) -> Result<usize> {
    let n = conn.execute(
        "DELETE FROM dose_events
         WHERE medicine_id = ?1 AND status IN ('pending', 'sent') AND original_scheduled_at >= ?2",
        params![medicine_id, fmt_ts(from)],
    )?;
    Ok(n)
}

/// Optional criteria for listing dose events. Empty matches everything.
#[derive(Debug, Default, Clone)]
pub struct DoseFilter {
    pub user_id: Option<String>,
    pub medicine_id: Option<String>,
    pub status: Option<DoseStatus>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
    pub limit: Option<u32>,
}

impl Database {
    /// Insert generated events in one transaction.
    pub fn create_dose_events(&self, events: &[DoseEvent]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let n = insert_events(&tx, events)?;
        tx.commit()?;
        Ok(n)
    }

    pub fn get_dose_event(&self, id: &str) -> Result<Option<DoseEvent>> {
        let sql = format!("SELECT {SELECT_COLS} FROM dose_events d WHERE d.id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![id], |row| map_row!(row))
            .optional()?;
        row.map(row_to_dose).transpose()
    }

    pub fn list_dose_events(&self, filter: &DoseFilter) -> Result<Vec<DoseEvent>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(ref u) = filter.user_id {
            clauses.push("m.user_id = ?");
            args.push(u.clone());
        }
        if let Some(ref mid) = filter.medicine_id {
            clauses.push("d.medicine_id = ?");
            args.push(mid.clone());
        }
        if let Some(s) = filter.status {
            clauses.push("d.status = ?");
            args.push(s.to_string());
        }
        if let Some(from) = filter.from {
            clauses.push("d.scheduled_at >= ?");
            args.push(fmt_ts(from));
        }
        if let Some(to) = filter.to {
            clauses.push("d.scheduled_at <= ?");
            args.push(fmt_ts(to));
        }

        let mut sql = format!(
            "SELECT {SELECT_COLS} FROM dose_events d JOIN medicines m ON m.id = d.medicine_id"
        );
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY d.scheduled_at ASC, d.id ASC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |row| map_row!(row))?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row_to_dose(row?)?);
        }
        Ok(events)
    }

    /// Pending doses of a user's active medicines scheduled inside
    /// `[window_start, window_end]`, oldest first.
    pub fn find_pending_due(
        &self,
        user_id: &str,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
    ) -> Result<Vec<DoseEvent>> {
        let sql = format!(
            "SELECT {SELECT_COLS} FROM dose_events d JOIN medicines m ON m.id = d.medicine_id
             WHERE m.user_id = ?1 AND m.active = 1 AND d.status = 'pending'
               AND d.scheduled_at >= ?2 AND d.scheduled_at <= ?3
             ORDER BY d.scheduled_at ASC, d.id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![user_id, fmt_ts(window_start), fmt_ts(window_end)],
            |row| map_row!(row),
        )?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row_to_dose(row?)?);
        }
        Ok(events)
    }

    /// Users owning at least one pending dose inside the window.
    pub fn users_with_pending_due(
        &self,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
    ) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT m.user_id FROM dose_events d JOIN medicines m ON m.id = d.medicine_id
             WHERE m.active = 1 AND d.status = 'pending'
               AND d.scheduled_at >= ?1 AND d.scheduled_at <= ?2
             ORDER BY m.user_id ASC",
        )?;
        let rows = stmt.query_map(params![fmt_ts(window_start), fmt_ts(window_end)], |row| {
            row.get::<_, String>(0)
        })?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    /// Open (pending or sent) doses scheduled strictly before `before`.
    pub fn find_overdue(&self, before: NaiveDateTime) -> Result<Vec<DoseEvent>> {
        let sql = format!(
            "SELECT {SELECT_COLS} FROM dose_events d
             WHERE d.status IN ('pending', 'sent') AND d.scheduled_at < ?1
             ORDER BY d.scheduled_at ASC, d.id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![fmt_ts(before)], |row| map_row!(row))?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row_to_dose(row?)?);
        }
        Ok(events)
    }

    /// Move a dose from `expected` to `new` only if it is still in `expected`.
    /// Returns whether this call performed the transition.
    pub fn compare_and_set_status(
        &self,
        id: &str,
        expected: DoseStatus,
        new: DoseStatus,
        action_at: Option<NaiveDateTime>,
    ) -> Result<bool> {
        let count = self.conn.execute(
            "UPDATE dose_events SET status = ?1, action_at = COALESCE(?2, action_at)
             WHERE id = ?3 AND status = ?4",
            params![
                new.to_string(),
                action_at.map(fmt_ts),
                id,
                expected.to_string()
            ],
        )?;
        Ok(count == 1)
    }

    /// Re-arm a dose at `new_at` if it is still `expected` at `expected_at`.
    pub fn reschedule(
        &self,
        id: &str,
        expected: DoseStatus,
        expected_at: NaiveDateTime,
        new_at: NaiveDateTime,
    ) -> Result<bool> {
        let count = self.conn.execute(
            "UPDATE dose_events SET status = 'pending', scheduled_at = ?1, snooze_count = snooze_count + 1
             WHERE id = ?2 AND status = ?3 AND scheduled_at = ?4",
            params![fmt_ts(new_at), id, expected.to_string(), fmt_ts(expected_at)],
        )?;
        Ok(count == 1)
    }
}
