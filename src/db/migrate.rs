use anyhow::Result;
use rusqlite::Connection;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS medicines (
            id                TEXT PRIMARY KEY,
            user_id           TEXT NOT NULL,
            name              TEXT NOT NULL,
            dosage            TEXT,
            total_quantity    INTEGER NOT NULL CHECK (total_quantity >= 0),
            frequency         TEXT NOT NULL,
            start_date        TEXT NOT NULL,
            time_slots        TEXT NOT NULL,
            reminders_enabled INTEGER NOT NULL DEFAULT 1,
            active            INTEGER NOT NULL DEFAULT 1,
            created_at        TEXT NOT NULL,
            stopped_at        TEXT
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_medicines_active_name
            ON medicines(user_id, name) WHERE active = 1;

        CREATE TABLE IF NOT EXISTS dose_events (
            id                    TEXT PRIMARY KEY,
            medicine_id           TEXT NOT NULL REFERENCES medicines(id) ON DELETE CASCADE,
            scheduled_at          TEXT NOT NULL,
            original_scheduled_at TEXT NOT NULL,
            status                TEXT NOT NULL DEFAULT 'pending',
            action_at             TEXT,
            snooze_count          INTEGER NOT NULL DEFAULT 0,
            UNIQUE (medicine_id, original_scheduled_at)
        );
        CREATE INDEX IF NOT EXISTS idx_dose_events_status_ts ON dose_events(status, scheduled_at);
        CREATE INDEX IF NOT EXISTS idx_dose_events_medicine ON dose_events(medicine_id, scheduled_at);

        CREATE TABLE IF NOT EXISTS delivery_targets (
            user_id    TEXT PRIMARY KEY,
            token      TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )?;
    Ok(())
}
