use anyhow::Result;
use chrono::NaiveDateTime;
use rusqlite::{OptionalExtension, params};

use crate::models::target::DeliveryTarget;

use super::{Database, fmt_ts, parse_ts};

impl Database {
    /// Register or replace the delivery token for a user.
    pub fn set_delivery_target(
        &self,
        user_id: &str,
        token: &str,
        now: NaiveDateTime,
    ) -> Result<DeliveryTarget> {
        self.conn.execute(
            "INSERT INTO delivery_targets (user_id, token, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET token = excluded.token, updated_at = excluded.updated_at",
            params![user_id, token, fmt_ts(now)],
        )?;
        Ok(DeliveryTarget {
            user_id: user_id.to_string(),
            token: token.to_string(),
            updated_at: now,
        })
    }

    pub fn get_delivery_target(&self, user_id: &str) -> Result<Option<DeliveryTarget>> {
        let row = self
            .conn
            .query_row(
                "SELECT user_id, token, updated_at FROM delivery_targets WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        match row {
            Some((user_id, token, updated_at)) => Ok(Some(DeliveryTarget {
                user_id,
                token,
                updated_at: parse_ts(&updated_at)?,
            })),
            None => Ok(None),
        }
    }

    pub fn remove_delivery_target(&self, user_id: &str) -> Result<bool> {
        let count = self.conn.execute(
            "DELETE FROM delivery_targets WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(count > 0)
    }
}
