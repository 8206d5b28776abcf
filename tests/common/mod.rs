#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::cell::RefCell;

use dosekeeper::core::notify::Notifier;
use dosekeeper::db::Database;
use dosekeeper::error::{Error, Result};
use dosekeeper::models::medicine::{Frequency, Medicine};
use dosekeeper::models::target::DeliveryTarget;
use tempfile::TempDir;

/// Create a temporary database for testing.
pub fn setup_db() -> (TempDir, Database) {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");
    let db = Database::open(&db_path).unwrap();
    (dir, db)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
    date(y, mo, d).and_hms_opt(h, mi, 0).unwrap()
}

pub fn slot(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// An active daily medicine with reminders on.
pub fn make_medicine(
    user_id: &str,
    name: &str,
    start: NaiveDate,
    slots: Vec<NaiveTime>,
    quantity: u32,
) -> Medicine {
    Medicine::new(user_id, name, Frequency::Daily, start, slots, quantity)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub token: String,
    pub title: String,
    pub body: String,
    pub correlation_id: String,
}

/// Records every reminder it is handed; fails them all while `failing` is set.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: RefCell<Vec<Sent>>,
    pub failing: RefCell<bool>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        let n = Self::default();
        *n.failing.borrow_mut() = true;
        n
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.borrow_mut() = failing;
    }

    pub fn count(&self) -> usize {
        self.sent.borrow().len()
    }

    pub fn ids(&self) -> Vec<String> {
        self.sent
            .borrow()
            .iter()
            .map(|s| s.correlation_id.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn send(
        &self,
        target: &DeliveryTarget,
        title: &str,
        body: &str,
        correlation_id: &str,
    ) -> Result<()> {
        if *self.failing.borrow() {
            return Err(Error::Delivery("channel unavailable".into()));
        }
        self.sent.borrow_mut().push(Sent {
            token: target.token.clone(),
            title: title.to_string(),
            body: body.to_string(),
            correlation_id: correlation_id.to_string(),
        });
        Ok(())
    }
}
