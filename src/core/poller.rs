//! Periodic reminder scan.
//!
//! Each call is a short batch: find the pending doses that fell due inside
//! the lookback window, notify, and flip each one to `Sent` with a
//! conditional update. Doses whose notification fails stay pending and are
//! retried by the next poll as long as they are still inside the window. The
//! deploying scheduler must poll at least once per lookback window; a dose
//! that drifts out of the window unsent is not caught up here (see
//! `dose::sweep_overdue`).

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::core::clock::Clock;
use crate::core::notify::Notifier;
use crate::core::store::DoseStore;
use crate::error::{Error, Result};
use crate::models::dose::{DoseEvent, DoseStatus};
use crate::models::medicine::Medicine;

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub lookback: Duration,
    /// Upper bound on one user's scan; whatever is left stays pending.
    pub scan_timeout: std::time::Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            lookback: Duration::seconds(60),
            scan_timeout: std::time::Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollReport {
    pub user_id: String,
    /// Pending doses found inside the window.
    pub due: usize,
    pub sent: usize,
    /// Notification failed; left pending for the next poll.
    pub failed: usize,
    /// Notified, but another actor changed the dose first.
    pub lost_race: usize,
    /// The scan hit its time budget before finishing.
    pub aborted: bool,
}

#[derive(Debug, Serialize)]
pub struct UserPollOutcome {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<PollReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PollError>,
}

#[derive(Debug, Serialize)]
pub struct PollError {
    pub code: &'static str,
    pub message: String,
}

impl From<&Error> for PollError {
    fn from(e: &Error) -> Self {
        Self {
            code: e.code(),
            message: e.to_string(),
        }
    }
}

fn window(now: NaiveDateTime, settings: &PollSettings) -> (NaiveDateTime, NaiveDateTime) {
    (now - settings.lookback, now)
}

fn reminder_text(medicine: Option<&Medicine>, dose: &DoseEvent) -> (String, String) {
    let at = dose.scheduled_at.format("%H:%M");
    match medicine {
        Some(m) => {
            let title = format!("Time to take {}", m.name);
            let body = match m.dosage.as_deref() {
                Some(dosage) if !dosage.is_empty() => format!("{dosage} scheduled for {at}"),
                _ => format!("Scheduled for {at}"),
            };
            (title, body)
        }
        None => ("Medicine reminder".to_string(), format!("Scheduled for {at}")),
    }
}

/// Notify one user's due doses and mark each delivered one as sent.
pub fn scan_and_notify<S: DoseStore + ?Sized>(
    store: &S,
    notifier: &dyn Notifier,
    clock: &dyn Clock,
    user_id: &str,
    settings: &PollSettings,
) -> Result<PollReport> {
    let started = Instant::now();
    let (start, end) = window(clock.now(), settings);
    let due = store.find_pending_due(user_id, start, end)?;

    let mut report = PollReport {
        user_id: user_id.to_string(),
        due: due.len(),
        ..PollReport::default()
    };
    if due.is_empty() {
        return Ok(report);
    }

    let target = store
        .delivery_target(user_id)?
        .ok_or_else(|| Error::MissingDeliveryTarget {
            user: user_id.to_string(),
        })?;

    let mut medicines: HashMap<String, Option<Medicine>> = HashMap::new();
    for dose in &due {
        if started.elapsed() >= settings.scan_timeout {
            warn!(user = %user_id, remaining = due.len() - report.sent - report.failed - report.lost_race, "scan budget exhausted");
            report.aborted = true;
            break;
        }

        if !medicines.contains_key(&dose.medicine_id) {
            let med = store.get_medicine(&dose.medicine_id)?;
            medicines.insert(dose.medicine_id.clone(), med);
        }
        let medicine = medicines.get(&dose.medicine_id).and_then(Option::as_ref);
        let (title, body) = reminder_text(medicine, dose);

        if let Err(e) = notifier.send(&target, &title, &body, &dose.id) {
            warn!(user = %user_id, dose = %dose.id, error = %e, "notification failed, will retry");
            report.failed += 1;
            continue;
        }

        if store.compare_and_set_status(&dose.id, DoseStatus::Pending, DoseStatus::Sent, None)? {
            debug!(user = %user_id, dose = %dose.id, "reminder sent");
            report.sent += 1;
        } else {
            debug!(user = %user_id, dose = %dose.id, "dose changed during notification");
            report.lost_race += 1;
        }
    }

    info!(
        user = %user_id,
        due = report.due,
        sent = report.sent,
        failed = report.failed,
        "poll finished"
    );
    Ok(report)
}

/// Scan every user with due doses. One user's failure never stops the others.
pub fn poll_all<S: DoseStore + ?Sized>(
    store: &S,
    notifier: &dyn Notifier,
    clock: &dyn Clock,
    settings: &PollSettings,
) -> Result<Vec<UserPollOutcome>> {
    let (start, end) = window(clock.now(), settings);
    let users = store.users_with_pending_due(start, end)?;

    let mut outcomes = Vec::with_capacity(users.len());
    for user_id in users {
        let outcome = match scan_and_notify(store, notifier, clock, &user_id, settings) {
            Ok(report) => UserPollOutcome {
                user_id,
                report: Some(report),
                error: None,
            },
            Err(e) => {
                warn!(user = %user_id, error = %e, "poll failed for user");
                UserPollOutcome {
                    error: Some(PollError::from(&e)),
                    user_id,
                    report: None,
                }
            }
        };
        outcomes.push(outcome);
    }
    Ok(outcomes)
}
