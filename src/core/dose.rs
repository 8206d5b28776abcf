use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info};

use crate::core::clock::Clock;
use crate::core::store::DoseStore;
use crate::error::{Error, Result};
use crate::models::dose::{DoseAction, DoseEvent, DoseStatus};

/// Attempts per action before a lost race is reported to the caller.
const MAX_ATTEMPTS: usize = 3;

fn load<S: DoseStore + ?Sized>(store: &S, id: &str) -> Result<DoseEvent> {
    store
        .find_dose_event(id)?
        .ok_or_else(|| Error::not_found("dose event", id))
}

/// Write `next` over `current` only if the stored row still matches `current`.
fn persist<S: DoseStore + ?Sized>(store: &S, current: &DoseEvent, next: &DoseEvent) -> Result<bool> {
    let won = if next.status == DoseStatus::Pending {
        store.reschedule(
            &current.id,
            current.status,
            current.scheduled_at,
            next.scheduled_at,
        )?
    } else {
        store.compare_and_set_status(&current.id, current.status, next.status, next.action_at)?
    };
    Ok(won)
}

/// Apply a user action to a dose event.
///
/// The write is conditional on the state that was read. When a concurrent
/// poll moves the event first (e.g. Pending to Sent) the action is re-evaluated
/// against the new state, so a taken dose is never resurrected and a terminal
/// one is never reset.
pub fn act<S: DoseStore + ?Sized>(
    store: &S,
    clock: &dyn Clock,
    id: &str,
    action: DoseAction,
) -> Result<DoseEvent> {
    for attempt in 1..=MAX_ATTEMPTS {
        let current = load(store, id)?;
        let next = current.apply(action, clock.now())?;
        if persist(store, &current, &next)? {
            info!(
                dose = %id,
                from = %current.status,
                to = %next.status,
                "dose event updated"
            );
            return Ok(next);
        }
        debug!(dose = %id, attempt, "lost update race, re-reading");
    }

    let current = load(store, id)?;
    Err(Error::InvalidTransition {
        from: current.status,
        to: action.target(),
    })
}

pub fn take<S: DoseStore + ?Sized>(store: &S, clock: &dyn Clock, id: &str) -> Result<DoseEvent> {
    act(store, clock, id, DoseAction::Take)
}

pub fn miss<S: DoseStore + ?Sized>(store: &S, clock: &dyn Clock, id: &str) -> Result<DoseEvent> {
    act(store, clock, id, DoseAction::Miss)
}

pub fn snooze<S: DoseStore + ?Sized>(
    store: &S,
    clock: &dyn Clock,
    id: &str,
    minutes: u32,
) -> Result<DoseEvent> {
    act(store, clock, id, DoseAction::Snooze { minutes })
}

/// Mark open doses older than `grace` as missed.
///
/// Doses that slipped out of the poller's lookback window unsent would
/// otherwise stay pending forever. Returns the doses this call closed.
pub fn sweep_overdue<S: DoseStore + ?Sized>(
    store: &S,
    clock: &dyn Clock,
    grace: Duration,
) -> Result<Vec<DoseEvent>> {
    let now = clock.now();
    let cutoff: NaiveDateTime = now - grace;
    let mut closed = Vec::new();
    for ev in store.find_overdue(cutoff)? {
        // a concurrent take/snooze wins; skip rather than retry
        if store.compare_and_set_status(&ev.id, ev.status, DoseStatus::Missed, Some(now))? {
            closed.push(DoseEvent {
                status: DoseStatus::Missed,
                action_at: Some(now),
                ..ev
            });
        }
    }
    if !closed.is_empty() {
        info!(count = closed.len(), "swept overdue doses to missed");
    }
    Ok(closed)
}
