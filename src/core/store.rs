use anyhow::Result;
use chrono::NaiveDateTime;

use crate::models::dose::{DoseEvent, DoseStatus};
use crate::models::medicine::Medicine;
use crate::models::target::DeliveryTarget;

/// Storage the scheduler, poller and dose actions run against.
///
/// Status changes go through conditional updates only: a write names the
/// state it expects to replace and reports whether it won.
pub trait DoseStore {
    fn create_dose_events(&self, events: &[DoseEvent]) -> Result<usize>;

    fn find_pending_due(
        &self,
        user_id: &str,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
    ) -> Result<Vec<DoseEvent>>;

    fn compare_and_set_status(
        &self,
        id: &str,
        expected: DoseStatus,
        new: DoseStatus,
        action_at: Option<NaiveDateTime>,
    ) -> Result<bool>;

    fn reschedule(
        &self,
        id: &str,
        expected: DoseStatus,
        expected_at: NaiveDateTime,
        new_at: NaiveDateTime,
    ) -> Result<bool>;

    fn find_dose_event(&self, id: &str) -> Result<Option<DoseEvent>>;

    fn get_medicine(&self, id: &str) -> Result<Option<Medicine>>;

    fn delivery_target(&self, user_id: &str) -> Result<Option<DeliveryTarget>>;

    fn users_with_pending_due(
        &self,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
    ) -> Result<Vec<String>>;

    fn find_overdue(&self, before: NaiveDateTime) -> Result<Vec<DoseEvent>>;
}
