use anyhow::Result;
use chrono::NaiveDateTime;

use crate::core::store::DoseStore;
use crate::models::dose::{DoseEvent, DoseStatus};
use crate::models::medicine::Medicine;
use crate::models::target::DeliveryTarget;

use super::Database;

impl DoseStore for Database {
    fn create_dose_events(&self, events: &[DoseEvent]) -> Result<usize> {
        Database::create_dose_events(self, events)
    }

    fn find_pending_due(
        &self,
        user_id: &str,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
    ) -> Result<Vec<DoseEvent>> {
        Database::find_pending_due(self, user_id, window_start, window_end)
    }

    fn compare_and_set_status(
        &self,
        id: &str,
        expected: DoseStatus,
        new: DoseStatus,
        action_at: Option<NaiveDateTime>,
    ) -> Result<bool> {
        Database::compare_and_set_status(self, id, expected, new, action_at)
    }

    fn reschedule(
        &self,
        id: &str,
        expected: DoseStatus,
        expected_at: NaiveDateTime,
        new_at: NaiveDateTime,
    ) -> Result<bool> {
        Database::reschedule(self, id, expected, expected_at, new_at)
    }

    fn find_dose_event(&self, id: &str) -> Result<Option<DoseEvent>> {
        self.get_dose_event(id)
    }

    fn get_medicine(&self, id: &str) -> Result<Option<Medicine>> {
        Database::get_medicine(self, id)
    }

    fn delivery_target(&self, user_id: &str) -> Result<Option<DeliveryTarget>> {
        self.get_delivery_target(user_id)
    }

    fn users_with_pending_due(
        &self,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
    ) -> Result<Vec<String>> {
        Database::users_with_pending_due(self, window_start, window_end)
    }

    fn find_overdue(&self, before: NaiveDateTime) -> Result<Vec<DoseEvent>> {
        Database::find_overdue(self, before)
    }
}
