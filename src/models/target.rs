use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Where reminders for a user are delivered, e.g. a push token or chat id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTarget {
    pub user_id: String,
    pub token: String,
    pub updated_at: NaiveDateTime,
}
