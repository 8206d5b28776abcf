use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// DoseStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoseStatus {
    Pending,
    Sent,
    Taken,
    Missed,
}

impl DoseStatus {
    /// Taken and Missed close the occurrence; they stay queryable as history.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Taken | Self::Missed)
    }

    /// Whether the lifecycle table permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: DoseStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Sent) => true,
            (Self::Pending | Self::Sent, Self::Taken | Self::Missed) => true,
            // snooze re-arms
            (Self::Pending | Self::Sent, Self::Pending) => true,
            _ => false,
        }
    }
}

impl FromStr for DoseStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "taken" => Ok(Self::Taken),
            "missed" => Ok(Self::Missed),
            other => anyhow::bail!("unknown dose status: {other}"),
        }
    }
}

impl fmt::Display for DoseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Sent => write!(f, "sent"),
            Self::Taken => write!(f, "taken"),
            Self::Missed => write!(f, "missed"),
        }
    }
}

// ---------------------------------------------------------------------------
// DoseAction
// ---------------------------------------------------------------------------

/// A user-initiated change to a dose event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoseAction {
    Take,
    Miss,
    Snooze { minutes: u32 },
}

impl DoseAction {
    pub fn target(self) -> DoseStatus {
        match self {
            Self::Take => DoseStatus::Taken,
            Self::Miss => DoseStatus::Missed,
            Self::Snooze { .. } => DoseStatus::Pending,
        }
    }
}

// ---------------------------------------------------------------------------
// DoseEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseEvent {
    pub id: String,
    pub medicine_id: String,
    pub scheduled_at: NaiveDateTime,
    /// The generated slot; unchanged by snoozes and unique per medicine.
    pub original_scheduled_at: NaiveDateTime,
    pub status: DoseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_at: Option<NaiveDateTime>,
    pub snooze_count: u32,
}

impl DoseEvent {
    pub fn new(medicine_id: impl Into<String>, scheduled_at: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            medicine_id: medicine_id.into(),
            scheduled_at,
            original_scheduled_at: scheduled_at,
            status: DoseStatus::Pending,
            action_at: None,
            snooze_count: 0,
        }
    }

    fn guard(&self, next: DoseStatus) -> Result<()> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                from: self.status,
                to: next,
            })
        }
    }

    /// The poller's Pending -> Sent step.
    pub fn mark_sent(&self) -> Result<DoseEvent> {
        if self.status != DoseStatus::Pending {
            return Err(Error::InvalidTransition {
                from: self.status,
                to: DoseStatus::Sent,
            });
        }
        Ok(DoseEvent {
            status: DoseStatus::Sent,
            ..self.clone()
        })
    }

    /// Apply a user action, returning the next state of this event.
    pub fn apply(&self, action: DoseAction, now: NaiveDateTime) -> Result<DoseEvent> {
        self.guard(action.target())?;
        let next = match action {
            DoseAction::Take => DoseEvent {
                status: DoseStatus::Taken,
                action_at: Some(now),
                ..self.clone()
            },
            DoseAction::Miss => DoseEvent {
                status: DoseStatus::Missed,
                action_at: Some(now),
                ..self.clone()
            },
            DoseAction::Snooze { minutes } => {
                if minutes == 0 {
                    return Err(Error::validation("snooze must be at least one minute"));
                }
                DoseEvent {
                    status: DoseStatus::Pending,
                    scheduled_at: self.scheduled_at + Duration::minutes(i64::from(minutes)),
                    snooze_count: self.snooze_count + 1,
                    ..self.clone()
                }
            }
        };
        Ok(next)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
