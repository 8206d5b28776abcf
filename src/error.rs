use thiserror::Error;

use crate::models::dose::DoseStatus;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: DoseStatus, to: DoseStatus },

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("No delivery target registered for user '{user}'")]
    MissingDeliveryTarget { user: String },

    #[error("Medicine '{medicine}' has no dosing days within the schedule horizon")]
    EmptySchedule { medicine: String },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Stable machine-readable code used in the JSON error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Delivery(_) => "delivery_failure",
            Self::MissingDeliveryTarget { .. } => "missing_delivery_target",
            Self::EmptySchedule { .. } => "empty_schedule",
            Self::Store(_) => "store_error",
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Self::Store(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Error::validation("x").code(), "validation_error");
        assert_eq!(Error::not_found("dose event", "abc").code(), "not_found");
        assert_eq!(
            Error::InvalidTransition {
                from: DoseStatus::Taken,
                to: DoseStatus::Pending,
            }
            .code(),
            "invalid_transition"
        );
    }

    #[test]
    fn not_found_message_names_entity() {
        let e = Error::not_found("dose event", "abc");
        assert_eq!(e.to_string(), "dose event not found: abc");
    }
}
