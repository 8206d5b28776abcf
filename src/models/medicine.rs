use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Frequency
// ---------------------------------------------------------------------------

static INTERVAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^every:(\d+)d?$").unwrap());

/// How often a medicine is taken. Each variant carries exactly the parameter
/// it needs, so a weekday set on an interval schedule cannot be expressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "param", rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    SpecificWeekdays(Vec<Weekday>),
    IntervalDays(u32),
}

impl Frequency {
    /// Build a weekday schedule with days sorted Monday-first and deduplicated.
    pub fn weekdays(days: impl IntoIterator<Item = Weekday>) -> Self {
        let mut days: Vec<Weekday> = days.into_iter().collect();
        days.sort_by_key(|d| d.num_days_from_monday());
        days.dedup();
        Self::SpecificWeekdays(days)
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Daily => Ok(()),
            Self::SpecificWeekdays(days) if days.is_empty() => Err(Error::validation(
                "specific_weekdays frequency needs at least one weekday",
            )),
            Self::SpecificWeekdays(_) => Ok(()),
            Self::IntervalDays(0) => Err(Error::validation("day interval must be at least 1")),
            Self::IntervalDays(_) => Ok(()),
        }
    }
}

fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

impl FromStr for Frequency {
    type Err = Error;

    /// Accepts `daily`, `weekdays:mon,wed,fri` and `every:N` (also `every:Nd`).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        if s == "daily" {
            return Ok(Self::Daily);
        }

        if let Some(list) = s.strip_prefix("weekdays:") {
            let mut days = Vec::new();
            for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let day: Weekday = part
                    .parse()
                    .map_err(|_| Error::validation(format!("unknown weekday: {part}")))?;
                days.push(day);
            }
            let freq = Self::weekdays(days);
            freq.validate()?;
            return Ok(freq);
        }

        if let Some(caps) = INTERVAL_PATTERN.captures(&s) {
            let n: u32 = caps[1]
                .parse()
                .map_err(|_| Error::validation(format!("day interval out of range: {}", &caps[1])))?;
            let freq = Self::IntervalDays(n);
            freq.validate()?;
            return Ok(freq);
        }

        Err(Error::validation(format!(
            "unknown frequency: {s} (expected daily, weekdays:mon,thu or every:N)"
        )))
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::SpecificWeekdays(days) => {
                let codes: Vec<&str> = days.iter().map(|d| weekday_code(*d)).collect();
                write!(f, "weekdays:{}", codes.join(","))
            }
            Self::IntervalDays(n) => write!(f, "every:{n}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Time slots
// ---------------------------------------------------------------------------

pub const SLOT_FORMAT: &str = "%H:%M";

/// Parse a comma-separated list of `HH:MM` slots into ascending, unique times.
pub fn parse_time_slots(input: &str) -> Result<Vec<NaiveTime>> {
    let mut slots = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let t = NaiveTime::parse_from_str(part, SLOT_FORMAT)
            .map_err(|_| Error::validation(format!("invalid time slot '{part}' (expected HH:MM)")))?;
        if slots.contains(&t) {
            return Err(Error::validation(format!("duplicate time slot: {part}")));
        }
        slots.push(t);
    }
    slots.sort();
    Ok(slots)
}

pub fn format_time_slots(slots: &[NaiveTime]) -> String {
    slots
        .iter()
        .map(|t| t.format(SLOT_FORMAT).to_string())
        .collect::<Vec<_>>()
        .join(",")
}

// ---------------------------------------------------------------------------
// Medicine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medicine {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    pub total_quantity: u32,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub time_slots: Vec<NaiveTime>,
    pub reminders_enabled: bool,
    pub active: bool,
    pub created_at: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<NaiveDateTime>,
}

impl Medicine {
    /// Create a new active medicine with reminders enabled.
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        frequency: Frequency,
        start_date: NaiveDate,
        time_slots: Vec<NaiveTime>,
        total_quantity: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            name: name.into(),
            dosage: None,
            total_quantity,
            frequency,
            start_date,
            time_slots,
            reminders_enabled: true,
            active: true,
            created_at: Local::now().naive_local(),
            stopped_at: None,
        }
    }

    /// Reject definitions the schedule generator must never see.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("medicine name must not be empty"));
        }
        if self.user_id.trim().is_empty() {
            return Err(Error::validation("user id must not be empty"));
        }
        self.frequency.validate()?;
        if self.active && self.reminders_enabled && self.time_slots.is_empty() {
            return Err(Error::validation(
                "at least one time slot is required while reminders are enabled",
            ));
        }
        let mut seen = self.time_slots.clone();
        seen.sort();
        seen.dedup();
        if seen.len() != self.time_slots.len() {
            return Err(Error::validation("time slots must be unique"));
        }
        Ok(())
    }

    /// Time slots in generation order.
    pub fn sorted_slots(&self) -> Vec<NaiveTime> {
        let mut slots = self.time_slots.clone();
        slots.sort();
        slots.dedup();
        slots
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    // -- Frequency -----------------------------------------------------------

    #[test]
    fn frequency_from_str_valid() {
        assert_eq!("daily".parse::<Frequency>().unwrap(), Frequency::Daily);
        assert_eq!("DAILY".parse::<Frequency>().unwrap(), Frequency::Daily);
        assert_eq!(
            "every:3".parse::<Frequency>().unwrap(),
            Frequency::IntervalDays(3)
        );
        assert_eq!(
            "every:2d".parse::<Frequency>().unwrap(),
            Frequency::IntervalDays(2)
        );
        assert_eq!(
            "weekdays:fri,mon,monday".parse::<Frequency>().unwrap(),
            Frequency::SpecificWeekdays(vec![Weekday::Mon, Weekday::Fri])
        );
    }

    #[test]
    fn frequency_from_str_invalid() {
        assert!("hourly".parse::<Frequency>().is_err());
        assert!("weekdays:".parse::<Frequency>().is_err());
        assert!("weekdays:funday".parse::<Frequency>().is_err());
    }

    #[test]
    fn zero_interval_is_a_validation_error() {
        let err = "every:0".parse::<Frequency>().unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn interval_parse_is_repeatable_and_overflow_is_validation() {
        for _ in 0..3 {
            assert_eq!("every:14".parse::<Frequency>().unwrap(), Frequency::IntervalDays(14));
        }
        let err = "every:99999999999".parse::<Frequency>().unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn frequency_display_roundtrip() {
        let freqs = [
            Frequency::Daily,
            Frequency::IntervalDays(7),
            Frequency::weekdays([Weekday::Sun, Weekday::Wed]),
        ];
        for f in &freqs {
            let parsed: Frequency = f.to_string().parse().unwrap();
            assert_eq!(&parsed, f);
        }
    }

    #[test]
    fn weekdays_display_is_monday_first() {
        let f = Frequency::weekdays([Weekday::Sun, Weekday::Tue, Weekday::Tue]);
        assert_eq!(f.to_string(), "weekdays:tue,sun");
    }

    #[test]
    fn frequency_serde_is_tagged() {
        let json = serde_json::to_value(Frequency::IntervalDays(2)).unwrap();
        assert_eq!(json["type"], "interval_days");
        assert_eq!(json["param"], 2);
        let daily = serde_json::to_value(Frequency::Daily).unwrap();
        assert_eq!(daily["type"], "daily");
    }

    // -- Time slots ----------------------------------------------------------

    #[test]
    fn parse_time_slots_sorts() {
        let slots = parse_time_slots("20:00, 08:00").unwrap();
        assert_eq!(slots, vec![t(8, 0), t(20, 0)]);
        assert_eq!(format_time_slots(&slots), "08:00,20:00");
    }

    #[test]
    fn parse_time_slots_rejects_duplicates_and_garbage() {
        assert!(parse_time_slots("08:00,08:00").is_err());
        assert!(parse_time_slots("noon").is_err());
        assert!(parse_time_slots("25:00").is_err());
    }

    // -- Medicine ------------------------------------------------------------

    #[test]
    fn medicine_new_defaults() {
        let m = Medicine::new("u1", "ibuprofen", Frequency::Daily, d(2025, 1, 1), vec![t(8, 0)], 10);
        assert!(m.active);
        assert!(m.reminders_enabled);
        assert!(m.stopped_at.is_none());
        assert!(!m.id.is_empty());
        assert!(m.validate().is_ok());
    }

    #[test]
    fn validate_requires_slots_when_reminding() {
        let mut m = Medicine::new("u1", "ibuprofen", Frequency::Daily, d(2025, 1, 1), vec![], 10);
        assert!(m.validate().is_err());
        m.reminders_enabled = false;
        assert!(m.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_frequency_and_duplicate_slots() {
        let m = Medicine::new(
            "u1",
            "x",
            Frequency::IntervalDays(0),
            d(2025, 1, 1),
            vec![t(8, 0)],
            1,
        );
        assert!(m.validate().is_err());

        let m = Medicine::new(
            "u1",
            "x",
            Frequency::Daily,
            d(2025, 1, 1),
            vec![t(8, 0), t(8, 0)],
            1,
        );
        assert!(m.validate().is_err());

        let m = Medicine::new("u1", " ", Frequency::Daily, d(2025, 1, 1), vec![t(8, 0)], 1);
        assert!(m.validate().is_err());
    }
}
