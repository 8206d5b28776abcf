use chrono::{Datelike, NaiveDate};

use crate::models::medicine::{Frequency, Medicine};

/// Whether `date` is a dosing day for `medicine`.
///
/// Only whole calendar days are compared. Interval schedules are anchored to
/// the start date, which is always a dosing day.
pub fn is_dosing_day(date: NaiveDate, medicine: &Medicine) -> bool {
    if date < medicine.start_date {
        return false;
    }
    match &medicine.frequency {
        Frequency::Daily => true,
        Frequency::SpecificWeekdays(days) => days.contains(&date.weekday()),
        Frequency::IntervalDays(interval) => {
            // validation rejects 0; never dose rather than divide by zero
            if *interval == 0 {
                return false;
            }
            let elapsed = (date - medicine.start_date).num_days();
            elapsed % i64::from(*interval) == 0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Weekday};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn med(freq: Frequency, start: NaiveDate) -> Medicine {
        Medicine::new(
            "u1",
            "test",
            freq,
            start,
            vec![NaiveTime::from_hms_opt(9, 0, 0).unwrap()],
            100,
        )
    }

    #[test]
    fn nothing_before_start() {
        let m = med(Frequency::Daily, d(2025, 1, 10));
        assert!(!is_dosing_day(d(2025, 1, 9), &m));
        assert!(is_dosing_day(d(2025, 1, 10), &m));
        assert!(is_dosing_day(d(2026, 6, 30), &m));
    }

    #[test]
    fn weekdays_match_only_listed_days() {
        // 2025-01-06 is a Monday
        let m = med(
            Frequency::weekdays([Weekday::Mon, Weekday::Thu]),
            d(2025, 1, 1),
        );
        assert!(is_dosing_day(d(2025, 1, 6), &m));
        assert!(!is_dosing_day(d(2025, 1, 7), &m));
        assert!(is_dosing_day(d(2025, 1, 9), &m));
        assert!(!is_dosing_day(d(2025, 1, 1), &m), "start is a Wednesday");
    }

    #[test]
    fn interval_anchored_to_start() {
        let m = med(Frequency::IntervalDays(3), d(2025, 2, 27));
        assert!(is_dosing_day(d(2025, 2, 27), &m));
        assert!(!is_dosing_day(d(2025, 2, 28), &m));
        // crosses month end: Feb 2025 has 28 days
        assert!(is_dosing_day(d(2025, 3, 2), &m));
        assert!(is_dosing_day(d(2025, 3, 5), &m));
        assert!(!is_dosing_day(d(2025, 3, 4), &m));
    }

    #[test]
    fn interval_of_one_is_daily() {
        let m = med(Frequency::IntervalDays(1), d(2024, 12, 30));
        for offset in 0..10 {
            assert!(is_dosing_day(d(2024, 12, 30) + chrono::Duration::days(offset), &m));
        }
    }

    #[test]
    fn zero_interval_never_doses() {
        let m = med(Frequency::IntervalDays(0), d(2025, 1, 1));
        assert!(!is_dosing_day(d(2025, 1, 1), &m));
    }
}
