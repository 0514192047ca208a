use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::Doctor;

pub const SUNDAY: i32 = 0;
pub const SATURDAY: i32 = 6;

/// A doctor's single recurring weekly window: an inclusive week-day range
/// (0 = Sunday) and a half-open time-of-day range `[from_time, to_time)`.
///
/// When `from_week_day > to_week_day` the day range wraps across the end of
/// the week, so `5..=1` covers Friday, Saturday, Sunday and Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyAvailability {
    pub from_week_day: i32,
    pub to_week_day: i32,
    pub from_time: NaiveTime,
    pub to_time: NaiveTime,
}

impl WeeklyAvailability {
    /// False for records that can never admit a booking: week days outside
    /// 0..=6 or an empty time range.
    pub fn is_bookable(&self) -> bool {
        is_week_day(self.from_week_day)
            && is_week_day(self.to_week_day)
            && self.from_time < self.to_time
    }

    pub fn covers_week_day(&self, week_day: i32) -> bool {
        if !is_week_day(self.from_week_day) || !is_week_day(self.to_week_day) {
            return false;
        }

        if self.from_week_day <= self.to_week_day {
            week_day >= self.from_week_day && week_day <= self.to_week_day
        } else {
            week_day >= self.from_week_day || week_day <= self.to_week_day
        }
    }

    pub fn covers_time(&self, time: NaiveTime) -> bool {
        time >= self.from_time && time < self.to_time
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.covers_week_day(week_day_of(at.date())) && self.covers_time(at.time())
    }

    /// Candidate start times on `date`, `step` apart, beginning at `from_time`
    /// and stopping before `to_time`. Empty when the day is not covered.
    pub fn slots_on(&self, date: NaiveDate, step: Duration) -> Vec<NaiveDateTime> {
        if step <= Duration::zero()
            || !self.is_bookable()
            || !self.covers_week_day(week_day_of(date))
        {
            return Vec::new();
        }

        let end = date.and_time(self.to_time);
        let mut slots = Vec::new();
        let mut current = date.and_time(self.from_time);

        while current < end {
            slots.push(current);
            match current.checked_add_signed(step) {
                Some(next) => current = next,
                None => break,
            }
        }

        slots
    }
}

pub fn is_within_availability(doctor: &Doctor, at: NaiveDateTime) -> bool {
    doctor.availability().contains(at)
}

/// Week day number with Sunday = 0, matching the stored doctor columns.
pub fn week_day_of(date: NaiveDate) -> i32 {
    date.weekday().num_days_from_sunday() as i32
}

fn is_week_day(value: i32) -> bool {
    (SUNDAY..=SATURDAY).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn week_day_numbering_starts_on_sunday() {
        let sunday = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        let wednesday = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();

        assert_eq!(week_day_of(sunday), 0);
        assert_eq!(week_day_of(wednesday), 3);
    }

    #[test]
    fn inverted_time_range_is_not_bookable() {
        let window = WeeklyAvailability {
            from_week_day: 1,
            to_week_day: 5,
            from_time: at(18, 0),
            to_time: at(8, 0),
        };

        assert!(!window.is_bookable());
        assert!(!window.covers_time(at(12, 0)));
    }
}
