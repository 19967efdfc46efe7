use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

use crate::models::Schedule;

impl Schedule {
    /// Tag stored in the `schedule_type` column.
    pub fn kind(&self) -> &'static str {
        match self {
            Schedule::FixedInterval { .. } => "fixed_interval",
            Schedule::FixedDayOfWeek { .. } => "fixed_day_of_week",
            Schedule::FixedDayOfMonth { .. } => "fixed_day_of_month",
            Schedule::FixedDayOfYear { .. } => "fixed_day_of_year",
        }
    }

    /// Flatten to the stored `(schedule_type, interval_seconds, day_of)`
    /// columns.
    pub(crate) fn to_parts(&self) -> (&'static str, Option<i64>, Option<i64>) {
        match *self {
            Schedule::FixedInterval { interval_seconds } => {
                (self.kind(), Some(interval_seconds), None)
            }
            Schedule::FixedDayOfWeek { day_of }
            | Schedule::FixedDayOfMonth { day_of }
            | Schedule::FixedDayOfYear { day_of } => (self.kind(), None, Some(i64::from(day_of))),
        }
    }

    /// Rebuild a schedule from its stored columns. The returned reason
    /// describes why a row is unusable; callers attach the rule id.
    pub(crate) fn from_parts(
        kind: &str,
        interval_seconds: Option<i64>,
        day_of: Option<i64>,
    ) -> Result<Schedule, String> {
        let schedule = match (kind, interval_seconds, day_of) {
            ("fixed_interval", Some(secs), None) => Schedule::FixedInterval {
                interval_seconds: secs,
            },
            ("fixed_day_of_week", None, Some(day)) => Schedule::FixedDayOfWeek {
                day_of: day_from(day)?,
            },
            ("fixed_day_of_month", None, Some(day)) => Schedule::FixedDayOfMonth {
                day_of: day_from(day)?,
            },
            ("fixed_day_of_year", None, Some(day)) => Schedule::FixedDayOfYear {
                day_of: day_from(day)?,
            },
            _ => {
                return Err(format!(
                    "schedule type {:?} does not match populated fields (interval_seconds: {:?}, day_of: {:?})",
                    kind, interval_seconds, day_of
                ))
            }
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Check parameter ranges. The row decoder applies the same checks, so
    /// an out-of-range value in storage surfaces as a corrupt rule instead
    /// of a non-terminating catch-up.
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Schedule::FixedInterval { interval_seconds } if interval_seconds <= 0 => Err(format!(
                "interval_seconds must be positive, got {}",
                interval_seconds
            )),
            Schedule::FixedDayOfWeek { day_of } if day_of > 6 => {
                Err(format!("weekday must be 0 (Sunday) to 6 (Saturday), got {}", day_of))
            }
            Schedule::FixedDayOfMonth { day_of } if !(1..=31).contains(&day_of) => {
                Err(format!("day of month must be 1-31, got {}", day_of))
            }
            Schedule::FixedDayOfYear { day_of } if !(1..=366).contains(&day_of) => {
                Err(format!("day of year must be 1-366, got {}", day_of))
            }
            _ => Ok(()),
        }
    }

    /// Compute the occurrence after `from`. With `allow_same_day`, `from`
    /// itself is returned whenever it already satisfies the schedule; rule
    /// create/update uses that to keep a fresh anchor in place. Without it
    /// the result is strictly later than `from`, which is what terminates
    /// the catch-up loop.
    pub fn next_occurrence(&self, from: DateTime<Utc>, allow_same_day: bool) -> DateTime<Utc> {
        match *self {
            Schedule::FixedInterval { interval_seconds } => {
                if allow_same_day {
                    from
                } else {
                    from + Duration::seconds(interval_seconds)
                }
            }
            Schedule::FixedDayOfWeek { day_of } => {
                let curr = from.weekday().num_days_from_sunday();
                let mut days_to_add = (i64::from(day_of) - i64::from(curr)).rem_euclid(7);
                if days_to_add == 0 && !allow_same_day {
                    days_to_add = 7;
                }
                from + Duration::days(days_to_add)
            }
            Schedule::FixedDayOfMonth { day_of } => {
                // Stays in from's month when the clamped target day has not
                // passed yet, otherwise rolls to the following month.
                let (year, month, day) = (from.year(), from.month(), from.day());
                let target = day_of.min(days_in_month(year, month));
                if target > day || (target == day && allow_same_day) {
                    return from + Duration::days(i64::from(target - day));
                }
                let (year, month) = if month == 12 {
                    (year + 1, 1)
                } else {
                    (year, month + 1)
                };
                // Set the day directly rather than adding a delta so
                // differing month lengths cannot accumulate drift.
                let target = day_of.min(days_in_month(year, month));
                midnight(year, month, target)
            }
            Schedule::FixedDayOfYear { day_of } => {
                let ordinal = from.ordinal();
                if day_of > ordinal || (day_of == ordinal && allow_same_day) {
                    return from + Duration::days(i64::from(day_of) - i64::from(ordinal));
                }
                // Naive add-one-year first. Its ordinal can differ from the
                // target when a leap day falls in between (Feb 29 itself
                // normalizes to Mar 1), so correct by the remaining
                // difference.
                let next = add_year(from);
                if next.ordinal() == day_of {
                    return next;
                }
                next + Duration::days(i64::from(day_of) - i64::from(next.ordinal()))
            }
        }
    }
}

/// Days in a Gregorian month: the day before the first of the next month.
pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .expect("first of month is always a valid date")
        .pred_opt()
        .expect("first of month has a predecessor")
        .day()
}

fn midnight(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .expect("clamped day is always valid for its month");
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight is a valid time"))
}

/// Same calendar day one year later, at midnight. Feb 29 is the only date
/// that can vanish a year later; it normalizes to Mar 1 like the
/// wraparound in the underlying calendar arithmetic.
fn add_year(from: DateTime<Utc>) -> DateTime<Utc> {
    let year = from.year() + 1;
    if NaiveDate::from_ymd_opt(year, from.month(), from.day()).is_some() {
        midnight(year, from.month(), from.day())
    } else {
        midnight(year, 3, 1)
    }
}

fn day_from(day: i64) -> Result<u32, String> {
    u32::try_from(day).map_err(|_| format!("day_of {} out of range", day))
}
