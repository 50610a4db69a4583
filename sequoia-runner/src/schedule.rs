//! Daily trigger: the next weekday occurrence of a wall-clock time.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// First weekday instant at `at` strictly after `now`.
pub fn next_run(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let mut day = now.date();
    if now.time() >= at {
        day += Duration::days(1);
    }
    while !is_weekday(day) {
        day += Duration::days(1);
    }
    day.and_time(at)
}

/// Time left until `next`, zero if it has passed.
pub fn until(now: NaiveDateTime, next: NaiveDateTime) -> std::time::Duration {
    (next - now).to_std().unwrap_or_default()
}
