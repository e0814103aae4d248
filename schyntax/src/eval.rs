use jiff::civil::{Date, DateTime};
use jiff::ToSpan;

use crate::calendar::{days_in_month, days_in_previous_month, is_leap_year};
use crate::error::ScheduleError;
use crate::model::{DateValue, Group, Range, Rules};
use crate::Schedule;

/// Number of calendar days a single query scans before giving up.
pub const SEARCH_WINDOW_DAYS: i32 = 367;

/// Which way a query walks through time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards the future; matches are strictly after the reference.
    Forward,
    /// Towards the past; matches are at or before the reference.
    Backward,
}

impl Direction {
    fn sign(self) -> i32 {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }

    /// Time of day a scan starts from on every day but the reference day.
    fn day_start(self) -> (i8, i8, i8) {
        match self {
            Self::Forward => (0, 0, 0),
            Self::Backward => (23, 59, 59),
        }
    }

    /// Values from `from` to the end of `0..=max` in this direction.
    fn sweep(self, from: i8, max: i8) -> impl Iterator<Item = i8> {
        let (count, step) = match self {
            Self::Forward => (max - from + 1, 1),
            Self::Backward => (from + 1, -1),
        };
        (0..count).map(move |i| from + i * step)
    }
}

/// Next instant strictly after `after`.
pub fn next_from(schedule: &Schedule, after: DateTime) -> Result<DateTime, ScheduleError> {
    find_event(schedule, after, Direction::Forward)
}

/// Latest instant at or before `at_or_before`.
pub fn previous_from(
    schedule: &Schedule,
    at_or_before: DateTime,
) -> Result<DateTime, ScheduleError> {
    find_event(schedule, at_or_before, Direction::Backward)
}

/// Check if a datetime (to the second) satisfies any group of the schedule.
pub fn matches(schedule: &Schedule, datetime: DateTime) -> bool {
    schedule.groups().iter().any(|group| {
        date_matches(group, datetime.date())
            && in_rules(&group.hours, datetime.hour(), 24)
            && in_rules(&group.minutes, datetime.minute(), 60)
            && in_rules(&group.seconds, datetime.second(), 60)
    })
}

/// Groups are OR-ed: the earliest (forward) or latest (backward) group match wins.
fn find_event(
    schedule: &Schedule,
    reference: DateTime,
    direction: Direction,
) -> Result<DateTime, ScheduleError> {
    let best = schedule
        .groups()
        .iter()
        .enumerate()
        .filter_map(|(index, group)| {
            let found = group_event(group, reference, direction);
            tracing::trace!(group = index, ?direction, %reference, ?found, "group searched");
            found
        })
        .reduce(|a, b| match direction {
            Direction::Forward => a.min(b),
            Direction::Backward => a.max(b),
        });

    best.ok_or_else(|| {
        tracing::debug!(
            schedule = schedule.source(),
            ?direction,
            %reference,
            "no valid time within search window"
        );
        ScheduleError::valid_time_not_found(schedule.source())
    })
}

/// Search one group day by day, then hour, minute and second within a day.
///
/// Returns `None` if nothing matches within [`SEARCH_WINDOW_DAYS`], or if the
/// walk runs off the end of the supported calendar.
pub fn group_event(group: &Group, reference: DateTime, direction: Direction) -> Option<DateTime> {
    let first = match direction {
        Direction::Forward => reference.checked_add(1.second()).ok()?,
        Direction::Backward => reference,
    };

    for offset in 0..SEARCH_WINDOW_DAYS {
        let (date, start) = if offset == 0 {
            (first.date(), (first.hour(), first.minute(), first.second()))
        } else {
            let date = reference
                .date()
                .checked_add((offset * direction.sign()).days())
                .ok()?;
            (date, direction.day_start())
        };

        if !date_matches(group, date) {
            continue;
        }

        if let Some((hour, minute, second)) = time_in_day(group, start, direction) {
            return Some(date.at(hour, minute, second, 0));
        }
    }

    None
}

/// First time of day, scanning from `start`, that passes the hour, minute and
/// second rules.
fn time_in_day(group: &Group, start: (i8, i8, i8), direction: Direction) -> Option<(i8, i8, i8)> {
    let (_, init_minute, init_second) = direction.day_start();

    for (i, hour) in direction.sweep(start.0, 23).enumerate() {
        if !in_rules(&group.hours, hour, 24) {
            continue;
        }

        let minute_from = if i == 0 { start.1 } else { init_minute };
        for (j, minute) in direction.sweep(minute_from, 59).enumerate() {
            if !in_rules(&group.minutes, minute, 60) {
                continue;
            }

            let second_from = if i == 0 && j == 0 { start.2 } else { init_second };
            if let Some(second) = direction
                .sweep(second_from, 59)
                .find(|&second| in_rules(&group.seconds, second, 60))
            {
                return Some((hour, minute, second));
            }
        }
    }

    None
}

/// Date-level filters: explicit dates, then day of month, then day of week.
fn date_matches(group: &Group, date: Date) -> bool {
    if !group.dates.admits(|range| in_date_range(range, date)) {
        return false;
    }

    if !group.days_of_month.is_empty() {
        let (year, month) = (date.year(), date.month());
        let (Some(month_length), Some(previous_length)) =
            (days_in_month(year, month), days_in_previous_month(year, month))
        else {
            return false;
        };
        let day = i32::from(date.day());
        let hit = |range: &Range<i32>| {
            in_integer_range(
                &resolve_day_of_month(range, month_length),
                day,
                i32::from(previous_length),
            )
        };
        if !group.days_of_month.admits(hit) {
            return false;
        }
    }

    in_rules(&group.days_of_week, date.weekday().to_sunday_one_offset(), 7)
}

fn in_rules(rules: &Rules<i32>, value: i8, unit_length: i32) -> bool {
    let value = i32::from(value);
    rules.admits(|range| in_integer_range(range, value, unit_length))
}

/// Replace negative day-of-month bounds with days counted back from the end
/// of a month of `month_length` days (`-1` is the last day).
pub fn resolve_day_of_month(range: &Range<i32>, month_length: i8) -> Range<i32> {
    let resolve = |v: i32| {
        if v < 0 {
            i32::from(month_length) + v + 1
        } else {
            v
        }
    };
    Range {
        start: resolve(range.start),
        end: resolve(range.end),
        ..*range
    }
}

/// Membership of `value` in an integer range over a domain of `unit_length`
/// values. Split ranges wrap through the end of the domain, and their
/// interval keeps counting from `start` across the wrap.
pub fn in_integer_range(range: &Range<i32>, value: i32, unit_length: i32) -> bool {
    if range.half_open && value == range.end {
        return false;
    }

    let (start, end) = (i64::from(range.start), i64::from(range.end));
    let value = i64::from(value);
    let interval = i64::from(range.interval);

    if start <= value && value <= end {
        return (value - start) % interval == 0;
    }

    if start > end && (value <= end || value >= start) {
        let offset = if value >= start {
            value - start
        } else {
            value + i64::from(unit_length) - start
        };
        return offset % interval == 0;
    }

    false
}

/// Membership of `date` in a date range.
///
/// Yearless ranges recur every year and may wrap through the new year.
/// Intervals count whole days from the range start, anchored in the
/// previous year when the date falls in the wrapped head of a split range.
pub fn in_date_range(range: &Range<DateValue>, date: Date) -> bool {
    if range.start.is_full() {
        return in_full_date_range(range, date);
    }

    let candidate = DateValue::partial(date.month(), date.day());
    if range.half_open && candidate == range.end {
        return false;
    }

    let split = range.is_split();
    let inside = if split {
        candidate >= range.start || candidate <= range.end
    } else {
        candidate >= range.start && candidate <= range.end
    };
    if !inside {
        return false;
    }
    if range.interval == 1 {
        return true;
    }

    let anchor_year = if split && candidate < range.start {
        date.year() - 1
    } else {
        date.year()
    };
    // A Feb 29 start in a non-leap year counts from Feb 28.
    let anchor_day =
        if range.start.month == 2 && range.start.day == 29 && !is_leap_year(anchor_year) {
            28
        } else {
            range.start.day
        };

    match Date::new(anchor_year, range.start.month, anchor_day) {
        Ok(anchor) => on_interval(anchor, date, range.interval),
        Err(_) => false,
    }
}

fn in_full_date_range(range: &Range<DateValue>, date: Date) -> bool {
    let candidate = DateValue::full(date.year(), date.month(), date.day());
    if range.half_open && candidate == range.end {
        return false;
    }
    if !(candidate >= range.start && candidate <= range.end) {
        return false;
    }
    if range.interval == 1 {
        return true;
    }

    let Some(year) = range.start.year else {
        return false;
    };
    match Date::new(year, range.start.month, range.start.day) {
        Ok(anchor) => on_interval(anchor, date, range.interval),
        Err(_) => false,
    }
}

fn on_interval(anchor: Date, date: Date, interval: u32) -> bool {
    let days = anchor.duration_until(date).as_hours() / 24;
    days % i64::from(interval) == 0
}
