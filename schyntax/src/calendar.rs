//! Calendar helpers used by the parser (date validation) and the evaluator
//! (negative day-of-month resolution, day-of-month wraparound).

use jiff::civil::Date;

/// Year used to validate month/day pairs that carry no year. It is a leap
/// year so that `2/29` is accepted.
pub const DEFAULT_LEAP_YEAR: i16 = 2000;

/// Whether `year` is a leap year in the proleptic Gregorian calendar.
pub fn is_leap_year(year: i16) -> bool {
    Date::new(year, 2, 1).is_ok_and(|d| d.in_leap_year())
}

/// Number of days in `month` (1-12) of `year`, or `None` if the month or
/// year is outside what the calendar supports.
pub fn days_in_month(year: i16, month: i8) -> Option<i8> {
    Date::new(year, month, 1).ok().map(|d| d.days_in_month())
}

/// Number of days in the month before `month` of `year`, crossing into the
/// previous year for January.
pub fn days_in_previous_month(year: i16, month: i8) -> Option<i8> {
    let first = Date::new(year, month, 1).ok()?;
    first.yesterday().ok().map(|d| d.days_in_month())
}
