//! The compiled constraint model: what the parser produces and the
//! evaluator consumes. Nothing here is mutated once parsing finishes.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Expression "function" names, lowercase, mapped to the kind they constrain.
static EXPR_ALIASES: LazyLock<HashMap<&'static str, ExprKind>> = LazyLock::new(|| {
    use ExprKind::*;
    HashMap::from([
        ("s", Seconds),
        ("sec", Seconds),
        ("second", Seconds),
        ("seconds", Seconds),
        ("secondofminute", Seconds),
        ("secondsofminute", Seconds),
        ("m", Minutes),
        ("min", Minutes),
        ("minute", Minutes),
        ("minutes", Minutes),
        ("minuteofhour", Minutes),
        ("minutesofhour", Minutes),
        ("h", Hours),
        ("hour", Hours),
        ("hours", Hours),
        ("hourofday", Hours),
        ("hoursofday", Hours),
        ("day", DaysOfWeek),
        ("days", DaysOfWeek),
        ("dow", DaysOfWeek),
        ("dayofweek", DaysOfWeek),
        ("daysofweek", DaysOfWeek),
        ("dom", DaysOfMonth),
        ("dayofmonth", DaysOfMonth),
        ("daysofmonth", DaysOfMonth),
        ("date", Dates),
        ("dates", Dates),
    ])
});

/// Day-of-week literals, Sunday = 1 through Saturday = 7.
static DAY_OF_WEEK_LITERALS: LazyLock<HashMap<&'static str, i32>> = LazyLock::new(|| {
    HashMap::from([
        ("su", 1),
        ("mo", 2),
        ("tu", 3),
        ("we", 4),
        ("th", 5),
        ("fr", 6),
        ("sa", 7),
        ("sun", 1),
        ("mon", 2),
        ("tue", 3),
        ("wed", 4),
        ("thu", 5),
        ("fri", 6),
        ("sat", 7),
        ("sunday", 1),
        ("monday", 2),
        ("tuesday", 3),
        ("wednesday", 4),
        ("thursday", 5),
        ("friday", 6),
        ("saturday", 7),
        ("tues", 3),
        ("thur", 5),
        ("thurs", 5),
    ])
});

/// Look up a day-of-week name or abbreviation (case-insensitive).
pub fn day_of_week_literal(word: &str) -> Option<i32> {
    DAY_OF_WEEK_LITERALS
        .get(word.to_ascii_lowercase().as_str())
        .copied()
}

/// The six resolutions an expression can constrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Dates,
    DaysOfMonth,
    DaysOfWeek,
    Hours,
    Minutes,
    Seconds,
}

impl ExprKind {
    /// Resolve an expression name such as `min` or `DayOfWeek`.
    pub fn from_alias(word: &str) -> Option<Self> {
        EXPR_ALIASES.get(word.to_ascii_lowercase().as_str()).copied()
    }

    /// Name used when rendering the canonical form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dates => "dates",
            Self::DaysOfMonth => "dom",
            Self::DaysOfWeek => "dow",
            Self::Hours => "hours",
            Self::Minutes => "minutes",
            Self::Seconds => "seconds",
        }
    }

    /// Day-of-month also accepts the negated domain (`-31..=-1`), counted
    /// back from the end of the month.
    pub fn allows_negative(self) -> bool {
        matches!(self, Self::DaysOfMonth)
    }
}

/// Valid years for full dates.
pub const MIN_YEAR: i16 = 1900;
pub const MAX_YEAR: i16 = 2200;

/// A calendar date, with or without a year.
///
/// A date without a year ("partial") recurs every year. Full and partial
/// dates are not comparable: `partial_cmp` returns `None` for such pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DateValue {
    pub year: Option<i16>,
    pub month: i8,
    pub day: i8,
}

impl DateValue {
    pub fn partial(month: i8, day: i8) -> Self {
        Self {
            year: None,
            month,
            day,
        }
    }

    pub fn full(year: i16, month: i8, day: i8) -> Self {
        Self {
            year: Some(year),
            month,
            day,
        }
    }

    pub fn is_full(&self) -> bool {
        self.year.is_some()
    }

    /// First date of the domain: `1/1`.
    pub fn first() -> Self {
        Self::partial(1, 1)
    }

    /// Last date of the domain: `12/31`, or the last valid full date.
    pub fn last(full: bool) -> Self {
        if full {
            Self::full(MAX_YEAR, 12, 31)
        } else {
            Self::partial(12, 31)
        }
    }
}

impl PartialOrd for DateValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.is_full() != other.is_full() {
            return None;
        }
        Some((self.year, self.month, self.day).cmp(&(other.year, other.month, other.day)))
    }
}

/// A start/end pair with an optional half-open end and a repetition interval.
///
/// `end` always has a value (equal to `start` for a single value), and
/// `interval` is at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Range<T> {
    pub start: T,
    pub end: T,
    pub half_open: bool,
    pub interval: u32,
}

impl<T: Copy> Range<T> {
    pub fn new(start: T, end: T, half_open: bool, interval: u32) -> Self {
        Self {
            start,
            end,
            half_open,
            interval: interval.max(1),
        }
    }

    /// The degenerate range matching exactly `value`.
    pub fn single(value: T) -> Self {
        Self::new(value, value, false, 1)
    }
}

impl<T: PartialOrd> Range<T> {
    /// A split range wraps around the end of its domain (e.g. hours `22..3`).
    pub fn is_split(&self) -> bool {
        self.start > self.end
    }
}

/// One inclusion/exclusion pair for a single resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Rules<T> {
    pub include: Vec<Range<T>>,
    pub exclude: Vec<Range<T>>,
}

impl<T> Default for Rules<T> {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

impl<T> Rules<T> {
    pub fn push(&mut self, range: Range<T>, excluded: bool) {
        if excluded {
            self.exclude.push(range);
        } else {
            self.include.push(range);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// An empty inclusion list admits everything; any exclusion hit rejects.
    pub fn admits(&self, hit: impl Fn(&Range<T>) -> bool) -> bool {
        (self.include.is_empty() || self.include.iter().any(&hit))
            && !self.exclude.iter().any(&hit)
    }
}

/// An AND-combined set of constraints. A schedule is the OR of its groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Group {
    pub dates: Rules<DateValue>,
    pub days_of_month: Rules<i32>,
    pub days_of_week: Rules<i32>,
    pub hours: Rules<i32>,
    pub minutes: Rules<i32>,
    pub seconds: Rules<i32>,
}

impl Group {
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
            && self.days_of_month.is_empty()
            && self.days_of_week.is_empty()
            && self.hours.is_empty()
            && self.minutes.is_empty()
            && self.seconds.is_empty()
    }

    /// Pin every resolution finer than the finest one given to zero, so the
    /// group always resolves to a whole instant.
    pub(crate) fn apply_implied_defaults(&mut self) {
        if !self.seconds.is_empty() {
            return;
        }
        self.seconds.include.push(Range::single(0));
        if !self.minutes.is_empty() {
            return;
        }
        self.minutes.include.push(Range::single(0));
        if !self.hours.is_empty() {
            return;
        }
        self.hours.include.push(Range::single(0));
    }
}
